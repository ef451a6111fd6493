//! `postbox` - prints the unread mail of one IMAP mailbox.
//!
//! The account is read from `$POSTBOX_CONFIG`, or from
//! `<config dir>/postbox/config.json`. The password comes from
//! `POSTBOX_PASSWORD` and is never written anywhere. When
//! `POSTBOX_ATTACHMENTS` names a folder, attachments of every unread
//! message are saved below it, one subfolder per message.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use postbox_core::{AccountConfig, BodyFormat, MailClient};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postbox=info,postbox_imap=info,postbox_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config().await?;
    let password = std::env::var("POSTBOX_PASSWORD").context("POSTBOX_PASSWORD is not set")?;
    let attachments = std::env::var_os("POSTBOX_ATTACHMENTS").map(PathBuf::from);

    info!(host = %config.host, mailbox = %config.mailbox, "Starting postbox");

    MailClient::scope(config, &password, async |client| {
        let total = client.total().await?;
        let unread = client.unread().await?;
        println!("{} unread of {total}", unread.len());

        for id in unread {
            let Some(header) = client.header(id).await? else {
                continue;
            };
            println!();
            println!(
                "#{id} {} {} <{}> {}",
                header.date().unwrap_or_default(),
                header.name,
                header.from,
                header.subject
            );
            let body = client.body(id, BodyFormat::Plain).await?;
            for line in body.lines().take(5) {
                println!("    {line}");
            }

            if let Some(root) = &attachments {
                for path in client.save_attachments(id, root.join(id.to_string())).await? {
                    println!("    saved {}", path.display());
                }
            }
        }
        Ok(())
    })
    .await
    .context("mailbox session failed")
}

/// Load the account from `$POSTBOX_CONFIG` or the default config path.
async fn load_config() -> Result<AccountConfig> {
    let path = std::env::var_os("POSTBOX_CONFIG").map_or_else(
        || {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("postbox")
                .join("config.json")
        },
        PathBuf::from,
    );

    let contents = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    AccountConfig::from_json(&contents).with_context(|| format!("parsing {}", path.display()))
}
