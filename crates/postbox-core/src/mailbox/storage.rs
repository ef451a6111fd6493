//! Writes attachments to a folder.

use std::path::{Path, PathBuf};

use super::model::Attachment;
use crate::error::Result;

/// Permissions of a folder created for attachments.
#[cfg(unix)]
const FOLDER_MODE: u32 = 0o755;

/// Writes every attachment into `folder`, creating it if needed.
///
/// Files are named after the declared file name with any directory part
/// removed. An existing file of the same name is overwritten.
pub async fn save(folder: &Path, attachments: &[Attachment]) -> Result<Vec<PathBuf>> {
    if !attachments.is_empty() {
        create_folder(folder).await?;
    }

    let mut written = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let path = folder.join(file_name(attachment));
        tokio::fs::write(&path, &attachment.data).await?;
        tracing::debug!(path = %path.display(), bytes = attachment.data.len(), "saved attachment");
        written.push(path);
    }
    Ok(written)
}

async fn create_folder(folder: &Path) -> Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(FOLDER_MODE);
    builder.create(folder).await?;
    Ok(())
}

/// Last path component of the declared name, or `part-N` when nothing
/// usable is left.
fn file_name(attachment: &Attachment) -> String {
    attachment
        .filename
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map_or_else(|| format!("part-{}", attachment.part), ToString::to_string)
}
