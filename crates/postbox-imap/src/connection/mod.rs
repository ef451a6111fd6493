//! Transport: configuration, TCP/TLS streams and response framing.

mod config;
mod framed;
mod stream;

pub use config::{Config, ConfigBuilder, Security};
pub use framed::FramedStream;
pub use stream::{ImapStream, connect, tls_connector};
