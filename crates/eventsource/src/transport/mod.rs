//! Line transports
//!
//! A [`Transport`] opens the endpoint and hands back a lazy sequence of text
//! lines. The read loop never sees bytes, HTTP, or framing: only lines, a
//! read fault, or the end of the stream (`None`).

mod http;
mod lines;

use async_trait::async_trait;
use futures::stream::BoxStream;
use url::Url;

use crate::error::TransportError;

pub use http::HttpTransport;
pub use lines::{LineDecoder, DEFAULT_MAX_LINE_BYTES};

/// Lazy sequence of lines produced by an opened transport
///
/// Yields `None` once the stream is exhausted.
pub type LineStream = BoxStream<'static, Result<String, TransportError>>;

/// Source of protocol lines for an event source client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the stream at `uri`
    async fn open(&self, uri: &Url) -> Result<LineStream, TransportError>;
}
