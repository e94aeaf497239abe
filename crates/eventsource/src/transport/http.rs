//! HTTP transport backed by reqwest

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::lines::{LineDecoder, DEFAULT_MAX_LINE_BYTES};
use super::{LineStream, Transport};
use crate::config::TransportConfig;
use crate::error::{EventSourceError, Result, TransportError};

/// Opens `GET <uri>` with `Accept: text/event-stream` and splits the body into lines
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    max_line_bytes: usize,
}

impl HttpTransport {
    /// Create a transport with custom configuration
    pub fn with_config(config: &TransportConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        if let Some(token) = &config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| EventSourceError::Config(format!("Invalid auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(agent) = &config.user_agent {
            let value = HeaderValue::from_str(agent)
                .map_err(|e| EventSourceError::Config(format!("Invalid user agent: {}", e)))?;
            headers.insert(USER_AGENT, value);
        }

        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout())
            .default_headers(headers);
        if let Some(read_timeout) = config.read_timeout() {
            builder = builder.read_timeout(read_timeout);
        }

        Ok(Self {
            client: builder.build()?,
            max_line_bytes: config.max_line_bytes,
        })
    }

    /// Wrap an existing reqwest client
    ///
    /// The client's own default headers are used as-is; callers should set
    /// `Accept: text/event-stream` themselves if the server requires it.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(uri = %uri))]
    async fn open(&self, uri: &Url) -> std::result::Result<LineStream, TransportError> {
        debug!("Connecting to SSE stream");

        let response = self.client.get(uri.clone()).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::server_error(status, message));
        }

        let mut body = response.bytes_stream();
        let mut decoder = LineDecoder::with_max_line(self.max_line_bytes);
        let lines: LineStream = Box::pin(try_stream! {
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(TransportError::Connection)?;
                for line in decoder.feed(&chunk)? {
                    yield line;
                }
            }
            if let Some(line) = decoder.finish() {
                yield line;
            }
        });

        Ok(lines)
    }
}
