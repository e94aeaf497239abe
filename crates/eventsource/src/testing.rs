//! Test utilities for duplex-eventsource
//!
//! In-memory transports for driving the read loop without a network, and an
//! HTTP test server for end-to-end runs against [`HttpTransport`](crate::HttpTransport).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

use crate::error::TransportError;
use crate::transport::{LineStream, Transport};

#[derive(Debug, Clone)]
enum ScriptItem {
    Line(String),
    Fault(String),
}

/// Transport replaying a fixed script of lines
///
/// Clones share the open counter, so keep a clone to inspect it after
/// handing the transport to a client.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Vec<ScriptItem>,
    open_error: Option<String>,
    open_delay: Option<Duration>,
    opens: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Script that yields `lines` and then ends
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: lines.into_iter().map(|l| ScriptItem::Line(l.into())).collect(),
            ..Default::default()
        }
    }

    /// Append a read fault after the scripted lines
    pub fn then_fault(mut self, message: impl Into<String>) -> Self {
        self.script.push(ScriptItem::Fault(message.into()));
        self
    }

    /// Make `open` fail
    pub fn failing_open(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Delay `open` before returning the stream
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Number of times `open` was called
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, _uri: &Url) -> Result<LineStream, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.open_error {
            return Err(TransportError::Io(std::io::Error::other(message.clone())));
        }

        let script = self.script.clone();
        Ok(Box::pin(stream! {
            for item in script {
                match item {
                    ScriptItem::Line(line) => yield Ok(line),
                    ScriptItem::Fault(message) => {
                        yield Err(TransportError::Io(std::io::Error::other(message)));
                    }
                }
            }
        }))
    }
}

/// Transport fed live through a [`LineSender`]
///
/// The stream ends when every sender is dropped. Can be opened once.
#[derive(Debug)]
pub struct ChannelTransport {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<String, TransportError>>>>,
}

/// Feeding side of a [`ChannelTransport`]
#[derive(Debug, Clone)]
pub struct LineSender {
    tx: mpsc::UnboundedSender<Result<String, TransportError>>,
}

impl ChannelTransport {
    pub fn new() -> (Self, LineSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            LineSender { tx },
        )
    }
}

impl LineSender {
    /// Push one line; returns false once the read loop is gone
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.tx.send(Ok(line.into())).is_ok()
    }

    /// Push a read fault
    pub fn fault(&self, message: impl Into<String>) -> bool {
        self.tx
            .send(Err(TransportError::Io(std::io::Error::other(message.into()))))
            .is_ok()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn open(&self, _uri: &Url) -> Result<LineStream, TransportError> {
        let mut rx = self.rx.lock().take().ok_or(TransportError::Closed)?;
        Ok(Box::pin(stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }))
    }
}

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum router on an ephemeral local port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::get, Router};
    /// use duplex_eventsource::testing::TestServer;
    ///
    /// let router = Router::new().route("/events", get(|| async { "data: {\"x\":1}\n" }));
    /// let server = TestServer::start(router).await?;
    /// let client = EventSourceClient::new(&server.url("/events"))?;
    /// ```
    pub async fn start(router: axum::Router) -> std::io::Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full URL for `path`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    condition()
}
