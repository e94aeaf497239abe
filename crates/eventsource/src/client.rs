//! Event source client: connection lifecycle and read loop

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::TransportConfig;
use crate::dispatcher::{panic_message, Dispatcher, Event};
use crate::error::{EventSourceError, ObserverError, Result};
use crate::parser::{classify, JsonDecoder, LineRecord, Payload, PayloadDecoder};
use crate::transport::{HttpTransport, Transport};

/// Lifecycle state of a client
///
/// `Idle → Streaming → {Stopped | Faulted | Completed}`. Terminal states are
/// final; a new client is needed to stream again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Not started yet
    Idle,
    /// Opening the transport or reading lines
    Streaming,
    /// Loop observed a `stop()` request
    Stopped,
    /// Transport could not be opened or failed mid-stream
    Faulted,
    /// Stream was exhausted
    Completed,
}

impl ClientState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Faulted | Self::Completed)
    }
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
            Self::Faulted => "faulted",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Client for a single Server-Sent-Events-style stream
///
/// Register at least one data observer, then call [`start`](Self::start).
/// Observers run on the read-loop task, one line at a time, in stream order.
///
/// # Example
///
/// ```no_run
/// use duplex_eventsource::EventSourceClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = EventSourceClient::new("http://localhost:8080/v1/testapp/testchannel")?;
/// client.on_data(|payload| {
///     println!("Event: {}", payload);
///     Ok(())
/// })?;
/// client.start()?;
///
/// // ... later
/// client.stop();
/// client.wait().await;
/// client.dispose();
/// # Ok(())
/// # }
/// ```
pub struct EventSourceClient {
    uri: Url,
    transport: Option<Arc<dyn Transport>>,
    decoder: Arc<dyn PayloadDecoder>,
    /// Observers, moved into the read loop on start
    dispatcher: Option<Dispatcher>,
    /// Created at most once, on start
    cancellation: Option<CancellationToken>,
    state_tx: Arc<watch::Sender<ClientState>>,
    last_fault: Arc<Mutex<Option<String>>>,
    handle: Option<JoinHandle<ClientState>>,
    started: bool,
    disposed: bool,
}

impl std::fmt::Debug for EventSourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSourceClient")
            .field("uri", &self.uri.as_str())
            .field("state", &self.state())
            .field("dispatcher", &self.dispatcher)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl EventSourceClient {
    /// Create a client for `uri` using the HTTP transport
    pub fn new(uri: &str) -> Result<Self> {
        Self::with_config(uri, &TransportConfig::default())
    }

    /// Create a client with a custom HTTP transport configuration
    pub fn with_config(uri: &str, config: &TransportConfig) -> Result<Self> {
        let uri = Url::parse(uri)?;
        let transport = HttpTransport::with_config(config)?;
        Ok(Self::from_parts(uri, Arc::new(transport)))
    }

    /// Create a client reading lines from a custom transport
    pub fn with_transport(uri: &str, transport: impl Transport + 'static) -> Result<Self> {
        let uri = Url::parse(uri)?;
        Ok(Self::from_parts(uri, Arc::new(transport)))
    }

    fn from_parts(uri: Url, transport: Arc<dyn Transport>) -> Self {
        let (state_tx, _) = watch::channel(ClientState::Idle);
        Self {
            uri,
            transport: Some(transport),
            decoder: Arc::new(JsonDecoder),
            dispatcher: Some(Dispatcher::new()),
            cancellation: None,
            state_tx: Arc::new(state_tx),
            last_fault: Arc::new(Mutex::new(None)),
            handle: None,
            started: false,
            disposed: false,
        }
    }

    /// Replace the payload decoder (JSON by default)
    pub fn with_decoder(mut self, decoder: impl PayloadDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Endpoint of this client
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Current lifecycle state
    pub fn state(&self) -> ClientState {
        *self.state_tx.borrow()
    }

    /// Whether `start()` succeeded on this client
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Message of the transport fault that ended the loop, if any
    pub fn last_fault(&self) -> Option<String> {
        self.last_fault.lock().clone()
    }

    /// Register a data observer
    ///
    /// Fails with [`EventSourceError::RegistrationClosed`] once started.
    pub fn on_data<F>(&mut self, observer: F) -> Result<()>
    where
        F: FnMut(&Payload) -> std::result::Result<(), ObserverError> + Send + 'static,
    {
        self.registry()?.add_data(Box::new(observer));
        Ok(())
    }

    /// Register a heartbeat observer
    ///
    /// Fails with [`EventSourceError::RegistrationClosed`] once started.
    pub fn on_heartbeat<F>(&mut self, observer: F) -> Result<()>
    where
        F: FnMut() -> std::result::Result<(), ObserverError> + Send + 'static,
    {
        self.registry()?.add_heartbeat(Box::new(observer));
        Ok(())
    }

    fn registry(&mut self) -> Result<&mut Dispatcher> {
        if self.disposed {
            return Err(EventSourceError::Disposed);
        }
        self.dispatcher
            .as_mut()
            .ok_or(EventSourceError::RegistrationClosed)
    }

    /// Start streaming
    ///
    /// Returns immediately; the transport is opened and read on a spawned
    /// task. Nothing is mutated when this fails.
    pub fn start(&mut self) -> Result<()> {
        if self.cancellation.is_some() {
            return Err(EventSourceError::AlreadyStarted);
        }
        if self.disposed {
            return Err(EventSourceError::Disposed);
        }
        let observers = self.dispatcher.as_ref().map_or(0, Dispatcher::data_count);
        if observers == 0 {
            return Err(EventSourceError::NoObservers);
        }
        let runtime = tokio::runtime::Handle::try_current()?;
        let transport = self.transport.clone().ok_or(EventSourceError::Disposed)?;
        let dispatcher = self.dispatcher.take().ok_or(EventSourceError::NoObservers)?;
        let heartbeat_observers = dispatcher.heartbeat_count();

        let token = CancellationToken::new();
        self.cancellation = Some(token.clone());
        self.started = true;
        self.state_tx.send_replace(ClientState::Streaming);

        let read_loop = ReadLoop {
            uri: self.uri.clone(),
            transport,
            decoder: self.decoder.clone(),
            dispatcher,
            token,
            state_tx: self.state_tx.clone(),
            last_fault: self.last_fault.clone(),
        };
        self.handle = Some(runtime.spawn(read_loop.run()));

        info!(
            uri = %self.uri,
            observers,
            heartbeat_observers,
            "Event source started"
        );
        Ok(())
    }

    /// Request cancellation of the read loop
    ///
    /// Cooperative: a read already waiting on the transport is not
    /// interrupted, so the loop only stops after the next line (or fault, or
    /// end of stream) arrives. No-op before `start()` and after the loop ended.
    pub fn stop(&self) {
        if let Some(token) = &self.cancellation {
            if !token.is_cancelled() {
                debug!(uri = %self.uri, "Stop requested");
                token.cancel();
            }
        }
    }

    /// Wait until the read loop reaches a terminal state
    ///
    /// Returns the current state right away when the client never started.
    pub async fn wait(&self) -> ClientState {
        if !self.started {
            return self.state();
        }
        let mut rx = self.state_tx.subscribe();
        let state = match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }

    /// Release the cancellation signal and the transport handle
    ///
    /// Safe to call any number of times. Does not cancel a running loop;
    /// call [`stop`](Self::stop) first for a clean shutdown.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.cancellation = None;
        self.transport = None;
        self.dispatcher = None;
        // Dropping the handle detaches the task, it does not abort it
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!(uri = %self.uri, "Detaching running read loop");
            }
        }
        debug!(uri = %self.uri, "Event source disposed");
    }
}

impl Drop for EventSourceClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Everything the spawned task owns
struct ReadLoop {
    uri: Url,
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn PayloadDecoder>,
    dispatcher: Dispatcher,
    token: CancellationToken,
    state_tx: Arc<watch::Sender<ClientState>>,
    last_fault: Arc<Mutex<Option<String>>>,
}

impl ReadLoop {
    #[instrument(name = "event_source", skip_all, fields(uri = %self.uri))]
    async fn run(mut self) -> ClientState {
        let state = match AssertUnwindSafe(self.read()).catch_unwind().await {
            Ok(state) => state,
            Err(panic) => {
                let message = format!("read loop panicked: {}", panic_message(panic.as_ref()));
                error!(%message, "Faulted");
                *self.last_fault.lock() = Some(message);
                ClientState::Faulted
            }
        };
        self.state_tx.send_replace(state);
        info!(%state, "Event source ended");
        state
    }

    async fn read(&mut self) -> ClientState {
        let mut lines = match self.transport.open(&self.uri).await {
            Ok(lines) => lines,
            Err(e) => {
                error!(error = %e, "Faulted opening stream");
                *self.last_fault.lock() = Some(e.to_string());
                return ClientState::Faulted;
            }
        };
        debug!("Stream opened");

        while !self.token.is_cancelled() {
            let line = match lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    error!(error = %e, "Faulted reading stream");
                    *self.last_fault.lock() = Some(e.to_string());
                    return ClientState::Faulted;
                }
                None => return ClientState::Completed,
            };

            // Cancellation requested while the read was in flight
            if self.token.is_cancelled() {
                break;
            }

            let event = match classify(&line, self.decoder.as_ref()) {
                LineRecord::Heartbeat => Event::Heartbeat,
                LineRecord::Data(payload) => Event::Data(payload),
                LineRecord::Blank | LineRecord::Unrecognized(_) => continue,
            };
            let report = self.dispatcher.emit(&event);
            if report.failed > 0 {
                warn!(
                    failed = report.failed,
                    invoked = report.invoked,
                    "Observers failed, continuing"
                );
            }
        }

        debug!("Cancelled");
        ClientState::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ClientState::Idle.is_terminal());
        assert!(!ClientState::Streaming.is_terminal());
        assert!(ClientState::Stopped.is_terminal());
        assert!(ClientState::Faulted.is_terminal());
        assert!(ClientState::Completed.is_terminal());
    }

    #[test]
    fn test_invalid_uri_fails_at_construction() {
        let err = EventSourceClient::new("not a uri").unwrap_err();
        assert!(matches!(err, EventSourceError::InvalidUrl(_)));
    }

    #[test]
    fn test_new_client_is_idle() {
        let client = EventSourceClient::new("http://localhost:8080/events").unwrap();
        assert_eq!(client.state(), ClientState::Idle);
        assert!(!client.is_started());
        assert_eq!(client.uri().path(), "/events");
    }

    #[test]
    fn test_start_without_observers() {
        let mut client = EventSourceClient::new("http://localhost:8080/events").unwrap();
        client.on_heartbeat(|| Ok(())).unwrap();

        let err = client.start().unwrap_err();

        assert!(matches!(err, EventSourceError::NoObservers));
        assert!(err.is_startup_error());
        assert_eq!(client.state(), ClientState::Idle);
    }

    #[test]
    fn test_start_outside_runtime() {
        let mut client = EventSourceClient::new("http://localhost:8080/events").unwrap();
        client.on_data(|_| Ok(())).unwrap();

        let err = client.start().unwrap_err();

        assert!(matches!(err, EventSourceError::NoRuntime(_)));
        assert!(!client.is_started());
        // Still registrable: start failed without mutating anything
        client.on_data(|_| Ok(())).unwrap();
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let client = EventSourceClient::new("http://localhost:8080/events").unwrap();
        client.stop();
        assert_eq!(client.state(), ClientState::Idle);
    }

    #[test]
    fn test_dispose_twice() {
        let mut client = EventSourceClient::new("http://localhost:8080/events").unwrap();
        client.dispose();
        client.dispose();

        assert!(matches!(
            client.on_data(|_| Ok(())),
            Err(EventSourceError::Disposed)
        ));
        assert!(matches!(client.start(), Err(EventSourceError::Disposed)));
    }
}
