//! Duplex Event Source
//!
//! Minimal client for Server-Sent-Events-style text streams. A client opens a
//! long-lived HTTP read, classifies each line as heartbeat, data, blank, or
//! unrecognized, decodes `data:` payloads as JSON, and hands them to the
//! registered observers in stream order.
//!
//! # Example
//!
//! ```rust,no_run
//! use duplex_eventsource::EventSourceClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut client = EventSourceClient::new("http://localhost:8080/v1/testapp/testchannel")?;
//!
//!     client.on_data(|payload| {
//!         println!("Event: {}", payload);
//!         Ok(())
//!     })?;
//!     client.on_heartbeat(|| Ok(()))?;
//!
//!     client.start()?;
//!     tokio::signal::ctrl_c().await?;
//!
//!     client.stop();
//!     client.dispose();
//!     Ok(())
//! }
//! ```
//!
//! # Wire format
//!
//! | Line                | Result                                   |
//! |---------------------|------------------------------------------|
//! | `:heartbeat…`       | heartbeat observers                      |
//! | `data:<payload>`    | payload decoded, data observers          |
//! | empty               | ignored                                  |
//! | anything else       | ignored, logged as unrecognized          |
//!
//! Multi-line `data:` fields, `event:` names and reconnection are not
//! supported.
//!
//! # Testing
//!
//! The `testing` module provides in-memory transports and an HTTP test server:
//!
//! ```rust,ignore
//! use duplex_eventsource::testing::ScriptedTransport;
//!
//! let transport = ScriptedTransport::new([":heartbeat", "data: {\"x\":1}"]);
//! let mut client = EventSourceClient::with_transport("http://test/", transport)?;
//! ```

mod client;
mod config;
mod dispatcher;
mod error;
pub mod parser;
pub mod testing;
pub mod transport;

pub use client::{ClientState, EventSourceClient};
pub use config::TransportConfig;
pub use dispatcher::{DataObserver, DispatchReport, Dispatcher, Event, HeartbeatObserver};
pub use error::{DecodeError, EventSourceError, ObserverError, Result, TransportError};
pub use parser::{JsonDecoder, LineRecord, Payload, PayloadDecoder};
pub use transport::{HttpTransport, LineStream, Transport};
