//! Observer registries and synchronous fan-out

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::error::ObserverError;
use crate::parser::Payload;

/// Callback invoked for every data event
pub type DataObserver = Box<dyn FnMut(&Payload) -> Result<(), ObserverError> + Send>;

/// Callback invoked for every heartbeat
pub type HeartbeatObserver = Box<dyn FnMut() -> Result<(), ObserverError> + Send>;

/// Event handed to observers
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Heartbeat,
    Data(Payload),
}

/// Outcome of one [`Dispatcher::emit`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Observers invoked
    pub invoked: usize,
    /// Observers that returned an error or panicked
    pub failed: usize,
}

/// Ordered observer lists for data and heartbeat events
#[derive(Default)]
pub struct Dispatcher {
    data: Vec<DataObserver>,
    heartbeat: Vec<HeartbeatObserver>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("data", &self.data.len())
            .field("heartbeat", &self.heartbeat.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_data(&mut self, observer: DataObserver) {
        self.data.push(observer);
    }

    pub fn add_heartbeat(&mut self, observer: HeartbeatObserver) {
        self.heartbeat.push(observer);
    }

    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    pub fn heartbeat_count(&self) -> usize {
        self.heartbeat.len()
    }

    /// Invoke every observer registered for this event kind, in registration order
    ///
    /// Errors and panics are logged and counted; they never stop the remaining
    /// observers.
    pub fn emit(&mut self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::default();

        match event {
            Event::Heartbeat => {
                for observer in &mut self.heartbeat {
                    report.invoked += 1;
                    let outcome = catch_unwind(AssertUnwindSafe(|| observer()));
                    if !observe_outcome("heartbeat", outcome) {
                        report.failed += 1;
                    }
                }
            }
            Event::Data(payload) => {
                for observer in &mut self.data {
                    report.invoked += 1;
                    let outcome = catch_unwind(AssertUnwindSafe(|| observer(payload)));
                    if !observe_outcome("data", outcome) {
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

/// Log a failed observer call; returns whether the call succeeded
fn observe_outcome(
    kind: &str,
    outcome: std::thread::Result<Result<(), ObserverError>>,
) -> bool {
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(kind, error = %e, "Observer failed");
            false
        }
        Err(panic) => {
            warn!(kind, panic = %panic_message(panic.as_ref()), "Observer panicked");
            false
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else {
        "non-string panic payload"
    }
}
