//! Listen command - print events from a stream until interrupted

use anyhow::{Context, Result};
use duplex_eventsource::{ClientState, EventSourceClient, TransportConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::output::{EventPrinter, OutputContext, SummaryRow};

/// How long to wait for the read loop to notice a stop request
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Stream events from `url` and print them as they arrive
pub async fn listen(
    url: &str,
    transport: &TransportConfig,
    show_heartbeats: bool,
    limit: Option<u64>,
    ctx: &OutputContext,
) -> Result<()> {
    let mut client =
        EventSourceClient::with_config(url, transport).context("Failed to create client")?;

    let events = Arc::new(AtomicU64::new(0));
    let heartbeats = Arc::new(AtomicU64::new(0));
    let printer = EventPrinter {
        format: ctx.format,
        heartbeats: show_heartbeats,
    };

    let counter = events.clone();
    client.on_data(move |payload| {
        counter.fetch_add(1, Ordering::SeqCst);
        printer.data(payload);
        Ok(())
    })?;
    let counter = heartbeats.clone();
    client.on_heartbeat(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        printer.heartbeat();
        Ok(())
    })?;

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    ctx.info(&format!("Listening on {}", client.uri()));
    ctx.info("Press Ctrl+C to stop");
    client.start()?;

    loop {
        tokio::select! {
            state = client.wait() => {
                ctx.info(&format!("Stream ended ({})", state));
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                let limit_reached = limit.is_some_and(|n| events.load(Ordering::SeqCst) >= n);
                if !running.load(Ordering::SeqCst) || limit_reached {
                    break;
                }
            }
        }
    }

    if !client.state().is_terminal() {
        ctx.info("Stopping...");
        client.stop();
        if tokio::time::timeout(STOP_GRACE, client.wait()).await.is_err() {
            ctx.warn("Stream is idle, detaching without waiting for the next line");
        }
    }

    let state = client.state();
    if let Some(fault) = client.last_fault() {
        ctx.warn(&format!("Stream fault: {}", fault));
    }
    client.dispose();

    ctx.print_one(&SummaryRow {
        url: url.to_string(),
        events: events.load(Ordering::SeqCst),
        heartbeats: heartbeats.load(Ordering::SeqCst),
        state: state.to_string(),
    });

    match state {
        ClientState::Faulted => anyhow::bail!("Stream faulted"),
        _ => {
            ctx.success("Done");
            Ok(())
        }
    }
}
