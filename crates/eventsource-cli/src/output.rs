//! Output formatting for eventsource-cli (text, json)

use clap::ValueEnum;
use colored::Colorize;
use duplex_eventsource::Payload;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines and tables (default)
    #[default]
    Text,
    /// One JSON document per line
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    ///
    /// Status goes to stderr so stdout carries only events.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print a single item in the configured format
    pub fn print_one<T: Tabled + Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                let table = Table::new([data]).to_string();
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
    }

    /// Print key-value pairs (for config command)
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Text => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
    }
}

/// Renders stream events from inside observers
///
/// `Copy` so each observer closure can own one.
#[derive(Debug, Clone, Copy)]
pub struct EventPrinter {
    pub format: OutputFormat,
    pub heartbeats: bool,
}

impl EventPrinter {
    pub fn data(&self, payload: &Payload) {
        println!("{}", format_event(payload, self.format));
    }

    pub fn heartbeat(&self) {
        if !self.heartbeats {
            return;
        }
        match self.format {
            OutputFormat::Text => println!("{}", "heartbeat".dimmed()),
            OutputFormat::Json => println!(r#"{{"heartbeat":true}}"#),
        }
    }
}

/// Format one data event
pub fn format_event(payload: &Payload, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Event: {}", format_json_value(payload)),
        OutputFormat::Json => payload.to_string(),
    }
}

fn format_json_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Summary row printed when the listener ends
#[derive(Debug, Tabled, Serialize)]
pub struct SummaryRow {
    #[tabled(rename = "URL")]
    pub url: String,
    #[tabled(rename = "Events")]
    pub events: u64,
    #[tabled(rename = "Heartbeats")]
    pub heartbeats: u64,
    #[tabled(rename = "State")]
    pub state: String,
}
