//! Config command - show the resolved configuration

use anyhow::Result;

use crate::config::MergedConfig;
use crate::output::OutputContext;

/// Print the configuration after merging file, environment and arguments
pub fn show(merged: &MergedConfig, config_file: &str, ctx: &OutputContext) -> Result<()> {
    let transport = &merged.transport;

    ctx.print_kv(&[
        ("config_file", config_file.to_string()),
        ("url", merged.url.clone()),
        ("output", merged.output.clone()),
        ("no_color", merged.no_color.to_string()),
        (
            "connect_timeout_secs",
            transport.connect_timeout_secs.to_string(),
        ),
        (
            "read_timeout_secs",
            transport
                .read_timeout_secs
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
        (
            "max_line_bytes",
            transport.max_line_bytes.to_string(),
        ),
        (
            "bearer_token",
            if transport.bearer_token.is_some() {
                "set".to_string()
            } else {
                "none".to_string()
            },
        ),
    ]);
    Ok(())
}
