//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use fleetline_api_models::{Device, User};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_device_list(devices: &[Device], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(devices)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => {
            println!("{:<36} {:<6} {:<20} NAME", "GUID", "ALIVE", "LAST SEEN");
            for device in devices {
                println!(
                    "{:<36} {:<6} {:<20} {}",
                    device.device_guid,
                    alive_label(device.is_alive),
                    format_last_seen(device.last_seen.as_ref()),
                    device.name
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_user(user: &User, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(user)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => {
            println!("user: {}", user.username);
            println!("email: {}", user.email);
            println!("guid: {}", user.user_guid);
        }
    }
    Ok(())
}

const fn alive_label(is_alive: Option<bool>) -> &'static str {
    match is_alive {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

fn format_last_seen(last_seen: Option<&DateTime<Utc>>) -> String {
    last_seen.map_or_else(
        || "-".to_string(),
        |seen| seen.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
