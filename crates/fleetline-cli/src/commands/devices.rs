//! Device inventory command handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use fleetline_api_models::{DevicePayload, Method};

use crate::cli::{DeviceAddArgs, DeviceRemoveArgs, DeviceUpdateArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, classify_client_error};
use crate::output::render_device_list;

pub(crate) async fn handle_device_list(ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    let devices = ctx.devices.list().await.map_err(classify_client_error)?;
    render_device_list(&devices, output)
}

pub(crate) async fn handle_device_add(ctx: &AppContext, args: DeviceAddArgs) -> CliResult<()> {
    let DeviceAddArgs { name, methods_file } = args;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::validation("device name must not be empty"));
    }
    let methods = read_methods(methods_file.as_deref())?;

    let payload = DevicePayload {
        name: name.to_string(),
        methods,
    };
    let device = ctx
        .devices
        .create(&payload)
        .await
        .map_err(classify_client_error)?;

    println!("Device registered (guid: {})", device.device_guid);
    Ok(())
}

pub(crate) async fn handle_device_update(ctx: &AppContext, args: DeviceUpdateArgs) -> CliResult<()> {
    let DeviceUpdateArgs {
        id,
        name,
        methods_file,
    } = args;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::validation("device name must not be empty"));
    }
    let methods = read_methods(methods_file.as_deref())?;

    let payload = DevicePayload {
        name: name.to_string(),
        methods,
    };
    let device = ctx
        .devices
        .update(id, &payload)
        .await
        .map_err(classify_client_error)?;

    println!("Device updated (guid: {})", device.device_guid);
    Ok(())
}

pub(crate) async fn handle_device_remove(ctx: &AppContext, args: DeviceRemoveArgs) -> CliResult<()> {
    let DeviceRemoveArgs { id } = args;
    ctx.devices.remove(id).await.map_err(classify_client_error)?;

    println!("Device removed (guid: {id})");
    Ok(())
}

fn read_methods(path: Option<&Path>) -> CliResult<Vec<Method>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };

    let payload = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
        .map_err(CliError::failure)?;

    serde_json::from_str(&payload)
        .map_err(|err| CliError::failure(anyhow!("methods file is not valid JSON: {err}")))
}
