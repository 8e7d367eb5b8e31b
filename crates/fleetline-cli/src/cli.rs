//! Argument parsing and command dispatch for the Fleetline CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, TelemetryEmitter, build_context};
use crate::commands::auth::{handle_login, handle_logout, handle_me, handle_register};
use crate::commands::devices::{
    handle_device_add, handle_device_list, handle_device_remove, handle_device_update,
};
use crate::gate::{enforce, policy_for};

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and handles
/// telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    init_tracing();
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let telemetry = TelemetryEmitter::from_env();

    let result = match build_context(&cli) {
        Ok(ctx) => dispatch(cli, &ctx).await,
        Err(err) => Err(err),
    };

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                command_name,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

async fn dispatch(cli: Cli, ctx: &AppContext) -> CliResult<()> {
    enforce(
        policy_for(&cli.command),
        ctx.api.session().is_authenticated(),
    )?;

    match cli.command {
        Command::Register(args) => handle_register(ctx, args).await,
        Command::Login(args) => handle_login(ctx, args).await,
        Command::Logout => handle_logout(ctx),
        Command::Me => handle_me(ctx, cli.output).await,
        Command::Device(device) => match device {
            DeviceCommand::Ls => handle_device_list(ctx, cli.output).await,
            DeviceCommand::Add(args) => handle_device_add(ctx, args).await,
            DeviceCommand::Update(args) => handle_device_update(ctx, args).await,
            DeviceCommand::Rm(args) => handle_device_remove(ctx, args).await,
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "fleetline",
    about = "Operator CLI for the Fleetline device-management platform"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "FLEETLINE_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "FLEETLINE_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "FLEETLINE_TOKEN_FILE",
        help = "Path of the persisted session-token file (defaults to ~/.config/fleetline/token)"
    )]
    pub(crate) token_file: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create an account and start a session.
    Register(RegisterArgs),
    /// Sign in and store the session token.
    Login(LoginArgs),
    /// Drop the stored session token.
    Logout,
    /// Show the signed-in user's profile.
    Me,
    /// Manage the device inventory.
    #[command(subcommand)]
    Device(DeviceCommand),
}

#[derive(Subcommand)]
pub(crate) enum DeviceCommand {
    /// List the device inventory.
    Ls,
    /// Register a new device.
    Add(DeviceAddArgs),
    /// Replace an existing device record.
    Update(DeviceUpdateArgs),
    /// Remove a device.
    Rm(DeviceRemoveArgs),
}

#[derive(Args)]
pub(crate) struct RegisterArgs {
    #[arg(long)]
    pub(crate) username: String,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long, help = "Account password; prompted for when omitted")]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long, help = "Account password; prompted for when omitted")]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct DeviceAddArgs {
    #[arg(help = "Human-readable device name")]
    pub(crate) name: String,
    #[arg(
        short = 'f',
        long = "methods-file",
        help = "JSON file describing the device's methods"
    )]
    pub(crate) methods_file: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct DeviceUpdateArgs {
    #[arg(help = "Device identifier")]
    pub(crate) id: Uuid,
    #[arg(long, help = "Replacement device name")]
    pub(crate) name: String,
    #[arg(
        short = 'f',
        long = "methods-file",
        help = "JSON file describing the device's methods"
    )]
    pub(crate) methods_file: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct DeviceRemoveArgs {
    #[arg(help = "Device identifier")]
    pub(crate) id: Uuid,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Register(_) => "register",
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Me => "me",
        Command::Device(DeviceCommand::Ls) => "device_ls",
        Command::Device(DeviceCommand::Add(_)) => "device_add",
        Command::Device(DeviceCommand::Update(_)) => "device_update",
        Command::Device(DeviceCommand::Rm(_)) => "device_rm",
    }
}

fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}
