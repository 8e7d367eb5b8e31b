//! Account command handlers: register, login, logout, me.

use std::io::{self, IsTerminal};

use fleetline_api_models::{LoginPayload, RegisterPayload};

use crate::cli::{LoginArgs, OutputFormat, RegisterArgs};
use crate::client::{AppContext, CliError, CliResult, classify_client_error};
use crate::output::render_user;

pub(crate) async fn handle_register(ctx: &AppContext, args: RegisterArgs) -> CliResult<()> {
    let username = args.username.trim();
    if username.is_empty() {
        return Err(CliError::validation("username must not be empty"));
    }
    let password = resolve_password(args.password)?;

    let payload = RegisterPayload {
        username: username.to_string(),
        email: args.email.trim().to_string(),
        password,
    };
    ctx.auth
        .register(&payload)
        .await
        .map_err(classify_client_error)?;

    println!("Account created; session started for '{username}'.");
    Ok(())
}

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    let password = resolve_password(args.password)?;
    let payload = LoginPayload {
        email: args.email.trim().to_string(),
        password,
    };
    ctx.auth
        .login(&payload)
        .await
        .map_err(classify_client_error)?;

    // Best-effort greeting; the session is established either way.
    match ctx.store.fetch_user().await {
        Ok(user) => println!("Signed in as {}.", user.username),
        Err(err) => {
            tracing::debug!(error = %err, "profile fetch after login failed");
            println!("Signed in.");
        }
    }
    Ok(())
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    ctx.auth.logout();
    ctx.store.clear_user();
    println!("Signed out; session token removed.");
    Ok(())
}

pub(crate) async fn handle_me(ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    let user = ctx
        .store
        .fetch_user()
        .await
        .map_err(classify_client_error)?;
    render_user(&user, output)
}

fn resolve_password(flag: Option<String>) -> CliResult<String> {
    if let Some(value) = flag {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        return Ok(trimmed.to_string());
    }

    if io::stdin().is_terminal() {
        let pass = rpassword::prompt_password("Password: ")
            .map_err(|err| CliError::failure(anyhow::anyhow!("failed to read password: {err}")))?;
        let trimmed = pass.trim();
        if trimmed.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        Ok(trimmed.to_string())
    } else {
        Err(CliError::validation(
            "password required; supply via --password when running non-interactively",
        ))
    }
}
