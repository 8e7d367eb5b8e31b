//! Per-command access gating, mirroring the web client's route guards:
//! inventory and profile commands require a stored session token, sign-in
//! commands require its absence.

use crate::cli::Command;
use crate::client::{CliError, CliResult};

/// Access requirement a command declares before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccessPolicy {
    /// A session token must be present.
    RequiresSession,
    /// No session token may be present.
    RequiresGuest,
    /// Runs regardless of session state.
    Open,
}

pub(crate) const fn policy_for(command: &Command) -> AccessPolicy {
    match command {
        Command::Register(_) | Command::Login(_) => AccessPolicy::RequiresGuest,
        Command::Me | Command::Device(_) => AccessPolicy::RequiresSession,
        Command::Logout => AccessPolicy::Open,
    }
}

/// Check a command's policy against the current session state, pointing the
/// operator at the corrective command on a violation.
pub(crate) fn enforce(policy: AccessPolicy, authenticated: bool) -> CliResult<()> {
    match policy {
        AccessPolicy::Open => Ok(()),
        AccessPolicy::RequiresSession if authenticated => Ok(()),
        AccessPolicy::RequiresSession => Err(CliError::validation(
            "no active session; run `fleetline login` first",
        )),
        AccessPolicy::RequiresGuest if !authenticated => Ok(()),
        AccessPolicy::RequiresGuest => Err(CliError::validation(
            "a session is already active; run `fleetline logout` first",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{DeviceCommand, LoginArgs};

    #[test]
    fn session_commands_require_a_token() {
        assert!(enforce(AccessPolicy::RequiresSession, true).is_ok());
        let err = enforce(AccessPolicy::RequiresSession, false).expect_err("gate rejects");
        assert!(matches!(err, CliError::Validation(message) if message.contains("login")));
    }

    #[test]
    fn guest_commands_require_no_token() {
        assert!(enforce(AccessPolicy::RequiresGuest, false).is_ok());
        let err = enforce(AccessPolicy::RequiresGuest, true).expect_err("gate rejects");
        assert!(matches!(err, CliError::Validation(message) if message.contains("logout")));
    }

    #[test]
    fn open_commands_always_pass() {
        assert!(enforce(AccessPolicy::Open, true).is_ok());
        assert!(enforce(AccessPolicy::Open, false).is_ok());
    }

    #[test]
    fn policies_match_command_groups() {
        assert_eq!(
            policy_for(&Command::Login(LoginArgs {
                email: "ops@example.com".to_string(),
                password: None,
            })),
            AccessPolicy::RequiresGuest
        );
        assert_eq!(
            policy_for(&Command::Device(DeviceCommand::Ls)),
            AccessPolicy::RequiresSession
        );
        assert_eq!(policy_for(&Command::Me), AccessPolicy::RequiresSession);
        assert_eq!(policy_for(&Command::Logout), AccessPolicy::Open);
    }
}
