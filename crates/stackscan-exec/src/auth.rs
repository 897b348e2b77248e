//! Credential resolution for target authentication

use std::path::PathBuf;

use tracing::debug;

use crate::error::ExecError;
use crate::target::{AuthMode, Secret, TargetSpec};

/// Auth material resolved for a single connection attempt
///
/// Built right before `connect` and consumed by it, so secrets never outlive
/// the attempt they were resolved for.
#[derive(Debug)]
pub enum ResolvedAuth {
    /// Private key, optionally passphrase-protected
    Key {
        path: PathBuf,
        passphrase: Option<Secret>,
    },
    /// Password, supplied by config or just prompted for
    Password(Secret),
}

/// Resolve the auth material for `spec`
///
/// Key auth falls back to the conventional key path when none is configured;
/// password auth prompts on the terminal when the config carries no password.
///
/// # Errors
/// Returns [`ExecError::AuthenticationFailed`] when the password prompt
/// cannot be read.
pub fn resolve_auth(spec: &TargetSpec) -> Result<ResolvedAuth, ExecError> {
    match spec.auth {
        AuthMode::Key => {
            let path = spec.key_path.clone().unwrap_or_else(default_key_path);
            debug!(key = %path.display(), "using private key authentication");
            Ok(ResolvedAuth::Key {
                path,
                passphrase: spec.key_passphrase.clone(),
            })
        }
        AuthMode::Password => {
            let password = match &spec.password {
                Some(secret) => secret.clone(),
                None => prompt_password(spec)?,
            };
            Ok(ResolvedAuth::Password(password))
        }
    }
}

/// Conventional private key location, `~/.ssh/id_rsa`
pub(crate) fn default_key_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ssh")
        .join("id_rsa")
}

fn prompt_password(spec: &TargetSpec) -> Result<Secret, ExecError> {
    let prompt = format!("  Password for {}@{}: ", spec.user, spec.host);
    rpassword::prompt_password(prompt)
        .map(Secret::new)
        .map_err(|e| ExecError::AuthenticationFailed(format!("password prompt failed: {e}")))
}
