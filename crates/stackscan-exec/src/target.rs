//! Target endpoints and credential material

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// How to authenticate against a target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Private-key authentication (the default)
    #[default]
    Key,
    /// Password authentication
    Password,
}

/// A sensitive value such as a password or key passphrase
///
/// The plaintext is only reachable through [`Secret::expose`], stays out of
/// `Debug` output, and is never serialized back out, so it cannot end up in
/// logs or saved artifacts.
#[derive(Clone, Deserialize)]
pub struct Secret(String);

impl Secret {
    /// Wrap a plaintext secret
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the plaintext for the call that needs it
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

/// One remote target: endpoint plus how to authenticate against it
///
/// Produced by config loading with defaults already applied, immutable for
/// the rest of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    /// Display name, defaults to the host address
    #[serde(default)]
    pub name: String,
    /// Host address
    pub host: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// SSH user
    #[serde(default = "default_user")]
    pub user: String,
    /// Authentication mode
    #[serde(default)]
    pub auth: AuthMode,
    /// Private key path for key auth
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// Passphrase for a protected private key
    #[serde(default)]
    pub key_passphrase: Option<Secret>,
    /// Password for password auth; prompted for when absent
    #[serde(default)]
    pub password: Option<Secret>,
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    "root".to_string()
}

impl TargetSpec {
    /// Create a spec for `host` with default port, user and auth mode
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            name: host.clone(),
            host,
            port: default_port(),
            user: default_user(),
            auth: AuthMode::Key,
            key_path: None,
            key_passphrase: None,
            password: None,
        }
    }

    /// Set a custom SSH port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the SSH user
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// `user@host:port` label used in banners and logs
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }

    /// Fill derivable fields: an empty name becomes the host address and
    /// key-auth targets without a key fall back to the conventional path
    pub fn apply_defaults(&mut self) {
        if self.name.is_empty() {
            self.name = self.host.clone();
        }
        if self.auth == AuthMode::Key && self.key_path.is_none() {
            self.key_path = Some(crate::auth::default_key_path());
        }
    }
}
