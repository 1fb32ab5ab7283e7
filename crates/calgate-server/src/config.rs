//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use calgate_core::{TracingError, TracingOutputFormat};
use calgate_providers::google::{GoogleConfig, OAuthCredentials};
use thiserror::Error;

use crate::cli::Cli;
use crate::secret::SecretRef;

/// Alternate name for the redirect URI variable.
const REDIRECT_URI_FALLBACK_VAR: &str = "GOOGLE_REDIRECT_URI";

/// Errors raised while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting has no value.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A secret reference could not be resolved.
    #[error("could not resolve {setting}: {message}")]
    Secret {
        setting: &'static str,
        message: String,
    },

    /// The provider configuration is inconsistent.
    #[error("{0}")]
    Invalid(String),

    /// The log format name is unknown.
    #[error(transparent)]
    LogFormat(#[from] TracingError),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// Log output format.
    pub log_format: TracingOutputFormat,

    /// OAuth and Calendar API settings.
    pub google: GoogleConfig,
}

impl ServerConfig {
    /// Default listen port.
    pub const DEFAULT_PORT: u16 = 3000;

    /// Creates a configuration with default listen settings.
    pub fn new(google: GoogleConfig) -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: Self::DEFAULT_PORT,
            log_format: TracingOutputFormat::default(),
            google,
        }
    }

    /// Builds the configuration from parsed flags and the process environment.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::from_cli_with(cli, |name| std::env::var(name).ok())
    }

    /// Builds the configuration, reading extra variables through `lookup`.
    pub fn from_cli_with(
        cli: &Cli,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let client_id = non_empty(cli.client_id.clone()).ok_or(ConfigError::Missing("GOOGLE_CLIENT_ID"))?;

        let raw_secret = non_empty(cli.client_secret.clone())
            .ok_or(ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?;
        let client_secret = SecretRef::parse(&raw_secret)
            .resolve(&lookup)
            .map_err(|message| ConfigError::Secret {
                setting: "GOOGLE_CLIENT_SECRET",
                message,
            })?;

        let redirect_uri = non_empty(cli.redirect_uri.clone())
            .or_else(|| non_empty(lookup(REDIRECT_URI_FALLBACK_VAR)))
            .ok_or(ConfigError::Missing("REDIRECT_URI"))?;

        let mut google = GoogleConfig::new(
            OAuthCredentials::new(client_id, client_secret),
            redirect_uri,
        )
        .with_time_zone(cli.time_zone.trim())
        .with_timeout(Duration::from_secs(cli.timeout_secs));

        let scopes: Vec<String> = cli
            .scopes
            .iter()
            .map(|scope| scope.trim().to_string())
            .filter(|scope| !scope.is_empty())
            .collect();
        if !scopes.is_empty() {
            google = google.with_scopes(scopes);
        }

        google.validate().map_err(ConfigError::Invalid)?;

        Ok(Self {
            bind: cli.bind,
            port: cli.port,
            log_format: cli.log_format.parse()?,
            google,
        })
    }

    /// Builder: set the listen address.
    pub fn with_bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Builder: set the listen port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Returns the local URL users should open to start authentication.
    pub fn auth_entry_url(&self) -> String {
        format!("http://localhost:{}/auth/google", self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
