//! Command-line interface definition.
//!
//! Every flag can also come from the environment (or a `.env` file), which is
//! how the service is normally configured.

use std::net::IpAddr;

use clap::Parser;

use calgate_providers::google::GoogleConfig;

/// calgate - Google Calendar free/busy and event gateway
#[derive(Debug, Parser)]
#[command(name = "calgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// OAuth client ID
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret (supports env::VAR and pass::path references)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Redirect URI registered for the OAuth client (falls back to GOOGLE_REDIRECT_URI)
    #[arg(long, env = "REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Port to listen on
    #[arg(long, short, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "CALGATE_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Log output format: pretty, compact or json
    #[arg(long, env = "CALGATE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Timezone attached to created events
    #[arg(long, env = "CALGATE_TIMEZONE", default_value = GoogleConfig::DEFAULT_TIME_ZONE)]
    pub time_zone: String,

    /// Timeout in seconds for each call to Google
    #[arg(long, env = "CALGATE_TIMEOUT_SECS", default_value_t = GoogleConfig::DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// OAuth scopes to request (comma-separated)
    #[arg(long, env = "CALGATE_SCOPES", value_delimiter = ',')]
    pub scopes: Vec<String>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Print the consent URL and exit
    #[arg(long)]
    pub print_auth_url: bool,
}
