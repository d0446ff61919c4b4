//! Server configuration
//!
//! Read from the command line, the environment, and an optional `.env`
//! file. Every setting has a default except the speech provider
//! credentials; without them the speech proxy answers 500.

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

/// Default WebSocket address
pub const DEFAULT_WS_ADDR: &str = "127.0.0.1:5001";

/// Default speech proxy address
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:5002";

/// Default synthesis voice
pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";

/// Browser origins always allowed to call the HTTP endpoints
const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {key} '{value}': {source}")]
    InvalidAddr {
        key: &'static str,
        value: String,
        source: AddrParseError,
    },
}

/// Text-to-speech provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    pub key: String,
    pub region: String,
    pub voice: String,
    /// Overrides the regional provider URL
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// WebSocket chat listener
    pub ws_addr: SocketAddr,
    /// Speech proxy listener
    pub http_addr: SocketAddr,
    /// CORS origins for the speech proxy
    pub allowed_origins: Vec<String>,
    /// None when `SPEECH_KEY` or `SPEECH_REGION` is unset
    pub speech: Option<SpeechConfig>,
}

impl Config {
    /// Load from `.env`, the process environment and the first CLI argument
    ///
    /// The CLI argument, when given, is the WebSocket address.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_sources(std::env::args().nth(1), |key| std::env::var(key).ok())
    }

    /// Build from an address argument and a variable lookup
    pub fn from_sources(
        ws_arg: Option<String>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        let ws_addr = parse_addr(
            "WS_ADDR",
            ws_arg
                .or_else(|| var("WS_ADDR"))
                .unwrap_or_else(|| DEFAULT_WS_ADDR.to_string()),
        )?;
        let http_addr = parse_addr(
            "HTTP_ADDR",
            var("HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
        )?;

        let mut allowed_origins: Vec<String> = DEV_ORIGINS.iter().map(|o| o.to_string()).collect();
        allowed_origins.extend(var("FRONTEND_URL"));

        let speech = match (var("SPEECH_KEY"), var("SPEECH_REGION")) {
            (Some(key), Some(region)) => Some(SpeechConfig {
                key,
                region,
                voice: var("SPEECH_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string()),
                endpoint: var("SPEECH_ENDPOINT"),
            }),
            _ => None,
        };

        Ok(Self {
            ws_addr,
            http_addr,
            allowed_origins,
            speech,
        })
    }
}

fn parse_addr(key: &'static str, value: String) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::InvalidAddr { key, value, source })
}
