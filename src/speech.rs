//! Speech synthesis proxy
//!
//! A stateless HTTP endpoint that turns text into MP3 audio by forwarding
//! it to Azure's text-to-speech REST API. The chat broker does not depend
//! on it.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, warn};

use crate::config::SpeechConfig;

/// Audio format requested from the provider
pub const OUTPUT_FORMAT: &str = "audio-16khz-32kbitrate-mono-mp3";

/// Speech proxy errors, each mapped to an HTTP status
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Missing or invalid 'text'")]
    InvalidText,

    #[error("Speech service credentials not configured")]
    NotConfigured,

    #[error("Speech provider unreachable: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Speech provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("No audio data returned")]
    EmptyAudio,
}

impl SpeechError {
    pub fn status(&self) -> StatusCode {
        match self {
            SpeechError::InvalidText => StatusCode::BAD_REQUEST,
            SpeechError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            SpeechError::Request(_) | SpeechError::Provider { .. } | SpeechError::EmptyAudio => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for SpeechError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Client for the text-to-speech provider
#[derive(Debug, Clone)]
pub struct SpeechClient {
    http: reqwest::Client,
    config: SpeechConfig,
}

impl SpeechClient {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Provider URL, regional unless overridden
    pub fn endpoint(&self) -> String {
        match &self.config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.config.region
            ),
        }
    }

    /// Synthesize `text` into MP3 bytes
    pub async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("Ocp-Apim-Subscription-Key", &self.config.key)
            .header(header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(header::USER_AGENT, env!("CARGO_PKG_NAME"))
            .body(ssml(text, &self.config.voice))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Provider {
                status: status.as_u16(),
                message: if message.is_empty() {
                    "Synthesis canceled".to_string()
                } else {
                    message
                },
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio)
    }
}

/// Shared state of the speech routes
#[derive(Debug, Clone, Default)]
pub struct SpeechState {
    client: Option<SpeechClient>,
}

impl SpeechState {
    /// State for the given provider settings; None leaves synthesis unconfigured
    pub fn new(config: Option<SpeechConfig>) -> Self {
        Self {
            client: config.map(SpeechClient::new),
        }
    }
}

/// Routes of the speech proxy
pub fn router(state: SpeechState) -> Router {
    Router::new()
        .route("/synthesize-speech", post(synthesize_speech))
        .route("/api/synthesize-speech", post(synthesize_speech))
        .with_state(state)
}

/// CORS policy for browser clients served from `origins`
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// `POST /synthesize-speech` with `{"text": "..."}`
pub async fn synthesize_speech(
    State(state): State<SpeechState>,
    body: Bytes,
) -> Result<Response, SpeechError> {
    let text = parse_text(&body)?;
    let client = state.client.as_ref().ok_or(SpeechError::NotConfigured)?;

    let audio = client.synthesize(&text).await.inspect_err(|e| {
        warn!("Speech synthesis failed: {}", e);
    })?;
    debug!("Synthesized {} bytes of audio", audio.len());

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
        (header::CONTENT_LENGTH, HeaderValue::from(audio.len())),
    ];
    Ok((StatusCode::OK, headers, audio).into_response())
}

/// Non-blank `text` field of a JSON body
fn parse_text(body: &[u8]) -> Result<String, SpeechError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| SpeechError::InvalidText)?;
    value
        .get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or(SpeechError::InvalidText)
}

/// SSML document speaking `text` with `voice`
fn ssml(text: &str, voice: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='en-US'><voice name='{}'>{}</voice></speak>",
        xml_escape(voice),
        xml_escape(text)
    )
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
