//! Anonymous 1:1 WebSocket Chat Server - Entry Point
//!
//! Starts the ChatBroker actor, the speech proxy, and the WebSocket
//! accept loop.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use anon_chat_server::{handle_connection, speech, ChatBroker, Config, SpeechState};

/// Channel buffer size for broker commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=anon_chat_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anon_chat_server=info")),
        )
        .init();

    let config = Config::load()?;

    // Speech proxy
    if config.speech.is_none() {
        info!("SPEECH_KEY/SPEECH_REGION not set, speech synthesis disabled");
    }
    let app = speech::router(SpeechState::new(config.speech.clone()))
        .layer(speech::cors_layer(&config.allowed_origins));
    let http_listener = TcpListener::bind(config.http_addr).await?;
    info!("Speech proxy listening on {}", config.http_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            error!("Speech proxy stopped: {}", e);
        }
    });

    // Start TCP listener
    let listener = TcpListener::bind(config.ws_addr).await?;
    info!("WebSocket Chat Server listening on {}", config.ws_addr);

    // Create ChatBroker actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let broker = ChatBroker::new(cmd_rx);
    tokio::spawn(broker.run());

    info!("ChatBroker actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
