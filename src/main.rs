use std::path::PathBuf;

use clap::Parser;
use skylark_common::ChatEvent;
use skylark_store::MessageStore;
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
struct Args {
    /// WebSocket endpoint of the chat backend; without one, the client
    /// runs on locally generated events.
    #[arg(long)]
    socket_url: Option<String>,
    /// REST endpoint, used to log in before connecting.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, requires = "api_url")]
    email: Option<String>,
    #[arg(long, requires = "email")]
    password: Option<String>,
    /// Where tokens are kept between runs.
    #[arg(long)]
    token_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let log_file = std::sync::Mutex::new(std::fs::File::create("skylark.log")?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(log_file))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Some(api_url) = &args.api_url {
        let tokens = match &args.token_file {
            Some(path) => skylark_api::TokenStore::at_path(path),
            None => skylark_api::TokenStore::in_memory(),
        };
        let mut api = skylark_api::ApiClient::new(api_url.clone(), tokens);
        if let (Some(email), Some(password)) = (&args.email, &args.password) {
            api.login(email, password).await?;
        }
        let profile = api.me().await?;
        tracing::info!(id = %profile.id, email = %profile.email, "logged in");
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = match &args.socket_url {
        Some(url) => Some(skylark_socket::connect(url, tx).await?),
        None => {
            tokio::spawn(skylark_fake_events::event_sender(tx));
            None
        }
    };
    run(rx).await?;
    if let Some(subscription) = subscription {
        subscription.close().await;
    }
    Ok(())
}

/// Applies each inbound event to the session's store, printing messages
/// as they land.
async fn run(mut events: mpsc::UnboundedReceiver<ChatEvent>) -> color_eyre::Result<()> {
    let mut store = MessageStore::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(ChatEvent::Message(raw)) => {
                    let message = raw.into_message(chrono::Utc::now());
                    println!(
                        "{} / {} / {} ({})\n{}",
                        message.created_at,
                        message.chat_id,
                        message.sender.name,
                        message.sender.id,
                        message.content.as_deref().unwrap_or("<attachment>"),
                    );
                    store.append(message);
                }
                Some(ChatEvent::Reaction(ev)) => {
                    tracing::debug!(message_id = %ev.message_id, emoji = %ev.emoji, "reaction");
                    store.add_reaction(ev.message_id, ev.chat_id, ev.emoji, ev.user_id);
                }
                Some(ChatEvent::Read(ev)) => {
                    tracing::debug!(message_id = %ev.message_id, user_id = %ev.user_id, "read receipt");
                    store.mark_read(ev.message_id, ev.user_id);
                }
                Some(ChatEvent::Unknown) => {}
                None => break,
            },
        }
    }
    Ok(())
}
