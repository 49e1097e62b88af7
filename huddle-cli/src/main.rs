use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use huddle::client::{
    NegotiationConfig, PeerStatus, SessionStatus, StaticMediaSource, WebRtcLinkFactory,
    start_session,
};
use huddle::server::{RoomListing, ServerConfig, SignalingServer};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle", version, about = "Room signaling relay for WebRTC peers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        /// Address to listen on. Overrides the config file.
        #[arg(long, env = "HUDDLE_BIND")]
        bind: Option<SocketAddr>,

        /// JSON server config.
        #[arg(long, env = "HUDDLE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// List rooms on a running relay.
    Rooms {
        /// Base URL of the relay's HTTP endpoints.
        #[arg(long, env = "HUDDLE_SERVER", default_value = "http://127.0.0.1:8080")]
        server: String,

        /// Show one room only.
        #[arg(long)]
        room: Option<String>,
    },

    /// Join a room as a headless participant and report negotiation status.
    Join {
        #[arg(long, env = "HUDDLE_URL", default_value = "ws://127.0.0.1:8080/ws")]
        url: String,

        #[arg(long)]
        room: String,

        /// JSON negotiation config.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { bind, config } => serve(bind, config).await,
        Commands::Rooms { server, room } => rooms(server, room).await,
        Commands::Join { url, room, config } => join(&url, room, config).await,
    }
}

async fn serve(bind: Option<SocketAddr>, config: Option<PathBuf>) -> Result<()> {
    let mut config = match config {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }

    let server = SignalingServer::bind(config).await?;
    println!(
        "{} {}",
        "Huddle relay listening on".green().bold(),
        server.local_addr()?
    );
    server.run().await
}

/// What the relay's room endpoints answered.
#[derive(Debug, PartialEq)]
enum Listing {
    Missing,
    One(RoomListing),
    All(Vec<RoomListing>),
}

async fn rooms(server: String, room: Option<String>) -> Result<()> {
    match fetch_listing(&server, room.as_deref()).await? {
        Listing::Missing => {
            println!("{} '{}'", "No such room".yellow(), room.unwrap_or_default());
        }
        Listing::One(listing) => print_room(&listing),
        Listing::All(listings) => {
            if listings.is_empty() {
                println!("{}", "No active rooms".dimmed());
            }
            for listing in &listings {
                print_room(listing);
            }
        }
    }
    Ok(())
}

async fn fetch_listing(server: &str, room: Option<&str>) -> Result<Listing> {
    let base = server.trim_end_matches('/');
    let url = match room {
        Some(code) => format!("{}/rooms/{}", base, code),
        None => format!("{}/rooms", base),
    };

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Failed to reach relay at {}", base))?;
    let status = response.status();

    if room.is_some() && status == StatusCode::NOT_FOUND {
        return Ok(Listing::Missing);
    }
    if !status.is_success() {
        bail!("Relay answered HTTP {}", status);
    }

    let listing = match room {
        Some(_) => Listing::One(response.json().await.context("Unexpected room listing")?),
        None => Listing::All(response.json().await.context("Unexpected room listing")?),
    };
    Ok(listing)
}

fn print_room(listing: &RoomListing) {
    println!(
        "{} {}",
        listing.room.as_str().cyan().bold(),
        format!("({} members)", listing.members.len()).dimmed()
    );
    for member in &listing.members {
        println!("   {}", member);
    }
}

async fn join(url: &str, room: String, config: Option<PathBuf>) -> Result<()> {
    let config = match config {
        Some(path) => NegotiationConfig::from_json_file(path)?,
        None => NegotiationConfig::default(),
    };
    let factory = WebRtcLinkFactory::new().context("Failed to set up WebRTC")?;
    let media = StaticMediaSource::audio_video("huddle-cli");

    let (handle, mut session) =
        start_session(url, config, Arc::new(factory), Arc::new(media)).await?;
    handle.join(room.as_str())?;
    println!("{} '{}'", "Joining room".green().bold(), room);

    let mut updates = handle.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().clone();
                print_status(&status);
                if !status.running {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Leaving...".yellow());
                let _ = handle.leave();
                let _ = handle.shutdown();
            }
            result = &mut session => {
                result.context("Session task panicked")??;
                break;
            }
        }
    }
    Ok(())
}

fn print_status(status: &SessionStatus) {
    if let Some(error) = status.local_media_error {
        println!("{} {}", "Local media failed:".red().bold(), error);
        return;
    }
    for (remote, peer) in &status.peers {
        let label = match peer.status {
            PeerStatus::Connected => "connected".green(),
            PeerStatus::Negotiating => "negotiating".cyan(),
            PeerStatus::Stalled => "stalled".yellow(),
            PeerStatus::Failed => "failed".red(),
            PeerStatus::Closed => "closed".dimmed(),
        };
        println!(
            "   {} {} ({}, retries {})",
            remote, label, peer.state, peer.retry_count
        );
    }
}
