//! BlazeKV server binary.
//!
//! Binds the listening socket, starts the TTL reaper, and accepts
//! connections until interrupted.

use anyhow::Context;
use blazekv::commands::CommandHandler;
use blazekv::connection::{handle_connection, ClientLimiter};
use blazekv::pubsub::PubSubRouter;
use blazekv::storage::{start_reaper, Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration.
struct Config {
    /// Port to listen on.
    port: u16,
}

impl Config {
    /// Parses the command line: one optional positional argument, the port.
    fn from_args() -> Self {
        let mut args = std::env::args().skip(1);
        let port = match args.next() {
            None => blazekv::DEFAULT_PORT,
            Some(raw) => match raw.parse() {
                Ok(port) => port,
                Err(_) => {
                    eprintln!("blazekv: invalid port '{raw}'");
                    std::process::exit(1);
                }
            },
        };
        if args.next().is_some() {
            eprintln!("usage: blazekv [port]");
            std::process::exit(1);
        }
        Self { port }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let store = Arc::new(Store::new());
    let router = Arc::new(PubSubRouter::new());
    let limiter = Arc::new(ClientLimiter::new(blazekv::MAX_CLIENTS));
    let reaper = start_reaper(Arc::clone(&store));
    let handler = CommandHandler::new(store, router, Arc::clone(&limiter));

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!(
        port = config.port,
        max_clients = limiter.capacity(),
        version = blazekv::VERSION,
        "blazekv listening"
    );

    tokio::select! {
        _ = accept_loop(listener, handler, limiter) => {}
        _ = signal::ctrl_c() => info!("shutdown signal received"),
    }

    reaper.stop();
    info!("server shutdown complete");
    Ok(())
}

/// Accepts connections forever, spawning one worker per client.
async fn accept_loop(listener: TcpListener, handler: CommandHandler, limiter: Arc<ClientLimiter>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    handler.clone(),
                    Arc::clone(&limiter),
                ));
            }
            Err(e) => error!(error = %e, "failed to accept connection"),
        }
    }
}
