use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig, ServerError};
use server::room_registry::RegistryConfig;
use shared::{REQUIRED_PLAYERS, START_DELAY_MS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Room server for team runner sessions")]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Roster size a room needs before it can start
    #[clap(short, long, default_value_t = REQUIRED_PLAYERS, value_parser = parse_room_size)]
    required_players: usize,
    /// Delay between the start request and the shared start time, in milliseconds
    #[clap(long, default_value_t = START_DELAY_MS)]
    start_delay_ms: u64,
    /// Maximum simultaneous connections
    #[clap(long, default_value = "256")]
    max_clients: usize,
    /// Seconds of silence before a connection is dropped
    #[clap(long, default_value = "10")]
    heartbeat_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let config = ServerConfig {
        addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        heartbeat_timeout: Duration::from_secs(args.heartbeat_timeout),
        registry: RegistryConfig {
            required_players: args.required_players,
            start_delay: Duration::from_millis(args.start_delay_ms),
        },
    };

    info!(
        "Starting room server on {} ({} players per room)",
        config.addr, args.required_players
    );

    let mut server = Server::new(config).await?;
    let shutdown = server.shutdown_handle();

    let mut server_task = tokio::spawn(async move { server.run().await });

    tokio::select! {
        result = &mut server_task => {
            report(result);
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            shutdown.shutdown();
        }
    }

    report(server_task.await);
    Ok(())
}

fn parse_room_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("a room needs at least one player".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

fn report(result: Result<Result<(), ServerError>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task panicked: {}", e),
    }
}
