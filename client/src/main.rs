use clap::{Parser, ValueEnum};
use client::app::{App, AppConfig, TICK_INTERVAL};
use client::hud::LogHud;
use client::session::{Mode, SessionConfig, SessionStatus, DEFAULT_ROOM};
use log::info;
use shared::{now_millis, DURATION_SECONDS, REQUIRED_PLAYERS};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Solo,
    Team,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless runner client", long_about = None)]
struct Args {
    /// Play alone or join a team room
    #[arg(short, long, value_enum, default_value_t = ModeArg::Solo)]
    mode: ModeArg,

    /// Room server address
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name in the room (defaults to "Agent <id>")
    #[arg(short, long, default_value = "")]
    name: String,

    /// Team room to join
    #[arg(long, default_value = DEFAULT_ROOM)]
    room: String,

    /// Level seed (defaults to the current time)
    #[arg(long)]
    seed: Option<u64>,

    /// Roster size the server expects; used to decide when to ask for the start
    #[arg(long, default_value_t = REQUIRED_PLAYERS)]
    required_players: usize,

    /// Round length in seconds
    #[arg(short, long, default_value_t = DURATION_SECONDS)]
    duration: u32,

    /// Chance the autopilot answers a quiz correctly
    #[arg(long, default_value_t = 0.7)]
    accuracy: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info to see the HUD");
    }

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(now_millis);

    let config = AppConfig {
        mode: match args.mode {
            ModeArg::Solo => Mode::Solo,
            ModeArg::Team => Mode::Team,
        },
        server: args.server,
        name: args.name,
        seed,
        required_players: args.required_players,
        accuracy: args.accuracy,
        tick_interval: TICK_INTERVAL,
        session: SessionConfig {
            room_id: args.room,
            duration_secs: args.duration,
            seed,
            ..SessionConfig::default()
        },
    };

    info!("Starting {:?} round with seed {}", config.mode, seed);

    let mut app = App::new(config, LogHud::new());
    let frame = app.run().await?;

    match frame.status {
        SessionStatus::Victory => println!("Mission complete. Score: {}", frame.score),
        SessionStatus::GameOver => println!("Mission failed. Score: {}", frame.score),
        SessionStatus::Leaderboard => {
            println!("Final standings:");
            for (rank, player) in frame.roster.iter().enumerate() {
                println!("{:>2}. {:<20} {:>4}", rank + 1, player.name, player.score);
            }
        }
        _ => {
            if let Some(error) = frame.error {
                println!("Could not play: {}", error);
            }
        }
    }

    Ok(())
}
