//! LudoMaster terminal client.
//!
//! Plays solo against the scripted opponent or joins a networked game,
//! reading commands from stdin.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ludomaster_state::api::{ApiClient, LoginRequest};
use ludomaster_state::driver::{GameSession, Intent, Update};
use ludomaster_state::state::{AppState, FileCredentialStore, GameStore, HOME_PROGRESS};
use ludomaster_state::transport::SocketEvent;
use ludomaster_state::ClientConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ludomaster")]
#[command(about = "Terminal client for LudoMaster Ludo")]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding saved credentials
    #[arg(long, global = true)]
    auth_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play against the scripted opponent
    Solo,

    /// Join a multiplayer game
    Join {
        /// Room id
        room: String,

        /// Room password, for private rooms
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in and save the credential
    Login {
        #[arg(long)]
        identifier: String,

        #[arg(long)]
        password: String,
    },

    /// List open rooms
    Rooms,
}

const HELP: &str = "commands: roll | move <1-4> | say <text> | quit";

/// Parse one stdin line. `None` for unknown input.
fn parse_command(line: &str) -> Option<Intent> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    match word {
        "roll" | "r" => Some(Intent::Roll),
        "move" | "m" => {
            let piece: usize = rest.trim().parse().ok()?;
            (1..=4).contains(&piece).then(|| Intent::Move(piece - 1))
        }
        "say" if !rest.trim().is_empty() => Some(Intent::Chat(rest.trim().to_string())),
        "quit" | "q" | "leave" => Some(Intent::Leave),
        _ => None,
    }
}

fn render(game: &GameStore) -> String {
    let mut out = String::new();
    for (i, player) in game.players().iter().enumerate() {
        let marker = if i == game.turn() { '>' } else { ' ' };
        let pieces: Vec<String> = player.pieces.iter().map(|p| format!("{:>2}", p)).collect();
        out.push_str(&format!(
            "{} {:<6} [{}]  {}/4 home\n",
            marker,
            player.id.as_str(),
            pieces.join(" "),
            player.pieces_home()
        ));
    }
    let dice = game.dice().map_or("-".to_string(), |d| d.to_string());
    out.push_str(&format!("dice: {}   (home at {})\n", dice, HOME_PROGRESS));
    for entry in game.recent_log() {
        out.push_str(&format!("  {}\n", entry.message));
    }
    out
}

/// Forward stdin lines as intents until EOF or `quit`.
fn spawn_stdin(tx: mpsc::UnboundedSender<Intent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            match parse_command(&line) {
                Some(intent) => {
                    let leave = intent == Intent::Leave;
                    if tx.send(intent).is_err() || leave {
                        return;
                    }
                }
                None => println!("{}", HELP),
            }
        }
        let _ = tx.send(Intent::Leave);
    });
}

async fn play(mut session: GameSession) {
    let (tx, rx) = mpsc::unbounded_channel();
    spawn_stdin(tx);
    println!("{}", HELP);
    println!("{}", render(session.store()));

    session
        .run(rx, |update| match update {
            Update::Changed(game) => println!("{}", render(game)),
            Update::Rejected(e) => println!("! {}", e),
            Update::Connection(SocketEvent::Open) => println!("* connected"),
            Update::Connection(SocketEvent::Reconnecting { attempt, delay }) => {
                println!("* connection lost, retry {} in {:.1}s", attempt, delay.as_secs_f64())
            }
            Update::Connection(SocketEvent::Closed) => println!("* disconnected"),
            Update::Connection(SocketEvent::Message(_)) => {}
        })
        .await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise warnings only
    let default_filter = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ClientConfig::from_env();
    let mut app = AppState::default();
    let store = args.auth_dir.as_ref().map(FileCredentialStore::in_dir);
    if let Some(store) = &store {
        app.auth.load_from(store)?;
    }
    let api = ApiClient::new(&config, app.auth.shared_token().clone())?;
    info!(api_base = %config.api_base, signed_in = app.auth.is_signed_in(), "starting");

    match args.command {
        Command::Solo => {
            if app.auth.is_signed_in() {
                if let Err(e) = api.start_solo().await {
                    warn!(error = %e, "could not register solo game");
                }
            }
            play(GameSession::solo(&config)).await;
        }
        Command::Join { room, password } => {
            let payload = ludomaster_state::api::JoinRoom { password };
            if let Err(e) = api.join_room(&room, &payload).await {
                warn!(error = %e, room = %room, "join request failed");
            }
            let token = app.auth.token();
            let session = GameSession::connect(&config, &room, token.as_deref())?;
            play(session).await;
            if let Err(e) = api.leave_room(&room).await {
                warn!(error = %e, room = %room, "leave request failed");
            }
        }
        Command::Login {
            identifier,
            password,
        } => {
            let user = app
                .auth
                .login(&api, &LoginRequest { identifier, password })
                .await?;
            let name = user.as_ref().map_or("unknown user", |u| u.label());
            println!("signed in as {}", name);
            match &store {
                Some(store) => app.auth.save_to(store)?,
                None => println!("(not saved; pass --auth-dir to keep the credential)"),
            }
        }
        Command::Rooms => {
            app.rooms.fetch(&api).await;
            if let Some(error) = &app.rooms.error {
                println!("{}", error);
            }
            for room in app.rooms.rooms() {
                let lock = if room.is_private { " (private)" } else { "" };
                println!(
                    "{:<24} {}{}  {}",
                    room.id.as_deref().unwrap_or("?"),
                    room.name,
                    lock,
                    room.occupancy()
                );
            }
        }
    }
    Ok(())
}
