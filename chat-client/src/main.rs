use anyhow::Result;
use chat::RoomId;
use chat_client::reconciler::DEFAULT_DEDUP_WINDOW_SECS;
use chat_client::{ApiClient, ChatSession, Reconciled, Update};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};

mod output;

/// How often a disconnected session tries to reach the server again.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "chat-client")]
#[command(about = "Terminal client for skillshare chat rooms")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:5000)
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// Room to join on startup
    #[arg(long, default_value = "general")]
    room: String,

    /// Log in with this email before joining
    #[arg(long, requires = "password")]
    email: Option<String>,

    /// Password for --email
    #[arg(long, requires = "email")]
    password: Option<String>,

    /// How long after sending a message its echo is still matched to it
    #[arg(long, default_value_t = DEFAULT_DEDUP_WINDOW_SECS)]
    dedup_window_secs: i64,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Say(String),
    Room(RoomId),
    Login { email: String, password: String },
    Logout,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("room"), Some(room), None) => RoomId::parse(room)
            .map(|room_id| Some(Command::Room(room_id)))
            .map_err(|err| err.to_string()),
        (Some("login"), Some(email), Some(password)) => Ok(Some(Command::Login {
            email: email.to_string(),
            password: password.to_string(),
        })),
        (Some("logout"), None, None) => Ok(Some(Command::Logout)),
        (Some("quit"), None, None) => Ok(Some(Command::Quit)),
        _ => Err(format!(
            "Unknown command: /{command} (try /room <id>, /login <email> <password>, /logout, /quit)"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let api = ApiClient::new(reqwest::Client::new(), cli.base_url.clone());
    let room_id = RoomId::parse(cli.room.as_str()).map_err(|err| anyhow::anyhow!("{err}"))?;
    let dedup_window = chrono::Duration::seconds(cli.dedup_window_secs.max(0));

    let mut session = ChatSession::open(api.base_url(), room_id, dedup_window).await?;

    if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
        let login = api.login(email, password).await?;
        if let Err(err) = session.login(login.token, login.identity).await {
            output::print_error(&format!("{err:#}; messages will be kept as unsent"));
        }
    }

    output::print_status(&format!(
        "Joined {} as {}",
        session.room_id(),
        session.identity().display_name()
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut cursor = 0;
    let mut retry = interval(RECONNECT_INTERVAL);
    retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Say(text))) => {
                        session.send(&text);
                    }
                    Ok(Some(Command::Room(room_id))) => {
                        session.switch_room(room_id);
                        cursor = 0;
                        output::print_status(&format!("Now in {}", session.room_id()));
                    }
                    Ok(Some(Command::Login { email, password })) => {
                        match api.login(&email, &password).await {
                            Ok(login) => {
                                if let Err(err) = session.login(login.token, login.identity).await {
                                    output::print_error(&format!("{err:#}; messages will be kept as unsent"));
                                }
                                cursor = 0;
                            }
                            Err(err) => output::print_error(&err.to_string()),
                        }
                    }
                    Ok(Some(Command::Logout)) => {
                        if let Err(err) = session.logout().await {
                            output::print_error(&format!("{err:#}; messages will be kept as unsent"));
                        }
                        cursor = 0;
                        output::print_status("Logged out; chatting anonymously");
                    }
                    Ok(Some(Command::Quit)) => break,
                    Err(message) => output::print_error(&message),
                }
            }
            update = session.next_update() => match update {
                Update::Message(Reconciled::Confirmed(index)) => {
                    if let Some(entry) = session.reconciler().get(index) {
                        output::print_confirmation(entry);
                    }
                }
                Update::Message(_) => {}
                Update::IdentityBound(identity) => {
                    output::print_status(&format!("Signed in as {}", identity.username));
                }
                Update::ServerError(reason) => output::print_error(&reason),
                Update::Disconnected => {
                    output::print_error("Disconnected; reconnecting");
                    if let Err(err) = session.reconnect().await {
                        output::print_error(&format!("{err:#}"));
                    }
                    cursor = 0;
                }
            },
            _ = retry.tick(), if !session.is_connected() => {
                match session.reconnect().await {
                    Ok(()) => {
                        output::print_status(&format!(
                            "Reconnected to {} as {}",
                            session.room_id(),
                            session.identity().display_name()
                        ));
                        cursor = 0;
                    }
                    Err(err) => log::debug!("Reconnect failed: {err:#}"),
                }
            }
        }

        for entry in session.reconciler().entries_since(cursor) {
            output::print_entry(entry, session.identity());
        }
        cursor = session.reconciler().len();
    }

    session.close().await;
    Ok(())
}
