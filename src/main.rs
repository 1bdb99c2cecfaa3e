//! Terminal front-end for the krumi client core.

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use krumi::{
    config::ClientConfig,
    dao::{
        krumnet::{HttpKrumnet, KrumnetApi},
        storage::FileTokenStore,
    },
    error::extract_server_error,
    request::{AsyncRequest, Errors, OutcomeExt},
    services::{
        game_driver::GameDriver,
        jobs::{JobRequest, create_and_poll},
        lobby_service,
        session_service::{SessionManager, token_from_callback},
    },
    state::{
        AppState, GameView,
        game::{RoundCursor, RoundStatus, now_millis, round_status},
        session::Session,
        submission::RoundSubmission,
    },
    telemetry::{LogContext, RemoteLog},
};

#[derive(Parser)]
#[command(name = "krumi")]
#[command(about = "Play krumpled from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URL that starts the login flow
    Login,
    /// Complete login with the query string the auth redirect landed on
    Callback { query: String },
    /// Show the current user
    Whoami,
    /// List your lobbies
    Lobbies,
    /// Show a lobby with its members and games
    Lobby { lobby_id: String },
    /// Join a lobby
    Join { lobby_id: String },
    /// Leave a lobby
    Leave { lobby_id: String },
    /// Create a new lobby
    NewLobby,
    /// Start a new game in a lobby
    NewGame { lobby_id: String },
    /// Play a game interactively
    Play { lobby_id: String, game_id: String },
    /// Forget the stored session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = tracing::subscriber::with_default(bootstrap_subscriber(), ClientConfig::load);
    let log_context = init_tracing(&config)?;
    let api: Arc<dyn KrumnetApi> =
        Arc::new(HttpKrumnet::new(&config.api_url).context("building krumnet client")?);
    let store = Arc::new(FileTokenStore::new(config.storage_dir.clone()));
    let sessions = Arc::new(SessionManager::new(api, store, config.session_key.clone()));

    match cli.command {
        Commands::Login => {
            println!("Open {} to sign in.", config.login_url());
            println!("Then run `krumi callback '<query string>'` with the page you land on.");
            Ok(())
        }
        Commands::Callback { query } => {
            let Some(token) = token_from_callback(&query) else {
                bail!("no token found in `{query}`");
            };
            let session = resolve_session(&sessions, &log_context, Some(token)).await?;
            match &session.user {
                Some(user) => println!("Signed in as {} <{}>", user.name, user.email),
                None => println!("The token was rejected; you are signed out."),
            }
            Ok(())
        }
        Commands::Whoami => {
            let session = resolve_session(&sessions, &log_context, None).await?;
            match &session.user {
                Some(user) => println!("{} <{}> ({})", user.name, user.email, user.id),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Commands::Logout => {
            match sessions.logout().await {
                Some(token) => println!("Signed out. Revoke the server session at {}", config.logout_url(&token)),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Commands::Lobbies => {
            let session = require_session(&sessions, &log_context).await?;
            let rows = lobby_service::list_lobbies(session.api().as_ref())
                .await
                .into_first()?;
            if rows.is_empty() {
                println!("No lobbies yet. Create one with `krumi new-lobby`.");
            }
            for row in rows {
                println!(
                    "{}  {}  members: {}  games: {}  created: {}",
                    row.lobby.id,
                    row.lobby.name,
                    row.lobby.member_count,
                    row.lobby.game_count,
                    format_millis(row.lobby.created)
                );
            }
            Ok(())
        }
        Commands::Lobby { lobby_id } => {
            let session = require_session(&sessions, &log_context).await?;
            let lobby = lobby_service::lobby_detail(session.api().as_ref(), &lobby_id)
                .await
                .into_first()?;
            println!("{} ({})", lobby.name, lobby.id);
            println!("Members:");
            for member in lobby.members.iter().filter(|member| member.left_at.is_none()) {
                println!("  {} ({})", member.name, member.user_id);
            }
            println!("Games:");
            for game in &lobby.games {
                println!(
                    "  {}  {}  rounds remaining: {}",
                    game.id, game.name, game.rounds_remaining
                );
            }
            Ok(())
        }
        Commands::Join { lobby_id } => {
            let session = require_session(&sessions, &log_context).await?;
            let joined = lobby_service::join_lobby(session.api().as_ref(), lobby_id)
                .await
                .into_first()?;
            println!("Joined lobby {joined}");
            Ok(())
        }
        Commands::Leave { lobby_id } => {
            let session = require_session(&sessions, &log_context).await?;
            let api = session.api();
            let rows = lobby_service::list_lobbies(api.as_ref()).await.into_first()?;
            let Some(row) = rows.iter().find(|row| row.lobby.id == lobby_id) else {
                bail!("you are not a member of lobby `{lobby_id}`");
            };
            let Some(leaving) = lobby_service::leave_lobby(&api, row) else {
                bail!("already leaving lobby `{lobby_id}`");
            };
            match leaving.action.settle().await {
                AsyncRequest::Loaded(left) => println!("Left lobby {left}"),
                AsyncRequest::Failed(errors) => bail!("unable to leave: {}", describe(&errors)),
                _ => {}
            }
            Ok(())
        }
        Commands::NewLobby => {
            let session = require_session(&sessions, &log_context).await?;
            let id = create_and_poll(session.api().as_ref(), JobRequest::Lobby, config.job_poll_limit)
                .await
                .into_first()?;
            println!("Created lobby {id}");
            Ok(())
        }
        Commands::NewGame { lobby_id } => {
            let session = require_session(&sessions, &log_context).await?;
            let id = create_and_poll(
                session.api().as_ref(),
                JobRequest::Game { lobby_id },
                config.job_poll_limit,
            )
            .await
            .into_first()?;
            println!("Created game {id}");
            Ok(())
        }
        Commands::Play { lobby_id, game_id } => {
            let session = require_session(&sessions, &log_context).await?;
            let driver = GameDriver::new(&session, lobby_id, game_id, config.poll_interval);
            play(driver).await
        }
    }
}

/// Resolve the session through the bootstrap state the way views observe it.
async fn resolve_session(
    sessions: &Arc<SessionManager>,
    log_context: &LogContext,
    token: Option<String>,
) -> anyhow::Result<Session> {
    let manager = sessions.clone();
    let state = AppState {
        session: AsyncRequest::loading(async move { Ok(manager.load(token).await) }),
    };

    match state.session.settle().await {
        AsyncRequest::Loaded(session) => {
            if let Some(user) = &session.user {
                log_context.set("user_id", user.id.clone());
            }
            Ok(session)
        }
        AsyncRequest::Failed(errors) => bail!("unable to resolve session: {errors}"),
        other => bail!("session left in state {}", other.kind()),
    }
}

async fn require_session(
    sessions: &Arc<SessionManager>,
    log_context: &LogContext,
) -> anyhow::Result<Session> {
    let session = resolve_session(sessions, log_context, None).await?;
    if !session.is_authenticated() {
        bail!("not signed in; run `krumi login` first");
    }
    Ok(session)
}

async fn play(mut driver: GameDriver) -> anyhow::Result<()> {
    render(driver.load().await);
    if driver.view().game_state.data().is_none_or(|state| state.is_ended()) {
        return Ok(());
    }

    println!("Commands: `entry <text>`, `vote <entry id>`, `clear`, `quit`");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            () = async { driver.next_update().await; } => {
                render(driver.view());
                if !driver.view().should_poll() {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if !handle_command(&mut driver, line.trim()) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("leaving game");
    Ok(())
}

/// Apply one line of player input; returns `false` to quit.
fn handle_command(driver: &mut GameDriver, line: &str) -> bool {
    let (command, argument) = line.split_once(' ').unwrap_or((line, ""));

    let result = match command {
        "quit" | "exit" => return false,
        "" => return true,
        "entry" => {
            driver.update_submission(argument);
            driver.submit_entry(argument)
        }
        "vote" => driver.cast_vote(argument),
        "clear" => {
            driver.clear_vote_warning();
            Ok(())
        }
        other => {
            println!("Unknown command `{other}`");
            return true;
        }
    };

    match result {
        Ok(()) => render(driver.view()),
        Err(err) => {
            warn!(error = %err, "command refused");
            println!("! {err}");
        }
    }
    true
}

fn render(view: &GameView) {
    let state = match &view.game_state {
        AsyncRequest::NotAsked | AsyncRequest::Loading(_) => {
            println!("Loading game {}...", view.target.game_id);
            return;
        }
        AsyncRequest::Failed(errors) => {
            println!("Unable to load game: {}", describe(errors));
            return;
        }
        AsyncRequest::Loaded(state) => state,
    };

    println!();
    println!("== {} ({}) ==", state.game.name, state.lobby.name);
    let now = now_millis();
    let mut rounds: Vec<_> = state.game.rounds.iter().collect();
    rounds.sort_by_key(|round| round.position);
    for round in rounds {
        let marker = match round_status(round, now) {
            RoundStatus::Completed => "[x]",
            RoundStatus::InProgress => "[>]",
            RoundStatus::Pending => "[ ]",
        };
        println!("{marker} Round {}", round.position + 1);
    }

    if state.is_ended() {
        println!("Game over. Placements:");
        let mut placements: Vec<_> = state.game.placements.iter().collect();
        placements.sort_by_key(|placement| placement.place);
        for placement in placements {
            println!(
                "  {}. {} ({} votes)",
                placement.place, placement.user_name, placement.vote_count
            );
        }
        return;
    }

    match &state.cursor {
        None => println!("Waiting for the next round..."),
        Some(RoundCursor::Active(active)) => {
            println!("Prompt: {}", active.round.prompt);
            match &active.submission {
                RoundSubmission::NotSubmitted { value } if value.is_empty() => {
                    println!("Type `entry <text>` to submit.")
                }
                RoundSubmission::NotSubmitted { value } => println!("Draft: {value}"),
                RoundSubmission::Submitted { submission } => match submission {
                    AsyncRequest::Loaded(receipt) => println!("Entry: {}", receipt.entry),
                    AsyncRequest::Failed(errors) => {
                        println!("! {} (try again with `entry <text>`)", describe(errors))
                    }
                    _ => println!("Submitting..."),
                },
            }
        }
        Some(RoundCursor::Voting(voting)) => {
            println!("Vote! Prompt: {}", voting.round.prompt);
            for option in &voting.options {
                println!("  {}  {}", option.id, option.value);
            }
            match &voting.vote {
                AsyncRequest::NotAsked => println!("Type `vote <entry id>`."),
                AsyncRequest::Loading(_) => println!("Voting..."),
                AsyncRequest::Loaded(_) => println!("Vote recorded."),
                AsyncRequest::Failed(errors) => {
                    println!("! {} (`clear` to dismiss)", describe(errors))
                }
            }
        }
    }
}

/// Player-facing text for a failure, preferring the humanized server message.
fn describe(errors: &Errors) -> String {
    match extract_server_error(errors.first()) {
        Some(server) => server.humanized.unwrap_or(server.message),
        None => errors.to_string(),
    }
}

fn format_millis(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|time| time.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}

/// Configure tracing subscribers so logs include spans by default.
///
/// Remote shipping is installed only when the configuration enables it; the
/// returned context feeds every shipped line.
fn init_tracing(config: &ClientConfig) -> anyhow::Result<LogContext> {
    let context = LogContext::new();
    let remote = config
        .remote_logging_url()
        .map(|url| RemoteLog::start(url, context.clone()))
        .transpose()
        .context("starting remote log shipping")?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(remote)
        .init();

    if let Some(url) = config.remote_logging_url() {
        info!(url, "shipping log events to remote collector");
    }
    Ok(context)
}

/// Stderr-only subscriber used while the configuration itself is loading.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,krumi=debug".into())
}
