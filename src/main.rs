use std::sync::Arc;
use anyhow::{Context, Result};
use deckproof_core::{
    CognitoSessionProvider, Config, SessionProvider, SharedState, StaticTokenProvider,
    SubmissionController,
};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let _log_guard = setup_logging()?;
    tracing::info!(endpoint = %config.api_endpoint, region = %config.region, "starting");

    let state = SharedState::new();
    let (session, cognito, username) = connect_session(&config, &state).await?;
    let controller = SubmissionController::new(&config, session, state)
        .context("building the HTTP client")?;

    let mut app = App::new(Arc::new(controller), cognito, username);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

/// Picks the session provider: a token from `DECKPROOF_ID_TOKEN`, otherwise
/// the user pool, signing in with `DECKPROOF_USERNAME`/`DECKPROOF_PASSWORD`
/// when both are set. A failed sign-in is shown in the error banner; later
/// submissions then fail with "no active session".
async fn connect_session(
    config: &Config,
    state: &SharedState,
) -> Result<(Arc<dyn SessionProvider>, Option<Arc<CognitoSessionProvider>>, Option<String>)> {
    if let Ok(token) = std::env::var("DECKPROOF_ID_TOKEN") {
        let session: Arc<dyn SessionProvider> = Arc::new(StaticTokenProvider::new(token));
        return Ok((session, None, None));
    }

    let cognito = Arc::new(CognitoSessionProvider::new(config)?);
    let credentials = std::env::var("DECKPROOF_USERNAME")
        .ok()
        .zip(std::env::var("DECKPROOF_PASSWORD").ok());

    let username = match credentials {
        Some((username, password)) => match cognito.sign_in(&username, &password).await {
            Ok(()) => Some(username),
            Err(err) => {
                tracing::warn!(error = %err, "sign-in failed");
                state.lock().set_error(Some(err.to_string()));
                None
            }
        },
        None => None,
    };

    let session: Arc<dyn SessionProvider> = cognito.clone();
    Ok((session, Some(cognito), username))
}

/// Logs go to `deckproof.log` in the config directory; the terminal UI owns
/// stdout and stderr. Nothing is written unless `RUST_LOG` is set.
fn setup_logging() -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));

    let max_level = env_filter.max_level_hint();
    if max_level.is_none() || max_level == Some(tracing::level_filters::LevelFilter::OFF) {
        let (_, guard) = NonBlocking::new(std::io::sink());
        return Ok(guard);
    }

    let log_dir = Config::config_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating {}", log_dir.display()))?;

    let (non_blocking, guard) =
        NonBlocking::new(RollingFileAppender::new(Rotation::NEVER, log_dir, "deckproof.log"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    Registry::default().with(env_filter).with(file_layer).init();

    Ok(guard)
}
