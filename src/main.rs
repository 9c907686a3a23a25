// ============================================================================
// LazyFX - Convertisseur de devises en terminal
// ============================================================================
// Programme TUI : conversion entre le dollar canadien et une devise étrangère
// avec les taux quotidiens publiés par la Banque du Canada
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle infinie qui gère événements et rendering
// 3. Worker thread + channels : les appels HTTP ne bloquent jamais l'UI
// 4. Machine d'état : App::handle(Intent) -> Vec<Effect>
// ============================================================================

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use lazyfx::api::ValetClient;
use lazyfx::app::{App, Effect, Intent};
use lazyfx::config::{env_flag, validate_refresh_interval, Settings, FORCE_REFRESH_ENV};
use lazyfx::freshness::SystemClock;
use lazyfx::ui::events::{is_escape_event, is_interrupt_event, Event, EventHandler};
use lazyfx::ui::{render, ViewState};
use lazyfx::worker::{spawn_background_worker, WorkerCommand};

// ============================================================================
// Ligne de commande
// ============================================================================

/// Convertisseur de devises (taux de la Banque du Canada)
#[derive(Debug, Parser)]
#[command(name = "lazyfx", version, about)]
struct Cli {
    /// Fichier de configuration (défaut : ~/.config/lazyfx/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Considère toujours que de nouveaux taux sont publiés (debug)
    #[arg(long)]
    force_refresh_prompt: bool,

    /// Intervalle de vérification de fraîcheur, en secondes
    #[arg(long, value_name = "SECS")]
    refresh_interval: Option<u64>,

    /// Première date d'observation demandée (AAAA-MM-JJ)
    #[arg(long, value_name = "DATE")]
    start_date: Option<NaiveDate>,
}

/// Fusionne fichier, ligne de commande et environnement
///
/// Priorité : CLI > environnement > fichier > défauts
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    if env_flag(std::env::var(FORCE_REFRESH_ENV).ok().as_deref()) {
        settings.force_refresh_prompt = true;
    }
    if cli.force_refresh_prompt {
        settings.force_refresh_prompt = true;
    }
    if let Some(secs) = cli.refresh_interval {
        validate_refresh_interval(secs).context("--refresh-interval invalide")?;
        settings.refresh_interval_secs = secs;
    }
    if let Some(start_date) = cli.start_date {
        settings.observations_start_date = start_date;
    }

    Ok(settings)
}

// ============================================================================
// Logging
// ============================================================================
// CONCEPT : tracing écrit dans un fichier
// - Le terminal est en raw mode : impossible d'écrire sur stdout
// - EnvFilter : filtre par niveau (RUST_LOG env var)
// ============================================================================

fn init_logging(log_dir: &Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(log_dir).context("Échec de la création du répertoire de logs")?;

    // Rotation::DAILY : lazyfx.log.2024-01-15
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "lazyfx.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazyfx=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    init_logging(&settings.log_dir).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(?settings, "LazyFX starting up");

    let source = ValetClient::new(&settings.valet_base_url, settings.observations_start_date)?;

    // command_tx/rx : commandes vers le worker
    // result_tx/rx : intents de fin de chargement vers la boucle
    let (command_tx, command_rx) = mpsc::channel::<WorkerCommand>();
    let (result_tx, result_rx) = mpsc::channel::<Intent>();

    info!("Spawning background worker thread");
    let worker = spawn_background_worker(Arc::new(source), command_rx, result_tx)?;

    // CONCEPT RUST : Rc<dyn Clock>
    // - App et le scheduler de fraîcheur partagent la même horloge
    // - Rc suffit : App ne quitte jamais le thread UI
    let mut app = App::new(
        Rc::new(SystemClock),
        settings.refresh_interval(),
        settings.force_refresh_prompt,
    );
    let mut view = ViewState::new();

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();
    let initial_effects = app.reset();
    dispatch(initial_effects, &mut view, &command_tx);

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &mut view, &events, &command_tx, &result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    // Fermer le channel termine le worker
    drop(command_tx);
    if worker.join().is_err() {
        warn!("Worker thread panicked");
    }

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event loop
// ============================================================================

/// Route les effets : chargements vers le worker, le reste vers la vue
fn dispatch(effects: Vec<Effect>, view: &mut ViewState, command_tx: &mpsc::Sender<WorkerCommand>) {
    for effect in effects {
        view.apply_effect(&effect);
        if let Some(command) = WorkerCommand::from_effect(&effect) {
            if command_tx.send(command).is_err() {
                error!(?command, "Worker thread disconnected, command dropped");
            }
        }
    }
}

/// Applique un intent à App et route les effets produits
fn apply(app: &mut App, view: &mut ViewState, intent: Intent, command_tx: &mpsc::Sender<WorkerCommand>) {
    let effects = app.handle(intent);
    dispatch(effects, view, command_tx);
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    view: &mut ViewState,
    events: &EventHandler,
    command_tx: &mpsc::Sender<WorkerCommand>,
    result_rx: &mpsc::Receiver<Intent>,
) -> Result<()> {
    while app.is_running() {
        // ========================================
        // 0. RÉSULTATS : fins de chargement du worker
        // ========================================
        loop {
            match result_rx.try_recv() {
                Ok(intent) => apply(app, view, intent, command_tx),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    error!("Worker thread disconnected!");
                    break;
                }
            }
        }

        // ========================================
        // 1. RENDER
        // ========================================
        terminal.draw(|frame| render(frame, app, view))?;

        // ========================================
        // 2. INPUT
        // ========================================
        match events.next() {
            Ok(event) => handle_event(app, view, event, command_tx),
            Err(e) => warn!(error = ?e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

/// Traite un événement clavier ou un tick
///
/// CONCEPT : Confirmation de quit two-step
/// - Premier Esc : demande confirmation
/// - Second Esc : quitte
/// - Toute autre touche annule la demande
fn handle_event(
    app: &mut App,
    view: &mut ViewState,
    event: Event,
    command_tx: &mpsc::Sender<WorkerCommand>,
) {
    match event {
        Event::Tick => apply(app, view, Intent::Tick, command_tx),
        Event::Key(_) if is_interrupt_event(&event) => {
            info!("Interrupted by Ctrl+C");
            app.quit();
        }
        Event::Key(_) if is_escape_event(&event) && !view.prompt_open => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                debug!("Quit requested, awaiting confirmation");
                app.request_quit();
            }
        }
        Event::Key(_) => {
            if app.is_awaiting_quit_confirmation() {
                debug!("Quit cancelled");
                app.cancel_quit();
                return;
            }
            for intent in view.handle_key(app, &event) {
                apply(app, view, intent, command_tx);
            }
        }
    }
}

// ============================================================================
// Terminal
// ============================================================================

/// Configure le terminal en mode TUI
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    // Alternate screen : l'écran précédent est restauré en sortie
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
