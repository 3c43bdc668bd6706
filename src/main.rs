mod app;
mod error;
mod logging;
mod report;
mod settings;
mod speedtest;
mod ui;

use anyhow::Result;
use app::{poll_event, App, AppAction};
use clap::Parser;
use crossterm::event::Event;
use logging::LogTarget;
use ratatui::DefaultTerminal;
use settings::{Settings, SettingsArgs};
use speedtest::sequencer::PhaseSequencer;
use speedtest::session::Session;
use speedtest::transport::{HttpTransport, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::info;
use ui::draw_ui;

#[derive(Parser)]
#[command(name = "speedgauge", version, about = "Terminal network speed test")]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Run one test without the terminal UI and print the results
    #[arg(long)]
    headless: bool,

    #[arg(long, env = "SPEEDGAUGE_LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,

    /// Append logs to this file
    #[arg(long, env = "SPEEDGAUGE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = match (&cli.log_file, cli.headless) {
        (Some(path), _) => LogTarget::File(path),
        (None, true) => LogTarget::Stderr,
        (None, false) => LogTarget::Off,
    };
    logging::init(cli.log_level, target)?;

    let settings = cli.settings.into_settings()?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&settings)?);
    info!(
        ping = %settings.ping_url,
        download = %settings.download_url,
        upload = %settings.upload_url,
        "endpoints"
    );

    if cli.headless {
        return run_headless(transport, settings).await;
    }

    let mut terminal = ratatui::init();
    terminal.clear()?;

    let result = run_app(&mut terminal, App::new(transport, settings)).await;

    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    loop {
        app.pump();
        terminal.draw(|frame| draw_ui(frame, &app))?;

        if let Some(Event::Key(key)) = poll_event(Duration::from_millis(30))? {
            match app.handle_key_event(key) {
                Some(AppAction::Quit) => break,
                Some(AppAction::StartTest) => app.start_test(),
                Some(AppAction::CancelTest) => app.cancel_test(),
                None => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.cancel_test();
    Ok(())
}

async fn run_headless(transport: Arc<dyn Transport>, settings: Settings) -> Result<()> {
    let mut session = Session::with_chart_capacity(settings.chart_capacity);
    let mut sequencer = PhaseSequencer::new(transport);
    sequencer.start(&mut session, settings);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            more = sequencer.next(&mut session) => {
                if !more {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                sequencer.cancel(&mut session);
                break;
            }
        }
    }

    print!("{}", report::session_summary(&session));
    Ok(())
}
