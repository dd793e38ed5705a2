mod board;
mod config;
mod console;

use crate::board::SandboxBoard;
use crate::config::Config;
use crate::console::ConsoleEvent;
use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::fmt::time::ChronoLocal;
use voice_chess_core::disambiguator::{BoardGeometry, SpatialContext, ViewerPose};
use voice_chess_core::session::MenuCommand;
use voice_chess_core::{Command, InterpretError, MoveSession, NoGestures, Outcome, StopReason};

/// Where the simulated player sits: behind the white pieces, slightly above the board.
const VIEWER_POSITION: Vec3 = Vec3::new(0.0, 0.45, -0.45);

pub enum Input {
    Console(ConsoleEvent),
    /// The simulated speech service accepted an activation.
    ListeningStarted(),
    /// The simulated speech service acknowledged a deactivation.
    ListeningStopped(),
    MenuOpened(),
    MenuClosed(),
}

#[derive(Parser)]
#[command(version, about = "Drive a voice chess session from the terminal")]
struct Cli {
    /// Interval between session ticks in milliseconds
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Ignore `!look` and rank ambiguous moves by board order only
    #[arg(long)]
    no_spatial: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // Stdout carries the command stream, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting voice chess service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let tick_interval = Duration::from_millis(args.tick_ms.max(1));
    let spatial_enabled = !args.no_spatial;

    // --- 4. Application Setup ---
    let (input_tx, mut input_rx) = tokio::sync::mpsc::channel::<Input>(256);
    // Create the command channel to decouple core logic from the runtime.
    let (command_tx, mut command_rx) = tokio::sync::mpsc::unbounded_channel::<Command>();

    // This task reads console lines and forwards them as speech-service or host events.
    let console_tx = input_tx.clone();
    let console_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match console::parse(&line) {
                    Ok(event) => {
                        if let Err(e) = console_tx.send(Input::Console(event)).await {
                            tracing::error!("Failed to forward console event: {:?}", e);
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("{}", e),
                },
                Ok(None) => {
                    tracing::info!("Console input closed");
                    break;
                }
                Err(e) => {
                    tracing::error!("Failed to read console input: {:?}", e);
                    break;
                }
            }
        }
    });

    // This task handles commands from the core logic. Every command is printed
    // as a JSON line, and the ones aimed at the speech service or the menu are
    // acknowledged the way the real collaborators would.
    let ack_tx = input_tx.clone();
    let command_handler = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match serde_json::to_string(&command) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!("Failed to serialize command {:?}: {}", command, e),
            }

            let ack = match command {
                Command::ActivateService => Some(Input::ListeningStarted()),
                Command::DeactivateService => Some(Input::ListeningStopped()),
                Command::OpenMenu => Some(Input::MenuOpened()),
                Command::CloseMenu => Some(Input::MenuClosed()),
                Command::ShowStatus { text } => {
                    tracing::info!("STATUS: {}", text);
                    None
                }
                Command::MoveExecuted(report) => {
                    tracing::info!("MOVE: {} -> {}", report.from, report.to);
                    None
                }
                Command::HighlightCandidates { .. } | Command::ClearHighlights => None,
            };
            if let Some(ack) = ack {
                if let Err(e) = ack_tx.send(ack).await {
                    tracing::error!("Failed to acknowledge command: {:?}", e);
                    break;
                }
            }
        }
    });
    drop(input_tx);

    // This task owns the session. It serializes every event and drives the timers.
    let session_handle = tokio::spawn(async move {
        let mut session = MoveSession::new(SandboxBoard::new(), config.interpreter, command_tx);
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = session.tick(Instant::now(), &NoGestures);
                    report_resolution(&session, result);
                }
                input = input_rx.recv() => match input {
                    Some(input) => handle_input(&mut session, input, spatial_enabled),
                    None => break,
                },
            }
        }
        tracing::info!("Session ended after {} moves", session.moves_executed());
    });

    tokio::select! {
        _ = console_handle => {},
        _ = command_handler => {},
        _ = session_handle => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }
    tracing::info!("Shutting down...");
    Ok(())
}

fn handle_input(session: &mut MoveSession<SandboxBoard>, input: Input, spatial_enabled: bool) {
    let now = Instant::now();
    match input {
        Input::Console(event) => match event {
            ConsoleEvent::FullTranscript(text) => {
                let result = session.on_full_transcript(&text, now);
                report_resolution(session, Some(result));
            }
            ConsoleEvent::PartialTranscript(text) => session.on_partial_transcript(&text, now),
            ConsoleEvent::ServiceError { code, message } => session.on_error(&code, &message, now),
            ConsoleEvent::Aborted => session.on_aborted(now),
            ConsoleEvent::Stopped(reason) => session.on_stopped_listening(reason, now),
            ConsoleEvent::RequestCompleted => session.on_request_completed(),
            ConsoleEvent::Gesture => {
                let result = session.tick(now, &|| true);
                if result.is_none() {
                    tracing::info!("Gesture ignored, nothing to confirm");
                }
                report_resolution(session, result);
            }
            ConsoleEvent::Cancel => {
                if session.cancel_confirmation(now).is_none() {
                    tracing::info!("Nothing to cancel");
                }
            }
            ConsoleEvent::Menu(MenuCommand::Open) => session.menu_opened(now),
            ConsoleEvent::Menu(MenuCommand::Close) => session.menu_closed(now),
            ConsoleEvent::Look(forward) => {
                if spatial_enabled {
                    session.update_spatial_context(Some(SpatialContext {
                        viewer: ViewerPose {
                            position: VIEWER_POSITION,
                            forward,
                        },
                        board: BoardGeometry::default(),
                    }));
                } else {
                    tracing::debug!("Spatial ranking disabled, ignoring view direction");
                }
            }
            ConsoleEvent::BoardReady => {
                tracing::info!("\n{}", session.engine().render());
                session.board_ready(now);
            }
        },
        Input::ListeningStarted() => session.on_listening_started(now),
        Input::ListeningStopped() => session.on_stopped_listening(StopReason::Deactivation, now),
        Input::MenuOpened() => session.menu_opened(now),
        Input::MenuClosed() => session.menu_closed(now),
    }
}

fn report_resolution(
    session: &MoveSession<SandboxBoard>,
    result: Option<Result<Outcome, InterpretError>>,
) {
    match result {
        Some(Ok(Outcome::Executed(_))) => {
            tracing::info!("\n{}", session.engine().render());
        }
        Some(Ok(outcome)) => tracing::debug!("Outcome: {:?}", outcome),
        Some(Err(e)) => tracing::debug!("Not applied ({}): {}", e.reason_code(), e),
        None => {}
    }
}
