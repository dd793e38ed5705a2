//! Line protocol for driving a session from a terminal.
//!
//! A plain line is a full transcript, `~text` is a partial transcript and
//! `!command args` is a speech-service or host event.

use glam::Vec3;
use voice_chess_core::session::{MenuCommand, StopReason};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    FullTranscript(String),
    PartialTranscript(String),
    ServiceError { code: String, message: String },
    Aborted,
    Stopped(StopReason),
    RequestCompleted,
    Gesture,
    Cancel,
    Menu(MenuCommand),
    /// New view direction of the player.
    Look(Vec3),
    BoardReady,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConsoleError {
    #[error("Unknown command: !{0}")]
    UnknownCommand(String),
    #[error("Invalid arguments for !{command}: {reason}")]
    InvalidArguments {
        command: &'static str,
        reason: String,
    },
}

pub fn parse(line: &str) -> Result<ConsoleEvent, ConsoleError> {
    let line = line.trim();
    if let Some(partial) = line.strip_prefix('~') {
        return Ok(ConsoleEvent::PartialTranscript(partial.trim().to_string()));
    }
    let Some(command) = line.strip_prefix('!') else {
        return Ok(ConsoleEvent::FullTranscript(line.to_string()));
    };

    let (name, args) = match command.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (command, ""),
    };
    match name.to_lowercase().as_str() {
        "error" => {
            let (code, message) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            if code.is_empty() {
                return Err(ConsoleError::InvalidArguments {
                    command: "error",
                    reason: "expected <code> [message]".to_string(),
                });
            }
            Ok(ConsoleEvent::ServiceError {
                code: code.to_string(),
                message: message.trim().to_string(),
            })
        }
        "abort" => Ok(ConsoleEvent::Aborted),
        "stop" => match args.to_lowercase().as_str() {
            "timeout" => Ok(ConsoleEvent::Stopped(StopReason::Timeout)),
            "inactivity" => Ok(ConsoleEvent::Stopped(StopReason::Inactivity)),
            "deactivation" => Ok(ConsoleEvent::Stopped(StopReason::Deactivation)),
            other => Err(ConsoleError::InvalidArguments {
                command: "stop",
                reason: format!("unknown reason '{other}'"),
            }),
        },
        "done" => Ok(ConsoleEvent::RequestCompleted),
        "gesture" => Ok(ConsoleEvent::Gesture),
        "cancel" => Ok(ConsoleEvent::Cancel),
        "menu" => match args.to_lowercase().as_str() {
            "open" => Ok(ConsoleEvent::Menu(MenuCommand::Open)),
            "close" => Ok(ConsoleEvent::Menu(MenuCommand::Close)),
            other => Err(ConsoleError::InvalidArguments {
                command: "menu",
                reason: format!("expected open or close, got '{other}'"),
            }),
        },
        "look" => parse_vector(args).map(ConsoleEvent::Look),
        "board" => Ok(ConsoleEvent::BoardReady),
        other => Err(ConsoleError::UnknownCommand(other.to_string())),
    }
}

fn parse_vector(args: &str) -> Result<Vec3, ConsoleError> {
    let invalid = |reason: String| ConsoleError::InvalidArguments {
        command: "look",
        reason,
    };
    let components = args
        .split_whitespace()
        .map(|part| part.parse::<f32>().map_err(|e| invalid(format!("'{part}': {e}"))))
        .collect::<Result<Vec<f32>, _>>()?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(invalid(format!(
            "expected 3 components, got {}",
            components.len()
        ))),
    }
}
