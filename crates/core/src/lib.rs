pub mod config;
pub mod confirmation;
pub mod disambiguator;
pub mod engine;
pub mod error;
pub mod intent;
pub mod listening;
pub mod normalizer;
pub mod resolver;
pub mod session;
pub mod square;
pub mod timers;

use serde::Serialize;
use square::Square;

pub use config::InterpreterConfig;
pub use engine::{GameEngine, GestureSensor, NoGestures};
pub use error::InterpretError;
pub use session::{MoveSession, Outcome, StopReason};

/// A move that the engine accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveReport {
    pub from: Square,
    pub to: Square,
    /// True when the move went through a confirmation.
    pub was_ambiguous: bool,
    pub candidates: Vec<Square>,
}

/// Represents commands that the core logic (`MoveSession`) issues to the runtime.
///
/// The session never touches the speech service or the UI. Everything it wants
/// done comes out as one of these on its command channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Start a recognition cycle on the speech service.
    ActivateService,
    /// Stop the current recognition cycle.
    DeactivateService,
    /// Replace the player-facing status line.
    ShowStatus { text: String },
    MoveExecuted(MoveReport),
    /// Mark the ranked candidates on the board, `selected` being the default.
    HighlightCandidates {
        selected: Square,
        candidates: Vec<Square>,
    },
    ClearHighlights,
    OpenMenu,
    CloseMenu,
}
