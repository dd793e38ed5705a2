use crate::intent::ParseFailure;
use crate::square::{PieceType, Square};

/// Every way a transcript can fail to become a move.
///
/// All of these are recoverable: the session reports them, returns to idle and
/// re-arms listening. None of them ends the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpretError {
    #[error("could not parse transcript: {}", .0.hint)]
    Parse(ParseFailure),
    #[error("no {piece} can legally reach {to}")]
    NoLegalPiece { piece: PieceType, to: Square },
    #[error("{from} to {to} is not a legal move")]
    IllegalMove { from: Square, to: Square },
    #[error("engine rejected {from} to {to}")]
    EngineRejected { from: Square, to: Square },
    #[error("speech service fault {code}: {message}")]
    ServiceFault { code: String, message: String },
    #[error("confirmation of {from} to {to} timed out")]
    ConfirmationTimeout { from: Square, to: Square },
}

impl InterpretError {
    /// Stable identifier for logs and tests.
    pub fn reason_code(&self) -> &'static str {
        match self {
            InterpretError::Parse(_) => "parse_failure",
            InterpretError::NoLegalPiece { .. } | InterpretError::IllegalMove { .. } => {
                "no_legal_candidate"
            }
            InterpretError::EngineRejected { .. } => "engine_rejected",
            InterpretError::ServiceFault { .. } => "service_fault",
            InterpretError::ConfirmationTimeout { .. } => "confirmation_timeout",
        }
    }

    /// Short text for the player.
    pub fn status_text(&self) -> String {
        match self {
            InterpretError::Parse(failure) => failure.hint.clone(),
            InterpretError::NoLegalPiece { piece, to } => {
                format!("No {piece} can legally reach {to}. Try again.")
            }
            InterpretError::IllegalMove { from, to } => {
                format!("{from} to {to} is not a legal move. Try again.")
            }
            InterpretError::EngineRejected { from, to } => {
                format!("Could not move {from} to {to}. Try again.")
            }
            InterpretError::ServiceFault { .. } => "Voice error. Restarting...".to_string(),
            InterpretError::ConfirmationTimeout { .. } => "Confirmation timed out.".to_string(),
        }
    }
}

impl From<ParseFailure> for InterpretError {
    fn from(failure: ParseFailure) -> Self {
        InterpretError::Parse(failure)
    }
}
