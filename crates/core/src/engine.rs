use crate::square::{PieceType, Square};
#[cfg(test)]
use mockall::automock;

// The game-rules engine lives outside this crate. The session only needs these
// three questions answered.
//
// `is_move_legal` and `piece_type_at` take `&self`: the resolver queries every
// candidate before anything is committed, and those queries must not be able
// to change the board. Only `execute_move` gets mutable access.
#[cfg_attr(test, automock)]
pub trait GameEngine {
    /// Whether moving the piece on `from` to `to` is legal in the current position.
    fn is_move_legal(&self, from: Square, to: Square) -> bool;

    /// The type of the piece standing on `square`, if any.
    fn piece_type_at(&self, square: Square) -> Option<PieceType>;

    /// Commits the move. Returns false when the engine refuses it.
    fn execute_move(&mut self, from: Square, to: Square) -> bool;
}

/// Non-speech confirmation signal, polled on every tick while a confirmation is pending.
pub trait GestureSensor {
    fn confirmation_gesture_detected(&self) -> bool;
}

impl<F> GestureSensor for F
where
    F: Fn() -> bool,
{
    fn confirmation_gesture_detected(&self) -> bool {
        self()
    }
}

/// A sensor that never fires, for hosts without gesture tracking.
pub struct NoGestures;

impl GestureSensor for NoGestures {
    fn confirmation_gesture_detected(&self) -> bool {
        false
    }
}
