use crate::engine::GameEngine;
use crate::intent::MoveIntent;
use crate::square::Square;

/// Finds every legal source square for an intent.
///
/// Never fails: an empty result means no piece can make the requested move.
/// Squares are visited file-major (a1, a2, .. h8) so the order is stable
/// across calls.
pub fn resolve<E: GameEngine + ?Sized>(intent: &MoveIntent, engine: &E) -> Vec<Square> {
    match *intent {
        MoveIntent::SquareToSquare { from, to } => {
            if engine.is_move_legal(from, to) {
                vec![from]
            } else {
                vec![]
            }
        }
        MoveIntent::PieceToSquare { piece, to } => Square::all()
            .filter(|square| engine.piece_type_at(*square) == Some(piece))
            .filter(|square| engine.is_move_legal(*square, to))
            .collect(),
    }
}
