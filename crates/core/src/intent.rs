use crate::square::{PieceType, Square};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// A square token in normalized text: a file letter and a rank digit,
/// optionally separated by one space ("f3" or "f 3").
static SQUARE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-h]) ?([1-8])\b").expect("square pattern is valid"));

pub const RETRY_HINT: &str = "Say a move like \"knight to f3\" or \"e2 to e4\".";

/// The parsed, not-yet-validated meaning of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveIntent {
    SquareToSquare { from: Square, to: Square },
    PieceToSquare { piece: PieceType, to: Square },
}

impl MoveIntent {
    pub fn destination(&self) -> Square {
        match *self {
            MoveIntent::SquareToSquare { to, .. } | MoveIntent::PieceToSquare { to, .. } => to,
        }
    }
}

impl fmt::Display for MoveIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveIntent::SquareToSquare { from, to } => write!(f, "{from} -> {to}"),
            MoveIntent::PieceToSquare { piece, to } => write!(f, "{piece} -> {to}"),
        }
    }
}

/// No grammar matched the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub hint: String,
}

impl Default for ParseFailure {
    fn default() -> Self {
        Self {
            hint: RETRY_HINT.to_string(),
        }
    }
}

fn squares_in(normalized: &str) -> Vec<Square> {
    SQUARE_PATTERN
        .captures_iter(normalized)
        .filter_map(|caps| {
            let file = caps.get(1)?.as_str().chars().next()?;
            let rank = caps.get(2)?.as_str().chars().next()?;
            Square::from_chars(file, rank)
        })
        .collect()
}

fn piece_in(normalized: &str) -> Option<PieceType> {
    normalized.split_whitespace().find_map(PieceType::from_keyword)
}

/// Extracts a move intent from normalized text.
///
/// Piece-relative phrasing is tried first. It needs exactly one square as the
/// destination; with two or more squares the bare square-to-square grammar
/// takes over and uses the first two.
pub fn extract(normalized: &str) -> Result<MoveIntent, ParseFailure> {
    let squares = squares_in(normalized);

    if let Some(piece) = piece_in(normalized) {
        if let [to] = squares.as_slice() {
            return Ok(MoveIntent::PieceToSquare { piece, to: *to });
        }
    }

    match squares.as_slice() {
        [from, to, ..] => Ok(MoveIntent::SquareToSquare {
            from: *from,
            to: *to,
        }),
        _ => Err(ParseFailure::default()),
    }
}
