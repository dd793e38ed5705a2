//! In-memory board used by the console host in place of a real rules engine.
//!
//! Moves are pseudo-legal: pieces move and capture by their own rules and
//! pawns promote to queens, but check, castling and en passant are ignored.

use voice_chess_core::GameEngine;
use voice_chess_core::square::{PieceType, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    color: Color,
    kind: PieceType,
}

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

#[derive(Debug, Clone)]
pub struct SandboxBoard {
    /// Indexed `[file - 1][rank - 1]`.
    cells: [[Option<Piece>; 8]; 8],
    side_to_move: Color,
}

impl SandboxBoard {
    /// The standard starting position with white to move.
    pub fn new() -> Self {
        let mut board = Self::empty(Color::White);
        for (file, kind) in (1..=8u8).zip(BACK_RANK) {
            board.set(file, 1, Some(Piece { color: Color::White, kind }));
            board.set(file, 2, Some(Piece { color: Color::White, kind: PieceType::Pawn }));
            board.set(file, 7, Some(Piece { color: Color::Black, kind: PieceType::Pawn }));
            board.set(file, 8, Some(Piece { color: Color::Black, kind }));
        }
        board
    }

    fn empty(side_to_move: Color) -> Self {
        Self {
            cells: [[None; 8]; 8],
            side_to_move,
        }
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    fn set(&mut self, file: u8, rank: u8, piece: Option<Piece>) {
        self.cells[usize::from(file - 1)][usize::from(rank - 1)] = piece;
    }

    fn at(&self, square: Square) -> Option<Piece> {
        self.cells[usize::from(square.file() - 1)][usize::from(square.rank() - 1)]
    }

    /// Whether every square strictly between `from` and `to` is empty. Only
    /// meaningful for straight or diagonal lines.
    fn path_clear(&self, from: Square, to: Square) -> bool {
        let step_file = (to.file() as i8 - from.file() as i8).signum();
        let step_rank = (to.rank() as i8 - from.rank() as i8).signum();
        let mut file = from.file() as i8 + step_file;
        let mut rank = from.rank() as i8 + step_rank;
        while (file, rank) != (to.file() as i8, to.rank() as i8) {
            match Square::new(file as u8, rank as u8) {
                Some(square) if self.at(square).is_none() => {}
                _ => return false,
            }
            file += step_file;
            rank += step_rank;
        }
        true
    }

    fn pseudo_legal(&self, from: Square, to: Square) -> bool {
        let Some(piece) = self.at(from) else {
            return false;
        };
        if piece.color != self.side_to_move || from == to {
            return false;
        }
        let target = self.at(to);
        if target.is_some_and(|t| t.color == piece.color) {
            return false;
        }

        let df = to.file() as i8 - from.file() as i8;
        let dr = to.rank() as i8 - from.rank() as i8;
        match piece.kind {
            PieceType::Pawn => {
                let dir = piece.color.pawn_direction();
                let start_rank = if piece.color == Color::White { 2 } else { 7 };
                if df == 0 && target.is_none() {
                    dr == dir
                        || (dr == 2 * dir && from.rank() == start_rank && self.path_clear(from, to))
                } else {
                    df.abs() == 1 && dr == dir && target.is_some()
                }
            }
            PieceType::Knight => matches!((df.abs(), dr.abs()), (1, 2) | (2, 1)),
            PieceType::Bishop => df.abs() == dr.abs() && self.path_clear(from, to),
            PieceType::Rook => (df == 0 || dr == 0) && self.path_clear(from, to),
            PieceType::Queen => {
                (df.abs() == dr.abs() || df == 0 || dr == 0) && self.path_clear(from, to)
            }
            PieceType::King => df.abs() <= 1 && dr.abs() <= 1,
        }
    }

    /// ASCII diagram, rank 8 on top. White pieces are upper case.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for rank in (1..=8u8).rev() {
            out.push_str(&format!("{rank} "));
            for file in 1..=8u8 {
                let symbol = match self.cells[usize::from(file - 1)][usize::from(rank - 1)] {
                    Some(piece) => {
                        let letter = match piece.kind {
                            PieceType::Pawn => 'p',
                            PieceType::Knight => 'n',
                            PieceType::Bishop => 'b',
                            PieceType::Rook => 'r',
                            PieceType::Queen => 'q',
                            PieceType::King => 'k',
                        };
                        match piece.color {
                            Color::White => letter.to_ascii_uppercase(),
                            Color::Black => letter,
                        }
                    }
                    None => '.',
                };
                out.push(symbol);
                out.push(' ');
            }
            out.push('\n');
        }
        out.push_str("  a b c d e f g h");
        out
    }
}

impl Default for SandboxBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine for SandboxBoard {
    fn is_move_legal(&self, from: Square, to: Square) -> bool {
        self.pseudo_legal(from, to)
    }

    fn piece_type_at(&self, square: Square) -> Option<PieceType> {
        self.at(square)
            .filter(|piece| piece.color == self.side_to_move)
            .map(|piece| piece.kind)
    }

    fn execute_move(&mut self, from: Square, to: Square) -> bool {
        if !self.pseudo_legal(from, to) {
            tracing::warn!("Sandbox rejected {} -> {}", from, to);
            return false;
        }
        let Some(mut piece) = self.at(from) else {
            return false;
        };
        let last_rank = if piece.color == Color::White { 8 } else { 1 };
        if piece.kind == PieceType::Pawn && to.rank() == last_rank {
            piece.kind = PieceType::Queen;
            tracing::info!("Pawn promoted on {}", to);
        }
        if let Some(captured) = self.at(to) {
            tracing::info!("{:?} {} captured on {}", captured.color, captured.kind, to);
        }
        self.set(from.file(), from.rank(), None);
        self.set(to.file(), to.rank(), Some(piece));
        self.side_to_move = self.side_to_move.opponent();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_chess_core::intent::MoveIntent;
    use voice_chess_core::resolver::resolve;

    fn sq(text: &str) -> Square {
        Square::parse(text).expect("valid square")
    }

    fn place(board: &mut SandboxBoard, square: &str, color: Color, kind: PieceType) {
        let square = sq(square);
        board.set(square.file(), square.rank(), Some(Piece { color, kind }));
    }

    #[test]
    fn opening_moves_follow_piece_rules() {
        let board = SandboxBoard::new();
        assert!(board.is_move_legal(sq("e2"), sq("e4")));
        assert!(board.is_move_legal(sq("e2"), sq("e3")));
        assert!(!board.is_move_legal(sq("e2"), sq("e5")));
        assert!(board.is_move_legal(sq("g1"), sq("f3")));
        assert!(!board.is_move_legal(sq("f1"), sq("c4")));
        // Black is not on move.
        assert!(!board.is_move_legal(sq("e7"), sq("e5")));
    }

    #[test]
    fn knight_to_f3_has_one_candidate_at_the_start() {
        let board = SandboxBoard::new();
        let intent = MoveIntent::PieceToSquare {
            piece: PieceType::Knight,
            to: sq("f3"),
        };
        assert_eq!(resolve(&intent, &board), vec![sq("g1")]);
    }

    #[test]
    fn two_knights_can_share_a_destination() {
        let mut board = SandboxBoard::empty(Color::White);
        place(&mut board, "g1", Color::White, PieceType::Knight);
        place(&mut board, "d4", Color::White, PieceType::Knight);
        place(&mut board, "e8", Color::Black, PieceType::King);

        let intent = MoveIntent::PieceToSquare {
            piece: PieceType::Knight,
            to: sq("f3"),
        };
        assert_eq!(resolve(&intent, &board), vec![sq("d4"), sq("g1")]);
    }

    #[test]
    fn executing_alternates_sides() {
        let mut board = SandboxBoard::new();
        assert!(board.execute_move(sq("e2"), sq("e4")));
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.piece_type_at(sq("e4")), None);
        assert_eq!(board.piece_type_at(sq("e7")), Some(PieceType::Pawn));

        assert!(!board.execute_move(sq("e4"), sq("e5")));
        assert!(board.execute_move(sq("e7"), sq("e5")));
        // Blocked head to head.
        assert!(!board.is_move_legal(sq("e4"), sq("e5")));
        assert!(board.is_move_legal(sq("f1"), sq("c4")));
    }

    #[test]
    fn pawns_capture_diagonally_and_promote() {
        let mut board = SandboxBoard::empty(Color::White);
        place(&mut board, "b7", Color::White, PieceType::Pawn);
        place(&mut board, "a8", Color::Black, PieceType::Rook);
        place(&mut board, "d4", Color::White, PieceType::Pawn);
        place(&mut board, "e5", Color::Black, PieceType::Pawn);

        assert!(board.is_move_legal(sq("d4"), sq("e5")));
        assert!(!board.is_move_legal(sq("d4"), sq("c5")));

        assert!(board.execute_move(sq("b7"), sq("a8")));
        board.side_to_move = Color::White;
        assert_eq!(board.piece_type_at(sq("a8")), Some(PieceType::Queen));
    }

    #[test]
    fn sliders_stop_at_blockers() {
        let mut board = SandboxBoard::empty(Color::White);
        place(&mut board, "a1", Color::White, PieceType::Rook);
        place(&mut board, "a4", Color::White, PieceType::Pawn);
        place(&mut board, "d1", Color::Black, PieceType::Knight);

        assert!(board.is_move_legal(sq("a1"), sq("a3")));
        assert!(!board.is_move_legal(sq("a1"), sq("a5")));
        assert!(board.is_move_legal(sq("a1"), sq("d1")));
        assert!(!board.is_move_legal(sq("a1"), sq("e1")));
        assert!(!board.is_move_legal(sq("a1"), sq("b2")));
    }

    #[test]
    fn renders_the_starting_position() {
        let diagram = SandboxBoard::new().render();
        let lines: Vec<&str> = diagram.lines().collect();
        assert_eq!(lines[0], "8 r n b q k b n r ");
        assert_eq!(lines[7], "1 R N B Q K B N R ");
        assert_eq!(lines[8], "  a b c d e f g h");
    }
}
