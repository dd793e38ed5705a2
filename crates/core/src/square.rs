use serde::Serialize;
use std::fmt;

/// A file/rank coordinate on the 8x8 board. Both components are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Builds a square, returning `None` when either coordinate is outside 1..=8.
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if (1..=8).contains(&file) && (1..=8).contains(&rank) {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    /// Parses the algebraic form, e.g. `"e4"`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::from_chars(file, rank)
    }

    pub(crate) fn from_chars(file: char, rank: char) -> Option<Self> {
        if !('a'..='h').contains(&file) {
            return None;
        }
        let rank = rank.to_digit(10)? as u8;
        Self::new(file as u8 - b'a' + 1, rank)
    }

    pub fn file(&self) -> u8 {
        self.file
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Every square, file-major: a1, a2, .., a8, b1, .. h8.
    pub fn all() -> impl Iterator<Item = Square> {
        (1..=8u8).flat_map(|file| (1..=8u8).map(move |rank| Square { file, rank }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file - 1) as char, self.rank)
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    // Spoken forms, including what the recognizer tends to hear instead.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            PieceType::Pawn => &["pawn", "pawns", "pond", "prawn"],
            PieceType::Knight => &["knight", "knights", "night", "nite", "horse"],
            PieceType::Bishop => &["bishop", "bishops"],
            PieceType::Rook => &["rook", "rooks", "rock", "castle"],
            PieceType::Queen => &["queen", "queens"],
            PieceType::King => &["king", "kings"],
        }
    }

    /// Maps a single spoken word to a piece type.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|piece| piece.keywords().contains(&word))
    }

    pub fn name(self) -> &'static str {
        self.keywords()[0]
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
