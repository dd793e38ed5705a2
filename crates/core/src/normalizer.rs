//! Transcript normalization.
//!
//! Speech recognizers return loosely punctuated, homophone-ridden text such as
//! `"Move the knight to F. three"` or `"bee two to bee for"`. This module turns
//! that into a compact token stream (`"knight f 3"`, `"b2 b4"`) that the intent
//! extractor can pattern-match.

const FILLER_WORDS: [&str; 11] = [
    "move", "from", "to", "on", "my", "your", "the", "piece", "say", "or", "ore",
];

const MENU_WORD: &str = "menu";

fn number_word(word: &str) -> Option<&'static str> {
    match word {
        "one" => Some("1"),
        "two" | "too" => Some("2"),
        "three" => Some("3"),
        "four" | "for" => Some("4"),
        "five" => Some("5"),
        "six" => Some("6"),
        "seven" => Some("7"),
        "eight" | "ate" => Some("8"),
        _ => None,
    }
}

fn file_homophone(word: &str) -> Option<char> {
    match word {
        "eh" => Some('a'),
        "bee" | "be" => Some('b'),
        "see" | "sea" => Some('c'),
        "dee" => Some('d'),
        "ee" | "eat" => Some('e'),
        "ef" | "eff" => Some('f'),
        "gee" | "ghee" => Some('g'),
        "age" | "aitch" => Some('h'),
        _ => None,
    }
}

fn is_rank_digit(token: &str) -> bool {
    matches!(token, "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8")
}

/// Returns true when `text` contains the standalone word "menu".
pub fn is_menu_command(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case(MENU_WORD))
}

/// Canonicalizes a raw transcript.
///
/// Deterministic and side-effect free. Menu commands are returned lowercased
/// and trimmed but otherwise untouched. An empty result means nothing usable
/// was said.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let trimmed = lowered.trim();

    if is_menu_command(trimmed) {
        return trimmed.to_string();
    }

    // Filler removal can bring a homophone next to a digit ("see the 4"), so the
    // substitution pass runs until nothing changes. After the first pass every
    // further change strictly shortens the text.
    let mut current = substitute(trimmed);
    loop {
        let next = substitute(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn substitute(text: &str) -> String {
    // Anything that is not a letter or a digit separates words, so "knight's"
    // and "(e4)" split the same way as "knight, e4".
    let numbered: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| number_word(token).unwrap_or(token))
        .collect();

    let mut fused: Vec<String> = Vec::with_capacity(numbered.len());
    let mut i = 0;
    while i < numbered.len() {
        let token = numbered[i];
        match (file_homophone(token), numbered.get(i + 1)) {
            (Some(file), Some(next)) if is_rank_digit(next) => {
                fused.push(format!("{file}{next}"));
                i += 2;
            }
            _ => {
                fused.push(token.to_string());
                i += 1;
            }
        }
    }

    fused
        .into_iter()
        .filter(|token| !FILLER_WORDS.contains(&token.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}
