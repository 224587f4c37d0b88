//! Tokens
//!
//! A token is a word, a number, a punctuation character or a collapsed
//! referent span. Word terms are upper case with Ё folded into Е; offsets
//! are byte offsets into the document text.

use serde::{Deserialize, Serialize};

use crate::morph::{MorphClass, MorphInfo, MorphLang, WordForm};
use crate::referent::ExternalReferent;

/// How a number was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberSpelling {
    Digit,
    Roman,
    Words,
}

impl NumberSpelling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digit => "digit",
            Self::Roman => "roman",
            Self::Words => "words",
        }
    }
}

/// Numeric value of a number token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberValue {
    pub value: u64,
    pub spelling: NumberSpelling,
    /// Ordinal number word (ПЕРВЫЙ, ВТОРОГО)
    pub is_adjective: bool,
}

impl NumberValue {
    pub fn digit(value: u64) -> Self {
        Self {
            value,
            spelling: NumberSpelling::Digit,
            is_adjective: false,
        }
    }

    pub fn words(value: u64, is_adjective: bool) -> Self {
        Self {
            value,
            spelling: NumberSpelling::Words,
            is_adjective,
        }
    }
}

/// Token payload
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Word,
    Punct,
    Number(NumberValue),
    Referent(ExternalReferent),
}

/// Character class summary of a token's source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharsInfo {
    pub is_letter: bool,
    pub is_all_upper: bool,
    pub is_all_lower: bool,
    /// First letter upper, the rest lower (Иванов)
    pub is_capital_upper: bool,
    pub is_last_lower: bool,
    pub is_latin_letter: bool,
    pub is_cyrillic_letter: bool,
}

impl CharsInfo {
    pub fn from_text(text: &str) -> Self {
        let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() || letters.len() != text.chars().count() {
            return Self::default();
        }
        let upper = letters.iter().filter(|c| c.is_uppercase()).count();
        let lower = letters.len() - upper;
        let first_upper = letters[0].is_uppercase();
        Self {
            is_letter: true,
            is_all_upper: lower == 0,
            is_all_lower: upper == 0,
            is_capital_upper: first_upper && upper == 1 && letters.len() > 1,
            is_last_lower: letters.last().is_some_and(|c| c.is_lowercase()),
            is_latin_letter: letters.iter().all(|c| c.is_ascii_alphabetic()),
            is_cyrillic_letter: letters.iter().all(|c| is_cyrillic(*c)),
        }
    }

    /// Same capitalisation style
    pub fn same_case_style(&self, other: &CharsInfo) -> bool {
        self.is_all_upper == other.is_all_upper
            && self.is_all_lower == other.is_all_lower
            && self.is_capital_upper == other.is_capital_upper
    }
}

pub(crate) fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c)
}

/// One token of a [`crate::Document`]
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Normalised upper-case text; empty for referent tokens
    pub term: String,
    pub kind: TokenKind,
    pub begin_char: usize,
    pub end_char: usize,
    pub whitespaces_before: usize,
    pub newlines_before: usize,
    pub chars: CharsInfo,
    pub morph: Vec<WordForm>,
    pub lang: MorphLang,
}

impl Token {
    pub fn new(
        term: impl Into<String>,
        kind: TokenKind,
        begin_char: usize,
        end_char: usize,
    ) -> Self {
        Self {
            term: term.into(),
            kind,
            begin_char,
            end_char,
            whitespaces_before: 0,
            newlines_before: 0,
            chars: CharsInfo::default(),
            morph: Vec::new(),
            lang: MorphLang::UNDEFINED,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Word) || self.is_number_word()
    }

    /// Number spelled with letters (keeps its word forms)
    pub fn is_number_word(&self) -> bool {
        matches!(&self.kind, TokenKind::Number(n) if n.spelling != NumberSpelling::Digit)
    }

    pub fn number(&self) -> Option<&NumberValue> {
        match &self.kind {
            TokenKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn referent(&self) -> Option<&ExternalReferent> {
        match &self.kind {
            TokenKind::Referent(r) => Some(r),
            _ => None,
        }
    }

    pub fn morph_info(&self) -> MorphInfo {
        let mut info = MorphInfo::from_forms(&self.morph);
        info.lang = self.lang;
        info
    }

    /// Union of word classes over dictionary readings only
    pub fn class_in_dictionary(&self) -> MorphClass {
        self.morph
            .iter()
            .filter(|f| f.in_dictionary)
            .fold(MorphClass::UNDEFINED, |acc, f| acc | f.class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chars_info_capital() {
        let chars = CharsInfo::from_text("Иванов");
        assert!(chars.is_letter);
        assert!(chars.is_capital_upper);
        assert!(chars.is_cyrillic_letter);
        assert!(!chars.is_latin_letter);
        assert!(chars.is_last_lower);
    }

    #[test]
    fn test_chars_info_upper_and_mixed() {
        let upper = CharsInfo::from_text("ООН");
        assert!(upper.is_all_upper && !upper.is_capital_upper);

        let single = CharsInfo::from_text("И");
        assert!(single.is_all_upper && !single.is_capital_upper);

        let digits = CharsInfo::from_text("45");
        assert!(!digits.is_letter);
    }

    #[test]
    fn test_number_token() {
        let token = Token::new("ПЕРВЫЙ", TokenKind::Number(NumberValue::words(1, true)), 0, 12);
        assert!(token.is_word());
        assert_eq!(token.number().map(|n| n.value), Some(1));
        assert!(token.referent().is_none());
    }
}
