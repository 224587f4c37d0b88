//! Tokenizer
//!
//! Splits text into words, numbers and punctuation, attaches morphology
//! and collapses referent spans into single tokens. Referent spans come
//! from the caller or from a small set of regex rules for dates, phones
//! and URIs.

use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::document::Document;
use crate::lexicon::{normalize, Morphology};
use crate::morph::MorphLang;
use crate::numbers;
use crate::referent::{ExternalReferent, ReferentKind, ReferentSpan};
use crate::token::{is_cyrillic, CharsInfo, NumberValue, Token, TokenKind};

/// How a detection rule turns its match into a referent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectRule {
    /// 12.05.1975
    NumericDate,
    /// 12 мая 1975 г.
    WordDate,
    /// 1975 г., 1975 года
    Year,
    Phone,
    Uri,
}

impl DetectRule {
    fn kind(&self) -> ReferentKind {
        match self {
            Self::NumericDate | Self::WordDate | Self::Year => ReferentKind::Date,
            Self::Phone => ReferentKind::Phone,
            Self::Uri => ReferentKind::Uri,
        }
    }
}

const MONTHS: &[(&str, u32)] = &[
    ("ЯНВАР", 1),
    ("ФЕВРАЛ", 2),
    ("МАРТ", 3),
    ("АПРЕЛ", 4),
    ("МА", 5),
    ("ИЮН", 6),
    ("ИЮЛ", 7),
    ("АВГУСТ", 8),
    ("СЕНТЯБР", 9),
    ("ОКТЯБР", 10),
    ("НОЯБР", 11),
    ("ДЕКАБР", 12),
    ("СІЧН", 1),
    ("ЛЮТ", 2),
    ("БЕРЕЗН", 3),
    ("КВІТН", 4),
    ("ТРАВН", 5),
    ("ЧЕРВН", 6),
    ("ЛИПН", 7),
    ("СЕРПН", 8),
    ("ВЕРЕСН", 9),
    ("ЖОВТН", 10),
    ("ЛИСТОПАД", 11),
    ("ГРУДН", 12),
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

fn month_number(word: &str) -> Option<u32> {
    let word = normalize(word);
    // Longest stem wins: МАРТА is March, МАЯ is May
    MONTHS
        .iter()
        .filter(|(stem, _)| word.starts_with(stem))
        .max_by_key(|(stem, _)| stem.len())
        .map(|(_, m)| *m)
}

/// Text to [`Document`] converter
pub struct Tokenizer {
    morphology: Arc<dyn Morphology>,
    patterns: Vec<(Regex, DetectRule)>,
    detect_referents: bool,
}

impl Tokenizer {
    pub fn new(morphology: Arc<dyn Morphology>) -> Self {
        let mut tokenizer = Self {
            morphology,
            patterns: Vec::new(),
            detect_referents: true,
        };
        tokenizer.init_patterns();
        tokenizer
    }

    /// Turn the built-in date/phone/URI detection on or off
    pub fn with_referent_detection(mut self, enabled: bool) -> Self {
        self.detect_referents = enabled;
        self
    }

    fn init_patterns(&mut self) {
        self.add_pattern(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b", DetectRule::NumericDate);
        self.add_pattern(
            r"(?i)\b(\d{1,2})\s+([а-яіїєa-z]{3,})\s+(\d{4})(?:\s*(?:года|году|г\.|г\b|р\.))?",
            DetectRule::WordDate,
        );
        self.add_pattern(
            r"(?i)\b(1\d{3}|20\d{2})\s*(?:года|году|год|г\.|г\b|р\.|року)",
            DetectRule::Year,
        );
        self.add_pattern(
            r"(?:\+7|\b8|\+380|\+1)\s*\(?\d{3}\)?[\s-]*\d{3}[\s-]*\d{2}[\s-]*\d{2}\b",
            DetectRule::Phone,
        );
        self.add_pattern(r"\b[\w.+-]+@[\w-]+(?:\.[\w-]+)+\b", DetectRule::Uri);
        self.add_pattern(r"\bhttps?://[^\s<>()]+", DetectRule::Uri);
    }

    fn add_pattern(&mut self, pattern: &str, rule: DetectRule) {
        if let Ok(regex) = Regex::new(pattern) {
            self.patterns.push((regex, rule));
        }
    }

    /// Referent spans found by the detection rules
    pub fn detect_referents(&self, text: &str) -> Vec<ReferentSpan> {
        let mut spans: Vec<ReferentSpan> = Vec::new();
        for (regex, rule) in &self.patterns {
            for caps in regex.captures_iter(text) {
                let Some(mat) = caps.get(0) else { continue };
                let Some(referent) = build_referent(*rule, &caps) else {
                    continue;
                };
                let span = ReferentSpan::new(mat.start(), mat.end(), referent);
                if spans.iter().any(|s| s.overlaps(&span)) {
                    continue;
                }
                spans.push(span);
            }
        }
        spans.sort_by_key(|s| s.begin);
        spans
    }

    pub fn document(&self, text: &str) -> Document {
        self.document_with_referents(text, &[])
    }

    /// Analyse `text` with caller-supplied referent spans; they take
    /// precedence over detected ones
    pub fn document_with_referents(&self, text: &str, spans: &[ReferentSpan]) -> Document {
        let tokens = self.tokenize_with_referents(text, spans);
        Document::new(text, tokens, Arc::clone(&self.morphology))
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenize_with_referents(text, &[])
    }

    pub fn tokenize_with_referents(&self, text: &str, spans: &[ReferentSpan]) -> Vec<Token> {
        let mut all: Vec<ReferentSpan> = spans
            .iter()
            .filter(|s| s.begin < s.end && s.end <= text.len())
            .cloned()
            .collect();
        if self.detect_referents {
            for span in self.detect_referents(text) {
                if !all.iter().any(|s| s.overlaps(&span)) {
                    all.push(span);
                }
            }
        }
        all.sort_by_key(|s| s.begin);

        let tokens = self.split(text);
        let tokens = collapse_referents(tokens, &all);
        debug!(tokens = tokens.len(), referents = all.len(), "Text tokenized");
        tokens
    }

    fn split(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut whitespaces = 0;
        let mut newlines = 0;
        let mut iter = text.char_indices().peekable();

        while let Some((begin, c)) = iter.next() {
            if c.is_whitespace() {
                if c == '\n' || c == '\r' {
                    if !(c == '\r' && iter.peek().is_some_and(|(_, n)| *n == '\n')) {
                        newlines += 1;
                        whitespaces += 1;
                    }
                } else {
                    whitespaces += 1;
                }
                continue;
            }

            let mut end = begin + c.len_utf8();
            let mut token = if c.is_alphabetic() {
                while let Some(&(i, n)) = iter.peek() {
                    let apostrophe_inside = is_apostrophe(n)
                        && text[i + n.len_utf8()..]
                            .chars()
                            .next()
                            .is_some_and(char::is_alphabetic);
                    if n.is_alphabetic() || is_accent(n) || apostrophe_inside {
                        end = i + n.len_utf8();
                        iter.next();
                    } else {
                        break;
                    }
                }
                self.word_token(&text[begin..end], begin, end)
            } else if c.is_ascii_digit() {
                while let Some(&(i, n)) = iter.peek() {
                    if !n.is_ascii_digit() {
                        break;
                    }
                    end = i + n.len_utf8();
                    iter.next();
                }
                let src = &text[begin..end];
                let kind = match src.parse::<u64>() {
                    Ok(v) => TokenKind::Number(NumberValue::digit(v)),
                    Err(_) => TokenKind::Word,
                };
                Token::new(src, kind, begin, end)
            } else {
                Token::new(c.to_string(), TokenKind::Punct, begin, end)
            };

            token.whitespaces_before = whitespaces;
            token.newlines_before = newlines;
            whitespaces = 0;
            newlines = 0;
            tokens.push(token);
        }
        tokens
    }

    fn word_token(&self, src: &str, begin: usize, end: usize) -> Token {
        let clean: String = src.chars().filter(|c| !is_accent(*c)).collect();
        let term = normalize(&clean);
        let morph = self.morphology.analyze(&term);
        let kind = match numbers::word_number(&term, &morph) {
            Some(n) => TokenKind::Number(n),
            None => TokenKind::Word,
        };
        let letters: String = clean.chars().filter(|c| !is_apostrophe(*c)).collect();
        let mut token = Token::new(term, kind, begin, end);
        token.chars = CharsInfo::from_text(&letters);
        token.lang = detect_lang(&letters);
        token.morph = morph;
        token
    }
}

fn is_apostrophe(c: char) -> bool {
    matches!(c, '\'' | '’' | 'ʼ')
}

fn is_accent(c: char) -> bool {
    c == '\u{301}'
}

fn detect_lang(word: &str) -> MorphLang {
    if word.chars().all(|c| c.is_ascii_alphabetic()) {
        MorphLang::EN
    } else if word.chars().any(|c| "ІЇЄҐіїєґ".contains(c)) {
        MorphLang::UA
    } else if word.chars().any(is_cyrillic) {
        MorphLang::RU
    } else {
        MorphLang::UNDEFINED
    }
}

fn build_referent(rule: DetectRule, caps: &regex::Captures<'_>) -> Option<ExternalReferent> {
    let group = |i: usize| caps.get(i).map(|m| m.as_str());
    match rule {
        DetectRule::NumericDate => {
            let day = group(1)?.parse().ok()?;
            let month = group(2)?.parse().ok()?;
            let year = group(3)?.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day).map(ExternalReferent::full_date)
        }
        DetectRule::WordDate => {
            let day = group(1)?.parse().ok()?;
            let month = month_number(group(2)?)?;
            let year = group(3)?.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day).map(ExternalReferent::full_date)
        }
        DetectRule::Year => group(1)?.parse().ok().map(ExternalReferent::year_date),
        DetectRule::Phone | DetectRule::Uri => {
            Some(ExternalReferent::new(rule.kind(), group(0)?.trim()))
        }
    }
}

/// Replace tokens covered by a span with one referent token
fn collapse_referents(tokens: Vec<Token>, spans: &[ReferentSpan]) -> Vec<Token> {
    if spans.is_empty() {
        return tokens;
    }
    let mut res: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut spans = spans.iter().peekable();
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        while spans.peek().is_some_and(|s| s.end <= token.begin_char) {
            spans.next();
        }
        let Some(span) = spans.peek().filter(|s| s.begin < token.end_char) else {
            res.push(token);
            continue;
        };
        let mut end = token.end_char;
        while let Some(next) = iter.peek() {
            if next.begin_char >= span.end {
                break;
            }
            end = next.end_char;
            iter.next();
        }
        let mut collapsed = Token::new(
            String::new(),
            TokenKind::Referent(span.referent.clone()),
            token.begin_char,
            end,
        );
        collapsed.whitespaces_before = token.whitespaces_before;
        collapsed.newlines_before = token.newlines_before;
        res.push(collapsed);
        spans.next();
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(Lexicon::shared().unwrap())
    }

    #[test]
    fn test_split_words_numbers_punct() {
        let tokens = tokenizer().tokenize("Иванов И.П., 45 лет");
        let terms: Vec<&str> = tokens.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["ИВАНОВ", "И", ".", "П", ".", ",", "45", "ЛЕТ"]);
        assert!(matches!(tokens[6].kind, TokenKind::Number(ref n) if n.value == 45));
        assert_eq!(tokens[1].whitespaces_before, 1);
        assert_eq!(tokens[3].whitespaces_before, 0);
        assert!(tokens[0].chars.is_capital_upper);
    }

    #[test]
    fn test_yo_and_language() {
        let tokens = tokenizer().tokenize("Пётр John Іван");
        assert_eq!(tokens[0].term, "ПЕТР");
        assert_eq!(tokens[0].lang, MorphLang::RU);
        assert_eq!(tokens[1].lang, MorphLang::EN);
        assert_eq!(tokens[2].lang, MorphLang::UA);
    }

    #[test]
    fn test_apostrophe_inside_word() {
        let tokens = tokenizer().tokenize("О'Коннор");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].term, "О'КОННОР");
        assert!(tokens[0].chars.is_letter);
    }

    #[test]
    fn test_newlines_counted_once_for_crlf() {
        let tokens = tokenizer().tokenize("Иван\r\nПетров");
        assert_eq!(tokens[1].newlines_before, 1);
    }

    #[test]
    fn test_number_words() {
        let tokens = tokenizer().tokenize("первый заместитель");
        assert!(matches!(&tokens[0].kind, TokenKind::Number(n) if n.value == 1 && n.is_adjective));
        assert!(tokens[0].is_word());
    }

    #[test]
    fn test_detects_dates() {
        let tk = tokenizer();
        let tokens = tk.tokenize("родился 12.05.1975 в Москве");
        let date = tokens.iter().find_map(|t| t.referent()).unwrap();
        assert_eq!(date.kind, ReferentKind::Date);
        assert_eq!(date.year, Some(1975));
        assert_eq!(tokens.len(), 4);

        let tokens = tk.tokenize("с 1950 г. работал");
        let year = tokens.iter().find_map(|t| t.referent()).unwrap();
        assert_eq!(year.year, Some(1950));

        let spans = tk.detect_referents("12 мая 1975 года");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].referent.date, NaiveDate::from_ymd_opt(1975, 5, 12));
    }

    #[test]
    fn test_detection_can_be_disabled() {
        let tokens = tokenizer()
            .with_referent_detection(false)
            .tokenize("12.05.1975");
        assert!(tokens.iter().all(|t| t.referent().is_none()));
    }

    #[test]
    fn test_caller_spans_collapse_tokens() {
        let text = "министр финансов России Иванов";
        let begin = text.find("России").unwrap();
        let span = ReferentSpan::new(
            begin,
            begin + "России".len(),
            ExternalReferent::geo("РОССИЯ", "state"),
        );
        let tokens = tokenizer().tokenize_with_referents(text, &[span]);
        assert_eq!(tokens.len(), 4);
        let geo = tokens[2].referent().unwrap();
        assert!(geo.is_state());
        assert_eq!(tokens[2].whitespaces_before, 1);
    }

    #[test]
    fn test_month_stems() {
        assert_eq!(month_number("мая"), Some(5));
        assert_eq!(month_number("марта"), Some(3));
        assert_eq!(month_number("грудня"), Some(12));
        assert_eq!(month_number("рубля"), None);
    }
}
