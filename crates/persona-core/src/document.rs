//! Document and token cursor
//!
//! `Document` owns the text and its immutable token vector. `TokenRef` is a
//! cheap copyable cursor into it; all recognisers navigate with cursors and
//! never mutate tokens.

use std::fmt;
use std::sync::Arc;

use crate::lexicon::Morphology;
use crate::morph::{MorphClass, MorphInfo, MorphLang, WordForm};
use crate::referent::ExternalReferent;
use crate::token::{CharsInfo, NumberValue, Token, TokenKind};

/// Whitespace distance reported at the document edges
pub const EDGE_WHITESPACES: usize = 100;

/// An analysed text
pub struct Document {
    text: String,
    tokens: Vec<Token>,
    morphology: Arc<dyn Morphology>,
}

impl Document {
    pub fn new(
        text: impl Into<String>,
        tokens: Vec<Token>,
        morphology: Arc<dyn Morphology>,
    ) -> Self {
        Self {
            text: text.into(),
            tokens,
            morphology,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn morphology(&self) -> &dyn Morphology {
        self.morphology.as_ref()
    }

    pub fn shared_morphology(&self) -> Arc<dyn Morphology> {
        Arc::clone(&self.morphology)
    }

    pub fn first(&self) -> Option<TokenRef<'_>> {
        self.at(0)
    }

    pub fn at(&self, idx: usize) -> Option<TokenRef<'_>> {
        (idx < self.tokens.len()).then_some(TokenRef { doc: self, idx })
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenRef<'_>> {
        (0..self.tokens.len()).map(move |idx| TokenRef { doc: self, idx })
    }

    /// Source text from the start of token `begin` to the end of token `end`
    pub fn source_text(&self, begin: usize, end: usize) -> &str {
        match (self.tokens.get(begin), self.tokens.get(end)) {
            (Some(b), Some(e)) if b.begin_char <= e.end_char => {
                &self.text[b.begin_char..e.end_char]
            }
            _ => "",
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("text_len", &self.text.len())
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Position of one token inside a [`Document`]
#[derive(Clone, Copy)]
pub struct TokenRef<'a> {
    doc: &'a Document,
    idx: usize,
}

impl PartialEq for TokenRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx && std::ptr::eq(self.doc, other.doc)
    }
}

impl Eq for TokenRef<'_> {}

impl fmt::Debug for TokenRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.idx, self.source_text())
    }
}

impl<'a> TokenRef<'a> {
    pub fn doc(&self) -> &'a Document {
        self.doc
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn token(&self) -> &'a Token {
        &self.doc.tokens[self.idx]
    }

    pub fn next(&self) -> Option<TokenRef<'a>> {
        self.doc.at(self.idx + 1)
    }

    pub fn previous(&self) -> Option<TokenRef<'a>> {
        self.idx.checked_sub(1).and_then(|i| self.doc.at(i))
    }

    /// Cursor `n` tokens away, if inside the document
    pub fn offset(&self, n: isize) -> Option<TokenRef<'a>> {
        self.idx.checked_add_signed(n).and_then(|i| self.doc.at(i))
    }

    pub fn kind(&self) -> &'a TokenKind {
        &self.token().kind
    }

    pub fn term(&self) -> &'a str {
        &self.token().term
    }

    pub fn lang(&self) -> MorphLang {
        self.token().lang
    }

    pub fn begin_char(&self) -> usize {
        self.token().begin_char
    }

    pub fn end_char(&self) -> usize {
        self.token().end_char
    }

    /// Word token (including number words)
    pub fn is_word(&self) -> bool {
        self.token().is_word()
    }

    /// Token made of letters only
    pub fn is_letters(&self) -> bool {
        self.token().chars.is_letter
    }

    pub fn chars(&self) -> CharsInfo {
        self.token().chars
    }

    pub fn length_char(&self) -> usize {
        self.source_text().chars().count()
    }

    pub fn morph(&self) -> &'a [WordForm] {
        &self.token().morph
    }

    pub fn morph_info(&self) -> MorphInfo {
        self.token().morph_info()
    }

    pub fn morph_class_in_dictionary(&self) -> MorphClass {
        self.token().class_in_dictionary()
    }

    /// Lemma of the first reading, falling back to the term
    pub fn normal_case(&self) -> &'a str {
        self.morph()
            .first()
            .map(|f| f.normal_case.as_str())
            .unwrap_or_else(|| self.term())
    }

    pub fn referent(&self) -> Option<&'a ExternalReferent> {
        self.token().referent()
    }

    pub fn number(&self) -> Option<&'a NumberValue> {
        self.token().number()
    }

    /// Digits-only number token
    pub fn is_digit_number(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Number(n) if n.spelling == crate::token::NumberSpelling::Digit
        )
    }

    pub fn source_text(&self) -> &'a str {
        let t = self.token();
        &self.doc.text[t.begin_char..t.end_char]
    }

    /// Term or any lemma equals `ru` (or `ua` for Ukrainian tokens)
    pub fn is_value(&self, ru: &str, ua: Option<&str>) -> bool {
        let matches = |v: &str| {
            self.term() == v
                || self
                    .morph()
                    .iter()
                    .any(|f| f.normal_case == v || f.normal_full.as_deref() == Some(v))
        };
        if matches(ru) {
            return true;
        }
        match ua {
            Some(ua) => matches(ua),
            None => false,
        }
    }

    /// Term is one of `values`
    pub fn is_term_of(&self, values: &[&str]) -> bool {
        values.contains(&self.term())
    }

    pub fn is_char(&self, c: char) -> bool {
        let mut chars = self.term().chars();
        matches!(self.kind(), TokenKind::Punct) && chars.next() == Some(c) && chars.next().is_none()
    }

    pub fn is_char_of(&self, set: &str) -> bool {
        matches!(self.kind(), TokenKind::Punct)
            && self.term().chars().count() == 1
            && set.contains(self.term())
    }

    pub fn is_hiphen(&self) -> bool {
        self.is_char_of("-‐‑–—−")
    }

    pub fn is_comma(&self) -> bool {
        self.is_char(',')
    }

    pub fn is_and(&self) -> bool {
        match self.term() {
            "И" | "AND" | "&" => true,
            "ТА" | "Й" | "І" => self.lang().is_ua() && !self.lang().is_ru(),
            _ => false,
        }
    }

    pub fn is_or(&self) -> bool {
        matches!(self.term(), "ИЛИ" | "OR" | "ЛИБО" | "ЧИ" | "АБО")
    }

    pub fn is_comma_and(&self) -> bool {
        self.is_comma() || self.is_and()
    }

    pub fn newlines_before(&self) -> usize {
        self.token().newlines_before
    }

    /// First token of the document or first on its line
    pub fn is_newline_before(&self) -> bool {
        self.idx == 0 || self.token().newlines_before > 0
    }

    /// Last token of the document or last on its line
    pub fn is_newline_after(&self) -> bool {
        self.next().map_or(true, |n| n.token().newlines_before > 0)
    }

    pub fn whitespaces_before(&self) -> usize {
        if self.idx == 0 {
            EDGE_WHITESPACES
        } else {
            self.token().whitespaces_before
        }
    }

    pub fn whitespaces_after(&self) -> usize {
        self.next()
            .map_or(EDGE_WHITESPACES, |n| n.token().whitespaces_before)
    }

    pub fn is_whitespace_before(&self) -> bool {
        self.whitespaces_before() > 0
    }

    pub fn is_whitespace_after(&self) -> bool {
        self.whitespaces_after() > 0
    }

    /// Table cell/row separators left in by document converters
    pub fn is_table_control_char(&self) -> bool {
        self.is_char_of("\u{7}\u{1e}\u{1f}")
    }

    /// Tokens from `self` up to and including `end`
    pub fn until(&self, end: TokenRef<'a>) -> impl Iterator<Item = TokenRef<'a>> + 'a {
        let doc = self.doc;
        (self.idx..=end.idx).map(move |idx| TokenRef { doc, idx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;
    use crate::tokenizer::Tokenizer;

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    #[test]
    fn test_cursor_navigation() {
        let d = doc("Иванов И. П.");
        let t = d.first().unwrap();
        assert_eq!(t.term(), "ИВАНОВ");
        assert!(t.is_newline_before());
        let dot = t.next().unwrap().next().unwrap();
        assert!(dot.is_char('.'));
        assert_eq!(dot.previous().unwrap().term(), "И");
        assert_eq!(d.at(d.len() - 1).unwrap().whitespaces_after(), EDGE_WHITESPACES);
        assert!(d.at(d.len() - 1).unwrap().is_newline_after());
    }

    #[test]
    fn test_is_value_checks_lemmas() {
        let d = doc("министра");
        let t = d.first().unwrap();
        assert!(t.is_value("МИНИСТР", None));
        assert!(!t.is_value("ПРЕЗИДЕНТ", None));
    }

    #[test]
    fn test_newlines_and_source_text() {
        let d = doc("Иван\n\nПетров");
        let second = d.at(1).unwrap();
        assert_eq!(second.newlines_before(), 2);
        assert!(d.first().unwrap().is_newline_after());
        assert_eq!(d.source_text(0, 1), "Иван\n\nПетров");
        assert_eq!(second.source_text(), "Петров");
    }

    #[test]
    fn test_punctuation_tests() {
        let d = doc("Смит , Джон - и");
        assert!(d.at(1).unwrap().is_comma());
        assert!(d.at(3).unwrap().is_hiphen());
        assert!(d.at(4).unwrap().is_and());
        assert!(d.at(1).unwrap().is_comma_and());
    }
}
