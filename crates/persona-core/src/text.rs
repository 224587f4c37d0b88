//! Text helpers
//!
//! Sentence starts, brackets, text values of token ranges, Latin/Cyrillic
//! transliteration and fuzzy comparison.

use crate::document::TokenRef;
use crate::token::TokenKind;

// ============================================================================
// Sentences
// ============================================================================

fn is_eng_article(t: TokenRef<'_>) -> bool {
    t.chars().is_latin_letter && t.is_term_of(&["THE", "A", "AN"])
}

/// Can a sentence start at `t`
pub fn can_be_start_of_sentence(t: TokenRef<'_>) -> bool {
    let Some(prev) = t.previous() else {
        return true;
    };
    if !t.is_table_control_char() && prev.is_table_control_char() {
        return true;
    }
    if !t.is_whitespace_before() {
        return false;
    }
    let chars = t.chars();
    if chars.is_letter && chars.is_all_lower {
        let pc = prev.chars();
        if pc.is_letter && pc.is_all_lower {
            return false;
        }
        if (prev.is_hiphen() || prev.is_comma()) && !prev.is_whitespace_before() {
            if let Some(pp) = prev.previous() {
                if pp.chars().is_letter && pp.chars().is_all_lower {
                    return false;
                }
            }
        }
    }
    if t.whitespaces_before() > 25 || t.newlines_before() > 2 {
        return true;
    }
    if prev.is_comma_and() || prev.morph_class_in_dictionary().is_conjunction() {
        return false;
    }
    if is_eng_article(prev) || prev.is_char(':') {
        return false;
    }
    if prev.is_char(';') && t.is_newline_before() {
        return true;
    }
    if prev.is_hiphen() {
        if prev.is_newline_before() {
            return true;
        }
        if prev.previous().is_some_and(|pp| pp.is_char('.')) {
            return true;
        }
    }
    if chars.is_letter && chars.is_all_lower {
        return false;
    }
    if t.is_newline_before() || prev.is_char_of("!?") {
        return true;
    }
    if prev.is_char('.') {
        if t.whitespaces_before() > 1 {
            return true;
        }
        // "И. И." initials are not sentence ends
        if t.next().is_some_and(|n| n.is_char('.')) {
            if let Some(pp) = prev.previous() {
                if !(pp.chars().is_letter && pp.chars().is_all_lower) {
                    return false;
                }
            }
        }
        return true;
    }
    is_eng_article(t)
}

// ============================================================================
// Brackets
// ============================================================================

const OPEN_BRACKETS: &str = "([{«„“\"'";
const CLOSE_BRACKETS: &str = ")]}»“”\"'";

/// Maximal number of tokens between two brackets
pub const BRACKET_LIMIT: usize = 50;

pub fn is_bracket(t: TokenRef<'_>) -> bool {
    t.is_char_of(OPEN_BRACKETS) || t.is_char_of(CLOSE_BRACKETS)
}

pub fn is_open_bracket(t: TokenRef<'_>) -> bool {
    t.is_char_of(OPEN_BRACKETS)
}

fn closing_for(open: &str) -> &'static str {
    match open {
        "(" => ")",
        "[" => "]",
        "{" => "}",
        "«" => "»",
        "„" => "“”",
        "“" => "”\"",
        "\"" => "\"”",
        "'" => "'",
        _ => "",
    }
}

/// Matching closing bracket for an opening bracket at `t`, on the same line
pub fn try_parse_bracket<'a>(t: TokenRef<'a>) -> Option<TokenRef<'a>> {
    if !is_open_bracket(t) {
        return None;
    }
    let close = closing_for(t.term());
    let mut cur = t.next()?;
    for _ in 0..BRACKET_LIMIT {
        if cur.is_newline_before() {
            return None;
        }
        if cur.is_char_of(close) {
            return Some(cur);
        }
        if is_open_bracket(cur) && cur.term() != t.term() {
            if let Some(inner) = try_parse_bracket(cur) {
                cur = inner.next()?;
                continue;
            }
        }
        cur = cur.next()?;
    }
    None
}

// ============================================================================
// Text values
// ============================================================================

/// Upper-case text of `begin..=end`: terms joined by their original spacing,
/// referents by their value; brackets and quotes are dropped
pub fn text_value(begin: TokenRef<'_>, end: TokenRef<'_>) -> String {
    let mut res = String::new();
    // whitespace before a dropped bracket still separates the words around it
    let mut space = false;
    for t in begin.until(end) {
        if is_bracket(t) {
            space |= t.is_whitespace_before() || t.is_whitespace_after();
            continue;
        }
        let piece = match t.kind() {
            TokenKind::Referent(r) => r.value.to_uppercase(),
            TokenKind::Number(n) if t.term().is_empty() => n.value.to_string(),
            _ => t.term().to_string(),
        };
        if piece.is_empty() {
            continue;
        }
        let glue = t.is_hiphen() || res.ends_with('-');
        if !res.is_empty() && (t.is_whitespace_before() || space) && !glue {
            res.push(' ');
        }
        space = false;
        res.push_str(&piece);
    }
    res
}

// ============================================================================
// Transliteration
// ============================================================================

/// Latin letters that look like Cyrillic ones
const LOOKALIKES: &[(char, char)] = &[
    ('A', 'А'),
    ('B', 'В'),
    ('C', 'С'),
    ('E', 'Е'),
    ('H', 'Н'),
    ('I', 'І'),
    ('K', 'К'),
    ('M', 'М'),
    ('O', 'О'),
    ('P', 'Р'),
    ('T', 'Т'),
    ('X', 'Х'),
    ('Y', 'У'),
];

pub fn latin_to_cyrillic_char(c: char) -> Option<char> {
    LOOKALIKES.iter().find(|(l, _)| *l == c).map(|(_, r)| *r)
}

pub fn cyrillic_to_latin_char(c: char) -> Option<char> {
    match c {
        'И' => Some('I'),
        _ => LOOKALIKES.iter().find(|(_, r)| *r == c).map(|(l, _)| *l),
    }
}

const CYR_TO_LAT: &[(char, &str)] = &[
    ('А', "A"),
    ('Б', "B"),
    ('В', "V"),
    ('Г', "G"),
    ('Д', "D"),
    ('Е', "E"),
    ('Ё', "E"),
    ('Ж', "ZH"),
    ('З', "Z"),
    ('И', "I"),
    ('Й', "Y"),
    ('К', "K"),
    ('Л', "L"),
    ('М', "M"),
    ('Н', "N"),
    ('О', "O"),
    ('П', "P"),
    ('Р', "R"),
    ('С', "S"),
    ('Т', "T"),
    ('У', "U"),
    ('Ф', "F"),
    ('Х', "KH"),
    ('Ц', "TS"),
    ('Ч', "CH"),
    ('Ш', "SH"),
    ('Щ', "SHCH"),
    ('Ъ', ""),
    ('Ы', "Y"),
    ('Ь', ""),
    ('Э', "E"),
    ('Ю', "YU"),
    ('Я', "YA"),
    ('І', "I"),
    ('Ї', "YI"),
    ('Є', "YE"),
    ('Ґ', "G"),
];

/// Phonetic transliteration of an upper-case Cyrillic word
pub fn transliterate(word: &str) -> String {
    word.chars()
        .map(|c| {
            CYR_TO_LAT
                .iter()
                .find(|(k, _)| *k == c)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_else(|| c.to_string())
        })
        .collect()
}

/// Collapse spelling variation that transliteration cannot decide
fn phonetic_key(word: &str) -> String {
    let mut s = word.to_uppercase();
    for (from, to) in [
        ("DZH", "J"),
        ("ZH", "J"),
        ("KH", "H"),
        ("CK", "K"),
        ("PH", "F"),
        ("W", "V"),
        ("Y", "I"),
        ("EE", "I"),
        ("OO", "U"),
        ("C", "K"),
    ] {
        s = s.replace(from, to);
    }
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        if res.ends_with(c) {
            continue;
        }
        res.push(c);
    }
    res
}

/// Same name in two scripts (ДЖОН / JON, МАЙКЛ / MAIKL)
pub fn names_equal_translit(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let a_lat = transliterate(&a.to_uppercase());
    let b_lat = transliterate(&b.to_uppercase());
    a_lat == b_lat || phonetic_key(&a_lat) == phonetic_key(&b_lat)
}

// ============================================================================
// Letters and comparison
// ============================================================================

pub fn is_cyrillic_vowel(c: char) -> bool {
    "АЕЁИОУЫЭЮЯІЇЄаеёиоуыэюяіїє".contains(c)
}

pub fn is_latin_vowel(c: char) -> bool {
    "AEIOUYaeiouy".contains(c)
}

pub fn is_vowel(c: char) -> bool {
    is_cyrillic_vowel(c) || is_latin_vowel(c)
}

pub fn is_cyrillic_char(c: char) -> bool {
    crate::token::is_cyrillic(c)
}

pub fn is_latin_char(c: char) -> bool {
    c.is_ascii_alphabetic()
}

pub fn ends_with_any(word: &str, tails: &[&str]) -> bool {
    tails.iter().any(|t| word.ends_with(t))
}

/// `test` differs from `pattern` by at most one substitution or one
/// dropped letter after the second position
pub fn is_not_more_than_one_error(pattern: &str, test: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = test.chars().collect();
    if p.is_empty() || t.is_empty() {
        return false;
    }
    if p.len() == t.len() {
        return p.iter().zip(&t).filter(|(a, b)| a != b).count() <= 1;
    }
    if t.len() + 1 == p.len() {
        let i = p.iter().zip(&t).take_while(|(a, b)| a == b).count();
        if i < 2 {
            return false;
        }
        return t[i..] == p[i + 1..];
    }
    false
}

/// Token or one of its lemmas is within one error of `value`
pub fn token_not_more_than_one_error(value: &str, t: TokenRef<'_>) -> bool {
    if t.is_value(value, None) || is_not_more_than_one_error(value, t.term()) {
        return true;
    }
    t.morph()
        .iter()
        .any(|f| is_not_more_than_one_error(value, &f.normal_case))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;
    use crate::tokenizer::Tokenizer;
    use crate::Document;

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    #[test]
    fn test_sentence_start() {
        let d = doc("Он ушел. Иванов И. П. пришел");
        assert!(can_be_start_of_sentence(d.first().unwrap()));
        let ivanov = d.iter().find(|t| t.term() == "ИВАНОВ").unwrap();
        assert!(can_be_start_of_sentence(ivanov));
        let p = d.iter().find(|t| t.term() == "П").unwrap();
        assert!(!can_be_start_of_sentence(p));
        let came = d.iter().find(|t| t.term() == "ПРИШЕЛ").unwrap();
        assert!(!can_be_start_of_sentence(came));
    }

    #[test]
    fn test_brackets() {
        let d = doc("Джон (John) Смит");
        let open = d.at(1).unwrap();
        let close = try_parse_bracket(open).unwrap();
        assert_eq!(close.idx(), 3);
        assert!(try_parse_bracket(d.first().unwrap()).is_none());

        let d = doc("( Иван\n Петров )");
        assert!(try_parse_bracket(d.first().unwrap()).is_none());
    }

    #[test]
    fn test_text_value() {
        let d = doc("генерал - майор (в отставке)");
        let v = text_value(d.first().unwrap(), d.at(d.len() - 1).unwrap());
        assert_eq!(v, "ГЕНЕРАЛ-МАЙОР В ОТСТАВКЕ");

        let d = doc("посол «по особым поручениям»");
        let v = text_value(d.first().unwrap(), d.at(d.len() - 1).unwrap());
        assert_eq!(v, "ПОСОЛ ПО ОСОБЫМ ПОРУЧЕНИЯМ");
    }

    #[test]
    fn test_translit() {
        assert_eq!(transliterate("ЩУКИН"), "SHCHUKIN");
        assert!(names_equal_translit("ДЖОН", "JON"));
        assert!(names_equal_translit("МАЙКЛ", "MAIKL"));
        assert!(!names_equal_translit("ИВАН", "PETER"));
        assert_eq!(latin_to_cyrillic_char('C'), Some('С'));
        assert_eq!(cyrillic_to_latin_char('Р'), Some('P'));
    }

    #[test]
    fn test_one_error() {
        assert!(is_not_more_than_one_error("ИВАНОВ", "ИВАНОВ"));
        assert!(is_not_more_than_one_error("ИВАНОВ", "ИВАНАВ"));
        assert!(is_not_more_than_one_error("ИВАНОВ", "ИВАНВ"));
        assert!(!is_not_more_than_one_error("ИВАНОВ", "ИВАНОВА"));
        assert!(!is_not_more_than_one_error("ИВАНОВ", "ПЕТРОВ"));
    }
}
