//! Number helpers
//!
//! Roman numerals, number words and age phrases (`35 лет`, `35-летний`,
//! `в возрасте 35 лет`).

use crate::document::TokenRef;
use crate::morph::WordForm;
use crate::token::NumberValue;

const ROMAN: &[(u64, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Ordinal adjectives by lemma
const ORDINALS: &[(&str, u64)] = &[
    ("ПЕРВЫЙ", 1),
    ("ВТОРОЙ", 2),
    ("ТРЕТИЙ", 3),
    ("ЧЕТВЕРТЫЙ", 4),
    ("ПЯТЫЙ", 5),
    ("ШЕСТОЙ", 6),
    ("СЕДЬМОЙ", 7),
    ("ВОСЬМОЙ", 8),
    ("ДЕВЯТЫЙ", 9),
    ("ДЕСЯТЫЙ", 10),
    ("ОДИННАДЦАТЫЙ", 11),
    ("ДВЕНАДЦАТЫЙ", 12),
    ("ТРИНАДЦАТЫЙ", 13),
    ("ЧЕТЫРНАДЦАТЫЙ", 14),
    ("ПЯТНАДЦАТЫЙ", 15),
    ("ШЕСТНАДЦАТЫЙ", 16),
    ("СЕМНАДЦАТЫЙ", 17),
    ("ВОСЕМНАДЦАТЫЙ", 18),
    ("ДЕВЯТНАДЦАТЫЙ", 19),
    ("ДВАДЦАТЫЙ", 20),
];

/// ТРЕТИЙ declines irregularly and is listed form by form
const THIRD_FORMS: &[&str] = &[
    "ТРЕТЬЕГО", "ТРЕТЬЕМУ", "ТРЕТЬИМ", "ТРЕТЬЕМ", "ТРЕТЬЯ", "ТРЕТЬЕЙ", "ТРЕТЬЮ", "ТРЕТЬЕ",
    "ТРЕТЬИ", "ТРЕТЬИХ",
];

/// Cardinal number words by surface form
const CARDINALS: &[(&str, u64)] = &[
    ("ОДИН", 1),
    ("ОДНА", 1),
    ("ДВА", 2),
    ("ДВЕ", 2),
    ("ДВУХ", 2),
    ("ТРИ", 3),
    ("ТРЕХ", 3),
    ("ЧЕТЫРЕ", 4),
    ("ЧЕТЫРЕХ", 4),
    ("ПЯТЬ", 5),
    ("ШЕСТЬ", 6),
    ("СЕМЬ", 7),
    ("ВОСЕМЬ", 8),
    ("ДЕВЯТЬ", 9),
    ("ДЕСЯТЬ", 10),
];

/// Parse a Roman numeral; Cyrillic Х and І are accepted as X and I
pub fn parse_roman(s: &str) -> Option<u64> {
    if s.is_empty() || s.chars().count() > 15 {
        return None;
    }
    let latin: String = s
        .chars()
        .map(|c| match c.to_ascii_uppercase() {
            'Х' | 'х' => 'X',
            'І' | 'і' => 'I',
            other => other,
        })
        .collect();
    let value_of = |c: char| match c {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        'D' => Some(500),
        'M' => Some(1000),
        _ => None,
    };
    let digits = latin.chars().map(value_of).collect::<Option<Vec<u64>>>()?;
    let mut total = 0;
    for (i, d) in digits.iter().enumerate() {
        match digits.get(i + 1) {
            Some(next) if next > d => total -= *d as i64,
            _ => total += *d as i64,
        }
    }
    let total = u64::try_from(total).ok().filter(|v| *v > 0)?;
    // Reject non-canonical spellings such as IIII or VX
    (to_roman(total) == latin).then_some(total)
}

pub fn to_roman(mut n: u64) -> String {
    let mut res = String::new();
    for (value, digits) in ROMAN {
        while n >= *value {
            res.push_str(digits);
            n -= value;
        }
    }
    res
}

pub fn ordinal_value(lemma: &str) -> Option<u64> {
    if THIRD_FORMS.contains(&lemma) {
        return Some(3);
    }
    ORDINALS.iter().find(|(w, _)| *w == lemma).map(|(_, v)| *v)
}

pub fn cardinal_value(term: &str) -> Option<u64> {
    CARDINALS.iter().find(|(w, _)| *w == term).map(|(_, v)| *v)
}

/// Value of a number word given its term and readings
pub fn word_number(term: &str, forms: &[WordForm]) -> Option<NumberValue> {
    if let Some(v) = ordinal_value(term) {
        return Some(NumberValue::words(v, true));
    }
    for form in forms.iter().filter(|f| f.in_dictionary) {
        if let Some(v) = ordinal_value(&form.normal_case) {
            return Some(NumberValue::words(v, true));
        }
    }
    cardinal_value(term).map(|v| NumberValue::words(v, false))
}

/// Roman numeral written as one Latin or Cyrillic token
pub fn try_parse_roman(t: TokenRef<'_>) -> Option<u64> {
    if !t.is_letters() || !t.chars().is_all_upper {
        return None;
    }
    parse_roman(t.source_text())
}

/// Ordinal number at `t`: digits, Roman numeral or ordinal word
pub fn ordinal_at(t: TokenRef<'_>) -> Option<u64> {
    if let Some(n) = t.number() {
        return Some(n.value);
    }
    try_parse_roman(t)
}

fn is_years_word(t: TokenRef<'_>) -> bool {
    t.is_term_of(&["ЛЕТ", "ГОД", "ГОДА", "Г", "РОКІВ", "РОКИ", "РІК", "YEARS", "YEAR"])
}

/// Age phrase starting at `t`; returns the age and the last token
pub fn try_parse_age<'a>(t: TokenRef<'a>) -> Option<(u32, TokenRef<'a>)> {
    let mut t = t;
    let mut introduced = false;
    if t.is_term_of(&["В", "У"]) {
        let next = t.next()?;
        if next.is_value("ВОЗРАСТ", Some("ВІК")) {
            t = next.next()?;
            introduced = true;
        }
    } else if t.is_value("ВОЗРАСТ", Some("ВІК")) {
        t = t.next()?;
        introduced = true;
    }

    let n = t.number().filter(|n| n.value > 0 && n.value < 150)?;
    let age = u32::try_from(n.value).ok()?;
    let next = t.next();

    // 35-летний
    if let Some(h) = next.filter(|h| h.is_hiphen()) {
        if let Some(w) = h.next() {
            if w.term().starts_with("ЛЕТН") || w.term().starts_with("РІЧН") {
                return Some((age, w));
            }
        }
    }

    if let Some(y) = next.filter(|y| is_years_word(*y)) {
        let mut end = y;
        if y.term() == "Г" {
            if let Some(dot) = y.next().filter(|d| d.is_char('.')) {
                end = dot;
            }
        } else if let Some(od) = y.next().filter(|x| x.term() == "ОТ") {
            if let Some(rodu) = od.next().filter(|x| x.term() == "РОДУ") {
                end = rodu;
            }
        }
        return Some((age, end));
    }

    // "в возрасте 35" without a unit
    introduced.then_some((age, t))
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
    fn test_roman_roundtrip_values() {
        assert_eq!(parse_roman("XIV"), Some(14));
        assert_eq!(parse_roman("MCMXC"), Some(1990));
        assert_eq!(parse_roman("ХХ"), Some(20));
        assert_eq!(parse_roman("IIII"), None);
        assert_eq!(parse_roman("ABC"), None);
        assert_eq!(to_roman(4), "IV");
    }

    #[test]
    fn test_word_numbers() {
        assert_eq!(ordinal_value("ПЕРВЫЙ"), Some(1));
        assert_eq!(ordinal_value("ТРЕТЬЕГО"), Some(3));
        assert_eq!(ordinal_value("ТРЕТЬЯКОВ"), None);
        assert_eq!(cardinal_value("ДВУХ"), Some(2));
        let n = word_number("ВТОРОГО", &[]).or_else(|| {
            let lex = Lexicon::builtin().ok()?;
            word_number("ВТОРОГО", lex.lookup("ВТОРОГО"))
        });
        assert_eq!(n.map(|n| (n.value, n.is_adjective)), Some((2, true)));
    }

    #[test]
    fn test_age_phrases() {
        let d = doc("35 лет");
        let (age, end) = try_parse_age(d.first().unwrap()).unwrap();
        assert_eq!(age, 35);
        assert_eq!(end.term(), "ЛЕТ");

        let d = doc("35-летний");
        let (age, end) = try_parse_age(d.first().unwrap()).unwrap();
        assert_eq!(age, 35);
        assert_eq!(end.idx(), 2);

        let d = doc("в возрасте 70 лет");
        let (age, end) = try_parse_age(d.first().unwrap()).unwrap();
        assert_eq!(age, 70);
        assert!(end.is_newline_after());

        assert!(try_parse_age(doc("35 рублей").first().unwrap()).is_none());
    }
}
