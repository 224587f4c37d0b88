//! Person identity documents
//!
//! Passports, birth certificates, driving licences and tax numbers written
//! next to a person: "паспорт серия 45 02 № 123456 выдан ОВД ... 12.05.2010".
//! The phrase is split into typed pieces which may come in any order after
//! the document keyword.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::trace;

use persona_core::{ExternalReferent, ReferentKind, TokenRef};

use crate::context::{geo_at, AnalysisContext};
use crate::terminology::{AttrKind, Termin, TerminCollection};

// ============================================================================
// Referent
// ============================================================================

/// An identity document of a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonIdentityReferent {
    /// Lower-case document type (паспорт, снилс)
    pub typ: String,
    /// Series and number without separators
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<ExternalReferent>,
    /// Issuing organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<ExternalReferent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ExternalReferent>,
    /// Registration address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<ExternalReferent>,
}

impl PersonIdentityReferent {
    pub fn new(typ: impl Into<String>) -> Self {
        Self {
            typ: typ.into(),
            number: String::new(),
            date: None,
            org: None,
            state: None,
            address: None,
        }
    }
}

impl std::fmt::Display for PersonIdentityReferent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.typ)?;
        if let Some(state) = &self.state {
            write!(f, " ({})", state.value)?;
        }
        write!(f, ": {}", self.number)?;
        if let Some(org) = &self.org {
            write!(f, ", выдан {org}")?;
        }
        if let Some(date) = &self.date {
            write!(f, ", {date}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Pieces
// ============================================================================

/// Role of one piece of an identity phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdTokenKind {
    Keyword,
    Seria,
    Number,
    Vidan,
    Code,
    Date,
    Org,
    Address,
    State,
}

impl IdTokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "KEYWORD",
            Self::Seria => "SERIA",
            Self::Number => "NUMBER",
            Self::Vidan => "VIDAN",
            Self::Code => "CODE",
            Self::Date => "DATE",
            Self::Org => "ORG",
            Self::Address => "ADDRESS",
            Self::State => "STATE",
        }
    }
}

struct IdTerm {
    canonical: &'static str,
    kind: IdTokenKind,
    variants: &'static [&'static str],
    abridges: &'static [&'static str],
}

const fn id_term(
    canonical: &'static str,
    kind: IdTokenKind,
    variants: &'static [&'static str],
    abridges: &'static [&'static str],
) -> IdTerm {
    IdTerm {
        canonical,
        kind,
        variants,
        abridges,
    }
}

const ID_TERMS: &[IdTerm] = &[
    id_term(
        "ПАСПОРТ",
        IdTokenKind::Keyword,
        &["ПАССПОРТ", "ПАСПОРТНЫЕ ДАННЫЕ", "ВНУТРЕННИЙ ПАСПОРТ"],
        &[],
    ),
    id_term(
        "ЗАГРАНИЧНЫЙ ПАСПОРТ",
        IdTokenKind::Keyword,
        &["ЗАГРАНПАСПОРТ", "МЕЖДУНАРОДНЫЙ ПАСПОРТ"],
        &[],
    ),
    id_term("СВИДЕТЕЛЬСТВО О РОЖДЕНИИ", IdTokenKind::Keyword, &[], &[]),
    id_term("СВИДЕТЕЛЬСТВО О СМЕРТИ", IdTokenKind::Keyword, &["СПРАВКА О СМЕРТИ"], &[]),
    id_term("УДОСТОВЕРЕНИЕ ЛИЧНОСТИ", IdTokenKind::Keyword, &[], &[]),
    // lemma pieces match the oblique cases
    id_term(
        "ВОДИТЕЛЬСКОЕ УДОСТОВЕРЕНИЕ",
        IdTokenKind::Keyword,
        &["ВОДИТЕЛЬСКИЙ УДОСТОВЕРЕНИЕ", "ВОДИТЕЛЬСКИЕ ПРАВА"],
        &[],
    ),
    id_term("ВОЕННЫЙ БИЛЕТ", IdTokenKind::Keyword, &[], &[]),
    id_term("СНИЛС", IdTokenKind::Keyword, &[], &[]),
    id_term("ИНН", IdTokenKind::Keyword, &[], &[]),
    id_term("СЕРИЯ", IdTokenKind::Seria, &[], &["СЕР."]),
    id_term("НОМЕР", IdTokenKind::Number, &[], &["НОМ.", "Н-Р"]),
    id_term(
        "ВЫДАТЬ",
        IdTokenKind::Vidan,
        &[
            "ВЫДАН",
            "ВЫДАНА",
            "ВЫДАНО",
            "ВЫДАННЫЙ",
            "ДАТА ВЫДАЧИ",
            "ДАТА РЕГИСТРАЦИИ",
        ],
        &[],
    ),
    id_term("КОД ПОДРАЗДЕЛЕНИЯ", IdTokenKind::Code, &["КОД"], &["К/П"]),
    id_term(
        "РЕГИСТРАЦИЯ",
        IdTokenKind::Address,
        &[
            "ЗАРЕГИСТРИРОВАН",
            "ЗАРЕГИСТРИРОВАНА",
            "ЗАРЕГИСТРИРОВАННЫЙ",
            "АДРЕС РЕГИСТРАЦИИ",
            "ПРОПИСАН",
            "ПРОПИСАНА",
            "АДРЕС ПРОПИСКИ",
            "МЕСТО ЖИТЕЛЬСТВА",
        ],
        &[],
    ),
];

static ID_KEYWORDS: Lazy<TerminCollection> = Lazy::new(|| {
    let mut res = TerminCollection::new();
    for term in ID_TERMS {
        let mut t = Termin::new(term.canonical, AttrKind::Other);
        for v in term.variants {
            t.add_variant(v);
        }
        for a in term.abridges {
            t.add_abridge(a);
        }
        res.add(t);
    }
    res
});

fn kind_of(canonical: &str) -> IdTokenKind {
    ID_TERMS
        .iter()
        .find(|t| t.canonical == canonical)
        .map_or(IdTokenKind::Keyword, |t| t.kind)
}

/// Display type of a keyword
fn keyword_type(canonical: &str) -> String {
    match canonical {
        "СНИЛС" | "ИНН" => canonical.to_string(),
        _ => canonical.to_lowercase(),
    }
}

#[derive(Debug, Clone)]
struct IdToken<'a> {
    kind: IdTokenKind,
    begin: TokenRef<'a>,
    end: TokenRef<'a>,
    value: String,
    referent: Option<ExternalReferent>,
}

impl<'a> IdToken<'a> {
    fn new(kind: IdTokenKind, begin: TokenRef<'a>, end: TokenRef<'a>) -> Self {
        Self {
            kind,
            begin,
            end,
            value: String::new(),
            referent: None,
        }
    }
}

/// Digit groups on one line ("45 02", "123456"); at most 4 groups
fn collect_digits(t: TokenRef<'_>) -> Option<(String, TokenRef<'_>)> {
    if !t.is_digit_number() {
        return None;
    }
    let mut value = t.source_text().to_string();
    let mut end = t;
    let mut groups = 1;
    while let Some(n) = end.next() {
        if !n.is_digit_number() || n.is_newline_before() || groups >= 4 {
            break;
        }
        value.push_str(n.source_text());
        end = n;
        groups += 1;
    }
    Some((value, end))
}

/// Number prefix: "№", "N", "номер"
fn number_prefix(t: TokenRef<'_>) -> Option<TokenRef<'_>> {
    if t.is_char('№') || t.is_char('#') || (t.term() == "N" && t.chars().is_all_upper) {
        return Some(t);
    }
    let m = ID_KEYWORDS.try_parse(t)?;
    (kind_of(&m.termin.canonical) == IdTokenKind::Number).then_some(m.end)
}

/// "гражданина/гражданки" + state after a keyword
fn state_after<'a>(t: TokenRef<'a>) -> Option<(ExternalReferent, TokenRef<'a>)> {
    let mut cur = t;
    if cur.is_value("ГРАЖДАНИН", Some("ГРОМАДЯНИН"))
        || cur.is_value("ГРАЖДАНКА", Some("ГРОМАДЯНКА"))
    {
        cur = cur.next()?;
    }
    let geo = geo_at(cur)?;
    geo.is_state().then_some((geo, cur))
}

fn parse_id_token<'a>(t: TokenRef<'a>) -> Option<IdToken<'a>> {
    if let Some(r) = t.referent() {
        let kind = match r.kind {
            ReferentKind::Date => IdTokenKind::Date,
            ReferentKind::Organization => IdTokenKind::Org,
            ReferentKind::Address => IdTokenKind::Address,
            ReferentKind::Geo if r.is_state() => IdTokenKind::State,
            _ => return None,
        };
        let mut res = IdToken::new(kind, t, t);
        res.referent = Some(r.clone());
        return Some(res);
    }

    // "от 12.05.2010"
    if t.is_term_of(&["ОТ", "ВІД"]) {
        let n = t.next()?;
        let r = n.referent().filter(|r| r.kind == ReferentKind::Date)?;
        let mut res = IdToken::new(IdTokenKind::Date, t, n);
        res.referent = Some(r.clone());
        return Some(res);
    }

    if let Some(prefix_end) = number_prefix(t) {
        let (value, end) = collect_digits(prefix_end.next()?)?;
        let mut res = IdToken::new(IdTokenKind::Number, t, end);
        res.value = value;
        return Some(res);
    }

    if let Some((value, end)) = collect_digits(t) {
        if value.len() < 4 {
            return None;
        }
        let mut res = IdToken::new(IdTokenKind::Number, t, end);
        res.value = value;
        return Some(res);
    }

    let m = ID_KEYWORDS.try_parse(t)?;
    let kind = kind_of(&m.termin.canonical);
    let mut res = IdToken::new(kind, t, m.end);
    match kind {
        IdTokenKind::Keyword => {
            res.value = keyword_type(&m.termin.canonical);
            if let Some((state, end)) = m.end.next().and_then(state_after) {
                res.referent = Some(state);
                res.end = end;
            }
        }
        IdTokenKind::Seria => {
            let mut next = m.end.next()?;
            if next.is_char(':') {
                next = next.next()?;
            }
            let (value, end) = collect_digits(next)?;
            res.value = value;
            res.end = end;
        }
        IdTokenKind::Code => {
            // "770-001"
            let mut cur = m.end;
            while let Some(n) = cur.next() {
                let part = n.is_digit_number() || n.is_hiphen() || n.is_char(':');
                if n.is_newline_before() || !part {
                    break;
                }
                cur = n;
            }
            res.end = cur;
        }
        IdTokenKind::Address => {
            // "зарегистрирован по адресу: <address>"
            let mut cur = m.end.next();
            while let Some(n) = cur {
                if n.is_char(':')
                    || n.is_term_of(&["ПО", "ЗА"])
                    || n.is_value("АДРЕС", Some("АДРЕСА"))
                {
                    cur = n.next();
                    continue;
                }
                break;
            }
            if let Some(n) = cur {
                if let Some(r) = n.referent().filter(|r| r.kind == ReferentKind::Address) {
                    res.referent = Some(r.clone());
                    res.end = n;
                }
            }
        }
        _ => {}
    }
    Some(res)
}

// ============================================================================
// Assembly
// ============================================================================

/// A recognised identity document phrase
#[derive(Debug, Clone)]
pub struct IdentityMatch<'a> {
    pub begin: TokenRef<'a>,
    pub end: TokenRef<'a>,
    pub referent: PersonIdentityReferent,
}

/// Identity document phrase starting with a document keyword at `t`
pub fn try_attach_identity<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
) -> Option<IdentityMatch<'a>> {
    let first = parse_id_token(t)?;
    if first.kind != IdTokenKind::Keyword {
        return None;
    }
    let mut res = PersonIdentityReferent::new(first.value.clone());
    res.state = first.referent.clone();
    let mut end = first.end;
    let mut seria: Option<String> = None;
    let mut number: Option<String> = None;

    let mut cur = first.end.next();
    while let Some(tt) = cur {
        if tt.newlines_before() > 1 || tt.is_table_control_char() {
            break;
        }
        if tt.is_char_of(",:;") || tt.is_hiphen() || tt.is_value("ОТДЕЛ", None) {
            cur = tt.next();
            continue;
        }
        let Some(it) = parse_id_token(tt) else {
            break;
        };
        match it.kind {
            IdTokenKind::Keyword => break,
            IdTokenKind::Seria => {
                if seria.is_some() {
                    break;
                }
                seria = Some(it.value.clone());
            }
            IdTokenKind::Number => {
                if number.is_some() || it.value.is_empty() {
                    break;
                }
                number = Some(it.value.clone());
            }
            IdTokenKind::Date => {
                if res.date.is_some() {
                    break;
                }
                res.date = it.referent.clone();
            }
            IdTokenKind::Org => {
                if res.org.is_some() {
                    break;
                }
                res.org = it.referent.clone();
            }
            IdTokenKind::State => {
                if res.state.is_some() {
                    break;
                }
                res.state = it.referent.clone();
            }
            IdTokenKind::Address => {
                if it.referent.is_some() {
                    if res.address.is_some() {
                        break;
                    }
                    res.address = it.referent.clone();
                }
            }
            IdTokenKind::Vidan | IdTokenKind::Code => {}
        }
        end = it.end;
        cur = it.end.next();
    }

    res.number = match (seria, number) {
        (Some(s), Some(n)) => format!("{s}{n}"),
        (None, Some(n)) => n,
        (Some(s), None) if s.len() > 5 => s,
        _ => return None,
    };
    trace!(doc = %res, level = ctx.level(), "Identity document");
    Some(IdentityMatch {
        begin: first.begin,
        end,
        referent: res,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{AnalysisConfig, Document, Lexicon, ReferentSpan, Tokenizer};

    use crate::terminology::Terminology;

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    fn attach(d: &Document) -> Option<PersonIdentityReferent> {
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(d, &terms, &config);
        try_attach_identity(&ctx, d.first().unwrap()).map(|m| m.referent)
    }

    #[test]
    fn test_passport_digit_groups() {
        let d = doc("паспорт 45 02 123456");
        let r = attach(&d).unwrap();
        assert_eq!(r.typ, "паспорт");
        assert_eq!(r.number, "4502123456");
    }

    #[test]
    fn test_series_number_and_issue_date() {
        let d = doc("паспорт серия 45 02 № 123456 выдан 12.05.2010");
        let r = attach(&d).unwrap();
        assert_eq!(r.number, "4502123456");
        assert_eq!(r.date.as_ref().and_then(|d| d.year), Some(2010));
    }

    #[test]
    fn test_state_of_passport() {
        let d = doc("паспорт гражданина РФ 4502 123456");
        let r = attach(&d).unwrap();
        assert!(r.state.as_ref().is_some_and(|s| s.is_state()));
        assert_eq!(r.number, "4502123456");
        assert!(r.to_string().starts_with("паспорт (РФ): 4502123456"));
    }

    #[test]
    fn test_issuing_organization() {
        let text = "паспорт 4502 123456 выдан ОВД Тверского района";
        let begin = text.find("ОВД").unwrap();
        let spans = vec![ReferentSpan::new(
            begin,
            text.len(),
            ExternalReferent::organization("ТВЕРСКОГО РАЙОНА", "овд"),
        )];
        let d = Tokenizer::new(Lexicon::shared().unwrap()).document_with_referents(text, &spans);
        let r = attach(&d).unwrap();
        assert_eq!(r.org.as_ref().map(|o| o.value.as_str()), Some("ТВЕРСКОГО РАЙОНА"));
    }

    #[test]
    fn test_keyword_without_number() {
        assert!(attach(&doc("паспорт утерян")).is_none());
        assert!(attach(&doc("номер 123456")).is_none());
    }

    #[test]
    fn test_tax_number() {
        let r = attach(&doc("ИНН 7707083893")).unwrap();
        assert_eq!(r.typ, "ИНН");
        assert_eq!(r.number, "7707083893");
    }
}
