//! Person attribute recognition
//!
//! Positions, titles, forms of address and other words describing a person:
//! "заместитель министра финансов", "господин", "король Испанский",
//! "35 лет". An attribute either precedes a name or stands on its own as a
//! person property. Positions nest ("заместитель министра" is a deputy whose
//! higher position is the minister), so the matcher recurses into itself and
//! into person recognition; the depth counter of the [`AnalysisContext`]
//! bounds that recursion.

use std::fmt;
use std::ops::BitOr;

use tracing::trace;

use persona_core::noun_phrase::{self, NounPhraseParams};
use persona_core::numbers::{try_parse_age, try_parse_roman};
use persona_core::text::{can_be_start_of_sentence, is_bracket, text_value, try_parse_bracket};
use persona_core::{
    CharsInfo, ExternalReferent, MorphCase, MorphClass, MorphGender, MorphInfo, MorphLang,
    MorphNumber, ReferentKind, TokenRef,
};

use crate::analyzer;
use crate::context::{geo_at, AnalysisContext};
use crate::property::{PersonProperty, PropertyKind, PropertyRef};
use crate::segmenter::{self, ItemKind, ParseAttrs};
use crate::terminology::{AttrKind, TermKind2, TermMatch, Termin, Terminology};

// ============================================================================
// Constants
// ============================================================================

/// Adjectives that wrap a position without changing it (известный актер)
const EMPTY_ADJS: &[&str] = &[
    "УСПЕШНЫЙ", "ИЗВЕСТНЫЙ", "ЗНАМЕНИТЫЙ", "ИЗВЕСТНЕЙШИЙ", "ПОПУЛЯРНЫЙ", "ГЕНИАЛЬНЫЙ",
    "ТАЛАНТЛИВЫЙ", "МОЛОДОЙ", "УСПІШНИЙ", "ВІДОМИЙ", "ЗНАМЕНИТИЙ", "ПОПУЛЯРНИЙ", "ГЕНІАЛЬНИЙ",
    "ТАЛАНОВИТИЙ", "МОЛОДИЙ",
];

/// Prefixes that name a citizenship or origin
const CITIZEN_PREFIXES: &[&str] = &[
    "ГРАЖДАНИН", "ГРАЖДАНКА", "УРОЖЕНЕЦ", "УРОЖЕНКА", "ВЫХОДЕЦ ИЗ", "ВИХОДЕЦЬ З", "ГРОМАДЯНИН",
    "ГРОМАДЯНКА", "УРОДЖЕНЕЦЬ", "УРОДЖЕНКА",
];

/// Units after which a position without an organization refers to the
/// organization mentioned before (директор компании)
const OUTER_ORG_WORDS: &[(&str, Option<&str>)] = &[
    ("КОМПАНИЯ", Some("КОМПАНІЯ")),
    ("ФИРМА", Some("ФІРМА")),
    ("ГРУППИРОВКА", Some("УГРУПОВАННЯ")),
    ("ПРЕДПРИЯТИЕ", Some("ПІДПРИЄМСТВО")),
    ("ПРЕЗИДИУМ", Some("ПРЕЗИДІЯ")),
    ("ФЕДЕРАЦИЯ", Some("ФЕДЕРАЦІЯ")),
    ("ВЕДОМСТВО", Some("ВІДОМСТВО")),
    ("БАНК", None),
    ("КОРПОРАЦИЯ", Some("КОРПОРАЦІЯ")),
];

/// Departments continuing a position in the nominative (начальник отдел кадров)
const DEPART_WORDS: &[&str] = &[
    "НАПРАВЛЕНИЕ", "ОТДЕЛ", "ОТДЕЛЕНИЕ", "ДЕПАРТАМЕНТ", "СЛУЖБА", "ПОДРАЗДЕЛЕНИЕ",
];

/// Words joined to a position by a hyphen-less prefix (вице президент)
const VICE_WORDS: &[(&str, Option<&str>)] = &[
    ("ВИЦЕ", Some("ВІЦЕ")),
    ("ЭКС", Some("ЕКС")),
    ("VICE", None),
    ("EX", None),
    ("DEPUTY", None),
];

// ============================================================================
// Attach attributes
// ============================================================================

/// Options of one attribute match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttachAttrs(u8);

impl AttachAttrs {
    pub const NO: Self = Self(0);
    /// The position after ЗАМЕСТИТЕЛЬ and similar deputy words
    pub const AFTER_DEPUTY_MARKER: Self = Self(1);
    /// The keyword alone, without continuation
    pub const ONLY_KEYWORD: Self = Self(2);
    /// Called while a person is being recognised
    pub const IN_PROCESS: Self = Self(4);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for AttachAttrs {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// Attribute Token
// ============================================================================

/// A recognised attribute over `begin..=end`
#[derive(Debug, Clone)]
pub struct AttributeToken<'a> {
    pub kind: AttrKind,
    pub begin: TokenRef<'a>,
    pub end: TokenRef<'a>,
    /// Canonical text of a prefix (ГОСПОДИН)
    pub value: Option<String>,
    pub property: Option<PersonProperty>,
    /// Attribute of the enclosing position (министр in "заместитель министра")
    pub higher: Option<Box<AttributeToken<'a>>>,
    pub age: Option<u32>,
    pub gender: MorphGender,
    pub morph: MorphInfo,
    /// The attribute alone denotes one person (его отец)
    pub can_be_single_person: bool,
    /// 1: a genitive person may follow (друг Иванова); 2: a list of first names
    pub can_precede_person: u8,
    /// Relatives sharing the surname of the person (братья Ивановы)
    pub can_be_same_surname: bool,
    pub is_doubtful: bool,
    /// The organization was picked up from the preceding text
    pub add_outer_org_as_ref: bool,
    pub(crate) independent: bool,
}

impl<'a> AttributeToken<'a> {
    pub fn new(kind: AttrKind, begin: TokenRef<'a>, end: TokenRef<'a>) -> Self {
        Self {
            kind,
            begin,
            end,
            value: None,
            property: None,
            higher: None,
            age: None,
            gender: MorphGender::UNDEFINED,
            morph: MorphInfo::new(),
            can_be_single_person: false,
            can_precede_person: 0,
            can_be_same_surname: false,
            is_doubtful: false,
            add_outer_org_as_ref: false,
            independent: false,
        }
    }

    fn position(begin: TokenRef<'a>, end: TokenRef<'a>, name: impl Into<String>) -> Self {
        let mut res = Self::new(AttrKind::Position, begin, end);
        res.property = Some(PersonProperty::new(name));
        res
    }

    pub fn chars(&self) -> CharsInfo {
        self.begin.chars()
    }

    pub fn whitespaces_after(&self) -> usize {
        self.end.whitespaces_after()
    }

    pub fn is_newline_before(&self) -> bool {
        self.begin.is_newline_before()
    }

    /// Name of the property, if any
    pub fn name(&self) -> Option<&str> {
        self.property.as_ref().map(|p| p.name.as_str())
    }

    fn set_name(&mut self, name: impl Into<String>) {
        if let Some(p) = self.property.as_mut() {
            p.name = name.into();
        }
    }

    fn has_refs(&self) -> bool {
        self.property.as_ref().is_some_and(PersonProperty::has_refs)
    }

    fn add_ref(&mut self, r: PropertyRef) {
        if let Some(p) = self.property.as_mut() {
            p.add_ref(r);
        }
    }

    fn has_geo_ref(&self) -> bool {
        self.property
            .as_ref()
            .is_some_and(|p| p.external_refs().any(|r| r.kind == ReferentKind::Geo))
    }

    /// The attribute may become a standalone property
    pub fn can_be_independent(&self) -> bool {
        let Some(prop) = &self.property else {
            return false;
        };
        if self.morph.number == MorphNumber::PLURAL {
            return false;
        }
        if self.higher.as_ref().is_some_and(|h| h.can_be_independent()) {
            return true;
        }
        if self.can_be_single_person {
            return true;
        }
        if self.kind != AttrKind::Position {
            return false;
        }
        if !self.independent {
            return prop.kind == PropertyKind::Boss;
        }
        prop.has_refs() && prop.name != "член"
    }

    /// Tokens of this attribute and its higher chain
    pub fn depth(&self) -> usize {
        std::iter::successors(Some(self), |a| a.higher.as_deref()).count() - 1
    }

    fn normalize_names(&mut self) {
        let mut cur = Some(self);
        while let Some(tok) = cur {
            if let Some(p) = tok.property.as_mut() {
                if p.name.contains(" - ") {
                    p.name = p.name.replace(" - ", "-");
                }
            }
            cur = tok.higher.as_deref_mut();
        }
    }

    /// Copy the higher attributes' properties into the property chain
    fn sync_higher(&mut self) {
        if let Some(h) = self.higher.as_mut() {
            h.sync_higher();
        }
        let higher = self.higher.as_ref().and_then(|h| h.property.clone());
        if let (Some(p), Some(hp)) = (self.property.as_mut(), higher) {
            if !p.set_higher(hp) {
                trace!(name = %p.name, "Higher property refused");
            }
        }
    }

    fn assign_kinds(&mut self, terms: &Terminology) {
        let mut cur = Some(self);
        while let Some(tok) = cur {
            if let Some(p) = tok.property.as_mut() {
                if p.kind == PropertyKind::Undefined {
                    p.kind = check_kind(terms, p);
                }
            }
            cur = tok.higher.as_deref_mut();
        }
    }

    fn property_kind(&self) -> PropertyKind {
        self.property.as_ref().map(|p| p.kind).unwrap_or_default()
    }
}

impl fmt::Display for AttributeToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.value.as_deref().unwrap_or(""))?;
        if let Some(p) = &self.property {
            write!(f, " Ref: {p}")?;
        }
        if !self.gender.is_undefined() {
            write!(f, "; {}", self.gender)?;
        }
        if self.can_precede_person > 0 {
            write!(f, " MayBePersonAfter={}", self.can_precede_person)?;
        }
        if let Some(age) = self.age {
            write!(f, " Age={age}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Token helpers
// ============================================================================

/// Referent at `t`, dictionary geo names included
fn ref_at(t: TokenRef<'_>) -> Option<ExternalReferent> {
    match t.referent() {
        Some(r) => Some(r.clone()),
        None => geo_at(t),
    }
}

fn ref_kind_at(t: TokenRef<'_>) -> Option<ReferentKind> {
    ref_at(t).map(|r| r.kind)
}

fn exists_in_dictionary(t: TokenRef<'_>) -> bool {
    t.morph().iter().any(|f| f.in_dictionary)
}

fn is_eng_article(t: Option<TokenRef<'_>>) -> bool {
    t.is_some_and(|t| t.is_term_of(&["THE", "A", "AN"]))
}

fn is_any_value(t: TokenRef<'_>, values: &[(&str, Option<&str>)]) -> bool {
    values.iter().any(|(ru, ua)| t.is_value(ru, *ua))
}

fn lower_text(begin: TokenRef<'_>, end: TokenRef<'_>) -> String {
    text_value(begin, end).to_lowercase()
}

/// ВСЕЯ РУСИ -> Всея Руси
fn capitalize_words(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// БЫТЬ, ЯВЛЯТЬСЯ and their Ukrainian counterparts
pub fn is_verb_be(t: TokenRef<'_>) -> bool {
    t.is_value("БЫТЬ", Some("БУТИ"))
        || t.is_value("ЯВЛЯТЬСЯ", Some("ЯВЛЯТИСЯ"))
        || t.is_term_of(&["ЕСТЬ", "Є"])
}

/// A person starts at `t` or was already recognised over it
pub fn is_person<'a>(ctx: &AnalysisContext<'a>, t: Option<TokenRef<'a>>) -> bool {
    let Some(t) = t else {
        return false;
    };
    if ctx.person_at(t.idx()).is_some() {
        return true;
    }
    if !t.is_letters() || t.chars().is_all_lower {
        return false;
    }
    analyzer::try_attach_person(ctx, t, 0, true).is_some()
}

// ============================================================================
// Public entry points
// ============================================================================

/// Recognise an attribute starting at `t`
///
/// Top-level matches are memoised per token and options; nested calls
/// share the recursion budget of the context.
pub fn try_attach<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let memo = ctx.level() == 0;
    if memo {
        if let Some(res) = ctx.memo_attr(t.idx(), attrs.bits()) {
            return res;
        }
    }
    let res = {
        let _guard = ctx.enter()?;
        attach_checked(ctx, t, attrs)
    };
    if memo {
        ctx.store_attr(t.idx(), attrs.bits(), res.clone());
    }
    res
}

/// Kind of a property by the terms its name is made of
pub fn check_kind(terms: &Terminology, prop: &PersonProperty) -> PropertyKind {
    let name = prop.name.to_uppercase();
    if name.is_empty() {
        return PropertyKind::Undefined;
    }
    let ua_terms = terms.find_by_string(&name, MorphLang::UA);
    for word in name.split([' ', '-']).filter(|w| !w.is_empty()) {
        let mut li = terms.find_by_string(word, MorphLang::RU);
        if li.is_empty() {
            li = ua_terms.clone();
        }
        let Some(term) = li.first() else {
            continue;
        };
        if term.flags.is_boss {
            return PropertyKind::Boss;
        }
        if term.flags.is_kin {
            return PropertyKind::Kin;
        }
        if term.kind == AttrKind::King && name != "ДОН" {
            return PropertyKind::King;
        }
        if term.flags.is_military_rank {
            if word == "ВИЦЕ" {
                continue;
            }
            if matches!(word, "КАПИТАН" | "CAPTAIN" | "КАПІТАН")
                && prop.external_refs().any(|r| r.kind == ReferentKind::Organization)
            {
                continue;
            }
            return PropertyKind::MilitaryRank;
        }
        if term.flags.is_nation {
            return PropertyKind::Nationality;
        }
    }
    PropertyKind::Undefined
}

/// Attribute keyword at `t` without any continuation; with `ignore_io`
/// deputy-like and adjective keywords are skipped
pub fn try_attach_word<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    ignore_io: bool,
) -> Option<TermMatch<'a, 'a>> {
    let mut tok = ctx.terms.try_parse(t)?;
    if tok.begin == tok.end && t.length_char() == 1 && t.is_value("Д", None) {
        if t.next().is_some_and(is_bracket) && !t.is_whitespace_after() {
            return None;
        }
    }
    if tok.termin.canonical == "ГРАФ" {
        tok.morph.remove_gender(MorphGender::MASCULINE);
    }
    if ignore_io && !matches!(tok.termin.kind2, TermKind2::Undefined | TermKind2::Grade) {
        return None;
    }
    Some(tok)
}

/// Position keyword at `t` (plain or deputy-like)
pub fn try_attach_position_word<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
) -> Option<TermMatch<'a, 'a>> {
    let tok = ctx.terms.try_parse(t)?;
    if tok.termin.kind != AttrKind::Position {
        return None;
    }
    matches!(tok.termin.kind2, TermKind2::Io2 | TermKind2::Undefined).then_some(tok)
}

// ============================================================================
// Checked match
// ============================================================================

fn attach_checked<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let Some(mut res) = attach_core(ctx, t, attrs) else {
        return attach_fallback(ctx, t, attrs);
    };
    res.assign_kinds(ctx.terms);

    if res.kind == AttrKind::Other && res.age.is_some() && res.value.is_none() {
        if let Some(mut res1) = res.end.next().and_then(|n| attach_core(ctx, n, attrs)) {
            res1.begin = res.begin;
            res1.age = res.age;
            res1.assign_kinds(ctx.terms);
            res = res1;
        }
    }
    if res.end.is_value("ТЕХНИК", None) && res.end.is_word() && res.end.term() != "ТЕХНИК" {
        return None;
    }
    if res.begin.is_value("ГЛАВА", None) {
        if t.previous().is_some_and(|p| p.number().is_some()) {
            return None;
        }
    } else if res.begin.is_value("АДВОКАТ", None)
        && t
            .previous()
            .is_some_and(|p| {
                p.is_value("РЕЕСТР", Some("РЕЄСТР"))
                    || p.is_value("УДОСТОВЕРЕНИЕ", Some("ПОСВІДЧЕННЯ"))
            })
    {
        return None;
    }
    if res.begin.morph_class_in_dictionary().is_adjective() {
        if let Some(npt) = noun_phrase::try_parse(res.begin, NounPhraseParams::default()) {
            if npt.end.idx() >= res.end.idx()
                && ctx.terms.try_parse(npt.end).is_none()
                && npt.end.chars().is_all_lower
            {
                return None;
            }
        }
    }
    if res.kind == AttrKind::Prefix
        && res.value.as_deref().is_some_and(|v| CITIZEN_PREFIXES.contains(&v))
        && res.end.next().is_some()
    {
        res = attach_citizen(ctx, res, attrs);
    }
    if matches!(res.kind, AttrKind::King | AttrKind::Position)
        && res.begin == res.end
        && res.chars().is_capital_upper
        && res.whitespaces_after() == 1
    {
        let std_tail = segmenter::attach_single(ctx, t, ParseAttrs::IGNORE_ATTRS, None)
            .and_then(|pit| pit.lastname)
            .is_some_and(|l| l.has_std_tail);
        if std_tail && !attrs.contains(AttachAttrs::IN_PROCESS) && !is_person(ctx, t.next()) {
            return None;
        }
    }
    if res.property.is_none() {
        return Some(res);
    }

    if res.chars().is_latin_letter {
        let mut tt = res.end.next();
        if let Some(h) = tt.filter(|h| h.is_hiphen()) {
            tt = h.next();
        }
        if let Some(e) = tt.filter(|e| e.is_value("ELECT", None)) {
            res.end = e;
        }
    }
    if !res.begin.chars().is_all_lower {
        let in_dict = segmenter::attach_single(ctx, res.begin, ParseAttrs::IGNORE_ATTRS, None)
            .and_then(|pit| pit.lastname)
            .is_some_and(|l| l.is_in_dictionary || l.is_in_ontology);
        if in_dict && res.property_kind() != PropertyKind::King {
            return None;
        }
    }
    if is_rejected(ctx, &res, t) {
        return None;
    }
    if res.chars().is_latin_letter
        && (res.is_doubtful || res.name() == Some("senior"))
        && res.whitespaces_after() < 2
    {
        if let Some(mut res2) = res.end.next().and_then(|n| attach_core(ctx, n, attrs)) {
            if res2.chars().is_latin_letter && res2.kind == res.kind && res2.property.is_some() {
                let name = format!("{} {}", res.name().unwrap_or(""), res2.name().unwrap_or(""));
                res2.set_name(name.trim());
                res2.begin = res.begin;
                res = res2;
            }
        }
    }
    if res.name() == Some("министр") {
        attach_ministry(&mut res);
    }
    res.normalize_names();

    if res.begin.morph_class_in_dictionary().is_adjective() {
        if let Some(r) = geo_at(res.begin) {
            res.add_ref(PropertyRef::External(r));
            if let Some(p) = res.property.as_mut() {
                if let Some(i) = p.name.find(' ') {
                    p.name = p.name[i..].trim().to_string();
                }
            }
        }
    }
    if res.property_kind() == PropertyKind::King {
        if res.name() == Some("отец") {
            let next = res.end.next()?;
            if !next.chars().is_capital_upper
                || (res.morph.case & next.morph_info().case).is_undefined()
            {
                return None;
            }
            res.set_name("священник");
            res.sync_higher();
            return Some(res);
        }
        attach_king_epithets(ctx, &mut res);
    }
    if !res.has_geo_ref() && res.whitespaces_after() < 2 {
        if let Some(next) = res.end.next() {
            if let Some(r) = next.referent().filter(|r| r.kind == ReferentKind::Geo) {
                res.add_ref(PropertyRef::External(r.clone()));
                res.end = next;
            }
        }
    }
    attach_date_suffix(&mut res);
    if res.name() == Some("отец") {
        if let Some(tt) = res.end.next() {
            let mc = tt.morph_class_in_dictionary();
            let case = tt.morph_info().case;
            if tt.is_word()
                && mc.is_proper_name()
                && !(res.morph.case & case).is_undefined()
                && !case.is_genitive()
            {
                res.set_name("священник");
            }
        }
    }
    if res.can_precede_person > 0 && !res.has_refs() {
        attach_person_after(ctx, &mut res);
    }
    if res.higher.is_none() && res.property_kind() == PropertyKind::Boss && !res.has_refs() {
        attach_outer_org(ctx, &mut res);
    }
    if res.chars().is_latin_letter && res.whitespaces_after() < 2 {
        if let Some(rnext) = res.end.next().and_then(|n| try_attach(ctx, n, AttachAttrs::NO)) {
            let plain = rnext
                .property
                .as_ref()
                .is_some_and(|p| !p.has_refs() && p.attrs.is_empty());
            if rnext.chars().is_latin_letter && plain && rnext.can_precede_person > 0 {
                let name = format!("{} {}", res.name().unwrap_or(""), rnext.name().unwrap_or(""));
                res.set_name(name);
                res.end = rnext.end;
            }
        }
    }
    res.assign_kinds(ctx.terms);
    res.sync_higher();
    trace!(attr = %res, "Attribute attached");
    Some(res)
}

/// Matches the core misses: АК., ВИЦЕ-/ЭКС-/ГЕН. compounds, "гвардии"
/// ranks and "профессия: ..." labels
fn attach_fallback<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let next = t.next()?;
    if t.term() == "АК"
        && next.is_char('.')
        && next.next().is_some_and(|n| !n.chars().is_all_lower)
    {
        return Some(AttributeToken::position(t, next, "академик"));
    }
    if t.is_word() && (is_any_value(t, VICE_WORDS) || t.is_value("ГЕН", None)) {
        let mut tt = Some(next);
        if next.is_hiphen() || next.is_char('.') {
            tt = next.next();
        }
        if let Some(mut res) = tt.and_then(|tt| attach_core(ctx, tt, attrs)) {
            if let Some(name) = res.name().map(str::to_string) {
                res.begin = t;
                if t.is_value("ГЕН", None) {
                    res.set_name(format!("генеральный {name}"));
                } else {
                    res.set_name(format!("{}-{name}", t.term().to_lowercase()));
                }
                res.assign_kinds(ctx.terms);
                res.sync_higher();
                return Some(res);
            }
        }
    }
    if t.is_value("ГВАРДИИ", Some("ГВАРДІЇ")) {
        if let Some(mut res) = attach_core(ctx, next, attrs) {
            res.assign_kinds(ctx.terms);
            if res.property_kind() == PropertyKind::MilitaryRank {
                res.begin = t;
                res.sync_higher();
                return Some(res);
            }
        }
    }
    let mut tt1 = t;
    if tt1.morph_class_in_dictionary().is_preposition() {
        tt1 = next;
    }
    if tt1.next().is_some()
        && (tt1.is_value("НАЦИОНАЛЬНОСТЬ", Some("НАЦІОНАЛЬНІСТЬ"))
            || tt1.is_value("ПРОФЕССИЯ", Some("ПРОФЕСІЯ"))
            || tt1.is_value("СПЕЦИАЛЬНОСТЬ", Some("СПЕЦІАЛЬНІСТЬ")))
    {
        let mut tt = tt1.next()?;
        if tt.is_hiphen() || tt.is_char(':') {
            tt = tt.next()?;
        }
        if let Some(mut res) = attach_core(ctx, tt, attrs) {
            res.begin = t;
            res.assign_kinds(ctx.terms);
            res.sync_higher();
            return Some(res);
        }
    }
    None
}

/// ГРАЖДАНИН РОССИИ, УРОЖЕНКА КИЕВА: the prefix becomes a position
/// referring to the geo entity
fn attach_citizen<'a>(
    ctx: &AnalysisContext<'a>,
    mut res: AttributeToken<'a>,
    attrs: AttachAttrs,
) -> AttributeToken<'a> {
    let value = res.value.clone().unwrap_or_default().to_lowercase();
    let Some(mut tt) = res.end.next() else {
        return res;
    };
    // гражданин(ка)
    if tt.is_char('(') {
        if let (Some(ka), Some(close)) = (tt.next(), tt.offset(2)) {
            if ka.is_value("КА", None) && close.is_char(')') {
                res.end = close;
                match close.next() {
                    Some(n) => tt = n,
                    None => return res,
                }
            }
        }
    }
    if let Some(geo) = geo_at(tt) {
        res.end = tt;
        let mut prop = PersonProperty::new(value);
        prop.add_ref(PropertyRef::External(geo));
        let mut cur = tt;
        while let Some(sep) = cur.next() {
            if !sep.is_comma_and() {
                break;
            }
            let Some(geo) = sep.next().and_then(geo_at) else {
                break;
            };
            prop.add_ref(PropertyRef::External(geo));
            cur = sep.next().unwrap_or(sep);
            res.end = cur;
            if sep.is_and() {
                break;
            }
        }
        res.property = Some(prop);
        res.kind = AttrKind::Position;
        return res;
    }
    if tt.is_and() && tt.next().is_some_and(|n| n.is_value("ЖИТЕЛЬ", Some("МЕШКАНЕЦЬ"))) {
        if let Some(mut aaa) = tt.next().and_then(|n| attach_core(ctx, n, attrs)) {
            if aaa.property.is_some() {
                aaa.begin = res.begin;
                aaa.value = res.value.clone();
                aaa.set_name(value);
                return aaa;
            }
        }
        return res;
    }
    let tt2 = if tt.is_comma_and() { tt.next() } else { Some(tt) };
    if let Some(nex) = tt2.and_then(|tt2| attach_core(ctx, tt2, attrs)) {
        let geos: Vec<ExternalReferent> = nex
            .property
            .iter()
            .flat_map(|p| p.external_refs())
            .filter(|r| r.kind == ReferentKind::Geo)
            .cloned()
            .collect();
        if !geos.is_empty() {
            let mut prop = res
                .property
                .take()
                .unwrap_or_else(|| PersonProperty::new(value.clone()));
            if prop.name.is_empty() {
                prop.name = value;
            }
            for g in geos {
                prop.add_ref(PropertyRef::External(g));
            }
            res.property = Some(prop);
            res.kind = AttrKind::Position;
        }
    }
    res
}

/// Matches that are more plausibly something else
fn is_rejected<'a>(ctx: &AnalysisContext<'a>, res: &AttributeToken<'a>, t: TokenRef<'a>) -> bool {
    let Some(prop) = &res.property else {
        return false;
    };
    let s = prop.name.as_str();
    if s == "глава книги" {
        return true;
    }
    if s == "глава" && !prop.has_refs() {
        return true;
    }
    if matches!(s, "королева" | "король" | "князь") && res.chars().is_capital_upper {
        if let Some(pits) = res
            .end
            .next()
            .and_then(|n| segmenter::attach_list(ctx, n, ParseAttrs::NO, 10))
        {
            if pits[0].kind == ItemKind::Initial {
                return true;
            }
            if pits[0].firstname.is_some() {
                if pits.len() == 1 {
                    return true;
                }
                if pits.len() == 2 && pits[1].middlename.is_some() {
                    return true;
                }
            }
        }
        if !can_be_start_of_sentence(t) {
            return true;
        }
    }
    if s == "друг" || s.starts_with("друг ") {
        // друг друга, друг с другом
        if near_drug(t.previous(), TokenRef::previous) || near_drug(t.next(), TokenRef::next) {
            return true;
        }
    }
    false
}

fn near_drug<'a>(x: Option<TokenRef<'a>>, step: fn(&TokenRef<'a>) -> Option<TokenRef<'a>>) -> bool {
    let is_drug = |y: Option<TokenRef<'_>>| y.is_some_and(|y| y.is_value("ДРУГ", None));
    is_drug(x)
        || x.is_some_and(|x| x.morph_class_in_dictionary().is_preposition() && is_drug(step(&x)))
}

/// министр + organization of type министерство
fn attach_ministry(res: &mut AttributeToken<'_>) {
    let Some(next) = res.end.next() else {
        return;
    };
    let Some(org) = next.referent().filter(|r| r.kind == ReferentKind::Organization) else {
        return;
    };
    let is_ministry = org
        .org_type()
        .is_some_and(|typ| typ.contains("министерство"));
    if is_ministry {
        let tail = org
            .value
            .to_lowercase()
            .trim_start_matches("министерство")
            .trim()
            .to_string();
        if !tail.is_empty() {
            let name = format!("министр {tail}");
            res.set_name(name);
        }
        res.add_ref(PropertyRef::External(org.clone()));
        res.end = next;
    }
}

/// Король Испанский, царь всея Руси, король Франции и Наварры
fn attach_king_epithets<'a>(ctx: &AnalysisContext<'a>, res: &mut AttributeToken<'a>) {
    let Some(t1) = res.end.next() else {
        return;
    };
    if !t1.chars().is_capital_upper || t1.whitespaces_before() >= 3 {
        return;
    }
    let mut adjs: Vec<String> = Vec::new();
    let mut is_and = false;
    let mut t2: Option<TokenRef<'a>> = None;
    let mut cur = Some(t1);
    while let Some(mut tt) = cur {
        if tt.is_value("ВСЕЙ", None) || tt.is_value("ВСЕЯ", Some("ВСІЄЇ")) {
            match tt.next().filter(|n| geo_at(*n).is_some()) {
                Some(g) => {
                    adjs.push(capitalize_words(&text_value(tt, g).to_lowercase()));
                    tt = g;
                    t2 = Some(g);
                }
                None => break,
            }
        } else if geo_at(tt).is_some() && tt.morph_class_in_dictionary().is_adjective() {
            adjs.push(capitalize_words(&tt.term().to_lowercase()));
            t2 = Some(tt);
        } else {
            if !tt.chars().is_capital_upper {
                break;
            }
            let Some(pit) = segmenter::attach_single(ctx, tt, ParseAttrs::IGNORE_ATTRS, None) else {
                break;
            };
            if pit.firstname.is_some() {
                break;
            }
            let v = match &pit.lastname {
                None if pit.value.ends_with("КИЙ") => Some(pit.value.clone()),
                None => None,
                Some(l) => {
                    l.vars.iter().find(|v| v.value.ends_with("КИЙ")).map(|v| v.value.clone())
                }
            };
            let Some(v) = v else {
                break;
            };
            adjs.push(capitalize_words(&v.to_lowercase()));
            tt = pit.end;
            t2 = Some(tt);
        }
        let Some(sep) = tt.next() else {
            break;
        };
        if !sep.is_comma_and() {
            break;
        }
        is_and = sep.is_and();
        cur = sep.next();
    }
    if adjs.len() > 1 && !is_and {
        return;
    }
    let Some(t2) = t2 else {
        return;
    };
    if let Some(p) = res.property.as_mut() {
        let n = adjs.len();
        for (i, adj) in adjs.iter().enumerate() {
            if i > 0 {
                p.name.push_str(if i + 1 < n { "," } else { " и" });
            }
            p.name.push(' ');
            p.name.push_str(adj);
        }
    }
    res.end = t2;
}

/// "в 1990-1995 гг." or "(2001)" right after the attribute
fn attach_date_suffix(res: &mut AttributeToken<'_>) {
    if res.whitespaces_after() >= 2 {
        return;
    }
    let is_date = |t: TokenRef<'_>| {
        t.referent()
            .is_some_and(|r| matches!(r.kind, ReferentKind::Date | ReferentKind::DateRange))
    };
    let Some(te) = res.end.next() else {
        return;
    };
    if te.is_value("В", None) {
        if let Some(d) = te.next().filter(|d| is_date(*d)) {
            res.end = d;
        }
    } else if te.is_char('(') {
        if let Some(d) = te.next().filter(|d| is_date(*d)) {
            if let Some(close) = d.next().filter(|c| c.is_char(')')) {
                res.end = close;
            }
        }
    }
}

/// A person the attribute is relative to: "его друг", "друг Иванова"
fn attach_person_after<'a>(ctx: &AnalysisContext<'a>, res: &mut AttributeToken<'a>) {
    let is_he_she = |t: TokenRef<'_>| {
        t.morph_class_in_dictionary().is_personal_pronoun()
            && (t.is_value("ОН", None) || t.is_value("ОНА", None))
    };
    let mut have = false;
    let mut tt0 = Some(res.begin);
    if !is_he_she(res.begin) {
        tt0 = res.begin.previous();
        match tt0 {
            Some(p) if is_he_she(p) => {}
            Some(p) if p.morph_class_in_dictionary().is_pronoun() && p.is_value("СВОЙ", None) => {}
            Some(p) if p.is_value("ИМЕТЬ", None) || is_verb_be(p) => have = true,
            _ => tt0 = None,
        }
    }
    if let Some(tt0) = tt0 {
        let mut gen = MorphGender::UNDEFINED;
        if !have {
            if let Some(f) = tt0
                .morph()
                .iter()
                .find(|f| f.class.is_personal_pronoun() || f.class.is_pronoun())
            {
                gen = if f.gender == MorphGender::NEUTER {
                    MorphGender::MASCULINE
                } else {
                    f.gender
                };
            }
        }
        let mut cur = tt0.previous();
        let mut cou = 0;
        let mut last_id = None;
        while let Some(tt) = cur {
            if cou >= 200 {
                break;
            }
            cou += 1;
            cur = tt.previous();
            let Some(id) = ctx.person_at(tt.idx()) else {
                continue;
            };
            if last_id == Some(id) {
                continue;
            }
            last_id = Some(id);
            let Some(p) = ctx.person(id) else {
                continue;
            };
            if !(have && cou < 10) {
                if gen == MorphGender::FEMININE {
                    if p.is_male && !p.is_female {
                        continue;
                    }
                } else if gen == MorphGender::MASCULINE {
                    if p.is_female && !p.is_male {
                        continue;
                    }
                } else {
                    break;
                }
            }
            res.begin = if have { tt0.next().unwrap_or(tt0) } else { tt0 };
            res.add_ref(PropertyRef::Person(id));
            res.independent = true;
            if res.morph.number != MorphNumber::PLURAL {
                res.can_be_single_person = true;
            }
            break;
        }
        return;
    }
    if res.whitespaces_after() != 1 {
        return;
    }
    let Some(t1) = res.end.next() else {
        return;
    };
    let Some(mut pr) = analyzer::try_attach_person(ctx, t1, 0, true) else {
        return;
    };
    if res.can_precede_person == 1 {
        if pr.begin == t1 {
            let case = pr.morph.case;
            if !case.is_genitive() && !case.is_undefined() {
                return;
            }
            if !case.is_undefined() && !(res.morph.case & case).is_undefined() {
                // ambiguous case: only when another person follows
                let more = pr
                    .end
                    .next()
                    .and_then(|n| analyzer::try_attach_person(ctx, n, 0, true))
                    .is_some();
                if !more {
                    return;
                }
            }
        } else if pr.begin.previous() == Some(t1) {
            let name = format!("{} {}", res.name().unwrap_or(""), t1.source_text().to_lowercase());
            res.set_name(name);
            res.end = t1;
            return;
        } else {
            return;
        }
    } else if res.can_precede_person == 2 {
        let pits = segmenter::attach_list(ctx, t1, ParseAttrs::NO, 10).unwrap_or_default();
        if pits.len() > 1
            && pits[0].firstname.is_some()
            && pits[1].firstname.is_some()
            && pr.end.idx() > pits[0].end.idx()
            && pits[0].morph.case.is_genitive()
        {
            // "отец Ивана и Петра": the first names of known persons
            let Some(first) = pits[0].firstname.as_ref() else {
                return;
            };
            let known = first
                .vars
                .iter()
                .find_map(|v| ctx.find_persons_by_firstname(&v.value).into_iter().next());
            let Some(id) = known else {
                return;
            };
            res.add_ref(PropertyRef::Person(id));
            res.end = pits[0].end;
            res.independent = true;
            if res.morph.number != MorphNumber::PLURAL {
                res.can_be_single_person = true;
            }
            return;
        }
        if pits.len() == 3
            && (pits[2].middlename.is_some()
                || (pits[1].kind == ItemKind::Initial && pits[2].kind == ItemKind::Initial))
        {
            let cont = pits[2]
                .end
                .next()
                .filter(|tt| tt.is_hiphen() || tt.is_char('('))
                .and_then(|tt| tt.next())
                .and_then(|n| segmenter::attach_list(ctx, n, ParseAttrs::NO, 10))
                .is_some_and(|p| !p.is_empty());
            if !cont {
                return;
            }
        }
    }
    let end = pr.end;
    let id = ctx.add_person(std::mem::take(&mut pr.referent));
    ctx.mark_person_span(pr.begin.idx(), end.idx(), id);
    res.add_ref(PropertyRef::Person(id));
    res.end = end;
    res.independent = true;
    if res.morph.number != MorphNumber::PLURAL {
        res.can_be_single_person = true;
    }
}

/// A boss without an organization takes the single organization or geo
/// entity mentioned shortly before it
fn attach_outer_org<'a>(ctx: &AnalysisContext<'a>, res: &mut AttributeToken<'a>) {
    let Some(tok) = ctx.terms.try_parse(res.begin) else {
        return;
    };
    if tok.end != res.end {
        return;
    }
    let mut refs: Vec<ExternalReferent> = Vec::new();
    let mut cou = 0;
    let mut cur = res.begin.previous();
    while let Some(tt) = cur {
        if tt.whitespaces_after() > 15 {
            break;
        }
        if tt.is_newline_after() {
            cou += 10;
        }
        cou += 1;
        if cou > 1000 {
            break;
        }
        cur = tt.previous();
        if ctx.person_at(tt.idx()).is_some() {
            break;
        }
        let Some(r) = tt.referent() else {
            continue;
        };
        if matches!(r.kind, ReferentKind::Organization | ReferentKind::Geo)
            && !refs.contains(r)
            && res.property.as_ref().is_some_and(|p| p.can_has_ref(r))
        {
            refs.push(r.clone());
        }
        if refs.len() > 1 {
            break;
        }
    }
    if refs.len() == 1 {
        if let Some(r) = refs.pop() {
            res.add_ref(PropertyRef::External(r));
            res.add_outer_org_as_ref = true;
        }
    }
}

// ============================================================================
// Core match
// ============================================================================

fn attach_core<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    if let Some(res) = attach_possessive(ctx, t, attrs) {
        return Some(res);
    }
    if let Some(res) = attach_age(t) {
        return Some(res);
    }
    if let Some(res) = attach_ordinal(ctx, t, attrs) {
        return Some(res);
    }
    let next = t.next();
    // "Microsoft CEO", "Kremlin spokesman"
    let geo_or_org = t
        .referent()
        .filter(|r| matches!(r.kind, ReferentKind::Geo | ReferentKind::Organization));
    if let Some(r) = geo_or_org {
        let n = next.filter(|n| n.chars().is_latin_letter && t.whitespaces_after() < 2)?;
        let mut res = attach_core(ctx, n, attrs).filter(|res| res.property.is_some())?;
        res.begin = t;
        res.add_ref(PropertyRef::External(r.clone()));
        return Some(res);
    }
    if t.chars().is_latin_letter && is_eng_article(Some(t)) {
        let mut res = next.and_then(|n| attach_core(ctx, n, attrs))?;
        res.begin = t;
        return Some(res);
    }
    if t.is_word() && t.is_term_of(&["Г", "ГР", "М", "Д"]) {
        let hyphen =
            next.filter(|h| h.is_hiphen() && !h.is_whitespace_before() && !h.is_whitespace_after());
        if let Some(tail) = hyphen.and_then(|h| h.next()).filter(|w| w.is_letters()) {
            if let Some(res) = std_form_prefix(ctx, t, tail) {
                return Some(res);
            }
        }
    }
    if t.is_word() && t.is_term_of(&["ГР", "ГРАЖД"]) {
        let mut end = t;
        if let Some(dot) = next.filter(|d| d.is_char('.')) {
            end = dot;
        }
        if !end.next().is_some_and(|n| n.number().is_some()) {
            let mut res = AttributeToken::new(AttrKind::Prefix, t, end);
            let value = if t.lang().is_ua() && !t.lang().is_ru() {
                "ГРОМАДЯНИН"
            } else {
                "ГРАЖДАНИН"
            };
            res.value = Some(value.to_string());
            res.gender = MorphGender::MASCULINE;
            return Some(res);
        }
    }

    let mut tt = t;
    let mut skipped_adjs = false;
    for step in 0..2 {
        if step == 0 {
            if let Some(res) = attach_english_agent(t) {
                return Some(res);
            }
        }
        for tok in ctx.terms.try_parse_all(tt) {
            if tok.begin == tok.end && tok.begin.morph_class_in_dictionary().is_preposition() {
                continue;
            }
            match tok.termin.kind {
                AttrKind::Prefix => {
                    if step > 0 && CITIZEN_PREFIXES.contains(&tok.termin.canonical.as_str()) {
                        continue;
                    }
                    let mut res = AttributeToken::new(AttrKind::Prefix, t, tok.end);
                    res.value = Some(tok.termin.canonical.clone());
                    res.morph = tok.morph;
                    res.gender = if tok.termin.gender.is_undefined() {
                        tok.morph.gender
                    } else {
                        tok.termin.gender
                    };
                    return Some(res);
                }
                AttrKind::BestRegards => {
                    let mut res = AttributeToken::new(AttrKind::BestRegards, t, tok.end);
                    if let Some(c) = tok.end.next().filter(|c| c.is_comma()) {
                        res.end = c;
                    }
                    res.morph = tok.morph;
                    return Some(res);
                }
                AttrKind::Position | AttrKind::King => {}
                AttrKind::Other => continue,
            }
            if looks_like_initials(ctx, &tok) {
                continue;
            }
            let Some(mut res) = create_attr_position(ctx, &tok, attrs) else {
                continue;
            };
            let termin = tok.termin;
            if termin.kind == AttrKind::King {
                res.kind = AttrKind::King;
            }
            if !termin.gender.is_undefined() {
                res.gender = termin.gender;
            } else if res.gender.is_undefined() {
                let g = tok.morph.gender & (MorphGender::MASCULINE | MorphGender::FEMININE);
                if g == MorphGender::MASCULINE || g == MorphGender::FEMININE {
                    res.gender = g;
                }
            }
            let last_word = termin.canonical.rsplit([' ', '-']).next().unwrap_or(&termin.canonical);
            if res.end == tok.end || res.end.is_value(last_word, None) {
                res.can_precede_person = termin.flags.can_has_person_after;
            }
            res.can_be_same_surname = termin.flags.can_be_same_surname;
            if termin.flags.can_be_independent {
                res.independent = true;
            }
            res.is_doubtful = termin.flags.is_doubt && !res.has_refs();
            if t.idx() < res.begin.idx() {
                if !skipped_adjs {
                    if let Some(prev) = res.begin.previous() {
                        let pre = lower_text(t, prev);
                        let name = format!("{pre} {}", res.name().unwrap_or(""));
                        res.set_name(name.trim());
                    }
                }
                res.begin = t;
            }
            return Some(res);
        }
        if step > 0
            || tt.chars().is_latin_letter
            || !tt.morph_class_in_dictionary().is_adjective()
        {
            break;
        }
        let Some(npt) = noun_phrase::try_parse(tt, NounPhraseParams::default()) else {
            break;
        };
        if npt.end == tt || npt.end.is_value("ВИЦЕ", Some("ВІЦЕ")) {
            break;
        }
        skipped_adjs =
            npt.adjectives.iter().all(|a| EMPTY_ADJS.iter().any(|e| a.is_value(e, None)));
        tt = npt.end;
    }

    if t.is_value("STATE", None) {
        let mut res = next
            .and_then(|n| attach_core(ctx, n, attrs))
            .filter(|r| r.property.is_some())?;
        let name = format!("state {}", res.name().unwrap_or(""));
        res.set_name(name);
        res.begin = t;
        return Some(res);
    }
    None
}

/// ЕГО ЗАМЕСТИТЕЛЬ: the position of somebody mentioned just before
fn attach_possessive<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let feminine = t.is_value("ЕЕ", Some("ЇЇ")) || t.is_value("ЕЁ", None) || t.term() == "HER";
    let masculine = t.is_value("ЕГО", Some("ЙОГО")) || t.term() == "HIS";
    if !(feminine || masculine)
        || (!t.morph_class_in_dictionary().is_pronoun() && !t.chars().is_latin_letter)
    {
        return None;
    }
    let mut res = try_attach(ctx, t.next()?, attrs).filter(|r| r.property.is_some())?;
    if !res.has_refs() {
        let mut cur = t.previous();
        for _ in 0..10 {
            let Some(tt) = cur else {
                break;
            };
            cur = tt.previous();
            if let Some(org) = tt.referent().filter(|r| r.kind == ReferentKind::Organization) {
                res.add_ref(PropertyRef::External(org.clone()));
                break;
            }
            let Some(id) = ctx.person_at(tt.idx()) else {
                continue;
            };
            let Some(p) = ctx.person(id) else {
                continue;
            };
            let fits = if feminine { p.is_female || !p.is_male } else { p.is_male || !p.is_female };
            if fits {
                res.add_ref(PropertyRef::Person(id));
                break;
            }
        }
    }
    res.begin = t;
    Some(res)
}

/// 35 лет, 35-летний, в возрасте 35 лет
fn attach_age(t: TokenRef<'_>) -> Option<AttributeToken<'_>> {
    if t.number().is_none() && !t.is_value("ВОЗРАСТ", Some("ВІК")) && !t.is_term_of(&["В", "У"]) {
        return None;
    }
    let (age, end) = try_parse_age(t)?;
    let adjectival = end.term().starts_with("ЛЕТН") || end.term().starts_with("РІЧН");
    let comma_before = t.previous().is_some_and(|p| p.is_comma());
    let punct_after = end.next().map_or(true, |n| n.is_char_of(",.;)"));
    if !(adjectival || comma_before || punct_after) {
        return None;
    }
    let mut res = AttributeToken::new(AttrKind::Other, t, end);
    res.age = Some(age);
    Some(res)
}

/// первый заместитель, вторая жена
fn attach_ordinal<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let n = t.number().filter(|n| n.is_adjective && (1..=3).contains(&n.value))?;
    let mut res = attach_core(ctx, t.next()?, attrs)?;
    let name = res.name()?.to_string();
    if name.contains("глава") {
        return None;
    }
    let feminine = res.gender == MorphGender::FEMININE
        || t.morph().iter().any(|f| f.gender == MorphGender::FEMININE);
    let ordinal = match (n.value, feminine) {
        (1, false) => "первый",
        (2, false) => "второй",
        (3, false) => "третий",
        (1, true) => "первая",
        (2, true) => "вторая",
        _ => "третья",
    };
    res.set_name(format!("{ordinal} {name}"));
    res.begin = t;
    Some(res)
}

/// CHAIRMAN, SPOKESPERSON, ECONOMIST: English agent nouns before a name
fn attach_english_agent(t: TokenRef<'_>) -> Option<AttributeToken<'_>> {
    if !t.chars().is_latin_letter || !t.is_letters() || t.length_char() < 5 {
        return None;
    }
    let term = t.term();
    if !["MAN", "PERSON", "IST"].iter().any(|s| term.ends_with(s)) {
        return None;
    }
    let next = t.next().filter(|n| n.chars().is_capital_upper && n.chars().is_latin_letter)?;
    if t.whitespaces_after() > 1 || next.term() == term {
        return None;
    }
    let mut res = AttributeToken::position(t, t, term.to_lowercase());
    res.morph = t.morph_info();
    Some(res)
}

/// Г-Н, Г-ЖЕ, ГР-НА: hyphenated abbreviations of forms of address
fn std_form_prefix<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    tail: TokenRef<'a>,
) -> Option<AttributeToken<'a>> {
    const CASES: [MorphCase; 6] = [
        MorphCase::NOMINATIVE,
        MorphCase::GENITIVE,
        MorphCase::DATIVE,
        MorphCase::ACCUSATIVE,
        MorphCase::INSTRUMENTAL,
        MorphCase::PREPOSITIONAL,
    ];
    let words: &[(&str, MorphGender)] = match t.term() {
        "Г" => &[("ГОСПОДИН", MorphGender::MASCULINE), ("ГОСПОЖА", MorphGender::FEMININE)],
        "ГР" => &[("ГРАЖДАНИН", MorphGender::MASCULINE), ("ГРАЖДАНКА", MorphGender::FEMININE)],
        "М" => &[("МИСТЕР", MorphGender::MASCULINE)],
        "Д" => &[("ДОКТОР", MorphGender::MASCULINE)],
        _ => return None,
    };
    let morphology = ctx.morphology();
    for (word, gender) in words {
        let mut case = MorphCase::UNDEFINED;
        if word.ends_with(tail.term()) {
            case |= MorphCase::NOMINATIVE;
        }
        for c in CASES {
            let form =
                morphology.inflect(word, MorphClass::NOUN, *gender, c, MorphNumber::SINGULAR);
            if form.is_some_and(|f| f.ends_with(tail.term())) {
                case |= c;
            }
        }
        if case.is_undefined() {
            continue;
        }
        let mut res = AttributeToken::new(AttrKind::Prefix, t, tail);
        res.value = Some(word.to_string());
        res.gender = *gender;
        res.morph = MorphInfo::new().with_gender(*gender).with_case(case);
        return Some(res);
    }
    None
}

/// A one-letter keyword starting a run of initials (Д. В. Иванов)
fn looks_like_initials<'a>(ctx: &AnalysisContext<'a>, tok: &TermMatch<'a, '_>) -> bool {
    let t = tok.begin;
    if t.length_char() != 1 || !t.chars().is_all_upper {
        return false;
    }
    let Some(pits) = segmenter::attach_list(ctx, t, ParseAttrs::IGNORE_ATTRS, 3) else {
        return false;
    };
    let initials = pits.iter().take_while(|p| p.kind == ItemKind::Initial).count();
    if initials < 2 && !(initials == 1 && pits.len() >= 2 && pits[1].lastname.is_some()) {
        return false;
    }
    // Д. Иванов may still be a doctor when an attribute follows
    !tok.end.next().is_some_and(|n| try_attach_word(ctx, n, false).is_some())
}

// ============================================================================
// Positions
// ============================================================================

fn create_attr_position<'a>(
    ctx: &AnalysisContext<'a>,
    tok: &TermMatch<'a, 'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    match tok.termin.kind2 {
        TermKind2::Abbr => {
            let mut res = AttributeToken::position(tok.begin, tok.end, tok.termin.display_name());
            res.morph = tok.morph;
            Some(res)
        }
        TermKind2::Io | TermKind2::Io2 => position_deputy(ctx, tok, attrs),
        TermKind2::Adj | TermKind2::IgnoredAdj => {
            if tok.begin == tok.end
                && tok.begin.length_char() == 1
                && !tok.begin.morph_class_in_dictionary().is_undefined()
            {
                return None;
            }
            let mut res = attach_core(ctx, tok.end.next()?, attrs)?;
            if res.kind != AttrKind::Position || res.property.is_none() {
                return None;
            }
            res.begin = tok.begin;
            if tok.termin.kind2 == TermKind2::Adj {
                let adj = tok.termin.canonical.to_lowercase();
                let name = format!("{adj} {}", res.name().unwrap_or(""));
                res.set_name(name);
                res.morph = tok.morph;
            }
            Some(res)
        }
        TermKind2::Grade => position_grade(ctx, tok, attrs),
        TermKind2::Undefined => position_default(ctx, tok, attrs),
    }
}

/// заместитель министра, исполняющий обязанности директора
fn position_deputy<'a>(
    ctx: &AnalysisContext<'a>,
    tok: &TermMatch<'a, 'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let name = tok.termin.canonical.to_lowercase();
    if let Some(res) = deputy_chain(ctx, tok, attrs, &name) {
        return Some(res);
    }
    if tok.termin.kind2 == TermKind2::Io || tok.morph.number == MorphNumber::PLURAL {
        return None;
    }
    let mut res = AttributeToken::position(tok.begin, tok.end, name);
    res.morph = tok.morph;
    Some(res)
}

fn deputy_chain<'a>(
    ctx: &AnalysisContext<'a>,
    tok: &TermMatch<'a, 'a>,
    attrs: AttachAttrs,
    name: &str,
) -> Option<AttributeToken<'a>> {
    let mut tt = tok.end.next()?;
    if tt.morph_class_in_dictionary().is_preposition() && !tt.is_term_of(&["ПО", "В", "У"]) {
        tt = tt.next()?;
    }
    let sub = if tok.termin.kind2 == TermKind2::Io2 {
        attrs | AttachAttrs::AFTER_DEPUTY_MARKER
    } else {
        attrs
    };
    let mut higher = match try_attach(ctx, tt, sub) {
        Some(pat) => pat,
        None => {
            // заместитель главного редактора: adjectives the terms miss
            let npt = noun_phrase::try_parse(tt, NounPhraseParams::default())?;
            if npt.end == tt {
                return None;
            }
            let mut pat = try_attach(ctx, npt.end, sub)?;
            let pre = lower_text(tt, npt.end.previous()?);
            let name = format!("{pre} {}", pat.name().unwrap_or(""));
            pat.set_name(name);
            pat.begin = tt;
            pat
        }
    };
    if higher.kind != AttrKind::Position || higher.property.is_none() {
        return None;
    }
    let mut res = AttributeToken::new(AttrKind::Position, tok.begin, higher.end);
    res.morph = tok.morph;
    let mut prop = PersonProperty::new(name);

    // заместитель министра по социальным вопросам
    let mut cur = higher.end.next();
    let mut te: Option<TokenRef<'a>> = None;
    while let Some(ttt) = cur {
        if ttt.is_term_of(&["В", "ПО", "У"]) {
            if let Some(r) = ttt
                .next()
                .and_then(ref_at)
                .filter(|r| matches!(r.kind, ReferentKind::Organization | ReferentKind::Geo))
            {
                let Some(rt) = ttt.next() else {
                    break;
                };
                higher.add_ref(PropertyRef::External(r));
                higher.end = rt;
                cur = rt.next();
                continue;
            }
        }
        if ttt.is_value("ПО", Some("З")) {
            let Some(npt) = ttt
                .next()
                .and_then(|n| noun_phrase::try_parse(n, NounPhraseParams::default()))
                .filter(|npt| npt.morph.case.is_dative() || ttt.lang().is_ua())
            else {
                break;
            };
            let mut end = npt.end;
            if let Some(and) = end.next().filter(|a| a.is_and()) {
                let npt2 =
                    and.next().and_then(|n| noun_phrase::try_parse(n, NounPhraseParams::default()));
                if let Some(npt2) = npt2 {
                    if !(npt2.morph.case & npt.morph.case).is_undefined() {
                        end = npt2.end;
                    }
                }
            }
            te = Some(end);
            cur = end.next();
            continue;
        }
        break;
    }
    let mut end = higher.end;
    if let Some(te) = te {
        let first = higher.end.next().unwrap_or(te);
        prop.name = format!("{} {}", prop.name, lower_text(first, te));
        end = te;
        if let Some(org) = te.next().filter(|_| te.whitespaces_after() < 4).and_then(|n| {
            n.referent()
                .filter(|r| r.kind == ReferentKind::Organization)
                .map(|r| (n, r.clone()))
        }) {
            higher.add_ref(PropertyRef::External(org.1));
            higher.end = org.0;
            end = org.0;
        }
    }
    res.end = if end.idx() > higher.end.idx() { end } else { higher.end };
    res.property = Some(prop);
    res.higher = Some(Box::new(higher));
    Some(res)
}

/// кандидат технических наук, доктор, кандидат в президенты
fn position_grade<'a>(
    ctx: &AnalysisContext<'a>,
    tok: &TermMatch<'a, 'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let canonical = tok.termin.canonical.as_str();
    if let Some((science, end)) = tok.end.next().and_then(|n| find_grade_last(ctx, n)) {
        let name = format!("{} {science}", canonical.to_lowercase());
        let mut res = AttributeToken::position(tok.begin, end, name);
        res.morph = tok.morph;
        return Some(res);
    }
    if canonical == "КАНДИДАТ" {
        if let Some(pat) = candidate_for(ctx, tok.end, attrs) {
            let mut res = AttributeToken::position(tok.begin, pat.end, "кандидат");
            res.morph = tok.morph;
            res.higher = Some(Box::new(pat));
            return Some(res);
        }
    }
    if canonical != "ДОКТОР" && canonical != "КАНДИДАТ" {
        return None;
    }
    let mut res = AttributeToken::position(tok.begin, tok.end, canonical.to_lowercase());
    res.morph = tok.morph;
    Some(res)
}

/// в президенты, на пост губернатора
fn candidate_for<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let mut tt = t.next()?;
    if tt.is_term_of(&["В", "У"]) {
        tt = tt.next()?;
    } else if tt.is_value("НА", None) {
        tt = tt.next()?;
        if !(tt.is_value("ПОСТ", None) || tt.is_value("ДОЛЖНОСТЬ", Some("ПОСАДА"))) {
            return None;
        }
        tt = tt.next()?;
    } else {
        return None;
    }
    attach_core(ctx, tt, attrs).filter(|p| p.kind == AttrKind::Position && p.property.is_some())
}

/// Science branch of a degree: "технических наук", "т. н.", "наук"
fn find_grade_last<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
) -> Option<(String, TokenRef<'a>)> {
    if let Some(g) = ctx.terms.try_parse_grade(t) {
        return Some((g.termin.display_name(), g.end));
    }
    let mut cur = Some(t);
    for i in 0..2 {
        let Some(tt) = cur else {
            break;
        };
        if tt.term() == "НАУК" {
            let ss = if i == 1 && t.morph_class_in_dictionary().is_adjective() {
                lower_text(t, tt)
            } else {
                "наук".to_string()
            };
            return Some((ss, tt));
        }
        if tt.length_char() == 1 && tt.is_value("Н", None) && i == 1 {
            let end = tt.next().filter(|d| d.is_char('.')).unwrap_or(tt);
            return Some((format!("{} наук", lower_text(t, t)), end));
        }
        cur = tt.next().filter(|n| !n.is_char('.')).or_else(|| tt.next().and_then(|d| d.next()));
    }
    None
}

fn is_referent_kind_for_position(kind: ReferentKind) -> bool {
    matches!(
        kind,
        ReferentKind::Geo
            | ReferentKind::Address
            | ReferentKind::DateRange
            | ReferentKind::Organization
            | ReferentKind::Transport
    )
}

/// A plain keyword with its continuation: "министр финансов России",
/// "инженер 2 категории", "председатель правления ОАО ..."
fn position_default<'a>(
    ctx: &AnalysisContext<'a>,
    tok: &TermMatch<'a, 'a>,
    attrs: AttachAttrs,
) -> Option<AttributeToken<'a>> {
    let termin: &Termin = tok.termin;
    let t0 = tok.begin;
    let mut t1 = tok.end;
    let mut name = termin.canonical.to_lowercase();

    // генерал-майор
    let glued_hyphen = t1
        .next()
        .filter(|h| h.is_hiphen() && !h.is_whitespace_before() && !h.is_whitespace_after());
    if let Some(h) = glued_hyphen {
        let lower = t1.chars().is_all_lower;
        if let Some(w) = h.next().filter(|w| w.is_letters() && w.chars().is_all_lower == lower) {
            if let Some(npt) = noun_phrase::try_parse(w, NounPhraseParams::default()) {
                if npt.end == w && !(npt.morph.case & tok.morph.case).is_undefined() {
                    name = format!("{name}-{}", npt.normal_text(ctx.morphology()).to_lowercase());
                    t1 = w;
                }
            }
        }
    }

    let mut prop = PersonProperty::new(name.clone());
    let tname0 = t1.next();
    let mut tname1: Option<TokenRef<'a>> = None;
    let mut category: Option<String> = None;
    let mut last_np_case = MorphCase::UNDEFINED;
    let mut cur = t1.next();
    while let Some(tt) = cur {
        if attrs.contains(AttachAttrs::ONLY_KEYWORD) {
            break;
        }
        if (tt.is_value("ИСТЕЦ", Some("ПОЗИВАЧ")) || tt.is_value("ОТВЕТЧИК", Some("ВІДПОВІДАЧ")))
            && t0.is_value("ПРЕДСТАВИТЕЛЬ", Some("ПРЕДСТАВНИК"))
        {
            return None;
        }
        if tt.is_newline_before() && !tt.chars().is_all_lower {
            break;
        }
        if let Some((cat, end)) = try_attach_category(tt) {
            category = Some(cat);
            t1 = end;
            cur = end.next();
            continue;
        }
        if let Some(end) = analyze_roman_nums(tt) {
            if !end.is_value("СОЗЫВ", Some("СКЛИКАННЯ")) {
                break;
            }
            tname1 = Some(end);
            t1 = end;
            cur = end.next();
            continue;
        }
        if tt.is_char('(') {
            let Some(close) = try_parse_bracket(tt) else {
                break;
            };
            if let Some(inner) = tt.next().filter(|i| i.next() == Some(close)) {
                if let Some(r) = inner.referent().filter(|r| r.kind == ReferentKind::Organization) {
                    prop.add_ref(PropertyRef::External(r.clone()));
                    t1 = close;
                    break;
                }
            }
            let lower = tt.until(close).filter(|x| x.is_letters()).all(|x| x.chars().is_all_lower);
            if lower || close.end_char() - tt.begin_char() < 40 {
                if !lower {
                    tname1 = Some(close);
                }
                t1 = close;
                cur = close.next();
                continue;
            }
            break;
        }

        // preposition before a referent or a noun phrase
        let mut te = tt;
        let mut prep: Option<TokenRef<'a>> = None;
        if tt.is_comma() && !attrs.contains(AttachAttrs::AFTER_DEPUTY_MARKER) {
            if let Some(v) = tt.next().filter(|v| v.is_term_of(&["В", "У"])) {
                let org = v
                    .next()
                    .filter(|o| ref_kind_at(*o) == Some(ReferentKind::Organization));
                if let Some(org) = org {
                    prep = Some(v);
                    te = org;
                }
            }
        } else if tt.is_term_of(&["ИЗ", "ПРИ", "ПО", "НА", "ОТ", "OF", "В", "У", "З", "ВІД"]) {
            if attrs.contains(AttachAttrs::AFTER_DEPUTY_MARKER) {
                break;
            }
            match tt.next() {
                Some(n) => te = n,
                None => break,
            }
            prep = Some(tt);
        }

        if let Some(r) = ref_at(te) {
            if termin.kind == AttrKind::King && te.morph_class_in_dictionary().is_adjective() {
                break;
            }
            if r.kind == ReferentKind::Organization && name == "президент" && prep.is_some() {
                break;
            }
            if !is_referent_kind_for_position(r.kind) || !prop.can_has_ref(&r) {
                break;
            }
            if termin.flags.is_boss
                && prep.is_some_and(|p| p.is_value("ИЗ", None))
                && r.kind == ReferentKind::Geo
            {
                break;
            }
            let kind = r.kind;
            prop.add_ref(PropertyRef::External(r));
            t1 = te;
            // ФСБ, МВД и СВР
            let mut next = te.next();
            while let Some(sep) = next {
                if !sep.is_comma_and() {
                    break;
                }
                let Some(rt) = sep.next() else {
                    break;
                };
                match rt.referent().filter(|x| x.kind == kind) {
                    Some(r2) => {
                        prop.add_ref(PropertyRef::External(r2.clone()));
                        t1 = rt;
                        next = rt.next();
                        if sep.is_and() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            cur = t1.next();
            continue;
        }
        if name.starts_with("премьер") || tt.is_value("ИМЕНИ", Some("ІМЕНІ")) {
            break;
        }
        if tt.number().is_some() && t0.is_value("ГЛАВА", None) {
            break;
        }
        if let Some(p) = prep {
            if p.is_value("ПО", None)
                && !te.is_value("ИМЯ", Some("ІМЯ"))
                && !te.is_value("ПРОЗВИЩЕ", Some("ПРІЗВИСЬКО"))
            {
                if let Some(npt) = noun_phrase::try_parse(te, NounPhraseParams::default()) {
                    if npt.morph.case.is_dative() || te.lang().is_ua() {
                        tname1 = Some(npt.end);
                        t1 = npt.end;
                        last_np_case = npt.morph.case;
                        cur = npt.end.next();
                        continue;
                    }
                }
            }
            if p.is_value("OF", None) && te.chars().is_latin_letter && !te.chars().is_all_lower {
                tname1 = Some(te);
                t1 = te;
                cur = te.next();
                continue;
            }
            break;
        }
        if !tt.chars().is_all_lower && tt.is_letters() {
            if is_name_like(ctx, tt) {
                break;
            }
            // ФСБ, МЧС
            if tt.chars().is_all_upper
                && (2..=5).contains(&tt.length_char())
                && !t0.chars().is_all_upper
            {
                tname1 = Some(tt);
                t1 = tt;
                cur = tt.next();
                continue;
            }
        }
        if tt.is_and() {
            let npt = tt
                .next()
                .and_then(|n| noun_phrase::try_parse(n, NounPhraseParams::default()))
                .filter(|npt| {
                    !last_np_case.is_undefined() && !(npt.morph.case & last_np_case).is_undefined()
                })
                .filter(|npt| {
                    let prev = tt.previous().map(|p| p.chars()).unwrap_or_default();
                    npt.begin.chars().same_case_style(&prev)
                });
            match npt {
                Some(npt) => {
                    tname1 = Some(npt.end);
                    t1 = npt.end;
                    cur = npt.end.next();
                    continue;
                }
                None => break,
            }
        }
        if let Some(npt) = noun_phrase::try_parse(tt, NounPhraseParams::default()) {
            let case = npt.morph.case;
            let is_depart = DEPART_WORDS.iter().any(|w| npt.noun.is_value(w, None));
            let dictionary = exists_in_dictionary(npt.end);
            let oblique = (case.is_genitive() || case.is_instrumental()) && !case.is_nominative();
            if dictionary && (is_depart || oblique) {
                tname1 = Some(npt.end);
                t1 = npt.end;
                last_np_case = case;
                cur = npt.end.next();
                continue;
            }
        }
        if tt.is_value("МИЛЛИОНОВ", Some("МІЛЬЙОНІВ")) && tname1.is_some() {
            tname1 = Some(tt);
            t1 = tt;
            cur = tt.next();
            continue;
        }
        break;
    }

    if let (Some(n0), Some(n1)) = (tname0, tname1) {
        if !prop.has_refs() && n0 == n1 && is_any_value(n1, OUTER_ORG_WORDS) {
            if let Some(org) = previous_organization(t0) {
                prop.add_ref(PropertyRef::External(org));
            }
        }
        name = format!("{name} {}", lower_text(n0, n1));
    }
    if let Some(cat) = category {
        name = format!("{name} {cat}");
    }

    let mut res = AttributeToken::new(AttrKind::Position, t0, t1);
    res.morph = tok.morph;
    res.independent = termin.flags.can_be_independent;
    prop.name = name;

    let split = ["заместитель ", "заступник "]
        .iter()
        .find_map(|m| prop.name.find(m).map(|i| i + m.len()))
        .filter(|&i| i < prop.name.len());
    if let Some(i) = split {
        let head = prop.name[..i].trim().to_string();
        let mut higher = res.clone();
        let mut hprop = prop.clone();
        hprop.name = prop.name[i..].trim().to_string();
        higher.property = Some(hprop);
        res.property = Some(PersonProperty::new(head));
        res.higher = Some(Box::new(higher));
    } else {
        res.property = Some(prop);
    }
    Some(res)
}

/// A capitalised word reading as a person name
fn is_name_like<'a>(ctx: &AnalysisContext<'a>, t: TokenRef<'a>) -> bool {
    if ctx.person_at(t.idx()).is_some() {
        return true;
    }
    segmenter::attach_single(ctx, t, ParseAttrs::IGNORE_ATTRS, None).is_some_and(|pit| {
        pit.kind == ItemKind::Initial
            || pit.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
            || pit
                .lastname
                .as_ref()
                .is_some_and(|l| l.is_in_dictionary || l.has_std_tail || l.is_in_ontology)
            || pit.middlename.is_some()
            || !exists_in_dictionary(t)
    })
}

/// Organization mentioned shortly before `t`
fn previous_organization(t: TokenRef<'_>) -> Option<ExternalReferent> {
    let mut budget = 0;
    let mut cur = t.previous();
    while let Some(tt) = cur {
        if tt.is_newline_after() {
            budget += 10;
        }
        budget += 1;
        if budget > 500 {
            break;
        }
        if let Some(r) = tt.referent().filter(|r| r.kind == ReferentKind::Organization) {
            return Some(r.clone());
        }
        cur = tt.previous();
    }
    None
}

// ============================================================================
// Categories and numerals
// ============================================================================

/// "2 категории", "высшей категории", "3 разряда", "VII созыва"
pub fn try_attach_category(t: TokenRef<'_>) -> Option<(String, TokenRef<'_>)> {
    let (n, mut tt) = if let Some(num) = t.number() {
        (num.value, t.next()?)
    } else if let Some(r) = try_parse_roman(t) {
        (r, t.next()?)
    } else if t.is_value("ВЫСШИЙ", Some("ВИЩИЙ")) || t.term() == "ВЫСШ" {
        let mut nx = t.next()?;
        if nx.is_char('.') {
            nx = nx.next()?;
        }
        (0, nx)
    } else {
        return None;
    };
    if tt.is_hiphen() {
        tt = tt.next()?;
    }
    let ua = tt.lang().is_ua() && !tt.lang().is_ru();
    let numbered = |word: &str, highest: &str| {
        if n == 0 {
            format!("{highest} {word}")
        } else {
            format!("{n} {word}")
        }
    };
    if tt.is_value("КАТЕГОРИЯ", Some("КАТЕГОРІЯ")) || tt.term() == "КАТ" {
        let mut end = tt;
        if tt.term() == "КАТ" {
            if let Some(dot) = tt.next().filter(|d| d.is_char('.')) {
                end = dot;
            }
        }
        let s = if ua { numbered("категорії", "вищої") } else { numbered("категории", "высшей") };
        return Some((s, end));
    }
    if tt.is_value("РАЗРЯД", Some("РОЗРЯД")) {
        let s = if ua { numbered("розряду", "вищого") } else { numbered("разряда", "высшего") };
        return Some((s, tt));
    }
    if tt.is_value("КЛАСС", Some("КЛАС")) {
        let s = if ua { numbered("класу", "вищого") } else { numbered("класса", "высшего") };
        return Some((s, tt));
    }
    if n == 0 {
        return None;
    }
    if tt.is_value("РАНГ", None) {
        let s = if ua { format!("{n} рангу") } else { format!("{n} ранга") };
        return Some((s, tt));
    }
    if tt.is_value("СОЗЫВ", None) || tt.term().starts_with("СКЛИКАНН") {
        let s = if ua { format!("{n} скликання") } else { format!("{n} созыва") };
        return Some((s, tt));
    }
    None
}

/// Roman numeral ranges before ВЕК or СОЗЫВ: "XIX-XX веков", "V и VI созывов"
fn analyze_roman_nums(t: TokenRef<'_>) -> Option<TokenRef<'_>> {
    let mut tt = t;
    if tt.is_term_of(&["В", "У"]) {
        tt = tt.next()?;
    }
    try_parse_roman(tt)?;
    let mut end = tt;
    while let Some(sep) = end.next() {
        if !(sep.is_hiphen() || sep.is_comma_and()) {
            break;
        }
        match sep.next().filter(|n| try_parse_roman(*n).is_some()) {
            Some(n) => end = n,
            None => break,
        }
    }
    let last = end.next()?;
    if last.is_value("ВЕК", Some("СТОЛІТТЯ"))
        || last.is_value("СТОЛЕТИЕ", None)
        || last.is_value("СОЗЫВ", Some("СКЛИКАННЯ"))
    {
        return Some(last);
    }
    if last.term() == "В" {
        return Some(last.next().filter(|d| d.is_char('.')).unwrap_or(last));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{AnalysisConfig, Document, Lexicon, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    fn attach(text: &str) -> Option<(String, Option<String>, usize, usize)> {
        let d = doc(text);
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = try_attach(&ctx, d.first()?, AttachAttrs::NO)?;
        Some((
            res.name().unwrap_or_default().to_string(),
            res.value.clone(),
            res.begin.idx(),
            res.end.idx(),
        ))
    }

    #[test]
    fn test_prefix() {
        let (name, value, _, end) = attach("господин Иванов").unwrap();
        assert!(name.is_empty());
        assert_eq!(value.as_deref(), Some("ГОСПОДИН"));
        assert_eq!(end, 0);
    }

    #[test]
    fn test_age() {
        let d = doc("35 лет, инженер");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = try_attach(&ctx, d.first().unwrap(), AttachAttrs::NO).unwrap();
        assert_eq!(res.kind, AttrKind::Other);
        assert_eq!(res.age, Some(35));
        assert!(res.property.is_none());
    }

    #[test]
    fn test_deputy_has_higher_position() {
        let d = doc("заместитель министра");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = try_attach(&ctx, d.first().unwrap(), AttachAttrs::NO).unwrap();
        assert_eq!(res.name(), Some("заместитель"));
        let higher = res.higher.as_deref().unwrap();
        assert_eq!(higher.name(), Some("министр"));
        assert!(higher.end.idx() <= res.end.idx());
        assert_eq!(res.depth(), 1);
        let prop = res.property.as_ref().unwrap();
        assert_eq!(prop.higher().map(|h| h.name.as_str()), Some("министр"));
        assert_eq!(prop.higher().map(|h| h.kind), Some(PropertyKind::Boss));
    }

    #[test]
    fn test_position_with_genitive_tail() {
        let (name, _, begin, end) = attach("директор завода").unwrap();
        assert_eq!(name, "директор завода");
        assert_eq!((begin, end), (0, 1));
    }

    #[test]
    fn test_ministry_complement_continues_position() {
        let (name, _, begin, end) = attach("Министр финансов Иван Петров").unwrap();
        assert_eq!(name, "министр финансов");
        assert_eq!((begin, end), (0, 1));

        let (name, _, _, end) = attach("министр иностранных дел Лавров").unwrap();
        assert_eq!(name, "министр иностранных дел");
        assert_eq!(end, 2);
    }

    #[test]
    fn test_position_with_state() {
        let d = doc("президент России");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = try_attach(&ctx, d.first().unwrap(), AttachAttrs::NO).unwrap();
        let prop = res.property.as_ref().unwrap();
        assert_eq!(prop.name, "президент");
        assert_eq!(prop.kind, PropertyKind::Boss);
        let geo: Vec<_> = prop.external_refs().collect();
        assert_eq!(geo.len(), 1);
        assert_eq!(geo[0].value, "РОССИЯ");
        assert_eq!(res.end.idx(), 1);
    }

    #[test]
    fn test_category() {
        let (name, _, _, end) = attach("инженер 2 категории").unwrap();
        assert_eq!(name, "инженер 2 категории");
        assert_eq!(end, 2);
    }

    #[test]
    fn test_grades() {
        let (name, _, _, end) = attach("кандидат технических наук").unwrap();
        assert_eq!(name, "кандидат технических наук");
        assert_eq!(end, 2);
        let (name, _, _, _) = attach("КТН").unwrap();
        assert!(name.starts_with("кандидат"));
    }

    #[test]
    fn test_bare_head_rejected() {
        assert!(attach("глава").is_none());
        assert!(attach("стол").is_none());
    }

    #[test]
    fn test_check_kind() {
        let terms = Terminology::shared().unwrap();
        assert_eq!(check_kind(&terms, &PersonProperty::new("король")), PropertyKind::King);
        assert_eq!(check_kind(&terms, &PersonProperty::new("президент")), PropertyKind::Boss);
        assert_eq!(check_kind(&terms, &PersonProperty::new("жена")), PropertyKind::Kin);
        assert_eq!(check_kind(&terms, &PersonProperty::new("капитан")), PropertyKind::MilitaryRank);
        assert_eq!(check_kind(&terms, &PersonProperty::new("инженер")), PropertyKind::Undefined);
    }

    #[test]
    fn test_position_word() {
        let d = doc("министр");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let tok = try_attach_position_word(&ctx, d.first().unwrap()).unwrap();
        assert_eq!(tok.termin.canonical, "МИНИСТР");
        assert!(try_attach_word(&ctx, d.first().unwrap(), true).is_some());
    }

    #[test]
    fn test_try_attach_category_forms() {
        let d = doc("2 разряда");
        let (s, end) = try_attach_category(d.first().unwrap()).unwrap();
        assert_eq!(s, "2 разряда");
        assert_eq!(end.idx(), 1);
        let d = doc("3 ранга");
        assert_eq!(try_attach_category(d.first().unwrap()).unwrap().0, "3 ранга");
        let d = doc("слово");
        assert!(try_attach_category(d.first().unwrap()).is_none());
    }

    #[test]
    fn test_memoised_result_is_stable() {
        let d = doc("директор завода");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let t = d.first().unwrap();
        let first = try_attach(&ctx, t, AttachAttrs::NO).unwrap();
        let second = try_attach(&ctx, t, AttachAttrs::NO).unwrap();
        assert_eq!(first.name(), second.name());
        assert_eq!(first.end, second.end);
    }

    #[test]
    fn test_attach_attrs() {
        let a = AttachAttrs::AFTER_DEPUTY_MARKER | AttachAttrs::IN_PROCESS;
        assert!(a.contains(AttachAttrs::IN_PROCESS));
        assert!(!a.contains(AttachAttrs::ONLY_KEYWORD));
        assert!(!a.contains(AttachAttrs::NO));
    }
}
