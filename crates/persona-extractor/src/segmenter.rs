//! Name item segmentation
//!
//! Splits a run of tokens into name items: full words that may be a first
//! name, a surname or a patronymic, initials, referents of persons already
//! known in the document and generational suffixes (JR, SR). Every value
//! item carries the readings supporting each name role, so the resolver can
//! try all templates over the same list.

use std::fmt;

use tracing::trace;

use persona_core::noun_phrase::{self, NounPhraseParams};
use persona_core::text::{
    can_be_start_of_sentence, cyrillic_to_latin_char, ends_with_any, is_bracket, is_cyrillic_char,
    is_cyrillic_vowel, is_latin_vowel, is_vowel, latin_to_cyrillic_char,
    token_not_more_than_one_error,
};
use persona_core::{
    CharsInfo, MorphCase, MorphClass, MorphGender, MorphInfo, MorphNumber, TokenKind, TokenRef,
};

use crate::attribute::{self, AttachAttrs};
use crate::context::AnalysisContext;
use crate::name_part::{del_surname_end, ends_with_std_surname, NamePart, NameVariant};
use crate::person::PersonId;

// ============================================================================
// Constants
// ============================================================================

/// Particles glued to the following surname (АЛЬ-ФАРАБИ, ФОН-БРАУН)
pub const SUR_PREFIXES: &[&str] = &[
    "АБД", "АБУ", "АБУЛЬ", "АБДУ", "АБДЕЛЬ", "УММ", "АЛ", "АЛЬ", "АН", "АТ", "АР", "АС", "АД",
    "БИН", "БЕН", "ИБН", "УЛЬД", "БИНТ", "ФОН", "ВАН", "ДЕ", "ДИ", "ДА", "ЛА", "ЛЕ", "ЛЯ", "ЭЛЬ",
    "УЛЬ",
];

const LATIN_SUR_PREFIXES: &[&str] = &[
    "ABD", "AL", "BEN", "IBN", "VON", "VAN", "DE", "DI", "LA", "LE", "DA",
];

/// Arabic and Turkic name postfixes (МАМЕД-ОГЛЫ, АЛИ-ПАША)
const ARAB_POSTFIX: &[&str] = &[
    "АГА", "АЛИ", "АР", "АС", "АШ", "БЕЙ", "БЕК", "ЗАДЕ", "ОГЛЫ", "ОГЛИ", "УГЛИ", "ОЛЬ", "ООЛ",
    "ПАША", "БАША", "УЛЬ", "УЛЫ", "УУЛУ", "ХАН", "ХАДЖИ", "ШАХ", "ЭД", "ЭЛЬ",
];

const ARAB_POSTFIX_FEM: &[&str] = &["АСУ", "АЗУ", "ГЫЗЫ", "ЗУЛЬ", "КЫЗЫ", "КЫС", "КЗЫ"];

/// "Son of" / "daughter of" postfixes: the item becomes a patronymic only
const DECISIVE_POSTFIX: &[&str] = &["ОГЛЫ", "ОГЛИ", "КЫЗЫ", "ГЫЗЫ", "УГЛИ", "КЗЫ", "УЛЫ", "УУЛУ"];

fn is_arab_postfix(term: &str) -> bool {
    ARAB_POSTFIX.contains(&term) || ARAB_POSTFIX_FEM.contains(&term)
}

fn postfix_gender(term: &str) -> MorphGender {
    if ARAB_POSTFIX_FEM.contains(&term) {
        MorphGender::FEMININE
    } else {
        MorphGender::MASCULINE
    }
}

fn has_vowel(term: &str) -> bool {
    term.chars().any(is_vowel)
}

fn first_char(s: &str) -> Option<char> {
    s.chars().next()
}

fn initial_chars(cyrillic: bool) -> CharsInfo {
    CharsInfo {
        is_letter: true,
        is_all_upper: true,
        is_cyrillic_letter: cyrillic,
        is_latin_letter: !cyrillic,
        ..CharsInfo::default()
    }
}

// ============================================================================
// Parse attributes
// ============================================================================

/// Options of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParseAttrs(u16);

impl ParseAttrs {
    pub const NO: Self = Self(0);
    /// 1. / 0. / 3. may be OCR-damaged initials
    pub const CAN_INITIAL_BE_DIGIT: Self = Self(1);
    pub const CAN_BE_LATIN: Self = Self(2);
    pub const CAN_BE_LOWER: Self = Self(4);
    /// Any capitalised word becomes an item
    pub const MUST_BE_ITEM_ALWAYS: Self = Self(8);
    /// Do not stop the list at attribute keywords
    pub const IGNORE_ATTRS: Self = Self(16);
    pub const NOMINATIVE_CASE: Self = Self(32);
    pub const AFTER_ATTRIBUTE: Self = Self(64);
    pub const SURNAME_PREFIX_NOT_MERGE: Self = Self(128);
    /// БЕН / ВАН may stand alone
    pub const ALT_VAR: Self = Self(256);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for ParseAttrs {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// Name Item
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Value,
    Initial,
    Referent,
    Suffix,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Value => "VALUE",
            Self::Initial => "INITIAL",
            Self::Referent => "REFERENT",
            Self::Suffix => "SUFFIX",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One segment of a name run
#[derive(Debug, Clone)]
pub struct NameItem<'a> {
    pub kind: ItemKind,
    pub value: String,
    pub begin: TokenRef<'a>,
    pub end: TokenRef<'a>,
    pub chars: CharsInfo,
    /// Common word of the dictionary (not a proper name)
    pub is_in_dictionary: bool,
    pub is_hiphen_before: bool,
    pub is_hiphen_after: bool,
    /// Separated from the previous item by a comma
    pub is_comma_before: bool,
    pub firstname: Option<NamePart>,
    pub lastname: Option<NamePart>,
    pub middlename: Option<NamePart>,
    pub referent: Option<PersonId>,
    pub morph: MorphInfo,
    /// Glued to a surname particle (ИБН-ХАСАН, АЛЬ-ФАРАБИ)
    pub has_sur_prefix: bool,
    /// Gender fixed by a "son of" / "daughter of" postfix (ОГЛЫ, КЫЗЫ)
    pub kin_gender: MorphGender,
}

impl<'a> NameItem<'a> {
    pub fn new(
        kind: ItemKind,
        begin: TokenRef<'a>,
        end: TokenRef<'a>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            begin,
            end,
            chars: begin.chars(),
            is_in_dictionary: false,
            is_hiphen_before: false,
            is_hiphen_after: false,
            is_comma_before: false,
            firstname: None,
            lastname: None,
            middlename: None,
            referent: None,
            morph: MorphInfo::new(),
            has_sur_prefix: false,
            kin_gender: MorphGender::UNDEFINED,
        }
    }

    fn with_chars(mut self, chars: CharsInfo) -> Self {
        self.chars = chars;
        self
    }

    pub fn source_text(&self) -> &'a str {
        self.begin.doc().source_text(self.begin.idx(), self.end.idx())
    }

    pub fn length_char(&self) -> usize {
        self.source_text().chars().count()
    }

    pub fn is_newline_before(&self) -> bool {
        self.begin.is_newline_before()
    }

    pub fn is_newline_after(&self) -> bool {
        self.end.is_newline_after()
    }

    pub fn whitespaces_before(&self) -> usize {
        self.begin.whitespaces_before()
    }

    pub fn whitespaces_after(&self) -> usize {
        self.end.whitespaces_after()
    }

    pub fn is_single_token(&self) -> bool {
        self.begin == self.end
    }

    /// Syllable shape of a Chinese/Korean/Vietnamese name part (ЛИ, ВАН,
    /// ЧЖАН); `last` relaxes the vowel count for the final item
    pub fn is_asian_item(&self, last: bool) -> bool {
        if self.kind != ItemKind::Value {
            return false;
        }
        if self.chars.is_all_lower {
            return false;
        }
        let chars: Vec<char> = self.value.chars().collect();
        if self.chars.is_all_upper && self.length_char() > 1 {
            return false;
        }
        let mut consonants = 0;
        let mut vowels = 0;
        let mut prev_vowel = false;
        for (i, &ch) in chars.iter().enumerate() {
            if !is_cyrillic_char(ch) {
                return false;
            }
            if is_cyrillic_vowel(ch) {
                if !prev_vowel {
                    if vowels > 0 {
                        if !last {
                            return false;
                        }
                        if i == chars.len() - 1 && matches!(ch, 'А' | 'У' | 'Е') {
                            break;
                        }
                        if i + 2 == chars.len() && ch == 'О' && chars[i + 1] == 'М' {
                            break;
                        }
                    }
                    vowels += 1;
                }
                prev_vowel = true;
            } else {
                consonants += 1;
                prev_vowel = false;
            }
        }
        if vowels != 1 && !(last && vowels == 2) {
            return false;
        }
        if consonants > 4 {
            return false;
        }
        if chars.len() == 1 {
            if !self.chars.is_all_upper {
                return false;
            }
        } else if !self.chars.is_capital_upper {
            return false;
        }
        if chars.len() > 5
            && self.is_single_token()
            && !last
            && !self.begin.morph_class_in_dictionary().is_undefined()
        {
            return false;
        }
        true
    }

    /// Attach an Arabic/Turkic postfix to every role of the item
    pub fn add_postfix_info(&mut self, postfix: &str, gender: MorphGender) {
        self.value = format!("{}-{postfix}", self.value);
        if let Some(l) = &mut self.lastname {
            l.add_postfix(postfix, gender);
        }
        if let Some(f) = &mut self.firstname {
            f.add_postfix(postfix, gender);
        } else if let Some(l) = &self.lastname {
            self.firstname = Some(l.clone());
        } else {
            let mut f = NamePart::new();
            f.is_in_dictionary = true;
            f.vars.push(NameVariant::new(self.value.clone()).with_gender(gender));
            self.lastname = Some(f.clone());
            self.firstname = Some(f);
        }
        if let Some(m) = &mut self.middlename {
            m.add_postfix(postfix, gender);
        } else if !self.chars.is_latin_letter {
            self.middlename = self.firstname.clone();
        }
        self.is_in_dictionary = false;
    }

    /// Absorb the item written after a hyphen
    pub fn merge_with_by_hiphen(&mut self, other: NameItem<'a>) {
        let prefix = format!("{}-", self.value);
        self.end = other.end;
        self.value = format!("{}-{}", self.value, other.value);
        let roles = [
            (&mut self.lastname, other.lastname),
            (&mut self.firstname, other.firstname),
            (&mut self.middlename, other.middlename),
        ];
        for (mine, theirs) in roles {
            match (mine.as_mut(), theirs) {
                (Some(m), Some(t)) if !t.vars.is_empty() => m.merge_with_by_hiphen(t),
                (Some(m), _) => m.add_postfix(&other.value, MorphGender::UNDEFINED),
                (None, Some(mut t)) => {
                    t.add_prefix(&prefix);
                    *mine = Some(t);
                }
                (None, None) => {}
            }
        }
    }

    pub fn remove_not_genitive(&mut self) {
        for part in [&mut self.lastname, &mut self.firstname, &mut self.middlename]
            .into_iter()
            .flatten()
        {
            part.remove_not_genitive();
        }
    }

    fn decisive_postfix(&mut self, postfix: &str) {
        if !DECISIVE_POSTFIX.contains(&postfix) {
            return;
        }
        self.kin_gender = postfix_gender(postfix);
        if self.middlename.is_some() {
            self.firstname = None;
            self.lastname = None;
        }
    }
}

impl fmt::Display for NameItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.value)?;
        if let Some(p) = &self.firstname {
            write!(f, " (First: {p})")?;
        }
        if let Some(p) = &self.middlename {
            write!(f, " (Middle: {p})")?;
        }
        if let Some(p) = &self.lastname {
            write!(f, " (Last: {p})")?;
        }
        if let Some(r) = self.referent {
            write!(f, " Ref: {r}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Single item
// ============================================================================

/// Recognise one item starting at `t`; `prev` holds the items already
/// collected in the current list
pub fn attach_single<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: ParseAttrs,
    prev: Option<&[NameItem<'a>]>,
) -> Option<NameItem<'a>> {
    let must = attrs.contains(ParseAttrs::MUST_BE_ITEM_ALWAYS);
    let chars = t.chars();
    if matches!(t.kind(), TokenKind::Word) {
        let mc = t.morph_class_in_dictionary();
        if (mc.is_preposition() || mc.is_conjunction() || mc.is_misc())
            && t.next().is_some_and(|n| n.referent().is_some())
            && !(must && !chars.is_all_lower)
            && !(t.length_char() == 1 && chars.is_all_upper)
        {
            return None;
        }
    }
    if t.token().is_number_word() && chars.is_all_lower && !must {
        return None;
    }
    if t.referent().is_some() {
        return attach_referent(ctx, t, attrs);
    }
    if let Some(res) = attach_latin_lookalike_initial(t, prev) {
        return Some(res);
    }
    if matches!(t.kind(), TokenKind::Word)
        && t.length_char() == 1
        && chars.is_letter
        && chars.is_all_upper
        && t.whitespaces_after() < 2
        && t.next().is_some_and(|n| {
            matches!(n.kind(), TokenKind::Word) && n.length_char() == 1 && n.chars().is_all_lower
        })
    {
        if let Some(res) = attach_spaced_letters(ctx, t, attrs, prev) {
            return Some(res);
        }
    }
    if let Some(res) = attach_core(ctx, t, attrs, prev) {
        return Some(res);
    }
    if chars.is_latin_letter && attrs.contains(ParseAttrs::CAN_BE_LATIN) {
        if let Some(OntologyHit::Lastname(last)) = ontology_lookup(ctx, t) {
            let mut res = NameItem::new(ItemKind::Value, t, t, t.term());
            res.lastname = Some(last);
            return Some(res);
        }
        if let Some(res) = attach_latin(t) {
            return Some(res);
        }
    }
    if let Some(res) = attach_digit_initial(t, attrs) {
        return Some(res);
    }
    if must && matches!(t.kind(), TokenKind::Word) && !chars.is_all_lower {
        return Some(NameItem::new(ItemKind::Value, t, t, t.term()));
    }
    if chars.is_all_upper
        && matches!(t.kind(), TokenKind::Word)
        && t.length_char() == 1
        && t.whitespaces_before() < 2
    {
        if let Some(prev) = prev.filter(|p| !p.is_empty() && p[0].chars.is_capital_upper) {
            let last = &prev[prev.len() - 1];
            let ok = (prev.len() == 1
                && last.kind == ItemKind::Value
                && last.lastname.as_ref().is_some_and(|l| l.is_in_dictionary))
                || (prev.len() == 2
                    && last.kind == ItemKind::Initial
                    && prev[0].lastname.is_some());
            if ok {
                return Some(NameItem::new(ItemKind::Initial, t, t, t.term()));
            }
        }
    }
    None
}

/// OCR confusions of Cyrillic initials: JI. and J1. for Л, I1. for П
fn attach_latin_lookalike_initial<'a>(
    t: TokenRef<'a>,
    prev: Option<&[NameItem<'a>]>,
) -> Option<NameItem<'a>> {
    if !matches!(t.kind(), TokenKind::Word) || !t.chars().is_all_upper || t.is_whitespace_after() {
        return None;
    }
    let next = t.next()?;
    if t.term() == "JI" && next.is_char('.') {
        return Some(NameItem::new(ItemKind::Initial, t, next, "Л").with_chars(initial_chars(true)));
    }
    let digit_one = next.is_digit_number() && next.number().is_some_and(|n| n.value == 1);
    let dot = next.next().filter(|n| n.is_char('.'))?;
    if !digit_one {
        return None;
    }
    match t.term() {
        "J" => Some(NameItem::new(ItemKind::Initial, t, dot, "Л").with_chars(initial_chars(true))),
        "I" if prev.is_some_and(|p| p.first().is_some_and(|p0| p0.chars.is_cyrillic_letter)) => {
            Some(NameItem::new(ItemKind::Initial, t, dot, "П").with_chars(initial_chars(true)))
        }
        _ => None,
    }
}

/// Digits standing for letters in damaged text: 1. → І, 0. → О, 3. → З,
/// and 3/0 glued to a lowercase word
fn attach_digit_initial<'a>(t: TokenRef<'a>, attrs: ParseAttrs) -> Option<NameItem<'a>> {
    if !t.is_digit_number()
        || t.length_char() != 1
        || !attrs.contains(ParseAttrs::CAN_INITIAL_BE_DIGIT)
    {
        return None;
    }
    let next = t.next()?;
    let value = t.number()?.value;
    if next.is_char_of(".„") {
        let letter = match value {
            1 => "І",
            0 => "О",
            3 => "З",
            _ => return None,
        };
        let item = NameItem::new(ItemKind::Initial, t, next, letter);
        return Some(item.with_chars(initial_chars(true)));
    }
    if next.chars().is_all_lower
        && !t.is_whitespace_after()
        && next.length_char() > 2
        && next.chars().is_cyrillic_letter
    {
        let letter = match value {
            3 => "З",
            0 => "О",
            _ => return None,
        };
        let chars = CharsInfo {
            is_letter: true,
            is_capital_upper: true,
            is_cyrillic_letter: true,
            ..CharsInfo::default()
        };
        let value = format!("{letter}{}", next.term());
        return Some(NameItem::new(ItemKind::Value, t, next, value).with_chars(chars));
    }
    None
}

/// Surname typed with spaces between the letters (И в а н о в)
fn attach_spaced_letters<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: ParseAttrs,
    prev: Option<&[NameItem<'a>]>,
) -> Option<NameItem<'a>> {
    let mut latin = 0;
    let mut cyrillic = 0;
    let mut count_script = |ch: char| {
        if is_cyrillic_char(ch) {
            cyrillic += 1;
            if cyrillic_to_latin_char(ch).is_some() {
                latin += 1;
            }
        } else {
            latin += 1;
            if latin_to_cyrillic_char(ch).is_some() {
                cyrillic += 1;
            }
        }
    };
    count_script(first_char(t.source_text())?);
    let mut count = 0;
    let mut last = t;
    let mut cur = t.next();
    while let Some(tt) = cur {
        if tt.whitespaces_before() > 1 {
            break;
        }
        if !matches!(tt.kind(), TokenKind::Word)
            || tt.length_char() != 1
            || !tt.chars().is_all_lower
        {
            break;
        }
        last = tt;
        count += 1;
        count_script(first_char(tt.source_text())?);
        cur = tt.next();
    }
    if count < 2 {
        return None;
    }
    if count < 5 {
        let after_initial =
            prev.is_some_and(|p| p.last().is_some_and(|l| l.kind == ItemKind::Initial));
        if !after_initial {
            let next = last.next()?;
            let ne = attach_single(ctx, next, attrs, None)?;
            if ne.kind != ItemKind::Initial {
                return None;
            }
        }
    }
    let is_cyr = cyrillic > latin || (cyrillic == latin && !t.chars().is_latin_letter);
    let mut value = String::new();
    for tt in t.until(last) {
        let Some(mut ch) = first_char(tt.source_text()) else {
            continue;
        };
        if is_cyr && !is_cyrillic_char(ch) {
            ch = latin_to_cyrillic_char(ch).unwrap_or(ch);
        } else if !is_cyr && is_cyrillic_char(ch) {
            ch = cyrillic_to_latin_char(ch).unwrap_or(ch);
        }
        value.extend(ch.to_uppercase());
    }
    let chars = CharsInfo {
        is_letter: true,
        is_capital_upper: true,
        is_cyrillic_letter: is_cyr,
        is_latin_letter: !is_cyr,
        ..CharsInfo::default()
    };
    Some(NameItem::new(ItemKind::Value, t, last, value).with_chars(chars))
}

/// A capitalised single-word referent (a city or organisation name) used
/// as a surname
fn attach_referent<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: ParseAttrs,
) -> Option<NameItem<'a>> {
    let source = t.source_text();
    let chars = CharsInfo::from_text(source);
    if !chars.is_letter || !chars.is_capital_upper {
        return None;
    }
    let value = source.to_uppercase();
    let mut res = NameItem::new(ItemKind::Value, t, t, value.clone()).with_chars(chars);
    let forms = ctx.morphology().analyze(&value);
    res.morph = MorphInfo::from_forms(&forms);
    let mut last = NamePart::with_term(value.clone());
    last.vars.push(NameVariant::new(value.clone()));
    res.lastname = Some(last);
    if let Some(sec) = t.next().filter(|n| n.is_hiphen()).and_then(|n| n.next()) {
        if matches!(sec.kind(), TokenKind::Word)
            && sec.morph_class_in_dictionary().is_proper_secname()
        {
            if let Some(mut res1) = attach_single(ctx, sec, ParseAttrs::NO, None) {
                if let Some(mut middle) = res1.middlename.take() {
                    middle.add_prefix(&format!("{value}-"));
                    res1.firstname = Some(middle.clone());
                    res1.middlename = Some(middle);
                    res1.begin = t;
                    return Some(res1);
                }
            }
        }
    }
    if let Some(next) = t.next() {
        if let Some(res1) = attach_single(ctx, next, attrs, None) {
            if res1.lastname.is_some() && res1.firstname.is_none() && res1.middlename.is_none() {
                return None;
            }
        }
    }
    res.is_in_dictionary = forms.iter().any(|f| f.in_dictionary);
    Some(res)
}

// ============================================================================
// Ontology
// ============================================================================

enum OntologyHit {
    Referent(PersonId, usize),
    Lastname(NamePart),
}

/// Last token index of `identity` written from `t` on
fn match_identity(t: TokenRef<'_>, identity: &str) -> Option<usize> {
    let mut cur = Some(t);
    let mut end = None;
    for word in identity.split(|c: char| c.is_whitespace() || c == '-').filter(|w| !w.is_empty()) {
        let mut tt = cur?;
        if tt.is_hiphen() && end.is_some() {
            tt = tt.next()?;
        }
        if tt.term() != word {
            return None;
        }
        end = Some(tt.idx());
        cur = tt.next();
    }
    end
}

/// Persons of the document's ontology matching the word at `t`
fn ontology_lookup<'a>(ctx: &AnalysisContext<'a>, t: TokenRef<'a>) -> Option<OntologyHit> {
    if !ctx.ontology_enabled() {
        return None;
    }
    let referent = ctx.with_persons(|persons| {
        persons.iter().enumerate().find_map(|(i, p)| {
            p.identities
                .iter()
                .find_map(|ident| match_identity(t, ident))
                .map(|end| (PersonId(i), end))
        })
    });
    if let Some((id, end)) = referent {
        return Some(OntologyHit::Referent(id, end));
    }
    let term = t.term();
    let ids = ctx.find_persons_by_lastname(term);
    if ids.is_empty() {
        return None;
    }
    let mc = t.morph_class_in_dictionary();
    if mc.is_proper_name() && !mc.is_proper_surname() {
        return None;
    }
    let token_gender = t.morph_info().gender;
    let key = del_surname_end(term);
    let mut last = NamePart::with_term(term);
    last.is_in_ontology = true;
    ctx.with_persons(|persons| {
        for id in &ids {
            let Some(p) = persons.get(id.0) else {
                continue;
            };
            let gender = p.gender();
            if !gender.is_undefined()
                && !token_gender.is_undefined()
                && !token_gender.intersects(gender)
            {
                continue;
            }
            for l in p.lastnames.iter().filter(|l| *l == term || del_surname_end(l) == key) {
                if !last.vars.iter().any(|v| v.value == *l && v.gender == gender) {
                    let mut v = NameVariant::new(l.clone()).with_gender(gender);
                    v.class = MorphClass::PROPER_SURNAME;
                    last.vars.push(v);
                }
            }
        }
    });
    trace!(term, persons = ids.len(), "Ontology surname hit");
    Some(OntologyHit::Lastname(last))
}

// ============================================================================
// Core attach
// ============================================================================

fn neighbour_class(t: Option<TokenRef<'_>>, gap: usize, pred: impl Fn(MorphClass) -> bool) -> bool {
    gap < 3 && t.is_some_and(|n| pred(n.morph_class_in_dictionary()))
}

fn attach_core<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: ParseAttrs,
    prev: Option<&[NameItem<'a>]>,
) -> Option<NameItem<'a>> {
    if !t.is_word() || !t.chars().is_letter {
        return None;
    }
    let chars = t.chars();
    let term = t.term();
    let mut can_be_all_lower = false;
    if chars.is_all_lower
        && !attrs.contains(ParseAttrs::CAN_BE_LOWER)
        && !SUR_PREFIXES.contains(&term)
    {
        let mc0 = t.morph_class_in_dictionary();
        let d_bracket = term == "Д"
            && !t.is_whitespace_after()
            && t.next().is_some_and(|n| {
                is_bracket(n)
                    && !n.is_whitespace_after()
                    && n.next().is_some_and(|nn| nn.is_word() && nn.chars().is_capital_upper)
            });
        if d_bracket {
        } else if mc0.is_proper_surname() && !mc0.is_noun() {
            let name = MorphClass::is_proper_name;
            can_be_all_lower = neighbour_class(t.next(), t.whitespaces_after(), name)
                || neighbour_class(t.previous(), t.whitespaces_before(), name);
            if !can_be_all_lower {
                return None;
            }
        } else if mc0.is_proper_secname() && !mc0.is_noun() {
            can_be_all_lower =
                neighbour_class(t.previous(), t.whitespaces_before(), MorphClass::is_proper_name);
            if !can_be_all_lower {
                return None;
            }
        } else if mc0.is_proper_name() && !mc0.is_noun() {
            let before = t.whitespaces_before();
            can_be_all_lower = neighbour_class(t.next(), t.whitespaces_after(), |c| {
                c.is_proper_surname() || c.is_proper_secname()
            }) || neighbour_class(t.previous(), before, MorphClass::is_proper_surname);
            if !can_be_all_lower {
                return None;
            }
        } else {
            return None;
        }
    }

    if t.length_char() == 1 || term == "ДЖ" {
        return attach_short(ctx, t, attrs, prev);
    }
    if !chars.is_cyrillic_letter || !has_vowel(term) {
        return None;
    }

    let mut tt = t;
    let mut sur_prefix: Option<String> = None;
    let mut res = NameItem::new(ItemKind::Value, t, t, term);
    res.morph = t.morph_info();
    match ontology_lookup(ctx, t) {
        Some(OntologyHit::Referent(id, end)) => {
            let end = t.doc().at(end).unwrap_or(t);
            let mut r = NameItem::new(ItemKind::Referent, t, end, term);
            r.referent = Some(id);
            r.morph = t.morph_info();
            return Some(r);
        }
        Some(OntologyHit::Lastname(last)) => res.lastname = Some(last),
        None if SUR_PREFIXES.contains(&term) => {
            let alt_alone = (t.is_value("БЕН", None) || t.is_value("ВАН", None))
                && attrs.contains(ParseAttrs::ALT_VAR)
                && !t.next().is_some_and(|n| n.is_hiphen());
            if !alt_alone {
                if let Some(merged) = merge_surname_prefix(t, attrs, &mut res) {
                    res.has_sur_prefix = true;
                    sur_prefix = Some(merged.0);
                    tt = merged.1;
                }
                if sur_prefix.is_none() {
                    return (chars.is_capital_upper || chars.is_all_upper).then_some(res);
                }
            }
        }
        None => {}
    }
    let term = tt.term();
    let tchars = tt.chars();

    if tt.is_value("ФАМИЛИЯ", Some("ПРІЗВИЩЕ"))
        || tt.is_value("ИМЯ", Some("ІМЯ"))
        || tt.is_value("ОТЧЕСТВО", Some("БАТЬКОВІ"))
    {
        return None;
    }
    let tclass = tt.morph_info().class;
    if (tclass.is_preposition() || tclass.is_conjunction())
        && !tt.morph_class_in_dictionary().is_proper_name()
        && !tt.next().is_some_and(|n| n.is_char('.'))
        && !(tt.length_char() > 1 && tchars.is_capital_upper && !can_be_start_of_sentence(tt))
    {
        return None;
    }
    if !attrs.contains(ParseAttrs::MUST_BE_ITEM_ALWAYS) && is_greeting(tt) {
        return None;
    }
    if !tchars.is_all_upper && !tchars.is_capital_upper && !can_be_all_lower {
        if attrs.contains(ParseAttrs::CAN_INITIAL_BE_DIGIT) && !tchars.is_all_lower {
        } else if !attrs.contains(ParseAttrs::CAN_BE_LOWER) {
            return None;
        }
    }

    collect_roles(tt, attrs, sur_prefix.is_some(), &mut res);
    let drop_lastname = postprocess_lastname(ctx, tt, attrs, prev, sur_prefix.as_deref(), &mut res);
    if drop_lastname {
        res.lastname = None;
    }

    if res.is_single_token() {
        let b = res.begin;
        let bclass = b.morph_class_in_dictionary();
        if bclass.is_verb() {
            let weak =
                res.lastname.as_ref().is_some_and(|l| !l.has_std_tail && !l.is_in_dictionary);
            let capital_mid = b.chars().is_capital_upper && !can_be_start_of_sentence(b);
            if weak && !res.is_newline_before() && !capital_mid {
                res.lastname = None;
            }
        }
        if res.lastname.is_some() && b.is_value("ЗАМ", None) {
            return None;
        }
        if res.firstname.is_some() && b.term() == "ЛЮБОЙ" {
            res.firstname = None;
        }
        if bclass.is_adjective() && res.lastname.is_some() {
            if let Some(npt) = noun_phrase::try_parse(b, NounPhraseParams::default()) {
                let weak = res
                    .lastname
                    .as_ref()
                    .is_some_and(|l| !l.is_in_ontology && !l.is_in_dictionary);
                if npt.begin != npt.end && weak {
                    res.lastname = None;
                }
            }
        }
    }

    if let Some(first) = &mut res.firstname {
        expand_short_names(ctx, first);
    }

    if res.is_in_dictionary
        && res.firstname.is_none()
        && !attrs.contains(ParseAttrs::MUST_BE_ITEM_ALWAYS)
    {
        let lower = ctx.stats().word_info(res.begin).map_or(0, |w| w.lower_count);
        if lower > 0 {
            let c = t.morph_info().class;
            let function_word = c.is_preposition() || c.is_conjunction() || c.is_pronoun();
            if !(function_word && !can_be_start_of_sentence(t)) {
                return None;
            }
        }
    }

    attach_hiphen_tail(ctx, &mut res);
    attach_spaced_postfixes(&mut res);
    Some(res)
}

/// Single letters: initials (И., Д.), vowels used as names (Я, О) and
/// Д'/О' prefixes
fn attach_short<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: ParseAttrs,
    prev: Option<&[NameItem<'a>]>,
) -> Option<NameItem<'a>> {
    let next = t.next()?;
    let term = t.term();
    let mut ini = term.to_string();
    let mut ci = t.chars();
    if !ci.is_cyrillic_letter {
        let cyr = latin_to_cyrillic_char(first_char(term)?)?;
        ini = cyr.to_string();
        ci.is_latin_letter = false;
        ci.is_cyrillic_letter = true;
    }
    if next.is_char('.') {
        return Some(NameItem::new(ItemKind::Initial, t, next, ini).with_chars(ci));
    }
    let after_initial = prev.is_some_and(|p| p.last().is_some_and(|l| l.kind == ItemKind::Initial));
    if next.is_char_of(",;„") && after_initial {
        return Some(NameItem::new(ItemKind::Initial, t, t, ini).with_chars(ci));
    }
    if next.whitespaces_after() < 2
        && t.whitespaces_after() < 2
        && matches!(term, "Д" | "О" | "Н")
        && is_bracket(next)
    {
        if let Some(body) = next.next().filter(|n| n.is_word() && n.chars().is_cyrillic_letter) {
            let body_attrs = attrs | ParseAttrs::CAN_BE_LOWER;
            if let Some(mut pit0) = attach_single(ctx, body, body_attrs, prev) {
                pit0.begin = t;
                pit0.value = format!("{ini}{}", pit0.value);
                if let Some(l) = &mut pit0.lastname {
                    l.add_prefix(&ini);
                    l.is_in_dictionary = true;
                } else if let Some(mut f) = pit0.firstname.take() {
                    f.add_prefix(&ini);
                    f.is_in_dictionary = true;
                    pit0.lastname = Some(f);
                }
                pit0.firstname = None;
                pit0.middlename = None;
                if !pit0.chars.is_all_upper && !pit0.chars.is_capital_upper {
                    pit0.chars.is_capital_upper = true;
                }
                return Some(pit0);
            }
        }
    }
    if !first_char(term).is_some_and(is_cyrillic_vowel) {
        return None;
    }
    if t.whitespaces_after() != 1 {
        let glued_punct = !t.is_whitespace_after()
            && matches!(next.kind(), TokenKind::Word | TokenKind::Punct)
            && !next.is_char('.')
            && !next.chars().is_letter;
        if !glued_punct {
            return None;
        }
    }
    Some(NameItem::new(ItemKind::Value, t, t, term).with_chars(t.chars()))
}

/// Glue a surname particle with the surname after it; returns the prefix
/// text and the surname token
fn merge_surname_prefix<'a>(
    t: TokenRef<'a>,
    attrs: ParseAttrs,
    res: &mut NameItem<'a>,
) -> Option<(String, TokenRef<'a>)> {
    let is_particle = |x: TokenRef<'_>| {
        x.is_word() && (matches!(x.term(), "Л" | "ЛЬ") || SUR_PREFIXES.contains(&x.term()))
    };
    let mut t1 = t.next();
    if let Some(x) = t1 {
        if is_particle(x) {
            res.end = x;
            res.value.push_str(x.term());
            t1 = x.next();
        } else if x.is_hiphen() {
            if let Some(y) = x.next().filter(|y| is_particle(*y) && y.next().is_some()) {
                res.end = y;
                res.value.push_str(y.term());
                t1 = y.next();
            }
        }
    }
    let cand = match t1 {
        Some(x) if x.is_hiphen() => x.next(),
        Some(x)
            if attrs.contains(ParseAttrs::SURNAME_PREFIX_NOT_MERGE) && x.chars().is_all_lower =>
        {
            None
        }
        other => other,
    };
    let tt = cand.filter(|c| {
        c.is_word()
            && !c.is_newline_before()
            && !c.chars().is_all_lower
            && c.chars().is_cyrillic_letter
            && c.length_char() >= 3
    })?;
    let prefix = res.value.clone();
    res.value = format!("{prefix}-{}", tt.term());
    res.morph = tt.morph_info();
    res.chars = tt.chars();
    res.end = tt;
    Some((prefix, tt))
}

fn is_greeting(tt: TokenRef<'_>) -> bool {
    let term = tt.term();
    if tt.length_char() <= 6 {
        return false;
    }
    if term.starts_with("ЗД") {
        return token_not_more_than_one_error("ЗДРАВСТВУЙТЕ", tt)
            || token_not_more_than_one_error("ЗДРАВСТВУЙ", tt);
    }
    if term.starts_with("ПР") {
        return token_not_more_than_one_error("ПРИВЕТСТВУЮ", tt);
    }
    if term.starts_with("УВ") {
        return tt.is_value("УВАЖАЕМЫЙ", None);
    }
    if term.starts_with("ДО") {
        return tt.is_value("ДОРОГОЙ", None);
    }
    false
}

/// Fill the first name, surname and patronymic readings from the word forms
fn collect_roles(tt: TokenRef<'_>, attrs: ParseAttrs, has_prefix: bool, res: &mut NameItem<'_>) {
    let term = tt.term();
    let tchars = tt.chars();
    let mut adj = None;
    for wf in tt.morph() {
        if wf.class.is_adjective() && wf.short_form {
            let adverb_like = term.ends_with("НО") || tt.next().is_some_and(|n| n.is_hiphen());
            if wf.in_dictionary && adverb_like {
                res.is_in_dictionary = true;
            }
            continue;
        }
        let full = wf.normal_full_or_case();
        if wf.class.is_adjective()
            && adj.is_none()
            && !full.ends_with("ОВ")
            && !full.ends_with("ИН")
            && (wf.in_dictionary || ends_with_any(&wf.normal_case, &["ЫЙ", "КИЙ", "АЯ", "ЯЯ"]))
        {
            adj = Some(wf);
        }
        if wf.class.is_verb() {
            if wf.in_dictionary {
                res.is_in_dictionary = true;
            }
            continue;
        }
        if wf.in_dictionary
            && (wf.class.is_adverb()
                || wf.class.is_preposition()
                || wf.class.is_conjunction()
                || wf.class.is_pronoun()
                || wf.class.is_personal_pronoun())
        {
            res.is_in_dictionary = true;
        }
        if wf.class.is_proper_surname() || has_prefix {
            let last = res.lastname.get_or_insert_with(|| NamePart::with_term(term));
            if let Some(a) = adj.take() {
                if !wf.in_dictionary && a.number == MorphNumber::SINGULAR {
                    last.vars.push(NameVariant::from_form(a.normal_case.clone(), a));
                    if a.normal_case == term && !ends_with_std_surname(&wf.normal_case) {
                        break;
                    }
                }
            }
            if attrs.contains(ParseAttrs::NOMINATIVE_CASE)
                && !wf.case.is_undefined()
                && !wf.case.is_nominative()
            {
                continue;
            }
            let mut v = NameVariant::from_form(wf.normal_case.clone(), wf);
            if wf.normal_case != term && term.ends_with("ОВ") {
                v.value = term.to_string();
                v.gender = MorphGender::MASCULINE;
            } else if wf.number == MorphNumber::PLURAL {
                let full = wf.normal_full.as_deref();
                if let Some(f) = full.filter(|f| *f != wf.normal_case && f.chars().count() > 1) {
                    v.value = if wf.normal_case.len() > term.len() {
                        term.to_string()
                    } else {
                        f.to_string()
                    };
                    v.number = MorphNumber::SINGULAR;
                }
            }
            let both_genders =
                wf.in_dictionary && v.gender.is_undefined() && wf.gender.is_undefined();
            let feminine_in = v.gender == MorphGender::MASCULINE
                && !wf.in_dictionary
                && ends_with_any(&v.value, &["ИН", "ІН"])
                && ends_with_any(term, &["ИНА", "ІНА"]);
            if both_genders {
                v.gender = MorphGender::MASCULINE;
                let fem = v.clone().with_gender(MorphGender::FEMININE);
                last.vars.push(v);
                last.vars.push(fem);
            } else {
                last.vars.push(v);
                if feminine_in {
                    last.vars.push(
                        NameVariant::new(term)
                            .with_gender(MorphGender::MASCULINE)
                            .with_case(MorphCase::NOMINATIVE),
                    );
                }
            }
            if wf.in_dictionary {
                last.is_in_dictionary = true;
            }
            if ends_with_any(term, &["ИХ", "ЫХ"])
                && last.vars.first().is_some_and(|v| v.value != term)
            {
                let mut v = NameVariant::new(term)
                    .with_gender(MorphGender::MASCULINE | MorphGender::FEMININE)
                    .with_case(MorphCase::ALL_CASES);
                v.class = MorphClass::PROPER_SURNAME;
                last.vars.insert(0, v);
            }
        }
        if has_prefix {
            continue;
        }
        if wf.class.is_proper_name() && wf.number != MorphNumber::PLURAL {
            let lang = tt.lang();
            let name = wf.normal_case.as_str();
            let ok = if lang.is_ua() && !lang.is_ru() {
                true
            } else if matches!(name, "ЯКОВ" | "ИОВ" | "ИАКОВ") || name.chars().count() < 5 {
                true
            } else {
                let short_caps = tchars.is_all_upper && tt.length_char() < 4;
                !name.ends_with("ОВ") && name != "АЛЛ" && !short_caps
            };
            if ok {
                let first = res.firstname.get_or_insert_with(|| NamePart::with_term(term));
                first.vars.push(NameVariant::from_form(name, wf));
                if wf.in_dictionary && (!tchars.is_all_upper || tt.length_char() > 4) {
                    first.is_in_dictionary = true;
                }
            }
        }
        if !ends_with_std_surname(term) {
            if wf.class.is_proper_secname() {
                let middle = res.middlename.get_or_insert_with(|| NamePart::with_term(term));
                let v = NameVariant::from_form(wf.normal_case.clone(), wf);
                if v.value == term {
                    middle.vars.insert(0, v);
                } else {
                    middle.vars.push(v);
                }
                if wf.in_dictionary {
                    middle.is_in_dictionary = true;
                }
            }
            if !wf.class.is_proper() && wf.in_dictionary {
                res.is_in_dictionary = true;
            }
        } else if wf.in_dictionary && !wf.class.is_proper() && term.ends_with("КО") {
            res.is_in_dictionary = true;
        }
    }
}

/// Finish the surname readings; returns true when the surname reading
/// must be dropped because the word starts an ordinary noun phrase
fn postprocess_lastname<'a>(
    ctx: &AnalysisContext<'a>,
    tt: TokenRef<'a>,
    attrs: ParseAttrs,
    prev: Option<&[NameItem<'a>]>,
    sur_prefix: Option<&str>,
    res: &mut NameItem<'a>,
) -> bool {
    let term = tt.term();
    let Some(last) = res.lastname.as_mut() else {
        if tt.length_char() > 2 {
            res.lastname = Some(generic_lastname(tt, sur_prefix));
        }
        return false;
    };
    last.has_std_tail = last.vars.iter().any(|v| ends_with_std_surname(&v.value));
    if !last.is_in_dictionary && (!last.has_std_tail || ends_with_std_surname(term)) {
        let v = NameVariant::new(term);
        if ends_with_any(term, &["ВА", "НА"]) {
            last.vars.insert(0, v);
        } else {
            last.vars.push(v);
        }
        if ends_with_std_surname(term) {
            last.has_std_tail = true;
        }
    }
    last.correct_lastname_variants();
    if let Some(prefix) = sur_prefix {
        last.has_hiphen = true;
        last.term = Some(format!("{prefix}-{term}"));
        for v in &mut last.vars {
            v.value = format!("{prefix}-{}", v.value);
        }
    }
    if !tt.morph_info().class.is_adjective() || last.is_in_ontology {
        return false;
    }
    let std_end = last.vars.iter().any(|v| ends_with_std_surname(&v.value));
    if std_end || tt.whitespaces_after() >= 2 {
        return false;
    }
    let Some(npt) = noun_phrase::try_parse(tt, NounPhraseParams::default()) else {
        return false;
    };
    if npt.end == npt.begin {
        return false;
    }
    let after_name = prev.is_some_and(|p| {
        p.len() == 1
            && p[0].firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
            && tt.whitespaces_before() == 1
    });
    if after_name {
        return false;
    }
    let next_is_name =
        attach_core(ctx, npt.end, attrs, None).is_some_and(|n| n.firstname.is_some());
    !next_is_name
}

/// Surname reading of a word the dictionary knows nothing proper about
fn generic_lastname(tt: TokenRef<'_>, sur_prefix: Option<&str>) -> NamePart {
    let term = tt.term();
    let mut last = NamePart::new();
    for wf in tt.morph() {
        if wf.class.is_verb() || wf.short_form {
            continue;
        }
        if wf.case.is_genitive() && wf.number == MorphNumber::PLURAL && term.ends_with("ОВ") {
            last.vars.clear();
            last.vars.push(
                NameVariant::new(term)
                    .with_gender(MorphGender::MASCULINE)
                    .with_case(MorphCase::NOMINATIVE),
            );
            last.has_std_tail = true;
            break;
        }
        last.vars.push(NameVariant::from_form(wf.normal_case.clone(), wf));
        if !last.has_std_tail {
            last.has_std_tail = ends_with_std_surname(&wf.normal_case);
        }
    }
    last.vars.push(NameVariant::new(term));
    if !last.has_std_tail {
        last.has_std_tail = ends_with_std_surname(term);
    }
    if let Some(prefix) = sur_prefix {
        last.add_prefix(&format!("{prefix}-"));
        last.has_hiphen = true;
    }
    last
}

/// Replace diminutives by the full names they stand for (САША → АЛЕКСАНДР,
/// АЛЕКСАНДРА)
fn expand_short_names(ctx: &AnalysisContext<'_>, first: &mut NamePart) {
    let morphology = ctx.morphology();
    let mut i = 0;
    while i < first.vars.len() {
        let val = first.vars[i].value.clone();
        let full = morphology.short_names(&val);
        if full.is_empty() {
            i += 1;
            continue;
        }
        let g = first.vars[i].gender;
        if g != MorphGender::MASCULINE && g != MorphGender::FEMININE {
            for (k, (name, gender)) in full.into_iter().enumerate() {
                if k == 0 {
                    let v = &mut first.vars[i];
                    v.short_value = Some(val.clone());
                    v.value = name;
                    v.gender = gender;
                } else {
                    let mut v = NameVariant::new(name).with_gender(gender);
                    v.short_value = Some(val.clone());
                    first.vars.push(v);
                }
            }
        } else {
            let mut count = 0;
            for (name, gender) in full {
                if gender != g {
                    continue;
                }
                count += 1;
                if count < 2 {
                    let v = &mut first.vars[i];
                    v.value = name;
                    v.short_value = Some(val.clone());
                } else {
                    let mut v = first.vars[i].clone();
                    v.value = name;
                    v.short_value = Some(val.clone());
                    first.vars.insert(i + 1, v);
                }
            }
        }
        i += 1;
    }
}

/// Hyphenated continuation glued to the item: an Arabic postfix
/// (МАМЕД-ОГЛЫ) or a double surname/name (РИМСКИЙ-КОРСАКОВ, АННА-МАРИЯ)
fn attach_hiphen_tail<'a>(ctx: &AnalysisContext<'a>, res: &mut NameItem<'a>) {
    let Some(hiphen) = res.end.next().filter(|n| n.is_hiphen()) else {
        return;
    };
    let Some(next) = hiphen.next().filter(|n| matches!(n.kind(), TokenKind::Word)) else {
        return;
    };
    let ter = next.term();
    if is_arab_postfix(ter) {
        res.end = next;
        res.add_postfix_info(ter, postfix_gender(ter));
        res.decisive_postfix(ter);
        return;
    }
    if res.end.is_whitespace_after()
        || hiphen.is_whitespace_after()
        || next.chars() != res.begin.chars()
        || !res.is_single_token()
    {
        return;
    }
    let Some(res1) = attach_single(ctx, next, ParseAttrs::NO, None) else {
        return;
    };
    if !res1.is_single_token() {
        return;
    }
    merge_glued(res, res1);
}

fn merge_glued<'a>(res: &mut NameItem<'a>, res1: NameItem<'a>) {
    let strong = |p: &NamePart| p.has_std_postfix || p.is_in_dictionary || p.is_in_ontology;
    let joined = format!("{}-{}", res.value, res1.value);
    let end = res1.end;
    let res_last_strong = res.lastname.as_ref().is_some_and(strong);
    let res1_last_strong = res1.lastname.as_ref().is_some_and(strong);
    let first_known =
        res.firstname.as_ref().is_some_and(|f| f.is_in_dictionary || f.is_in_ontology);

    if res.lastname.is_some() && res1.lastname.is_some() && (res_last_strong || res1_last_strong) {
        if let (Some(l), Some(l1)) = (&mut res.lastname, &res1.lastname) {
            l.merge_hiphen(l1);
        }
        res.value = joined;
        res.firstname = None;
        res.middlename = None;
        res.end = end;
    } else if first_known {
        if let Some(f1) = &res1.firstname {
            res.value = joined;
            if let Some(f) = &mut res.firstname {
                f.merge_hiphen(f1);
            }
            res.lastname = None;
            res.middlename = None;
            res.end = end;
        } else if let Some(m1) = &res1.middlename {
            res.value = joined;
            res.end = end;
            if let Some(m) = &mut res.middlename {
                m.merge_hiphen(m1);
            }
            if let Some(f) = &mut res.firstname {
                f.merge_hiphen(m1);
            }
            if res.middlename.is_none() {
                res.middlename = res.firstname.clone();
            }
            if let Some(l) = &mut res.lastname {
                l.merge_hiphen(m1);
            }
        } else if let Some(l1) = res1
            .lastname
            .as_ref()
            .filter(|l| !l.is_in_dictionary && !l.is_in_ontology)
        {
            res.value = joined;
            if let Some(f) = &mut res.firstname {
                f.merge_hiphen(l1);
            }
            res.lastname = None;
            res.middlename = None;
            res.end = end;
        }
    } else if res.firstname.is_none()
        && res.middlename.is_none()
        && res.lastname.as_ref().is_some_and(|l| !l.is_in_ontology && !l.is_in_dictionary)
    {
        res.value = joined;
        res.end = end;
        let Some(mut last) = res.lastname.take() else {
            return;
        };
        if let Some(f1) = &res1.firstname {
            last.merge_hiphen(f1);
            res.firstname = Some(last);
        } else if let Some(m1) = &res1.middlename {
            last.merge_hiphen(m1);
            res.middlename = Some(last.clone());
            res.lastname = Some(last);
        } else if let Some(l1) = &res1.lastname {
            last.merge_hiphen(l1);
            res.lastname = Some(last);
        } else {
            for v in &mut last.vars {
                v.value = format!("{}-{}", v.value, res1.value);
            }
            res.lastname = Some(last);
        }
    } else if res.firstname.is_none() && res.lastname.is_none() && res.middlename.is_none() {
        if let Some(mut l1) = res1.lastname {
            l1.add_prefix(&format!("{}-", res.value));
            res.lastname = Some(l1);
            res.value = joined;
            res.end = end;
        }
    } else if res.firstname.is_none() && res.middlename.is_none() && res1.lastname.is_none() {
        if let Some(l) = &mut res.lastname {
            l.add_postfix(&res1.value, MorphGender::UNDEFINED);
        }
        res.value = joined;
        res.end = end;
    }
}

/// Postfixes written apart (МАМЕД ОГЛЫ, ХАСАН ПАША)
fn attach_spaced_postfixes(res: &mut NameItem<'_>) {
    while res.end.whitespaces_after() < 3 {
        let Some(next) = res.end.next().filter(|n| matches!(n.kind(), TokenKind::Word)) else {
            break;
        };
        let ter = next.term();
        if (matches!(ter, "АЛИ" | "ПАША") && !next.chars().is_all_lower) || !is_arab_postfix(ter) {
            break;
        }
        if next.next().is_some_and(|n| n.is_hiphen()) {
            break;
        }
        res.end = next;
        res.add_postfix_info(ter, postfix_gender(ter));
        res.decisive_postfix(ter);
    }
}

// ============================================================================
// Latin
// ============================================================================

fn latin_dictionary_part(
    t: TokenRef<'_>,
    value: &str,
    pred: impl Fn(MorphClass) -> bool,
) -> NamePart {
    let mut part = NamePart::with_term(value);
    for wf in t.morph().iter().filter(|wf| wf.in_dictionary && pred(wf.class)) {
        part.vars.push(NameVariant::from_form(value, wf));
    }
    if part.vars.is_empty() {
        part.vars.push(NameVariant::new(value));
    }
    part.is_in_dictionary = true;
    part
}

/// Latin-script item: names, initials, JR/SR suffixes, O'/D'/MC prefixes
pub fn attach_latin<'a>(t: TokenRef<'a>) -> Option<NameItem<'a>> {
    if !matches!(t.kind(), TokenKind::Word) || !t.chars().is_letter {
        return None;
    }
    let term = t.term();
    let chars = t.chars();
    if term == "THE" {
        return None;
    }
    let dot_end = |t: TokenRef<'a>| t.next().filter(|n| n.is_char('.')).unwrap_or(t);
    match term {
        "JR" | "JNR" | "JUNIOR" => {
            return Some(NameItem::new(ItemKind::Suffix, t, dot_end(t), "JUNIOR"));
        }
        "SR" | "SNR" | "SENIOR" | "FITZ" | "FILS" => {
            return Some(NameItem::new(ItemKind::Suffix, t, dot_end(t), "SENIOR"));
        }
        _ => {}
    }
    let mut initials = matches!(term, "YU" | "YA" | "CH" | "SH");
    if !initials && term.chars().count() == 2 && chars.is_capital_upper {
        initials = !term.chars().any(is_latin_vowel);
    }
    if initials {
        return Some(NameItem::new(ItemKind::Initial, t, dot_end(t), term));
    }
    if chars.is_all_lower && !LATIN_SUR_PREFIXES.contains(&term) {
        return None;
    }
    if chars.is_cyrillic_letter {
        return None;
    }
    if t.length_char() == 1 {
        let next = t.next()?;
        if next.is_char('.') {
            return Some(NameItem::new(ItemKind::Initial, t, next, term));
        }
        if !next.is_whitespace_after()
            && !t.is_whitespace_after()
            && matches!(term, "D" | "O" | "M")
            && is_bracket(next)
        {
            if let Some(mut pit0) = next
                .next()
                .filter(|n| n.chars().is_latin_letter)
                .and_then(attach_latin)
                .filter(|p| p.kind == ItemKind::Value)
            {
                pit0.begin = t;
                let mut prefix = term.to_string();
                if prefix == "M" && pit0.value.starts_with('C') {
                    prefix = "MA".to_string();
                }
                pit0.value = format!("{prefix}{}", pit0.value);
                if let Some(l) = &mut pit0.lastname {
                    l.add_prefix(&prefix);
                    l.is_in_dictionary = true;
                } else if let Some(mut f) = pit0.firstname.take() {
                    f.add_prefix(&prefix);
                    f.is_in_dictionary = true;
                    pit0.lastname = Some(f);
                }
                pit0.firstname = None;
                pit0.middlename = None;
                if !pit0.chars.is_all_upper && !pit0.chars.is_capital_upper {
                    pit0.chars.is_capital_upper = true;
                }
                return Some(pit0);
            }
        }
        if !first_char(term).is_some_and(is_latin_vowel) || t.whitespaces_after() != 1 {
            let nex = attach_latin(next)?;
            return (nex.kind == ItemKind::Value)
                .then(|| NameItem::new(ItemKind::Initial, t, t, term));
        }
        if term == "I" {
            return None;
        }
        return Some(NameItem::new(ItemKind::Value, t, t, term));
    }
    if !has_vowel(term) {
        return None;
    }
    if LATIN_SUR_PREFIXES.contains(&term) {
        let mut te = t.next();
        if let Some(h) = te.filter(|h| h.is_hiphen()) {
            te = h.next();
        }
        if let Some(mut res) = te.and_then(attach_latin) {
            res.value = format!("{term}-{}", res.value);
            res.begin = t;
            let mut last = NamePart::new();
            last.vars.push(NameVariant::new(res.value.clone()));
            last.has_hiphen = true;
            res.lastname = Some(last);
            return Some(res);
        }
    }
    let mut res = NameItem::new(ItemKind::Value, t, t, term);
    let cla = t.morph_class_in_dictionary();
    let gender = t.morph_info().gender;
    if cla.is_proper_name()
        || (cla.is_proper()
            && (gender == MorphGender::MASCULINE || gender == MorphGender::FEMININE))
    {
        let mut first = latin_dictionary_part(t, term, MorphClass::is_proper_name);
        first.vars.iter_mut().for_each(|v| v.value = term.to_string());
        res.firstname = Some(first);
    }
    if cla.is_proper_surname() {
        res.lastname = Some(latin_dictionary_part(t, term, MorphClass::is_proper_surname));
    }
    if !cla.is_proper_name()
        && !cla.is_proper()
        && !cla.is_proper_surname()
        && !cla.is_undefined()
    {
        res.is_in_dictionary = true;
    }
    res.morph = t.morph_info();
    if let Some(rest) = res.value.strip_prefix("MC") {
        res.value = format!("MAC{rest}");
    }
    if res.value.starts_with("MAC") {
        res.firstname = None;
        res.middlename = None;
        let mut last = NamePart::new();
        last.is_in_dictionary = true;
        last.vars.push(NameVariant::new(res.value.clone()));
        res.lastname = Some(last);
    }
    Some(res)
}

// ============================================================================
// Item list
// ============================================================================

fn can_start_list(t: TokenRef<'_>, attrs: ParseAttrs) -> bool {
    if (t.is_word() && t.chars().is_letter) || attrs.contains(ParseAttrs::CAN_INITIAL_BE_DIGIT) {
        return true;
    }
    if t.referent().is_some() {
        return true;
    }
    t.token().is_number_word() && !t.chars().is_all_lower
}

/// Swap an initial into the script of the neighbouring item when the two
/// scripts differ; false when they cannot be reconciled
fn reconcile_scripts(
    res: &mut [NameItem<'_>],
    anchor: &mut usize,
    pit1: &mut NameItem<'_>,
) -> bool {
    let next_idx = res.len();
    let pit = &mut res[*anchor];
    let to_latin = |ch: char| cyrillic_to_latin_char(ch);
    let to_cyr = |ch: char| latin_to_cyrillic_char(ch);
    if pit1.kind == ItemKind::Initial {
        type Translit = fn(char) -> Option<char>;
        let (fwd, back): (Translit, Translit) = if pit1.chars.is_cyrillic_letter {
            (to_latin, to_cyr)
        } else {
            (to_cyr, to_latin)
        };
        if let Some(v) = first_char(&pit1.value).and_then(fwd) {
            pit1.value = v.to_string();
            pit1.chars = initial_chars(!pit1.chars.is_cyrillic_letter);
            return true;
        }
        if pit.kind == ItemKind::Initial {
            if let Some(v) = first_char(&pit.value).and_then(back) {
                pit.value = v.to_string();
                pit.chars = initial_chars(pit1.chars.is_cyrillic_letter);
                *anchor = next_idx;
                return true;
            }
        }
        return false;
    }
    if pit.kind == ItemKind::Initial {
        let conv = if pit.chars.is_cyrillic_letter { to_latin } else { to_cyr };
        if let Some(v) = first_char(&pit.value).and_then(conv) {
            pit.value = v.to_string();
            pit.chars = initial_chars(!pit.chars.is_cyrillic_letter);
            return true;
        }
    }
    false
}

/// Collect the name items starting at `t`. `max_count` of 0 means no limit
/// besides the hard cap of 16 items
pub fn attach_list<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    attrs: ParseAttrs,
    max_count: usize,
) -> Option<Vec<NameItem<'a>>> {
    if !can_start_list(t, attrs) {
        return None;
    }
    let first = attach_single(ctx, t, attrs, None)?;
    let mut cur = first.end.next();
    let mut res = vec![first];
    split_glued_initial(&mut res, &mut cur);

    let mut zap = false;
    let mut anchor = 0;
    while let Some(t) = cur {
        if t.whitespaces_before() > 15 {
            break;
        }
        let mut tt = t;
        let mut hiphen = false;
        let mut comma = false;
        if tt.is_hiphen() {
            if let Some(n) = tt.next() {
                if !tt.is_whitespace_after() && !tt.is_whitespace_before() {
                    tt = n;
                    hiphen = true;
                } else if tt.previous().is_some_and(|p| p.chars() == n.chars())
                    && !tt.is_newline_after()
                {
                    tt = n;
                    hiphen = true;
                }
            }
        } else if tt.is_char(',') && tt.whitespaces_after() < 2 && res.len() == 1 {
            if let Some(n) = tt.next() {
                zap = true;
                comma = true;
                tt = n;
            }
        } else if tt.is_char('(') {
            match attach_alternative(ctx, &mut res, tt, attrs) {
                AltResult::NotAlt => {}
                AltResult::Consumed(Some(n)) => tt = n,
                AltResult::Consumed(None) => break,
            }
        }
        let Some(mut pit1) = attach_single(ctx, tt, attrs, Some(&res)) else {
            break;
        };
        if pit1.chars.is_cyrillic_letter != res[anchor].chars.is_cyrillic_letter
            && !reconcile_scripts(&mut res, &mut anchor, &mut pit1)
        {
            break;
        }
        let suffix_line = pit1.kind == ItemKind::Suffix && pit1.is_newline_before();
        if (pit1.kind == ItemKind::Value || suffix_line)
            && !attrs.contains(ParseAttrs::IGNORE_ATTRS)
            && stops_at_attribute(ctx, &pit1)
        {
            break;
        }
        if hiphen {
            pit1.is_hiphen_before = true;
            if let Some(last) = res.last_mut() {
                last.is_hiphen_after = true;
            }
        }
        pit1.is_comma_before = comma;
        cur = pit1.end.next();
        res.push(pit1);
        if res.len() > 15 || (max_count > 0 && res.len() >= max_count) {
            break;
        }
    }

    if res[0].is_asian_item(false)
        && res[0].value.chars().count() == 1
        && !attrs.contains(ParseAttrs::MUST_BE_ITEM_ALWAYS)
    {
        if res.len() < 2 || !res[1].is_asian_item(false) || res[1].value.chars().count() == 1 {
            return None;
        }
    }
    if zap && res.len() > 1 && !keep_after_comma(&res, attrs) {
        res.truncate(1);
    }
    absorb_name_lines(ctx, &mut res, max_count);
    normalize_items(&mut res);
    if res.len() > 1
        && res[0].is_in_dictionary
        && !attrs.intersects(ParseAttrs::MUST_BE_ITEM_ALWAYS | ParseAttrs::AFTER_ATTRIBUTE)
    {
        let mc = res[0].begin.morph_class_in_dictionary();
        if (mc.is_pronoun() || mc.is_personal_pronoun()) && !res[0].begin.is_value("ТОМ", None) {
            return None;
        }
    }
    merge_hiphen_values(&mut res);
    if res.len() == 1 && res[0].length_char() == 1 {
        return None;
    }
    if res.len() >= 4
        && res[0].kind == ItemKind::Initial
        && res[1].kind == ItemKind::Initial
        && res[0].value == "М"
        && res[1].value == "П"
        && res[2].kind != ItemKind::Initial
    {
        res.drain(..2);
    }
    trace!(items = res.len(), first = %res[0], "Name items");
    Some(res)
}

/// ИвановИ. typed without a space: the capital at the end is an initial
fn split_glued_initial<'a>(res: &mut Vec<NameItem<'a>>, cur: &mut Option<TokenRef<'a>>) {
    let Some(dot) = cur.filter(|c| c.is_char('.')) else {
        return;
    };
    let pit = &mut res[0];
    if pit.kind != ItemKind::Value || pit.length_char() <= 3 {
        return;
    }
    let src: Vec<char> = pit.source_text().chars().collect();
    let n = src.len();
    let shape = src[0].is_uppercase()
        && src[n - 1].is_uppercase()
        && src[1..n - 1].iter().all(|c| c.is_lowercase());
    if !shape {
        return;
    }
    pit.value.pop();
    pit.firstname = None;
    pit.middlename = None;
    pit.lastname = None;
    let initial =
        NameItem::new(ItemKind::Initial, dot, dot, src[n - 1].to_string()).with_chars(pit.chars);
    res.push(initial);
    *cur = dot.next();
}

enum AltResult<'a> {
    NotAlt,
    Consumed(Option<TokenRef<'a>>),
}

/// Alternative spelling in brackets: Юлия (Юля), Иванов (Иванова)
fn attach_alternative<'a>(
    ctx: &AnalysisContext<'a>,
    res: &mut [NameItem<'a>],
    open: TokenRef<'a>,
    attrs: ParseAttrs,
) -> AltResult<'a> {
    let Some(inner) = open.next().filter(|n| matches!(n.kind(), TokenKind::Word)) else {
        return AltResult::NotAlt;
    };
    if !open.previous().is_some_and(|p| p.chars() == inner.chars()) {
        return AltResult::NotAlt;
    }
    let Some(close) = inner.next().filter(|n| n.is_char(')')) else {
        return AltResult::NotAlt;
    };
    let res_len = res.len();
    let pit11 = attach_single(ctx, inner, attrs, None);
    let Some(pit0) = res.last_mut() else {
        return AltResult::NotAlt;
    };
    let alt_first = pit11.as_ref().and_then(|p| p.firstname.as_ref());
    if let (Some(f0), Some(f1)) = (&mut pit0.firstname, alt_first) {
        f0.vars.extend(f1.vars.iter().cloned());
        pit0.end = close;
        return AltResult::Consumed(close.next());
    }
    let strong_last = pit0.firstname.is_none()
        && pit0
            .lastname
            .as_ref()
            .is_some_and(|l| l.is_in_dictionary || l.has_std_tail || l.has_std_postfix);
    if !strong_last {
        return AltResult::NotAlt;
    }
    let Some(l1) = pit11.as_ref().and_then(|p| p.lastname.as_ref()) else {
        return AltResult::NotAlt;
    };
    let ok = l1.is_in_dictionary
        || l1.has_std_tail
        || l1.has_std_postfix
        || (res_len == 1
            && close
                .next()
                .and_then(|n| attach_single(ctx, n, attrs, None))
                .is_some_and(|p| p.firstname.is_some()));
    if !ok {
        return AltResult::NotAlt;
    }
    if let Some(l0) = &mut pit0.lastname {
        l0.vars.extend(l1.vars.iter().cloned());
    }
    pit0.end = close;
    AltResult::Consumed(close.next())
}

/// A position or title keyword ends the list (Иванов министр ...)
fn stops_at_attribute<'a>(ctx: &AnalysisContext<'a>, pit1: &NameItem<'a>) -> bool {
    let Some(pat) = attribute::try_attach(ctx, pit1.begin, AttachAttrs::NO) else {
        return false;
    };
    if pit1.is_newline_before() {
        return true;
    }
    if pit1.lastname.as_ref().is_some_and(|l| l.has_std_tail) {
        return false;
    }
    if !pit1.begin.morph_class_in_dictionary().is_noun() {
        return false;
    }
    if pit1.whitespaces_before() > 1 {
        return true;
    }
    !(pat.begin.chars().is_capital_upper && pat.begin == pat.end)
}

/// Items after a comma stay only when they complete the name
/// (Иванов, Иван Петрович / Смит, Джон)
fn keep_after_comma(res: &[NameItem<'_>], attrs: ParseAttrs) -> bool {
    if res[0].lastname.is_some() && res.len() == 3 {
        return (res[1].kind == ItemKind::Initial || res[1].firstname.is_some())
            && (res[2].kind == ItemKind::Initial || res[2].middlename.is_some());
    }
    if attrs.contains(ParseAttrs::CAN_INITIAL_BE_DIGIT)
        && res[0].kind == ItemKind::Value
        && res[1].kind == ItemKind::Initial
    {
        return res.len() == 2
            || (res.len() == 3 && (res[2].kind == ItemKind::Initial || res[2].is_in_dictionary));
    }
    res.len() == 2
        && res[0].lastname.as_ref().is_some_and(NamePart::is_strong)
        && res[1].firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
}

/// A surname alone on its line followed by the given names on the next
/// lines (forms and tables)
fn absorb_name_lines<'a>(ctx: &AnalysisContext<'a>, res: &mut Vec<NameItem<'a>>, max_count: usize) {
    if res.len() != 1 || !res[0].is_newline_before() || !res[0].is_newline_after() {
        return;
    }
    let strong = res[0]
        .lastname
        .as_ref()
        .is_some_and(|l| l.has_std_postfix || l.is_in_dictionary || l.has_std_tail);
    if !strong {
        return;
    }
    let Some(_guard) = ctx.enter() else {
        return;
    };
    let next_list = |t: TokenRef<'a>| attach_list(ctx, t, ParseAttrs::CAN_BE_LATIN, max_count);
    let Some(res1) = res[0].end.next().and_then(next_list) else {
        return;
    };
    if res1.len() == 2
        && (res1[0].firstname.is_some() || res1[1].middlename.is_some())
        && res1[1].is_newline_after()
    {
        res.extend(res1);
    } else if res1.len() == 1 && res1[0].is_newline_after() {
        let res2 = res1[0]
            .end
            .next()
            .and_then(|n| attach_list(ctx, n, ParseAttrs::CAN_BE_LATIN, max_count));
        if let Some(res2) = res2 {
            if res2.len() == 1
                && res2[0].is_newline_after()
                && (res1[0].firstname.is_some() || res2[0].middlename.is_some())
            {
                res.extend(res1);
                res.extend(res2);
            }
        }
    }
}

/// СВЕТА next to a surname is СВЕТЛАНА; a suffix item folds into the value
/// before it
fn normalize_items(res: &mut Vec<NameItem<'_>>) {
    let mut i = 0;
    while i < res.len() {
        if res[i].firstname.is_some() && res[i].begin.is_value("СВЕТА", None) {
            let near_surname = (i > 0 && res[i - 1].lastname.is_some())
                || (i + 1 < res.len()
                    && (res[i + 1].lastname.is_some() || res[i + 1].middlename.is_some()));
            if near_surname {
                if let Some(v) = res[i].firstname.as_mut().and_then(|f| f.vars.first_mut()) {
                    v.value = "СВЕТЛАНА".to_string();
                }
            }
        } else if res[i].kind == ItemKind::Value
            && i + 1 < res.len()
            && res[i + 1].kind == ItemKind::Suffix
        {
            let suffix = res.remove(i + 1);
            res[i].add_postfix_info(&suffix.value, MorphGender::UNDEFINED);
            res[i].end = suffix.end;
        }
        i += 1;
    }
}

/// Two hyphenated values between initials form one value (И. Петров-Водкин)
fn merge_hiphen_values(res: &mut Vec<NameItem<'_>>) {
    for i in 0..res.len().saturating_sub(1) {
        if res[i].kind != ItemKind::Value || res[i + 1].kind != ItemKind::Value {
            continue;
        }
        if !res[i].end.next().is_some_and(|n| n.is_hiphen()) {
            continue;
        }
        let ok = (i > 0 && res[i - 1].kind == ItemKind::Initial && i + 2 == res.len())
            || (i == 0 && i + 2 < res.len() && res[i + 2].kind == ItemKind::Initial);
        if !ok {
            continue;
        }
        let second = res.remove(i + 1);
        let item = &mut res[i];
        item.end = second.end;
        item.value = format!("{}-{}", item.value, second.value);
        item.firstname = None;
        item.lastname = None;
        item.middlename = None;
        item.is_in_dictionary = false;
        break;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminology::Terminology;
    use persona_core::{AnalysisConfig, Document, Lexicon, Morphology, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    fn items(text: &str, attrs: ParseAttrs) -> Option<Vec<(ItemKind, String)>> {
        let d = doc(text);
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let items = attach_list(&ctx, d.first()?, attrs, 10)?;
        Some(items.into_iter().map(|i| (i.kind, i.value)).collect())
    }

    #[test]
    fn test_common_noun_rejected() {
        assert!(items("город", ParseAttrs::NO).is_none());
    }

    #[test]
    fn test_surname_with_initials() {
        let d = doc("Иванов И. П.");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        assert_eq!(res.len(), 3);
        assert_eq!(res[0].kind, ItemKind::Value);
        assert!(res[0].lastname.as_ref().unwrap().contains_value("ИВАНОВ"));
        assert_eq!(res[1].kind, ItemKind::Initial);
        assert_eq!(res[1].value, "И");
        assert_eq!(res[2].kind, ItemKind::Initial);
        assert_eq!(res[2].value, "П");
    }

    #[test]
    fn test_comma_between_surname_and_name() {
        let d = doc("Смит , Джон");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        assert_eq!(res.len(), 2);
        assert!(res[1].is_comma_before);
        assert!(res[1].firstname.is_some());
    }

    #[test]
    fn test_segmentation_is_idempotent() {
        let first = items("Петров Пётр Петрович", ParseAttrs::NO);
        let second = items("Петров Пётр Петрович", ParseAttrs::NO);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_turkic_postfix() {
        let d = doc("Гейдар Алиев-оглы");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        let last = res.last().unwrap();
        assert_eq!(last.value, "АЛИЕВ-ОГЛЫ");
        assert!(last.middlename.is_some());
        assert!(last.lastname.is_none());
    }

    #[test]
    fn test_digit_initial() {
        let d = doc("Петров 1. А.");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let t = d.at(1).unwrap();
        let item = attach_single(&ctx, t, ParseAttrs::CAN_INITIAL_BE_DIGIT, None).unwrap();
        assert_eq!(item.kind, ItemKind::Initial);
        assert_eq!(item.value, "І");
        assert!(attach_single(&ctx, t, ParseAttrs::NO, None).is_none());
    }

    #[test]
    fn test_spaced_letters() {
        let res = items("И в а н о в И.", ParseAttrs::NO).unwrap();
        assert_eq!(res[0], (ItemKind::Value, "ИВАНОВ".to_string()));
        assert_eq!(res[1].0, ItemKind::Initial);
    }

    #[test]
    fn test_short_name_expanded() {
        let d = doc("Саша Петров");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        let first = res[0].firstname.as_ref().unwrap();
        assert!(first.contains_value("АЛЕКСАНДР"));
        assert!(first.vars.iter().any(|v| v.short_value.as_deref() == Some("САША")));

        let full = Lexicon::shared().unwrap().short_names("СВЕТА");
        assert_eq!(full, vec![("СВЕТЛАНА".to_string(), MorphGender::FEMININE)]);
        let d = doc("Света Петрова");
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        let first = res[0].firstname.as_ref().unwrap();
        assert!(first.contains_value("СВЕТЛАНА"));
        assert!(first.vars.iter().all(|v| v.gender != MorphGender::MASCULINE));
    }

    #[test]
    fn test_latin_items() {
        let d = doc("John Smith Jr.");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let res = attach_list(&ctx, d.first().unwrap(), ParseAttrs::CAN_BE_LATIN, 10).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[1].value, "SMITH-JUNIOR");
        assert!(attach_latin(d.at(3).unwrap()).is_none());
    }

    #[test]
    fn test_parse_attrs() {
        let attrs = ParseAttrs::CAN_BE_LATIN | ParseAttrs::CAN_BE_LOWER;
        assert!(attrs.contains(ParseAttrs::CAN_BE_LATIN));
        assert!(!attrs.contains(ParseAttrs::IGNORE_ATTRS));
        assert!(attrs.intersects(ParseAttrs::CAN_BE_LOWER | ParseAttrs::ALT_VAR));
        // the empty set is never "contained", so flag checks on NO stay false
        assert!(!attrs.contains(ParseAttrs::NO));
        assert_eq!((attrs | ParseAttrs::NO).bits(), attrs.bits());
    }

    #[test]
    fn test_asian_item() {
        let d = doc("Ли Пэн");
        let t = d.first().unwrap();
        let item = NameItem::new(ItemKind::Value, t, t, "ЛИ");
        assert!(item.is_asian_item(false));
        // one vowel group, a Chinese syllable
        let syllable = NameItem::new(ItemKind::Value, t, t, "ЛИАНЬ");
        assert!(syllable.is_asian_item(false));
        let russian = NameItem::new(ItemKind::Value, t, t, "ПЕТРОВ");
        assert!(!russian.is_asian_item(false));
    }
}
