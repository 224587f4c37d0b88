//! Person analyzer
//!
//! Drives recognition over a whole document. Every token is tried as the
//! start of a person mention: attributes before the name are collected,
//! the name run is segmented and resolved, and the winning reading is
//! assembled into a [`PersonReferent`]. A second pass retries the tokens
//! the first one marked, now with the persons of the whole document known.
//! Standalone positions become properties in a final pass.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace};

use persona_core::text::{is_bracket, try_parse_bracket};
use persona_core::{
    AnalysisConfig, Document, Lexicon, MorphCase, MorphClass, MorphGender, MorphInfo, MorphNumber,
    ReferentSpan, Result, TokenRef, Tokenizer,
};

use crate::assembler::{self, PersonMatch};
use crate::attribute::{self, is_verb_be, AttachAttrs, AttributeToken};
use crate::context::AnalysisContext;
use crate::identity::{self, PersonIdentityReferent};
use crate::morph_collection::MorphVariantCollection;
use crate::person::{PersonId, PersonReferent};
use crate::property::{EqualityMode, PersonProperty, PropertyKind, PropertyRef};
use crate::resolver;
use crate::segmenter::{self, NameItem, ParseAttrs};
use crate::templates::{FioTemplate, NameCandidate};
use crate::terminology::{AttrKind, Terminology};
use crate::{EntityExtractor, ExtractedEntity};

/// More attributes in a row than this are a list of positions, not a
/// person mention
const MAX_ATTRS: usize = 5;

// ============================================================================
// Attachment results
// ============================================================================

/// Outcome of one attachment attempt at a token
#[derive(Debug)]
enum Attached<'a> {
    Person(PersonMatch<'a>),
    /// The attribute alone denotes a person (его отец)
    Property(AttributeToken<'a>),
    /// Consumed without a result
    Skip(TokenRef<'a>),
}

#[derive(Debug, Clone, Copy, Default)]
struct Mode {
    step: u8,
    for_attribute: bool,
    /// Names of a reference list: nominative, Latin allowed, weak readings
    /// accepted
    for_ext: bool,
}

/// Recognise a person starting at `t`.
///
/// Called by the attribute matcher for persons inside attributes
/// ("помощник Иванова") with `for_attribute` set; nothing after the name is
/// consumed then.
pub(crate) fn try_attach_person<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    step: u8,
    for_attribute: bool,
) -> Option<PersonMatch<'a>> {
    let mode = Mode {
        step,
        for_attribute,
        for_ext: false,
    };
    match attach(ctx, t, mode)? {
        Attached::Person(m) => Some(m),
        _ => None,
    }
}

fn attach<'a>(ctx: &AnalysisContext<'a>, t: TokenRef<'a>, mode: Mode) -> Option<Attached<'a>> {
    let _guard = ctx.enter()?;
    attach_int(ctx, t, mode)
}

fn both_genders() -> MorphGender {
    MorphGender::MASCULINE | MorphGender::FEMININE
}

/// Surname of `sur` in the form for `gender` (ИВАНОВ → ИВАНОВА)
fn inflect_surname(ctx: &AnalysisContext<'_>, sur: &str, gender: MorphGender) -> Option<String> {
    ctx.morphology().inflect(
        sur,
        MorphClass::PROPER_SURNAME,
        gender,
        MorphCase::NOMINATIVE,
        MorphNumber::SINGULAR,
    )
}

/// A first name sharing the surname of `relative`
fn person_with_shared_surname(
    ctx: &AnalysisContext<'_>,
    relative: &PersonReferent,
    firstname: &str,
    gender: MorphGender,
) -> Option<PersonReferent> {
    let mut pers = PersonReferent::new();
    for sur in &relative.lastnames {
        if gender == MorphGender::MASCULINE || gender == MorphGender::FEMININE {
            if let Some(sur0) = inflect_surname(ctx, sur, gender) {
                if !pers.lastnames.contains(&sur0) {
                    pers.lastnames.push(sur0);
                }
            }
        }
        if !pers.lastnames.contains(sur) {
            pers.lastnames.push(sur.clone());
        }
    }
    if pers.lastnames.is_empty() {
        return None;
    }
    pers.firstnames.push(firstname.to_string());
    pers.set_gender(gender);
    Some(pers)
}

fn first_person_ref(attr: &AttributeToken<'_>) -> Option<PersonId> {
    attr.property.as_ref()?.refs.iter().find_map(|r| match r {
        PropertyRef::Person(id) => Some(*id),
        _ => None,
    })
}

fn geo_refs_conflict(a: &AttributeToken<'_>, b: &AttributeToken<'_>) -> bool {
    let geo = |x: &AttributeToken<'_>| {
        x.property
            .as_ref()
            .and_then(|p| {
                p.external_refs()
                    .find(|r| r.kind == persona_core::ReferentKind::Geo)
                    .cloned()
            })
    };
    match (geo(a), geo(b)) {
        (Some(g1), Some(g2)) => g1.value != g2.value,
        _ => false,
    }
}

fn append_to_deepest(p: &mut PersonProperty, text: &str, clear_refs: bool) {
    match p.higher_mut() {
        Some(h) => append_to_deepest(h, text, clear_refs),
        None => {
            if !p.name.ends_with(text) {
                p.name = format!("{} {}", p.name, text);
            }
            if clear_refs {
                p.refs.clear();
            }
        }
    }
}

fn single_property<'a>(attrs: &[AttributeToken<'a>]) -> Option<Attached<'a>> {
    let attr = attrs.last()?;
    (attr.can_be_single_person && attr.property.is_some()).then(|| Attached::Property(attr.clone()))
}

#[allow(clippy::too_many_arguments)]
fn create<'a>(
    ctx: &AnalysisContext<'a>,
    p: PersonReferent,
    begin: TokenRef<'a>,
    end: TokenRef<'a>,
    morph: MorphInfo,
    attrs: &[AttributeToken<'a>],
    mode: Mode,
    after_be: bool,
) -> Option<Attached<'a>> {
    assembler::create_referent_token(ctx, p, begin, end, morph, attrs, mode.for_attribute, after_be)
        .map(Attached::Person)
}

/// Referent of a reading resolved to a known person
fn onto_referent<'a>(ctx: &AnalysisContext<'a>, c: &NameCandidate<'a>) -> Option<PersonReferent> {
    c.referent.clone().or_else(|| c.onto_person.and_then(|id| ctx.person(id)))
}

// ============================================================================
// Attribute loop
// ============================================================================

struct Prelude<'a> {
    attrs: Vec<AttributeToken<'a>>,
    mi: MorphInfo,
    t: Option<TokenRef<'a>>,
    is_genitive: bool,
    is_king: bool,
    after_be: bool,
}

enum PreludeResult<'a> {
    Continue(Prelude<'a>),
    Done(Option<Attached<'a>>),
}

/// Attributes before the name ("министр финансов", "господин", "на имя")
fn collect_attributes<'a>(
    ctx: &AnalysisContext<'a>,
    t0: TokenRef<'a>,
    mode: Mode,
) -> PreludeResult<'a> {
    let mut mi = MorphInfo::new();
    mi.case = if mode.for_ext || ctx.config.nominative_case_always {
        MorphCase::NOMINATIVE
    } else {
        MorphCase::ALL_CASES
    };
    mi.gender = both_genders();
    let mut attrs: Vec<AttributeToken<'a>> = Vec::new();
    let mut and = false;
    let mut and_terminated = false;
    let mut is_genitive = false;
    let mut is_king = false;
    let mut after_be = false;

    let mut cur = Some(t0);
    while let Some(mut t) = cur {
        if !attrs.is_empty() && t.next().is_some() {
            if and {
                break;
            }
            if t.is_char(',') {
                cur = t.next();
            } else if t.is_and() && t.is_whitespace_after() && t.chars().is_all_lower {
                cur = t.next();
                and = true;
            } else if t.is_hiphen() && t.is_newline_after() {
                cur = t.next();
                and = true;
            } else if t.is_hiphen() && t.whitespaces_after() == 1 && t.whitespaces_before() == 1 {
                cur = t.next();
                and = true;
            } else if t.is_char(':') {
                let last_case = attrs[attrs.len() - 1].morph.case;
                if last_case.is_nominative() || last_case.is_undefined() {
                    mi.case = MorphCase::NOMINATIVE;
                    mi.gender = both_genders();
                }
                cur = t.next();
            } else if t.is_char('_') {
                let mut cou = 0;
                let mut te = Some(t);
                while let Some(x) = te {
                    if !x.is_char('_') || (x.is_whitespace_before() && x != t) {
                        break;
                    }
                    cou += 1;
                    te = x.next();
                }
                if cou > 2
                    && (!t.is_newline_before() || te.is_some_and(|x| !x.is_newline_before()))
                {
                    mi.case = MorphCase::NOMINATIVE;
                    mi.gender = both_genders();
                    cur = te;
                    if let Some(x) = te.filter(|x| x.is_char('/')) {
                        cur = x.next();
                    }
                    break;
                }
            } else if t.is_value("ЯВЛЯТЬСЯ", None)
                || t.is_value("БЫТЬ", None)
                || t.is_value("Є", None)
                || t.is_term_of(&["IS"])
            {
                mi.case = MorphCase::NOMINATIVE;
                mi.gender = both_genders();
                after_be = true;
                cur = t.next();
                continue;
            } else if t.is_term_of(&["LIKE", "AS"]) {
                cur = t.next();
                break;
            }
            match cur {
                Some(x) => t = x,
                None => break,
            }
        }

        let mut a = if mode.step < 1 || ctx.is_marked(t.idx()) {
            attribute::try_attach(ctx, t, AttachAttrs::NO)
        } else {
            None
        };
        if mode.step == 0 && a.is_some() {
            ctx.mark_token(t.idx());
        }
        // a capitalised one-word attribute heading a table of names
        let heading = a.as_ref().is_some_and(|a| {
            a.begin == a.end && !a.begin.chars().is_all_lower && a.whitespaces_after() < 3
        });
        if heading {
            if let Some(pits) = segmenter::attach_list(ctx, t, ParseAttrs::IGNORE_ATTRS, 10) {
                if pits.len() >= 6 && pits[2].is_newline_after() && pits[5].is_newline_after() {
                    a = None;
                }
            }
        }
        if a.is_some()
            && !t.chars().is_all_lower
            && attrs.first().is_some_and(|f| f.kind == AttrKind::Prefix)
        {
            if let Some(pits) = segmenter::attach_list(ctx, t, ParseAttrs::IGNORE_ATTRS, 10) {
                if pits.len() >= 2 && pits[0].lastname.is_some() {
                    a = None;
                }
            }
        }
        if a.is_none() && t.is_value("НА", None) {
            if let Some(n) = t.next().filter(|n| n.is_value("ИМЯ", None)) {
                let mut na = AttributeToken::new(AttrKind::Other, t, n);
                na.morph.case = MorphCase::GENITIVE;
                a = Some(na);
                is_genitive = true;
            }
        }
        let Some(a) = a else {
            cur = Some(t);
            break;
        };
        if after_be {
            return PreludeResult::Done(None);
        }
        if a.end.next().is_some_and(|n| n.newlines_before() > 3) {
            cur = Some(t);
            break;
        }
        if !t.chars().is_all_lower && a.begin == a.end {
            if let Some(pit) = segmenter::attach_single(ctx, t, ParseAttrs::CAN_BE_LATIN, None) {
                if pit.lastname.as_ref().is_some_and(|l| l.is_in_ontology || l.is_in_dictionary) {
                    cur = Some(t);
                    break;
                }
            }
        }
        ctx.mark_property_begin(a.begin.idx());
        if attrs.is_empty() {
            if a.is_doubtful && a.end.is_newline_after() {
                cur = Some(t);
                break;
            }
        } else {
            if !a.morph.case.is_undefined()
                && !mi.case.is_undefined()
                && (a.morph.case & mi.case).is_undefined()
            {
                return PreludeResult::Done(None);
            }
            if t.previous().is_some_and(|p| p.is_and())
                && attrs.len() == 1
                && geo_refs_conflict(&attrs[0], &a)
            {
                return PreludeResult::Done(None);
            }
        }
        if a.kind == AttrKind::King {
            is_king = true;
        }
        if a.kind == AttrKind::BestRegards {
            mi.case = MorphCase::NOMINATIVE;
        }
        if and {
            and_terminated = true;
        }
        if !a.gender.is_undefined()
            && (a.kind != AttrKind::Position || a.gender == MorphGender::FEMININE)
        {
            mi.gender &= a.gender;
        }
        if !a.morph.case.is_undefined() && a.can_precede_person == 0 {
            mi.case &= a.morph.case;
        }
        let end = a.end;
        attrs.push(a);
        if attrs.len() > MAX_ATTRS {
            return PreludeResult::Done(Some(Attached::Skip(end)));
        }
        cur = end.next();
    }

    if !attrs.is_empty() && and && !and_terminated {
        let ok = cur.is_some_and(|t| {
            t.previous().is_some_and(|p| p.is_hiphen()) && t.whitespaces_before() < 2
        });
        if !ok {
            return PreludeResult::Done(None);
        }
    }
    PreludeResult::Continue(Prelude {
        attrs,
        mi,
        t: cur,
        is_genitive,
        is_king,
        after_be,
    })
}

// ============================================================================
// Person attachment
// ============================================================================

fn attach_int<'a>(ctx: &AnalysisContext<'a>, t0: TokenRef<'a>, mode: Mode) -> Option<Attached<'a>> {
    let Prelude {
        mut attrs,
        mut mi,
        mut t,
        is_genitive,
        is_king,
        after_be,
    } = match collect_attributes(ctx, t0, mode) {
        PreludeResult::Continue(p) => p,
        PreludeResult::Done(res) => return res,
    };

    if !attrs.is_empty() {
        if let Some(x) = t.filter(|x| is_bracket(*x) && !x.is_char('(')) {
            t = x.next();
        }
        while let Some(x) = t.filter(|x| x.is_table_control_char()) {
            t = x.next();
        }
    }
    while let Some(x) = t.filter(|x| x.is_char('_')) {
        t = x.next();
    }
    let Some(mut t) = t else {
        return single_property(&attrs);
    };

    if !attrs.is_empty() && t.is_char('(') {
        let inner = t.next().and_then(|n| try_attach_person(ctx, n, mode.step, mode.for_attribute));
        if let Some(pr) = inner {
            if let Some(close) = pr.end.next().filter(|c| c.is_char(')')) {
                let morph = attrs[0].morph;
                let mode = Mode {
                    for_attribute: true,
                    ..mode
                };
                return create(ctx, pr.referent, t, close, morph, &attrs, mode, after_be);
            }
        }
        if let Some(attr) = t.next().and_then(|n| attribute::try_attach(ctx, n, AttachAttrs::NO)) {
            if let Some(close) = attr.end.next().filter(|c| c.is_char(')')) {
                attrs.push(attr);
                let mut next = close.next();
                while let Some(x) =
                    next.filter(|x| x.is_table_control_char() || x.is_char_of("_:"))
                {
                    next = x.next();
                }
                t = next?;
            }
        }
    }
    if !attrs.is_empty() && t.is_char('(') {
        if let Some(close) = try_parse_bracket(t) {
            if close.end_char() - t.begin_char() < 200 {
                t = close.next()?;
            }
        }
    }

    if t.previous().is_some_and(|p| p.is_char(',')) {
        if let Some(a0) = attrs.first() {
            if a0.kind != AttrKind::BestRegards && !a0.chars().is_latin_letter {
                let after_person_word =
                    a0.begin.previous().is_some_and(|p| p.is_value("ЛИЦО", Some("ОСОБА")));
                if !a0.is_newline_before() && !after_person_word {
                    return None;
                }
            }
        }
    }
    if !attrs.is_empty() && t.is_char_of("/\\") {
        t = t.next()?;
    }

    for k in 0..2 {
        let mut pattr = ParseAttrs::NO;
        let mut pits: Option<Vec<NameItem<'a>>> = None;
        if mode.step < 1 || ctx.is_marked(t.idx()) {
            if k == 0 {
                pattr = pattr | ParseAttrs::ALT_VAR;
            }
            if mode.for_ext || t.chars().is_latin_letter {
                pattr = pattr | ParseAttrs::CAN_BE_LATIN;
            }
            if !attrs.is_empty() {
                pattr = pattr | ParseAttrs::AFTER_ATTRIBUTE;
            }
            pits = segmenter::attach_list(ctx, t, pattr, 15);
            if pits.is_some() && mode.step == 0 {
                ctx.mark_token(t.idx());
            }
            if is_genitive {
                for p in pits.iter_mut().flatten() {
                    p.remove_not_genitive();
                }
            }
        }
        let Some(mut pits) = pits.filter(|p| !p.is_empty()) else {
            continue;
        };

        if mode.step == 0 && pits.len() == 1 && pits[0].end == t {
            if let Some(last) = attrs.last() {
                if Some(last.end) == t.previous() {
                    ctx.stats_mut().mark_before_person_attr(t);
                    ctx.request_second_step();
                }
            }
        }
        if mi.case == MorphCase::ALL_CASES
            && t0.whitespaces_before() > 4
            && pits[pits.len() - 1].whitespaces_after() > 4
        {
            mi.case = MorphCase::NOMINATIVE;
        }

        if pits.len() == 1 && pits[0].firstname.is_some() {
            if let Some(res) = shared_surname_reading(ctx, &pits[0], &attrs, mode, after_be) {
                return res;
            }
        }
        if pits.len() == 1 && pits[0].lastname.is_some() {
            let plural = t.morph_info().number == MorphNumber::PLURAL
                || t.previous()
                    .is_some_and(|p| p.is_value("БРАТ", None) || p.is_value("СЕСТРА", None));
            if plural {
                let mut t1 = pits[0].end.next();
                if let Some(x) = t1.filter(|x| x.is_char(':') || x.is_hiphen()) {
                    t1 = x.next();
                }
                if let Some(pits1) = t1.and_then(|x| segmenter::attach_list(ctx, x, pattr, 10)) {
                    if pits1.len() == 1 || (pits1.len() == 2 && pits1[1].middlename.is_some()) {
                        pits.extend(pits1);
                    }
                }
            }
        }
        if mi.case.is_undefined()
            && pits[0].is_newline_before()
            && pits[pits.len() - 1].end.is_newline_after()
        {
            mi.case = MorphCase::NOMINATIVE;
        }

        if let Some(res) = try_known_persons(ctx, &pits, &attrs, &mi, mode, after_be) {
            return res;
        }

        let after_attr = !attrs.is_empty();
        let mut pli0 = resolver::try_attach(ctx, &pits, 0, &mi, Some(t0), is_king, after_attr);
        if pli0.first().is_some_and(|p| p.template == FioTemplate::NameSurname) && pits.len() > 1 {
            let single_word = attrs
                .last()
                .filter(|a| a.begin == a.end && a.begin.chars().is_capital_upper);
            if let Some(last) = single_word {
                if !(pits[1].lastname.is_some() && pits[1].middlename.is_none()) {
                    if let Some(pits1) = segmenter::attach_list(ctx, last.begin, pattr, 10) {
                        if pits1.first().is_some_and(|p| p.lastname.is_some()) {
                            let after = attrs.len() > 1;
                            let pli11 =
                                resolver::try_attach(ctx, &pits1, 0, &mi, Some(t0), is_king, after);
                            if pli11.first().is_some_and(|p| p.coef > 1.0 && p.end == pli0[0].end) {
                                pli0 = pli11;
                                attrs.pop();
                            }
                        }
                    }
                }
            }
        }
        if t.previous().is_none()
            && ctx.config.text_starts_with_lastname_firstname_middlename
            && pits.len() == 3
        {
            let mut exists = false;
            for pit in pli0.iter_mut().filter(|p| p.template == FioTemplate::SurnameNameSecname) {
                pit.adjust("text_starts_with_surname", 10.0);
                exists = true;
            }
            if !exists {
                let sns = FioTemplate::SurnameNameSecname;
                if let Some(mut pit) = resolver::create_template(ctx, &pits, sns, &mi) {
                    pit.set_coef("text_starts_with_surname", 10.0);
                    pli0.push(pit);
                }
            }
        }
        if mode.for_ext {
            sort_candidates(&mut pli0);
            if pli0.first().map_or(true, |p| p.coef < 2.0) {
                pli0 = resolver::try_attach_onto_ext(&pits).into_iter().collect();
            }
            let et = pits[pits.len() - 1].end;
            for pit in pli0.iter_mut().filter(|p| p.end == et) {
                pit.adjust("reference_list_whole", 1.0);
            }
        }

        let mut pli = pli0;
        let last_is_position = attrs.last().map_or(true, |a| a.kind == AttrKind::Position);
        if !mode.for_ext && last_is_position {
            let four_names = pits.len() == 4
                && pits[0].firstname.is_some()
                && pits[1].firstname.is_none()
                && pits[2].firstname.is_some()
                && pits[3].firstname.is_none();
            let arabic = pli.first().is_some_and(|p| p.template == FioTemplate::Arabic);
            if !four_names && !arabic {
                let mut pli1 =
                    resolver::try_attach(ctx, &pits, 1, &mi, Some(t0), is_king, after_attr);
                if !pli.is_empty() && !pli1.is_empty() {
                    resolver::correct_xfml(ctx, &pli, &mut pli1, after_attr);
                }
                pli.extend(pli1);
            }
        }

        if pli.is_empty() && pits.len() == 1 && pits[0].firstname.is_some() {
            if is_king {
                let mut first = NameCandidate::new(FioTemplate::King, pits[0].begin, pits[0].end);
                resolver::manage_firstname(&mut first, &pits[0], &mi);
                first.set_coef("king_first_name", 2.0);
                if first.morph.gender.is_undefined() {
                    if let Some(f) = &first.firstname {
                        first.morph.gender = f.gender();
                    }
                }
                pli.push(first);
            } else {
                for a in attrs.iter().filter(|a| a.can_be_same_surname) {
                    let Some(pr0) = first_person_ref(a).and_then(|id| ctx.person(id)) else {
                        continue;
                    };
                    let mut first =
                        NameCandidate::new(FioTemplate::NameSurname, pits[0].begin, pits[0].end);
                    resolver::manage_firstname(&mut first, &pits[0], &mi);
                    first.set_coef("relative_surname", 2.0);
                    let mut col = MorphVariantCollection::new();
                    for v in &pr0.lastnames {
                        col.add(v, None, pr0.gender(), Some(ctx.morphology()));
                    }
                    first.lastname = Some(col);
                    pli.push(first);
                }
            }
        }
        if pli.is_empty()
            && pits.len() == 1
            && pits[0].lastname.is_some()
            && !pits[0].is_in_dictionary
        {
            for a in &attrs {
                let boss = a.property.as_ref().map_or(false, |p| p.kind == PropertyKind::Boss);
                if a.kind == AttrKind::Prefix || boss {
                    if !pits[0].begin.morph_class_in_dictionary().is_proper() {
                        break;
                    }
                    let mut last =
                        NameCandidate::new(FioTemplate::Undefined, pits[0].begin, pits[0].end);
                    resolver::manage_lastname(&mut last, &pits[0], &mi);
                    last.set_coef("surname_after_title", 2.0);
                    pli.push(last);
                    break;
                }
            }
        }
        if pli.is_empty() {
            continue;
        }
        sort_candidates(&mut pli);
        if let Some(res) = accept(ctx, &pits, pli, &mut attrs, &mi, mode, after_be) {
            return res;
        }
    }
    single_property(&attrs)
}

fn sort_candidates(pli: &mut [NameCandidate<'_>]) {
    pli.sort_by(|a, b| b.coef.partial_cmp(&a.coef).unwrap_or(std::cmp::Ordering::Equal));
}

/// "Иван и [Петров]" or the relative of an attribute ("его брат Иван")
fn shared_surname_reading<'a>(
    ctx: &AnalysisContext<'a>,
    pit: &NameItem<'a>,
    attrs: &[AttributeToken<'a>],
    mode: Mode,
    after_be: bool,
) -> Option<Option<Attached<'a>>> {
    let first = pit.firstname.as_ref()?;
    if let Some(n) = pit.end.next().filter(|n| n.is_and()) {
        if let Some(id) = n.next().and_then(|x| ctx.person_at(x.idx())) {
            let Some(v) = first.vars.first() else {
                return Some(None);
            };
            let relative = ctx.person(id)?;
            let pers = person_with_shared_surname(ctx, &relative, &v.value, v.gender);
            let morph = first.morph();
            return Some(
                pers.and_then(|p| create(ctx, p, pit.begin, pit.end, morph, attrs, mode, after_be)),
            );
        }
    }
    let attr = attrs.last()?;
    let kin = attr.property.as_ref().is_some_and(|p| p.kind == PropertyKind::Kin);
    if !kin || attr.gender.is_undefined() {
        return None;
    }
    let relative = first_person_ref(attr).and_then(|id| ctx.person(id))?;
    let v = first.vars.first()?;
    let pers = person_with_shared_surname(ctx, &relative, &v.value, attr.gender)?;
    Some(create(ctx, pers, pit.begin, pit.end, first.morph(), attrs, mode, after_be))
}

/// Resolution against the persons already known in the document
fn try_known_persons<'a>(
    ctx: &AnalysisContext<'a>,
    pits: &[NameItem<'a>],
    attrs: &[AttributeToken<'a>],
    mi: &MorphInfo,
    mode: Mode,
    after_be: bool,
) -> Option<Option<Attached<'a>>> {
    let after_attr = !attrs.is_empty();
    if mode.for_attribute && pits.len() > 1 {
        let mut found = None;
        for i in 0..pits.len() {
            if let Some(pit) = resolver::try_attach_onto_int(ctx, &pits[..=i], 0, mi, after_attr) {
                found = Some(pit);
            }
        }
        if let Some(pit) = found {
            let p = onto_referent(ctx, &pit)?;
            return Some(create(ctx, p, pit.begin, pit.end, pit.morph, attrs, mode, after_be));
        }
    }
    for i in 0..pits.len().min(3) {
        if let Some(pit) = resolver::try_attach_onto_int(ctx, pits, i, mi, after_attr) {
            let p = onto_referent(ctx, &pit)?;
            let own_attrs: &[AttributeToken<'a>] =
                if pit.begin == pits[0].begin { attrs } else { &[] };
            return Some(create(ctx, p, pit.begin, pit.end, pit.morph, own_attrs, mode, after_be));
        }
    }
    if pits.len() == 1 && !mode.for_ext && attrs.is_empty() {
        let p0 = &pits[0];
        let known = resolver::try_attach_onto_for_single(ctx, p0).and_then(|id| ctx.person(id));
        if let Some(p) = known {
            return Some(create(ctx, p, p0.begin, p0.end, p0.morph, attrs, mode, after_be));
        }
    }
    if pits.len() == 1
        && !mode.for_ext
        && pits[0].chars.is_latin_letter
        && attrs.first().is_some_and(|a| a.chars().is_latin_letter)
    {
        let p0 = &pits[0];
        if let Some(p) = resolver::try_attach_latin_surname(p0) {
            return Some(create(ctx, p, p0.begin, p0.end, p0.morph, attrs, mode, after_be));
        }
    }
    if pits.len() == 2 && !mode.for_ext {
        let (p0, p1) = (&pits[0], &pits[1]);
        let known = resolver::try_attach_onto_for_duble(ctx, p0, p1).and_then(|id| ctx.person(id));
        if let Some(p) = known {
            return Some(create(ctx, p, p0.begin, p1.end, p0.morph, attrs, mode, after_be));
        }
    }
    None
}

/// Coefficient gate, tie rejection, gender guess and assembly of the best
/// reading
fn accept<'a>(
    ctx: &AnalysisContext<'a>,
    pits: &[NameItem<'a>],
    mut pli: Vec<NameCandidate<'a>>,
    attrs: &mut Vec<AttributeToken<'a>>,
    mi: &MorphInfo,
    mode: Mode,
    after_be: bool,
) -> Option<Option<Attached<'a>>> {
    let min_coef = ctx.config.min_coef;
    {
        let best = &pli[0];
        if best.coef < min_coef && (!attrs.is_empty() || mode.for_ext) {
            if let Some(pit) = resolver::try_attach_identity(pits, mi) {
                if pit.coef > best.coef && pit.coef > 0.0 {
                    let mut pers = PersonReferent::new();
                    if let Some(l) = &pit.lastname {
                        pers.add_identity(l);
                    }
                    let (begin, end) = (pit.begin, pit.end);
                    return Some(create(ctx, pers, begin, end, pit.morph, attrs, mode, after_be));
                }
            }
        }
    }
    let best = &mut pli[0];
    if best.coef < min_coef && (!attrs.is_empty() || mode.for_ext) {
        if best.begin.lang().is_en()
            && best.template == FioTemplate::NameSurname
            && attrs.first().is_some_and(|a| a.kind == AttrKind::BestRegards)
        {
            best.adjust("signature_after_regards", 10.0);
        }
        if best.coef >= 0.0 {
            let delta = if best.begin.chars().is_all_upper { 1.0 } else { 2.0 };
            best.adjust("attribute_before", delta);
        }
    }
    if best.coef >= 0.0 && best.coef < min_coef {
        let mut tee = best.end.next();
        let mut tee1 = None;
        if let Some(x) = tee.filter(|x| x.is_char('(')) {
            if let Some(close) = try_parse_bracket(x) {
                if close.end_char() - x.begin_char() < 100 {
                    tee1 = x.next();
                    tee = close.next();
                }
            }
        }
        if let Some(x) = tee.filter(|x| x.is_char_of(":,") || x.is_hiphen() || is_verb_be(*x)) {
            tee = x.next();
        }
        let att = tee
            .and_then(|x| attribute::try_attach(ctx, x, AttachAttrs::NO))
            .or_else(|| tee1.and_then(|x| attribute::try_attach(ctx, x, AttachAttrs::NO)));
        if let Some(att) = att {
            let direct = tee == best.end.next();
            if !(direct && !att.morph.case.is_nominative() && !att.morph.case.is_undefined()) {
                best.adjust("attribute_after", 2.0);
            }
        } else if tee.is_some_and(|x| x.is_value("АГЕНТ", None)) {
            best.adjust("agent_after", 1.0);
        }
        if mode.for_attribute {
            best.adjust("inside_attribute", 1.0);
        }
    }
    if pits.len() >= 3
        && best.template == FioTemplate::IISurname
        && best.coef < min_coef
        && best.coef > 1.0
    {
        if !ctx.find_persons_by_lastname(&pits[2].value).is_empty() {
            best.adjust("known_surname", 1.0);
        }
    }
    if best.coef >= 0.0 && best.coef < min_coef && attrs.is_empty() {
        let prev_person = best
            .begin
            .previous()
            .filter(|p| p.is_comma_and())
            .and_then(|p| p.previous())
            .and_then(|p| ctx.person_at(p.idx()));
        if prev_person.is_some() && ctx.last_template() == Some(best.template) {
            best.adjust("enumeration_same_template", 1.0);
        }
    }
    if best.coef < min_coef {
        return None;
    }

    let best_coef = best.coef;
    let mut gender = MorphGender::UNDEFINED;
    let tied = pli.iter().take_while(|p| p.coef == best_coef).count();
    for p in &pli[..tied] {
        let g = p.probable_gender();
        if !g.is_undefined() {
            gender |= g;
        }
    }
    pli.truncate(tied);
    if pli.len() > 1 {
        debug!(
            first = %pli[0],
            second = %pli[1],
            "Rejected ambiguous readings"
        );
        return Some(None);
    }
    let mut best = pli.remove(0);
    trace!(candidate = %best, rules = ?best.trace, "Accepted reading");

    if gender != MorphGender::FEMININE && gender != MorphGender::MASCULINE {
        gender = guess_isolated_female(ctx, &mut best, mode).unwrap_or(gender);
    }
    if gender == MorphGender::UNDEFINED || gender == both_genders() {
        if let (Some(f), Some(l)) = (&best.firstname, &best.lastname) {
            let mut g = f.gender();
            if !l.gender().is_undefined() {
                g &= l.gender();
            }
            if g == MorphGender::FEMININE || g == MorphGender::MASCULINE {
                gender = g;
            } else if f.gender() == MorphGender::MASCULINE || f.gender() == MorphGender::FEMININE {
                gender = f.gender();
            } else if l.gender() == MorphGender::MASCULINE || l.gender() == MorphGender::FEMININE {
                gender = l.gender();
            }
        }
    }

    let mut pers = PersonReferent::new();
    if gender == MorphGender::MASCULINE {
        pers.is_male = true;
    } else if gender == MorphGender::FEMININE {
        pers.is_female = true;
    }
    if let Some(r) = &best.referent {
        pers.merge_slots(r);
    } else if let Some(known) = best.onto_person.and_then(|id| ctx.person(id)) {
        pers.merge_slots(&known);
    } else if matches!(best.template, FioTemplate::AsianName | FioTemplate::Arabic) {
        if let Some(l) = &best.lastname {
            pers.add_identity(l);
        }
    } else {
        pers.add_fio_identity(
            best.lastname.clone(),
            best.firstname.clone(),
            best.middlename.clone(),
        );
        if best.template == FioTemplate::AsianSurnameName {
            pers.name_type = Some("china".to_string());
        }
    }

    // "министр Иван Петров" read from the second word: the first one
    // belongs to the position
    if best.begin != pits[0].begin && !attrs.is_empty() {
        if pits[0].whitespaces_before() > 2 {
            attrs.clear();
        } else {
            let s = pits[0].source_text().to_lowercase();
            if let Some(pat) = attrs.last_mut() {
                if pat.kind == AttrKind::Position && !s.is_empty() && !pat.is_newline_before() {
                    if pat.value.is_none() {
                        if let Some(prop) = pat.property.as_mut() {
                            append_to_deepest(prop, &s, pat.add_outer_org_as_ref);
                            pat.add_outer_org_as_ref = false;
                        }
                    } else if let Some(v) = pat.value.as_mut() {
                        v.push(' ');
                        v.push_str(&s);
                    }
                    pat.end = pits[0].end;
                }
            }
        }
    }

    let latin = resolver::check_latin_after(&best);
    let mut end = best.end;
    if let Some(latin) = latin {
        pers.add_fio_identity(latin.lastname, latin.firstname, latin.middlename);
        end = latin.end;
    }
    let template = best.template;
    let res = assembler::create_referent_token(
        ctx,
        pers,
        best.begin,
        end,
        best.morph,
        attrs,
        mode.for_attribute,
        after_be,
    )
    .map(|mut m| {
        m.template = Some(template);
        Attached::Person(m)
    });
    Some(res)
}

/// A surname on a line of its own that agrees with both genders is read
/// as feminine unless a later masculine mention of it exists
fn guess_isolated_female<'a>(
    ctx: &AnalysisContext<'a>,
    best: &mut NameCandidate<'a>,
    mode: Mode,
) -> Option<MorphGender> {
    if !best.begin.is_newline_before() || !best.end.is_newline_after() {
        return None;
    }
    let last = best.lastname.as_ref()?;
    if !last.has_lastname_standard_tail() || last.len() != 2 {
        return None;
    }
    let sur = last.items()[0].value.clone();
    let mut ok = true;
    let mut cur = best.end.next();
    let mut cou = 100;
    while let Some(t) = cur {
        if cou == 0 || mode.step > 0 {
            break;
        }
        cou -= 1;
        if t.is_value(&sur, None) {
            if let Some(pr) = try_attach_person(ctx, t, mode.step, false) {
                if !pr.referent.is_female {
                    ok = false;
                }
            }
            break;
        }
        cur = t.next();
    }
    if !ok {
        return None;
    }
    if let Some(l) = best.lastname.as_mut() {
        l.remove(None, MorphGender::MASCULINE);
    }
    if let Some(f) = best.firstname.as_mut().filter(|f| f.len() == 2) {
        f.remove(None, MorphGender::MASCULINE);
    }
    Some(MorphGender::FEMININE)
}

/// A person followed by first names sharing the surname ("Иван Петров,
/// Мария и Анна")
fn attach_persons<'a>(
    ctx: &AnalysisContext<'a>,
    t: TokenRef<'a>,
    step: u8,
) -> Option<Vec<Attached<'a>>> {
    let first = attach(
        ctx,
        t,
        Mode {
            step,
            ..Mode::default()
        },
    )?;
    let Attached::Person(rt) = first else {
        return Some(vec![first]);
    };
    let mut names: Vec<NameItem<'a>> = Vec::new();
    let mut cur = rt.end.next();
    while let Some(tt) = cur {
        if !tt.is_comma_and() {
            break;
        }
        let Some(n) = tt.next() else {
            break;
        };
        let Some(pits) = segmenter::attach_list(ctx, n, ParseAttrs::NO, 10) else {
            break;
        };
        if pits.len() != 1 || try_attach_person(ctx, n, step, false).is_some() {
            break;
        }
        if pits[0].firstname.as_ref().map_or(true, |f| f.vars.is_empty()) {
            break;
        }
        let end = pits[0].end;
        names.extend(pits);
        if tt.is_and() {
            break;
        }
        cur = end.next();
    }
    let mut res = Vec::with_capacity(names.len() + 1);
    for n in &names {
        let Some(first) = &n.firstname else {
            continue;
        };
        let gender = first.vars.first().map(|v| v.gender).unwrap_or(MorphGender::UNDEFINED);
        let mut pers = PersonReferent::new();
        pers.set_gender(gender);
        for v in &first.vars {
            if !pers.firstnames.contains(&v.value) {
                pers.firstnames.push(v.value.clone());
            }
        }
        for a in &rt.referent.attributes {
            pers.add_attribute(a.clone());
        }
        for sur in &rt.referent.lastnames {
            if gender == MorphGender::MASCULINE || gender == MorphGender::FEMININE {
                if let Some(sur0) = inflect_surname(ctx, sur, gender) {
                    if !pers.lastnames.contains(&sur0) {
                        pers.lastnames.push(sur0);
                    }
                }
            }
            if !pers.lastnames.contains(sur) {
                pers.lastnames.push(sur.clone());
            }
        }
        let mut morph = n.morph;
        morph.number = MorphNumber::SINGULAR;
        let mut m = PersonMatch::new(pers, n.begin, n.end, morph);
        m.template = rt.template;
        res.push(m);
    }
    let mut out = vec![Attached::Person(rt)];
    out.extend(res.into_iter().map(Attached::Person));
    Some(out)
}

// ============================================================================
// Analysis Result
// ============================================================================

/// Kind of a recognised span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MentionKind {
    Person,
    Property,
    Identity,
}

impl MentionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Property => "PERSONPROPERTY",
            Self::Identity => "PERSONIDENTITY",
        }
    }
}

impl std::fmt::Display for MentionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recognised span of the text
#[derive(Debug, Clone, Serialize)]
pub struct Mention {
    pub kind: MentionKind,
    /// Index into the matching list of [`AnalysisResult`]
    pub index: usize,
    /// Person the span refers to, for properties standing for a person
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<usize>,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Everything found in one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub persons: Vec<PersonReferent>,
    pub properties: Vec<PersonProperty>,
    pub identities: Vec<PersonIdentityReferent>,
    pub mentions: Vec<Mention>,
}

impl AnalysisResult {
    pub fn mentions_of(&self, kind: MentionKind) -> impl Iterator<Item = &Mention> {
        self.mentions.iter().filter(move |m| m.kind == kind)
    }

    /// Person with surname `lastname`, if any
    pub fn find_person(&self, lastname: &str) -> Option<&PersonReferent> {
        let key = lastname.to_uppercase();
        self.persons.iter().find(|p| p.lastnames.contains(&key))
    }
}

fn mention(
    doc: &Document,
    kind: MentionKind,
    index: usize,
    begin: TokenRef<'_>,
    end: TokenRef<'_>,
) -> Mention {
    Mention {
        kind,
        index,
        person: None,
        start: begin.begin_char(),
        end: end.end_char(),
        text: doc.source_text(begin.idx(), end.idx()).to_string(),
    }
}

// ============================================================================
// Person Extractor
// ============================================================================

/// Person recognition over plain text
pub struct PersonExtractor {
    tokenizer: Tokenizer,
    terms: Arc<Terminology>,
    config: AnalysisConfig,
}

impl PersonExtractor {
    /// Extractor over the built-in lexicon and terminology
    pub fn new() -> Result<Self> {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Result<Self> {
        let lexicon = Lexicon::shared()?;
        let terms = Terminology::shared()?;
        Ok(Self::with_resources(Tokenizer::new(lexicon), terms, config))
    }

    pub fn with_resources(
        tokenizer: Tokenizer,
        terms: Arc<Terminology>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            tokenizer,
            terms,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn terminology(&self) -> &Terminology {
        &self.terms
    }

    pub fn analyze(&self, text: &str) -> AnalysisResult {
        let doc = self.tokenizer.document(text);
        self.analyze_document(&doc)
    }

    /// Analyse `text` with geo, organization and date spans resolved by the
    /// caller
    pub fn analyze_with_referents(&self, text: &str, spans: &[ReferentSpan]) -> AnalysisResult {
        let doc = self.tokenizer.document_with_referents(text, spans);
        self.analyze_document(&doc)
    }

    /// Read one entry of a reference list of names ("Иванов Иван
    /// Иванович", "Smith John") as a person
    pub fn parse_reference_name(&self, text: &str) -> Option<PersonReferent> {
        let doc = self.tokenizer.document(text);
        let ctx = AnalysisContext::new(&doc, &self.terms, &self.config);
        let t = doc.first()?;
        let mode = Mode {
            for_ext: true,
            ..Mode::default()
        };
        match attach(&ctx, t, mode)? {
            Attached::Person(m) => Some(m.referent),
            _ => None,
        }
    }

    pub fn analyze_document(&self, doc: &Document) -> AnalysisResult {
        let ctx = AnalysisContext::new(doc, &self.terms, &self.config);
        let mut res = AnalysisResult::default();
        let mut person_spans: Vec<(PersonId, TokenRef<'_>, TokenRef<'_>)> = Vec::new();
        let mut property_spans: Vec<(usize, TokenRef<'_>, TokenRef<'_>)> = Vec::new();

        for step in 0..2u8 {
            let mut cur = doc.first();
            while let Some(t) = cur {
                if ctx.person_at(t.idx()).is_some() {
                    cur = t.next();
                    continue;
                }
                if let Some(list) = attach_persons(&ctx, t, step) {
                    let mut last = t;
                    for a in list {
                        match a {
                            Attached::Skip(end) => last = end,
                            Attached::Property(attr) => {
                                let seen = property_spans
                                    .iter()
                                    .any(|(_, b, _)| b.idx() == attr.begin.idx());
                                if let Some(prop) = attr.property.filter(|_| !seen) {
                                    let idx = ctx.add_property(prop);
                                    property_spans.push((idx, attr.begin, attr.end));
                                }
                                last = attr.end;
                            }
                            Attached::Person(m) => {
                                if m.end.idx() > last.idx() {
                                    last = m.end;
                                }
                                // recognised in the first step
                                if ctx.person_at(m.begin.idx()).is_some() {
                                    continue;
                                }
                                let id = ctx.add_person(m.referent);
                                ctx.mark_person_span(m.begin.idx(), m.end.idx(), id);
                                if let Some(template) = m.template {
                                    ctx.remember_template(template);
                                }
                                if push_person_span(&mut person_spans, id, m.begin, m.end) {
                                    record_identities(&ctx, m.begin, m.end, &mut res);
                                }
                            }
                        }
                    }
                    cur = last.next();
                    continue;
                }
                if step == 0 {
                    if let Some(idm) = identity::try_attach_identity(&ctx, t) {
                        let mut tt = t.previous();
                        if let Some(x) = tt.filter(|x| x.is_char_of(":,")) {
                            tt = x.previous();
                        }
                        if let Some(id) = tt.and_then(|x| ctx.person_at(x.idx())) {
                            let doc_ref = idm.referent.clone();
                            ctx.with_person_mut(id, |p| p.add_id_doc(doc_ref));
                        }
                        let index = res.identities.len();
                        let m = mention(doc, MentionKind::Identity, index, idm.begin, idm.end);
                        res.mentions.push(m);
                        res.identities.push(idm.referent);
                        cur = idm.end.next();
                        continue;
                    }
                }
                cur = t.next();
            }
            if ctx.person_count() == 0 && !ctx.second_step_needed() {
                break;
            }
        }

        collect_properties(&ctx, &mut property_spans, &mut res);

        for (id, begin, end) in person_spans {
            res.mentions.push(mention(doc, MentionKind::Person, id.0, begin, end));
        }
        for (idx, begin, end) in property_spans {
            res.mentions.push(mention(doc, MentionKind::Property, idx, begin, end));
        }
        res.mentions.sort_by_key(|m| (m.start, m.end));
        res.persons = ctx.persons();
        res.properties = ctx.properties();
        info!(
            tokens = doc.len(),
            persons = res.persons.len(),
            properties = res.properties.len(),
            identities = res.identities.len(),
            "Document analyzed"
        );
        res
    }
}

/// Adds a mention span of `id`; a span overlapping an earlier one of the
/// same person widens it instead. Returns false in that case.
fn push_person_span<'a>(
    spans: &mut Vec<(PersonId, TokenRef<'a>, TokenRef<'a>)>,
    id: PersonId,
    begin: TokenRef<'a>,
    end: TokenRef<'a>,
) -> bool {
    let overlapping = spans
        .iter_mut()
        .find(|(pid, b, e)| *pid == id && b.idx() <= end.idx() && begin.idx() <= e.idx());
    match overlapping {
        Some((_, b, e)) => {
            if begin.idx() < b.idx() {
                *b = begin;
            }
            if end.idx() > e.idx() {
                *e = end;
            }
            false
        }
        None => {
            spans.push((id, begin, end));
            true
        }
    }
}

/// Identity documents the assembler consumed into a person mention
fn record_identities<'a>(
    ctx: &AnalysisContext<'a>,
    begin: TokenRef<'a>,
    end: TokenRef<'a>,
    res: &mut AnalysisResult,
) {
    let mut cur = Some(begin);
    while let Some(t) = cur.filter(|t| t.idx() <= end.idx()) {
        match identity::try_attach_identity(ctx, t) {
            Some(idm) if idm.end.idx() <= end.idx() => {
                let index = res.identities.len();
                let m = mention(ctx.doc, MentionKind::Identity, index, idm.begin, idm.end);
                res.mentions.push(m);
                res.identities.push(idm.referent);
                cur = idm.end.next();
            }
            _ => cur = t.next(),
        }
    }
}

/// Positions outside person mentions: those equal to the position of one
/// known person refer to that person, independent ones become properties
fn collect_properties<'a>(
    ctx: &AnalysisContext<'a>,
    property_spans: &mut Vec<(usize, TokenRef<'a>, TokenRef<'a>)>,
    res: &mut AnalysisResult,
) {
    let mut cur = ctx.doc.first();
    while let Some(t) = cur {
        if ctx.person_at(t.idx()).is_some()
            || t.referent().is_some()
            || !ctx.can_be_property_begin(t.idx())
        {
            cur = t.next();
            continue;
        }
        let Some(pat) = attribute::try_attach(ctx, t, AttachAttrs::NO) else {
            cur = t.next();
            continue;
        };
        let end = pat.end;
        cur = end.next();
        let Some(prop) = pat.property.clone() else {
            continue;
        };
        if pat.kind != AttrKind::Position && pat.kind != AttrKind::King {
            continue;
        }
        let holders: Vec<usize> = ctx.with_persons(|persons| {
            persons
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    p.attributes
                        .iter()
                        .any(|a| a.can_be_equals(&prop, EqualityMode::WithinOneText))
                })
                .map(|(i, _)| i)
                .take(2)
                .collect()
        });
        if holders.len() == 1 {
            let blocked = end.next().is_some_and(|n| {
                n.is_char('_') || n.is_newline_before() || n.is_table_control_char()
            });
            if !blocked {
                let idx = ctx.add_property(prop);
                let mut m = mention(ctx.doc, MentionKind::Property, idx, t, end);
                m.person = Some(holders[0]);
                res.mentions.push(m);
                continue;
            }
        }
        if pat.can_be_independent() || !holders.is_empty() {
            let idx = ctx.add_property(prop);
            property_spans.push((idx, t, end));
        }
    }
}

impl EntityExtractor for PersonExtractor {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>> {
        let res = self.analyze(text);
        let entities = res
            .mentions
            .iter()
            .map(|m| ExtractedEntity {
                text: m.text.clone(),
                entity_type: m.kind.as_str().to_string(),
                start: m.start,
                end: m.end,
                confidence: match m.kind {
                    MentionKind::Person => 0.9,
                    MentionKind::Property => 0.75,
                    MentionKind::Identity => 0.95,
                },
            })
            .collect();
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PersonExtractor {
        PersonExtractor::new().unwrap()
    }

    #[test]
    fn test_surname_with_initials() {
        let res = extractor().analyze("Вчера Иванов И. П. подписал приказ.");
        let p = res.find_person("Иванов").unwrap();
        assert!(p.firstnames.contains(&"И".to_string()));
        assert!(p.middlenames.contains(&"П".to_string()));
        assert_eq!(res.mentions_of(MentionKind::Person).count(), 1);
    }

    #[test]
    fn test_second_step_keeps_one_mention() {
        let res = extractor().analyze("Вчера Иван Петров заявил.");
        assert_eq!(res.persons.len(), 1);
        let mentions: Vec<_> = res.mentions_of(MentionKind::Person).collect();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, "Иван Петров");
    }

    #[test]
    fn test_overlapping_spans_of_one_person_merge() {
        let d = Tokenizer::new(Lexicon::shared().unwrap()).document("министр Иван Петров");
        let t = |i| d.at(i).unwrap();
        let mut spans = Vec::new();
        assert!(push_person_span(&mut spans, PersonId(0), t(1), t(2)));
        assert!(!push_person_span(&mut spans, PersonId(0), t(0), t(2)));
        assert!(push_person_span(&mut spans, PersonId(1), t(0), t(0)));
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].1.idx(), 0);
    }

    #[test]
    fn test_bare_surname_after_prefix() {
        for text in ["гражданин Иванов пришёл.", "Вчера господин Петров уехал."] {
            let res = extractor().analyze(text);
            assert_eq!(res.persons.len(), 1, "{text}");
            assert!(res.persons[0].is_male, "{text}");
        }
    }

    #[test]
    fn test_position_attached_to_person() {
        let res = extractor().analyze("Министр финансов Иван Петров заявил о росте.");
        let p = res.find_person("Петров").unwrap();
        assert!(p.attributes.iter().any(|a| a.name.starts_with("министр")));
        assert!(p.is_male);
    }

    #[test]
    fn test_later_bare_surname_is_same_person() {
        let res = extractor().analyze("Иван Петров приехал в город.\nПетров выступил с докладом.");
        assert_eq!(res.persons.len(), 1);
        let mentions: Vec<_> = res.mentions_of(MentionKind::Person).collect();
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].index, mentions[1].index);
    }

    #[test]
    fn test_identity_document_attached() {
        let res = extractor().analyze("гражданин Иванов Иван Иванович, паспорт 45 02 123456");
        let p = res.find_person("Иванов").unwrap();
        assert_eq!(p.id_docs.len(), 1);
        assert_eq!(res.identities.len(), 1);
    }

    #[test]
    fn test_shared_surname_list() {
        let res = extractor().analyze("Пришли Петр Сидоров и Мария.");
        let maria = res
            .persons
            .iter()
            .find(|p| p.firstnames.contains(&"МАРИЯ".to_string()))
            .unwrap();
        assert!(maria.lastnames.iter().any(|l| l.starts_with("СИДОРОВ")));
    }

    #[test]
    fn test_reference_name() {
        let p = extractor().parse_reference_name("Иванов Иван Иванович").unwrap();
        assert!(p.lastnames.contains(&"ИВАНОВ".to_string()));
        assert!(p.firstnames.contains(&"ИВАН".to_string()));
    }

    #[test]
    fn test_extract_entity_types() {
        let entities = extractor()
            .extract("Президент России Владимир Путин провел совещание.")
            .unwrap();
        let person = entities.iter().find(|e| e.entity_type == "PERSON").unwrap();
        assert!(person.text.contains("Путин"));
        assert!(person.start < person.end);
    }

    #[test]
    fn test_result_serializes() {
        let res = extractor().analyze("Иванов И. П. подписал приказ.");
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["persons"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["mentions"][0]["kind"], "Person");
    }

    #[test]
    fn test_mention_kind_names() {
        assert_eq!(MentionKind::Person.as_str(), "PERSON");
        assert_eq!(MentionKind::Property.to_string(), "PERSONPROPERTY");
        assert_eq!(MentionKind::Identity.as_str(), "PERSONIDENTITY");
    }
}
