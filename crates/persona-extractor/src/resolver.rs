//! Template resolution
//!
//! Given the name items of a run, [`try_attach`] tries every word-order
//! template at a start index and returns the fitting readings sorted by
//! coefficient, best first. Each template is a small scoring routine: it
//! rejects impossible readings outright and otherwise applies named
//! adjustments for morphological agreement, dictionary membership, letter
//! case, layout and document statistics.
//!
//! Known persons of the document (the local ontology) are consulted by the
//! `try_attach_onto_*` family, which lets a later bare "Иванов" or "Ивана"
//! resolve to the person introduced earlier.

use tracing::{debug, trace};

use persona_core::noun_phrase::{self, NounPhraseParams};
use persona_core::numbers::try_parse_roman;
use persona_core::text::{can_be_start_of_sentence, is_bracket, is_open_bracket, text_value};
use persona_core::{
    MorphCase, MorphClass, MorphGender, MorphInfo, MorphNumber, ReferentKind, TokenRef,
};

use crate::assembler::is_person_say_or_attr_after;
use crate::attribute::{self, AttachAttrs};
use crate::context::AnalysisContext;
use crate::morph_collection::MorphVariantCollection;
use crate::name_part::{del_surname_end, NamePart};
use crate::person::{PersonId, PersonReferent};
use crate::property::EqualityMode;
use crate::segmenter::{self, ItemKind, NameItem, ParseAttrs};
use crate::templates::{FioTemplate, NameCandidate};

/// Openings of greeting lines in letters; a name right after one is the
/// addressee, not a signature
const HELLO_WORDS: &[&str] = &[
    "ЗДРАВСТВУЙТЕ", "ЗДРАВСТВУЙ", "ПРИВЕТ", "ДОБРЫЙ", "УВАЖАЕМЫЙ", "УВАЖАЕМАЯ", "ДОРОГОЙ",
    "ДОРОГАЯ", "ВЕЛЬМИШАНОВНИЙ", "HELLO", "DEAR", "HI",
];

const GLOBAL_EPITHETS: &[&str] = &["ВЕЛИКИЙ", "СВЯТОЙ", "ПРЕПОДОБНЫЙ", "БЛАЖЕННЫЙ"];

// ============================================================================
// Entry point
// ============================================================================

/// All readings of the items starting at `ind`, best first.
///
/// `hint` narrows case and gender (from a preceding attribute), `first_token`
/// is the start of the whole mention and is used to find the template of
/// the previous name in an enumeration. `allow_king` admits regnal readings
/// without a number (after a title like "король").
pub fn try_attach<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    hint: &MorphInfo,
    first_token: Option<TokenRef<'a>>,
    allow_king: bool,
    after_attribute: bool,
) -> Vec<NameCandidate<'a>> {
    let mut res: Vec<NameCandidate<'a>> = Vec::new();
    if ind >= items.len() {
        return res;
    }
    let ty = first_token.and_then(|t| previous_template(ctx, t));
    let prev_is = |t: FioTemplate| ty == Some(t);
    let inf = *hint;

    if let Some(global) = try_attach_global(ctx, items, ind, &inf) {
        res.push(global);
        finish(&mut res, items);
        return res;
    }
    if let Some(c) = try_attach_surname_ii(ctx, items, ind, &inf) {
        res.push(c);
    }
    if let Some(c) = try_attach_ii_surname(ctx, items, ind, &inf) {
        res.push(c);
    }
    if let Some(c) = try_attach_asian(ctx, items, ind, &inf, 3, prev_is(FioTemplate::AsianName)) {
        res.push(c);
    } else if let Some(c) = try_attach_arabic(items, ind, &inf) {
        res.push(c);
    } else {
        let ns_prev = prev_is(FioTemplate::NameSurname);
        let ns = try_attach_name_surname(ctx, items, ind, &inf, ns_prev, after_attribute);
        let ns_coef = ns.as_ref().map(|c| c.coef);
        if let Some(ns) = ns {
            res.push(ns);
        }
        let sn_prev = prev_is(FioTemplate::SurnameName);
        if let Some(mut sn) = try_attach_surname_name(ctx, items, ind, &inf, sn_prev) {
            if let Some(ns_coef) = ns_coef {
                if ns_coef + 1.0 >= sn.coef && !prev_is(FioTemplate::SurnameName) {
                    sn.adjust("name_first_competes", -0.5);
                }
            }
            res.push(sn);
        }
        let nss_prev = prev_is(FioTemplate::NameSecnameSurname);
        if let Some(mut nss) = try_attach_name_secname_surname(ctx, items, ind, &inf, nss_prev) {
            if let Some(ns_coef) = ns_coef {
                if nss.coef > 2.0 && ns_coef > nss.coef && ind == 0 && items.len() == 3 {
                    nss.set_coef("full_name_over_short", ns_coef + 0.5);
                }
            }
            res.push(nss);
        }
        let sns_prev = prev_is(FioTemplate::SurnameNameSecname);
        if let Some(c) = try_attach_surname_name_secname(ctx, items, ind, &inf, sns_prev, false) {
            res.push(c);
        }
        let asian_prev = prev_is(FioTemplate::AsianName);
        if let Some(c) = try_attach_asian(ctx, items, ind, &inf, 2, asian_prev) {
            res.push(c);
        }
    }
    if allow_king {
        if let Some(c) = try_attach_name_secname(items, ind, &inf) {
            demote_name_surname(&mut res, c.coef);
            res.push(c);
        }
    }
    let king_allowed = prev_is(FioTemplate::King) || allow_king;
    if let Some(c) = try_attach_king(ctx, items, ind, &inf, king_allowed) {
        demote_name_surname(&mut res, c.coef);
        res.push(c);
    }

    if inf.gender == MorphGender::MASCULINE || inf.gender == MorphGender::FEMININE {
        for c in res.iter_mut() {
            let both = MorphGender::MASCULINE | MorphGender::FEMININE;
            if c.morph.gender.is_undefined() || c.morph.gender == both {
                c.morph.gender = inf.gender;
                if c.morph.case.is_undefined() {
                    c.morph.case = inf.case;
                }
            }
        }
    }
    let last_end = items[items.len() - 1].end;
    for c in res.iter_mut() {
        apply_name_affixes(c, items);
        let newlines = c
            .begin
            .until(c.end)
            .filter(|t| t.idx() != c.end.idx() && t.is_newline_after())
            .count();
        c.adjust("newline_inside", -(newlines as f64));
        if let Some(prev) = c.begin.previous() {
            if prev.morph_info().class == MorphClass::VERB {
                let closes = match c.end.next() {
                    None => true,
                    Some(n) => n.is_char('.') || n.is_newline_before(),
                };
                if !closes {
                    continue;
                }
                c.adjust("verb_before", 1.0);
            }
        }
        if c.coef >= 0.0 && ind == 0 && c.end.idx() == last_end.idx() {
            let delta = calc_coef_after(ctx, last_end.next());
            c.adjust("evidence_after", delta);
        }
    }
    if let Some(ty) = ty {
        if ind == 0 {
            for c in res.iter_mut() {
                if c.template == ty {
                    c.adjust("same_template_as_previous", 1.5);
                } else if ty.is_compatible(c.template) {
                    c.adjust("compatible_template_as_previous", 0.5);
                }
            }
        }
    }
    finish(&mut res, items);
    res
}

/// Surname particles and kin postfixes inside the candidate mark an
/// Arabic or Turkic name; a kin postfix also fixes the gender
fn apply_name_affixes<'a>(c: &mut NameCandidate<'a>, items: &[NameItem<'a>]) {
    let inside = items
        .iter()
        .filter(|p| p.begin.idx() >= c.begin.idx() && p.end.idx() <= c.end.idx());
    let mut particle = false;
    let mut kin = MorphGender::UNDEFINED;
    for p in inside {
        particle |= p.has_sur_prefix;
        if !p.kin_gender.is_undefined() {
            kin = p.kin_gender;
        }
    }
    if particle {
        c.adjust("surname_particle", 1.0);
    }
    if !kin.is_undefined() {
        c.adjust("kin_postfix", 1.0);
        c.morph.gender = kin;
    }
}

/// Stable sort by coefficient and item counting
fn finish<'a>(res: &mut [NameCandidate<'a>], items: &[NameItem<'a>]) {
    res.sort_by(|a, b| b.coef.partial_cmp(&a.coef).unwrap_or(std::cmp::Ordering::Equal));
    for c in res.iter_mut() {
        c.items_count = items
            .iter()
            .filter(|it| it.begin.idx() >= c.begin.idx() && it.end.idx() <= c.end.idx())
            .count();
    }
    for c in res.iter() {
        debug!(candidate = %c, "Template reading");
    }
}

fn demote_name_surname(res: &mut [NameCandidate<'_>], coef: f64) {
    for r in res.iter_mut().filter(|r| r.template == FioTemplate::NameSurname) {
        r.set_coef("regnal_reading_wins", coef - 0.5);
    }
}

/// Template of the person mentioned right before `t` in the same
/// enumeration ("Иванов И.И. и Петров П.П.")
fn previous_template<'a>(ctx: &AnalysisContext<'a>, first: TokenRef<'a>) -> Option<FioTemplate> {
    let mut cur = first.previous();
    while let Some(t) = cur {
        if ctx.person_at(t.idx()).is_some() {
            return ctx.last_template();
        }
        if t.is_newline_before() {
            break;
        }
        if t.chars().is_letter && !t.is_and() {
            break;
        }
        cur = t.previous();
    }
    None
}

fn calc_coef_after<'a>(ctx: &AnalysisContext<'a>, t: Option<TokenRef<'a>>) -> f64 {
    let mut t = t;
    if let Some(tt) = t {
        if tt.is_comma() {
            t = tt.next();
        }
    }
    let Some(tt) = t else {
        return 0.0;
    };
    if let Some(attr) = attribute::try_attach(ctx, tt, AttachAttrs::ONLY_KEYWORD) {
        if attr.age.is_some() {
            return 3.0;
        }
    }
    if tt.referent().is_some_and(|r| r.kind == ReferentKind::Date) {
        let mut co = 1.0;
        if tt.next().is_some_and(|n| n.is_value("Р", None)) {
            co += 2.0;
        }
        return co;
    }
    0.0
}

// ============================================================================
// Morphological agreement
// ============================================================================

fn gender_conflict(a: MorphGender, b: MorphGender) -> bool {
    !a.is_undefined() && !b.is_undefined() && !a.intersects(b)
}

fn case_conflict(a: MorphCase, b: MorphCase) -> bool {
    !a.is_undefined() && !b.is_undefined() && !a.intersects(b)
}

/// Agreed gender and case of up to three name parts. Each gender that all
/// parts allow contributes the cases they share; a singular verb right after
/// the name ("Саша пришла") settles an ambiguous gender.
pub fn accord_morph(
    hint: &MorphInfo,
    p1: Option<&NamePart>,
    p2: Option<&NamePart>,
    p3: Option<&NamePart>,
    next: Option<TokenRef<'_>>,
) -> MorphInfo {
    let parts: Vec<&NamePart> = [p1, p2, p3].into_iter().flatten().collect();
    let mut res = MorphInfo::new();
    if parts.is_empty() {
        return res;
    }
    let mut inf = Some(*hint);
    if let Some(p1) = p1 {
        if (p1.has_std_tail || p1.is_in_dictionary) && !hint.case.intersects(p1.case()) {
            inf = None;
        }
    }
    if let Some(p2) = p2 {
        if inf.is_some() && p2.is_in_dictionary && !hint.case.intersects(p2.case()) {
            inf = None;
        }
    }
    let mut variants: Vec<(MorphGender, MorphCase)> = Vec::new();
    for g in [MorphGender::MASCULINE, MorphGender::FEMININE] {
        if let Some(inf) = &inf {
            if !inf.gender.is_undefined() && !inf.gender.intersects(g) {
                continue;
            }
        }
        let mut cas = MorphCase::ALL_CASES;
        for p in &parts {
            let mut ca = MorphCase::UNDEFINED;
            for v in &p.vars {
                if !v.gender.is_undefined() && !v.gender.intersects(g) {
                    continue;
                }
                if let Some(inf) = &inf {
                    if case_conflict(inf.case, v.case) {
                        continue;
                    }
                }
                if v.case.is_undefined() {
                    ca = MorphCase::ALL_CASES;
                } else {
                    ca = ca | v.case;
                }
            }
            cas = cas & ca;
        }
        if cas.is_undefined() {
            continue;
        }
        if let Some(inf) = &inf {
            if !inf.case.is_undefined() && inf.case.intersects(cas) {
                cas = cas & inf.case;
            }
        }
        variants.push((g, cas));
    }

    let mut verb_gender = MorphGender::UNDEFINED;
    if let Some(next) = next {
        let mi = next.morph_info();
        if next.is_word()
            && next.chars().is_all_lower
            && mi.class == MorphClass::VERB
            && mi.number == MorphNumber::SINGULAR
        {
            if mi.gender == MorphGender::FEMININE || mi.gender == MorphGender::MASCULINE {
                verb_gender = mi.gender;
                let np = next
                    .next()
                    .and_then(|t| noun_phrase::try_parse(t, NounPhraseParams::default()));
                if let Some(np) = np {
                    if np.morph.case.is_nominative()
                        && np.morph.gender == verb_gender
                        && np.morph.number == MorphNumber::SINGULAR
                    {
                        verb_gender = MorphGender::UNDEFINED;
                    }
                }
            }
        }
    }
    if !verb_gender.is_undefined() && variants.len() > 1 {
        let cou = variants
            .iter()
            .filter(|(g, c)| c.is_nominative() && *g == verb_gender)
            .count();
        if cou == 1 {
            variants.retain(|(g, c)| c.is_nominative() && *g == verb_gender);
        }
    }
    for (g, c) in variants {
        res.gender |= g;
        res.case |= c;
    }
    res
}

fn is_accords(part: &NamePart, inf: &MorphInfo) -> bool {
    if part.vars.is_empty() {
        return true;
    }
    part.vars
        .iter()
        .any(|v| !case_conflict(v.case, inf.case) && !gender_conflict(v.gender, inf.gender))
}

/// Two adjacent items that are both confident surnames with different
/// endings ("Иванов Петрова"): a pair of people, not one name
fn is_both_surnames(p1: &NameItem<'_>, p2: &NameItem<'_>) -> bool {
    let (Some(l1), Some(l2)) = (&p1.lastname, &p2.lastname) else {
        return false;
    };
    if !l1.is_strong() || !l2.is_strong() {
        return false;
    }
    if p1.firstname.is_some() || p2.middlename.is_some() || p2.firstname.is_some() {
        return false;
    }
    if !p1.end.is_word() || !p2.end.is_word() {
        return false;
    }
    p1.end.term().chars().last() != p2.end.term().chars().last()
}

// ============================================================================
// Filling name parts
// ============================================================================

fn set_value(col: &mut MorphVariantCollection, t: TokenRef<'_>, inf: &MorphInfo) {
    if !t.is_word() {
        return;
    }
    let latin = t.chars().is_latin_letter;
    for wf in t.morph() {
        if wf.class.is_verb() || wf.short_form {
            continue;
        }
        if gender_conflict(wf.gender, inf.gender) || case_conflict(wf.case, inf.case) {
            continue;
        }
        let value = if latin { t.term() } else { wf.normal_case.as_str() };
        col.add(value, None, wf.gender, None);
    }
    col.add(t.term(), None, inf.gender, None);
}

fn set_value2(col: &mut MorphVariantCollection, part: &NamePart, inf: &MorphInfo) {
    for v in &part.vars {
        if case_conflict(v.case, inf.case) || gender_conflict(v.gender, inf.gender) {
            continue;
        }
        col.add(&v.value, v.short_value.as_deref(), v.gender, None);
    }
    if col.is_empty() {
        if !inf.case.is_undefined() && !part.vars.is_empty() && part.has_std_tail {
            for v in &part.vars {
                col.add(&v.value, v.short_value.as_deref(), v.gender, None);
            }
        }
        if let Some(term) = &part.term {
            col.add(term, None, inf.gender, None);
        }
    }
}

pub(crate) fn manage_lastname(res: &mut NameCandidate<'_>, pit: &NameItem<'_>, inf: &MorphInfo) {
    let mut col = MorphVariantCollection::new();
    match &pit.lastname {
        None => {
            set_value(&mut col, pit.begin, inf);
            if pit.is_in_dictionary {
                res.adjust("lastname_common_word", -1.0);
            }
            let ch = pit.begin.chars();
            if pit.begin.is_word()
                && !ch.is_latin_letter
                && ch.is_capital_upper
                && pit.begin.length_char() > 2
                && !pit.begin.morph().iter().any(|wf| wf.in_dictionary)
            {
                res.adjust("lastname_unknown_word", 1.0);
            }
        }
        Some(part) => {
            res.adjust("lastname_role", 1.0);
            if !is_accords(part, inf) {
                res.adjust("lastname_discord", -1.0);
            }
            set_value2(&mut col, part, inf);
            if col.is_empty() && !pit.value.is_empty() {
                col.add(&pit.value, None, MorphGender::UNDEFINED, None);
            }
            if let Some(term) = &part.term {
                if (res.morph.case.is_undefined() || res.morph.case.is_nominative())
                    && !part.is_in_dictionary
                    && !col.values().contains(&term.as_str())
                    && (inf.case.is_nominative() || inf.case.is_undefined())
                    && !(part.morph().class.is_adjective() && inf.gender == MorphGender::FEMININE)
                {
                    col.add(term, None, pit.morph.gender, None);
                }
            }
            if pit.is_in_dictionary {
                res.adjust("lastname_common_word", -1.0);
            }
            if part.is_in_dictionary || part.is_in_ontology {
                res.adjust("lastname_known", 1.0);
            }
            if part.has_hiphen {
                res.adjust("lastname_hiphen", 1.0);
            }
            if pit.middlename.as_ref().is_some_and(|m| m.morph().gender == MorphGender::FEMININE) {
                res.adjust("lastname_like_patronymic", -1.0);
            }
        }
    }
    if pit.firstname.is_some() && !pit.chars.is_latin_letter {
        res.adjust("lastname_is_firstname", -1.0);
    }
    if pit.kind == ItemKind::Referent {
        res.adjust("lastname_is_referent", -1.0);
    }
    res.lastname = Some(col);
}

/// Surname variants of a single item agreeing with `inf`
pub fn create_lastname(pit: &NameItem<'_>, inf: &MorphInfo) -> Option<MorphVariantCollection> {
    let mut res = NameCandidate::new(FioTemplate::Undefined, pit.begin, pit.end);
    manage_lastname(&mut res, pit, inf);
    res.lastname.filter(|c| !c.is_empty())
}

pub(crate) fn manage_firstname(res: &mut NameCandidate<'_>, pit: &NameItem<'_>, inf: &MorphInfo) {
    let mut col = MorphVariantCollection::new();
    match &pit.firstname {
        None => {
            if pit.value.find('-').is_some_and(|i| i > 0)
                && pit.end.morph_class_in_dictionary().is_proper_name()
            {
                match &pit.lastname {
                    Some(l) => set_value2(&mut col, l, inf),
                    None => col.add(&pit.value, None, MorphGender::UNDEFINED, None),
                }
            } else {
                if pit.lastname.is_some() {
                    res.adjust("firstname_is_lastname", -1.0);
                }
                if pit.is_in_dictionary {
                    res.adjust("firstname_common_word", -1.0);
                }
                set_value(&mut col, pit.begin, inf);
            }
        }
        Some(part) => {
            res.adjust("firstname_role", 1.0);
            if !is_accords(part, inf) {
                res.adjust("firstname_discord", -1.0);
            }
            set_value2(&mut col, part, inf);
            if pit.is_in_dictionary && !part.is_in_dictionary {
                res.adjust("firstname_common_word", -1.0);
            }
        }
    }
    if pit.middlename.is_some() && pit.middlename != pit.firstname {
        res.adjust("firstname_is_patronymic", -1.0);
    }
    if pit.lastname.as_ref().is_some_and(|l| l.is_in_dictionary || l.is_in_ontology) {
        res.adjust("firstname_is_known_lastname", -1.0);
    }
    if pit.kind == ItemKind::Referent {
        res.adjust("firstname_is_referent", -2.0);
    }
    if col.is_empty() {
        col.add(&pit.value, None, inf.gender, None);
    }
    res.firstname = Some(col);
}

fn manage_middlename(res: &mut NameCandidate<'_>, pit: &NameItem<'_>, inf: &MorphInfo) {
    let mut col = MorphVariantCollection::new();
    match &pit.middlename {
        None => set_value(&mut col, pit.begin, inf),
        Some(part) => {
            res.adjust("middlename_role", 1.0);
            if !is_accords(part, inf) {
                res.adjust("middlename_discord", -1.0);
            }
            set_value2(&mut col, part, inf);
        }
    }
    if col.is_empty() {
        col.add(&pit.value, None, inf.gender, None);
    }
    res.middlename = Some(col);
}

fn initial_collection(pit: &NameItem<'_>) -> MorphVariantCollection {
    MorphVariantCollection::from_value(&pit.value, MorphGender::UNDEFINED)
}

fn is_greeting_before(t: TokenRef<'_>) -> bool {
    let mut t0 = t;
    if let Some(p) = t0.previous() {
        if p.is_comma() {
            t0 = p;
        }
    }
    match t0.previous() {
        Some(p) => p.is_word() && p.is_newline_before() && p.is_term_of(HELLO_WORDS),
        None => false,
    }
}

fn in_brackets(c: &NameCandidate<'_>) -> bool {
    let open = c.begin.previous().is_some_and(is_open_bracket);
    let close = c.end.next().is_some_and(|t| is_bracket(t) && !is_open_bracket(t));
    open && close
}

/// Noun phrase over the item and the next one ("Новая Москва"), which
/// makes a name reading unlikely
fn np_spans_next(pit: &NameItem<'_>, next: &NameItem<'_>) -> bool {
    noun_phrase::try_parse(pit.begin, NounPhraseParams::default())
        .is_some_and(|np| np.end.end_char() >= next.begin.begin_char())
}

// ============================================================================
// Name Surname
// ============================================================================

fn try_attach_name_surname<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
    prev_has_this: bool,
    after_attribute: bool,
) -> Option<NameCandidate<'a>> {
    let (p0, p1) = (items.get(ind)?, items.get(ind + 1)?);
    if p0.kind != ItemKind::Value || p1.kind != ItemKind::Value {
        return None;
    }
    if p0.begin.chars().is_all_upper
        && !p1.begin.chars().is_all_upper
        && !p0.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
    {
        return None;
    }
    if p1.lastname.is_none() && !prev_has_this && !p0.chars.is_latin_letter {
        if p0.firstname.is_none() || p1.middlename.is_some() {
            return None;
        }
        let closed = p1.is_newline_after() || p1.end.next().is_some_and(|t| t.is_char_of(",.);?!"));
        if !closed {
            return None;
        }
    }
    if p0.is_newline_after() || p0.is_hiphen_after {
        return None;
    }
    if p1
        .middlename
        .as_ref()
        .is_some_and(|m| m.is_in_dictionary && m.morph().gender == MorphGender::FEMININE)
    {
        return None;
    }
    if is_both_surnames(p0, p1) && !(items.len() == 2 && ind == 0 && after_attribute) {
        return None;
    }

    let mut res = NameCandidate::new(FioTemplate::NameSurname, p0.begin, p1.end);
    res.adjust("not_at_start", -(ind as f64));
    res.morph = accord_morph(inf, p1.lastname.as_ref(), p0.firstname.as_ref(), None, p1.end.next());
    let mut inf = *inf;
    if res.morph.gender == MorphGender::MASCULINE || res.morph.gender == MorphGender::FEMININE {
        if p1.lastname.as_ref().is_some_and(|l| !l.case().is_undefined()) {
            let reversed = p0.lastname.as_ref().is_some_and(|l| l.has_std_tail)
                && p1.firstname.as_ref().is_some_and(|f| f.is_in_dictionary);
            res.adjust("lastname_case_agrees", if reversed { -1.0 } else { 1.0 });
        }
        inf = res.morph;
    }
    manage_firstname(&mut res, p0, &inf);
    manage_lastname(&mut res, p1, &inf);
    if p0.firstname.is_some() {
        if p1.kind == ItemKind::Referent || p1.begin.referent().is_some() {
            res.adjust("lastname_referent", 1.0);
        } else if ind == 0
            && p1.firstname.is_none()
            && p1.middlename.is_none()
            && !p1.is_in_dictionary
            && p0.chars.is_capital_upper
            && p1.chars.is_capital_upper
            && !p0.begin.morph_class_in_dictionary().is_noun()
        {
            res.adjust("capital_pair", 1.0);
        }
    }
    let mc = p0.begin.morph_class_in_dictionary();
    if mc.is_verb() && !(p0.begin.chars().is_capital_upper && !can_be_start_of_sentence(p0.begin)) {
        res.adjust("firstname_is_verb", -1.0);
    }
    if mc.is_pronoun() && p0.firstname.is_none() {
        return None;
    }
    if p0.firstname.is_some()
        && (p1.is_newline_after() || p1.end.next().is_some_and(|t| t.is_char_of(",.")))
        && !p1.is_newline_before()
    {
        if p1.firstname.is_none() && p1.middlename.is_none() {
            res.adjust("closed_tail", 1.0);
        } else if p1.chars.is_latin_letter && ind + 2 == items.len() {
            res.adjust("closed_tail", 1.0);
        }
    }
    if let Some(middle) = &p1.middlename {
        let capital_before =
            ctx.stats().word_info(p1.begin).map_or(0, |w| w.not_capital_before_count);
        if capital_before == 0 {
            res.adjust("lastname_is_patronymic", -(1.0 + ind as f64));
            let g = res.morph.gender;
            if (g == MorphGender::MASCULINE || g == MorphGender::FEMININE)
                && !p1.lastname.as_ref().is_some_and(|l| l.is_in_dictionary || l.is_in_ontology)
                && middle.vars.iter().any(|v| v.gender.intersects(g))
            {
                res.adjust("lastname_is_patronymic", -1.0);
            }
        }
    }
    if p0.chars != p1.chars {
        if p0.chars.is_capital_upper && p1.chars.is_all_upper {
        } else if p0.chars.is_all_upper && p1.chars.is_capital_upper && p0.firstname.is_none() {
            res.adjust("chars_mismatch", -10.0);
        } else if !(p1.end.chars().is_capital_upper && p0.chars.is_capital_upper) {
            res.adjust("chars_mismatch", -1.0);
        }
        if !p0.firstname.as_ref().is_some_and(|f| f.is_in_dictionary) || p0.chars.is_all_upper {
            res.adjust("chars_mismatch", -1.0);
        }
    } else if p0.chars.is_all_upper {
        res.adjust("all_upper", -0.5);
    }
    if p0.is_in_dictionary {
        if p1.is_in_dictionary {
            res.adjust("common_words", -2.0);
            if p1.is_newline_after() || p1.end.next().is_some_and(|t| t.is_char_of(".,:")) {
                res.adjust("common_words_closed", 1.0);
            }
            if p0.firstname.is_none() {
                res.adjust("common_words", -1.0);
            }
        } else if !p0.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
            && !p0.value.contains('-')
        {
            if inf.case.is_undefined()
                || p0
                    .begin
                    .morph()
                    .iter()
                    .any(|wf| wf.case.intersects(inf.case) && wf.in_dictionary)
            {
                res.adjust("firstname_common_word", -1.0);
            }
        }
    }
    if !p0.chars.is_latin_letter && np_spans_next(p0, p1) {
        if p0.begin.morph_class_in_dictionary().is_adjective()
            || p1.begin.morph_class_in_dictionary().is_noun()
        {
            res.adjust("noun_phrase", -2.0);
        }
    }
    correct_coef_after_lastname(ctx, &mut res, items, ind + 2);
    if ind > 0 && res.coef > 0.0 && p0.is_hiphen_before {
        let b1 = ctx.stats().bigram_info(items[ind - 1].begin, p0.begin);
        if b1.is_some_and(|b| b.second_count == b.pair_count) {
            let mut res0 = NameCandidate::new(FioTemplate::NameSurname, p0.begin, p1.end);
            manage_firstname(&mut res0, &items[ind - 1], &inf);
            if let (Some(prefix), Some(body)) = (&res0.firstname, &res.firstname) {
                res.firstname = Some(MorphVariantCollection::add_prefix(prefix, body));
            }
            res.adjust("hiphen_firstname", 1.0);
            res.begin = items[ind - 1].begin;
        }
    }
    if in_brackets(&res) {
        res.adjust("in_brackets", -2.0);
    }
    if ctx
        .stats()
        .initial_info(&p0.value, p1.begin)
        .is_some_and(|b| b.pair_count > 0)
    {
        res.adjust("initial_pair_seen", 2.0);
    }
    if items.len() > 1
        && !items[0].is_in_dictionary
        && items[1].lastname.as_ref().is_some_and(|l| l.has_std_tail)
        && !items[1].is_in_dictionary
    {
        res.adjust("lastname_std_tail", 0.5);
    }
    if res.firstname.is_some() && p0.begin.is_value("СЛАВА", None) {
        res.adjust("slava", -3.0);
    } else if check_latin_after(&res).is_some() {
        res.adjust("latin_after", 2.0);
    }
    if !items[0].firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
        && items[0].begin.morph_class_in_dictionary().is_proper_geo()
        && items.get(1).and_then(|p| p.lastname.as_ref()).is_some_and(|l| l.is_in_ontology)
    {
        res.adjust("geo_before_known", -2.0);
    }
    if ind == 0 && items.len() == 2 && items[0].chars.is_latin_letter {
        if items[0].firstname.is_some() {
            let capital_before = items[0]
                .begin
                .previous()
                .is_some_and(|t| t.is_word() && t.chars().is_capital_upper);
            if !after_attribute && capital_before {
                res.adjust("latin_pair", -1.0);
            } else {
                res.adjust("latin_pair", 1.0);
            }
        }
        if items[0].chars.is_all_upper && items[1].chars.is_capital_upper {
            res.set_coef("latin_upper_capital", 0.0);
        }
    } else if ind == 0 && items.len() == 2 && items[1].is_in_dictionary {
        if items[0].is_in_dictionary {
            res.adjust("common_words", -1.0);
        } else if !items[1].lastname.as_ref().is_some_and(|l| l.is_in_dictionary) {
            let mc = items[1].begin.morph_class_in_dictionary();
            if mc.is_verb() && !mc.is_adjective() {
                res.adjust("lastname_is_verb", -1.0);
            }
        }
    }
    if ind == 0
        && items.len() == 2
        && items[1].middlename.is_some()
        && is_greeting_before(items[0].begin)
    {
        return None;
    }
    if ind == 0
        && items.len() == 3
        && items[2].middlename.is_some()
        && items[1].firstname.is_some()
    {
        res.adjust("three_items_full_name", -1.0);
    }
    Some(res)
}

fn correct_coef_after_lastname<'a>(
    ctx: &AnalysisContext<'a>,
    res: &mut NameCandidate<'a>,
    items: &[NameItem<'a>],
    ind: usize,
) {
    if ind == 0 {
        return;
    }
    let last = &items[ind - 1];
    if !last.is_newline_after()
        && attribute::try_attach(ctx, last.begin, AttachAttrs::ONLY_KEYWORD).is_some()
    {
        res.adjust("lastname_is_attribute", -1.0);
    }
    if ind >= items.len() {
        if check_latin_after(res).is_some() {
            res.adjust("latin_after", 2.0);
        }
        if ctx.stats().word_info(last.end).is_some_and(|w| w.has_before_person_attr) {
            res.adjust("seen_after_attribute", 1.0);
        }
        let Some(te) = last.end.next() else {
            return;
        };
        if is_person_say_or_attr_after(ctx, te) {
            res.adjust("say_or_attr_after", 1.0);
            if res.begin.chars().is_latin_letter && res.template == FioTemplate::NameSurname {
                res.adjust("say_or_attr_after", 2.0);
            }
        }
        if !te.chars().is_letter && !te.chars().is_all_lower {
            return;
        }
        let info = ctx
            .stats()
            .word_info(te)
            .map(|w| (w.lower_count, w.female_verbs_after_count + w.male_verbs_after_count));
        if let Some((lower, verbs)) = info {
            if lower > 0 {
                res.adjust("lower_word_after", -1.0);
            } else if verbs > 0 {
                res.adjust("verb_word_after", 1.0);
            }
        }
        return;
    }
    let mut ind = ind;
    let cur = &items[ind];
    if cur.kind == ItemKind::Value && (cur.firstname.is_none() || ind == items.len() - 1) {
        let b1 = ctx.stats().bigram_info(items[ind - 1].begin, cur.begin);
        if let Some(b1) = b1 {
            if b1.first_count == b1.pair_count
                && b1.second_count == b1.pair_count
                && b1.pair_count > 0
            {
                let ok = (b1.pair_count > 1 && cur.whitespaces_before() == 1)
                    || (cur.is_hiphen_before && cur.lastname.is_some());
                if ok {
                    let mut res1 = NameCandidate::new(res.template, cur.begin, cur.end);
                    let morph = res.morph;
                    manage_lastname(&mut res1, cur, &morph);
                    if let (Some(prefix), Some(body)) = (&res.lastname, &res1.lastname) {
                        res.lastname = Some(MorphVariantCollection::add_prefix(prefix, body));
                    }
                    res.end = cur.end;
                    res.adjust("double_lastname", 1.0);
                    ind += 1;
                    if ind >= items.len() {
                        return;
                    }
                }
            }
        }
    }
    let prev = &items[ind - 1];
    if prev.whitespaces_before() > prev.whitespaces_after() {
        res.adjust("spacing_after_lastname", -1.0);
    } else if prev.whitespaces_before() == prev.whitespaces_after() {
        let cur = &items[ind];
        if (cur.lastname.is_some() || cur.firstname.is_some()) && !cur.is_in_dictionary {
            res.adjust("spacing_after_lastname", -1.0);
        }
    }
}

fn correct_coef_for_lastname(res: &mut NameCandidate<'_>, it: &NameItem<'_>) {
    if !it.is_single_token() || !it.begin.is_word() {
        return;
    }
    let in_dic = it
        .begin
        .morph()
        .iter()
        .any(|wf| !wf.class.is_proper_surname() && wf.in_dictionary);
    let has_std = it.lastname.as_ref().is_some_and(|l| l.has_std_tail);
    if !has_std && in_dic {
        res.adjust("lastname_is_common_word", -1.5);
    }
}

/// Parenthesised Latin spelling of the same name right after the candidate:
/// "Иван Петров (Ivan Petrov)"
pub fn check_latin_after<'a>(c: &NameCandidate<'a>) -> Option<NameCandidate<'a>> {
    let t = c.end.next()?;
    if !t.is_char('(') {
        return None;
    }
    let t = t.next()?;
    let p1 = segmenter::attach_latin(t)?;
    let p2 = segmenter::attach_latin(p1.end.next()?)?;
    let mut et = p2.end.next()?;
    let mut p3 = None;
    if !et.is_char(')') {
        let p = segmenter::attach_latin(et)?;
        et = p.end.next()?;
        if !et.is_char(')') {
            return None;
        }
        p3 = Some(p);
    }
    let mut sur: Option<&NameItem<'_>> = None;
    let mut nam: Option<&NameItem<'_>> = None;
    let mut sec: Option<&NameItem<'_>> = None;
    match (c.template, &c.firstname, &c.middlename, &c.lastname) {
        (FioTemplate::NameSurname, Some(first), _, Some(last)) => {
            let mut eq = 0;
            if p1.kind == ItemKind::Value {
                if first.check_latin_variant(&p1.value) {
                    eq += 1;
                }
                nam = Some(&p1);
                if p2.kind == ItemKind::Value && p3.is_none() {
                    sur = Some(&p2);
                    if last.check_latin_variant(&p2.value) {
                        eq += 1;
                    }
                } else if let (ItemKind::Initial, Some(p3)) = (p2.kind, &p3) {
                    if last.check_latin_variant(&p3.value) {
                        eq += 1;
                    }
                    sur = Some(p3);
                }
            }
            if eq == 0 {
                return None;
            }
        }
        (FioTemplate::NameSecnameSurname, Some(first), Some(middle), Some(last)) => {
            let p3 = p3.as_ref()?;
            let mut eq = 0;
            if p1.kind == ItemKind::Value {
                if first.check_latin_variant(&p1.value) {
                    eq += 1;
                }
                nam = Some(&p1);
                if p2.kind == ItemKind::Value {
                    sec = Some(&p2);
                    if middle.check_latin_variant(&p2.value) {
                        eq += 1;
                    }
                }
                if p3.kind == ItemKind::Value {
                    sur = Some(p3);
                    if last.check_latin_variant(&p3.value) {
                        eq += 1;
                    }
                }
            }
            if eq == 0 {
                return None;
            }
        }
        _ => {}
    }
    let (nam, sur) = (nam?, sur?);
    let mut res = NameCandidate::new(c.template, t, et);
    res.lastname = Some(MorphVariantCollection::from_value(&sur.value, MorphGender::UNDEFINED));
    res.firstname = Some(MorphVariantCollection::from_value(&nam.value, MorphGender::UNDEFINED));
    if let Some(sec) = sec {
        let middle = MorphVariantCollection::from_value(&sec.value, MorphGender::UNDEFINED);
        res.middlename = Some(middle);
    }
    Some(res)
}

// ============================================================================
// Name Secname Surname
// ============================================================================

/// Patronymic reading of a part: the first variant, or all variants that
/// agree with `inf` when the form is ambiguous
fn middlename_from_part(part: &NamePart, inf: &MorphInfo) -> MorphVariantCollection {
    let mut col = MorphVariantCollection::new();
    if part.vars.len() > 1 {
        set_value2(&mut col, part, inf);
    } else if let Some(v) = part.vars.first() {
        col.add(&v.value, v.short_value.as_deref(), v.gender, None);
    }
    col
}

fn try_attach_name_secname_surname<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
    prev_has_this: bool,
) -> Option<NameCandidate<'a>> {
    let (p0, p1, p2) = (items.get(ind)?, items.get(ind + 1)?, items.get(ind + 2)?);
    if p0.kind != ItemKind::Value || p2.kind != ItemKind::Value {
        return None;
    }
    if p0.is_newline_after()
        && !(items.len() == 3
            && items[0].firstname.is_some()
            && items[1].middlename.is_some()
            && items[2].lastname.is_some())
    {
        return None;
    }
    if p2.lastname.is_none() && !prev_has_this && !p0.begin.lang().is_en() {
        return None;
    }
    if p0.begin.chars().is_all_upper
        && !p2.begin.chars().is_all_upper
        && !p0.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
    {
        return None;
    }
    if p1.begin.chars().is_all_upper
        && !p2.begin.chars().is_all_upper
        && p1.kind == ItemKind::Value
        && !p1.middlename.as_ref().is_some_and(|m| m.is_in_dictionary)
    {
        return None;
    }

    let mut ok = false;
    let mut add_coef = 0.0;
    if p1.kind == ItemKind::Initial || (p1.kind == ItemKind::Value && p1.middlename.is_some()) {
        ok = true;
    } else if p1.kind == ItemKind::Value && p2.firstname.is_none() {
        let stats = ctx.stats();
        let b1 = stats.bigram_info(p1.begin, p2.begin);
        let b2 = stats.bigram_info(p0.begin, p2.begin);
        match b1 {
            Some(b1) => {
                if b1.pair_count == b1.first_count && b1.pair_count == b1.second_count {
                    ok = true;
                    if let Some(b3) = stats.bigram_info(p0.begin, p1.begin) {
                        if b3.second_count > b3.pair_count
                            || (b3.second_count == b3.pair_count && p2.is_hiphen_before)
                        {
                            ok = false;
                        }
                    }
                } else if b2.is_some_and(|b2| b2.pair_count + b1.pair_count == b1.second_count) {
                    ok = true;
                }
            }
            None => {
                if ind + 3 == items.len() && p2.lastname.is_some() && !p2.is_in_dictionary {
                    ok = true;
                }
            }
        }
        if !ok && stats.initial_info(&p0.value, p2.begin).is_some_and(|b| b.pair_count > 0) {
            ok = true;
            add_coef = 2.0;
        }
        if !ok {
            if let Some(wi) = stats.word_info(p2.end) {
                let verbs_after = wi.male_verbs_after_count + wi.female_verbs_after_count;
                if wi.lower_count == 0 && verbs_after > 0 {
                    ok = true;
                    add_coef = 2.0;
                    if p1.firstname.is_some()
                        && p1.middlename.is_none()
                        && p0.firstname.is_none()
                        && p0.is_in_dictionary
                    {
                        ok = false;
                    }
                    let known = |l: &NamePart| l.is_in_dictionary || l.is_in_ontology;
                    if p1.lastname.as_ref().is_some_and(known) {
                        ok = false;
                    }
                }
            }
        }
        if !ok
            && ind == 0
            && items.len() == 3
            && items.iter().all(|it| it.chars.is_latin_letter)
            && items[0].firstname.is_some()
            && items[2].lastname.is_some()
        {
            ok = true;
        }
    }
    if !ok || is_both_surnames(p0, p2) {
        return None;
    }
    let plausible = items[ind..ind + 3].iter().any(|it| {
        if it.kind == ItemKind::Initial {
            return true;
        }
        if it.is_in_dictionary {
            return false;
        }
        let cla = it.begin.morph_class_in_dictionary();
        cla.is_proper_name()
            || cla.is_proper_surname()
            || cla.is_proper_secname()
            || cla.is_undefined()
    });
    if !plausible {
        return None;
    }

    let template = if p1.kind == ItemKind::Initial {
        FioTemplate::NameISurname
    } else {
        FioTemplate::NameSecnameSurname
    };
    let mut res = NameCandidate::new(template, p0.begin, p2.end);
    res.adjust("not_at_start", -(ind as f64));
    let mut inf = *inf;
    if let Some(m) = &p1.middlename {
        if !m.case().is_undefined() && !inf.case.intersects(m.case()) {
            inf = MorphInfo::new();
        }
    }
    res.morph = accord_morph(
        &inf,
        p2.lastname.as_ref(),
        p0.firstname.as_ref(),
        p1.middlename.as_ref(),
        p2.end.next(),
    );
    if res.morph.gender == MorphGender::MASCULINE || res.morph.gender == MorphGender::FEMININE {
        res.adjust("gender_agrees", 1.0);
        inf = res.morph;
    }
    manage_firstname(&mut res, p0, &inf);
    manage_lastname(&mut res, p2, &inf);
    match &p1.middlename {
        Some(m) if !m.vars.is_empty() => {
            res.adjust("middlename_role", 1.0);
            res.middlename = Some(middlename_from_part(m, &inf));
            if p2
                .lastname
                .as_ref()
                .is_some_and(|l| l.is_in_dictionary || l.has_std_tail || l.has_std_postfix)
            {
                res.adjust("lastname_strong", 1.0);
            }
        }
        _ => {
            if p1.kind == ItemKind::Initial {
                res.middlename = Some(initial_collection(p1));
                res.adjust("middle_initial", 1.0);
                if p2.lastname.is_none() {
                    let params = NounPhraseParams::default().with_preposition();
                    let np = noun_phrase::try_parse(p2.begin, params);
                    if np.is_some_and(|np| np.end.end_char() > p2.end.end_char()) {
                        res.adjust("lastname_in_noun_phrase", -2.0);
                    }
                }
            } else if p1.firstname.is_some() && p2.middlename.is_some() && items.len() == 3 {
                res.adjust("order_reversed", -2.0);
            } else {
                manage_middlename(&mut res, p1, &inf);
                res.adjust("middle_word", 0.5);
            }
        }
    }
    if p0.chars != p2.chars {
        res.adjust("chars_mismatch", -1.0);
        if p0.chars.is_all_upper {
            res.adjust("chars_mismatch", -1.0);
        }
    } else if p1.kind != ItemKind::Initial && p0.chars != p1.chars {
        res.adjust("chars_mismatch", -1.0);
    }
    correct_coef_after_lastname(ctx, &mut res, items, ind + 3);
    res.adjust("statistics_support", add_coef);
    if p0.is_in_dictionary && p1.is_in_dictionary && p2.is_in_dictionary {
        res.adjust("common_words", -1.0);
    }
    Some(res)
}

fn try_attach_name_secname<'a>(
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    if ind != 0 || items.len() != 2 {
        return None;
    }
    let (p0, p1) = (&items[0], &items[1]);
    if p0.kind != ItemKind::Value || p1.kind != ItemKind::Value || p0.is_newline_after() {
        return None;
    }
    if p0.firstname.is_none() || p1.middlename.is_none() {
        return None;
    }
    let mut res = NameCandidate::new(FioTemplate::NameSecname, p0.begin, p1.end);
    res.morph =
        accord_morph(inf, None, p0.firstname.as_ref(), p1.middlename.as_ref(), p1.end.next());
    let mut inf = *inf;
    if res.morph.gender == MorphGender::MASCULINE || res.morph.gender == MorphGender::FEMININE {
        inf = res.morph;
    }
    manage_firstname(&mut res, p0, &inf);
    manage_middlename(&mut res, p1, &inf);
    res.set_coef("name_and_patronymic", 2.0);
    Some(res)
}

// ============================================================================
// Surname Name
// ============================================================================

fn try_attach_surname_name<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
    prev_has_this: bool,
) -> Option<NameCandidate<'a>> {
    let (p0, p1) = (items.get(ind)?, items.get(ind + 1)?);
    if p0.kind != ItemKind::Value || p1.kind != ItemKind::Value {
        return None;
    }
    if p0.lastname.is_none() && !prev_has_this {
        return None;
    }
    if is_both_surnames(p0, p1) {
        return None;
    }
    if p1.begin.chars().is_all_upper
        && !p0.begin.chars().is_all_upper
        && !p1.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
    {
        return None;
    }
    let mut res = NameCandidate::new(FioTemplate::SurnameName, p0.begin, p1.end);
    res.adjust("not_at_start", -(ind as f64));
    if p0.is_newline_after() {
        res.adjust("newline_after_lastname", -1.0);
        if p0.whitespaces_after() > 15 {
            res.adjust("newline_after_lastname", -1.0);
        }
    }
    res.morph = accord_morph(inf, p0.lastname.as_ref(), p1.firstname.as_ref(), None, p1.end.next());
    let mut inf = *inf;
    if res.morph.gender == MorphGender::MASCULINE || res.morph.gender == MorphGender::FEMININE {
        if p0.lastname.as_ref().is_some_and(|l| !l.case().is_undefined()) {
            res.adjust("lastname_case_agrees", 1.0);
        }
        inf = res.morph;
    }
    manage_lastname(&mut res, p0, &inf);
    // МАМЕДОВ АХМЕД ОГЛЫ: the second item is the father's name
    if p1.firstname.is_none() && p1.middlename.is_some() && !p1.kin_gender.is_undefined() {
        manage_middlename(&mut res, p1, &inf);
    } else {
        manage_firstname(&mut res, p1, &inf);
    }
    correct_coef_for_lastname(&mut res, p0);
    if p0.chars != p1.chars {
        res.adjust("chars_mismatch", -1.0);
        if !p1.firstname.as_ref().is_some_and(|f| f.is_in_dictionary) || p1.chars.is_all_upper {
            res.adjust("chars_mismatch", -1.0);
        }
    } else if p0.chars.is_all_upper {
        res.adjust("all_upper", -0.5);
    }
    if p1.is_in_dictionary && !p1.firstname.as_ref().is_some_and(|f| f.is_in_dictionary) {
        res.adjust("firstname_common_word", -1.0);
    }
    correct_coef_after_name(ctx, &mut res, items, ind + 2);
    if noun_phrase::try_parse(p1.end, NounPhraseParams::default())
        .is_some_and(|np| np.end.idx() != p1.end.idx())
    {
        res.adjust("firstname_in_noun_phrase", -1.0);
    }
    if ind == 0 {
        correct_coef_sns(ctx, &mut res, items, ind + 2);
    }
    if p0.end.next().is_some_and(|t| t.is_hiphen()) {
        res.adjust("hiphen_after_lastname", -2.0);
    }
    if in_brackets(&res) {
        res.adjust("in_brackets", -2.0);
    }
    if p0.is_in_dictionary {
        let mc = p0.begin.morph_class_in_dictionary();
        if mc.is_pronoun() || mc.is_personal_pronoun() {
            return None;
        }
    }
    if items.len() == 2
        && ind == 0
        && items[0].chars.is_all_upper
        && items[1].chars.is_capital_upper
        && !items[1].is_in_dictionary
        && res.coef < 0.0
        && !items[1]
            .lastname
            .as_ref()
            .is_some_and(|l| l.has_std_postfix || l.is_in_dictionary || l.has_std_tail)
    {
        res.set_coef("upper_lastname_heading", 0.0);
    }
    if items.len() == 2
        && ind == 0
        && items[1].begin.is_value("ЛАВРА", None)
        && items[0].end.morph_info().class.is_adjective()
    {
        return None;
    }
    Some(res)
}

/// Surname-first reading of a three-word run whose third word may start
/// another name ("Иванов Иван Петров")
fn correct_coef_sns<'a>(
    ctx: &AnalysisContext<'a>,
    res: &mut NameCandidate<'a>,
    items: &[NameItem<'a>],
    ind_after: usize,
) {
    if ind_after >= items.len() || items.len() < 3 {
        return;
    }
    if !items[0].lastname.as_ref().is_some_and(|l| l.has_std_tail) {
        let stats = ctx.stats();
        let (Some(stat), Some(key_a), Some(key_b)) = (
            stats.word_info(items[1].begin),
            crate::statistics::word_key(items[2].begin),
            crate::statistics::word_key(items[0].begin),
        ) else {
            return;
        };
        if stats.word_info(items[2].begin).is_none() || stats.word_info(items[0].begin).is_none() {
            return;
        }
        let cou_a = stat.like_chars_after_words.get(&key_a).copied().unwrap_or(0);
        let cou_b = stat.like_chars_before_words.get(&key_b).copied().unwrap_or(0);
        let total = stat.total_count;
        if cou_a == total && cou_b < total {
            res.adjust("chain_of_names", -2.0);
        }
        return;
    }
    if items[1].firstname.is_none() {
        return;
    }
    let middle = if ind_after > 2 { items[2].middlename.as_ref() } else { None };
    let inf = MorphInfo::new();
    let first = items[1].firstname.as_ref();
    let mi1 = accord_morph(&inf, items[0].lastname.as_ref(), first, middle, None);
    if mi1.case.is_undefined() {
        res.adjust("sns_discord", -1.0);
    }
    let after = &items[ind_after];
    if !after.lastname.as_ref().is_some_and(|l| l.has_std_tail) {
        return;
    }
    let mi2 = accord_morph(&inf, after.lastname.as_ref(), first, middle, after.end.next());
    if !mi2.case.is_undefined() {
        res.adjust("next_lastname_agrees", -1.0);
    }
}

fn correct_coef_after_name<'a>(
    ctx: &AnalysisContext<'a>,
    res: &mut NameCandidate<'a>,
    items: &[NameItem<'a>],
    ind: usize,
) {
    if ind >= items.len() || ind == 0 {
        return;
    }
    let prev = &items[ind - 1];
    let cur = &items[ind];
    if prev.whitespaces_before() > prev.whitespaces_after() {
        res.adjust("spacing_after_name", -1.0);
    } else if prev.whitespaces_before() == prev.whitespaces_after()
        && (cur.lastname.is_some() || cur.firstname.is_some() || cur.middlename.is_some())
    {
        res.adjust("spacing_after_name", -1.0);
    }
    let mut t = prev.end.next();
    if let Some(tt) = t {
        if tt.next().is_some_and(|n| n.is_char(',')) {
            t = tt.next();
        }
    }
    if let Some(t) = t {
        if attribute::try_attach(ctx, t, AttachAttrs::ONLY_KEYWORD).is_some() {
            res.adjust("attribute_after", 1.0);
        }
    }
}

// ============================================================================
// Surname Name Secname
// ============================================================================

fn try_attach_surname_name_secname<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
    prev_has_this: bool,
    always: bool,
) -> Option<NameCandidate<'a>> {
    let (p0, p1, p2) = (items.get(ind)?, items.get(ind + 1)?, items.get(ind + 2)?);
    if p0.kind != ItemKind::Value || p1.kind != ItemKind::Value {
        return None;
    }
    if p0.lastname.is_none() && !prev_has_this {
        if ind > 0 {
            return None;
        }
        if items.len() == 3 && !always {
            let mut tt1 = p2.end.next();
            if let Some(t) = tt1 {
                if t.is_comma() {
                    tt1 = t.next();
                }
            }
            let attr_after = tt1.is_some_and(|t| {
                !t.is_newline_before()
                    && attribute::try_attach(ctx, t, AttachAttrs::ONLY_KEYWORD).is_some()
            });
            if !attr_after {
                return None;
            }
        }
    }
    if !always {
        if is_both_surnames(p0, p2) {
            return None;
        }
        let full_row = items.len() == 3 && ind == 0 && items[2].middlename.is_some();
        if is_both_surnames(p0, p1) && !full_row {
            return None;
        }
    }
    if p1.begin.chars().is_all_upper
        && !p0.begin.chars().is_all_upper
        && !p1.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
    {
        return None;
    }
    if p2.begin.chars().is_all_upper
        && !p0.begin.chars().is_all_upper
        && p2.kind == ItemKind::Value
        && !p2.middlename.as_ref().is_some_and(|m| m.is_in_dictionary)
    {
        return None;
    }
    let mut res = NameCandidate::new(FioTemplate::SurnameNameSecname, p0.begin, p2.end);
    if p2.middlename.is_none() {
        if ind + 2 == items.len() - 1 && prev_has_this {
            res.adjust("previous_template", 1.0);
        } else if p1.firstname.is_some() && p2.firstname.is_some() {
        } else if !always {
            return None;
        }
    }
    res.adjust("not_at_start", -(ind as f64));
    let table_row = p0.begin.previous().is_some_and(|t| t.is_table_control_char());
    for pit in [p0, p1] {
        let own_line = p0.is_newline_before() && p2.is_newline_after();
        if pit.is_newline_after() && !own_line && !table_row {
            res.adjust("newline_inside_name", -1.0);
            if pit.whitespaces_after() > 15 {
                res.adjust("newline_inside_name", -1.0);
            }
        }
    }
    let mut inf = *inf;
    if let Some(m) = &p2.middlename {
        if !m.case().is_undefined() && !inf.case.intersects(m.case()) {
            inf = MorphInfo::new();
        }
    }
    res.morph = accord_morph(
        &inf,
        p0.lastname.as_ref(),
        p1.firstname.as_ref(),
        p2.middlename.as_ref(),
        p2.end.next(),
    );
    if res.morph.gender == MorphGender::MASCULINE || res.morph.gender == MorphGender::FEMININE {
        res.adjust("gender_agrees", 1.5);
        inf = res.morph;
    }
    manage_lastname(&mut res, p0, &inf);
    correct_coef_for_lastname(&mut res, p0);
    manage_firstname(&mut res, p1, &inf);
    match &p2.middlename {
        Some(m) if !m.vars.is_empty() => {
            res.adjust("middlename_role", 1.0);
            res.middlename = Some(middlename_from_part(m, &inf));
            if p1.firstname.is_some() && items.len() == 3 && !p0.is_in_dictionary {
                res.adjust("full_name", 1.0);
            }
        }
        _ => manage_middlename(&mut res, p2, &inf),
    }
    if p0.chars != p1.chars || p0.chars != p2.chars {
        res.adjust("chars_mismatch", -1.0);
        if p0.chars.is_all_upper && p1.chars.is_capital_upper && p2.chars.is_capital_upper {
            res.adjust("upper_lastname", 2.0);
        }
    }
    if p0.begin.is_word()
        && (p0.begin.is_value("УВАЖАЕМЫЙ", None) || p0.begin.is_value("ДОРОГОЙ", None))
    {
        res.adjust("greeting", -2.0);
    }
    correct_coef_after_name(ctx, &mut res, items, ind + 3);
    if ind == 0 {
        correct_coef_sns(ctx, &mut res, items, ind + 3);
    }
    if p0.is_in_dictionary && p1.is_in_dictionary && p2.is_in_dictionary {
        res.adjust("common_words", -1.0);
    } else if p0.is_in_dictionary
        && p0.chars.is_capital_upper
        && can_be_start_of_sentence(p0.begin)
    {
        let mc = p0.begin.morph_class_in_dictionary();
        if mc.is_adverb() || mc.is_verb() || mc.is_preposition() || mc.is_conjunction() {
            res.adjust("sentence_start_word", -1.0);
        }
    }
    Some(res)
}

/// Reading forced by configuration: documents known to start every name
/// with the surname
pub fn create_template<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    template: FioTemplate,
    inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    match template {
        FioTemplate::SurnameNameSecname => {
            try_attach_surname_name_secname(ctx, items, 0, inf, false, true)
        }
        _ => None,
    }
}

// ============================================================================
// Surname with initials
// ============================================================================

fn try_attach_surname_ii<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    let (p0, p1) = (items.get(ind)?, items.get(ind + 1)?);
    if p1.kind != ItemKind::Initial || p0.kind == ItemKind::Initial || p0.is_newline_after() {
        return None;
    }
    let lastname = p0.lastname.as_ref()?;
    let mut res = NameCandidate::new(FioTemplate::SurnameI, p0.begin, p1.end);
    res.adjust("not_at_start", -(ind as f64));
    manage_lastname(&mut res, p0, inf);
    let china = p0.is_asian_item(false) && lastname.is_china_surname(ctx.morphology());
    if !china && p0.firstname.as_ref().is_some_and(|f| f.is_in_dictionary) && !lastname.has_std_tail
    {
        let glued = ind == 0
            && items.len() == 3
            && !items[1].is_newline_after()
            && !items[2].end.is_whitespace_after();
        if !glued {
            res.adjust("lastname_is_firstname", -2.0);
        }
    }
    res.morph = lastname.morph();
    let g = res.lastname.as_ref().map_or(MorphGender::UNDEFINED, MorphVariantCollection::gender);
    if !g.is_undefined() {
        res.morph.gender = g;
    }
    if p0.whitespaces_after() < 2 {
        res.adjust("initial_close", 0.5);
    }
    res.firstname = Some(initial_collection(p1));
    let mut i1 = ind + 2;
    if let Some(p2) = items.get(i1).filter(|p| p.kind == ItemKind::Initial) {
        res.template = FioTemplate::SurnameII;
        res.end = p2.end;
        res.middlename = Some(initial_collection(p2));
        if p2.whitespaces_before() < 2 {
            res.adjust("initial_close", 0.5);
        }
        i1 += 1;
    }
    if i1 >= items.len() {
        if items[0].lastname.as_ref().is_some_and(|l| l.is_in_dictionary || l.is_in_ontology)
            && items[0].firstname.is_none()
        {
            res.adjust("known_lastname_alone", 1.0);
        }
        return Some(res);
    }
    let next = &items[i1];
    if p0.whitespaces_after() > next.whitespaces_before() {
        res.adjust("spacing_before_next", -1.0);
    } else if p0.whitespaces_after() == next.whitespaces_before() && next.lastname.is_some() {
        let initials_follow = i1 + 3 == items.len()
            && items[i1 + 1].kind == ItemKind::Initial
            && items[i1 + 2].kind == ItemKind::Initial;
        if !initials_follow {
            if !(next.is_in_dictionary && next.begin.morph_class_in_dictionary().is_noun()) {
                res.adjust("next_is_lastname", -1.0);
            }
            let mut alone = true;
            let mut cur = Some(p0.begin);
            while let Some(tt) = cur {
                if tt.is_newline_before() {
                    break;
                }
                let other_word =
                    tt.is_word() && tt.chars().is_letter && tt.idx() != p0.begin.idx();
                if tt.referent().is_some() || other_word {
                    alone = false;
                    break;
                }
                cur = tt.previous();
            }
            if alone {
                res.adjust("line_start", 1.0);
            }
        }
    }
    let first = items[0].begin;
    let mc = first.morph_class_in_dictionary();
    if !mc.is_proper() && mc.is_noun() {
        if !first.morph_info().number.contains(MorphNumber::PLURAL) {
            res.adjust("lastname_is_noun", -1.0);
        } else if first.is_value("ГЛАВА", None)
            || first.is_value("ЧАСТЬ", Some("ЧАСТИНА"))
            || first.is_value("СТАТЬЯ", Some("СТАТТЯ"))
        {
            return None;
        }
    }
    Some(res)
}

fn try_attach_ii_surname<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    let p0 = items.get(ind)?;
    if ind + 1 >= items.len() || p0.kind != ItemKind::Initial {
        return None;
    }
    if ind > 0 && items[ind - 1].kind == ItemKind::Initial {
        return None;
    }
    if p0.is_newline_after() {
        return None;
    }
    let mut res = NameCandidate::new(FioTemplate::ISurname, p0.begin, items[ind + 1].end);
    res.adjust("not_at_start", -(ind as f64));
    res.firstname = Some(initial_collection(p0));
    let mut i1 = ind + 1;
    if items[i1].kind == ItemKind::Initial {
        res.template = FioTemplate::IISurname;
        res.middlename = Some(initial_collection(&items[i1]));
        if items[i1].whitespaces_before() < 2 {
            res.adjust("initial_close", 0.5);
        }
        i1 += 1;
    }
    let sur = items.get(i1).filter(|p| p.kind == ItemKind::Value)?;
    if sur.is_newline_before() && !sur.is_newline_after() {
        return None;
    }
    res.end = sur.end;
    let mut prev: Option<NameItem<'a>> = None;
    if !p0.is_newline_before() {
        if ind > 0 {
            prev = Some(items[ind - 1].clone());
        } else if let Some(pt) = p0.begin.previous() {
            let attrs = if sur.chars.is_latin_letter {
                ParseAttrs::CAN_BE_LATIN
            } else {
                ParseAttrs::NO
            };
            prev = segmenter::attach_single(ctx, pt, attrs, None);
            if let Some(p) = &prev {
                if attribute::try_attach_word(ctx, p.begin, true).is_some() {
                    prev = None;
                    res.adjust("attribute_before", 1.0);
                }
            }
        }
    }
    manage_lastname(&mut res, sur, inf);
    if sur.lastname.as_ref().is_some_and(|l| l.is_in_ontology) {
        res.adjust("lastname_known", 1.0);
    }
    if sur.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
        && !sur.lastname.as_ref().is_some_and(|l| l.has_std_tail || l.is_in_ontology)
    {
        res.adjust("lastname_is_firstname", -2.0);
    }
    if let Some(prev) = &prev {
        let mc = prev.begin.morph_class_in_dictionary();
        if mc.is_preposition() || mc.is_adverb() || mc.is_verb() {
            res.adjust("function_word_before", ind as f64);
            if sur.lastname.as_ref().is_some_and(|l| l.is_in_dictionary || l.is_in_ontology) {
                res.adjust("function_word_before", 1.0);
            }
        }
        if prev.lastname.as_ref().is_some_and(|l| l.has_std_tail || l.is_in_dictionary) {
            res.adjust("lastname_before", -1.0);
        }
    }
    res.morph = match &sur.lastname {
        Some(l) => l.morph(),
        None => sur.morph,
    };
    let g = res.lastname.as_ref().map_or(MorphGender::UNDEFINED, MorphVariantCollection::gender);
    if !g.is_undefined() {
        res.morph.gender = g;
    }
    let glued_to_prev =
        !p0.is_newline_before() && p0.whitespaces_before() < 2 && prev.is_some();
    if sur.whitespaces_before() < 2 && !glued_to_prev {
        res.adjust("lastname_close", 0.5);
    }
    let Some(prev) = prev else {
        let next = sur.end.next();
        if (p0.is_newline_before() && sur.is_newline_after())
            || next.is_some_and(|t| t.is_char_of(";,.") || t.morph_info().class.is_conjunction())
            || sur.is_newline_after()
        {
            res.adjust("closed_mention", 1.0);
        }
        return Some(res);
    };
    if prev.whitespaces_after() < sur.whitespaces_before() {
        res.adjust("spacing_after_prev", -1.0);
    } else if prev.whitespaces_after() == sur.whitespaces_before() && prev.lastname.is_some() {
        res.adjust("spacing_after_prev", -1.0);
    }
    Some(res)
}

// ============================================================================
// King
// ============================================================================

/// Monarch or pope with a regnal number: "Петр Первый", "Людовик XIV",
/// "Иван Васильевич IV". Without a number the reading needs a preceding
/// royal title.
pub fn try_attach_king<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
    prev_has_this: bool,
) -> Option<NameCandidate<'a>> {
    if ind > 0 || items.is_empty() {
        return None;
    }
    let p0 = &items[0];
    if p0.begin.newlines_before() > 0 {
        return None;
    }
    if p0.firstname.is_none() && (p0.is_in_dictionary || !p0.chars.is_cyrillic_letter) {
        return None;
    }
    if p0.begin.is_value("ТОМ", None) || p0.kind != ItemKind::Value {
        return None;
    }
    let i = if items.len() > 1 && (items[1].firstname.is_some() || items[1].middlename.is_some()) {
        1
    } else {
        0
    };
    let mut num: u64 = 0;
    let mut roman = false;
    let mut numt: Option<TokenRef<'a>> = None;
    let t = items[i].end.next();
    if let Some(nv) = t.and_then(|t| t.number().map(|n| (t, n))) {
        let (t, n) = nv;
        if items[i].whitespaces_after() > 2 || t.chars().is_all_lower {
            return None;
        }
        if !n.is_adjective {
            return None;
        }
        num = n.value;
        numt = Some(t);
    } else {
        if i + 2 < items.len() && items[i + 1].kind == ItemKind::Initial {
            return None;
        }
        if let Some(t) = t {
            if let Some(v) = try_parse_roman(t) {
                if v != 100 && t.whitespaces_before() < 3 && t.chars().is_all_upper {
                    num = v;
                    roman = true;
                    numt = Some(t);
                }
            }
        }
    }
    if num < 1 {
        let mut ok = false;
        if (p0.firstname.is_some() || items.len() == 1) && prev_has_this {
            if items.len() == 1 {
                ok = true;
            } else if items.len() == 2
                && (p0.end.next().is_some_and(|t| t.is_hiphen()) || items[1].firstname.is_some())
            {
                ok = true;
            }
        }
        if !ok {
            return None;
        }
    }
    let mut res = NameCandidate::new(FioTemplate::King, p0.begin, p0.end);
    let p3 = if items.len() == 2 {
        items[1].middlename.as_ref().or(items[1].firstname.as_ref())
    } else {
        None
    };
    let next = items[if items.len() == 2 { 1 } else { 0 }].end.next();
    res.morph = accord_morph(inf, None, p0.firstname.as_ref(), p3, next);
    let mut inf = *inf;
    if res.morph.gender == MorphGender::MASCULINE || res.morph.gender == MorphGender::FEMININE {
        inf = res.morph;
    }
    if inf.gender != MorphGender::FEMININE && inf.gender != MorphGender::MASCULINE {
        if !roman {
            return None;
        }
        // Людовик XIV, Екатерина II: a ruler is masculine unless the name
        // only has feminine readings
        let feminine = p0.firstname.as_ref().is_some_and(|f| {
            !f.vars.is_empty() && f.vars.iter().all(|v| v.gender == MorphGender::FEMININE)
        });
        inf.gender = if feminine { MorphGender::FEMININE } else { MorphGender::MASCULINE };
        res.morph.gender = inf.gender;
    }
    if p0.firstname.is_some() {
        manage_firstname(&mut res, p0, &inf);
    } else {
        manage_lastname(&mut res, p0, &inf);
    }
    if i > 0 {
        manage_middlename(&mut res, &items[1], &inf);
        res.end = items[1].end;
    }
    if let (true, Some(numt)) = (num > 0, numt) {
        if res.firstname.is_none() {
            res.firstname = res.lastname.take();
        }
        let mut regnal = MorphVariantCollection::new();
        regnal.number = u32::try_from(num).unwrap_or(u32::MAX);
        res.lastname = Some(regnal);
        res.end = numt;
        if i == 0 && numt.whitespaces_after() < 2 {
            if let Some(after) = numt.next() {
                if let Some(pits1) = segmenter::attach_list(ctx, after, ParseAttrs::NO, 2) {
                    if pits1.len() == 1 && pits1[0].firstname.is_some() {
                        manage_middlename(&mut res, &pits1[0], &inf);
                        res.end = pits1[0].end;
                    }
                }
            }
        }
    }
    res.set_coef("regnal", if num > 0 { 3.0 } else { 2.0 });
    Some(res)
}

// ============================================================================
// Arabic and Asian names
// ============================================================================

/// Long chains of capitalised names ("Абу Али Хусейн ибн Абдуллах")
fn try_attach_arabic<'a>(
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    if ind > 0 || items.len() < 3 {
        return None;
    }
    let mut has_hiphen = false;
    let mut errs = 0;
    let mut i = 0;
    while i < items.len() {
        let p = &items[i];
        if i > 0 && p.whitespaces_before() > 2 {
            break;
        }
        if p.middlename.is_some() || p.value.is_empty() {
            return None;
        }
        if p.value.find('-').is_some_and(|k| k > 0) {
            has_hiphen = true;
            i += 1;
            continue;
        }
        if !p.chars.is_capital_upper {
            break;
        }
        if p.is_in_dictionary && p.firstname.is_none() {
            errs += 1;
        }
        i += 1;
    }
    // АБУ-БАКР ИБН-МУХАММЕД АЛЬ-ХАСАН: particles already glued into the items
    let glued = items[..i].iter().filter(|p| p.has_sur_prefix).count();
    let min_len = if glued >= 2 { 3 } else { 4 };
    if i < min_len || errs > 1 {
        return None;
    }
    if (i < 5 || i != items.len()) && !has_hiphen {
        let all_names = items.len() == 4
            && i == items.len()
            && items[..3].iter().all(|p| p.firstname.is_some())
            && items[3].firstname.is_none()
            && items[3].middlename.is_none();
        if !all_names {
            return None;
        }
    }
    let mut res = NameCandidate::new(FioTemplate::Arabic, items[0].begin, items[i - 1].end);
    res.set_coef("arabic_chain", if has_hiphen { 3.0 } else { 2.0 });
    res.morph = items[0].morph;
    if items[0].firstname.is_some() {
        manage_firstname(&mut res, &items[0], inf);
        res.lastname = res.firstname.take();
    } else if items[0].lastname.is_some() {
        manage_lastname(&mut res, &items[0], inf);
    } else {
        let last = MorphVariantCollection::from_value(&items[0].value, MorphGender::UNDEFINED);
        res.lastname = Some(last);
    }
    let tail: Vec<&str> = items[1..i].iter().map(|p| p.value.as_str()).collect();
    if let Some(head) = res.lastname.take() {
        let mut joined = MorphVariantCollection::new();
        for v in head.items() {
            let mut value = v.value.clone();
            for t in &tail {
                value.push(' ');
                value.push_str(t);
            }
            joined.add(&value, None, v.gender, None);
        }
        res.lastname = Some(joined);
    }
    Some(res)
}

fn noun_normal_case(t: TokenRef<'_>) -> String {
    t.morph()
        .iter()
        .find(|f| f.class.is_noun())
        .map_or_else(|| t.term().to_string(), |f| f.normal_case.clone())
}

/// Chinese, Korean and Vietnamese names of `cou` syllable items
fn try_attach_asian<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
    cou: usize,
    _prev_has_this: bool,
) -> Option<NameCandidate<'a>> {
    if ind > 0 || items.len() < 2 || (items.len() != cou && items.len() != cou * 2) {
        return None;
    }
    let china = items[0]
        .lastname
        .as_ref()
        .is_some_and(|l| l.is_china_surname(ctx.morphology()))
        || ctx.morphology().is_china_surname(&items[0].value);
    if china && items[0].chars.is_capital_upper {
        if cou == 3 {
            if !items[1].is_asian_item(false) || !items[2].is_asian_item(true) {
                return None;
            }
        } else if items[1].kind != ItemKind::Value {
            return None;
        }
    } else if cou == 3 {
        if !items[0].is_asian_item(false)
            || !items[1].is_asian_item(false)
            || !items[2].is_asian_item(true)
        {
            return None;
        }
    } else if !items[0].is_asian_item(false) || !items[1].is_asian_item(true) {
        return None;
    }
    if items[0].begin.morph_class_in_dictionary().is_pronoun() && items[1].firstname.is_some() {
        return None;
    }
    let last = cou - 1;
    let pl = &items[last];
    let mut res = NameCandidate::new(FioTemplate::AsianName, items[0].begin, pl.end);
    if pl.lastname.is_some() {
        res.morph = accord_morph(inf, pl.lastname.as_ref(), None, None, pl.end.next());
    }
    let mut inf = *inf;
    if !res.morph.case.is_undefined() {
        inf = res.morph;
    }
    if china {
        res.template = FioTemplate::AsianSurnameName;
        res.set_coef("asian_surname", 2.0);
        if items[1].is_asian_item(true) {
            res.adjust("asian_syllable", 1.0);
        }
        manage_lastname(&mut res, &items[0], &inf);
        let tr = del_surname_end(&items[0].value);
        if tr != items[0].value {
            if let Some(l) = res.lastname.as_mut() {
                l.add(&tr, None, MorphGender::MASCULINE, None);
            }
        }
        let mut first = MorphVariantCollection::new();
        let mut pref = if last == 2 { items[1].value.clone() } else { String::new() };
        if pl.is_asian_item(false) {
            for g in [MorphGender::MASCULINE, MorphGender::FEMININE] {
                first.add(&format!("{pref}{}", pl.value), None, g, None);
            }
            if !pref.is_empty() {
                for g in [MorphGender::MASCULINE, MorphGender::FEMININE] {
                    first.add(&format!("{pref}-{}", pl.value), None, g, None);
                }
            }
        } else {
            let mut v = del_surname_end(&pl.value);
            if pref.is_empty() {
                if let Some(k) = v.find('-').filter(|&k| k > 0) {
                    pref = v[..k].to_string();
                    v = v[k + 1..].to_string();
                }
            }
            first.add(&format!("{pref}{v}"), None, MorphGender::MASCULINE, None);
            if !pref.is_empty() {
                first.add(&format!("{pref}-{v}"), None, MorphGender::MASCULINE, None);
            }
            let ss = noun_normal_case(pl.end);
            if ss != v && ss.chars().count() <= v.chars().count() {
                first.add(&format!("{pref}{ss}"), None, MorphGender::MASCULINE, None);
                if !pref.is_empty() {
                    first.add(&format!("{pref}-{ss}"), None, MorphGender::MASCULINE, None);
                }
            }
        }
        res.firstname = Some(first);
    } else {
        if inf.gender == MorphGender::MASCULINE {
            manage_lastname(&mut res, pl, &inf);
        } else {
            let mut col = MorphVariantCollection::new();
            if pl.is_asian_item(false) {
                col.add(&pl.value, None, MorphGender::MASCULINE, None);
                col.add(&pl.value, None, MorphGender::FEMININE, None);
            } else {
                let v = del_surname_end(&pl.value);
                col.add(&v, None, MorphGender::MASCULINE, None);
                let ss = noun_normal_case(pl.end);
                if ss != v && ss.chars().count() <= v.chars().count() {
                    col.add(&ss, None, MorphGender::MASCULINE, None);
                }
            }
            res.lastname = Some(col);
        }
        let prefix = if last == 2 {
            res.set_coef("asian_name", 2.0);
            if pl.end.whitespaces_after() < 2 && items.len() > 3 {
                res.adjust("asian_glued", -1.0);
            }
            format!("{} {} ", items[0].value, items[1].value)
        } else {
            res.set_coef("asian_name", 1.0);
            format!("{} ", items[0].value)
        };
        if let Some(l) = res.lastname.as_mut() {
            l.add_prefix_str(&prefix);
        }
        for p in items.iter().filter(|p| p.is_in_dictionary) {
            let mc = p.begin.morph_class_in_dictionary();
            if mc.is_conjunction()
                || mc.is_pronoun()
                || mc.is_preposition()
                || mc.is_personal_pronoun()
            {
                res.adjust("asian_function_word", -0.5);
            }
        }
    }
    if items[0].value == items[1].value {
        res.adjust("asian_repeat", -0.5);
    }
    if last == 2 {
        if items[0].value == items[2].value {
            res.adjust("asian_repeat", -0.5);
        }
        if items[1].value == items[2].value {
            res.adjust("asian_repeat", -0.5);
        }
    }
    if !pl.end.is_whitespace_after() {
        if let Some(t) = pl.end.next() {
            if t.is_hiphen() {
                res.adjust("asian_glued", -0.5);
            }
            if is_bracket(t) && !is_open_bracket(t) {
                res.adjust("asian_glued", -0.5);
            }
        }
    }
    if items[0].begin.previous().is_some_and(is_open_bracket) {
        res.adjust("asian_glued", -0.5);
    }
    Some(res)
}

// ============================================================================
// Identity and global names
// ============================================================================

/// Whole-name reading for names that are not split into roles: 2-3 value
/// items in the same letter case, or a single referent item
pub fn try_attach_identity<'a>(
    items: &[NameItem<'a>],
    inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    if items.len() == 1 {
        if items[0].kind != ItemKind::Referent {
            return None;
        }
    } else {
        if items.len() != 2 && items.len() != 3 {
            return None;
        }
        if items.iter().any(|p| p.kind != ItemKind::Value || p.chars != items[0].chars) {
            return None;
        }
    }
    let begin = items[0].begin;
    let end = items[items.len() - 1].end;
    if !begin.is_word() || !end.is_word() {
        return None;
    }
    let s = text_value(begin, end);
    if s.chars().count() > 100 {
        return None;
    }
    let mut tmp = String::new();
    for t in begin.until(end) {
        if !t.is_word() {
            continue;
        }
        if t.is_hiphen() {
            tmp.push('-');
            continue;
        }
        if !tmp.is_empty() && !tmp.ends_with('-') {
            tmp.push(' ');
        }
        let term = t.term();
        if t.length_char() < 3 {
            tmp.push_str(term);
            continue;
        }
        let shortest = t
            .morph()
            .iter()
            .map(|wf| wf.normal_case.as_str())
            .filter(|n| !n.is_empty() && n.chars().count() < term.chars().count())
            .min_by_key(|n| n.chars().count())
            .unwrap_or(term);
        tmp.push_str(shortest);
    }
    let mut col = MorphVariantCollection::new();
    if inf.case.is_nominative() {
        col.add(&s, None, MorphGender::UNDEFINED, None);
        if s != tmp {
            col.add(&tmp, None, MorphGender::UNDEFINED, None);
        }
    } else {
        if s != tmp {
            col.add(&tmp, None, MorphGender::UNDEFINED, None);
        }
        col.add(&s, None, MorphGender::UNDEFINED, None);
    }
    let mut res = NameCandidate::new(FioTemplate::Identity, begin, end);
    res.lastname = Some(col);
    for (i, p) in items.iter().enumerate() {
        if i > 0 {
            if p.is_newline_before() {
                res.adjust("identity_newline", -1.0);
            } else if p.whitespaces_before() > 1 {
                res.adjust("identity_spacing", -0.5);
            }
        }
        res.adjust("identity_item", 0.5);
        if p.length_char() > 4 {
            if p.is_in_dictionary {
                res.adjust("identity_common_word", -1.5);
            }
            if p.lastname.as_ref().is_some_and(|l| l.is_in_dictionary || l.is_in_ontology) {
                res.adjust("identity_known_lastname", -1.0);
            }
            if p.firstname.as_ref().is_some_and(|f| f.is_in_dictionary) {
                res.adjust("identity_known_firstname", -1.0);
            }
            if p.middlename.is_some() {
                res.adjust("identity_patronymic", -1.0);
            }
            if p.chars.is_all_upper {
                res.adjust("identity_upper", -0.5);
            }
        } else if p.chars.is_all_upper {
            res.adjust("identity_upper", -1.0);
        }
    }
    if items.len() == 2
        && items[1].lastname.as_ref().is_some_and(|l| l.has_std_tail || l.is_in_dictionary)
    {
        res.adjust("identity_std_lastname", -0.5);
    }
    Some(res)
}

fn epithet_form(masculine: &str, male: bool) -> String {
    if male {
        return masculine.to_string();
    }
    let stem = ["ИЙ", "ЫЙ", "ОЙ"].iter().find_map(|s| masculine.strip_suffix(s));
    match stem {
        Some(stem) => format!("{stem}АЯ"),
        None => masculine.to_string(),
    }
}

/// Globally known persons and saints: "Иван Грозный", "Екатерина Великая",
/// "святой Николай"
fn try_attach_global<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    _inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    if ind > 0 || items.is_empty() || items[0].kind != ItemKind::Value {
        return None;
    }
    let values: Vec<&str> = items.iter().map(|p| p.value.as_str()).collect();
    if values == ["АУН", "САН", "СУ", "ЧЖИ"] {
        let mut res = NameCandidate::new(FioTemplate::Global, items[0].begin, items[3].end);
        let mut p = PersonReferent::new();
        p.identities.push("АУН САН СУ ЧЖИ".to_string());
        p.set_gender(MorphGender::FEMININE);
        res.referent = Some(p);
        res.set_coef("global_name", 10.0);
        return Some(res);
    }
    if items.len() != 2 {
        return None;
    }
    let (p0, p1) = (&items[0], &items[1]);
    if p0.firstname.as_ref().is_some_and(|f| f.is_in_dictionary) {
        for (name, nick) in [("ИВАН", "ГРОЗНЫЙ"), ("ЮРИЙ", "ДОЛГОРУКИЙ")] {
            if p0.begin.is_value(name, None) && p1.begin.is_value(nick, None) {
                let mut res = NameCandidate::new(FioTemplate::Global, p0.begin, p1.end);
                let mut p = PersonReferent::new();
                p.firstnames.push(name.to_string());
                p.add_nickname(nick);
                p.set_gender(MorphGender::MASCULINE);
                let first = MorphVariantCollection::from_value(name, MorphGender::MASCULINE);
                res.firstname = Some(first);
                res.referent = Some(p);
                res.set_coef("global_name", 10.0);
                return Some(res);
            }
        }
        if let Some(epithet) = GLOBAL_EPITHETS.iter().find(|e| p1.begin.is_value(e, None)) {
            return global_with_epithet(ctx, p0, p1, p0, p1, epithet);
        }
    }
    if p1.firstname.as_ref().is_some_and(|f| f.is_in_dictionary) {
        if let Some(epithet) = GLOBAL_EPITHETS[1..].iter().find(|e| p0.begin.is_value(e, None)) {
            return global_with_epithet(ctx, p0, p1, p1, p0, epithet);
        }
    }
    None
}

fn global_with_epithet<'a>(
    _ctx: &AnalysisContext<'a>,
    first: &NameItem<'a>,
    last: &NameItem<'a>,
    name: &NameItem<'a>,
    epithet_item: &NameItem<'a>,
    epithet: &str,
) -> Option<NameCandidate<'a>> {
    let fg = name.firstname.as_ref().map_or(MorphGender::UNDEFINED, |f| f.morph().gender);
    let eg = epithet_item.morph.gender;
    let epithet_before = epithet_item.begin.idx() < name.begin.idx();
    let male = if fg == MorphGender::FEMININE || (epithet_before && eg == MorphGender::FEMININE) {
        false
    } else if fg == MorphGender::MASCULINE || eg.intersects(MorphGender::MASCULINE) {
        true
    } else {
        return None;
    };
    let mut res = NameCandidate::new(FioTemplate::Global, first.begin, last.end);
    manage_firstname(&mut res, name, &epithet_item.morph);
    let mut p = PersonReferent::new();
    p.set_gender(if male { MorphGender::MASCULINE } else { MorphGender::FEMININE });
    p.add_fio_identity(None, res.firstname.clone(), None);
    p.add_nickname(&epithet_form(epithet, male));
    res.referent = Some(p);
    res.set_coef("global_name", 10.0);
    Some(res)
}

// ============================================================================
// Local ontology
// ============================================================================

fn person_has_value(p: &PersonReferent, value: &str) -> bool {
    [&p.lastnames, &p.firstnames, &p.middlenames, &p.undefnames, &p.nicknames]
        .iter()
        .any(|slot| slot.iter().any(|v| v == value))
}

/// A confident surname read on its own ("Smith" after a Latin first name)
pub fn try_attach_latin_surname(pit: &NameItem<'_>) -> Option<PersonReferent> {
    let l = pit.lastname.as_ref()?;
    if !l.is_in_dictionary && !l.has_std_tail {
        return None;
    }
    let v = l.vars.first()?;
    let mut p = PersonReferent::new();
    p.lastnames.push(v.value.clone());
    Some(p)
}

fn candidate_referent(v: &NameCandidate<'_>) -> PersonReferent {
    let mut p = PersonReferent::new();
    if v.template == FioTemplate::AsianName {
        if let Some(l) = &v.lastname {
            p.add_identity(l);
        }
    } else {
        p.add_fio_identity(v.lastname.clone(), v.firstname.clone(), v.middlename.clone());
    }
    p
}

/// Best-scored reading that agrees with the known person; a stronger
/// reading that contradicts it cancels the choice
fn pick_onto_variant<'a>(
    pers: &PersonReferent,
    vars: &mut Vec<NameCandidate<'a>>,
) -> Option<NameCandidate<'a>> {
    let mut best: Option<usize> = None;
    for (i, v) in vars.iter().enumerate() {
        if v.coef < 0.0 {
            continue;
        }
        let equal = v
            .referent
            .as_ref()
            .is_some_and(|p| pers.can_be_equals(p, EqualityMode::WithinOneText));
        match best {
            Some(b) if !equal && vars[b].coef <= v.coef => best = None,
            Some(b) if equal && vars[b].coef < v.coef => best = Some(i),
            None if equal => best = Some(i),
            _ => {}
        }
    }
    best.map(|b| vars.remove(b))
}

/// Known person unambiguously named by a single item
pub fn try_attach_onto_for_single<'a>(
    ctx: &AnalysisContext<'a>,
    pit: &NameItem<'a>,
) -> Option<PersonId> {
    if pit.kind == ItemKind::Initial || pit.value.is_empty() || ctx.person_count() > 30 {
        return None;
    }
    let (found, by_firstname) = ctx.with_persons(|persons| {
        let mut found = None;
        let mut cou = 0;
        let mut fi = false;
        for (i, p) in persons.iter().enumerate() {
            let mut hit = false;
            if let Some(f) = &pit.firstname {
                if f.vars.iter().any(|v| p.firstnames.contains(&v.value)) {
                    hit = true;
                    fi = true;
                }
            }
            if let Some(l) = &pit.lastname {
                if l.vars.iter().any(|v| p.lastnames.contains(&v.value)) {
                    hit = true;
                }
            }
            if !hit {
                if p.firstnames.contains(&pit.value) {
                    hit = true;
                    fi = true;
                } else if p.lastnames.contains(&pit.value) {
                    hit = true;
                }
            }
            if hit {
                found = Some(PersonId(i));
                cou += 1;
            }
        }
        (if cou == 1 { found } else { None }, fi)
    });
    let id = found?;
    if by_firstname
        && try_attach_king(ctx, std::slice::from_ref(pit), 0, &pit.morph, false).is_some()
    {
        return None;
    }
    Some(id)
}

/// Known person named by first name and patronymic ("Иван Петрович")
pub fn try_attach_onto_for_duble<'a>(
    ctx: &AnalysisContext<'a>,
    pit0: &NameItem<'a>,
    pit1: &NameItem<'a>,
) -> Option<PersonId> {
    let first = pit0.firstname.as_ref()?;
    let middle = pit1.middlename.as_ref()?.vars.first()?;
    if ctx.person_count() > 100 {
        return None;
    }
    ctx.with_persons(|persons| {
        let hits: Vec<usize> = persons
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                first.vars.iter().any(|v| p.firstnames.contains(&v.value))
                    && p.middlenames.contains(&middle.value)
            })
            .map(|(i, _)| i)
            .collect();
        match hits.as_slice() {
            [i] => Some(PersonId(*i)),
            _ => None,
        }
    })
}

/// Known persons whose surname or whole name matches the item; the flag
/// marks whole-name matches
fn onto_matches<'a>(ctx: &AnalysisContext<'a>, pit: &NameItem<'a>) -> Vec<(PersonId, bool)> {
    let mut res: Vec<(PersonId, bool)> = Vec::new();
    let mut push = |id: PersonId, ident: bool| {
        if !res.iter().any(|(r, _)| *r == id) {
            res.push((id, ident));
        }
    };
    for id in ctx.find_persons_by_lastname(&pit.value) {
        push(id, false);
    }
    if let Some(l) = &pit.lastname {
        for v in &l.vars {
            for id in ctx.find_persons_by_lastname(&v.value) {
                push(id, false);
            }
        }
    }
    let idents: Vec<PersonId> = ctx.with_persons(|persons| {
        persons
            .iter()
            .enumerate()
            .filter(|(_, p)| p.identities.iter().any(|s| s.split(' ').any(|w| w == pit.value)))
            .map(|(i, _)| PersonId(i))
            .collect()
    });
    for id in idents {
        push(id, true);
    }
    res
}

/// Reading of the items around `ind` that agrees with exactly one known
/// person whose surname (or whole name) the item at `ind` carries
pub fn try_attach_onto_int<'a>(
    ctx: &AnalysisContext<'a>,
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
    after_attribute: bool,
) -> Option<NameCandidate<'a>> {
    let pit_at = items.get(ind)?;
    if pit_at.kind == ItemKind::Initial || !ctx.ontology_enabled() {
        return None;
    }
    let matches = onto_matches(ctx, pit_at);
    if matches.is_empty() {
        return None;
    }
    let mut res: Vec<(NameCandidate<'a>, PersonId)> = Vec::new();
    for (id, ident) in matches {
        let Some(pers) = ctx.person(id) else {
            continue;
        };
        if ident {
            if ind != 0 {
                continue;
            }
            let Some(mut pit) = try_attach_identity(items, inf) else {
                continue;
            };
            let mut p = PersonReferent::new();
            if let Some(l) = &pit.lastname {
                p.add_identity(l);
            }
            pit.referent = Some(p);
            res.push((pit, id));
            continue;
        }
        if (inf.gender == MorphGender::MASCULINE && pers.is_female)
            || (inf.gender == MorphGender::FEMININE && pers.is_male)
        {
            continue;
        }
        let mut inf0 = *inf;
        if pers.is_male {
            inf0.gender = MorphGender::MASCULINE;
        } else if pers.is_female {
            inf0.gender = MorphGender::FEMININE;
        }
        let mut vars: Vec<NameCandidate<'a>> = Vec::new();
        if ind > 1 {
            vars.extend(try_attach_ii_surname(ctx, items, ind - 2, &inf0));
            vars.extend(try_attach_name_secname_surname(ctx, items, ind - 2, &inf0, false));
        }
        if ind > 0 {
            vars.extend(try_attach_ii_surname(ctx, items, ind - 1, &inf0));
            let ns = try_attach_name_surname(ctx, items, ind - 1, &inf0, false, after_attribute);
            vars.extend(ns);
        }
        if ind + 2 < items.len() {
            vars.extend(try_attach_surname_ii(ctx, items, ind, &inf0));
            vars.extend(try_attach_surname_name_secname(ctx, items, ind, &inf0, false, false));
        }
        if ind + 1 < items.len() {
            if let Some(sn) = try_attach_surname_name(ctx, items, ind, &inf0, false) {
                let sns = vars.iter().find(|v| v.template == FioTemplate::SurnameNameSecname);
                if sns.map_or(true, |v| v.coef < sn.coef) {
                    vars.push(sn);
                }
            }
        }
        if let Some(a) = try_attach_asian(ctx, items, ind, &inf0, 3, false) {
            vars.push(a);
        } else if let Some(a) = try_attach_asian(ctx, items, ind, &inf0, 2, false) {
            vars.push(a);
        }

        for v in vars.iter_mut() {
            if v.referent.is_none() {
                v.referent = Some(candidate_referent(v));
            }
        }
        let picked = pick_onto_variant(&pers, &mut vars);

        let pit = match picked {
            Some(p) => Some(p),
            None if items.len() == 1
                && vars.is_empty()
                && person_has_value(&pers, &items[0].value) =>
            {
                let mut p = PersonReferent::new();
                p.undefnames.push(items[0].value.clone());
                let (b, e) = (items[0].begin, items[0].end);
                let mut c = NameCandidate::new(FioTemplate::Undefined, b, e);
                c.set_coef("known_name_word", 3.0);
                c.referent = Some(p);
                c.morph = items[0].morph;
                Some(c)
            }
            None => {
                let Some(mut c) = try_attach_single_surname(items, ind, &inf0) else {
                    continue;
                };
                if c.coef < 2.0 {
                    continue;
                }
                if c.end.idx() != items[items.len() - 1].end.idx() && !vars.is_empty() {
                    continue;
                }
                let mut p = PersonReferent::new();
                p.add_fio_identity(c.lastname.clone(), None, None);
                c.referent = Some(p);
                Some(c)
            }
        };
        if let Some(pit) = pit {
            res.push((pit, id));
        }
    }
    if res.len() != 1 {
        return None;
    }
    let (mut pit, id) = res.remove(0);
    if let (Some(p), Some(pers)) = (pit.referent.as_mut(), ctx.person(id)) {
        p.merge_slots(&pers);
    }
    pit.onto_person = Some(id);
    trace!(candidate = %pit, "Resolved against a known person");
    Some(pit)
}

/// Readings accepted with a low coefficient when names are matched against
/// a reference list rather than running text
pub fn try_attach_onto_ext<'a>(items: &[NameItem<'a>]) -> Option<NameCandidate<'a>> {
    let none = MorphInfo::new();
    let mut pit = match items {
        [p0, p1, p2]
            if p0.kind == ItemKind::Value
                && p1.kind == ItemKind::Initial
                && p2.kind == ItemKind::Value =>
        {
            let mut c = NameCandidate::new(FioTemplate::NameISurname, p0.begin, p2.end);
            manage_firstname(&mut c, p0, &none);
            manage_lastname(&mut c, p2, &none);
            manage_middlename(&mut c, p1, &none);
            c
        }
        [p0, p1, p2] if [p0, p1, p2].iter().all(|p| p.kind == ItemKind::Value) => {
            let ok = (p0.firstname.is_none()
                && p1.middlename.is_none()
                && (p1.firstname.is_some() || p2.middlename.is_some()))
                || p0.firstname.as_ref().is_some_and(|f| f.has_std_tail || f.is_in_dictionary);
            if !ok {
                return None;
            }
            let mut c = NameCandidate::new(FioTemplate::SurnameNameSecname, p0.begin, p2.end);
            manage_firstname(&mut c, p1, &none);
            manage_lastname(&mut c, p0, &none);
            manage_middlename(&mut c, p2, &none);
            c
        }
        [p0, p1] if p0.kind == ItemKind::Value && p1.kind == ItemKind::Value => {
            let known_name = |nam: &NameItem<'_>, sur: &NameItem<'_>| {
                nam.firstname.as_ref().is_some_and(|f| f.is_in_dictionary)
                    || sur.lastname.as_ref().is_some_and(|l| l.is_in_dictionary || l.has_std_tail)
            };
            let (nam, sur, template) = if known_name(p0, p1) {
                (p0, p1, FioTemplate::NameSurname)
            } else if known_name(p1, p0) {
                (p1, p0, FioTemplate::SurnameName)
            } else {
                return None;
            };
            let mut c = NameCandidate::new(template, p0.begin, p1.end);
            manage_firstname(&mut c, nam, &none);
            manage_lastname(&mut c, sur, &none);
            c
        }
        _ => return None,
    };
    pit.set_coef("reference_list", 2.0);
    pit.items_count = items.len();
    Some(pit)
}

// ============================================================================
// Single surnames
// ============================================================================

/// The item at `ind` read as a bare surname
pub(crate) fn try_attach_single_surname<'a>(
    items: &[NameItem<'a>],
    ind: usize,
    inf: &MorphInfo,
) -> Option<NameCandidate<'a>> {
    let pit = items.get(ind)?;
    let last = pit.lastname.as_ref()?;
    let mut res = NameCandidate::new(FioTemplate::Undefined, pit.begin, pit.end);
    let strong = |p: &NameItem<'_>| {
        !p.is_in_dictionary || p.kind == ItemKind::Initial || p.firstname.is_some()
    };
    if ind == 0 && items.len() == 1 {
        res.adjust("single_item", 1.0);
    } else {
        if ind > 0 && strong(&items[ind - 1]) {
            res.adjust("name_neighbour", -1.0);
        }
        if ind + 1 < items.len() && strong(&items[ind + 1]) {
            res.adjust("name_neighbour", -1.0);
        }
    }
    res.morph = accord_morph(inf, Some(last), None, None, pit.end.next());
    manage_lastname(&mut res, pit, inf);
    res.items_count = 1;
    Some(res)
}

// ============================================================================
// Competing start positions
// ============================================================================

/// Compare the best reading from item 0 with the reading from item 1
/// ("Иванов Петр Сидоров" is either "Иванов Петр" or "Петр Сидоров").
/// Lifts the second reading just above the first when the evidence favours
/// it; returns whether it did.
pub fn correct_xfml<'a>(
    ctx: &AnalysisContext<'a>,
    list0: &[NameCandidate<'a>],
    list1: &mut [NameCandidate<'a>],
    has_attrs: bool,
) -> bool {
    let find = |list: &[NameCandidate<'a>], t: FioTemplate| {
        list.iter().position(|p| p.template == t)
    };
    let (mut i0, mut i1) = (
        find(list0, FioTemplate::SurnameNameSecname),
        find(list1, FioTemplate::NameSecnameSurname),
    );
    if i0.is_none() || i1.is_none() {
        i0 = find(list0, FioTemplate::SurnameName);
        i1 = find(list1, FioTemplate::NameSurname);
    }
    let (Some(i0), Some(i1)) = (i0, i1) else {
        return false;
    };
    let p0 = &list0[i0];
    let p1 = &list1[i1];
    if p1.coef > p0.coef {
        return false;
    }
    if p1.begin.until(p1.end).any(|t| t.idx() != p1.end.idx() && t.is_newline_after()) {
        return false;
    }
    if !p1.end.is_newline_after() {
        if let Some(next) = p1.end.next() {
            if segmenter::attach_single(ctx, next, ParseAttrs::NO, None).is_some() {
                return false;
            }
        }
    }
    let (Some(l0), Some(l1)) = (&p0.lastname, &p1.lastname) else {
        return false;
    };
    let (std0, std1) = (l0.has_lastname_standard_tail(), l1.has_lastname_standard_tail());
    let lifted = p0.coef + 0.1;
    if std1 && !std0 {
        list1[i1].set_coef("second_reading_std_tail", lifted);
        return true;
    }
    if !has_attrs && !std1 && std0 {
        return false;
    }
    let Some(t) = p1.end.next() else {
        return false;
    };
    if t.chars().is_capital_upper || t.chars().is_all_upper {
        return false;
    }
    if let Some(npt) = noun_phrase::try_parse(p1.end, NounPhraseParams::default()) {
        if npt.end.idx() != npt.begin.idx() {
            return false;
        }
    }
    if p1.end.morph_class_in_dictionary().is_noun()
        && !p0.begin.morph_class_in_dictionary().is_noun()
    {
        return false;
    }
    debug!(first = %p0, second = %p1, "Second start position preferred");
    list1[i1].set_coef("second_reading_lowercase_after", lifted);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminology::Terminology;
    use persona_core::{AnalysisConfig, Document, Lexicon, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    fn readings(text: &str) -> Vec<(FioTemplate, f64, Option<String>, Option<String>)> {
        let d = doc(text);
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let items = segmenter::attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        try_attach(&ctx, &items, 0, &MorphInfo::new(), None, false, false)
            .into_iter()
            .map(|c| {
                let first = |col: &Option<MorphVariantCollection>| {
                    col.as_ref().and_then(|c| c.values().first().map(|v| v.to_string()))
                };
                (c.template, c.coef, first(&c.lastname), first(&c.firstname))
            })
            .collect()
    }

    #[test]
    fn test_surname_with_initials_wins() {
        let res = readings("Иванов И. П.");
        assert!(!res.is_empty());
        assert_eq!(res[0].0, FioTemplate::SurnameII);
        assert_eq!(res[0].2.as_deref(), Some("ИВАНОВ"));
    }

    #[test]
    fn test_initial_before_surname() {
        let res = readings("И. Иванов");
        let c = res
            .iter()
            .find(|r| r.0 == FioTemplate::ISurname || r.0 == FioTemplate::IISurname)
            .unwrap();
        assert!(c.1 > 0.0);
    }

    #[test]
    fn test_comma_separated_surname_name() {
        let res = readings("Смит , Джон");
        let c = res.iter().find(|r| r.0 == FioTemplate::SurnameName).unwrap();
        assert_eq!(c.3.as_deref(), Some("ДЖОН"));
    }

    #[test]
    fn test_regnal_number() {
        let d = doc("Правил Петр Первый");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let t = d.first().unwrap().next().unwrap();
        let items = segmenter::attach_list(&ctx, t, ParseAttrs::NO, 10).unwrap();
        let res = try_attach(&ctx, &items, 0, &MorphInfo::new(), None, false, false);
        let king = res.iter().find(|c| c.template == FioTemplate::King).unwrap();
        assert!(king.coef >= 3.0);
        assert_eq!(king.lastname.as_ref().unwrap().number, 1);
    }

    #[test]
    fn test_roman_regnal_number_has_gender() {
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        for (text, gender) in [
            ("Правил Людовик XIV", MorphGender::MASCULINE),
            ("Правила Екатерина II", MorphGender::FEMININE),
        ] {
            let d = doc(text);
            let ctx = AnalysisContext::new(&d, &terms, &config);
            let t = d.first().unwrap().next().unwrap();
            let items = segmenter::attach_list(&ctx, t, ParseAttrs::NO, 10).unwrap();
            let king = try_attach_king(&ctx, &items, 0, &MorphInfo::new(), false).unwrap();
            assert_eq!(king.morph.gender, gender, "{text}");
            assert_eq!(king.probable_gender(), gender, "{text}");
        }
    }

    #[test]
    fn test_global_name() {
        let res = readings("Иван Грозный");
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].0, FioTemplate::Global);
        assert_eq!(res[0].1, 10.0);
    }

    #[test]
    fn test_accord_morph_narrows_gender() {
        let mut hint = MorphInfo::new();
        hint.gender = MorphGender::FEMININE;
        let mut part = NamePart::new();
        part.vars.push(
            crate::name_part::NameVariant::new("ПЕТРОВА")
                .with_gender(MorphGender::FEMININE)
                .with_case(MorphCase::NOMINATIVE),
        );
        let res = accord_morph(&hint, Some(&part), None, None, None);
        assert_eq!(res.gender, MorphGender::FEMININE);
    }

    #[test]
    fn test_bare_surname_resolves_to_known_person() {
        let d = doc("Иванов");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let mut known = PersonReferent::new();
        known.lastnames.push("ИВАНОВ".to_string());
        known.firstnames.push("ИВАН".to_string());
        known.set_gender(MorphGender::MASCULINE);
        let id = ctx.add_person(known);
        let items = segmenter::attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        let pit = try_attach_onto_int(&ctx, &items, 0, &MorphInfo::new(), false).unwrap();
        assert_eq!(pit.onto_person, Some(id));
        assert!(pit.referent.unwrap().firstnames.contains(&"ИВАН".to_string()));
    }

    #[test]
    fn test_reference_list_reading() {
        let d = doc("Иван Петров");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let items = segmenter::attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
        let pit = try_attach_onto_ext(&items).unwrap();
        assert_eq!(pit.template, FioTemplate::NameSurname);
        assert_eq!(pit.coef, 2.0);
    }
}
