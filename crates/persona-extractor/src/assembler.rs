//! Person entity assembly
//!
//! Turns a resolved name into a complete person: the attributes found
//! before the name are attached, then the text after the name is scanned
//! for everything else that describes the same person (alternate spellings
//! in brackets, nicknames, sex, birth and death dates, age, further
//! positions, contacts, identity documents and employers).

use tracing::trace;

use persona_core::numbers::try_parse_age;
use persona_core::text::{
    can_be_start_of_sentence, is_bracket, names_equal_translit, text_value, try_parse_bracket,
};
use persona_core::{
    ExternalReferent, MorphCase, MorphGender, MorphInfo, MorphNumber, ReferentKind, TokenRef,
};

use crate::analyzer;
use crate::attribute::{self, is_verb_be, AttachAttrs, AttributeToken};
use crate::context::AnalysisContext;
use crate::identity;
use crate::person::PersonReferent;
use crate::property::{PersonProperty, PropertyRef};
use crate::resolver;
use crate::segmenter::{self, ParseAttrs};
use crate::templates::FioTemplate;
use crate::terminology::AttrKind;

/// URI schemes accepted as personal contacts
const CONTACT_SCHEMES: &[&str] = &["mailto", "skype", "icq", "http"];

const NICKNAME_WORDS: &[(&str, Option<&str>)] = &[
    ("ПРОЗВИЩЕ", Some("ПРІЗВИСЬКО")),
    ("КЛИЧКА", None),
    ("ПСЕВДОНИМ", Some("ПСЕВДОНІМ")),
    ("ПСЕВДО", None),
    ("ПОЗЫВНОЙ", Some("ПОЗИВНИЙ")),
];

const NICKNAME_PARTICIPLES: &[&str] = &[
    "ПРОЗВАН", "ПРОЗВАНА", "ПРОЗВАННЫЙ", "ПРОЗВАННАЯ", "ИМЕНУЕМЫЙ", "ИМЕНУЕМАЯ", "AKA",
];

// ============================================================================
// Person Match
// ============================================================================

/// A person recognised over `begin..=end`
#[derive(Debug, Clone)]
pub struct PersonMatch<'a> {
    pub referent: PersonReferent,
    pub begin: TokenRef<'a>,
    pub end: TokenRef<'a>,
    pub morph: MorphInfo,
    /// Template the name was read with
    pub template: Option<FioTemplate>,
}

impl<'a> PersonMatch<'a> {
    pub fn new(
        referent: PersonReferent,
        begin: TokenRef<'a>,
        end: TokenRef<'a>,
        morph: MorphInfo,
    ) -> Self {
        Self {
            referent,
            begin,
            end,
            morph,
            template: None,
        }
    }
}

fn add_attribute_token(p: &mut PersonReferent, a: &AttributeToken<'_>) {
    if let Some(age) = a.age {
        p.age = Some(age);
        return;
    }
    if let Some(prop) = &a.property {
        p.add_attribute(prop.clone());
    } else if let Some(v) = &a.value {
        p.add_attribute(PersonProperty::new(v.to_lowercase()));
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Build the final person match from a resolved name.
///
/// `attrs` are the attributes recognised before the name. With
/// `for_attribute` the person is a reference inside another attribute and
/// nothing after the name is consumed. `after_be_predicate` marks a name
/// following "является"/"был", where instrumental attributes agree.
#[allow(clippy::too_many_arguments)]
pub fn create_referent_token<'a>(
    ctx: &AnalysisContext<'a>,
    mut p: PersonReferent,
    begin: TokenRef<'a>,
    end: TokenRef<'a>,
    morph: MorphInfo,
    attrs: &[AttributeToken<'a>],
    for_attribute: bool,
    after_be_predicate: bool,
) -> Option<PersonMatch<'a>> {
    let begin0 = begin;
    let mut begin = begin;
    let mut end = end;
    let mut for_attribute = for_attribute;
    let mut has_prefix = false;
    let mut has_slash = false;

    for a in attrs {
        if a.end.next().is_some_and(|n| n.is_char_of("\\/")) {
            has_slash = true;
        }
        if a.kind == AttrKind::BestRegards {
            has_prefix = true;
            continue;
        }
        if a.begin.idx() < begin.idx() {
            begin = a.begin;
            if a.end.next().is_some_and(|n| n.is_char(')')) {
                if let Some(prev) = begin.previous().filter(|p| p.is_char('(')) {
                    begin = prev;
                }
            }
        }
        if a.kind != AttrKind::Prefix {
            add_attribute_token(&mut p, a);
        } else if a.gender == MorphGender::FEMININE && !p.is_female {
            p.is_female = true;
        } else if a.gender == MorphGender::MASCULINE && !p.is_male {
            p.is_male = true;
        }
    }
    if attrs.is_empty() {
        // ИП Иванов
        let ip = begin
            .previous()
            .filter(|t| t.term() == "ИП" && begin.whitespaces_before() < 3);
        if let Some(prev) = ip {
            p.add_attribute(PersonProperty::new("индивидуальный предприниматель"));
            begin = prev;
        }
    }

    let mut morph = morph;
    morph.number = MorphNumber::SINGULAR;
    if morph.gender.is_undefined() {
        morph.gender = p.gender();
    }
    if let Some(a0) = attrs.first() {
        if !a0.morph.case.is_undefined() && morph.case.is_undefined() {
            morph.case = a0.morph.case;
            if !p.gender().is_undefined() {
                morph.gender = p.gender();
            }
        }
    }

    if let Some(prev) = begin.previous() {
        if prev.is_value("ИМЕНИ", Some("ІМЕНІ")) {
            for_attribute = true;
        } else {
            let ttt = if prev.is_char('.') { prev.previous().unwrap_or(prev) } else { prev };
            if ttt.whitespaces_after() < 3 && ttt.is_value("ИМ", Some("ІМ")) {
                for_attribute = true;
            }
        }
    }
    if for_attribute {
        return Some(PersonMatch::new(p, begin, end, morph));
    }

    // Иванов ИП: the initials of the name and patronymic written together
    if begin == end && end.whitespaces_after() < 3 {
        if let Some(next) = end.next().filter(|n| n.length_char() == 2 && n.chars().is_all_upper) {
            let n = p.firstnames.first().and_then(|s| s.chars().next());
            let s = p.middlenames.first().and_then(|s| s.chars().next());
            if let (Some(n), Some(s)) = (n, s) {
                if next.term() == format!("{n}{s}") {
                    end = next;
                }
            }
        }
    }

    let Some(_guard) = ctx.enter() else {
        return Some(PersonMatch::new(p, begin, end, morph));
    };

    let flags = TailFlags {
        has_prefix,
        has_slash,
        after_be_predicate,
    };
    end = scan_tail(ctx, &mut p, begin, end, morph, attrs, flags);
    end = scan_contacts(ctx, &mut p, begin, begin0, end, has_prefix);

    // паспорт ..., на имя Иванова
    if begin.is_value("НА", None) && begin.next().is_some_and(|n| n.is_value("ИМЯ", None)) {
        let mut t0 = begin.previous();
        if t0.is_some_and(|t| t.is_comma()) {
            t0 = t0.and_then(|t| t.previous());
        }
        let mut cur = t0;
        while let Some(tt) = cur {
            if let Some(doc) = identity::try_attach_identity(ctx, tt) {
                if doc.end == t0.unwrap_or(tt) {
                    p.add_id_doc(doc.referent);
                }
                break;
            }
            if tt.is_newline_before() {
                break;
            }
            cur = tt.previous();
        }
    }
    trace!(person = %p, "Person assembled");
    Some(PersonMatch::new(p, begin, end, morph))
}

/// Cyrillic name parts of `p` spelled in Latin by `pits`
fn latin_alternates(p: &PersonReferent, values: &[String]) -> Option<Vec<(u8, String)>> {
    let mut res = Vec::new();
    for v in values {
        let slot = if p.firstnames.iter().any(|s| names_equal_translit(s, v)) {
            0
        } else if p.middlenames.iter().any(|s| names_equal_translit(s, v)) {
            1
        } else if p.lastnames.iter().any(|s| names_equal_translit(s, v)) {
            2
        } else {
            return None;
        };
        res.push((slot, v.clone()));
    }
    Some(res)
}

fn add_alternates(p: &mut PersonReferent, alts: Vec<(u8, String)>) {
    for (slot, v) in alts {
        let list = match slot {
            0 => &mut p.firstnames,
            1 => &mut p.middlenames,
            _ => &mut p.lastnames,
        };
        if !list.contains(&v) {
            list.push(v);
        }
    }
}

/// "Иванов (Ivanov)", "Ivan Ivanov, Иван Иванов": Latin spelling of the
/// same name; returns the last consumed token
fn try_latin_names<'a>(
    ctx: &AnalysisContext<'a>,
    p: &mut PersonReferent,
    t: TokenRef<'a>,
    closing: bool,
) -> Option<TokenRef<'a>> {
    if !t.chars().is_latin_letter {
        return None;
    }
    let pits = segmenter::attach_list(ctx, t, ParseAttrs::CAN_BE_LATIN, 10)?;
    if pits.len() < 2
        || pits.len() > 3
        || !pits[0].chars.is_latin_letter
        || !pits[1].chars.is_latin_letter
    {
        return None;
    }
    let last = pits[pits.len() - 1].end;
    if closing && !last.next().is_some_and(|n| n.is_char(')')) {
        return None;
    }
    let values: Vec<String> = pits.iter().map(|pi| pi.value.clone()).collect();
    let alts = latin_alternates(p, &values)?;
    add_alternates(p, alts);
    if closing {
        last.next()
    } else {
        Some(last)
    }
}

#[derive(Debug, Clone, Copy)]
struct TailFlags {
    has_prefix: bool,
    has_slash: bool,
    after_be_predicate: bool,
}

/// Forward scan over brackets, nicknames, sex, dates and attributes after
/// the name
fn scan_tail<'a>(
    ctx: &AnalysisContext<'a>,
    p: &mut PersonReferent,
    begin: TokenRef<'a>,
    end: TokenRef<'a>,
    morph: MorphInfo,
    attrs: &[AttributeToken<'a>],
    flags: TailFlags,
) -> TokenRef<'a> {
    let TailFlags { has_prefix, has_slash, after_be_predicate } = flags;
    let mut end = end;
    let mut attrs1: Option<Vec<AttributeToken<'a>>> = None;
    let mut has_position = false;
    let mut open_br = false;
    let mut cur = end.next();
    while let Some(mut t) = cur {
        if t.is_table_control_char() {
            break;
        }
        if t.is_newline_before() {
            if t.newlines_before() > 1 || attrs1.as_ref().is_some_and(|a| !a.is_empty()) {
                break;
            }
            if t.chars().is_capital_upper {
                let ok1 = match attribute::try_attach(ctx, t, AttachAttrs::NO) {
                    Some(a1) => {
                        has_prefix
                            || a1.end.is_newline_after()
                            || a1.end.next().is_some_and(|n| n.is_table_control_char())
                            || t.until(a1.end).skip(1).any(|tt| tt.is_whitespace_before())
                    }
                    None => {
                        let tt = correct_tail_attributes(Some(&mut *p), t);
                        if tt != t {
                            end = tt;
                            cur = tt.next();
                            continue;
                        }
                        false
                    }
                };
                if !ok1 {
                    break;
                }
            }
        }
        if t.is_hiphen() || t.is_char_of("_>|") {
            cur = t.next();
            continue;
        }
        if t.is_char_of("\\/") {
            if has_slash {
                end = t;
            }
            if t.whitespaces_after() > 2 {
                break;
            }
            cur = t.next();
            continue;
        }
        if t.is_value("МОДЕЛЬ", None) {
            break;
        }
        let before = p.clone();
        let tt = correct_tail_attributes(Some(&mut *p), t);
        if tt != t || *p != before {
            end = tt;
            cur = tt.next();
            continue;
        }

        let mut is_be = after_be_predicate;
        if t.is_char('(') && Some(t) == end.next() {
            open_br = true;
            let Some(n) = t.next() else {
                break;
            };
            t = n;
            if t.chars().is_capital_upper && t.is_word() {
                if let Some(pit1) = segmenter::attach_single(ctx, t, ParseAttrs::NO, None) {
                    if pit1.lastname.is_some() && pit1.end.next().is_some_and(|c| c.is_char(')')) {
                        let mut inf = MorphInfo::new();
                        inf.case = MorphCase::NOMINATIVE;
                        inf.gender = p.gender();
                        if let Some(sur) = resolver::create_lastname(&pit1, &inf) {
                            p.add_fio_identity(Some(sur), None, None);
                            if let Some(close) = pit1.end.next() {
                                end = close;
                                cur = close.next();
                                continue;
                            }
                        }
                    }
                }
            }
            if let Some(last) = try_latin_names(ctx, p, t, true) {
                end = last;
                cur = last.next();
                continue;
            }
        } else if t.is_comma() {
            let Some(n) = t.next() else {
                break;
            };
            t = n;
            if t.is_value("WHO", None) {
                cur = t.next();
                continue;
            }
            if let Some(last) = try_latin_names(ctx, p, t, false) {
                end = last;
                cur = last.next();
                continue;
            }
        } else if is_verb_be(t) {
            let Some(n) = t.next() else {
                break;
            };
            t = n;
            is_be = true;
        } else if t.is_and() && t.is_whitespace_after() && !t.is_newline_after() {
            if Some(t) == end.next() {
                break;
            }
            let Some(n) = t.next() else {
                break;
            };
            t = n;
        } else if t.is_char('.') && Some(t) == end.next() && has_prefix {
            let Some(n) = t.next() else {
                break;
            };
            t = n;
        }

        if let Some(tt) = create_nickname(ctx, p, t) {
            end = tt;
            cur = tt.next();
            continue;
        }
        if let Some(mut tt) = create_sex(p, t) {
            if let Some(close) = tt.next().filter(|n| open_br && n.is_char(')')) {
                tt = close;
            }
            end = tt;
            cur = tt.next();
            continue;
        }

        let Some(attr) = attribute::try_attach(ctx, t, AttachAttrs::NO) else {
            if t.chars().is_capital_upper
                && open_br
                && t.next().is_some_and(|n| n.is_char(')'))
                && p.lastnames.is_empty()
            {
                p.lastnames.push(t.source_text().to_uppercase());
                if let Some(close) = t.next() {
                    end = close;
                }
            }
            if t.is_value("КОТОРЫЙ", None) {
                let mi = t.morph_info();
                if mi.number == MorphNumber::SINGULAR && !p.is_male && !p.is_female {
                    if mi.gender == MorphGender::FEMININE {
                        p.is_female = true;
                        p.correct_data();
                    } else if mi.gender == MorphGender::MASCULINE {
                        p.is_male = true;
                        p.correct_data();
                    }
                }
            }
            break;
        };
        if attr.morph.number == MorphNumber::PLURAL || attr.kind == AttrKind::BestRegards {
            break;
        }
        if attr.is_doubtful {
            let fenced = t.previous().is_some_and(|pr| pr.is_hiphen() || pr.is_char(':'));
            if !has_prefix && !(t.is_newline_before() && attr.end.is_newline_after()) && !fenced {
                break;
            }
        }
        if (morph.case & attr.morph.case).is_undefined() && !is_be {
            let ac = attr.morph.case;
            let after_be = ac.is_instrumental() && t.previous().is_some_and(is_verb_be);
            let listed = t.previous().is_some_and(|pr| {
                pr.is_comma_and()
                    && attrs1
                        .as_ref()
                        .and_then(|a| a.last())
                        .is_some_and(|l| pr.previous() == Some(l.end))
            });
            if !(ac.is_undefined() || ac.is_nominative() || after_be || listed) {
                break;
            }
        }
        if open_br && analyzer::try_attach_person(ctx, t, 0, true).is_some() {
            break;
        }
        if attrs1.is_none() {
            if t.previous().is_some_and(|pr| pr.is_comma() && Some(pr) == end.next()) {
                let verb_after = attr.end.next().is_some_and(|n| n.morph_info().class.is_verb());
                if verb_after && !can_be_start_of_sentence(begin) {
                    break;
                }
            }
            attrs1 = Some(Vec::new());
        }
        let attr_end = attr.end;
        match attr.kind {
            AttrKind::Position | AttrKind::King => has_position = true,
            AttrKind::Prefix => {}
            AttrKind::Other if attr.age.is_some() => {}
            _ => {
                attrs1 = None;
                break;
            }
        }
        if let Some(list) = attrs1.as_mut() {
            list.push(attr);
        }
        cur = attr_end.next();
    }

    // a position after the name competes with the one before it
    if let (Some(list), true, Some(last_before)) = (attrs1.as_ref(), has_position, attrs.last()) {
        if let (Some(te1), Some(first_after)) = (last_before.end.next(), list.first()) {
            let te2 = first_after.begin;
            let keep = (te1.whitespaces_after() > te2.whitespaces_before()
                && te2.whitespaces_before() < 2)
                || first_after.age.is_some()
                || ((te1.is_hiphen() || te1.is_char(':'))
                    && !first_after.is_newline_before()
                    && te2.previous().is_some_and(|pr| pr.is_comma() || pr == end));
            if !keep && attrs.iter().any(|a| a.kind == AttrKind::Position) {
                let te = list[list.len() - 1].end;
                if te.next().is_some_and(|n| !n.is_char_of(".;,")) {
                    attrs1 = None;
                }
            }
        }
    }
    // the attribute rather introduces the next person
    if let (Some(list), false) = (attrs1.as_ref(), has_prefix) {
        if let Some(attr) = list.last() {
            let ok = attr.end.next().is_some_and(|n| n.chars().is_capital_upper)
                || analyzer::try_attach_person(ctx, attr.begin, 0, false).is_some();
            if ok {
                let wb = attr.begin.whitespaces_before();
                let wa = attr.end.whitespaces_after();
                let person_follows =
                    || analyzer::try_attach_person(ctx, attr.begin, 0, false).is_some();
                if wb > wa || (wb == wa && person_follows()) {
                    attrs1 = None;
                }
            }
        }
    }
    if let Some(list) = attrs1 {
        for a in &list {
            if a.kind == AttrKind::Prefix {
                continue;
            }
            add_attribute_token(p, a);
            end = a.end;
            if !a.gender.is_undefined() && !p.is_female && !p.is_male {
                p.set_gender(a.gender);
                p.correct_data();
            }
        }
        if open_br {
            if let Some(close) = end.next().filter(|n| n.is_char(')')) {
                end = close;
            }
        }
    }
    end
}

/// Contacts, identity documents and employers after the person
fn scan_contacts<'a>(
    ctx: &AnalysisContext<'a>,
    p: &mut PersonReferent,
    begin: TokenRef<'a>,
    begin0: TokenRef<'a>,
    end: TokenRef<'a>,
    has_prefix: bool,
) -> TokenRef<'a> {
    let mut end = end;
    let mut crlf_cou = 0;
    let mut cur = end.next();
    while let Some(t) = cur {
        if t.is_table_control_char() {
            break;
        }
        if t.is_newline_before() {
            crlf_cou += 1;
        }
        if t.is_char_of(":,(") || t.is_hiphen() || (t.is_char('.') && Some(t) == end.next()) {
            cur = t.next();
            continue;
        }
        if let Some(doc) = identity::try_attach_identity(ctx, t) {
            p.add_id_doc(doc.referent);
            end = doc.end;
            crlf_cou = 0;
            cur = doc.end.next();
            continue;
        }
        if let Some(r) = t.referent() {
            match r.kind {
                ReferentKind::Phone | ReferentKind::Uri | ReferentKind::Address => {
                    if r.kind == ReferentKind::Uri {
                        let scheme = r.attr("scheme").map(str::to_lowercase);
                        if scheme.is_some_and(|s| !CONTACT_SCHEMES.contains(&s.as_str())) {
                            break;
                        }
                    }
                    p.add_contact(r.clone());
                    end = t;
                    crlf_cou = 0;
                    cur = t.next();
                    continue;
                }
                ReferentKind::Organization => {
                    if t.next().is_some_and(|n| n.morph_info().class.is_verb())
                        || begin.previous().is_some_and(|pr| pr.morph_info().class.is_verb())
                    {
                        break;
                    }
                    if !t.previous().is_some_and(|pr| pr.is_char_of("(,")) {
                        if t.newlines_before() > 2
                            || (!begin.is_newline_before() && !begin0.is_newline_before())
                        {
                            break;
                        }
                    }
                    add_employer(p, r);
                    cur = t.next();
                    continue;
                }
                _ => break,
            }
        }
        if !has_prefix || crlf_cou >= 2 {
            break;
        }
        if analyzer::try_attach_person(ctx, t, 0, false).is_some() {
            break;
        }
        cur = t.next();
    }
    end
}

/// Organization on the signature lines becomes a "сотрудник" position
fn add_employer(p: &mut PersonReferent, org: &ExternalReferent) {
    let r = PropertyRef::External(org.clone());
    if p.attributes.iter().any(|a| a.chain().any(|c| c.has_ref(&r))) {
        return;
    }
    let mut prop = PersonProperty::new("сотрудник");
    prop.add_ref(r);
    p.add_attribute(prop);
}

// ============================================================================
// Tail helpers
// ============================================================================

/// "пол мужской", "муж.", "жен": sets the sex of `p`; returns the last
/// consumed token
pub fn create_sex<'a>(p: &mut PersonReferent, t: TokenRef<'a>) -> Option<TokenRef<'a>> {
    let mut t = t;
    while let Some(n) = t.next() {
        if t.is_value("ПОЛ", None) || t.is_hiphen() || t.is_char(':') {
            t = n;
        } else {
            break;
        }
    }
    if !t.is_letters() {
        return None;
    }
    if matches!(t.term(), "МУЖ" | "МУЖС" | "МУЖСК") || t.is_value("МУЖСКОЙ", Some("ЧОЛОВІЧИЙ")) {
        p.is_male = true;
    } else if matches!(t.term(), "ЖЕН" | "ЖЕНС" | "ЖЕНСК")
        || t.is_value("ЖЕНСКИЙ", Some("ЖІНОЧИЙ"))
    {
        p.is_female = true;
    } else {
        return None;
    }
    while let Some(n) = t.next() {
        if n.is_value("ПОЛ", None) || n.is_char('.') {
            t = n;
        } else {
            break;
        }
    }
    Some(t)
}

/// "по прозвищу Кузя", "(псевдоним «Седой»)": adds nicknames to `p`;
/// returns the last consumed token
pub fn create_nickname<'a>(
    ctx: &AnalysisContext<'a>,
    p: &mut PersonReferent,
    t: TokenRef<'a>,
) -> Option<TokenRef<'a>> {
    let mut has_keyword = false;
    let mut is_br = false;
    let mut cur = Some(t);
    while let Some(tt) = cur {
        if tt.is_hiphen()
            || tt.is_comma()
            || tt.is_char_of(".:;")
            || tt.morph_info().class.is_preposition()
        {
            cur = tt.next();
            continue;
        }
        if tt.is_char('(') {
            is_br = true;
            cur = tt.next();
            continue;
        }
        if NICKNAME_WORDS.iter().any(|(ru, ua)| tt.is_value(ru, *ua))
            || tt.is_term_of(NICKNAME_PARTICIPLES)
        {
            has_keyword = true;
            cur = tt.next();
            continue;
        }
        // известный как, відомий як
        if tt.is_value("ИЗВЕСТНЫЙ", Some("ВІДОМИЙ")) || tt.is_term_of(&["ИЗВЕСТЕН", "ИЗВЕСТНА"]) {
            if let Some(how) = tt.next().filter(|n| n.is_term_of(&["КАК", "ЯК"])) {
                has_keyword = true;
                cur = how.next();
                continue;
            }
        }
        break;
    }
    if !has_keyword {
        return None;
    }
    let t = cur?;
    let close_outer = |t: TokenRef<'a>| match t.next() {
        Some(n) if is_br && n.is_char(')') => n,
        _ => t,
    };

    if is_bracket(t) {
        let close = try_parse_bracket(t)?;
        let first = t.next()?;
        let last = close.previous()?;
        if first.idx() > last.idx() {
            return None;
        }
        p.add_nickname(&text_value(first, last));
        let mut end = close;
        let mut next = end.next();
        while let Some(tt) = next {
            if tt.is_comma_and() {
                next = tt.next();
                continue;
            }
            if !is_bracket(tt) {
                break;
            }
            let Some(close) = try_parse_bracket(tt) else {
                break;
            };
            if let (Some(f), Some(l)) = (tt.next(), close.previous()) {
                if f.idx() <= l.idx() {
                    p.add_nickname(&text_value(f, l));
                }
            }
            end = close;
            next = close.next();
        }
        return Some(close_outer(end));
    }

    let mut ret: Option<TokenRef<'a>> = None;
    let mut cur = Some(t);
    while let Some(tt) = cur {
        if tt.is_comma_and() {
            cur = tt.next();
            continue;
        }
        if ret.is_some() && tt.chars().is_all_lower {
            break;
        }
        if tt.whitespaces_before() > 2 {
            break;
        }
        let names = segmenter::attach_list(ctx, tt, ParseAttrs::NO, 10).filter(|l| l.len() <= 2);
        if let Some(pli) = names {
            let last = pli[pli.len() - 1].end;
            p.add_nickname(&text_value(pli[0].begin, last));
            let e = close_outer(last);
            ret = Some(e);
            cur = e.next();
            continue;
        }
        if let Some(r) = tt.referent() {
            if !tt.chars().is_all_lower {
                p.add_nickname(&r.value);
                let e = close_outer(tt);
                ret = Some(e);
                cur = e.next();
                continue;
            }
        }
        break;
    }
    ret
}

/// The text after a name tells that it is a person: a speech verb, a
/// gendered pronoun opening the next sentence, or an attribute
pub fn is_person_say_or_attr_after<'a>(ctx: &AnalysisContext<'a>, t: TokenRef<'a>) -> bool {
    if correct_tail_attributes(None, t) != t {
        return true;
    }
    let mut t = t;
    if t.is_comma() {
        if let Some(n) = t.next() {
            t = n;
        }
    }
    if t.chars().is_latin_letter
        && t.is_term_of(&["SAY", "SAYS", "SAID", "ASK", "ASKS", "ASKED", "WHO"])
    {
        return true;
    }
    if t.is_char('.') {
        if let Some(n) = t.next() {
            let mi = n.morph_info();
            if (mi.class.is_pronoun() || mi.class.is_personal_pronoun())
                && (mi.gender == MorphGender::FEMININE || mi.gender == MorphGender::MASCULINE)
            {
                return true;
            }
        }
    }
    if t.is_comma() {
        if let Some(n) = t.next() {
            t = n;
        }
    }
    attribute::try_attach(ctx, t, AttachAttrs::NO).is_some()
}

fn date_range_bounds(r: &ExternalReferent) -> Option<(ExternalReferent, ExternalReferent)> {
    let from = r.year?;
    let to = r.year_to()?;
    Some((ExternalReferent::year_date(from), ExternalReferent::year_date(to)))
}

fn is_year_number(t: TokenRef<'_>) -> Option<i32> {
    let n = t.number()?;
    if !t.is_digit_number() || !(1000..=2100).contains(&n.value) {
        return None;
    }
    i32::try_from(n.value).ok()
}

/// Birth, death and age written after a name ("родился 12.05.1975",
/// "(1950-2010)", "35 лет"). With `p` set the found values are stored;
/// returns the last consumed token, or `t0` when nothing was found.
pub fn correct_tail_attributes<'a>(
    mut p: Option<&mut PersonReferent>,
    t0: TokenRef<'a>,
) -> TokenRef<'a> {
    let mut res = t0;
    let mut t = Some(t0);
    if t0.is_char(',') {
        t = t0.next();
    }
    let mut born = false;
    let mut die = false;
    if let Some(tt) = t {
        if tt.is_value("РОДИТЬСЯ", Some("НАРОДИТИСЯ")) || tt.is_term_of(&["BORN"]) {
            t = tt.next();
            born = true;
        } else if tt.is_value("УМЕРЕТЬ", Some("ПОМЕРТИ"))
            || tt.is_value("СКОНЧАТЬСЯ", None)
            || tt.is_term_of(&["DIED"])
        {
            t = tt.next();
            die = true;
        } else if tt.is_value("ДАТА", None)
            && tt.next().is_some_and(|n| n.is_value("РОЖДЕНИЕ", Some("НАРОДЖЕННЯ")))
        {
            t = tt.next().and_then(|n| n.next());
            born = true;
        }
    }
    while let Some(tt) = t {
        if tt.morph_info().class.is_preposition() || tt.is_hiphen() || tt.is_char(':') {
            t = tt.next();
        } else {
            break;
        }
    }
    if let Some(tt) = t {
        if let Some(r) = tt.referent().filter(|r| r.kind == ReferentKind::Date) {
            let mut t1 = tt;
            match tt.next() {
                Some(n) if n.is_value("Р", None) || n.is_value("РОЖДЕНИЕ", Some("НАРОДЖЕННЯ")) => {
                    born = true;
                    t1 = n;
                    if let Some(dot) = n.next().filter(|d| d.is_char('.')) {
                        t1 = dot;
                    }
                }
                next if next.is_none()
                    || tt.is_newline_after()
                    || next.is_some_and(|n| n.is_comma()) =>
                {
                    let after_prep = tt.previous().is_some_and(|pr| {
                        pr.is_table_control_char()
                            || pr.morph_class_in_dictionary().is_preposition()
                    });
                    if !tt.is_newline_before() && !after_prep && r.date.is_some() {
                        born = true;
                    }
                }
                _ => {}
            }
            if born || die {
                if let Some(p) = p.as_deref_mut() {
                    if born {
                        p.born = Some(r.clone());
                    } else {
                        p.die = Some(r.clone());
                    }
                }
                res = t1;
                t = Some(t1);
            }
        }
    }
    if die {
        if let Some((age, age_end)) = t.and_then(|tt| tt.next()).and_then(try_parse_age) {
            if let Some(p) = p.as_deref_mut() {
                p.age = Some(age);
            }
            t = age_end.next();
            res = age_end;
        }
    }
    let Some(tt) = t else {
        return res;
    };

    if tt.is_char('(') {
        if let Some(close) = try_parse_bracket(tt) {
            let mut t1 = tt.next();
            if let Some(r) = t1.filter(|x| x.is_value("РОД", None)) {
                t1 = r.next();
                if let Some(dot) = t1.filter(|x| x.is_char('.')) {
                    t1 = dot.next();
                }
            }
            if let Some(t1) = t1 {
                let bounds = match t1.referent() {
                    Some(r) if r.kind == ReferentKind::DateRange && t1.next() == Some(close) => {
                        date_range_bounds(r).map(|(b, d)| (b, Some(d)))
                    }
                    Some(r) if r.kind == ReferentKind::Date && t1.next() == Some(close) => {
                        Some((r.clone(), None))
                    }
                    // (1950 - 2010)
                    _ => is_year_number(t1).and_then(|from| {
                        let h = t1.next().filter(|h| h.is_hiphen())?;
                        let to_tok = h.next()?;
                        let to = is_year_number(to_tok)?;
                        let range = (
                            ExternalReferent::year_date(from),
                            Some(ExternalReferent::year_date(to)),
                        );
                        (to_tok.next() == Some(close) && from <= to).then_some(range)
                    }),
                };
                if let Some((b, d)) = bounds {
                    if let Some(p) = p.as_deref_mut() {
                        p.born = Some(b);
                        if d.is_some() {
                            p.die = d;
                        }
                    }
                    res = close;
                    return res;
                }
            }
        }
    }
    if tt.number().is_some() {
        if let Some((age, age_end)) = try_parse_age(tt) {
            if age_end.is_newline_after() || age_end.next().is_some_and(|n| n.is_comma_and()) {
                if let Some(p) = p.as_deref_mut() {
                    p.age = Some(age);
                }
                res = age_end;
            }
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminology::Terminology;
    use persona_core::{AnalysisConfig, Document, Lexicon, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    fn ivanov() -> PersonReferent {
        let mut p = PersonReferent::new();
        p.lastnames.push("ИВАНОВ".to_string());
        p.firstnames.push("ИВАН".to_string());
        p
    }

    #[test]
    fn test_create_sex() {
        let d = doc("пол мужской");
        let mut p = PersonReferent::new();
        let end = create_sex(&mut p, d.first().unwrap()).unwrap();
        assert!(p.is_male);
        assert_eq!(end.idx(), 1);

        let d = doc("жен.");
        let mut p = PersonReferent::new();
        let end = create_sex(&mut p, d.first().unwrap()).unwrap();
        assert!(p.is_female);
        assert_eq!(end.idx(), 1);

        let d = doc("инженер");
        assert!(create_sex(&mut PersonReferent::new(), d.first().unwrap()).is_none());
    }

    #[test]
    fn test_nickname_in_quotes() {
        let d = doc("псевдоним «Седой»");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let mut p = ivanov();
        let end = create_nickname(&ctx, &mut p, d.first().unwrap()).unwrap();
        assert_eq!(p.nicknames, vec!["СЕДОЙ".to_string()]);
        assert_eq!(end.idx(), d.len() - 1);
    }

    #[test]
    fn test_nickname_after_marker_words() {
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        for (text, nick) in [
            ("по прозвищу Ваня приехал", "ВАНЯ"),
            (", известный как Миша,", "МИША"),
            ("по кличке Федя", "ФЕДЯ"),
        ] {
            let d = doc(text);
            let ctx = AnalysisContext::new(&d, &terms, &config);
            let mut p = ivanov();
            let end = create_nickname(&ctx, &mut p, d.first().unwrap()).unwrap();
            assert_eq!(p.nicknames, vec![nick.to_string()], "{text}");
            assert_eq!(end.term(), nick);
        }
    }

    #[test]
    fn test_nickname_requires_keyword() {
        let d = doc("«Седой»");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        assert!(create_nickname(&ctx, &mut ivanov(), d.first().unwrap()).is_none());
    }

    #[test]
    fn test_life_years_in_brackets() {
        let d = doc("(1950 - 2010)");
        let mut p = ivanov();
        let end = correct_tail_attributes(Some(&mut p), d.first().unwrap());
        assert_eq!(end.idx(), d.len() - 1);
        assert_eq!(p.born.as_ref().and_then(|b| b.year), Some(1950));
        assert_eq!(p.die.as_ref().and_then(|b| b.year), Some(2010));
    }

    #[test]
    fn test_death_date_after_verb() {
        let d = doc(", умер 12.05.2010.");
        let mut p = ivanov();
        let end = correct_tail_attributes(Some(&mut p), d.first().unwrap());
        assert_eq!(p.die.as_ref().and_then(|x| x.year), Some(2010));
        assert!(p.born.is_none());
        assert!(end.idx() >= 2);
    }

    #[test]
    fn test_age_after_name() {
        let d = doc(", 35 лет,");
        let mut p = ivanov();
        let t = d.first().unwrap().next().unwrap();
        let end = correct_tail_attributes(Some(&mut p), t);
        assert_eq!(p.age, Some(35));
        assert!(end.idx() > t.idx());
    }

    #[test]
    fn test_tail_without_facts_returns_start() {
        let d = doc("пришел домой");
        let t = d.first().unwrap();
        assert_eq!(correct_tail_attributes(None, t), t);
    }

    #[test]
    fn test_assembly_attaches_attributes_before() {
        let d = doc("министр финансов Иван Иванов");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let attr = attribute::try_attach(&ctx, d.first().unwrap(), AttachAttrs::NO).unwrap();
        let begin = attr.end.next().unwrap();
        let end = begin.next().unwrap();
        let attrs = [attr];
        let morph = MorphInfo::new();
        let m = create_referent_token(&ctx, ivanov(), begin, end, morph, &attrs, false, false)
            .unwrap();
        assert_eq!(m.begin.idx(), 0);
        assert_eq!(m.end, end);
        assert_eq!(m.referent.attributes.len(), 1);
        assert!(m.referent.attributes[0].name.starts_with("министр"));
    }

    #[test]
    fn test_sex_marker_after_name() {
        let d = doc("Иванов Иван, пол: мужской");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let begin = d.first().unwrap();
        let end = begin.next().unwrap();
        let morph = MorphInfo::new();
        let m =
            create_referent_token(&ctx, ivanov(), begin, end, morph, &[], false, false).unwrap();
        assert!(m.referent.is_male);
        assert_eq!(m.end.idx(), d.len() - 1);
    }
}
