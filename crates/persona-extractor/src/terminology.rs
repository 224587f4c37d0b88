//! Attribute terminology
//!
//! Titles, positions, prefixes and kinship terms that can stand next to a
//! person name. A part of the vocabulary is built in code (prefixes, IO/IO2
//! terms, grades), the rest is loaded from per-language XML resources:
//!
//! ```xml
//! <persons>
//!   <x v="ПРЕЗИДЕНТ" a="b1"/>
//!   <x v="ВДОВА" a="fkps"><alt v="ВДОВИЦА"/></x>
//! </persons>
//! ```
//!
//! The `a` attribute holds one-letter flags (see [`TermFlags`]).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use persona_core::lexicon::normalize;
use persona_core::{MorphGender, MorphInfo, MorphLang, PersonaError, Result, TokenRef};

static ATTR_RU: &str = include_str!("../resources/attr_ru.xml");
static ATTR_UA: &str = include_str!("../resources/attr_ua.xml");
static ATTR_EN: &str = include_str!("../resources/attr_en.xml");

static SHARED: OnceCell<Arc<Terminology>> = OnceCell::new();

/// Key length of the first-word index
const INDEX_PREFIX: usize = 3;

// ============================================================================
// Term kinds
// ============================================================================

/// Kind of an attribute token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    /// Form of address (господин, mr)
    Prefix,
    /// Position, profession, rank, kinship
    Position,
    /// Monarch or clergy title followed by a bare first name
    King,
    /// Mail closing (с уважением)
    BestRegards,
    /// Age phrase without a title
    Other,
}

impl AttrKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prefix => "PREFIX",
            Self::Position => "POSITION",
            Self::King => "KING",
            Self::BestRegards => "BESTREGARDS",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for AttrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Special handling of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind2 {
    #[default]
    Undefined,
    /// Needs a following position (исполняющий обязанности, бывший)
    Io,
    /// May take a following position (заместитель, уполномоченный)
    Io2,
    /// Adjective merged into the following position (главный)
    Adj,
    /// Adjective dropped before a position (нынешний)
    IgnoredAdj,
    /// Academic degree followed by a science branch
    Grade,
    /// Abbreviation expanded to its display name (КТН)
    Abbr,
}

impl TermKind2 {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::Io => "IO",
            Self::Io2 => "IO2",
            Self::Adj => "ADJ",
            Self::IgnoredAdj => "IGNOREDADJ",
            Self::Grade => "GRADE",
            Self::Abbr => "ABBR",
        }
    }
}

/// Resource flags of a term
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFlags {
    /// `p` = 1: a genitive person may follow (вдова Иванова);
    /// `P` = 2: a list of first names may follow (брат Иван и Петр)
    pub can_has_person_after: u8,
    /// `s`
    pub can_be_same_surname: bool,
    /// `b`
    pub is_boss: bool,
    /// `r`
    pub is_military_rank: bool,
    /// `n`
    pub is_nation: bool,
    /// `k`
    pub is_kin: bool,
    /// `1`: may be extracted without a person
    pub can_be_independent: bool,
    /// `w`
    pub is_profession: bool,
    /// `d`
    pub is_post: bool,
    /// `?`: ambiguous word, needs context
    pub is_doubt: bool,
}

// ============================================================================
// Termin
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct TermVariant {
    /// Letter runs and single punctuation characters
    pieces: Vec<String>,
    abridge: bool,
}

impl TermVariant {
    fn new(text: &str, abridge: bool) -> Self {
        Self {
            pieces: split_pieces(text),
            abridge,
        }
    }

    /// "ПРОФ." matches without its dot, "К." does not
    fn dot_optional(&self) -> bool {
        let n = self.pieces.len();
        n >= 2
            && self.pieces[n - 1] == "."
            && self.pieces[n - 2].chars().count() > 1
    }

    fn text(&self) -> String {
        self.pieces.concat()
    }
}

fn is_punct_piece(piece: &str) -> bool {
    piece.chars().count() == 1 && piece.chars().all(|c| !c.is_alphanumeric())
}

fn split_pieces(text: &str) -> Vec<String> {
    let text = normalize(text);
    let mut res = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() || c == '\'' {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            res.push(std::mem::take(&mut word));
        }
        if !c.is_whitespace() {
            res.push(c.to_string());
        }
    }
    if !word.is_empty() {
        res.push(word);
    }
    res
}

/// One attribute term with its variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termin {
    /// Upper-case canonical text
    pub canonical: String,
    /// Display name when it differs from the lower-cased canonical text
    pub name: Option<String>,
    pub kind: AttrKind,
    pub kind2: TermKind2,
    pub gender: MorphGender,
    pub lang: MorphLang,
    pub flags: TermFlags,
    variants: Vec<TermVariant>,
}

impl Termin {
    pub fn new(canonical: &str, kind: AttrKind) -> Self {
        let canonical = normalize(canonical);
        let variants = vec![TermVariant::new(&canonical, false)];
        Self {
            canonical,
            name: None,
            kind,
            kind2: TermKind2::Undefined,
            gender: MorphGender::UNDEFINED,
            lang: MorphLang::RU,
            flags: TermFlags::default(),
            variants,
        }
    }

    pub fn with_kind2(mut self, kind2: TermKind2) -> Self {
        self.kind2 = kind2;
        self
    }

    pub fn with_gender(mut self, gender: MorphGender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_lang(mut self, lang: MorphLang) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn add_variant(&mut self, text: &str) {
        let var = TermVariant::new(text, false);
        if !var.pieces.is_empty() && !self.variants.contains(&var) {
            self.variants.push(var);
        }
    }

    pub fn add_abridge(&mut self, text: &str) {
        let var = TermVariant::new(text, true);
        if !var.pieces.is_empty() && !self.variants.contains(&var) {
            self.variants.push(var);
        }
    }

    pub fn abridge(mut self, text: &str) -> Self {
        self.add_abridge(text);
        self
    }

    pub fn variant(mut self, text: &str) -> Self {
        self.add_variant(text);
        self
    }

    /// Lower-case name used for properties
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.canonical.to_lowercase())
    }

    /// Texts of all variants after the canonical one
    pub fn variant_texts(&self) -> Vec<String> {
        self.variants.iter().skip(1).map(TermVariant::text).collect()
    }

    fn first_pieces(&self) -> impl Iterator<Item = &str> {
        self.variants
            .iter()
            .filter_map(|v| v.pieces.first().map(String::as_str))
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Occurrence of a term in a document
#[derive(Debug, Clone)]
pub struct TermMatch<'a, 't> {
    pub termin: &'t Termin,
    pub begin: TokenRef<'a>,
    pub end: TokenRef<'a>,
    /// Features of the matched words
    pub morph: MorphInfo,
    /// Matched through an abbreviation
    pub is_abridge: bool,
    /// Matched through the canonical text itself
    pub is_canonical: bool,
}

fn stem_of(piece: &str) -> &str {
    let mut stem = piece;
    for _ in 0..2 {
        match stem.chars().last() {
            Some(c) if "АЯОЕИЫЙЬУЮ".contains(c) => stem = &stem[..stem.len() - c.len_utf8()],
            _ => break,
        }
    }
    stem
}

/// Features under which token `t` reads as word `piece`
fn match_word(piece: &str, t: TokenRef<'_>, abridge: bool) -> Option<MorphInfo> {
    if !t.is_word() {
        return None;
    }
    if abridge {
        return (t.term() == piece).then(MorphInfo::new);
    }
    let forms: Vec<_> = t
        .morph()
        .iter()
        .filter(|f| f.normal_case == piece || f.normal_full.as_deref() == Some(piece))
        .cloned()
        .collect();
    if !forms.is_empty() {
        let mut info = MorphInfo::from_forms(&forms);
        info.lang = t.lang();
        return Some(info);
    }
    if t.term() == piece {
        return Some(t.morph_info());
    }
    // Unknown inflected words (громадянина, академіка)
    if t.morph().iter().any(|f| f.in_dictionary) {
        return None;
    }
    let stem = stem_of(piece);
    if stem.chars().count() < 4 || !t.term().starts_with(stem) {
        return None;
    }
    let extra = t.term().chars().count() - stem.chars().count();
    (extra <= 3).then(|| t.morph_info())
}

fn match_variant<'a>(var: &TermVariant, t: TokenRef<'a>) -> Option<(TokenRef<'a>, MorphInfo)> {
    let n = var.pieces.len();
    let mut cur = Some(t);
    let mut end = t;
    let mut morph: Option<MorphInfo> = None;
    for (i, piece) in var.pieces.iter().enumerate() {
        let last_dot = i == n - 1 && var.dot_optional();
        let tok = match cur {
            Some(tok) if i == 0 || !tok.is_newline_before() => tok,
            _ if last_dot => break,
            _ => return None,
        };
        if is_punct_piece(piece) {
            let ok = if piece == "-" {
                tok.is_hiphen()
            } else {
                piece.chars().next().is_some_and(|c| tok.is_char(c))
            };
            if !ok {
                if last_dot {
                    break;
                }
                return None;
            }
            // "ГР-Н" but not "ГР - Н"
            if piece == "-"
                && var.abridge
                && (tok.is_whitespace_before() || tok.is_whitespace_after())
            {
                return None;
            }
        } else {
            let info = match_word(piece, tok, var.abridge)?;
            match morph.as_mut() {
                None if !info.case.is_undefined() => morph = Some(info),
                Some(m) if !info.case.is_undefined() => m.intersect_case(info.case),
                _ => {}
            }
        }
        end = tok;
        cur = tok.next();
    }
    let mut morph = morph.unwrap_or_default();
    morph.lang = t.lang();
    Some((end, morph))
}

// ============================================================================
// Collections
// ============================================================================

/// Terms indexed by the first characters of their first word
#[derive(Debug, Default)]
pub struct TerminCollection {
    termins: Vec<Termin>,
    index: HashMap<String, Vec<usize>>,
    by_word: HashMap<String, Vec<usize>>,
}

fn index_key(word: &str) -> String {
    word.chars().take(INDEX_PREFIX).collect()
}

impl TerminCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, termin: Termin) {
        let idx = self.termins.len();
        let mut keys: Vec<String> = termin.first_pieces().map(index_key).collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            self.index.entry(key).or_default().push(idx);
        }
        self.by_word.entry(termin.canonical.clone()).or_default().push(idx);
        for var in termin.variants.iter().filter(|v| !v.abridge) {
            let text = var.text();
            if text != termin.canonical {
                self.by_word.entry(text).or_default().push(idx);
            }
        }
        self.termins.push(termin);
    }

    pub fn len(&self) -> usize {
        self.termins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.termins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Termin> {
        self.termins.iter()
    }

    fn candidates(&self, t: TokenRef<'_>) -> Vec<usize> {
        let mut keys = vec![index_key(t.term())];
        for f in t.morph() {
            keys.push(index_key(&f.normal_case));
            if let Some(full) = &f.normal_full {
                keys.push(index_key(full));
            }
        }
        keys.sort();
        keys.dedup();
        let mut res: Vec<usize> = keys
            .iter()
            .filter_map(|k| self.index.get(k))
            .flatten()
            .copied()
            .collect();
        res.sort_unstable();
        res.dedup();
        res
    }

    /// Every term occurrence starting at `t`, longest first
    pub fn try_parse_all<'a>(&self, t: TokenRef<'a>) -> Vec<TermMatch<'a, '_>> {
        if !t.is_word() {
            return Vec::new();
        }
        let mut res: Vec<TermMatch<'a, '_>> = Vec::new();
        for idx in self.candidates(t) {
            let termin = &self.termins[idx];
            let mut best: Option<TermMatch<'a, '_>> = None;
            for (vi, var) in termin.variants.iter().enumerate() {
                let Some((end, morph)) = match_variant(var, t) else {
                    continue;
                };
                if best.as_ref().is_some_and(|b| b.end.idx() >= end.idx()) {
                    continue;
                }
                best = Some(TermMatch {
                    termin,
                    begin: t,
                    end,
                    morph,
                    is_abridge: var.abridge,
                    is_canonical: vi == 0,
                });
            }
            res.extend(best);
        }
        // Stable: earlier terms win ties
        res.sort_by(|a, b| b.end.idx().cmp(&a.end.idx()));
        res
    }

    /// Longest term occurrence starting at `t`
    pub fn try_parse<'a>(&self, t: TokenRef<'a>) -> Option<TermMatch<'a, '_>> {
        self.try_parse_all(t).into_iter().next()
    }

    /// Terms whose canonical text or a full variant equals `word`
    pub fn find_by_string(&self, word: &str) -> Vec<&Termin> {
        self.by_word
            .get(&normalize(word))
            .map(|ids| ids.iter().map(|i| &self.termins[*i]).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// Terminology
// ============================================================================

/// The full attribute vocabulary, immutable after load
#[derive(Debug)]
pub struct Terminology {
    attrs: TerminCollection,
    grades: TerminCollection,
}

/// Science branches: full text, first and second abbreviation levels
const GRADE_BRANCHES: &[(&str, &str, &str)] = &[
    ("архитектуры", "архитектуры", "арх."),
    ("биологических наук", "биол. наук", "б.н."),
    ("ветеринарных наук", "ветеринар. наук", "вет.н."),
    ("военных наук", "воен. наук", "воен.н."),
    ("географических наук", "геогр. наук", "г.н."),
    ("геолого-минералогических наук", "геол.-минерал. наук", "г.-м.н."),
    ("искусствоведения", "искусствоведения", "иск."),
    ("исторических наук", "ист. наук", "и.н."),
    ("культурологии", "культурологии", "культ."),
    ("медицинских наук", "мед. наук", "м.н."),
    ("педагогических наук", "пед. наук", "пед. н."),
    ("политических наук", "полит. наук", "полит. н."),
    ("психологических наук", "психол. наук", "п. н."),
    ("сельскохозяйственных наук", "с.-х. наук", "с.-х. н."),
    ("социологических наук", "социол. наук", "социол. н."),
    ("теологических наук", "теол. наук", "теол. н."),
    ("технических наук", "техн. наук", "т. н."),
    ("фармацевтических наук", "фарм. наук", "фарм. н."),
    ("физико-математических наук", "физ.-мат. наук", "ф.-м. н."),
    ("филологических наук", "филол. наук", "ф. н."),
    ("философских наук", "филос. наук", "филос. н."),
    ("химических наук", "хим. наук", "х. н."),
    ("экономических наук", "экон. наук", "э. н."),
    ("юридических наук", "юрид. наук", "ю. н."),
];

const RESOURCES: &[(&str, MorphLang)] = &[
    ("attr_ru.xml", MorphLang::RU),
    ("attr_en.xml", MorphLang::EN),
    ("attr_ua.xml", MorphLang::UA),
];

impl Terminology {
    /// Built-in vocabulary and the bundled XML resources
    pub fn load() -> Result<Self> {
        Self::from_sources(&[
            ("attr_ru.xml", MorphLang::RU, ATTR_RU),
            ("attr_en.xml", MorphLang::EN, ATTR_EN),
            ("attr_ua.xml", MorphLang::UA, ATTR_UA),
        ])
    }

    /// Built-in vocabulary with the XML resources read from `dir`
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut contents = Vec::with_capacity(RESOURCES.len());
        for (file, lang) in RESOURCES {
            let path = dir.join(file);
            let content = std::fs::read_to_string(&path).map_err(|e| {
                PersonaError::resource(path.display().to_string(), e.to_string())
            })?;
            contents.push((*file, *lang, content));
        }
        let sources: Vec<(&str, MorphLang, &str)> = contents
            .iter()
            .map(|(f, l, c)| (*f, *l, c.as_str()))
            .collect();
        Self::from_sources(&sources)
    }

    /// Built-in vocabulary plus `(name, lang, xml)` resources
    pub fn from_sources(sources: &[(&str, MorphLang, &str)]) -> Result<Self> {
        let mut attrs = TerminCollection::new();
        Self::init_prefixes(&mut attrs);
        Self::init_positions(&mut attrs);
        Self::init_best_regards(&mut attrs);
        let builtin = attrs.len();
        for (name, lang, content) in sources {
            let count = load_attrs(&mut attrs, name, content, *lang)?;
            debug!(resource = name, terms = count, "Attribute resource loaded");
        }
        let mut grades = TerminCollection::new();
        Self::init_grades(&mut grades);
        info!(
            builtin,
            total = attrs.len(),
            grades = grades.len(),
            "Terminology loaded"
        );
        Ok(Self { attrs, grades })
    }

    /// Process-wide built-in terminology, loaded on first call
    pub fn shared() -> Result<Arc<Self>> {
        SHARED.get_or_try_init(|| Self::load().map(Arc::new)).cloned()
    }

    fn init_prefixes(attrs: &mut TerminCollection) {
        let m = MorphGender::MASCULINE;
        let f = MorphGender::FEMININE;
        attrs.add(Termin::new("ТОВАРИЩ", AttrKind::Prefix));
        attrs.add(Termin::new("ТОВАРИШ", AttrKind::Prefix).with_lang(MorphLang::UA));
        for s in [
            "ГОСПОДИН", "ГРАЖДАНИН", "УРОЖЕНЕЦ", "ВЫХОДЕЦ ИЗ", "МИСТЕР", "СЭР", "СЕНЬОР",
            "МОНСЕНЬОР", "СИНЬОР", "МЕСЬЕ", "МСЬЕ", "ДОН", "МАЭСТРО", "МЭТР",
        ] {
            let mut t = Termin::new(s, AttrKind::Prefix).with_gender(m);
            if s == "ГРАЖДАНИН" {
                t = t.abridge("ГР.").abridge("ГРАЖД.").abridge("ГР-Н");
            }
            if s == "ГОСПОДИН" {
                t = t.abridge("Г-Н");
            }
            attrs.add(t);
        }
        for s in [
            "ПАН", "ГРОМАДЯНИН", "УРОДЖЕНЕЦЬ", "ВИХОДЕЦЬ З", "МІСТЕР", "СЕР", "СЕНЬЙОР",
            "МОНСЕНЬЙОР", "МЕСЬЄ", "МЕТР", "МАЕСТРО",
        ] {
            let mut t = Termin::new(s, AttrKind::Prefix)
                .with_gender(m)
                .with_lang(MorphLang::UA);
            if s == "ГРОМАДЯНИН" {
                t = t.abridge("ГР.").abridge("ГР-Н");
            }
            attrs.add(t);
        }
        for s in [
            "ГОСПОЖА", "ПАНИ", "ГРАЖДАНКА", "УРОЖЕНКА", "СЕНЬОРА", "СЕНЬОРИТА", "СИНЬОРА",
            "СИНЬОРИТА", "МИСС", "МИССИС", "МАДАМ", "МАДЕМУАЗЕЛЬ", "ФРАУ", "ФРОЙЛЯЙН", "ЛЕДИ",
            "ДОННА",
        ] {
            let mut t = Termin::new(s, AttrKind::Prefix).with_gender(f);
            if s == "ГРАЖДАНКА" {
                t = t.abridge("ГР.").abridge("ГРАЖД.").abridge("ГР-КА");
            }
            if s == "ГОСПОЖА" {
                t = t.abridge("Г-ЖА");
            }
            attrs.add(t);
        }
        for s in [
            "ПАНІ", "ГРОМАДЯНКА", "УРОДЖЕНКА", "СЕНЬЙОРА", "МІС", "МІСІС", "ЛЕДІ",
        ] {
            let mut t = Termin::new(s, AttrKind::Prefix)
                .with_gender(f)
                .with_lang(MorphLang::UA);
            if s == "ГРОМАДЯНКА" {
                t = t.abridge("ГР.").abridge("ГР-КА");
            }
            attrs.add(t);
        }
        let en = MorphLang::EN;
        attrs.add(
            Termin::new("MISTER", AttrKind::Prefix)
                .with_gender(m)
                .with_lang(en)
                .abridge("MR")
                .abridge("MR."),
        );
        attrs.add(
            Termin::new("MISSIS", AttrKind::Prefix)
                .with_gender(f)
                .with_lang(en)
                .abridge("MRS")
                .abridge("MRS."),
        );
        attrs.add(
            Termin::new("MISS", AttrKind::Prefix)
                .with_gender(f)
                .with_lang(en)
                .abridge("MS")
                .abridge("MS."),
        );
        attrs.add(
            Termin::new("DOCTOR", AttrKind::Prefix)
                .with_lang(en)
                .abridge("DR")
                .abridge("DR."),
        );
    }

    fn init_positions(attrs: &mut TerminCollection) {
        let ua = MorphLang::UA;
        let en = MorphLang::EN;
        let pos = AttrKind::Position;

        attrs.add(
            Termin::new("БЕЗРАБОТНЫЙ", pos)
                .variant("НЕ РАБОТАЮЩИЙ")
                .variant("НЕ РАБОТАЕТ")
                .variant("ВРЕМЕННО НЕ РАБОТАЮЩИЙ")
                .variant("ВРЕМЕННО НЕ РАБОТАЕТ"),
        );
        attrs.add(
            Termin::new("БЕЗРОБІТНИЙ", pos)
                .with_lang(ua)
                .variant("НЕ ПРАЦЮЮЧИЙ")
                .variant("НЕ ПРАЦЮЄ"),
        );
        attrs.add(
            Termin::new("ЗАМЕСТИТЕЛЬ", pos)
                .with_kind2(TermKind2::Io2)
                .variant("ЗАМЕСТИТЕЛЬНИЦА")
                .abridge("ЗАМ."),
        );
        attrs.add(
            Termin::new("ЗАСТУПНИК", pos)
                .with_kind2(TermKind2::Io2)
                .with_lang(ua)
                .variant("ЗАСТУПНИЦЯ")
                .abridge("ЗАМ."),
        );
        attrs.add(Termin::new("УПОЛНОМОЧЕННЫЙ", pos).with_kind2(TermKind2::Io2));
        attrs.add(
            Termin::new("УПОВНОВАЖЕНИЙ", pos)
                .with_kind2(TermKind2::Io2)
                .with_lang(ua),
        );
        attrs.add(Termin::new("ЭКС-УПОЛНОМОЧЕННЫЙ", pos).with_kind2(TermKind2::Io2));
        attrs.add(
            Termin::new("ИСПОЛНЯЮЩИЙ ОБЯЗАННОСТИ", pos)
                .with_kind2(TermKind2::Io)
                .abridge("И.О.")
                .abridge("ИО"),
        );
        attrs.add(
            Termin::new("ВИКОНУЮЧИЙ ОБОВЯЗКИ", pos)
                .with_kind2(TermKind2::Io)
                .with_lang(ua)
                .abridge("В.О."),
        );
        attrs.add(
            Termin::new("ВРЕМЕННО ИСПОЛНЯЮЩИЙ ОБЯЗАННОСТИ", pos)
                .with_kind2(TermKind2::Io)
                .abridge("ВР.И.О.")
                .abridge("ВРИО"),
        );
        attrs.add(Termin::new("ЗАВЕДУЮЩИЙ", pos).abridge("ЗАВЕД.").abridge("ЗАВ."));
        attrs.add(
            Termin::new("ЗАВІДУВАЧ", pos)
                .with_lang(ua)
                .abridge("ЗАВІД.")
                .abridge("ЗАВ."),
        );
        attrs.add(Termin::new("СОТРУДНИК", pos).abridge("СОТРУДН.").abridge("СОТР."));
        attrs.add(
            Termin::new("СПІВРОБІТНИК", pos)
                .with_lang(ua)
                .abridge("СПІВРОБ."),
        );
        attrs.add(Termin::new("АКАДЕМИК", pos).abridge("АКАД."));
        attrs.add(Termin::new("АКАДЕМІК", pos).with_lang(ua).abridge("АКАД."));
        attrs.add(Termin::new("ЧЛЕН-КОРРЕСПОНДЕНТ", pos).abridge("ЧЛ.-КОРР."));
        attrs.add(
            Termin::new("ЧЛЕН-КОРЕСПОНДЕНТ", pos)
                .with_lang(ua)
                .abridge("ЧЛ.-КОР."),
        );
        attrs.add(Termin::new("ДОЦЕНТ", pos).abridge("ДОЦ."));
        attrs.add(Termin::new("ПРОФЕССОР", pos).abridge("ПРОФ."));
        attrs.add(Termin::new("ПРОФЕСОР", pos).with_lang(ua).abridge("ПРОФ."));
        attrs.add(Termin::new("PROFESSOR", pos).with_lang(en).abridge("PROF."));
        attrs.add(
            Termin::new("КАНДИДАТ", pos)
                .with_kind2(TermKind2::Grade)
                .abridge("КАНД.")
                .abridge("КАН.")
                .abridge("К-Т")
                .abridge("К."),
        );
        attrs.add(
            Termin::new("ДОКТОР", pos)
                .with_kind2(TermKind2::Grade)
                .abridge("ДОКТ.")
                .abridge("ДОК.")
                .abridge("Д-Р")
                .abridge("Д."),
        );
        attrs.add(Termin::new("ДОКТОРАНТ", pos));
        for s in ["КФН", "КТН", "КХН"] {
            attrs.add(
                Termin::new(s, pos)
                    .with_kind2(TermKind2::Abbr)
                    .with_name("кандидат наук"),
            );
        }
        for s in ["ГЛАВНЫЙ", "МЛАДШИЙ", "СТАРШИЙ", "ВЕДУЩИЙ", "НАУЧНЫЙ"] {
            let short: String = s.chars().take(2).collect();
            attrs.add(
                Termin::new(s, pos)
                    .with_kind2(TermKind2::Adj)
                    .abridge(&format!("{short}.")),
            );
        }
        for s in ["ГОЛОВНИЙ", "МОЛОДШИЙ", "ПРОВІДНИЙ", "НАУКОВИЙ"] {
            attrs.add(
                Termin::new(s, pos)
                    .with_kind2(TermKind2::Adj)
                    .with_lang(ua),
            );
        }
        for s in ["НЫНЕШНИЙ", "НОВЫЙ", "CURRENT", "NEW"] {
            attrs.add(Termin::new(s, pos).with_kind2(TermKind2::IgnoredAdj));
        }
        for s in ["НИНІШНІЙ", "НОВИЙ"] {
            attrs.add(
                Termin::new(s, pos)
                    .with_kind2(TermKind2::IgnoredAdj)
                    .with_lang(ua),
            );
        }
        for s in ["ТОГДАШНИЙ", "БЫВШИЙ", "ПРЕДЫДУЩИЙ", "FORMER", "PREVIOUS", "THEN"] {
            attrs.add(Termin::new(s, pos).with_kind2(TermKind2::Io));
        }
        for s in ["ТОДІШНІЙ", "КОЛИШНІЙ"] {
            attrs.add(
                Termin::new(s, pos)
                    .with_kind2(TermKind2::Io)
                    .with_lang(ua),
            );
        }
    }

    fn init_best_regards(attrs: &mut TerminCollection) {
        attrs.add(
            Termin::new("С УВАЖЕНИЕМ", AttrKind::BestRegards)
                .variant("С НАИЛУЧШИМИ ПОЖЕЛАНИЯМИ")
                .variant("ИСКРЕННЕ ВАШ"),
        );
        attrs.add(Termin::new("З ПОВАГОЮ", AttrKind::BestRegards).with_lang(MorphLang::UA));
        attrs.add(
            Termin::new("BEST REGARDS", AttrKind::BestRegards)
                .with_lang(MorphLang::EN)
                .variant("REGARDS")
                .variant("KIND REGARDS")
                .variant("SINCERELY YOURS"),
        );
    }

    fn init_grades(grades: &mut TerminCollection) {
        for (full, sh1, sh2) in GRADE_BRANCHES {
            let t = Termin::new(full, AttrKind::Position)
                .with_name(full)
                .abridge(sh1)
                .abridge(sh2);
            grades.add(t);
        }
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn termins(&self) -> impl Iterator<Item = &Termin> {
        self.attrs.iter()
    }

    pub fn grades(&self) -> &TerminCollection {
        &self.grades
    }

    pub fn try_parse<'a>(&self, t: TokenRef<'a>) -> Option<TermMatch<'a, '_>> {
        self.attrs.try_parse(t)
    }

    pub fn try_parse_all<'a>(&self, t: TokenRef<'a>) -> Vec<TermMatch<'a, '_>> {
        self.attrs.try_parse_all(t)
    }

    /// Science branch after КАНДИДАТ/ДОКТОР
    pub fn try_parse_grade<'a>(&self, t: TokenRef<'a>) -> Option<TermMatch<'a, '_>> {
        self.grades.try_parse(t)
    }

    /// Terms whose text equals `word`, preferring language `lang`
    pub fn find_by_string(&self, word: &str, lang: MorphLang) -> Vec<&Termin> {
        let mut res = self.attrs.find_by_string(word);
        res.sort_by_key(|t| !t.lang.intersects(lang));
        res
    }
}

// ============================================================================
// XML resources
// ============================================================================

fn xml_attr(e: &BytesStart<'_>, key: &[u8], name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| PersonaError::resource(name, err.to_string()))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| PersonaError::resource(name, err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_termin(e: &BytesStart<'_>, name: &str, lang: MorphLang) -> Result<Termin> {
    let value = xml_attr(e, b"v", name)?
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PersonaError::resource(name, "<x> without a 'v' attribute"))?;
    let mut termin = Termin::new(&value, AttrKind::Position).with_lang(lang);
    if let Some(flags) = xml_attr(e, b"a", name)? {
        for ch in flags.chars() {
            match ch {
                'p' => termin.flags.can_has_person_after = 1,
                'P' => termin.flags.can_has_person_after = 2,
                's' => termin.flags.can_be_same_surname = true,
                'm' => termin.gender = MorphGender::MASCULINE,
                'f' => termin.gender = MorphGender::FEMININE,
                'b' => termin.flags.is_boss = true,
                'r' => termin.flags.is_military_rank = true,
                'n' => termin.flags.is_nation = true,
                'c' | 'q' => termin.kind = AttrKind::King,
                'k' => termin.flags.is_kin = true,
                'a' => termin.kind2 = TermKind2::Io2,
                '1' => termin.flags.can_be_independent = true,
                'w' => termin.flags.is_profession = true,
                'd' => termin.flags.is_post = true,
                '?' => termin.flags.is_doubt = true,
                other => {
                    return Err(PersonaError::resource(
                        name,
                        format!("unknown flag '{other}' of {value}"),
                    ))
                }
            }
        }
    }
    if let Some(alt) = xml_attr(e, b"alt", name)? {
        add_alt(&mut termin, &alt);
    }
    Ok(termin)
}

fn add_alt(termin: &mut Termin, alt: &str) {
    for v in alt.split(';').map(str::trim).filter(|v| !v.is_empty()) {
        if v.contains('.') {
            termin.add_abridge(v);
        } else {
            termin.add_variant(v);
        }
    }
}

/// Parse one `<persons>` resource into `termins`; returns the term count
fn load_attrs(
    termins: &mut TerminCollection,
    name: &str,
    content: &str,
    lang: MorphLang,
) -> Result<usize> {
    let mut reader = Reader::from_str(content);
    let mut current: Option<Termin> = None;
    let mut count = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"x" => {
                current = Some(parse_termin(&e, name, lang)?);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"x" => {
                termins.add(parse_termin(&e, name, lang)?);
                count += 1;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"alt" => {
                let alt = xml_attr(&e, b"v", name)?;
                if let (Some(termin), Some(alt)) = (current.as_mut(), alt) {
                    add_alt(termin, &alt);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"x" => {
                if let Some(termin) = current.take() {
                    termins.add(termin);
                    count += 1;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PersonaError::resource(
                    name,
                    format!("XML error at {}: {e}", reader.buffer_position()),
                ))
            }
            _ => {}
        }
    }
    if current.is_some() {
        return Err(PersonaError::resource(name, "unclosed <x> element"));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{Document, Lexicon, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    #[test]
    fn test_split_pieces() {
        assert_eq!(split_pieces("И.О."), vec!["И", ".", "О", "."]);
        assert_eq!(split_pieces("гр-н"), vec!["ГР", "-", "Н"]);
        assert_eq!(split_pieces("ВЫХОДЕЦ ИЗ"), vec!["ВЫХОДЕЦ", "ИЗ"]);
    }

    #[test]
    fn test_builtin_loads() {
        let terms = Terminology::load().unwrap();
        assert!(terms.len() > 150);
        assert_eq!(terms.grades().len(), GRADE_BRANCHES.len());
    }

    #[test]
    fn test_match_by_lemma() {
        let terms = Terminology::shared().unwrap();
        let d = doc("заместителя министра");
        let m = terms.try_parse(d.first().unwrap()).unwrap();
        assert_eq!(m.termin.canonical, "ЗАМЕСТИТЕЛЬ");
        assert_eq!(m.termin.kind2, TermKind2::Io2);
        assert!(m.morph.case.is_genitive());
        assert!(m.is_canonical);
    }

    #[test]
    fn test_multi_word_and_abridge() {
        let terms = Terminology::shared().unwrap();
        let d = doc("исполняющего обязанности директора");
        let m = terms.try_parse(d.first().unwrap()).unwrap();
        assert_eq!(m.termin.kind2, TermKind2::Io);
        assert_eq!(m.end.idx(), 1);

        let d = doc("и.о. директора");
        let m = terms.try_parse(d.first().unwrap()).unwrap();
        assert!(m.is_abridge);
        assert_eq!(m.end.idx(), 3);
    }

    #[test]
    fn test_optional_dot() {
        let terms = Terminology::shared().unwrap();
        let d = doc("проф Петров");
        let m = terms.try_parse(d.first().unwrap()).unwrap();
        assert_eq!(m.termin.canonical, "ПРОФЕССОР");
        assert_eq!(m.end.idx(), 0);

        let d = doc("К Петров");
        assert!(terms
            .try_parse_all(d.first().unwrap())
            .iter()
            .all(|m| m.termin.canonical != "КАНДИДАТ"));
    }

    #[test]
    fn test_xml_flags() {
        let terms = Terminology::shared().unwrap();
        let president = terms.find_by_string("ПРЕЗИДЕНТ", MorphLang::RU);
        assert!(president[0].flags.is_boss);
        assert!(president[0].flags.can_be_independent);

        let king = terms.find_by_string("КОРОЛЬ", MorphLang::RU);
        assert_eq!(king[0].kind, AttrKind::King);

        let widow = terms.find_by_string("ВДОВА", MorphLang::RU);
        assert_eq!(widow[0].gender, MorphGender::FEMININE);
        assert!(widow[0].flags.is_kin);
    }

    #[test]
    fn test_grade_branch() {
        let terms = Terminology::shared().unwrap();
        let d = doc("технических наук");
        let m = terms.try_parse_grade(d.first().unwrap()).unwrap();
        assert_eq!(m.termin.display_name(), "технических наук");

        let d = doc("т. н.");
        let m = terms.try_parse_grade(d.first().unwrap()).unwrap();
        assert_eq!(m.end.idx(), 3);
    }

    #[test]
    fn test_bad_resource_is_error() {
        let xml = "<persons><x a=\"b\"/></persons>";
        let err = Terminology::from_sources(&[("bad.xml", MorphLang::RU, xml)]).unwrap_err();
        assert!(matches!(err, PersonaError::Resource { .. }));

        let xml = "<persons><x v=\"А\" a=\"Z\"/></persons>";
        let err = Terminology::from_sources(&[("bad.xml", MorphLang::RU, xml)]).unwrap_err();
        assert!(err.to_string().contains("unknown flag"));
    }

    #[test]
    fn test_alt_children() {
        let xml = "<persons><x v=\"ВДОВА\" a=\"f\"><alt v=\"ВДОВИЦА\"/></x></persons>";
        let terms = Terminology::from_sources(&[("t.xml", MorphLang::RU, xml)]).unwrap();
        let found = terms.find_by_string("ВДОВИЦА", MorphLang::RU);
        assert_eq!(found[0].canonical, "ВДОВА");
    }
}
