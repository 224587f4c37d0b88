//! Paradigm lexicon
//!
//! A compact morphological dictionary: inflection paradigms plus groups of
//! lemmas that share a word class, gender and paradigm. Words missing from
//! the lexicon go through a suffix guesser that recognises the productive
//! surname and patronymic families; everything else gets a single
//! class-less reading.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::debug;

use crate::morph::{MorphCase, MorphClass, MorphGender, MorphNumber, WordForm};
use crate::{PersonaError, Result};

/// Morphological analysis as seen by the extraction pipeline
pub trait Morphology: Send + Sync {
    /// All readings of an upper-case term
    fn analyze(&self, term: &str) -> Vec<WordForm>;

    /// Surface form of `lemma` with the requested features
    fn inflect(
        &self,
        lemma: &str,
        class: MorphClass,
        gender: MorphGender,
        case: MorphCase,
        number: MorphNumber,
    ) -> Option<String>;

    /// Full names for a diminutive (САША → АЛЕКСАНДР, АЛЕКСАНДРА)
    fn short_names(&self, _name: &str) -> Vec<(String, MorphGender)> {
        Vec::new()
    }

    /// Known Chinese surname (ЧЖАН, ЛИ, ВАН)
    fn is_china_surname(&self, _term: &str) -> bool {
        false
    }
}

// ============================================================================
// Resource format
// ============================================================================

#[derive(Debug, Deserialize)]
struct LexiconFile {
    #[serde(default)]
    paradigm: HashMap<String, ParadigmDef>,
    #[serde(default)]
    group: Vec<GroupDef>,
    #[serde(default)]
    short_name: Vec<ShortNameDef>,
    #[serde(default)]
    chinese: ChineseDef,
}

#[derive(Debug, Default, Deserialize)]
struct ChineseDef {
    #[serde(default)]
    surnames: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ParadigmDef {
    #[serde(default)]
    strip: usize,
    endings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GroupDef {
    class: String,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default = "default_paradigm")]
    paradigm: String,
    lemmas: Vec<String>,
}

fn default_paradigm() -> String {
    "plain".to_string()
}

#[derive(Debug, Deserialize)]
struct ShortNameDef {
    short: String,
    full: Vec<String>,
    gender: String,
}

/// One parsed ending of a paradigm
#[derive(Debug, Clone)]
struct Ending {
    suffix: String,
    gender: MorphGender,
    case: MorphCase,
    number: MorphNumber,
    short_form: bool,
}

impl Ending {
    /// Parse `ENDING=tag,tag` (`=nom`, `А=gen,acc`, `ЫХ=pl,gen`)
    fn parse(paradigm: &str, entry: &str) -> Result<Self> {
        let (suffix, tags) = entry.split_once('=').ok_or_else(|| {
            PersonaError::resource("lexicon", format!("paradigm {paradigm}: bad ending '{entry}'"))
        })?;
        let mut ending = Ending {
            suffix: suffix.trim().to_string(),
            gender: MorphGender::UNDEFINED,
            case: MorphCase::UNDEFINED,
            number: MorphNumber::SINGULAR,
            short_form: false,
        };
        for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(case) = MorphCase::from_tag(tag) {
                ending.case |= case;
            } else if let Some(gender) = MorphGender::from_tag(tag) {
                ending.gender |= gender;
            } else if tag == "pl" {
                ending.number = MorphNumber::PLURAL;
            } else if tag == "short" {
                ending.short_form = true;
            } else {
                return Err(PersonaError::resource(
                    "lexicon",
                    format!("paradigm {paradigm}: unknown tag '{tag}'"),
                ));
            }
        }
        Ok(ending)
    }
}

// ============================================================================
// Lexicon
// ============================================================================

static BUILTIN: &str = include_str!("../resources/lexicon.toml");
static SHARED: OnceCell<Arc<Lexicon>> = OnceCell::new();

/// Paradigm-driven dictionary implementing [`Morphology`]
#[derive(Debug, Default)]
pub struct Lexicon {
    /// Surface form -> readings
    forms: HashMap<String, Vec<WordForm>>,
    /// Lemma (normal case or full) -> (surface, reading)
    by_lemma: HashMap<String, Vec<(String, WordForm)>>,
    short_names: HashMap<String, Vec<(String, MorphGender)>>,
    china_surnames: HashSet<String>,
    lemma_count: usize,
}

impl Lexicon {
    /// The lexicon bundled with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str("lexicon.toml", BUILTIN)
    }

    /// Process-wide built-in lexicon, loaded on first call
    pub fn shared() -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| Self::builtin().map(Arc::new))
            .cloned()
    }

    /// Load a lexicon file in the bundled format
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&path.display().to_string(), &content)
    }

    /// Parse lexicon TOML; `name` is used in error messages
    pub fn from_toml_str(name: &str, content: &str) -> Result<Self> {
        let file: LexiconFile =
            toml::from_str(content).map_err(|e| PersonaError::resource(name, e.to_string()))?;

        let mut paradigms: HashMap<&str, (usize, Vec<Ending>)> = HashMap::new();
        for (key, def) in &file.paradigm {
            let endings = def
                .endings
                .iter()
                .map(|e| Ending::parse(key, e))
                .collect::<Result<Vec<_>>>()?;
            paradigms.insert(key.as_str(), (def.strip, endings));
        }

        let mut lexicon = Lexicon::default();
        for group in &file.group {
            let class = group
                .class
                .split('|')
                .map(|tag| {
                    MorphClass::from_tag(tag.trim()).ok_or_else(|| {
                        PersonaError::resource(name, format!("unknown class '{tag}'"))
                    })
                })
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .fold(MorphClass::UNDEFINED, |acc, c| acc | c);
            let gender = match &group.gender {
                Some(tag) => MorphGender::from_tag(tag).ok_or_else(|| {
                    PersonaError::resource(name, format!("unknown gender '{tag}'"))
                })?,
                None => MorphGender::UNDEFINED,
            };
            let (strip, endings) = match group.paradigm.as_str() {
                "plain" => (0, vec![Ending::parse("plain", "=")?]),
                key => paradigms.get(key).cloned().ok_or_else(|| {
                    PersonaError::resource(name, format!("unknown paradigm '{key}'"))
                })?,
            };
            for lemma in &group.lemmas {
                lexicon.add_lemma(&normalize(lemma), class, gender, strip, &endings);
            }
        }

        for def in &file.short_name {
            let gender = MorphGender::from_tag(&def.gender).ok_or_else(|| {
                PersonaError::resource(name, format!("unknown gender '{}'", def.gender))
            })?;
            let entry = lexicon.short_names.entry(normalize(&def.short)).or_default();
            for full in &def.full {
                entry.push((normalize(full), gender));
            }
        }

        lexicon.china_surnames = file.chinese.surnames.iter().map(|s| normalize(s)).collect();

        debug!(
            resource = name,
            lemmas = lexicon.lemma_count,
            forms = lexicon.forms.len(),
            "Lexicon loaded"
        );
        Ok(lexicon)
    }

    fn add_lemma(
        &mut self,
        lemma: &str,
        class: MorphClass,
        gender: MorphGender,
        strip: usize,
        endings: &[Ending],
    ) {
        let char_count = lemma.chars().count();
        let stem: String = lemma.chars().take(char_count.saturating_sub(strip)).collect();
        let gendered_lemma = |g: MorphGender| -> Option<String> {
            endings
                .iter()
                .find(|e| {
                    e.case.is_nominative()
                        && e.number == MorphNumber::SINGULAR
                        && (e.gender.is_undefined() || e.gender.contains(g))
                })
                .map(|e| format!("{stem}{}", e.suffix))
        };

        for ending in endings {
            let surface = format!("{stem}{}", ending.suffix);
            let form_gender = if ending.gender.is_undefined() {
                gender
            } else {
                ending.gender
            };
            let mut form = WordForm::new(lemma, class)
                .with_gender(form_gender)
                .with_case(ending.case)
                .with_number(ending.number)
                .in_dictionary(true);
            form.short_form = ending.short_form;
            // Proper names keep the gendered lemma (ИВАНОВА) with the
            // paradigm lemma (ИВАНОВ) as the full form.
            if class.is_proper() && form_gender != gender && !form_gender.is_undefined() {
                if let Some(own) = gendered_lemma(form_gender) {
                    if own != lemma {
                        form.normal_case = own;
                        form.normal_full = Some(lemma.to_string());
                    }
                }
            }
            self.by_lemma
                .entry(form.normal_case.clone())
                .or_default()
                .push((surface.clone(), form.clone()));
            if let Some(full) = &form.normal_full {
                self.by_lemma
                    .entry(full.clone())
                    .or_default()
                    .push((surface.clone(), form.clone()));
            }
            let readings = self.forms.entry(surface).or_default();
            if !readings.contains(&form) {
                readings.push(form);
            }
        }
        self.lemma_count += 1;
    }

    /// Number of lemmas loaded
    pub fn lemma_count(&self) -> usize {
        self.lemma_count
    }

    /// Readings found in the dictionary only, without guessing
    pub fn lookup(&self, term: &str) -> &[WordForm] {
        self.forms.get(term).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Morphology for Lexicon {
    fn analyze(&self, term: &str) -> Vec<WordForm> {
        let term = normalize(term);
        if let Some(forms) = self.forms.get(&term) {
            return forms.clone();
        }
        let guessed = guess_forms(&term);
        if guessed.is_empty() {
            vec![WordForm::new(term, MorphClass::UNDEFINED).with_case(MorphCase::ALL_CASES)]
        } else {
            guessed
        }
    }

    fn inflect(
        &self,
        lemma: &str,
        class: MorphClass,
        gender: MorphGender,
        case: MorphCase,
        number: MorphNumber,
    ) -> Option<String> {
        let lemma = normalize(lemma);
        let number = if number.is_undefined() {
            MorphNumber::SINGULAR
        } else {
            number
        };
        if let Some(entries) = self.by_lemma.get(&lemma) {
            let found = entries.iter().find(|(_, form)| {
                (class.is_undefined() || form.class.intersects(class))
                    && (gender.is_undefined() || form.gender.intersects(gender))
                    && form.case.contains(case)
                    && form.number.intersects(number)
            });
            if let Some((surface, _)) = found {
                return Some(surface.clone());
            }
        }
        if class.is_proper_surname() && case == MorphCase::NOMINATIVE {
            return inflect_surname_nominative(&lemma, gender);
        }
        None
    }

    fn short_names(&self, name: &str) -> Vec<(String, MorphGender)> {
        self.short_names
            .get(&normalize(name))
            .cloned()
            .unwrap_or_default()
    }

    fn is_china_surname(&self, term: &str) -> bool {
        self.china_surnames.contains(&normalize(term))
    }
}

/// Upper case with Ё folded into Е
pub fn normalize(word: &str) -> String {
    word.trim().to_uppercase().replace('Ё', "Е")
}

// ============================================================================
// Suffix guesser
// ============================================================================

/// (ending, lemma tail, gender, case)
type GuessRule = (&'static str, &'static str, MorphGender, MorphCase);

const M: MorphGender = MorphGender::MASCULINE;
const F: MorphGender = MorphGender::FEMININE;

/// Possessive surname families (ИВАНОВ, ПУТИН)
const POSSESSIVE_BASES: &[&str] = &["ОВ", "ЕВ", "ЄВ", "ИН", "ЫН", "ІН"];

/// Case endings after a possessive base; the flag marks feminine readings
const POSSESSIVE_ENDINGS: &[(&str, MorphGender, MorphCase, bool)] = &[
    ("", M, MorphCase::NOMINATIVE, false),
    ("А", M, MorphCase(MorphCase::GENITIVE.0 | MorphCase::ACCUSATIVE.0), false),
    ("А", F, MorphCase::NOMINATIVE, true),
    ("У", M, MorphCase::DATIVE, false),
    ("У", F, MorphCase::ACCUSATIVE, true),
    ("ЫМ", M, MorphCase::INSTRUMENTAL, false),
    ("Е", M, MorphCase::PREPOSITIONAL, false),
    (
        "ОЙ",
        F,
        MorphCase(
            MorphCase::GENITIVE.0
                | MorphCase::DATIVE.0
                | MorphCase::INSTRUMENTAL.0
                | MorphCase::PREPOSITIONAL.0,
        ),
        true,
    ),
];

/// Adjectival surnames (ЧАЙКОВСКИЙ) and patronymics
const ADJECTIVAL_RULES: &[GuessRule] = &[
    ("СКИЙ", "СКИЙ", M, MorphCase::NOMINATIVE),
    ("ЦКИЙ", "ЦКИЙ", M, MorphCase::NOMINATIVE),
    ("СКОГО", "СКИЙ", M, MorphCase(MorphCase::GENITIVE.0 | MorphCase::ACCUSATIVE.0)),
    ("ЦКОГО", "ЦКИЙ", M, MorphCase(MorphCase::GENITIVE.0 | MorphCase::ACCUSATIVE.0)),
    ("СКОМУ", "СКИЙ", M, MorphCase::DATIVE),
    ("ЦКОМУ", "ЦКИЙ", M, MorphCase::DATIVE),
    ("СКИМ", "СКИЙ", M, MorphCase::INSTRUMENTAL),
    ("ЦКИМ", "ЦКИЙ", M, MorphCase::INSTRUMENTAL),
    ("СКОМ", "СКИЙ", M, MorphCase::PREPOSITIONAL),
    ("ЦКОМ", "ЦКИЙ", M, MorphCase::PREPOSITIONAL),
    ("СКАЯ", "СКАЯ", F, MorphCase::NOMINATIVE),
    ("ЦКАЯ", "ЦКАЯ", F, MorphCase::NOMINATIVE),
    (
        "СКОЙ",
        "СКАЯ",
        F,
        MorphCase(
            MorphCase::GENITIVE.0
                | MorphCase::DATIVE.0
                | MorphCase::INSTRUMENTAL.0
                | MorphCase::PREPOSITIONAL.0,
        ),
    ),
    ("СКУЮ", "СКАЯ", F, MorphCase::ACCUSATIVE),
];

const PATRONYMIC_RULES: &[GuessRule] = &[
    ("ОВИЧ", "ОВИЧ", M, MorphCase::NOMINATIVE),
    ("ЕВИЧ", "ЕВИЧ", M, MorphCase::NOMINATIVE),
    ("ОВИЧА", "ОВИЧ", M, MorphCase(MorphCase::GENITIVE.0 | MorphCase::ACCUSATIVE.0)),
    ("ЕВИЧА", "ЕВИЧ", M, MorphCase(MorphCase::GENITIVE.0 | MorphCase::ACCUSATIVE.0)),
    ("ОВИЧУ", "ОВИЧ", M, MorphCase::DATIVE),
    ("ЕВИЧУ", "ЕВИЧ", M, MorphCase::DATIVE),
    ("ОВИЧЕМ", "ОВИЧ", M, MorphCase::INSTRUMENTAL),
    ("ЕВИЧЕМ", "ЕВИЧ", M, MorphCase::INSTRUMENTAL),
    ("ОВИЧЕ", "ОВИЧ", M, MorphCase::PREPOSITIONAL),
    ("ЕВИЧЕ", "ЕВИЧ", M, MorphCase::PREPOSITIONAL),
    ("ОВНА", "ОВНА", F, MorphCase::NOMINATIVE),
    ("ЕВНА", "ЕВНА", F, MorphCase::NOMINATIVE),
    ("ИЧНА", "ИЧНА", F, MorphCase::NOMINATIVE),
    ("ОВНЫ", "ОВНА", F, MorphCase::GENITIVE),
    ("ЕВНЫ", "ЕВНА", F, MorphCase::GENITIVE),
    ("ОВНЕ", "ОВНА", F, MorphCase(MorphCase::DATIVE.0 | MorphCase::PREPOSITIONAL.0)),
    ("ЕВНЕ", "ЕВНА", F, MorphCase(MorphCase::DATIVE.0 | MorphCase::PREPOSITIONAL.0)),
    ("ОВНУ", "ОВНА", F, MorphCase::ACCUSATIVE),
    ("ЕВНУ", "ЕВНА", F, MorphCase::ACCUSATIVE),
    ("ОВНОЙ", "ОВНА", F, MorphCase::INSTRUMENTAL),
    ("ЕВНОЙ", "ЕВНА", F, MorphCase::INSTRUMENTAL),
];

/// Indeclinable surname tails
const INDECLINABLE_TAILS: &[&str] = &[
    "ЕНКО", "ЧУК", "ЮК", "ДЗЕ", "ШВИЛИ", "ВИЛИ", "ЯН", "ИХ", "ЫХ", "АГО", "ЯГО",
];

fn replace_tail(term: &str, tail: &str, with: &str) -> String {
    format!("{}{}", &term[..term.len() - tail.len()], with)
}

fn guess_forms(term: &str) -> Vec<WordForm> {
    let len = term.chars().count();
    if len < 4 || !term.chars().all(is_cyrillic_letter) {
        return Vec::new();
    }
    let mut res = Vec::new();
    let surname = MorphClass::PROPER | MorphClass::PROPER_SURNAME;

    for base in POSSESSIVE_BASES {
        for (ending, gender, case, fem_lemma) in POSSESSIVE_ENDINGS {
            let tail = format!("{base}{ending}");
            if !term.ends_with(&tail) || term.chars().count() < tail.chars().count() + 2 {
                continue;
            }
            let masc = replace_tail(term, &tail, base);
            let mut form = WordForm::new(masc.clone(), surname)
                .with_gender(*gender)
                .with_case(*case)
                .with_number(MorphNumber::SINGULAR);
            if *fem_lemma {
                form.normal_case = format!("{masc}А");
                form.normal_full = Some(masc);
            }
            res.push(form);
        }
    }

    for (ending, lemma_tail, gender, case) in ADJECTIVAL_RULES {
        if term.ends_with(ending) && len > ending.chars().count() + 1 {
            let lemma = replace_tail(term, ending, lemma_tail);
            let mut form = WordForm::new(lemma.clone(), surname)
                .with_gender(*gender)
                .with_case(*case)
                .with_number(MorphNumber::SINGULAR);
            if *gender == F {
                form.normal_full = Some(replace_tail(&lemma, "АЯ", "ИЙ"));
            }
            res.push(form);
        }
    }

    for (ending, lemma_tail, gender, case) in PATRONYMIC_RULES {
        if term.ends_with(ending) && len > ending.chars().count() + 1 {
            res.push(
                WordForm::new(
                    replace_tail(term, ending, lemma_tail),
                    MorphClass::PROPER | MorphClass::PROPER_SECNAME,
                )
                .with_gender(*gender)
                .with_case(*case)
                .with_number(MorphNumber::SINGULAR),
            );
        }
    }

    if res.is_empty() && INDECLINABLE_TAILS.iter().any(|t| term.ends_with(t)) {
        res.push(
            WordForm::new(term, surname)
                .with_case(MorphCase::ALL_CASES)
                .with_number(MorphNumber::SINGULAR),
        );
    }
    res
}

fn inflect_surname_nominative(lemma: &str, gender: MorphGender) -> Option<String> {
    if gender == F {
        if POSSESSIVE_BASES.iter().any(|b| lemma.ends_with(b)) {
            return Some(format!("{lemma}А"));
        }
        if lemma.ends_with("КИЙ") {
            return Some(replace_tail(lemma, "ИЙ", "АЯ"));
        }
    } else if gender == M {
        for base in POSSESSIVE_BASES {
            if lemma.ends_with(&format!("{base}А")) {
                return Some(replace_tail(lemma, "А", ""));
            }
        }
        if lemma.ends_with("КАЯ") {
            return Some(replace_tail(lemma, "АЯ", "ИЙ"));
        }
    }
    None
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'А'..='Я' | 'а'..='я' | 'Ё' | 'ё' | 'І' | 'і' | 'Ї' | 'ї' | 'Є' | 'є' | 'Ґ' | 'ґ')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::builtin().unwrap()
    }

    #[test]
    fn test_builtin_loads() {
        let lex = lexicon();
        assert!(lex.lemma_count() > 100);
    }

    #[test]
    fn test_analyze_dictionary_name() {
        let lex = lexicon();
        let forms = lex.analyze("ИВАНА");
        assert!(forms.iter().any(|f| f.class.is_proper_name()
            && f.normal_case == "ИВАН"
            && f.case.is_genitive()
            && f.in_dictionary));
    }

    #[test]
    fn test_analyze_feminine_surname_keeps_full_lemma() {
        let lex = lexicon();
        let forms = lex.analyze("ИВАНОВА");
        let fem = forms
            .iter()
            .find(|f| f.gender == MorphGender::FEMININE && f.case.is_nominative())
            .unwrap();
        assert_eq!(fem.normal_case, "ИВАНОВА");
        assert_eq!(fem.normal_full.as_deref(), Some("ИВАНОВ"));
        assert!(forms
            .iter()
            .any(|f| f.gender == MorphGender::MASCULINE && f.case.is_genitive()));
    }

    #[test]
    fn test_guess_unknown_surname() {
        let lex = lexicon();
        let forms = lex.analyze("ПУПКИНА");
        assert!(forms.iter().all(|f| !f.in_dictionary));
        assert!(forms
            .iter()
            .any(|f| f.class.is_proper_surname() && f.normal_case == "ПУПКИН"));
    }

    #[test]
    fn test_guess_patronymic() {
        let forms = guess_forms("ФЕДОТОВИЧА");
        assert!(forms
            .iter()
            .any(|f| f.class.is_proper_secname() && f.normal_case == "ФЕДОТОВИЧ"));
    }

    #[test]
    fn test_unknown_word_reading() {
        let lex = lexicon();
        let forms = lex.analyze("QWERTY");
        assert_eq!(forms.len(), 1);
        assert!(forms[0].class.is_undefined());
        assert!(!forms[0].in_dictionary);
    }

    #[test]
    fn test_inflect_surname_gender() {
        let lex = lexicon();
        assert_eq!(
            lex.inflect(
                "ИВАНОВ",
                MorphClass::PROPER_SURNAME,
                MorphGender::FEMININE,
                MorphCase::NOMINATIVE,
                MorphNumber::SINGULAR
            )
            .as_deref(),
            Some("ИВАНОВА")
        );
        assert_eq!(
            lex.inflect(
                "ПУПКИН",
                MorphClass::PROPER_SURNAME,
                MorphGender::FEMININE,
                MorphCase::NOMINATIVE,
                MorphNumber::SINGULAR
            )
            .as_deref(),
            Some("ПУПКИНА")
        );
    }

    #[test]
    fn test_short_names() {
        let lex = lexicon();
        let full = lex.short_names("Саша");
        assert!(full.iter().any(|(n, g)| n == "АЛЕКСАНДР" && *g == MorphGender::MASCULINE));
        assert!(full.iter().any(|(n, g)| n == "АЛЕКСАНДРА" && *g == MorphGender::FEMININE));
    }

    #[test]
    fn test_china_surnames() {
        let lex = lexicon();
        assert!(lex.is_china_surname("Чжан"));
        assert!(!lex.is_china_surname("ИВАНОВ"));
    }

    #[test]
    fn test_bad_paradigm_is_resource_error() {
        let err = Lexicon::from_toml_str(
            "bad",
            r#"
            [[group]]
            class = "noun"
            paradigm = "missing"
            lemmas = ["ДОМ"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PersonaError::Resource { .. }));
    }
}
