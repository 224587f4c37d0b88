//! Per-item name role candidates
//!
//! While segmenting, every item may be a first name, a surname or a
//! patronymic at the same time. Each role is a [`NamePart`]: the readings
//! of the token that support the role plus a few flags used by scoring.

use persona_core::lexicon::Morphology;
use persona_core::text::ends_with_any;
use persona_core::{MorphCase, MorphClass, MorphGender, MorphInfo, MorphNumber, WordForm};

/// Surname suffix with the gender it implies
struct SurnameTail {
    tail: &'static str,
    gender: MorphGender,
}

const fn tail(tail: &'static str, gender: MorphGender) -> SurnameTail {
    SurnameTail { tail, gender }
}

/// Standard surname tails, gendered ones first
const LASTNAME_STD_TAILS: &[SurnameTail] = &[
    tail("ОВ", MorphGender::MASCULINE),
    tail("ОВА", MorphGender::FEMININE),
    tail("ЕВ", MorphGender::MASCULINE),
    tail("ЕВА", MorphGender::FEMININE),
    tail("ЄВ", MorphGender::MASCULINE),
    tail("ЄВА", MorphGender::FEMININE),
    tail("ИН", MorphGender::MASCULINE),
    tail("ИНА", MorphGender::FEMININE),
    tail("ІН", MorphGender::MASCULINE),
    tail("ІНА", MorphGender::FEMININE),
    tail("ЕР", MorphGender::UNDEFINED),
    tail("РН", MorphGender::UNDEFINED),
    tail("ДЗЕ", MorphGender::UNDEFINED),
    tail("ВИЛИ", MorphGender::UNDEFINED),
    tail("ЯН", MorphGender::UNDEFINED),
    tail("УК", MorphGender::UNDEFINED),
    tail("ЮК", MorphGender::UNDEFINED),
    tail("КО", MorphGender::UNDEFINED),
    tail("МАН", MorphGender::UNDEFINED),
    tail("АНН", MorphGender::UNDEFINED),
    tail("ЙН", MorphGender::UNDEFINED),
    tail("УН", MorphGender::UNDEFINED),
    tail("СКУ", MorphGender::UNDEFINED),
    tail("СКИ", MorphGender::UNDEFINED),
    tail("СЬКІ", MorphGender::UNDEFINED),
    tail("ИЛО", MorphGender::UNDEFINED),
    tail("ІЛО", MorphGender::UNDEFINED),
    tail("АЛО", MorphGender::UNDEFINED),
    tail("ИК", MorphGender::UNDEFINED),
    tail("СОН", MorphGender::UNDEFINED),
    tail("РА", MorphGender::UNDEFINED),
    tail("НДА", MorphGender::UNDEFINED),
    tail("НДО", MorphGender::UNDEFINED),
    tail("ЕС", MorphGender::UNDEFINED),
    tail("АС", MorphGender::UNDEFINED),
    tail("АВА", MorphGender::UNDEFINED),
    tail("ЛС", MorphGender::UNDEFINED),
    tail("ЛЮС", MorphGender::UNDEFINED),
    tail("ЛЬС", MorphGender::UNDEFINED),
    tail("ЙЗ", MorphGender::UNDEFINED),
    tail("ЕРГ", MorphGender::UNDEFINED),
    tail("ИНГ", MorphGender::UNDEFINED),
    tail("OR", MorphGender::UNDEFINED),
    tail("ER", MorphGender::UNDEFINED),
    tail("OV", MorphGender::UNDEFINED),
    tail("IN", MorphGender::UNDEFINED),
    tail("ERG", MorphGender::UNDEFINED),
];

/// Tails that decide the gender of a surname
pub const LASTNAME_SEX_STD_TAILS: &[&str] = &[
    "ОВ", "ОВА", "ЕВ", "ЄВ", "ЕВА", "ЄВА", "ИН", "ИНА", "ІН", "ІНА", "КИЙ", "КАЯ",
];

fn find_tail(value: &str) -> Option<&'static SurnameTail> {
    LASTNAME_STD_TAILS.iter().find(|t| value.ends_with(t.tail))
}

/// Value ends with a standard surname suffix
pub fn ends_with_std_surname(value: &str) -> bool {
    find_tail(value).is_some()
}

/// Gender implied by a standard surname suffix
pub fn std_tail_gender(value: &str) -> MorphGender {
    find_tail(value).map_or(MorphGender::UNDEFINED, |t| t.gender)
}

/// Strip an inflection ending so case forms of one surname compare equal
/// (ИВАНОВА → ИВАНОВ, ПЕТРОВЫМ → ПЕТРОВ, ГАЛИНЯ → ГАЛИНЬ)
pub fn del_surname_end(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 3 {
        return s.to_string();
    }
    let last = chars[chars.len() - 1];
    if matches!(last, 'А' | 'У' | 'Е') {
        return chars[..chars.len() - 1].iter().collect();
    }
    if s.ends_with("ОМ") || s.ends_with("ЫМ") {
        return chars[..chars.len() - 2].iter().collect();
    }
    if matches!(last, 'Я' | 'Ю') && matches!(chars[chars.len() - 2], 'Н' | 'Л') {
        let mut res: String = chars[..chars.len() - 1].iter().collect();
        res.push('Ь');
        return res;
    }
    s.to_string()
}

/// One reading supporting a name role
#[derive(Debug, Clone, PartialEq)]
pub struct NameVariant {
    pub value: String,
    /// Diminutive the value was expanded from (САША for АЛЕКСАНДР)
    pub short_value: Option<String>,
    pub class: MorphClass,
    pub gender: MorphGender,
    pub number: MorphNumber,
    pub case: MorphCase,
}

impl NameVariant {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            short_value: None,
            class: MorphClass::UNDEFINED,
            gender: MorphGender::UNDEFINED,
            number: MorphNumber::UNDEFINED,
            case: MorphCase::UNDEFINED,
        }
    }

    /// Variant carrying the features of a word form
    pub fn from_form(value: impl Into<String>, form: &WordForm) -> Self {
        Self {
            value: value.into(),
            short_value: None,
            class: form.class,
            gender: form.gender,
            number: form.number,
            case: form.case,
        }
    }

    pub fn with_gender(mut self, gender: MorphGender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_case(mut self, case: MorphCase) -> Self {
        self.case = case;
        self
    }

    fn copy_features(&mut self, other: &NameVariant) {
        self.class = other.class;
        self.gender = other.gender;
        self.number = other.number;
        self.case = other.case;
    }
}

/// Candidate readings of an item in one name role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamePart {
    pub vars: Vec<NameVariant>,
    pub term: Option<String>,
    pub is_in_dictionary: bool,
    pub is_in_ontology: bool,
    pub has_std_tail: bool,
    pub has_hiphen: bool,
    pub has_std_postfix: bool,
}

impl NamePart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(term: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            ..Self::default()
        }
    }

    /// Union of the features of all variants
    pub fn morph(&self) -> MorphInfo {
        let mut res = MorphInfo::new();
        for v in &self.vars {
            res.class |= v.class;
            res.gender |= v.gender;
            res.number |= v.number;
            res.case |= v.case;
        }
        res
    }

    /// MASCULINE or FEMININE when all variants agree
    pub fn gender(&self) -> MorphGender {
        let g = self.morph().gender;
        if g == MorphGender::MASCULINE || g == MorphGender::FEMININE {
            g
        } else {
            MorphGender::UNDEFINED
        }
    }

    pub fn case(&self) -> MorphCase {
        self.morph().case
    }

    /// Strong surname evidence: dictionary, ontology or a standard tail
    pub fn is_strong(&self) -> bool {
        self.is_in_dictionary || self.is_in_ontology || self.has_std_tail
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.vars.iter().any(|v| v.value == value)
    }

    /// Term, or the first variant's value
    pub fn key(&self) -> Option<&str> {
        self.term
            .as_deref()
            .or_else(|| self.vars.first().map(|v| v.value.as_str()))
    }

    pub fn is_china_surname(&self, morphology: &dyn Morphology) -> bool {
        let Some(term) = self.key() else {
            return false;
        };
        if morphology.is_china_surname(term) {
            return true;
        }
        if morphology.is_china_surname(&del_surname_end(term)) {
            return true;
        }
        if morphology.is_china_surname(&format!("{term}Ь")) {
            return true;
        }
        match term.strip_suffix('Ь') {
            Some(stripped) => morphology.is_china_surname(stripped),
            None => false,
        }
    }

    /// Glue the variants of `second` onto ours through a hyphen, pairing
    /// compatible genders (АННА + МАРИЯ → АННА-МАРИЯ)
    pub fn merge_hiphen(&mut self, second: &NamePart) {
        let mut extra = Vec::new();
        for v in &mut self.vars {
            if let Some(vv) = second.vars.iter().find(|vv| vv.gender.intersects(v.gender)) {
                v.value = format!("{}-{}", v.value, vv.value);
                continue;
            }
            if !v.gender.is_undefined() {
                if let Some(vv) = second.vars.iter().find(|vv| vv.gender.is_undefined()) {
                    v.value = format!("{}-{}", v.value, vv.value);
                    continue;
                }
            } else {
                let base = v.value.clone();
                let mut merged = 0;
                for vv in second.vars.iter().filter(|vv| !vv.gender.is_undefined()) {
                    if merged == 0 {
                        v.value = format!("{base}-{}", vv.value);
                        v.copy_features(vv);
                    } else {
                        let mut nv = vv.clone();
                        nv.value = format!("{base}-{}", vv.value);
                        nv.short_value = None;
                        extra.push(nv);
                    }
                    merged += 1;
                }
                if merged > 0 {
                    continue;
                }
            }
            if let Some(first) = second.vars.first() {
                v.value = format!("{}-{}", v.value, first.value);
            }
        }
        self.vars.extend(extra);
    }

    pub fn add_prefix(&mut self, prefix: &str) {
        if let Some(term) = &mut self.term {
            *term = format!("{prefix}{term}");
        }
        for v in &mut self.vars {
            v.value = format!("{prefix}{}", v.value);
        }
    }

    /// Append an Arabic/Turkic postfix (-ОГЛЫ, -ПАША)
    pub fn add_postfix(&mut self, postfix: &str, gender: MorphGender) {
        if let Some(term) = &mut self.term {
            *term = format!("{term}-{postfix}");
        }
        for v in &mut self.vars {
            v.value = format!("{}-{postfix}", v.value);
            if !gender.is_undefined() {
                v.gender = gender;
            }
        }
        self.has_std_postfix = true;
        self.is_in_dictionary = false;
    }

    /// Cross product with the role of the item after a hyphen
    pub fn merge_with_by_hiphen(&mut self, mut other: NamePart) {
        self.term = Some(format!(
            "{}-{}",
            self.term.as_deref().unwrap_or_default(),
            other.term.as_deref().unwrap_or_default()
        ));
        self.is_in_dictionary |= other.is_in_dictionary;
        self.has_std_postfix |= other.has_std_postfix;
        self.has_hiphen = true;
        if other.vars.is_empty() {
            if let Some(t) = other.term.as_deref() {
                let t = t.to_string();
                for v in &mut self.vars {
                    v.value = format!("{}-{t}", v.value);
                }
                self.has_std_postfix = true;
                self.is_in_dictionary = false;
            }
            return;
        }
        if self.vars.is_empty() {
            if let Some(first_term) = self.term.as_deref().and_then(|t| t.split('-').next()) {
                let prefix = format!("{first_term}-");
                other.add_prefix(&prefix);
            }
            self.vars = other.vars;
            return;
        }
        let mut res = Vec::with_capacity(self.vars.len() * other.vars.len());
        for v in &self.vars {
            for vv in &other.vars {
                let mut nv = v.clone();
                nv.value = format!("{}-{}", v.value, vv.value);
                res.push(nv);
            }
        }
        self.vars = res;
    }

    /// Recompute the standard-tail flag and drop readings that contradict
    /// it; undefined genders are filled from the tail
    pub fn correct_lastname_variants(&mut self) {
        self.has_std_tail = false;
        let mut strong = false;
        for v in &self.vars {
            if ends_with_std_surname(&v.value) || ends_with_any(&v.value, &["АЯ", "ОЙ"]) {
                self.has_std_tail = true;
                strong = true;
                break;
            }
            if ends_with_any(&v.value, &["КИЙ", "ЫЙ"]) {
                self.has_std_tail = true;
            }
        }
        if !self.has_std_tail {
            return;
        }
        let mut i = self.vars.len();
        while i > 0 {
            i -= 1;
            let value = self.vars[i].value.clone();
            let tailed = ends_with_std_surname(&value)
                || ends_with_any(&value, &["АЯ", "ОЙ", "КИЙ", "ЫЙ", "ИХ", "ЫХ"]);
            if !tailed && (!self.vars[i].class.is_proper_surname() || strong) {
                self.vars.remove(i);
                continue;
            }
            if self.vars[i].gender.is_undefined() {
                let dup = self
                    .vars
                    .iter()
                    .enumerate()
                    .any(|(j, v)| j != i && v.value == value && !v.gender.is_undefined());
                if dup {
                    self.vars.remove(i);
                    continue;
                }
                self.vars[i].gender = match find_tail(&value) {
                    Some(t) => t.gender,
                    None if value.ends_with('А') || value.ends_with('Я') => MorphGender::FEMININE,
                    None => MorphGender::MASCULINE,
                };
            }
        }
    }

    /// Keep genitive readings when there are any
    pub fn remove_not_genitive(&mut self) {
        if self.vars.iter().any(|v| v.case.is_genitive()) {
            self.vars.retain(|v| v.case.is_genitive());
        }
    }
}

impl std::fmt::Display for NamePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(term) = &self.term {
            write!(f, "{term}")?;
        }
        for v in &self.vars {
            write!(f, "; {} {} {}", v.value, v.gender, v.case)?;
        }
        if self.is_in_dictionary {
            write!(f, " - InDictionary")?;
        }
        if self.is_in_ontology {
            write!(f, " - InOntology")?;
        }
        if self.has_std_tail {
            write!(f, " - StdTail")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::Lexicon;

    fn part(values: &[(&str, MorphGender)]) -> NamePart {
        let mut p = NamePart::new();
        for (v, g) in values {
            p.vars.push(NameVariant::new(*v).with_gender(*g));
        }
        p
    }

    #[test]
    fn test_std_tails() {
        assert!(ends_with_std_surname("ПЕТРОВА"));
        assert_eq!(std_tail_gender("ПЕТРОВА"), MorphGender::FEMININE);
        assert_eq!(std_tail_gender("ШЕВЧЕНКО"), MorphGender::UNDEFINED);
        assert!(!ends_with_std_surname("СМИТ"));
    }

    #[test]
    fn test_del_surname_end() {
        assert_eq!(del_surname_end("ИВАНОВА"), "ИВАНОВ");
        assert_eq!(del_surname_end("ПЕТРОВЫМ"), "ПЕТРОВ");
        assert_eq!(del_surname_end("ГАЛИНЯ"), "ГАЛИНЬ");
        assert_eq!(del_surname_end("ЛИ"), "ЛИ");
    }

    #[test]
    fn test_merge_hiphen_pairs_genders() {
        let mut first = part(&[("АННА", MorphGender::FEMININE)]);
        let second = part(&[("МАРИЯ", MorphGender::FEMININE), ("МАРИЙ", MorphGender::MASCULINE)]);
        first.merge_hiphen(&second);
        assert_eq!(first.vars.len(), 1);
        assert_eq!(first.vars[0].value, "АННА-МАРИЯ");

        let mut undef = part(&[("ЖАН", MorphGender::UNDEFINED)]);
        undef.merge_hiphen(&second);
        assert_eq!(undef.vars.len(), 2);
        assert_eq!(undef.vars[1].value, "ЖАН-МАРИЙ");
        assert_eq!(undef.vars[1].gender, MorphGender::MASCULINE);
    }

    #[test]
    fn test_add_postfix() {
        let mut p = part(&[("МАМЕД", MorphGender::UNDEFINED)]);
        p.term = Some("МАМЕД".to_string());
        p.is_in_dictionary = true;
        p.add_postfix("ОГЛЫ", MorphGender::MASCULINE);
        assert_eq!(p.vars[0].value, "МАМЕД-ОГЛЫ");
        assert_eq!(p.vars[0].gender, MorphGender::MASCULINE);
        assert_eq!(p.term.as_deref(), Some("МАМЕД-ОГЛЫ"));
        assert!(p.has_std_postfix);
        assert!(!p.is_in_dictionary);
    }

    #[test]
    fn test_merge_with_by_hiphen_cross_product() {
        let mut a = part(&[("РИМСКИЙ", MorphGender::MASCULINE)]);
        a.term = Some("РИМСКИЙ".to_string());
        let mut b = part(&[
            ("КОРСАКОВ", MorphGender::MASCULINE),
            ("КОРСАКОВА", MorphGender::FEMININE),
        ]);
        b.term = Some("КОРСАКОВ".to_string());
        a.merge_with_by_hiphen(b);
        assert_eq!(a.vars.len(), 2);
        assert_eq!(a.vars[1].value, "РИМСКИЙ-КОРСАКОВА");
        assert!(a.has_hiphen);
        assert_eq!(a.term.as_deref(), Some("РИМСКИЙ-КОРСАКОВ"));
    }

    #[test]
    fn test_correct_lastname_variants() {
        let mut p = part(&[("ПЕТРОВ", MorphGender::UNDEFINED), ("ПЕТР", MorphGender::MASCULINE)]);
        p.correct_lastname_variants();
        assert!(p.has_std_tail);
        assert_eq!(p.vars.len(), 1);
        assert_eq!(p.vars[0].gender, MorphGender::MASCULINE);
    }

    #[test]
    fn test_remove_not_genitive() {
        let mut p = NamePart::new();
        p.vars.push(NameVariant::new("ИВАН").with_case(MorphCase::GENITIVE));
        p.vars.push(NameVariant::new("ИВАН").with_case(MorphCase::NOMINATIVE));
        p.remove_not_genitive();
        assert_eq!(p.vars.len(), 1);
    }

    #[test]
    fn test_china_surname() {
        let lex = Lexicon::shared().unwrap();
        let p = NamePart::with_term("ЧЖАН");
        assert!(p.is_china_surname(lex.as_ref()));
        assert!(!NamePart::with_term("ИВАНОВ").is_china_surname(lex.as_ref()));
    }
}
