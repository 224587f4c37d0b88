//! Morphological features
//!
//! Gender, case, number, word class and language are small bitmasks: a
//! word form carries the exact features, while summaries over several
//! forms carry their union.

use serde::{Deserialize, Serialize};

macro_rules! bitmask {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($ty:ty) {
            $( const $flag:ident = $val:expr, $label:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $ty);

        impl $name {
            pub const UNDEFINED: Self = Self(0);
            $( pub const $flag: Self = Self($val); )*

            const LABELS: &'static [(Self, &'static str)] = &[$( (Self($val), $label) ),*];

            pub fn bits(self) -> $ty {
                self.0
            }

            pub fn is_undefined(self) -> bool {
                self.0 == 0
            }

            /// Every bit of `other` is set in `self`
            pub fn contains(self, other: Self) -> bool {
                other.0 != 0 && (self.0 & other.0) == other.0
            }

            pub fn intersects(self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            pub fn labels(self) -> Vec<&'static str> {
                Self::LABELS
                    .iter()
                    .filter(|(flag, _)| self.contains(*flag))
                    .map(|(_, label)| *label)
                    .collect()
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl std::ops::BitAndAssign for $name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.0 &= rhs.0;
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_undefined() {
                    return write!(f, "undefined");
                }
                write!(f, "{}", self.labels().join("|"))
            }
        }
    };
}

bitmask! {
    /// Grammatical gender
    pub struct MorphGender(u8) {
        const MASCULINE = 1, "masc";
        const FEMININE = 2, "fem";
        const NEUTER = 4, "neut";
    }
}

bitmask! {
    /// Grammatical case
    pub struct MorphCase(u8) {
        const NOMINATIVE = 1, "nom";
        const GENITIVE = 2, "gen";
        const DATIVE = 4, "dat";
        const ACCUSATIVE = 8, "acc";
        const INSTRUMENTAL = 16, "ins";
        const PREPOSITIONAL = 32, "prep";
        const VOCATIVE = 64, "voc";
    }
}

bitmask! {
    /// Grammatical number
    pub struct MorphNumber(u8) {
        const SINGULAR = 1, "sg";
        const PLURAL = 2, "pl";
    }
}

bitmask! {
    /// Part of speech and proper-name subclasses
    pub struct MorphClass(u16) {
        const NOUN = 1, "noun";
        const ADJECTIVE = 2, "adj";
        const VERB = 4, "verb";
        const ADVERB = 8, "adv";
        const PRONOUN = 16, "pronoun";
        const MISC = 32, "misc";
        const PREPOSITION = 64, "prep";
        const CONJUNCTION = 128, "conj";
        const PROPER = 256, "proper";
        const PROPER_SURNAME = 512, "surname";
        const PROPER_NAME = 1024, "name";
        const PROPER_SECNAME = 2048, "secname";
        const PROPER_GEO = 4096, "geo";
        const PERSONAL_PRONOUN = 8192, "perspronoun";
    }
}

bitmask! {
    /// Text language
    pub struct MorphLang(u8) {
        const RU = 1, "ru";
        const UA = 2, "ua";
        const EN = 4, "en";
    }
}

impl MorphCase {
    pub const ALL_CASES: Self = Self(127);

    pub fn is_nominative(self) -> bool {
        self.intersects(Self::NOMINATIVE)
    }

    pub fn is_genitive(self) -> bool {
        self.intersects(Self::GENITIVE)
    }

    pub fn is_dative(self) -> bool {
        self.intersects(Self::DATIVE)
    }

    pub fn is_accusative(self) -> bool {
        self.intersects(Self::ACCUSATIVE)
    }

    pub fn is_instrumental(self) -> bool {
        self.intersects(Self::INSTRUMENTAL)
    }

    pub fn is_prepositional(self) -> bool {
        self.intersects(Self::PREPOSITIONAL)
    }

    /// Parse a lexicon tag (`nom`, `gen`, ... `all`)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "nom" => Some(Self::NOMINATIVE),
            "gen" => Some(Self::GENITIVE),
            "dat" => Some(Self::DATIVE),
            "acc" => Some(Self::ACCUSATIVE),
            "ins" => Some(Self::INSTRUMENTAL),
            "prep" => Some(Self::PREPOSITIONAL),
            "voc" => Some(Self::VOCATIVE),
            "all" => Some(Self::ALL_CASES),
            _ => None,
        }
    }
}

impl MorphGender {
    /// The other of masculine/feminine, undefined otherwise
    pub fn opposite(self) -> Self {
        if self == Self::MASCULINE {
            Self::FEMININE
        } else if self == Self::FEMININE {
            Self::MASCULINE
        } else {
            Self::UNDEFINED
        }
    }

    pub fn is_masculine(self) -> bool {
        self.intersects(Self::MASCULINE)
    }

    pub fn is_feminine(self) -> bool {
        self.intersects(Self::FEMININE)
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "m" => Some(Self::MASCULINE),
            "f" => Some(Self::FEMININE),
            "n" => Some(Self::NEUTER),
            "mf" => Some(Self::MASCULINE | Self::FEMININE),
            _ => None,
        }
    }
}

impl MorphClass {
    pub fn is_noun(self) -> bool {
        self.intersects(Self::NOUN)
    }

    pub fn is_adjective(self) -> bool {
        self.intersects(Self::ADJECTIVE)
    }

    pub fn is_verb(self) -> bool {
        self.intersects(Self::VERB)
    }

    pub fn is_adverb(self) -> bool {
        self.intersects(Self::ADVERB)
    }

    pub fn is_pronoun(self) -> bool {
        self.intersects(Self::PRONOUN)
    }

    pub fn is_personal_pronoun(self) -> bool {
        self.intersects(Self::PERSONAL_PRONOUN)
    }

    pub fn is_misc(self) -> bool {
        self.intersects(Self::MISC)
    }

    pub fn is_preposition(self) -> bool {
        self.intersects(Self::PREPOSITION)
    }

    pub fn is_conjunction(self) -> bool {
        self.intersects(Self::CONJUNCTION)
    }

    pub fn is_proper(self) -> bool {
        self.intersects(
            Self::PROPER
                | Self::PROPER_SURNAME
                | Self::PROPER_NAME
                | Self::PROPER_SECNAME
                | Self::PROPER_GEO,
        )
    }

    pub fn is_proper_surname(self) -> bool {
        self.intersects(Self::PROPER_SURNAME)
    }

    pub fn is_proper_name(self) -> bool {
        self.intersects(Self::PROPER_NAME)
    }

    pub fn is_proper_secname(self) -> bool {
        self.intersects(Self::PROPER_SECNAME)
    }

    pub fn is_proper_geo(self) -> bool {
        self.intersects(Self::PROPER_GEO)
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "noun" => Some(Self::NOUN),
            "adj" | "adjective" => Some(Self::ADJECTIVE),
            "verb" => Some(Self::VERB),
            "adv" | "adverb" => Some(Self::ADVERB),
            "pronoun" => Some(Self::PRONOUN),
            "personal_pronoun" => Some(Self::PRONOUN | Self::PERSONAL_PRONOUN),
            "misc" => Some(Self::MISC),
            "prep" | "preposition" => Some(Self::PREPOSITION),
            "conj" | "conjunction" => Some(Self::CONJUNCTION),
            "proper" => Some(Self::PROPER),
            "proper_surname" => Some(Self::PROPER | Self::PROPER_SURNAME),
            "proper_name" => Some(Self::PROPER | Self::PROPER_NAME),
            "proper_secname" => Some(Self::PROPER | Self::PROPER_SECNAME),
            "proper_geo" => Some(Self::PROPER | Self::PROPER_GEO),
            _ => None,
        }
    }
}

impl MorphLang {
    pub fn is_ru(self) -> bool {
        self.intersects(Self::RU)
    }

    pub fn is_ua(self) -> bool {
        self.intersects(Self::UA)
    }

    pub fn is_en(self) -> bool {
        self.intersects(Self::EN)
    }

    pub fn is_cyrillic(self) -> bool {
        self.intersects(Self::RU | Self::UA)
    }
}

// ============================================================================
// Word forms
// ============================================================================

/// One morphological reading of a token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordForm {
    /// Lemma in upper case (ИВАН for ИВАНА)
    pub normal_case: String,
    /// Full lemma when it differs, e.g. the masculine ИВАНОВ for ИВАНОВА
    pub normal_full: Option<String>,
    pub class: MorphClass,
    pub gender: MorphGender,
    pub number: MorphNumber,
    pub case: MorphCase,
    /// Found in the lexicon rather than guessed
    pub in_dictionary: bool,
    /// Short adjective form (ГОТОВ, НУЖНА)
    pub short_form: bool,
}

impl WordForm {
    pub fn new(normal_case: impl Into<String>, class: MorphClass) -> Self {
        Self {
            normal_case: normal_case.into(),
            normal_full: None,
            class,
            gender: MorphGender::UNDEFINED,
            number: MorphNumber::UNDEFINED,
            case: MorphCase::UNDEFINED,
            in_dictionary: false,
            short_form: false,
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

    pub fn with_number(mut self, number: MorphNumber) -> Self {
        self.number = number;
        self
    }

    pub fn in_dictionary(mut self, in_dictionary: bool) -> Self {
        self.in_dictionary = in_dictionary;
        self
    }

    /// Full lemma, falling back to `normal_case`
    pub fn normal_full_or_case(&self) -> &str {
        self.normal_full.as_deref().unwrap_or(&self.normal_case)
    }
}

/// Union of the features of several word forms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphInfo {
    pub class: MorphClass,
    pub gender: MorphGender,
    pub number: MorphNumber,
    pub case: MorphCase,
    pub lang: MorphLang,
}

impl MorphInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_forms(forms: &[WordForm]) -> Self {
        let mut info = Self::default();
        for form in forms {
            info.class |= form.class;
            info.gender |= form.gender;
            info.number |= form.number;
            info.case |= form.case;
        }
        info
    }

    pub fn with_gender(mut self, gender: MorphGender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_case(mut self, case: MorphCase) -> Self {
        self.case = case;
        self
    }

    /// Drop a gender from the summary
    pub fn remove_gender(&mut self, gender: MorphGender) {
        self.gender.remove(gender);
    }

    /// Narrow the case, leaving it unchanged when the intersection is empty
    pub fn intersect_case(&mut self, case: MorphCase) {
        let narrowed = self.case & case;
        if !narrowed.is_undefined() {
            self.case = narrowed;
        }
    }

    /// Narrow the gender, leaving it unchanged when the intersection is empty
    pub fn intersect_gender(&mut self, gender: MorphGender) {
        let narrowed = self.gender & gender;
        if !narrowed.is_undefined() {
            self.gender = narrowed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmask_ops() {
        let mut case = MorphCase::NOMINATIVE | MorphCase::GENITIVE;
        assert!(case.is_nominative());
        assert!(case.contains(MorphCase::GENITIVE));
        assert!(!case.contains(MorphCase::DATIVE));
        case.remove(MorphCase::NOMINATIVE);
        assert_eq!(case, MorphCase::GENITIVE);
        assert_eq!(case.to_string(), "gen");
    }

    #[test]
    fn test_gender_opposite() {
        assert_eq!(MorphGender::MASCULINE.opposite(), MorphGender::FEMININE);
        assert_eq!(MorphGender::FEMININE.opposite(), MorphGender::MASCULINE);
        assert!(MorphGender::UNDEFINED.opposite().is_undefined());
    }

    #[test]
    fn test_class_tags() {
        let surname = MorphClass::from_tag("proper_surname").unwrap();
        assert!(surname.is_proper());
        assert!(surname.is_proper_surname());
        assert!(!surname.is_noun());
        assert!(MorphClass::from_tag("bogus").is_none());
    }

    #[test]
    fn test_morph_info_union() {
        let forms = vec![
            WordForm::new("ИВАН", MorphClass::PROPER_NAME)
                .with_gender(MorphGender::MASCULINE)
                .with_case(MorphCase::GENITIVE),
            WordForm::new("ИВАН", MorphClass::PROPER_NAME)
                .with_gender(MorphGender::MASCULINE)
                .with_case(MorphCase::ACCUSATIVE),
        ];
        let info = MorphInfo::from_forms(&forms);
        assert!(info.case.is_genitive() && info.case.is_accusative());
        assert_eq!(info.gender, MorphGender::MASCULINE);

        let mut narrowed = info;
        narrowed.intersect_case(MorphCase::DATIVE);
        assert_eq!(narrowed.case, info.case);
    }
}
