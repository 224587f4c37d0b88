//! Name templates and scored candidates
//!
//! A template is one way of reading a run of name items (surname first,
//! first name with initials, king with a regnal number, ...). The resolver
//! produces one [`NameCandidate`] per template that fits and scores it
//! through named adjustment rules, so every point of the coefficient can be
//! traced back to the rule that added it.

use serde::{Deserialize, Serialize};

use persona_core::{MorphGender, MorphInfo, TokenRef};

use crate::morph_collection::MorphVariantCollection;
use crate::person::{PersonId, PersonReferent};

// ============================================================================
// Templates
// ============================================================================

/// Word order of a recognised name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FioTemplate {
    #[default]
    Undefined,
    SurnameNameSecname,
    SurnameName,
    NameSurname,
    NameSecnameSurname,
    NameSecname,
    NameISurname,
    SurnameII,
    IISurname,
    SurnameI,
    ISurname,
    King,
    Arabic,
    AsianName,
    AsianSurnameName,
    Identity,
    OntoSingle,
    OntoDuble,
    Global,
}

impl FioTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::SurnameNameSecname => "SurnameNameSecname",
            Self::SurnameName => "SurnameName",
            Self::NameSurname => "NameSurname",
            Self::NameSecnameSurname => "NameSecnameSurname",
            Self::NameSecname => "NameSecname",
            Self::NameISurname => "NameISurname",
            Self::SurnameII => "SurnameII",
            Self::IISurname => "IISurname",
            Self::SurnameI => "SurnameI",
            Self::ISurname => "ISurname",
            Self::King => "King",
            Self::Arabic => "Arabic",
            Self::AsianName => "AsianName",
            Self::AsianSurnameName => "AsianSurnameName",
            Self::Identity => "Identity",
            Self::OntoSingle => "OntoSingle",
            Self::OntoDuble => "OntoDuble",
            Self::Global => "Global",
        }
    }

    /// Templates spelling the same word order with or without the
    /// patronymic (or its initial)
    pub fn is_compatible(&self, other: FioTemplate) -> bool {
        use FioTemplate::*;
        if *self == other {
            return true;
        }
        matches!(
            (*self, other),
            (SurnameName, SurnameNameSecname)
                | (SurnameNameSecname, SurnameName)
                | (NameSurname, NameSecnameSurname)
                | (NameSecnameSurname, NameSurname)
                | (NameSurname, NameISurname)
                | (NameISurname, NameSurname)
                | (SurnameII, SurnameI)
                | (SurnameI, SurnameII)
                | (IISurname, ISurname)
                | (ISurname, IISurname)
        )
    }

    /// Surname written before the given names
    pub fn surname_first(&self) -> bool {
        matches!(
            self,
            Self::SurnameNameSecname
                | Self::SurnameName
                | Self::SurnameII
                | Self::SurnameI
                | Self::AsianSurnameName
        )
    }
}

impl std::fmt::Display for FioTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Score Rules
// ============================================================================

/// One adjustment applied to a candidate's coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRule {
    pub name: &'static str,
    pub delta: f64,
}

// ============================================================================
// Name Candidate
// ============================================================================

/// One scored reading of a run of name items
#[derive(Debug, Clone)]
pub struct NameCandidate<'a> {
    pub coef: f64,
    pub template: FioTemplate,
    pub begin: TokenRef<'a>,
    pub end: TokenRef<'a>,
    pub firstname: Option<MorphVariantCollection>,
    pub lastname: Option<MorphVariantCollection>,
    pub middlename: Option<MorphVariantCollection>,
    /// Person of the local ontology this reading was resolved to
    pub onto_person: Option<PersonId>,
    /// Person built by the template itself (global patterns, identities)
    pub referent: Option<PersonReferent>,
    pub morph: MorphInfo,
    /// Number of items consumed from the start index
    pub items_count: usize,
    pub trace: Vec<ScoreRule>,
}

impl<'a> NameCandidate<'a> {
    pub fn new(template: FioTemplate, begin: TokenRef<'a>, end: TokenRef<'a>) -> Self {
        Self {
            coef: 0.0,
            template,
            begin,
            end,
            firstname: None,
            lastname: None,
            middlename: None,
            onto_person: None,
            referent: None,
            morph: MorphInfo::new(),
            items_count: 0,
            trace: Vec::new(),
        }
    }

    /// Apply a named adjustment
    pub fn adjust(&mut self, name: &'static str, delta: f64) {
        if delta == 0.0 {
            return;
        }
        self.coef += delta;
        self.trace.push(ScoreRule { name, delta });
    }

    /// Set the coefficient outright, recording the difference
    pub fn set_coef(&mut self, name: &'static str, coef: f64) {
        let delta = coef - self.coef;
        self.adjust(name, delta);
    }

    /// A rule with this name has fired
    pub fn has_rule(&self, name: &str) -> bool {
        self.trace.iter().any(|r| r.name == name)
    }

    /// Sum of the deltas of the named rule
    pub fn rule_delta(&self, name: &str) -> f64 {
        self.trace.iter().filter(|r| r.name == name).map(|r| r.delta).sum()
    }

    pub fn tokens_count(&self) -> usize {
        self.end.idx() + 1 - self.begin.idx()
    }

    /// Gender of the agreed morphology, else the gender most name parts
    /// allow
    pub fn probable_gender(&self) -> MorphGender {
        let g = self.morph.gender;
        if g == MorphGender::MASCULINE || g == MorphGender::FEMININE {
            return g;
        }
        let mut fem = 0;
        let mut mus = 0;
        for col in [&self.firstname, &self.lastname].into_iter().flatten() {
            if col.items().iter().any(|v| v.gender.intersects(MorphGender::MASCULINE)) {
                mus += 1;
            }
            if col.items().iter().any(|v| v.gender.intersects(MorphGender::FEMININE)) {
                fem += 1;
            }
        }
        match mus.cmp(&fem) {
            std::cmp::Ordering::Greater => MorphGender::MASCULINE,
            std::cmp::Ordering::Less => MorphGender::FEMININE,
            std::cmp::Ordering::Equal => MorphGender::UNDEFINED,
        }
    }
}

impl std::fmt::Display for NameCandidate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.1}:", self.template, self.coef)?;
        if let Some(l) = &self.lastname {
            write!(f, " L[{l}]")?;
        }
        if let Some(n) = &self.firstname {
            write!(f, " F[{n}]")?;
        }
        if let Some(m) = &self.middlename {
            write!(f, " M[{m}]")?;
        }
        if let Some(p) = self.onto_person {
            write!(f, " -> {p}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{Document, Lexicon, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    #[test]
    fn test_template_names_are_unique() {
        use FioTemplate::*;
        let all = [
            Undefined, SurnameNameSecname, SurnameName, NameSurname, NameSecnameSurname,
            NameSecname, NameISurname, SurnameII, IISurname, SurnameI, ISurname, King, Arabic,
            AsianName, AsianSurnameName, Identity, OntoSingle, OntoDuble, Global,
        ];
        let mut names: Vec<&str> = all.iter().map(FioTemplate::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_compatible_templates() {
        assert!(FioTemplate::SurnameName.is_compatible(FioTemplate::SurnameNameSecname));
        assert!(FioTemplate::SurnameI.is_compatible(FioTemplate::SurnameII));
        assert!(!FioTemplate::SurnameName.is_compatible(FioTemplate::NameSurname));
        assert!(FioTemplate::King.is_compatible(FioTemplate::King));
    }

    #[test]
    fn test_adjust_records_rules() {
        let d = doc("Иванов Иван");
        let t = d.first().unwrap();
        let mut c = NameCandidate::new(FioTemplate::SurnameName, t, t.next().unwrap());
        c.adjust("base", 2.0);
        c.adjust("noop", 0.0);
        c.adjust("newline_after", -1.0);
        c.set_coef("king", 3.0);
        assert_eq!(c.coef, 3.0);
        assert_eq!(c.trace.len(), 3);
        assert!(c.has_rule("newline_after"));
        assert!(!c.has_rule("noop"));
        assert_eq!(c.rule_delta("king"), 2.0);
        assert_eq!(c.tokens_count(), 2);
    }

    #[test]
    fn test_probable_gender_from_name_parts() {
        let d = doc("Анна Петрова");
        let t = d.first().unwrap();
        let mut c = NameCandidate::new(FioTemplate::NameSurname, t, t.next().unwrap());
        assert_eq!(c.probable_gender(), MorphGender::UNDEFINED);
        c.firstname = Some(MorphVariantCollection::from_value("АННА", MorphGender::FEMININE));
        c.lastname = Some(MorphVariantCollection::from_value("ПЕТРОВА", MorphGender::FEMININE));
        assert_eq!(c.probable_gender(), MorphGender::FEMININE);
        c.morph.gender = MorphGender::MASCULINE;
        assert_eq!(c.probable_gender(), MorphGender::MASCULINE);
    }
}
