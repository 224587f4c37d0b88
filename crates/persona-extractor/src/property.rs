//! Person properties
//!
//! A property is a position, title, rank or kinship term attached to a
//! person: "министр финансов", "заместитель министра", "вдова". Nested
//! titles form a chain through `higher` ("заместитель" → "министр").

use serde::{Deserialize, Serialize};

use persona_core::{ExternalReferent, ReferentKind};

use crate::person::PersonId;

/// Longest accepted `higher` chain
pub const MAX_HIGHER_DEPTH: usize = 20;

/// Bosses that can stand for one another (глава ≈ президент)
const BOSSES0: &[&str] = &["глава", "руководитель"];
const BOSSES1: &[&str] = &["президент", "генеральный директор", "директор", "председатель"];

/// Semantic class of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    #[default]
    Undefined,
    Boss,
    Kin,
    King,
    MilitaryRank,
    Nationality,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::Boss => "BOSS",
            Self::Kin => "KIN",
            Self::King => "KING",
            Self::MilitaryRank => "MILITARYRANK",
            Self::Nationality => "NATIONALITY",
        }
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How strictly two properties are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityMode {
    /// Mentions inside one document
    WithinOneText,
    /// Mentions from different documents
    DifferentTexts,
}

/// What a property is relative to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyRef {
    External(ExternalReferent),
    Person(PersonId),
    Property(Box<PersonProperty>),
}

impl PropertyRef {
    fn can_be_equals(&self, other: &PropertyRef, mode: EqualityMode) -> bool {
        match (self, other) {
            (Self::External(a), Self::External(b)) => {
                a.kind == b.kind && a.value.to_uppercase() == b.value.to_uppercase()
            }
            (Self::Person(a), Self::Person(b)) => a == b,
            (Self::Property(a), Self::Property(b)) => a.can_be_equals(b, mode),
            _ => false,
        }
    }
}

impl std::fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::External(r) => write!(f, "{r}"),
            Self::Person(id) => write!(f, "{id}"),
            Self::Property(p) => write!(f, "{p}"),
        }
    }
}

/// A person property referent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonProperty {
    /// Lower-case name (министр финансов)
    pub name: String,
    pub kind: PropertyKind,
    /// Qualifiers (2 категории, 5 созыва)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<PropertyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    higher: Option<Box<PersonProperty>>,
}

impl PersonProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: PropertyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn higher(&self) -> Option<&PersonProperty> {
        self.higher.as_deref()
    }

    pub fn higher_mut(&mut self) -> Option<&mut PersonProperty> {
        self.higher.as_deref_mut()
    }

    pub fn take_higher(&mut self) -> Option<PersonProperty> {
        self.higher.take().map(|h| *h)
    }

    /// Links in the chain below this one
    pub fn depth(&self) -> usize {
        self.chain().count() - 1
    }

    /// This property followed by its higher chain
    pub fn chain(&self) -> impl Iterator<Item = &PersonProperty> {
        std::iter::successors(Some(self), |p| p.higher())
    }

    /// Attach the enclosing property; refused when the chain would grow
    /// past [`MAX_HIGHER_DEPTH`] or repeat this property's name
    pub fn set_higher(&mut self, higher: PersonProperty) -> bool {
        if higher.depth() + 1 > MAX_HIGHER_DEPTH {
            return false;
        }
        if higher.chain().any(|h| h.name == self.name && h.refs == self.refs) {
            return false;
        }
        self.higher = Some(Box::new(higher));
        true
    }

    pub fn add_attr(&mut self, attr: impl Into<String>) {
        let attr = attr.into();
        if !attr.is_empty() && !self.attrs.contains(&attr) {
            self.attrs.push(attr);
        }
    }

    pub fn add_ref(&mut self, r: PropertyRef) {
        if !self.has_ref(&r) {
            self.refs.push(r);
        }
    }

    pub fn has_ref(&self, r: &PropertyRef) -> bool {
        self.refs.iter().any(|x| x == r)
    }

    pub fn has_refs(&self) -> bool {
        !self.refs.is_empty()
    }

    pub fn external_refs(&self) -> impl Iterator<Item = &ExternalReferent> {
        self.refs.iter().filter_map(|r| match r {
            PropertyRef::External(e) => Some(e),
            _ => None,
        })
    }

    /// Whether `r` may be recorded as what this property is relative to
    pub fn can_has_ref(&self, r: &ExternalReferent) -> bool {
        let nam = self.name.as_str();
        if nam.is_empty() {
            return false;
        }
        match r.kind {
            ReferentKind::Geo => {
                if nam.ends_with("президент") || nam.ends_with("губернатор") {
                    return r.is_state() || r.is_region();
                }
                if nam == "мэр" || nam == "градоначальник" {
                    return r.is_city();
                }
                nam == "глава"
            }
            ReferentKind::Organization => {
                if nam.ends_with("губернатор")
                    || nam == "мэр"
                    || nam == "градоначальник"
                    || nam == "президент"
                {
                    return false;
                }
                let org = format!(
                    "{} {}",
                    r.org_type().unwrap_or_default(),
                    r.value.to_lowercase()
                );
                if nam.contains("министр") && !org.contains("министерств") {
                    return false;
                }
                if nam.ends_with("директор") && org.contains("суд") {
                    return false;
                }
                true
            }
            _ => false,
        }
    }

    fn canonical_name(&self) -> &str {
        if self.name == "премьер-министр" {
            "премьер"
        } else {
            &self.name
        }
    }

    /// Two mentions may denote the same property
    pub fn can_be_equals(&self, other: &PersonProperty, mode: EqualityMode) -> bool {
        self.can_be_equals_at(other, mode, 0)
    }

    fn can_be_equals_at(&self, other: &PersonProperty, mode: EqualityMode, lev: usize) -> bool {
        if lev > MAX_HIGHER_DEPTH {
            return false;
        }
        let n1 = self.canonical_name();
        let n2 = other.canonical_name();
        if n1.is_empty() || n2.is_empty() {
            return false;
        }
        let mut eq_bosses = false;
        let mut eq_start = false;
        if n1 != n2 {
            if mode == EqualityMode::DifferentTexts {
                return false;
            }
            if (BOSSES0.contains(&n1) && BOSSES1.contains(&n2))
                || (BOSSES1.contains(&n1) && BOSSES0.contains(&n2))
            {
                eq_bosses = true;
            } else {
                if !n1.starts_with(&format!("{n2} ")) && !n2.starts_with(&format!("{n1} ")) {
                    return false;
                }
                eq_start = true;
            }
            // "заместитель министра" is not "министр"
            if self
                .chain()
                .skip(1)
                .any(|hi| hi.can_be_equals_at(other, mode, lev + 1))
            {
                return false;
            }
            if other
                .chain()
                .skip(1)
                .any(|hi| hi.can_be_equals_at(self, mode, lev + 1))
            {
                return false;
            }
        }
        if let (Some(h1), Some(h2)) = (self.higher(), other.higher()) {
            if !h1.can_be_equals_at(h2, mode, lev + 1) {
                return false;
            }
        }
        if self.has_refs() || other.has_refs() {
            let mut eq = false;
            let mut noeq = false;
            for (a, b) in [(&self.refs, &other.refs), (&other.refs, &self.refs)] {
                for r in a {
                    if b.contains(r) || b.iter().any(|rr| rr.can_be_equals(r, mode)) {
                        eq = true;
                    } else {
                        noeq = true;
                    }
                }
            }
            return eq && !noeq;
        }
        if !eq_bosses && n1 != n2 {
            if eq_start {
                if let (Some(h1), Some(h2)) = (self.higher(), other.higher()) {
                    return h1.can_be_equals_at(h2, mode, lev + 1);
                }
            }
            return false;
        }
        true
    }

    /// This property is a less specific mention of `other`
    /// ("министр" for "министр финансов России")
    pub fn can_be_general_for(&self, other: &PersonProperty) -> bool {
        let n1 = self.name.as_str();
        let n2 = other.name.as_str();
        if n1.is_empty() || n2.is_empty() {
            return false;
        }
        if self.refs.iter().any(|r| !other.has_ref(r)) {
            return false;
        }
        let refs = self.refs.len();
        let other_refs = other.refs.len();
        let higher_ok = match (self.higher(), other.higher()) {
            (None, _) => true,
            (Some(_), None) => return false,
            (Some(h1), Some(h2)) => h2.can_be_equals(h1, EqualityMode::WithinOneText),
        };
        if n1 == n2 {
            if refs == other_refs {
                return match (self.higher(), other.higher()) {
                    (Some(h1), Some(h2)) => h1.can_be_general_for(h2),
                    _ => false,
                };
            }
            return higher_ok;
        }
        if n2.starts_with(&format!("{n1} ")) {
            return higher_ok && refs == other_refs;
        }
        false
    }

    /// Absorb the slots of an equal property, keeping the longer name
    pub fn merge_slots(&mut self, other: &PersonProperty) {
        let nam = self.name.clone();
        let nam1 = other.name.clone();
        if nam1.starts_with(&nam)
            || (BOSSES0.contains(&nam.as_str()) && BOSSES1.contains(&nam1.as_str()))
        {
            self.name = nam1;
        }
        if self.kind == PropertyKind::Undefined {
            self.kind = other.kind;
        }
        for a in &other.attrs {
            self.add_attr(a.clone());
        }
        for r in &other.refs {
            self.add_ref(r.clone());
        }
        if self.higher.is_none() {
            if let Some(h) = other.higher() {
                self.set_higher(h.clone());
            }
        }
    }

    /// Text form with person references rendered by `person_name`
    pub fn display_with(&self, person_name: &dyn Fn(PersonId) -> Option<String>) -> String {
        self.display_at(person_name, 0)
    }

    fn display_at(&self, person_name: &dyn Fn(PersonId) -> Option<String>, lev: usize) -> String {
        let mut res = self.name.clone();
        for a in &self.attrs {
            res.push_str(", ");
            res.push_str(a);
        }
        if lev < 10 {
            for r in &self.refs {
                res.push_str("; ");
                match r {
                    PropertyRef::Person(id) => {
                        res.push_str(&person_name(*id).unwrap_or_else(|| id.to_string()))
                    }
                    PropertyRef::Property(p) => res.push_str(&p.display_at(person_name, lev + 1)),
                    PropertyRef::External(e) => res.push_str(&e.to_string()),
                }
            }
            if let Some(h) = self.higher() {
                res.push_str("; ");
                res.push_str(&h.display_at(person_name, lev + 1));
            }
        }
        res
    }
}

impl std::fmt::Display for PersonProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_with(&|_| None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ministry() -> ExternalReferent {
        ExternalReferent::organization("МИНИСТЕРСТВО ФИНАНСОВ", "министерство")
    }

    #[test]
    fn test_display_with_higher_and_refs() {
        let mut minister = PersonProperty::new("министр");
        minister.add_ref(PropertyRef::External(ministry()));
        let mut deputy = PersonProperty::new("заместитель");
        assert!(deputy.set_higher(minister));
        assert_eq!(
            deputy.to_string(),
            "заместитель; министр; министерство МИНИСТЕРСТВО ФИНАНСОВ"
        );
        assert_eq!(deputy.depth(), 1);
    }

    #[test]
    fn test_can_has_ref() {
        let president = PersonProperty::new("президент");
        assert!(president.can_has_ref(&ExternalReferent::geo("РОССИЯ", "state")));
        assert!(!president.can_has_ref(&ExternalReferent::geo("МОСКВА", "city")));
        assert!(!president.can_has_ref(&ministry()));

        let mayor = PersonProperty::new("мэр");
        assert!(mayor.can_has_ref(&ExternalReferent::geo("МОСКВА", "city")));

        let minister = PersonProperty::new("министр");
        assert!(minister.can_has_ref(&ministry()));
        assert!(!minister.can_has_ref(&ExternalReferent::organization("ГАЗПРОМ", "компания")));
    }

    #[test]
    fn test_equality_rules() {
        let mode = EqualityMode::WithinOneText;
        let p1 = PersonProperty::new("премьер-министр");
        let p2 = PersonProperty::new("премьер");
        assert!(p1.can_be_equals(&p2, mode));

        let boss = PersonProperty::new("глава");
        let director = PersonProperty::new("директор");
        assert!(boss.can_be_equals(&director, mode));
        assert!(!boss.can_be_equals(&director, EqualityMode::DifferentTexts));

        let mut m1 = PersonProperty::new("министр");
        m1.add_ref(PropertyRef::External(ministry()));
        let mut m2 = PersonProperty::new("министр");
        m2.add_ref(PropertyRef::External(ExternalReferent::organization(
            "МИНИСТЕРСТВО ОБОРОНЫ",
            "министерство",
        )));
        assert!(!m1.can_be_equals(&m2, mode));
        assert!(m1.can_be_equals(&m1.clone(), mode));
    }

    #[test]
    fn test_deputy_is_not_its_higher() {
        let mut deputy = PersonProperty::new("заместитель министр");
        deputy.set_higher(PersonProperty::new("министр"));
        let minister = PersonProperty::new("министр");
        assert!(!deputy.can_be_equals(&minister, EqualityMode::WithinOneText));
    }

    #[test]
    fn test_general_for() {
        let general = PersonProperty::new("министр");
        let mut specific = PersonProperty::new("министр");
        specific.add_ref(PropertyRef::External(ministry()));
        assert!(general.can_be_general_for(&specific));
        assert!(!specific.can_be_general_for(&general));
        assert!(PersonProperty::new("директор")
            .can_be_general_for(&PersonProperty::new("директор департамента")));
    }

    #[test]
    fn test_merge_keeps_longer_name() {
        let mut p = PersonProperty::new("директор");
        let mut q = PersonProperty::new("директор департамента").with_kind(PropertyKind::Boss);
        q.add_attr("1 категории");
        p.merge_slots(&q);
        assert_eq!(p.name, "директор департамента");
        assert_eq!(p.kind, PropertyKind::Boss);
        assert_eq!(p.attrs, vec!["1 категории"]);
    }

    #[test]
    fn test_set_higher_refuses_self_repeat() {
        let mut p = PersonProperty::new("министр");
        assert!(!p.set_higher(PersonProperty::new("министр")));
        assert!(p.higher().is_none());
    }

    proptest! {
        #[test]
        fn prop_higher_chain_is_bounded(names in proptest::collection::vec("[а-я]{2,6}", 1..40)) {
            let mut chain: Option<PersonProperty> = None;
            for (i, name) in names.iter().enumerate() {
                let mut p = PersonProperty::new(format!("{name}{i}"));
                if let Some(h) = chain.take() {
                    if !p.set_higher(h.clone()) {
                        chain = Some(h);
                        continue;
                    }
                }
                chain = Some(p);
            }
            let top = chain.unwrap();
            prop_assert!(top.depth() <= MAX_HIGHER_DEPTH);
            prop_assert_eq!(top.chain().count(), top.depth() + 1);
        }
    }
}
