//! Per-document analysis context
//!
//! Everything the recognizers share while walking one document: the
//! token stream, the terminology, word statistics, the recursion depth
//! counter, memoised attribute matches and the local ontology of persons
//! and properties found so far.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use persona_core::lexicon::Morphology;
use persona_core::{AnalysisConfig, Document, ExternalReferent, ReferentKind, TokenRef};

use crate::attribute::AttributeToken;
use crate::name_part::del_surname_end;
use crate::person::{PersonId, PersonReferent};
use crate::property::{EqualityMode, PersonProperty};
use crate::statistics::Statistics;
use crate::templates::FioTemplate;
use crate::terminology::Terminology;

// ============================================================================
// Geo words
// ============================================================================

/// Dictionary geo names that denote states
const STATE_WORDS: &[&str] = &[
    "РОССИЯ", "РФ", "США", "УКРАИНА", "ИСПАНИЯ", "ГЕРМАНИЯ", "ФРАНЦИЯ", "ВЕЛИКОБРИТАНИЯ", "ИТАЛИЯ",
    "АНГЛИЯ", "АМЕРИКА", "СССР", "РУСЬ",
];

/// Dictionary geo names that denote cities
const CITY_WORDS: &[&str] = &[
    "МОСКВА", "КИЕВ", "ПЕТЕРБУРГ", "ЛОНДОН", "ПАРИЖ", "БЕРЛИН", "МИНСК", "ВАШИНГТОН", "КАЗАНЬ",
];

/// Geo entity at `t`: a referent token, or a capitalised dictionary
/// country or city name (России, Москве)
pub fn geo_at(t: TokenRef<'_>) -> Option<ExternalReferent> {
    if let Some(r) = t.referent() {
        return (r.kind == ReferentKind::Geo).then(|| r.clone());
    }
    if !t.is_letters() || t.chars().is_all_lower {
        return None;
    }
    let lemma = if t.is_term_of(&["РУСИ"]) {
        "РУСЬ"
    } else {
        t.morph()
            .iter()
            .find(|f| f.in_dictionary && f.class.is_proper_geo())
            .map(|f| f.normal_case.as_str())
            .or_else(|| STATE_WORDS.iter().copied().find(|s| t.term() == *s))?
    };
    if STATE_WORDS.contains(&lemma) {
        Some(ExternalReferent::geo(lemma, "state"))
    } else if CITY_WORDS.contains(&lemma) {
        Some(ExternalReferent::geo(lemma, "city"))
    } else {
        None
    }
}

// ============================================================================
// Depth guard
// ============================================================================

/// Keeps one recursion level entered until dropped
pub struct DepthGuard<'c> {
    level: &'c Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.level.set(self.level.get().saturating_sub(1));
    }
}

// ============================================================================
// Analysis Context
// ============================================================================

/// Shared state of one document analysis
pub struct AnalysisContext<'a> {
    pub doc: &'a Document,
    pub terms: &'a Terminology,
    pub config: &'a AnalysisConfig,
    stats: RefCell<Statistics>,
    level: Cell<usize>,
    attr_memo: RefCell<HashMap<(usize, u8), Option<AttributeToken<'a>>>>,
    persons: RefCell<Vec<PersonReferent>>,
    properties: RefCell<Vec<PersonProperty>>,
    last_template: Cell<Option<FioTemplate>>,
    /// Token index -> person recognised over it
    person_spans: RefCell<HashMap<usize, PersonId>>,
    /// Tokens where the first pass found an attribute or a name run
    marks: RefCell<HashSet<usize>>,
    /// Tokens where an attribute was matched before a name
    property_begins: RefCell<HashSet<usize>>,
    second_step: Cell<bool>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(doc: &'a Document, terms: &'a Terminology, config: &'a AnalysisConfig) -> Self {
        let stats = Statistics::collect(doc);
        debug!(tokens = doc.len(), "Analysis context created");
        Self {
            doc,
            terms,
            config,
            stats: RefCell::new(stats),
            level: Cell::new(0),
            attr_memo: RefCell::new(HashMap::new()),
            persons: RefCell::new(Vec::new()),
            properties: RefCell::new(Vec::new()),
            last_template: Cell::new(None),
            person_spans: RefCell::new(HashMap::new()),
            marks: RefCell::new(HashSet::new()),
            property_begins: RefCell::new(HashSet::new()),
            second_step: Cell::new(false),
        }
    }

    pub fn morphology(&self) -> &'a dyn Morphology {
        self.doc.morphology()
    }

    pub fn stats(&self) -> Ref<'_, Statistics> {
        self.stats.borrow()
    }

    pub fn stats_mut(&self) -> RefMut<'_, Statistics> {
        self.stats.borrow_mut()
    }

    // ========================================================================
    // Recursion depth
    // ========================================================================

    pub fn level(&self) -> usize {
        self.level.get()
    }

    /// Enter one more level of attribute/name recursion; `None` once
    /// `max_depth` levels are active
    pub fn enter(&self) -> Option<DepthGuard<'_>> {
        let level = self.level.get();
        if level >= self.config.max_depth {
            trace!(level, "Recursion depth exhausted");
            return None;
        }
        self.level.set(level + 1);
        Some(DepthGuard { level: &self.level })
    }

    // ========================================================================
    // Attribute memo
    // ========================================================================

    pub(crate) fn memo_attr(&self, idx: usize, attrs: u8) -> Option<Option<AttributeToken<'a>>> {
        self.attr_memo.borrow().get(&(idx, attrs)).cloned()
    }

    pub(crate) fn store_attr(&self, idx: usize, attrs: u8, value: Option<AttributeToken<'a>>) {
        self.attr_memo.borrow_mut().insert((idx, attrs), value);
    }

    // ========================================================================
    // Pass bookkeeping
    // ========================================================================

    pub fn mark_token(&self, idx: usize) {
        self.marks.borrow_mut().insert(idx);
    }

    pub fn is_marked(&self, idx: usize) -> bool {
        self.marks.borrow().contains(&idx)
    }

    pub fn mark_property_begin(&self, idx: usize) {
        self.property_begins.borrow_mut().insert(idx);
    }

    pub fn can_be_property_begin(&self, idx: usize) -> bool {
        self.property_begins.borrow().contains(&idx)
    }

    /// A bare name right after an attribute was seen; a second pass may
    /// resolve it against persons found later
    pub fn request_second_step(&self) {
        self.second_step.set(true);
    }

    pub fn second_step_needed(&self) -> bool {
        self.second_step.get()
    }

    // ========================================================================
    // Template carry-over
    // ========================================================================

    /// Template of the last accepted name in this document
    pub fn last_template(&self) -> Option<FioTemplate> {
        self.last_template.get()
    }

    pub fn remember_template(&self, template: FioTemplate) {
        self.last_template.set(Some(template));
    }

    // ========================================================================
    // Local ontology
    // ========================================================================

    /// Register a person; an equal person already known absorbs it
    pub fn add_person(&self, person: PersonReferent) -> PersonId {
        let mut persons = self.persons.borrow_mut();
        if let Some(idx) = persons
            .iter()
            .position(|p| p.can_be_equals(&person, EqualityMode::WithinOneText))
        {
            persons[idx].merge_slots(&person);
            trace!(person = %persons[idx], "Merged into known person");
            return PersonId(idx);
        }
        persons.push(person);
        PersonId(persons.len() - 1)
    }

    pub fn person(&self, id: PersonId) -> Option<PersonReferent> {
        self.persons.borrow().get(id.0).cloned()
    }

    pub fn with_person_mut<R>(
        &self,
        id: PersonId,
        f: impl FnOnce(&mut PersonReferent) -> R,
    ) -> Option<R> {
        self.persons.borrow_mut().get_mut(id.0).map(f)
    }

    pub fn persons(&self) -> Vec<PersonReferent> {
        self.persons.borrow().clone()
    }

    /// Run `f` over the known persons without cloning them
    pub fn with_persons<R>(&self, f: impl FnOnce(&[PersonReferent]) -> R) -> R {
        f(&self.persons.borrow())
    }

    pub fn person_count(&self) -> usize {
        self.persons.borrow().len()
    }

    /// Lookups are skipped once the ontology grows past the limit
    pub fn ontology_enabled(&self) -> bool {
        self.person_count() < self.config.ontology_limit
    }

    /// Known persons with surname `value` (any case form)
    pub fn find_persons_by_lastname(&self, value: &str) -> Vec<PersonId> {
        if !self.ontology_enabled() {
            return Vec::new();
        }
        let key = del_surname_end(value);
        self.persons
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.lastnames
                    .iter()
                    .any(|l| l == value || del_surname_end(l) == key)
            })
            .map(|(i, _)| PersonId(i))
            .collect()
    }

    /// Known persons with first name `value`
    pub fn find_persons_by_firstname(&self, value: &str) -> Vec<PersonId> {
        if !self.ontology_enabled() {
            return Vec::new();
        }
        self.persons
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.firstnames.iter().any(|f| f == value))
            .map(|(i, _)| PersonId(i))
            .collect()
    }

    /// Record that `begin..=end` was recognised as person `id`
    pub fn mark_person_span(&self, begin: usize, end: usize, id: PersonId) {
        let mut spans = self.person_spans.borrow_mut();
        for idx in begin..=end {
            spans.insert(idx, id);
        }
    }

    /// Person recognised over token `idx`, if any
    pub fn person_at(&self, idx: usize) -> Option<PersonId> {
        self.person_spans.borrow().get(&idx).copied()
    }

    /// Register a standalone property; returns its index
    pub fn add_property(&self, prop: PersonProperty) -> usize {
        let mut props = self.properties.borrow_mut();
        if let Some(idx) = props
            .iter()
            .position(|p| p.can_be_equals(&prop, EqualityMode::WithinOneText))
        {
            props[idx].merge_slots(&prop);
            return idx;
        }
        props.push(prop);
        props.len() - 1
    }

    /// A property equal to `prop` is already known
    pub fn has_property(&self, prop: &PersonProperty) -> bool {
        self.properties
            .borrow()
            .iter()
            .any(|p| p.can_be_equals(prop, EqualityMode::WithinOneText))
            || self.persons.borrow().iter().any(|person| {
                person
                    .attributes
                    .iter()
                    .any(|a| a.can_be_equals(prop, EqualityMode::WithinOneText))
            })
    }

    pub fn properties(&self) -> Vec<PersonProperty> {
        self.properties.borrow().clone()
    }

    /// Display name of a known person, for property rendering
    pub fn person_name(&self, id: PersonId) -> Option<String> {
        self.persons.borrow().get(id.0).map(|p| p.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morph_collection::MorphVariantCollection;
    use persona_core::{Lexicon, MorphGender, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    fn person(last: &str, first: &str) -> PersonReferent {
        let mut p = PersonReferent::new();
        p.add_fio_identity(
            Some(MorphVariantCollection::from_value(last, MorphGender::MASCULINE)),
            Some(MorphVariantCollection::from_value(first, MorphGender::MASCULINE)),
            None,
        );
        p
    }

    #[test]
    fn test_depth_guard_bounds_recursion() {
        let d = doc("текст");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig {
            max_depth: 2,
            ..AnalysisConfig::default()
        };
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let g1 = ctx.enter();
        let g2 = ctx.enter();
        assert!(g1.is_some() && g2.is_some());
        assert!(ctx.enter().is_none());
        drop(g2);
        assert_eq!(ctx.level(), 1);
        assert!(ctx.enter().is_some());
        drop(g1);
        assert_eq!(ctx.level(), 0);
    }

    #[test]
    fn test_add_person_merges_equal_mentions() {
        let d = doc("текст");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let a = ctx.add_person(person("ИВАНОВ", "ИВАН"));
        let b = ctx.add_person(person("ИВАНОВ", "И"));
        let c = ctx.add_person(person("ПЕТРОВ", "ПЕТР"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ctx.person_count(), 2);
        assert_eq!(ctx.find_persons_by_lastname("ИВАНОВА"), vec![a]);
        assert_eq!(ctx.find_persons_by_firstname("ПЕТР"), vec![c]);
    }

    #[test]
    fn test_ontology_limit_disables_lookups() {
        let d = doc("текст");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig {
            ontology_limit: 1,
            ..AnalysisConfig::default()
        };
        let ctx = AnalysisContext::new(&d, &terms, &config);
        ctx.add_person(person("ИВАНОВ", "ИВАН"));
        assert!(ctx.find_persons_by_lastname("ИВАНОВ").is_empty());
    }

    #[test]
    fn test_geo_words() {
        let d = doc("Президент России и мэр Москвы");
        let russia = geo_at(d.at(1).unwrap()).unwrap();
        assert!(russia.is_state());
        assert_eq!(russia.value, "РОССИЯ");
        assert!(geo_at(d.at(4).unwrap()).unwrap().is_city());
        assert!(geo_at(d.at(0).unwrap()).is_none());
    }

    #[test]
    fn test_person_spans() {
        let d = doc("Иван Петров пришел");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let id = ctx.add_person(person("ПЕТРОВ", "ИВАН"));
        ctx.mark_person_span(0, 1, id);
        assert_eq!(ctx.person_at(1), Some(id));
        assert_eq!(ctx.person_at(2), None);
    }

    #[test]
    fn test_template_carry_over() {
        let d = doc("текст");
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        assert!(ctx.last_template().is_none());
        ctx.remember_template(FioTemplate::SurnameII);
        assert_eq!(ctx.last_template(), Some(FioTemplate::SurnameII));
    }
}
