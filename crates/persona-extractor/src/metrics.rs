//! Quality Metrics module
//!
//! Scores extracted PERSON, PERSONPROPERTY and PERSONIDENTITY spans
//! against annotated documents. Person spans often differ from the gold
//! ones only by an attribute in front ("министр Петров" against "Петров"),
//! so besides exact and text matching an overlap mode is offered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ExtractedEntity;

// ============================================================================
// Counts
// ============================================================================

/// Match counts of one evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub gold_total: usize,
    pub predicted_total: usize,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

impl EntityMetrics {
    pub fn precision(&self) -> f32 {
        ratio(self.true_positives, self.predicted_total)
    }

    pub fn recall(&self) -> f32 {
        ratio(self.true_positives, self.gold_total)
    }

    /// Harmonic mean of precision and recall
    pub fn f1_score(&self) -> f32 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// TP / (TP + FP + FN)
    pub fn accuracy(&self) -> f32 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives + self.false_negatives,
        )
    }

    fn merge(&mut self, other: &EntityMetrics) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.gold_total += other.gold_total;
        self.predicted_total += other.predicted_total;
    }
}

// ============================================================================
// Gold Documents
// ============================================================================

/// One annotated span
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GoldEntity {
    pub text: String,
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
}

impl From<&ExtractedEntity> for GoldEntity {
    fn from(e: &ExtractedEntity) -> Self {
        Self {
            text: e.text.clone(),
            entity_type: e.entity_type.clone(),
            start: e.start,
            end: e.end,
        }
    }
}

/// One line of a gold file: a text and its annotated entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldDocument {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<GoldEntity>,
}

// ============================================================================
// Evaluator
// ============================================================================

/// How a predicted span is compared with a gold one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Same text up to case, ё and spacing
    #[default]
    Text,
    /// Same byte span
    Strict,
    /// Spans share at least one byte
    Overlap,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Strict => "strict",
            Self::Overlap => "overlap",
        }
    }
}

/// Upper case, Ё folded to Е, single spaces
fn normalize_name(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_uppercase().replace('Ё', "Е"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scores predictions against gold spans, each gold span matched at most
/// once
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    mode: MatchMode,
    match_types: bool,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            mode: MatchMode::Text,
            match_types: true,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Exact spans
    pub fn strict(self) -> Self {
        self.with_mode(MatchMode::Strict)
    }

    pub fn with_type_matching(mut self, match_types: bool) -> Self {
        self.match_types = match_types;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    fn matches(&self, predicted: &ExtractedEntity, gold: &GoldEntity) -> bool {
        if self.match_types && predicted.entity_type != gold.entity_type {
            return false;
        }
        match self.mode {
            MatchMode::Strict => predicted.start == gold.start && predicted.end == gold.end,
            MatchMode::Overlap => predicted.start < gold.end && gold.start < predicted.end,
            MatchMode::Text => normalize_name(&predicted.text) == normalize_name(&gold.text),
        }
    }

    pub fn evaluate_entities(
        &self,
        predicted: &[ExtractedEntity],
        gold: &[GoldEntity],
    ) -> EntityMetrics {
        let mut used = vec![false; gold.len()];
        let mut tp = 0;
        for p in predicted {
            let hit = gold
                .iter()
                .enumerate()
                .position(|(i, g)| !used[i] && self.matches(p, g));
            if let Some(i) = hit {
                used[i] = true;
                tp += 1;
            }
        }
        EntityMetrics {
            true_positives: tp,
            false_positives: predicted.len() - tp,
            false_negatives: gold.len() - tp,
            gold_total: gold.len(),
            predicted_total: predicted.len(),
        }
    }

    /// Separate counts for every entity type seen on either side
    pub fn evaluate_by_type(
        &self,
        predicted: &[ExtractedEntity],
        gold: &[GoldEntity],
    ) -> BTreeMap<String, EntityMetrics> {
        let mut res = BTreeMap::new();
        let types = predicted
            .iter()
            .map(|e| e.entity_type.as_str())
            .chain(gold.iter().map(|g| g.entity_type.as_str()));
        for typ in types {
            if res.contains_key(typ) {
                continue;
            }
            let p: Vec<ExtractedEntity> =
                predicted.iter().filter(|e| e.entity_type == typ).cloned().collect();
            let g: Vec<GoldEntity> =
                gold.iter().filter(|e| e.entity_type == typ).cloned().collect();
            res.insert(typ.to_string(), self.evaluate_entities(&p, &g));
        }
        res
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

/// Counts summed over a batch of documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub mode: MatchMode,
    pub entity_metrics: EntityMetrics,
    pub by_type: BTreeMap<String, EntityMetrics>,
    pub num_documents: usize,
}

impl AggregateMetrics {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Evaluate one document and add it to the totals
    pub fn add_document(
        &mut self,
        evaluator: &Evaluator,
        predicted: &[ExtractedEntity],
        gold: &[GoldEntity],
    ) -> EntityMetrics {
        let metrics = evaluator.evaluate_entities(predicted, gold);
        self.entity_metrics.merge(&metrics);
        for (typ, m) in evaluator.evaluate_by_type(predicted, gold) {
            self.by_type.entry(typ).or_default().merge(&m);
        }
        self.num_documents += 1;
        metrics
    }

    pub fn report(&self) -> String {
        let m = &self.entity_metrics;
        let mut res = format!(
            "Documents: {}  (matching: {})\n\
             \n\
             All entities\n\
             \x20 precision {:>5.1}%  recall {:>5.1}%  F1 {:>5.1}%  accuracy {:>5.1}%\n\
             \x20 gold {}  predicted {}  tp {}  fp {}  fn {}\n",
            self.num_documents,
            self.mode.as_str(),
            m.precision() * 100.0,
            m.recall() * 100.0,
            m.f1_score() * 100.0,
            m.accuracy() * 100.0,
            m.gold_total,
            m.predicted_total,
            m.true_positives,
            m.false_positives,
            m.false_negatives,
        );
        if !self.by_type.is_empty() {
            res.push_str("\nBy type\n");
            for (typ, m) in &self.by_type {
                res.push_str(&format!(
                    "  {:<15} P {:>5.1}%  R {:>5.1}%  F1 {:>5.1}%  ({}/{}/{})\n",
                    typ,
                    m.precision() * 100.0,
                    m.recall() * 100.0,
                    m.f1_score() * 100.0,
                    m.true_positives,
                    m.false_positives,
                    m.false_negatives,
                ));
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predicted(text: &str, entity_type: &str, start: usize) -> ExtractedEntity {
        ExtractedEntity {
            text: text.to_string(),
            entity_type: entity_type.to_string(),
            start,
            end: start + text.len(),
            confidence: 0.9,
        }
    }

    fn gold(text: &str, entity_type: &str, start: usize) -> GoldEntity {
        GoldEntity::from(&predicted(text, entity_type, start))
    }

    #[test]
    fn test_rates() {
        let m = EntityMetrics {
            true_positives: 8,
            false_positives: 2,
            false_negatives: 2,
            gold_total: 10,
            predicted_total: 10,
        };
        assert!((m.precision() - 0.8).abs() < 1e-6);
        assert!((m.recall() - 0.8).abs() < 1e-6);
        assert!((m.f1_score() - 0.8).abs() < 1e-6);
        assert!((m.accuracy() - 8.0 / 12.0).abs() < 1e-6);
        assert_eq!(EntityMetrics::default().f1_score(), 0.0);
    }

    #[test]
    fn test_text_matching_normalises_names() {
        let p = vec![predicted("Семёнов  Пётр", "PERSON", 0), predicted("город", "PERSON", 40)];
        let g = vec![gold("СЕМЕНОВ Петр", "PERSON", 0), gold("министр", "PERSONPROPERTY", 25)];
        let m = Evaluator::new().evaluate_entities(&p, &g);
        assert_eq!((m.true_positives, m.false_positives, m.false_negatives), (1, 1, 1));
    }

    #[test]
    fn test_gold_span_matched_once() {
        let p = vec![predicted("Петров", "PERSON", 0), predicted("Петров", "PERSON", 20)];
        let g = vec![gold("Петров", "PERSON", 0)];
        let m = Evaluator::new().evaluate_entities(&p, &g);
        assert_eq!(m.true_positives, 1);
        assert_eq!(m.false_positives, 1);
    }

    #[test]
    fn test_match_modes() {
        let p = vec![predicted("министр Петров", "PERSON", 0)];
        let g = vec![gold("Петров", "PERSON", 15)];
        assert_eq!(Evaluator::new().strict().evaluate_entities(&p, &g).true_positives, 0);
        assert_eq!(Evaluator::new().evaluate_entities(&p, &g).true_positives, 0);
        let overlap = Evaluator::new().with_mode(MatchMode::Overlap);
        assert_eq!(overlap.evaluate_entities(&p, &g).true_positives, 1);
    }

    #[test]
    fn test_type_matching_can_be_disabled() {
        let p = vec![predicted("министр", "PERSON", 0)];
        let g = vec![gold("министр", "PERSONPROPERTY", 0)];
        assert_eq!(Evaluator::new().evaluate_entities(&p, &g).true_positives, 0);
        let untyped = Evaluator::new().with_type_matching(false);
        assert_eq!(untyped.evaluate_entities(&p, &g).true_positives, 1);
    }

    #[test]
    fn test_aggregate_report() {
        let evaluator = Evaluator::new();
        let mut agg = AggregateMetrics::new(evaluator.mode());
        agg.add_document(
            &evaluator,
            &[predicted("Смит", "PERSON", 0)],
            &[gold("Смит", "PERSON", 0), gold("посол", "PERSONPROPERTY", 10)],
        );
        agg.add_document(&evaluator, &[], &[gold("Иванов", "PERSON", 0)]);

        assert_eq!(agg.num_documents, 2);
        assert_eq!(agg.by_type["PERSON"].true_positives, 1);
        assert_eq!(agg.by_type["PERSON"].false_negatives, 1);
        assert_eq!(agg.by_type["PERSONPROPERTY"].false_negatives, 1);
        let report = agg.report();
        assert!(report.starts_with("Documents: 2  (matching: text)"));
        assert!(report.contains("PERSONPROPERTY"));
    }
}
