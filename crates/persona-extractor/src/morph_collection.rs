//! Name variant collections
//!
//! A `MorphVariantCollection` holds every surface form a resolved name part
//! can take (ИВАНОВ / ИВАНОВА, ДЖОН / JOHN), each tagged with a gender and
//! optionally a case. Collections built for different mentions of the same
//! person are reconciled with [`MorphVariantCollection::intersect`].

use serde::{Deserialize, Serialize};

use persona_core::lexicon::Morphology;
use persona_core::text::names_equal_translit;
use persona_core::{MorphCase, MorphClass, MorphGender, MorphNumber};

use crate::name_part::ends_with_std_surname;

/// Number of leading characters shared by all values of a collection
const HEAD_LEN: usize = 3;

/// One surface form of a name part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphVariant {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_value: Option<String>,
    pub gender: MorphGender,
    pub case: MorphCase,
}

impl MorphVariant {
    pub fn new(value: impl Into<String>, gender: MorphGender) -> Self {
        Self {
            value: value.into(),
            short_value: None,
            gender,
            case: MorphCase::UNDEFINED,
        }
    }
}

/// Candidate surface forms of one name part
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MorphVariantCollection {
    items: Vec<MorphVariant>,
    head: Option<String>,
    /// Regnal number for king names (Петр I)
    pub number: u32,
}

fn head_of(value: &str) -> String {
    value.chars().take(HEAD_LEN).collect()
}

fn has_hiphen(value: &str) -> bool {
    value.contains('-')
}

impl MorphVariantCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection with a single value
    pub fn from_value(value: &str, gender: MorphGender) -> Self {
        let mut res = Self::new();
        res.add(value, None, gender, None);
        res
    }

    pub fn items(&self) -> &[MorphVariant] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First characters of the first value added
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Insert `value` unless the (value, gender) pair is already present.
    ///
    /// With `opposite` set and a definite gender, the inflector is asked for
    /// the opposite-gender surname form (ИВАНОВ → ИВАНОВА), which is added
    /// too when it exists.
    pub fn add(
        &mut self,
        value: &str,
        short_value: Option<&str>,
        gender: MorphGender,
        opposite: Option<&dyn Morphology>,
    ) {
        let mut var = MorphVariant::new(value, gender);
        var.short_value = short_value.map(str::to_string);
        self.add_variant(var);

        let Some(morphology) = opposite else {
            return;
        };
        if gender != MorphGender::MASCULINE && gender != MorphGender::FEMININE {
            return;
        }
        let other = gender.opposite();
        if let Some(form) = morphology.inflect(
            value,
            MorphClass::PROPER_SURNAME,
            other,
            MorphCase::NOMINATIVE,
            MorphNumber::SINGULAR,
        ) {
            if form != value {
                self.add_variant(MorphVariant::new(form, other));
            }
        }
    }

    /// Insert a prepared variant, keeping (value, gender) pairs unique
    pub fn add_variant(&mut self, var: MorphVariant) {
        if var.value.is_empty() {
            return;
        }
        if self
            .items
            .iter()
            .any(|it| it.value == var.value && it.gender == var.gender)
        {
            return;
        }
        if self.head.is_none() {
            self.head = Some(head_of(&var.value));
        }
        self.items.push(var);
    }

    /// Remove variants matching the filters; `None` value and an undefined
    /// gender match anything
    pub fn remove(&mut self, value: Option<&str>, gender: MorphGender) -> bool {
        let before = self.items.len();
        self.items.retain(|it| {
            let value_match = value.map_or(true, |v| it.value == v);
            let gender_match = gender.is_undefined() || it.gender == gender;
            !(value_match && gender_match)
        });
        before != self.items.len()
    }

    /// Prepend `prefix` to every value
    pub fn add_prefix_str(&mut self, prefix: &str) {
        for it in &mut self.items {
            it.value = format!("{prefix}{}", it.value);
        }
        if let Some(first) = self.items.first() {
            self.head = Some(head_of(&first.value));
        }
    }

    /// Hyphen-joined combination of every prefix value with every body value
    pub fn add_prefix(prefix: &MorphVariantCollection, body: &MorphVariantCollection) -> Self {
        let mut res = Self::new();
        for p in &prefix.items {
            for b in &body.items {
                let gender = if !b.gender.is_undefined() {
                    if !p.gender.is_undefined() && !p.gender.intersects(b.gender) {
                        MorphGender::UNDEFINED
                    } else {
                        b.gender
                    }
                } else {
                    p.gender
                };
                res.add_variant(MorphVariant::new(format!("{}-{}", p.value, b.value), gender));
            }
        }
        res.number = body.number;
        res
    }

    /// Strip embedded spaces, drop resulting duplicates and order the
    /// variants: forms without a hyphen first, then shorter forms first
    pub fn correct(&mut self) {
        for it in &mut self.items {
            if it.value.contains(' ') {
                it.value = it.value.replace(' ', "");
            }
        }
        let mut unique: Vec<MorphVariant> = Vec::with_capacity(self.items.len());
        for it in self.items.drain(..) {
            if !unique
                .iter()
                .any(|u| u.value == it.value && u.gender == it.gender)
            {
                unique.push(it);
            }
        }
        unique.sort_by(compare_variants);
        self.items = unique;
    }

    /// Some variant ends with a standard surname suffix
    pub fn has_lastname_standard_tail(&self) -> bool {
        self.items.iter().any(|it| ends_with_std_surname(&it.value))
    }

    /// MASCULINE or FEMININE when every variant agrees, otherwise undefined
    pub fn gender(&self) -> MorphGender {
        let all = self
            .items
            .iter()
            .fold(MorphGender::UNDEFINED, |acc, it| acc | it.gender);
        if all == MorphGender::MASCULINE || all == MorphGender::FEMININE {
            all
        } else {
            MorphGender::UNDEFINED
        }
    }

    /// Distinct values in insertion order
    pub fn values(&self) -> Vec<&str> {
        let mut res: Vec<&str> = Vec::with_capacity(self.items.len());
        for it in &self.items {
            if !res.contains(&it.value.as_str()) {
                res.push(&it.value);
            }
        }
        res
    }

    pub fn contains_value(&self, value: &str, gender: MorphGender) -> bool {
        self.items.iter().any(|it| {
            it.value == value
                && (gender.is_undefined()
                    || it.gender.is_undefined()
                    || it.gender.intersects(gender))
        })
    }

    /// Some variant is the same name as the Latin `value`
    pub fn check_latin_variant(&self, value: &str) -> bool {
        self.items
            .iter()
            .any(|it| names_equal_translit(&it.value, value))
    }

    /// Keep only variants of `gender`, unless that would empty the collection
    pub fn set_gender(&mut self, gender: MorphGender) -> bool {
        if gender.is_undefined() {
            return false;
        }
        let keep = self
            .items
            .iter()
            .filter(|it| it.gender.is_undefined() || it.gender.intersects(gender))
            .count();
        if keep == 0 || keep == self.items.len() {
            return false;
        }
        self.items
            .retain(|it| it.gender.is_undefined() || it.gender.intersects(gender));
        true
    }

    /// Reconcile collections describing the same name part, to a fixpoint.
    ///
    /// Two collections sharing a head keep only their common values; a
    /// collection with a definite gender removes opposite-gender variants
    /// from the others. Returns whether anything changed.
    pub fn intersect(list: &mut [MorphVariantCollection]) -> bool {
        let mut changed = false;
        loop {
            let mut step = false;
            for i in 0..list.len() {
                for j in 0..list.len() {
                    if i == j {
                        continue;
                    }
                    let other = list[j].clone();
                    if list[i].intersect_with(&other) {
                        step = true;
                    }
                }
            }
            if !step {
                break;
            }
            changed = true;
        }
        changed
    }

    fn intersect_with(&mut self, other: &MorphVariantCollection) -> bool {
        if self.items.is_empty() || other.items.is_empty() || self.head != other.head {
            return false;
        }
        let mut changed = false;

        let common = self
            .items
            .iter()
            .filter(|it| other.items.iter().any(|o| o.value == it.value))
            .count();
        if common > 0 && common < self.items.len() {
            self.items
                .retain(|it| other.items.iter().any(|o| o.value == it.value));
            changed = true;
        }

        let g = other.gender();
        if !g.is_undefined() && self.gender() != g && self.set_gender(g) {
            changed = true;
        }
        changed
    }

    /// Apply [`set_gender`](Self::set_gender) to every collection
    pub fn set_gender_all(list: &mut [MorphVariantCollection], gender: MorphGender) {
        for col in list {
            col.set_gender(gender);
        }
    }
}

fn compare_variants(a: &MorphVariant, b: &MorphVariant) -> std::cmp::Ordering {
    has_hiphen(&a.value)
        .cmp(&has_hiphen(&b.value))
        .then_with(|| a.value.chars().count().cmp(&b.value.chars().count()))
}

impl std::fmt::Display for MorphVariantCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|it| {
                if it.gender.is_undefined() {
                    it.value.clone()
                } else {
                    format!("{}({})", it.value, it.gender)
                }
            })
            .collect();
        write!(f, "{}", parts.join("; "))?;
        if self.number > 0 {
            write!(f, " #{}", self.number)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::Lexicon;
    use proptest::prelude::*;

    #[test]
    fn test_add_skips_duplicates_and_sets_head() {
        let mut col = MorphVariantCollection::new();
        col.add("ИВАНОВ", None, MorphGender::MASCULINE, None);
        col.add("ИВАНОВ", None, MorphGender::MASCULINE, None);
        col.add("ИВАНОВ", None, MorphGender::FEMININE, None);
        assert_eq!(col.len(), 2);
        assert_eq!(col.head(), Some("ИВА"));
        assert_eq!(col.values(), vec!["ИВАНОВ"]);
    }

    #[test]
    fn test_add_opposite_gender() {
        let lex = Lexicon::shared().unwrap();
        let mut col = MorphVariantCollection::new();
        col.add("ИВАНОВ", None, MorphGender::MASCULINE, Some(lex.as_ref()));
        assert!(col.contains_value("ИВАНОВА", MorphGender::FEMININE));
        assert_eq!(col.gender(), MorphGender::UNDEFINED);
    }

    #[test]
    fn test_remove_filters() {
        let mut col = MorphVariantCollection::new();
        col.add("ПЕТРОВ", None, MorphGender::MASCULINE, None);
        col.add("ПЕТРОВА", None, MorphGender::FEMININE, None);
        assert!(!col.remove(Some("СИДОРОВ"), MorphGender::UNDEFINED));
        assert!(col.remove(None, MorphGender::FEMININE));
        assert_eq!(col.values(), vec!["ПЕТРОВ"]);
        assert_eq!(col.gender(), MorphGender::MASCULINE);
    }

    #[test]
    fn test_add_prefix_gender_rules() {
        let prefix = MorphVariantCollection::from_value("АННА", MorphGender::FEMININE);
        let mut body = MorphVariantCollection::new();
        body.add("МАРИЯ", None, MorphGender::UNDEFINED, None);
        let res = MorphVariantCollection::add_prefix(&prefix, &body);
        assert_eq!(res.items()[0].value, "АННА-МАРИЯ");
        assert_eq!(res.items()[0].gender, MorphGender::FEMININE);

        let male = MorphVariantCollection::from_value("ЖАН", MorphGender::MASCULINE);
        let res = MorphVariantCollection::add_prefix(&male, &prefix);
        assert!(res.items()[0].gender.is_undefined());
    }

    #[test]
    fn test_correct_strips_spaces_and_sorts() {
        let mut col = MorphVariantCollection::new();
        col.add("ЛИ-СИН", None, MorphGender::UNDEFINED, None);
        col.add("ЛИ СИН", None, MorphGender::UNDEFINED, None);
        col.add("ЛИСИН", None, MorphGender::UNDEFINED, None);
        col.correct();
        assert_eq!(col.values(), vec!["ЛИСИН", "ЛИ-СИН"]);
    }

    #[test]
    fn test_standard_tail() {
        assert!(MorphVariantCollection::from_value("ШЕВЧЕНКО", MorphGender::UNDEFINED)
            .has_lastname_standard_tail());
        assert!(!MorphVariantCollection::from_value("СМИТ", MorphGender::UNDEFINED)
            .has_lastname_standard_tail());
    }

    #[test]
    fn test_intersect_common_values_and_gender() {
        let mut a = MorphVariantCollection::new();
        a.add("ИВАНОВ", None, MorphGender::MASCULINE, None);
        a.add("ИВАНОВА", None, MorphGender::FEMININE, None);
        let b = MorphVariantCollection::from_value("ИВАНОВА", MorphGender::FEMININE);
        let mut list = vec![a, b];
        assert!(MorphVariantCollection::intersect(&mut list));
        assert_eq!(list[0].values(), vec!["ИВАНОВА"]);
        assert!(!MorphVariantCollection::intersect(&mut list));
    }

    #[test]
    fn test_intersect_ignores_other_heads() {
        let a = MorphVariantCollection::from_value("ИВАНОВ", MorphGender::MASCULINE);
        let b = MorphVariantCollection::from_value("ПЕТРОВА", MorphGender::FEMININE);
        let mut list = vec![a, b];
        assert!(!MorphVariantCollection::intersect(&mut list));
        assert_eq!(list[0].len(), 1);
    }

    #[test]
    fn test_latin_variant() {
        let col = MorphVariantCollection::from_value("ДЖОН", MorphGender::MASCULINE);
        assert!(col.check_latin_variant("JON"));
    }

    fn gender_strategy() -> impl Strategy<Value = MorphGender> {
        prop_oneof![
            Just(MorphGender::UNDEFINED),
            Just(MorphGender::MASCULINE),
            Just(MorphGender::FEMININE),
        ]
    }

    proptest! {
        #[test]
        fn prop_correct_has_no_duplicates_and_is_sorted(
            entries in proptest::collection::vec(
                ("[АБВ]{1,3}(-[АБ]{1,2})?( [АБ])?", gender_strategy()),
                0..12,
            )
        ) {
            let mut col = MorphVariantCollection::new();
            for (value, gender) in &entries {
                col.add(value, None, *gender, None);
            }
            col.correct();
            let items = col.items();
            for i in 0..items.len() {
                prop_assert!(!items[i].value.contains(' '));
                for j in (i + 1)..items.len() {
                    let (a, b) = (&items[i], &items[j]);
                    prop_assert!(!(a.value == b.value && a.gender == b.gender));
                    prop_assert!(compare_variants(a, b) != std::cmp::Ordering::Greater);
                }
            }
        }

        #[test]
        fn prop_intersect_never_empties(
            a in proptest::collection::vec(("И[АБ]{1,2}", gender_strategy()), 1..6),
            b in proptest::collection::vec(("И[АБ]{1,2}", gender_strategy()), 1..6),
        ) {
            let mut x = MorphVariantCollection::new();
            for (v, g) in &a { x.add(v, None, *g, None); }
            let mut y = MorphVariantCollection::new();
            for (v, g) in &b { y.add(v, None, *g, None); }
            let mut list = vec![x, y];
            MorphVariantCollection::intersect(&mut list);
            prop_assert!(!list[0].is_empty());
            prop_assert!(!list[1].is_empty());
        }
    }
}
