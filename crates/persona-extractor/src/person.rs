//! Person referent
//!
//! The resolved person: name slots that accumulate across mentions, sex,
//! age, birth and death, attributes, contacts and identity documents.
//! Every mention that is resolved to the same person is merged into one
//! referent, so slot values are sets rather than single strings.

use serde::{Deserialize, Serialize};

use persona_core::numbers::to_roman;
use persona_core::text::{
    cyrillic_to_latin_char, is_cyrillic_char, is_latin_char, is_not_more_than_one_error,
};
use persona_core::{ExternalReferent, MorphGender};

use crate::identity::PersonIdentityReferent;
use crate::morph_collection::MorphVariantCollection;
use crate::name_part::del_surname_end;
use crate::property::{EqualityMode, PersonProperty, PropertyKind};

/// Index of a person in the per-document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub usize);

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "person#{}", self.0)
    }
}

// ============================================================================
// Slot names
// ============================================================================

pub const ATTR_LASTNAME: &str = "LASTNAME";
pub const ATTR_FIRSTNAME: &str = "FIRSTNAME";
pub const ATTR_MIDDLENAME: &str = "MIDDLENAME";
pub const ATTR_NICKNAME: &str = "NICKNAME";
pub const ATTR_UNDEFNAME: &str = "UNDEFNAME";
pub const ATTR_IDENTITY: &str = "IDENTITY";
pub const ATTR_SEX: &str = "SEX";
pub const ATTR_AGE: &str = "AGE";
pub const ATTR_BORN: &str = "BORN";
pub const ATTR_DIE: &str = "DIE";
pub const ATTR_ATTRIBUTE: &str = "ATTRIBUTE";
pub const ATTR_CONTACT: &str = "CONTACT";
pub const ATTR_IDDOC: &str = "IDDOC";
pub const ATTR_NAMETYPE: &str = "NAMETYPE";

pub const SEX_MALE: &str = "MALE";
pub const SEX_FEMALE: &str = "FEMALE";

// ============================================================================
// Person Referent
// ============================================================================

/// A person entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonReferent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lastnames: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub firstnames: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middlenames: Vec<String>,
    /// Nicknames and regnal numbers (Грозный, I)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nicknames: Vec<String>,
    /// Name words of an unknown role
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undefnames: Vec<String>,
    /// Whole names that are not split into roles (Asian, Arabic)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<String>,
    pub is_male: bool,
    pub is_female: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub born: Option<ExternalReferent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub die: Option<ExternalReferent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<PersonProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<ExternalReferent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_docs: Vec<PersonIdentityReferent>,
    /// Naming tradition (china, arabic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_type: Option<String>,

    #[serde(skip)]
    lastname_occurs: Vec<MorphVariantCollection>,
    #[serde(skip)]
    firstname_occurs: Vec<MorphVariantCollection>,
    #[serde(skip)]
    middlename_occurs: Vec<MorphVariantCollection>,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// "ИВАНОВ-ПЕТРОВ" → "Иванов-Петров"
fn title_case(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if word_start {
                res.extend(c.to_uppercase());
            } else {
                res.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            res.push(c);
            word_start = true;
        }
    }
    res
}

fn is_latin(s: &str) -> bool {
    s.chars().any(is_latin_char)
}

fn is_cyrillic(s: &str) -> bool {
    s.chars().any(is_cyrillic_char)
}

fn same_script(a: &str, b: &str) -> bool {
    (is_latin(a) && is_latin(b)) || (is_cyrillic(a) && is_cyrillic(b))
}

/// Two surname strings may be forms of one surname
fn compare_surnames(s1: &str, s2: &str) -> bool {
    if s1.starts_with(s2) || s2.starts_with(s1) {
        return true;
    }
    if del_surname_end(s1) == del_surname_end(s2) {
        return true;
    }
    s1.chars().count() > 4 && is_not_more_than_one_error(s1, s2)
}

/// Regnal number written as an ordinal nickname (I = ПЕРВЫЙ)
fn nickname_equals_surname(nick: &str, sur: Option<&str>) -> bool {
    let Some(sur) = sur else {
        return false;
    };
    match nick {
        "I" => matches!(sur, "ПЕРВЫЙ" | "ПЕРВАЯ" | "ПЕРШИЙ"),
        "II" => matches!(sur, "ВТОРОЙ" | "ВТОРАЯ" | "ДРУГИЙ"),
        "III" => matches!(sur, "ТРЕТИЙ" | "ТРЕТЬЯ" | "ТРЕТІЙ"),
        _ => false,
    }
}

impl PersonReferent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initials are single letters, plus the ДЖ digraph
    pub fn is_initial(s: &str) -> bool {
        s.chars().count() == 1 || s == "ДЖ"
    }

    pub fn gender(&self) -> MorphGender {
        match (self.is_male, self.is_female) {
            (true, false) => MorphGender::MASCULINE,
            (false, true) => MorphGender::FEMININE,
            _ => MorphGender::UNDEFINED,
        }
    }

    pub fn set_gender(&mut self, gender: MorphGender) {
        if gender == MorphGender::MASCULINE {
            self.is_male = true;
        } else if gender == MorphGender::FEMININE {
            self.is_female = true;
        }
    }

    pub fn has_name(&self) -> bool {
        !self.lastnames.is_empty()
            || !self.firstnames.is_empty()
            || !self.identities.is_empty()
            || !self.undefnames.is_empty()
    }

    /// Record a name resolved by a template
    pub fn add_fio_identity(
        &mut self,
        lastname: Option<MorphVariantCollection>,
        firstname: Option<MorphVariantCollection>,
        middlename: Option<MorphVariantCollection>,
    ) {
        if let Some(mut last) = lastname {
            if last.number > 0 {
                let num = u64::from(last.number);
                push_unique(&mut self.nicknames, &to_roman(num));
            } else {
                last.correct();
                for v in last.values() {
                    push_unique(&mut self.lastnames, v);
                }
                self.lastname_occurs.push(last);
            }
        }
        if let Some(mut first) = firstname {
            first.correct();
            for v in first.values() {
                push_unique(&mut self.firstnames, v);
            }
            if first.head().is_some_and(|h| h.chars().count() > 2) {
                self.firstname_occurs.push(first);
            }
            if let Some(mut middle) = middlename {
                middle.correct();
                for v in middle.values() {
                    push_unique(&mut self.middlenames, v);
                }
                if middle.head().is_some_and(|h| h.chars().count() > 2) {
                    self.middlename_occurs.push(middle);
                }
            }
        }
        self.correct_data();
    }

    /// Record a whole name; its words are also spread over the name
    /// slots (first word a first name, last word a surname)
    pub fn add_identity(&mut self, ident: &MorphVariantCollection) {
        for v in ident.values() {
            push_unique(&mut self.identities, v);
            let words: Vec<&str> = v.split(' ').filter(|w| !w.is_empty()).collect();
            let n = words.len();
            for (i, w) in words.iter().enumerate() {
                if i == 0 && n > 1 {
                    push_unique(&mut self.firstnames, w);
                } else if i == n - 1 && n > 1 {
                    push_unique(&mut self.lastnames, w);
                } else {
                    push_unique(&mut self.undefnames, w);
                }
            }
        }
        self.correct_data();
    }

    pub fn add_nickname(&mut self, nick: &str) {
        push_unique(&mut self.nicknames, nick);
    }

    /// Add an attribute unless an equal one is already attached
    pub fn add_attribute(&mut self, attr: PersonProperty) {
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.can_be_equals(&attr, EqualityMode::WithinOneText))
        {
            existing.merge_slots(&attr);
            return;
        }
        self.attributes.push(attr);
    }

    pub fn add_contact(&mut self, contact: ExternalReferent) {
        if !self.contacts.contains(&contact) {
            self.contacts.push(contact);
        }
    }

    pub fn add_id_doc(&mut self, doc: PersonIdentityReferent) {
        if !self.id_docs.contains(&doc) {
            self.id_docs.push(doc);
        }
    }

    /// Name of the shortest king-like attribute (король, царь, папа)
    fn shortest_king_title(&self) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|a| a.kind == PropertyKind::King)
            .map(|a| a.name.as_str())
            .min_by_key(|n| n.chars().count())
    }

    fn compare_surnames_with(&self, other: &PersonReferent) -> bool {
        self.lastnames
            .iter()
            .any(|s| other.lastnames.iter().any(|ss| compare_surnames(s, ss)))
    }

    /// Compatible first (or middle) names: full names intersect, or
    /// initials agree with initials or with the first letter of a full name
    fn check_names(names1: &[String], names2: &[String]) -> bool {
        let split = |list: &[String]| -> (Vec<String>, Vec<String>) {
            list.iter()
                .cloned()
                .partition(|n| !PersonReferent::is_initial(n))
        };
        let (full1, inits1) = split(names1);
        let (full2, inits2) = split(names2);
        if !full1.is_empty() && !full2.is_empty() {
            if full1.iter().any(|n| full2.contains(n)) {
                return true;
            }
            let norm = |l: &[String]| l.iter().map(|n| del_surname_end(n)).collect::<Vec<_>>();
            let (n1, n2) = (norm(&full1), norm(&full2));
            return n1.iter().any(|n| n2.contains(n));
        }
        if !inits1.is_empty() {
            if inits2.iter().any(|i| inits1.contains(i)) {
                return true;
            }
            return inits1
                .iter()
                .any(|i| full2.iter().any(|n| n.starts_with(i.as_str())));
        }
        if !inits2.is_empty() {
            return inits2
                .iter()
                .any(|i| full1.iter().any(|n| n.starts_with(i.as_str())));
        }
        false
    }

    fn all_idents(&self) -> Vec<String> {
        let mut res = Vec::new();
        if let Some(f) = self.firstnames.first() {
            res.push(f.clone());
        }
        res.extend(self.undefnames.iter().cloned());
        if let Some(l) = self.lastnames.first() {
            res.push(l.clone());
        }
        res
    }

    /// Two mentions may denote the same person
    pub fn can_be_equals(&self, other: &PersonReferent, mode: EqualityMode) -> bool {
        if self.identities.iter().any(|a| {
            other
                .identities
                .iter()
                .any(|b| del_surname_end(a) == del_surname_end(b))
        }) {
            return true;
        }
        let nick1 = self.nicknames.first().map(String::as_str);
        let nick2 = other.nicknames.first().map(String::as_str);
        if let (Some(n1), Some(n2)) = (nick1, nick2) {
            if n1 != n2 {
                return false;
            }
        }

        if !self.lastnames.is_empty() && !other.lastnames.is_empty() {
            if !self.compare_surnames_with(other) {
                return false;
            }
            if !self.firstnames.is_empty() && !other.firstnames.is_empty() {
                if !Self::check_names(&self.firstnames, &other.firstnames) {
                    return false;
                }
                if !self.middlenames.is_empty() && !other.middlenames.is_empty() {
                    if !Self::check_names(&self.middlenames, &other.middlenames) {
                        return false;
                    }
                } else if mode == EqualityMode::DifferentTexts {
                    if !self.middlenames.is_empty() || !other.middlenames.is_empty() {
                        return self.to_display_string() == other.to_display_string();
                    }
                    let names1: Vec<&String> = self
                        .firstnames
                        .iter()
                        .filter(|n| !Self::is_initial(n))
                        .collect();
                    let names2: Vec<&String> = other
                        .firstnames
                        .iter()
                        .filter(|n| !Self::is_initial(n))
                        .collect();
                    if names2.iter().any(|n| names1.contains(n)) {
                        return true;
                    }
                    return names1.is_empty() && names2.is_empty();
                }
            } else if mode == EqualityMode::DifferentTexts
                && (!self.firstnames.is_empty() || !other.firstnames.is_empty())
            {
                return false;
            }
            return true;
        }

        let tit1 = self.shortest_king_title();
        let tit2 = other.shortest_king_title();
        let same_nick = nick1.is_some() && nick1 == nick2;
        if tit1.is_some() || tit2.is_some() || same_nick {
            match (tit1, tit2) {
                (Some(t1), Some(t2)) => {
                    if t1 != t2 && !t1.contains(t2) && !t2.contains(t1) {
                        return false;
                    }
                }
                _ => {
                    let ok = same_nick
                        || nick1.is_some_and(|n| {
                            nickname_equals_surname(n, other.lastnames.first().map(String::as_str))
                        })
                        || nick2.is_some_and(|n| {
                            nickname_equals_surname(n, self.lastnames.first().map(String::as_str))
                        });
                    if !ok {
                        return false;
                    }
                }
            }
            if !self.firstnames.is_empty() && !other.firstnames.is_empty() {
                return Self::check_names(&self.firstnames, &other.firstnames);
            }
        }

        if !self.undefnames.is_empty() && !other.undefnames.is_empty() {
            let und1 = self.all_idents();
            let und2 = other.all_idents();
            let (short, long) = if und1.len() <= und2.len() {
                (&und1, &und2)
            } else {
                (&und2, &und1)
            };
            for (i, u) in short.iter().enumerate() {
                if long.contains(u) {
                    continue;
                }
                let last = i == short.len() - 1;
                let tail_eq = long
                    .last()
                    .is_some_and(|l| del_surname_end(u) == del_surname_end(l));
                if !(last && tail_eq) {
                    return false;
                }
            }
            return true;
        }
        false
    }

    /// This mention is a less complete form of `other`
    /// ("Иванов И." for "Иванов Иван Петрович")
    pub fn can_be_general_for(&self, other: &PersonReferent) -> bool {
        if !self.can_be_equals(other, EqualityMode::WithinOneText) {
            return false;
        }
        if self.lastnames.is_empty() || other.lastnames.is_empty() {
            return false;
        }
        if !self.compare_surnames_with(other) {
            return false;
        }
        if self.firstnames.is_empty() {
            return !other.firstnames.is_empty();
        }
        if other.firstnames.is_empty() {
            return false;
        }
        if !Self::check_names(&self.firstnames, &other.firstnames) {
            return false;
        }
        if !self.middlenames.is_empty()
            && other.middlenames.is_empty()
            && !self.firstnames.first().is_some_and(|f| Self::is_initial(f))
        {
            return false;
        }

        let count = |list: &[String]| {
            let inits = list.iter().filter(|n| Self::is_initial(n)).count();
            (inits, list.len() - inits)
        };
        let (name_inits, _) = count(&self.firstnames);
        let (sec_inits, sec_fulls) = count(&self.middlenames);
        let (name_inits1, _) = count(&other.firstnames);
        let (sec_inits1, sec_fulls1) = count(&other.middlenames);

        if sec_fulls > 0 {
            return false;
        }
        if name_inits == 0 {
            if name_inits1 > 0 {
                return false;
            }
        } else if name_inits1 > 0 && sec_inits + sec_fulls > 0 {
            return false;
        }
        if sec_inits == 0 {
            if sec_inits1 + sec_fulls1 == 0 {
                return name_inits1 == 0 && name_inits > 0;
            }
        } else if sec_inits1 > 0 {
            return false;
        }
        true
    }

    /// Union the slots of another mention of the same person
    pub fn merge_slots(&mut self, other: &PersonReferent) {
        for v in &other.lastnames {
            push_unique(&mut self.lastnames, v);
        }
        for v in &other.firstnames {
            push_unique(&mut self.firstnames, v);
        }
        for v in &other.middlenames {
            push_unique(&mut self.middlenames, v);
        }
        for v in &other.nicknames {
            push_unique(&mut self.nicknames, v);
        }
        for v in &other.undefnames {
            push_unique(&mut self.undefnames, v);
        }
        for v in &other.identities {
            push_unique(&mut self.identities, v);
        }
        self.is_male |= other.is_male;
        self.is_female |= other.is_female;
        if self.age.is_none() {
            self.age = other.age;
        }
        if self.born.is_none() {
            self.born = other.born.clone();
        }
        if self.die.is_none() {
            self.die = other.die.clone();
        }
        for a in &other.attributes {
            self.add_attribute(a.clone());
        }
        for c in &other.contacts {
            self.add_contact(c.clone());
        }
        for d in &other.id_docs {
            self.add_id_doc(d.clone());
        }
        if self.name_type.is_none() {
            self.name_type = other.name_type.clone();
        }
        self.lastname_occurs
            .extend(other.lastname_occurs.iter().cloned());
        self.firstname_occurs
            .extend(other.firstname_occurs.iter().cloned());
        self.middlename_occurs
            .extend(other.middlename_occurs.iter().cloned());
        self.correct_data();
    }

    /// Reconcile the occurrence lists and clean up the slots
    pub fn correct_data(&mut self) {
        loop {
            let mut changed = MorphVariantCollection::intersect(&mut self.lastname_occurs);
            changed |= MorphVariantCollection::intersect(&mut self.firstname_occurs);
            changed |= MorphVariantCollection::intersect(&mut self.middlename_occurs);

            let mut g = self
                .lastname_occurs
                .iter()
                .map(MorphVariantCollection::gender)
                .find(|g| !g.is_undefined())
                .unwrap_or(MorphGender::UNDEFINED);
            if g.is_undefined() {
                g = self
                    .firstname_occurs
                    .iter()
                    .map(MorphVariantCollection::gender)
                    .find(|g| !g.is_undefined())
                    .unwrap_or(MorphGender::UNDEFINED);
            }
            if g.is_undefined() {
                g = self.gender();
            }
            if !g.is_undefined() {
                for list in [
                    &mut self.lastname_occurs,
                    &mut self.firstname_occurs,
                    &mut self.middlename_occurs,
                ] {
                    for col in list.iter_mut() {
                        changed |= col.set_gender(g);
                    }
                }
                if !self.is_male && !self.is_female {
                    self.set_gender(g);
                }
            }
            if !changed {
                break;
            }
        }
        self.correct_surnames();
        self.correct_identifiers();
        self.correct_attrs();
        Self::remove_slots(&mut self.lastnames, &self.lastname_occurs, true);
        Self::remove_slots(&mut self.firstnames, &self.firstname_occurs, false);
        Self::remove_slots(&mut self.middlenames, &self.middlename_occurs, false);
        Self::remove_initials(&mut self.firstnames);
        Self::remove_initials(&mut self.middlenames);
    }

    fn correct_surnames(&mut self) {
        let mut i = 0;
        while i < self.lastnames.len() {
            let mut j = i + 1;
            while j < self.lastnames.len() {
                let (a, b) = (&self.lastnames[i], &self.lastnames[j]);
                if a.len() != b.len() && del_surname_end(a) == del_surname_end(b) {
                    // ИВАНОВ + ИВАНОВА: the male form is the stem
                    let a_longer = a.chars().count() > b.chars().count();
                    let drop_i = if self.is_female && !self.is_male {
                        !a_longer
                    } else if self.is_male && !self.is_female {
                        a_longer
                    } else {
                        j += 1;
                        continue;
                    };
                    if drop_i {
                        self.lastnames.remove(i);
                        j = i + 1;
                        continue;
                    }
                    self.lastnames.remove(j);
                    continue;
                }
                j += 1;
            }
            i += 1;
        }
        let names: Vec<String> = self
            .firstnames
            .iter()
            .chain(self.lastnames.iter())
            .cloned()
            .collect();
        self.undefnames.retain(|u| !names.contains(u));
        let nicks = self.nicknames.clone();
        self.lastnames.retain(|l| !nicks.contains(l));
    }

    fn correct_identifiers(&mut self) {
        if self.is_female {
            return;
        }
        let mut i = 0;
        let mut merged = false;
        while i < self.identities.len() {
            let key = del_surname_end(&self.identities[i]);
            let dup = self.identities[..i]
                .iter()
                .any(|prev| del_surname_end(prev) == key);
            if dup {
                self.identities.remove(i);
                merged = true;
                continue;
            }
            i += 1;
        }
        if merged {
            self.is_male = true;
        }
    }

    /// Drop attributes that are a general form of another attribute
    fn correct_attrs(&mut self) {
        let mut i = 0;
        while i < self.attributes.len() {
            let general = self
                .attributes
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && self.attributes[i].can_be_general_for(other));
            if general {
                self.attributes.remove(i);
                continue;
            }
            i += 1;
        }
    }

    /// Remove slot values that no surviving occurrence variant supports
    fn remove_slots(values: &mut Vec<String>, occurs: &[MorphVariantCollection], surname: bool) {
        if occurs.is_empty() {
            return;
        }
        let supported: Vec<&str> = occurs.iter().flat_map(|o| o.values()).collect();
        values.retain(|v| {
            supported.contains(&v.as_str())
                || Self::is_initial(v)
                || (surname && supported.iter().any(|s| compare_surnames(v, s)))
        });
    }

    /// An initial goes when a full name starting with it is present
    fn remove_initials(values: &mut Vec<String>) {
        let fulls: Vec<String> = values
            .iter()
            .filter(|v| !Self::is_initial(v))
            .cloned()
            .collect();
        values.retain(|v| !Self::is_initial(v) || !fulls.iter().any(|f| f.starts_with(v.as_str())));
    }

    // ========================================================================
    // Display
    // ========================================================================

    fn pick_same_script<'s>(values: &'s [String], like: &str) -> Option<&'s str> {
        values
            .iter()
            .find(|v| same_script(v, like))
            .or_else(|| values.first())
            .map(String::as_str)
    }

    fn with_initial_dot(value: &str) -> String {
        if Self::is_initial(value) {
            format!("{value}.")
        } else {
            value.to_string()
        }
    }

    /// Full name, surname first (Иванов Иван Иванович)
    pub fn to_display_string(&self) -> String {
        if let Some(id) = self.identities.first() {
            return title_case(id);
        }
        let mut res = String::new();
        if let Some(last) = self.lastnames.first() {
            res.push_str(last);
            if let Some(first) = Self::pick_same_script(&self.firstnames, last) {
                res.push(' ');
                res.push_str(&Self::with_initial_dot(first));
                if let Some(mid) = Self::pick_same_script(&self.middlenames, last) {
                    res.push(' ');
                    res.push_str(&Self::with_initial_dot(mid));
                }
            }
            if is_cyrillic(last) {
                if let Some(lat) = self.lastnames.iter().find(|l| is_latin(l)) {
                    res.push_str(&format!(" ({lat})"));
                }
            }
        } else if let Some(first) = self.firstnames.first() {
            if let Some(title) = self.shortest_king_title() {
                res.push_str(&title.to_uppercase());
                res.push(' ');
            }
            res.push_str(&Self::with_initial_dot(first));
            if let Some(mid) = self.middlenames.first() {
                res.push(' ');
                res.push_str(&Self::with_initial_dot(mid));
            }
            if let Some(nick) = self.nicknames.first() {
                res.push(' ');
                res.push_str(nick);
            }
        } else if !self.undefnames.is_empty() {
            res = self.undefnames.join(" ");
        } else {
            return "?".to_string();
        }
        let mut res = title_case(&res);
        // Roman numerals stay upper case
        if let Some(nick) = self.nicknames.first() {
            let titled = title_case(nick);
            if nick.chars().all(|c| "IVXLCDM".contains(c)) {
                res = res.replace(&titled, nick);
            }
        }
        res
    }

    /// Short form: surname with initials (Иванов И.П.)
    pub fn to_short_string(&self) -> String {
        if let Some(id) = self.identities.iter().min_by_key(|i| i.chars().count()) {
            return title_case(id);
        }
        if let Some(last) = self.lastnames.first() {
            let mut res = title_case(last);
            if let Some(first) = Self::pick_same_script(&self.firstnames, last) {
                if let Some(c) = first.chars().next() {
                    res.push(' ');
                    res.push(c);
                    res.push('.');
                    if let Some(mid) = Self::pick_same_script(&self.middlenames, last) {
                        if let Some(m) = mid.chars().next() {
                            res.push(m);
                            res.push('.');
                        }
                    }
                }
            }
            return res;
        }
        if let (Some(title), Some(first)) = (self.shortest_king_title(), self.firstnames.first()) {
            return format!("{} {}", title, title_case(first));
        }
        self.to_display_string()
    }

    /// Form of address for the person's sex
    pub fn prefix(&self) -> &'static str {
        if self.is_female && !self.is_male {
            "г-жа "
        } else if self.is_male && !self.is_female {
            "г-н "
        } else {
            ""
        }
    }

    /// Transliterated Latin form of the first surname
    pub fn latin_lastname(&self) -> Option<String> {
        let last = self.lastnames.first()?;
        if is_latin(last) {
            return Some(last.clone());
        }
        last.chars().map(cyrillic_to_latin_char).collect()
    }

    /// All slots as (name, value) pairs
    pub fn slots(&self) -> Vec<(&'static str, String)> {
        let mut res = Vec::new();
        let lists: [(&'static str, &Vec<String>); 6] = [
            (ATTR_LASTNAME, &self.lastnames),
            (ATTR_FIRSTNAME, &self.firstnames),
            (ATTR_MIDDLENAME, &self.middlenames),
            (ATTR_NICKNAME, &self.nicknames),
            (ATTR_UNDEFNAME, &self.undefnames),
            (ATTR_IDENTITY, &self.identities),
        ];
        for (name, values) in lists {
            res.extend(values.iter().map(|v| (name, v.clone())));
        }
        if self.is_male {
            res.push((ATTR_SEX, SEX_MALE.to_string()));
        }
        if self.is_female {
            res.push((ATTR_SEX, SEX_FEMALE.to_string()));
        }
        if let Some(age) = self.age {
            res.push((ATTR_AGE, age.to_string()));
        }
        if let Some(born) = &self.born {
            res.push((ATTR_BORN, born.to_string()));
        }
        if let Some(die) = &self.die {
            res.push((ATTR_DIE, die.to_string()));
        }
        res.extend(self.attributes.iter().map(|a| (ATTR_ATTRIBUTE, a.to_string())));
        res.extend(self.contacts.iter().map(|c| (ATTR_CONTACT, c.to_string())));
        res.extend(self.id_docs.iter().map(|d| (ATTR_IDDOC, d.to_string())));
        if let Some(nt) = &self.name_type {
            res.push((ATTR_NAMETYPE, nt.clone()));
        }
        res
    }
}

impl std::fmt::Display for PersonReferent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn coll(values: &[(&str, MorphGender)]) -> MorphVariantCollection {
        let mut res = MorphVariantCollection::new();
        for (v, g) in values {
            res.add(v, None, *g, None);
        }
        res
    }

    fn person(last: &str, first: Option<&str>, middle: Option<&str>) -> PersonReferent {
        let mut p = PersonReferent::new();
        p.add_fio_identity(
            Some(coll(&[(last, MorphGender::UNDEFINED)])),
            first.map(|f| coll(&[(f, MorphGender::UNDEFINED)])),
            middle.map(|m| coll(&[(m, MorphGender::UNDEFINED)])),
        );
        p
    }

    #[test]
    fn test_add_fio_identity_fills_slots() {
        let p = person("ИВАНОВ", Some("ИВАН"), Some("ИВАНОВИЧ"));
        assert_eq!(p.lastnames, vec!["ИВАНОВ"]);
        assert_eq!(p.firstnames, vec!["ИВАН"]);
        assert_eq!(p.middlenames, vec!["ИВАНОВИЧ"]);
        assert_eq!(p.to_display_string(), "Иванов Иван Иванович");
        assert_eq!(p.to_short_string(), "Иванов И.И.");
    }

    #[test]
    fn test_king_number_becomes_nickname() {
        let mut last = MorphVariantCollection::new();
        last.number = 1;
        let mut p = PersonReferent::new();
        p.add_fio_identity(Some(last), Some(coll(&[("ПЕТР", MorphGender::MASCULINE)])), None);
        assert_eq!(p.nicknames, vec!["I"]);
        assert!(p.lastnames.is_empty());
        assert!(p.is_male);
        assert_eq!(p.to_display_string(), "Петр I");
    }

    #[test]
    fn test_sex_from_surname_gender() {
        let mut p = PersonReferent::new();
        p.add_fio_identity(
            Some(coll(&[
                ("ИВАНОВА", MorphGender::FEMININE),
                ("ИВАНОВ", MorphGender::MASCULINE),
            ])),
            Some(coll(&[("МАРИЯ", MorphGender::FEMININE)])),
            None,
        );
        assert!(p.is_female);
        assert!(!p.is_male);
        assert_eq!(p.lastnames, vec!["ИВАНОВА"]);
    }

    #[test]
    fn test_can_be_equals_with_initials() {
        let full = person("ИВАНОВ", Some("ИВАН"), Some("ПЕТРОВИЧ"));
        let short = person("ИВАНОВ", Some("И"), Some("П"));
        let other = person("ИВАНОВ", Some("С"), None);
        assert!(full.can_be_equals(&short, EqualityMode::WithinOneText));
        assert!(!full.can_be_equals(&other, EqualityMode::WithinOneText));
        assert!(short.can_be_general_for(&full));
        assert!(!full.can_be_general_for(&short));
    }

    #[test]
    fn test_surname_case_forms_compare_equal() {
        let a = person("ИВАНОВ", None, None);
        let b = person("ИВАНОВЫМ", None, None);
        let c = person("ПЕТРОВ", None, None);
        assert!(a.can_be_equals(&b, EqualityMode::WithinOneText));
        assert!(!a.can_be_equals(&c, EqualityMode::WithinOneText));
    }

    #[test]
    fn test_different_texts_need_first_names() {
        let a = person("ИВАНОВ", Some("ИВАН"), None);
        let b = person("ИВАНОВ", None, None);
        assert!(a.can_be_equals(&b, EqualityMode::WithinOneText));
        assert!(!a.can_be_equals(&b, EqualityMode::DifferentTexts));
    }

    #[test]
    fn test_merge_slots_unions_and_prunes_initials() {
        let mut a = person("ИВАНОВ", Some("И"), None);
        let b = person("ИВАНОВ", Some("ИВАН"), None);
        a.merge_slots(&b);
        assert_eq!(a.firstnames, vec!["ИВАН"]);
        assert_eq!(a.lastnames, vec!["ИВАНОВ"]);
    }

    #[test]
    fn test_identity_split_into_roles() {
        let mut p = PersonReferent::new();
        p.add_identity(&coll(&[("МАО ЦЗЭ ДУН", MorphGender::UNDEFINED)]));
        assert_eq!(p.identities, vec!["МАО ЦЗЭ ДУН"]);
        assert_eq!(p.firstnames, vec!["МАО"]);
        assert_eq!(p.lastnames, vec!["ДУН"]);
        assert_eq!(p.undefnames, vec!["ЦЗЭ"]);
        assert_eq!(p.to_display_string(), "Мао Цзэ Дун");
    }

    #[test]
    fn test_general_attribute_is_dropped() {
        let mut p = person("ИВАНОВ", None, None);
        p.add_attribute(PersonProperty::new("министр"));
        p.add_attribute(PersonProperty::new("министр финансов"));
        p.correct_data();
        let names: Vec<&str> = p.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["министр финансов"]);
    }

    #[test]
    fn test_slots_use_slot_names() {
        let mut p = person("СМИТ", Some("ДЖОН"), None);
        p.set_gender(MorphGender::MASCULINE);
        p.age = Some(45);
        let slots = p.slots();
        assert!(slots.contains(&(ATTR_LASTNAME, "СМИТ".to_string())));
        assert!(slots.contains(&(ATTR_FIRSTNAME, "ДЖОН".to_string())));
        assert!(slots.contains(&(ATTR_SEX, SEX_MALE.to_string())));
        assert!(slots.contains(&(ATTR_AGE, "45".to_string())));
        assert_eq!(p.prefix(), "г-н ");
    }
}
