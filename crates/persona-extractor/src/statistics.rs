//! Document word statistics
//!
//! Collected once per document before person analysis. Scoring consults
//! them to tell whether two capitalised words habitually appear together
//! (a name and a surname) or whether a word is also used in lower case.

use std::collections::HashMap;

use persona_core::{Document, MorphGender, TokenRef};

/// Occurrence counters of one word
#[derive(Debug, Clone, Default)]
pub struct WordInfo {
    pub total_count: usize,
    pub lower_count: usize,
    pub upper_count: usize,
    /// Preceded by a lower-case word on the same line
    pub not_capital_before_count: usize,
    pub capital_before_count: usize,
    pub male_verbs_after_count: usize,
    pub female_verbs_after_count: usize,
    /// An attribute (position, prefix) was seen right before this word
    pub has_before_person_attr: bool,
    /// Neighbours with the same capitalisation, keyed by word
    pub like_chars_before_words: HashMap<String, usize>,
    pub like_chars_after_words: HashMap<String, usize>,
}

/// Adjacency counters of two words
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BigramInfo {
    /// Times the first word is followed by another word
    pub first_count: usize,
    /// Times the second word is preceded by another word
    pub second_count: usize,
    pub pair_count: usize,
}

#[derive(Debug, Default)]
pub struct Statistics {
    words: HashMap<String, WordInfo>,
    followed: HashMap<String, usize>,
    preceded: HashMap<String, usize>,
    pairs: HashMap<(String, String), usize>,
    /// ("И", ИВАНОВ) for every "И. Иванов"
    initials: HashMap<(char, String), usize>,
}

/// Statistics key of a word token: the lemma of a proper reading, else
/// the lemma of a dictionary reading, else the term
pub fn word_key(t: TokenRef<'_>) -> Option<String> {
    if !t.is_word() || !t.is_letters() {
        return None;
    }
    if let Some(f) = t.morph().iter().find(|f| f.class.is_proper()) {
        return Some(f.normal_full_or_case().to_string());
    }
    if let Some(f) = t.morph().iter().find(|f| f.in_dictionary) {
        return Some(f.normal_case.clone());
    }
    Some(t.term().to_string())
}

fn past_verb_gender(t: TokenRef<'_>) -> MorphGender {
    if !t.chars().is_all_lower {
        return MorphGender::UNDEFINED;
    }
    t.morph()
        .iter()
        .filter(|f| f.class.is_verb())
        .fold(MorphGender::UNDEFINED, |acc, f| acc | f.gender)
}

impl Statistics {
    /// Single pass over the document
    pub fn collect(doc: &Document) -> Self {
        let mut stats = Self::default();
        for t in doc.iter() {
            let Some(key) = word_key(t) else {
                continue;
            };
            let chars = t.chars();
            let prev = t
                .previous()
                .filter(|_| !t.is_newline_before())
                .and_then(|p| word_key(p).map(|k| (p, k)));
            let next = t
                .next()
                .filter(|n| !n.is_newline_before())
                .and_then(|n| word_key(n).map(|k| (n, k)));

            {
                let info = stats.words.entry(key.clone()).or_default();
                info.total_count += 1;
                if chars.is_all_lower {
                    info.lower_count += 1;
                } else {
                    info.upper_count += 1;
                }
                if let Some((p, pk)) = &prev {
                    if p.chars().is_all_lower {
                        info.not_capital_before_count += 1;
                    } else {
                        info.capital_before_count += 1;
                    }
                    if p.chars().same_case_style(&chars) {
                        *info.like_chars_before_words.entry(pk.clone()).or_default() += 1;
                    }
                }
                if let Some((n, nk)) = &next {
                    if n.chars().same_case_style(&chars) {
                        *info.like_chars_after_words.entry(nk.clone()).or_default() += 1;
                    }
                    let g = past_verb_gender(*n);
                    if g == MorphGender::MASCULINE {
                        info.male_verbs_after_count += 1;
                    } else if g == MorphGender::FEMININE {
                        info.female_verbs_after_count += 1;
                    }
                }
            }

            if let Some((_, nk)) = &next {
                *stats.followed.entry(key.clone()).or_default() += 1;
                *stats.preceded.entry(nk.clone()).or_default() += 1;
                *stats.pairs.entry((key.clone(), nk.clone())).or_default() += 1;
            }

            // "И. Иванов" and "И.Иванов"
            if t.length_char() == 1 && chars.is_all_upper {
                if let Some(dot) = t.next().filter(|d| d.is_char('.')) {
                    if let Some(sur) = dot.next().filter(|s| !s.is_newline_before()) {
                        if let (Some(c), Some(sk)) = (t.term().chars().next(), word_key(sur)) {
                            if sk.chars().count() > 1 {
                                *stats.initials.entry((c, sk)).or_default() += 1;
                            }
                        }
                    }
                }
            }
        }
        stats
    }

    pub fn word_info(&self, t: TokenRef<'_>) -> Option<&WordInfo> {
        self.words.get(&word_key(t)?)
    }

    pub fn word_info_mut(&mut self, t: TokenRef<'_>) -> Option<&mut WordInfo> {
        self.words.get_mut(&word_key(t)?)
    }

    pub fn bigram_info(&self, t1: TokenRef<'_>, t2: TokenRef<'_>) -> Option<BigramInfo> {
        let k1 = word_key(t1)?;
        let k2 = word_key(t2)?;
        Some(BigramInfo {
            first_count: self.followed.get(&k1).copied().unwrap_or(0),
            second_count: self.preceded.get(&k2).copied().unwrap_or(0),
            pair_count: self.pairs.get(&(k1, k2)).copied().unwrap_or(0),
        })
    }

    /// How often the initial `ini` preceded the word at `t`
    pub fn initial_info(&self, ini: &str, t: TokenRef<'_>) -> Option<BigramInfo> {
        let c = ini.chars().next()?;
        let key = word_key(t)?;
        let pair_count = self.initials.get(&(c, key.clone())).copied().unwrap_or(0);
        Some(BigramInfo {
            first_count: pair_count,
            second_count: self.words.get(&key).map_or(0, |w| w.total_count),
            pair_count,
        })
    }

    /// Record that an attribute directly precedes the word at `t`
    pub fn mark_before_person_attr(&mut self, t: TokenRef<'_>) {
        if let Some(info) = self.word_info_mut(t) {
            info.has_before_person_attr = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{Lexicon, Tokenizer};

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    #[test]
    fn test_word_counts() {
        let d = doc("Город растет. Большой Город и город.");
        let stats = Statistics::collect(&d);
        let info = stats.word_info(d.first().unwrap()).unwrap();
        assert_eq!(info.total_count, 3);
        assert_eq!(info.lower_count, 1);
    }

    #[test]
    fn test_bigram_counts_use_lemmas() {
        let d = doc("Иван Петров пришел. Ивана Петрова ждали. Петров ушел.");
        let stats = Statistics::collect(&d);
        let b = stats.bigram_info(d.at(0).unwrap(), d.at(1).unwrap()).unwrap();
        assert_eq!(b.pair_count, 2);
        assert_eq!(b.first_count, 2);
        assert_eq!(b.second_count, 2);
    }

    #[test]
    fn test_initial_info() {
        let d = doc("И. Иванов и И.Иванов");
        let stats = Statistics::collect(&d);
        let sur = d.at(2).unwrap();
        let info = stats.initial_info("ИВАН", sur).unwrap();
        assert_eq!(info.pair_count, 2);
        assert_eq!(stats.initial_info("П", sur).unwrap().pair_count, 0);
    }

    #[test]
    fn test_verbs_after() {
        let d = doc("Смирнова заявила, что Смирнова ушла");
        let stats = Statistics::collect(&d);
        let info = stats.word_info(d.first().unwrap()).unwrap();
        assert_eq!(info.female_verbs_after_count, 1);
    }

    #[test]
    fn test_mark_before_person_attr() {
        let d = doc("министр Лавров");
        let mut stats = Statistics::collect(&d);
        let t = d.at(1).unwrap();
        stats.mark_before_person_attr(t);
        assert!(stats.word_info(t).unwrap().has_before_person_attr);
    }
}
