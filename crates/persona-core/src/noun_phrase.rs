//! Simplified noun phrases
//!
//! Optional preposition, agreeing adjectives and a head noun
//! (`главного бухгалтера`, `по финансовым вопросам`). Enough for attribute
//! tails and genitive continuations; no participles or nested groups.

use crate::document::TokenRef;
use crate::lexicon::Morphology;
use crate::morph::{MorphCase, MorphClass, MorphGender, MorphInfo, MorphNumber, WordForm};
use crate::text::text_value;

#[derive(Debug, Clone, Copy)]
pub struct NounPhraseParams {
    /// Accept a phrase of adjectives only (`главный`)
    pub adjective_can_be_last: bool,
    pub parse_preposition: bool,
    pub max_adjectives: usize,
}

impl Default for NounPhraseParams {
    fn default() -> Self {
        Self {
            adjective_can_be_last: false,
            parse_preposition: false,
            max_adjectives: 3,
        }
    }
}

impl NounPhraseParams {
    pub fn with_preposition(mut self) -> Self {
        self.parse_preposition = true;
        self
    }

    pub fn adjective_can_be_last(mut self) -> Self {
        self.adjective_can_be_last = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NounPhrase<'a> {
    pub begin: TokenRef<'a>,
    pub end: TokenRef<'a>,
    pub preposition: Option<TokenRef<'a>>,
    pub adjectives: Vec<TokenRef<'a>>,
    pub noun: TokenRef<'a>,
    /// Features the adjectives and the noun agree on
    pub morph: MorphInfo,
}

fn adjective_forms<'a>(t: TokenRef<'a>) -> impl Iterator<Item = &'a WordForm> {
    t.morph().iter().filter(|f| f.class.is_adjective() && !f.short_form)
}

fn noun_forms<'a>(t: TokenRef<'a>) -> impl Iterator<Item = &'a WordForm> {
    t.morph().iter().filter(|f| f.class.is_noun())
}

fn can_be_adjective(t: TokenRef<'_>) -> bool {
    t.is_word() && t.chars().is_letter && adjective_forms(t).next().is_some()
}

fn can_be_noun(t: TokenRef<'_>) -> bool {
    t.is_word() && t.chars().is_letter && noun_forms(t).next().is_some()
}

fn agrees(adj: &WordForm, noun: &WordForm) -> bool {
    if !adj.case.intersects(noun.case) {
        return false;
    }
    if !adj.number.is_undefined()
        && !noun.number.is_undefined()
        && !adj.number.intersects(noun.number)
    {
        return false;
    }
    if noun.number == MorphNumber::PLURAL || adj.number == MorphNumber::PLURAL {
        return true;
    }
    adj.gender.is_undefined() || noun.gender.is_undefined() || adj.gender.intersects(noun.gender)
}

/// Agreement of `adjectives` with `noun`, as a morph summary
fn agreement(adjectives: &[TokenRef<'_>], noun: TokenRef<'_>, noun_class: MorphClass) -> MorphInfo {
    let mut res = MorphInfo::new();
    for nf in noun.morph().iter().filter(|f| f.class.intersects(noun_class)) {
        let mut case = nf.case;
        for adj in adjectives {
            let adj_case = adjective_forms(*adj)
                .filter(|af| agrees(af, nf))
                .fold(MorphCase::UNDEFINED, |acc, af| acc | af.case);
            case &= adj_case;
        }
        if case.is_undefined() {
            continue;
        }
        res.case |= case;
        res.gender |= nf.gender;
        res.number |= nf.number;
        res.class |= nf.class;
    }
    res.lang = noun.lang();
    res
}

/// Noun phrase starting at `t`
pub fn try_parse<'a>(t: TokenRef<'a>, params: NounPhraseParams) -> Option<NounPhrase<'a>> {
    let mut cur = t;
    let mut preposition = None;
    if params.parse_preposition && cur.morph_class_in_dictionary().is_preposition() {
        preposition = Some(cur);
        cur = cur.next()?;
        if cur.is_newline_before() {
            return None;
        }
    }

    let mut items: Vec<TokenRef<'a>> = Vec::new();
    let mut next = Some(cur);
    while let Some(tt) = next {
        if items.len() > params.max_adjectives {
            break;
        }
        if !items.is_empty() && (tt.is_newline_before() || !tt.is_whitespace_before()) {
            break;
        }
        if !can_be_adjective(tt) && !can_be_noun(tt) {
            break;
        }
        items.push(tt);
        if !can_be_adjective(tt) {
            break;
        }
        next = tt.next();
    }

    // Longest agreeing prefix wins
    for i in (0..items.len()).rev() {
        let noun = items[i];
        if !can_be_noun(noun) {
            continue;
        }
        let adjectives = &items[..i];
        if !adjectives.iter().all(|a| can_be_adjective(*a)) {
            continue;
        }
        let morph = agreement(adjectives, noun, MorphClass::NOUN);
        if morph.case.is_undefined() {
            continue;
        }
        return Some(NounPhrase {
            begin: preposition.unwrap_or(items[0]),
            end: noun,
            preposition,
            adjectives: adjectives.to_vec(),
            noun,
            morph,
        });
    }

    if params.adjective_can_be_last {
        let last = *items.last()?;
        if items.iter().all(|a| can_be_adjective(*a)) {
            let adjectives = &items[..items.len() - 1];
            let morph = agreement(adjectives, last, MorphClass::ADJECTIVE);
            if !morph.case.is_undefined() {
                return Some(NounPhrase {
                    begin: preposition.unwrap_or(items[0]),
                    end: last,
                    preposition,
                    adjectives: adjectives.to_vec(),
                    noun: last,
                    morph,
                });
            }
        }
    }
    None
}

impl<'a> NounPhrase<'a> {
    /// First token after the preposition
    pub fn begin_without_preposition(&self) -> TokenRef<'a> {
        self.adjectives.first().copied().unwrap_or(self.noun)
    }

    /// Upper-case surface text without the preposition
    pub fn text(&self) -> String {
        text_value(self.begin_without_preposition(), self.end)
    }

    /// Surface text including the preposition
    pub fn full_text(&self) -> String {
        text_value(self.begin, self.end)
    }

    fn noun_form(&self) -> Option<&'a WordForm> {
        self.noun
            .morph()
            .iter()
            .find(|f| f.class.intersects(self.morph.class) && f.case.intersects(self.morph.case))
    }

    fn gender(&self) -> MorphGender {
        match self.noun_form() {
            Some(f) if !f.gender.is_undefined() => f.gender,
            _ => self.morph.gender,
        }
    }

    /// Nominative singular text (ГЛАВНЫЙ БУХГАЛТЕР)
    pub fn normal_text(&self, morphology: &dyn Morphology) -> String {
        let gender = self.gender();
        let single_gender = if gender.is_masculine() {
            MorphGender::MASCULINE
        } else if gender.is_feminine() {
            MorphGender::FEMININE
        } else {
            gender
        };
        let mut words = Vec::with_capacity(self.adjectives.len() + 1);
        for adj in &self.adjectives {
            let lemma = adjective_forms(*adj)
                .next()
                .map(|f| f.normal_case.as_str())
                .unwrap_or_else(|| adj.term());
            let word = morphology
                .inflect(
                    lemma,
                    MorphClass::ADJECTIVE,
                    single_gender,
                    MorphCase::NOMINATIVE,
                    MorphNumber::SINGULAR,
                )
                .unwrap_or_else(|| lemma.to_string());
            words.push(word);
        }
        let noun = self
            .noun_form()
            .map(|f| f.normal_case.clone())
            .unwrap_or_else(|| self.noun.term().to_string());
        words.push(noun);
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;
    use crate::tokenizer::Tokenizer;
    use crate::Document;

    fn doc(text: &str) -> Document {
        Tokenizer::new(Lexicon::shared().unwrap()).document(text)
    }

    #[test]
    fn test_adjective_noun_genitive() {
        let d = doc("главного бухгалтера");
        let np = try_parse(d.first().unwrap(), NounPhraseParams::default()).unwrap();
        assert_eq!(np.adjectives.len(), 1);
        assert_eq!(np.noun.term(), "БУХГАЛТЕРА");
        assert!(np.morph.case.is_genitive());
        assert_eq!(np.normal_text(d.morphology()), "ГЛАВНЫЙ БУХГАЛТЕР");
        assert_eq!(np.text(), "ГЛАВНОГО БУХГАЛТЕРА");
    }

    #[test]
    fn test_disagreeing_adjective_is_not_attached() {
        let d = doc("главная бухгалтера");
        let np = try_parse(d.first().unwrap(), NounPhraseParams::default());
        assert!(np.map_or(true, |np| np.adjectives.is_empty()));
    }

    #[test]
    fn test_preposition() {
        let d = doc("по финансовым вопросам");
        assert!(try_parse(d.first().unwrap(), NounPhraseParams::default()).is_none());
        let params = NounPhraseParams::default().with_preposition();
        let np = try_parse(d.first().unwrap(), params).unwrap();
        assert_eq!(np.preposition.map(|p| p.term()), Some("ПО"));
        assert_eq!(np.end.term(), "ВОПРОСАМ");
    }

    #[test]
    fn test_adjective_only() {
        let d = doc("главный");
        assert!(try_parse(d.first().unwrap(), NounPhraseParams::default()).is_none());
        let params = NounPhraseParams::default().adjective_can_be_last();
        let np = try_parse(d.first().unwrap(), params).unwrap();
        assert_eq!(np.normal_text(d.morphology()), "ГЛАВНЫЙ");
    }
}
