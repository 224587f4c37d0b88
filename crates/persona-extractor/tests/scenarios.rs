//! Recognition scenarios
//!
//! End-to-end checks of the name pipeline: segmentation, template scoring,
//! attribute chains and whole-document extraction.

use persona_core::{
    AnalysisConfig, Document, ExternalReferent, Lexicon, MorphGender, MorphInfo, ReferentSpan,
    Tokenizer,
};
use persona_extractor::analyzer::MentionKind;
use persona_extractor::attribute::{self, AttachAttrs};
use persona_extractor::context::AnalysisContext;
use persona_extractor::metrics::{AggregateMetrics, Evaluator, GoldEntity};
use persona_extractor::morph_collection::MorphVariantCollection;
use persona_extractor::property::{PersonProperty, MAX_HIGHER_DEPTH};
use persona_extractor::resolver;
use persona_extractor::segmenter::{self, NameItem, ParseAttrs};
use persona_extractor::templates::{FioTemplate, NameCandidate};
use persona_extractor::{EntityExtractor, PersonExtractor, Terminology};
use proptest::prelude::*;

fn doc(text: &str) -> Document {
    Tokenizer::new(Lexicon::shared().unwrap()).document(text)
}

fn extractor() -> PersonExtractor {
    PersonExtractor::new().unwrap()
}

/// Segment the whole text and score every reading from the first item
fn with_readings<R>(
    text: &str,
    allow_king: bool,
    f: impl FnOnce(&[NameItem<'_>], Vec<NameCandidate<'_>>) -> R,
) -> R {
    let d = doc(text);
    let terms = Terminology::shared().unwrap();
    let config = AnalysisConfig::default();
    let ctx = AnalysisContext::new(&d, &terms, &config);
    let items = segmenter::attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).unwrap();
    let res = resolver::try_attach(&ctx, &items, 0, &MorphInfo::new(), None, allow_king, false);
    f(&items, res)
}

fn first_value(col: &Option<MorphVariantCollection>) -> Option<&str> {
    col.as_ref().and_then(|c| c.values().first().copied())
}

// =============================================================================
// Segmentation and templates
// =============================================================================

#[test]
fn test_initial_and_dictionary_surname() {
    with_readings("И. Иванов", false, |items, res| {
        assert_eq!(items.len(), 2);
        let c = res
            .iter()
            .find(|c| c.template == FioTemplate::ISurname || c.template == FioTemplate::IISurname)
            .unwrap();
        assert!(c.coef > 0.0);
        assert_eq!(first_value(&c.lastname), Some("ИВАНОВ"));
    });
}

#[test]
fn test_segmentation_of_frozen_span_is_stable() {
    let d = doc("министр Петров Пётр Петрович");
    let terms = Terminology::shared().unwrap();
    let config = AnalysisConfig::default();
    let ctx = AnalysisContext::new(&d, &terms, &config);
    let t = d.at(1).unwrap();
    let segment = || {
        segmenter::attach_list(&ctx, t, ParseAttrs::NO, 10)
            .unwrap()
            .into_iter()
            .map(|i| (i.kind, i.value, i.begin.idx(), i.end.idx()))
            .collect::<Vec<_>>()
    };
    let first = segment();
    assert_eq!(first, segment());
    assert_eq!(first.len(), 3);
}

#[test]
fn test_surname_with_two_initials() {
    with_readings("Иванов И. П.", false, |_, res| {
        let top = &res[0];
        assert_eq!(top.template, FioTemplate::SurnameII);
        assert_eq!(first_value(&top.lastname), Some("ИВАНОВ"));
        assert_eq!(first_value(&top.firstname), Some("И"));
        assert_eq!(first_value(&top.middlename), Some("П"));
        assert!(top.coef >= 2.0);
    });
}

#[test]
fn test_king_with_regnal_number() {
    with_readings("Петр Первый", true, |_, res| {
        let top = &res[0];
        assert_eq!(top.template, FioTemplate::King);
        assert_eq!(top.lastname.as_ref().map(|l| l.number), Some(1));
        assert_eq!(top.coef, 3.0);
    });
}

#[test]
fn test_comma_between_surname_and_name() {
    with_readings("Смит , Джон", false, |items, res| {
        assert!(items[1].is_comma_before);
        let c = res.iter().find(|c| c.template == FioTemplate::SurnameName).unwrap();
        assert_eq!(first_value(&c.firstname), Some("ДЖОН"));
    });
}

#[test]
fn test_arabic_chain_with_glued_particles() {
    with_readings("Абу Бакр ибн Мухаммед аль Хасан", false, |items, res| {
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|p| p.has_sur_prefix));
        let c = res.iter().find(|c| c.template == FioTemplate::Arabic).unwrap();
        assert!(c.coef >= 2.0);
        assert_eq!(c.end.idx(), items[2].end.idx());
        let last = first_value(&c.lastname).unwrap();
        assert!(last.contains("БАКР"));
        assert!(last.ends_with("АЛЬ-ХАСАН"));
    });
}

#[test]
fn test_kin_postfix_makes_patronymic() {
    with_readings("Мамедов Ахмед оглы", false, |items, res| {
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].kin_gender, MorphGender::MASCULINE);
        let c = res.iter().find(|c| c.template == FioTemplate::SurnameName).unwrap();
        assert!(c.coef >= 2.0);
        assert!(c.firstname.is_none());
        assert!(first_value(&c.middlename).is_some_and(|m| m.ends_with("-ОГЛЫ")));
        assert_eq!(c.morph.gender, MorphGender::MASCULINE);
    });
}

#[test]
fn test_common_noun_is_not_a_name() {
    let d = doc("город");
    let terms = Terminology::shared().unwrap();
    let config = AnalysisConfig::default();
    let ctx = AnalysisContext::new(&d, &terms, &config);
    assert!(segmenter::attach_list(&ctx, d.first().unwrap(), ParseAttrs::NO, 10).is_none());
}

// =============================================================================
// Attributes
// =============================================================================

#[test]
fn test_deputy_chain() {
    let d = doc("заместитель министра");
    let terms = Terminology::shared().unwrap();
    let config = AnalysisConfig::default();
    let ctx = AnalysisContext::new(&d, &terms, &config);
    let a = attribute::try_attach(&ctx, d.first().unwrap(), AttachAttrs::NO).unwrap();
    assert_eq!(a.name(), Some("заместитель"));
    let higher = a.higher.as_deref().unwrap();
    assert_eq!(higher.name(), Some("министр"));

    let mut cur = Some(&a);
    let mut end = a.end.idx();
    while let Some(x) = cur {
        assert!(x.end.idx() <= end);
        end = x.end.idx();
        cur = x.higher.as_deref();
    }
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn test_president_of_russia() {
    let res = extractor().analyze("Президент России Владимир Путин провел совещание.");
    let p = res.find_person("Путин").unwrap();
    assert!(p.firstnames.contains(&"ВЛАДИМИР".to_string()));
    assert!(p.is_male);
    assert!(p.attributes.iter().any(|a| a.name.starts_with("президент")));
}

#[test]
fn test_citizen_with_passport() {
    let res = extractor().analyze("гражданин Иванов Иван Иванович, паспорт 45 02 123456");
    let p = res.find_person("Иванов").unwrap();
    assert!(p.middlenames.contains(&"ИВАНОВИЧ".to_string()));
    assert_eq!(p.id_docs.len(), 1);
    assert_eq!(res.mentions_of(MentionKind::Identity).count(), 1);
}

#[test]
fn test_later_surname_resolves_to_known_person() {
    let text = "Министр Сергей Лавров прибыл с визитом.\nЛавров провел переговоры.";
    let res = extractor().analyze(text);
    assert_eq!(res.persons.len(), 1);
    let idx: Vec<usize> = res.mentions_of(MentionKind::Person).map(|m| m.index).collect();
    assert_eq!(idx, vec![0, 0]);
}

#[test]
fn test_age_and_birth_attached() {
    let res = extractor().analyze("Иванов Иван Петрович, 35 лет, проживает в Москве.");
    assert_eq!(res.find_person("Иванов").and_then(|p| p.age), Some(35));

    let res = extractor().analyze("Петров Пётр Петрович (1950 - 2010) был инженером.");
    let p = res.find_person("Петров").unwrap();
    assert_eq!(p.born.as_ref().and_then(|b| b.year), Some(1950));
    assert_eq!(p.die.as_ref().and_then(|d| d.year), Some(2010));
}

#[test]
fn test_standalone_position_is_property() {
    let text = "Президент России отказался от встречи.";
    let begin = text.find("России").unwrap();
    let spans = [ReferentSpan::new(
        begin,
        begin + "России".len(),
        ExternalReferent::geo("РОССИЯ", "государство"),
    )];
    let res = extractor().analyze_with_referents(text, &spans);
    assert!(res.persons.is_empty());
    let m = res.mentions_of(MentionKind::Property).next().unwrap();
    assert!(m.text.starts_with("Президент"));
    assert!(res.properties[m.index].name.starts_with("президент"));
}

#[test]
fn test_feminine_name_agrees() {
    let res = extractor().analyze("Вчера Анна Петрова выступила на конференции.");
    let p = res.find_person("Петрова").unwrap();
    assert!(p.is_female);
    assert_eq!(p.gender(), MorphGender::FEMININE);
}

#[test]
fn test_turkic_arabic_and_chinese_persons() {
    let res = extractor().analyze("Вчера Мамедов Ахмед оглы прибыл в Баку.");
    let p = res.find_person("Мамедов").unwrap();
    assert!(p.is_male);
    assert!(p.middlenames.iter().any(|m| m.ends_with("-ОГЛЫ")));

    let res = extractor().analyze("С речью выступил Абдулла ибн Хасан.");
    assert!(res.persons.iter().any(|p| p.lastnames.iter().any(|l| l.contains("ХАСАН"))));

    let res = extractor().analyze("Вчера Чжан Вэй прилетел в Москву.");
    assert!(res.persons.iter().any(|p| p.lastnames.iter().any(|l| l.starts_with("ЧЖАН"))));
}

#[test]
fn test_sex_in_brackets_after_name() {
    let res = extractor().analyze("Вчера Иван Петров (пол мужской) пришёл.");
    let p = res.find_person("Петров").unwrap();
    assert!(p.is_male);
    let m = res.mentions.iter().find(|m| m.kind == MentionKind::Person).unwrap();
    assert_eq!(m.text, "Иван Петров (пол мужской)");
}

#[test]
fn test_metrics_report() {
    let text = "Президент России Владимир Путин провел совещание.";
    let predicted = extractor().extract(text).unwrap();
    let start = text.find("Президент").unwrap();
    let end = text.find(" провел").unwrap();
    let gold = vec![GoldEntity {
        text: text[start..end].to_string(),
        entity_type: "PERSON".to_string(),
        start,
        end,
    }];
    let evaluator = Evaluator::new();
    let metrics = evaluator.evaluate_entities(&predicted, &gold);
    assert_eq!(metrics.gold_total, 1);
    assert_eq!(metrics.true_positives, 1);

    let mut agg = AggregateMetrics::new(evaluator.mode());
    agg.add_document(&evaluator, &predicted, &gold);
    assert_eq!(agg.num_documents, 1);
    assert_eq!(agg.by_type["PERSON"].true_positives, 1);
    assert!(agg.report().contains("PERSON"));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_correct_leaves_unique_sorted_variants(
        values in proptest::collection::vec("[А-Я]{1,6}(-[А-Я]{1,4})?", 1..12)
    ) {
        let mut col = MorphVariantCollection::new();
        for (i, v) in values.iter().enumerate() {
            let g = if i % 2 == 0 { MorphGender::MASCULINE } else { MorphGender::FEMININE };
            col.add(v, None, g, None);
            col.add(v, None, g, None);
        }
        col.correct();
        let items = col.items();
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                prop_assert!(a.value != b.value || a.gender != b.gender);
            }
        }
        for w in items.windows(2) {
            let ha = w[0].value.contains('-');
            let hb = w[1].value.contains('-');
            prop_assert!(ha <= hb);
            if ha == hb {
                prop_assert!(w[0].value.chars().count() <= w[1].value.chars().count());
            }
        }
    }

    #[test]
    fn prop_attribute_chain_spans_nest(
        head in prop::sample::select(vec!["заместитель", "помощник", "советник"]),
        middle in proptest::collection::vec(
            prop::sample::select(vec!["заместителя", "помощника", "советника"]),
            0..4,
        ),
        top in prop::sample::select(
            vec!["министра", "директора", "губернатора", "мэра", "президента"],
        ),
    ) {
        let mut words = vec![head];
        words.extend(middle);
        words.push(top);
        let text = words.join(" ");
        let d = doc(&text);
        let terms = Terminology::shared().unwrap();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&d, &terms, &config);
        let a = attribute::try_attach(&ctx, d.first().unwrap(), AttachAttrs::NO);
        prop_assert!(a.is_some(), "{}", text);
        let a = a.unwrap();

        let mut cur = Some(&a);
        let mut end = a.end.idx();
        let mut begin = a.begin.idx();
        let mut depth = 0;
        while let Some(x) = cur {
            prop_assert!(x.end.idx() <= end, "{}", text);
            prop_assert!(x.begin.idx() >= begin, "{}", text);
            end = x.end.idx();
            begin = x.begin.idx();
            depth += 1;
            prop_assert!(depth <= MAX_HIGHER_DEPTH + 1);
            cur = x.higher.as_deref();
        }
        prop_assert!(depth <= words.len());
    }

    #[test]
    fn prop_higher_chain_terminates(names in proptest::collection::vec("[а-я]{3,8}", 1..40)) {
        let mut prop = PersonProperty::new("директор");
        for n in &names {
            let mut outer = PersonProperty::new(n.clone());
            outer.set_higher(prop.clone());
            prop = outer;
        }
        prop_assert!(prop.depth() <= MAX_HIGHER_DEPTH);
        prop_assert_eq!(prop.chain().count(), prop.depth() + 1);
    }
}
