use proptest::prelude::*;
use serde_json::Value;

use baymax_core::corpus::flatten_topic;
use baymax_core::prompt::assemble;
use baymax_core::sources::{merge_sources, normalize_sources};
use baymax_core::types::Attribution;

fn source_name() -> impl Strategy<Value = String> {
    "[ ,A-Za-z]{0,12}"
}

fn sources_value() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(Value::Null)),
        source_name().prop_map(|s| Some(Value::String(s))),
        prop::collection::vec(source_name(), 0..5)
            .prop_map(|v| Some(Value::Array(v.into_iter().map(Value::String).collect()))),
    ]
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in sources_value()) {
        let once = normalize_sources(raw.as_ref());
        let twice = normalize_sources(Some(&Value::String(once.clone())));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merged_sources_ignore_order_and_duplicates(names in prop::collection::vec("[A-Z][a-z]{0,6}", 1..6)) {
        let forward: Vec<Attribution> = names.iter().map(|n| Attribution { sources: n.clone(), ..Attribution::default() }).collect();
        let mut backward = forward.clone();
        backward.reverse();
        backward.extend(forward.iter().cloned());

        let a = assemble("q", std::iter::empty(), forward.iter());
        let b = assemble("q", std::iter::empty(), backward.iter());

        prop_assert_eq!(&a.sources, &b.sources);
        let mut sorted = a.sources.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(a.sources, sorted);
    }

    #[test]
    fn structured_passages_are_never_empty(
        name in "[A-Za-z ]{1,10}",
        sections in prop::collection::btree_map("[a-z]{1,8}", prop::collection::vec("[a-z ]{0,10}", 0..4), 0..4),
    ) {
        let data: serde_json::Map<String, Value> = sections
            .iter()
            .map(|(k, v)| (k.clone(), Value::Array(v.iter().cloned().map(Value::String).collect())))
            .collect();
        let topic = serde_json::json!({"topic_name": name, "data": data});

        let passages = flatten_topic(&topic).expect("object topic");

        prop_assert_eq!(passages.len(), sections.len());
        for (p, section) in passages.iter().zip(sections.keys()) {
            let header = format!("[{} / {}]", name, section);
            prop_assert!(!p.text.is_empty());
            prop_assert_eq!(p.text.lines().next(), Some(header.as_str()));
        }
    }

    #[test]
    fn merge_of_normalized_matches_split_names(raw in sources_value()) {
        let stored = normalize_sources(raw.as_ref());
        let merged = merge_sources([stored.as_str()]);
        for name in &merged {
            prop_assert!(!name.is_empty());
            prop_assert_eq!(name.trim(), name.as_str());
        }
    }
}
