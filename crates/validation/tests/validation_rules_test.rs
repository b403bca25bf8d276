use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use rolegate_validation::{check_rules, ValidationLimits};

#[test]
fn default_limits_accept_ordinary_queries() {
    let document = parser::parse_query(
        r#"
        query User($id: Uuid!) {
          user(id: $id) {
            id
            email
            profile { phone lang }
          }
        }
        "#,
    )
    .unwrap();
    let rule_errors = check_rules(&document, ValidationLimits::default());
    assert!(rule_errors.is_empty(), "{rule_errors:?}");
}

#[test]
fn every_violated_limit_is_reported() {
    let document = parser::parse_query("{ a { b { c { d } } } e f g }").unwrap();
    let rule_errors = check_rules(
        &document,
        ValidationLimits {
            max_complexity: Some(5),
            max_depth: Some(2),
        },
    );
    let messages = rule_errors.into_iter().map(|err| err.message).collect::<Vec<_>>();
    assert_eq!(
        messages,
        vec![
            "Max query complexity should be 5 but got 7.".to_string(),
            "Max query depth should be 2 but got 3.".to_string(),
        ]
    );
}

#[test]
fn limits_can_be_lifted() {
    let document = parser::parse_query("{ a { b { c { d { e { f } } } } } }").unwrap();
    let rule_errors = check_rules(
        &document,
        ValidationLimits {
            max_complexity: None,
            max_depth: None,
        },
    );
    assert!(rule_errors.is_empty());
}

/// `{ a { ...F0 } }` where every fragment spreads the next one twice.
fn doubling_fragments(levels: usize) -> String {
    let mut source = String::from("{ a { ...F0 } }\n");
    for level in 0..levels {
        source.push_str(&format!("fragment F{level} on A {{ ...F{next} ...F{next} }}\n", next = level + 1));
    }
    source.push_str(&format!("fragment F{levels} on A {{ b }}\n"));
    source
}

#[test]
fn repeated_fragment_spreads_are_costed_once() {
    let document = parser::parse_query(doubling_fragments(30)).unwrap();
    let started = Instant::now();
    let rule_errors = check_rules(&document, ValidationLimits::default());
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());

    let messages = rule_errors.into_iter().map(|err| err.message).collect::<Vec<_>>();
    assert_eq!(
        messages,
        vec![format!("Max query complexity should be 100 but got {}.", 1 + (1usize << 30))]
    );
}

#[test]
fn repeated_fragment_spreads_keep_their_depth() {
    let document = parser::parse_query(
        r#"
        { a { ...Deep ...Deep } }
        fragment Deep on A { b { c { d } } }
        "#,
    )
    .unwrap();
    let rule_errors = check_rules(
        &document,
        ValidationLimits {
            max_complexity: None,
            max_depth: Some(2),
        },
    );
    let messages = rule_errors.into_iter().map(|err| err.message).collect::<Vec<_>>();
    assert_eq!(messages, vec!["Max query depth should be 2 but got 3.".to_string()]);
}
