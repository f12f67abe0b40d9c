//! Domain-specific assertion macros for airn harnesses.
//!
//! These wrap `pretty_assertions` and add failure messages that say which
//! record invariant was violated and for which input.

// ---------------------------------------------------------------------------
// Outcome assertions
// ---------------------------------------------------------------------------

/// Assert the tag of a `ParseOutcome`, printing warnings and reason on failure.
///
/// ```rust
/// assert_outcome!(out, OutcomeTag::Recovered);
/// ```
#[macro_export]
macro_rules! assert_outcome {
    ($outcome:expr, $tag:expr) => {{
        let outcome = &$outcome;
        let expected: airn::OutcomeTag = $tag;
        if outcome.tag() != expected {
            panic!(
                "assert_outcome! failed:\n  expected: {}\n  actual:   {}\n  warnings: {:?}\n  reason:   {:?}",
                expected,
                outcome.tag(),
                outcome.warnings(),
                outcome.reason()
            );
        }
    }};
}

/// Assert that an outcome did not fall through to the canned default.
#[macro_export]
macro_rules! assert_recovered_or_better {
    ($outcome:expr, $input:expr) => {{
        let outcome = &$outcome;
        if outcome.is_default() {
            panic!(
                "assert_recovered_or_better! failed: default record used\n  input:  {:?}\n  reason: {:?}",
                $input,
                outcome.reason()
            );
        }
    }};
}

// ---------------------------------------------------------------------------
// Record invariants
// ---------------------------------------------------------------------------

/// Assert that a list field has no blank entries and no duplicates.
#[macro_export]
macro_rules! assert_list_hygiene {
    ($list:expr) => {{
        let list: &[String] = &$list;
        for (i, item) in list.iter().enumerate() {
            if item.trim().is_empty() || item.trim() != item {
                panic!("assert_list_hygiene! failed: entry {i} is blank or untrimmed: {item:?}\n  list: {list:?}");
            }
            if list[..i].contains(item) {
                panic!("assert_list_hygiene! failed: duplicate entry {item:?}\n  list: {list:?}");
            }
        }
    }};
}

/// Assert that a required text field is populated.
#[macro_export]
macro_rules! assert_non_blank {
    ($text:expr) => {{
        let text: &str = &$text;
        if text.trim().is_empty() {
            panic!("assert_non_blank! failed: {} is blank", stringify!($text));
        }
    }};
}

/// Assert every structural invariant of an analysis record.
#[macro_export]
macro_rules! assert_analysis_valid {
    ($record:expr) => {{
        let record: &airn::AnalysisResult = &$record;
        $crate::assert_non_blank!(record.reply_suggestion);
        $crate::assert_non_blank!(record.strategy_analysis);
    }};
}
