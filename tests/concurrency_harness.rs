#![allow(unused)]
//! Concurrent use of the shared normalizer.
//!
//! # What this covers
//!
//! - **Many callers**: hundreds of tokio tasks normalizing at once get the
//!   same records a single caller gets.
//! - **Cache resets under load**: `clear_cache` racing in-flight calls never
//!   breaks a call or changes its result.
//! - **Send + Sync**: a `Normalizer` clone can move into blocking tasks.
//!
//! # What this does NOT cover
//!
//! - Throughput (see `benches/normalization_bench.rs`)
//!
//! # Running
//!
//! ```sh
//! cargo test --test concurrency_harness
//! ```

mod common;
use airn::{
    clear_cache, normalize, AnalysisResult, Normalizer, OutcomeTag, ParseMode, ParseOutcome,
    SafetyCheckResult, SynonymTable,
};
use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn expected(raw: &str) -> ParseOutcome<AnalysisResult> {
    fresh_normalizer().normalize(raw, ParseMode::Intelligent)
}

fn corpus() -> Vec<&'static str> {
    CORPUS_CANONICAL
        .iter()
        .chain(CORPUS_WRAPPED)
        .chain(CORPUS_LOCALIZED)
        .chain(CORPUS_MALFORMED)
        .chain(CORPUS_PROSE)
        .chain(CORPUS_UNRECOVERABLE)
        .copied()
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_tasks_agree_with_a_single_caller() {
    let corpus = corpus();
    let mut handles = Vec::new();
    for round in 0..20 {
        for raw in corpus.iter().copied() {
            handles.push(tokio::spawn(async move {
                let out: ParseOutcome<AnalysisResult> = normalize(raw, ParseMode::Intelligent);
                (raw, out)
            }));
        }
    }
    for handle in handles {
        let (raw, out) = handle.await.unwrap();
        assert_eq!(out, expected(raw), "input: {raw:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clear_cache_races_in_flight_calls() {
    let resetter = tokio::spawn(async {
        for _ in 0..200 {
            clear_cache();
            tokio::task::yield_now().await;
        }
    });

    let mut handles = Vec::new();
    for i in 0..400 {
        handles.push(tokio::spawn(async move {
            let raw = if i % 2 == 0 { r#"{"是否安全": "否"}"# } else { "{isSafe: True}" };
            let out: ParseOutcome<SafetyCheckResult> = normalize(raw, ParseMode::Fallback);
            (i, out)
        }));
    }

    resetter.await.unwrap();
    for handle in handles {
        let (i, out) = handle.await.unwrap();
        assert_eq!(out.value().is_safe, i % 2 == 1);
        assert_ne!(out.tag(), OutcomeTag::DefaultUsed);
    }
}

#[tokio::test]
async fn normalizer_moves_into_blocking_tasks() {
    let normalizer = fresh_normalizer();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let normalizer = normalizer.clone();
            tokio::task::spawn_blocking(move || {
                let raw = format!(r#"{{"replySuggestion": "reply {i}"}}"#);
                let out: ParseOutcome<AnalysisResult> = normalizer.normalize(&raw, ParseMode::Standard);
                out.into_value().reply_suggestion
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), format!("reply {i}"));
    }
}

#[test]
fn shared_table_is_rebuilt_after_clear() {
    let before = SynonymTable::shared();
    clear_cache();
    let after = SynonymTable::shared();
    assert_eq!(before.entries(), after.entries());
    assert!(Arc::strong_count(&before) >= 1);
}
