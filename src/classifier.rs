//! Query Classifier
//!
//! Classifies user messages as either:
//! - GeneralFinance: no ticker involved ("what is compound interest?")
//! - SingleTicker: one ticker, no comparison language ("how is AAPL doing?")
//! - Comparison: multiple tickers, or comparison language ("AAPL vs MSFT")
//!
//! The comparison-language rule set is deliberately conservative;
//! misclassification is recoverable, not fatal.

use crate::models::{ClassificationResult, Symbol};
use tracing::warn;

/// Tokens that signal a comparison when they appear as standalone words.
const COMPARISON_WORDS: &[&str] = &["vs", "vs.", "versus", "against"];

/// Substrings that signal a comparison anywhere in the message.
/// "compar" covers compare / comparison / compared / comparing.
const COMPARISON_PHRASES: &[&str] = &["compar", "which is better", "or better"];

pub struct QueryClassifier;

impl QueryClassifier {
    /// Classify a message given its resolved symbol candidates.
    ///
    /// State-free: rules depend only on the candidates and the raw text.
    pub fn classify(
        candidates: &[Symbol],
        text: &str,
        max_compare_symbols: usize,
    ) -> ClassificationResult {
        if candidates.is_empty() {
            return ClassificationResult::GeneralFinance;
        }

        let comparing = has_comparison_language(text);

        if candidates.len() == 1 && !comparing {
            return ClassificationResult::SingleTicker {
                symbol: candidates[0].clone(),
            };
        }

        // Two or more candidates, or comparison language with at least
        // one candidate. A one-element comparison is a valid degenerate
        // case downstream.
        let mut symbols: Vec<Symbol> = candidates.to_vec();
        if symbols.len() > max_compare_symbols {
            let dropped: Vec<String> = symbols
                .split_off(max_compare_symbols)
                .into_iter()
                .map(|s| s.as_str().to_string())
                .collect();
            warn!(
                dropped = ?dropped,
                kept = max_compare_symbols,
                "Comparison symbol list capped"
            );
        }

        ClassificationResult::Comparison { symbols }
    }
}

fn has_comparison_language(text: &str) -> bool {
    let lowered = text.to_lowercase();

    let word_hit = lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.'))
        .any(|w| COMPARISON_WORDS.contains(&w));

    word_hit || COMPARISON_PHRASES.iter().any(|p| lowered.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(Symbol::new).collect()
    }

    #[test]
    fn zero_candidates_is_general_finance() {
        let result = QueryClassifier::classify(&[], "What is compound interest?", 10);
        assert_eq!(result, ClassificationResult::GeneralFinance);
    }

    #[test]
    fn one_candidate_without_comparison_language_is_single_ticker() {
        let result = QueryClassifier::classify(&symbols(&["AAPL"]), "How is AAPL doing today?", 10);
        assert_eq!(
            result,
            ClassificationResult::SingleTicker {
                symbol: Symbol::new("AAPL")
            }
        );
    }

    #[test]
    fn multiple_candidates_preserve_first_mention_order() {
        let result =
            QueryClassifier::classify(&symbols(&["MSFT", "AAPL"]), "MSFT and AAPL this month", 10);
        assert_eq!(
            result,
            ClassificationResult::Comparison {
                symbols: symbols(&["MSFT", "AAPL"])
            }
        );
    }

    #[test]
    fn one_candidate_with_comparison_language_is_degenerate_comparison() {
        let result =
            QueryClassifier::classify(&symbols(&["AAPL"]), "compare AAPL with its sector", 10);
        assert_eq!(
            result,
            ClassificationResult::Comparison {
                symbols: symbols(&["AAPL"])
            }
        );
    }

    #[test]
    fn vs_is_matched_as_a_word_not_a_substring() {
        // "canvas" contains "vs" but is not comparison language.
        let result = QueryClassifier::classify(&symbols(&["ADBE"]), "is canvas part of ADBE?", 10);
        assert_eq!(
            result,
            ClassificationResult::SingleTicker {
                symbol: Symbol::new("ADBE")
            }
        );

        let result = QueryClassifier::classify(&symbols(&["AAPL", "MSFT"]), "AAPL vs. MSFT", 10);
        assert!(matches!(result, ClassificationResult::Comparison { .. }));
    }

    #[test]
    fn comparison_capped_at_configured_maximum() {
        let twelve = symbols(&[
            "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "NFLX", "ORCL", "CRM", "AMD",
            "INTC",
        ]);
        let result = QueryClassifier::classify(&twelve, "compare all of these", 10);

        match result {
            ClassificationResult::Comparison { symbols: kept } => {
                assert_eq!(kept.len(), 10);
                assert_eq!(kept, twelve[..10].to_vec());
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }
}
