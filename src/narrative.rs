//! Narrative Generator
//!
//! Serializes market facts into a deterministic structured prompt,
//! invokes the text-completion capability exactly once per user
//! message, and provides deterministic fallback text for when the
//! completion service is unavailable.

use crate::comparison::ComparisonResult;
use crate::error::AgentError;
use crate::gemini::TextCompletion;
use crate::models::{HistorySeries, Quote, SymbolFailure};
use crate::Result;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

const SYSTEM_PROMPT: &str = "You are a knowledgeable stock analyst providing clear, \
conversational updates about stock performance. Be concise, state prices plainly, \
and always end with a note that this is not financial advice.";

const DISCLAIMER: &str = "Please note this is not financial advice.";

/// Market facts backing one narrative. Borrowed from the pipeline;
/// nothing here outlives the request.
pub enum NarrativeInput<'a> {
    /// General finance question, no market facts.
    General,
    /// One symbol's snapshot and trailing window.
    Single {
        quote: &'a Quote,
        history: &'a HistorySeries,
    },
    /// Fan-out results for a comparison, successes and failures both.
    Comparison { result: &'a ComparisonResult },
}

pub struct NarrativeGenerator {
    completion: Arc<dyn TextCompletion>,
}

impl NarrativeGenerator {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    /// Generate narrative text. Exactly one completion call per user
    /// message, regardless of how many symbols are involved.
    pub async fn generate(&self, user_text: &str, input: &NarrativeInput<'_>) -> Result<String> {
        let prompt = build_prompt(user_text, input);

        match self.completion.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(error = %e, "Completion unavailable, caller should fall back");
                Err(AgentError::NarrativeUnavailable(e.to_string()))
            }
        }
    }
}

/// Serialize facts into the prompt in a fixed order: the user question,
/// then per-symbol facts in request order, then failures.
pub fn build_prompt(user_text: &str, input: &NarrativeInput<'_>) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "A user asked: \"{}\"", user_text);

    match input {
        NarrativeInput::General => {
            let _ = writeln!(
                prompt,
                "\nNo specific stock is involved. Answer the question from general \
                 financial knowledge."
            );
        }
        NarrativeInput::Single { quote, history } => {
            let _ = writeln!(prompt, "\nMarket data:");
            write_symbol_facts(&mut prompt, quote, history);
            let _ = writeln!(
                prompt,
                "\nState the current price clearly, explain the recent movement, \
                 keep it concise, and end with a disclaimer that this is not \
                 financial advice."
            );
        }
        NarrativeInput::Comparison { result } => {
            let _ = writeln!(prompt, "\nMarket data for the requested symbols:");
            for (symbol, quote, history) in result.successes() {
                let _ = writeln!(prompt, "\n## {}", symbol);
                write_symbol_facts(&mut prompt, quote, history);
            }
            write_failures(&mut prompt, &result.failures());
            let _ = writeln!(
                prompt,
                "\nCompare the symbols side by side, note which data could not be \
                 fetched, keep it concise, and end with a disclaimer that this is \
                 not financial advice."
            );
        }
    }

    prompt
}

fn write_symbol_facts(prompt: &mut String, quote: &Quote, history: &HistorySeries) {
    let name = quote
        .company_name
        .clone()
        .unwrap_or_else(|| quote.symbol.as_str().to_string());

    let _ = writeln!(prompt, "- Company: {} ({})", name, quote.symbol);
    let _ = writeln!(prompt, "- Current price: ${:.2}", quote.current_price);
    let _ = writeln!(
        prompt,
        "- Daily change: ${:.2} ({:.2}%)",
        quote.daily_change, quote.daily_change_percent
    );

    if let (Some(min), Some(max), Some(first), Some(last)) = (
        history.min_close(),
        history.max_close(),
        history.first_close(),
        history.last_close(),
    ) {
        let _ = writeln!(
            prompt,
            "- 30-day closes: from ${:.2} to ${:.2}, range ${:.2}-${:.2}",
            first, last, min, max
        );
    }

    let _ = writeln!(prompt, "- Movement: {}", describe_movement(quote, history));
}

fn write_failures(prompt: &mut String, failures: &[SymbolFailure]) {
    if failures.is_empty() {
        return;
    }

    let _ = writeln!(prompt, "\nData could not be fetched for:");
    for failure in failures {
        let _ = writeln!(prompt, "- {}: {}", failure.symbol, failure.reason);
    }
}

/// Deterministic trend sentence used both inside prompts and in
/// fallback narratives.
pub fn describe_movement(quote: &Quote, history: &HistorySeries) -> String {
    let (trend, direction) = if quote.daily_change > 0.0 {
        ("up", "gained")
    } else if quote.daily_change < 0.0 {
        ("down", "lost")
    } else {
        ("flat", "held")
    };

    let mut sentence = format!(
        "The stock is trading {} today, having {} ${:.2} ({:.2}%) since the previous close.",
        trend,
        direction,
        quote.daily_change.abs(),
        quote.daily_change_percent.abs()
    );

    if let (Some(min), Some(max)) = (history.min_close(), history.max_close()) {
        let range_pct = if quote.current_price > 0.0 {
            (max - min) / quote.current_price
        } else {
            0.0
        };
        let volatility = if range_pct > 0.05 { "volatile" } else { "stable" };

        let _ = write!(
            sentence,
            " Over the last 30 days it closed between ${:.2} and ${:.2}, indicating {} trading conditions.",
            min, max, volatility
        );
    }

    sentence
}

/// Fallback narrative when the completion service is down: the market
/// facts are still worth delivering.
pub fn fallback_narrative(input: &NarrativeInput<'_>) -> String {
    match input {
        NarrativeInput::General => {
            "I'm sorry, I can't generate an answer right now. Please try again shortly."
                .to_string()
        }
        NarrativeInput::Single { quote, history } => {
            let name = quote
                .company_name
                .clone()
                .unwrap_or_else(|| quote.symbol.as_str().to_string());
            format!(
                "{} ({}) is currently trading at ${:.2}. {} {}",
                name,
                quote.symbol,
                quote.current_price,
                describe_movement(quote, history),
                DISCLAIMER
            )
        }
        NarrativeInput::Comparison { result } => {
            let mut text = String::new();
            for (symbol, quote, history) in result.successes() {
                let _ = writeln!(
                    text,
                    "{} is trading at ${:.2}. {}",
                    symbol,
                    quote.current_price,
                    describe_movement(quote, history)
                );
            }
            for failure in result.failures() {
                let _ = writeln!(text, "Data for {} is unavailable: {}.", failure.symbol, failure.reason);
            }
            let _ = write!(text, "{}", DISCLAIMER);
            text
        }
    }
}

//
// ================= Test Support =================
//


#[cfg(test)]
mod tests {
    use super::testing::CountingCompletion;
    use super::*;
    use crate::market::testing::{make_history, make_quote};
    use crate::models::Symbol;

    #[test]
    fn prompt_is_deterministic() {
        let symbol = Symbol::new("AAPL");
        let quote = make_quote(&symbol, 190.0);
        let history = make_history(&symbol, 30);
        let input = NarrativeInput::Single {
            quote: &quote,
            history: &history,
        };

        let first = build_prompt("How is AAPL doing?", &input);
        let second = build_prompt("How is AAPL doing?", &input);

        assert_eq!(first, second);
        assert!(first.contains("Current price: $190.00"));
        assert!(first.contains("How is AAPL doing?"));
    }

    #[test]
    fn general_prompt_carries_no_market_facts() {
        let prompt = build_prompt("What is compound interest?", &NarrativeInput::General);

        assert!(prompt.contains("What is compound interest?"));
        assert!(!prompt.contains("Current price"));
    }

    #[test]
    fn movement_description_reports_direction_and_volatility() {
        let symbol = Symbol::new("AAPL");
        let mut quote = make_quote(&symbol, 190.0);
        quote.daily_change = -2.5;
        quote.daily_change_percent = -1.3;
        let history = make_history(&symbol, 30);

        let text = describe_movement(&quote, &history);

        assert!(text.contains("trading down"));
        assert!(text.contains("lost $2.50"));
        // make_history spans closes 100..129 against a $190 price, well
        // past the 5% band.
        assert!(text.contains("volatile"));
    }

    #[test]
    fn fallback_for_single_symbol_keeps_price_and_disclaimer() {
        let symbol = Symbol::new("AAPL");
        let quote = make_quote(&symbol, 190.0);
        let history = make_history(&symbol, 30);

        let text = fallback_narrative(&NarrativeInput::Single {
            quote: &quote,
            history: &history,
        });

        assert!(text.contains("$190.00"));
        assert!(text.contains("not financial advice"));
    }

    #[tokio::test]
    async fn generate_calls_completion_exactly_once() {
        let completion = Arc::new(CountingCompletion::succeeding());
        let generator = NarrativeGenerator::new(completion.clone());

        let text = generator
            .generate("What is a P/E ratio?", &NarrativeInput::General)
            .await
            .unwrap();

        assert!(!text.is_empty());
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn completion_failure_surfaces_as_narrative_unavailable() {
        let completion = Arc::new(CountingCompletion::failing());
        let generator = NarrativeGenerator::new(completion);

        let result = generator
            .generate("What is a P/E ratio?", &NarrativeInput::General)
            .await;

        assert!(matches!(result, Err(AgentError::NarrativeUnavailable(_))));
    }
}
