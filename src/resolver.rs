//! Ticker Resolver
//!
//! Extracts candidate stock symbols from free text using lexical
//! heuristics plus a small company-name alias table. Candidates are not
//! verified against the provider here; invalid tickers surface later as
//! per-symbol not-found failures.

use crate::models::Symbol;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// All-caps English words that look like tickers but almost never are.
const STOP_WORDS: &[&str] = &[
    "A", "I", "OK", "AM", "PM", "TV", "US", "USA", "USD", "EUR", "GBP", "CEO",
    "CFO", "CTO", "ETF", "IPO", "GDP", "SEC", "FED", "AI", "FAQ", "ASAP",
    "LLC", "INC", "NYSE", "VS", "AND", "OR", "THE", "PE", "EPS", "YTD",
];

lazy_static! {
    /// Common company-name → ticker aliases, matched per lowercased token.
    static ref COMPANY_ALIASES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("apple", "AAPL");
        map.insert("microsoft", "MSFT");
        map.insert("google", "GOOGL");
        map.insert("alphabet", "GOOGL");
        map.insert("amazon", "AMZN");
        map.insert("tesla", "TSLA");
        map.insert("nvidia", "NVDA");
        map.insert("meta", "META");
        map.insert("facebook", "META");
        map.insert("netflix", "NFLX");
        map.insert("berkshire", "BRK.B");
        map.insert("jpmorgan", "JPM");
        map.insert("disney", "DIS");
        map.insert("intel", "INTC");
        map.insert("boeing", "BA");
        map.insert("walmart", "WMT");
        map.insert("visa", "V");
        map.insert("mastercard", "MA");
        map.insert("exxon", "XOM");
        map.insert("oracle", "ORCL");
        map.insert("salesforce", "CRM");
        map.insert("ibm", "IBM");
        map.insert("ford", "F");
        map.insert("nike", "NKE");
        map.insert("starbucks", "SBUX");
        map.insert("mcdonalds", "MCD");
        map.insert("paypal", "PYPL");
        map.insert("uber", "UBER");
        map.insert("airbnb", "ABNB");
        map
    };
}

/// Resolve candidate symbols from raw message text.
///
/// Returns a deduplicated list preserving first-mention order. Never
/// fails; text with no plausible symbols yields an empty list.
pub fn resolve_candidates(text: &str) -> Vec<Symbol> {
    let mut seen: HashSet<Symbol> = HashSet::new();
    let mut candidates: Vec<Symbol> = Vec::new();

    for raw_token in text.split_whitespace() {
        let token = raw_token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '$');

        if token.is_empty() {
            continue;
        }

        let candidate = if let Some(stripped) = token.strip_prefix('$') {
            // $-prefixed tokens are explicit ticker mentions.
            let stripped = stripped.trim_matches(|c: char| !c.is_ascii_alphanumeric());
            if is_ticker_shaped(&stripped.to_uppercase()) {
                Some(Symbol::new(stripped))
            } else {
                None
            }
        } else if is_ticker_shaped(token) && !STOP_WORDS.contains(&token) {
            Some(Symbol::new(token))
        } else {
            COMPANY_ALIASES
                .get(token.to_lowercase().as_str())
                .map(Symbol::new)
        };

        if let Some(symbol) = candidate {
            if seen.insert(symbol.clone()) {
                candidates.push(symbol);
            }
        }
    }

    candidates
}

/// 1-5 uppercase alphanumeric characters with at least one letter,
/// optionally a dot-separated class suffix (BRK.B).
fn is_ticker_shaped(token: &str) -> bool {
    let (body, class) = match token.split_once('.') {
        Some((body, class)) => (body, Some(class)),
        None => (token, None),
    };

    if body.is_empty() || body.len() > 5 {
        return false;
    }
    if !body.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return false;
    }
    if !body.chars().any(|c| c.is_ascii_uppercase()) {
        return false;
    }

    match class {
        None => true,
        Some(class) => class.len() == 1 && class.chars().all(|c| c.is_ascii_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(text: &str) -> Vec<String> {
        resolve_candidates(text)
            .into_iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }

    #[test]
    fn extracts_explicit_uppercase_tickers() {
        assert_eq!(resolved("How is AAPL doing today?"), vec!["AAPL"]);
        assert_eq!(resolved("Compare MSFT and GOOGL"), vec!["MSFT", "GOOGL"]);
    }

    #[test]
    fn extracts_dollar_prefixed_tokens() {
        assert_eq!(resolved("thoughts on $tsla?"), vec!["TSLA"]);
        assert_eq!(resolved("$AAPL vs $MSFT"), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn resolves_company_name_aliases() {
        assert_eq!(resolved("how is apple performing?"), vec!["AAPL"]);
        assert_eq!(resolved("Tesla or Nvidia?"), vec!["TSLA", "NVDA"]);
    }

    #[test]
    fn dedupes_preserving_first_mention_order() {
        assert_eq!(
            resolved("AAPL vs MSFT, and AAPL again"),
            vec!["AAPL", "MSFT"]
        );
        // Alias and explicit ticker for the same company collapse.
        assert_eq!(resolved("apple AAPL apple"), vec!["AAPL"]);
    }

    #[test]
    fn ignores_common_all_caps_words() {
        assert!(resolved("The CEO of the SEC discussed GDP and ETF flows").is_empty());
        assert!(resolved("I need help ASAP").is_empty());
    }

    #[test]
    fn accepts_class_share_suffix() {
        assert_eq!(resolved("What about BRK.B today?"), vec!["BRK.B"]);
    }

    #[test]
    fn no_candidates_for_general_questions() {
        assert!(resolved("What is compound interest?").is_empty());
        assert!(resolved("").is_empty());
        assert!(resolved("   \t\n  ").is_empty());
    }

    #[test]
    fn handles_punctuation_and_garbage() {
        assert_eq!(resolved("AAPL, MSFT; (GOOGL)!"), vec!["AAPL", "MSFT", "GOOGL"]);
        assert!(resolved("!!! ??? ### 12345").is_empty());
    }
}
