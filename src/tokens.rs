//! Token estimates for LLM context budgets.
//!
//! Uses tiktoken-rs for OpenAI-compatible counts and falls back to a
//! characters-per-token heuristic when a tokenizer cannot be loaded.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rayon::prelude::*;
use tiktoken_rs::CoreBPE;

/// BPE vocabulary used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tokenizer {
    /// cl100k_base: GPT-4, GPT-3.5-turbo
    #[default]
    Cl100k,
    /// o200k_base: GPT-4o
    O200k,
}

impl fmt::Display for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokenizer::Cl100k => write!(f, "cl100k_base"),
            Tokenizer::O200k => write!(f, "o200k_base"),
        }
    }
}

impl FromStr for Tokenizer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cl100k" | "cl100k_base" => Ok(Tokenizer::Cl100k),
            "o200k" | "o200k_base" => Ok(Tokenizer::O200k),
            _ => Err(format!("unknown tokenizer: {s}")),
        }
    }
}

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn bpe(tokenizer: Tokenizer) -> Option<&'static CoreBPE> {
    match tokenizer {
        Tokenizer::Cl100k => CL100K.get_or_init(|| tiktoken_rs::cl100k_base().ok()),
        Tokenizer::O200k => O200K.get_or_init(|| tiktoken_rs::o200k_base().ok()),
    }
    .as_ref()
}

/// Roughly four bytes per token.
fn heuristic_count(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Count tokens in `text`. Never fails.
///
/// # Examples
///
/// ```
/// use gitingest::tokens::{count_tokens, Tokenizer};
///
/// assert!(count_tokens("Hello, world!", Tokenizer::Cl100k) > 0);
/// assert_eq!(count_tokens("", Tokenizer::O200k), 0);
/// ```
pub fn count_tokens(text: &str, tokenizer: Tokenizer) -> usize {
    match bpe(tokenizer) {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => heuristic_count(text),
    }
}

/// Sum of token counts over many texts, counted in parallel.
pub fn estimate_total(texts: &[&str], tokenizer: Tokenizer) -> usize {
    texts
        .par_iter()
        .map(|text| count_tokens(text, tokenizer))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_text() {
        let count = count_tokens("Hello, world!", Tokenizer::Cl100k);
        assert!(count > 0 && count < 10);
    }

    #[test]
    fn test_heuristic() {
        assert_eq!(heuristic_count(""), 0);
        assert_eq!(heuristic_count("a"), 1);
        assert_eq!(heuristic_count("abcd"), 1);
        assert_eq!(heuristic_count("abcde"), 2);
    }

    #[test]
    fn test_estimate_total_is_sum() {
        let texts = ["fn main() {}", "print('hi')", ""];
        let expected: usize = texts.iter().map(|t| count_tokens(t, Tokenizer::O200k)).sum();
        assert_eq!(estimate_total(&texts, Tokenizer::O200k), expected);
    }

    #[test]
    fn test_tokenizer_from_str() {
        assert_eq!("cl100k".parse::<Tokenizer>().unwrap(), Tokenizer::Cl100k);
        assert_eq!("O200K_BASE".parse::<Tokenizer>().unwrap(), Tokenizer::O200k);
        assert!("p50k".parse::<Tokenizer>().is_err());
    }
}
