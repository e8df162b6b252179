//! LLM usage extraction and cost estimation
//!
//! Costs are rough estimates from a static per-token table, not metered
//! billing. Input cost is weighted at 0.5 and output cost at 0.8.
//!
//! A provider/model pair found in the table is charged its table rate as a
//! flat amount, independent of the token count. Only unknown pairs scale
//! with tokens (`0.000001` per token). Stores written by earlier releases
//! hold costs computed this way, so the quirk is kept for comparability.

use serde::Deserialize;
use serde_json::Value;

use super::lenient;
use super::types::LlmUsage;

/// Rate applied to provider/model pairs missing from [`COST_PER_TOKEN`]
pub const FALLBACK_COST_PER_TOKEN: f64 = 0.000001;

const INPUT_COST_WEIGHT: f64 = 0.5;
const OUTPUT_COST_WEIGHT: f64 = 0.8;

/// Approximate characters per token for plain-text estimates
const CHARS_PER_TOKEN: usize = 4;

/// (provider, model, USD per token)
const COST_PER_TOKEN: &[(&str, &str, f64)] = &[
    ("openai", "gpt-4", 0.00003),
    ("openai", "gpt-3.5-turbo", 0.000002),
    ("openai", "gpt-4o", 0.000005),
    ("openai", "gpt-4o-mini", 0.00000015),
    ("anthropic", "claude-3-5-sonnet", 0.000003),
    ("anthropic", "claude-3-5-haiku", 0.0000008),
    ("google", "gemini-2.5-flash", 0.00000015),
    ("google", "gemini-2.0-flash", 0.00000015),
];

/// Token counts as reported in a provider response's `usage` object
///
/// Chat-completion style SDKs report `promptTokens`/`completionTokens`/
/// `reasoningTokens`; messages style SDKs report `inputTokens`/`outputTokens`/
/// `thinkingTokens`. Where both spellings appear the chat-completion key wins.
/// Values that are not numbers are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportedUsage {
    #[serde(default, deserialize_with = "lenient::optional_count")]
    prompt_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    completion_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    output_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    reasoning_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    thinking_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    total_tokens: Option<u64>,
}

impl ReportedUsage {
    fn from_response(response: &Value) -> Self {
        response
            .get("usage")
            .and_then(|usage| ReportedUsage::deserialize(usage).ok())
            .unwrap_or_default()
    }

    fn input(&self) -> u64 {
        self.prompt_tokens.or(self.input_tokens).unwrap_or(0)
    }

    fn output(&self) -> u64 {
        self.completion_tokens.or(self.output_tokens).unwrap_or(0)
    }

    fn thinking(&self) -> u64 {
        self.reasoning_tokens.or(self.thinking_tokens).unwrap_or(0)
    }

    /// Explicit total, unless absent or zero
    fn total(&self) -> u64 {
        match self.total_tokens {
            Some(total) if total > 0 => total,
            _ => self.input() + self.output() + self.thinking(),
        }
    }
}

/// Build an [`LlmUsage`] from an arbitrary provider response payload
///
/// Missing or malformed usage data yields zero token counts rather than an error.
pub fn extract_llm_usage(response: &Value, provider: &str, model: &str) -> LlmUsage {
    let reported = ReportedUsage::from_response(response);

    let input_tokens = reported.input();
    let output_tokens = reported.output();
    let thinking_tokens = reported.thinking();
    let total_tokens = reported.total();

    let input_cost = estimate_cost(provider, model, input_tokens) * INPUT_COST_WEIGHT;
    let output_cost = estimate_cost(provider, model, output_tokens) * OUTPUT_COST_WEIGHT;

    LlmUsage {
        provider: provider.to_string(),
        model: model.to_string(),
        input_tokens,
        output_tokens,
        thinking_tokens,
        total_tokens,
        estimated_cost: estimate_cost(provider, model, total_tokens),
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    }
}

fn table_rate(provider: &str, model: &str) -> Option<f64> {
    let provider = provider.to_lowercase();
    let model = model.to_lowercase();
    COST_PER_TOKEN
        .iter()
        .find(|(p, m, _)| *p == provider && *m == model)
        .map(|(_, _, rate)| *rate)
}

/// Per-token rate for a provider/model pair (case-insensitive)
pub fn cost_per_token(provider: &str, model: &str) -> f64 {
    table_rate(provider, model).unwrap_or(FALLBACK_COST_PER_TOKEN)
}

/// Estimated USD cost of `tokens` tokens
///
/// Known pairs return the table rate itself; unknown pairs return
/// `FALLBACK_COST_PER_TOKEN * tokens`.
pub fn estimate_cost(provider: &str, model: &str, tokens: u64) -> f64 {
    match table_rate(provider, model) {
        Some(rate) => rate,
        None => FALLBACK_COST_PER_TOKEN * tokens as f64,
    }
}

/// Rough token count for text: one token per four characters, rounded up
pub fn count_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_chat_completion_keys() {
        let response = json!({
            "text": "hello",
            "usage": { "promptTokens": 1000, "completionTokens": 500, "totalTokens": 1500 }
        });

        let usage = extract_llm_usage(&response, "openai", "gpt-4o-mini");

        assert_eq!(usage.input_tokens, 1000);
        assert_eq!(usage.output_tokens, 500);
        assert_eq!(usage.thinking_tokens, 0);
        assert_eq!(usage.total_tokens, 1500);
        // Table hits are charged the flat rate whatever the token count
        assert!(approx(usage.estimated_cost, 1.5e-7));
        assert!(approx(usage.input_cost, 7.5e-8));
        assert!(approx(usage.output_cost, 1.2e-7));
        assert!(approx(usage.total_cost, usage.input_cost + usage.output_cost));
    }

    #[test]
    fn test_messages_keys_and_summed_total() {
        let response = json!({
            "usage": { "inputTokens": 10, "outputTokens": 20, "thinkingTokens": 5 }
        });

        let usage = extract_llm_usage(&response, "anthropic", "claude-3-5-haiku");

        assert_eq!(
            (usage.input_tokens, usage.output_tokens, usage.thinking_tokens),
            (10, 20, 5)
        );
        assert_eq!(usage.total_tokens, 35);
    }

    #[test]
    fn test_key_precedence_and_zero_total_fallback() {
        let response = json!({
            "usage": {
                "promptTokens": 7,
                "inputTokens": 99,
                "completionTokens": "n/a",
                "outputTokens": 3,
                "reasoningTokens": 2,
                "thinkingTokens": 40,
                "totalTokens": 0
            }
        });

        let usage = extract_llm_usage(&response, "openai", "gpt-4o");

        assert_eq!(usage.input_tokens, 7);
        assert_eq!(usage.output_tokens, 3);
        assert_eq!(usage.thinking_tokens, 2);
        assert_eq!(usage.total_tokens, 12);
    }

    #[test]
    fn test_missing_usage_yields_zero_counts() {
        for response in [json!(null), json!("text"), json!({}), json!({ "usage": 12 })] {
            let usage = extract_llm_usage(&response, "mistral", "large");
            assert_eq!(usage.total_tokens, 0);
            assert_eq!(usage.total_cost, 0.0);
            assert_eq!(usage.provider, "mistral");
        }
    }

    #[test]
    fn test_cost_lookup_is_case_insensitive_with_fallback() {
        assert_eq!(cost_per_token("OpenAI", "GPT-4"), 0.00003);
        assert_eq!(cost_per_token("mistral", "large"), FALLBACK_COST_PER_TOKEN);
        assert!(approx(estimate_cost("mistral", "large", 2000), 0.002));
    }

    #[test]
    fn test_known_pair_cost_ignores_token_count() {
        assert_eq!(estimate_cost("openai", "gpt-4", 0), 0.00003);
        assert_eq!(estimate_cost("Anthropic", "claude-3-5-haiku", 1_000_000), 0.0000008);

        let response = json!({ "usage": { "inputTokens": 10, "outputTokens": 20 } });
        let usage = extract_llm_usage(&response, "unknown", "model");
        assert!(approx(usage.estimated_cost, 30.0 * FALLBACK_COST_PER_TOKEN));
        assert!(approx(usage.input_cost, 10.0 * FALLBACK_COST_PER_TOKEN * 0.5));
        assert!(approx(usage.output_cost, 20.0 * FALLBACK_COST_PER_TOKEN * 0.8));
    }

    #[test]
    fn test_count_tokens_rounds_up() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("abcd"), 1);
        assert_eq!(count_tokens("abcde"), 2);
    }
}
