//! Token usage accounting.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-million-token prices in USD: `(input, thinking output, output)`.
const FLASH_PRICES: (f64, f64, f64) = (0.15, 3.5, 0.6);
const PRO_PRICES: (f64, f64, f64) = (1.25, 10.0, 10.0);

/// Additive token counters for a message, a stream or a whole session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens generated by the model.
    #[serde(default)]
    pub generated_tokens: u64,
    /// Running total; see [`Usage::tally`] for how it accumulates.
    #[serde(default)]
    pub total_tokens: u64,
    /// Prompt tokens served from cache.
    #[serde(default, alias = "cached_total_tokens")]
    pub cached_token_count: u64,
    /// Tokens spent on model reasoning.
    #[serde(default, alias = "thoughts_total_tokens")]
    pub thoughts_token_count: u64,
    /// Prompt tokens consumed by tool use.
    #[serde(default)]
    pub tool_use_prompt_token_count: u64,
    /// Per-modality breakdown, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<Vec<Value>>,
}

impl Usage {
    /// Absorb `other` into `self`, field by field.
    ///
    /// `total_tokens` is additionally incremented by `other.cached_token_count`,
    /// so absorbed cached tokens appear twice in the total. Session totals
    /// reported by the service are accumulated the same way.
    pub fn tally(&mut self, other: &Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.generated_tokens += other.generated_tokens;
        self.total_tokens += other.total_tokens;
        self.cached_token_count += other.cached_token_count;
        self.thoughts_token_count += other.thoughts_token_count;
        self.tool_use_prompt_token_count += other.tool_use_prompt_token_count;
        self.total_tokens += other.cached_token_count;
    }

    /// Owned form of [`Usage::tally`].
    #[must_use]
    pub fn tallied(mut self, other: &Self) -> Self {
        self.tally(other);
        self
    }

    /// Estimated cost in USD for `model_name`.
    ///
    /// Models containing `flash` use the flash price tier, everything else
    /// the pro tier. Thinking-output pricing applies to all output when any
    /// thought tokens were spent.
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, model_name: &str) -> f64 {
        let (input, thinking_output, output) = if model_name.contains("flash") {
            FLASH_PRICES
        } else {
            PRO_PRICES
        };
        let output = if self.thoughts_token_count > 0 {
            thinking_output
        } else {
            output
        };
        let per_token = |count: u64| count as f64 / 1_000_000.0;

        output * per_token(self.generated_tokens)
            + output * per_token(self.thoughts_token_count)
            + input * per_token(self.prompt_tokens)
            + input * per_token(self.cached_token_count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn usage(prompt: u64, generated: u64, total: u64, cached: u64, thoughts: u64, tool: u64) -> Usage {
        Usage {
            prompt_tokens: prompt,
            generated_tokens: generated,
            total_tokens: total,
            cached_token_count: cached,
            thoughts_token_count: thoughts,
            tool_use_prompt_token_count: tool,
            prompt_tokens_details: None,
        }
    }

    fn arb_usage() -> impl Strategy<Value = Usage> {
        (0..1_000_000u64, 0..1_000_000u64, 0..1_000_000u64, 0..1_000_000u64, 0..1_000_000u64, 0..1_000_000u64)
            .prop_map(|(p, g, t, c, th, tl)| usage(p, g, t, c, th, tl))
    }

    #[test]
    fn tally_adds_fields_and_double_counts_cache() {
        let mut a = usage(10, 20, 30, 0, 1, 2);
        a.tally(&usage(1, 2, 3, 5, 0, 1));
        assert_eq!(a.prompt_tokens, 11);
        assert_eq!(a.generated_tokens, 22);
        assert_eq!(a.cached_token_count, 5);
        assert_eq!(a.thoughts_token_count, 1);
        assert_eq!(a.tool_use_prompt_token_count, 3);
        // 30 + 3, plus the absorbed cache count again
        assert_eq!(a.total_tokens, 38);
    }

    #[test]
    fn tally_with_default_is_identity() {
        let a = usage(1, 2, 3, 4, 5, 6);
        assert_eq!(a.clone().tallied(&Usage::default()), a);
    }

    proptest! {
        #[test]
        fn tally_is_associative_except_for_the_cache_double_count(a in arb_usage(), b in arb_usage(), c in arb_usage()) {
            let left = a.clone().tallied(&b).tallied(&c);
            let right = a.clone().tallied(&b.clone().tallied(&c));

            prop_assert_eq!(left.prompt_tokens, right.prompt_tokens);
            prop_assert_eq!(left.generated_tokens, right.generated_tokens);
            prop_assert_eq!(left.cached_token_count, right.cached_token_count);
            prop_assert_eq!(left.thoughts_token_count, right.thoughts_token_count);
            prop_assert_eq!(left.tool_use_prompt_token_count, right.tool_use_prompt_token_count);
            // Grouping (b, c) first folds c's cache into b's total, and then
            // absorbing b counts c's cache a second time.
            prop_assert_eq!(right.total_tokens, left.total_tokens + c.cached_token_count);
        }

        #[test]
        fn total_is_running_sum_of_absorbed_totals_and_caches(base in arb_usage(), parts in prop::collection::vec(arb_usage(), 0..8)) {
            let mut acc = base.clone();
            for part in &parts {
                acc.tally(part);
            }
            let expected = base.total_tokens
                + parts.iter().map(|p| p.total_tokens + p.cached_token_count).sum::<u64>();
            prop_assert_eq!(acc.total_tokens, expected);
        }
    }

    #[test]
    fn cost_uses_flash_tier() {
        let u = usage(1_000_000, 1_000_000, 0, 0, 0, 0);
        let cost = u.cost("gemini-flash-001");
        assert!((cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn cost_uses_thinking_output_price_when_thoughts_present() {
        let u = usage(0, 1_000_000, 0, 0, 1_000_000, 0);
        let cost = u.cost("sec-gemini-pro");
        assert!((cost - 20.0).abs() < 1e-9);
    }

    #[test]
    fn accepts_legacy_field_names() {
        let u: Usage = serde_json::from_str(r#"{"cached_total_tokens": 7, "thoughts_total_tokens": 3}"#).unwrap();
        assert_eq!(u.cached_token_count, 7);
        assert_eq!(u.thoughts_token_count, 3);
        assert_eq!(u.prompt_tokens, 0);
    }
}
