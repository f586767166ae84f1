//! Price tables per backend family.

use crate::error::ModelError;
use crate::models::ModelResult;

/// Which token counts the per-1,000 rates apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBasis {
    /// Prompt tokens at the input rate, response tokens at the output rate.
    Split,
    /// Total tokens at both the input and the output rate.
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceRule {
    PerThousandTokens {
        input: f64,
        output: f64,
        basis: TokenBasis,
    },
    PerImage(f64),
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub rule: PriceRule,
    pub currency: &'static str,
}

impl PriceEntry {
    const fn split(input: f64, output: f64, currency: &'static str) -> Self {
        Self {
            rule: PriceRule::PerThousandTokens {
                input,
                output,
                basis: TokenBasis::Split,
            },
            currency,
        }
    }

    const fn total(input: f64, output: f64, currency: &'static str) -> Self {
        Self {
            rule: PriceRule::PerThousandTokens {
                input,
                output,
                basis: TokenBasis::Total,
            },
            currency,
        }
    }

    pub const fn free(currency: &'static str) -> Self {
        Self {
            rule: PriceRule::Free,
            currency,
        }
    }
}

pub fn price_of(tokens: u64, per_thousand: f64) -> f64 {
    tokens as f64 / 1000.0 * per_thousand
}

/// Set `result.total_price` from its current counts. Safe to call after every
/// fragment: the price is derived from counts, never accumulated.
pub fn apply_price(entry: &PriceEntry, result: &mut ModelResult) {
    result.total_price = match entry.rule {
        PriceRule::PerThousandTokens {
            input,
            output,
            basis: TokenBasis::Split,
        } => price_of(result.prompt_token_count, input) + price_of(result.response_token_count, output),
        PriceRule::PerThousandTokens {
            input,
            output,
            basis: TokenBasis::Total,
        } => price_of(result.total_token_count, input) + price_of(result.total_token_count, output),
        PriceRule::PerImage(each) => f64::from(result.image_count) * each,
        PriceRule::Free => 0.0,
    };
    result.currency = entry.currency.to_string();
}

/// OpenAI-family models (OpenAI, Azure and compatible servers). More specific
/// identifiers are matched first.
pub fn openai_price(model: &str) -> Option<PriceEntry> {
    let entry = match model {
        m if m.contains("gpt-3.5-turbo-instruct") => PriceEntry::split(0.0015, 0.002, "USD"),
        m if m.contains("gpt-3.5-turbo") => PriceEntry::split(0.0005, 0.0015, "USD"),
        m if m.contains("gpt-4-turbo") || m.contains("gpt-4-vision") => {
            PriceEntry::split(0.01, 0.03, "USD")
        }
        m if m.contains("gpt-4") && m.contains("32k") => PriceEntry::split(0.06, 0.12, "USD"),
        m if m.contains("gpt-4") => PriceEntry::split(0.03, 0.06, "USD"),
        m if m.contains("dall-e-3") => PriceEntry {
            rule: PriceRule::PerImage(0.08),
            currency: "USD",
        },
        _ => return None,
    };
    Some(entry)
}

/// Qwen models on DashScope, matched exactly.
pub fn qwen_price(model: &str) -> Option<PriceEntry> {
    let entry = match model {
        "qwen-long" => PriceEntry::total(0.0005, 0.002, "CNY"),
        "qwen-turbo" => PriceEntry::total(0.002, 0.006, "CNY"),
        "qwen-plus" => PriceEntry::total(0.004, 0.012, "CNY"),
        "qwen-max" | "qwen-max-longcontext" => PriceEntry::total(0.04, 0.12, "CNY"),
        _ => return None,
    };
    Some(entry)
}

/// Look up `model` with `table` or fail loudly.
pub fn price_entry(
    table: fn(&str) -> Option<PriceEntry>,
    model: &str,
) -> Result<PriceEntry, ModelError> {
    table(model).ok_or_else(|| ModelError::UnknownModel(model.to_string()))
}

pub const OPENAI_PRICING: &str = "\
URL:
https://azure.microsoft.com/en-us/pricing/details/cognitive-services/openai-service/

Language models:

| Models                 | Context | Input (per 1,000 tokens) | Output (per 1,000 tokens) |
|------------------------|---------|--------------------------|---------------------------|
| GPT-3.5-Turbo-0125     | 16K     | $0.0005                  | $0.0015                   |
| GPT-3.5-Turbo-Instruct | 4K      | $0.0015                  | $0.002                    |
| GPT-4-Turbo            | 128K    | $0.01                    | $0.03                     |
| GPT-4-Turbo-Vision     | 128K    | $0.01                    | $0.03                     |
| GPT-4                  | 8K      | $0.03                    | $0.06                     |
| GPT-4                  | 32K     | $0.06                    | $0.12                     |

Image models:

| Models   | Quality  | Resolution  | Price (per image) |
|----------|----------|-------------|-------------------|
| Dall-E-3 | Standard | 1024 * 1024 | $0.08             |
";

pub const QWEN_PRICING: &str = "\
URL:
https://help.aliyun.com/zh/dashscope/developer-reference/tongyi-thousand-questions-metering-and-billing

| Model      | sub-type             | Input (per 1,000 tokens) | Output (per 1,000 tokens) |
|------------|----------------------|--------------------------|---------------------------|
| Qwen-Long  | qwen-long            | 0.0005 yuan              | 0.002 yuan                |
| Qwen-Turbo | qwen-turbo           | 0.002 yuan               | 0.006 yuan                |
| Qwen-Plus  | qwen-plus            | 0.004 yuan               | 0.012 yuan                |
| Qwen-Max   | qwen-max             | 0.04 yuan                | 0.12 yuan                 |
| Qwen-Max   | qwen-max-longcontext | 0.04 yuan                | 0.12 yuan                 |

Both rates apply to the total token count of a turn.
";

pub const DUMMY_PRICING: &str = "The dummy backend is free.\n";

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_openai_split_pricing() {
        let entry = price_entry(openai_price, "gpt-4").unwrap();
        let mut result = ModelResult::with_prompt_tokens(1000);
        result.add_response_tokens(500);
        apply_price(&entry, &mut result);
        assert!(approx(result.total_price, 0.03 + 0.03));
        assert_eq!(result.currency, "USD");
    }

    #[test]
    fn test_specific_models_win() {
        assert_eq!(
            openai_price("gpt-3.5-turbo-instruct"),
            Some(PriceEntry::split(0.0015, 0.002, "USD"))
        );
        assert_eq!(
            openai_price("gpt-4-32k-0613"),
            Some(PriceEntry::split(0.06, 0.12, "USD"))
        );
        assert_eq!(
            openai_price("gpt-4-turbo-preview"),
            Some(PriceEntry::split(0.01, 0.03, "USD"))
        );
    }

    #[test]
    fn test_image_pricing() {
        let entry = price_entry(openai_price, "dall-e-3").unwrap();
        let mut result = ModelResult {
            image_count: 1,
            ..Default::default()
        };
        apply_price(&entry, &mut result);
        assert!(approx(result.total_price, 0.08));
    }

    #[test]
    fn test_qwen_prices_total_tokens_twice() {
        let entry = price_entry(qwen_price, "qwen-turbo").unwrap();
        let mut result = ModelResult::with_prompt_tokens(400);
        result.add_response_tokens(600);
        apply_price(&entry, &mut result);
        assert!(approx(result.total_price, 0.002 + 0.006));
        assert_eq!(result.currency, "CNY");
    }

    #[test]
    fn test_unknown_model_never_zero() {
        assert!(matches!(
            price_entry(openai_price, "llama-3-70b"),
            Err(ModelError::UnknownModel(m)) if m == "llama-3-70b"
        ));
        assert!(price_entry(qwen_price, "qwen-vl").is_err());
    }

    #[test]
    fn test_price_is_idempotent_and_monotonic() {
        let entry = price_entry(openai_price, "gpt-3.5-turbo").unwrap();
        let mut result = ModelResult::with_prompt_tokens(20);
        let mut last = 0.0;
        for _ in 0..5 {
            result.add_response_tokens(7);
            apply_price(&entry, &mut result);
            let first = result.total_price;
            apply_price(&entry, &mut result);
            assert_eq!(first, result.total_price);
            assert!(result.total_price >= last);
            last = result.total_price;
        }
    }
}
