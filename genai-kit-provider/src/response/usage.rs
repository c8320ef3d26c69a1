use serde::{Deserialize, Serialize};

/// Token accounting for one or more model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u64,
    /// Tokens produced by the model.
    pub output_tokens: u64,
    /// Total tokens for the call.
    pub total_tokens: u64,
}

impl Usage {
    /// Creates a usage record; the total is derived from input + output.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// Sums two usage records field-wise.
    pub fn add(&self, other: &Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens.saturating_add(other.input_tokens),
            output_tokens: self.output_tokens.saturating_add(other.output_tokens),
            total_tokens: self.total_tokens.saturating_add(other.total_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_total() {
        let usage = Usage::new(10, 20);
        assert_eq!(usage.total_tokens, 30);
    }

    #[test]
    fn test_add_is_field_wise() {
        let a = Usage::new(10, 20);
        let b = Usage::new(5, 7);
        let sum = a.add(&b);
        assert_eq!(sum.input_tokens, 15);
        assert_eq!(sum.output_tokens, 27);
        assert_eq!(sum.total_tokens, 42);
    }
}
