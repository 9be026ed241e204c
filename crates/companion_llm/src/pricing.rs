//! USD cost estimation from provider token usage.

/// Per-million-token input/output rates. Unknown models fall back to a
/// conservative default so an unrecognized model name never prices as free.
fn rates_per_million(model: &str) -> (f64, f64) {
    match model {
        m if m.contains("haiku") => (0.80, 4.00),
        m if m.contains("sonnet") => (3.00, 15.00),
        m if m.contains("opus") => (15.00, 75.00),
        m if m.contains("gpt-4o-mini") => (0.15, 0.60),
        m if m.contains("gpt-4o") => (2.50, 10.00),
        m if m.contains("gpt-3.5") => (0.50, 1.50),
        _ => (1.00, 3.00),
    }
}

pub fn estimate_cost(model: &str, tokens_in: u64, tokens_out: u64) -> f64 {
    let (in_rate, out_rate) = rates_per_million(model);
    (tokens_in as f64 / 1_000_000.0) * in_rate + (tokens_out as f64 / 1_000_000.0) * out_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_prices_nonzero() {
        let cost = estimate_cost("claude-4-5-haiku-20250929", 1000, 200);
        assert!(cost > 0.0);
    }

    #[test]
    fn unknown_model_still_prices() {
        let cost = estimate_cost("some-future-model", 1000, 1000);
        assert!(cost > 0.0);
    }

    #[test]
    fn more_tokens_cost_more() {
        let small = estimate_cost("gpt-4o-mini", 100, 100);
        let large = estimate_cost("gpt-4o-mini", 10_000, 10_000);
        assert!(large > small);
    }
}
