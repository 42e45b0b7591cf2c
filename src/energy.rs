//! Cost and energy estimation from token counts.
//!
//! All functions here are pure: a token count and a model tier go in, currency
//! and watt-hours come out. Rates are fixed tables (published per-million-token
//! prices and per-token energy figures); there is no live pricing lookup.

use serde::{Deserialize, Serialize};

/// Rough token estimation divisor: 1 token ~ 4 bytes of serialized JSON.
pub const BYTES_PER_TOKEN: u64 = 4;

/// Data center PUE (Power Usage Effectiveness) multiplier.
/// Accounts for cooling, networking, and other facility overhead.
pub const DEFAULT_PUE: f64 = 1.4;

/// One phone charge ~ 12 Wh.
pub const PHONE_CHARGE_WH: f64 = 12.0;
/// A 10 W LED bulb, for bulb-hour equivalents.
const LED_BULB_WATTS: f64 = 10.0;

/// Model tier used for rate lookups.
///
/// Unknown tier names resolve to [`ModelTier::Default`] silently; a typo in a
/// `--model` flag is not surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Haiku,
    Sonnet,
    Opus,
    #[default]
    Default,
}

impl ModelTier {
    /// Derive a tier from a model name or tier string ("claude-3-opus-...",
    /// "sonnet", ...). Empty or unrecognized input maps to `Default`.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("haiku") {
            ModelTier::Haiku
        } else if lower.contains("opus") {
            ModelTier::Opus
        } else if lower.contains("sonnet") {
            ModelTier::Sonnet
        } else {
            ModelTier::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Haiku => "haiku",
            ModelTier::Sonnet => "sonnet",
            ModelTier::Opus => "opus",
            ModelTier::Default => "default",
        }
    }

    /// Server-side energy per generated token, in joules.
    /// Haiku 0.5-1.0 J (midpoint), Sonnet ~GPT-4o-class 2-4 J, Opus 8-15 J.
    fn joules_per_token(self) -> f64 {
        match self {
            ModelTier::Haiku => 0.75,
            ModelTier::Sonnet => 3.0,
            ModelTier::Opus => 11.5,
            ModelTier::Default => 3.0,
        }
    }

    /// (input, output) USD rates per million tokens.
    fn rates_per_million(self) -> (f64, f64) {
        match self {
            ModelTier::Haiku => (0.25, 1.25),
            ModelTier::Sonnet => (3.0, 15.0),
            ModelTier::Opus => (15.0, 75.0),
            ModelTier::Default => (3.0, 15.0),
        }
    }
}

/// Derived energy figures for a token count. Computed, never stored.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EnergyEstimate {
    pub joules: f64,
    pub watt_hours: f64,
    pub kilowatt_hours: f64,
    /// Energy expressed as ~12 Wh phone charges.
    pub phone_charges: f64,
    /// Hours a 10 W LED bulb could run.
    pub led_bulb_hours: f64,
}

/// Estimate a token count from a serialized byte size (4 bytes/token heuristic).
pub fn estimate_tokens(size_bytes: u64) -> u64 {
    size_bytes / BYTES_PER_TOKEN
}

/// Estimate USD cost for a blended token count.
///
/// Assumes ~30% input / 70% output, the typical conversation split, since a
/// byte-size-derived count cannot distinguish directions.
pub fn estimate_cost(tokens: u64, tier: ModelTier) -> f64 {
    let (input_rate, output_rate) = tier.rates_per_million();
    let blended_rate = 0.3 * input_rate + 0.7 * output_rate;
    (tokens as f64 / 1_000_000.0) * blended_rate
}

/// Estimate USD cost when real input/output token counts are known.
pub fn estimate_cost_split(input_tokens: u64, output_tokens: u64, tier: ModelTier) -> f64 {
    let (input_rate, output_rate) = tier.rates_per_million();
    (input_tokens as f64 / 1_000_000.0) * input_rate
        + (output_tokens as f64 / 1_000_000.0) * output_rate
}

/// Estimate energy consumption for a token count.
///
/// `include_pue` multiplies in the facility overhead constant (cooling etc.).
pub fn estimate_energy(tokens: u64, tier: ModelTier, include_pue: bool) -> EnergyEstimate {
    let mut joules = tokens as f64 * tier.joules_per_token();
    let mut watt_hours = joules / 3600.0;

    if include_pue {
        joules *= DEFAULT_PUE;
        watt_hours *= DEFAULT_PUE;
    }

    EnergyEstimate {
        joules,
        watt_hours,
        kilowatt_hours: watt_hours / 1000.0,
        phone_charges: watt_hours / PHONE_CHARGE_WH,
        led_bulb_hours: watt_hours / LED_BULB_WATTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_name() {
        assert_eq!(ModelTier::from_name("claude-3-haiku-20240307"), ModelTier::Haiku);
        assert_eq!(ModelTier::from_name("claude-opus-4"), ModelTier::Opus);
        assert_eq!(ModelTier::from_name("claude-3-5-sonnet"), ModelTier::Sonnet);
        assert_eq!(ModelTier::from_name(""), ModelTier::Default);
    }

    #[test]
    fn test_unknown_tier_falls_back_to_default() {
        assert_eq!(ModelTier::from_name("unknown"), ModelTier::Default);
        let unknown = estimate_cost(1_000_000, ModelTier::from_name("unknown"));
        let default = estimate_cost(1_000_000, ModelTier::Default);
        assert_eq!(unknown, default);
    }

    #[test]
    fn test_estimate_tokens_divisor() {
        assert_eq!(estimate_tokens(400), 100);
        assert_eq!(estimate_tokens(3), 0);
    }

    #[test]
    fn test_blended_cost_sonnet() {
        // 0.3 * 3.0 + 0.7 * 15.0 = 11.4 per million
        let cost = estimate_cost(1_000_000, ModelTier::Sonnet);
        assert!((cost - 11.4).abs() < 1e-9);
    }

    #[test]
    fn test_cost_split() {
        let cost = estimate_cost_split(1_000_000, 1_000_000, ModelTier::Opus);
        assert!((cost - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_monotonic_in_tokens() {
        for tier in [ModelTier::Haiku, ModelTier::Sonnet, ModelTier::Opus] {
            let small = estimate_energy(1_000, tier, true);
            let large = estimate_energy(2_000, tier, true);
            assert!(small.watt_hours <= large.watt_hours);
            assert!(small.joules <= large.joules);
        }
    }

    #[test]
    fn test_energy_pue_overhead() {
        let base = estimate_energy(3600, ModelTier::Sonnet, false);
        let with_pue = estimate_energy(3600, ModelTier::Sonnet, true);
        // 3600 tokens * 3 J = 10800 J = 3 Wh without overhead
        assert!((base.watt_hours - 3.0).abs() < 1e-9);
        assert!((with_pue.watt_hours - 3.0 * DEFAULT_PUE).abs() < 1e-9);
    }

    #[test]
    fn test_energy_equivalents() {
        let e = estimate_energy(3600, ModelTier::Sonnet, false);
        assert!((e.phone_charges - e.watt_hours / 12.0).abs() < 1e-12);
        assert!((e.led_bulb_hours - e.watt_hours / 10.0).abs() < 1e-12);
        assert!((e.kilowatt_hours - e.watt_hours / 1000.0).abs() < 1e-12);
    }
}
