use ba_api_types::Price;
use serde::Deserialize;

pub const DEFAULT_MAX_QUANTITY: u32 = 1000;

/// Where a line's displayed price comes from after a quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LinePricing {
    /// Trust the `price` the server sends back.
    #[default]
    Server,
    /// Older pages priced every print the same: `unit × quantity`.
    FixedUnitPrice { unit: Price },
}

impl LinePricing {
    pub fn line_price(self, server_price: Price, quantity: u32) -> Price {
        match self {
            LinePricing::Server => server_price,
            LinePricing::FixedUnitPrice { unit } => unit.times(quantity),
        }
    }
}

/// What the page does after a cart call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Log only; the mirror keeps whatever it had.
    Silent,
    /// Show a retry message next to the cart.
    Message,
    /// Reload so the page is rebuilt from the session.
    #[default]
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    pub max_quantity: u32,
    pub line_pricing: LinePricing,
    pub on_increase_failure: RecoveryPolicy,
    pub on_decrease_failure: RecoveryPolicy,
    pub on_remove_failure: RecoveryPolicy,
    pub on_total_failure: RecoveryPolicy,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_quantity: DEFAULT_MAX_QUANTITY,
            line_pricing: LinePricing::default(),
            on_increase_failure: RecoveryPolicy::default(),
            on_decrease_failure: RecoveryPolicy::default(),
            on_remove_failure: RecoveryPolicy::default(),
            on_total_failure: RecoveryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() -> anyhow::Result<()> {
        let config: CartConfig = serde_json::from_str(
            r#"{"line_pricing": {"mode": "fixed_unit_price", "unit": 225}, "on_increase_failure": "silent"}"#,
        )?;

        assert_eq!(config.max_quantity, 1000);
        assert_eq!(
            config.line_pricing,
            LinePricing::FixedUnitPrice {
                unit: Price::from_dollars(225)
            }
        );
        assert_eq!(config.on_increase_failure, RecoveryPolicy::Silent);
        assert_eq!(config.on_total_failure, RecoveryPolicy::Reload);
        Ok(())
    }

    #[test]
    fn fixed_pricing_ignores_server_answer() {
        let fixed = LinePricing::FixedUnitPrice {
            unit: Price::from_dollars(225),
        };
        assert_eq!(
            fixed.line_price(Price::from_dollars(1), 4),
            Price::from_dollars(900)
        );
        assert_eq!(
            LinePricing::Server.line_price(Price::from_dollars(1), 4),
            Price::from_dollars(1)
        );
    }
}
