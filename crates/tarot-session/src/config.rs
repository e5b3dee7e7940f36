use anyhow::{Context, Result, bail};
use std::time::Duration;
use tarot_api_types::{VerificationLevel, WalletAddress};
use tarot_host::{Token, TokenAmount, token_to_decimals};

pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_VERIFY_ACTION: &str = "daily_tarot_reading";
pub const DEFAULT_PAY_RECIPIENT: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
pub const DEFAULT_PAY_AMOUNT: &str = "0.1";
pub const PAY_DESCRIPTION: &str = "Premium Tarot Clarification";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    pub recipient: WalletAddress,
    pub token: Token,
    /// Human decimal amount, e.g. `0.1`.
    pub amount: String,
    pub description: String,
}

impl PaymentConfig {
    pub fn token_amount(&self) -> Result<TokenAmount> {
        Ok(TokenAmount {
            symbol: self.token,
            token_amount: token_to_decimals(&self.amount, self.token)?,
        })
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            recipient: WalletAddress(DEFAULT_PAY_RECIPIENT.to_owned()),
            token: Token::Wld,
            amount: DEFAULT_PAY_AMOUNT.to_owned(),
            description: PAY_DESCRIPTION.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RitualConfig {
    /// Delay between draw and the first reveal, and between later reveals.
    pub reveal_interval: Duration,
    pub verify_action: String,
    pub verification_level: VerificationLevel,
    pub payment: PaymentConfig,
}

impl Default for RitualConfig {
    fn default() -> Self {
        Self {
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            verify_action: DEFAULT_VERIFY_ACTION.to_owned(),
            verification_level: VerificationLevel::Orb,
            payment: PaymentConfig::default(),
        }
    }
}

impl RitualConfig {
    /// Reads `TAROT_REVEAL_INTERVAL_MS`, `TAROT_VERIFY_ACTION`,
    /// `TAROT_PAY_RECIPIENT` and `TAROT_PAY_AMOUNT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("TAROT_REVEAL_INTERVAL_MS") {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("TAROT_REVEAL_INTERVAL_MS is not a number: {raw}"))?;
            if millis == 0 {
                bail!("TAROT_REVEAL_INTERVAL_MS must be greater than zero");
            }
            config.reveal_interval = Duration::from_millis(millis);
        }

        if let Some(action) = lookup("TAROT_VERIFY_ACTION").filter(|v| !v.trim().is_empty()) {
            config.verify_action = action.trim().to_owned();
        }

        if let Some(recipient) = lookup("TAROT_PAY_RECIPIENT").filter(|v| !v.trim().is_empty()) {
            config.payment.recipient = WalletAddress(recipient.trim().to_owned());
        }

        if let Some(amount) = lookup("TAROT_PAY_AMOUNT").filter(|v| !v.trim().is_empty()) {
            config.payment.amount = amount.trim().to_owned();
        }

        config
            .payment
            .token_amount()
            .context("TAROT_PAY_AMOUNT is not a valid token amount")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_daily_ritual() {
        let config = RitualConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RitualConfig::default());
        assert_eq!(config.reveal_interval, Duration::from_millis(500));
        assert_eq!(config.verification_level, VerificationLevel::Orb);

        let amount = config.payment.token_amount().unwrap();
        assert_eq!(amount.symbol, Token::Wld);
        assert_eq!(amount.token_amount, "100000000000000000");
    }

    #[test]
    fn environment_overrides_apply() {
        let config = RitualConfig::from_lookup(lookup(&[
            ("TAROT_REVEAL_INTERVAL_MS", "50"),
            ("TAROT_VERIFY_ACTION", "weekly_reading"),
            ("TAROT_PAY_RECIPIENT", "0xBEEF"),
            ("TAROT_PAY_AMOUNT", "0.25"),
        ]))
        .unwrap();

        assert_eq!(config.reveal_interval, Duration::from_millis(50));
        assert_eq!(config.verify_action, "weekly_reading");
        assert_eq!(config.payment.recipient.as_str(), "0xBEEF");
        assert_eq!(config.payment.token_amount().unwrap().token_amount, "250000000000000000");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(RitualConfig::from_lookup(lookup(&[("TAROT_REVEAL_INTERVAL_MS", "soon")])).is_err());
        assert!(RitualConfig::from_lookup(lookup(&[("TAROT_PAY_AMOUNT", "a lot")])).is_err());
    }

    #[test]
    fn zero_reveal_interval_is_rejected() {
        let err = RitualConfig::from_lookup(lookup(&[("TAROT_REVEAL_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
        assert!(RitualConfig::from_lookup(lookup(&[("TAROT_REVEAL_INTERVAL_MS", "1")])).is_ok());
    }
}
