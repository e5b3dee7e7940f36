//! Capabilities consumed from the wallet-enabled host runtime.
//!
//! The host owns wallet authentication, identity proofs and payment
//! settlement. This crate only describes the commands and their outcomes;
//! the client treats every non-success status as a failure.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tarot_api_types::{IdentityProof, VerificationLevel, WalletAddress};
use uuid::Uuid;

/// Outcome reported by a host command that did not throw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus<T> {
    Success(T),
    Error { error_code: String },
}

impl<T> CommandStatus<T> {
    pub fn into_result(self) -> Result<T> {
        match self {
            CommandStatus::Success(payload) => Ok(payload),
            CommandStatus::Error { error_code } => Err(anyhow!("host command failed: {error_code}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletAuthRequest {
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletAuthSuccess {
    pub address: WalletAddress,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyCommand {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    pub verification_level: VerificationLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Token {
    #[serde(rename = "WLD")]
    Wld,
    #[serde(rename = "USDC")]
    Usdc,
}

impl Token {
    pub fn decimals(self) -> u32 {
        match self {
            Token::Wld => 18,
            Token::Usdc => 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAmount {
    pub symbol: Token,
    /// Amount in the token's smallest unit.
    pub token_amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayCommand {
    pub reference: String,
    pub to: WalletAddress,
    pub tokens: Vec<TokenAmount>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaySuccess {
    pub transaction_id: String,
    pub reference: String,
}

#[async_trait]
pub trait HostRuntime: Send + Sync {
    fn is_installed(&self) -> bool;
    fn username(&self) -> Option<String>;
    async fn wallet_auth(&self, request: WalletAuthRequest) -> Result<CommandStatus<WalletAuthSuccess>>;
    async fn verify(&self, command: VerifyCommand) -> Result<CommandStatus<IdentityProof>>;
    async fn pay(&self, command: PayCommand) -> Result<CommandStatus<PaySuccess>>;
}

#[async_trait]
impl<H: HostRuntime + ?Sized> HostRuntime for Arc<H> {
    fn is_installed(&self) -> bool {
        (**self).is_installed()
    }

    fn username(&self) -> Option<String> {
        (**self).username()
    }

    async fn wallet_auth(&self, request: WalletAuthRequest) -> Result<CommandStatus<WalletAuthSuccess>> {
        (**self).wallet_auth(request).await
    }

    async fn verify(&self, command: VerifyCommand) -> Result<CommandStatus<IdentityProof>> {
        (**self).verify(command).await
    }

    async fn pay(&self, command: PayCommand) -> Result<CommandStatus<PaySuccess>> {
        (**self).pay(command).await
    }
}

/// Stand-in used when the client runs outside a wallet host.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostRuntime;

#[async_trait]
impl HostRuntime for NoHostRuntime {
    fn is_installed(&self) -> bool {
        false
    }

    fn username(&self) -> Option<String> {
        None
    }

    async fn wallet_auth(&self, _request: WalletAuthRequest) -> Result<CommandStatus<WalletAuthSuccess>> {
        Err(anyhow!("host runtime is not installed"))
    }

    async fn verify(&self, _command: VerifyCommand) -> Result<CommandStatus<IdentityProof>> {
        Err(anyhow!("host runtime is not installed"))
    }

    async fn pay(&self, _command: PayCommand) -> Result<CommandStatus<PaySuccess>> {
        Err(anyhow!("host runtime is not installed"))
    }
}

pub fn epoch_ms() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| anyhow!("time error: {err}"))?
        .as_millis())
}

/// Single-use sign-in nonce. Timestamp plus a random suffix so two attempts in
/// the same millisecond still differ.
pub fn login_nonce() -> Result<String> {
    let suffix = Uuid::new_v4().simple().to_string();
    Ok(format!("tarot-login-{}-{}", epoch_ms()?, &suffix[..8]))
}

pub fn payment_reference(wallet_address: &WalletAddress) -> Result<String> {
    Ok(format!("tarot-clarification-{}-{}", wallet_address, epoch_ms()?))
}

/// Convert a human decimal amount ("0.1") into the token's smallest unit.
pub fn token_to_decimals(amount: &str, token: Token) -> Result<String> {
    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        bail!("amount is empty");
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        bail!("amount must be a plain decimal number: {amount}");
    }

    let decimals = token.decimals() as usize;
    if fraction.len() > decimals {
        bail!("amount {amount} has more than {decimals} fractional digits");
    }

    let digits = format!("{whole}{fraction:0<decimals$}");
    let units: u128 = digits
        .parse()
        .map_err(|err| anyhow!("amount {amount} out of range: {err}"))?;
    Ok(units.to_string())
}
