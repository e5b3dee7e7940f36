//! The ritual orchestrator.
//!
//! Each public async method is one user-triggered command. A command claims
//! the in-flight slot, awaits its external collaborator, then commits either
//! the success fields or a single error message. Nothing escapes a command:
//! failures are logged and written to `Session::error`.

use rand::Rng;
use std::sync::{Arc, Mutex, PoisonError};
use tarot_api_types::{Card, ClarificationRequest, SignInRequest, UserResponse, WalletAddress};
use tarot_backend::{Backend, BackendError};
use tarot_deck::{DrawnSet, SPREAD_SIZE, draw_spread, tarot_deck};
use tarot_host::{
    HostRuntime, PayCommand, VerifyCommand, WalletAuthRequest, login_nonce, payment_reference,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RitualConfig;
use crate::session::{AuthPhase, GamePhase, Identity, InFlight, Session};
use crate::view::{View, select_view};

pub const SIGN_IN_FAILED: &str = "Could not sign in with wallet. Please try again.";
pub const VERIFY_FAILED: &str =
    "Identity verification failed. You may have already verified for this action.";
pub const TODAY_CHECK_FAILED: &str = "Could not check for an existing reading. Please try again.";
pub const READING_FAILED: &str =
    "Failed to get your reading. The stars may not be aligned. Please try again.";
pub const PAYMENT_FAILED: &str = "Payment failed. Could not get clarification.";
pub const DRAW_FAILED: &str = "The deck could not be shuffled.";

#[derive(Debug, Error)]
enum CommandError {
    #[error("host: {0:#}")]
    Host(anyhow::Error),
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Rejected(String),
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Host(err)
    }
}

impl CommandError {
    /// Server-supplied detail wins; everything else gets the generic message.
    fn user_message(&self, fallback: &str) -> String {
        match self {
            CommandError::Backend(err) => err.detail().unwrap_or(fallback).to_owned(),
            _ => fallback.to_owned(),
        }
    }
}

pub struct Ritual<H, B> {
    host: H,
    backend: B,
    config: RitualConfig,
    deck: Vec<Card>,
    state: Arc<watch::Sender<Session>>,
    reveals: Mutex<Option<JoinHandle<()>>>,
}

impl<H, B> Ritual<H, B>
where
    H: HostRuntime,
    B: Backend,
{
    pub fn new(host: H, backend: B, config: RitualConfig) -> Self {
        Self::with_deck(host, backend, config, tarot_deck())
    }

    pub fn with_deck(host: H, backend: B, config: RitualConfig, deck: Vec<Card>) -> Self {
        let (state, _) = watch::channel(Session::new(host.is_installed()));
        Self {
            host,
            backend,
            config,
            deck,
            state: Arc::new(state),
            reveals: Mutex::new(None),
        }
    }

    /// Receiver that wakes on every state change, reveals included.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> View {
        self.with(select_view)
    }

    fn with<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.state.borrow())
    }

    fn with_mut<R: Default>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut out = None;
        self.state.send_modify(|session| out = Some(f(session)));
        out.unwrap_or_default()
    }

    /// Claim the in-flight slot and apply `prepare` in the same step.
    fn begin(&self, operation: InFlight, prepare: impl FnOnce(&mut Session)) -> bool {
        self.with_mut(|session| {
            if !session.begin(operation) {
                return false;
            }
            prepare(session);
            true
        })
    }

    pub async fn sign_in(&self) {
        let signed_in = self.with(|session| session.auth == AuthPhase::Authenticated);
        if !self.host.is_installed() || signed_in {
            return;
        }
        let started = self.begin(InFlight::SigningIn, |session| {
            session.auth = AuthPhase::Authenticating;
            session.error = None;
        });
        if !started {
            return;
        }

        match self.authenticate().await {
            Ok(user) => {
                info!("signed in as {}", user.wallet_address);
                let wallet_address = user.wallet_address.clone();
                self.with_mut(|session| {
                    session.identity = Some(Identity {
                        wallet_address: user.wallet_address,
                        username: user.username,
                        verified: user.is_verified,
                    });
                    session.auth = AuthPhase::Authenticated;
                    session.finish();
                });
                if user.is_verified {
                    self.check_todays_reading(&wallet_address).await;
                }
            }
            Err(err) => {
                warn!("sign-in failed: {err}");
                self.with_mut(|session| {
                    session.auth = AuthPhase::Unauthenticated;
                    session.fail(err.user_message(SIGN_IN_FAILED));
                    session.finish();
                });
            }
        }
    }

    async fn authenticate(&self) -> Result<UserResponse, CommandError> {
        let request = WalletAuthRequest {
            nonce: login_nonce()?,
            statement: None,
        };
        let auth = self.host.wallet_auth(request).await?.into_result()?;
        let sign_in = SignInRequest {
            wallet_address: auth.address,
            username: self.host.username(),
        };
        Ok(self.backend.sign_in(&sign_in).await?)
    }

    pub async fn verify_identity(&self) {
        let Some(wallet_address) = self.with(|session| {
            session
                .identity
                .as_ref()
                .filter(|identity| !identity.verified)
                .map(|identity| identity.wallet_address.clone())
        }) else {
            return;
        };
        if !self.begin(InFlight::Verifying, |session| session.error = None) {
            return;
        }

        match self.prove_identity(&wallet_address).await {
            Ok(()) => {
                info!("identity verified for {wallet_address}");
                self.with_mut(|session| {
                    if let Some(identity) = session.identity.as_mut() {
                        identity.verified = true;
                    }
                    session.finish();
                });
            }
            Err(err) => {
                warn!("identity verification failed: {err}");
                self.with_mut(|session| {
                    session.fail(VERIFY_FAILED);
                    session.finish();
                });
            }
        }
    }

    async fn prove_identity(&self, wallet_address: &WalletAddress) -> Result<(), CommandError> {
        let command = VerifyCommand {
            action: self.config.verify_action.clone(),
            signal: None,
            verification_level: self.config.verification_level,
        };
        let proof = self.host.verify(command).await?.into_result()?;
        let response = self.backend.verify(wallet_address, &proof).await?;
        if !response.success {
            return Err(CommandError::Rejected("backend rejected the identity proof".to_owned()));
        }
        Ok(())
    }

    /// Shuffle and deal a fresh face-down spread, then schedule the reveals.
    pub fn draw(&self) {
        self.draw_with_rng(&mut rand::thread_rng());
    }

    pub fn draw_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) {
        if self.with(|session| session.in_flight.is_some()) {
            return;
        }

        let drawn = match draw_spread(&self.deck, rng) {
            Ok(drawn) => drawn,
            Err(err) => {
                warn!("draw failed: {err}");
                self.with_mut(|session| session.fail(DRAW_FAILED));
                return;
            }
        };

        self.cancel_reveals();
        let cycle = self.with_mut(|session| session.start_draw(drawn));
        self.schedule_reveals(cycle);
    }

    fn schedule_reveals(&self, cycle: u64) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no async runtime for reveal timers; revealing draw cycle {cycle} at once");
            self.with_mut(|session| {
                for index in 0..SPREAD_SIZE {
                    session.apply_reveal(cycle, index);
                }
            });
            return;
        }

        // One task per cycle so flips land strictly left to right.
        let state = Arc::clone(&self.state);
        let interval = self.config.reveal_interval;
        let task = tokio::spawn(async move {
            for index in 0..SPREAD_SIZE {
                tokio::time::sleep(interval).await;
                if !state.send_if_modified(|session| session.apply_reveal(cycle, index)) {
                    debug!("draw cycle {cycle} is stale, stopping reveals at {index}");
                    return;
                }
            }
        });
        let mut reveals = self.reveals.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = reveals.replace(task) {
            previous.abort();
        }
    }

    fn cancel_reveals(&self) {
        let mut reveals = self.reveals.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = reveals.take() {
            handle.abort();
        }
    }

    pub async fn fetch_reading(&self) {
        let Some((cards, wallet_address)) = self.with(|session| {
            if session.phase != GamePhase::Drawn {
                return None;
            }
            let cards = session.drawn.as_ref()?.to_vec();
            let wallet_address = session.wallet_address().cloned();
            if session.host_present && wallet_address.is_none() {
                return None;
            }
            Some((cards, wallet_address))
        }) else {
            return;
        };

        let started = self.begin(InFlight::FetchingReading, |session| {
            session.error = None;
            session.phase = GamePhase::Reading;
        });
        if !started {
            return;
        }

        let result = match &wallet_address {
            Some(wallet_address) => self.backend.create_reading(wallet_address, &cards).await,
            None => self.backend.create_guest_reading(&cards).await,
        };

        match result {
            Ok(reading) => {
                info!("reading received");
                self.with_mut(|session| {
                    session.reading = Some(reading);
                    session.phase = GamePhase::Finished;
                    session.finish();
                });
            }
            Err(err) => {
                let err = CommandError::from(err);
                warn!("reading failed: {err}");
                self.cancel_reveals();
                self.with_mut(|session| {
                    session.clear_table();
                    session.fail(err.user_message(READING_FAILED));
                    session.finish();
                });
            }
        }
    }

    async fn check_todays_reading(&self, wallet_address: &WalletAddress) {
        if !self.begin(InFlight::FetchingReading, |_| {}) {
            return;
        }

        let result = match self.backend.todays_reading(wallet_address).await {
            Ok(None) => {
                debug!("no reading yet today for {wallet_address}");
                self.with_mut(Session::finish);
                return;
            }
            Ok(Some(today)) => DrawnSet::face_up(today.drawn_cards)
                .map(|drawn| (drawn, today.reading))
                .map_err(|err| CommandError::Rejected(err.to_string())),
            Err(err) => Err(CommandError::from(err)),
        };

        match result {
            Ok((drawn, reading)) => {
                info!("resumed today's reading for {wallet_address}");
                self.cancel_reveals();
                self.with_mut(|session| {
                    session.restore_today(drawn, reading);
                    session.finish();
                });
            }
            Err(err) => {
                warn!("checking today's reading failed: {err}");
                self.with_mut(|session| {
                    session.fail(err.user_message(TODAY_CHECK_FAILED));
                    session.finish();
                });
            }
        }
    }

    pub async fn get_clarification(&self) {
        if !self.host.is_installed() {
            return;
        }
        let Some(wallet_address) = self.with(|session| {
            session.reading.as_ref()?;
            session.wallet_address().cloned()
        }) else {
            return;
        };
        if !self.begin(InFlight::Paying, |session| session.error = None) {
            return;
        }

        match self.pay_and_clarify(&wallet_address).await {
            Ok(text) => {
                info!("clarification unlocked for {wallet_address}");
                self.with_mut(|session| {
                    if let Some(reading) = session.reading.as_mut() {
                        reading.clarification = Some(text);
                    }
                    session.finish();
                });
            }
            Err(err) => {
                warn!("clarification failed: {err}");
                self.with_mut(|session| {
                    session.fail(err.user_message(PAYMENT_FAILED));
                    session.finish();
                });
            }
        }
    }

    async fn pay_and_clarify(&self, wallet_address: &WalletAddress) -> Result<String, CommandError> {
        let payment = &self.config.payment;
        let command = PayCommand {
            reference: payment_reference(wallet_address)?,
            to: payment.recipient.clone(),
            tokens: vec![payment.token_amount()?],
            description: payment.description.clone(),
        };
        let paid = self.host.pay(command).await?.into_result()?;
        let request = ClarificationRequest {
            reference: Some(paid.reference),
            transaction_id: Some(paid.transaction_id),
        };
        Ok(self.backend.clarification(wallet_address, &request).await?)
    }

    /// Clear the table for a new day and resume any reading the backend holds.
    /// Ignored while another operation is in flight.
    pub async fn reset_for_new_day(&self) {
        if self.with(|session| session.in_flight.is_some()) {
            return;
        }
        self.cancel_reveals();
        let resume = self.with_mut(|session| {
            session.clear_table();
            session.error = None;
            if session.host_present && session.is_verified() {
                session.wallet_address().cloned()
            } else {
                None
            }
        });

        if let Some(wallet_address) = resume {
            self.check_todays_reading(&wallet_address).await;
        }
    }
}

impl<H, B> Drop for Ritual<H, B> {
    fn drop(&mut self) {
        let reveals = self.reveals.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = reveals.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/ritual_tests.rs"]
mod tests;
