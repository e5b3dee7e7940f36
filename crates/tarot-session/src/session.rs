//! The client state container.
//!
//! Everything the ritual knows lives in one `Session` value owned by the
//! orchestrator. The transitions here are synchronous; the async handlers in
//! `ritual` call them before and after each external call.

use tarot_api_types::{Reading, WalletAddress};
use tarot_deck::DrawnSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Initial,
    Drawn,
    Reading,
    Finished,
}

/// The one operation allowed to be awaiting an external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlight {
    SigningIn,
    Verifying,
    FetchingReading,
    Paying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub wallet_address: WalletAddress,
    pub username: Option<String>,
    pub verified: bool,
}

impl Identity {
    pub fn greeting_name(&self) -> String {
        match self.username.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => self.wallet_address.shortened(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub host_present: bool,
    pub auth: AuthPhase,
    pub identity: Option<Identity>,
    pub phase: GamePhase,
    pub drawn: Option<DrawnSet>,
    pub reading: Option<Reading>,
    pub error: Option<String>,
    pub in_flight: Option<InFlight>,
    /// Bumped whenever the drawn set is replaced or cleared.
    pub draw_cycle: u64,
}

impl Session {
    pub fn new(host_present: bool) -> Self {
        Self {
            host_present,
            ..Self::default()
        }
    }

    pub fn is_verified(&self) -> bool {
        self.identity.as_ref().is_some_and(|identity| identity.verified)
    }

    pub fn wallet_address(&self) -> Option<&WalletAddress> {
        self.identity.as_ref().map(|identity| &identity.wallet_address)
    }

    pub fn all_revealed(&self) -> bool {
        self.drawn.as_ref().is_some_and(DrawnSet::all_revealed)
    }

    /// Claim the in-flight slot. Returns false if another operation holds it.
    pub fn begin(&mut self, operation: InFlight) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        self.in_flight = Some(operation);
        true
    }

    pub fn finish(&mut self) {
        self.in_flight = None;
    }

    /// Replace the table with a fresh face-down spread. Returns the new cycle.
    pub fn start_draw(&mut self, drawn: DrawnSet) -> u64 {
        self.error = None;
        self.reading = None;
        self.drawn = Some(drawn);
        self.phase = GamePhase::Drawn;
        self.draw_cycle += 1;
        self.draw_cycle
    }

    /// Apply a scheduled reveal. Ignored when `cycle` is stale or the flip
    /// would not be the leftmost face-down card.
    pub fn apply_reveal(&mut self, cycle: u64, index: usize) -> bool {
        if cycle != self.draw_cycle || self.phase != GamePhase::Drawn {
            return false;
        }
        match self.drawn.as_mut() {
            Some(drawn) => drawn.reveal(index),
            None => false,
        }
    }

    pub fn clear_table(&mut self) {
        self.drawn = None;
        self.reading = None;
        self.phase = GamePhase::Initial;
        self.draw_cycle += 1;
    }

    /// Resume a reading the backend already holds for today.
    pub fn restore_today(&mut self, drawn: DrawnSet, reading: Reading) {
        let mut drawn = drawn;
        drawn.reveal_all();
        self.drawn = Some(drawn);
        self.reading = Some(reading);
        self.phase = GamePhase::Finished;
        self.draw_cycle += 1;
        if let Some(identity) = self.identity.as_mut() {
            identity.verified = true;
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}
