pub mod config;
pub mod ritual;
pub mod session;
pub mod view;

pub use config::{PaymentConfig, RitualConfig};
pub use ritual::Ritual;
pub use session::{AuthPhase, GamePhase, Identity, InFlight, Session};
pub use view::{Action, ActionButton, ReadingPanel, View, select_view};
