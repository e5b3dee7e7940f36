use crate::session::{AuthPhase, GamePhase, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SignIn,
    Verify,
    Draw,
    RevealFate,
    Clarify,
    NewReading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionButton {
    pub action: Action,
    pub enabled: bool,
}

impl ActionButton {
    fn new(action: Action, enabled: bool) -> Self {
        Self { action, enabled }
    }
}

/// Shown once a reading is on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingPanel {
    pub clarify: Option<ActionButton>,
    pub new_reading: ActionButton,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub primary: Option<ActionButton>,
    pub spinner: bool,
    pub reading_panel: Option<ReadingPanel>,
    pub degraded_notice: bool,
    pub greeting: Option<String>,
    pub error: Option<String>,
}

pub fn select_view(session: &Session) -> View {
    let greeting = match (session.auth, session.identity.as_ref()) {
        (AuthPhase::Authenticated, Some(identity)) => Some(identity.greeting_name()),
        _ => None,
    };

    View {
        primary: primary_action(session),
        spinner: session.in_flight.is_some(),
        reading_panel: reading_panel(session),
        degraded_notice: !session.host_present,
        greeting,
        error: session.error.clone(),
    }
}

/// The single main button, if any.
pub fn primary_action(session: &Session) -> Option<ActionButton> {
    let idle = session.in_flight.is_none();
    let revealed = session.all_revealed();
    let verified = session.is_verified();

    match (session.host_present, session.auth, verified, session.phase, revealed, idle) {
        (_, _, _, GamePhase::Finished, _, _) => None,

        (false, _, _, GamePhase::Initial, _, true) => Some(ActionButton::new(Action::Draw, true)),
        (false, _, _, GamePhase::Drawn, true, true) => {
            Some(ActionButton::new(Action::RevealFate, true))
        }
        (false, ..) => None,

        (true, AuthPhase::Unauthenticated | AuthPhase::Authenticating, ..) => {
            Some(ActionButton::new(Action::SignIn, idle))
        }
        (true, AuthPhase::Authenticated, false, ..) => Some(ActionButton::new(Action::Verify, idle)),
        (true, AuthPhase::Authenticated, true, GamePhase::Initial, _, _) => {
            Some(ActionButton::new(Action::Draw, idle))
        }
        (true, AuthPhase::Authenticated, true, GamePhase::Drawn, true, true) => {
            Some(ActionButton::new(Action::RevealFate, true))
        }
        _ => None,
    }
}

fn reading_panel(session: &Session) -> Option<ReadingPanel> {
    if session.phase != GamePhase::Finished {
        return None;
    }
    let reading = session.reading.as_ref()?;
    let idle = session.in_flight.is_none();

    let clarify = (session.host_present
        && session.identity.is_some()
        && reading.clarification.is_none())
    .then(|| ActionButton::new(Action::Clarify, idle));

    Some(ReadingPanel {
        clarify,
        new_reading: ActionButton::new(Action::NewReading, idle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Identity, InFlight};
    use tarot_api_types::{Reading, WalletAddress};
    use tarot_deck::{DrawnSet, tarot_deck};

    fn spread(revealed: usize) -> DrawnSet {
        let mut set = DrawnSet::face_down(tarot_deck().into_iter().take(3).collect()).unwrap();
        for index in 0..revealed {
            set.reveal(index);
        }
        set
    }

    fn signed_in(verified: bool) -> Session {
        let mut session = Session::new(true);
        session.auth = AuthPhase::Authenticated;
        session.identity = Some(Identity {
            wallet_address: WalletAddress("0xAA00000000000000000000000000000000000001".to_owned()),
            username: None,
            verified,
        });
        session
    }

    fn button(action: Action, enabled: bool) -> Option<ActionButton> {
        Some(ActionButton { action, enabled })
    }

    #[test]
    fn host_present_unauthenticated_offers_sign_in() {
        let mut session = Session::new(true);
        assert_eq!(primary_action(&session), button(Action::SignIn, true));

        session.auth = AuthPhase::Authenticating;
        session.in_flight = Some(InFlight::SigningIn);
        assert_eq!(primary_action(&session), button(Action::SignIn, false));
        assert!(select_view(&session).spinner);
    }

    #[test]
    fn unverified_identity_offers_verify() {
        let mut session = signed_in(false);
        assert_eq!(primary_action(&session), button(Action::Verify, true));

        session.in_flight = Some(InFlight::Verifying);
        assert_eq!(primary_action(&session), button(Action::Verify, false));
    }

    #[test]
    fn verified_identity_walks_draw_then_reveal() {
        let mut session = signed_in(true);
        assert_eq!(primary_action(&session), button(Action::Draw, true));

        session.in_flight = Some(InFlight::FetchingReading);
        assert_eq!(primary_action(&session), button(Action::Draw, false));
        session.in_flight = None;

        session.phase = GamePhase::Drawn;
        session.drawn = Some(spread(2));
        assert_eq!(primary_action(&session), None);

        session.drawn = Some(spread(3));
        assert_eq!(primary_action(&session), button(Action::RevealFate, true));

        session.phase = GamePhase::Reading;
        session.in_flight = Some(InFlight::FetchingReading);
        assert_eq!(primary_action(&session), None);
    }

    #[test]
    fn degraded_mode_has_its_own_path() {
        let mut session = Session::new(false);
        let view = select_view(&session);
        assert!(view.degraded_notice);
        assert_eq!(view.primary, button(Action::Draw, true));

        session.phase = GamePhase::Drawn;
        session.drawn = Some(spread(1));
        assert_eq!(primary_action(&session), None);

        session.drawn = Some(spread(3));
        assert_eq!(primary_action(&session), button(Action::RevealFate, true));

        session.in_flight = Some(InFlight::FetchingReading);
        assert_eq!(primary_action(&session), None);
    }

    #[test]
    fn finished_shows_reading_panel_only() {
        let mut session = signed_in(true);
        session.phase = GamePhase::Finished;
        session.drawn = Some(spread(3));
        session.reading = Some(Reading {
            text: "The tide turns.".to_owned(),
            clarification: None,
        });

        let view = select_view(&session);
        assert_eq!(view.primary, None);
        let panel = view.reading_panel.unwrap();
        assert_eq!(panel.clarify, button(Action::Clarify, true));
        assert!(panel.new_reading.enabled);
        assert_eq!(view.greeting.as_deref(), Some("0xAA00...0001"));

        session.in_flight = Some(InFlight::Paying);
        let panel = select_view(&session).reading_panel.unwrap();
        assert_eq!(panel.clarify, button(Action::Clarify, false));

        session.in_flight = None;
        session.reading.as_mut().unwrap().clarification = Some("Go east.".to_owned());
        let panel = select_view(&session).reading_panel.unwrap();
        assert_eq!(panel.clarify, None);
    }

    #[test]
    fn guest_readings_cannot_be_clarified() {
        let mut session = Session::new(false);
        session.phase = GamePhase::Finished;
        session.reading = Some(Reading {
            text: "A guest's fortune.".to_owned(),
            clarification: None,
        });

        let panel = select_view(&session).reading_panel.unwrap();
        assert_eq!(panel.clarify, None);
        assert_eq!(select_view(&session).greeting, None);
    }
}
