//! Text rendering of the session.
//!
//! Pure functions from `(Session, View)` to the frame printed after every
//! state change. Input handling lives in `main`.

use std::fmt::Write as _;
use tarot_api_types::Card;
use tarot_session::{Action, ActionButton, InFlight, Session, View};

pub const DEGRADED_NOTICE: &str =
    "Open this app inside World App to sign in. Guest readings are still available.";

pub fn label(action: Action) -> &'static str {
    match action {
        Action::SignIn => "Sign in with wallet",
        Action::Verify => "Verify with World ID",
        Action::Draw => "Draw your cards",
        Action::RevealFate => "Reveal your fate",
        Action::Clarify => "Get clarification",
        Action::NewReading => "New reading",
    }
}

fn in_flight_label(operation: InFlight) -> &'static str {
    match operation {
        InFlight::SigningIn => "Signing in",
        InFlight::Verifying => "Verifying",
        InFlight::FetchingReading => "Consulting the stars",
        InFlight::Paying => "Processing payment",
    }
}

fn card_face(card: &Card, revealed: bool) -> String {
    if !revealed {
        return "[ ? ]".to_owned();
    }
    if card.orientation.is_reversed() {
        format!("[{} (reversed)]", card.name)
    } else {
        format!("[{}]", card.name)
    }
}

fn button_hint(key: &str, button: ActionButton) -> String {
    if button.enabled {
        format!("  {key:>7}  {}", label(button.action))
    } else {
        format!("  {key:>7}  {} (busy)", label(button.action))
    }
}

pub fn frame(session: &Session, view: &View) -> String {
    let mut out = String::from("\n=== Daily Tarot ===\n");

    if view.degraded_notice {
        let _ = writeln!(out, "{DEGRADED_NOTICE}");
    }
    if let Some(name) = &view.greeting {
        let _ = writeln!(out, "Welcome, {name}");
    }

    if let Some(drawn) = &session.drawn {
        let faces: Vec<String> = drawn
            .cards()
            .iter()
            .zip(drawn.revealed())
            .map(|(card, revealed)| card_face(card, revealed))
            .collect();
        let _ = writeln!(out, "\n  {}", faces.join("  "));
    }

    if let Some(reading) = &session.reading {
        let _ = writeln!(out, "\n{}", reading.text);
        if let Some(clarification) = &reading.clarification {
            let _ = writeln!(out, "\nClarification: {clarification}");
        }
    }

    if let (true, Some(operation)) = (view.spinner, session.in_flight) {
        let _ = writeln!(out, "\n{}...", in_flight_label(operation));
    }
    if let Some(error) = &view.error {
        let _ = writeln!(out, "\n! {error}");
    }

    out.push('\n');
    if let Some(primary) = view.primary {
        let _ = writeln!(out, "{}", button_hint("enter", primary));
    }
    if let Some(panel) = view.reading_panel {
        if let Some(clarify) = panel.clarify {
            let _ = writeln!(out, "{}", button_hint("c", clarify));
        }
        let _ = writeln!(out, "{}", button_hint("n", panel.new_reading));
    }
    let _ = write!(out, "  {:>7}  Quit\n> ", "q");
    out
}
