mod render;

use std::io::Write as _;
use std::sync::Arc;
use tarot_backend::HttpBackend;
use tarot_host::NoHostRuntime;
use tarot_session::{Action, ActionButton, Ritual, RitualConfig, View};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

type TerminalRitual = Ritual<NoHostRuntime, HttpBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Run(Action),
    Quit,
    Ignore,
}

fn enabled(button: Option<ActionButton>) -> Option<Action> {
    button.filter(|b| b.enabled).map(|b| b.action)
}

/// Map a typed line onto whichever action the current view allows.
fn interpret(line: &str, view: &View) -> Input {
    let action = match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" => return Input::Quit,
        "" => enabled(view.primary),
        "c" => enabled(view.reading_panel.and_then(|panel| panel.clarify)),
        "n" => enabled(view.reading_panel.map(|panel| panel.new_reading)),
        _ => None,
    };
    action.map_or(Input::Ignore, Input::Run)
}

fn spawn_action(ritual: &Arc<TerminalRitual>, action: Action) {
    let ritual = Arc::clone(ritual);
    tokio::spawn(async move {
        match action {
            Action::SignIn => ritual.sign_in().await,
            Action::Verify => ritual.verify_identity().await,
            Action::Draw => ritual.draw(),
            Action::RevealFate => ritual.fetch_reading().await,
            Action::Clarify => ritual.get_clarification().await,
            Action::NewReading => ritual.reset_for_new_day().await,
        }
    });
}

fn draw_frame(ritual: &TerminalRitual) -> std::io::Result<()> {
    let session = ritual.snapshot();
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(render::frame(&session, &ritual.view()).as_bytes())?;
    stdout.flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = RitualConfig::from_env()?;
    let backend = HttpBackend::new(None);
    info!("tarot-terminal using backend {}", backend.endpoint());

    let ritual = Arc::new(Ritual::new(NoHostRuntime, backend, config));
    let mut updates = ritual.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    draw_frame(&ritual)?;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                updates.borrow_and_update();
                draw_frame(&ritual)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match interpret(&line, &ritual.view()) {
                    Input::Run(action) => {
                        debug!("dispatching {action:?}");
                        spawn_action(&ritual, action);
                    }
                    Input::Quit => break,
                    Input::Ignore => draw_frame(&ritual)?,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("goodbye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarot_api_types::Reading;
    use tarot_session::{GamePhase, InFlight, Session, select_view};

    #[test]
    fn enter_runs_the_primary_action() {
        let view = select_view(&Session::new(false));
        assert_eq!(interpret("", &view), Input::Run(Action::Draw));
        assert_eq!(interpret("c", &view), Input::Ignore);
        assert_eq!(interpret(" Q ", &view), Input::Quit);
    }

    #[test]
    fn disabled_buttons_ignore_input() {
        let mut session = Session::new(true);
        session.in_flight = Some(InFlight::SigningIn);
        assert_eq!(interpret("", &select_view(&session)), Input::Ignore);
    }

    #[test]
    fn reading_panel_keys() {
        let mut session = Session::new(false);
        session.phase = GamePhase::Finished;
        session.reading = Some(Reading {
            text: "Patience.".to_owned(),
            clarification: None,
        });
        let view = select_view(&session);

        assert_eq!(interpret("", &view), Input::Ignore);
        assert_eq!(interpret("n", &view), Input::Run(Action::NewReading));
        assert_eq!(interpret("c", &view), Input::Ignore);
    }
}
