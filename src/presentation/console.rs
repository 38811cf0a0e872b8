use super::render::{render_result, status_line, status_message};
use crate::error::Result;
use crate::events::{EventBus, EventFilter, EventReceiver, EviveEvent};
use crate::session::{SessionCommand, SessionHandle};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const KEY_HELP: &str = "Keys: [c] capture  [a] analyze  [r] back to frame  [q] quit";

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Command(SessionCommand),
    Quit,
}

pub fn action_for_key(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Char(' ') => {
            Some(KeyAction::Command(SessionCommand::Capture))
        }
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Enter => {
            Some(KeyAction::Command(SessionCommand::Analyze))
        }
        KeyCode::Char('r') | KeyCode::Char('R') => Some(KeyAction::Command(SessionCommand::Reset)),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Raw mode needs explicit carriage returns
pub fn raw_mode_text(text: &str) -> String {
    text.replace('\n', "\r\n")
}

/// Terminal front end: forwards key presses into the session and prints
/// what the session reports back.
pub struct Console {
    session: SessionHandle,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl Console {
    pub fn new(session: SessionHandle, event_bus: Arc<EventBus>) -> Self {
        Self {
            session,
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start the key reader and the renderer
    pub async fn start(&self) -> Result<()> {
        info!("Starting console - {}", KEY_HELP);
        print_raw(&format!("{}\n{}\n", KEY_HELP, status_line(&self.session.state())));

        self.spawn_renderer();
        self.spawn_key_reader();

        Ok(())
    }

    fn spawn_renderer(&self) -> JoinHandle<()> {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::EventTypes(vec![
                "state_changed",
                "capture_completed",
                "analysis_completed",
                "operation_failed",
                "command_rejected",
            ]),
            "console".to_string(),
        );
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    event = receiver.recv() => match event {
                        Ok(event) => event,
                        Err(_) => break,
                    },
                };

                if let Some(text) = render_event(&event) {
                    print_raw(&text);
                }
            }
            debug!("Console renderer exited");
        })
    }

    fn spawn_key_reader(&self) -> JoinHandle<()> {
        let session = self.session.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for console input: {}", e);
                return;
            }

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Console key reader stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        match action_for_key(key_event.code) {
                            Some(KeyAction::Command(command)) => {
                                if let Err(e) = session.try_send(command) {
                                    warn!("Dropped {} key press: {}", command.name(), e);
                                }
                            }
                            Some(KeyAction::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                let _ = event_bus.publish(EviveEvent::ShutdownRequested {
                                    timestamp: SystemTime::now(),
                                    reason: "User requested via keyboard".to_string(),
                                });
                                break;
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for key events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Console key reader exited");
        })
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping console");
        self.cancellation_token.cancel();

        // Let the key reader leave its poll loop and restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

/// Text printed for an event; state changes only show the busy states
fn render_event(event: &EviveEvent) -> Option<String> {
    match event {
        EviveEvent::StateChanged { to, .. } => match *to {
            "Capturing" => Some("Capturing...\n".to_string()),
            "Analyzing" => Some("Analyzing...\n".to_string()),
            _ => None,
        },
        EviveEvent::AnalysisCompleted { result, .. } => Some(format!(
            "{}\n\n{}\n\n{}\n",
            status_message(event)?,
            render_result(result),
            KEY_HELP
        )),
        _ => status_message(event).map(|message| format!("{}\n", message)),
    }
}

fn print_raw(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(raw_mode_text(text).as_bytes());
    let _ = stdout.flush();
}
