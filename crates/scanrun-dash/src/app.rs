//! Front ends driving a [`RunOrchestrator`]: the interactive dashboard and a
//! plain line-oriented printer for scripts and non-interactive terminals.

use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use scanrun_core::RunPayload;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::orchestrator::RunOrchestrator;
use crate::state::RunView;
use crate::ui;

/// Presentation state that is not part of the run itself.
#[derive(Debug, Clone)]
pub struct UiState {
    /// Which backend the dashboard talks to (shown in the title).
    pub backend_label: String,

    /// Last action outcome shown in the footer.
    pub status_message: Option<String>,

    /// Backend offers cancellation.
    pub can_cancel: bool,
}

impl UiState {
    pub fn new(backend_label: impl Into<String>, can_cancel: bool) -> Self {
        Self {
            backend_label: backend_label.into(),
            status_message: None,
            can_cancel,
        }
    }
}

/// Interactive dashboard over one orchestrator.
pub struct App {
    orchestrator: Arc<RunOrchestrator>,
    payload: RunPayload,
    runtime: Handle,
    view_rx: watch::Receiver<RunView>,
    ui: UiState,
    notice_tx: mpsc::UnboundedSender<String>,
    notice_rx: mpsc::UnboundedReceiver<String>,
}

impl App {
    /// Create the dashboard. `payload` is resubmitted by the new-run key.
    pub fn new(
        orchestrator: Arc<RunOrchestrator>,
        payload: RunPayload,
        runtime: Handle,
        ui: UiState,
    ) -> Self {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        Self {
            view_rx: orchestrator.subscribe(),
            orchestrator,
            payload,
            runtime,
            ui,
            notice_tx,
            notice_rx,
        }
    }

    /// Run the main event loop until the user quits.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> std::io::Result<()> {
        loop {
            let view = self.view_rx.borrow_and_update().clone();
            terminal.draw(|frame| ui::render(frame, &view, &self.ui))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c');
                    if key.kind == KeyEventKind::Press && (ctrl_c || self.handle_key(key.code)) {
                        break;
                    }
                }
            }

            while let Ok(notice) = self.notice_rx.try_recv() {
                self.ui.status_message = Some(notice);
            }
        }

        info!("Dashboard closed");
        Ok(())
    }

    /// Handle a key press.
    ///
    /// Returns true if the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') => {
                if !self.ui.can_cancel {
                    self.ui.status_message = Some("Cancel is not supported by this backend".into());
                    return false;
                }
                self.ui.status_message = Some("Cancelling...".to_string());
                let orchestrator = self.orchestrator.clone();
                let notices = self.notice_tx.clone();
                self.runtime.spawn(async move {
                    let notice = match orchestrator.cancel_run().await {
                        Ok(true) => "Cancel requested".to_string(),
                        Ok(false) => "Nothing to cancel".to_string(),
                        Err(e) => format!("Cancel failed: {}", e),
                    };
                    let _ = notices.send(notice);
                });
            }
            KeyCode::Char('n') => {
                self.ui.status_message = Some("Starting new run...".to_string());
                let orchestrator = self.orchestrator.clone();
                let payload = self.payload.clone();
                let notices = self.notice_tx.clone();
                self.runtime.spawn(async move {
                    let notice = match orchestrator.start_run(&payload).await {
                        Ok(run_id) => format!("Started {}", run_id),
                        Err(e) => format!("Start failed: {}", e),
                    };
                    let _ = notices.send(notice);
                });
            }
            _ => {}
        }
        false
    }
}

/// Cancel the active run once `after` has elapsed.
pub fn schedule_cancel(orchestrator: Arc<RunOrchestrator>, after: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        match orchestrator.cancel_run().await {
            Ok(true) => info!(after_secs = after.as_secs_f64(), "Scheduled cancel sent"),
            Ok(false) => info!("Scheduled cancel skipped, nothing to cancel"),
            Err(e) => warn!(error = %e, "Scheduled cancel failed"),
        }
    })
}

/// Print status changes and new log lines to stdout until the run settles.
///
/// The first Ctrl-C cancels the run; a second one stops watching.
pub async fn run_plain(orchestrator: Arc<RunOrchestrator>) -> RunView {
    let mut rx = orchestrator.subscribe();
    let mut printed = 0;
    let mut last_status = String::new();
    let mut cancel_sent = false;

    loop {
        {
            let view = rx.borrow_and_update();
            for line in view.logs.iter().skip(printed) {
                println!("  {}", line);
            }
            printed = view.logs.len();

            let status = ui::status_line(&view);
            if status != last_status {
                println!("{}", status);
                last_status = status;
            }

            if view.is_settled() {
                break;
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if cancel_sent {
                    warn!("Interrupted again, no longer waiting for the run");
                    break;
                }
                cancel_sent = true;
                match orchestrator.cancel_run().await {
                    Ok(true) => println!("Cancel requested"),
                    Ok(false) => println!("Cancel is not available"),
                    Err(e) => println!("Cancel failed: {}", e),
                }
            }
        }
    }

    let view = orchestrator.view();
    match (&view.results, &view.results_error) {
        (Some(results), _) => {
            println!("Results:");
            for line in ui::results_lines(results) {
                println!("  {}", line);
            }
        }
        (None, Some(error)) => println!("Results unavailable: {}", error),
        (None, None) => {}
    }
    view
}
