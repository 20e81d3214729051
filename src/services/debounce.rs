//! Debounced search input
//!
//! Raw keystrokes go in through [`Debouncer::push`]; a term comes out on the
//! effective-term channel only after the input has been quiet for the
//! configured delay. A keystroke inside the quiet period replaces the
//! pending term and restarts the timer, so a burst of typing produces one
//! effective term.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    error::{AppError, AppResult},
    services::controller::SearchController,
};

#[derive(Clone)]
pub struct Debouncer {
    input_tx: mpsc::UnboundedSender<String>,
}

impl Debouncer {
    /// Spawns the debounce task and returns the input handle plus the
    /// receiver of effective terms
    pub fn spawn(delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();

        tokio::spawn(debounce_task(delay, input_rx, output_tx));

        (Self { input_tx }, output_rx)
    }

    /// Feeds one raw keystroke's worth of search text
    pub fn push(&self, raw: impl Into<String>) -> AppResult<()> {
        self.input_tx
            .send(raw.into())
            .map_err(|_| AppError::Internal("Search input debouncer has stopped".to_string()))
    }
}

async fn debounce_task(
    delay: Duration,
    mut input_rx: mpsc::UnboundedReceiver<String>,
    output_tx: mpsc::UnboundedSender<String>,
) {
    let mut pending: Option<String> = None;

    loop {
        match pending.take() {
            None => match input_rx.recv().await {
                Some(raw) => pending = Some(raw),
                None => break,
            },
            Some(term) => {
                tokio::select! {
                    next = input_rx.recv() => match next {
                        Some(raw) => pending = Some(raw),
                        None => break,
                    },
                    _ = tokio::time::sleep(delay) => {
                        tracing::debug!(term = %term, "Search input settled");
                        if output_tx.send(term).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    tracing::debug!("Search debouncer stopped");
}

/// Starts a session for every effective term that differs from the live one
///
/// Sessions are started on their own tasks, so a slow fetch never holds up
/// the next term; superseded responses are dropped by the controller.
pub fn spawn_session_driver(
    controller: SearchController,
    mut effective_rx: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(term) = effective_rx.recv().await {
            if controller.effective_term().await == term {
                tracing::debug!(term = %term, "Effective term unchanged");
                continue;
            }

            let controller = controller.clone();
            tokio::spawn(async move {
                controller.start_session(&term).await;
            });
        }
    })
}
