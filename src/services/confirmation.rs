//! Confirmation service for destructive actions

use std::io::{BufRead, Write};
use async_trait::async_trait;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationPrompt {
    LeaveEvent { title: String },
    DeleteReview,
    DeleteEvent { title: String },
}

impl ConfirmationPrompt {
    pub fn message(&self) -> String {
        match self {
            ConfirmationPrompt::LeaveEvent { title } => {
                format!("Are you sure you want to leave \"{}\"?", title)
            }
            ConfirmationPrompt::DeleteReview => "Are you sure you want to delete your review?".to_string(),
            ConfirmationPrompt::DeleteEvent { title } => {
                format!("Delete \"{}\"? This cannot be undone.", title)
            }
        }
    }
}

/// Asks the user to approve a destructive action
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool;
}

/// Answers every prompt the same way
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool {
        debug!(prompt = %prompt.message(), answer = self.0, "Auto-answering confirmation");
        self.0
    }
}

/// y/N prompt on the controlling terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool {
        let message = prompt.message();
        let answer = tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            write!(stdout, "{} [y/N] ", message)?;
            stdout.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok::<_, std::io::Error>(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read confirmation");
                false
            }
            Err(e) => {
                warn!(error = %e, "Confirmation prompt task failed");
                false
            }
        }
    }
}
