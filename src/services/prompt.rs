//! Yes/no confirmations and user-facing notices
//!
//! The daemon has no windows of its own. A confirmation is published on the
//! prompt board and stays pending until a client answers it over HTTP.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

const MAX_NOTICES: usize = 20;

/// Which protocol is asking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    TaskSwitch,
    Inactivity,
}

/// A yes/no question for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub kind: ConfirmationKind,
    pub message: String,
}

impl Confirmation {
    pub fn task_switch(message: String) -> Self {
        Self {
            kind: ConfirmationKind::TaskSwitch,
            message,
        }
    }

    pub fn inactivity(message: String) -> Self {
        Self {
            kind: ConfirmationKind::Inactivity,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Status-line message with a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// UI surface needed by the coordinator
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question; `true` only on an explicit yes
    async fn confirm(&self, confirmation: Confirmation) -> bool;
    /// Show a notification without waiting for a reply
    fn notify(&self, level: NoticeLevel, message: String);
}

/// Confirmation waiting for an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPrompt {
    pub id: u64,
    pub kind: ConfirmationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerError {
    #[error("no confirmation is pending")]
    NoPending,
    #[error("confirmation {given} is not the pending one ({current})")]
    Stale { given: u64, current: u64 },
    #[error("the asking side has gone away")]
    Closed,
}

#[derive(Debug, Default)]
struct BoardInner {
    next_id: u64,
    pending: Option<(PendingPrompt, oneshot::Sender<bool>)>,
    notices: VecDeque<Notice>,
}

/// Prompter answered through the HTTP API
#[derive(Debug)]
pub struct PromptBoard {
    inner: Mutex<BoardInner>,
    prompt_tx: watch::Sender<Option<PendingPrompt>>,
}

impl PromptBoard {
    pub fn new() -> Self {
        let (prompt_tx, _) = watch::channel(None);
        Self {
            inner: Mutex::new(BoardInner::default()),
            prompt_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Prompt board lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// The confirmation currently waiting, if any
    pub fn pending(&self) -> Option<PendingPrompt> {
        self.lock().pending.as_ref().map(|(prompt, _)| prompt.clone())
    }

    /// Watch pending prompts appear and disappear
    pub fn subscribe(&self) -> watch::Receiver<Option<PendingPrompt>> {
        self.prompt_tx.subscribe()
    }

    /// Answer the pending confirmation with the given id
    pub fn answer(&self, id: u64, confirm: bool) -> Result<(), AnswerError> {
        let mut inner = self.lock();
        let current = match &inner.pending {
            Some((prompt, _)) => prompt.id,
            None => return Err(AnswerError::NoPending),
        };
        if current != id {
            return Err(AnswerError::Stale { given: id, current });
        }
        let (prompt, responder) = inner.pending.take().ok_or(AnswerError::NoPending)?;
        drop(inner);

        self.prompt_tx.send_replace(None);
        info!(
            "Confirmation {} ({:?}) answered: {}",
            prompt.id,
            prompt.kind,
            if confirm { "yes" } else { "no" }
        );
        responder.send(confirm).map_err(|_| AnswerError::Closed)
    }

    /// Most recent notices, oldest first
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().notices.iter().cloned().collect()
    }
}

impl Default for PromptBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for PromptBoard {
    async fn confirm(&self, confirmation: Confirmation) -> bool {
        let (responder, answer) = oneshot::channel();
        let prompt = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let prompt = PendingPrompt {
                id: inner.next_id,
                kind: confirmation.kind,
                message: confirmation.message,
                created_at: Utc::now(),
            };
            // A replaced prompt's asker sees a closed channel, i.e. "no"
            inner.pending = Some((prompt.clone(), responder));
            prompt
        };

        info!("Awaiting confirmation {}: {}", prompt.id, prompt.message);
        self.prompt_tx.send_replace(Some(prompt.clone()));

        match answer.await {
            Ok(confirmed) => confirmed,
            Err(_) => {
                debug!("Confirmation {} dropped without an answer", prompt.id);
                false
            }
        }
    }

    fn notify(&self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Info => info!("Notice: {}", message),
            NoticeLevel::Warning => warn!("Notice: {}", message),
            NoticeLevel::Error => error!("Notice: {}", message),
        }
        let mut inner = self.lock();
        if inner.notices.len() == MAX_NOTICES {
            inner.notices.pop_front();
        }
        inner.notices.push_back(Notice {
            level,
            message,
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn wait_for_prompt(board: &PromptBoard) -> PendingPrompt {
        let mut rx = board.subscribe();
        loop {
            if let Some(prompt) = rx.borrow_and_update().clone() {
                return prompt;
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn answer_resolves_pending_confirmation() {
        let board = Arc::new(PromptBoard::new());
        let asker = Arc::clone(&board);
        let handle = tokio::spawn(async move {
            asker
                .confirm(Confirmation::task_switch("Log 10 min?".to_string()))
                .await
        });

        let prompt = wait_for_prompt(&board).await;
        assert_eq!(prompt.kind, ConfirmationKind::TaskSwitch);
        assert_eq!(prompt.message, "Log 10 min?");

        board.answer(prompt.id, true).unwrap();
        assert!(handle.await.unwrap());
        assert!(board.pending().is_none());
    }

    #[tokio::test]
    async fn wrong_id_is_rejected_and_prompt_stays() {
        let board = Arc::new(PromptBoard::new());
        let asker = Arc::clone(&board);
        let handle = tokio::spawn(async move {
            asker
                .confirm(Confirmation::inactivity("Idle?".to_string()))
                .await
        });

        let prompt = wait_for_prompt(&board).await;
        assert_eq!(
            board.answer(prompt.id + 1, true),
            Err(AnswerError::Stale {
                given: prompt.id + 1,
                current: prompt.id
            })
        );
        assert!(board.pending().is_some());

        board.answer(prompt.id, false).unwrap();
        assert!(!handle.await.unwrap());
    }

    #[test]
    fn answering_without_prompt_fails() {
        let board = PromptBoard::new();
        assert_eq!(board.answer(1, true), Err(AnswerError::NoPending));
    }

    #[test]
    fn notices_are_bounded() {
        let board = PromptBoard::new();
        for i in 0..(MAX_NOTICES + 5) {
            board.notify(NoticeLevel::Info, format!("notice {}", i));
        }
        let notices = board.notices();
        assert_eq!(notices.len(), MAX_NOTICES);
        assert_eq!(notices[0].message, "notice 5");
        assert_eq!(notices.last().unwrap().message, format!("notice {}", MAX_NOTICES + 4));
    }
}
