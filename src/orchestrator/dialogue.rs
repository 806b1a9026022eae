//! Courtroom dialogue: opening statements and answers to the judge.
//!
//! Each turn is one queued task. The task builds the prompt, sends it with
//! rate-limit backoff, streams the answer through the decoder into a
//! [`DialogueSink`], and records the finished text in the session. A failed turn
//! shows an error message in place of the answer and is never retried past the
//! backoff schedule.

use std::pin::pin;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::backoff::{BackoffPolicy, RetryNotice, send_with_backoff};
use crate::cases::Case;
use crate::config::TribunalConfig;
use crate::errors::{DialogueError, InferenceError};
use crate::inference::{GenerateRequest, GenerationClient, GenerationConfig};
use crate::prompts::{OPENING_USER_TEXT, build_opening_instruction, build_reply_instruction};
use crate::queue::RequestQueue;
use crate::session::{DialogueTurn, Role, Session};
use crate::stream::{StreamEvent, decode_stream};

/// Shown instead of a turn when no API key is configured.
pub const MISSING_KEY_MESSAGE: &str = "API 키 설정이 되어있지 않습니다.";

/// Prefix of every failed-turn message.
pub const ERROR_PREFIX: &str = "오류가 발생했습니다: ";

/// Receives the live state of dialogue turns.
pub trait DialogueSink: Send + Sync {
    /// A turn for `role` is about to be requested.
    fn pending(&self, role: Role);
    /// The service is rate limiting; the turn is waiting before a retry.
    fn retry_notice(&self, role: Role, notice: &RetryNotice);
    /// Replacement display markup for the turn in progress.
    fn display(&self, role: Role, markup: &str);
    /// The turn finished; `text` is the raw generated text.
    fn finished(&self, role: Role, text: &str);
    /// The turn failed; `message` replaces it.
    fn error(&self, role: Role, message: &str);
}

/// How a queued turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed(String),
    Failed(String),
}

pub type TurnHandle = oneshot::Receiver<TurnOutcome>;

/// Generation parameters and per-call-site messages.
#[derive(Debug, Clone)]
pub struct DialogueSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub opening_rate_limited: String,
    pub reply_rate_limited: String,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        let config = crate::config::TribunalToml::default();
        Self {
            temperature: config.inference.temperature,
            max_output_tokens: config.inference.max_output_tokens,
            opening_rate_limited: config.messages.opening_rate_limited,
            reply_rate_limited: config.messages.reply_rate_limited,
        }
    }
}

impl DialogueSettings {
    pub fn from_config(config: &TribunalConfig) -> Self {
        Self {
            temperature: config.inference().temperature,
            max_output_tokens: config.inference().max_output_tokens,
            opening_rate_limited: config.messages().opening_rate_limited.clone(),
            reply_rate_limited: config.messages().reply_rate_limited.clone(),
        }
    }
}

#[derive(Debug, Clone)]
enum TurnKind {
    Opening,
    Reply {
        question: String,
        /// Session epoch the question was asked in.
        asked_in: u64,
    },
}

/// Drives both parties of the courtroom through the shared request queue.
#[derive(Clone)]
pub struct DialogueOrchestrator {
    client: GenerationClient,
    queue: RequestQueue,
    policy: BackoffPolicy,
    settings: DialogueSettings,
    session: Arc<Mutex<Session>>,
    sink: Arc<dyn DialogueSink>,
}

impl DialogueOrchestrator {
    pub fn new(
        client: GenerationClient,
        queue: RequestQueue,
        policy: BackoffPolicy,
        session: Arc<Mutex<Session>>,
        sink: Arc<dyn DialogueSink>,
    ) -> Self {
        Self {
            client,
            queue,
            policy,
            settings: DialogueSettings::default(),
            session,
            sink,
        }
    }

    pub fn with_settings(mut self, settings: DialogueSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn session(&self) -> &Arc<Mutex<Session>> {
        &self.session
    }

    /// Queue an opening statement for every party that has not spoken yet,
    /// prosecutor first.
    pub async fn enter_courtroom(&self) -> Vec<(Role, TurnHandle)> {
        let silent: Vec<Role> = {
            let session = self.session.lock().await;
            if session.case().is_none() {
                return Vec::new();
            }
            Role::ALL
                .into_iter()
                .filter(|role| session.history(*role).is_empty())
                .collect()
        };

        let mut handles = Vec::with_capacity(silent.len());
        for role in silent {
            handles.push((role, self.schedule(role, TurnKind::Opening).await));
        }
        handles
    }

    /// Queue the judge's question. It joins the history when its turn runs, so
    /// the history stays in conversation order however many questions are queued.
    pub async fn ask(&self, role: Role, question: &str) -> Result<TurnHandle, DialogueError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DialogueError::EmptyQuestion);
        }
        let asked_in = {
            let session = self.session.lock().await;
            if session.case().is_none() {
                return Err(DialogueError::NoCaseSelected);
            }
            session.epoch()
        };
        let kind = TurnKind::Reply {
            question: question.to_string(),
            asked_in,
        };
        Ok(self.schedule(role, kind).await)
    }

    async fn schedule(&self, role: Role, kind: TurnKind) -> TurnHandle {
        let this = self.clone();
        debug!(%role, ?kind, "Scheduling dialogue turn");
        self.queue
            .submit(move || async move { this.run_turn(role, kind).await })
            .await
    }

    async fn run_turn(self, role: Role, kind: TurnKind) -> TurnOutcome {
        let (case, history, epoch) = match self.snapshot(role, &kind).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                debug!(%role, error = %err, "Skipping dialogue turn");
                return TurnOutcome::Failed(err.to_string());
            }
        };

        if !self.client.has_credential() {
            self.sink.error(role, MISSING_KEY_MESSAGE);
            return TurnOutcome::Failed(MISSING_KEY_MESSAGE.to_string());
        }
        let request = self.build_request(&case, role, &kind, &history);

        self.sink.pending(role);
        let sink = Arc::clone(&self.sink);
        let sent = send_with_backoff(
            &self.policy,
            || self.client.stream_generate(&request),
            |notice| sink.retry_notice(role, &notice),
        )
        .await;

        let response = match sent {
            Ok(response) => response,
            Err(err) => return self.fail(role, &kind, err),
        };

        let mut events = pin!(decode_stream(response.bytes_stream()));
        while let Some(event) = events.next().await {
            match event {
                Ok(StreamEvent::Display(markup)) => self.sink.display(role, &markup),
                Ok(StreamEvent::Finished(text)) => {
                    self.record(role, epoch, &text).await;
                    self.sink.finished(role, &text);
                    info!(%role, chars = text.chars().count(), "Dialogue turn completed");
                    return TurnOutcome::Completed(text);
                }
                Err(err) => return self.fail(role, &kind, err),
            }
        }
        self.fail(
            role,
            &kind,
            InferenceError::Transport("stream closed without completion".to_string()),
        )
    }

    /// Case, prior turns and epoch as of now. A reply first appends its question,
    /// and the prior turns are everything before it.
    async fn snapshot(
        &self,
        role: Role,
        kind: &TurnKind,
    ) -> Result<(Case, Vec<DialogueTurn>, u64), DialogueError> {
        let mut session = self.session.lock().await;
        let case = session.case().cloned().ok_or(DialogueError::NoCaseSelected)?;
        let epoch = session.epoch();
        let prior = match kind {
            TurnKind::Opening => Vec::new(),
            TurnKind::Reply { question, asked_in } => {
                if *asked_in != epoch {
                    return Err(DialogueError::CaseChanged);
                }
                let prior = session.history(role).to_vec();
                session.push(DialogueTurn::user(role, question.as_str()));
                prior
            }
        };
        Ok((case, prior, epoch))
    }

    fn build_request(
        &self,
        case: &Case,
        role: Role,
        kind: &TurnKind,
        history: &[DialogueTurn],
    ) -> GenerateRequest {
        let config = GenerationConfig {
            temperature: self.settings.temperature,
            max_output_tokens: Some(self.settings.max_output_tokens),
            response_mime_type: None,
        };
        match kind {
            TurnKind::Opening => GenerateRequest::new(
                build_opening_instruction(case, role),
                OPENING_USER_TEXT,
                config,
            ),
            TurnKind::Reply { question, .. } => GenerateRequest::new(
                build_reply_instruction(case, role, history, question),
                question.as_str(),
                config,
            ),
        }
    }

    async fn record(&self, role: Role, epoch: u64, text: &str) {
        let mut session = self.session.lock().await;
        if session.epoch() == epoch {
            session.push(DialogueTurn::ai(role, text));
        } else {
            debug!(%role, "Case changed while the turn was running; dropping it");
        }
    }

    fn fail(&self, role: Role, kind: &TurnKind, err: InferenceError) -> TurnOutcome {
        warn!(%role, error = %err, "Dialogue turn failed");
        let detail = match (&err, kind) {
            (InferenceError::RateLimitExhausted { .. }, TurnKind::Opening) => {
                self.settings.opening_rate_limited.clone()
            }
            (InferenceError::RateLimitExhausted { .. }, TurnKind::Reply { .. }) => {
                self.settings.reply_rate_limited.clone()
            }
            (InferenceError::Server { status }, _) => format!("API 오류: {status} (서버 응답 오류)"),
            _ => err.to_string(),
        };
        let message = format!("{ERROR_PREFIX}{detail}");
        self.sink.error(role, &message);
        TurnOutcome::Failed(message)
    }
}
