//! Session controller: routes user actions and server events through one
//! [`TurnController`], one [`HistoryLog`] and one [`Surface`].
//!
//! ## Turn lifecycle
//! 1. A user action renders the user entry, persists it, opens a turn and
//!    emits `send_message`.
//! 2. Chunks stream into the turn's slot.
//! 3. `stream_response_end` commits the reply; `error` or a disconnect aborts it.
//! 4. Actions submitted while a reply is streaming wait in a FIFO queue and are
//!    dispatched one at a time as turns finish.

use std::collections::VecDeque;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::history::HistoryLog;
use crate::media::{encode_image_file, AudioClip};
use crate::message::Message;
use crate::models::validate_model;
use crate::protocol::{ClientEvent, SendMessage, ServerEvent};
use crate::stt::SttClient;
use crate::surface::{Author, Surface};
use crate::transport::{TransportEvent, TransportHandle};
use crate::turn::{TurnController, TurnState};

/// Something the user asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Text(String),
    Image { text: String, image_base64: String },
}

impl UserAction {
    fn text(&self) -> &str {
        match self {
            UserAction::Text(text) => text,
            UserAction::Image { text, .. } => text,
        }
    }

    fn display(&self) -> String {
        match self {
            UserAction::Text(text) => text.clone(),
            UserAction::Image { text, .. } if text.is_empty() => "[image]".to_string(),
            UserAction::Image { text, .. } => format!("[image] {text}"),
        }
    }
}

pub struct ChatSession<S: Surface> {
    turns: TurnController,
    history: HistoryLog,
    surface: S,
    transport: TransportHandle,
    model: String,
    pending: VecDeque<UserAction>,
}

impl<S: Surface> ChatSession<S> {
    pub fn new(surface: S, history: HistoryLog, transport: TransportHandle, model: impl Into<String>) -> Self {
        ChatSession {
            turns: TurnController::new(),
            history,
            surface,
            transport,
            model: model.into(),
            pending: VecDeque::new(),
        }
    }

    /// Replay the stored history onto the surface. Returns how many messages
    /// were shown.
    pub fn restore(&mut self) -> usize {
        let messages = self.history.load();
        HistoryLog::render(&messages, &mut self.surface);
        info!(count = messages.len(), key = self.history.key(), "history restored");
        messages.len()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn turn_state(&self) -> &TurnState {
        self.turns.state()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, name: &str) -> Result<()> {
        self.model = validate_model(name)?.to_string();
        info!(model = %self.model, "model selected");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// Send typed text. Blank input is ignored and returns `false`.
    pub fn send_text(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.submit(UserAction::Text(text.to_string()));
        true
    }

    /// Send an image with optional accompanying text.
    pub fn send_image(&mut self, text: &str, image_base64: String) {
        self.submit(UserAction::Image {
            text: text.trim().to_string(),
            image_base64,
        });
    }

    /// Read an image file and send it. A capture failure is logged only.
    pub fn send_image_file(&mut self, path: &Path, text: &str) -> bool {
        match encode_image_file(path) {
            Ok(image) => {
                self.send_image(text, image);
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "image capture failed");
                false
            }
        }
    }

    /// Transcribe a recording and send the transcript as a text turn.
    /// Transcription failures are logged and the turn is dropped.
    pub async fn send_transcript(&mut self, stt: &SttClient, clip: &AudioClip) -> bool {
        match stt.transcribe(clip).await {
            Ok(transcript) if !transcript.trim().is_empty() => self.send_text(&transcript),
            Ok(_) => {
                warn!("empty transcript; nothing to send");
                false
            }
            Err(e) => {
                error!(error = %e, "speech-to-text failed");
                false
            }
        }
    }

    /// Load a recording from disk and send its transcript. An unreadable
    /// recording is reported on the surface.
    pub async fn send_audio_file(&mut self, stt: &SttClient, path: &Path) -> bool {
        match AudioClip::from_file(path) {
            Ok(clip) => self.send_transcript(stt, &clip).await,
            Err(e) => {
                error!(path = %path.display(), error = %e, "audio capture failed");
                self.surface.notice(&format!("Could not read recording: {e}"));
                false
            }
        }
    }

    fn submit(&mut self, action: UserAction) {
        if self.turns.is_streaming() {
            debug!(queued = self.pending.len() + 1, "reply in progress; queueing action");
            self.pending.push_back(action);
            self.surface
                .notice("queued until the current reply finishes");
            return;
        }
        self.dispatch(action);
    }

    fn dispatch(&mut self, action: UserAction) {
        let user_slot = self.surface.push(Author::User, &action.display(), false);
        match self.history.append(&Message::user(action.text())) {
            Ok(()) => self.surface.set_persisted(user_slot, true),
            Err(e) => error!(error = %e, "failed to persist user message"),
        }

        let reply_slot = match self.turns.start_turn(&mut self.surface) {
            Ok(slot) => slot,
            Err(e) => {
                // Callers only dispatch when idle.
                error!(error = %e, "could not open a turn");
                return;
            }
        };

        let mut payload = SendMessage::text(action.text(), self.model.clone());
        if let UserAction::Image { image_base64, .. } = action {
            payload = payload.with_image(image_base64);
        }
        if let Err(e) = self.transport.send(ClientEvent::SendMessage(payload)) {
            error!(error = %e, "failed to send message");
            self.turns.abort_turn();
            self.surface.finish(reply_slot);
            self.surface.notice(&format!("Error: {e}"));
        }
    }

    fn dispatch_next(&mut self) {
        while !self.turns.is_streaming() {
            let Some(action) = self.pending.pop_front() else {
                break;
            };
            self.dispatch(action);
        }
    }

    // -----------------------------------------------------------------------
    // Server events
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => info!("connected"),
            TransportEvent::Server(ServerEvent::Chunk { text }) => {
                self.turns.append_fragment(&mut self.surface, &text);
            }
            TransportEvent::Server(ServerEvent::End) => {
                let slot = self.turns.active_slot();
                if let Some(message) = self.turns.end_turn(&mut self.surface, &self.history) {
                    debug!(chars = message.text.len(), "reply committed");
                }
                if let Some(slot) = slot {
                    self.surface.finish(slot);
                }
                self.dispatch_next();
            }
            TransportEvent::Server(ServerEvent::Error { message }) => {
                warn!(message = %message, "server error");
                self.abort_active();
                self.surface.notice(&format!("Error: {message}"));
                self.dispatch_next();
            }
            TransportEvent::Disconnected { reason } => {
                warn!(reason = %reason, "disconnected");
                self.abort_active();
                if !self.pending.is_empty() {
                    warn!(dropped = self.pending.len(), "dropping queued actions");
                    self.pending.clear();
                }
                self.surface.notice(&format!("Disconnected: {reason}"));
            }
        }
    }

    fn abort_active(&mut self) {
        let slot = self.turns.active_slot();
        self.turns.abort_turn();
        if let Some(slot) = slot {
            self.surface.finish(slot);
        }
    }
}
