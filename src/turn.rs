//! Streaming response accumulation.
//!
//! One assistant reply arrives as a sequence of text fragments. The
//! [`TurnController`] concatenates them in arrival order, mirrors the running
//! total into a single display slot, and commits the finished text to the
//! history log exactly once.
//!
//! ## State machine
//! ```text
//!            start_turn                 end_turn
//!   Idle ───────────────▶ Streaming ─────────────▶ Committing ──▶ Idle
//!    │                        ▲
//!    └── fragment (recovered) ┘
//! ```
//! - `start_turn` while `Streaming` is rejected with [`ChatError::TurnInProgress`].
//! - A fragment in `Idle` adopts the last assistant entry on the surface (or a
//!   new one) as its slot.
//! - `Committing` always ends in `Idle`, even when the history write fails.

use std::mem;

use tracing::{debug, error, warn};

use crate::error::{ChatError, Result};
use crate::history::HistoryLog;
use crate::message::Message;
use crate::surface::{Author, SlotId, Surface};

/// The in-flight assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingTurn {
    pub accumulated: String,
    pub slot: SlotId,
    /// Set when the turn was adopted from a fragment that arrived in `Idle`.
    pub recovered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Streaming(StreamingTurn),
    Committing,
}

#[derive(Debug, Default)]
pub struct TurnController {
    state: TurnState,
}

impl TurnController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, TurnState::Streaming(_))
    }

    pub fn accumulated(&self) -> &str {
        match &self.state {
            TurnState::Streaming(turn) => &turn.accumulated,
            _ => "",
        }
    }

    pub fn active_slot(&self) -> Option<SlotId> {
        match &self.state {
            TurnState::Streaming(turn) => Some(turn.slot),
            _ => None,
        }
    }

    /// Open a fresh, empty assistant slot for the reply to a user action.
    pub fn start_turn<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<SlotId> {
        if let TurnState::Streaming(turn) = &self.state {
            warn!(slot = turn.slot.0, "start_turn while a reply is still streaming");
            return Err(ChatError::TurnInProgress);
        }
        let slot = surface.push(Author::Assistant, "", false);
        self.state = TurnState::Streaming(StreamingTurn {
            accumulated: String::new(),
            slot,
            recovered: false,
        });
        debug!(slot = slot.0, "turn started");
        Ok(slot)
    }

    /// Add one fragment and redraw the slot with the full text so far.
    pub fn append_fragment<S: Surface + ?Sized>(&mut self, surface: &mut S, text: &str) -> SlotId {
        let mut turn = match mem::take(&mut self.state) {
            TurnState::Streaming(turn) => turn,
            _ => Self::recover(surface),
        };
        turn.accumulated.push_str(text);
        surface.set_text(turn.slot, &turn.accumulated);
        let slot = turn.slot;
        self.state = TurnState::Streaming(turn);
        slot
    }

    /// Fragment arrived with no turn open: adopt the most recent assistant
    /// entry, or create one when the surface has none.
    fn recover<S: Surface + ?Sized>(surface: &mut S) -> StreamingTurn {
        let slot = match surface.last_assistant() {
            Some(slot) => {
                warn!(slot = slot.0, "fragment with no active turn; reusing last assistant entry");
                // The adopted entry now shows text the log does not hold yet.
                surface.set_persisted(slot, false);
                slot
            }
            None => {
                warn!("fragment with no active turn and no assistant entry; creating one");
                surface.push(Author::Assistant, "", false)
            }
        };
        StreamingTurn {
            accumulated: String::new(),
            slot,
            recovered: true,
        }
    }

    /// Finish the reply. Non-blank text is committed to `history` as one
    /// assistant message; the controller is `Idle` afterwards no matter what.
    pub fn end_turn<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        history: &HistoryLog,
    ) -> Option<Message> {
        let turn = match mem::replace(&mut self.state, TurnState::Committing) {
            TurnState::Streaming(turn) => turn,
            _ => {
                debug!("end_turn with no active turn");
                self.state = TurnState::Idle;
                return None;
            }
        };

        let committed = if turn.accumulated.trim().is_empty() {
            debug!(slot = turn.slot.0, "empty reply; nothing to persist");
            None
        } else {
            let message = Message::assistant(turn.accumulated);
            match history.append(&message) {
                Ok(()) => {
                    surface.set_persisted(turn.slot, true);
                    Some(message)
                }
                Err(e) => {
                    error!(error = %e, "failed to persist assistant reply");
                    None
                }
            }
        };

        self.state = TurnState::Idle;
        committed
    }

    /// Drop the active turn without persisting it. Returns the text that had
    /// accumulated, if a turn was open.
    pub fn abort_turn(&mut self) -> Option<String> {
        match mem::take(&mut self.state) {
            TurnState::Streaming(turn) => {
                debug!(slot = turn.slot.0, chars = turn.accumulated.len(), "turn aborted");
                Some(turn.accumulated)
            }
            _ => None,
        }
    }
}
