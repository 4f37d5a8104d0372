//! Terminal chat client for a streaming AI-assistant backend.
//!
//! Replies arrive over a WebSocket as text fragments, are accumulated into a
//! single on-screen entry per turn ([`turn`]) and committed once to a
//! persistent history log ([`history`]) kept in a flat key-value store
//! ([`store`]).

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod media;
pub mod message;
pub mod models;
pub mod protocol;
pub mod session;
pub mod store;
pub mod stt;
pub mod surface;
pub mod terminal;
pub mod transport;
pub mod turn;

pub use error::{ChatError, Result};
pub use history::HistoryLog;
pub use message::Message;
pub use session::ChatSession;
pub use surface::{Author, SlotId, Surface, Transcript};
pub use turn::{StreamingTurn, TurnController, TurnState};
