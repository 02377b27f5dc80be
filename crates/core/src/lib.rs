//! Voxrelay Core
//!
//! The voice turn pipeline: a transcription adapter, a conversation adapter
//! backed by a language model and a session store, a speech synthesis
//! adapter, and the orchestrator that sequences them for one request.

pub mod conversation;
pub mod error;
pub mod llm_client;
pub mod orchestrator;
pub mod session_store;
pub mod synthesis;
pub mod transcription;
pub mod turn;

pub use conversation::ConversationAdapter;
pub use error::{
    ConversationError, SessionStoreError, Stage, SynthesisError, TranscriptionError, TurnError,
};
pub use orchestrator::TurnOrchestrator;
pub use session_store::{InMemorySessionStore, SessionStore};
pub use turn::{History, Role, SessionId, Turn, TurnResult};
