//! Memory layers for the agent
//!
//! - [`ShortTermMemory`]: sliding window replayed into every turn
//! - [`LongTermMemory`]: embeddings, vector recall and the user profile
//! - [`ConversationLogger`]: append-only daily transcript

mod conversation_log;
pub mod long_term;
mod short_term;

pub use conversation_log::{ConversationLogger, DEFAULT_MAX_LOG_BYTES};
pub use long_term::{LongTermMemory, MemoryRecord, MemoryType, ProfileStore, ScoredRecord};
pub use short_term::{DEFAULT_STM_CAPACITY, ShortTermMemory};
