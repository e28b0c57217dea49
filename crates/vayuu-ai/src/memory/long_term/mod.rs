//! Long-term memory: vector recall plus the relational user profile

mod extractor;
mod manager;
mod profile;
mod types;

pub use extractor::{ExtractedFact, ExtractedKind, FactExtractor, parse_facts};
pub use manager::{CONTEXT_SEARCH_LIMIT, LongTermMemory, PREFERENCE_INCREMENT};
pub use profile::ProfileStore;
pub use types::{MemoryRecord, MemoryType, ScoredRecord};
