//! AC3 (ATSC A/52) elementary stream handling: sync-frame parsing and
//! byte-exact split re-framing.
//!
//! Only the synchronization info is decoded; audio samples are never
//! touched. Frame boundaries and sample counts are all the split
//! engine needs.

mod parser;
mod splitter;

pub use parser::{parse_sync_info, SyncInfo, SAMPLES_PER_FRAME};
pub use splitter::{split_es, SplitAudio};
