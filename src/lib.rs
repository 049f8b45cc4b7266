//! A DVD-Video title extraction toolkit.
//!
//! Parses a disc's IFO navigation structures, resolves titles through
//! their angle blocks, reconciles telecine (RFF) flags into a playable
//! timeline with derived chapter boundaries, and splits titles into
//! pieces, including byte-exact AC3 audio extraction straight from the
//! program stream sectors.
//!
//! # Modules
//!
//! - [`ifo`]: IFO navigation parsing (title table, program chains,
//!   cell address tables) and cross-validation between two parses
//! - [`title`]: title resolution, telecine reconciliation, chapter
//!   derivation and the split engine
//! - [`format`]: MPEG program stream demultiplexing over raw sectors
//! - [`codec`]: AC3 sync-frame parsing and split re-framing
//! - [`av`]: the host-pipeline seams (video/audio stream handles,
//!   frame indexing)
//! - [`config`]: tunable tolerances for the consistency checks
//!
//! The crate never decodes pixels or audio samples. Video and audio
//! handles come from a host media pipeline through the traits in
//! [`av`]; this crate slices, concatenates and re-tags them, and the
//! only bytes it touches directly are navigation data and AC3 frames.

pub mod av;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod ifo;
pub mod title;
pub mod utils;

pub use error::{DvdError, Result};
pub use ifo::DiscStructure;
pub use title::{get_title, RffMode, Title};
