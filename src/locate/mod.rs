//! Locating parameter lines inside a file's text

mod locator;
mod record;

pub use locator::{Hit, LocateError, Locator, Resolution, SearchMode, CONTEXT_WINDOW};
pub use record::ResolutionRecord;
