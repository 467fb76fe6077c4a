//! Reading parameter values without touching the file

use crate::locate::{Locator, Resolution, ResolutionRecord, SearchMode};

/// Locate the record's parameter and store its current value
///
/// Token values are trimmed; whole-line values are kept as written.
pub fn read<S: AsRef<str>>(
    locator: &Locator,
    lines: &[S],
    record: &mut ResolutionRecord,
    mode: SearchMode,
) -> Resolution {
    let resolution = locator.locate(lines, record, mode);
    if let Resolution::Found(hit) = resolution {
        let raw = hit.value(lines[hit.index].as_ref());
        let value = if record.descriptor.whole_line {
            raw.to_string()
        } else {
            raw.trim().to_string()
        };
        record.value = Some(value);
    }
    resolution
}
