//! Refuses writes that would silently replace real content with (nearly)
//! nothing.

use crate::error::GuardRejection;

/// Previous content above this many chars may not become empty.
pub const EMPTY_THRESHOLD: usize = 10;
/// Previous content above this many chars may not shrink below [`SHRUNK_FLOOR`].
pub const SHRINK_THRESHOLD: usize = 50;
pub const SHRUNK_FLOOR: usize = 5;

/// Check a pending write of `new` over `previous`. Both are compared trimmed.
pub fn check_write(previous: &str, new: &str) -> Result<(), GuardRejection> {
    let previous_len = previous.trim().chars().count();
    let new_len = new.trim().chars().count();
    let emptied = previous_len > EMPTY_THRESHOLD && new_len == 0;
    let shrunk = previous_len > SHRINK_THRESHOLD && new_len < SHRUNK_FLOOR;
    if emptied || shrunk {
        log::warn!("save guard: {previous_len} chars would become {new_len}");
        return Err(GuardRejection {
            previous_len,
            new_len,
        });
    }
    Ok(())
}
