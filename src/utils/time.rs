use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Converts a wall-clock instant into epoch milliseconds. Clamps to zero if
/// the instant is before 1970 and to `u64::MAX` past the representable range.
pub(crate) fn system_time_to_millis(time: SystemTime) -> u64 {
    let elapsed = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
