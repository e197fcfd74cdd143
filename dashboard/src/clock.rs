use std::time::{SystemTime, UNIX_EPOCH};

use tank_core::{Clock, TimestampMillis};

/// Wall clock in milliseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> TimestampMillis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                TimestampMillis::try_from(elapsed.as_millis()).unwrap_or(TimestampMillis::MAX)
            })
    }
}
