use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

/// Resend throttling policy.
///
/// A resend is allowed only while the record's resend count is below the
/// ceiling AND the cooldown since the last resend has fully elapsed. Both
/// conditions are necessary; the boundary `elapsed == cooldown` is allowed.
#[derive(Debug, Clone)]
pub struct ResendPolicy {
    max_resends: u32,
    cooldown: Duration,
}

impl ResendPolicy {
    /// Create a resend policy.
    ///
    /// # Arguments
    /// * `max_resends` - Maximum resends per record chain
    /// * `cooldown_seconds` - Minimum seconds between resends
    pub fn new(max_resends: u32, cooldown_seconds: i64) -> Self {
        Self {
            max_resends,
            cooldown: Duration::seconds(cooldown_seconds),
        }
    }

    /// Decide whether a resend is currently allowed.
    ///
    /// # Arguments
    /// * `resend_count` - Resends already performed for this record chain
    /// * `last_resend_at` - Timestamp of the previous resend, if any
    /// * `now` - Current wall-clock time
    pub fn can_resend(
        &self,
        resend_count: u32,
        last_resend_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        if resend_count >= self.max_resends {
            return false;
        }

        match last_resend_at {
            None => true,
            Some(last) => now - last >= self.cooldown,
        }
    }
}
