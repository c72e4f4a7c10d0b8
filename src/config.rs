//! Configuration types.

use std::time::Duration;

/// Core configuration.
///
/// The threshold and delay values are tuning constants, named and
/// overridable here rather than hard-coded at call sites.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Extraction confidence threshold. A fact is accepted only when its
    /// confidence is strictly greater than this value.
    pub accept_threshold: f64,
    /// Seconds a user must wait before requesting another one-time code.
    pub resend_cooldown_secs: u32,
    /// Grace period after the page becomes visible during which identity
    /// events are still downgraded to silent field updates.
    pub visibility_grace: Duration,
    /// How long the latest stream phase name stays observable after the
    /// terminal event, so transition UI can settle.
    pub phase_clear_delay: Duration,
    /// Locale sent with every chat request.
    pub locale: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.3,
            resend_cooldown_secs: 60,
            visibility_grace: Duration::from_millis(500),
            phase_clear_delay: Duration::from_secs(1),
            locale: "en".to_string(),
        }
    }
}
