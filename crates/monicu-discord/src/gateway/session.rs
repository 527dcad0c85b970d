//! Session resume state and reconnect backoff

use std::time::Duration;

/// What is needed to resume a dropped session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeState {
    /// Session ID from READY
    pub session_id: Option<String>,
    /// Gateway URL from READY to reconnect to when resuming
    pub resume_url: Option<String>,
    /// Last dispatch sequence number received
    pub sequence: Option<u64>,
}

impl ResumeState {
    /// Whether a Resume can be attempted instead of a fresh Identify
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Record the session established by READY
    pub fn start(&mut self, session_id: String, resume_url: Option<String>) {
        self.session_id = Some(session_id);
        self.resume_url = resume_url;
    }

    /// Track the highest dispatch sequence seen
    pub fn observe(&mut self, sequence: Option<u64>) {
        if let Some(seq) = sequence {
            self.sequence = Some(self.sequence.map_or(seq, |cur| cur.max(seq)));
        }
    }

    /// Forget the session; the next connection identifies from scratch
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// URL to connect to, given the configured gateway URL
    ///
    /// Keeps the configured query string (version and encoding) when a
    /// resume URL is used.
    #[must_use]
    pub fn connect_url(&self, gateway_url: &str) -> String {
        match (&self.session_id, &self.resume_url) {
            (Some(_), Some(resume)) => {
                let query = gateway_url
                    .split_once('?')
                    .map(|(_, q)| q)
                    .unwrap_or("v=10&encoding=json");
                format!("{}/?{query}", resume.trim_end_matches('/'))
            }
            _ => gateway_url.to_string(),
        }
    }
}

/// Capped exponential backoff between reconnect attempts
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// Delay before the next attempt; grows until it reaches the cap
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt.min(16)).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Start over after a healthy session
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_capped() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10));
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_sequence_tracking() {
        let mut state = ResumeState::default();
        state.observe(Some(3));
        state.observe(None);
        state.observe(Some(2));
        assert_eq!(state.sequence, Some(3));
    }

    #[test]
    fn test_connect_url() {
        let gateway = "wss://gateway.discord.gg/?v=10&encoding=json";
        let mut state = ResumeState::default();
        assert_eq!(state.connect_url(gateway), gateway);

        state.start(
            "abc".to_string(),
            Some("wss://resume.discord.gg".to_string()),
        );
        assert!(state.can_resume());
        assert_eq!(
            state.connect_url(gateway),
            "wss://resume.discord.gg/?v=10&encoding=json"
        );

        state.invalidate();
        assert!(!state.can_resume());
        assert_eq!(state.connect_url(gateway), gateway);
    }
}
