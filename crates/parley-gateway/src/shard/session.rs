//! Resumable session state of a shard

/// What a shard needs to resume after a disconnect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub session_id: Option<String>,
    /// Gateway URL to resume on, from READY
    pub resume_url: Option<String>,
    /// Last dispatch sequence received
    pub sequence: Option<u64>,
}

impl SessionState {
    /// Both a session id and a sequence are known
    #[inline]
    pub fn is_resumable(&self) -> bool {
        self.session_id.is_some() && self.sequence.is_some()
    }

    /// Record a dispatch sequence; sequences never move backwards
    pub fn record_sequence(&mut self, sequence: u64) {
        if self.sequence.map_or(true, |current| sequence > current) {
            self.sequence = Some(sequence);
        }
    }

    pub fn start(&mut self, session_id: String, resume_url: Option<String>) {
        self.session_id = Some(session_id);
        self.resume_url = resume_url;
    }

    /// Forget the session; the next connection identifies
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// URL for the next connection
    pub fn connect_url<'a>(&'a self, default: &'a str) -> &'a str {
        match &self.resume_url {
            Some(url) if self.is_resumable() => url,
            _ => default,
        }
    }
}

/// Gateway URL with version and encoding
pub fn gateway_url(base: &str, version: u8) -> String {
    let base = base.trim_end_matches('/');
    format!("{base}/?v={version}&encoding=json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resumable_needs_id_and_sequence() {
        let mut session = SessionState::default();
        assert!(!session.is_resumable());

        session.start("abc".to_string(), Some("wss://resume".to_string()));
        assert!(!session.is_resumable());

        session.record_sequence(3);
        assert!(session.is_resumable());
        assert_eq!(session.connect_url("wss://default"), "wss://resume");

        session.clear();
        assert_eq!(session, SessionState::default());
        assert_eq!(session.connect_url("wss://default"), "wss://default");
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let mut session = SessionState::default();
        session.record_sequence(5);
        session.record_sequence(4);
        assert_eq!(session.sequence, Some(5));
    }

    #[test]
    fn test_gateway_url() {
        assert_eq!(
            gateway_url("wss://gateway.discord.gg/", 9),
            "wss://gateway.discord.gg/?v=9&encoding=json"
        );
    }
}
