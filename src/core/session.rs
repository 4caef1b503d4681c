/*!
 * Attack Session
 *
 * One PIN attack against one target: the candidate queue, how far through it
 * we are, and the time budget. Exactly one session exists at a time and it is
 * discarded once it reaches a terminal status.
 */

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::core::address::HardwareAddress;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Running,
    Succeeded,
    /// Every queued candidate was tried without success
    Exhausted,
    Cancelled,
    TimedOut,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

/// A queued PIN and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedPin {
    pub pin: String,
    pub source: String,
}

/// Live attack state, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct AttackSession {
    pub bssid: HardwareAddress,
    pub essid: Option<String>,
    pub queue: Vec<QueuedPin>,
    /// Index into `queue` of the current (or next) attempt
    pub current: usize,
    /// Attempts actually launched; empty candidates are skipped, not counted
    pub attempts: usize,
    pub status: SessionStatus,
    pub last_error: Option<String>,
    pub started_at: u64,
    started: Instant,
    deadline: Instant,
}

impl AttackSession {
    pub fn new(
        bssid: HardwareAddress,
        essid: Option<String>,
        queue: Vec<QueuedPin>,
        budget: Duration,
    ) -> Self {
        let started = Instant::now();
        Self {
            bssid,
            essid,
            queue,
            current: 0,
            attempts: 0,
            status: SessionStatus::Running,
            last_error: None,
            started_at: unix_now(),
            started,
            deadline: started + budget,
        }
    }

    /// Time left before the session deadline
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Per-attempt timeout clamped to the remaining budget
    pub fn attempt_timeout(&self, per_attempt: Duration) -> Duration {
        per_attempt.min(self.remaining())
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Move to a terminal status; later calls are ignored
    pub fn finish(&mut self, status: SessionStatus) {
        if !self.status.is_terminal() {
            self.status = status;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            bssid: self.bssid.to_string(),
            essid: self.essid.clone(),
            candidates: self.queue.iter().map(|q| q.pin.clone()).collect(),
            current: self.current,
            attempts: self.attempts,
            status: self.status,
            last_error: self.last_error.clone(),
            started_at: self.started_at,
            elapsed_secs: self.elapsed().as_secs(),
            remaining_secs: self.remaining().as_secs(),
        }
    }
}

/// Serializable view of a session for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub bssid: String,
    pub essid: Option<String>,
    pub candidates: Vec<String>,
    pub current: usize,
    pub attempts: usize,
    pub status: SessionStatus,
    pub last_error: Option<String>,
    pub started_at: u64,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(budget: Duration) -> AttackSession {
        AttackSession::new(
            HardwareAddress::parse("00:11:22:33:44:55").unwrap(),
            Some("HomeNet".to_string()),
            vec![
                QueuedPin {
                    pin: "12345670".to_string(),
                    source: "default".to_string(),
                },
                QueuedPin {
                    pin: "00000000".to_string(),
                    source: "default".to_string(),
                },
            ],
            budget,
        )
    }

    #[test]
    fn test_session_new() {
        let s = session(Duration::from_secs(60));
        assert_eq!(s.status, SessionStatus::Running);
        assert_eq!(s.current, 0);
        assert_eq!(s.attempts, 0);
        assert!(s.last_error.is_none());
        assert!(s.started_at > 0);
        assert!(!s.is_expired());
    }

    #[test]
    fn test_attempt_timeout_clamped_to_budget() {
        let s = session(Duration::from_secs(10));
        assert!(s.attempt_timeout(Duration::from_secs(300)) <= Duration::from_secs(10));
        assert_eq!(s.attempt_timeout(Duration::from_millis(5)), Duration::from_millis(5));

        let expired = session(Duration::ZERO);
        assert!(expired.is_expired());
        assert_eq!(expired.attempt_timeout(Duration::from_secs(300)), Duration::ZERO);
    }

    #[test]
    fn test_finish_is_sticky() {
        let mut s = session(Duration::from_secs(60));
        s.finish(SessionStatus::Cancelled);
        s.finish(SessionStatus::Succeeded);
        assert_eq!(s.status, SessionStatus::Cancelled);
        assert!(s.status.is_terminal());
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut s = session(Duration::from_secs(60));
        s.attempts = 1;
        s.current = 1;
        s.record_failure("receive timeout");

        let snap = s.snapshot();
        assert_eq!(snap.bssid, "00:11:22:33:44:55");
        assert_eq!(snap.candidates, vec!["12345670", "00000000"]);
        assert_eq!(snap.last_error.as_deref(), Some("receive timeout"));

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"status\":\"Running\""));
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
