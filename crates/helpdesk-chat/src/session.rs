//! Per-conversation state and the store that owns it

use crate::message::{InboundMessage, UserIdentity};
use chrono::{DateTime, Utc};
use helpdesk_core::{Priority, TicketFlow};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

/// How many delivery ids a session remembers
const DELIVERY_RING: usize = 32;

/// Time source, injectable so inactivity can be simulated
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One conversation per user per channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub channel: String,
    pub user: String,
}

impl SessionKey {
    pub fn of(message: &InboundMessage) -> Self {
        Self {
            channel: message.session_id.clone(),
            user: message.user.id.clone(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.user)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    Answering,
    TicketFlow(TicketFlow),
}

#[derive(Debug)]
pub struct Session {
    pub key: SessionKey,
    pub user: UserIdentity,
    pub mode: Mode,
    /// Priority the triage heuristics proposed for the open ticket flow
    pub suggested_priority: Option<Priority>,
    pub last_activity: DateTime<Utc>,
    recent_deliveries: VecDeque<String>,
}

impl Session {
    pub fn new(key: SessionKey, user: UserIdentity, now: DateTime<Utc>) -> Self {
        Self {
            key,
            user,
            mode: Mode::Idle,
            suggested_priority: None,
            last_activity: now,
            recent_deliveries: VecDeque::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        (now - self.last_activity)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }

    /// Back to `Idle`, dropping any collected ticket fields
    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.suggested_priority = None;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Record a delivery id. Returns `true` if it was already seen.
    pub fn seen_delivery(&mut self, id: &str) -> bool {
        if self.recent_deliveries.iter().any(|d| d == id) {
            return true;
        }
        if self.recent_deliveries.len() == DELIVERY_RING {
            self.recent_deliveries.pop_front();
        }
        self.recent_deliveries.push_back(id.to_string());
        false
    }

    pub fn flow(&self) -> Option<&TicketFlow> {
        match &self.mode {
            Mode::TicketFlow(flow) => Some(flow),
            _ => None,
        }
    }
}

/// All live sessions. The map lock is only held to look up or insert an
/// entry; message handling holds the session's own async mutex.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &self,
        key: &SessionKey,
        user: &UserIdentity,
        now: DateTime<Utc>,
    ) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(key) {
                return session.clone();
            }
        }
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(key.clone(), user.clone(), now))))
            .clone()
    }

    pub fn get(&self, key: &SessionKey) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop idle sessions nobody is using. Busy sessions are kept.
    pub fn prune(&self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(guard) => !guard.is_expired(now, timeout),
            Err(_) => true,
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn user() -> UserIdentity {
        UserIdentity {
            id: "u1".to_string(),
            name: None,
            email: None,
        }
    }

    fn key(channel: &str) -> SessionKey {
        SessionKey {
            channel: channel.to_string(),
            user: "u1".to_string(),
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let session = Session::new(key("c"), user(), now);
        let timeout = Duration::from_secs(60);
        assert!(!session.is_expired(now + ChronoDuration::seconds(60), timeout));
        assert!(session.is_expired(now + ChronoDuration::seconds(61), timeout));
    }

    #[test]
    fn test_delivery_ring() {
        let mut session = Session::new(key("c"), user(), Utc::now());
        assert!(!session.seen_delivery("d1"));
        assert!(session.seen_delivery("d1"));
        for i in 0..DELIVERY_RING {
            session.seen_delivery(&format!("x{i}"));
        }
        assert!(!session.seen_delivery("d1"));
    }

    #[tokio::test]
    async fn test_store_reuses_and_prunes() {
        let store = SessionStore::new();
        let now = Utc::now();
        let a = store.get_or_create(&key("a"), &user(), now);
        let again = store.get_or_create(&key("a"), &user(), now);
        assert!(Arc::ptr_eq(&a, &again));
        store.get_or_create(&key("b"), &user(), now);
        assert_eq!(store.len(), 2);

        let later = now + ChronoDuration::hours(2);
        let _busy = a.lock().await;
        assert_eq!(store.prune(later, Duration::from_secs(60)), 1);
        assert_eq!(store.len(), 1);
    }
}
