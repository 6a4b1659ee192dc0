//! In-memory admin sessions and reveal grants. A session proves the admin
//! login for 24 hours; a reveal grant sits on top of a live session and
//! unmasks client PII for 30 minutes. Both live only in process memory, so a
//! restart logs everyone out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

const SESSION_TTL_HOURS: i64 = 24;
const REVEAL_TTL_MINUTES: i64 = 30;

/// Time source, swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct SessionStore {
    clock: Arc<dyn Clock>,
    inner: Mutex<Maps>,
}

#[derive(Default)]
struct Maps {
    sessions: HashMap<String, DateTime<Utc>>,
    reveals: HashMap<String, DateTime<Utc>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        SessionStore {
            clock,
            inner: Mutex::new(Maps::default()),
        }
    }

    /// Mints a fresh session token. Expired sessions are swept here so the
    /// maps cannot grow without bound between logins.
    pub fn open_session(&self) -> String {
        let now = self.clock.now();
        let token = mint_token();
        let mut maps = self.lock();
        sweep(&mut maps, now);
        maps.sessions.insert(token.clone(), now);
        token
    }

    /// True for a known session younger than the TTL. An expired entry is
    /// evicted on the spot, together with any reveal grant riding on it.
    pub fn is_valid(&self, token: &str) -> bool {
        let now = self.clock.now();
        let mut maps = self.lock();
        match maps.sessions.get(token).copied() {
            Some(created) if now - created <= Duration::hours(SESSION_TTL_HOURS) => true,
            Some(_) => {
                maps.sessions.remove(token);
                maps.reveals.remove(token);
                false
            }
            None => false,
        }
    }

    /// Logout. Dropping the session also drops its reveal grant.
    pub fn close_session(&self, token: &str) {
        let mut maps = self.lock();
        maps.sessions.remove(token);
        maps.reveals.remove(token);
    }

    /// Attaches a reveal grant to a live session, restarting the 30-minute
    /// window if one already exists. False when the session is not live.
    pub fn grant_reveal(&self, token: &str) -> bool {
        if !self.is_valid(token) {
            return false;
        }
        let now = self.clock.now();
        self.lock().reveals.insert(token.to_string(), now);
        true
    }

    pub fn revoke_reveal(&self, token: &str) {
        self.lock().reveals.remove(token);
    }

    /// True while the grant is strictly younger than its window. Expired
    /// grants are evicted on read.
    pub fn should_reveal(&self, token: &str) -> bool {
        let now = self.clock.now();
        let mut maps = self.lock();
        match maps.reveals.get(token).copied() {
            Some(created) if now - created < Duration::minutes(REVEAL_TTL_MINUTES) => true,
            Some(_) => {
                maps.reveals.remove(token);
                false
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Maps> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn sweep(maps: &mut Maps, now: DateTime<Utc>) {
    let ttl = Duration::hours(SESSION_TTL_HOURS);
    let Maps { sessions, reveals } = maps;
    sessions.retain(|_, created| now - *created <= ttl);
    reveals.retain(|token, _| sessions.contains_key(token));
}

fn mint_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_now() -> Arc<Self> {
            Arc::new(ManualClock {
                now: Mutex::new(Utc::now()),
            })
        }

        fn advance(&self, delta: Duration) {
            *self.now.lock().unwrap() += delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn store_with_clock() -> (SessionStore, Arc<ManualClock>) {
        let clock = ManualClock::starting_now();
        let store = SessionStore::with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let store = SessionStore::new();
        let a = store.open_session();
        let b = store.open_session();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn fresh_session_is_valid_and_unknown_is_not() {
        let store = SessionStore::new();
        let token = store.open_session();
        assert!(store.is_valid(&token));
        assert!(!store.is_valid("deadbeef"));
    }

    #[test]
    fn session_survives_exactly_24_hours() {
        let (store, clock) = store_with_clock();
        let token = store.open_session();
        clock.advance(Duration::hours(24));
        assert!(store.is_valid(&token));
        clock.advance(Duration::minutes(1));
        assert!(!store.is_valid(&token));
    }

    #[test]
    fn login_sweeps_stale_sessions() {
        let (store, clock) = store_with_clock();
        let stale = store.open_session();
        clock.advance(Duration::hours(25));
        let fresh = store.open_session();
        assert!(store.is_valid(&fresh));
        assert!(!store.is_valid(&stale));
    }

    #[test]
    fn logout_invalidates_session_and_grant() {
        let (store, _clock) = store_with_clock();
        let token = store.open_session();
        assert!(store.grant_reveal(&token));
        store.close_session(&token);
        assert!(!store.is_valid(&token));
        assert!(!store.should_reveal(&token));
    }

    #[test]
    fn grant_requires_a_live_session() {
        let (store, clock) = store_with_clock();
        assert!(!store.grant_reveal("deadbeef"));
        let token = store.open_session();
        clock.advance(Duration::hours(25));
        assert!(!store.grant_reveal(&token));
        assert!(!store.should_reveal(&token));
    }

    #[test]
    fn grant_expires_after_30_minutes() {
        let (store, clock) = store_with_clock();
        let token = store.open_session();
        assert!(store.grant_reveal(&token));
        clock.advance(Duration::minutes(29));
        assert!(store.should_reveal(&token));
        clock.advance(Duration::minutes(1));
        assert!(!store.should_reveal(&token));
        // The session itself is still good.
        assert!(store.is_valid(&token));
    }

    #[test]
    fn regranting_restarts_the_window() {
        let (store, clock) = store_with_clock();
        let token = store.open_session();
        assert!(store.grant_reveal(&token));
        clock.advance(Duration::minutes(20));
        assert!(store.grant_reveal(&token));
        clock.advance(Duration::minutes(20));
        assert!(store.should_reveal(&token));
    }

    #[test]
    fn revoke_is_idempotent() {
        let (store, _clock) = store_with_clock();
        let token = store.open_session();
        assert!(store.grant_reveal(&token));
        store.revoke_reveal(&token);
        assert!(!store.should_reveal(&token));
        store.revoke_reveal(&token);
        assert!(store.is_valid(&token));
    }

    #[test]
    fn session_expiry_severs_the_grant() {
        let (store, clock) = store_with_clock();
        let token = store.open_session();
        assert!(store.grant_reveal(&token));
        clock.advance(Duration::hours(25));
        assert!(!store.is_valid(&token));
        // Eviction took the grant with it, so a later lookup stays false.
        assert!(!store.should_reveal(&token));
    }
}
