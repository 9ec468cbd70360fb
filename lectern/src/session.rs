//! Client-side authentication state, persisted across restarts.
//!
//! The store holds one authoritative [`Session`] value. `login` and `logout` replace it wholesale,
//! `set_loading` is the only partial mutation, and `init` is the single startup transition that
//! rebuilds it from durable storage. Observers registered with `subscribe` are called
//! synchronously on every transition.

use crate::storage::Storage;
use log::{debug, warn};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Storage key holding the persisted credential record (the identity returned at login)
pub const AUTH_STORAGE_KEY: &str = "auth";

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Identity payload as returned by the backend; shape is owned by the backend
    pub user: Option<Value>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl Session {
    fn authenticated(user: Value) -> Self {
        Session {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
        }
    }

    /// Bearer token carried in the identity payload, if any
    pub fn token(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u["token"].as_str())
            .filter(|t| !t.is_empty())
    }

    /// Best-effort human label for the user: name, then mail, then email
    pub fn display_name(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        user["name"]
            .as_str()
            .or_else(|| user["mail"].as_str())
            .or_else(|| user["email"].as_str())
    }
}

type Observer = Arc<dyn Fn(&Session) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(u64, Observer)>,
}

/// Handle returned by [`SessionStore::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    observers: Weak<Mutex<Observers>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(observers) = self.observers.upgrade() {
            lock(&observers).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Transitions waiting to be shown to observers, in the order they were applied
#[derive(Default)]
struct Delivery {
    pending: VecDeque<Session>,
    active: bool,
}

/// Clears `active` if an observer panics mid-delivery
struct DeliveryGuard<'a> {
    delivery: &'a Mutex<Delivery>,
    armed: bool,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.delivery).active = false;
        }
    }
}

/// Shared, observable session state. Cloning gives another handle on the same state.
///
/// Observers see every transition exactly once, in the order transitions were applied, one at a
/// time. When several threads transition concurrently, a thread already delivering also delivers
/// the others' transitions, so those callers may return before their observers have run. A
/// transition made from inside an observer is delivered after that observer returns.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<Session>>,
    observers: Arc<Mutex<Observers>>,
    delivery: Arc<Mutex<Delivery>>,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // state is always replaced whole, so a poisoned value is still consistent
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionStore {
    /// New store in the Anonymous state. Call [`SessionStore::init`] to load persisted state.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        SessionStore {
            state: Arc::new(Mutex::new(Session::default())),
            observers: Arc::new(Mutex::new(Observers::default())),
            delivery: Arc::new(Mutex::new(Delivery::default())),
            storage,
        }
    }

    pub fn snapshot(&self) -> Session {
        lock(&self.state).clone()
    }

    pub fn login(&self, identity: Value) {
        match serde_json::to_string(&identity) {
            Ok(serialized) => {
                if let Err(e) = self.storage.set(AUTH_STORAGE_KEY, &serialized) {
                    warn!("failed to persist session record: {e}");
                }
            }
            Err(e) => warn!("failed to serialize session record: {e}"),
        }
        self.replace(Session::authenticated(identity));
    }

    pub fn logout(&self) {
        self.replace(Session::default());
        if let Err(e) = self.storage.remove(AUTH_STORAGE_KEY) {
            warn!("failed to remove persisted session record: {e}");
        }
    }

    pub fn set_loading(&self, loading: bool) {
        self.transition(|state| state.is_loading = loading);
    }

    /// Rebuilds the session from the persisted record, if there is a usable one.
    ///
    /// A record that is not a JSON object is purged and the session stays Anonymous.
    pub fn init(&self) {
        let stored = match self.storage.get(AUTH_STORAGE_KEY) {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!("no persisted session record");
                return;
            }
            Err(e) => {
                warn!("failed to read persisted session record: {e}");
                return;
            }
        };
        match serde_json::from_str::<Value>(&stored) {
            Ok(user @ Value::Object(_)) => {
                debug!("restored persisted session");
                self.replace(Session::authenticated(user));
            }
            Ok(_) | Err(_) => {
                warn!("purging malformed persisted session record");
                if let Err(e) = self.storage.remove(AUTH_STORAGE_KEY) {
                    warn!("failed to remove persisted session record: {e}");
                }
            }
        }
    }

    /// Token from the persisted record, read fresh from storage on every call.
    ///
    /// Missing, malformed, or empty tokens all come back as `None`.
    pub fn persisted_token(&self) -> Option<String> {
        let stored = match self.storage.get(AUTH_STORAGE_KEY) {
            Ok(stored) => stored?,
            Err(e) => {
                debug!("could not read session record for auth header: {e}");
                return None;
            }
        };
        let record: Value = serde_json::from_str(&stored).ok()?;
        record["token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
    }

    /// Registers an observer, calling it right away with the current state and then on every
    /// transition.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        let id = {
            let mut observers = lock(&self.observers);
            let id = observers.next_id;
            observers.next_id += 1;
            observers.entries.push((id, observer.clone()));
            id
        };
        observer(&self.snapshot());
        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    fn replace(&self, session: Session) {
        self.transition(|state| *state = session);
    }

    fn transition(&self, change: impl FnOnce(&mut Session)) {
        {
            // queue under the state lock so queue order is application order
            let mut state = lock(&self.state);
            change(&mut state);
            lock(&self.delivery).pending.push_back(state.clone());
        }
        self.deliver();
    }

    /// Drains queued transitions to observers, unless another call is already draining
    fn deliver(&self) {
        {
            let mut delivery = lock(&self.delivery);
            if delivery.active {
                return;
            }
            delivery.active = true;
        }
        let mut guard = DeliveryGuard {
            delivery: &self.delivery,
            armed: true,
        };
        loop {
            let next = {
                let mut delivery = lock(&self.delivery);
                match delivery.pending.pop_front() {
                    Some(session) => session,
                    None => {
                        delivery.active = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            self.notify(&next);
        }
    }

    fn notify(&self, session: &Session) {
        // observers run outside of every lock, so they may call back into the store
        let observers: Vec<Observer> = lock(&self.observers)
            .entries
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for observer in observers {
            observer(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn store_with(storage: &Arc<MemoryStorage>) -> SessionStore {
        SessionStore::new(storage.clone())
    }

    #[test]
    fn test_default_anonymous() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.snapshot(), Session::default());
        assert!(!store.snapshot().is_authenticated);
        assert_eq!(store.persisted_token(), None);
    }

    #[test]
    fn test_login_logout() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        let alice = json!({"name": "alice", "token": "abc123"});

        store.login(alice.clone());
        let state = store.snapshot();
        assert_eq!(state.user, Some(alice));
        assert!(state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(state.token(), Some("abc123"));
        assert_eq!(state.display_name(), Some("alice"));
        assert_eq!(store.persisted_token().as_deref(), Some("abc123"));

        store.logout();
        assert_eq!(store.snapshot(), Session::default());
        assert_eq!(storage.get(AUTH_STORAGE_KEY).unwrap(), None);

        // idempotent
        store.logout();
        assert_eq!(store.snapshot(), Session::default());
    }

    #[test]
    fn test_set_loading_preserves_identity() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.set_loading(true);
        assert!(store.snapshot().is_loading);
        assert!(!store.snapshot().is_authenticated);

        store.login(json!({"token": "t"}));
        store.set_loading(true);
        let state = store.snapshot();
        assert!(state.is_loading);
        assert!(state.is_authenticated);
        assert_eq!(state.token(), Some("t"));
        store.set_loading(false);
        assert!(!store.snapshot().is_loading);
    }

    #[test]
    fn test_init_after_restart() {
        let storage = Arc::new(MemoryStorage::new());
        let alice = json!({"mail": "alice@example.com", "token": "abc123"});
        store_with(&storage).login(alice.clone());

        // fresh in-memory state, same storage
        let restarted = store_with(&storage);
        assert!(!restarted.snapshot().is_authenticated);
        restarted.init();
        let state = restarted.snapshot();
        assert_eq!(state.user, Some(alice));
        assert!(state.is_authenticated);
        assert!(!state.is_loading);
    }

    #[test]
    fn test_init_purges_corrupt_record() {
        for corrupt in ["{not json", "\"just a string\"", "null", "[1, 2]"] {
            let storage = Arc::new(MemoryStorage::new());
            storage.set(AUTH_STORAGE_KEY, corrupt).unwrap();
            let store = store_with(&storage);
            store.init();
            assert_eq!(store.snapshot(), Session::default());
            assert_eq!(storage.get(AUTH_STORAGE_KEY).unwrap(), None);

            // nothing left for a second init to find
            store.init();
            assert_eq!(store.snapshot(), Session::default());
        }
    }

    #[test]
    fn test_init_without_record() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.init();
        assert_eq!(store.snapshot(), Session::default());
    }

    #[test]
    fn test_no_residue_between_logins() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.login(json!({"name": "x", "token": "tx", "role": "admin"}));
        store.logout();
        let y = json!({"name": "y", "token": "ty"});
        store.login(y.clone());

        let state = store.snapshot();
        assert_eq!(state.user, Some(y.clone()));
        assert!(state.is_authenticated);
        assert_eq!(store.persisted_token().as_deref(), Some("ty"));
        let persisted: Value =
            serde_json::from_str(&storage.get(AUTH_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, y);
    }

    #[test]
    fn test_persisted_token_edge_cases() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        storage.set(AUTH_STORAGE_KEY, r#"{"token": ""}"#).unwrap();
        assert_eq!(store.persisted_token(), None);
        storage.set(AUTH_STORAGE_KEY, r#"{"name": "no token"}"#).unwrap();
        assert_eq!(store.persisted_token(), None);
        storage.set(AUTH_STORAGE_KEY, "garbage").unwrap();
        assert_eq!(store.persisted_token(), None);
        storage.set(AUTH_STORAGE_KEY, r#"{"token": 42}"#).unwrap();
        assert_eq!(store.persisted_token(), None);
    }

    #[test]
    fn test_subscribe() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let first: Arc<Mutex<Vec<Session>>> = Default::default();
        let second: Arc<Mutex<Vec<Session>>> = Default::default();

        let sink = first.clone();
        let sub_first = store.subscribe(move |s| sink.lock().unwrap().push(s.clone()));
        let sink = second.clone();
        let _sub_second = store.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

        // immediate call with the current state
        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(first.lock().unwrap()[0], Session::default());

        store.login(json!({"token": "abc"}));
        store.set_loading(true);
        assert_eq!(first.lock().unwrap().len(), 3);
        assert!(first.lock().unwrap()[1].is_authenticated);
        assert!(first.lock().unwrap()[2].is_loading);

        sub_first.unsubscribe();
        store.logout();
        assert_eq!(first.lock().unwrap().len(), 3);
        assert_eq!(second.lock().unwrap().len(), 4);
        assert_eq!(second.lock().unwrap()[3], Session::default());
    }

    #[test]
    fn test_observer_can_read_store() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let seen: Arc<Mutex<Vec<bool>>> = Default::default();
        let sink = seen.clone();
        let inner = store.clone();
        let _sub = store.subscribe(move |_| {
            sink.lock().unwrap().push(inner.snapshot().is_authenticated);
        });
        store.login(json!({"token": "abc"}));
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn test_observer_transition_is_delivered_after() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let seen: Arc<Mutex<Vec<bool>>> = Default::default();
        let sink = seen.clone();
        let inner = store.clone();
        let _sub = store.subscribe(move |s| {
            sink.lock().unwrap().push(s.is_authenticated);
            // kick every login straight back out
            if s.is_authenticated {
                inner.logout();
            }
        });
        store.login(json!({"token": "abc"}));
        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
        assert_eq!(store.snapshot(), Session::default());
    }

    #[test]
    fn test_concurrent_transitions_ordered() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let seen: Arc<Mutex<Vec<Session>>> = Default::default();
        let sink = seen.clone();
        let _sub = store.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        match (i + j) % 3 {
                            0 => store.login(json!({"name": format!("u{i}-{j}"), "token": "t"})),
                            1 => store.set_loading(j % 2 == 0),
                            _ => store.logout(),
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        // the initial call plus one delivery per transition
        assert_eq!(seen.len(), 1 + 8 * 50);
        assert_eq!(seen.last(), Some(&store.snapshot()));
    }

    /// Storage that refuses all writes
    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("read-only"))
        }
        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("read-only"))
        }
    }

    #[test]
    fn test_storage_failures_swallowed() {
        let store = SessionStore::new(Arc::new(ReadOnlyStorage));
        store.login(json!({"token": "abc"}));
        assert!(store.snapshot().is_authenticated);
        store.logout();
        assert!(!store.snapshot().is_authenticated);
    }
}
