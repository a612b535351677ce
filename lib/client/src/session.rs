use std::collections::HashMap;
use std::fmt;

/// Store key under which the session credential is persisted.
pub const CREDENTIAL_KEY: &str = "graphdesk.credential";
/// Store key under which the principal name is persisted.
pub const PRINCIPAL_KEY: &str = "graphdesk.principal";

/// A string-keyed persistent store for the session, such as a browser local store
/// or a file on disk.
///
/// The store is not a synchronization point: concurrent pages may race on it and
/// the last write wins.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// The locally cached authentication state of one page.
///
/// A session is established by a successful login only and cleared by logout or by
/// a terminal authentication status on any exchange. There is no partial state: a
/// session either has both a credential and a principal name, or neither.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<String>,
    principal: Option<String>,
}

impl Session {
    /// Creates a logged-out session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates an established session for the given identity.
    pub fn established(principal: impl Into<String>, credential: impl Into<String>) -> Self {
        Session {
            credential: Some(credential.into()),
            principal: Some(principal.into()),
        }
    }

    /// Restores a session from the persistent store.
    ///
    /// The absence of either key means logged out.
    pub fn restore(store: &dyn SessionStore) -> Self {
        match (store.get(PRINCIPAL_KEY), store.get(CREDENTIAL_KEY)) {
            (Some(principal), Some(credential)) => Session::established(principal, credential),
            _ => Session::anonymous(),
        }
    }

    /// Writes this session to the persistent store.
    pub fn persist(&self, store: &mut dyn SessionStore) {
        match (&self.principal, &self.credential) {
            (Some(principal), Some(credential)) => {
                store.set(PRINCIPAL_KEY, principal);
                store.set(CREDENTIAL_KEY, credential);
            }
            _ => Self::erase(store),
        }
    }

    /// Removes any persisted session from the store.
    pub fn erase(store: &mut dyn SessionStore) {
        store.remove(PRINCIPAL_KEY);
        store.remove(CREDENTIAL_KEY);
    }

    pub fn is_logged_in(&self) -> bool {
        self.principal.is_some()
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The credential is never logged.
        f.debug_struct("Session")
            .field("principal", &self.principal)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// An in-memory [SessionStore], mainly useful in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_requires_both_keys() {
        let mut store = MemoryStore::new();
        assert_eq!(Session::restore(&store), Session::anonymous());

        store.set(PRINCIPAL_KEY, "admin");
        assert_eq!(Session::restore(&store), Session::anonymous());

        store.set(CREDENTIAL_KEY, "token");
        let session = Session::restore(&store);
        assert!(session.is_logged_in());
        assert_eq!(session.principal(), Some("admin"));
        assert_eq!(session.credential(), Some("token"));
    }

    #[test]
    fn persist_and_erase_round_trip() {
        let mut store = MemoryStore::new();
        Session::established("admin", "token").persist(&mut store);
        assert_eq!(store.get(PRINCIPAL_KEY).as_deref(), Some("admin"));

        Session::erase(&mut store);
        assert_eq!(Session::restore(&store), Session::anonymous());
    }

    #[test]
    fn persisting_an_anonymous_session_erases() {
        let mut store = MemoryStore::new();
        Session::established("admin", "token").persist(&mut store);
        Session::anonymous().persist(&mut store);
        assert_eq!(store.get(CREDENTIAL_KEY), None);
    }

    #[test]
    fn debug_does_not_leak_the_credential() {
        let session = Session::established("admin", "secret-token");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
    }
}
