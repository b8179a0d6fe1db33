//! Process-wide handle to the active client.
//!
//! The client is registered once at construction; external subsystems
//! (peer relays, the operator surface) look it up here instead of
//! receiving it as an argument, and may subscribe to be poked when the
//! session key changes after authentication.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::client::Client;

type RefreshHook = Box<dyn Fn() + Send + Sync>;

static ACTIVE: OnceLock<Arc<Client>> = OnceLock::new();
static REFRESH: Mutex<Vec<RefreshHook>> = Mutex::new(Vec::new());

/// Record the active client. The first registration wins; later calls
/// are ignored so the handle stays stable for the life of the process.
pub(crate) fn register(client: Arc<Client>) {
    let _ = ACTIVE.set(client);
}

/// The active client, if one has been constructed.
pub fn active() -> Option<Arc<Client>> {
    ACTIVE.get().cloned()
}

/// Subscribe to session-key refreshes. Hooks run on the task that
/// completed authentication, so they should hand off real work.
pub fn subscribe_refresh(hook: impl Fn() + Send + Sync + 'static) {
    REFRESH
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Box::new(hook));
}

/// Poke every refresh subscriber.
pub(crate) fn notify_refresh() {
    for hook in REFRESH
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
    {
        hook();
    }
}
