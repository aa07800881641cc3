//! Application state shared across handlers

use crate::identity::IdentityClient;
use crate::ledger::EventLedger;
use crate::repositories::EventRepository;

/// Ledger type the service runs with
pub type AppLedger = EventLedger<EventRepository>;

/// Application state shared across handlers
///
/// Both collaborators are constructed once in `main` and injected
/// here; nothing in the service reaches for a global client.
#[derive(Clone)]
pub struct AppState {
    pub ledger: AppLedger,
    pub identity: IdentityClient,
}
