//! Terminal chat client for the skillshare server.
//!
//! - `api_client`: REST login and registration
//! - `reconciler`: per-room display sequence with optimistic sends
//! - `session`: the single live transport and the identity it carries

pub mod api_client;
pub mod reconciler;
pub mod session;

pub use api_client::{ApiClient, Login};
pub use reconciler::{Entry, EntryState, LocalId, Reconciled, Reconciler};
pub use session::{ChatSession, Update};
