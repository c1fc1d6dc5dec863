//! Session model for Campus clients: the durable token store, the
//! subscribable in-memory session state, and the shared profile types.
//!
//! This crate performs no network I/O. The HTTP surface lives in
//! `campus-client`, which composes these pieces into a session-managed
//! API client.

pub mod state;
pub mod store;
pub mod types;

pub use state::{SessionState, SubscriptionId};
pub use store::{MemoryTokenStore, SessionUpdate, StoredSession, TokenStore};
pub use types::{ListEnvelope, Session, SessionStatus, UserProfile, UserRole};
