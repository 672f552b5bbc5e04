//! Users, projects and login tokens for the skill-sharing service.
//!
//! All operations take a `&Store` and are synchronous; the store is an
//! in-memory, concurrently accessible set of maps.

pub use store::{Id, Store};

pub mod error;
pub mod jwt;
pub mod project;
pub mod skill;
pub mod store;
pub mod user;
