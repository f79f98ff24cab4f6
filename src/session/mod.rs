//! Session credential subsystem.
//!
//! # Responsibilities
//! - Hold the bearer credential and user descriptor
//! - Persist them across process restarts (JSON file)
//! - Broadcast sign-in / sign-out / expiry so the UI can route to login
//!
//! # Design Decisions
//! - Read by the gateway on every request, cleared on HTTP 401
//! - Expiry is fire-and-forget from the caller's perspective

pub mod store;

pub use store::{Session, SessionEvent, SessionStore, UserDescriptor};
