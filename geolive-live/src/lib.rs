//! Live session orchestration: the session lifecycle controller, the
//! polling synchronizer that stands in for push updates, and the lifecycle
//! guard that prevents orphaned broadcasts.
//!
//! Everything here is an in-process layer between a UI shell, the backend
//! REST API ([`geolive_core::api::ApiClient`]) and an external streaming SDK
//! ([`sdk::StreamingSdk`]).

pub mod controller;
pub mod feed;
pub mod guard;
pub mod identity;
pub mod poller;
pub mod sdk;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use controller::{JoinParams, SessionController};
pub use guard::{AppPhase, BackAction, LifecycleGuard};
pub use identity::{AuthProvider, AuthUser, IdentityResolver, IdentityStore};
pub use poller::Poller;
pub use sdk::StreamingSdk;
