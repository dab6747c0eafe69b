//! Shared fakes for controller and guard tests.

use std::sync::Arc;

use geolive_core::models::UserId;

use crate::identity::{AuthUser, IdentityResolver, MockAuthProvider, MockIdentityStore};
use crate::sdk::MockStreamingSdk;

/// SDK mock that accepts every call any number of times.
pub fn lenient_sdk() -> MockStreamingSdk {
    let mut sdk = MockStreamingSdk::new();
    sdk.expect_initialize().returning(|_, _, _, _| Ok(()));
    sdk.expect_start_broadcast().returning(|| Ok(()));
    sdk.expect_stop_broadcast().returning(|| Ok(()));
    sdk.expect_disconnect().returning(|| Ok(()));
    sdk
}

/// Resolver whose stored and authenticated identities agree.
pub fn fixed_identity(user_id: &str) -> Arc<IdentityResolver> {
    split_identity(user_id, user_id)
}

/// Resolver with a stored id that differs from the auth provider's id, for
/// exercising the ownership-mismatch retry.
pub fn split_identity(stored_id: &str, auth_id: &str) -> Arc<IdentityResolver> {
    let stored = UserId::from_string(stored_id.to_string());
    let mut store = MockIdentityStore::new();
    store
        .expect_stored_user_id()
        .returning(move || Some(stored.clone()));

    let authed = UserId::from_string(auth_id.to_string());
    let mut auth = MockAuthProvider::new();
    auth.expect_current_user().returning(move || {
        Some(AuthUser {
            id: authed.clone(),
            display_name: Some("Tester".to_string()),
            avatar: None,
            email: None,
        })
    });

    Arc::new(IdentityResolver::new(Arc::new(store), Arc::new(auth)))
}
