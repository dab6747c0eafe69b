use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::location::GeoPoint;
use super::profile::ResolvedProfile;

/// A participant observing a session.
///
/// Materialized fresh on every poll tick from the backend's viewer-id list;
/// never persisted beyond the current in-memory set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
    /// Host-side distance display only; optional.
    pub location: Option<GeoPoint>,
}

impl Viewer {
    #[must_use]
    pub fn from_profile(profile: ResolvedProfile, location: Option<GeoPoint>) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            avatar: profile.avatar,
            location,
        }
    }
}
