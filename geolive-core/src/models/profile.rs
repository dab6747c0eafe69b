use serde::Deserialize;

use super::id::UserId;

/// Display name used when nothing in the profile payload resolves.
pub const FALLBACK_VIEWER_NAME: &str = "Viewer";

/// Raw user payload from the backend's user-lookup endpoint.
///
/// Field names vary across backend versions; everything is optional and
/// normalization happens in [`ResolvedProfile::from_record`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default, rename = "userAvatar")]
    pub user_avatar: Option<String>,
}

/// Normalized viewer profile: what polling reconciliation works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
}

impl ResolvedProfile {
    /// Normalize a raw payload.
    ///
    /// Display name falls back through
    /// `displayName → name → username → email local part → "Viewer"`;
    /// avatar through `avatar → photoURL → userAvatar → ""`.
    #[must_use]
    pub fn from_record(id: UserId, record: &UserRecord) -> Self {
        let name = non_blank(record.display_name.as_deref())
            .or_else(|| non_blank(record.name.as_deref()))
            .or_else(|| non_blank(record.username.as_deref()))
            .or_else(|| email_local_part(record.email.as_deref()))
            .unwrap_or_else(|| FALLBACK_VIEWER_NAME.to_string());

        let avatar = non_blank(record.avatar.as_deref())
            .or_else(|| non_blank(record.photo_url.as_deref()))
            .or_else(|| non_blank(record.user_avatar.as_deref()))
            .unwrap_or_default();

        Self { id, name, avatar }
    }

    /// Degraded placeholder returned when the backend lookup fails.
    #[must_use]
    pub fn placeholder(id: UserId) -> Self {
        Self {
            id,
            name: FALLBACK_VIEWER_NAME.to_string(),
            avatar: String::new(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn email_local_part(email: Option<&str>) -> Option<String> {
    let email = email?.trim();
    let local = email.split('@').next()?;
    if local.is_empty() {
        None
    } else {
        Some(local.to_string())
    }
}
