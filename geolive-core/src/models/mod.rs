mod comment;
mod id;
mod location;
mod profile;
mod session;
mod viewer;

pub use comment::{now_ms, Comment};
pub use id::{generate_id, RoomId, StreamId, UserId};
pub use location::{format_distance, GeoPoint};
pub use profile::{ResolvedProfile, UserRecord, FALLBACK_VIEWER_NAME};
pub use session::{LiveSession, SessionState};
pub use viewer::Viewer;
