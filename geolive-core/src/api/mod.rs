mod client;
mod types;

pub use client::ApiClient;
pub use types::{
    ApiEnvelope, ApiErrorBody, CommentRecord, CreateStreamRequest, JoinStreamRequest,
    NewCommentRequest, StreamRecord, ViewerEntry,
};
