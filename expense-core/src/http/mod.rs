//! HTTP plumbing: transport defaults, replayable requests and the
//! authenticated request pipeline.

mod message;
mod pipeline;
mod request;

pub use message::{ApiResponse, AuthMode, MultipartField, PendingRequest, RequestBody};
pub use pipeline::{RequestPipeline, REFRESH_PATH};
