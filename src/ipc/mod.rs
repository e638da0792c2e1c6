mod error;
mod handlers;
mod render;
mod router;
mod types;

pub use error::{err, ErrorCode};
pub use router::handle_request;
pub use types::{AppState, Request};
