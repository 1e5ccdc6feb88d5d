pub mod get;
pub mod submit;
pub mod stream;

pub use get::{GetResponse, GetResultMetadata};
pub use stream::{LastEventId, StreamFrame, StreamSubscribeParams};
pub use submit::{ResearchControls, ResearchStrategy, SubmitRequest, SubmitValidationError};
