//! Request and response types

pub mod accept;
pub mod request;
pub mod response;

pub use accept::{AcceptHeader, MediaRange};
pub use request::{FinishedCallback, Request, RequestBuilder, ResponseCallback};
pub use response::Response;
