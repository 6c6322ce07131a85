//! Wire types for the local inference server and the HTTP plumbing shared by
//! every transport.

pub mod chat;
pub mod generate;
mod http;
mod models;
pub mod pull;
mod shared;

pub use http::*;
pub use models::*;
pub use shared::*;
