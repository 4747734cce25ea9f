//! # Slide Shared
//!
//! Wire types for the HTTP surface, shared between the server and its clients.

pub mod dto;
pub mod response;

pub use dto::{HitRequest, HitResponse};
pub use response::{ApiResponse, ErrorResponse};
