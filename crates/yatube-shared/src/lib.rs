//! # Yatube Shared
//!
//! Wire types shared between the server and its clients. Kept free of
//! domain and infrastructure crates so a client can depend on it alone.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
