//! Middleware modules.

pub mod auth;
pub mod block;
pub mod error;
pub mod request_id;
