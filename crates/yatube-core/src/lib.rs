//! # Yatube Core
//!
//! The domain layer of Yatube: entities, the error taxonomy, ports for
//! storage/cache/auth, pagination and the services composing feeds and
//! guarding writes. Pure business logic with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod services;
pub mod validation;

pub use error::DomainError;
pub use pagination::{POSTS_PER_PAGE, Page, PageNumber, paginate};
