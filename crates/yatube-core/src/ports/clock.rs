use chrono::{DateTime, Utc};

/// Source of the current time, injected wherever timestamps or expiry
/// are computed so tests can pin or advance it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
