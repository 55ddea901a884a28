//! Persisted record types.

pub mod plan;
pub mod prediction;
pub mod subscription;

pub use self::plan::*;
pub use self::prediction::*;
pub use self::subscription::*;
