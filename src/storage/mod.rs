//! Role-partitioned persistence
//!
//! A single key-value store shared by every role, partitioned by the
//! namespace key convention.

mod kv;
mod namespace;

pub use kv::*;
pub use namespace::*;
