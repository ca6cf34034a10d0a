//! Two-tier audio cache
//!
//! - [`SessionCache`]: in-process map, checked first, never persisted
//! - [`DurableCache`]: persistent store that survives restarts, faults absorbed

mod durable;
mod session;

pub use durable::{AudioRecord, AudioStore, DEFAULT_MAX_AGE, DurableCache, RecordStamp, StoreState};
pub use session::{AudioClip, SessionCache};
