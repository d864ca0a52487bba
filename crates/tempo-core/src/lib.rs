//! tempo-core library.
//!
//! Storage engine for recorded time intervals: monthly data files, a tag
//! usage index, and an undo journal, all rooted at one directory.
//!
//! # Conventions
//!
//! - **Errors**: Store operations return [`StoreError`]; configuration
//!   helpers use `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod atomic;
pub mod config;
pub mod cursor;
pub mod error;
pub mod interval;
pub mod journal;
pub mod range;
pub mod shard;
pub mod store;
pub mod tags;

pub use cursor::{Direction, Entries};
pub use error::{ErrorCode, StoreError};
pub use interval::{Interval, ParseError};
pub use range::{Range, segment_range};
pub use store::{AddOutcome, Store};
