//! A fixed-cell mark-and-sweep object pool.
//!
//! `cellpool` hands out fixed-size cells from one contiguous backing
//! buffer and reclaims them with a lazy, cooperative mark-and-sweep cycle:
//! callers provide a mark callback that walks their own root set and an
//! optional finalizer callback run on each cell as it is reclaimed.
//!
//! Two flavors of pool are available:
//!
//! - [`Pool::new_fixed`]: a fixed arena over a caller-owned buffer. Never
//!   allocates; `alloc` simply returns `None` once every cell is live.
//! - [`Pool::new_growable`]: owns its backing buffer through a memory
//!   callback and doubles it when survival after a collection is high.
//!
//! # Quick Start
//!
//! ```ignore
//! use cellpool::{generic_memory_callback, Pool};
//!
//! let mut pool = Pool::new_growable(
//!     16,
//!     4,
//!     generic_memory_callback(),
//!     Box::new(|_pool| Ok(())),
//!     None,
//! )?;
//!
//! let id = pool.alloc().expect("pool exhausted");
//! pool.mark(id);
//! # Ok::<(), cellpool::PoolError>(())
//! ```
//!
//! # Reachability-driven collection
//!
//! ```ignore
//! use cellpool::Pool;
//!
//! // A mark callback walks whatever root set the caller maintains and
//! // calls `pool.mark(id)` for each reachable cell; anything left unmarked
//! // after the callback runs is finalized and reclaimed on the next sweep.
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

mod callbacks;
mod error;
mod id;
mod markbits;
mod metrics;
mod pool;
mod tracing_support;

pub use callbacks::{generic_memory_callback, FreeCallback, MarkCallback, MemoryCallback};
pub use error::PoolError;
pub use id::CellId;
pub use metrics::PoolMetrics;
pub use pool::{DefaultId, Pool};
