//! tickring - Lock-Free Ring Transport for Market-Data Hand-Off
//!
//! Bounded ring buffers engineered for sub-microsecond hand-off between a
//! market-data producer and consuming strategies:
//!
//! - [`SpscRing`]: single-producer single-consumer, sequence-counter based,
//!   with cached counterpart indices to minimize cross-core traffic.
//! - [`MpscRing`]: multi-producer single-consumer over one shared slot array,
//!   producers reserve by fetch-add and publish via per-slot occupancy flags.
//!
//! Ring operations never block, never allocate, and never panic; capacity
//! exhaustion is reported to the caller as `false`/`None`.
//!
//! # Example
//!
//! ```
//! use tickring::SpscRing;
//!
//! let ring = SpscRing::<u64>::with_capacity(8);
//! assert!(ring.push(42));
//! assert_eq!(ring.pop(), Some(42));
//! assert_eq!(ring.pop(), None);
//! ```

mod config;
mod invariants;
mod mpsc;
mod spsc;

pub use config::RingConfig;
pub use mpsc::MpscRing;
pub use spsc::SpscRing;
