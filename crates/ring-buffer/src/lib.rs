//! Bounded Ring Buffer
//!
//! Fixed-capacity rolling window used for per-session sample history
//! (mood smoothing, eye-closure history, warning log).

mod buffer;

pub use buffer::{RingBuffer, DEFAULT_CAPACITY};
