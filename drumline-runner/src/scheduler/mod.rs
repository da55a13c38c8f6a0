//! Work scheduling
//!
//! A store poller feeds Pending job ids into a bounded queue and a fixed
//! worker pool consumes it. Duplicate deliveries are expected and harmless:
//! the atomic claim in the job store makes every run at-most-once.

pub mod poller;
pub mod pool;

pub use poller::Poller;
pub use pool::WorkerPool;
