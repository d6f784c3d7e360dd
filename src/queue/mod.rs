//! Single-consumer task queue.
//!
//! Every task added to one `TaskQueue` runs on a single worker, one at a
//! time, in the order `add` was called. Each caller gets a `TaskHandle`
//! that resolves to its own task's outcome; a failed or panicking task only
//! affects its own handle.
//!
//! # Example
//!
//! ```ignore
//! let queue = TaskQueue::new();
//!
//! let first = queue.add(async { Ok(1) });
//! let second = queue.add(async { Ok(2) });
//!
//! assert_eq!(first.await?, 1);
//! assert_eq!(second.await?, 2);
//! ```

mod task_queue;

pub use task_queue::{TaskHandle, TaskQueue};
