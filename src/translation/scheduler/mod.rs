//! 调度模块
//!
//! 串行任务队列和变更观察器。

pub mod observer;
pub mod queue;

pub use observer::{MutationKind, MutationObserver, ObserverState};
pub use queue::{QueuedTask, SerialQueue};
