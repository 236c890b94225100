//! Single-consumer task execution and its live queue view.

pub mod queue;
pub mod registry;
pub mod task;
pub mod view;

pub use queue::TaskQueue;
pub use registry::ChannelQueues;
pub use task::{Promptable, Task};
pub use view::{TaskQueueView, spawn_view_ticker};
