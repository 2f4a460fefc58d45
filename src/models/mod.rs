pub mod dashboard;
pub mod execution;
pub mod job;
pub mod message;

pub use dashboard::*;
pub use execution::*;
pub use job::*;
pub use message::*;
