//! judge-core: artifact cache, priority scheduler, and judging pipelines for
//! an online-judge evaluation server.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod sandbox;
pub mod workdir;

pub use cache::ArtifactCache;
pub use config::Config;
pub use error::{ClientError, FatalError, HandlerError};
pub use handlers::PipelineContext;
pub use model::{
    ArtifactEntry, ArtifactType, Checker, Handle, Task, TaskData, TaskResult, TaskStatus,
};
pub use queue::{PriorityQueue, QueuedTask};
pub use registry::TaskRegistry;
pub use scheduler::{Scheduler, SchedulerStatus};
pub use sandbox::process::ProcessSandbox;
pub use sandbox::SandboxRuntime;
