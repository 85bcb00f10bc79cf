pub mod plan;
pub mod task;
pub mod timeline;

pub use plan::{Plan, SNAPSHOT_VERSION};
pub use task::{Task, TaskKind};
pub use timeline::{RangeMode, TimelineWindow, Viewport};
