//! Scheduling core for a hierarchical Gantt planner.
//!
//! The crate owns the task/group graph ([`Plan`]), keeps start dates
//! consistent with finish-to-start dependencies, rolls group ranges up
//! from their descendants, and computes the timeline window and
//! date-to-coordinate mapping a renderer needs. Rendering, forms,
//! dialogs and storage live in the host; it talks to the core through
//! [`Plan`]'s query and mutation surface, the [`io`] snapshot functions,
//! and a caller-supplied `today`.

pub mod date;
pub mod io;
pub mod model;
pub mod schedule;

pub use model::{Plan, RangeMode, Task, TaskKind, TimelineWindow, Viewport};
pub use schedule::PropagationReport;
