//! Model Module
//!
//! Domain types for the Project entity.
//!
//! ## Contents
//! - `Project`: the canonical record (system + domain fields)
//! - `ProjectInput` / `ProjectPatch`: typed create and update inputs
//! - `Timestamp` / `Clock`: ISO-8601 instants with millisecond precision
//! - `IdGenerator`: opaque unique ids for new records

mod id;
mod project;
mod timestamp;

pub use id::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use project::{Identity, Project, ProjectInput, ProjectPatch};
pub use timestamp::{Clock, ManualClock, SystemClock, Timestamp};

/// Entity name used in messages
pub const ENTITY_NAME: &str = "Project";
