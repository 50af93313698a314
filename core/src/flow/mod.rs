// core/src/flow/mod.rs

//! A small step pipeline: named steps with before/on/after handlers, skip
//! conditions, optional steps and failure compensations, all operating on a
//! shared `ContextData<T>`. Checkout is built on it.

pub mod context_data;
pub mod control;
pub mod execution;
pub mod pipeline;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use pipeline::{Compensation, Handler, Pipeline};
pub use step::{SkipCondition, StepDef};
