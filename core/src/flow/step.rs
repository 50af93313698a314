// core/src/flow/step.rs

use super::ContextData;

/// Evaluated right before a step runs; `true` skips the step.
pub type SkipCondition<TData> = std::sync::Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  /// An optional step with no handlers is passed over instead of failing the run.
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}
