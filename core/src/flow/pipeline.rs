// core/src/flow/pipeline.rs

//! The `Pipeline<TData, Err>` definition and handler registration.

use super::context_data::ContextData;
use super::control::PipelineControl;
use super::step::{SkipCondition, StepDef};
use crate::error::ShopError;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use tracing::{event, Level};

/// A boxed step handler. It owns a clone of the shared context and resolves to
/// a control signal or the pipeline's error.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// Runs after a step has failed. It cannot change the outcome of the run; a
/// compensation that itself fails is logged and ignored.
pub type Compensation<TData> =
  Box<dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>> + Send + Sync>;

/// An ordered list of named steps over a shared context `TData`.
///
/// Each step may carry `before`, `on` and `after` handlers, executed in that
/// order, plus compensations that only run when one of the step's handlers
/// returns an error. `Err` must absorb `ShopError` so that framework problems
/// (a required step with no handlers) surface through the same type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<ShopError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) compensations: HashMap<String, Vec<Compensation<TData>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<ShopError> + Send + Sync + 'static,
{
  /// `(name, optional, skip_if)` per step, in execution order.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
      compensations: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics on an unknown step name.
  fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Pipeline setup error: step '{}' is not defined.", step_name);
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) -> Result<(), ShopError> {
    let step = self
      .steps
      .iter_mut()
      .find(|s| s.name == step_name)
      .ok_or_else(|| ShopError::StepNotFound {
        step_name: step_name.to_string(),
      })?;
    step.skip_if = skip_if;
    Ok(())
  }

  fn boxed<F, UserErr>(handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static) -> Handler<TData, Err>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    })
  }

  pub fn before_step<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = Self::boxed(handler_fn);
    self.before.entry(step_name.to_string()).or_default().push(handler);
  }

  pub fn on_step<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = Self::boxed(handler_fn);
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  pub fn after_step<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = Self::boxed(handler_fn);
    self.after.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers a compensation for `step_name`, run when that step fails.
  pub fn on_failure<F, CompErr>(
    &mut self,
    step_name: &str,
    compensation_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<(), CompErr>> + Send + 'static,
    CompErr: Display + Send + 'static,
  {
    self.ensure_step_exists(step_name);
    let compensation: Compensation<TData> = Box::new(move |ctx_data| {
      let fut = compensation_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(|e| e.to_string()) })
    });
    self
      .compensations
      .entry(step_name.to_string())
      .or_default()
      .push(compensation);
    event!(Level::DEBUG, %step_name, "Compensation registered.");
  }
}
