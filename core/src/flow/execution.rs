// core/src/flow/execution.rs

//! `Pipeline::run`: walks the steps in order and executes their handlers.

use super::context_data::ContextData;
use super::control::{PipelineControl, PipelineResult};
use super::pipeline::{Handler, Pipeline};
use super::step::StepDef;
use crate::error::ShopError;
use tracing::{event, instrument, span, Instrument, Level};

enum PhaseOutcome<Err> {
  Continue,
  Stopped,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<ShopError> + Send + Sync + 'static,
{
  /// Executes every step against `ctx_data`.
  ///
  /// A step whose `skip_if` holds is passed over. A non-optional step with no
  /// handlers at all fails the run with `ShopError::HandlerMissing`. When a
  /// handler fails, the step's compensations run (in registration order) and
  /// the handler's error is returned unchanged.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(Level::INFO, "pipeline_step", step_name = %step_def.name, step_index = step_idx);
      match self.run_step(step_def, &ctx_data).instrument(step_span).await {
        PhaseOutcome::Continue => {}
        PhaseOutcome::Stopped => return Ok(PipelineResult::Stopped),
        PhaseOutcome::Failed(e) => return Err(e),
      }
    }

    event!(Level::DEBUG, "Pipeline completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> PhaseOutcome<Err> {
    let step_name = step_def.name.as_str();

    if let Some(skip_if) = &step_def.skip_if {
      if skip_if(ctx_data.clone()) {
        event!(Level::DEBUG, "Step skipped by its condition.");
        return PhaseOutcome::Continue;
      }
    }

    let phases = [
      ("before", self.before.get(step_name)),
      ("on", self.on.get(step_name)),
      ("after", self.after.get(step_name)),
    ];
    let has_handlers = phases.iter().any(|(_, hs)| hs.map_or(false, |v| !v.is_empty()));
    if !has_handlers {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, passing over it.");
        return PhaseOutcome::Continue;
      }
      event!(Level::ERROR, "Required step has no handlers.");
      return PhaseOutcome::Failed(Err::from(ShopError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for (phase, handlers) in phases {
      let Some(handlers) = handlers else { continue };
      match run_phase(phase, handlers, ctx_data).await {
        PhaseOutcome::Continue => {}
        PhaseOutcome::Stopped => {
          event!(Level::INFO, phase, "Pipeline stopped by a handler.");
          return PhaseOutcome::Stopped;
        }
        PhaseOutcome::Failed(e) => {
          event!(Level::ERROR, phase, error = %e, "Step failed.");
          self.compensate(step_name, ctx_data).await;
          return PhaseOutcome::Failed(e);
        }
      }
    }
    PhaseOutcome::Continue
  }

  async fn compensate(&self, step_name: &str, ctx_data: &ContextData<TData>) {
    let Some(compensations) = self.compensations.get(step_name) else {
      return;
    };
    for (idx, compensation) in compensations.iter().enumerate() {
      match compensation(ctx_data.clone()).await {
        Ok(()) => event!(Level::INFO, compensation_index = idx, "Compensation applied."),
        Err(msg) => event!(Level::WARN, compensation_index = idx, error = %msg, "Compensation failed."),
      }
    }
  }
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> PhaseOutcome<Err>
where
  TData: 'static + Send + Sync,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    event!(Level::TRACE, phase, handler_index = handler_idx, "Executing handler.");
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return PhaseOutcome::Stopped,
      Err(e) => return PhaseOutcome::Failed(e),
    }
  }
  PhaseOutcome::Continue
}
