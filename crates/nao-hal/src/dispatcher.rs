//! [`ActionDispatcher`] – executes a validated [`Plan`] against an
//! [`Actuator`].
//!
//! Steps run strictly in plan order; the order *is* the gesture sequence.
//! A step is skipped (logged, recorded in the [`DispatchReport`]) when:
//!
//! * its action is outside the vocabulary ([`NaoError::UnknownAction`]);
//! * it is a `move` without one of `x`, `y`, `theta`
//!   ([`NaoError::MissingParameter`]) or with a non-numeric value
//!   ([`NaoError::InvalidParameter`]);
//! * the actuator refuses it.
//!
//! A skipped step never aborts the rest of the plan. After every step the
//! actuator accepted, the dispatcher waits according to its [`StepPacing`]
//! so one gesture visibly completes before the next begins.

use std::time::Duration;

use nao_types::{ActionKind, ActionName, ActionStep, NaoError, Parameters, Plan};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::actuator::{Actuator, MoveTarget};

/// Default pause after each successful step.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(1);

/// How long to wait after a successfully dispatched step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPacing {
    /// Proceed immediately; the actuator's return is the completion signal.
    None,
    /// Sleep for a fixed duration.
    Fixed(Duration),
}

impl Default for StepPacing {
    fn default() -> Self {
        StepPacing::Fixed(DEFAULT_STEP_DELAY)
    }
}

/// A plan step that was not executed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStep {
    /// Zero-based position in the plan.
    pub index: usize,
    /// The step's action name as written in the plan.
    pub action: String,
    pub error: NaoError,
}

/// Outcome of executing one plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Actions the actuator accepted, in execution order.
    pub executed: Vec<ActionName>,
    pub skipped: Vec<SkippedStep>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Maps plan steps onto [`Actuator`] calls.
pub struct ActionDispatcher {
    actuator: Box<dyn Actuator>,
    pacing: StepPacing,
}

impl ActionDispatcher {
    pub fn new(actuator: Box<dyn Actuator>, pacing: StepPacing) -> Self {
        Self { actuator, pacing }
    }

    pub fn pacing(&self) -> StepPacing {
        self.pacing
    }

    /// Execute every step of `plan` in order.
    pub async fn execute(&mut self, plan: &Plan) -> DispatchReport {
        info!(steps = plan.len(), "executing action plan");
        let mut report = DispatchReport::default();

        for (index, step) in plan.actions().iter().enumerate() {
            match self.dispatch_step(step) {
                Ok(action) => {
                    info!(step = index + 1, action = %action, params = ?step.parameters, "step executed");
                    report.executed.push(action);
                    self.pace().await;
                }
                Err(e) => {
                    match &e {
                        NaoError::UnknownAction(name) => {
                            warn!(step = index + 1, action = %name, "Unknown action: {name}");
                        }
                        _ => {
                            error!(step = index + 1, action = %step.action, error = %e, "step skipped");
                        }
                    }
                    report.skipped.push(SkippedStep {
                        index,
                        action: step.action.to_string(),
                        error: e,
                    });
                }
            }
        }
        report
    }

    /// Dispatch a single step without pacing.
    ///
    /// # Errors
    ///
    /// See the module documentation for the skip conditions.
    pub fn dispatch_step(&mut self, step: &ActionStep) -> Result<ActionName, NaoError> {
        let action = match &step.action {
            ActionKind::Known(action) => *action,
            ActionKind::Unknown(name) => return Err(NaoError::UnknownAction(name.clone())),
        };
        let params = &step.parameters;

        match action {
            ActionName::Speak => self.actuator.speak(params),
            ActionName::Stand => self.actuator.stand(),
            ActionName::Sit => self.actuator.sit(),
            ActionName::Wave => self.actuator.wave(params),
            ActionName::NodHead => self.actuator.nod_head(params),
            ActionName::TurnHead => self.actuator.turn_head(params),
            ActionName::GazeHead => self.actuator.gaze_head(params),
            ActionName::RaiseArms => self.actuator.raise_arms(params),
            ActionName::Move => {
                let target = move_target(params)?;
                self.actuator.move_to(target)
            }
            ActionName::Handshake => self.actuator.handshake(params),
            ActionName::ResetNaoPose => self.actuator.reset_pose(),
        }?;
        Ok(action)
    }

    async fn pace(&self) {
        if let StepPacing::Fixed(delay) = self.pacing {
            tokio::time::sleep(delay).await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// `move` parameter contract
// ─────────────────────────────────────────────────────────────────────────────

const MOVE_PARAMS: [&str; 3] = ["x", "y", "theta"];

fn move_target(params: &Parameters) -> Result<MoveTarget, NaoError> {
    // Report a missing parameter before complaining about a malformed one.
    if let Some(missing) = MOVE_PARAMS
        .iter()
        .find(|k| params.get(**k).is_none_or(Value::is_null))
    {
        return Err(NaoError::MissingParameter {
            action: ActionName::Move.to_string(),
            parameter: missing.to_string(),
        });
    }
    Ok(MoveTarget {
        x: numeric(params, "x")?,
        y: numeric(params, "y")?,
        theta: numeric(params, "theta")?,
    })
}

/// Read `key` as a number; numeric strings such as `"0.5"` are accepted.
fn numeric(params: &Parameters, key: &str) -> Result<f32, NaoError> {
    let value = params.get(key);
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    // Narrow before the finiteness check: values beyond f32 range become inf.
    parsed
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .ok_or_else(|| NaoError::InvalidParameter {
            action: ActionName::Move.to_string(),
            parameter: key.to_string(),
            details: format!("expected a number, got {}", value.unwrap_or(&Value::Null)),
        })
}
