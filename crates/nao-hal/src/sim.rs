//! In-process simulated NAO for tests and headless runs.
//!
//! [`SimNao`] implements [`Actuator`] without any hardware. Like a real
//! driver it validates its own parameters, tracks posture and odometry, and
//! refuses to walk while seated. Every accepted call is appended to a journal
//! that stays readable through a [`SimHandle`] after the actuator itself has
//! been moved into a dispatcher.
//!
//! # Example
//!
//! ```rust
//! use nao_hal::sim::{Posture, SimNao};
//! use nao_hal::actuator::{Actuator, MoveTarget};
//!
//! let mut nao = SimNao::new();
//! let handle = nao.handle();
//!
//! nao.sit().unwrap();
//! assert!(nao.move_to(MoveTarget { x: 1.0, y: 0.0, theta: 0.0 }).is_err());
//!
//! nao.stand().unwrap();
//! nao.move_to(MoveTarget { x: 1.0, y: 0.0, theta: 0.0 }).unwrap();
//! assert_eq!(handle.posture(), Posture::Standing);
//! assert!((handle.odometry().0 - 1.0).abs() < 1e-6);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nao_types::{ActionName, NaoError, Parameters};
use serde_json::Value;
use tracing::debug;

use crate::actuator::{Actuator, MoveTarget};

/// Body posture of the simulated robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Standing,
    Sitting,
}

/// One accepted actuator call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorCall {
    pub action: ActionName,
    /// Human-readable argument summary, e.g. `hand=left`.
    pub detail: String,
}

#[derive(Debug)]
struct SimState {
    posture: Posture,
    x: f32,
    y: f32,
    heading: f32,
    journal: Vec<ActuatorCall>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-only view of a [`SimNao`]'s state.
#[derive(Debug, Clone)]
pub struct SimHandle(Arc<Mutex<SimState>>);

impl SimHandle {
    /// Every accepted call, oldest first.
    pub fn calls(&self) -> Vec<ActuatorCall> {
        lock(&self.0).journal.clone()
    }

    /// Every sentence spoken, oldest first.
    pub fn spoken(&self) -> Vec<String> {
        lock(&self.0)
            .journal
            .iter()
            .filter(|c| c.action == ActionName::Speak)
            .map(|c| c.detail.clone())
            .collect()
    }

    pub fn posture(&self) -> Posture {
        lock(&self.0).posture
    }

    /// `(x, y, heading_rad)` relative to the start pose.
    pub fn odometry(&self) -> (f32, f32, f32) {
        let s = lock(&self.0);
        (s.x, s.y, s.heading)
    }
}

/// Simulated NAO humanoid. Starts standing at the origin.
#[derive(Debug)]
pub struct SimNao {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimNao {
    fn default() -> Self {
        Self::new()
    }
}

impl SimNao {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                posture: Posture::Standing,
                x: 0.0,
                y: 0.0,
                heading: 0.0,
                journal: Vec::new(),
            })),
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle(Arc::clone(&self.state))
    }

    fn record(&self, action: ActionName, detail: impl Into<String>) {
        let detail = detail.into();
        debug!(action = %action, detail = %detail, "sim actuator call");
        lock(&self.state).journal.push(ActuatorCall { action, detail });
    }
}

/// Read a string-valued choice parameter, falling back to `default` when it
/// is absent. `default == None` makes the parameter mandatory.
fn choice(
    action: ActionName,
    params: &Parameters,
    key: &str,
    allowed: &[&str],
    default: Option<&str>,
) -> Result<String, NaoError> {
    match params.get(key) {
        None | Some(Value::Null) => default.map(str::to_string).ok_or_else(|| {
            NaoError::MissingParameter {
                action: action.to_string(),
                parameter: key.to_string(),
            }
        }),
        Some(Value::String(s)) if allowed.contains(&s.trim().to_lowercase().as_str()) => {
            Ok(s.trim().to_lowercase())
        }
        Some(other) => Err(NaoError::InvalidParameter {
            action: action.to_string(),
            parameter: key.to_string(),
            details: format!("expected one of {}, got {other}", allowed.join("/")),
        }),
    }
}

impl Actuator for SimNao {
    fn speak(&mut self, params: &Parameters) -> Result<(), NaoError> {
        let speech = match params.get("speech") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(NaoError::MissingParameter {
                    action: ActionName::Speak.to_string(),
                    parameter: "speech".to_string(),
                });
            }
            Some(other) => other.to_string(),
        };
        self.record(ActionName::Speak, speech);
        Ok(())
    }

    fn stand(&mut self) -> Result<(), NaoError> {
        lock(&self.state).posture = Posture::Standing;
        self.record(ActionName::Stand, "");
        Ok(())
    }

    fn sit(&mut self) -> Result<(), NaoError> {
        lock(&self.state).posture = Posture::Sitting;
        self.record(ActionName::Sit, "");
        Ok(())
    }

    fn wave(&mut self, params: &Parameters) -> Result<(), NaoError> {
        let hand = choice(ActionName::Wave, params, "hand", &["right", "left"], Some("right"))?;
        self.record(ActionName::Wave, format!("hand={hand}"));
        Ok(())
    }

    fn nod_head(&mut self, params: &Parameters) -> Result<(), NaoError> {
        let direction = choice(
            ActionName::NodHead,
            params,
            "direction",
            &["up_down", "right_left"],
            Some("up_down"),
        )?;
        self.record(ActionName::NodHead, format!("direction={direction}"));
        Ok(())
    }

    fn turn_head(&mut self, params: &Parameters) -> Result<(), NaoError> {
        let direction = choice(
            ActionName::TurnHead,
            params,
            "direction",
            &["right", "left"],
            None,
        )?;
        self.record(ActionName::TurnHead, format!("direction={direction}"));
        Ok(())
    }

    fn gaze_head(&mut self, params: &Parameters) -> Result<(), NaoError> {
        let direction = choice(ActionName::GazeHead, params, "direction", &["up", "down"], None)?;
        self.record(ActionName::GazeHead, format!("direction={direction}"));
        Ok(())
    }

    fn raise_arms(&mut self, params: &Parameters) -> Result<(), NaoError> {
        let hand = choice(
            ActionName::RaiseArms,
            params,
            "hand",
            &["left", "right", "both"],
            Some("both"),
        )?;
        self.record(ActionName::RaiseArms, format!("hand={hand}"));
        Ok(())
    }

    fn move_to(&mut self, target: MoveTarget) -> Result<(), NaoError> {
        {
            let mut s = lock(&self.state);
            if s.posture == Posture::Sitting {
                return Err(NaoError::ActuatorFault {
                    action: ActionName::Move.to_string(),
                    details: "cannot walk while sitting".to_string(),
                });
            }
            // Displacement is expressed in the robot frame.
            let (sin, cos) = s.heading.sin_cos();
            s.x += target.x * cos - target.y * sin;
            s.y += target.x * sin + target.y * cos;
            s.heading += target.theta;
        }
        self.record(
            ActionName::Move,
            format!("x={} y={} theta={}", target.x, target.y, target.theta),
        );
        Ok(())
    }

    fn handshake(&mut self, params: &Parameters) -> Result<(), NaoError> {
        let hand = choice(
            ActionName::Handshake,
            params,
            "hand",
            &["right", "left"],
            Some("right"),
        )?;
        self.record(ActionName::Handshake, format!("hand={hand}"));
        Ok(())
    }

    fn reset_pose(&mut self) -> Result<(), NaoError> {
        lock(&self.state).posture = Posture::Standing;
        self.record(ActionName::ResetNaoPose, "");
        Ok(())
    }
}
