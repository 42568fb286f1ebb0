//! The `Actuator` trait for NAO-style humanoids.
//!
//! Drivers implement this trait and are handed to an
//! [`ActionDispatcher`][crate::dispatcher::ActionDispatcher]. The rest of the
//! stack only ever talks to the trait, so a simulated body and a physical one
//! are interchangeable.
//!
//! Parameters other than `move`'s are passed through untouched; each driver
//! checks its own.

use nao_types::{NaoError, Parameters};

/// Target pose for the `move` action: displacement in metres and heading
/// change in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveTarget {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

/// One method per action in the fixed vocabulary.
///
/// A method returning `Ok(())` acknowledges that the gesture was accepted.
///
/// # Errors
///
/// Drivers return [`NaoError::ActuatorFault`] or
/// [`NaoError::InvalidParameter`] when they cannot perform the action.
pub trait Actuator: Send {
    /// Say `params["speech"]` aloud.
    fn speak(&mut self, params: &Parameters) -> Result<(), NaoError>;
    fn stand(&mut self) -> Result<(), NaoError>;
    fn sit(&mut self) -> Result<(), NaoError>;
    /// Wave with `params["hand"]` (`right` / `left`).
    fn wave(&mut self, params: &Parameters) -> Result<(), NaoError>;
    /// Nod in `params["direction"]` (`up_down` / `right_left`).
    fn nod_head(&mut self, params: &Parameters) -> Result<(), NaoError>;
    /// Turn the head to `params["direction"]` (`right` / `left`).
    fn turn_head(&mut self, params: &Parameters) -> Result<(), NaoError>;
    /// Gaze `params["direction"]` (`up` / `down`).
    fn gaze_head(&mut self, params: &Parameters) -> Result<(), NaoError>;
    /// Raise `params["hand"]` (`left` / `right` / `both`).
    fn raise_arms(&mut self, params: &Parameters) -> Result<(), NaoError>;
    /// Walk to `target` relative to the current pose.
    fn move_to(&mut self, target: MoveTarget) -> Result<(), NaoError>;
    /// Offer a handshake with `params["hand"]` (`right` / `left`).
    fn handshake(&mut self, params: &Parameters) -> Result<(), NaoError>;
    /// Return to the default posture.
    fn reset_pose(&mut self) -> Result<(), NaoError>;
}
