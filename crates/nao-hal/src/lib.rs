//! `nao-hal` – the robot's hands and voice.
//!
//! # Modules
//!
//! - [`actuator`] – the [`Actuator`][actuator::Actuator] trait: one method per
//!   action in the fixed vocabulary. Drivers implement it; nothing else in the
//!   stack talks to hardware.
//! - [`dispatcher`] – [`ActionDispatcher`][dispatcher::ActionDispatcher]:
//!   walks a validated [`Plan`][nao_types::Plan] in order, enforces the
//!   `move` parameter contract, skips bad steps, and paces successful ones.
//! - [`sim`] – [`SimNao`][sim::SimNao]: an in-process actuator that checks
//!   its own parameters and records every accepted call, for tests and
//!   headless runs.

pub mod actuator;
pub mod dispatcher;
pub mod sim;

pub use actuator::{Actuator, MoveTarget};
pub use dispatcher::{ActionDispatcher, DispatchReport, SkippedStep, StepPacing};
pub use sim::{ActuatorCall, Posture, SimHandle, SimNao};
