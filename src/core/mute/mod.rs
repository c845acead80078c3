//! 静音控制 - 两状态机 + webhook 执行器

pub mod actuator;
pub mod error;
pub mod state_machine;

pub use actuator::{Actuator, MockActuator, WebhookActuator};
pub use error::ActuatorError;
pub use state_machine::{MuteAction, MuteController, MuteState, TransitionOutcome};
