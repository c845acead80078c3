use super::actuator::Actuator;
use super::error::ActuatorError;
use log::{debug, error, info};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuteState {
    #[default]
    Unmuted,
    Muted,
}

impl MuteState {
    /// 返回目标状态和需要执行的动作；`None` 表示保持不变
    pub fn transition(&self, detected: bool) -> Option<(MuteState, MuteAction)> {
        match (self, detected) {
            (MuteState::Unmuted, true) => Some((MuteState::Muted, MuteAction::Mute)),
            (MuteState::Muted, false) => Some((MuteState::Unmuted, MuteAction::Unmute)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteAction {
    Mute,
    Unmute,
}

impl fmt::Display for MuteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuteAction::Mute => write!(f, "mute"),
            MuteAction::Unmute => write!(f, "unmute"),
        }
    }
}

#[derive(Debug)]
pub enum TransitionOutcome {
    Unchanged(MuteState),
    Committed {
        from: MuteState,
        to: MuteState,
        action: MuteAction,
    },
    /// 调用失败，状态未变，下一轮会重试同一转换
    Failed {
        state: MuteState,
        action: MuteAction,
        error: ActuatorError,
    },
}

/// 持有唯一的静音状态，只在 actuator 调用成功后提交转换
pub struct MuteController<A: Actuator> {
    state: MuteState,
    actuator: A,
    committed: u64,
}

impl<A: Actuator> MuteController<A> {
    pub fn new(actuator: A) -> Self {
        Self::with_state(actuator, MuteState::default())
    }

    pub fn with_state(actuator: A, state: MuteState) -> Self {
        Self {
            state,
            actuator,
            committed: 0,
        }
    }

    pub fn state(&self) -> MuteState {
        self.state
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn committed_count(&self) -> u64 {
        self.committed
    }

    pub fn apply(&mut self, detected: bool) -> TransitionOutcome {
        let (next, action) = match self.state.transition(detected) {
            Some(t) => t,
            None => {
                debug!("Nothing to do, detected={} state={:?}", detected, self.state);
                return TransitionOutcome::Unchanged(self.state);
            }
        };

        match self.actuator.call(action) {
            Ok(()) => {
                let from = self.state;
                self.state = next;
                self.committed += 1;
                info!("🔇 {} committed: {:?} -> {:?}", action, from, next);
                TransitionOutcome::Committed {
                    from,
                    to: next,
                    action,
                }
            }
            Err(e) => {
                error!("❌ Error in calling the {} webhook: {}", action, e);
                TransitionOutcome::Failed {
                    state: self.state,
                    action,
                    error: e,
                }
            }
        }
    }
}
