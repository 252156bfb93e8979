//! The sticky safety interlock.

use tracing::info;
use vitalwatch_types::InterlockStatus;

/// Message reported while the interlock is released.
pub const DEFAULT_INTERLOCK_MESSAGE: &str = "";

/// A latch that halts the dependent device.
///
/// Once latched, only [`Interlock::reset`] releases it; further trips are
/// ignored and never replace the original message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Interlock {
    #[default]
    Released,
    Latched(String),
}

impl Interlock {
    /// Latch with `message` unless already latched.
    ///
    /// Returns true if this call latched the interlock.
    pub fn trip(&mut self, message: impl Into<String>) -> bool {
        if self.is_latched() {
            return false;
        }
        let message = message.into();
        info!(%message, "interlock tripped");
        *self = Interlock::Latched(message);
        true
    }

    /// Release unconditionally.
    pub fn reset(&mut self) {
        if self.is_latched() {
            info!("interlock reset");
        }
        *self = Interlock::Released;
    }

    pub fn is_latched(&self) -> bool {
        matches!(self, Interlock::Latched(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Interlock::Released => DEFAULT_INTERLOCK_MESSAGE,
            Interlock::Latched(message) => message,
        }
    }

    pub fn status(&self) -> InterlockStatus {
        InterlockStatus {
            latched: self.is_latched(),
            message: self.message().to_string(),
        }
    }
}
