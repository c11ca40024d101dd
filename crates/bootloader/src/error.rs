//! Top-level boot error.

use platform::peripheral::SerialError;
use thiserror::Error;

use crate::clock::ClockError;
use crate::handover::HandoverError;
use crate::receiver::ReceiveError;
use crate::tick::TickError;

/// First failure of the boot sequence. Every variant aborts before
/// handover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    /// Clock bring-up
    #[error("clock: {0}")]
    Clock(#[from] ClockError),
    /// SysTick configuration
    #[error("tick: {0}")]
    Tick(#[from] TickError),
    /// Serial link setup
    #[error("transport: {0}")]
    Transport(#[from] SerialError),
    /// Image reception
    #[error("receive: {0}")]
    Receive(#[from] ReceiveError),
    /// API table installation
    #[error("handover: {0}")]
    Handover(#[from] HandoverError),
}

impl BootError {
    /// Negative status code, as `main` would return it.
    ///
    /// Transport failures keep the transport's own status, whether they
    /// happen during setup or when arming the receive.
    pub const fn code(&self) -> i32 {
        match self {
            Self::Transport(e) | Self::Receive(ReceiveError::Arm(e)) => e.code(),
            Self::Clock(_) => -10,
            Self::Tick(_) => -20,
            Self::Receive(_) => -30,
            Self::Handover(_) => -40,
        }
    }
}
