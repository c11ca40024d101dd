//! Serial transport abstraction
//!
//! The loader only needs one peripheral: a USART that receives the program
//! image. The contract is deliberately DMA-shaped: a transfer is armed with
//! a raw buffer, the call returns immediately, and completion is observed
//! by polling. Nothing here blocks and nothing times out.

use thiserror::Error;

use crate::gpio::Port;

/// GPIO alternate function selector (AFRL/AFRH nibble).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltFunction(pub u8);

impl AltFunction {
    /// AF0
    pub const AF0: Self = Self(0);
    /// AF1
    pub const AF1: Self = Self(1);
}

/// Pin + alternate function used by one direction of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinAssignment {
    /// GPIO port
    pub port: Port,
    /// Pin number within the port
    pub pin: u8,
    /// Alternate function routing the pin to the USART
    pub af: AltFunction,
}

/// Serial transport configuration, consumed once by [`Transport::setup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportConfig {
    /// USART instance number (1-based, as in the reference manual).
    pub instance: u8,
    /// Baud rate
    pub baud_rate: u32,
    /// USART kernel clock, Hz.
    pub kernel_hz: u32,
    /// Transmit line
    pub tx: PinAssignment,
    /// Receive line
    pub rx: PinAssignment,
}

/// USART1 TX routings on the STM32F051 (DS8668 table 14/15).
const USART1_TX: &[PinAssignment] = &[
    PinAssignment {
        port: Port::A,
        pin: 9,
        af: AltFunction::AF1,
    },
    PinAssignment {
        port: Port::B,
        pin: 6,
        af: AltFunction::AF0,
    },
];

/// USART1 RX routings on the STM32F051.
const USART1_RX: &[PinAssignment] = &[
    PinAssignment {
        port: Port::A,
        pin: 10,
        af: AltFunction::AF1,
    },
    PinAssignment {
        port: Port::B,
        pin: 7,
        af: AltFunction::AF0,
    },
];

/// Smallest legal BRR value with 16× oversampling.
const BRR_MIN: u32 = 16;

impl TransportConfig {
    /// Check instance and pin muxing before any register is touched.
    pub fn validate(&self) -> Result<(), SerialError> {
        if self.instance != 1 {
            return Err(SerialError::InvalidInstance(self.instance));
        }
        if !USART1_TX.contains(&self.tx) {
            return Err(SerialError::PinMismatch {
                port: self.tx.port,
                pin: self.tx.pin,
            });
        }
        if !USART1_RX.contains(&self.rx) {
            return Err(SerialError::PinMismatch {
                port: self.rx.port,
                pin: self.rx.pin,
            });
        }
        self.brr().map(|_| ())
    }

    /// BRR divisor for 16× oversampling: `kernel_hz / baud_rate`, rounded.
    pub fn brr(&self) -> Result<u32, SerialError> {
        let half = self.baud_rate / 2;
        let brr = self
            .kernel_hz
            .checked_add(half)
            .and_then(|hz| hz.checked_div(self.baud_rate))
            .ok_or(SerialError::InvalidBaudRate(self.baud_rate))?;
        if !(BRR_MIN..=0xFFFF).contains(&brr) {
            return Err(SerialError::InvalidBaudRate(self.baud_rate));
        }
        Ok(brr)
    }
}

/// Transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// No such USART instance.
    #[error("USART{0} does not exist")]
    InvalidInstance(u8),
    /// Pin cannot be routed to the USART with the given alternate function.
    #[error("pin P{port:?}{pin} cannot carry this USART signal")]
    PinMismatch {
        /// Offending port
        port: Port,
        /// Offending pin
        pin: u8,
    },
    /// Baud rate not reachable from the kernel clock.
    #[error("baud rate {0} not reachable")]
    InvalidBaudRate(u32),
    /// `setup` has not been called.
    #[error("transport not configured")]
    NotConfigured,
    /// A transfer in this direction is still pending.
    #[error("transfer already in progress")]
    Busy,
    /// The direction is disabled.
    #[error("direction disabled")]
    DirectionDisabled,
    /// Zero-length transfers are not armed.
    #[error("zero-length transfer")]
    ZeroLength,
}

impl SerialError {
    /// Negative status code reported across the C-style boundary.
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidInstance(_) => -1,
            Self::PinMismatch { .. } => -2,
            Self::InvalidBaudRate(_) => -3,
            Self::NotConfigured => -4,
            Self::Busy => -5,
            Self::DirectionDisabled => -6,
            Self::ZeroLength => -7,
        }
    }
}

/// Serial link with asynchronous-completion transfers.
pub trait Transport {
    /// Configure pins, baud rate and the peripheral. Directions stay
    /// disabled.
    fn setup(&mut self, config: &TransportConfig) -> Result<(), SerialError>;

    /// Enable the receiver.
    fn enable_receive(&mut self) -> Result<(), SerialError>;

    /// Disable the receiver, abandoning any pending receive.
    fn disable_receive(&mut self) -> Result<(), SerialError>;

    /// Enable the transmitter.
    fn enable_transmit(&mut self) -> Result<(), SerialError>;

    /// Disable the transmitter, abandoning any pending send.
    fn disable_transmit(&mut self) -> Result<(), SerialError>;

    /// Arm a receive of exactly `len` bytes into `buffer`.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for writes of `len` bytes and must not be
    /// accessed by anyone else until [`is_receive_complete`] returns `true`
    /// or the receiver is disabled.
    ///
    /// [`is_receive_complete`]: Transport::is_receive_complete
    unsafe fn start_receive(&mut self, buffer: *mut u8, len: usize) -> Result<(), SerialError>;

    /// Arm a send of `len` bytes from `buffer`.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for reads of `len` bytes and must not be
    /// written until [`is_send_complete`] returns `true` or the
    /// transmitter is disabled.
    ///
    /// [`is_send_complete`]: Transport::is_send_complete
    unsafe fn start_send(&mut self, buffer: *const u8, len: usize) -> Result<(), SerialError>;

    /// `true` once every byte of the armed receive has arrived.
    fn is_receive_complete(&mut self) -> bool;

    /// `true` once every byte of the armed send has left.
    fn is_send_complete(&mut self) -> bool;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn setup(&mut self, config: &TransportConfig) -> Result<(), SerialError> {
        (**self).setup(config)
    }

    fn enable_receive(&mut self) -> Result<(), SerialError> {
        (**self).enable_receive()
    }

    fn disable_receive(&mut self) -> Result<(), SerialError> {
        (**self).disable_receive()
    }

    fn enable_transmit(&mut self) -> Result<(), SerialError> {
        (**self).enable_transmit()
    }

    fn disable_transmit(&mut self) -> Result<(), SerialError> {
        (**self).disable_transmit()
    }

    unsafe fn start_receive(&mut self, buffer: *mut u8, len: usize) -> Result<(), SerialError> {
        // SAFETY: forwarded contract.
        unsafe { (**self).start_receive(buffer, len) }
    }

    unsafe fn start_send(&mut self, buffer: *const u8, len: usize) -> Result<(), SerialError> {
        // SAFETY: forwarded contract.
        unsafe { (**self).start_send(buffer, len) }
    }

    fn is_receive_complete(&mut self) -> bool {
        (**self).is_receive_complete()
    }

    fn is_send_complete(&mut self) -> bool {
        (**self).is_send_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usart1() -> TransportConfig {
        TransportConfig {
            instance: 1,
            baud_rate: 9600,
            kernel_hz: 48_000_000,
            tx: PinAssignment {
                port: Port::A,
                pin: 9,
                af: AltFunction::AF1,
            },
            rx: PinAssignment {
                port: Port::A,
                pin: 10,
                af: AltFunction::AF1,
            },
        }
    }

    #[test]
    fn brr_at_9600_from_48mhz() {
        assert_eq!(usart1().brr(), Ok(5000));
    }

    #[test]
    fn brr_rounds_to_nearest() {
        let cfg = TransportConfig {
            baud_rate: 115_200,
            ..usart1()
        };
        // 48e6 / 115200 = 416.67
        assert_eq!(cfg.brr(), Ok(417));
    }

    #[test]
    fn zero_baud_is_rejected() {
        let cfg = TransportConfig {
            baud_rate: 0,
            ..usart1()
        };
        assert_eq!(cfg.brr(), Err(SerialError::InvalidBaudRate(0)));
    }

    #[test]
    fn baud_too_fast_for_kernel_clock() {
        let cfg = TransportConfig {
            baud_rate: 6_000_000,
            ..usart1()
        };
        assert_eq!(cfg.brr(), Err(SerialError::InvalidBaudRate(6_000_000)));
    }

    #[test]
    fn unknown_instance_is_rejected() {
        let cfg = TransportConfig {
            instance: 3,
            ..usart1()
        };
        assert_eq!(cfg.validate(), Err(SerialError::InvalidInstance(3)));
        assert_eq!(SerialError::InvalidInstance(3).code(), -1);
    }

    #[test]
    fn wrong_alternate_function_is_rejected() {
        let mut cfg = usart1();
        cfg.rx.af = AltFunction::AF0;
        assert_eq!(
            cfg.validate(),
            Err(SerialError::PinMismatch {
                port: Port::A,
                pin: 10
            })
        );
    }

    #[test]
    fn alternate_routing_on_port_b() {
        let cfg = TransportConfig {
            tx: PinAssignment {
                port: Port::B,
                pin: 6,
                af: AltFunction::AF0,
            },
            rx: PinAssignment {
                port: Port::B,
                pin: 7,
                af: AltFunction::AF0,
            },
            ..usart1()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn every_error_code_is_negative() {
        let all = [
            SerialError::InvalidInstance(0),
            SerialError::PinMismatch {
                port: Port::A,
                pin: 0,
            },
            SerialError::InvalidBaudRate(0),
            SerialError::NotConfigured,
            SerialError::Busy,
            SerialError::DirectionDisabled,
            SerialError::ZeroLength,
        ];
        for e in all {
            assert!(e.code() < 0);
        }
    }
}
