//! Polled USART1 driver.
//!
//! Transfers are armed with a raw buffer and advanced by the completion
//! queries: each `is_receive_complete` call drains RDR into the armed
//! buffer for as long as RXNE is set, each `is_send_complete` call feeds
//! TDR for as long as TXE is set. At 9600 baud a byte takes about a
//! millisecond, so the boot sequence's tight poll loop never overruns.
//!
//! Driver state lives in a `critical_section::Mutex` so the host API
//! trampolines and the boot sequence share one instance.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_stm32::pac::{RCC, USART1};
use platform::gpio::PinMode;
use platform::peripheral::{PinAssignment, SerialError, Transport, TransportConfig};

use super::gpio;

// USART_CR1
const CR1_UE: u32 = 1 << 0;
const CR1_RE: u32 = 1 << 2;
const CR1_TE: u32 = 1 << 3;

// USART_ISR
const ISR_ORE: u32 = 1 << 3;
const ISR_RXNE: u32 = 1 << 5;
const ISR_TC: u32 = 1 << 6;
const ISR_TXE: u32 = 1 << 7;

// USART_ICR
const ICR_ORECF: u32 = 1 << 3;

// RCC_APB2ENR
const APB2ENR_USART1EN: u32 = 1 << 14;

#[derive(Debug, Clone, Copy)]
struct Transfer<P> {
    buffer: P,
    len: usize,
    done: usize,
}

impl<P> Transfer<P> {
    const fn remaining(&self) -> bool {
        self.done < self.len
    }
}

#[derive(Debug)]
struct State {
    configured: bool,
    rx_enabled: bool,
    tx_enabled: bool,
    rx: Option<Transfer<*mut u8>>,
    tx: Option<Transfer<*const u8>>,
}

// SAFETY: the raw pointers are only dereferenced inside a critical section
// on a single-core part, under the contract of `start_receive`/`start_send`.
#[allow(unsafe_code)]
unsafe impl Send for State {}

static STATE: Mutex<RefCell<State>> = Mutex::new(RefCell::new(State {
    configured: false,
    rx_enabled: false,
    tx_enabled: false,
    rx: None,
    tx: None,
}));

fn with_state<R>(f: impl FnOnce(&mut State) -> R) -> R {
    critical_section::with(|cs| f(&mut STATE.borrow_ref_mut(cs)))
}

fn route(pin: &PinAssignment) {
    gpio::enable_clock(pin.port);
    gpio::set_alternate(pin.port, pin.pin, pin.af);
    gpio::set_mode(pin.port, pin.pin, PinMode::Alternate);
}

/// Handle to the USART1 driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usart1;

impl Transport for Usart1 {
    fn setup(&mut self, config: &TransportConfig) -> Result<(), SerialError> {
        config.validate()?;
        let brr = config.brr()?;

        route(&config.tx);
        route(&config.rx);
        RCC.apb2enr().modify(|w| w.0 |= APB2ENR_USART1EN);

        // 8N1, oversampling by 16: everything but UE/TE/RE at reset value.
        USART1.cr1().write(|w| w.0 = 0);
        USART1.brr().write(|w| w.0 = brr);
        USART1.cr1().write(|w| w.0 = CR1_UE);

        with_state(|s| {
            *s = State {
                configured: true,
                rx_enabled: false,
                tx_enabled: false,
                rx: None,
                tx: None,
            };
        });
        debug!("usart1: BRR {}", brr);
        Ok(())
    }

    fn enable_receive(&mut self) -> Result<(), SerialError> {
        with_state(|s| {
            if !s.configured {
                return Err(SerialError::NotConfigured);
            }
            USART1.cr1().modify(|w| w.0 |= CR1_RE);
            s.rx_enabled = true;
            Ok(())
        })
    }

    fn disable_receive(&mut self) -> Result<(), SerialError> {
        with_state(|s| {
            if !s.configured {
                return Err(SerialError::NotConfigured);
            }
            USART1.cr1().modify(|w| w.0 &= !CR1_RE);
            s.rx_enabled = false;
            s.rx = None;
            Ok(())
        })
    }

    fn enable_transmit(&mut self) -> Result<(), SerialError> {
        with_state(|s| {
            if !s.configured {
                return Err(SerialError::NotConfigured);
            }
            USART1.cr1().modify(|w| w.0 |= CR1_TE);
            s.tx_enabled = true;
            Ok(())
        })
    }

    fn disable_transmit(&mut self) -> Result<(), SerialError> {
        with_state(|s| {
            if !s.configured {
                return Err(SerialError::NotConfigured);
            }
            USART1.cr1().modify(|w| w.0 &= !CR1_TE);
            s.tx_enabled = false;
            s.tx = None;
            Ok(())
        })
    }

    #[allow(unsafe_code)]
    unsafe fn start_receive(&mut self, buffer: *mut u8, len: usize) -> Result<(), SerialError> {
        with_state(|s| {
            if !s.configured {
                return Err(SerialError::NotConfigured);
            }
            if !s.rx_enabled {
                return Err(SerialError::DirectionDisabled);
            }
            if len == 0 {
                return Err(SerialError::ZeroLength);
            }
            if s.rx.is_some() {
                return Err(SerialError::Busy);
            }
            s.rx = Some(Transfer {
                buffer,
                len,
                done: 0,
            });
            Ok(())
        })
    }

    #[allow(unsafe_code)]
    unsafe fn start_send(&mut self, buffer: *const u8, len: usize) -> Result<(), SerialError> {
        with_state(|s| {
            if !s.configured {
                return Err(SerialError::NotConfigured);
            }
            if !s.tx_enabled {
                return Err(SerialError::DirectionDisabled);
            }
            if len == 0 {
                return Err(SerialError::ZeroLength);
            }
            if s.tx.is_some() {
                return Err(SerialError::Busy);
            }
            s.tx = Some(Transfer {
                buffer,
                len,
                done: 0,
            });
            Ok(())
        })
    }

    #[allow(unsafe_code)]
    fn is_receive_complete(&mut self) -> bool {
        with_state(|s| {
            let Some(rx) = s.rx.as_mut() else {
                return true;
            };
            loop {
                let isr = USART1.isr().read().0;
                if isr & ISR_ORE != 0 {
                    USART1.icr().write(|w| w.0 = ICR_ORECF);
                }
                if isr & ISR_RXNE == 0 || !rx.remaining() {
                    break;
                }
                let byte = (USART1.rdr().read().0 & 0xFF) as u8;
                // SAFETY: `done < len` and `start_receive`'s caller
                // guarantees `buffer` is writable for `len` bytes.
                unsafe { rx.buffer.add(rx.done).write_volatile(byte) };
                rx.done = rx.done.saturating_add(1);
            }
            if rx.remaining() {
                false
            } else {
                s.rx = None;
                true
            }
        })
    }

    #[allow(unsafe_code)]
    fn is_send_complete(&mut self) -> bool {
        with_state(|s| {
            let Some(tx) = s.tx.as_mut() else {
                return true;
            };
            while tx.remaining() && USART1.isr().read().0 & ISR_TXE != 0 {
                // SAFETY: `done < len` and `start_send`'s caller guarantees
                // `buffer` is readable for `len` bytes.
                let byte = unsafe { tx.buffer.add(tx.done).read_volatile() };
                USART1.tdr().write(|w| w.0 = u32::from(byte));
                tx.done = tx.done.saturating_add(1);
            }
            if tx.remaining() || USART1.isr().read().0 & ISR_TC == 0 {
                false
            } else {
                s.tx = None;
                true
            }
        })
    }
}

/// `true` once the transmitter has been enabled.
pub fn transmit_enabled() -> bool {
    with_state(|s| s.tx_enabled)
}
