//! Host API entries for the hardware build.
//!
//! The loaded program calls these through [`HOST_API`]. They run on the
//! program's stack, in thread mode, with SysTick still firing.

use embedded_hal::digital::OutputPin;
use platform::config::STATUS_LED_PIN;
use platform::gpio::BankPin;
use platform::peripheral::Transport;

use super::gpio::GpioC;
use super::usart::{self, Usart1};
use crate::api::{HostApi, API_VERSION};
use crate::transport;

/// The transmitter is left off by boot; the first send turns it on.
#[allow(unsafe_code)]
unsafe extern "C" fn uart_send(buf: *const u8, len: usize) -> i32 {
    let mut uart = Usart1;
    if !usart::transmit_enabled() {
        if let Err(e) = uart.enable_transmit() {
            return e.code();
        }
    }
    // SAFETY: the table entry carries `start_send`'s contract.
    transport::status(unsafe { uart.start_send(buf, len) })
}

#[allow(unsafe_code)]
unsafe extern "C" fn uart_recv(buf: *mut u8, len: usize) -> i32 {
    // SAFETY: the table entry carries `start_receive`'s contract.
    transport::status(unsafe { Usart1.start_receive(buf, len) })
}

extern "C" fn uart_send_complete() -> bool {
    Usart1.is_send_complete()
}

extern "C" fn uart_recv_complete() -> bool {
    Usart1.is_receive_complete()
}

extern "C" fn status_led(on: bool) {
    let mut led = BankPin::new(GpioC, STATUS_LED_PIN);
    // Infallible.
    let _ = led.set_state(on.into());
}

/// Table copied into the loaded program at handover.
pub const HOST_API: HostApi = HostApi {
    version: API_VERSION,
    uart_send,
    uart_recv,
    uart_send_complete,
    uart_recv_complete,
    status_led,
};
