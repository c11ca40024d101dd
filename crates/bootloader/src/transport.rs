//! Serial link bring-up.

use platform::peripheral::{SerialError, Transport, TransportConfig};

/// Validate `config`, set the peripheral up and enable the receiver.
///
/// The transmitter is configured but left disabled; the loaded program can
/// enable it through the host API.
pub fn init<T: Transport>(uart: &mut T, config: &TransportConfig) -> Result<(), SerialError> {
    config.validate()?;
    uart.setup(config)?;
    uart.enable_receive()?;
    info!(
        "transport: USART{} at {} baud, receiver on",
        config.instance,
        config.baud_rate
    );
    Ok(())
}

/// Fold a transport result into the C-style status word: 0 or negative.
pub fn status(result: Result<(), SerialError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::config::TRANSPORT;
    use platform::gpio::Port;
    use platform::mocks::{MockTransport, TransportEvent};
    use platform::peripheral::{AltFunction, PinAssignment};

    #[test]
    fn reference_config_enables_receive_only() {
        let mut uart = MockTransport::new();
        init(&mut uart, &TRANSPORT).unwrap();
        assert!(uart.rx_enabled());
        assert!(!uart.tx_enabled());
        assert_eq!(
            uart.events(),
            [TransportEvent::Setup, TransportEvent::EnableReceive]
        );
    }

    #[test]
    fn bad_pin_mux_never_reaches_the_peripheral() {
        let mut uart = MockTransport::new();
        let config = TransportConfig {
            tx: PinAssignment {
                port: Port::A,
                pin: 2,
                af: AltFunction::AF1,
            },
            ..TRANSPORT
        };
        assert_eq!(
            init(&mut uart, &config),
            Err(SerialError::PinMismatch { port: Port::A, pin: 2 })
        );
        assert!(uart.events().is_empty());
    }

    #[test]
    fn hardware_rejection_is_propagated() {
        let mut uart = MockTransport::new().with_setup_error(SerialError::InvalidInstance(1));
        let err = init(&mut uart, &TRANSPORT).unwrap_err();
        assert_eq!(status(Err(err)), -1);
    }

    #[test]
    fn status_word() {
        assert_eq!(status(Ok(())), 0);
        assert_eq!(status(Err(SerialError::Busy)), SerialError::Busy.code());
    }
}
