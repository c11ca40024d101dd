//! Code receiver: fills the image area from the serial link.
//!
//! The wire format is raw bytes, exactly `len` of them, no framing and no
//! checksum. Reception completes when the transport says so; the bytes are
//! not inspected.

use platform::memory::{MemoryBus, RegionLayout};
use platform::peripheral::{SerialError, Transport};
use platform::wait::{WaitPolicy, WaitTimeout};
use thiserror::Error;

/// Reception failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError {
    /// The transport refused to arm the transfer.
    #[error("cannot arm receive: {0}")]
    Arm(#[from] SerialError),
    /// The requested length does not fit the image area.
    #[error("{len} bytes exceed the {capacity}-byte image area")]
    Oversize {
        /// Requested length
        len: usize,
        /// Image area size
        capacity: usize,
    },
    /// The memory bus cannot back the image area.
    #[error("image area at {0:#x} is not mapped")]
    Unmapped(u32),
    /// A bounded wait gave up before the last byte arrived.
    #[error("image incomplete: {0}")]
    Incomplete(#[from] WaitTimeout),
}

/// Receive `len` bytes into the image area of `layout`.
///
/// `len` is normally [`TRANSFER_LEN`](platform::config::TRANSFER_LEN),
/// which is checked against the region at build time; the runtime check
/// here covers other layouts. If the wait gives up, the receiver is
/// disabled before returning so the transport drops its pointer into
/// `mem`.
pub fn receive<T, M, W>(
    uart: &mut T,
    mem: &mut M,
    layout: &RegionLayout,
    len: usize,
    wait: &mut W,
) -> Result<(), ReceiveError>
where
    T: Transport,
    M: MemoryBus,
    W: WaitPolicy,
{
    let base = layout.image_base();
    if !layout.image_contains(base, len) {
        return Err(ReceiveError::Oversize {
            len,
            capacity: layout.image_capacity(),
        });
    }
    let dst = mem.map_mut(base, len).ok_or(ReceiveError::Unmapped(base))?;

    // SAFETY: `dst` covers `len` writable bytes of the image area, which
    // nothing else touches until the transfer completes or the receiver
    // is disabled below.
    unsafe { uart.start_receive(dst.as_ptr(), len) }?;
    info!("receive: waiting for {} bytes at {:#x}", len, base);

    if let Err(timeout) = wait.wait_until(|| uart.is_receive_complete()) {
        if let Err(e) = uart.disable_receive() {
            warn!("receive: cannot abandon transfer: {}", e);
        }
        return Err(timeout.into());
    }
    info!("receive: image complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::config::{LOAD_REGION, TRANSFER_LEN, TRANSPORT};
    use platform::memory::SimulatedRam;
    use platform::mocks::MockTransport;
    use platform::wait::Bounded;

    fn ready_uart(chunk: usize) -> MockTransport {
        let mut uart = MockTransport::new().with_chunk(chunk);
        uart.setup(&TRANSPORT).unwrap();
        uart.enable_receive().unwrap();
        uart
    }

    #[test]
    fn full_image_lands_at_image_base() {
        let mut uart = ready_uart(64);
        let payload: Vec<u8> = (0..TRANSFER_LEN).map(|i| (i % 251) as u8).collect();
        uart.push_incoming(&payload);
        let mut ram = SimulatedRam::for_region(&LOAD_REGION);
        let mut wait = Bounded::new(1_000);

        receive(&mut uart, &mut ram, &LOAD_REGION, TRANSFER_LEN, &mut wait).unwrap();

        assert_eq!(
            ram.slice(LOAD_REGION.image_base(), TRANSFER_LEN),
            Some(&payload[..])
        );
        // Loader RAM below the image is untouched.
        assert!(ram
            .slice(LOAD_REGION.base(), 0x400)
            .unwrap()
            .iter()
            .all(|&b| b == 0));
    }

    #[test]
    fn short_image_never_completes() {
        let mut uart = ready_uart(16);
        uart.push_incoming(&vec![0xAA; TRANSFER_LEN - 1]);
        let mut ram = SimulatedRam::for_region(&LOAD_REGION);
        let mut wait = Bounded::new(10_000);

        let err = receive(&mut uart, &mut ram, &LOAD_REGION, TRANSFER_LEN, &mut wait);

        assert!(matches!(err, Err(ReceiveError::Incomplete(_))));
        assert!(!uart.rx_enabled());
    }

    #[test]
    fn oversize_request_is_refused_before_arming() {
        let mut uart = ready_uart(1);
        let mut ram = SimulatedRam::for_region(&LOAD_REGION);
        let err = receive(
            &mut uart,
            &mut ram,
            &LOAD_REGION,
            TRANSFER_LEN + 1,
            &mut Bounded::new(1),
        );
        assert_eq!(
            err,
            Err(ReceiveError::Oversize {
                len: TRANSFER_LEN + 1,
                capacity: TRANSFER_LEN
            })
        );
        assert_eq!(uart.receive_polls(), 0);
    }

    #[test]
    fn disabled_receiver_status_is_propagated() {
        let mut uart = MockTransport::new();
        uart.setup(&TRANSPORT).unwrap();
        let mut ram = SimulatedRam::for_region(&LOAD_REGION);
        let err = receive(&mut uart, &mut ram, &LOAD_REGION, 16, &mut Bounded::new(1));
        assert_eq!(err, Err(ReceiveError::Arm(SerialError::DirectionDisabled)));
    }

    #[test]
    fn unbacked_region_is_reported() {
        let mut uart = ready_uart(1);
        let mut ram = SimulatedRam::new(0x2000_0000, 0x400);
        let err = receive(&mut uart, &mut ram, &LOAD_REGION, 16, &mut Bounded::new(1));
        assert_eq!(err, Err(ReceiveError::Unmapped(0x2000_0400)));
    }
}
