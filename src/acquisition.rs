use crate::config::IdlePolicy;
use crate::decode::{decode, PacketTransform};
use crate::device::DeviceHandle;
use crate::transport::Transport;
use crate::types::{PollOutcome, SensorFrame};
use crate::{EpocError, Result};
use std::time::{Duration, Instant};

impl<T: Transport, D: PacketTransform> DeviceHandle<T, D> {
    /// One non-blocking acquisition attempt: at most one transport query and
    /// one decode.
    ///
    /// Zero bytes and zero-counter packets both come back as
    /// [`PollOutcome::NotYetAvailable`]. Transport errors are returned as
    /// [`PollOutcome::HardFailure`] and are never retried here.
    pub fn poll(&mut self) -> PollOutcome {
        let available = match self.transport.poll() {
            Ok(n) => n,
            Err(e) => return PollOutcome::HardFailure(e),
        };
        if available == 0 {
            return PollOutcome::NotYetAvailable;
        }

        let raw = match self.transport.read_raw() {
            Ok(raw) => raw,
            Err(e) => return PollOutcome::HardFailure(e),
        };

        let frame = decode(raw, self.variant, &self.transform);
        if frame.battery != 0 {
            self.battery = Some(frame.battery);
        }
        if !frame.is_valid() {
            log::trace!("Discarding packet with zero counter");
            return PollOutcome::NotYetAvailable;
        }

        PollOutcome::Ready(frame)
    }

    /// Block until a frame is ready or the transport fails.
    ///
    /// Busy-polls with no backoff; there is no way to cancel it from the
    /// calling thread. Use [`crate::FrameStream`] or
    /// [`DeviceHandle::wait_for_frame_timeout`] when that matters.
    pub fn wait_for_frame(&mut self) -> Result<SensorFrame> {
        loop {
            match self.poll() {
                PollOutcome::Ready(frame) => return Ok(frame),
                PollOutcome::HardFailure(e) => return Err(e),
                PollOutcome::NotYetAvailable => self.idle(),
            }
        }
    }

    /// [`DeviceHandle::wait_for_frame`] with a deadline. Returns
    /// [`EpocError::Timeout`] once `timeout` elapses without a frame.
    /// A timeout too large to represent as an `Instant` waits without limit.
    pub fn wait_for_frame_timeout(&mut self, timeout: Duration) -> Result<SensorFrame> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return self.wait_for_frame(),
        };
        loop {
            match self.poll() {
                PollOutcome::Ready(frame) => return Ok(frame),
                PollOutcome::HardFailure(e) => return Err(e),
                PollOutcome::NotYetAvailable => {
                    if Instant::now() >= deadline {
                        return Err(EpocError::Timeout);
                    }
                    self.idle();
                }
            }
        }
    }

    fn idle(&self) {
        match self.idle {
            IdlePolicy::Spin => std::hint::spin_loop(),
            IdlePolicy::Yield => std::thread::yield_now(),
        }
    }
}
