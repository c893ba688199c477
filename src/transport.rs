//! Transport seam between the acquisition loop and the USB stack.
//!
//! [`crate::hid::HidBackend`] is the production implementation. Tests drive
//! the loop with scripted stubs instead.

use crate::config::OpenOptions;
use crate::types::RawPacket;
use crate::Result;

/// An open session with one physical headset.
pub trait Transport {
    /// Check for a newly arrived packet without blocking. Returns the number
    /// of bytes waiting, 0 when nothing has arrived, or an error when the link
    /// itself failed.
    fn poll(&mut self) -> Result<usize>;

    /// Take the packet reported by the last successful [`Transport::poll`].
    fn read_raw(&mut self) -> Result<RawPacket>;

    /// USB serial number of the headset, if the transport knows it.
    fn serial(&self) -> Option<&str> {
        None
    }

    /// Release the session.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// Factory for transport sessions.
pub trait Backend {
    type Transport: Transport;

    /// Number of attached devices matching `vid`/`pid`.
    fn device_count(&self, vid: u16, pid: u16) -> Result<usize>;

    /// Open the first device matching `vid`/`pid`.
    fn open(&self, vid: u16, pid: u16, options: &OpenOptions) -> Result<Self::Transport>;
}
