use std::fmt;

/// Errors that can occur when talking to an EPOC headset.
#[derive(Debug, thiserror::Error)]
pub enum EpocError {
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("Device not found (VID=21A1 PID=0001)")]
    DeviceNotFound,

    #[error("Cannot access device: {0}")]
    Connection(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Malformed packet: expected 32 bytes, got {0}")]
    PacketLength(usize),

    #[error("Timeout waiting for frame")]
    Timeout,

    #[error("Frame stream stopped")]
    StreamStopped,
}

impl EpocError {
    /// True for failures raised while opening a device (absent, busy,
    /// permission denied). Everything else happened on a live link.
    pub fn is_connection(&self) -> bool {
        matches!(self, EpocError::DeviceNotFound | EpocError::Connection(_))
    }
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &EpocError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
