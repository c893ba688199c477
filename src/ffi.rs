//! C FFI layer for epoc.
//!
//! Provides an opaque handle-based API for C/C++ consumers.
//! The generated C header is written to `include/epoc.h` by cbindgen.

use crate::device::DeviceHandle;
use crate::error::LastError;
use crate::types::{Channel, DeviceVariant, PollOutcome, SensorFrame};
use std::ffi::{c_char, c_int};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

pub const EPOC_OK: c_int = 0;
/// No frame this attempt; call again.
pub const EPOC_AGAIN: c_int = 1;
pub const EPOC_ERROR: c_int = -1;

/// Opaque device handle for C consumers.
pub struct EpocDevice(DeviceHandle);

/// Decoded frame in C-compatible layout. Channel arrays follow the wire
/// order F3, FC5, AF3, F7, T7, P7, O1, O2, P8, T8, F8, AF4, FC6, F4.
#[repr(C)]
pub struct EpocFrame {
    /// Packet bytes as received.
    pub raw: [u8; 32],
    pub values: [c_int; 14],
    pub qualities: [c_int; 14],
    pub gyro_x: c_int,
    pub gyro_y: c_int,
    /// Battery percentage, 0 if this packet carried none.
    pub battery: u8,
    /// Sequence counter 1..=127.
    pub counter: u8,
}

impl From<&SensorFrame> for EpocFrame {
    fn from(frame: &SensorFrame) -> Self {
        let mut values = [0 as c_int; Channel::COUNT];
        let mut qualities = [0 as c_int; Channel::COUNT];
        for (channel, reading) in frame.channels() {
            values[channel.index()] = reading.value as c_int;
            qualities[channel.index()] = reading.quality as c_int;
        }
        let gyro = frame.gyro();
        EpocFrame {
            raw: *frame.raw(),
            values,
            qualities,
            gyro_x: gyro.x as c_int,
            gyro_y: gyro.y as c_int,
            battery: frame.battery(),
            counter: frame.counter(),
        }
    }
}

fn variant_from_c(variant: c_int) -> DeviceVariant {
    match variant {
        0 => DeviceVariant::Developer,
        _ => DeviceVariant::Consumer,
    }
}

/// Count attached EPOC dongles.
/// `variant`: 0 = Developer, 1 = Consumer.
#[no_mangle]
pub extern "C" fn epoc_count(variant: c_int) -> c_int {
    crate::device::count(variant_from_c(variant)) as c_int
}

/// Open the first attached EPOC.
/// `variant`: 0 = Developer, 1 = Consumer.
/// Returns NULL on error (check epoc_last_error()).
#[no_mangle]
pub extern "C" fn epoc_open(variant: c_int) -> *mut EpocDevice {
    match DeviceHandle::open(variant_from_c(variant)) {
        Ok(handle) => Box::into_raw(Box::new(EpocDevice(handle))),
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Close a device and free its resources. The pointer is invalid afterwards.
///
/// # Safety
/// `dev` must be a pointer returned by `epoc_open` and not yet closed, or null.
#[no_mangle]
pub unsafe extern "C" fn epoc_close(dev: *mut EpocDevice) {
    if !dev.is_null() {
        Box::from_raw(dev).0.close();
    }
}

/// Try once to read a frame.
/// Returns `EPOC_OK` and fills `out`, `EPOC_AGAIN` when nothing is ready,
/// or `EPOC_ERROR` on a transport failure.
///
/// # Safety
/// `dev` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn epoc_poll(dev: *mut EpocDevice, out: *mut EpocFrame) -> c_int {
    if dev.is_null() || out.is_null() {
        return EPOC_ERROR;
    }
    let dev = &mut *dev;

    match dev.0.poll() {
        PollOutcome::Ready(frame) => {
            out.write(EpocFrame::from(&frame));
            EPOC_OK
        }
        PollOutcome::NotYetAvailable => EPOC_AGAIN,
        PollOutcome::HardFailure(e) => {
            LAST_ERROR.set(&e);
            EPOC_ERROR
        }
    }
}

/// Block until a frame is ready. Returns `EPOC_OK` or `EPOC_ERROR`.
///
/// # Safety
/// `dev` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn epoc_wait_frame(dev: *mut EpocDevice, out: *mut EpocFrame) -> c_int {
    if dev.is_null() || out.is_null() {
        return EPOC_ERROR;
    }
    let dev = &mut *dev;

    match dev.0.wait_for_frame() {
        Ok(frame) => {
            out.write(EpocFrame::from(&frame));
            EPOC_OK
        }
        Err(e) => {
            LAST_ERROR.set(&e);
            EPOC_ERROR
        }
    }
}

/// Last battery percentage reported by the headset, or -1 if none yet.
///
/// # Safety
/// `dev` must be a valid device pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn epoc_battery(dev: *const EpocDevice) -> c_int {
    if dev.is_null() {
        return -1;
    }
    let dev = &*dev;
    dev.0.battery().map_or(-1, c_int::from)
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next failing epoc call.
#[no_mangle]
pub extern "C" fn epoc_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

/// Forget the last error message.
#[no_mangle]
pub extern "C" fn epoc_clear_error() {
    LAST_ERROR.clear();
}
