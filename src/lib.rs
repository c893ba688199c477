//! # epoc - Rust client for the Emotiv EPOC EEG headset
//!
//! Cross-platform driver using hidapi. Provides:
//! - Device counting and open/close of the first attached headset
//! - Non-blocking and blocking frame acquisition (14 channels, gyro, battery)
//! - A pluggable packet transform where the headset cipher goes
//! - C FFI for integration with C/C++ consumers
//!
//! ## Quick Start
//! ```no_run
//! use epoc::{Channel, DeviceHandle, DeviceVariant};
//!
//! let mut device = DeviceHandle::open(DeviceVariant::Consumer).unwrap();
//! for _ in 0..128 {
//!     let frame = device.wait_for_frame().unwrap();
//!     println!("#{:3} O1={}", frame.counter(), frame.channel(Channel::O1).value);
//! }
//! device.close();
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod config;
pub mod transport;
pub mod hid;
pub mod decode;
pub mod device;
mod acquisition;
pub mod tracking;
pub mod stream;
pub mod ffi;

pub use config::{IdlePolicy, OpenOptions};
pub use decode::{decode, DecodedFields, PacketTransform, PlaintextLayout};
pub use device::{count, count_with, DeviceHandle};
pub use error::EpocError;
pub use protocol::counter_delta;
pub use stream::FrameStream;
pub use tracking::{ContactQuality, SequenceTracker};
pub use transport::{Backend, Transport};
pub use types::*;

/// Result type alias for epoc operations.
pub type Result<T> = std::result::Result<T, EpocError>;
