use crate::protocol::PACKET_SIZE;
use crate::EpocError;
use std::fmt;

/// Headset key-derivation mode. Selects how the cipher turns raw bytes into
/// plaintext; the field layout is identical for both.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceVariant {
    /// Research/developer edition (raw EEG key schedule).
    Developer = 0,
    /// Consumer edition.
    #[default]
    Consumer = 1,
}

impl DeviceVariant {
    /// Parse a variant name as accepted by `EPOC_VARIANT`.
    pub fn from_name(name: &str) -> Option<DeviceVariant> {
        match name.trim().to_ascii_lowercase().as_str() {
            "consumer" => Some(DeviceVariant::Consumer),
            "developer" | "research" => Some(DeviceVariant::Developer),
            _ => None,
        }
    }
}

/// Scalp electrode positions of the EPOC, in wire order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    F3 = 0,
    FC5 = 1,
    AF3 = 2,
    F7 = 3,
    T7 = 4,
    P7 = 5,
    O1 = 6,
    O2 = 7,
    P8 = 8,
    T8 = 9,
    F8 = 10,
    AF4 = 11,
    FC6 = 12,
    F4 = 13,
}

impl Channel {
    pub const COUNT: usize = 14;

    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::F3,
        Channel::FC5,
        Channel::AF3,
        Channel::F7,
        Channel::T7,
        Channel::P7,
        Channel::O1,
        Channel::O2,
        Channel::P8,
        Channel::T8,
        Channel::F8,
        Channel::AF4,
        Channel::FC6,
        Channel::F4,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::F3 => "F3",
            Channel::FC5 => "FC5",
            Channel::AF3 => "AF3",
            Channel::F7 => "F7",
            Channel::T7 => "T7",
            Channel::P7 => "P7",
            Channel::O1 => "O1",
            Channel::O2 => "O2",
            Channel::P8 => "P8",
            Channel::T8 => "T8",
            Channel::F8 => "F8",
            Channel::AF4 => "AF4",
            Channel::FC6 => "FC6",
            Channel::F4 => "F4",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One electrode reading: amplitude plus contact quality score.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorChannel {
    pub value: i32,
    pub quality: i32,
}

/// Two-axis gyroscope delta.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gyro {
    pub x: i32,
    pub y: i32,
}

/// One 32-byte packet exactly as the transport delivered it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawPacket([u8; PACKET_SIZE]);

impl RawPacket {
    pub const fn new(bytes: [u8; PACKET_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }
}

impl TryFrom<&[u8]> for RawPacket {
    type Error = EpocError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PACKET_SIZE] = data
            .try_into()
            .map_err(|_| EpocError::PacketLength(data.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for RawPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawPacket({:02x?})", &self.0[..])
    }
}

/// One decoded sample set from the headset.
///
/// Built only by the decoder and never mutated afterwards. A frame whose
/// counter is 0 carries no usable sample and is never handed to callers by
/// the acquisition loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorFrame {
    pub(crate) channels: [SensorChannel; Channel::COUNT],
    pub(crate) gyro: Gyro,
    pub(crate) battery: u8,
    pub(crate) counter: u8,
    pub(crate) raw: RawPacket,
}

impl SensorFrame {
    pub fn channel(&self, channel: Channel) -> SensorChannel {
        self.channels[channel.index()]
    }

    /// All channels in wire order, paired with their electrode names.
    pub fn channels(&self) -> impl Iterator<Item = (Channel, SensorChannel)> + '_ {
        Channel::ALL.iter().map(move |&c| (c, self.channels[c.index()]))
    }

    pub fn gyro(&self) -> Gyro {
        self.gyro
    }

    /// Battery percentage, or 0 when this packet did not carry a sample.
    pub fn battery(&self) -> u8 {
        self.battery
    }

    /// Sequence counter, 0..=127.
    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn raw(&self) -> &[u8; PACKET_SIZE] {
        self.raw.as_bytes()
    }

    pub fn is_valid(&self) -> bool {
        self.counter != 0
    }
}

/// Result of a single acquisition attempt.
#[derive(Debug)]
pub enum PollOutcome {
    /// A fresh frame with a non-zero counter.
    Ready(SensorFrame),
    /// Nothing usable this attempt; try again.
    NotYetAvailable,
    /// The transport reported an abnormal condition. Stop polling.
    HardFailure(EpocError),
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready(_))
    }
}
