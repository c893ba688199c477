use crate::decode::DecodedFields;
use crate::types::{Channel, Gyro, SensorChannel};

// -- USB identifiers --
pub const VID: u16 = 0x21A1;
pub const PID: u16 = 0x0001;
/// The dongle exposes two HID interfaces; sensor reports arrive on this one.
pub const HID_INTERFACE: i32 = 1;

// -- Packet geometry --
pub const PACKET_SIZE: usize = 32;

/// Counter byte flag marking a battery report instead of a sequence number.
pub const BATTERY_FLAG: u8 = 0x80;
pub const COUNTER_MODULUS: u8 = 128;

pub const GYRO_X_OFFSET: i32 = 106;
pub const GYRO_Y_OFFSET: i32 = 105;

/// Bit positions of each 14-bit channel level, least significant bit first.
/// Positions count from the first byte after the counter.
const CHANNEL_BITS: [[u8; 14]; Channel::COUNT] = [
    [10, 11, 12, 13, 14, 15, 0, 1, 2, 3, 4, 5, 6, 7],                     // F3
    [28, 29, 30, 31, 16, 17, 18, 19, 20, 21, 22, 23, 8, 9],               // FC5
    [46, 47, 32, 33, 34, 35, 36, 37, 38, 39, 24, 25, 26, 27],             // AF3
    [48, 49, 50, 51, 52, 53, 54, 55, 40, 41, 42, 43, 44, 45],             // F7
    [66, 67, 68, 69, 70, 71, 56, 57, 58, 59, 60, 61, 62, 63],             // T7
    [84, 85, 86, 87, 72, 73, 74, 75, 76, 77, 78, 79, 64, 65],             // P7
    [102, 103, 88, 89, 90, 91, 92, 93, 94, 95, 80, 81, 82, 83],           // O1
    [140, 141, 142, 143, 128, 129, 130, 131, 132, 133, 134, 135, 120, 121], // O2
    [158, 159, 144, 145, 146, 147, 148, 149, 150, 151, 136, 137, 138, 139], // P8
    [160, 161, 162, 163, 164, 165, 166, 167, 152, 153, 154, 155, 156, 157], // T8
    [178, 179, 180, 181, 182, 183, 168, 169, 170, 171, 172, 173, 174, 175], // F8
    [196, 197, 198, 199, 184, 185, 186, 187, 188, 189, 190, 191, 176, 177], // AF4
    [214, 215, 200, 201, 202, 203, 204, 205, 206, 207, 192, 193, 194, 195], // FC6
    [216, 217, 218, 219, 220, 221, 222, 223, 208, 209, 210, 211, 212, 213], // F4
];

const QUALITY_BITS: [u8; 14] = [99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112];

/// Channel whose contact quality a packet carries, indexed by `counter % 16`.
pub const QUALITY_ORDER: [Channel; 16] = [
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
    Channel::F8,
    Channel::AF4,
];

/// Assemble a 14-bit level from scattered bit positions.
fn get_level(data: &[u8; PACKET_SIZE], bits: &[u8; 14]) -> i32 {
    bits.iter().rev().fold(0i32, |level, &bit| {
        let byte = data[(bit as usize >> 3) + 1];
        (level << 1) | ((byte >> (bit % 8)) & 1) as i32
    })
}

/// Battery percentage for a counter byte with the battery flag set.
pub fn battery_percent(counter_byte: u8) -> u8 {
    match counter_byte {
        248..=255 => 100,
        247 => 99,
        246 => 97,
        245 => 93,
        244 => 89,
        243 => 85,
        242 => 82,
        241 => 77,
        240 => 72,
        239 => 66,
        238 => 62,
        237 => 55,
        236 => 46,
        235 => 32,
        234 => 20,
        233 => 12,
        232 => 6,
        231 => 4,
        230 => 3,
        227..=229 => 2,
        226 => 1,
        _ => 0,
    }
}

/// Distance from `prev` to `next` on the 0..=127 counter ring.
pub fn counter_delta(prev: u8, next: u8) -> u8 {
    let m = COUNTER_MODULUS as i16;
    ((next as i16 - prev as i16).rem_euclid(m)) as u8
}

/// Extract sensor fields from a decrypted EPOC packet.
///
/// Packet layout:
/// - `[0]`: counter 0..=127, or a battery report when bit 7 is set
/// - `[1..29]`: 14 channel levels and the multiplexed quality level, bit-packed
/// - `[29]`: gyro X + 106
/// - `[30]`: gyro Y + 105
/// - `[31]`: unused
///
/// Battery reports yield counter 0 so the acquisition loop discards them
/// after recording the battery level.
pub fn parse_plaintext(data: &[u8; PACKET_SIZE]) -> DecodedFields {
    let counter_byte = data[0];
    let (counter, battery) = if counter_byte & BATTERY_FLAG != 0 {
        (0, battery_percent(counter_byte))
    } else {
        (counter_byte, 0)
    };

    let mut channels = [SensorChannel::default(); Channel::COUNT];
    for (slot, bits) in channels.iter_mut().zip(CHANNEL_BITS.iter()) {
        slot.value = get_level(data, bits);
    }

    if counter != 0 {
        let target = QUALITY_ORDER[(counter % 16) as usize];
        channels[target.index()].quality = get_level(data, &QUALITY_BITS);
    }

    DecodedFields {
        channels,
        gyro: Gyro {
            x: data[29] as i32 - GYRO_X_OFFSET,
            y: data[30] as i32 - GYRO_Y_OFFSET,
        },
        battery,
        counter,
    }
}
