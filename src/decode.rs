use crate::protocol;
use crate::types::{Channel, DeviceVariant, Gyro, RawPacket, SensorChannel, SensorFrame};

/// Field values produced by a packet transform, before they are bound to
/// the originating packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedFields {
    /// Indexed by [`Channel::index`].
    pub channels: [SensorChannel; Channel::COUNT],
    pub gyro: Gyro,
    pub battery: u8,
    pub counter: u8,
}

/// Turns a raw packet into sensor fields.
///
/// This is where the headset cipher plugs in: implementations decrypt with
/// the key material for `variant` and then extract fields, typically via
/// [`protocol::parse_plaintext`]. Must be deterministic and total over every
/// 32-byte input.
pub trait PacketTransform {
    fn transform(&self, raw: &RawPacket, variant: DeviceVariant) -> DecodedFields;
}

impl<F> PacketTransform for F
where
    F: Fn(&RawPacket, DeviceVariant) -> DecodedFields,
{
    fn transform(&self, raw: &RawPacket, variant: DeviceVariant) -> DecodedFields {
        self(raw, variant)
    }
}

/// Transform for packets that already arrive decrypted (e.g. from a
/// decrypting proxy or a capture replay). Ignores the variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextLayout;

impl PacketTransform for PlaintextLayout {
    fn transform(&self, raw: &RawPacket, _variant: DeviceVariant) -> DecodedFields {
        protocol::parse_plaintext(raw.as_bytes())
    }
}

/// Decode one packet into a frame. Never fails and never filters; a zero
/// counter is left for the acquisition loop to judge.
pub fn decode<D: PacketTransform + ?Sized>(
    raw: RawPacket,
    variant: DeviceVariant,
    transform: &D,
) -> SensorFrame {
    let fields = transform.transform(&raw, variant);
    SensorFrame {
        channels: fields.channels,
        gyro: fields.gyro,
        battery: fields.battery,
        counter: fields.counter,
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_transform(raw: &RawPacket, variant: DeviceVariant) -> DecodedFields {
        let key = match variant {
            DeviceVariant::Consumer => 0x5A,
            DeviceVariant::Developer => 0xA5,
        };
        let b = raw.as_bytes();
        let mut fields = DecodedFields {
            counter: (b[0] ^ key) & 0x7F,
            battery: b[31],
            gyro: Gyro {
                x: b[29] as i32,
                y: b[30] as i32,
            },
            ..Default::default()
        };
        for (i, ch) in fields.channels.iter_mut().enumerate() {
            ch.value = (b[i + 1] ^ key) as i32;
            ch.quality = b[i + 15] as i32;
        }
        fields
    }

    #[test]
    fn test_decode_is_deterministic() {
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..64 {
            let mut bytes = [0u8; 32];
            for b in bytes.iter_mut() {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                *b = (seed >> 16) as u8;
            }
            let raw = RawPacket::new(bytes);
            for variant in [DeviceVariant::Consumer, DeviceVariant::Developer] {
                let a = decode(raw, variant, &xor_transform);
                let b = decode(raw, variant, &xor_transform);
                assert_eq!(a, b);
                assert_eq!(a.raw(), &bytes);
            }
        }
    }

    #[test]
    fn test_decode_copies_fields_into_named_slots() {
        let mut bytes = [0u8; 32];
        bytes[0] = 42 ^ 0x5A;
        bytes[1 + Channel::O1.index()] = 0x10 ^ 0x5A;
        bytes[15 + Channel::T8.index()] = 3;
        bytes[31] = 77;

        let frame = decode(RawPacket::new(bytes), DeviceVariant::Consumer, &xor_transform);
        assert_eq!(frame.counter(), 42);
        assert_eq!(frame.battery(), 77);
        assert_eq!(frame.channel(Channel::O1).value, 0x10);
        assert_eq!(frame.channel(Channel::T8).quality, 3);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_variant_reaches_transform() {
        let raw = RawPacket::new([0x5A; 32]);
        let consumer = decode(raw, DeviceVariant::Consumer, &xor_transform);
        let developer = decode(raw, DeviceVariant::Developer, &xor_transform);
        assert_eq!(consumer.counter(), 0);
        assert!(!consumer.is_valid());
        assert_ne!(developer.counter(), 0);
    }

    #[test]
    fn test_plaintext_layout_is_total() {
        for fill in [0x00u8, 0x7F, 0x80, 0xFF] {
            let frame = decode(RawPacket::new([fill; 32]), DeviceVariant::Developer, &PlaintextLayout);
            assert!(frame.counter() < 128);
            assert_eq!(frame.raw(), &[fill; 32]);
        }
    }
}
