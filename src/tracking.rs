//! Caller-side bookkeeping over a stream of frames. The acquisition loop
//! itself never reports drops or accumulates quality.

use crate::protocol::{counter_delta, COUNTER_MODULUS, QUALITY_ORDER};
use crate::types::{Channel, SensorFrame};

/// Counts frames lost between successive counters.
///
/// Counter 0 is never delivered, so stepping over it is not a drop.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last: Option<u8>,
    received: u64,
    dropped: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame counter and return how many frames were missed since
    /// the previous one. A repeated counter counts as no loss.
    pub fn observe(&mut self, counter: u8) -> u8 {
        self.received += 1;
        let prev = match self.last.replace(counter) {
            Some(prev) => prev,
            None => return 0,
        };

        let delta = counter_delta(prev, counter);
        if delta == 0 {
            log::debug!("Repeated frame counter {}", counter);
            return 0;
        }

        let crossed_zero = counter != 0 && prev as u16 + delta as u16 >= COUNTER_MODULUS as u16;
        let missed = delta - 1 - u8::from(crossed_zero);
        if missed > 0 {
            log::debug!("Missed {} frame(s) between {} and {}", missed, prev, counter);
        }
        self.dropped += missed as u64;
        missed
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Latest contact quality per channel.
///
/// Each packet carries the quality of a single channel, chosen by its
/// counter; this folds successive frames into a full picture.
///
/// The channel is taken from the EPOC rotation, `QUALITY_ORDER[counter % 16]`,
/// which is what [`crate::PlaintextLayout`] fills in. Quality values a custom
/// [`crate::PacketTransform`] reports for other channels are ignored here; a
/// transform that reports every channel in every frame should be read through
/// `frame.channel(c).quality` instead.
#[derive(Debug, Clone, Default)]
pub struct ContactQuality {
    levels: [Option<i32>; Channel::COUNT],
}

impl ContactQuality {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the quality sample carried by `frame`. Returns the channel it
    /// updated, or `None` for an invalid frame.
    pub fn observe(&mut self, frame: &SensorFrame) -> Option<Channel> {
        if !frame.is_valid() {
            return None;
        }
        let channel = QUALITY_ORDER[(frame.counter() % 16) as usize];
        self.levels[channel.index()] = Some(frame.channel(channel).quality);
        Some(channel)
    }

    /// Latest quality for `channel`, `None` until one has been seen.
    pub fn get(&self, channel: Channel) -> Option<i32> {
        self.levels[channel.index()]
    }

    /// True once every channel has reported at least once.
    pub fn is_complete(&self) -> bool {
        self.levels.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, DecodedFields};
    use crate::types::{DeviceVariant, RawPacket};

    fn frame_with_quality(counter: u8, quality: i32) -> SensorFrame {
        let transform = move |_: &RawPacket, _: DeviceVariant| {
            let mut fields = DecodedFields {
                counter,
                ..Default::default()
            };
            for ch in fields.channels.iter_mut() {
                ch.quality = quality;
            }
            fields
        };
        decode(RawPacket::new([0; 32]), DeviceVariant::Consumer, &transform)
    }

    #[test]
    fn test_consecutive_counters_no_drops() {
        let mut seq = SequenceTracker::new();
        for c in 1..=127u8 {
            assert_eq!(seq.observe(c), 0);
        }
        // 0 is never delivered, so 127 -> 1 is continuous
        assert_eq!(seq.observe(1), 0);
        assert_eq!(seq.dropped(), 0);
        assert_eq!(seq.received(), 128);
    }

    #[test]
    fn test_raw_wrap_through_zero() {
        let mut seq = SequenceTracker::new();
        for c in [125u8, 126, 127, 0, 1] {
            assert_eq!(seq.observe(c), 0);
        }
    }

    #[test]
    fn test_gap_counts_missed_frames() {
        let mut seq = SequenceTracker::new();
        seq.observe(10);
        assert_eq!(seq.observe(14), 3);
        assert_eq!(seq.observe(126), 111);
        // 127 and (skipped) 0 lie between; only 127 was lost
        assert_eq!(seq.observe(1), 1);
        assert_eq!(seq.dropped(), 115);
        assert_eq!(seq.observe(1), 0);

        seq.reset();
        assert_eq!(seq.received(), 0);
    }

    #[test]
    fn test_quality_takes_only_the_addressed_channel() {
        let mut quality = ContactQuality::new();
        // every channel carries 7, but counter 5 addresses P7 alone
        assert_eq!(quality.observe(&frame_with_quality(5, 7)), Some(Channel::P7));
        assert_eq!(quality.get(Channel::P7), Some(7));
        for channel in Channel::ALL.iter().filter(|&&c| c != Channel::P7) {
            assert_eq!(quality.get(*channel), None);
        }
    }

    #[test]
    fn test_quality_fills_in_over_cycle() {
        let mut quality = ContactQuality::new();
        assert!(quality.observe(&frame_with_quality(0, 9)).is_none());

        for counter in 1..16u8 {
            quality.observe(&frame_with_quality(counter, counter as i32 * 10));
        }
        // F3 lives in slot 0, which only counter 16 addresses here
        assert!(!quality.is_complete());
        assert_eq!(quality.observe(&frame_with_quality(16, 4)), Some(Channel::F3));
        assert!(quality.is_complete());

        assert_eq!(quality.get(Channel::F3), Some(4));
        assert_eq!(quality.get(Channel::FC6), Some(120));
        // slots 14/15 overwrite F8 and AF4
        assert_eq!(quality.get(Channel::F8), Some(140));
        assert_eq!(quality.get(Channel::AF4), Some(150));
    }
}
