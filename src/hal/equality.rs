use serde::{Deserialize, Serialize};

use super::types::{FormatDescriptor, FormatFlags};

/// Rule set selector for [`descriptors_equal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqualityMode {
    /// Virtual-format match: `a` may carry more bits than `b`, packing ignored
    Loose = 0,
    /// Physical match, mixability must agree
    StrictNonMixable = 1,
    /// Packed 24-bit devices: `a` may be wider in bits and bytes
    Packed24 = 2,
    /// Exact physical match including packing
    Default = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Exact,
    AtLeast,
}

impl Comparison {
    fn holds(self, a: u32, b: u32) -> bool {
        match self {
            Comparison::Exact => a == b,
            Comparison::AtLeast => a >= b,
        }
    }
}

#[derive(Debug)]
struct FieldRules {
    flag_mask: FormatFlags,
    bits_per_channel: Comparison,
    bytes_per_packet: Comparison,
}

const ENCODING_FLAGS: FormatFlags = FormatFlags::FLOAT
    .union(FormatFlags::SIGNED_INTEGER)
    .union(FormatFlags::BIG_ENDIAN);

// Indexed by `EqualityMode as usize`.
const RULES: [FieldRules; 4] = [
    FieldRules {
        flag_mask: ENCODING_FLAGS,
        bits_per_channel: Comparison::AtLeast,
        bytes_per_packet: Comparison::Exact,
    },
    FieldRules {
        flag_mask: ENCODING_FLAGS.union(FormatFlags::NON_MIXABLE),
        bits_per_channel: Comparison::Exact,
        bytes_per_packet: Comparison::Exact,
    },
    FieldRules {
        flag_mask: ENCODING_FLAGS.union(FormatFlags::PACKED),
        bits_per_channel: Comparison::AtLeast,
        bytes_per_packet: Comparison::AtLeast,
    },
    FieldRules {
        flag_mask: ENCODING_FLAGS.union(FormatFlags::PACKED),
        bits_per_channel: Comparison::Exact,
        bytes_per_packet: Comparison::Exact,
    },
];

impl EqualityMode {
    fn rules(self) -> &'static FieldRules {
        &RULES[self as usize]
    }
}

/// Policy-parameterized format match.
///
/// Every mode requires the same canonical format kind and sample rate.
/// When both sides are compressed, bytes-per-packet and channel count are
/// not compared since compressed frames carry no PCM geometry.
pub fn descriptors_equal(a: &FormatDescriptor, b: &FormatDescriptor, mode: EqualityMode) -> bool {
    let rules = mode.rules();
    let compressed = a.is_compressed() && b.is_compressed();

    (a.flags & rules.flag_mask) == (b.flags & rules.flag_mask)
        && rules.bits_per_channel.holds(a.bits_per_channel, b.bits_per_channel)
        && a.kind() == b.kind()
        && (compressed || rules.bytes_per_packet.holds(a.bytes_per_packet, b.bytes_per_packet))
        && (compressed || a.channels_per_frame == b.channels_per_frame)
        && a.sample_rate == b.sample_rate
}
