use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};

use super::equality::{descriptors_equal, EqualityMode};

/// Hardware stream object identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub u32);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Hardware device object identifier (owner of one or more streams)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Raw four-character encoding tag as reported by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FourCc(pub u32);

impl FourCc {
    pub const LINEAR_PCM: FourCc = FourCc::from_bytes(*b"lpcm");
    pub const AC3: FourCc = FourCc::from_bytes(*b"ac-3");
    pub const IEC60958_AC3: FourCc = FourCc::from_bytes(*b"cac3");
    pub const IAC3: FourCc = FourCc::from_bytes(*b"IAC3");
    pub const IAC3_LOWER: FourCc = FourCc::from_bytes(*b"iac3");

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        FourCc(u32::from_be_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// True for every tag that carries AC3 as opaque compressed frames
    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            Self::AC3 | Self::IEC60958_AC3 | Self::IAC3 | Self::IAC3_LOWER
        )
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
            for b in bytes {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

/// Canonical encoding family used for comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    LinearPcm,
    /// All AC3 passthrough tags fold into this one value
    CompressedAc3,
    Other(FourCc),
}

impl From<FourCc> for FormatKind {
    fn from(tag: FourCc) -> Self {
        if tag.is_compressed() {
            FormatKind::CompressedAc3
        } else if tag == FourCc::LINEAR_PCM {
            FormatKind::LinearPcm
        } else {
            FormatKind::Other(tag)
        }
    }
}

/// Layout and encoding flags of a stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FormatFlags(pub u32);

impl FormatFlags {
    pub const NONE: FormatFlags = FormatFlags(0);
    pub const FLOAT: FormatFlags = FormatFlags(1 << 0);
    pub const BIG_ENDIAN: FormatFlags = FormatFlags(1 << 1);
    pub const SIGNED_INTEGER: FormatFlags = FormatFlags(1 << 2);
    pub const PACKED: FormatFlags = FormatFlags(1 << 3);
    pub const ALIGNED_HIGH: FormatFlags = FormatFlags(1 << 4);
    pub const NON_INTERLEAVED: FormatFlags = FormatFlags(1 << 5);
    pub const NON_MIXABLE: FormatFlags = FormatFlags(1 << 6);

    /// Native byte order of the host
    #[cfg(target_endian = "big")]
    pub const NATIVE_ENDIAN: FormatFlags = FormatFlags::BIG_ENDIAN;
    #[cfg(target_endian = "little")]
    pub const NATIVE_ENDIAN: FormatFlags = FormatFlags::NONE;

    pub const fn union(self, other: FormatFlags) -> FormatFlags {
        FormatFlags(self.0 | other.0)
    }

    pub const fn intersection(self, other: FormatFlags) -> FormatFlags {
        FormatFlags(self.0 & other.0)
    }

    pub const fn contains(self, other: FormatFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: FormatFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: FormatFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for FormatFlags {
    type Output = FormatFlags;

    fn bitor(self, rhs: FormatFlags) -> FormatFlags {
        self.union(rhs)
    }
}

impl BitAnd for FormatFlags {
    type Output = FormatFlags;

    fn bitand(self, rhs: FormatFlags) -> FormatFlags {
        self.intersection(rhs)
    }
}

/// Application-side sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    U8,   // 8-bit unsigned
    I16,  // 16-bit PCM
    I24,  // 24-bit packed
    I32,  // 32-bit integer
    F32,  // 32-bit float
    F64,  // 64-bit float
    I16Planar,
    I32Planar,
    F32Planar,
    /// IEC 60958 AC3 passthrough in a 16-bit container
    Spdif,
}

impl Default for SampleFormat {
    fn default() -> Self {
        SampleFormat::F32
    }
}

impl SampleFormat {
    /// Probe order used when mapping a descriptor back to a sample format
    pub const ALL: [SampleFormat; 10] = [
        SampleFormat::U8,
        SampleFormat::I16,
        SampleFormat::I24,
        SampleFormat::I32,
        SampleFormat::F32,
        SampleFormat::F64,
        SampleFormat::I16Planar,
        SampleFormat::I32Planar,
        SampleFormat::F32Planar,
        SampleFormat::Spdif,
    ];

    /// [`SampleFormat::ALL`] with `I24` probed after `I32`
    pub const PACKED24_ORDER: [SampleFormat; 10] = [
        SampleFormat::U8,
        SampleFormat::I16,
        SampleFormat::I32,
        SampleFormat::I24,
        SampleFormat::F32,
        SampleFormat::F64,
        SampleFormat::I16Planar,
        SampleFormat::I32Planar,
        SampleFormat::F32Planar,
        SampleFormat::Spdif,
    ];

    pub fn bytes_per_sample(self) -> u32 {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 | SampleFormat::I16Planar | SampleFormat::Spdif => 2,
            SampleFormat::I24 => 3,
            SampleFormat::I32 | SampleFormat::I32Planar => 4,
            SampleFormat::F32 | SampleFormat::F32Planar => 4,
            SampleFormat::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            SampleFormat::F32 | SampleFormat::F64 | SampleFormat::F32Planar
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, SampleFormat::U8)
    }

    pub fn is_planar(self) -> bool {
        matches!(
            self,
            SampleFormat::I16Planar | SampleFormat::I32Planar | SampleFormat::F32Planar
        )
    }

    pub fn is_spdif(self) -> bool {
        matches!(self, SampleFormat::Spdif)
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::I16 => "s16",
            SampleFormat::I24 => "s24",
            SampleFormat::I32 => "s32",
            SampleFormat::F32 => "float",
            SampleFormat::F64 => "double",
            SampleFormat::I16Planar => "s16p",
            SampleFormat::I32Planar => "s32p",
            SampleFormat::F32Planar => "floatp",
            SampleFormat::Spdif => "spdif-ac3",
        }
    }
}

/// Physical layout of a hardware audio stream.
///
/// Plain value type. Field-by-field `==` is identity; format matching
/// goes through [`descriptors_equal`] with an explicit [`EqualityMode`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub sample_rate: f64,
    pub format_id: FourCc,
    pub flags: FormatFlags,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub bytes_per_frame: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
}

impl FormatDescriptor {
    /// Packed interleaved signed-integer PCM in native byte order
    pub fn pcm_int(sample_rate: f64, channels: u32, bits: u32) -> Self {
        Self::packed(
            FourCc::LINEAR_PCM,
            sample_rate,
            channels,
            bits,
            FormatFlags::SIGNED_INTEGER | FormatFlags::NATIVE_ENDIAN,
        )
    }

    /// Packed interleaved float PCM in native byte order
    pub fn pcm_float(sample_rate: f64, channels: u32, bits: u32) -> Self {
        Self::packed(
            FourCc::LINEAR_PCM,
            sample_rate,
            channels,
            bits,
            FormatFlags::FLOAT | FormatFlags::NATIVE_ENDIAN,
        )
    }

    /// One frame per packet, samples packed into whole bytes
    pub fn packed(
        format_id: FourCc,
        sample_rate: f64,
        channels: u32,
        bits: u32,
        flags: FormatFlags,
    ) -> Self {
        let flags = flags | FormatFlags::PACKED;
        let channels_per_buffer = if flags.contains(FormatFlags::NON_INTERLEAVED) {
            1
        } else {
            channels
        };
        // Channel counts come straight from the driver.
        let bytes_per_frame = channels_per_buffer.saturating_mul(bits.div_ceil(8));

        Self {
            sample_rate,
            format_id,
            flags,
            bytes_per_packet: bytes_per_frame,
            frames_per_packet: 1,
            bytes_per_frame,
            channels_per_frame: channels,
            bits_per_channel: bits,
        }
    }

    /// Descriptor implied by an application sample format
    pub fn from_sample_format(format: SampleFormat, sample_rate: f64, channels: u32) -> Self {
        let format_id = if format.is_spdif() {
            FourCc::IEC60958_AC3
        } else {
            FourCc::LINEAR_PCM
        };

        let mut flags = FormatFlags::NATIVE_ENDIAN;
        if format.is_planar() {
            flags.insert(FormatFlags::NON_INTERLEAVED);
        }
        if format.is_float() {
            flags.insert(FormatFlags::FLOAT);
        } else if !format.is_unsigned() {
            flags.insert(FormatFlags::SIGNED_INTEGER);
        }

        Self::packed(
            format_id,
            sample_rate,
            channels,
            format.bytes_per_sample() * 8,
            flags,
        )
    }

    /// First sample format whose implied descriptor matches this one.
    ///
    /// In [`EqualityMode::Packed24`] the 32-bit container is tried before
    /// 24-bit samples, so a packed 24-bit device maps to `I32`.
    pub fn to_sample_format(&self, mode: EqualityMode) -> Option<SampleFormat> {
        let order = match mode {
            EqualityMode::Packed24 => SampleFormat::PACKED24_ORDER,
            _ => SampleFormat::ALL,
        };
        order.into_iter().find(|&format| {
            let implied =
                Self::from_sample_format(format, self.sample_rate, self.channels_per_frame);
            descriptors_equal(&implied, self, mode)
        })
    }

    /// Override the frame width, e.g. 24-bit samples in 32-bit slots
    pub fn with_bytes_per_frame(mut self, bytes_per_frame: u32) -> Self {
        self.bytes_per_frame = bytes_per_frame;
        self.bytes_per_packet = bytes_per_frame.saturating_mul(self.frames_per_packet);
        let natural = self
            .channels_per_buffer()
            .saturating_mul(self.bits_per_channel.div_ceil(8));
        if bytes_per_frame != natural {
            self.flags.remove(FormatFlags::PACKED);
        }
        self
    }

    pub fn with_flags(mut self, flags: FormatFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn non_mixable(mut self) -> Self {
        self.flags.insert(FormatFlags::NON_MIXABLE);
        self
    }

    pub fn kind(&self) -> FormatKind {
        FormatKind::from(self.format_id)
    }

    pub fn is_compressed(&self) -> bool {
        self.format_id.is_compressed()
    }

    pub fn is_non_mixable(&self) -> bool {
        self.flags.contains(FormatFlags::NON_MIXABLE)
    }

    fn channels_per_buffer(&self) -> u32 {
        if self.flags.contains(FormatFlags::NON_INTERLEAVED) {
            1
        } else {
            self.channels_per_frame
        }
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.flags;
        let encoding = if flags.contains(FormatFlags::FLOAT) {
            "F"
        } else if flags.contains(FormatFlags::SIGNED_INTEGER) {
            "Int"
        } else {
            "Uint"
        };
        let alignment = if flags.contains(FormatFlags::PACKED) {
            "P "
        } else if flags.contains(FormatFlags::ALIGNED_HIGH) {
            "High "
        } else {
            "Low "
        };

        write!(
            f,
            "{} {}Bit/{}kHz [{}bpp][{}fpp][{}bpf][{}ch] {} {}{} {} {} ({})",
            self.format_id,
            self.bits_per_channel,
            self.sample_rate / 1000.0,
            self.bytes_per_packet,
            self.frames_per_packet,
            self.bytes_per_frame,
            self.channels_per_frame,
            encoding,
            alignment,
            if flags.contains(FormatFlags::BIG_ENDIAN) { "BE" } else { "LE" },
            if flags.contains(FormatFlags::NON_INTERLEAVED) { "NonIntl" } else { "Intl" },
            if flags.contains(FormatFlags::NON_MIXABLE) { "Nonmix" } else { "Mix" },
            self.to_sample_format(EqualityMode::Loose)
                .map(SampleFormat::name)
                .unwrap_or("-"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_display() {
        assert_eq!(FourCc::LINEAR_PCM.to_string(), "lpcm");
        assert_eq!(FourCc::IEC60958_AC3.to_string(), "cac3");
        assert_eq!(FourCc(0x0000_0001).to_string(), "0x00000001");
    }

    #[test]
    fn test_compressed_tags_fold_into_one_kind() {
        for tag in [FourCc::AC3, FourCc::IEC60958_AC3, FourCc::IAC3, FourCc::IAC3_LOWER] {
            assert!(tag.is_compressed());
            assert_eq!(FormatKind::from(tag), FormatKind::CompressedAc3);
        }
        assert_eq!(FormatKind::from(FourCc::LINEAR_PCM), FormatKind::LinearPcm);

        let aac = FourCc::from_bytes(*b"aac ");
        assert_eq!(FormatKind::from(aac), FormatKind::Other(aac));
    }

    #[test]
    fn test_from_sample_format_geometry() {
        let s16 = FormatDescriptor::from_sample_format(SampleFormat::I16, 48000.0, 2);
        assert_eq!(s16.bits_per_channel, 16);
        assert_eq!(s16.bytes_per_frame, 4);
        assert_eq!(s16.bytes_per_packet, 4);
        assert_eq!(s16.frames_per_packet, 1);
        assert!(s16.flags.contains(FormatFlags::SIGNED_INTEGER | FormatFlags::PACKED));
        assert!(!s16.flags.contains(FormatFlags::FLOAT));

        let planar = FormatDescriptor::from_sample_format(SampleFormat::F32Planar, 44100.0, 6);
        assert!(planar.flags.contains(FormatFlags::NON_INTERLEAVED | FormatFlags::FLOAT));
        assert_eq!(planar.bytes_per_frame, 4);

        let unsigned = FormatDescriptor::from_sample_format(SampleFormat::U8, 8000.0, 1);
        assert!(!unsigned.flags.contains(FormatFlags::SIGNED_INTEGER));

        let spdif = FormatDescriptor::from_sample_format(SampleFormat::Spdif, 48000.0, 2);
        assert_eq!(spdif.kind(), FormatKind::CompressedAc3);
        assert_eq!(spdif.bytes_per_frame, 4);
    }

    #[test]
    fn test_sample_format_mapping() {
        let float = FormatDescriptor::pcm_float(48000.0, 2, 32);
        assert_eq!(float.to_sample_format(EqualityMode::Default), Some(SampleFormat::F32));

        // 24 valid bits in a 32-bit slot plays as s32
        let padded = FormatDescriptor::pcm_int(96000.0, 2, 24).with_bytes_per_frame(8);
        assert!(!padded.flags.contains(FormatFlags::PACKED));
        assert_eq!(padded.to_sample_format(EqualityMode::Loose), Some(SampleFormat::I32));
        assert_eq!(padded.to_sample_format(EqualityMode::Default), None);

        // packed 24-bit devices are fed from a 32-bit application format
        let packed24 = FormatDescriptor::pcm_int(96000.0, 2, 24);
        assert_eq!(packed24.to_sample_format(EqualityMode::Packed24), Some(SampleFormat::I32));
        assert_eq!(packed24.to_sample_format(EqualityMode::Default), Some(SampleFormat::I24));
    }

    #[test]
    fn test_driver_channel_count_does_not_overflow() {
        let mut huge = FormatDescriptor::pcm_int(48000.0, 2, 16);
        huge.channels_per_frame = 0x4000_0000;

        let text = huge.to_string();
        assert!(text.contains("[1073741824ch]"));
        assert!(text.ends_with("(-)"));

        let widened = huge.with_bytes_per_frame(u32::MAX);
        assert_eq!(widened.bytes_per_packet, u32::MAX);

        let implied = FormatDescriptor::from_sample_format(SampleFormat::F64, 48000.0, u32::MAX);
        assert_eq!(implied.bytes_per_frame, u32::MAX);
    }

    #[test]
    fn test_display_is_one_line() {
        let desc = FormatDescriptor::pcm_int(48000.0, 2, 16);
        let text = desc.to_string();
        assert!(text.starts_with("lpcm 16Bit/48kHz"));
        assert!(text.contains("[2ch]"));
        assert!(text.ends_with("(s16)"));
        assert!(!text.contains('\n'));
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_display_layout() {
        let desc = FormatDescriptor::pcm_int(48000.0, 2, 16);
        assert_eq!(
            desc.to_string(),
            "lpcm 16Bit/48kHz [4bpp][1fpp][4bpf][2ch] Int P LE Intl Mix (s16)"
        );
    }
}
