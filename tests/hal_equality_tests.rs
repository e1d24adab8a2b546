use hwfmt::hal::{descriptors_equal, EqualityMode, FormatDescriptor, FormatFlags, FourCc};

const ALL_MODES: [EqualityMode; 4] = [
    EqualityMode::Loose,
    EqualityMode::StrictNonMixable,
    EqualityMode::Packed24,
    EqualityMode::Default,
];

fn spdif(tag: FourCc, channels: u32, bytes_per_frame: u32) -> FormatDescriptor {
    FormatDescriptor::packed(tag, 48000.0, channels, 16, FormatFlags::SIGNED_INTEGER)
        .with_bytes_per_frame(bytes_per_frame)
        .with_flags(FormatFlags::SIGNED_INTEGER | FormatFlags::PACKED)
}

#[test]
fn test_compressed_ignores_geometry_in_every_mode() {
    let a = spdif(FourCc::IEC60958_AC3, 2, 4);
    let b = spdif(FourCc::AC3, 6, 12);

    for mode in ALL_MODES {
        assert!(descriptors_equal(&a, &b, mode), "{:?}", mode);
    }
}

#[test]
fn test_default_requires_exact_geometry() {
    let base = FormatDescriptor::pcm_int(48000.0, 2, 16);
    assert!(descriptors_equal(&base, &base, EqualityMode::Default));

    let more_channels = FormatDescriptor::pcm_int(48000.0, 6, 16);
    assert!(!descriptors_equal(&base, &more_channels, EqualityMode::Default));

    let mut wider_packet = base;
    wider_packet.bytes_per_packet = 8;
    assert!(!descriptors_equal(&base, &wider_packet, EqualityMode::Default));
}

#[test]
fn test_rate_and_kind_always_required() {
    let pcm = FormatDescriptor::pcm_int(48000.0, 2, 16);
    let other_rate = FormatDescriptor::pcm_int(44100.0, 2, 16);
    let compressed = spdif(FourCc::IEC60958_AC3, 2, 4);

    for mode in ALL_MODES {
        assert!(!descriptors_equal(&pcm, &other_rate, mode), "{:?}", mode);
        assert!(!descriptors_equal(&pcm, &compressed, mode), "{:?}", mode);
    }
}

#[test]
fn test_strict_mode_checks_mixability() {
    let mixable = FormatDescriptor::pcm_int(48000.0, 2, 16);
    let exclusive = mixable.non_mixable();

    assert!(!descriptors_equal(&exclusive, &mixable, EqualityMode::StrictNonMixable));
    assert!(descriptors_equal(&exclusive, &exclusive, EqualityMode::StrictNonMixable));
    // other modes do not look at the flag
    assert!(descriptors_equal(&exclusive, &mixable, EqualityMode::Default));
    assert!(descriptors_equal(&exclusive, &mixable, EqualityMode::Loose));
}

#[test]
fn test_strict_mode_ignores_packing() {
    let packed = FormatDescriptor::pcm_int(48000.0, 2, 16);
    let mut unpacked = packed;
    unpacked.flags.remove(FormatFlags::PACKED);

    assert!(descriptors_equal(&packed, &unpacked, EqualityMode::StrictNonMixable));
    assert!(!descriptors_equal(&packed, &unpacked, EqualityMode::Default));
}

#[test]
fn test_packed24_allows_wider_application_format() {
    let app = FormatDescriptor::pcm_int(96000.0, 2, 32);
    let device = FormatDescriptor::pcm_int(96000.0, 2, 24);

    assert!(descriptors_equal(&app, &device, EqualityMode::Packed24));
    assert!(!descriptors_equal(&device, &app, EqualityMode::Packed24));
    assert!(!descriptors_equal(&app, &device, EqualityMode::Default));
    // Loose still wants the same packet width
    assert!(!descriptors_equal(&app, &device, EqualityMode::Loose));
}

#[test]
fn test_encoding_flags_always_compared() {
    let int = FormatDescriptor::pcm_int(48000.0, 2, 32);
    let float = FormatDescriptor::pcm_float(48000.0, 2, 32);

    for mode in ALL_MODES {
        assert!(!descriptors_equal(&int, &float, mode), "{:?}", mode);
    }
}
