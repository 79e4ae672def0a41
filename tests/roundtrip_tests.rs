//! Encode/decode round trips through the public API.

use std::time::Duration;

use zenwebp_anim::mux::WebPDemuxer;
use zenwebp_anim::{
    decode, encode, AnimatedWebP, AnimationFrame, Bitmap, DecodeConfig, DecodedImage,
    EncodeConfig, EncodeError, LoopCount, PixelLayout,
};

/// Create an RGBA bitmap whose pixels depend on position and `seed`.
fn pattern_rgba(width: u32, height: u32, seed: u8) -> Bitmap {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[
                (x * 16) as u8 ^ seed,
                (y * 16) as u8,
                seed,
                255,
            ]);
        }
    }
    Bitmap::new(width, height, PixelLayout::Rgba8, pixels).unwrap()
}

fn frames_with_durations(width: u32, height: u32, durations_ms: &[u64]) -> Vec<AnimationFrame> {
    durations_ms
        .iter()
        .enumerate()
        .map(|(i, &ms)| AnimationFrame {
            bitmap: pattern_rgba(width, height, (i as u8).wrapping_mul(60)),
            duration: Duration::from_millis(ms),
        })
        .collect()
}

fn decode_animation(data: &[u8], config: &DecodeConfig) -> zenwebp_anim::AnimatedBitmap {
    match decode(data, config).unwrap() {
        DecodedImage::Animated(anim) => anim,
        DecodedImage::Static(_) => panic!("expected an animation"),
    }
}

// ============================================================================
// Animations
// ============================================================================

#[test]
fn animation_roundtrip_preserves_frames() {
    let frames = frames_with_durations(16, 8, &[40, 80, 5]);
    let config = EncodeConfig::new().with_loop_count(LoopCount::from(2u16));
    let webp = encode(&frames, &config).unwrap();

    let anim = decode_animation(&webp, &DecodeConfig::default());
    assert_eq!(anim.frames.len(), 3);
    assert_eq!(anim.loop_count, LoopCount::from(2u16));

    let durations: Vec<_> = anim.frames.iter().map(|f| f.duration).collect();
    assert_eq!(
        durations,
        [
            Duration::from_millis(40),
            Duration::from_millis(80),
            Duration::from_millis(100),
        ]
    );
    assert_eq!(anim.loop_duration(), Duration::from_millis(220));

    for (decoded, original) in anim.frames.iter().zip(&frames) {
        assert_eq!(decoded.bitmap.layout(), PixelLayout::Rgba8);
        assert_eq!(decoded.bitmap.pixels(), original.bitmap.pixels());
    }
}

#[test]
fn session_sees_encoded_metadata() {
    let frames = frames_with_durations(8, 8, &[30, 30]);
    let webp = encode(&frames, &EncodeConfig::new()).unwrap();

    let session = AnimatedWebP::open(&webp).unwrap();
    assert!(session.is_animated());
    assert_eq!(session.loop_count(), LoopCount::Forever);
    assert_eq!(session.frame_count(), 2);
    for i in 0..2 {
        let desc = session.frame_info(i).unwrap();
        assert!(desc.is_full_size);
        assert!(desc.should_dispose);
        assert!(!desc.should_blend);
        assert_eq!(desc.blend_from_index, i);
    }
}

#[test]
fn rgb_frames_roundtrip() {
    let rgb: Vec<u8> = (0..6 * 4).flat_map(|i| [i as u8 * 10, 0, 255 - i as u8]).collect();
    let bitmap = Bitmap::new(6, 4, PixelLayout::Rgb8, rgb.clone()).unwrap();
    let frames = [
        AnimationFrame {
            bitmap: bitmap.clone(),
            duration: Duration::from_millis(50),
        },
        AnimationFrame {
            bitmap,
            duration: Duration::from_millis(50),
        },
    ];
    let webp = encode(&frames, &EncodeConfig::new()).unwrap();

    let anim = decode_animation(&webp, &DecodeConfig::default());
    let first = &anim.frames[0].bitmap;
    let decoded_rgb: Vec<u8> = first
        .pixels()
        .chunks_exact(first.layout().bytes_per_pixel())
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    assert_eq!(decoded_rgb, rgb);
}

#[test]
fn icc_profile_passes_through() {
    let icc = vec![0x42; 64];
    let frames = frames_with_durations(4, 4, &[50, 50]);
    let webp = encode(&frames, &EncodeConfig::new().with_icc_profile(icc.clone())).unwrap();
    let session = AnimatedWebP::open(&webp).unwrap();
    assert_eq!(session.icc_profile(), Some(&icc[..]));

    let still = encode(
        &frames[..1],
        &EncodeConfig::new().with_icc_profile(icc.clone()),
    )
    .unwrap();
    let session = AnimatedWebP::open(&still).unwrap();
    assert!(!session.is_animated());
    assert_eq!(session.icc_profile(), Some(&icc[..]));
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn first_frame_only_encodes_still() {
    let frames = frames_with_durations(8, 6, &[50, 60, 70]);
    let webp = encode(&frames, &EncodeConfig::new().with_first_frame_only(true)).unwrap();

    let demuxer = WebPDemuxer::new(&webp).unwrap();
    assert!(!demuxer.is_animated());

    let DecodedImage::Static(bitmap) = decode(&webp, &DecodeConfig::default()).unwrap() else {
        panic!("expected a still image");
    };
    assert_eq!((bitmap.width(), bitmap.height()), (8, 6));
}

#[test]
fn first_frame_only_decodes_poster() {
    let frames = frames_with_durations(8, 6, &[50, 60, 70]);
    let webp = encode(&frames, &EncodeConfig::new()).unwrap();

    let config = DecodeConfig::default().first_frame_only(true);
    let image = decode(&webp, &config).unwrap();
    let DecodedImage::Static(bitmap) = image else {
        panic!("expected a still image");
    };
    assert_eq!(bitmap.pixels(), frames[0].bitmap.pixels());
}

#[test]
fn max_pixel_size_downscales() {
    let frames = frames_with_durations(32, 16, &[50, 50]);
    let webp = encode(&frames, &EncodeConfig::new().with_max_pixel_size(16, 16)).unwrap();

    let demuxer = WebPDemuxer::new(&webp).unwrap();
    assert_eq!((demuxer.canvas_width(), demuxer.canvas_height()), (16, 8));
}

#[test]
fn target_size_applies_to_every_frame() {
    let frames = frames_with_durations(20, 10, &[50, 50, 50]);
    let webp = encode(&frames, &EncodeConfig::new()).unwrap();

    let config = DecodeConfig::default()
        .target_pixel_size(10, 10)
        .scale_factor(0.5);
    let anim = decode_animation(&webp, &config);
    for frame in &anim.frames {
        assert_eq!((frame.bitmap.width(), frame.bitmap.height()), (10, 5));
        assert_eq!(frame.bitmap.scale(), 1.0);
    }
}

#[test]
fn lower_quality_still_roundtrips_dimensions() {
    let frames = frames_with_durations(64, 64, &[50, 50]);
    let lossy = encode(&frames, &EncodeConfig::new().with_quality(0.2)).unwrap();

    let anim = decode_animation(&lossy, &DecodeConfig::default());
    assert_eq!(anim.frames.len(), 2);
    assert_eq!(
        (anim.frames[0].bitmap.width(), anim.frames[0].bitmap.height()),
        (64, 64)
    );
}

#[test]
fn byte_budget_is_honored() {
    let frames = frames_with_durations(64, 64, &[50, 50]);
    let webp = encode(&frames, &EncodeConfig::new().with_max_output_bytes(1 << 20)).unwrap();
    assert!(!webp.is_empty());

    assert!(matches!(
        encode(&frames, &EncodeConfig::new().with_max_output_bytes(1)),
        Err(EncodeError::OutputTooLarge { index: 0, limit: 1, .. })
    ));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn empty_input_has_no_frames() {
    assert!(matches!(
        encode(&[], &EncodeConfig::new()),
        Err(EncodeError::NoFrames)
    ));
}

#[test]
fn mismatched_frame_is_rejected() {
    let mut frames = frames_with_durations(8, 8, &[50, 50, 50]);
    frames[2].bitmap = pattern_rgba(8, 4, 0);
    assert!(matches!(
        encode(&frames, &EncodeConfig::new()),
        Err(EncodeError::InvalidDimensions {
            index: 2,
            width: 8,
            height: 4,
            expected_width: 8,
            expected_height: 8,
        })
    ));
}
