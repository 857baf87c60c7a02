//! End-to-end stamping scenarios through the public API.
//!
//! These use the production encoder and a local HTTP stub in place of the
//! reverse geocoding service. JPEG is the primary format here to keep debug
//! builds fast; format selection itself is covered by the codec unit tests.

use axum::Router;
use axum::routing::get;
use fieldproof::config::StampConfig;
use fieldproof::geolocation::{FixedPosition, NoPosition, PositionSource};
use fieldproof::imaging::{Dimensions, Orientation, OutputFormat, read_orientation};
use fieldproof::pipeline::{PipelineSupervisor, Stage, StageOutcome};
use fieldproof::types::{CaptureContext, Coordinates, RawCapture};
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

// =========================================================================
// Fixtures
// =========================================================================

fn noisy_photo(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x2545_F491;
    RgbImage::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let n = (state & 0x3F) as u8;
        // Gradient plus noise: photo-like, compresses poorly
        Rgb([
            ((x * 255 / width) as u8).saturating_add(n),
            ((y * 255 / height) as u8).saturating_add(n),
            96u8.saturating_add(n),
        ])
    })
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Insert a little-endian EXIF APP1 segment carrying `orientation` after SOI.
fn with_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes());

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn lobby() -> CaptureContext {
    CaptureContext {
        location_name: "Lobby WC".into(),
        timestamp_iso: "2026-10-18T09:30:00+07:00".into(),
        organization_id: "org-42".into(),
    }
}

fn jakarta() -> Arc<dyn PositionSource> {
    Arc::new(FixedPosition(Coordinates {
        latitude: -6.2,
        longitude: 106.8,
        accuracy_m: Some(10.0),
    }))
}

/// Config pointed at `endpoint`, JPEG output, generous image deadlines.
fn config(endpoint: &str, geocode_ms: u64) -> StampConfig {
    let mut config = StampConfig::default();
    config.geocoding.endpoint = endpoint.to_string();
    config.geocoding.user_agent = "fieldproof-tests".into();
    config.encoding.primary = OutputFormat::Jpeg;
    config.timeouts.geocode_ms = geocode_ms;
    config.timeouts.position_ms = 1000;
    config.timeouts.resolve_ms = geocode_ms + 2000;
    config.timeouts.composite_ms = 120_000;
    config.timeouts.encode_ms = 120_000;
    config
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/reverse")
}

async fn geocoder_stub() -> String {
    serve(Router::new().route(
        "/reverse",
        get(|| async {
            axum::Json(serde_json::json!({
                "address": {
                    "road": "Jl. M.H. Thamrin",
                    "suburb": "Menteng",
                    "city": "Jakarta Pusat",
                    "postcode": "10310"
                }
            }))
        }),
    ))
    .await
}

async fn stalled_geocoder_stub() -> String {
    serve(Router::new().route(
        "/reverse",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            axum::Json(serde_json::json!({"address": {"road": "too late"}}))
        }),
    ))
    .await
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test]
async fn rotated_capture_with_address_is_stamped_upright_and_smaller() {
    let endpoint = geocoder_stub().await;
    let supervisor = PipelineSupervisor::from_config(&config(&endpoint, 3000), jakarta()).unwrap();
    let jpeg = with_orientation(&encode_jpeg(&noisy_photo(1920, 1080), 95), 6);
    assert_eq!(read_orientation(&jpeg), Orientation::Rotate90);
    let input_len = jpeg.len();

    let photo = supervisor
        .run(RawCapture::new(jpeg, "image/jpeg"), &lobby())
        .await;

    assert!(photo.report.watermarked, "{:?}", photo.report);
    assert!(photo.report.is_clean(), "{:?}", photo.report);
    assert_eq!(
        photo.dimensions,
        Some(Dimensions {
            width: 720,
            height: 1280
        })
    );
    let decoded = image::load_from_memory(&photo.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (720, 1280));

    assert_eq!(photo.watermark.lines.len(), 3);
    assert_eq!(photo.watermark.lines[0], "Lobby WC");
    assert_eq!(
        photo.watermark.lines[2],
        "Jl. M.H. Thamrin, Menteng, Jakarta Pusat, 10310"
    );
    assert!(photo.bytes.len() < input_len);
    assert_eq!(photo.mime_type, "image/jpeg");
    assert_eq!(photo.sha256, format!("{:x}", Sha256::digest(&photo.bytes)));
}

#[tokio::test]
async fn geocode_timeout_shows_raw_coordinates() {
    let endpoint = stalled_geocoder_stub().await;
    let supervisor = PipelineSupervisor::from_config(&config(&endpoint, 300), jakarta()).unwrap();
    let jpeg = encode_jpeg(&noisy_photo(400, 300), 90);

    let started = std::time::Instant::now();
    let photo = supervisor
        .run(RawCapture::new(jpeg, "image/jpeg"), &lobby())
        .await;

    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(photo.report.watermarked);
    assert!(photo.watermark.shows_raw_coordinates());
    assert_eq!(photo.watermark.lines[2], "GPS -6.200000, 106.800000 (±10m)");
    let fix = photo.geolocation.unwrap();
    assert!(fix.address.is_none());
    assert!(matches!(
        photo.report.outcome(Stage::Resolving),
        Some(StageOutcome::Degraded(_))
    ));
}

#[tokio::test]
async fn corrupt_capture_is_returned_unmodified() {
    let endpoint = geocoder_stub().await;
    let supervisor = PipelineSupervisor::from_config(&config(&endpoint, 3000), jakarta()).unwrap();
    let mut corrupt = encode_jpeg(&noisy_photo(64, 64), 90);
    // Keep the signature, destroy everything after it
    for byte in corrupt.iter_mut().skip(2) {
        *byte = 0x00;
    }

    let photo = supervisor
        .run(RawCapture::new(corrupt.clone(), "image/jpeg"), &lobby())
        .await;

    assert_eq!(photo.bytes, corrupt);
    assert_eq!(photo.mime_type, "image/jpeg");
    assert!(!photo.report.watermarked);
    assert_eq!(photo.report.outcome(Stage::Encoding), Some(&StageOutcome::Skipped));
}

#[tokio::test]
async fn no_position_gives_two_line_watermark() {
    let endpoint = geocoder_stub().await;
    let supervisor =
        PipelineSupervisor::from_config(&config(&endpoint, 3000), Arc::new(NoPosition)).unwrap();
    let jpeg = encode_jpeg(&noisy_photo(320, 240), 90);

    let photo = supervisor
        .run(RawCapture::new(jpeg, "image/jpeg"), &lobby())
        .await;

    assert!(photo.report.watermarked);
    assert!(photo.geolocation.is_none());
    assert_eq!(
        photo.watermark.lines,
        vec!["Lobby WC", "18 Oct 2026 09:30:00 +07:00"]
    );
}

#[tokio::test]
async fn concurrent_captures_do_not_interfere() {
    let endpoint = geocoder_stub().await;
    let supervisor =
        Arc::new(PipelineSupervisor::from_config(&config(&endpoint, 3000), jakarta()).unwrap());

    let mut handles = Vec::new();
    for i in 0..4u32 {
        let supervisor = supervisor.clone();
        handles.push(tokio::spawn(async move {
            let jpeg = encode_jpeg(&noisy_photo(200 + i * 40, 150), 90);
            let context = CaptureContext {
                location_name: format!("Room {i}"),
                ..lobby()
            };
            supervisor
                .run(RawCapture::new(jpeg, "image/jpeg"), &context)
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let photo = handle.await.unwrap();
        assert!(photo.report.watermarked);
        assert_eq!(photo.watermark.lines[0], format!("Room {i}"));
        let width = 200 + i as u32 * 40;
        assert_eq!(
            photo.dimensions,
            Some(Dimensions { width, height: 150 })
        );
    }
}
