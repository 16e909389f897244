//! FFmpeg backend integration tests.
//!
//! Fixture-based tests require files from `tests/fixtures/generate_fixtures.sh`
//! and return early when they are missing.

#![cfg(feature = "ffmpeg")]

use std::path::Path;

use vidthumb::{
    FfmpegElement, HostCapabilities, MediaElement, MediaErrorInfo, SamplingOverrides, Session,
    ThumbnailError, VideoSource,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn streamed_webm_path() -> &'static str {
    "tests/fixtures/sample_streamed.webm"
}

// ── construction ───────────────────────────────────────────────────

#[test]
fn empty_sources_fail_immediately() {
    assert!(matches!(
        Session::open(""),
        Err(ThumbnailError::InvalidSource(_))
    ));
    assert!(matches!(
        FfmpegElement::open(VideoSource::Blob(Vec::new())),
        Err(ThumbnailError::InvalidSource(_))
    ));
}

#[tokio::test]
async fn missing_file_surfaces_as_media_error() {
    let mut session = Session::open("this_file_does_not_exist.mp4").expect("construction");

    match session.metadata().await {
        Err(ThumbnailError::Decode(info)) => {
            assert_eq!(info.code, MediaErrorInfo::SRC_NOT_SUPPORTED);
        }
        other => panic!("expected a media error, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_blob_is_rejected_and_released() {
    let mut session =
        Session::open(b"this is not a media file".to_vec()).expect("construction");
    assert!(!session.element().source_released());

    let result = session.thumbnails(None).await;

    assert!(matches!(result, Err(ThumbnailError::Decode(_))));
    assert!(session.element().source_released());
}

// ── fixtures ───────────────────────────────────────────────────────

#[tokio::test]
async fn probes_fixture_metadata() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let metadata = vidthumb::get_metadata(path).await.expect("probe");
    assert_eq!(metadata.width, 640.0);
    assert_eq!(metadata.height, 480.0);
    assert!(
        (metadata.duration - 5.0).abs() < 0.1,
        "duration: {}",
        metadata.duration
    );
}

#[tokio::test]
async fn samples_fixture_once_per_second() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let thumbnails = vidthumb::get_thumbnails(path, None).await.expect("sampling");

    assert!(
        (5..=6).contains(&thumbnails.len()),
        "count: {}",
        thumbnails.len()
    );
    for (index, thumbnail) in thumbnails.iter().enumerate() {
        assert_eq!(thumbnail.current_time, index as f64);
        let image = thumbnail.decode().expect("decode").expect("image");
        assert_eq!((image.width(), image.height()), (448, 336));
    }
}

#[tokio::test]
async fn bounded_range_from_a_blob_through_data_urls() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let bytes = std::fs::read(path).expect("read fixture");
    let element = FfmpegElement::open(VideoSource::Blob(bytes))
        .expect("open blob")
        .with_capabilities(HostCapabilities {
            blob_encoding: false,
        });
    let mut session = Session::new(element);

    let thumbnails = session
        .thumbnails(Some(
            SamplingOverrides::new().start(1.0).end(3.0).interval(0.5),
        ))
        .await
        .expect("sampling");

    let timestamps: Vec<f64> = thumbnails.iter().map(|t| t.current_time).collect();
    assert_eq!(timestamps, vec![1.0, 1.5, 2.0, 2.5]);
    assert!(thumbnails.iter().all(|t| t.blob.is_some()));
}

#[tokio::test]
async fn reused_session_probes_then_samples() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut session = Session::open(path).expect("open");
    let metadata = session.metadata().await.expect("probe");
    let thumbnails = session
        .thumbnails(Some(SamplingOverrides::new().interval(metadata.duration / 2.0)))
        .await
        .expect("sampling");

    assert!((2..=3).contains(&thumbnails.len()));
    assert_eq!(session.element().current_time(), session.element().duration());
}

#[tokio::test]
async fn streamed_webm_duration_is_recovered() {
    let path = streamed_webm_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut session = Session::open(path).expect("open");
    let metadata = session.metadata().await.expect("probe");

    assert!(metadata.duration.is_finite());
    assert!(
        (metadata.duration - 5.0).abs() < 0.2,
        "duration: {}",
        metadata.duration
    );
    assert_eq!(session.element().current_time(), 0.0);
}
