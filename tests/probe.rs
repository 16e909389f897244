mod common;

use common::ScriptedElement;
use vidthumb::{
    CancellationToken, EventMachine, MediaErrorInfo, MediaEvent, Metadata, MetadataProbe,
    RECOVERY_SEEK_TARGET, Session, Step, ThumbnailError, drive,
};

#[tokio::test]
async fn finite_duration_is_truncated_without_recovery() {
    let mut element = ScriptedElement::new(1280.0, 720.0, 12.3456);
    let mut probe = MetadataProbe::new();

    let metadata = drive(&mut element, &mut probe, None).await.unwrap();

    assert_eq!(metadata, Metadata::new(1280.0, 720.0, 12.34));
    assert_eq!(metadata.duration, 12.34);
    assert_eq!(probe.recovery_seeks(), 0);
    assert!(probe.is_settled());
    assert!(element.seeks.is_empty());
}

#[tokio::test]
async fn infinite_duration_is_recovered_with_one_seek() {
    let mut element = ScriptedElement::new(640.0, 360.0, 7.519).with_unknown_duration();
    let mut probe = MetadataProbe::new();

    let metadata = drive(&mut element, &mut probe, None).await.unwrap();

    assert_eq!(metadata.duration, 7.51);
    assert_eq!(metadata.width, 640.0);
    assert_eq!(probe.recovery_seeks(), 1);
    assert_eq!(element.seeks, vec![RECOVERY_SEEK_TARGET, 0.0]);
    assert_eq!(vidthumb::MediaElement::current_time(&element), 0.0);
}

#[tokio::test]
async fn load_error_carries_element_details() {
    let mut session = Session::new(
        ScriptedElement::new(640.0, 360.0, 5.0)
            .failing_to_load(Some(MediaErrorInfo::SRC_NOT_SUPPORTED)),
    );

    let error = session.metadata().await.unwrap_err();
    match error {
        ThumbnailError::Decode(info) => {
            assert_eq!(info.code, MediaErrorInfo::SRC_NOT_SUPPORTED);
            assert_eq!(
                ThumbnailError::Decode(info).to_string(),
                "Media error 4; details: scripted load failure"
            );
        }
        other => panic!("expected a decode error, got {other:?}"),
    }
    assert_eq!(session.element().releases, 1);
}

#[tokio::test]
async fn load_error_without_details_is_unknown() {
    let mut session =
        Session::new(ScriptedElement::new(640.0, 360.0, 5.0).failing_to_load(None));

    assert!(matches!(
        session.metadata().await,
        Err(ThumbnailError::UnknownDecode)
    ));
}

#[tokio::test]
async fn ended_before_metadata_fails() {
    let mut session = Session::new(ScriptedElement::new(640.0, 360.0, 5.0).ending_immediately());

    assert!(matches!(
        session.metadata().await,
        Err(ThumbnailError::EndedBeforeMetadata)
    ));
    assert_eq!(session.element().releases, 1);
}

#[tokio::test]
async fn silent_element_closes_the_stream() {
    let mut session = Session::new(ScriptedElement::new(640.0, 360.0, 5.0).silent());

    assert!(matches!(
        session.metadata().await,
        Err(ThumbnailError::EventStreamClosed)
    ));
}

#[tokio::test]
async fn pre_cancelled_token_short_circuits() {
    let token = CancellationToken::new();
    token.cancel();
    let mut element = ScriptedElement::new(640.0, 360.0, 5.0);
    let mut probe = MetadataProbe::new();

    let result = drive(&mut element, &mut probe, Some(&token)).await;

    assert!(matches!(result, Err(ThumbnailError::Cancelled)));
    assert!(element.seeks.is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_probe() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let mut element = ScriptedElement::new(640.0, 360.0, 5.0).silent().stalling();
    let mut probe = MetadataProbe::new();

    let result = drive(&mut element, &mut probe, Some(&token)).await;
    assert!(matches!(result, Err(ThumbnailError::Cancelled)));
}

#[test]
fn settled_probe_ignores_later_events() {
    let mut element = ScriptedElement::new(640.0, 360.0, 5.0);
    let mut probe = MetadataProbe::new();

    let first = probe
        .handle(MediaEvent::LoadedMetadata, &mut element)
        .unwrap();
    assert!(matches!(first, Step::Done(_)));

    for event in [
        MediaEvent::LoadedMetadata,
        MediaEvent::TimeUpdate,
        MediaEvent::Error,
        MediaEvent::Ended,
    ] {
        assert_eq!(probe.handle(event, &mut element).unwrap(), Step::Pending);
    }
}

#[tokio::test]
async fn sessions_on_the_same_source_agree() {
    let mut first = Session::new(ScriptedElement::new(1920.0, 1080.0, 30.017));
    let mut second = Session::new(ScriptedElement::new(1920.0, 1080.0, 30.017));

    assert_eq!(
        first.metadata().await.unwrap(),
        second.metadata().await.unwrap()
    );
}
