//! Session manager behavior: lifecycle, local media controls, screen
//! sharing and the remote roster

use huddle_core::channel::{AppEvent, Effect, ParticipantInfo, SessionEvent, TimerKind};
use huddle_core::media::MediaKind;
use huddle_core::session::{DisplayState, NetworkQuality, MEDIA_ACCESS_ERROR, SCREEN_SHARE_ERROR};
use huddle_core::types::{ParticipantId, StreamId};
use huddle_core::HuddleError;

mod test_utils;
use test_utils::create_test_session;

fn join(name_id: &str, name: &str) -> SessionEvent {
    SessionEvent::ParticipantJoined {
        participant: ParticipantInfo::new(name_id, name),
    }
}

#[tokio::test]
async fn test_initialize_and_toggle_audio_scenario() {
    let (mut session, devices, _time) = create_test_session();

    session.initialize().await.unwrap();
    assert_eq!(session.participants().len(), 1);
    let local = session.local_participant().unwrap();
    assert_eq!(local.id, ParticipantId::local());
    assert_eq!(local.name, "Tester");
    assert!(!local.muted);
    assert_eq!(devices.live_track_count(), 2);

    session.toggle_audio();
    assert!(session.is_audio_muted());
    assert!(session.local_participant().unwrap().muted);
    assert!(!session
        .local_stream()
        .unwrap()
        .is_producing(MediaKind::Audio));

    session.toggle_audio();
    assert!(!session.is_audio_muted());
    assert!(!session.local_participant().unwrap().muted);
    assert!(session.local_stream().unwrap().is_producing(MediaKind::Audio));
}

#[tokio::test]
async fn test_initialize_failure_sets_error() {
    let (mut session, devices, _time) = create_test_session();
    devices.set_user_media_denied(true);

    let err = session.initialize().await.unwrap_err();
    assert!(matches!(err, HuddleError::Media(_)));
    assert_eq!(session.error(), Some(MEDIA_ACCESS_ERROR));
    assert!(session.participants().is_empty());
    assert!(!session.is_active());

    let (effects, events) = session.drain_outbox();
    assert!(effects.is_empty());
    assert_eq!(
        events,
        vec![AppEvent::SessionError {
            message: MEDIA_ACCESS_ERROR.to_string()
        }]
    );
}

#[tokio::test]
async fn test_toggle_video_disables_camera_track() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();

    session.toggle_video();
    assert!(session.is_video_off());
    let local = session.local_participant().unwrap();
    assert_eq!(local.display, DisplayState::VideoOff);
    assert!(!session.local_stream().unwrap().is_producing(MediaKind::Video));

    session.toggle_video();
    assert_eq!(
        session.local_participant().unwrap().display,
        DisplayState::VideoActive
    );
}

#[tokio::test]
async fn test_end_meeting_is_idempotent() {
    let (mut session, devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    session.handle_event(join("mock-user1", "Jane Smith"));
    session.toggle_audio();
    session.toggle_screen_share().await.unwrap();
    for _ in 0..3 {
        session.handle_event(SessionEvent::ClockTick);
    }
    session.drain_outbox();

    session.end_meeting();
    let (effects, events) = session.drain_outbox();
    assert_eq!(
        effects,
        vec![
            Effect::CancelTimer {
                timer: TimerKind::MeetingClock
            },
            Effect::CancelTimer {
                timer: TimerKind::SpeakingSimulation
            },
        ]
    );
    assert_eq!(events, vec![AppEvent::SessionEnded]);

    session.end_meeting();
    assert!(session.outbox().is_empty());

    assert_eq!(devices.live_track_count(), 0);
    assert!(session.participants().is_empty());
    assert!(!session.is_audio_muted());
    assert!(!session.is_video_off());
    assert!(!session.is_screen_sharing());
    assert_eq!(session.duration_secs(), 0);
    assert!(session.error().is_none());
    assert!(session.local_stream().is_none());
}

#[tokio::test]
async fn test_end_meeting_before_initialize_is_safe() {
    let (mut session, devices, _time) = create_test_session();
    session.end_meeting();
    assert!(session.outbox().is_empty());
    assert!(devices.issued_streams().is_empty());
}

#[tokio::test]
async fn test_clock_ticks_only_while_active() {
    let (mut session, _devices, _time) = create_test_session();
    session.handle_event(SessionEvent::ClockTick);
    assert_eq!(session.duration_secs(), 0);

    session.initialize().await.unwrap();
    for _ in 0..65 {
        session.handle_event(SessionEvent::ClockTick);
    }
    assert_eq!(session.duration_secs(), 65);
    assert_eq!(session.formatted_duration(), "01:05");

    session.end_meeting();
    session.handle_event(SessionEvent::ClockTick);
    assert_eq!(session.duration_secs(), 0);
}

// ----------------------------------------------------------------------------
// Screen Sharing
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_screen_share_substitutes_video_track() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();

    session.toggle_screen_share().await.unwrap();
    assert!(session.is_screen_sharing());

    let local = session.local_participant().unwrap();
    assert!(local.screen_sharing);
    let shown = local.stream.as_ref().unwrap();
    let camera = session.local_stream().unwrap().clone();
    let screen = session.screen_stream().unwrap().clone();

    assert!(shown
        .audio_tracks()
        .next()
        .unwrap()
        .same_track(camera.audio_tracks().next().unwrap()));
    assert!(shown
        .video_tracks()
        .next()
        .unwrap()
        .same_track(screen.video_tracks().next().unwrap()));

    session.toggle_screen_share().await.unwrap();
    assert!(!session.is_screen_sharing());
    assert!(!screen.is_active());
    let local = session.local_participant().unwrap();
    assert_eq!(local.stream.as_ref().unwrap().id(), camera.id());
}

#[tokio::test]
async fn test_external_capture_end_restores_camera() {
    let (mut session, devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    session.toggle_screen_share().await.unwrap();
    let screen_id = session.screen_stream().unwrap().id().clone();

    assert!(devices.end_capture(&screen_id));
    session.handle_event(SessionEvent::ScreenCaptureEnded {
        stream_id: screen_id,
    });

    assert!(!session.is_screen_sharing());
    let local = session.local_participant().unwrap();
    assert!(!local.screen_sharing);
    assert_eq!(
        local.stream.as_ref().unwrap().id(),
        session.local_stream().unwrap().id()
    );
    assert_eq!(devices.live_track_count(), 2);
}

#[tokio::test]
async fn test_unknown_capture_end_is_ignored() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    session.toggle_screen_share().await.unwrap();

    session.handle_event(SessionEvent::ScreenCaptureEnded {
        stream_id: StreamId::from("screen-999"),
    });
    assert!(session.is_screen_sharing());
}

#[tokio::test]
async fn test_mute_persists_across_share_cycle() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();

    session.toggle_audio();
    session.toggle_screen_share().await.unwrap();
    assert!(!session
        .local_participant()
        .unwrap()
        .stream
        .as_ref()
        .unwrap()
        .is_producing(MediaKind::Audio));

    session.toggle_screen_share().await.unwrap();
    assert!(session.is_audio_muted());
    assert!(session.local_participant().unwrap().muted);
    assert!(!session.local_stream().unwrap().is_producing(MediaKind::Audio));
}

#[tokio::test]
async fn test_video_off_survives_share_cycle() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    session.toggle_video();

    session.toggle_screen_share().await.unwrap();
    assert_eq!(
        session.local_participant().unwrap().display,
        DisplayState::VideoActive
    );

    session.toggle_screen_share().await.unwrap();
    assert!(session.is_video_off());
    assert_eq!(
        session.local_participant().unwrap().display,
        DisplayState::VideoOff
    );
}

#[tokio::test]
async fn test_screen_share_denial_keeps_state() {
    let (mut session, devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    devices.set_display_media_denied(true);
    let before = session.local_participant().unwrap().stream.clone().unwrap();

    assert!(session.toggle_screen_share().await.is_err());
    assert!(!session.is_screen_sharing());
    assert_eq!(session.error(), Some(SCREEN_SHARE_ERROR));
    assert_eq!(
        session.local_participant().unwrap().stream.as_ref().unwrap().id(),
        before.id()
    );
}

// ----------------------------------------------------------------------------
// Roster
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_speaking_marks_at_most_one() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    session.handle_event(join("mock-user1", "Jane Smith"));
    session.handle_event(join("mock-user3", "Alex Johnson"));

    for sample in 0..12u64 {
        session.handle_event(SessionEvent::SpeakingTick {
            sample,
            level: 0.5,
        });
        let speaking = session
            .participants()
            .iter()
            .filter(|p| p.speaking)
            .count();
        assert!(speaking <= 1);
    }

    session.handle_event(SessionEvent::ActiveSpeaker {
        participant_id: Some(ParticipantId::from("mock-user3")),
        level: Some(0.25),
    });
    let speaker = session.active_speaker().unwrap();
    assert_eq!(speaker.name, "Alex Johnson");
    assert_eq!(speaker.audio_level_percent(), 25);
}

#[tokio::test]
async fn test_remote_media_and_network_updates() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    session.handle_event(join("mock-user2", "John Doe"));
    let john = ParticipantId::from("mock-user2");
    session.drain_outbox();

    session.handle_event(SessionEvent::ParticipantMediaChanged {
        participant_id: john.clone(),
        muted: Some(true),
        video_off: Some(true),
    });
    session.handle_event(SessionEvent::NetworkQualityChanged {
        participant_id: john.clone(),
        quality: Some(NetworkQuality::Medium),
    });

    let participant = session.participant(&john).unwrap();
    assert!(participant.muted);
    assert!(participant.is_video_off());
    assert_eq!(participant.network_bars(), 2);

    // Remote updates never reach the local participant
    session.handle_event(SessionEvent::ParticipantMediaChanged {
        participant_id: ParticipantId::local(),
        muted: Some(true),
        video_off: None,
    });
    assert!(!session.local_participant().unwrap().muted);

    let (_, events) = session.drain_outbox();
    assert_eq!(
        events,
        vec![
            AppEvent::ParticipantUpdated {
                participant_id: john.clone()
            },
            AppEvent::ParticipantUpdated {
                participant_id: john
            },
        ]
    );
}

#[tokio::test]
async fn test_leaving_clears_spotlight_and_updates_grid() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    for (id, name) in [
        ("mock-user1", "Jane Smith"),
        ("mock-user2", "John Doe"),
        ("mock-user3", "Alex Johnson"),
        ("mock-user4", "Sam Lee"),
    ] {
        session.handle_event(join(id, name));
    }
    assert_eq!(session.grid_layout().wide_columns, 3);

    let jane = ParticipantId::from("mock-user1");
    session.toggle_spotlight(&jane);
    session.drain_outbox();

    session.handle_event(SessionEvent::ParticipantLeft {
        participant_id: jane,
    });
    assert!(session.spotlighted().is_none());
    assert_eq!(session.participants().len(), 4);
    assert_eq!(session.grid_layout().wide_columns, 2);

    let (_, events) = session.drain_outbox();
    assert!(events.contains(&AppEvent::SpotlightChanged {
        participant_id: None
    }));
    assert!(events.contains(&AppEvent::RosterChanged {
        participant_count: 4
    }));
}

#[tokio::test]
async fn test_duplicate_join_updates_in_place() {
    let (mut session, _devices, _time) = create_test_session();
    session.initialize().await.unwrap();
    session.handle_event(join("mock-user1", "Jane Smith"));
    session.handle_event(SessionEvent::ParticipantJoined {
        participant: ParticipantInfo::new("mock-user1", "Jane S.").muted(),
    });
    session.handle_event(SessionEvent::ParticipantJoined {
        participant: ParticipantInfo::new(ParticipantId::local(), "Impostor"),
    });

    assert_eq!(session.participants().len(), 2);
    let jane = session
        .participant(&ParticipantId::from("mock-user1"))
        .unwrap();
    assert_eq!(jane.name, "Jane S.");
    assert!(jane.muted);
}

#[tokio::test]
async fn test_roster_events_ignored_before_initialize() {
    let (mut session, _devices, time) = create_test_session();
    session.handle_event(join("mock-user1", "Jane Smith"));
    assert!(session.participants().is_empty());

    time.advance(2_500);
    session.initialize().await.unwrap();
    assert_eq!(
        session.started_at().map(|t| t.as_millis()),
        Some(1_002_500)
    );
}
