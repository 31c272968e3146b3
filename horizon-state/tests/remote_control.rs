//! Guarded remote-control operations

mod common;

use common::*;
use horizon_state::{ConnectivityState, StateError};
use horizon_stream::PushError;
use rstest::rstest;
use serde_json::json;

fn paused_harness() -> Harness {
    let harness = Harness::new(catalog(&[("NL_1", "NPO")])).running();
    harness
        .metadata
        .with_event("E1", json!({ "channelId": "NL_1", "title": "Journaal" }));
    harness.feed(linear(1, "NL_1", "E1", 0));
    harness.sink.clear();
    harness
}

#[test]
fn test_pause_while_paused_is_skipped() {
    let harness = paused_harness();
    assert!(harness.settop_box.snapshot().paused);

    harness.settop_box.pause().unwrap();

    assert!(harness.sink.frames().is_empty());
}

#[test]
fn test_pause_while_playing_sends_one_key() {
    let harness = paused_harness();
    harness.feed(linear(2, "NL_1", "E1", 1));
    harness.sink.clear();

    harness.settop_box.pause().unwrap();

    let frames = harness.sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind(), Some("CPE.KeyEvent"));
    assert_eq!(frames[0].payload["status"]["w3cKey"], "MediaPlayPause");
    assert_eq!(frames[0].topic, format!("hh/{DEVICE}"));
}

#[test]
fn test_play_only_when_paused() {
    let harness = paused_harness();
    harness.settop_box.play().unwrap();
    assert_eq!(harness.sink.frames().len(), 1);

    harness.feed(linear(2, "NL_1", "E1", 1));
    harness.sink.clear();
    harness.settop_box.play().unwrap();
    assert!(harness.sink.frames().is_empty());
}

#[rstest]
#[case::stop("MediaStop")]
#[case::next("ChannelUp")]
#[case::previous("ChannelDown")]
#[case::enter("Enter")]
#[case::rewind("MediaRewind")]
#[case::fast_forward("MediaFastForward")]
#[case::record("MediaRecord")]
fn test_running_keys(#[case] key: &str) {
    let run = |harness: &Harness| match key {
        "MediaStop" => harness.settop_box.stop(),
        "ChannelUp" => harness.settop_box.next_channel(),
        "ChannelDown" => harness.settop_box.previous_channel(),
        "Enter" => harness.settop_box.enter(),
        "MediaRewind" => harness.settop_box.rewind(),
        "MediaFastForward" => harness.settop_box.fast_forward(),
        _ => harness.settop_box.record(),
    };

    let idle = Harness::new(catalog(&[]));
    run(&idle).unwrap();
    assert!(idle.sink.frames().is_empty());

    let running = Harness::new(catalog(&[])).running();
    run(&running).unwrap();
    let frames = running.sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload["status"]["w3cKey"], key);
}

#[test]
fn test_turn_on_only_from_standby() {
    let harness = Harness::new(catalog(&[])).running();
    harness.settop_box.turn_on().unwrap();
    assert!(harness.sink.frames().is_empty());

    harness.feed(device_state("ONLINE_STANDBY"));
    harness.settop_box.turn_on().unwrap();
    let frames = harness.sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload["status"]["w3cKey"], "Power");
}

#[test]
fn test_turn_off_resets_snapshot() {
    let harness = paused_harness();
    harness.drain_changes();

    harness.settop_box.turn_off().unwrap();

    assert_eq!(harness.sink.frames().len(), 1);
    assert!(harness.settop_box.snapshot().is_empty());
    assert_eq!(harness.settop_box.connectivity(), ConnectivityState::Running);
    assert_eq!(harness.drain_changes().len(), 1);
}

#[test]
fn test_set_channel_picks_first_exact_match() {
    let harness = Harness::new(catalog(&[("NL_1", "Sport"), ("NL_2", "sport"), ("NL_3", "Sport")])).running();

    harness.settop_box.set_channel("Sport").unwrap();

    let frames = harness.sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind(), Some("CPE.pushToTV"));
    assert_eq!(frames[0].payload["status"]["source"]["channelId"], "NL_1");
}

#[test]
fn test_set_channel_without_match() {
    let harness = Harness::new(catalog(&[("NL_1", "Sport")])).running();

    let result = harness.settop_box.set_channel("SPORT");

    assert_eq!(result, Err(StateError::ChannelNotFound("SPORT".to_string())));
    assert!(harness.sink.frames().is_empty());
}

#[test]
fn test_play_recording() {
    let harness = Harness::new(catalog(&[])).running();

    harness.settop_box.play_recording("rec-1").unwrap();

    let frames = harness.sink.frames();
    assert_eq!(frames[0].payload["status"]["sourceType"], "nDVR");
    assert_eq!(frames[0].payload["status"]["source"]["recordingId"], "rec-1");
}

#[test]
fn test_correlation_ids_differ() {
    let harness = Harness::new(catalog(&[])).running();

    harness.settop_box.stop().unwrap();
    harness.settop_box.stop().unwrap();

    let frames = harness.sink.frames();
    assert_ne!(frames[0].id(), frames[1].id());
}

#[test]
fn test_publish_failure_is_returned() {
    let harness = Harness::new(catalog(&[])).running();
    harness.sink.set_connected(false);

    assert_eq!(
        harness.settop_box.stop(),
        Err(StateError::Push(PushError::NotConnected))
    );
}

#[test]
fn test_announce_presence() {
    let harness = Harness::new(catalog(&[]));

    harness.settop_box.announce_presence().unwrap();

    let frames = harness.sink.frames();
    assert_eq!(frames[0].topic, "hh/client0001/status");
    assert_eq!(frames[0].payload["deviceType"], "HGO");
}
