//! Configuration protocol: framing, commands, persistence and telemetry.

mod common;

use common::{lines, MemoryStore};
use onion_controller::config::{DEFAULT_KEYCODES, DEFAULT_THRESHOLD, NVS_KEY_KEYMAP, NVS_NAMESPACE};
use onion_controller::protocol::LINE_MAX;
use onion_controller::{
    Channel, ControllerState, FaultCode, Keymap, KeymapStore, ProtocolHandler,
};

fn ch(n: u8) -> Channel {
    Channel::new(n).unwrap()
}

/// Handler over a provisioned in-memory store.
fn handler(state: &ControllerState) -> (ProtocolHandler<'_, MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    let mut keymap_store = KeymapStore::new(store.clone());
    keymap_store.load(&state.keymap).unwrap();
    (ProtocolHandler::new(state, keymap_store), store)
}

#[test]
fn test_connect_dumps_config() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    proto.feed_bytes(b"CONNECT\n", &mut out);

    assert!(state.is_connected());
    let cfg = lines(&out);
    assert_eq!(cfg.len(), 16);
    for (i, line) in cfg.iter().enumerate() {
        assert_eq!(*line, format!("CFG:{},{},{}", i, DEFAULT_THRESHOLD, DEFAULT_KEYCODES[i]));
    }
}

#[test]
fn test_set_then_connect_reports_new_entry() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    proto.feed_bytes(b"SET:3,1800,4\nCONNECT\n", &mut out);

    assert_eq!(state.keymap.threshold(ch(3)), 1800);
    assert_eq!(state.keymap.keycode(ch(3)), 4);
    assert_eq!(lines(&out)[3], "CFG:3,1800,4");
    assert_eq!(lines(&out)[4], format!("CFG:4,{},{}", DEFAULT_THRESHOLD, DEFAULT_KEYCODES[4]));
}

#[test]
fn test_set_persists_immediately() {
    let state = ControllerState::new();
    let (mut proto, store) = handler(&state);
    let mut out = String::new();
    let writes_before = store.writes();

    proto.feed_bytes(b"SET:0,2000,41\r\n", &mut out);

    assert_eq!(store.writes(), writes_before + 1);
    assert!(out.is_empty(), "SET has no reply");

    let rebooted = Keymap::new();
    KeymapStore::new(store.clone()).load(&rebooted).unwrap();
    assert_eq!(rebooted.threshold(ch(0)), 2000);
    assert_eq!(rebooted.keycode(ch(0)), 41);
}

#[test]
fn test_set_out_of_range_channel_is_ignored() {
    let state = ControllerState::new();
    let (mut proto, store) = handler(&state);
    let mut out = String::new();
    let before = state.keymap.snapshot();
    let blob_before = store.blob(NVS_NAMESPACE, NVS_KEY_KEYMAP);

    proto.feed_bytes(b"SET:16,100,4\nSET:-1,100,4\nSET:255,100,4\n", &mut out);

    assert_eq!(state.keymap.snapshot(), before);
    assert_eq!(store.blob(NVS_NAMESPACE, NVS_KEY_KEYMAP), blob_before);
    assert_eq!(store.writes(), 1, "only the provisioning write");
}

#[test]
fn test_malformed_lines_are_ignored() {
    let state = ControllerState::new();
    let (mut proto, store) = handler(&state);
    let mut out = String::new();
    let before = state.keymap.snapshot();

    let junk: &[&[u8]] = &[
        b"HELLO\n",
        b"connect\n",
        b"CONNECT \n",
        b"SET:1,2\n",
        b"SET:1,2,3,4\n",
        b"SET:a,100,4\n",
        b"SET:1,70000,4\n",
        b"SET:1,100,256\n",
        b"SET:1,,4\n",
        b"SET:\xff,1,1\n",
    ];
    for line in junk {
        proto.feed_bytes(line, &mut out);
    }

    assert_eq!(state.keymap.snapshot(), before);
    assert!(!state.is_connected());
    assert!(out.is_empty());
    assert_eq!(store.writes(), 1);
}

#[test]
fn test_handler_recovers_after_junk() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    proto.feed_bytes(b"garbage\nSET:5,1500,9\n", &mut out);

    assert_eq!(state.keymap.threshold(ch(5)), 1500);
}

#[test]
fn test_crlf_and_blank_lines() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    proto.feed_bytes(b"\r\n\r\nCONNECT\r\n\n", &mut out);

    assert!(state.is_connected());
    assert_eq!(lines(&out).len(), 16, "one dump, blank lines ignored");
}

#[test]
fn test_command_split_across_ticks() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    proto.tick(b"SET:7,", &mut out);
    proto.tick(b"123", &mut out);
    assert_eq!(state.keymap.threshold(ch(7)), DEFAULT_THRESHOLD);

    proto.tick(b",5\n", &mut out);
    assert_eq!(state.keymap.threshold(ch(7)), 123);
    assert_eq!(state.keymap.keycode(ch(7)), 5);
}

#[test]
fn test_overflow_processes_line_and_drops_byte() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    let mut line = b"SET:1,100,5".to_vec();
    line.resize(LINE_MAX, b' ');
    proto.feed_bytes(&line, &mut out);
    assert_eq!(state.keymap.threshold(ch(1)), DEFAULT_THRESHOLD);

    // The overflowing byte completes the line and is discarded
    proto.feed_bytes(b"X", &mut out);
    assert_eq!(state.keymap.threshold(ch(1)), 100);
    assert_eq!(state.keymap.keycode(ch(1)), 5);

    proto.feed_bytes(b"CONNECT\n", &mut out);
    assert!(state.is_connected(), "buffer starts fresh after overflow");
}

#[test]
fn test_oversized_junk_does_not_execute() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    let long = vec![b'A'; 300];
    proto.feed_bytes(&long, &mut out);
    proto.feed_bytes(b"\n", &mut out);

    assert!(out.is_empty());
    assert!(!state.is_connected());
}

#[test]
fn test_telemetry_only_while_connected() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    state.raw.record(ch(0), 4095);
    state.raw.record(ch(15), 1200);

    let mut out = String::new();
    proto.tick(&[], &mut out);
    assert!(out.is_empty());

    proto.tick(b"CONNECT\n", &mut out);
    let all = lines(&out);
    assert_eq!(all.len(), 17);
    assert_eq!(all[16], "RAW:4095,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1200");

    out.clear();
    proto.tick(&[], &mut out);
    proto.tick(&[], &mut out);
    assert_eq!(lines(&out).len(), 2);
    assert!(lines(&out).iter().all(|l| l.starts_with("RAW:")));

    out.clear();
    proto.tick(b"DISCONNECT\n", &mut out);
    assert!(!state.is_connected());
    assert!(out.is_empty());
    proto.tick(&[], &mut out);
    assert!(out.is_empty());
}

#[test]
fn test_connect_twice_dumps_twice() {
    let state = ControllerState::new();
    let (mut proto, _) = handler(&state);
    let mut out = String::new();

    proto.feed_bytes(b"CONNECT\nCONNECT\n", &mut out);

    assert_eq!(lines(&out).len(), 32);
}

#[test]
fn test_save_failure_sets_fault_and_keeps_change() {
    let state = ControllerState::new();
    let (mut proto, store) = handler(&state);
    let mut out = String::new();

    store.inner().fail_write = Some(0x1105);
    proto.feed_bytes(b"SET:2,900,6\n", &mut out);

    assert_eq!(state.keymap.threshold(ch(2)), 900);
    assert!(state.faults.is_active());
    assert_eq!(state.faults.code(), FaultCode::StorageWrite);
    assert_eq!(state.faults.data(), 0x1105);

    // Next successful save clears it
    store.inner().fail_write = None;
    proto.feed_bytes(b"SET:2,901,6\n", &mut out);
    assert!(!state.faults.is_active());
}
