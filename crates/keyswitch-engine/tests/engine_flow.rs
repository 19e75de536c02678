use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use config::{PinnedApp, Preferences};
use keyswitch_engine::{
    ChordInput, ChordState, Engine, MemorySink, MockAppOps, MockFocusBackend, MockWindows,
    PermissionChange, RecordingSurface, Rect, Status, Transition,
};

struct Harness {
    engine: Engine<RecordingSurface>,
    apps: MockAppOps,
    focus: MockFocusBackend,
    surface: RecordingSurface,
    sink: MemorySink,
}

fn harness(prefs: Preferences) -> Harness {
    let apps = MockAppOps::new();
    let focus = MockFocusBackend::new();
    let surface = RecordingSurface::new();
    let sink = MemorySink::new();
    let engine = Engine::new(
        prefs,
        Arc::new(apps.clone()),
        Arc::new(focus.clone()),
        Box::new(sink.clone()),
        surface.clone(),
    );
    Harness {
        engine,
        apps,
        focus,
        surface,
        sink,
    }
}

fn with_three_apps(prefs: Preferences) -> Harness {
    let h = harness(prefs);
    for (pid, id, name) in [(11, "com.a", "A"), (12, "com.b", "B"), (13, "com.c", "C")] {
        h.apps.add_running(pid, id, name);
        h.focus.set_windows(
            pid,
            MockWindows {
                focused: Some(0),
                main: Some(0),
                minimized: vec![false],
            },
        );
    }
    h
}

#[test]
fn press_select_focuses_records_and_hides_after_highlight() {
    let mut h = with_three_apps(Preferences::default());
    let t0 = Instant::now();
    assert_eq!(
        h.engine.handle_input(ChordInput::TriggerDown, t0),
        Transition::Engage
    );
    assert!(h.surface.is_visible());
    let frame = h.surface.last_frame().expect("frame");
    let keys: String = frame.items.iter().map(|i| i.key).collect();
    assert_eq!(keys, "123");

    let t1 = t0 + Duration::from_millis(120);
    assert!(matches!(
        h.engine.handle_input(ChordInput::Select(1), t1),
        Transition::Switch { index: 1, .. }
    ));
    assert_eq!(h.engine.chord_state(), ChordState::Idle);
    assert!(h.focus.calls_contains("raise:12:Focused"));
    assert!(h.focus.calls_contains("activate:12"));

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].bundle_id, "com.b");
    assert_eq!(records[0].key, '2');
    assert_eq!(records[0].response_ms, Some(120));

    assert_eq!(h.surface.last_frame().and_then(|f| f.highlighted), Some('2'));
    assert!(h.surface.is_visible());
    let deadline = h.engine.next_deadline().expect("pending hide");
    assert_eq!(deadline, t1 + Duration::from_millis(200));
    h.engine.tick(deadline);
    assert!(!h.surface.is_visible());
    assert!(!h.engine.overlay().session().visible);
}

#[test]
fn cancel_wins_over_late_selection() {
    for cancel in [ChordInput::TriggerUp, ChordInput::Escape] {
        let mut h = with_three_apps(Preferences::default());
        let t0 = Instant::now();
        h.engine.handle_input(ChordInput::TriggerDown, t0);
        assert_eq!(h.engine.handle_input(cancel, t0), Transition::Cancel);
        assert_eq!(
            h.engine.handle_input(ChordInput::Select(0), t0),
            Transition::Ignore
        );
        assert_eq!(h.engine.chord_state(), ChordState::Idle);
        assert!(!h.surface.is_visible());
        assert!(h.focus.calls().is_empty());
        assert!(h.sink.records().is_empty());
    }
}

#[test]
fn repeated_presses_keep_one_surface_and_unique_items() {
    let mut h = with_three_apps(Preferences::default());
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    h.engine
        .preferences_changed(Preferences::default(), t0 + Duration::from_millis(10));
    assert_eq!(h.surface.appearances(), 1);
    let frame = h.surface.last_frame().expect("frame");
    let mut ids: Vec<_> = frame.items.iter().map(|i| i.bundle_id.clone()).collect();
    ids.dedup();
    assert_eq!(ids.len(), frame.items.len());

    h.engine.handle_input(ChordInput::TriggerUp, t0);
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    assert_eq!(h.surface.appearances(), 2);
}

#[test]
fn empty_candidates_show_empty_overlay() {
    let mut h = harness(Preferences::default());
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    assert!(h.surface.is_visible());
    assert_eq!(h.surface.last_frame().map(|f| f.items.len()), Some(0));
    assert_eq!(
        h.engine.handle_input(ChordInput::Select(0), t0),
        Transition::Ignore
    );
    h.engine.handle_input(ChordInput::TriggerUp, t0);
    assert!(!h.surface.is_visible());
}

#[test]
fn selection_while_idle_changes_nothing() {
    let mut h = with_three_apps(Preferences::default());
    assert_eq!(
        h.engine.handle_input(ChordInput::Select(0), Instant::now()),
        Transition::Ignore
    );
    assert_eq!(h.surface.render_count(), 0);
    assert!(h.apps.calls().is_empty());
}

#[test]
fn unassigned_selection_keeps_overlay() {
    let mut h = with_three_apps(Preferences::default());
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    assert_eq!(
        h.engine.handle_input(ChordInput::Select(30), t0),
        Transition::Ignore
    );
    assert!(matches!(h.engine.chord_state(), ChordState::ChordHeld { .. }));
    assert!(h.surface.is_visible());
}

#[test]
fn refresh_is_throttled() {
    let mut h = with_three_apps(Preferences::default());
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    h.engine.handle_input(ChordInput::TriggerUp, t0);
    h.apps.add_running(14, "com.d", "D");
    let t1 = t0 + Duration::from_millis(500);
    h.engine.handle_input(ChordInput::TriggerDown, t1);
    assert_eq!(h.apps.call_count("running_apps"), 1);
    assert_eq!(h.engine.tracked().len(), 3);
    h.engine.handle_input(ChordInput::TriggerUp, t1);

    let t2 = t0 + Duration::from_millis(2100);
    h.engine.handle_input(ChordInput::TriggerDown, t2);
    assert_eq!(h.apps.call_count("running_apps"), 2);
    assert_eq!(h.engine.tracked().len(), 4);
}

#[test]
fn poll_patches_frames_and_drops_exited() {
    let mut h = with_three_apps(Preferences::default());
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    let frame = Rect {
        x: 10.0,
        y: 20.0,
        width: 300.0,
        height: 200.0,
    };
    h.apps.set_frame(11, frame);
    h.apps.terminate(12);
    h.engine.poll(t0);

    let tracked = h.engine.tracked();
    assert_eq!(tracked.len(), 2);
    assert_eq!(tracked[0].window_frame, Some(frame));
    assert_eq!(tracked[1].assigned_key, Some('3'), "poll does not renumber");
    let items = h.surface.last_frame().map(|f| f.items.len());
    assert_eq!(items, Some(2));
}

#[test]
fn launched_pin_is_activated_once_running() {
    let mut pin = PinnedApp::new("com.l", "Launchy");
    pin.always_show = true;
    let prefs = Preferences {
        pinned: vec![pin],
        ..Preferences::default()
    };
    let mut h = harness(prefs);
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    h.engine.handle_input(ChordInput::Select(0), t0);
    assert!(h.focus.calls_contains("launch:com.l"));
    assert_eq!(h.sink.records().len(), 1);

    h.engine.poll(t0 + Duration::from_millis(500));
    assert!(!h.focus.calls_contains("activate"));

    h.apps.add_running(77, "com.l", "Launchy");
    h.focus.set_windows(77, MockWindows::default());
    h.engine.poll(t0 + Duration::from_secs(1));
    assert!(h.focus.calls_contains("activate:77"));
}

#[test]
fn focus_failure_still_hides() {
    let mut h = harness(Preferences::default());
    h.apps.add_running(5, "com.gone", "Gone");
    h.focus.set_fail_reopen(true);
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    h.engine.handle_input(ChordInput::Select(0), t0);
    assert!(h.sink.records().is_empty());
    h.engine.tick(t0 + Duration::from_secs(1));
    assert!(!h.surface.is_visible());
    assert_eq!(h.engine.chord_state(), ChordState::Idle);
}

#[test]
fn permission_loss_disables_and_grant_reports() {
    let mut h = with_three_apps(Preferences::default());
    let t0 = Instant::now();
    h.engine.handle_input(ChordInput::TriggerDown, t0);
    let change = h.engine.permissions_checked(vec!["Accessibility"]);
    assert!(matches!(change, Some(PermissionChange::Revoked { .. })));
    assert_eq!(
        h.engine.status(),
        &Status::PermissionMissing {
            missing: vec!["Accessibility"]
        }
    );
    assert!(!h.surface.is_visible());
    assert_eq!(h.engine.chord_state(), ChordState::Idle);

    assert_eq!(h.engine.permissions_checked(vec!["Accessibility"]), None);
    assert_eq!(
        h.engine.permissions_checked(vec![]),
        Some(PermissionChange::Granted)
    );
    h.engine.tap_started();
    assert_eq!(h.engine.status(), &Status::Ready);
}

#[test]
fn tap_reenable_cancels_held_chord() {
    let mut h = with_three_apps(Preferences::default());
    assert!(!h.engine.tap_reenabled());
    h.engine.handle_input(ChordInput::TriggerDown, Instant::now());
    assert!(h.engine.tap_reenabled());
    assert!(!h.surface.is_visible());
    h.engine.tap_failed("no tap");
    assert_eq!(h.engine.status(), &Status::TapFailed("no tap".into()));
}

#[test]
fn preferences_change_reassigns() {
    let mut h = with_three_apps(Preferences::default());
    let t0 = Instant::now();
    h.engine.refresh(t0, false);
    let mut pin = PinnedApp::new("com.c", "C");
    pin.custom_shortcut = Some('q');
    let prefs = Preferences {
        pinned: vec![pin],
        max_apps: 2,
        ..Preferences::default()
    };
    h.engine.preferences_changed(prefs, t0);
    let got: Vec<_> = h
        .engine
        .tracked()
        .iter()
        .map(|a| (a.bundle_id.as_str(), a.assigned_key))
        .collect();
    assert_eq!(got, vec![("com.c", Some('q')), ("com.a", Some('1'))]);

    h.engine.reorder(&["com.a".to_string()]);
    let got: Vec<_> = h
        .engine
        .tracked()
        .iter()
        .map(|a| (a.bundle_id.as_str(), a.assigned_key))
        .collect();
    assert_eq!(got, vec![("com.a", Some('1')), ("com.c", Some('2'))]);
}

#[test]
fn clear_caches_resolves_metadata_again() {
    let mut pin = PinnedApp::new("com.x", "X");
    pin.always_show = true;
    let prefs = Preferences {
        pinned: vec![pin],
        ..Preferences::default()
    };
    let mut h = harness(prefs);
    h.apps.install("com.x", "/Applications/Old.app", "X");
    let t0 = Instant::now();
    h.engine.refresh(t0, true);
    let icon = |h: &Harness| h.engine.tracked()[0].icon.clone();
    assert_eq!(icon(&h).as_deref(), Some("/Applications/Old.app"));

    // Reinstalled elsewhere: the cached path survives a forced refresh.
    h.apps.install("com.x", "/Applications/New.app", "X");
    h.engine.refresh(t0, true);
    assert_eq!(icon(&h).as_deref(), Some("/Applications/Old.app"));
    assert_eq!(h.apps.call_count("bundle_path"), 1);

    h.engine.clear_caches();
    assert_eq!(h.surface.cache_clears(), 1);
    h.engine.refresh(t0, true);
    assert_eq!(icon(&h).as_deref(), Some("/Applications/New.app"));
    assert_eq!(h.apps.call_count("bundle_path"), 2);
}
