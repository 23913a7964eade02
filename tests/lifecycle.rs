mod common;

use std::time::Duration;

use common::{harness, harness_with};
use radiomenu::popup::{
    ChannelDisplay, ChannelRefreshScheduler, CommandDisposition, DisplayFrame, Menu, RegistryEvent,
    RegistrySettings, SendArgs, SessionRegistry, StaticDirectory, UserProfile,
};
use tokio::sync::mpsc;

#[test]
fn disconnect_forgets_everything() {
    let mut h = harness();
    let mut paged = Menu::paged("Teams");
    for team in ["T", "CT", "Spectator", "Auto", "a", "b", "c", "d"] {
        paged.add(team, team, true);
    }
    let paged = h.registry.create_menu(paged);
    h.registry.send(1, paged.into(), SendArgs::page(2)).unwrap();
    assert!(h.registry.is_active(1));

    h.registry.handle_event(RegistryEvent::UserDisconnected(1));
    assert!(h.registry.session(1).is_none());
    assert!(!h.registry.is_active(1));
    assert_eq!(h.registry.page_of(1, paged), None);

    // A reconnecting user starts from scratch
    h.registry.handle_event(RegistryEvent::UserConnected(1));
    assert!(h.registry.session(1).is_some());
    h.registry.send(1, paged.into(), SendArgs::default()).unwrap();
    assert_eq!(h.registry.page_of(1, paged), Some(1));
}

#[test]
fn world_reset_empties_queues_but_keeps_sessions() {
    let mut h = harness();
    let a = h.registry.create_menu(Menu::plain().with_lines(["A"]));
    let b = h.registry.create_menu(Menu::plain().with_lines(["B"]));
    h.registry.send(1, a.into(), SendArgs::default()).unwrap();
    h.registry.send(1, b.into(), SendArgs::default()).unwrap();
    h.registry.send(2, b.into(), SendArgs::default()).unwrap();

    h.registry.handle_event(RegistryEvent::WorldReset);
    assert!(h.registry.queue_of(1).is_empty());
    assert!(h.registry.queue_of(2).is_empty());
    assert_eq!(h.registry.active_users().count(), 0);
    assert!(h.registry.session(1).is_some());
    assert!(h.registry.session(1).unwrap().view(a).is_some());

    // Input after a reset is no longer ours
    assert_eq!(
        h.registry.filter_command(1, &["menuselect", "1"]),
        CommandDisposition::PassThrough
    );
}

#[test]
fn commands_route_through_events() {
    let mut h = harness();
    let a = h.registry.create_menu(Menu::plain().with_lines(["A"]));
    h.registry.send(1, a.into(), SendArgs::default()).unwrap();
    let disposition = h.registry.handle_event(RegistryEvent::Command {
        user: 1,
        args: vec!["MenuSelect".into(), "4".into()],
    });
    assert_eq!(disposition, CommandDisposition::Consumed);
    assert!(h.registry.queue_of(1).is_empty());
}

#[test]
fn automated_users_are_skipped() {
    let mut h = harness();
    h.users.insert(
        77,
        UserProfile {
            language: None,
            automated: true,
        },
    );
    let a = h.registry.create_menu(Menu::plain().with_lines(["A"]));
    assert!(h.registry.send(77, a.into(), SendArgs::default()).is_ok());
    assert!(h.registry.queue_of(77).is_empty());
    assert!(!h.registry.is_active(77));
    assert!(h.drain().is_empty());
}

#[test]
fn accepted_keys_come_from_settings_unless_set() {
    let settings = RegistrySettings {
        accepted_keys: "1230".parse().unwrap(),
        ..Default::default()
    };
    let mut h = harness_with(settings);
    let a = h.registry.create_menu(Menu::plain().with_lines(["A"]));
    let mut custom = Menu::plain().with_lines(["B"]);
    custom.accepted_keys = "12".parse().unwrap();
    let b = h.registry.create_menu(custom);

    h.registry.send(1, a.into(), SendArgs::default()).unwrap();
    h.registry.send(2, b.into(), SendArgs::default()).unwrap();
    let keys: Vec<(u32, String)> = h
        .drain()
        .into_iter()
        .filter_map(|f| match f {
            DisplayFrame::Render { user, keys, .. } => Some((user, keys)),
            DisplayFrame::Close { .. } => None,
        })
        .collect();
    assert_eq!(keys, vec![(1, "0123".to_string()), (2, "12".to_string())]);
}

#[tokio::test]
async fn refresh_timer_redisplays_until_queue_empties() {
    let (display, mut frames) = ChannelDisplay::channel();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let settings = RegistrySettings {
        refresh_interval: Duration::from_millis(20),
        ..Default::default()
    };
    let users = StaticDirectory::accept_all(UserProfile::default());
    let mut registry = SessionRegistry::new(settings, display, users)
        .with_scheduler(ChannelRefreshScheduler::new(events_tx));
    let a = registry.create_menu(Menu::plain().with_lines(["hold"]));
    registry.send(1, a.into(), SendArgs::default()).unwrap();
    // A second display before the timer fires must not arm a second timer
    registry.send(1, a.into(), SendArgs::default()).unwrap();
    assert!(frames.try_recv().is_ok());
    assert!(frames.try_recv().is_ok());

    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("refresh timer did not fire")
        .expect("event channel closed");
    assert_eq!(event, RegistryEvent::RefreshDue(1));
    registry.handle_event(event);
    assert_eq!(
        frames.try_recv().ok().map(|f| f.user()),
        Some(1),
        "timer should re-display the head"
    );
    assert_eq!(registry.session(1).unwrap().queue(), &[a]);

    registry.got_response(1, 1);
    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("re-armed timer did not fire")
        .expect("event channel closed");
    registry.handle_event(event);
    assert!(frames.try_recv().is_err());

    // Nothing queued, so nothing re-armed
    let quiet = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
    assert!(quiet.is_err());
}
