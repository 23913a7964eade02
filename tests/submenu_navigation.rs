mod common;

use common::{harness, Recorder};
use radiomenu::popup::{Menu, MenuId, SendArgs, SendResult};

struct Tree {
    main: MenuId,
    weapons: MenuId,
    rifles: MenuId,
}

/// main -> weapons -> rifles, each opened by key 1 through `ReplaceWith`.
fn tree(h: &mut common::Harness, rec: &Recorder) -> Tree {
    let mut rifles = Menu::paged("Rifles");
    rifles.add("ak47", "AK-47", true);
    rifles.add("m4a1", "M4A1", true);
    let rifles = h.registry.create_menu(rifles.with_callback({
        let rec = rec.clone();
        move |_, params| {
            rec.record(params);
            Ok(SendResult::Advance)
        }
    }));

    let mut weapons = Menu::paged("Weapons");
    weapons.add("rifles", "Rifles", true);
    weapons.add("main", "Back to main", true);
    let weapons = h.registry.create_menu(weapons);

    let main = h
        .registry
        .create_menu(Menu::plain().with_lines(["Main", "1. Weapons"]));
    h.registry
        .menu_mut(main)
        .unwrap()
        .set_callback(move |_, _| Ok(SendResult::ReplaceWith(weapons.into())));
    h.registry
        .menu_mut(weapons)
        .unwrap()
        .set_callback(move |_, params| match params.choice.as_str() {
            Some("rifles") => Ok(SendResult::ReplaceWith(rifles.into())),
            _ => Ok(SendResult::ReplaceWith(main.into())),
        });
    Tree {
        main,
        weapons,
        rifles,
    }
}

#[test]
fn submenu_replaces_head_and_remembers_parent() {
    let mut h = harness();
    let rec = Recorder::default();
    let t = tree(&mut h, &rec);
    h.registry.send(1, t.main.into(), SendArgs::default()).unwrap();

    h.registry.got_response(1, 1);
    assert_eq!(h.registry.queue_of(1), vec![t.weapons]);
    assert_eq!(h.registry.session(1).unwrap().history(), &[t.main]);
    assert!(h.last_text(1).unwrap().starts_with("Weapons"));

    h.registry.got_response(1, 1);
    assert_eq!(h.registry.queue_of(1), vec![t.rifles]);
    assert_eq!(h.registry.session(1).unwrap().history(), &[t.main, t.weapons]);
}

#[test]
fn back_key_walks_history_in_reverse() {
    let mut h = harness();
    let rec = Recorder::default();
    let t = tree(&mut h, &rec);
    h.registry.send(1, t.main.into(), SendArgs::default()).unwrap();
    h.registry.got_response(1, 1);
    h.registry.got_response(1, 1);

    h.registry.got_response(1, 10);
    assert_eq!(h.registry.queue_of(1), vec![t.weapons]);
    assert_eq!(h.registry.session(1).unwrap().history(), &[t.main]);

    h.registry.got_response(1, 10);
    assert_eq!(h.registry.queue_of(1), vec![t.main]);
    assert!(h.registry.session(1).unwrap().history().is_empty());
    assert!(h.last_text(1).unwrap().starts_with("Main"));
}

#[test]
fn callback_sees_previous_menu() {
    let mut h = harness();
    let rec = Recorder::default();
    let t = tree(&mut h, &rec);
    h.registry.send(1, t.main.into(), SendArgs::default()).unwrap();
    h.registry.got_response(1, 1);
    h.registry.got_response(1, 1);

    h.registry.got_response(1, 2);
    let calls = rec.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].choice, "m4a1");
    assert_eq!(calls[0].previous, Some(t.weapons));
    assert!(h.registry.queue_of(1).is_empty());
    assert!(!h.registry.is_active(1));
}

#[test]
fn replacing_with_history_top_does_not_grow_history() {
    let mut h = harness();
    let rec = Recorder::default();
    let t = tree(&mut h, &rec);
    h.registry.send(1, t.main.into(), SendArgs::default()).unwrap();
    h.registry.got_response(1, 1);

    // "Back to main" from weapons explicitly returns to the parent
    h.registry.got_response(1, 2);
    assert_eq!(h.registry.queue_of(1), vec![t.main]);
    assert!(h.registry.session(1).unwrap().history().is_empty());
}

#[test]
fn submenu_keeps_later_queue_entries() {
    let mut h = harness();
    let rec = Recorder::default();
    let t = tree(&mut h, &rec);
    let notice = h.registry.create_menu(Menu::plain().with_lines(["Round starts"]));
    h.registry.send(1, t.main.into(), SendArgs::default()).unwrap();
    h.registry.send(1, notice.into(), SendArgs::default()).unwrap();

    h.registry.got_response(1, 1);
    assert_eq!(h.registry.queue_of(1), vec![t.weapons, notice]);

    h.registry.got_response(1, 10);
    assert_eq!(h.registry.queue_of(1), vec![t.main, notice]);
}

#[test]
fn submenu_already_queued_is_moved_not_copied() {
    let mut h = harness();
    let rec = Recorder::default();
    let t = tree(&mut h, &rec);
    h.registry.send(1, t.main.into(), SendArgs::default()).unwrap();
    h.registry.send(1, t.weapons.into(), SendArgs::default()).unwrap();

    h.registry.got_response(1, 1);
    assert_eq!(h.registry.queue_of(1), vec![t.weapons]);
}
