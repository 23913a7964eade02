mod common;

use common::{harness, Recorder};
use radiomenu::metrics;
use radiomenu::popup::view::NO_CONTENT_LINE;
use radiomenu::popup::{DisplayFrame, Menu, SendArgs, SendResult};
use serde_json::json;

#[test]
fn failing_callback_advances() {
    let mut h = harness();
    let broken = h.registry.create_menu(
        Menu::plain()
            .with_lines(["broken"])
            .with_callback(|_, _| Err(anyhow::anyhow!("database unavailable"))),
    );
    let next = h.registry.create_menu(Menu::plain().with_lines(["next"]));
    h.registry.send(1, broken.into(), SendArgs::default()).unwrap();
    h.registry.send(1, next.into(), SendArgs::default()).unwrap();

    let before = metrics::snapshot().callback_failures;
    h.registry.got_response(1, 1);
    assert!(metrics::snapshot().callback_failures > before);
    assert_eq!(h.registry.queue_of(1), vec![next]);
    assert_eq!(h.last_text(1).as_deref(), Some("next"));
}

#[test]
fn dangling_submenu_is_treated_as_advance() {
    let mut h = harness();
    let gone = h.registry.create_menu(Menu::plain().with_lines(["gone"]));
    h.registry.remove_menu(gone);
    let parent = h.registry.create_menu(
        Menu::plain()
            .with_lines(["parent"])
            .with_callback(move |_, _| Ok(SendResult::ReplaceWith(gone.into()))),
    );
    h.registry.send(1, parent.into(), SendArgs::default()).unwrap();

    let before = metrics::snapshot().malformed_returns;
    h.registry.got_response(1, 1);
    assert!(metrics::snapshot().malformed_returns > before);
    assert!(h.registry.queue_of(1).is_empty());
    assert!(h.registry.session(1).unwrap().history().is_empty());
}

#[test]
fn chain_queues_after_waiting_menus() {
    let mut h = harness();
    let chained = h.registry.create_menu(Menu::plain().with_lines(["chained"]));
    let waiting = h.registry.create_menu(Menu::plain().with_lines(["waiting"]));
    let first = h.registry.create_menu(
        Menu::plain()
            .with_lines(["first"])
            .with_callback(move |_, _| Ok(SendResult::Chain(chained.into()))),
    );
    h.registry.send(1, first.into(), SendArgs::default()).unwrap();
    h.registry.send(1, waiting.into(), SendArgs::default()).unwrap();
    h.drain();

    h.registry.got_response(1, 1);
    assert_eq!(h.registry.queue_of(1), vec![waiting, chained]);
    // One display for the new head, none from inside the callback
    let frames = h.drain();
    assert_eq!(frames.len(), 1);
    assert!(matches!(&frames[0], DisplayFrame::Render { text, .. } if text == "waiting"));
}

#[test]
fn sends_from_callbacks_are_not_displayed_mid_response() {
    let mut h = harness();
    let reward = h.registry.create_menu(Menu::plain().with_lines(["reward"]));
    let other = h.registry.create_menu(Menu::plain().with_lines(["other user"]));
    let quiz = h.registry.create_menu(Menu::plain().with_lines(["quiz"]).with_callback(
        move |reg, params| {
            reg.send(params.user, reward.into(), SendArgs::default())?;
            // Other users are not routing a response and see their menu at once
            reg.send(params.user + 1, other.into(), SendArgs::default())?;
            Ok(SendResult::Advance)
        },
    ));
    h.registry.send(1, quiz.into(), SendArgs::default()).unwrap();
    h.drain();

    h.registry.got_response(1, 1);
    let frames = h.drain();
    assert_eq!(
        frames
            .iter()
            .map(|f| (f.user(), matches!(f, DisplayFrame::Render { .. })))
            .collect::<Vec<_>>(),
        vec![(2, true), (1, true)]
    );
    assert_eq!(h.registry.queue_of(1), vec![reward]);
}

#[test]
fn callback_can_unsend_other_menus() {
    let mut h = harness();
    let later = h.registry.create_menu(Menu::plain().with_lines(["later"]));
    let last = h.registry.create_menu(Menu::plain().with_lines(["last"]));
    let skip = h.registry.create_menu(Menu::plain().with_lines(["skip"]).with_callback(
        move |reg, params| {
            reg.unsend(params.user, later.into())?;
            Ok(SendResult::Advance)
        },
    ));
    for id in [skip, later, last] {
        h.registry.send(1, id.into(), SendArgs::default()).unwrap();
    }
    h.registry.got_response(1, 1);
    assert_eq!(h.registry.queue_of(1), vec![last]);
}

#[test]
fn response_args_reach_callback() {
    let mut h = harness();
    let rec = Recorder::default();
    let cb = rec.clone();
    let menu = h.registry.create_menu(
        Menu::plain()
            .with_lines(["kick player?"])
            .with_response_arg("target", 42)
            .with_callback(move |_, params| {
                cb.record(params);
                Ok(SendResult::Advance)
            }),
    );
    h.registry.send(1, menu.into(), SendArgs::default()).unwrap();
    h.registry.got_response(1, 3);

    let calls = rec.calls();
    assert_eq!(calls[0].choice, json!(3));
    assert_eq!(calls[0].get("target"), Some(&json!(42)));
    assert_eq!(calls[0].user, 1);
    assert_eq!(calls[0].previous, None);
}

#[test]
fn template_menu_fills_values_per_send() {
    let mut h = harness();
    let welcome = h
        .registry
        .create_menu(Menu::template().with_lines(["Welcome $name", "Costs $$${price}"]));
    h.registry
        .send(
            1,
            welcome.into(),
            SendArgs::default().with("name", "ann").with("price", "5"),
        )
        .unwrap();
    assert_eq!(h.last_text(1).as_deref(), Some("Welcome ann\nCosts $5"));

    h.registry
        .send(2, welcome.into(), SendArgs::default().with("name", "bo"))
        .unwrap();
    // Missing values stay visible as placeholders
    assert_eq!(h.last_text(2).as_deref(), Some("Welcome bo\nCosts $${price}"));
}

#[test]
fn callback_menu_rebuilds_for_each_user() {
    let mut h = harness();
    let score = h.registry.create_menu(
        Menu::built(|ctx, content| {
            content.push_line(format!("score of {}: {}", ctx.user, ctx.user * 10));
            Ok(())
        })
        .with_lines(["Scoreboard"]),
    );
    h.registry.send(3, score.into(), SendArgs::default()).unwrap();
    assert_eq!(
        h.last_text(3).as_deref(),
        Some("Scoreboard\nscore of 3: 30")
    );
    h.registry.send(4, score.into(), SendArgs::default()).unwrap();
    assert_eq!(
        h.last_text(4).as_deref(),
        Some("Scoreboard\nscore of 4: 40")
    );
}

#[test]
fn failing_builder_shows_error_line() {
    let mut h = harness();
    let broken = h
        .registry
        .create_menu(Menu::built(|_, _| Err(anyhow::anyhow!("no data"))));
    h.registry.send(1, broken.into(), SendArgs::default()).unwrap();
    assert_eq!(h.last_text(1).as_deref(), Some(NO_CONTENT_LINE));
}

#[test]
fn callback_paged_menu_uses_view_content() {
    let mut h = harness();
    let rec = Recorder::default();
    let cb = rec.clone();
    let inventory = h.registry.create_menu(
        Menu::built_paged("Inventory", |ctx, content| {
            for i in 0..ctx.user {
                content.add(i, format!("item {}", i), true);
            }
            content.response_args.insert("owner".into(), json!(ctx.user));
            Ok(())
        })
        .with_callback(move |_, params| {
            cb.record(params);
            Ok(SendResult::Advance)
        }),
    );
    // Nine items for user 9 make two pages
    assert!(h.registry.send(9, inventory.into(), SendArgs::page(2)).is_ok());
    let text = h.last_text(9).unwrap();
    assert!(text.contains("(2/2)"));
    assert!(text.contains("->2. item 8"));

    h.registry.got_response(9, 2);
    let calls = rec.calls();
    assert_eq!(calls[0].choice, json!(8));
    assert_eq!(calls[0].get("owner"), Some(&json!(9)));

    // One item for user 1: page 2 does not exist for them
    assert!(h.registry.send(1, inventory.into(), SendArgs::page(2)).is_err());
}

#[test]
fn callback_retracting_its_own_menu_shows_the_next() {
    let mut h = harness();
    let later = h.registry.create_menu(Menu::plain().with_lines(["later"]));
    let first = h.registry.create_menu(Menu::plain().with_lines(["first"]).with_callback(
        |reg, params| {
            reg.unsend(params.user, params.menu.into())?;
            Ok(SendResult::Advance)
        },
    ));
    h.registry.send(1, first.into(), SendArgs::default()).unwrap();
    h.registry.send(1, later.into(), SendArgs::default()).unwrap();
    h.drain();

    h.registry.got_response(1, 1);
    assert_eq!(h.registry.queue_of(1), vec![later]);
    assert_eq!(h.last_text(1).as_deref(), Some("later"));

    // Alone in the queue it closes exactly once
    h.registry.send(2, first.into(), SendArgs::default()).unwrap();
    h.drain();
    h.registry.got_response(2, 1);
    assert_eq!(h.drain(), vec![DisplayFrame::Close { user: 2 }]);
    assert!(!h.registry.is_active(2));
}
