//! Debounce and throttle scheduling of scroll handling.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use vcontent_core::{ScrollOutcome, TimerId, VirtualContent, WindowMode};
use vcontent_sim::{advance, scroll};

use common::{config, document, mounted, mounted_with, throttled};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn debounce_waits_for_the_last_event() {
    let (host, _root, mut view) = mounted(WindowMode::Replace, 2, 10);

    assert_eq!(scroll(&mut view, &host, 100.0).unwrap(), ScrollOutcome::Deferred);
    assert!(advance(&mut view, &host, ms(50)).unwrap().is_empty());
    assert_eq!(scroll(&mut view, &host, 300.0).unwrap(), ScrollOutcome::Deferred);
    assert_eq!(host.pending_timers(), 1);

    // The first timer was cancelled; the second is due 100ms after t=50.
    assert!(advance(&mut view, &host, ms(60)).unwrap().is_empty());
    assert_eq!(view.visible(), vec![0, 1, 2, 3]);
    assert_eq!(
        advance(&mut view, &host, ms(40)).unwrap(),
        vec![ScrollOutcome::Updated]
    );
    assert_eq!(view.pointer(), 3);
}

#[test]
fn throttle_fires_on_the_leading_edge_and_trails() {
    let (host, _root, mut view) = mounted_with(throttled(WindowMode::Replace, true, true), 10);

    assert_eq!(scroll(&mut view, &host, 150.0).unwrap(), ScrollOutcome::Unchanged);
    assert_eq!(view.pointer(), 1);

    assert_eq!(scroll(&mut view, &host, 300.0).unwrap(), ScrollOutcome::Deferred);
    assert_eq!(scroll(&mut view, &host, 300.0).unwrap(), ScrollOutcome::Deferred);
    assert_eq!(host.pending_timers(), 1);

    assert_eq!(
        advance(&mut view, &host, ms(100)).unwrap(),
        vec![ScrollOutcome::Updated]
    );
    assert_eq!(view.visible(), vec![1, 2, 3, 4]);
}

#[test]
fn throttle_without_trailing_drops_inside_the_window() {
    let (host, _root, mut view) = mounted_with(throttled(WindowMode::Replace, true, false), 10);

    assert_eq!(scroll(&mut view, &host, 150.0).unwrap(), ScrollOutcome::Unchanged);
    assert_eq!(scroll(&mut view, &host, 300.0).unwrap(), ScrollOutcome::Dropped);
    assert_eq!(view.pending_timer(), None);
    assert_eq!(view.pointer(), 1);

    host.advance(ms(100));
    assert_eq!(scroll(&mut view, &host, 300.0).unwrap(), ScrollOutcome::Updated);
}

#[test]
fn throttle_without_leading_defers_the_first_event() {
    let (host, _root, mut view) = mounted_with(throttled(WindowMode::Append, false, true), 10);

    assert_eq!(scroll(&mut view, &host, 100.0).unwrap(), ScrollOutcome::Deferred);
    assert_eq!(
        advance(&mut view, &host, ms(100)).unwrap(),
        vec![ScrollOutcome::Updated]
    );
    assert_eq!(view.visible(), vec![0, 1, 2]);
}

#[test]
fn foreign_timers_are_ignored() {
    let (_host, _root, mut view) = mounted(WindowMode::Replace, 2, 10);
    assert_eq!(view.fire_timer(TimerId(999)).unwrap(), ScrollOutcome::Ignored);
}

#[test]
fn timers_of_one_instance_do_not_drive_another() {
    let (host, root, mut first) = mounted(WindowMode::Replace, 2, 10);
    let mut second = VirtualContent::create(host.clone(), config(WindowMode::Replace, 2));
    second
        .set_text(document(10))
        .unwrap()
        .render_to(root)
        .unwrap();

    scroll(&mut first, &host, 300.0).unwrap();
    let due = host.advance(ms(100));
    assert_eq!(due.len(), 1);
    assert_eq!(second.fire_timer(due[0]).unwrap(), ScrollOutcome::Ignored);
    assert_eq!(first.fire_timer(due[0]).unwrap(), ScrollOutcome::Updated);
}

#[test]
fn destroy_cancels_the_pending_timer() {
    let (host, _root, mut view) = mounted(WindowMode::Replace, 2, 10);
    scroll(&mut view, &host, 300.0).unwrap();
    assert_eq!(host.pending_timers(), 1);
    view.destroy().unwrap();
    assert_eq!(host.pending_timers(), 0);
}
