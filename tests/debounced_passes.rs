mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use docxide_reflow::passes::{Clock, DebouncedPass, DebouncedPassManager, ManualClock, PassInfo};

const DELAY: Duration = Duration::from_millis(100);

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

fn counting_pass(id: &str, delay: Duration, priority: i32, calls: &Rc<Cell<u32>>) -> DebouncedPass {
    let calls = Rc::clone(calls);
    DebouncedPass::new(id, delay, priority, move || {
        calls.set(calls.get() + 1);
        Ok(())
    })
}

fn recording_pass(id: &str, priority: i32, log: &Rc<RefCell<Vec<String>>>) -> DebouncedPass {
    let log = Rc::clone(log);
    let name = id.to_string();
    DebouncedPass::new(id, DELAY, priority, move || {
        log.borrow_mut().push(name.clone());
        Ok(())
    })
}

fn manager() -> (DebouncedPassManager<ManualClock>, ManualClock) {
    common::init_logging();
    let clock = ManualClock::new();
    (DebouncedPassManager::with_clock(clock.clone()), clock)
}

#[test]
fn runs_once_after_exactly_the_delay() {
    let (mut passes, clock) = manager();
    let calls = counter();
    passes.register(counting_pass("headers", DELAY, 0, &calls));
    passes.trigger("headers");

    clock.advance(DELAY - Duration::from_millis(1));
    assert_eq!(passes.poll(), 0);
    assert_eq!(calls.get(), 0);
    assert!(passes.is_pending("headers"));

    clock.advance(Duration::from_millis(1));
    assert_eq!(passes.poll(), 1);
    assert_eq!(calls.get(), 1);
    assert!(!passes.is_pending("headers"));

    clock.advance(DELAY * 5);
    assert_eq!(passes.poll(), 0);
    assert_eq!(calls.get(), 1);
}

#[test]
fn retrigger_resets_the_timer() {
    let (mut passes, clock) = manager();
    let calls = counter();
    passes.register(counting_pass("lists", DELAY, 0, &calls));

    passes.trigger("lists");
    clock.advance(DELAY / 2);
    passes.poll();
    passes.trigger("lists");
    clock.advance(DELAY / 2);
    passes.poll();
    assert_eq!(calls.get(), 0);

    clock.advance(DELAY / 2);
    passes.poll();
    assert_eq!(calls.get(), 1);
}

#[test]
fn zero_delay_runs_on_the_next_poll() {
    let (mut passes, _clock) = manager();
    let calls = counter();
    passes.register(counting_pass("now", Duration::ZERO, 0, &calls));
    passes.trigger("now");
    assert!(passes.next_deadline().is_some());
    assert_eq!(passes.poll(), 1);
    assert_eq!(calls.get(), 1);
}

#[test]
fn flush_all_runs_by_descending_priority() {
    let (mut passes, _clock) = manager();
    let log = Rc::new(RefCell::new(Vec::new()));
    passes.register(recording_pass("low", 1, &log));
    passes.register(recording_pass("high", 10, &log));
    passes.register(recording_pass("mid", 5, &log));
    for id in ["low", "high", "mid"] {
        passes.trigger(id);
    }
    assert_eq!(passes.pending_count(), 3);

    passes.flush_all();
    assert_eq!(*log.borrow(), ["high", "mid", "low"]);
    assert_eq!(passes.pending_count(), 0);
}

#[test]
fn priority_ties_keep_registration_order() {
    let (mut passes, _clock) = manager();
    let log = Rc::new(RefCell::new(Vec::new()));
    for id in ["b", "a", "c"] {
        passes.register(recording_pass(id, 3, &log));
        passes.trigger(id);
    }
    passes.flush_all();
    assert_eq!(*log.borrow(), ["b", "a", "c"]);
}

#[test]
fn flush_all_skips_passes_that_are_not_pending() {
    let (mut passes, _clock) = manager();
    let log = Rc::new(RefCell::new(Vec::new()));
    passes.register(recording_pass("armed", 0, &log));
    passes.register(recording_pass("idle", 9, &log));
    passes.trigger("armed");
    passes.flush_all();
    assert_eq!(*log.borrow(), ["armed"]);
}

#[test]
fn cancel_prevents_execution() {
    let (mut passes, clock) = manager();
    let calls = counter();
    passes.register(counting_pass("p", DELAY, 0, &calls));
    passes.trigger("p");
    passes.cancel("p");
    assert!(!passes.is_pending("p"));
    clock.advance(DELAY * 2);
    assert_eq!(passes.poll(), 0);
    assert_eq!(calls.get(), 0);
    // Still registered, so it can be armed again.
    passes.trigger("p");
    clock.advance(DELAY);
    passes.poll();
    assert_eq!(calls.get(), 1);
}

#[test]
fn cancel_all_disarms_every_pass() {
    let (mut passes, clock) = manager();
    let calls = counter();
    passes.register(counting_pass("a", DELAY, 0, &calls));
    passes.register(counting_pass("b", DELAY * 2, 0, &calls));
    passes.trigger("a");
    passes.trigger("b");
    passes.cancel_all();
    assert_eq!(passes.pending_count(), 0);
    assert_eq!(passes.next_deadline(), None);
    clock.advance(DELAY * 3);
    passes.poll();
    assert_eq!(calls.get(), 0);
    assert_eq!(passes.registered_passes().len(), 2);
}

#[test]
fn unregister_drops_a_pending_pass() {
    let (mut passes, clock) = manager();
    let calls = counter();
    passes.register(counting_pass("p", DELAY, 0, &calls));
    passes.trigger("p");
    assert!(passes.unregister("p"));
    assert!(!passes.unregister("p"));
    assert_eq!(passes.get_pass("p"), None);
    clock.advance(DELAY);
    passes.poll();
    passes.trigger("p");
    passes.flush("p");
    assert_eq!(calls.get(), 0);
}

#[test]
fn flush_runs_immediately_only_when_pending() {
    let (mut passes, clock) = manager();
    let calls = counter();
    passes.register(counting_pass("p", DELAY, 0, &calls));

    passes.flush("p");
    assert_eq!(calls.get(), 0);

    passes.trigger("p");
    passes.flush("p");
    assert_eq!(calls.get(), 1);
    assert!(!passes.is_pending("p"));

    clock.advance(DELAY);
    passes.poll();
    assert_eq!(calls.get(), 1);

    passes.flush("unknown");
}

#[test]
fn unknown_ids_are_ignored() {
    let (mut passes, _clock) = manager();
    passes.trigger("missing");
    passes.cancel("missing");
    assert!(!passes.is_pending("missing"));
    assert_eq!(passes.pending_count(), 0);
}

#[test]
fn failing_pass_clears_pending_and_spares_the_others() {
    let (mut passes, clock) = manager();
    let calls = counter();
    passes.register(DebouncedPass::new("fails", DELAY, 10, || Err("boom".into())));
    passes.register(DebouncedPass::new("panics", DELAY, 5, || panic!("pass blew up")));
    passes.register(counting_pass("works", DELAY, 1, &calls));
    for id in ["fails", "panics", "works"] {
        passes.trigger(id);
    }

    clock.advance(DELAY);
    assert_eq!(passes.poll(), 3);
    assert_eq!(calls.get(), 1);
    assert_eq!(passes.pending_count(), 0);
}

#[test]
fn re_registering_replaces_the_pass_and_its_timer() {
    let (mut passes, clock) = manager();
    let old_calls = counter();
    let new_calls = counter();
    passes.register(counting_pass("p", DELAY, 0, &old_calls));
    passes.trigger("p");
    passes.register(counting_pass("p", DELAY * 2, 7, &new_calls));
    assert!(!passes.is_pending("p"));
    assert_eq!(
        passes.get_pass("p"),
        Some(PassInfo {
            id: "p".into(),
            delay: DELAY * 2,
            priority: 7,
        })
    );

    clock.advance(DELAY * 3);
    passes.poll();
    assert_eq!(old_calls.get(), 0);
    assert_eq!(new_calls.get(), 0);
    assert_eq!(passes.registered_passes().len(), 1);
}

#[test]
fn empty_id_and_negative_delay_are_rejected() {
    let (mut passes, _clock) = manager();
    let calls = counter();
    passes.register(counting_pass("", DELAY, 0, &calls));
    assert!(passes.registered_passes().is_empty());

    assert!(DebouncedPass::from_millis("neg", -5, 0, || Ok(())).is_none());
    let pass = DebouncedPass::from_millis("ok", 250, 2, || Ok(())).expect("valid delay");
    assert_eq!(pass.delay, Duration::from_millis(250));
}

#[test]
fn poll_runs_due_passes_in_deadline_order() {
    let (mut passes, clock) = manager();
    let log = Rc::new(RefCell::new(Vec::new()));
    let push = |name: &'static str, delay: Duration, priority: i32| {
        let log = Rc::clone(&log);
        DebouncedPass::new(name, delay, priority, move || {
            log.borrow_mut().push(name);
            Ok(())
        })
    };
    passes.register(push("slow", DELAY * 2, 100));
    passes.register(push("fast", DELAY, 0));
    passes.trigger("slow");
    passes.trigger("fast");
    assert_eq!(passes.next_deadline(), Some(clock.now() + DELAY));

    clock.advance(DELAY * 2);
    assert_eq!(passes.poll(), 2);
    assert_eq!(*log.borrow(), ["fast", "slow"]);
}

#[test]
fn registered_passes_are_listed_in_registration_order() {
    let (mut passes, _clock) = manager();
    let calls = counter();
    passes.register(counting_pass("second", DELAY, 2, &calls));
    passes.register(counting_pass("first", DELAY, 1, &calls));
    let ids: Vec<String> = passes.registered_passes().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, ["second", "first"]);

    passes.trigger("second");
    passes.clear();
    assert!(passes.registered_passes().is_empty());
    assert_eq!(passes.pending_count(), 0);
}

#[test]
fn managers_are_independent() {
    let clock = ManualClock::new();
    let mut a = DebouncedPassManager::with_clock(clock.clone());
    let mut b = DebouncedPassManager::with_clock(clock.clone());
    let a_calls = counter();
    let b_calls = counter();
    a.register(counting_pass("same", DELAY, 0, &a_calls));
    b.register(counting_pass("same", DELAY, 0, &b_calls));
    a.trigger("same");
    assert!(!b.is_pending("same"));

    clock.advance(DELAY);
    a.poll();
    b.poll();
    assert_eq!(a_calls.get(), 1);
    assert_eq!(b_calls.get(), 0);
}
