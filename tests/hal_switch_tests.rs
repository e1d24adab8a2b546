use hwfmt::hal::mock::{Behavior, SimulatedStream};
use hwfmt::hal::{
    switch_physical_format, AbortReason, FormatDescriptor, FormatSwitcher, SwitchOutcome,
    StreamId,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn init() {
    hwfmt::logging::init_logging("hwfmt=debug");
}

fn cd_format() -> FormatDescriptor {
    FormatDescriptor::pcm_int(44100.0, 2, 16)
}

fn hires_format() -> FormatDescriptor {
    FormatDescriptor::pcm_int(96000.0, 2, 24)
}

fn short_switcher() -> FormatSwitcher {
    FormatSwitcher::new(Duration::from_millis(150))
}

fn assert_single_subscription(stream: &SimulatedStream) {
    assert_eq!(stream.subscribe_count(), 1);
    assert_eq!(stream.unsubscribe_count(), 1);
    assert_eq!(stream.listener_count(), 0);
}

#[test]
fn test_already_active_format_commits_without_waiting() {
    init();
    let stream =
        SimulatedStream::new(StreamId(1), cd_format()).with_default_behavior(Behavior::Ignore);

    let started = Instant::now();
    assert!(switch_physical_format(&stream, &cd_format()));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_single_subscription(&stream);
}

#[test]
fn test_switch_commits_after_notification() {
    init();
    let stream = SimulatedStream::new(StreamId(2), cd_format())
        .with_latency(Duration::from_millis(50));

    let outcome = FormatSwitcher::default().switch(&stream, &hires_format());

    assert_eq!(outcome, SwitchOutcome::Committed);
    assert_eq!(stream.current_format(), hires_format());
    assert_eq!(stream.set_calls(), vec![hires_format()]);
    assert_single_subscription(&stream);
}

#[test]
fn test_intermediate_change_does_not_commit() {
    init();
    let intermediate = FormatDescriptor::pcm_int(96000.0, 2, 16);
    let stream = SimulatedStream::new(StreamId(3), cd_format())
        .with_latency(Duration::from_millis(30))
        .with_script(vec![Behavior::ApplyInSteps(intermediate)]);

    let outcome = FormatSwitcher::default().switch(&stream, &hires_format());

    assert!(outcome.is_committed());
    assert_eq!(stream.current_format(), hires_format());
    stream.flush();
    assert!(stream.notification_count() >= 2);
    assert_single_subscription(&stream);
}

#[test]
fn test_spurious_notifications_time_out() {
    init();
    let stream = SimulatedStream::new(StreamId(4), cd_format())
        .with_script(vec![Behavior::Ignore]);

    let started = Instant::now();
    let outcome = short_switcher().switch(&stream, &hires_format());

    assert_eq!(outcome, SwitchOutcome::Aborted(AbortReason::TimedOut));
    assert!(started.elapsed() >= Duration::from_millis(150));

    stream.flush();
    assert!(stream.notification_count() >= 1);
    assert_eq!(stream.current_format(), cd_format());
    assert_single_subscription(&stream);
}

#[test]
fn test_non_convergence_rolls_back_after_two_seconds() {
    init();
    let broken = FormatDescriptor::pcm_int(32000.0, 2, 16);
    let stream = SimulatedStream::new(StreamId(5), cd_format())
        .with_script(vec![Behavior::Substitute(broken)]);

    let started = Instant::now();
    let committed = switch_physical_format(&stream, &hires_format());
    let elapsed = started.elapsed();

    assert!(!committed);
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(10));

    // rollback is not awaited by the switch itself
    stream.flush();
    assert_eq!(stream.current_format(), cd_format());
    assert_eq!(stream.set_calls(), vec![hires_format(), cd_format()]);
    assert_single_subscription(&stream);
}

#[test]
fn test_rejected_mutation_and_rollback_are_not_fatal() {
    init();
    let stream =
        SimulatedStream::new(StreamId(6), cd_format()).with_default_behavior(Behavior::Reject);

    let outcome = short_switcher().switch(&stream, &hires_format());

    assert_eq!(outcome, SwitchOutcome::Aborted(AbortReason::TimedOut));
    assert_eq!(stream.current_format(), cd_format());
    assert_eq!(stream.set_calls().len(), 2);
    assert_single_subscription(&stream);
}

#[test]
fn test_readback_failure_aborts_immediately() {
    init();
    let stream = SimulatedStream::new(StreamId(7), cd_format())
        .with_default_behavior(Behavior::Ignore)
        .fail_readback_after(1);

    let started = Instant::now();
    let outcome = FormatSwitcher::default().switch(&stream, &hires_format());

    assert_eq!(outcome, SwitchOutcome::Aborted(AbortReason::ReadbackFailed));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(stream.set_calls(), vec![hires_format(), cd_format()]);
    assert_single_subscription(&stream);
}

#[test]
fn test_capture_failure_never_mutates() {
    init();
    let stream = SimulatedStream::new(StreamId(8), cd_format()).fail_readback_after(0);

    let outcome = FormatSwitcher::default().switch(&stream, &hires_format());

    assert_eq!(outcome, SwitchOutcome::Aborted(AbortReason::CaptureFailed));
    assert!(stream.set_calls().is_empty());
    assert_eq!(stream.subscribe_count(), 0);
    assert_eq!(stream.unsubscribe_count(), 0);
}

#[test]
fn test_inline_notification_does_not_deadlock() {
    init();
    let stream = SimulatedStream::new(StreamId(9), cd_format())
        .with_default_behavior(Behavior::ApplyInline);

    let outcome = short_switcher().switch(&stream, &hires_format());

    assert!(outcome.is_committed());
    assert_single_subscription(&stream);
}

#[test]
fn test_mixability_must_match_to_commit() {
    init();
    let exclusive = hires_format().non_mixable();
    let stream = SimulatedStream::new(StreamId(10), cd_format())
        .with_script(vec![Behavior::Substitute(hires_format())]);

    let outcome = short_switcher().switch(&stream, &exclusive);

    assert_eq!(outcome, SwitchOutcome::Aborted(AbortReason::TimedOut));
    stream.flush();
    assert_eq!(stream.current_format(), cd_format());
}

#[test]
fn test_sessions_on_different_streams_are_independent() {
    init();
    let streams: Vec<Arc<SimulatedStream>> = (0..4)
        .map(|i| {
            Arc::new(
                SimulatedStream::new(StreamId(100 + i), cd_format())
                    .with_latency(Duration::from_millis(20 * (i as u64 + 1))),
            )
        })
        .collect();

    let handles: Vec<_> = streams
        .iter()
        .map(|stream| {
            let stream = Arc::clone(stream);
            thread::spawn(move || FormatSwitcher::default().switch(stream.as_ref(), &hires_format()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), SwitchOutcome::Committed);
    }
    for stream in &streams {
        assert_eq!(stream.current_format(), hires_format());
        assert_single_subscription(stream);
    }
}

#[test]
fn test_subscribe_failure_never_mutates() {
    init();
    let stream = SimulatedStream::new(StreamId(11), cd_format()).fail_subscribe();

    let outcome = FormatSwitcher::default().switch(&stream, &hires_format());

    assert_eq!(outcome, SwitchOutcome::Aborted(AbortReason::SubscribeFailed));
    assert!(stream.set_calls().is_empty());
    assert_eq!(stream.subscribe_count(), 0);
    assert_eq!(stream.unsubscribe_count(), 0);
    assert_eq!(stream.current_format(), cd_format());
}

#[test]
fn test_unsubscribe_failure_keeps_outcome() {
    init();
    let stream = SimulatedStream::new(StreamId(12), cd_format())
        .with_latency(Duration::from_millis(10))
        .fail_unsubscribe();

    let outcome = FormatSwitcher::default().switch(&stream, &hires_format());

    assert_eq!(outcome, SwitchOutcome::Committed);
    assert_eq!(stream.subscribe_count(), 1);
    assert_eq!(stream.unsubscribe_count(), 1);
    assert_eq!(stream.set_calls(), vec![hires_format()]);
}

#[test]
fn test_oversized_channel_count_is_logged_safely() {
    init();
    let mut bogus = cd_format();
    bogus.channels_per_frame = 0x4000_0000;
    let stream = SimulatedStream::new(StreamId(13), bogus).with_available(vec![bogus]);

    let target = FormatDescriptor::pcm_int(48000.0, 2, 16);
    let outcome = FormatSwitcher::default().switch(&stream, &target);

    assert!(outcome.is_committed());
    assert!(!hwfmt::hal::supports_compressed(&stream));
}
