//! Unit tests for the session command loop.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use hostwatch_protocol::{Envelope, MonitorMode, Status};
use rstest::{fixture, rstest};

use super::*;
use crate::tests::support::{
    ChannelTransport, HealthEvent, RecordingHealthReporter, StaticMetricsProvider,
};
use crate::transport::AdmissionGate;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(100);

struct Harness {
    session: Session,
    transport: Arc<ChannelTransport>,
    reporter: Arc<RecordingHealthReporter>,
    gate: Arc<AdmissionGate>,
}

impl Harness {
    fn reply(&self, line: &str) -> (Flow, Envelope) {
        let flow = self.session.handle_request(line);
        let envelope = self.transport.next_envelope(WAIT).expect("reply envelope");
        (flow, envelope)
    }

    /// Starts a slow monitor and swallows its first sample so later replies
    /// are not interleaved with metrics.
    fn start(&self, line: &str) -> Envelope {
        let (flow, reply) = self.reply(line);
        assert_eq!(flow, Flow::Continue);
        let sample = self.transport.next_envelope(WAIT).expect("first sample");
        assert_eq!(sample.status, Status::Info);
        reply
    }
}

#[fixture]
fn harness() -> Harness {
    let transport = Arc::new(ChannelTransport::new());
    let reporter = Arc::new(RecordingHealthReporter::default());
    let gate = AdmissionGate::new(NonZeroUsize::new(2).expect("non-zero limit"));
    let permit = gate.try_acquire().expect("free slot");
    let connection: Arc<dyn Transport> = transport.clone();
    let health: Arc<dyn HealthReporter> = reporter.clone();
    let context = SessionContext::new(
        Arc::new(StaticMetricsProvider::default()),
        health,
        Duration::from_secs(10),
        MonitorMode::Basic,
    );
    let admitted = Admitted {
        transport: connection,
        peer: "127.0.0.1:5000".parse().expect("peer address"),
        permit,
    };
    Harness {
        session: Session::new(admitted, context),
        transport,
        reporter,
        gate,
    }
}

#[rstest]
fn task_ids_are_not_reused_after_removal(harness: Harness) {
    assert_eq!(
        harness.start("/cpu -t=60").message,
        "CPU monitoring started with ID: 0"
    );
    assert_eq!(
        harness.start("/mem -t=60").message,
        "Memory monitoring started with ID: 1"
    );
    assert_eq!(
        harness.reply("/quit 0").1,
        Envelope::success("Monitor 0 stopped.")
    );
    assert_eq!(
        harness.start("/cpu -t=60 -m=advanced").message,
        "CPU monitoring started with ID: 2"
    );

    let (_, listing) = harness.reply("/monitors");
    assert_eq!(
        listing,
        Envelope::info(
            "Active monitors:\n - 1: Memory in 'basic' mode every 60s\n \
             - 2: CPU in 'advanced' mode every 60s"
        )
    );
    harness.session.close();
}

#[rstest]
fn quitting_the_last_monitor_empties_the_listing(harness: Harness) {
    harness.start("/mem -t=60");
    harness.reply("/quit 0");
    assert_eq!(harness.reply("/monitors").1, Envelope::error(NO_MONITORS));
    assert_eq!(
        harness.reply("/quit 0").1,
        Envelope::error("Monitor ID '0' not found.")
    );
}

#[rstest]
#[case("/cpu -t=abc", "Value must be an integer.")]
#[case("/cpu -t=0", "Interval must be at least 1 second.")]
#[case("/mem -m=verbose", "Mode must be one of: basic, advanced.")]
#[case("/quit", "Please specify a monitor ID to quit.")]
fn rejected_commands_leave_the_registry_alone(
    harness: Harness,
    #[case] line: &str,
    #[case] message: &str,
) {
    let (flow, reply) = harness.reply(line);
    assert_eq!(flow, Flow::Continue);
    assert_eq!(reply, Envelope::error(message));
    assert_eq!(harness.session.task_count(), 0);
}

#[rstest]
#[case("/quit 7")]
#[case("/quit 00")]
#[case("/quit abc")]
fn unknown_ids_echo_the_argument(harness: Harness, #[case] line: &str) {
    let id = line.trim_start_matches("/quit ");
    assert_eq!(
        harness.reply(line).1,
        Envelope::error(format!("Monitor ID '{id}' not found."))
    );
}

#[rstest]
fn help_is_stable(harness: Harness) {
    let first = harness.reply("/help").1;
    let second = harness.reply("/help").1;
    assert_eq!(first, Envelope::info(HELP_TEXT));
    assert_eq!(first, second);
}

#[rstest]
fn unknown_commands_are_reported(harness: Harness) {
    assert_eq!(harness.reply("/cpuinfo").1, Envelope::error(UNKNOWN_COMMAND));
}

#[rstest]
fn exit_acknowledges_and_closes(harness: Harness) {
    let (flow, reply) = harness.reply("/exit");
    assert_eq!(flow, Flow::Close);
    assert_eq!(reply, Envelope::success(CONNECTION_ENDED));
}

#[rstest]
fn close_cancels_monitors_and_releases_the_slot(harness: Harness) {
    harness.start("/cpu -t=60");
    harness.start("/mem -t=60");
    assert_eq!(harness.gate.active(), 1);

    harness.session.close();
    harness.session.close();

    assert!(harness.session.is_closed());
    assert!(harness.transport.is_closed());
    assert_eq!(harness.session.task_count(), 0);
    assert_eq!(harness.gate.active(), 0);
    assert_eq!(harness.session.active_sessions(), 0);
    let closed: Vec<_> = harness
        .reporter
        .events()
        .into_iter()
        .filter(|event| matches!(event, HealthEvent::SessionClosed { .. }))
        .collect();
    assert_eq!(closed, vec![HealthEvent::SessionClosed { cancelled_tasks: 2 }]);
}

#[rstest]
fn monitors_cannot_start_after_close(harness: Harness) {
    harness.session.close();
    assert_eq!(harness.session.handle_request("/cpu"), Flow::Close);
    assert_eq!(harness.session.task_count(), 0);
}

#[rstest]
fn run_replies_in_command_order(harness: Harness) {
    harness.transport.push_command("/help");
    harness.transport.push_command("/monitors");
    harness.transport.push_command("/exit");
    harness.transport.push_command("/help");

    harness.session.run();

    let replies = harness.transport.drain_until_quiet(QUIET);
    assert_eq!(
        replies,
        vec![
            Envelope::info(HELP_TEXT),
            Envelope::error(NO_MONITORS),
            Envelope::success(CONNECTION_ENDED),
        ]
    );
    assert!(harness.session.is_closed());
}

#[rstest]
fn run_rejects_invalid_utf8(harness: Harness) {
    harness.transport.push_frame(vec![b'/', 0xff, 0xfe]);
    harness.session.run();
    assert_eq!(
        harness.transport.drain_until_quiet(QUIET),
        vec![Envelope::error("Commands must be valid UTF-8.")]
    );
    assert!(harness.session.is_closed());
}

#[rstest]
fn run_ends_when_the_peer_disconnects(harness: Harness) {
    harness.start("/cpu -t=60");
    harness.transport.close();
    harness.session.run();
    assert!(harness.session.is_closed());
    assert_eq!(harness.gate.active(), 0);
}
