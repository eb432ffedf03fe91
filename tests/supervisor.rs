use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use gracevisor::{
    CompletionPolicy, Event, EventKind, HookError, Phase, RuntimeError, ShutdownCause, SignalKind,
    Subscribe, Supervisor, SupervisorConfig, SupervisorHandle, TaskState, WorkerError, WorkerFn,
    WorkerRef,
};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, e: &Event) {
        self.events.lock().unwrap().push(e.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }

    fn queue_capacity(&self) -> usize {
        16_384
    }
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    fn count(&self, kind: EventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    fn position(&self, kind: EventKind) -> Option<usize> {
        self.kinds().into_iter().position(|k| k == kind)
    }

    fn phases(&self) -> Vec<Phase> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == EventKind::PhaseChanged)
            .filter_map(|e| e.phase)
            .collect()
    }

    fn reasons(&self, kind: EventKind) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(|e| e.reason.as_deref().map(str::to_owned))
            .collect()
    }
}

/// Keeps `fatal = true` records as `worker: error` and every other message verbatim.
#[derive(Clone, Default)]
struct LogCapture {
    fatal: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    fn fatal(&self) -> Vec<String> {
        self.fatal.lock().unwrap().clone()
    }

    fn messages_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

#[derive(Default)]
struct Fields {
    fatal: bool,
    worker: String,
    error: String,
    message: String,
}

impl Visit for Fields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "fatal" {
            self.fatal = value;
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "worker" => self.worker = value.to_owned(),
            "error" => self.error = value.to_owned(),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        if fields.fatal {
            self.fatal
                .lock()
                .unwrap()
                .push(format!("{}: {}", fields.worker, fields.error));
        } else {
            self.messages.lock().unwrap().push(fields.message);
        }
    }
}

fn cfg() -> SupervisorConfig {
    SupervisorConfig {
        signals: vec![],
        ..SupervisorConfig::default()
    }
}

fn listener(name: &'static str) -> WorkerRef {
    WorkerFn::arc(name, |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, WorkerError>(())
    })
}

fn ticker(name: &'static str, ticks: Arc<AtomicUsize>) -> WorkerRef {
    WorkerFn::arc(name, move |ctx: CancellationToken| {
        let ticks = Arc::clone(&ticks);
        async move {
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => return Err::<(), _>(WorkerError::Canceled),
                    _ = sleep(Duration::from_millis(5)) => {
                        ticks.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }
    })
}

/// Ignores its token; returns only once `release` is set.
fn stubborn(name: &'static str, release: Arc<AtomicBool>) -> WorkerRef {
    WorkerFn::arc(name, move |_ctx: CancellationToken| {
        let release = Arc::clone(&release);
        async move {
            while !release.load(Ordering::SeqCst) {
                sleep(Duration::from_millis(5)).await;
            }
            Ok::<_, WorkerError>(())
        }
    })
}

fn signal_when_running(handle: &SupervisorHandle, kind: SignalKind) {
    let handle = handle.clone();
    tokio::spawn(async move {
        handle.wait_for_phase(Phase::Running).await;
        handle.shutdown(kind);
    });
}

#[tokio::test]
async fn signal_after_one_tick_cancels_listener_and_ticker() {
    let rec = Arc::new(Recorder::default());
    let sup = Supervisor::builder(cfg()).with_subscriber(rec.clone()).build();
    let handle = sup.handle();

    let ticks = Arc::new(AtomicUsize::new(0));
    {
        let handle = handle.clone();
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            while ticks.load(Ordering::SeqCst) < 1 {
                sleep(Duration::from_millis(1)).await;
            }
            handle.shutdown(SignalKind::Terminate);
        });
    }

    let report = sup
        .run(vec![listener("listener"), ticker("ticker", Arc::clone(&ticks))])
        .await
        .expect("run");

    assert!(ticks.load(Ordering::SeqCst) >= 1);
    assert_eq!(report.cause(), &ShutdownCause::SignalReceived(SignalKind::Terminate));
    assert_eq!(report.exit_code(), 0);
    assert!(report.is_clean());
    assert!(handle.workers().iter().all(|w| w.state == TaskState::Completed));
    assert_eq!(rec.count(EventKind::WorkerFailed), 0);
    assert_eq!(rec.reasons(EventKind::WorkerStopped), vec!["cancelled", "cancelled"]);
    assert_eq!(handle.phase(), Phase::Terminated);
}

#[tokio::test]
async fn panicking_worker_cancels_sibling_and_faults_the_run() {
    let rec = Arc::new(Recorder::default());
    let sup = Supervisor::builder(cfg()).with_subscriber(rec.clone()).build();
    let handle = sup.handle();

    let faulty = WorkerFn::arc("faulty", |_ctx: CancellationToken| async move {
        sleep(Duration::from_millis(5)).await;
        let slots: Vec<u32> = Vec::new();
        let idx = slots.len() + 3;
        let first = slots[idx];
        Err::<(), _>(WorkerError::fail(first))
    });

    let report = sup
        .run(vec![listener("listener"), faulty])
        .await
        .expect("run");

    match report.cause() {
        ShutdownCause::WorkerFault { worker, error } => {
            assert_eq!(worker.as_ref(), "faulty");
            assert!(error.contains("index out of bounds"), "{error}");
        }
        other => panic!("unexpected cause: {other:?}"),
    }
    assert_eq!(report.exit_code(), 1);
    assert_eq!(rec.count(EventKind::WorkerFailed), 1);
    assert_eq!(rec.reasons(EventKind::WorkerStopped), vec!["cancelled"]);

    let states: Vec<_> = handle.workers().into_iter().map(|w| (w.name, w.state)).collect();
    assert_eq!(
        states,
        vec![
            (Arc::<str>::from("listener"), TaskState::Completed),
            (Arc::<str>::from("faulty"), TaskState::Failed),
        ]
    );
}

#[tokio::test]
async fn worker_ignoring_cancellation_keeps_run_draining() {
    let rec = Arc::new(Recorder::default());
    let sup = Supervisor::builder(cfg()).with_subscriber(rec.clone()).build();
    let handle = sup.handle();
    let release = Arc::new(AtomicBool::new(false));

    signal_when_running(&handle, SignalKind::Terminate);
    let mut run = tokio::spawn(sup.run(vec![
        listener("listener"),
        stubborn("stubborn", Arc::clone(&release)),
    ]));

    assert!(timeout(Duration::from_millis(200), &mut run).await.is_err());
    assert_eq!(handle.phase(), Phase::Draining);
    let stuck: Vec<_> = handle
        .workers()
        .into_iter()
        .filter(|w| !w.state.is_terminal())
        .map(|w| w.name)
        .collect();
    assert_eq!(stuck, vec![Arc::<str>::from("stubborn")]);

    release.store(true, Ordering::SeqCst);
    let report = run.await.expect("join").expect("run");
    assert_eq!(report.exit_code(), 0);
    assert!(report.abandoned().is_empty());
    assert_eq!(rec.count(EventKind::AllStopped), 1);
}

#[tokio::test]
async fn repeated_signals_cancel_once_and_run_hooks_once() {
    let rec = Arc::new(Recorder::default());
    let hook_runs = Arc::new(AtomicUsize::new(0));
    let runs = Arc::clone(&hook_runs);
    let sup = Supervisor::builder(cfg())
        .with_subscriber(rec.clone())
        .on_shutdown(move || {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();
    let handle = sup.handle();

    {
        let handle = handle.clone();
        tokio::spawn(async move {
            handle.wait_for_phase(Phase::Running).await;
            handle.shutdown(SignalKind::Terminate);
            handle.shutdown(SignalKind::Interrupt);
        });
    }

    let report = sup.run(vec![listener("a"), listener("b")]).await.expect("run");

    assert_eq!(report.cause(), &ShutdownCause::SignalReceived(SignalKind::Terminate));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(hook_runs.load(Ordering::SeqCst), 1);
    assert_eq!(rec.count(EventKind::SignalReceived), 2);
    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(rec.reasons(EventKind::CancelRequested), vec!["a,b"]);
}

#[tokio::test]
async fn one_signal_cancels_every_worker() {
    for n in [1usize, 3, 8] {
        let rec = Arc::new(Recorder::default());
        let sup = Supervisor::builder(cfg()).with_subscriber(rec.clone()).build();
        let handle = sup.handle();
        signal_when_running(&handle, SignalKind::Interrupt);

        let workers = (0..n).map(|_| listener("listener")).collect();
        let report = sup.run(workers).await.expect("run");

        assert_eq!(report.exit_code(), 0, "n = {n}");
        let batches = rec.reasons(EventKind::CancelRequested);
        assert_eq!(batches.len(), 1, "n = {n}");
        assert_eq!(batches[0].split(',').count(), n);
        assert_eq!(rec.count(EventKind::WorkerStopped), n);
        let workers = handle.workers();
        assert_eq!(workers.len(), n);
        assert!(workers.iter().all(|w| w.state == TaskState::Completed));
    }
}

#[tokio::test]
async fn fault_in_a_large_group_is_logged_and_recorded() {
    let log = LogCapture::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(log.clone()));

    let rec = Arc::new(Recorder::default());
    let sup = Supervisor::builder(cfg()).with_subscriber(rec.clone()).build();

    let bad = WorkerFn::arc("bad", |_ctx: CancellationToken| async move {
        sleep(Duration::from_millis(20)).await;
        Err::<(), _>(WorkerError::fail("boom"))
    });
    let mut workers: Vec<WorkerRef> = (0..1500).map(|_| listener("listener")).collect();
    workers.push(bad);

    let report = sup.run(workers).await.expect("run");

    assert_eq!(
        report.cause(),
        &ShutdownCause::WorkerFault {
            worker: Arc::from("bad"),
            error: Arc::from("execution failed: boom"),
        }
    );
    assert_eq!(report.exit_code(), 1);
    assert_eq!(log.fatal(), vec!["bad: execution failed: boom"]);
    assert_eq!(rec.count(EventKind::WorkerFailed), 1);
    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(rec.count(EventKind::CancelRequested), 1);
}

#[tokio::test]
async fn failure_during_cleanup_after_signal_faults_the_run() {
    let log = LogCapture::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(log.clone()));

    let rec = Arc::new(Recorder::default());
    let sup = Supervisor::builder(cfg()).with_subscriber(rec.clone()).build();
    let handle = sup.handle();
    signal_when_running(&handle, SignalKind::Terminate);

    let flusher = WorkerFn::arc("flusher", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Err::<(), _>(WorkerError::fail("flush failed"))
    });

    let report = sup
        .run(vec![listener("listener"), flusher])
        .await
        .expect("run");

    assert_eq!(report.cause(), &ShutdownCause::SignalReceived(SignalKind::Terminate));
    assert_eq!(report.faults(), 1);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(rec.count(EventKind::WorkerFailed), 1);
    assert_eq!(rec.reasons(EventKind::WorkerFailed), vec!["execution failed: flush failed"]);
    assert_eq!(log.fatal(), vec!["flusher: execution failed: flush failed"]);
    assert_eq!(log.messages_containing("Received exit signal SIGTERM=15"), 1);
}

#[tokio::test]
async fn hooks_run_after_drain_sync_before_async() {
    let rec = Arc::new(Recorder::default());
    let order = Arc::new(Mutex::new(Vec::new()));
    let cell: Arc<Mutex<Option<SupervisorHandle>>> = Arc::new(Mutex::new(None));

    let (o1, c1) = (Arc::clone(&order), Arc::clone(&cell));
    let (o2, c2) = (Arc::clone(&order), Arc::clone(&cell));
    let sup = Supervisor::builder(cfg())
        .with_subscriber(rec.clone())
        .on_shutdown(move || {
            let drained = c1
                .lock()
                .unwrap()
                .as_ref()
                .is_some_and(|h| h.workers().iter().all(|w| w.state.is_terminal()));
            o1.lock().unwrap().push(("sync", drained));
            Ok(())
        })
        .on_shutdown_async(move || async move {
            sleep(Duration::from_millis(1)).await;
            o2.lock().unwrap().push(("async", c2.lock().unwrap().is_some()));
            Ok::<_, HookError>(())
        })
        .build();
    let handle = sup.handle();
    *cell.lock().unwrap() = Some(handle.clone());
    signal_when_running(&handle, SignalKind::Terminate);

    let ticks = Arc::new(AtomicUsize::new(0));
    let report = sup
        .run(vec![listener("listener"), ticker("ticker", ticks)])
        .await
        .expect("run");

    assert_eq!(report.exit_code(), 0);
    assert_eq!(*order.lock().unwrap(), vec![("sync", true), ("async", true)]);

    let all_stopped = rec.position(EventKind::AllStopped).expect("AllStopped");
    let first_hook = rec.position(EventKind::HookStarted).expect("HookStarted");
    assert!(all_stopped < first_hook);
    assert_eq!(rec.count(EventKind::HookCompleted), 2);
}

#[tokio::test]
async fn failing_hook_yields_configured_exit_code() {
    let rec = Arc::new(Recorder::default());
    let async_ran = Arc::new(AtomicBool::new(false));
    let ran = Arc::clone(&async_ran);
    let sup = Supervisor::builder(SupervisorConfig {
        fault_exit_code: 3,
        ..cfg()
    })
    .with_subscriber(rec.clone())
    .on_shutdown(|| Err(HookError::fail("flush failed")))
    .on_shutdown_async(move || async move {
        ran.store(true, Ordering::SeqCst);
        Ok::<_, HookError>(())
    })
    .build();
    signal_when_running(&sup.handle(), SignalKind::Terminate);

    let report = sup.run(vec![listener("listener")]).await.expect("run");

    assert_eq!(report.cause(), &ShutdownCause::SignalReceived(SignalKind::Terminate));
    assert_eq!(report.faults(), 1);
    assert_eq!(report.exit_code(), 3);
    assert!(async_ran.load(Ordering::SeqCst));
    assert_eq!(rec.count(EventKind::HookFailed), 1);
    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
}

#[tokio::test]
async fn tolerated_completion_ends_run_cleanly() {
    let rec = Arc::new(Recorder::default());
    let sup = Supervisor::builder(SupervisorConfig {
        completion: CompletionPolicy::Tolerate,
        ..cfg()
    })
    .with_subscriber(rec.clone())
    .build();

    let batch = |name: &'static str, ms: u64| {
        WorkerFn::arc(name, move |_ctx: CancellationToken| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, WorkerError>(())
        }) as WorkerRef
    };

    let report = sup
        .run(vec![batch("fast", 5), batch("slow", 20)])
        .await
        .expect("run");

    assert_eq!(report.cause(), &ShutdownCause::AllCompletedNormally);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(rec.reasons(EventKind::WorkerStopped), vec!["completed", "completed"]);
    assert_eq!(rec.count(EventKind::CancelRequested), 0);
}

#[tokio::test]
async fn early_return_is_a_fault_by_default() {
    let sup = Supervisor::new(cfg());
    let oneshot = WorkerFn::arc("oneshot", |_ctx: CancellationToken| async move {
        Ok::<_, WorkerError>(())
    });

    let report = sup
        .run(vec![listener("listener"), oneshot])
        .await
        .expect("run");

    assert_eq!(
        report.cause(),
        &ShutdownCause::WorkerFault {
            worker: Arc::from("oneshot"),
            error: Arc::from("exited before shutdown was requested"),
        }
    );
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn worker_error_is_reported_in_cause() {
    let sup = Supervisor::new(cfg());
    let disk = WorkerFn::arc("disk", |_ctx: CancellationToken| async move {
        Err::<(), _>(WorkerError::fail("disk full"))
    });

    let report = sup.run(vec![disk, listener("listener")]).await.expect("run");

    assert!(report.cause().is_fault());
    assert!(report.cause().to_string().contains("disk full"));
    assert_eq!(report.faults(), 1);
}

#[tokio::test]
async fn grace_exceeded_abandons_workers_and_skips_hooks() {
    let rec = Arc::new(Recorder::default());
    let hook_runs = Arc::new(AtomicUsize::new(0));
    let runs = Arc::clone(&hook_runs);
    let sup = Supervisor::builder(SupervisorConfig {
        grace: Duration::from_millis(50),
        ..cfg()
    })
    .with_subscriber(rec.clone())
    .on_shutdown(move || {
        runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .build();
    let handle = sup.handle();
    signal_when_running(&handle, SignalKind::Terminate);

    let release = Arc::new(AtomicBool::new(false));
    let report = sup
        .run(vec![listener("listener"), stubborn("stubborn", Arc::clone(&release))])
        .await
        .expect("run");

    assert_eq!(report.abandoned(), &[Arc::<str>::from("stubborn")]);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(hook_runs.load(Ordering::SeqCst), 0);
    assert_eq!(rec.count(EventKind::GraceExceeded), 1);
    assert_eq!(rec.count(EventKind::HooksSkipped), 1);
    assert_eq!(rec.count(EventKind::AllStopped), 0);
    assert_eq!(rec.reasons(EventKind::GraceExceeded), vec!["stubborn"]);
    assert_eq!(handle.phase(), Phase::Terminated);

    let stubborn_state = handle
        .workers()
        .into_iter()
        .find(|w| w.name.as_ref() == "stubborn")
        .map(|w| w.state);
    assert_eq!(stubborn_state, Some(TaskState::Cancelling));

    release.store(true, Ordering::SeqCst);
}

#[tokio::test]
async fn empty_worker_list_is_rejected() {
    let sup = Supervisor::new(cfg());
    let err = sup.run(Vec::new()).await.expect_err("must reject");
    assert!(matches!(err, RuntimeError::NoWorkers));
    assert_eq!(err.as_label(), "runtime_no_workers");
}

#[tokio::test]
async fn subscriber_observes_every_phase_in_order() {
    let rec = Arc::new(Recorder::default());
    let sup = Supervisor::builder(cfg()).with_subscriber(rec.clone()).build();
    signal_when_running(&sup.handle(), SignalKind::Terminate);

    sup.run(vec![listener("listener")]).await.expect("run");

    assert_eq!(
        rec.phases(),
        vec![
            Phase::Running,
            Phase::ShuttingDown,
            Phase::Draining,
            Phase::Finalizing,
            Phase::Terminated,
        ]
    );
    assert_eq!(rec.kinds().last(), Some(&EventKind::Terminated));
}

#[tokio::test]
async fn shutdown_before_run_cancels_workers_at_registration() {
    let sup = Supervisor::new(cfg());
    let handle = sup.handle();
    handle.shutdown(SignalKind::Interrupt);
    assert!(handle.is_shutdown_requested());

    let report = sup.run(vec![listener("listener")]).await.expect("run");

    assert_eq!(report.cause(), &ShutdownCause::SignalReceived(SignalKind::Interrupt));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(handle.workers()[0].state, TaskState::Completed);
}
