//! TCP echo listener and a periodic ticker supervised as one group.
//!
//! ```text
//! cargo run --example echo_ticker -- --port 7070
//! cargo run --example echo_ticker -- --fault-after-ticks 3   # ticker panics, exit 1
//! ```
//!
//! Ctrl-C (or `kill -TERM`) stops both workers; the run then executes the
//! finalize hooks and exits with the report's code.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gracevisor::{HookError, Supervisor, SupervisorConfig, WorkerError, WorkerFn, WorkerRef};

#[derive(Parser, Debug)]
#[command(author, version, about = "echo listener + ticker under gracevisor")]
struct Args {
    /// Port for the echo listener (127.0.0.1)
    #[arg(long, default_value_t = 7070)]
    port: u16,

    /// Make the ticker fault (out-of-bounds index) after this many ticks
    #[arg(long)]
    fault_after_ticks: Option<u64>,

    /// Tick interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Drain grace in seconds (0 = wait forever)
    #[arg(long, default_value_t = 10)]
    grace_secs: u64,
}

fn echo_listener(port: u16) -> WorkerRef {
    WorkerFn::arc("echo-listener", move |ctx: CancellationToken| async move {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        tracing::info!(addr = %listener.local_addr()?, "echo listener bound");

        let mut conns = JoinSet::new();
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    tracing::debug!(%peer, "connection accepted");
                    conns.spawn(echo(stream, ctx.child_token()));
                }
            }
        }

        drop(listener);
        while conns.join_next().await.is_some() {}
        Err::<(), _>(WorkerError::Canceled)
    })
}

async fn echo(mut stream: TcpStream, ctx: CancellationToken) {
    let mut buf = [0u8; 1024];
    loop {
        let n = tokio::select! {
            _ = ctx.cancelled() => return,
            read = stream.read(&mut buf) => match read {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            },
        };
        if stream.write_all(&buf[..n]).await.is_err() {
            return;
        }
    }
}

fn ticker(every: Duration, fault_after: Option<u64>) -> WorkerRef {
    WorkerFn::arc("ticker", move |ctx: CancellationToken| async move {
        let mut interval = tokio::time::interval(every);
        let mut history: Vec<u64> = Vec::new();
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok::<_, WorkerError>(()),
                _ = interval.tick() => {
                    ticks += 1;
                    tracing::info!(ticks, "tick");
                    if fault_after.is_some_and(|n| ticks >= n) {
                        // off-by-one: panics with "index out of bounds"
                        let last = history[history.len()];
                        tracing::info!(last, "previous tick");
                    }
                    if fault_after.is_some() {
                        history.push(ticks);
                    }
                }
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gracevisor=debug,echo_ticker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let cfg = SupervisorConfig {
        grace: Duration::from_secs(args.grace_secs),
        ..SupervisorConfig::default()
    };

    let flushed = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&flushed);
    let sup = Supervisor::builder(cfg)
        .on_shutdown(move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            tracing::info!("sync hook: buffers flushed");
            Ok(())
        })
        .on_shutdown_async(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tracing::info!("async hook: connections closed");
            Ok::<_, HookError>(())
        })
        .build();

    let report = sup
        .run(vec![
            echo_listener(args.port),
            ticker(Duration::from_millis(args.tick_ms.max(1)), args.fault_after_ticks),
        ])
        .await?;

    tracing::info!(
        cause = %report.cause(),
        faults = report.faults(),
        exit_code = report.exit_code(),
        hooks_ran = flushed.load(std::sync::atomic::Ordering::SeqCst),
        "supervisor finished"
    );
    Ok(ExitCode::from(&report))
}
