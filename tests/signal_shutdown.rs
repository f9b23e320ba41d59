//! Runs in its own test binary: it signals the whole process.
#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use servicevisor::{
    Config, ControlConfig, EventKind, InstanceState, Phase, Runtime, ServiceError, ServiceSpec,
};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

fn idle(name: &'static str) -> ServiceSpec {
    ServiceSpec::from_fn(name, |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, ServiceError>(())
    })
}

async fn sigterm_self() {
    let status = tokio::process::Command::new("kill")
        .arg("-TERM")
        .arg(std::process::id().to_string())
        .status()
        .await
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn repeated_sigterm_drains_exactly_once() {
    // Keeps SIGTERM's default action (terminate) out of the way for the whole test.
    let _guard = signal(SignalKind::terminate()).unwrap();

    let cfg = Config {
        grace: Duration::from_secs(2),
        control: ControlConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port: 0,
        },
        ..Config::default()
    };
    let rt = Runtime::builder(cfg)
        .register(idle("alpha"))
        .unwrap()
        .register(idle("beta"))
        .unwrap()
        .build();
    let mut events = rt.subscribe();

    let runner = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.run(["alpha", "beta"]).await })
    };
    while rt.tree().len().await < 2 {
        tokio::task::yield_now().await;
    }

    // The runtime installs its own listener after startup; repeat until it reacts.
    while rt.phase() == Phase::Running {
        sigterm_self().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    sigterm_self().await;

    tokio::time::timeout(Duration::from_secs(10), runner)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(rt.phase(), Phase::Terminated);

    let list = rt.control().list_services().await;
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|s| s.state == InstanceState::Exited));

    let mut requested = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::ShutdownRequested {
            requested += 1;
        }
    }
    assert_eq!(requested, 1);

    // Later signals after termination change nothing.
    sigterm_self().await;
    rt.shutdown().await.unwrap();
    assert_eq!(rt.phase(), Phase::Terminated);
}
