use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use servicevisor::{
    BackoffPolicy, Config, ControlConfig, ControlError, EventKind, InstanceState, Phase,
    RestartPolicy, Runtime, RunnableRef, ServiceContext, ServiceError, ServiceFn, ServiceSpec,
};
use tokio_util::sync::CancellationToken;

fn config() -> Config {
    Config {
        grace: Duration::from_secs(2),
        control: ControlConfig {
            enabled: false,
            ..ControlConfig::default()
        },
        ..Config::default()
    }
}

fn idle(name: &'static str) -> ServiceSpec {
    ServiceSpec::from_fn(name, |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, ServiceError>(())
    })
}

fn names_and_states(list: &[servicevisor::ServiceStatus]) -> Vec<(&str, InstanceState)> {
    list.iter().map(|s| (s.name.as_str(), s.state)).collect()
}

#[tokio::test]
async fn alpha_beta_start_stop_shutdown() {
    let rt = Runtime::builder(config())
        .register(idle("alpha"))
        .unwrap()
        .register(idle("beta"))
        .unwrap()
        .build();
    let control = rt.control();

    let a = control.start_service("alpha").await.unwrap();
    let b = control.start_service("beta").await.unwrap();
    assert_ne!(a, b);

    let list = control.list_services().await;
    assert_eq!(
        names_and_states(&list),
        vec![
            ("alpha", InstanceState::Running),
            ("beta", InstanceState::Running)
        ]
    );

    assert_eq!(control.stop_service("alpha").await, Ok(1));
    let list = control.list_services().await;
    assert_eq!(names_and_states(&list), vec![("beta", InstanceState::Running)]);
    assert_eq!(list[0].token, b);

    rt.shutdown().await.unwrap();
    assert_eq!(rt.phase(), Phase::Terminated);
    assert_eq!(
        names_and_states(&control.list_services().await),
        vec![("beta", InstanceState::Exited)]
    );

    // Idempotent.
    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn control_errors() {
    let rt = Runtime::builder(config())
        .register(idle("alpha"))
        .unwrap()
        .build();
    let control = rt.control();

    assert_eq!(
        control.start_service("gamma").await,
        Err(ControlError::UnknownService {
            name: "gamma".into()
        })
    );
    assert!(matches!(
        control.stop_service("alpha").await,
        Err(ControlError::NotFound { .. })
    ));
    assert!(control.list_services().await.is_empty());

    rt.shutdown().await.unwrap();
    assert_eq!(
        control.start_service("alpha").await,
        Err(ControlError::Draining)
    );
}

#[tokio::test]
async fn same_name_admitted_twice_gets_two_tokens() {
    let rt = Runtime::builder(config())
        .register(idle("alpha"))
        .unwrap()
        .build();
    let control = rt.control();

    let first = control.start_service("alpha").await.unwrap();
    let second = control.start_service("alpha").await.unwrap();
    assert!(second > first);
    assert_eq!(control.stop_service("alpha").await, Ok(2));
    assert!(rt.tree().is_empty().await);

    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn crashing_service_exhausts_restarts_and_stays_listed() {
    let builds = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&builds);
    let crashy = ServiceSpec::new("crashy", move |_ctx: &ServiceContext| -> RunnableRef {
        counter.fetch_add(1, Ordering::SeqCst);
        ServiceFn::arc("crashy", |_ctx: CancellationToken| async {
            Err::<(), _>(ServiceError::fail("segfault in plugin"))
        })
    })
    .with_restart(RestartPolicy::OnFailure {
        max_restarts: 2,
        reset_after: None,
    })
    .with_backoff(BackoffPolicy::immediate());

    let rt = Runtime::builder(config())
        .register(crashy)
        .unwrap()
        .register(idle("steady"))
        .unwrap()
        .build();
    let mut events = rt.subscribe();
    let control = rt.control();

    control.start_service("crashy").await.unwrap();
    control.start_service("steady").await.unwrap();

    loop {
        let ev = events.recv().await.unwrap();
        if ev.kind == EventKind::RestartsExhausted {
            assert_eq!(ev.service.as_deref(), Some("crashy"));
            break;
        }
    }
    while rt.tree().running().await.len() != 1 {
        tokio::task::yield_now().await;
    }
    assert_eq!(builds.load(Ordering::SeqCst), 3);

    let list = control.list_services().await;
    assert_eq!(
        names_and_states(&list),
        vec![
            ("crashy", InstanceState::Exited),
            ("steady", InstanceState::Running)
        ]
    );

    // Exited instances are cleared by StopService.
    assert_eq!(control.stop_service("crashy").await, Ok(1));
    rt.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stuck_service_is_abandoned_after_grace() {
    let stubborn = ServiceSpec::from_fn("stubborn", |_ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, ServiceError>(())
    });
    let rt = Runtime::builder(config())
        .register(stubborn)
        .unwrap()
        .build();

    rt.start(["stubborn"]).await.unwrap();
    let err = rt.shutdown().await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_grace_exceeded");
    assert_eq!(rt.phase(), Phase::Terminated);
}

#[tokio::test(start_paused = true)]
async fn stopped_but_unresponsive_service_is_named_on_drain() {
    let stubborn = ServiceSpec::from_fn("stubborn", |_ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, ServiceError>(())
    });
    let rt = Runtime::builder(config())
        .register(stubborn)
        .unwrap()
        .register(idle("alpha"))
        .unwrap()
        .build();
    let mut events = rt.subscribe();
    let control = rt.control();

    let t = control.start_service("stubborn").await.unwrap();
    control.start_service("alpha").await.unwrap();

    // Returns once the grace period gives up on it.
    assert_eq!(control.stop_service("stubborn").await, Ok(1));
    assert_eq!(
        names_and_states(&control.list_services().await),
        vec![
            ("alpha", InstanceState::Running),
            ("stubborn", InstanceState::Running)
        ]
    );

    match rt.shutdown().await {
        Err(servicevisor::RuntimeError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec![format!("stubborn{t}")]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }

    let mut grace_reason = None;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::GraceExceeded {
            grace_reason = ev.reason.as_deref().map(str::to_string);
        }
    }
    assert_eq!(grace_reason, Some(format!("stubborn{t}")));
}
