//! Demo host process: a runtime with a few heartbeat services.
//!
//! ```text
//! SERVICEVISOR_CONFIG=runtime.json RUNTIME_PORT=7070 servicevisor
//! curl -X POST   localhost:7070/services/flaky
//! curl           localhost:7070/services
//! curl -X DELETE localhost:7070/services/alpha
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use servicevisor::{
    Config, LogWriter, Runtime, RunnableRef, ServiceContext, ServiceError, ServiceFn, ServiceSpec,
};

/// Path of an optional JSON config file.
const CONFIG_VAR: &str = "SERVICEVISOR_CONFIG";

/// Services admitted at startup.
const INITIAL: [&str; 2] = ["alpha", "beta"];

#[derive(Deserialize)]
#[serde(default)]
struct HeartbeatSettings {
    interval_ms: u64,
    failure_rate: f64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            failure_rate: 0.0,
        }
    }
}

/// Factory for a service that logs a beat every interval and, with
/// `failure_rate > 0`, fails at random.
fn heartbeat(ctx: &ServiceContext) -> RunnableRef {
    let name = ctx.name().to_string();
    let settings = match ctx.settings::<HeartbeatSettings>() {
        Ok(s) => s.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(service = %name, error = %e, "bad settings, using defaults");
            HeartbeatSettings::default()
        }
    };
    let interval = Duration::from_millis(settings.interval_ms.max(1));
    let failure_rate = settings.failure_rate.clamp(0.0, 1.0);

    ServiceFn::arc(name.clone(), move |ctx: CancellationToken| {
        let name = name.clone();
        async move {
            let mut beats: u64 = 0;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => return Err::<(), _>(ServiceError::Canceled),
                    _ = tokio::time::sleep(interval) => {}
                }
                beats += 1;
                tracing::debug!(service = %name, beats, "beat");
                if failure_rate > 0.0 && rand::rng().random_bool(failure_rate) {
                    return Err(ServiceError::fail(format!("lost heartbeat after {beats} beats")));
                }
            }
        }
    })
}

fn load_config() -> anyhow::Result<Config> {
    let mut cfg = match std::env::var(CONFIG_VAR) {
        Ok(path) if !path.trim().is_empty() => Config::from_json_file(&path)
            .with_context(|| format!("loading {CONFIG_VAR}={path}"))?,
        _ => Config::default(),
    };
    cfg.apply_env().context("applying environment overrides")?;
    cfg.services
        .entry("flaky".to_string())
        .or_insert_with(|| serde_json::json!({ "interval_ms": 500, "failure_rate": 0.2 }));
    Ok(cfg)
}

fn init_tracing(pretty: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("servicevisor=info"));
    let fmt = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if pretty {
        fmt.pretty().init();
    } else {
        fmt.init();
    }
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    let mut builder = Runtime::builder(cfg);
    for name in ["alpha", "beta", "flaky"] {
        builder = builder.register(ServiceSpec::new(name, heartbeat))?;
    }
    let rt = builder
        .with_subscribers(vec![Arc::new(LogWriter::new())])
        .build();

    tracing::info!(services = ?rt.registry().names(), "runtime starting");
    rt.run(INITIAL).await?;
    tracing::info!("runtime terminated");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(false);
            tracing::error!(error = %format!("{e:#}"), "configuration failed");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cfg.log_pretty);

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "runtime failed");
            ExitCode::FAILURE
        }
    }
}
