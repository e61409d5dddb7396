use std::{collections::HashSet, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use host_integration::sim::{PhaseMark, SimulatedSite};
use serde_json::{json, Value};
use shared::domain::NavigationData;
use tokio::time::Instant;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transition_core::{
    load_settings, load_settings_from, registry::FALLBACK_NAMESPACE, AppSession, MountContext,
    PageController, PageHandle,
};

#[derive(Parser, Debug)]
#[command(about = "Run page transitions against a simulated site and print the timeline")]
struct Args {
    /// Settings file; defaults to ./transitions.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Namespaces to visit; the first one is the initial page load.
    #[arg(long, value_delimiter = ',', default_value = "Home,Team,Insights")]
    route: Vec<String>,
    /// Namespaces whose controller never signals readiness.
    #[arg(long)]
    silent: Vec<String>,
    #[arg(long)]
    no_animator: bool,
    /// How long a page controller takes before signaling readiness.
    #[arg(long, default_value_t = 120)]
    ready_delay_ms: u64,
    #[arg(long)]
    debug: bool,
}

/// Stand-in for every page script: signals readiness after a fixed delay unless its namespace
/// is listed as silent.
struct DemoController {
    silent: HashSet<String>,
    ready_delay: Duration,
}

impl PageController for DemoController {
    fn init(&self, ctx: MountContext) -> Result<PageHandle> {
        let namespace = ctx.namespace.clone();
        if self.silent.contains(namespace.as_str()) {
            info!(%namespace, "demo controller: staying silent");
            return Ok(PageHandle::noop());
        }

        let ready = ctx.ready.clone();
        let delay = self.ready_delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !ready.signal() {
                info!(token = ready.token().0, "demo controller: signal was stale");
            }
        });
        Ok(PageHandle::new(move || {
            timer.abort();
            info!(%namespace, "demo controller: disposed");
            Ok(())
        }))
    }
}

fn print_line(line: &Value) {
    match serde_json::to_string(line) {
        Ok(encoded) => println!("{encoded}"),
        Err(err) => warn!(%err, "failed to encode timeline entry"),
    }
}

fn mark_line(origin: Instant, mark: &PhaseMark) -> Value {
    json!({
        "navigation": mark.navigation,
        "phase": mark.phase,
        "started_ms": mark.started.duration_since(origin).as_millis() as u64,
        "finished_ms": mark.finished.duration_since(origin).as_millis() as u64,
        "timed_out": mark.timed_out,
    })
}

fn navigation_line(origin: Instant, data: &NavigationData) -> Value {
    json!({
        "at_ms": origin.elapsed().as_millis() as u64,
        "navigation": data,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => load_settings_from(Some(path.as_path())),
        None => load_settings(),
    }
    .context("failed to load transition settings")?;
    settings.debug |= args.debug;

    let default_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some((first, rest)) = args.route.split_first() else {
        bail!("--route needs at least one namespace");
    };

    let site = SimulatedSite::build();
    let bindings = if args.no_animator {
        site.bindings_without_animator()
    } else {
        site.bindings()
    };
    let session = AppSession::new(settings, bindings);
    session.register_controller(
        FALLBACK_NAMESPACE,
        Arc::new(DemoController {
            silent: args.silent.iter().cloned().collect(),
            ready_delay: Duration::from_millis(args.ready_delay_ms),
        }),
    );

    let origin = Instant::now();
    let mut events = BroadcastStream::new(session.subscribe());
    let printer = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => print_line(&json!({
                    "at_ms": origin.elapsed().as_millis() as u64,
                    "dom_events": event.dom_event_names(),
                    "event": event,
                })),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "timeline printer fell behind");
                }
            }
        }
    });

    session
        .wire_transitions()
        .context("failed to wire page transitions")?;

    let data = site.router.boot(first).await?;
    print_line(&navigation_line(origin, &data));
    for namespace in rest {
        let data = site.router.navigate(namespace).await?;
        print_line(&navigation_line(origin, &data));
    }

    // Give delayed overlay removal, scroll unlock and resize dispatch a chance to run.
    tokio::time::sleep(Duration::from_secs(2)).await;
    for mark in site.router.marks() {
        print_line(&mark_line(origin, &mark));
    }
    info!(
        live = ?session.registry().live_namespaces(),
        overlay_covering = site.overlay_covering(),
        "simulation finished"
    );

    session.shutdown();
    printer.abort();
    Ok(())
}
