use anyhow::Context;
use backend::{DemoBackend, HttpBackend};
use bridge::server::KioskBridge;
use clap::{Parser, ValueEnum};
use config::{BackendConfig, KioskConfig};
use runner::Runner;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use streckcore::prelude::{SecondUserPolicy, StreckService};
use streckcore::sync::EventBus;
use streckcore::KioskApp;
use tokio::io::BufReader;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;

mod backend;
mod bridge;
mod config;
mod runner;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    Replace,
    Reject,
}

impl From<Policy> for SecondUserPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Replace => SecondUserPolicy::Replace,
            Policy::Reject => SecondUserPolicy::Reject,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Strecka self-service kiosk driven by scanner input on stdin")]
struct Args {
    /// Load a kiosk config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    countdown_seconds: Option<u32>,
    /// What a second user scan does while a session is open
    #[arg(long, value_enum)]
    policy: Option<Policy>,
    /// Talk to a remote balance/stock service instead of the demo directory
    #[arg(long)]
    backend_url: Option<String>,
    /// Seed for the demo directory
    #[arg(long)]
    seed: Option<u64>,
    /// Publish kiosk state over HTTP for a renderer
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    bridge_addr: Option<SocketAddr>,
}

impl Args {
    fn resolve_config(&self) -> anyhow::Result<KioskConfig> {
        let mut config = match &self.config {
            Some(path) => KioskConfig::load(path)?,
            None => KioskConfig::default(),
        };
        if let Some(seconds) = self.countdown_seconds {
            config.countdown_seconds = seconds;
        }
        if let Some(policy) = self.policy {
            config.second_user_policy = policy.into();
        }
        if let Some(url) = &self.backend_url {
            config.backend = BackendConfig::Http {
                base_url: url.clone(),
            };
        }
        if let Some(seed) = self.seed {
            if let BackendConfig::Demo(demo) = &mut config.backend {
                demo.seed = seed;
            }
        }
        if let Some(addr) = self.bridge_addr {
            config.bridge_addr = addr;
        }
        Ok(config)
    }
}

fn build_service(config: &KioskConfig, bus: &EventBus) -> Arc<dyn StreckService> {
    match &config.backend {
        BackendConfig::Demo(demo) => {
            let backend = DemoBackend::new(demo, bus.clone());
            for (code, label) in backend.codes() {
                println!("[KIOSK] {} -> {}", code, label);
            }
            Arc::new(backend)
        }
        BackendConfig::Http { base_url } => {
            let backend = HttpBackend::new(base_url.clone());
            println!("[KIOSK] using service at {}", backend.base_url());
            Arc::new(backend)
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.resolve_config()?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating kiosk runtime")?;

    runtime.block_on(async {
        let bus = EventBus::new();
        let service = build_service(&config, &bus);
        let app = Arc::new(KioskApp::start(service, bus, config.to_settings()));

        let bridge = if args.serve {
            let bridge = KioskBridge::start(Arc::clone(&app), config.bridge_addr)?;
            bridge.publish_status(&format!("serving kiosk state on http://{}", bridge.addr()));
            Some(bridge)
        } else {
            None
        };

        let runner = Runner::new(Arc::clone(&app));
        let stdin = BufReader::new(tokio::io::stdin());
        let outcome = tokio::select! {
            summary = runner.run(stdin) => summary.map(Some),
            interrupted = signal::ctrl_c() => interrupted.map(|()| None).context("awaiting Ctrl+C"),
        };

        if let Some(bridge) = bridge {
            bridge.stop().await;
        }
        app.shutdown().await;

        if let Some(summary) = outcome? {
            println!(
                "[KIOSK] {} codes scanned, {} failed",
                summary.codes, summary.failures
            );
        }
        Ok::<(), anyhow::Error>(())
    })
}
