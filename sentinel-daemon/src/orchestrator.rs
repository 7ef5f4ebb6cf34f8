//! Monitor orchestration -- assembly, background tasks, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `sentinel-daemon`.
//! It loads configuration, builds the classifier and the stream monitor,
//! starts the emission loop and runs the main event loop until a signal
//! arrives or the operator quits from the console.
//!
//! # Startup Order
//!
//! 1. Stream monitor `start()` (Initialized -> Active)
//! 2. Emission loop, unless started in standby
//! 3. Optional initial burst
//! 4. Alert logger, status reporter, operator console
//!
//! # Shutdown Order
//!
//! 1. Cancel background tasks
//! 2. Stream monitor `stop()` (stops emission, discards the buffer)

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sentinel_core::config::SentinelConfig;
use sentinel_core::pipeline::{HealthStatus, Pipeline};
use sentinel_log_stream::{
    ClassifierClient, MAX_BURST, StreamConfig, StreamMonitor, StreamMonitorBuilder, ThreatAlert,
};

use crate::cli::DaemonCli;
use crate::{console, metrics_server, report};

/// Runtime switches that do not belong to the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Leave the emission loop off after startup.
    pub standby: bool,
    /// Records to push right after startup.
    pub initial_burst: Option<usize>,
    /// Status line period; `None` disables the reporter.
    pub report_interval: Option<Duration>,
    /// Read operator commands from stdin.
    pub console: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            standby: false,
            initial_burst: None,
            report_interval: Some(Duration::from_secs(10)),
            console: true,
        }
    }
}

impl RunOptions {
    /// Derive run options from command-line flags.
    pub fn from_cli(cli: &DaemonCli) -> Self {
        Self {
            standby: cli.standby,
            initial_burst: cli.burst.filter(|n| *n > 0).map(|n| n.min(MAX_BURST)),
            report_interval: (cli.report_interval_secs > 0)
                .then(|| Duration::from_secs(cli.report_interval_secs)),
            console: !cli.no_console,
        }
    }
}

/// Load configuration for the daemon.
///
/// With a path the file is read, environment overrides are applied and the
/// result is validated. Without one the built-in defaults are used with the
/// same override and validation steps. CLI log overrides win over both.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the final
/// configuration is invalid.
pub async fn load_config(path: Option<&Path>, cli: &DaemonCli) -> Result<SentinelConfig> {
    let mut config = match path {
        Some(path) => SentinelConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e))?,
        None => {
            let mut config = SentinelConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: SentinelConfig,
    /// The stream monitor. Clones share the same state.
    monitor: StreamMonitor<ClassifierClient>,
    /// Alert receiver, taken by the alert logger on `run()`.
    alert_rx: Option<mpsc::Receiver<ThreatAlert>>,
    /// Cancels every background task; also fired by the console `quit`.
    shutdown: CancellationToken,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from `config_path` and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = SentinelConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Installs the metrics recorder when enabled, then builds the classifier
    /// client and the stream monitor.
    pub fn build_from_config(config: SentinelConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let classifier = ClassifierClient::from_config(&config.classifier)
            .map_err(|e| anyhow::anyhow!("failed to build classifier: {}", e))?;

        let stream_config = StreamConfig::from_core(&config.stream);
        let (monitor, alert_rx) = StreamMonitorBuilder::new(classifier)
            .config(stream_config)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build stream monitor: {}", e))?;

        tracing::info!(
            buffer_capacity = config.stream.buffer_capacity,
            emit_interval_ms = config.stream.emit_interval_ms,
            auto_enrich = config.stream.auto_enrich,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            monitor,
            alert_rx,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        })
    }

    /// Start the monitor and apply the startup options.
    ///
    /// Split from [`run`](Self::run) so the startup sequence can be driven
    /// without waiting for a signal.
    pub async fn start(&mut self, options: &RunOptions) -> Result<()> {
        self.monitor
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start stream monitor: {}", e))?;

        if options.standby {
            tracing::info!("starting in standby, emission loop is off");
        } else {
            self.monitor
                .start_monitoring()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start monitoring: {}", e))?;
        }

        if let Some(n) = options.initial_burst {
            let ids = self
                .monitor
                .burst(n)
                .await
                .map_err(|e| anyhow::anyhow!("initial burst failed: {}", e))?;
            tracing::info!(records = ids.len(), "initial burst pushed");
        }
        Ok(())
    }

    /// Start the monitor and enter the main event loop.
    ///
    /// Blocks until SIGTERM, SIGINT or a console `quit`.
    pub async fn run(&mut self, options: RunOptions) -> Result<()> {
        self.start(&options).await?;

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        if let Some(alert_rx) = self.alert_rx.take() {
            tasks.push(report::spawn_alert_logger(alert_rx, self.shutdown.clone()));
        }

        if let Some(interval) = options.report_interval {
            tasks.push(report::spawn_report_task(
                self.monitor.clone(),
                interval,
                self.shutdown.clone(),
            ));
        }

        // Not joined on shutdown: a pending stdin read holds the task until
        // the next line arrives.
        if options.console {
            let monitor = self.monitor.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                let input = tokio::io::BufReader::new(tokio::io::stdin());
                if let Err(e) =
                    console::run_console(monitor, input, tokio::io::stdout(), shutdown).await
                {
                    tracing::warn!(error = %e, "operator console stopped");
                }
            });
        }

        tracing::info!("entering main event loop");
        let reason = tokio::select! {
            signal = wait_for_shutdown_signal() => signal?,
            _ = self.shutdown.cancelled() => "console",
        };
        tracing::info!(reason = reason, "shutdown requested");

        self.shutdown.cancel();
        for task in tasks {
            let _ = task.await;
        }

        self.shutdown().await
    }

    /// Stop the monitor.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            total_received = self.monitor.total_received().await,
            "stopping stream monitor"
        );
        self.shutdown.cancel();
        self.monitor.stop().await.map_err(|e| e.into())
    }

    /// Current monitor health.
    pub async fn health(&self) -> HealthStatus {
        self.monitor.health_check().await
    }

    /// Handle to the stream monitor.
    pub fn monitor(&self) -> &StreamMonitor<ClassifierClient> {
        &self.monitor
    }

    /// Token that stops the daemon when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
