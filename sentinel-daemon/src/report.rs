//! Periodic status reporting and threat alert logging.
//!
//! The status line mirrors the dashboard header: a LIVE/STANDBY indicator
//! followed by the derived counters of the current buffer window.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sentinel_core::metrics as m;
use sentinel_core::pipeline::Pipeline;
use sentinel_log_stream::{StreamMonitor, StreamStats, ThreatAlert, ThreatClassifier};

/// Render the one-line status summary.
pub fn format_status(monitoring: bool, stats: &StreamStats) -> String {
    let indicator = if monitoring { "LIVE" } else { "STANDBY" };
    format!(
        "{indicator} | total {} | threats {} | critical {} | avg confidence {}% | analyzing {} | \
         normal/suspicious/critical {}/{}/{}",
        stats.total,
        stats.threats,
        stats.critical,
        stats.avg_confidence,
        stats.in_flight,
        stats.distribution.normal,
        stats.distribution.suspicious,
        stats.distribution.critical,
    )
}

/// Spawn a task that logs the status line and health every `interval`.
pub fn spawn_report_task<C: ThreatClassifier>(
    monitor: StreamMonitor<C>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let started = Instant::now();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("status report task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let stats = monitor.stats().await;
                    let health = monitor.health_check().await;
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(started.elapsed().as_secs_f64());
                    tracing::info!(
                        health = %health,
                        total = stats.total,
                        threats = stats.threats,
                        in_flight = stats.in_flight,
                        "{}",
                        format_status(monitor.is_monitoring(), &stats)
                    );
                }
            }
        }
    })
}

/// Spawn a task that logs every threat alert produced by the monitor.
pub fn spawn_alert_logger(
    mut alert_rx: mpsc::Receiver<ThreatAlert>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                alert = alert_rx.recv() => {
                    let Some(alert) = alert else { break };
                    tracing::warn!(
                        alert_id = %alert.id,
                        record = %alert.record_id,
                        source_ip = %alert.source_ip,
                        endpoint = %alert.endpoint,
                        severity = %alert.verdict.severity,
                        threat_type = alert.verdict.threat_type.as_deref().unwrap_or("-"),
                        confidence = alert.verdict.confidence_score,
                        "threat detected: {}",
                        alert.verdict.summary
                    );
                }
            }
        }
    })
}
