//! 스트림 모니터 -- 버퍼/스케줄러/생성 루프/분류기의 전체 흐름을 관리합니다.
//!
//! [`StreamMonitor`]는 core의 [`Pipeline`] trait을 구현하여
//! `sentinel-daemon`에서 `Initialized → Active → Disposed` 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! EmissionLoop ─┐
//! burst/push ───┼─> StreamBuffer ──(BufferChange)──> EnrichmentScheduler
//!               │        ^                                 │ Dispatch
//!               │        └──── update_by_id ◄── spawn ◄────┘ (ThreatClassifier)
//!               │                                  │
//!               │                                  └─> ThreatAlert ─> mpsc ─> downstream
//! ```
//!
//! 모든 버퍼 변경은 하나의 `tokio::sync::Mutex` 아래에서 순서대로 실행되며,
//! 스케줄러의 대상 선정과 `InFlight` 전환도 변경을 일으킨 같은 잠금 구간에서
//! 일어납니다. 분류 호출은 잠금 밖의 별도 태스크에서 실행됩니다.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};

use sentinel_core::error::{PipelineError, SentinelError};
use sentinel_core::metrics as m;
use sentinel_core::pipeline::{HealthStatus, Pipeline};
use sentinel_core::types::{LogRecord, RecordId, ThreatVerdict, now_iso8601};

use crate::buffer::{BufferChange, BufferedRecord, StreamBuffer};
use crate::classifier::ThreatClassifier;
use crate::config::StreamConfig;
use crate::emitter::EmissionLoop;
use crate::error::LogStreamError;
use crate::generator::{TrafficMix, generate_random};
use crate::scheduler::{Completion, Dispatch, EnrichmentScheduler, ManualRejection};
use crate::stats::StreamStats;

/// 한 번의 버스트로 생성할 수 있는 최대 레코드 수
pub const MAX_BURST: usize = 10_000;

/// 위협 판정 알림
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAlert {
    /// 알림 id (UUID v4)
    pub id: String,
    /// 대상 레코드 id
    pub record_id: RecordId,
    /// 요청 출발지 IP
    pub source_ip: String,
    /// 요청 경로
    pub endpoint: String,
    /// 판정
    pub verdict: ThreatVerdict,
    /// 알림 생성 시각
    pub created_at: String,
}

impl ThreatAlert {
    fn new(record: &LogRecord, verdict: &ThreatVerdict) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            record_id: record.id.clone(),
            source_ip: record.source_ip.clone(),
            endpoint: record.endpoint.clone(),
            verdict: verdict.clone(),
            created_at: now_iso8601(),
        }
    }
}

/// 수동 분류 요청 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// 분류 요청 발송됨
    Dispatched,
    /// 요청 거부됨
    Rejected(ManualRejection),
}

/// 모니터 생명주기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 명령 수신 가능
    Active,
    /// 폐기됨
    Disposed,
}

/// 잠금 아래에서 변경되는 상태
struct StreamState {
    lifecycle: Lifecycle,
    buffer: StreamBuffer,
    scheduler: EnrichmentScheduler,
    /// 버스트 생성용 난수 생성기
    rng: StdRng,
}

impl StreamState {
    fn ensure_active(&self) -> Result<(), LogStreamError> {
        match self.lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::Initialized => Err(LogStreamError::NotActive),
            Lifecycle::Disposed => Err(LogStreamError::Disposed),
        }
    }

    /// 버퍼 변경을 기록하고 스케줄러를 반응시킵니다.
    fn on_change(&mut self, change: &BufferChange) -> Option<Dispatch> {
        match change {
            BufferChange::Pushed(_) => {
                metrics::counter!(m::STREAM_RECORDS_PUSHED_TOTAL).increment(1);
            }
            BufferChange::Evicted { was_in_flight, .. } => {
                metrics::counter!(m::STREAM_RECORDS_PUSHED_TOTAL).increment(1);
                metrics::counter!(m::STREAM_RECORDS_EVICTED_TOTAL).increment(1);
                if *was_in_flight {
                    tracing::debug!("evicted record had an outstanding classification");
                }
            }
            BufferChange::Updated(_) | BufferChange::Cleared { .. } => {}
        }
        metrics::gauge!(m::STREAM_BUFFER_SIZE).set(self.buffer.len() as f64);

        if self.lifecycle != Lifecycle::Active {
            return None;
        }
        self.scheduler.react(&mut self.buffer)
    }
}

struct Shared<C> {
    config: StreamConfig,
    classifier: C,
    state: Mutex<StreamState>,
    emission: Mutex<EmissionLoop>,
    monitoring: AtomicBool,
    alert_tx: mpsc::Sender<ThreatAlert>,
}

/// 로그 스트림 모니터
///
/// 복제본은 같은 상태를 공유하므로 콘솔 등 다른 태스크에 넘겨 명령을 보낼 수 있습니다.
///
/// # 사용 예시
/// ```ignore
/// use sentinel_log_stream::{ClassifierClient, StreamMonitorBuilder};
///
/// let classifier = ClassifierClient::from_config(&config.classifier)?;
/// let (mut monitor, alert_rx) = StreamMonitorBuilder::new(classifier)
///     .config(StreamConfig::from_core(&config.stream))
///     .build()?;
///
/// monitor.start().await?;
/// monitor.start_monitoring().await?;
/// ```
pub struct StreamMonitor<C: ThreatClassifier> {
    shared: Arc<Shared<C>>,
}

impl<C: ThreatClassifier> Clone for StreamMonitor<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ThreatClassifier> StreamMonitor<C> {
    /// 현재 생명주기 상태명을 반환합니다.
    pub async fn state_name(&self) -> &'static str {
        match self.shared.state.lock().await.lifecycle {
            Lifecycle::Initialized => "initialized",
            Lifecycle::Active => "active",
            Lifecycle::Disposed => "disposed",
        }
    }

    /// 주기적 생성이 켜져 있는지 확인합니다.
    pub fn is_monitoring(&self) -> bool {
        self.shared.monitoring.load(Ordering::SeqCst)
    }

    /// 분류기에 대한 참조를 반환합니다.
    pub fn classifier(&self) -> &C {
        &self.shared.classifier
    }

    /// 스트림 설정을 반환합니다.
    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    /// 주기적 레코드 생성을 시작합니다.
    ///
    /// 이미 켜져 있으면 `Ok(false)`를 반환하며 아무 것도 바꾸지 않습니다.
    pub async fn start_monitoring(&self) -> Result<bool, LogStreamError> {
        // 잠금 순서: emission -> state. 폐기와 경합하지 않도록 emission을 쥔 채로 확인
        let mut emission = self.shared.emission.lock().await;
        self.shared.state.lock().await.ensure_active()?;
        if emission.is_running() {
            return Ok(false);
        }

        let config = &self.shared.config;
        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        let mix = TrafficMix::new(config.attack_ratio);
        let weak: Weak<Shared<C>> = Arc::downgrade(&self.shared);

        emission.start(config.emit_interval(), move || {
            let record = generate_random(&mut rng, mix);
            let shared = weak.upgrade();
            async move {
                if let Some(shared) = shared {
                    if let Err(e) = push_record(&shared, record).await {
                        tracing::debug!(error = %e, "periodic record dropped");
                    }
                }
            }
        });

        self.shared.monitoring.store(true, Ordering::SeqCst);
        tracing::info!(
            interval_ms = config.emit_interval_ms,
            attack_ratio = config.attack_ratio,
            "monitoring started"
        );
        Ok(true)
    }

    /// 주기적 레코드 생성을 정지합니다.
    ///
    /// 반환 이후에는 새 레코드가 생성되지 않습니다. 이미 발송된 분류는 취소되지 않습니다.
    /// 정지되어 있었다면 `false`를 반환합니다.
    pub async fn stop_monitoring(&self) -> bool {
        let mut emission = self.shared.emission.lock().await;
        let stopped = emission.stop().await;
        self.shared.monitoring.store(false, Ordering::SeqCst);
        if stopped {
            tracing::info!("monitoring stopped");
        }
        stopped
    }

    /// 레코드 하나를 버퍼에 넣습니다.
    pub async fn push(&self, record: LogRecord) -> Result<RecordId, LogStreamError> {
        push_record(&self.shared, record).await
    }

    /// `n`개의 레코드를 즉시 생성해 버퍼에 넣습니다.
    ///
    /// 각 레코드는 `burst_attack_ratio` 확률로 공격 레코드가 됩니다.
    /// `n`은 [`MAX_BURST`] 이하여야 합니다. 반환값은 버스트 직후 버퍼에 남아 있는
    /// id(최대 `n.min(capacity)`개)이며 생성 순서를 따릅니다.
    pub async fn burst(&self, n: usize) -> Result<Vec<RecordId>, LogStreamError> {
        if n > MAX_BURST {
            return Err(LogStreamError::BurstTooLarge {
                requested: n,
                max: MAX_BURST,
            });
        }

        let mix = TrafficMix::new(self.shared.config.burst_attack_ratio);
        let mut dispatches = Vec::new();

        let ids = {
            let mut state = self.shared.state.lock().await;
            state.ensure_active()?;
            let kept = n.min(state.buffer.capacity());
            let mut ids = VecDeque::with_capacity(kept);
            for _ in 0..n {
                let record = generate_random(&mut state.rng, mix);
                if ids.len() == kept {
                    ids.pop_front();
                }
                ids.push_back(record.id.clone());
                let change = state.buffer.push(record);
                dispatches.extend(state.on_change(&change));
            }
            ids
        };

        tracing::info!(count = n, buffered = ids.len(), "burst generated");
        for dispatch in dispatches {
            spawn_enrichment(Arc::clone(&self.shared), dispatch);
        }
        Ok(ids.into())
    }

    /// 특정 레코드의 분류를 즉시 요청합니다.
    pub async fn request_analysis(&self, id: &RecordId) -> Result<AnalysisOutcome, LogStreamError> {
        let dispatch = {
            let mut state = self.shared.state.lock().await;
            state.ensure_active()?;
            let state = &mut *state;
            match state.scheduler.request_manual(&mut state.buffer, id) {
                Ok(dispatch) => dispatch,
                Err(rejection) => {
                    tracing::debug!(id = %id, reason = %rejection, "manual analysis rejected");
                    return Ok(AnalysisOutcome::Rejected(rejection));
                }
            }
        };

        spawn_enrichment(Arc::clone(&self.shared), dispatch);
        Ok(AnalysisOutcome::Dispatched)
    }

    /// 버퍼를 비웁니다. 진행 중인 분류 결과는 도착 시 폐기됩니다.
    pub async fn clear_all(&self) -> Result<usize, LogStreamError> {
        let mut state = self.shared.state.lock().await;
        state.ensure_active()?;
        let change = state.buffer.clear();
        let dispatch = state.on_change(&change);
        debug_assert!(dispatch.is_none());

        let removed = match change {
            BufferChange::Cleared { removed } => removed,
            _ => 0,
        };
        tracing::info!(removed, "stream buffer cleared");
        Ok(removed)
    }

    /// 최신순 스냅샷을 반환합니다.
    pub async fn snapshot(&self) -> Vec<BufferedRecord> {
        self.shared.state.lock().await.buffer.snapshot()
    }

    /// id로 레코드를 조회합니다.
    pub async fn get(&self, id: &RecordId) -> Option<BufferedRecord> {
        self.shared.state.lock().await.buffer.get(id).cloned()
    }

    /// 파생 통계를 계산합니다.
    pub async fn stats(&self) -> StreamStats {
        StreamStats::from_entries(self.shared.state.lock().await.buffer.iter())
    }

    /// 지금까지 버퍼에 들어온 레코드 수를 반환합니다.
    pub async fn total_received(&self) -> u64 {
        self.shared.state.lock().await.buffer.total_received()
    }
}

/// 레코드를 넣고, 선정된 분류를 잠금 밖에서 발송합니다.
async fn push_record<C: ThreatClassifier>(
    shared: &Arc<Shared<C>>,
    record: LogRecord,
) -> Result<RecordId, LogStreamError> {
    let id = record.id.clone();
    let dispatch = {
        let mut state = shared.state.lock().await;
        state.ensure_active()?;
        let change = state.buffer.push(record);
        state.on_change(&change)
    };

    if let Some(dispatch) = dispatch {
        spawn_enrichment(Arc::clone(shared), dispatch);
    }
    Ok(id)
}

/// 분류를 별도 태스크에서 실행하고 결과를 반영합니다.
fn spawn_enrichment<C: ThreatClassifier>(shared: Arc<Shared<C>>, dispatch: Dispatch) {
    metrics::counter!(m::STREAM_ENRICHMENTS_DISPATCHED_TOTAL, m::LABEL_TRIGGER => dispatch.trigger.as_str())
        .increment(1);

    tokio::spawn(async move {
        let verdict = shared.classifier.classify(&dispatch.raw).await;
        if let Some(next) = finish_enrichment(&shared, &dispatch, verdict).await {
            spawn_enrichment(shared, next);
        }
    });
}

/// 판정을 반영하고, 다음 자동 분류 대상을 선정합니다.
async fn finish_enrichment<C: ThreatClassifier>(
    shared: &Shared<C>,
    dispatch: &Dispatch,
    verdict: ThreatVerdict,
) -> Option<Dispatch> {
    let mut state = shared.state.lock().await;
    let state = &mut *state;
    let severity = verdict.severity;

    match state.scheduler.complete(&mut state.buffer, dispatch, verdict) {
        Completion::Applied => {
            metrics::counter!(
                m::STREAM_ENRICHMENTS_APPLIED_TOTAL,
                m::LABEL_SEVERITY => severity.as_str()
            )
            .increment(1);

            if let Some(entry) = state.buffer.get(&dispatch.id) {
                if let Some(verdict) = entry.state.analysis() {
                    tracing::info!(
                        id = %dispatch.id,
                        trigger = dispatch.trigger.as_str(),
                        severity = %verdict.severity,
                        is_threat = verdict.is_threat,
                        confidence = verdict.confidence_score,
                        "verdict applied"
                    );
                    if verdict.is_threat {
                        send_alert(&shared.alert_tx, ThreatAlert::new(&entry.record, verdict));
                    }
                }
            }
        }
        Completion::Discarded => {
            metrics::counter!(m::STREAM_ENRICHMENTS_DISCARDED_TOTAL).increment(1);
        }
    }

    state.on_change(&BufferChange::Updated(dispatch.id.clone()))
}

fn send_alert(tx: &mpsc::Sender<ThreatAlert>, alert: ThreatAlert) {
    match tx.try_send(alert) {
        Ok(()) => {
            metrics::counter!(m::STREAM_ALERTS_SENT_TOTAL).increment(1);
        }
        Err(mpsc::error::TrySendError::Full(alert)) => {
            tracing::warn!(record = %alert.record_id, "alert channel full, dropping threat alert");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("alert receiver closed");
        }
    }
}

impl<C: ThreatClassifier> Pipeline for StreamMonitor<C> {
    async fn start(&mut self) -> Result<(), SentinelError> {
        let mut state = self.shared.state.lock().await;
        match state.lifecycle {
            Lifecycle::Active => return Err(PipelineError::AlreadyRunning.into()),
            Lifecycle::Disposed => return Err(PipelineError::Disposed.into()),
            Lifecycle::Initialized => {}
        }

        state.lifecycle = Lifecycle::Active;
        tracing::info!(
            capacity = state.buffer.capacity(),
            classifier = self.shared.classifier.provider_name(),
            auto_enrich = self.shared.config.auto_enrich,
            "stream monitor started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SentinelError> {
        let mut emission = self.shared.emission.lock().await;
        {
            let mut state = self.shared.state.lock().await;
            if state.lifecycle != Lifecycle::Active {
                return Err(PipelineError::NotRunning.into());
            }

            tracing::info!("stopping stream monitor");
            state.lifecycle = Lifecycle::Disposed;
            let change = state.buffer.clear();
            state.on_change(&change);

            tracing::info!(
                total_received = state.buffer.total_received(),
                evicted = state.buffer.evicted_count(),
                "stream monitor disposed"
            );
        }

        // 틱이 state 잠금을 기다릴 수 있으므로 state 잠금을 푼 뒤 정지
        if emission.stop().await {
            tracing::info!("monitoring stopped");
        }
        self.shared.monitoring.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        let lifecycle = self.shared.state.lock().await.lifecycle;
        match lifecycle {
            Lifecycle::Active if self.shared.classifier.is_offline() => {
                HealthStatus::Degraded("classifier running in offline heuristic mode".to_owned())
            }
            Lifecycle::Active => HealthStatus::Healthy,
            Lifecycle::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            Lifecycle::Disposed => HealthStatus::Unhealthy("disposed".to_owned()),
        }
    }
}

/// 스트림 모니터 빌더
///
/// 모니터를 구성하고 알림 채널을 생성합니다.
pub struct StreamMonitorBuilder<C: ThreatClassifier> {
    classifier: C,
    config: StreamConfig,
    alert_tx: Option<mpsc::Sender<ThreatAlert>>,
}

impl<C: ThreatClassifier> StreamMonitorBuilder<C> {
    /// 분류기를 지정해 새 빌더를 생성합니다.
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            config: StreamConfig::default(),
            alert_tx: None,
        }
    }

    /// 스트림 설정을 지정합니다.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// 외부 알림 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 `alert_channel_capacity` 용량의 새 채널을 생성합니다.
    pub fn alert_sender(mut self, tx: mpsc::Sender<ThreatAlert>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    /// 모니터를 빌드합니다.
    ///
    /// # Returns
    /// - `StreamMonitor`: 모니터 인스턴스
    /// - `Option<mpsc::Receiver<ThreatAlert>>`: 알림 수신 채널
    ///   (외부 alert_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(StreamMonitor<C>, Option<mpsc::Receiver<ThreatAlert>>), LogStreamError> {
        self.config.validate()?;

        let (alert_tx, alert_rx) = match self.alert_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.alert_channel_capacity);
                (tx, Some(rx))
            }
        };

        let rng = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let state = StreamState {
            lifecycle: Lifecycle::Initialized,
            buffer: StreamBuffer::new(self.config.buffer_capacity),
            scheduler: EnrichmentScheduler::new(self.config.auto_enrich),
            rng,
        };

        let monitor = StreamMonitor {
            shared: Arc::new(Shared {
                config: self.config,
                classifier: self.classifier,
                state: Mutex::new(state),
                emission: Mutex::new(EmissionLoop::new()),
                monitoring: AtomicBool::new(false),
                alert_tx,
            }),
        };

        Ok((monitor, alert_rx))
    }
}
