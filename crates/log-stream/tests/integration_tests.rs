//! 통합 테스트 -- 모니터 전체 흐름 검증
//!
//! 버퍼 변경부터 분류 결과 반영, 알림 전송까지의 흐름을 검증합니다.
//! 분류 완료 시점을 제어하기 위해 세마포어로 막아둔 분류기를 사용합니다.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Semaphore, mpsc};

use sentinel_core::pipeline::Pipeline;
use sentinel_core::types::{AttackKind, LogRecord, ThreatVerdict, VerdictSeverity};
use sentinel_log_stream::generator::{generate_attack, generate_benign};
use sentinel_log_stream::{
    AnalysisOutcome, ClassifierClient, HeuristicClassifier, ManualRejection, StreamConfig,
    StreamConfigBuilder, StreamMonitor, StreamMonitorBuilder, ThreatAlert, ThreatClassifier,
};

/// 허가가 주어질 때까지 판정을 보류하는 분류기
struct GatedClassifier {
    gate: Arc<Semaphore>,
    calls: Arc<AtomicUsize>,
}

impl ThreatClassifier for GatedClassifier {
    async fn classify(&self, raw: &str) -> ThreatVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await.expect("gate closed").forget();
        HeuristicClassifier::judge(raw)
    }

    fn provider_name(&self) -> &'static str {
        "gated"
    }

    fn is_offline(&self) -> bool {
        true
    }
}

struct Harness {
    monitor: StreamMonitor<GatedClassifier>,
    alerts: mpsc::Receiver<ThreatAlert>,
    gate: Arc<Semaphore>,
    calls: Arc<AtomicUsize>,
}

async fn harness(config: StreamConfig) -> Harness {
    let gate = Arc::new(Semaphore::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let classifier = GatedClassifier {
        gate: Arc::clone(&gate),
        calls: Arc::clone(&calls),
    };
    let (mut monitor, alerts) = StreamMonitorBuilder::new(classifier)
        .config(config)
        .build()
        .expect("monitor should build");
    monitor.start().await.expect("monitor should start");
    Harness {
        monitor,
        alerts: alerts.expect("builder creates alert channel"),
        gate,
        calls,
    }
}

fn seeded_config() -> StreamConfig {
    StreamConfigBuilder::new()
        .rng_seed(11)
        .build()
        .expect("valid config")
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(3)
}

async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// 정상 레코드 5개는 자동 분류 대상이 아님
#[tokio::test]
async fn test_clean_records_are_not_enriched() {
    let h = harness(seeded_config()).await;
    let mut rng = rng();
    for _ in 0..5 {
        h.monitor.push(generate_benign(&mut rng)).await.unwrap();
    }

    tokio::task::yield_now().await;
    let stats = h.monitor.stats().await;
    assert_eq!(stats.total, 5);
    assert_eq!(stats.pending, 5);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}

/// 인젝션 레코드: Pending -> InFlight -> Complete(위협)
#[tokio::test]
async fn test_injection_record_is_enriched_to_threat() {
    let mut h = harness(seeded_config()).await;
    let record = generate_attack(&mut rng(), AttackKind::SqlInjection);
    assert_eq!(record.status_code, 200);
    let id = h.monitor.push(record).await.unwrap();

    // 비동기 호출 전에 이미 InFlight
    let entry = h.monitor.get(&id).await.unwrap();
    assert!(entry.state.is_analyzing());

    h.gate.add_permits(1);
    let m = &h.monitor;
    let target = id.clone();
    wait_until("verdict applied", || {
        let target = target.clone();
        async move {
            m.get(&target)
                .await
                .is_some_and(|e| e.state.analysis().is_some())
        }
    })
    .await;

    let entry = h.monitor.get(&id).await.unwrap();
    let verdict = entry.state.analysis().unwrap();
    assert!(verdict.is_threat);
    assert_eq!(verdict.severity, VerdictSeverity::Critical);

    let alert = h.alerts.recv().await.expect("threat alert");
    assert_eq!(alert.record_id, id);
    assert_eq!(alert.verdict.confidence_score, 95.0);

    let stats = h.monitor.stats().await;
    assert_eq!(stats.threats, 1);
    assert_eq!(stats.critical, 1);
    assert_eq!(stats.avg_confidence, 95);
}

/// 분류 중 clear_all: 버퍼는 즉시 비고, 늦은 결과는 폐기됨
#[tokio::test]
async fn test_clear_while_in_flight_discards_result() {
    let mut h = harness(seeded_config()).await;
    h.monitor
        .push(generate_attack(&mut rng(), AttackKind::BruteForce))
        .await
        .unwrap();
    assert_eq!(h.monitor.stats().await.in_flight, 1);

    assert_eq!(h.monitor.clear_all().await.unwrap(), 1);
    assert!(h.monitor.snapshot().await.is_empty());

    h.gate.add_permits(1);
    let calls = Arc::clone(&h.calls);
    wait_until("classification called", || {
        let calls = Arc::clone(&calls);
        async move { calls.load(Ordering::SeqCst) == 1 }
    })
    .await;
    // 결과 반영 태스크가 실행될 시간을 줌
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.monitor.snapshot().await.is_empty());
    // 401 레코드는 휴리스틱상 위협이 아니지만, 어쨌든 반영되지 않았으므로 알림 없음
    assert!(h.alerts.try_recv().is_err());
}

/// 분류 중 폐기: 늦은 결과는 버려지고 알림도 새 자동 분류도 없음
#[tokio::test]
async fn test_dispose_while_in_flight_discards_result() {
    let mut h = harness(seeded_config()).await;
    let mut rng = rng();
    h.monitor
        .push(generate_attack(&mut rng, AttackKind::SqlInjection))
        .await
        .unwrap();
    h.monitor
        .push(generate_attack(&mut rng, AttackKind::Xss))
        .await
        .unwrap();
    assert_eq!(h.monitor.stats().await.in_flight, 1);

    h.monitor.stop().await.expect("stop should dispose");
    assert_eq!(h.monitor.state_name().await, "disposed");
    assert!(h.monitor.snapshot().await.is_empty());

    h.gate.add_permits(2);
    let calls = Arc::clone(&h.calls);
    wait_until("classification called", || {
        let calls = Arc::clone(&calls);
        async move { calls.load(Ordering::SeqCst) == 1 }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // SQLi 판정은 위협이지만 폐기된 버퍼에는 반영되지 않음
    assert!(h.monitor.snapshot().await.is_empty());
    assert!(h.alerts.try_recv().is_err());
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert!(
        h.monitor
            .push(generate_attack(&mut rng, AttackKind::PathTraversal))
            .await
            .is_err()
    );
}

/// 자동 분류는 시스템 전체에서 하나씩 진행됨
#[tokio::test]
async fn test_automatic_enrichment_is_serialized() {
    let h = harness(seeded_config()).await;
    let mut rng = rng();
    for kind in AttackKind::ALL {
        h.monitor.push(generate_attack(&mut rng, kind)).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.monitor.stats().await.in_flight, 1);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    // 하나씩 풀어주면 순서대로 모두 완료됨
    h.gate.add_permits(4);
    let m = &h.monitor;
    wait_until("all four verdicts", || async move {
        let stats = m.stats().await;
        stats.pending == 0 && stats.in_flight == 0
    })
    .await;
    assert_eq!(h.calls.load(Ordering::SeqCst), 4);
}

/// 분류 중 축출된 레코드의 결과는 다른 레코드에 영향을 주지 않음
#[tokio::test]
async fn test_eviction_during_flight() {
    let config = StreamConfigBuilder::new()
        .buffer_capacity(2)
        .rng_seed(5)
        .build()
        .unwrap();
    let h = harness(config).await;
    let mut rng = rng();

    let target = h
        .monitor
        .push(generate_attack(&mut rng, AttackKind::PathTraversal))
        .await
        .unwrap();
    h.monitor.push(generate_benign(&mut rng)).await.unwrap();
    h.monitor.push(generate_benign(&mut rng)).await.unwrap();
    assert!(h.monitor.get(&target).await.is_none());

    let before = h.monitor.snapshot().await;
    h.gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.monitor.snapshot().await, before);
    assert_eq!(h.monitor.stats().await.in_flight, 0);
}

/// 수동 분류는 자동 분류와 같은 전환을 사용하고 중복 요청은 거부됨
#[tokio::test]
async fn test_manual_analysis() {
    let h = harness(seeded_config()).await;
    let id = h.monitor.push(generate_benign(&mut rng())).await.unwrap();

    assert_eq!(
        h.monitor.request_analysis(&id).await.unwrap(),
        AnalysisOutcome::Dispatched
    );
    assert_eq!(
        h.monitor.request_analysis(&id).await.unwrap(),
        AnalysisOutcome::Rejected(ManualRejection::AlreadyAnalyzing)
    );

    h.gate.add_permits(1);
    let m = &h.monitor;
    let target = id.clone();
    wait_until("manual verdict", || {
        let target = target.clone();
        async move {
            m.get(&target)
                .await
                .is_some_and(|e| e.state.analysis().is_some())
        }
    })
    .await;

    let verdict = h.monitor.get(&id).await.unwrap().state.analysis().cloned().unwrap();
    assert!(!verdict.is_threat);
    assert_eq!(
        h.monitor.request_analysis(&id).await.unwrap(),
        AnalysisOutcome::Rejected(ManualRejection::AlreadyComplete)
    );
}

/// 주기적 생성: 정지 후에는 새 레코드가 없고, 두 번 정지해도 동일
#[tokio::test(start_paused = true)]
async fn test_emission_loop_start_stop() {
    let config = StreamConfigBuilder::new()
        .emit_interval_ms(1500)
        .attack_ratio(0.0)
        .rng_seed(9)
        .build()
        .unwrap();
    let (mut monitor, _alerts) = StreamMonitorBuilder::new(HeuristicClassifier::new())
        .config(config)
        .build()
        .unwrap();
    monitor.start().await.unwrap();

    assert!(monitor.start_monitoring().await.unwrap());
    assert!(!monitor.start_monitoring().await.unwrap());
    assert!(monitor.is_monitoring());

    tokio::time::sleep(Duration::from_millis(4600)).await;
    assert_eq!(monitor.snapshot().await.len(), 3);

    assert!(monitor.stop_monitoring().await);
    assert!(!monitor.stop_monitoring().await);
    assert!(!monitor.is_monitoring());

    let after_stop = monitor.snapshot().await.len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(monitor.snapshot().await.len(), after_stop);

    monitor.stop().await.unwrap();
}

/// 버퍼 용량은 버스트 크기와 무관하게 유지됨
#[tokio::test]
async fn test_burst_respects_capacity() {
    let config = StreamConfigBuilder::new()
        .buffer_capacity(50)
        .auto_enrich(false)
        .rng_seed(1)
        .build()
        .unwrap();
    let h = harness(config).await;

    let ids = h.monitor.burst(120).await.unwrap();
    let snapshot = h.monitor.snapshot().await;
    assert_eq!(snapshot.len(), 50);
    // 반환된 id는 버퍼에 남은 것들뿐
    assert_eq!(ids.len(), 50);
    assert_eq!(snapshot[0].record.id, ids[49]);
    assert_eq!(snapshot[49].record.id, ids[0]);
    assert_eq!(h.monitor.total_received().await, 120);
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}

/// 설정 기반 클라이언트: 제공자 없이도 전체 흐름이 동작함
#[tokio::test]
async fn test_offline_client_end_to_end() {
    let classifier = ClassifierClient::from_config(&sentinel_core::ClassifierConfig {
        offline_latency_ms: 0,
        ..Default::default()
    })
    .unwrap();
    let (mut monitor, alerts) = StreamMonitorBuilder::new(classifier)
        .config(seeded_config())
        .build()
        .unwrap();
    let mut alerts = alerts.unwrap();
    monitor.start().await.unwrap();

    let record = LogRecord::new(
        "203.0.113.5",
        "POST",
        "/contact<script>alert(document.cookie)</script>",
        200,
        "Suspicious request pattern detected",
        "203.0.113.5 - - [t] \"POST /contact<script>alert(document.cookie)</script> HTTP/1.1\" 200 124 \"curl/7.64.1\"",
    );
    let id = monitor.push(record).await.unwrap();

    let alert = tokio::time::timeout(Duration::from_secs(5), alerts.recv())
        .await
        .expect("alert in time")
        .expect("alert");
    assert_eq!(alert.record_id, id);
    assert_eq!(alert.verdict.severity, VerdictSeverity::Critical);

    monitor.stop().await.unwrap();
    assert!(monitor.snapshot().await.is_empty());
}
