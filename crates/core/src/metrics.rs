//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `sentinel_`
//! - 모듈명: `stream_`, `classifier_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (info, warning, error, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 분류 요청 경로 레이블 키 (auto, manual)
pub const LABEL_TRIGGER: &str = "trigger";

/// 분류 제공자 레이블 키 (gemini, offline)
pub const LABEL_PROVIDER: &str = "provider";

// ─── Stream 메트릭 ──────────────────────────────────────────────────

/// Stream: 버퍼에 추가된 레코드 수 (counter)
pub const STREAM_RECORDS_PUSHED_TOTAL: &str = "sentinel_stream_records_pushed_total";

/// Stream: 용량 초과로 축출된 레코드 수 (counter)
pub const STREAM_RECORDS_EVICTED_TOTAL: &str = "sentinel_stream_records_evicted_total";

/// Stream: 현재 버퍼 내 레코드 수 (gauge)
pub const STREAM_BUFFER_SIZE: &str = "sentinel_stream_buffer_size";

/// Stream: 분류 요청 발송 수 (counter, label: trigger)
pub const STREAM_ENRICHMENTS_DISPATCHED_TOTAL: &str =
    "sentinel_stream_enrichments_dispatched_total";

/// Stream: 버퍼에 반영된 판정 수 (counter, label: severity)
pub const STREAM_ENRICHMENTS_APPLIED_TOTAL: &str = "sentinel_stream_enrichments_applied_total";

/// Stream: 대상 레코드가 사라져 폐기된 판정 수 (counter)
pub const STREAM_ENRICHMENTS_DISCARDED_TOTAL: &str =
    "sentinel_stream_enrichments_discarded_total";

/// Stream: 전송된 위협 알림 수 (counter)
pub const STREAM_ALERTS_SENT_TOTAL: &str = "sentinel_stream_alerts_sent_total";

// ─── Classifier 메트릭 ──────────────────────────────────────────────

/// Classifier: 분류 실패(ERROR 판정) 수 (counter)
pub const CLASSIFIER_FAILURES_TOTAL: &str = "sentinel_classifier_failures_total";

/// Classifier: 분류 소요 시간 (histogram, 초, label: provider)
pub const CLASSIFIER_DURATION_SECONDS: &str = "sentinel_classifier_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "sentinel_daemon_uptime_seconds";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 분류 소요 시간 히스토그램 버킷 (초)
///
/// 원격 제공자 호출은 수백 ms ~ 수십 초 범위
pub const CLASSIFIER_DURATION_BUCKETS: [f64; 9] = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Stream
    describe_counter!(
        STREAM_RECORDS_PUSHED_TOTAL,
        "Total number of log records pushed into the stream buffer"
    );
    describe_counter!(
        STREAM_RECORDS_EVICTED_TOTAL,
        "Total number of records evicted from the stream buffer by capacity"
    );
    describe_gauge!(
        STREAM_BUFFER_SIZE,
        "Current number of records held in the stream buffer"
    );
    describe_counter!(
        STREAM_ENRICHMENTS_DISPATCHED_TOTAL,
        "Total number of classification requests dispatched"
    );
    describe_counter!(
        STREAM_ENRICHMENTS_APPLIED_TOTAL,
        "Total number of verdicts applied to buffered records"
    );
    describe_counter!(
        STREAM_ENRICHMENTS_DISCARDED_TOTAL,
        "Total number of verdicts discarded because the record was evicted or cleared"
    );
    describe_counter!(
        STREAM_ALERTS_SENT_TOTAL,
        "Total number of threat alerts sent to downstream consumers"
    );

    // Classifier
    describe_counter!(
        CLASSIFIER_FAILURES_TOTAL,
        "Total number of classifications that degraded to an ERROR verdict"
    );
    describe_histogram!(
        CLASSIFIER_DURATION_SECONDS,
        "Time to obtain a verdict from the classifier in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Sentinel daemon uptime in seconds");
}
