//! 오프라인 휴리스틱 분류기
//!
//! 알려진 공격 표식이 원본 라인에 포함되어 있는지만 확인합니다.
//! 네트워크를 사용하지 않으므로 제공자 없이도 전체 흐름을 검증할 수 있습니다.

use std::time::Duration;

use sentinel_core::types::{ThreatVerdict, VerdictSeverity};

use super::ThreatClassifier;

/// 공격으로 판정하는 부분 문자열 (불리언 인젝션, 스크립트 태그, 민감 경로)
pub const ATTACK_MARKERS: [&str; 3] = ["OR '1'='1", "<script>", "etc/passwd"];

/// 부분 문자열 기반 오프라인 분류기
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier {
    /// 응답 전 모의 지연
    latency: Duration,
}

impl HeuristicClassifier {
    /// 지연 없는 분류기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 모의 지연(밀리초)을 가진 분류기를 생성합니다.
    pub fn with_latency_ms(ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(ms),
        }
    }

    /// 지연 없이 즉시 판정합니다.
    pub fn judge(raw: &str) -> ThreatVerdict {
        if ATTACK_MARKERS.iter().any(|marker| raw.contains(marker)) {
            ThreatVerdict {
                is_threat: true,
                severity: VerdictSeverity::Critical,
                threat_type: Some("Simulated Attack Pattern".to_owned()),
                confidence_score: 95.0,
                summary: "Detected simulated malicious payload in request parameters.".to_owned(),
                mitigation_steps: vec![
                    "Block source IP".to_owned(),
                    "Sanitize input parameters".to_owned(),
                    "Check WAF rules".to_owned(),
                ],
            }
        } else {
            ThreatVerdict {
                is_threat: false,
                severity: VerdictSeverity::Info,
                threat_type: None,
                confidence_score: 10.0,
                summary: "Standard HTTP access log entry.".to_owned(),
                mitigation_steps: Vec::new(),
            }
        }
    }
}

impl ThreatClassifier for HeuristicClassifier {
    async fn classify(&self, raw: &str) -> ThreatVerdict {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Self::judge(raw)
    }

    fn provider_name(&self) -> &'static str {
        "offline"
    }

    fn is_offline(&self) -> bool {
        true
    }
}
