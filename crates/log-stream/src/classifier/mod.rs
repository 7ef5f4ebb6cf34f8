//! 위협 분류기 -- 원본 로그 라인에 대한 비동기 위협 판정
//!
//! [`ThreatClassifier`]는 항상 판정을 반환합니다. 제공자 호출 실패는
//! 호출자에게 에러로 전달되지 않고 ERROR 심각도의 실패 판정으로 변환됩니다.
//!
//! # 구현체
//! - [`GeminiClassifier`]: Gemini `generateContent` REST API 호출
//! - [`HeuristicClassifier`]: 네트워크를 쓰지 않는 부분 문자열 휴리스틱
//! - [`ClassifierClient`]: 설정에 따라 위 둘 중 하나로 디스패치

mod gemini;
mod heuristic;

pub use gemini::{GeminiClassifier, parse_generate_content};
pub use heuristic::HeuristicClassifier;

use std::future::Future;
use std::time::Instant;

use sentinel_core::config::ClassifierConfig;
use sentinel_core::metrics as m;
use sentinel_core::types::ThreatVerdict;

use crate::error::ClassifierError;

/// 위협 분류기 trait
///
/// 모니터는 분류 결과를 기다리는 동안 다른 작업을 막지 않도록
/// 이 호출을 별도 태스크에서 수행합니다.
pub trait ThreatClassifier: Send + Sync + 'static {
    /// 원본 로그 라인을 분류합니다. 절대 실패하지 않습니다.
    fn classify(&self, raw: &str) -> impl Future<Output = ThreatVerdict> + Send;

    /// 제공자 이름 (로그/헬스 표시용)
    fn provider_name(&self) -> &'static str;

    /// 원격 제공자 없이 동작하는지 확인합니다.
    fn is_offline(&self) -> bool;
}

/// 설정 기반 분류기 클라이언트
pub enum ClassifierClient {
    /// 원격 Gemini 제공자
    Gemini(GeminiClassifier),
    /// 오프라인 휴리스틱
    Heuristic(HeuristicClassifier),
}

impl ClassifierClient {
    /// 설정에서 분류기를 생성합니다.
    ///
    /// `gemini` 제공자에 API 키가 있으면 원격 제공자를, 그 외에는
    /// 오프라인 휴리스틱을 사용합니다.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        if config.has_provider() {
            let classifier = GeminiClassifier::new(config)?;
            tracing::info!(model = %config.model, "using gemini threat classifier");
            Ok(Self::Gemini(classifier))
        } else {
            tracing::info!(
                provider = %config.provider,
                latency_ms = config.offline_latency_ms,
                "no classification provider configured, using offline heuristic"
            );
            Ok(Self::Heuristic(HeuristicClassifier::with_latency_ms(
                config.offline_latency_ms,
            )))
        }
    }
}

impl ThreatClassifier for ClassifierClient {
    async fn classify(&self, raw: &str) -> ThreatVerdict {
        let started = Instant::now();
        let verdict = match self {
            Self::Gemini(inner) => inner.classify(raw).await,
            Self::Heuristic(inner) => inner.classify(raw).await,
        };
        metrics::histogram!(m::CLASSIFIER_DURATION_SECONDS, m::LABEL_PROVIDER => self.provider_name())
            .record(started.elapsed().as_secs_f64());
        verdict
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::Gemini(inner) => inner.provider_name(),
            Self::Heuristic(inner) => inner.provider_name(),
        }
    }

    fn is_offline(&self) -> bool {
        matches!(self, Self::Heuristic(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::config::PROVIDER_OFFLINE;
    use sentinel_core::types::VerdictSeverity;

    #[test]
    fn missing_api_key_selects_heuristic() {
        let config = ClassifierConfig::default();
        let client = ClassifierClient::from_config(&config).unwrap();
        assert!(client.is_offline());
        assert_eq!(client.provider_name(), "offline");
    }

    #[test]
    fn offline_provider_ignores_api_key() {
        let config = ClassifierConfig {
            provider: PROVIDER_OFFLINE.to_owned(),
            api_key: "secret".to_owned(),
            ..Default::default()
        };
        assert!(ClassifierClient::from_config(&config).unwrap().is_offline());
    }

    #[test]
    fn api_key_selects_gemini() {
        let config = ClassifierConfig {
            api_key: "secret".to_owned(),
            ..Default::default()
        };
        let client = ClassifierClient::from_config(&config).unwrap();
        assert!(!client.is_offline());
        assert_eq!(client.provider_name(), "gemini");
    }

    #[tokio::test]
    async fn client_without_provider_uses_heuristic_for_script_tag() {
        let config = ClassifierConfig {
            offline_latency_ms: 0,
            ..Default::default()
        };
        let client = ClassifierClient::from_config(&config).unwrap();
        let verdict = client
            .classify("45.23.11.2 - - [t] \"POST /contact<script>alert(1)</script> HTTP/1.1\" 200 124 \"curl/7.64.1\"")
            .await;
        assert!(verdict.is_threat);
        assert_eq!(verdict.severity, VerdictSeverity::Critical);
        assert_eq!(verdict.confidence_score, 95.0);
    }
}
