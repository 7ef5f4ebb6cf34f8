//! 설정 관리 — sentinel.toml 파싱 및 런타임 설정
//!
//! [`SentinelConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SENTINEL_STREAM_BUFFER_CAPACITY=100` 형식)
//! 3. 설정 파일 (`sentinel.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), sentinel_core::error::SentinelError> {
//! use sentinel_core::config::SentinelConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SentinelConfig::load("sentinel.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SentinelConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SentinelError};

/// 분류 제공자: Gemini REST API
pub const PROVIDER_GEMINI: &str = "gemini";
/// 분류 제공자: 오프라인 휴리스틱
pub const PROVIDER_OFFLINE: &str = "offline";

/// Sentinel 통합 설정
///
/// `sentinel.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 스트림 설정
    #[serde(default)]
    pub stream: StreamSettings,
    /// 분류기 설정
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl SentinelConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SentinelError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SentinelError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SentinelError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SentinelError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SentinelError> {
        toml::from_str(toml_str).map_err(|e| {
            SentinelError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SENTINEL_{SECTION}_{FIELD}`.
    /// 제공자 API 키는 `SENTINEL_CLASSIFIER_API_KEY`가 없으면
    /// `GEMINI_API_KEY`, `API_KEY` 순으로 찾습니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SENTINEL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SENTINEL_GENERAL_LOG_FORMAT");

        // Stream
        override_usize(
            &mut self.stream.buffer_capacity,
            "SENTINEL_STREAM_BUFFER_CAPACITY",
        );
        override_u64(
            &mut self.stream.emit_interval_ms,
            "SENTINEL_STREAM_EMIT_INTERVAL_MS",
        );
        override_f64(&mut self.stream.attack_ratio, "SENTINEL_STREAM_ATTACK_RATIO");
        override_f64(
            &mut self.stream.burst_attack_ratio,
            "SENTINEL_STREAM_BURST_ATTACK_RATIO",
        );
        override_bool(&mut self.stream.auto_enrich, "SENTINEL_STREAM_AUTO_ENRICH");
        override_usize(
            &mut self.stream.alert_channel_capacity,
            "SENTINEL_STREAM_ALERT_CHANNEL_CAPACITY",
        );

        // Classifier
        override_string(
            &mut self.classifier.provider,
            "SENTINEL_CLASSIFIER_PROVIDER",
        );
        if !override_string(&mut self.classifier.api_key, "SENTINEL_CLASSIFIER_API_KEY")
            && self.classifier.api_key.is_empty()
            && !override_string(&mut self.classifier.api_key, "GEMINI_API_KEY")
        {
            override_string(&mut self.classifier.api_key, "API_KEY");
        }
        override_string(&mut self.classifier.model, "SENTINEL_CLASSIFIER_MODEL");
        override_string(&mut self.classifier.endpoint, "SENTINEL_CLASSIFIER_ENDPOINT");
        override_f64(
            &mut self.classifier.temperature,
            "SENTINEL_CLASSIFIER_TEMPERATURE",
        );
        override_u64(
            &mut self.classifier.request_timeout_secs,
            "SENTINEL_CLASSIFIER_REQUEST_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.classifier.offline_latency_ms,
            "SENTINEL_CLASSIFIER_OFFLINE_LATENCY_MS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "SENTINEL_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "SENTINEL_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "SENTINEL_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 스트림 섹션의 수치 범위는 `sentinel-log-stream`의 `StreamConfig`가
    /// 다시 검증하므로 여기서는 섹션 간 공통 규칙만 확인합니다.
    pub fn validate(&self) -> Result<(), SentinelError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.stream.buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.buffer_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        for (field, ratio) in [
            ("stream.attack_ratio", self.stream.attack_ratio),
            ("stream.burst_attack_ratio", self.stream.burst_attack_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must be within 0.0-1.0".to_owned(),
                }
                .into());
            }
        }

        let valid_providers = [PROVIDER_GEMINI, PROVIDER_OFFLINE];
        if !valid_providers.contains(&self.classifier.provider.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "classifier.provider".to_owned(),
                reason: format!("must be one of: {}", valid_providers.join(", ")),
            }
            .into());
        }

        if !(0.0..=2.0).contains(&self.classifier.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "classifier.temperature".to_owned(),
                reason: "must be within 0.0-2.0".to_owned(),
            }
            .into());
        }

        if self.classifier.provider == PROVIDER_GEMINI && self.classifier.model.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "classifier.model".to_owned(),
                reason: "model must not be empty for the gemini provider".to_owned(),
            }
            .into());
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "port must not be 0 when metrics are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 로그 스트림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// 버퍼 최대 레코드 수
    pub buffer_capacity: usize,
    /// 레코드 생성 주기 (밀리초)
    pub emit_interval_ms: u64,
    /// 주기적 생성 시 공격 레코드 비율
    pub attack_ratio: f64,
    /// 버스트 생성 시 공격 레코드 비율
    pub burst_attack_ratio: f64,
    /// 버퍼 변경 시 자동 분류 여부
    pub auto_enrich: bool,
    /// 위협 알림 채널 용량
    pub alert_channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            buffer_capacity: 50,
            emit_interval_ms: 1500,
            attack_ratio: 0.2,
            burst_attack_ratio: 0.5,
            auto_enrich: true,
            alert_channel_capacity: 256,
        }
    }
}

/// 분류기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// 제공자 (gemini, offline)
    pub provider: String,
    /// 제공자 API 키 (비어 있으면 오프라인 휴리스틱 사용)
    pub api_key: String,
    /// 모델 id
    pub model: String,
    /// API 엔드포인트 기본 URL
    pub endpoint: String,
    /// 샘플링 온도
    pub temperature: f64,
    /// 제공자 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 오프라인 휴리스틱의 모의 지연 (밀리초)
    pub offline_latency_ms: u64,
}

impl ClassifierConfig {
    /// 원격 제공자를 사용할 수 있는지 확인합니다.
    pub fn has_provider(&self) -> bool {
        self.provider == PROVIDER_GEMINI && !self.api_key.trim().is_empty()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: PROVIDER_GEMINI.to_owned(),
            api_key: String::new(),
            model: "gemini-2.5-flash".to_owned(),
            endpoint: "https://generativelanguage.googleapis.com".to_owned(),
            temperature: 0.2,
            request_timeout_secs: 30,
            offline_latency_ms: 1000,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

/// 환경변수가 있으면 덮어쓰고 `true`를 반환합니다.
fn override_string(target: &mut String, env_key: &str) -> bool {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
        return true;
    }
    false
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = SentinelConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.stream.buffer_capacity, 50);
        assert_eq!(config.stream.emit_interval_ms, 1500);
        assert!(config.stream.auto_enrich);
        assert_eq!(config.classifier.provider, PROVIDER_GEMINI);
        assert!(!config.classifier.has_provider());
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        SentinelConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = SentinelConfig::parse("").unwrap();
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.classifier.temperature, 0.2);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[stream]
buffer_capacity = 20
attack_ratio = 0.5

[classifier]
provider = "offline"
"#;
        let config = SentinelConfig::parse(toml).unwrap();
        assert_eq!(config.stream.buffer_capacity, 20);
        assert_eq!(config.stream.attack_ratio, 0.5);
        // emit_interval_ms는 기본값 유지
        assert_eq!(config.stream.emit_interval_ms, 1500);
        assert_eq!(config.classifier.provider, PROVIDER_OFFLINE);
        assert!(!config.classifier.has_provider());
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = SentinelConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            SentinelError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = SentinelConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_out_of_range_attack_ratio() {
        let mut config = SentinelConfig::default();
        config.stream.attack_ratio = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("attack_ratio"));
    }

    #[test]
    fn validate_rejects_unknown_provider() {
        let mut config = SentinelConfig::default();
        config.classifier.provider = "openai".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("classifier.provider"));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut config = SentinelConfig::default();
        config.stream.buffer_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn has_provider_requires_gemini_and_key() {
        let mut config = ClassifierConfig {
            api_key: "k".to_owned(),
            ..Default::default()
        };
        assert!(config.has_provider());
        config.provider = PROVIDER_OFFLINE.to_owned();
        assert!(!config.has_provider());
        config.provider = PROVIDER_GEMINI.to_owned();
        config.api_key = "   ".to_owned();
        assert!(!config.has_provider());
    }

    #[test]
    #[serial_test::serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 다른 테스트와 겹치지 않습니다.
        unsafe { std::env::set_var("TEST_SENTINEL_STR", "overridden") };
        assert!(override_string(&mut val, "TEST_SENTINEL_STR"));
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_SENTINEL_STR") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_f64_invalid_keeps_original() {
        let mut val = 0.2;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 다른 테스트와 겹치지 않습니다.
        unsafe { std::env::set_var("TEST_SENTINEL_F64_BAD", "lots") };
        override_f64(&mut val, "TEST_SENTINEL_F64_BAD");
        assert_eq!(val, 0.2);
        unsafe { std::env::remove_var("TEST_SENTINEL_F64_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        assert!(!override_string(&mut val, "TEST_SENTINEL_NONEXISTENT_12345"));
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = SentinelConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = SentinelConfig::parse(&toml_str).unwrap();
        assert_eq!(config.stream.buffer_capacity, parsed.stream.buffer_capacity);
        assert_eq!(config.classifier.model, parsed.classifier.model);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = SentinelConfig::from_file("/nonexistent/path/sentinel.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SentinelError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
