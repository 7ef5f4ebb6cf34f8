//! sentinel.toml 통합 설정 테스트
//!
//! - sentinel.toml.example 파싱 테스트
//! - 파일 로딩 + 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use std::io::Write;

use sentinel_core::config::{PROVIDER_GEMINI, PROVIDER_OFFLINE, SentinelConfig};
use sentinel_core::error::{ConfigError, SentinelError};

// =============================================================================
// sentinel.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../sentinel.toml.example");
    let config = SentinelConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.stream.buffer_capacity, 50);
    assert_eq!(config.stream.emit_interval_ms, 1500);
    assert_eq!(config.stream.attack_ratio, 0.2);
    assert_eq!(config.classifier.provider, PROVIDER_GEMINI);
    assert_eq!(config.classifier.model, "gemini-2.5-flash");
    assert!(!config.metrics.enabled);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../sentinel.toml.example");
    let config = SentinelConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_defaults() {
    let content = include_str!("../../../sentinel.toml.example");
    let parsed = SentinelConfig::parse(content).expect("should parse");
    let defaults = SentinelConfig::default();

    assert_eq!(parsed.stream.buffer_capacity, defaults.stream.buffer_capacity);
    assert_eq!(parsed.stream.burst_attack_ratio, defaults.stream.burst_attack_ratio);
    assert_eq!(parsed.classifier.temperature, defaults.classifier.temperature);
    assert_eq!(
        parsed.classifier.offline_latency_ms,
        defaults.classifier.offline_latency_ms
    );
    assert_eq!(parsed.metrics.port, defaults.metrics.port);
}

// =============================================================================
// 파일 로딩
// =============================================================================

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let file = write_config(
        r#"
[stream]
buffer_capacity = 10

[classifier]
provider = "offline"
"#,
    );

    let config = SentinelConfig::load(file.path()).await.expect("should load");
    assert_eq!(config.stream.buffer_capacity, 10);
    assert_eq!(config.classifier.provider, PROVIDER_OFFLINE);
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values() {
    let file = write_config(
        r#"
[general]
log_format = "xml"
"#,
    );

    let err = SentinelConfig::load(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        SentinelError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn from_file_with_malformed_toml_fails_to_parse() {
    let file = write_config("[stream\nbuffer_capacity = ");
    let err = SentinelConfig::from_file(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        SentinelError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 환경변수 우선순위
// =============================================================================

#[test]
#[serial_test::serial]
fn env_overrides_take_precedence_over_file() {
    let mut config = SentinelConfig::parse(
        r#"
[stream]
buffer_capacity = 10
emit_interval_ms = 500
"#,
    )
    .expect("should parse");

    // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 다른 테스트와 겹치지 않습니다.
    unsafe {
        std::env::set_var("SENTINEL_STREAM_BUFFER_CAPACITY", "75");
        std::env::set_var("SENTINEL_STREAM_AUTO_ENRICH", "false");
    }
    config.apply_env_overrides();
    unsafe {
        std::env::remove_var("SENTINEL_STREAM_BUFFER_CAPACITY");
        std::env::remove_var("SENTINEL_STREAM_AUTO_ENRICH");
    }

    assert_eq!(config.stream.buffer_capacity, 75);
    assert!(!config.stream.auto_enrich);
    // 환경변수가 없는 필드는 파일 값 유지
    assert_eq!(config.stream.emit_interval_ms, 500);
}

#[test]
#[serial_test::serial]
fn api_key_falls_back_to_provider_env_var() {
    let mut config = SentinelConfig::default();

    // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 다른 테스트와 겹치지 않습니다.
    unsafe {
        std::env::remove_var("SENTINEL_CLASSIFIER_API_KEY");
        std::env::set_var("GEMINI_API_KEY", "from-gemini-env");
    }
    config.apply_env_overrides();
    unsafe { std::env::remove_var("GEMINI_API_KEY") };

    assert_eq!(config.classifier.api_key, "from-gemini-env");
    assert!(config.classifier.has_provider());
}

#[test]
#[serial_test::serial]
fn explicit_api_key_env_wins_over_fallbacks() {
    let mut config = SentinelConfig::default();

    // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 다른 테스트와 겹치지 않습니다.
    unsafe {
        std::env::set_var("SENTINEL_CLASSIFIER_API_KEY", "explicit");
        std::env::set_var("API_KEY", "generic");
    }
    config.apply_env_overrides();
    unsafe {
        std::env::remove_var("SENTINEL_CLASSIFIER_API_KEY");
        std::env::remove_var("API_KEY");
    }

    assert_eq!(config.classifier.api_key, "explicit");
}
