//! 에러 타입 — 도메인별 에러 정의
//!
//! 로그 스트림 코어에는 치명적 에러가 없습니다. 분류 실패는 ERROR 판정으로,
//! 만료된 id 갱신은 no-op으로 흡수됩니다. 여기의 에러들은 설정 로딩과
//! 생명주기 오용처럼 코어 바깥 경계에서만 발생합니다.

/// Sentinel 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline not running")]
    NotRunning,

    /// 폐기된 인스턴스 (재시작 불가)
    #[error("pipeline disposed")]
    Disposed,
}

/// 제공자 판정 형식 에러
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerdictError {
    /// 신뢰도 범위(0~100) 밖
    #[error("confidenceScore {0} out of range 0-100")]
    ConfidenceOutOfRange(f64),

    /// 요약이 비어 있음
    #[error("summary must not be empty")]
    EmptySummary,

    /// 분류 실패 전용 심각도를 제공자가 반환함
    #[error("severity ERROR is reserved for classifier failures")]
    ReservedSeverity,
}
