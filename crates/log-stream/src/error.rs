//! 로그 스트림 에러 타입
//!
//! [`LogStreamError`]는 설정 검증과 생명주기 오용처럼 스트림 코어 경계에서만
//! 발생하는 에러를 표현합니다. 분류 실패와 만료된 id 갱신은 에러가 아니며
//! 각각 ERROR 판정과 no-op으로 흡수됩니다.
//!
//! [`ClassifierError`]는 제공자 호출 내부에서만 쓰이며, 분류기 경계에서
//! 항상 실패 판정으로 변환됩니다.

use sentinel_core::error::{ConfigError, PipelineError, SentinelError, VerdictError};

/// 로그 스트림 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogStreamError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 버스트 크기 초과
    #[error("burst of {requested} records exceeds the limit of {max}")]
    BurstTooLarge {
        /// 요청한 레코드 수
        requested: usize,
        /// 허용 최대치
        max: usize,
    },

    /// 모니터가 아직 시작되지 않음
    #[error("stream monitor is not active")]
    NotActive,

    /// 모니터가 이미 폐기됨
    #[error("stream monitor has been disposed")]
    Disposed,
}

impl From<LogStreamError> for SentinelError {
    fn from(err: LogStreamError) -> Self {
        match err {
            LogStreamError::Config { field, reason } => {
                SentinelError::Config(ConfigError::InvalidValue { field, reason })
            }
            err @ LogStreamError::BurstTooLarge { .. } => {
                SentinelError::Config(ConfigError::InvalidValue {
                    field: "burst".to_owned(),
                    reason: err.to_string(),
                })
            }
            LogStreamError::NotActive => SentinelError::Pipeline(PipelineError::NotRunning),
            LogStreamError::Disposed => SentinelError::Pipeline(PipelineError::Disposed),
        }
    }
}

/// 분류 제공자 호출 에러
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// HTTP 클라이언트 구성 실패
    #[error("failed to build http client: {0}")]
    ClientBuild(String),

    /// 요청 URL 구성 실패
    #[error("invalid provider endpoint '{endpoint}': {reason}")]
    Endpoint {
        /// 설정된 엔드포인트
        endpoint: String,
        /// 실패 사유
        reason: String,
    },

    /// 전송 실패 (연결 불가, 타임아웃 등)
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 2xx가 아닌 응답
    #[error("provider returned {status}: {body}")]
    Status {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문 (잘림)
        body: String,
    },

    /// 응답에 텍스트가 없음
    #[error("empty response from provider")]
    EmptyResponse,

    /// 응답 JSON 형식 오류
    #[error("malformed verdict payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// 판정 값 범위 오류
    #[error("invalid verdict: {0}")]
    InvalidVerdict(#[from] VerdictError),
}
