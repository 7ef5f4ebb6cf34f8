//! 파이프라인 trait — 모듈 생명주기 정의

use std::fmt;
use std::future::Future;

use serde::Serialize;

use crate::error::SentinelError;

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상 동작
    Healthy,
    /// 동작하지만 기능이 제한됨
    Degraded(String),
    /// 동작하지 않음
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 모든 장기 실행 모듈이 구현하는 생명주기 trait
///
/// ```text
/// Initialized → start() → Active → stop() → Disposed
/// ```
///
/// `stop()` 이후의 재시작은 지원하지 않습니다. 새 인스턴스를 빌드해야 합니다.
pub trait Pipeline: Send + Sync {
    /// 모듈을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), SentinelError>> + Send;

    /// 모듈을 정지하고 자원을 해제합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), SentinelError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
