//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 로그 레코드, 보강(enrichment) 상태, 위협 판정을 정의합니다.
//! 직렬화 형식(camelCase 필드명, `INFO`/`CRITICAL` 등 대문자 심각도)은
//! 분류 제공자와 표시 계층이 주고받는 JSON 형식과 동일합니다.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VerdictError;

/// 프로세스 전역 레코드 시퀀스
static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 레코드 고유 식별자
///
/// `log-{unix_millis}-{seq}` 형식입니다. 같은 밀리초 안에서 여러 레코드가
/// 생성되어도 시퀀스 카운터 덕분에 충돌하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// 새 고유 id를 발급합니다.
    pub fn next() -> Self {
        let seq = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("log-{}-{}", Utc::now().timestamp_millis(), seq))
    }

    /// 외부 입력(콘솔 명령 등)에서 받은 문자열로 id를 만듭니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 문자열 표현을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 현재 시각을 ISO-8601(UTC, 밀리초) 문자열로 반환합니다.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// HTTP 접근 로그 레코드
///
/// 생성 후 변경되지 않습니다. `raw`는 분류기에 전달되는 정규 로그 라인입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// 고유 id
    pub id: RecordId,
    /// 생성 시각 (ISO-8601)
    pub timestamp: String,
    /// 요청 출발지 IP
    pub source_ip: String,
    /// HTTP 메서드
    pub method: String,
    /// 요청 경로 (페이로드 포함)
    pub endpoint: String,
    /// 응답 상태 코드
    pub status_code: u16,
    /// 요약 메시지
    pub message: String,
    /// 원본 로그 라인
    pub raw: String,
}

impl LogRecord {
    /// 새 id와 현재 시각으로 레코드를 생성합니다.
    pub fn new(
        source_ip: impl Into<String>,
        method: impl Into<String>,
        endpoint: impl Into<String>,
        status_code: u16,
        message: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::next(),
            timestamp: now_iso8601(),
            source_ip: source_ip.into(),
            method: method.into(),
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
            raw: raw.into(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} -> {}",
            self.timestamp, self.source_ip, self.method, self.endpoint, self.status_code,
        )
    }
}

/// 판정 심각도
///
/// `Error`는 분류기 실패 전용입니다. 정상/위협 판정에는 사용되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictSeverity {
    /// 정보성
    Info,
    /// 의심
    Warning,
    /// 분류 실패
    Error,
    /// 치명적
    Critical,
}

impl VerdictSeverity {
    /// 와이어 형식 이름 (`INFO`, `WARNING`, `ERROR`, `CRITICAL`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for VerdictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 위협 판정 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatVerdict {
    /// 보안 위협 여부
    pub is_threat: bool,
    /// 심각도
    pub severity: VerdictSeverity,
    /// 위협 유형 (예: "SQL Injection"), 안전하면 None
    #[serde(default)]
    pub threat_type: Option<String>,
    /// 신뢰도 (0~100)
    pub confidence_score: f64,
    /// 한 문장 요약
    pub summary: String,
    /// 권장 대응 단계
    pub mitigation_steps: Vec<String>,
}

impl ThreatVerdict {
    /// 분류 실패 판정을 생성합니다.
    ///
    /// 호출자는 예외 대신 항상 이 판정을 받습니다. 실패 사유는 로그로만 남기고
    /// 판정 본문은 운영자용 고정 문구를 사용합니다.
    pub fn failure() -> Self {
        Self {
            is_threat: false,
            severity: VerdictSeverity::Error,
            threat_type: Some("Analysis Failed".to_owned()),
            confidence_score: 0.0,
            summary: "Failed to analyze log due to API error.".to_owned(),
            mitigation_steps: vec![
                "Check API Key".to_owned(),
                "Check Internet Connection".to_owned(),
            ],
        }
    }

    /// 분류 실패 판정인지 확인합니다.
    pub fn is_failure(&self) -> bool {
        self.severity == VerdictSeverity::Error
    }

    /// 제공자 응답으로 받은 판정의 형식을 검증합니다.
    ///
    /// `ERROR` 심각도는 분류 실패 전용이므로 제공자 판정에서는 거부됩니다.
    pub fn validate(&self) -> Result<(), VerdictError> {
        if !self.confidence_score.is_finite()
            || !(0.0..=100.0).contains(&self.confidence_score)
        {
            return Err(VerdictError::ConfidenceOutOfRange(self.confidence_score));
        }
        if self.summary.trim().is_empty() {
            return Err(VerdictError::EmptySummary);
        }
        if self.severity == VerdictSeverity::Error {
            return Err(VerdictError::ReservedSeverity);
        }
        Ok(())
    }
}

impl fmt::Display for ThreatVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] threat={} type={} confidence={:.0}: {}",
            self.severity,
            self.is_threat,
            self.threat_type.as_deref().unwrap_or("-"),
            self.confidence_score,
            self.summary,
        )
    }
}

/// 레코드의 보강 상태
///
/// 상태 전환: `Pending` → `InFlight` → `Complete`.
/// 역방향 전환과 단계 건너뛰기는 거부됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "analysis", rename_all = "kebab-case")]
pub enum EnrichmentState {
    /// 보강 요청 전
    #[default]
    Pending,
    /// 분류 요청 발송, 결과 대기 중
    InFlight,
    /// 판정 수신 완료
    Complete(ThreatVerdict),
}

impl EnrichmentState {
    /// `Pending` → `InFlight` 전환을 시도합니다. 적용되면 `true`.
    pub fn begin(&mut self) -> bool {
        if matches!(self, Self::Pending) {
            *self = Self::InFlight;
            true
        } else {
            false
        }
    }

    /// `InFlight` → `Complete` 전환을 시도합니다. 적용되면 `true`.
    pub fn complete(&mut self, verdict: ThreatVerdict) -> bool {
        if matches!(self, Self::InFlight) {
            *self = Self::Complete(verdict);
            true
        } else {
            false
        }
    }

    /// 아직 보강 요청이 없는 상태인지 확인합니다.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// 분류 진행 중인지 확인합니다.
    pub fn is_analyzing(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    /// 완료된 판정을 반환합니다.
    pub fn analysis(&self) -> Option<&ThreatVerdict> {
        match self {
            Self::Complete(verdict) => Some(verdict),
            _ => None,
        }
    }

    /// 상태명을 반환합니다.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in-flight",
            Self::Complete(_) => "complete",
        }
    }
}

/// 합성 공격 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    /// SQL 인젝션
    #[serde(rename = "SQLi")]
    SqlInjection,
    /// 크로스 사이트 스크립팅
    #[serde(rename = "XSS")]
    Xss,
    /// 로그인 무차별 대입
    BruteForce,
    /// 경로 조작
    PathTraversal,
}

impl AttackKind {
    /// 모든 공격 유형
    pub const ALL: [AttackKind; 4] = [
        AttackKind::SqlInjection,
        AttackKind::Xss,
        AttackKind::BruteForce,
        AttackKind::PathTraversal,
    ];

    /// 사람이 읽는 위협 유형명
    pub fn label(&self) -> &'static str {
        match self {
            Self::SqlInjection => "SQL Injection",
            Self::Xss => "Cross-Site Scripting",
            Self::BruteForce => "Brute Force",
            Self::PathTraversal => "Path Traversal",
        }
    }

    /// 대소문자를 구분하지 않고 공격 유형을 파싱합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqli" | "sql" | "sql-injection" => Some(Self::SqlInjection),
            "xss" => Some(Self::Xss),
            "bruteforce" | "brute-force" => Some(Self::BruteForce),
            "pathtraversal" | "path-traversal" | "traversal" => Some(Self::PathTraversal),
            _ => None,
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SqlInjection => write!(f, "SQLi"),
            Self::Xss => write!(f, "XSS"),
            Self::BruteForce => write!(f, "BruteForce"),
            Self::PathTraversal => write!(f, "PathTraversal"),
        }
    }
}
