//! 파생 통계 -- 버퍼 스냅샷에서 계산한 집계 값

use serde::Serialize;

use sentinel_core::types::{EnrichmentState, VerdictSeverity};

use crate::buffer::BufferedRecord;

/// 판정 분포 (차트 패널용)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThreatDistribution {
    /// 판정이 있고 위협이 아닌 레코드
    pub normal: usize,
    /// WARNING 판정
    pub suspicious: usize,
    /// CRITICAL 판정
    pub critical: usize,
}

/// 스트림 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    /// 버퍼 내 전체 레코드 수
    pub total: usize,
    /// 위협 판정 수
    pub threats: usize,
    /// CRITICAL 판정 수
    pub critical: usize,
    /// 위협 판정의 평균 신뢰도 (반올림, 위협이 없으면 0)
    pub avg_confidence: u32,
    /// 보강 요청 전 레코드 수
    pub pending: usize,
    /// 분류 진행 중 레코드 수
    pub in_flight: usize,
    /// 분류 실패(ERROR) 판정 수
    pub failed: usize,
    /// 판정 분포
    pub distribution: ThreatDistribution,
}

impl StreamStats {
    /// 최신순 레코드 목록에서 통계를 계산합니다.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a BufferedRecord>,
    {
        let mut stats = Self::default();
        let mut confidence_sum = 0.0;

        for entry in entries {
            stats.total += 1;
            let verdict = match &entry.state {
                EnrichmentState::Pending => {
                    stats.pending += 1;
                    continue;
                }
                EnrichmentState::InFlight => {
                    stats.in_flight += 1;
                    continue;
                }
                EnrichmentState::Complete(verdict) => verdict,
            };

            if verdict.is_threat {
                stats.threats += 1;
                confidence_sum += verdict.confidence_score;
            } else {
                stats.distribution.normal += 1;
            }

            match verdict.severity {
                VerdictSeverity::Critical => {
                    stats.critical += 1;
                    stats.distribution.critical += 1;
                }
                VerdictSeverity::Warning => stats.distribution.suspicious += 1,
                VerdictSeverity::Error => stats.failed += 1,
                VerdictSeverity::Info => {}
            }
        }

        if stats.threats > 0 {
            stats.avg_confidence = (confidence_sum / stats.threats as f64).round() as u32;
        }
        stats
    }
}
