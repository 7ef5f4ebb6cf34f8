//! 보강 스케줄러 -- 분류 대상 선정과 결과 반영
//!
//! 버퍼가 바뀔 때마다 [`EnrichmentScheduler::react`]가 동기적으로 호출되어
//! 분류가 필요한 레코드를 하나 고릅니다. 선택된 레코드는 비동기 호출이
//! 시작되기 **전에** `InFlight`로 전환되므로, 이어지는 반응 사이클이 같은
//! 레코드를 다시 고르지 않습니다.
//!
//! # 처리량 제한
//! 자동 분류는 시스템 전체에서 동시에 하나만 진행됩니다. 진행 중인 자동 분류가
//! 끝나면(반영되든 폐기되든) 다음 반응에서 새 대상을 고릅니다.
//! 수동 요청([`EnrichmentScheduler::request_manual`])은 이 제한을 받지 않지만
//! 레코드당 하나의 진행 중 분류라는 불변식은 동일하게 지킵니다.

use std::fmt;

use sentinel_core::types::{EnrichmentState, LogRecord, RecordId, ThreatVerdict};

use crate::buffer::StreamBuffer;

/// 분류 요청 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// 버퍼 변경에 따른 자동 선정
    Auto,
    /// 운영자의 명시적 요청
    Manual,
}

impl Trigger {
    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

/// 발송된 분류 요청
///
/// 레코드는 이미 `InFlight`로 전환된 상태입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// 대상 레코드 id
    pub id: RecordId,
    /// 분류기에 전달할 원본 로그 라인
    pub raw: String,
    /// 요청 경로
    pub trigger: Trigger,
}

/// 수동 분류 요청 거부 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualRejection {
    /// 버퍼에 없는 id (축출/초기화됨)
    NotFound,
    /// 이미 분류 진행 중
    AlreadyAnalyzing,
    /// 이미 판정 완료
    AlreadyComplete,
}

impl fmt::Display for ManualRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "record is no longer buffered"),
            Self::AlreadyAnalyzing => write!(f, "record is already being analyzed"),
            Self::AlreadyComplete => write!(f, "record already has a verdict"),
        }
    }
}

/// 판정 반영 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// 버퍼에 반영됨
    Applied,
    /// 대상 레코드가 사라져 폐기됨
    Discarded,
}

/// 자동 분류 대상 여부를 판단합니다.
///
/// `Pending` 상태이면서 상태 코드가 400 이상이거나, 원본 라인에
/// 작은따옴표 또는 `<`가 포함된 레코드가 대상입니다.
pub fn is_eligible(record: &LogRecord, state: &EnrichmentState) -> bool {
    state.is_pending()
        && (record.status_code >= 400 || record.raw.contains('\'') || record.raw.contains('<'))
}

/// 보강 스케줄러
#[derive(Debug)]
pub struct EnrichmentScheduler {
    /// 자동 선정 활성화 여부
    auto_enabled: bool,
    /// 진행 중인 자동 분류 대상
    auto_in_flight: Option<RecordId>,
}

impl EnrichmentScheduler {
    /// 새 스케줄러를 생성합니다.
    pub fn new(auto_enabled: bool) -> Self {
        Self {
            auto_enabled,
            auto_in_flight: None,
        }
    }

    /// 진행 중인 자동 분류 대상을 반환합니다.
    pub fn auto_in_flight(&self) -> Option<&RecordId> {
        self.auto_in_flight.as_ref()
    }

    /// 버퍼 변경에 반응하여 자동 분류 대상을 선정합니다.
    ///
    /// 스냅샷 순서에서 처음 만나는 대상 레코드를 `InFlight`로 전환하고
    /// 요청을 반환합니다. 자동 분류가 이미 진행 중이면 아무 것도 고르지 않습니다.
    pub fn react(&mut self, buffer: &mut StreamBuffer) -> Option<Dispatch> {
        if !self.auto_enabled || self.auto_in_flight.is_some() {
            return None;
        }

        let (id, raw) = buffer
            .iter()
            .find(|entry| is_eligible(&entry.record, &entry.state))
            .map(|entry| (entry.record.id.clone(), entry.record.raw.clone()))?;

        if !buffer.update_by_id(&id, EnrichmentState::begin) {
            return None;
        }

        tracing::debug!(id = %id, "selected record for automatic enrichment");
        self.auto_in_flight = Some(id.clone());
        Some(Dispatch {
            id,
            raw,
            trigger: Trigger::Auto,
        })
    }

    /// 운영자의 명시적 분류 요청을 처리합니다.
    ///
    /// 자동 선정과 같은 `Pending` → `InFlight` 전환을 사용합니다.
    pub fn request_manual(
        &mut self,
        buffer: &mut StreamBuffer,
        id: &RecordId,
    ) -> Result<Dispatch, ManualRejection> {
        let raw = match buffer.get(id) {
            None => return Err(ManualRejection::NotFound),
            Some(entry) => match &entry.state {
                EnrichmentState::InFlight => return Err(ManualRejection::AlreadyAnalyzing),
                EnrichmentState::Complete(_) => return Err(ManualRejection::AlreadyComplete),
                EnrichmentState::Pending => entry.record.raw.clone(),
            },
        };

        if !buffer.update_by_id(id, EnrichmentState::begin) {
            return Err(ManualRejection::AlreadyAnalyzing);
        }

        tracing::debug!(id = %id, "manual enrichment requested");
        Ok(Dispatch {
            id: id.clone(),
            raw,
            trigger: Trigger::Manual,
        })
    }

    /// 분류 결과를 버퍼에 반영합니다.
    ///
    /// 대상이 사라졌으면 결과를 조용히 폐기합니다. 자동 분류였다면
    /// 어느 경우든 자동 선정 슬롯을 비웁니다.
    pub fn complete(
        &mut self,
        buffer: &mut StreamBuffer,
        dispatch: &Dispatch,
        verdict: ThreatVerdict,
    ) -> Completion {
        if dispatch.trigger == Trigger::Auto && self.auto_in_flight.as_ref() == Some(&dispatch.id)
        {
            self.auto_in_flight = None;
        }

        if buffer.update_by_id(&dispatch.id, |state| state.complete(verdict)) {
            Completion::Applied
        } else {
            tracing::debug!(id = %dispatch.id, "verdict discarded, record no longer buffered");
            Completion::Discarded
        }
    }
}
