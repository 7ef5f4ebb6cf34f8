//! 스트림 버퍼 -- 최신순 고정 용량 레코드 버퍼
//!
//! [`StreamBuffer`]는 레코드와 보강 상태 쌍을 최신순으로 보관합니다.
//! 새 레코드는 앞(head)에 삽입되고, 용량을 넘으면 가장 오래된 뒤(tail)
//! 레코드가 진행 중인 보강 상태와 함께 제거됩니다.
//!
//! 모든 변경 연산은 [`BufferChange`]를 반환하며, 소유자는 이를 즉시
//! 스케줄러에 전달합니다.
//!
//! # 만료 id 갱신
//! 비동기 분류 결과가 도착했을 때 레코드가 이미 제거(축출/초기화)되었다면
//! [`StreamBuffer::update_by_id`]는 아무 것도 바꾸지 않고 `false`를 반환합니다.
//! 이는 정상적인 경쟁 상황이며 에러가 아닙니다.

use std::collections::VecDeque;
use std::sync::Arc;

use sentinel_core::types::{EnrichmentState, LogRecord, RecordId};
use serde::Serialize;

/// 버퍼에 저장된 레코드와 보강 상태
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedRecord {
    /// 불변 레코드 (스냅샷 간 공유)
    pub record: Arc<LogRecord>,
    /// 보강 상태
    #[serde(flatten)]
    pub state: EnrichmentState,
}

impl BufferedRecord {
    fn new(record: LogRecord) -> Self {
        Self {
            record: Arc::new(record),
            state: EnrichmentState::Pending,
        }
    }

    /// 레코드 id를 반환합니다.
    pub fn id(&self) -> &RecordId {
        &self.record.id
    }
}

/// 버퍼 변경 알림
#[derive(Debug, Clone, PartialEq)]
pub enum BufferChange {
    /// 레코드 삽입 (축출 없음)
    Pushed(RecordId),
    /// 레코드 삽입과 함께 가장 오래된 레코드 축출
    Evicted {
        /// 삽입된 레코드
        pushed: RecordId,
        /// 축출된 레코드
        evicted: RecordId,
        /// 축출 시점에 분류가 진행 중이었는지
        was_in_flight: bool,
    },
    /// 레코드 보강 상태 변경
    Updated(RecordId),
    /// 버퍼 전체 초기화
    Cleared {
        /// 제거된 레코드 수
        removed: usize,
    },
}

/// 최신순 고정 용량 스트림 버퍼
pub struct StreamBuffer {
    /// 내부 저장소 (index 0이 최신)
    entries: VecDeque<BufferedRecord>,
    /// 최대 용량
    capacity: usize,
    /// 총 유입 레코드 수
    total_received: u64,
    /// 축출된 레코드 수
    evicted_count: u64,
    /// 대상이 사라져 무시된 갱신 수
    stale_updates: u64,
}

impl StreamBuffer {
    /// 새 스트림 버퍼를 생성합니다.
    ///
    /// 용량 0은 1로 보정됩니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(10_000) + 1),
            capacity,
            total_received: 0,
            evicted_count: 0,
            stale_updates: 0,
        }
    }

    /// 레코드를 맨 앞에 삽입하고, 용량을 넘으면 가장 오래된 레코드를 축출합니다.
    ///
    /// 기존 레코드끼리의 순서는 바뀌지 않습니다.
    pub fn push(&mut self, record: LogRecord) -> BufferChange {
        self.total_received += 1;
        let pushed = record.id.clone();
        self.entries.push_front(BufferedRecord::new(record));

        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                self.evicted_count += 1;
                let was_in_flight = evicted.state.is_analyzing();
                tracing::debug!(
                    evicted = %evicted.record.id,
                    in_flight = was_in_flight,
                    capacity = self.capacity,
                    "buffer full, evicted oldest record"
                );
                return BufferChange::Evicted {
                    pushed,
                    evicted: evicted.record.id.clone(),
                    was_in_flight,
                };
            }
        }

        BufferChange::Pushed(pushed)
    }

    /// id가 아직 버퍼에 있으면 보강 상태에 `mutator`를 적용합니다.
    ///
    /// `mutator`가 `true`를 반환해야(전환이 실제로 적용돼야) `true`를 반환합니다.
    /// id가 없으면 아무 레코드도 건드리지 않고 `false`를 반환합니다.
    pub fn update_by_id<F>(&mut self, id: &RecordId, mutator: F) -> bool
    where
        F: FnOnce(&mut EnrichmentState) -> bool,
    {
        match self.entries.iter_mut().find(|entry| entry.record.id == *id) {
            Some(entry) => mutator(&mut entry.state),
            None => {
                self.stale_updates += 1;
                tracing::debug!(id = %id, "update target no longer buffered, ignored");
                false
            }
        }
    }

    /// 버퍼를 비웁니다. 진행 중인 분류 요청은 고아가 됩니다.
    pub fn clear(&mut self) -> BufferChange {
        let removed = self.entries.len();
        self.entries.clear();
        BufferChange::Cleared { removed }
    }

    /// 최신순 읽기 전용 스냅샷을 반환합니다.
    pub fn snapshot(&self) -> Vec<BufferedRecord> {
        self.entries.iter().cloned().collect()
    }

    /// 최신순 반복자를 반환합니다.
    pub fn iter(&self) -> impl Iterator<Item = &BufferedRecord> {
        self.entries.iter()
    }

    /// id로 레코드를 조회합니다.
    pub fn get(&self, id: &RecordId) -> Option<&BufferedRecord> {
        self.entries.iter().find(|entry| entry.record.id == *id)
    }

    /// 현재 레코드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 버퍼 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 총 유입 레코드 수를 반환합니다.
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// 지금까지 축출된 레코드 수를 반환합니다.
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// 무시된 만료 갱신 수를 반환합니다.
    pub fn stale_updates(&self) -> u64 {
        self.stale_updates
    }
}
