#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`generator`]: 정상/공격 HTTP 접근 로그 합성
//! - [`buffer`]: 최신순 고정 용량 스트림 버퍼
//! - [`scheduler`]: 분류 대상 선정과 결과 반영 (자동/수동)
//! - [`classifier`]: 위협 분류기 (Gemini 제공자, 오프라인 휴리스틱)
//! - [`emitter`]: 취소 가능한 주기적 생성 루프
//! - [`monitor`]: 전체 흐름 오케스트레이션 (Pipeline trait 구현)
//! - [`stats`]: 버퍼 스냅샷 파생 통계
//! - [`config`]: 스트림 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! EmissionLoop -> Generator -> StreamBuffer -> EnrichmentScheduler -> ThreatClassifier
//!                                   ^                                      |
//!                                   +-------- update_by_id (async) <-------+
//! ```

pub mod buffer;
pub mod classifier;
pub mod config;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod monitor;
pub mod scheduler;
pub mod stats;

// --- 주요 타입 re-export ---

// 모니터
pub use monitor::{AnalysisOutcome, MAX_BURST, StreamMonitor, StreamMonitorBuilder, ThreatAlert};

// 설정
pub use config::{StreamConfig, StreamConfigBuilder};

// 에러
pub use error::{ClassifierError, LogStreamError};

// 분류기
pub use classifier::{ClassifierClient, GeminiClassifier, HeuristicClassifier, ThreatClassifier};

// 버퍼
pub use buffer::{BufferChange, BufferedRecord, StreamBuffer};

// 스케줄러
pub use scheduler::{Dispatch, EnrichmentScheduler, ManualRejection, Trigger, is_eligible};

// 통계
pub use stats::{StreamStats, ThreatDistribution};
