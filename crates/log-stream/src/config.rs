//! 로그 스트림 설정
//!
//! [`StreamConfig`]는 core의 [`StreamSettings`](sentinel_core::config::StreamSettings)를
//! 기반으로 스트림 코어 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use sentinel_core::config::SentinelConfig;
//! use sentinel_log_stream::config::StreamConfig;
//!
//! let core_config = SentinelConfig::default();
//! let config = StreamConfig::from_core(&core_config.stream);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LogStreamError;

/// 로그 스트림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
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

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 난수 시드 (None이면 OS 엔트로피 사용)
    pub rng_seed: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 50,
            emit_interval_ms: 1500,
            attack_ratio: 0.2,
            burst_attack_ratio: 0.5,
            auto_enrich: true,
            alert_channel_capacity: 256,
            rng_seed: None,
        }
    }
}

impl StreamConfig {
    /// core의 `StreamSettings`에서 스트림 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &sentinel_core::config::StreamSettings) -> Self {
        Self {
            buffer_capacity: core.buffer_capacity,
            emit_interval_ms: core.emit_interval_ms,
            attack_ratio: core.attack_ratio,
            burst_attack_ratio: core.burst_attack_ratio,
            auto_enrich: core.auto_enrich,
            alert_channel_capacity: core.alert_channel_capacity,
            ..Self::default()
        }
    }

    /// 생성 주기를 `Duration`으로 반환합니다.
    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogStreamError> {
        const MAX_BUFFER_CAPACITY: usize = 100_000;
        const MIN_EMIT_INTERVAL_MS: u64 = 10;
        const MAX_EMIT_INTERVAL_MS: u64 = 3_600_000; // 1 hour

        if self.buffer_capacity == 0 || self.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(LogStreamError::Config {
                field: "buffer_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_BUFFER_CAPACITY),
            });
        }

        if !(MIN_EMIT_INTERVAL_MS..=MAX_EMIT_INTERVAL_MS).contains(&self.emit_interval_ms) {
            return Err(LogStreamError::Config {
                field: "emit_interval_ms".to_owned(),
                reason: format!("must be {}-{}", MIN_EMIT_INTERVAL_MS, MAX_EMIT_INTERVAL_MS),
            });
        }

        for (field, ratio) in [
            ("attack_ratio", self.attack_ratio),
            ("burst_attack_ratio", self.burst_attack_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(LogStreamError::Config {
                    field: field.to_owned(),
                    reason: "must be within 0.0-1.0".to_owned(),
                });
            }
        }

        if self.alert_channel_capacity == 0 {
            return Err(LogStreamError::Config {
                field: "alert_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 스트림 설정 빌더
#[derive(Default)]
pub struct StreamConfigBuilder {
    config: StreamConfig,
}

impl StreamConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 버퍼 용량을 설정합니다.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// 생성 주기(밀리초)를 설정합니다.
    pub fn emit_interval_ms(mut self, ms: u64) -> Self {
        self.config.emit_interval_ms = ms;
        self
    }

    /// 주기적 생성의 공격 비율을 설정합니다.
    pub fn attack_ratio(mut self, ratio: f64) -> Self {
        self.config.attack_ratio = ratio;
        self
    }

    /// 버스트 생성의 공격 비율을 설정합니다.
    pub fn burst_attack_ratio(mut self, ratio: f64) -> Self {
        self.config.burst_attack_ratio = ratio;
        self
    }

    /// 자동 분류 여부를 설정합니다.
    pub fn auto_enrich(mut self, enabled: bool) -> Self {
        self.config.auto_enrich = enabled;
        self
    }

    /// 알림 채널 용량을 설정합니다.
    pub fn alert_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.alert_channel_capacity = capacity;
        self
    }

    /// 난수 시드를 고정합니다.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.config.rng_seed = Some(seed);
        self
    }

    /// 설정을 검증하고 `StreamConfig`를 생성합니다.
    pub fn build(self) -> Result<StreamConfig, LogStreamError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
