//! 주기적 생성 루프 -- 취소 가능한 반복 타이머
//!
//! [`EmissionLoop`]는 모니터링이 켜져 있는 동안 주기마다 `tick` 콜백을 실행합니다.
//! 콜백은 레코드를 생성해 버퍼에 넣는 작업을 담당합니다.
//!
//! - `start`는 이미 실행 중이면 아무 일도 하지 않습니다.
//! - `stop`은 취소 후 태스크 종료를 기다리므로, 반환 이후에는 어떤 tick도 실행되지 않습니다.
//! - 진행 중인 tick은 끝까지 실행된 뒤 루프가 종료됩니다.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// 취소 가능한 주기적 생성 루프
#[derive(Default)]
pub struct EmissionLoop {
    running: Option<Running>,
}

impl EmissionLoop {
    /// 정지 상태의 루프를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 실행 중인지 확인합니다.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// 루프를 시작합니다. 첫 tick은 한 주기 후에 실행됩니다.
    ///
    /// 이미 실행 중이면 `false`를 반환하고 아무 것도 바꾸지 않습니다.
    pub fn start<F, Fut>(&mut self, period: Duration, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if self.running.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!("emission loop cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        tick().await;
                    }
                }
            }
        });

        tracing::debug!(period_ms = period.as_millis() as u64, "emission loop started");
        self.running = Some(Running { cancel, task });
        true
    }

    /// 루프를 정지하고 태스크 종료를 기다립니다.
    ///
    /// 실행 중이 아니면 `false`를 반환합니다. 두 번 호출해도 한 번 호출한 것과 같습니다.
    pub async fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };

        running.cancel.cancel();
        if let Err(e) = running.task.await {
            tracing::warn!(error = %e, "emission loop task ended abnormally");
        }
        true
    }
}

impl Drop for EmissionLoop {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut emission = EmissionLoop::new();
        assert!(emission.start(Duration::from_millis(1500), counting_tick(&counter)));

        // 첫 tick은 한 주기 후
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        emission.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut emission = EmissionLoop::new();
        assert!(emission.start(Duration::from_millis(100), counting_tick(&counter)));
        assert!(!emission.start(Duration::from_millis(100), counting_tick(&counter)));

        tokio::time::sleep(Duration::from_millis(350)).await;
        // 두 번째 start가 무시되어 tick 속도가 두 배가 되지 않음
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        emission.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut emission = EmissionLoop::new();
        emission.start(Duration::from_millis(100), counting_tick(&counter));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(emission.stop().await);
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(!emission.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_twice_equals_stop_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut emission = EmissionLoop::new();
        emission.start(Duration::from_millis(100), counting_tick(&counter));

        assert!(emission.stop().await);
        assert!(!emission.stop().await);

        // 정지 후 재시작 가능
        assert!(emission.start(Duration::from_millis(100), counting_tick(&counter)));
        emission.stop().await;
    }
}
