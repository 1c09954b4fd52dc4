//! Bounded I/O pool
//!
//! Every system-of-record query and cache call holds one permit for its
//! duration and is cut off after a timeout. Request-path calls use the pool
//! default; model builds pass their own, longer budget.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct IoPool {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl IoPool {
    pub fn new(size: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
            timeout,
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `fut` once a permit is free; waiting for the permit counts against the timeout
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.run_with_timeout(operation, self.timeout, fut).await
    }

    /// Same as [`IoPool::run`] with an explicit budget
    pub async fn run_with_timeout<T, F>(
        &self,
        operation: &'static str,
        timeout: Duration,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let call = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| AppError::Internal("I/O pool closed".to_string()))?;
            fut.await
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = timeout.as_millis() as u64,
                    "I/O call timed out"
                );
                Err(AppError::Timeout(format!("{} exceeded {:?}", operation, timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_inner_result() {
        let pool = IoPool::new(1, Duration::from_secs(1));
        let value = pool.run("ok", async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let pool = IoPool::new(1, Duration::from_millis(20));
        let result = pool
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, AppError>(())
            })
            .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
        // permit released after the timeout
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_waiting_for_permit_counts_against_timeout() {
        let pool = IoPool::new(1, Duration::from_millis(50));
        let held = pool.permits.clone().acquire_owned().await.unwrap();

        let result = pool.run("blocked", async { Ok::<_, AppError>(()) }).await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
        drop(held);
    }

    #[tokio::test]
    async fn test_explicit_timeout_overrides_default() {
        let pool = IoPool::new(1, Duration::from_millis(20));
        let value = pool
            .run_with_timeout("slow_load", Duration::from_secs(2), async {
                tokio::time::sleep(Duration::from_millis(60)).await;
                Ok::<_, AppError>(3)
            })
            .await
            .unwrap();
        assert_eq!(value, 3);

        let result = pool
            .run("slow_load", async {
                tokio::time::sleep(Duration::from_millis(60)).await;
                Ok::<_, AppError>(3)
            })
            .await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }
}
