use std::{fmt::Display, time::Duration};

#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub multiplier: f64,
    pub cap: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(2000),
            multiplier: 2.0,
            cap: Duration::from_millis(5000),
        }
    }
}

/// Retries `attempt` with exponential backoff (starting at `backoff`, doubling each
/// time, capped at `cap`) up to `max_attempts` tries. Returns the trace of every
/// failed attempt alongside the final error so callers can DLT with context.
pub async fn retry_with_backoff<F, Fut, T, E>(
    settings: RetrySettings,
    mut attempt: F,
) -> Result<T, Vec<String>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
{
    let mut trace = Vec::new();
    let mut delay = settings.backoff;

    for attempt_no in 1..=settings.max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                trace.push(format!("attempt {attempt_no}: {err}"));
                if attempt_no < settings.max_attempts {
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_secs_f64(delay.as_secs_f64() * settings.multiplier),
                        settings.cap,
                    );
                }
            }
        }
    }

    Err(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let attempts = AtomicU32::new(0);
        let settings = RetrySettings {
            max_attempts: 5,
            backoff: Duration::from_millis(1),
            multiplier: 2.0,
            cap: Duration::from_millis(4),
        };

        let result: Result<u32, Vec<String>> = retry_with_backoff(settings, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err::<u32, &str>("not yet")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_trace() {
        let settings = RetrySettings {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
            multiplier: 2.0,
            cap: Duration::from_millis(2),
        };

        let result: Result<u32, Vec<String>> =
            retry_with_backoff(settings, || async { Err::<u32, &str>("boom") }).await;

        let trace = result.unwrap_err();
        assert_eq!(trace.len(), 3);
    }
}
