use prometheus::IntGauge;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards the bus client. After `failure_threshold` consecutive failures the
// breaker opens and rejects calls without touching the network. Once
// `cool_down` has passed it lets calls through again (half-open) and closes
// after `success_threshold` of them succeed. Any half-open failure reopens it.
//
// A call that outlives its deadline counts as a failure. Callers that need a
// bound must pass it here instead of dropping the future from outside, or the
// breaker never sees the failure.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding (0=Closed, 1=Open, 2=HalfOpen).
    fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub cool_down: Duration,
    /// Half-open successes needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen { successes: u32 },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    phase: Mutex<Phase>,
    config: CircuitBreakerConfig,
    state_gauge: Option<IntGauge>,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    Open,

    #[error("call did not finish within {0:?}")]
    DeadlineElapsed(Duration),

    #[error(transparent)]
    Inner(E),
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            phase: Mutex::new(Phase::Closed { failures: 0 }),
            config,
            state_gauge: None,
        }
    }

    /// Mirror every state change into `gauge` (0=Closed, 1=Open, 2=HalfOpen).
    pub fn with_state_gauge(mut self, gauge: IntGauge) -> Self {
        gauge.set(CircuitState::Closed.as_gauge());
        self.state_gauge = Some(gauge);
        self
    }

    /// Run `operation` unless the circuit is open.
    ///
    /// The lock is not held while the operation runs, so concurrent callers
    /// are not serialized behind a slow call.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut phase = self.phase.lock().await;
            if let Phase::Open { since } = *phase {
                if since.elapsed() < self.config.cool_down {
                    return Err(CircuitBreakerError::Open);
                }
                tracing::info!("Circuit breaker half-open, probing bus");
                self.enter(&mut phase, Phase::HalfOpen { successes: 0 });
            }
        }

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    /// Like [`call`](Self::call), but gives up after `deadline` and records
    /// the overrun as a failure.
    pub async fn call_with_deadline<F, T, E>(
        &self,
        deadline: Duration,
        operation: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        let bounded = async {
            match tokio::time::timeout(deadline, operation).await {
                Ok(result) => result.map_err(CircuitBreakerError::Inner),
                Err(_) => Err(CircuitBreakerError::DeadlineElapsed(deadline)),
            }
        };

        self.call(bounded).await.map_err(|err| match err {
            CircuitBreakerError::Inner(inner) => inner,
            CircuitBreakerError::Open => CircuitBreakerError::Open,
            CircuitBreakerError::DeadlineElapsed(d) => CircuitBreakerError::DeadlineElapsed(d),
        })
    }

    fn enter(&self, phase: &mut Phase, next: Phase) {
        *phase = next;
        if let Some(gauge) = &self.state_gauge {
            gauge.set(phase.state().as_gauge());
        }
    }

    async fn on_success(&self) {
        let mut phase = self.phase.lock().await;
        match *phase {
            Phase::Closed { .. } => *phase = Phase::Closed { failures: 0 },
            Phase::HalfOpen { successes } => {
                let successes = successes + 1;
                if successes >= self.config.success_threshold {
                    tracing::info!(successes, "Circuit breaker closed");
                    self.enter(&mut phase, Phase::Closed { failures: 0 });
                } else {
                    *phase = Phase::HalfOpen { successes };
                }
            }
            // A call admitted before another caller tripped the breaker.
            Phase::Open { .. } => {}
        }
    }

    async fn on_failure(&self) {
        let mut phase = self.phase.lock().await;
        match *phase {
            Phase::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.config.failure_threshold {
                    tracing::warn!(failures, "Circuit breaker opened");
                    self.enter(&mut phase, Phase::Open { since: Instant::now() });
                } else {
                    *phase = Phase::Closed { failures };
                }
            }
            Phase::HalfOpen { .. } => {
                tracing::warn!("Probe failed while half-open, reopening circuit");
                self.enter(&mut phase, Phase::Open { since: Instant::now() });
            }
            Phase::Open { .. } => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.phase.lock().await.state()
    }
}
