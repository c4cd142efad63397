use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Extra margin added to every computed wait
const WAIT_MARGIN: Duration = Duration::from_secs(1);

/// Sliding-window limiter over request count and estimated token usage
#[derive(Debug)]
pub struct TokenRateLimiter {
    requests: VecDeque<Instant>,
    token_usage: VecDeque<(Instant, u64)>,
    max_requests: usize,
    max_tokens: u64,
    window: Duration,
}

impl Default for TokenRateLimiter {
    /// 200 requests and 150k tokens per minute
    fn default() -> Self {
        Self::new(200, 150_000, Duration::from_secs(60))
    }
}

impl TokenRateLimiter {
    pub fn new(max_requests: usize, max_tokens: u64, window: Duration) -> Self {
        Self {
            requests: VecDeque::new(),
            token_usage: VecDeque::new(),
            max_requests,
            max_tokens,
            window,
        }
    }

    /// Drop entries older than the window, then work out how long to wait
    /// before a request of `estimated_tokens` may go out at `now`
    pub fn required_wait(&mut self, now: Instant, estimated_tokens: u64) -> Option<Duration> {
        let window = self.window;
        self.requests
            .retain(|t| now.saturating_duration_since(*t) < window);
        self.token_usage
            .retain(|(t, _)| now.saturating_duration_since(*t) < window);

        let until_expired = |oldest: Instant| {
            (window + WAIT_MARGIN).saturating_sub(now.saturating_duration_since(oldest))
        };

        let request_wait = if self.requests.len() >= self.max_requests {
            self.requests.iter().min().map(|oldest| until_expired(*oldest))
        } else {
            None
        };

        let current_tokens: u64 = self.token_usage.iter().map(|(_, tokens)| tokens).sum();
        let token_wait = if current_tokens + estimated_tokens > self.max_tokens {
            self.token_usage
                .iter()
                .map(|(t, _)| *t)
                .min()
                .map(until_expired)
        } else {
            None
        };

        request_wait.max(token_wait).filter(|wait| !wait.is_zero())
    }

    pub fn record(&mut self, at: Instant, tokens: u64) {
        self.requests.push_back(at);
        self.token_usage.push_back((at, tokens));
    }

    /// Sleep until the request fits in the window, then record it
    pub async fn wait_if_needed(&mut self, estimated_tokens: u64) {
        if let Some(wait) = self.required_wait(Instant::now(), estimated_tokens) {
            tracing::info!(
                "Rate limit reached, waiting {} seconds",
                wait.as_secs_f64().ceil()
            );
            tokio::time::sleep(wait).await;
        }
        self.record(Instant::now(), estimated_tokens);
    }
}
