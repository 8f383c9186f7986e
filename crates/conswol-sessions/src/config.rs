//! Multiplexer configuration.

use std::time::Duration;

use conswol_runner::RunnerConfig;

/// Configuration for the session multiplexer.
#[derive(Debug, Clone)]
pub struct MultiplexerConfig {
    /// Maximum concurrently active sessions.
    pub max_sessions: usize,
    /// Grace period for graceful kills before the forced kill.
    pub grace_period: Duration,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            max_sessions: 32,
            grace_period: Duration::from_secs(5),
        }
    }
}

impl MultiplexerConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of concurrently active sessions.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Sets the grace period for graceful kills.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Runner configuration derived from this config.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::new().with_grace_period(self.grace_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MultiplexerConfig::default();
        assert_eq!(config.max_sessions, 32);
        assert_eq!(config.grace_period, Duration::from_secs(5));
    }

    #[test]
    fn test_config_builder() {
        let config = MultiplexerConfig::new()
            .with_max_sessions(4)
            .with_grace_period(Duration::from_millis(100));

        assert_eq!(config.max_sessions, 4);
        assert_eq!(config.runner_config().grace_period, Duration::from_millis(100));
    }
}
