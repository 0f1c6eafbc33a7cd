use serde::Deserialize;

use crate::ExecError;

/// Settings for the process-wide background runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Async worker threads driving serial queues. `None` keeps tokio's default.
    pub worker_threads: Option<usize>,
    /// Upper bound on threads running background callbacks. `None` keeps tokio's default.
    pub max_blocking_threads: Option<usize>,
    pub thread_name: String,
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.worker_threads == Some(0) {
            return Err(ExecError::InvalidConfig("worker_threads must be > 0".into()));
        }
        if self.max_blocking_threads == Some(0) {
            return Err(ExecError::InvalidConfig(
                "max_blocking_threads must be > 0".into(),
            ));
        }
        if self.thread_name.trim().is_empty() {
            return Err(ExecError::InvalidConfig("thread_name is empty".into()));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_blocking_threads: None,
            thread_name: "handoff-worker".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_threads_rejected() {
        let cfg = RuntimeConfig {
            worker_threads: Some(0),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ExecError::InvalidConfig(_))));

        let cfg = RuntimeConfig {
            max_blocking_threads: Some(0),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ExecError::InvalidConfig(_))));
    }

    #[test]
    fn blank_thread_name_rejected() {
        let cfg = RuntimeConfig {
            thread_name: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ExecError::InvalidConfig(_))));
    }

    #[test]
    fn deserialize_partial_json() {
        let cfg: RuntimeConfig = serde_json::from_str(r#"{"workerThreads": 2}"#).unwrap();
        assert_eq!(cfg.worker_threads, Some(2));
        assert_eq!(cfg.max_blocking_threads, None);
        assert_eq!(cfg.thread_name, "handoff-worker");
    }
}
