use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::queue::CommandQueue;
use crate::worker::executor::ExecutionReport;

/// Wire body of a response message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub correlation_id: String,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResponse {
    pub fn new(correlation_id: &str, report: &ExecutionReport) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            success: report.success,
            stdout: report.stdout.clone(),
            stderr: report.stderr.clone().unwrap_or_default(),
            exit_code: report.exit_code,
        }
    }
}

/// Best-effort, fire-and-forget publisher of execution results.
///
/// Every failure on this path is logged and swallowed; publishing never
/// affects message acknowledgment or executor state.
pub struct ResponsePublisher<Q> {
    queue: Arc<Q>,
    subject: Option<String>,
}

impl<Q: CommandQueue> ResponsePublisher<Q> {
    /// `subject: None` disables responses entirely.
    pub fn new(queue: Arc<Q>, subject: Option<String>) -> Self {
        Self { queue, subject }
    }

    pub async fn publish(&self, correlation_id: &str, report: &ExecutionReport) {
        let Some(subject) = &self.subject else {
            tracing::debug!(correlation_id, "No response destination configured; skipping");
            return;
        };

        let response = CommandResponse::new(correlation_id, report);
        let payload = match serde_json::to_vec(&response) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(correlation_id, error = %err, "Failed to serialize response");
                return;
            }
        };

        match self
            .queue
            .send_response(subject, correlation_id, payload)
            .await
        {
            Ok(()) => {
                tracing::debug!(correlation_id, subject = %subject, "Response published");
            }
            Err(err) => {
                tracing::warn!(
                    correlation_id,
                    subject = %subject,
                    error = %err,
                    "Failed to publish response"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_round_trip() {
        let report = ExecutionReport {
            success: false,
            exit_code: 128,
            stdout: "partial".to_string(),
            stderr: Some("fatal: not a git repository".to_string()),
        };
        let response = CommandResponse::new("corr-1", &report);

        let body = serde_json::to_string(&response).unwrap();
        let decoded: CommandResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let report = ExecutionReport {
            success: true,
            exit_code: 0,
            stdout: "hello\n".to_string(),
            stderr: None,
        };
        let body = serde_json::to_value(CommandResponse::new("abc", &report)).unwrap();

        assert_eq!(body["correlationId"], "abc");
        assert_eq!(body["success"], true);
        assert_eq!(body["stdout"], "hello\n");
        assert_eq!(body["stderr"], "");
        assert_eq!(body["exitCode"], 0);
    }
}
