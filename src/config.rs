use std::time::Duration;

use crate::error::{Result, WorkerError};

pub const ENV_QUEUE_URL: &str = "QEXEC_QUEUE_URL";
pub const ENV_JS_DOMAIN: &str = "QEXEC_JS_DOMAIN";
pub const ENV_RESPONSE_SUBJECT: &str = "QEXEC_RESPONSE_SUBJECT";
pub const ENV_ALLOWED_COMMANDS: &str = "QEXEC_ALLOWED_COMMANDS";
pub const ENV_POLL_WAIT_SECS: &str = "QEXEC_POLL_WAIT_SECS";
pub const ENV_IDLE_DELAY_SECS: &str = "QEXEC_IDLE_DELAY_SECS";
pub const ENV_ACK_WAIT_SECS: &str = "QEXEC_ACK_WAIT_SECS";

const DEFAULT_POLL_WAIT_SECS: u64 = 20;
const DEFAULT_IDLE_DELAY_SECS: u64 = 5;
const DEFAULT_ACK_WAIT_SECS: u64 = 30;

/// Commands permitted when no override is configured.
const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    "cat", "date", "df", "echo", "git", "hostname", "ls", "uname", "uptime", "whoami",
];

/// Suffix appended to the queue name to derive the response subject.
const RESPONSE_SUFFIX: &str = "-responses";

/// Worker configuration, read once from the environment at startup.
///
/// There are no CLI flags and no configuration files; everything comes from
/// `QEXEC_*` environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Server part of the queue address (e.g. "nats://127.0.0.1:4222")
    pub server_url: String,
    /// Queue name, taken from the final path segment of the queue address
    pub queue: String,
    /// Optional JetStream domain
    pub js_domain: Option<String>,
    /// Explicit response subject override; when unset the subject is derived
    /// from the queue name
    pub response_override: Option<String>,
    /// Base command names permitted to run
    pub allowed_commands: Vec<String>,
    /// Upper bound on a single long-poll receive
    pub poll_wait: Duration,
    /// Delay before the next poll after an empty receive
    pub idle_delay: Duration,
    /// Consumer ack wait: how long an unacknowledged delivery stays invisible
    /// before the server redelivers it. Must exceed the worst-case
    /// parse+execute+respond+ack time of the longest permitted command.
    pub ack_wait: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            server_url: "nats://127.0.0.1:4222".to_string(),
            queue: "commands".to_string(),
            js_domain: None,
            response_override: None,
            allowed_commands: default_allowed_commands(),
            poll_wait: Duration::from_secs(DEFAULT_POLL_WAIT_SECS),
            idle_delay: Duration::from_secs(DEFAULT_IDLE_DELAY_SECS),
            ack_wait: Duration::from_secs(DEFAULT_ACK_WAIT_SECS),
        }
    }
}

impl WorkerConfig {
    /// Load the configuration from the environment.
    ///
    /// The queue address is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let queue_url = std::env::var(ENV_QUEUE_URL)
            .map_err(|_| WorkerError::Config(format!("{ENV_QUEUE_URL} is not set")))?;
        let (server_url, queue) = split_queue_url(&queue_url)?;

        let allowed_commands = match std::env::var(ENV_ALLOWED_COMMANDS) {
            Ok(csv) => parse_allowed_commands(&csv)?,
            Err(_) => default_allowed_commands(),
        };

        Ok(Self {
            server_url,
            queue,
            js_domain: non_empty_var(ENV_JS_DOMAIN),
            response_override: non_empty_var(ENV_RESPONSE_SUBJECT),
            allowed_commands,
            poll_wait: duration_var(ENV_POLL_WAIT_SECS, DEFAULT_POLL_WAIT_SECS)?,
            idle_delay: duration_var(ENV_IDLE_DELAY_SECS, DEFAULT_IDLE_DELAY_SECS)?,
            ack_wait: duration_var(ENV_ACK_WAIT_SECS, DEFAULT_ACK_WAIT_SECS)?,
        })
    }

    /// Resolve the response destination.
    ///
    /// An explicit override wins; otherwise the subject is the queue name with
    /// a fixed suffix appended. `None` disables responses entirely.
    pub fn response_subject(&self) -> Option<String> {
        if let Some(subject) = &self.response_override {
            return Some(subject.clone());
        }
        if self.queue.is_empty() {
            return None;
        }
        Some(format!("{}{}", self.queue, RESPONSE_SUFFIX))
    }
}

fn default_allowed_commands() -> Vec<String> {
    DEFAULT_ALLOWED_COMMANDS
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Split a queue address of the form `nats://host:port/<queue>` into the
/// server URL and the queue name (the final path segment).
fn split_queue_url(url: &str) -> Result<(String, String)> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let rest = &url[scheme_end..];

    let slash = rest.rfind('/').ok_or_else(|| {
        WorkerError::Config(format!(
            "queue address \"{url}\" is missing a queue name path segment"
        ))
    })?;

    let server = &url[..scheme_end + slash];
    let queue = &rest[slash + 1..];
    if server.is_empty() || queue.is_empty() {
        return Err(WorkerError::Config(format!(
            "queue address \"{url}\" is missing a queue name path segment"
        )));
    }

    Ok((server.to_string(), queue.to_string()))
}

fn parse_allowed_commands(csv: &str) -> Result<Vec<String>> {
    let commands: Vec<String> = csv
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    if commands.is_empty() {
        return Err(WorkerError::Config(format!(
            "{ENV_ALLOWED_COMMANDS} is set but contains no commands"
        )));
    }
    Ok(commands)
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn duration_var(name: &str, default_secs: u64) -> Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => {
            let secs: u64 = raw
                .parse()
                .map_err(|_| WorkerError::Config(format!("{name} must be an integer: \"{raw}\"")))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_queue_url_with_scheme() {
        let (server, queue) = split_queue_url("nats://10.0.0.5:4222/commands").unwrap();
        assert_eq!(server, "nats://10.0.0.5:4222");
        assert_eq!(queue, "commands");
    }

    #[test]
    fn split_queue_url_takes_final_segment() {
        let (server, queue) = split_queue_url("nats://queue.internal:4222/prod/commands").unwrap();
        assert_eq!(server, "nats://queue.internal:4222/prod");
        assert_eq!(queue, "commands");
    }

    #[test]
    fn split_queue_url_without_queue_name() {
        assert!(split_queue_url("nats://10.0.0.5:4222").is_err());
        assert!(split_queue_url("nats://10.0.0.5:4222/").is_err());
    }

    #[test]
    fn response_subject_derived_from_queue() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.response_subject().as_deref(), Some("commands-responses"));
    }

    #[test]
    fn response_subject_override_wins() {
        let cfg = WorkerConfig {
            response_override: Some("replies".to_string()),
            ..WorkerConfig::default()
        };
        assert_eq!(cfg.response_subject().as_deref(), Some("replies"));
    }

    #[test]
    fn response_subject_disabled_without_queue_name() {
        let cfg = WorkerConfig {
            queue: String::new(),
            ..WorkerConfig::default()
        };
        assert!(cfg.response_subject().is_none());
    }

    #[test]
    fn default_config() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.server_url, "nats://127.0.0.1:4222");
        assert_eq!(cfg.queue, "commands");
        assert!(cfg.js_domain.is_none());
        assert_eq!(cfg.poll_wait, Duration::from_secs(20));
        assert_eq!(cfg.idle_delay, Duration::from_secs(5));
        assert_eq!(cfg.ack_wait, Duration::from_secs(30));
        assert!(cfg.allowed_commands.contains(&"echo".to_string()));
        assert!(!cfg.allowed_commands.contains(&"rm".to_string()));
    }

    #[test]
    fn parse_allowed_commands_trims_and_skips_empty() {
        let commands = parse_allowed_commands("echo, git ,,ls").unwrap();
        assert_eq!(commands, vec!["echo", "git", "ls"]);
    }

    #[test]
    fn parse_allowed_commands_rejects_blank() {
        assert!(parse_allowed_commands(" , ,").is_err());
    }
}
