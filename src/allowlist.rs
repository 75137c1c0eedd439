use std::collections::HashSet;

/// Immutable set of permitted base command names, fixed at process start.
///
/// The check bounds which binaries may run, not what they can do once
/// invoked; arguments are never inspected.
#[derive(Debug, Clone)]
pub struct Allowlist {
    commands: HashSet<String>,
}

impl Allowlist {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    /// Decide whether a command may run.
    ///
    /// Only the base command name is compared: the last `/`-separated
    /// segment, reduced to its first whitespace token when the segment still
    /// contains whitespace. Membership is exact and case-sensitive.
    pub fn permits(&self, command: &str) -> bool {
        let base = command.rsplit('/').next().unwrap_or(command);
        let base = base.split_whitespace().next().unwrap_or("");
        self.commands.contains(base)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
