//! # Task Sequencer
//!
//! A [`TaskList`] is a named, nested group of zero-argument actions. Running
//! it executes every action strictly in registration order on the calling
//! thread and produces a [`TaskReport`] of what ran.
//!
//! - In pretend mode actions are recorded as [`TaskStatus::Pretended`] and
//!   never invoked.
//! - The first failing action aborts the run; nothing is rolled back.
//! - Groups without any task are left out of the report.

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::error::Result;

/// A deferred action. It may borrow whatever the list's creator owns.
pub type Action<'a> = Box<dyn FnOnce() -> Result<()> + 'a>;

enum Entry<'a> {
    Task { name: String, action: Action<'a> },
    Group(TaskList<'a>),
}

/// An ordered, named group of tasks and sub-groups.
pub struct TaskList<'a> {
    name: String,
    entries: Vec<Entry<'a>>,
}

impl<'a> TaskList<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a task.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        action: impl FnOnce() -> Result<()> + 'a,
    ) -> &mut Self {
        self.entries.push(Entry::Task {
            name: name.into(),
            action: Box::new(action),
        });
        self
    }

    /// Appends a nested group.
    pub fn group(&mut self, group: TaskList<'a>) -> &mut Self {
        self.entries.push(Entry::Group(group));
        self
    }

    /// Number of tasks, counting nested groups.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Task { .. } => 1,
                Entry::Group(group) => group.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every task in order, or only records them when `pretend` is set.
    pub fn run(self, pretend: bool) -> Result<TaskReport> {
        let mut report = TaskReport {
            name: self.name,
            entries: Vec::new(),
        };
        for entry in self.entries {
            match entry {
                Entry::Task { name, action } => {
                    let status = if pretend {
                        info!("(pretend) {}", name);
                        TaskStatus::Pretended
                    } else {
                        debug!("Running {}", name);
                        action()?;
                        TaskStatus::Done
                    };
                    report.entries.push(ReportEntry::Task { name, status });
                }
                Entry::Group(group) => {
                    if group.is_empty() {
                        continue;
                    }
                    report.entries.push(ReportEntry::Group(group.run(pretend)?));
                }
            }
        }
        Ok(report)
    }
}

/// What happened to one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Done,
    Pretended,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Done => f.write_str("done"),
            TaskStatus::Pretended => f.write_str("pretend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportEntry {
    Task { name: String, status: TaskStatus },
    Group(TaskReport),
}

/// The outcome of running a [`TaskList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub entries: Vec<ReportEntry>,
}

impl TaskReport {
    /// Names of all tasks in execution order, flattened.
    pub fn task_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for entry in &self.entries {
            match entry {
                ReportEntry::Task { name, .. } => names.push(name.as_str()),
                ReportEntry::Group(group) => names.extend(group.task_names()),
            }
        }
        names
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.name, indent = depth * 2)?;
        for entry in &self.entries {
            writeln!(f)?;
            match entry {
                ReportEntry::Task { name, status } => write!(
                    f,
                    "{:indent$}[{}] {}",
                    "",
                    status,
                    name,
                    indent = (depth + 1) * 2
                )?,
                ReportEntry::Group(group) => group.write_indented(f, depth + 1)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
