//! Batch log and outcome report.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::request::TopicAction;
use crate::error::DocsError;
use crate::jobs::JobProgress;
use crate::types::ContentKey;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress narration.
    Normal,
    /// A failed item.
    Error,
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Severity.
    pub level: LogLevel,
    /// Text.
    pub message: String,
}

/// Line-oriented log of a batch, returned to the client when it finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLog {
    lines: Vec<LogLine>,
}

impl BatchLog {
    /// Append a normal line.
    pub fn normal(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Normal, message.into());
    }

    /// Append an error line.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Normal => tracing::debug!(target: "batch", "{}", message),
            LogLevel::Error => tracing::warn!(target: "batch", "{}", message),
        }
        self.lines.push(LogLine { level, message });
    }

    /// Lines in order.
    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Error lines only.
    pub fn errors(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().filter(|l| l.level == LogLevel::Error)
    }

    /// Render as text, one line each, errors prefixed.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|l| match l.level {
                LogLevel::Normal => l.message.clone(),
                LogLevel::Error => format!("Error: {}", l.message),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result for one topic row.
#[derive(Debug, Clone)]
pub struct TopicOutcome {
    /// Manual of the row.
    pub manual: String,
    /// Section of the row.
    pub section: String,
    /// Display text of the row.
    pub text: String,
    /// Requested action.
    pub action: TopicAction,
    /// Unit now serving the target version, when the action succeeded.
    pub target: Option<ContentKey>,
    /// Failure, when it did not.
    pub error: Option<DocsError>,
}

impl TopicOutcome {
    /// Whether the row went through.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// TOC step performed for a manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocOperation {
    /// Source TOC tagged with the target version.
    Inherited,
    /// Source TOC copied to a new target TOC.
    Branched,
    /// New target TOC created from the batch's topics.
    Created,
    /// Topics merged into the existing target TOC.
    Merged {
        /// Number of topics added.
        added: usize,
    },
}

/// Result of a manual's TOC step.
#[derive(Debug, Clone)]
pub struct TocOutcome {
    /// Manual.
    pub manual: String,
    /// Step attempted.
    pub operation: TocOperation,
    /// Failure, if any.
    pub error: Option<DocsError>,
}

/// Full report of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Source version.
    pub source: String,
    /// Target version.
    pub target: String,
    /// TOC step results, one per manual.
    pub toc_outcomes: Vec<TocOutcome>,
    /// Topic results in request order.
    pub outcomes: Vec<TopicOutcome>,
    /// Final progress.
    pub progress: JobProgress,
    /// Wall time.
    pub elapsed: Duration,
    /// Narrated log.
    pub log: BatchLog,
}

impl BatchReport {
    /// Topic rows that went through.
    pub fn successes(&self) -> impl Iterator<Item = &TopicOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Topic rows that failed.
    pub fn failures(&self) -> impl Iterator<Item = &TopicOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Whether any TOC step or topic row failed.
    pub fn has_errors(&self) -> bool {
        self.failures().next().is_some() || self.toc_outcomes.iter().any(|t| t.error.is_some())
    }
}
