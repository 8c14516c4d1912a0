//! Checklist items for TASK queries.

use std::sync::LazyLock;

use regex::Regex;

static TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*+]\s+\[([ xX])\]\s+(.*?)\s*$").expect("valid task regex")
});

/// One `- [ ] text` line of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub text: String,
    pub completed: bool,
    /// 1-based line number in the raw content
    pub line: usize,
}

/// Extracts every checklist item from `raw_content`, in document order.
pub fn extract_tasks(raw_content: &str) -> Vec<TaskItem> {
    raw_content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let caps = TASK_LINE.captures(line)?;
            Some(TaskItem {
                text: caps[2].to_string(),
                completed: &caps[1] != " ",
                line: index + 1,
            })
        })
        .collect()
}
