use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

/// One independently executable unit of work.
///
/// `target` is the work descriptor handed to the [`TaskWork`](crate::executor::traits::TaskWork)
/// implementation; for the HTTP fetch plugin it is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub target: String,
}

impl Task {
    pub fn new(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
        }
    }

    /// Build tasks from bare targets, numbering ids from 1 in submission order.
    pub fn numbered<I, S>(targets: I) -> Vec<Task>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        targets
            .into_iter()
            .enumerate()
            .map(|(idx, target)| Task::new((idx + 1).to_string(), target))
            .collect()
    }
}

/// Common task interface for anything carrying a batch-unique id.
pub trait TaskLike: Clone + Send + Sync {
    fn id(&self) -> &str;
}

impl TaskLike for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Reject empty or repeated ids before any work is dispatched.
pub fn validate_tasks<T: TaskLike>(tasks: &[T]) -> Result<(), ExecutorError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        let id = task.id();
        if id.trim().is_empty() {
            return Err(ExecutorError::InvalidTaskId(id.to_string()));
        }
        if !seen.insert(id) {
            return Err(ExecutorError::DuplicateTaskId(id.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_ids_follow_submission_order() {
        let tasks = Task::numbered(["https://a", "https://b"]);
        assert_eq!(tasks[0], Task::new("1", "https://a"));
        assert_eq!(tasks[1], Task::new("2", "https://b"));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let tasks = vec![Task::new("a", "x"), Task::new("b", "y"), Task::new("a", "z")];
        let err = validate_tasks(&tasks).unwrap_err();
        assert!(matches!(err, ExecutorError::DuplicateTaskId(id) if id == "a"));
    }

    #[test]
    fn test_validate_rejects_blank_id() {
        let tasks = vec![Task::new(" ", "x")];
        assert!(matches!(
            validate_tasks(&tasks),
            Err(ExecutorError::InvalidTaskId(_))
        ));
    }

    #[test]
    fn test_validate_accepts_empty_batch() {
        assert!(validate_tasks::<Task>(&[]).is_ok());
    }
}
