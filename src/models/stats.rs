use serde::{Deserialize, Serialize};

use super::task::{TaskPriority, TaskStatus};

/// One group of the dashboard aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCount<K> {
    #[serde(rename = "_id")]
    pub key: K,
    pub count: i64,
}

/// Per-status and per-priority counts for one user.
///
/// Groups with no tasks are omitted; the rest appear in enum declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub status_stats: Vec<StatCount<TaskStatus>>,
    pub priority_stats: Vec<StatCount<TaskPriority>>,
    pub total: i64,
}

impl TaskStats {
    /// Folds `(status, priority, count)` groups, as produced by a single
    /// `GROUP BY status, priority` scan, into the response shape.
    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (TaskStatus, TaskPriority, i64)>,
    {
        let mut by_status = [0i64; TaskStatus::ALL.len()];
        let mut by_priority = [0i64; TaskPriority::ALL.len()];
        let mut total = 0;
        for (status, priority, count) in groups {
            by_status[status as usize] += count;
            by_priority[priority as usize] += count;
            total += count;
        }

        Self {
            status_stats: collect_nonzero(&TaskStatus::ALL, &by_status),
            priority_stats: collect_nonzero(&TaskPriority::ALL, &by_priority),
            total,
        }
    }
}

fn collect_nonzero<K: Copy>(keys: &[K], counts: &[i64]) -> Vec<StatCount<K>> {
    keys.iter()
        .zip(counts)
        .filter(|(_, count)| **count > 0)
        .map(|(key, count)| StatCount {
            key: *key,
            count: *count,
        })
        .collect()
}
