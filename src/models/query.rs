use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::task::{Task, TaskPriority, TaskStatus};

/// Fields a task list can be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueDate,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Represents query parameters for filtering tasks when listing them.
///
/// Listing is always scoped to the authenticated user; there is no owner filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Case-insensitive substring matched against title or description.
    pub search: Option<String>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl TaskQuery {
    /// Search text with surrounding whitespace removed; `None` if nothing is left.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_by.unwrap_or_default()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order.unwrap_or_default()
    }

    /// Whether `task` passes the status, priority and search filters.
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        match self.search_text() {
            Some(needle) => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }

    /// Total order used for listing.
    ///
    /// Titles compare by code point. Tasks without a due date come after dated ones
    /// in both directions. Ties fall back to ascending id.
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let order = self.sort_order();
        let primary = match self.sort_field() {
            SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at), order),
            SortField::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at), order),
            SortField::Title => directed(a.title.cmp(&b.title), order),
            SortField::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => directed(x.cmp(&y), order),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
