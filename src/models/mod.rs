pub mod patch;
pub mod query;
pub mod stats;
pub mod task;
pub mod user;

pub use patch::Patch;
pub use query::{SortField, SortOrder, TaskQuery};
pub use stats::{StatCount, TaskStats};
pub use task::{CreateTaskRequest, Task, TaskPatch, TaskPriority, TaskStatus};
pub use user::{UpdateProfileRequest, User, UserPatch, UserProfile, UserRole};
