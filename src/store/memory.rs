use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{StoreResult, TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{Task, TaskPatch, TaskQuery, TaskStats, User};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
}

/// Process-local store behind a single lock. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AppError::InternalServerError("memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AppError::InternalServerError("memory store lock poisoned".into()))
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn owned_task_mut(&mut self, owner: Uuid, id: Uuid) -> Option<&mut Task> {
        self.tasks.get_mut(&id).filter(|t| t.user_id == owner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> StoreResult<User> {
        let mut tables = self.write()?;
        if tables.email_taken(&user.email, None) {
            return Err(AppError::DuplicateEmail);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, user: User) -> StoreResult<Option<User>> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user.id) {
            return Ok(None);
        }
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(AppError::DuplicateEmail);
        }
        tables.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn delete_with_tasks(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut tables = self.write()?;
        if tables.users.remove(&id).is_none() {
            return Ok(None);
        }
        let before = tables.tasks.len();
        tables.tasks.retain(|_, t| t.user_id != id);
        Ok(Some((before - tables.tasks.len()) as u64))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list(&self, owner: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let tables = self.read()?;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.user_id == owner && query.matches(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| query.compare(a, b));
        Ok(tasks)
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self
            .read()?
            .tasks
            .get(&id)
            .filter(|t| t.user_id == owner)
            .cloned())
    }

    async fn insert(&self, task: Task) -> StoreResult<Task> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&task.user_id) {
            return Err(AppError::user_not_found());
        }
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update(&self, owner: Uuid, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tables = self.write()?;
        Ok(tables.owned_task_mut(owner, id).map(|task| {
            *task = patch.apply(task, Utc::now());
            task.clone()
        }))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if tables.owned_task_mut(owner, id).is_none() {
            return Ok(false);
        }
        Ok(tables.tasks.remove(&id).is_some())
    }

    async fn stats(&self, owner: Uuid) -> StoreResult<TaskStats> {
        let tables = self.read()?;
        Ok(TaskStats::from_groups(
            tables
                .tasks
                .values()
                .filter(|t| t.user_id == owner)
                .map(|t| (t.status, t.priority, 1)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateTaskRequest, Patch, TaskStatus};

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::default();
        let user = User::new("Owner".into(), "owner@example.com", "hash".into(), Utc::now());
        UserStore::insert(&store, user.clone()).await.unwrap();
        (store, user)
    }

    fn new_task(owner: Uuid, title: &str) -> Task {
        let input = CreateTaskRequest {
            title: title.into(),
            ..Default::default()
        };
        Task::new(input, owner, Utc::now())
    }

    #[actix_rt::test]
    async fn test_duplicate_email_rejected() {
        let (store, _) = store_with_user().await;
        let again = User::new("Other".into(), "OWNER@example.com", "h".into(), Utc::now());
        assert!(matches!(
            UserStore::insert(&store, again).await,
            Err(AppError::DuplicateEmail)
        ));
    }

    #[actix_rt::test]
    async fn test_update_to_taken_email_rejected() {
        let (store, owner) = store_with_user().await;
        let other = User::new("Other".into(), "other@example.com", "h".into(), Utc::now());
        UserStore::insert(&store, other.clone()).await.unwrap();

        let mut changed = other.clone();
        changed.email = owner.email.clone();
        assert!(matches!(
            UserStore::update(&store, changed).await,
            Err(AppError::DuplicateEmail)
        ));

        let mut renamed = other.clone();
        renamed.name = "Renamed".into();
        let updated = UserStore::update(&store, renamed).await.unwrap().unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[actix_rt::test]
    async fn test_tasks_are_scoped_to_owner() {
        let (store, owner) = store_with_user().await;
        let task = TaskStore::insert(&store, new_task(owner.id, "mine")).await.unwrap();
        let stranger = Uuid::new_v4();

        assert!(TaskStore::get(&store, stranger, task.id).await.unwrap().is_none());
        assert!(TaskStore::list(&store, stranger, &TaskQuery::default())
            .await
            .unwrap()
            .is_empty());
        let patch = TaskPatch {
            status: Patch::Set(TaskStatus::Completed),
            ..Default::default()
        };
        assert!(TaskStore::update(&store, stranger, task.id, patch)
            .await
            .unwrap()
            .is_none());
        assert!(!TaskStore::delete(&store, stranger, task.id).await.unwrap());

        let stored = TaskStore::get(&store, owner.id, task.id).await.unwrap().unwrap();
        assert_eq!(stored, task);
    }

    #[actix_rt::test]
    async fn test_delete_with_tasks_leaves_other_users_alone() {
        let (store, owner) = store_with_user().await;
        let other = User::new("Other".into(), "other@example.com", "h".into(), Utc::now());
        UserStore::insert(&store, other.clone()).await.unwrap();
        TaskStore::insert(&store, new_task(owner.id, "a")).await.unwrap();
        TaskStore::insert(&store, new_task(owner.id, "b")).await.unwrap();
        TaskStore::insert(&store, new_task(other.id, "c")).await.unwrap();

        assert_eq!(UserStore::delete_with_tasks(&store, owner.id).await.unwrap(), Some(2));
        assert!(UserStore::find_by_id(&store, owner.id).await.unwrap().is_none());
        assert_eq!(TaskStore::stats(&store, owner.id).await.unwrap().total, 0);
        assert_eq!(TaskStore::stats(&store, other.id).await.unwrap().total, 1);

        assert_eq!(UserStore::delete_with_tasks(&store, owner.id).await.unwrap(), None);
    }

    #[actix_rt::test]
    async fn test_task_insert_after_account_deletion_leaves_no_orphan() {
        let (store, owner) = store_with_user().await;
        TaskStore::insert(&store, new_task(owner.id, "before")).await.unwrap();

        assert_eq!(UserStore::delete_with_tasks(&store, owner.id).await.unwrap(), Some(1));
        let late = TaskStore::insert(&store, new_task(owner.id, "late")).await;

        assert!(matches!(late, Err(AppError::NotFound(_))));
        assert!(TaskStore::list(&store, owner.id, &TaskQuery::default())
            .await
            .unwrap()
            .is_empty());
    }
}
