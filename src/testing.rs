//! In-memory store implementations for tests, plus the Postgres test pool.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::repo::AccountStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::StoreError;
use crate::todos::repo::TodoStore;
use crate::todos::repo_types::{NewTodo, Todo, TodoPatch};

/// Migrated pool for the Postgres store tests. Those tests are `#[ignore]`d; run them
/// with `DATABASE_URL` set and `cargo test -- --ignored`.
pub async fn setup_test_db() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = PgPool::connect(&url).await.expect("connect to test database");
    crate::db::migrate(&db).await.expect("run migrations");
    db
}

/// Name that no other test run uses, so tests can share one database.
pub fn unique(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{:x}{n}", nanos as u64 ^ u64::from(std::process::id()))
}

#[derive(Default)]
pub struct MemoryAccountStore {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn exists(&self, email: &str, username: &str) -> Result<bool, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().any(|u| u.email == email || u.username == username))
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Conflict);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: users.len() as i64 + 1,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryTodoStore {
    inner: Mutex<TodoTable>,
}

#[derive(Default)]
struct TodoTable {
    next_id: i64,
    rows: Vec<Todo>,
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Todo>, StoreError> {
        let table = self.inner.lock().unwrap();
        let mut todos: Vec<Todo> = table
            .rows
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(todos)
    }

    async fn get_owned(&self, id: i64, user_id: i64) -> Result<Option<Todo>, StoreError> {
        let table = self.inner.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn create(&self, user_id: i64, todo: NewTodo) -> Result<Todo, StoreError> {
        let mut table = self.inner.lock().unwrap();
        table.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let created = Todo {
            id: table.next_id,
            user_id,
            title: todo.title,
            description: todo.description,
            category: todo.category,
            is_done: false,
            priority: todo.priority,
            due_date: todo.due_date,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(created.clone());
        Ok(created)
    }

    async fn update_partial(
        &self,
        id: i64,
        user_id: i64,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let mut table = self.inner.lock().unwrap();
        let Some(todo) = table
            .rows
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            todo.title = title;
        }
        if let Some(description) = patch.description {
            todo.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(category) = patch.category {
            todo.category = category;
        }
        if let Some(is_done) = patch.is_done {
            todo.is_done = is_done;
        }
        if let Some(priority) = patch.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            todo.due_date = due_date;
        }
        todo.updated_at = OffsetDateTime::now_utc().max(todo.updated_at);
        Ok(Some(todo.clone()))
    }

    async fn delete_owned(&self, id: i64, user_id: i64) -> Result<bool, StoreError> {
        let mut table = self.inner.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|t| !(t.id == id && t.user_id == user_id));
        Ok(table.rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todos::repo_types::DEFAULT_CATEGORY;

    fn new_todo(title: &str) -> NewTodo {
        NewTodo {
            title: title.into(),
            description: Some("desc".into()),
            category: DEFAULT_CATEGORY.into(),
            priority: None,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn other_owners_cannot_see_update_or_delete() {
        let store = MemoryTodoStore::default();
        let todo = store.create(1, new_todo("mine")).await.unwrap();

        assert!(store.get_owned(todo.id, 2).await.unwrap().is_none());
        assert!(store
            .update_partial(todo.id, 2, TodoPatch { is_done: Some(true), ..Default::default() })
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_owned(todo.id, 2).await.unwrap());
        assert!(store.list_by_owner(2).await.unwrap().is_empty());

        let still_there = store.get_owned(todo.id, 1).await.unwrap().unwrap();
        assert_eq!(still_there, todo);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryTodoStore::default();
        let first = store.create(1, new_todo("first")).await.unwrap();
        let second = store.create(1, new_todo("second")).await.unwrap();
        let ids: Vec<i64> = store
            .list_by_owner(1)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn account_uniqueness_is_enforced_on_create() {
        let store = MemoryAccountStore::default();
        let user = NewUser {
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "h".into(),
        };
        store.create(user.clone()).await.unwrap();
        assert!(matches!(store.create(user).await, Err(StoreError::Conflict)));
    }
}
