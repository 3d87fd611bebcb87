use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::todos::repo_types::{NewTodo, Todo, TodoPatch, TodoRow};

/// Persistence of to-do items. Every operation is scoped to `user_id`; rows owned
/// by someone else behave exactly like missing rows.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// All items of `user_id`, newest first.
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Todo>, StoreError>;
    async fn get_owned(&self, id: i64, user_id: i64) -> Result<Option<Todo>, StoreError>;
    async fn create(&self, user_id: i64, todo: NewTodo) -> Result<Todo, StoreError>;
    /// Applies the supplied fields and refreshes `updated_at`; `None` if no owned row matched.
    async fn update_partial(
        &self,
        id: i64,
        user_id: i64,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError>;
    /// `false` if no owned row matched.
    async fn delete_owned(&self, id: i64, user_id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query_as::<_, TodoRow>(
            r#"
            SELECT id, user_id, title, description, category, is_done,
                   priority, due_date, created_at, updated_at
            FROM todos
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn get_owned(&self, id: i64, user_id: i64) -> Result<Option<Todo>, StoreError> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            SELECT id, user_id, title, description, category, is_done,
                   priority, due_date, created_at, updated_at
            FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Todo::from))
    }

    async fn create(&self, user_id: i64, todo: NewTodo) -> Result<Todo, StoreError> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            INSERT INTO todos (user_id, title, description, category, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, description, category, is_done,
                      priority, due_date, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(&todo.category)
        .bind(todo.priority.map(|p| p.as_str()))
        .bind(todo.due_date)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update_partial(
        &self,
        id: i64,
        user_id: i64,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            UPDATE todos
            SET title       = COALESCE($3, title),
                description = CASE WHEN $4::text IS NULL THEN description
                                   ELSE NULLIF($4::text, '') END,
                category    = COALESCE($5, category),
                is_done     = COALESCE($6, is_done),
                priority    = CASE WHEN $7 THEN $8::text ELSE priority END,
                due_date    = CASE WHEN $9 THEN $10::date ELSE due_date END,
                updated_at  = GREATEST(now(), updated_at)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, category, is_done,
                      priority, due_date, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.category)
        .bind(patch.is_done)
        .bind(patch.priority.is_some())
        .bind(patch.priority.flatten().map(|p| p.as_str()))
        .bind(patch.due_date.is_some())
        .bind(patch.due_date.flatten())
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Todo::from))
    }

    async fn delete_owned(&self, id: i64, user_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{AccountStore, PgAccountStore};
    use crate::auth::repo_types::NewUser;
    use crate::testing::{setup_test_db, unique};
    use crate::todos::repo_types::{Priority, DEFAULT_CATEGORY};
    use time::macros::date;

    async fn owner(db: &PgPool) -> i64 {
        let username = unique("owner");
        PgAccountStore::new(db.clone())
            .create(NewUser {
                email: format!("{username}@x.com"),
                username,
                password_hash: "h".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn new_todo(title: &str) -> NewTodo {
        NewTodo {
            title: title.into(),
            description: Some("desc".into()),
            category: "Work".into(),
            priority: Some(Priority::High),
            due_date: Some(date!(2024 - 10 - 01)),
        }
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn create_applies_column_defaults() {
        let db = setup_test_db().await;
        let store = PgTodoStore::new(db.clone());
        let user = owner(&db).await;

        let todo = store
            .create(
                user,
                NewTodo {
                    title: "plain".into(),
                    description: None,
                    category: DEFAULT_CATEGORY.into(),
                    priority: None,
                    due_date: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(todo.user_id, user);
        assert!(!todo.is_done);
        assert_eq!(todo.category, "Personal");
        assert_eq!(todo.description, None);
        assert_eq!(todo.priority, None);
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn other_owners_cannot_see_update_or_delete() {
        let db = setup_test_db().await;
        let store = PgTodoStore::new(db.clone());
        let (alice, mallory) = (owner(&db).await, owner(&db).await);
        let todo = store.create(alice, new_todo("mine")).await.unwrap();

        assert!(store.get_owned(todo.id, mallory).await.unwrap().is_none());
        let patch = TodoPatch {
            title: Some("hijacked".into()),
            is_done: Some(true),
            ..Default::default()
        };
        assert!(store.update_partial(todo.id, mallory, patch).await.unwrap().is_none());
        assert!(!store.delete_owned(todo.id, mallory).await.unwrap());
        assert!(store.list_by_owner(mallory).await.unwrap().is_empty());

        let untouched = store.get_owned(todo.id, alice).await.unwrap().unwrap();
        assert_eq!(untouched, todo);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn partial_update_touches_only_supplied_fields() {
        let db = setup_test_db().await;
        let store = PgTodoStore::new(db.clone());
        let user = owner(&db).await;
        let todo = store.create(user, new_todo("old")).await.unwrap();

        let renamed = store
            .update_partial(
                todo.id,
                user,
                TodoPatch {
                    title: Some("new".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.title, "new");
        assert_eq!(renamed.description.as_deref(), Some("desc"));
        assert_eq!(renamed.category, "Work");
        assert!(!renamed.is_done);
        assert_eq!(renamed.priority, Some(Priority::High));
        assert_eq!(renamed.due_date, Some(date!(2024 - 10 - 01)));
        assert_eq!(renamed.created_at, todo.created_at);
        assert!(renamed.updated_at >= todo.updated_at);

        let cleared = store
            .update_partial(
                todo.id,
                user,
                TodoPatch {
                    description: Some(String::new()),
                    priority: Some(None),
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.title, "new");
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.priority, None);
        assert_eq!(cleared.due_date, None);

        let reset = store
            .update_partial(
                todo.id,
                user,
                TodoPatch {
                    is_done: Some(true),
                    priority: Some(Some(Priority::Low)),
                    due_date: Some(Some(date!(2025 - 01 - 31))),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(reset.is_done);
        assert_eq!(reset.priority, Some(Priority::Low));
        assert_eq!(reset.due_date, Some(date!(2025 - 01 - 31)));
        assert_eq!(reset.description, None);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn delete_is_not_repeatable() {
        let db = setup_test_db().await;
        let store = PgTodoStore::new(db.clone());
        let user = owner(&db).await;
        let todo = store.create(user, new_todo("gone")).await.unwrap();

        assert!(store.delete_owned(todo.id, user).await.unwrap());
        assert!(!store.delete_owned(todo.id, user).await.unwrap());
        assert!(store.get_owned(todo.id, user).await.unwrap().is_none());
        assert!(store
            .update_partial(todo.id, user, TodoPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn list_is_scoped_and_newest_first() {
        let db = setup_test_db().await;
        let store = PgTodoStore::new(db.clone());
        let (alice, bob) = (owner(&db).await, owner(&db).await);
        let first = store.create(alice, new_todo("first")).await.unwrap();
        let second = store.create(alice, new_todo("second")).await.unwrap();
        store.create(bob, new_todo("bob's")).await.unwrap();

        let ids: Vec<i64> = store
            .list_by_owner(alice)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn deleting_the_owner_cascades() {
        let db = setup_test_db().await;
        let store = PgTodoStore::new(db.clone());
        let user = owner(&db).await;
        let todo = store.create(user, new_todo("orphan")).await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user)
            .execute(&db)
            .await
            .unwrap();
        assert!(store.get_owned(todo.id, user).await.unwrap().is_none());
    }
}
