use serde::{Deserialize, Deserializer, Serialize};
use time::Date;

use crate::{
    error::ApiError,
    todos::repo_types::{due_date_format, NewTodo, Priority, Todo, TodoPatch, DEFAULT_CATEGORY},
    validation::{check_len, sanitize, CATEGORY_MAX, DESCRIPTION_MAX, TITLE_MAX},
};

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    #[serde(default, with = "due_date_format::option")]
    pub due_date: Option<Date>,
}

/// Body of `PUT /todos/:id`. Absent fields are left untouched; `null` also leaves
/// text and flag fields untouched but clears `priority` and `due_date`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_done: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub priority: Option<Option<Priority>>,
    #[serde(default, deserialize_with = "present_due_date")]
    pub due_date: Option<Option<Date>>,
}

/// Only runs for keys present in the body, so `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn present_due_date<'de, D>(deserializer: D) -> Result<Option<Option<Date>>, D::Error>
where
    D: Deserializer<'de>,
{
    due_date_format::option::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
}

impl CreateTodoRequest {
    pub fn into_new_todo(self) -> Result<NewTodo, ApiError> {
        let title = sanitize(&self.title);
        if title.is_empty() {
            return Err(ApiError::Validation("title is required".into()));
        }
        check_len("title", &title, TITLE_MAX)?;

        let description = self.description.map(|d| sanitize(&d));
        if let Some(d) = &description {
            check_len("description", d, DESCRIPTION_MAX)?;
        }

        let category = self.category.map(|c| sanitize(&c)).unwrap_or_default();
        check_len("category", &category, CATEGORY_MAX)?;

        Ok(NewTodo {
            title,
            description: description.filter(|d| !d.is_empty()),
            category: if category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category
            },
            priority: self.priority,
            due_date: self.due_date,
        })
    }
}

impl UpdateTodoRequest {
    pub fn into_patch(self) -> Result<TodoPatch, ApiError> {
        let title = self.title.map(|t| sanitize(&t));
        if let Some(t) = &title {
            if t.is_empty() {
                return Err(ApiError::Validation("title cannot be empty".into()));
            }
            check_len("title", t, TITLE_MAX)?;
        }

        let description = self.description.map(|d| sanitize(&d));
        if let Some(d) = &description {
            check_len("description", d, DESCRIPTION_MAX)?;
        }

        let category = self.category.map(|c| sanitize(&c));
        if let Some(c) = &category {
            check_len("category", c, CATEGORY_MAX)?;
        }

        Ok(TodoPatch {
            title,
            description,
            category: category.map(|c| {
                if c.is_empty() {
                    DEFAULT_CATEGORY.to_string()
                } else {
                    c
                }
            }),
            is_done: self.is_done,
            priority: self.priority,
            due_date: self.due_date,
        })
    }
}
