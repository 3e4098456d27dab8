use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;

pub mod api;
pub mod repository;
pub mod web;

pub use repository::{SeaOrmTodoRepository, TodoRepository};

/// Completion state of a todo. New todos always start as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Pending,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::Completed => "completed",
        }
    }

    /// Returns the status a toggle would move to.
    pub fn toggled(&self) -> TodoStatus {
        match self {
            TodoStatus::Pending => TodoStatus::Completed,
            TodoStatus::Completed => TodoStatus::Pending,
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(TodoStatus::Pending),
            "completed" => Ok(TodoStatus::Completed),
            _ => Err(ValidationError::new("status", "must be pending or completed")),
        }
    }
}

/// A persisted todo as returned by the store.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Todo {
    id: i32,
    description: String,
    status: TodoStatus,
    created_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(id: i32, description: String, status: TodoStatus, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            description,
            status,
            created_at,
        }
    }

    /// Returns the store-assigned ID of the todo.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the description exactly as it was stored.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the status of the todo.
    pub fn status(&self) -> TodoStatus {
        self.status
    }

    /// Returns the store-assigned creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == TodoStatus::Completed
    }
}

/// Error raised when an input fails a model constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    field: &'static str,
    reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the name of the offending field.
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

pub(crate) const EMPTY_DESCRIPTION: &str = "cannot be empty";
pub(crate) const NUL_IN_DESCRIPTION: &str = "cannot contain null characters";

/// Input for creating a todo.
///
/// The description only has to contain something other than whitespace. It is
/// stored verbatim, surrounding whitespace included. Postgres text cannot hold
/// NUL, so descriptions containing one are rejected up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTodoInput {
    pub description: String,
}

impl CreateTodoInput {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::new("description", EMPTY_DESCRIPTION));
        }
        if self.description.contains('\0') {
            return Err(ValidationError::new("description", NUL_IN_DESCRIPTION));
        }
        Ok(())
    }
}

/// Input for changing the status of an existing todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateTodoStatusInput {
    pub id: i64,
    pub status: TodoStatus,
}

impl UpdateTodoStatusInput {
    pub fn new(id: i64, status: TodoStatus) -> Self {
        Self { id, status }
    }

    /// Builds the input from an untrusted status string.
    pub fn parse(id: i64, status: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(id, status.parse()?))
    }
}

/// Input for deleting a todo. Any ID is accepted; one that names no todo
/// simply deletes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteTodoInput {
    pub id: i64,
}

impl DeleteTodoInput {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

/// Result of a delete. A missing record is reported as `success: false`, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub success: bool,
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// The input was rejected before reaching the store.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// No todo exists with the requested ID.
    #[error("Todo with id {0} not found")]
    NotFound(i64),
    /// The store failed or could not be reached.
    #[error("Storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

#[derive(Clone, Debug)]
pub struct TodoState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// Validates todo inputs and carries them out against a [`TodoRepository`].
///
/// The service holds nothing but its repository, so creating one per request
/// behaves the same as sharing a long-lived instance.
pub struct TodoService<R> {
    repository: R,
}

impl<'a> TodoService<SeaOrmTodoRepository<'a>> {
    pub fn new(db: &'a sea_orm::DatabaseConnection) -> Self {
        Self::with_repository(SeaOrmTodoRepository::new(db))
    }
}

impl<R: TodoRepository> TodoService<R> {
    pub fn with_repository(repository: R) -> Self {
        Self { repository }
    }

    /// Creates a new todo with status `Pending`.
    ///
    /// # Arguments
    ///
    /// * `input` - The description of the new todo.
    ///
    /// # Returns
    ///
    /// A `Result` containing the todo as persisted, including its store-assigned
    /// ID and creation timestamp.
    #[tracing::instrument(skip(self))]
    pub async fn create_todo(&self, input: CreateTodoInput) -> Result<Todo, TodoServiceError> {
        input.validate()?;
        let todo = self
            .repository
            .insert(input.description)
            .await
            .inspect_err(|err| tracing::error!("Todo creation failed: {}", err))?;
        tracing::info!("Created todo {}", todo.id());
        Ok(todo)
    }

    /// Retrieves every todo, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = self
            .repository
            .find_all_newest_first()
            .await
            .inspect_err(|err| tracing::error!("Fetching todos failed: {}", err))?;
        Ok(todos)
    }

    /// Sets the status of an existing todo.
    ///
    /// # Arguments
    ///
    /// * `input` - The ID of the todo and the status to set.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated todo, or `TodoServiceError::NotFound`
    /// if no todo has the given ID.
    #[tracing::instrument(skip(self))]
    pub async fn update_todo_status(
        &self,
        input: UpdateTodoStatusInput,
    ) -> Result<Todo, TodoServiceError> {
        let updated = self
            .repository
            .update_status(input.id, input.status)
            .await
            .inspect_err(|err| tracing::error!("Todo status update failed: {}", err))?;

        updated.ok_or_else(|| {
            tracing::warn!("Todo {} not found for status update", input.id);
            TodoServiceError::NotFound(input.id)
        })
    }

    /// Deletes a todo by its ID.
    ///
    /// Deleting an ID that does not exist is not an error; the outcome reports
    /// `success: false` instead.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo(
        &self,
        input: DeleteTodoInput,
    ) -> Result<DeleteOutcome, TodoServiceError> {
        let success = self
            .repository
            .delete(input.id)
            .await
            .inspect_err(|err| tracing::error!("Todo deletion failed: {}", err))?;
        if !success {
            tracing::info!("No todo with id {} to delete", input.id);
        }
        Ok(DeleteOutcome { success })
    }
}
