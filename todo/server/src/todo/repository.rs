//! Persistence of todos.
//!
//! The [`TodoRepository`] trait is the seam between the service and the store.
//! Each method maps onto a single statement, so every operation is atomic on
//! its own. [`SeaOrmTodoRepository`] implements it on top of a sea-orm
//! connection to the `todos` table.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseConnection, DbErr, EntityTrait, QueryOrder,
};

use crate::entities::sea_orm_active_enums::TodoStatus as DbTodoStatus;
use crate::entities::todos;
use crate::todo::{Todo, TodoStatus};

/// Store operations needed by the todo service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Inserts a new pending todo and returns the record as stored.
    async fn insert(&self, description: String) -> Result<Todo, DbErr>;

    /// Returns every todo ordered by creation time, newest first. Todos created
    /// at the same instant come back in reverse insertion order.
    async fn find_all_newest_first(&self) -> Result<Vec<Todo>, DbErr>;

    /// Sets the status of a todo, returning the updated record or `None` if no
    /// todo has the given ID.
    async fn update_status(&self, id: i64, status: TodoStatus) -> Result<Option<Todo>, DbErr>;

    /// Deletes a todo, returning whether a record was removed.
    async fn delete(&self, id: i64) -> Result<bool, DbErr>;
}

pub struct SeaOrmTodoRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SeaOrmTodoRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<'a> TodoRepository for SeaOrmTodoRepository<'a> {
    #[tracing::instrument(skip(self))]
    async fn insert(&self, description: String) -> Result<Todo, DbErr> {
        let active_model = todos::ActiveModel {
            description: ActiveValue::Set(description),
            status: ActiveValue::Set(DbTodoStatus::Pending),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(Todo::from(created_model))
    }

    #[tracing::instrument(skip(self))]
    async fn find_all_newest_first(&self) -> Result<Vec<Todo>, DbErr> {
        let todos = todos::Entity::find()
            .order_by_desc(todos::Column::CreatedAt)
            .order_by_desc(todos::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Todo::from)
            .collect();
        Ok(todos)
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, id: i64, status: TodoStatus) -> Result<Option<Todo>, DbErr> {
        // IDs outside the column's range cannot name a stored todo
        let Ok(id) = i32::try_from(id) else {
            return Ok(None);
        };
        let active_model = todos::ActiveModel {
            id: ActiveValue::Unchanged(id),
            status: ActiveValue::Set(status.into()),
            ..Default::default()
        };
        // Postgres runs this as a single UPDATE ... RETURNING.
        match active_model.update(self.db).await {
            Ok(updated_model) => Ok(Some(Todo::from(updated_model))),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, DbErr> {
        let Ok(id) = i32::try_from(id) else {
            return Ok(false);
        };
        let result = todos::Entity::delete_by_id(id).exec(self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

impl From<todos::Model> for Todo {
    fn from(model: todos::Model) -> Self {
        Todo::new(
            model.id,
            model.description,
            model.status.into(),
            model.created_at.with_timezone(&Utc),
        )
    }
}

impl From<DbTodoStatus> for TodoStatus {
    fn from(status: DbTodoStatus) -> Self {
        match status {
            DbTodoStatus::Pending => TodoStatus::Pending,
            DbTodoStatus::Completed => TodoStatus::Completed,
        }
    }
}

impl From<TodoStatus> for DbTodoStatus {
    fn from(status: TodoStatus) -> Self {
        match status {
            TodoStatus::Pending => DbTodoStatus::Pending,
            TodoStatus::Completed => DbTodoStatus::Completed,
        }
    }
}
