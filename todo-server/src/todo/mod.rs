use crate::entities::todo;
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::collections::BTreeMap;

pub mod api;

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Todo {
    id: i32,
    title: String,
    description: String,
    completed: bool,
}

impl Todo {
    pub fn new(id: i32, title: String, description: String, completed: bool) -> Self {
        Self {
            id,
            title,
            description,
            completed,
        }
    }

    /// Returns the store-assigned ID of the todo.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn completed(&self) -> bool {
        self.completed
    }
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Todo::new(model.id, model.title, model.description, model.completed)
    }
}

/// A todo that has not been persisted yet and therefore has no ID.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl NewTodo {
    /// Attaches a store-assigned ID, turning this into a persisted `Todo`.
    pub fn with_id(self, id: i32) -> Todo {
        Todo::new(id, self.title, self.description, self.completed)
    }
}

/// Error type for TodoStore operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    /// Represents a todo not found error.
    #[error("Todo with ID {0} not found")]
    NotFound(i32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Store health key/value pairs, served verbatim by the health endpoint.
pub type HealthStats = BTreeMap<String, String>;

/// Persistence operations for todos.
///
/// The web layer only depends on this trait so tests can swap in a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Returns every todo in ID order. An empty store yields an empty vector.
    async fn list(&self) -> Result<Vec<Todo>, TodoError>;

    /// Retrieves a todo by its ID, failing with `TodoError::NotFound` if absent.
    async fn get(&self, id: i32) -> Result<Todo, TodoError>;

    /// Persists a new todo and returns it with the ID the store assigned.
    async fn create(&self, todo: NewTodo) -> Result<Todo, TodoError>;

    /// Overwrites title, description and completed of the todo with the same ID.
    ///
    /// Fails with `TodoError::NotFound` if no row has that ID.
    async fn update(&self, todo: Todo) -> Result<Todo, TodoError>;

    /// Removes a todo. Deleting an ID that does not exist is not an error.
    async fn delete(&self, id: i32) -> Result<(), TodoError>;

    /// Reports store reachability as `status`, `message` and, on failure, `error`.
    async fn health(&self) -> HealthStats;

    /// Releases the underlying connection pool.
    async fn close(&self) -> Result<(), TodoError>;
}

/// `TodoStore` backed by a sea-orm connection pool.
pub struct DatabaseTodoStore {
    db: DatabaseConnection,
}

impl DatabaseTodoStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for DatabaseTodoStore {
    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Todo>, TodoError> {
        let todos = todo::Entity::find()
            .order_by_asc(todo::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Todo::from)
            .collect();
        Ok(todos)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: i32) -> Result<Todo, TodoError> {
        let model = todo::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TodoError::NotFound(id))?;
        Ok(Todo::from(model))
    }

    #[tracing::instrument(skip(self))]
    async fn create(&self, todo: NewTodo) -> Result<Todo, TodoError> {
        let active_model = todo::ActiveModel {
            title: ActiveValue::Set(todo.title),
            description: ActiveValue::Set(todo.description),
            completed: ActiveValue::Set(todo.completed),
            ..Default::default()
        };
        let created_model = active_model.insert(&self.db).await?;
        tracing::info!("Created todo with ID {}", created_model.id);
        Ok(Todo::from(created_model))
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, todo: Todo) -> Result<Todo, TodoError> {
        let result = todo::Entity::update_many()
            .col_expr(todo::Column::Title, Expr::value(todo.title.clone()))
            .col_expr(
                todo::Column::Description,
                Expr::value(todo.description.clone()),
            )
            .col_expr(todo::Column::Completed, Expr::value(todo.completed))
            .filter(todo::Column::Id.eq(todo.id))
            .exec(&self.db)
            .await?;

        // A zero-row UPDATE succeeds in SQL, so absence has to be detected here.
        if result.rows_affected == 0 {
            return Err(TodoError::NotFound(todo.id));
        }
        tracing::info!("Updated todo with ID {}", todo.id);
        Ok(todo)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), TodoError> {
        let result = todo::Entity::delete_by_id(id).exec(&self.db).await?;
        tracing::info!(
            "Deleted todo with ID {} ({} rows affected)",
            id,
            result.rows_affected
        );
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn health(&self) -> HealthStats {
        let mut stats = HealthStats::new();
        match self.db.ping().await {
            Ok(()) => {
                stats.insert("status".to_string(), "up".to_string());
                stats.insert("message".to_string(), "It's healthy".to_string());
            }
            Err(err) => {
                tracing::error!("Database health check failed: {}", err);
                stats.insert("status".to_string(), "down".to_string());
                stats.insert("message".to_string(), "Database is unreachable".to_string());
                stats.insert("error".to_string(), format!("db down: {}", err));
            }
        }
        stats
    }

    #[tracing::instrument(skip(self))]
    async fn close(&self) -> Result<(), TodoError> {
        // Clones share one pool, so closing a clone closes it for every holder.
        self.db.clone().close().await?;
        tracing::info!("Database connection pool closed");
        Ok(())
    }
}
