use sea_orm::DatabaseConnection;
use testcontainers_modules::{postgres, testcontainers};
use todo_server::todo::{DatabaseTodoStore, NewTodo, Todo, TodoError, TodoStore};

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_postgres_db(&container).await?;
    Ok(TestContext { db, container })
}

#[tokio::test]
#[ignore = "requires a Docker daemon for the PostgreSQL container"]
async fn can_run_todo_crud_against_postgres() {
    let state = setup().await.expect("Failed to setup test context");
    let store = DatabaseTodoStore::new(state.db.clone());

    let created = store
        .create(NewTodo {
            title: "Test Todo".to_string(),
            description: "Test Description".to_string(),
            completed: false,
        })
        .await
        .expect("Failed to create todo");
    assert_eq!(store.list().await.expect("Failed to list todos"), vec![created.clone()]);

    let changed = Todo::new(
        created.id(),
        "Updated Title".to_string(),
        "Updated Description".to_string(),
        true,
    );
    store.update(changed.clone()).await.expect("Failed to update todo");
    assert_eq!(store.get(created.id()).await.expect("Failed to get todo"), changed);

    store.delete(created.id()).await.expect("Failed to delete todo");
    assert!(matches!(
        store.get(created.id()).await,
        Err(TodoError::NotFound(_))
    ));
    assert!(matches!(
        store.update(changed).await,
        Err(TodoError::NotFound(_))
    ));

    let stats = store.health().await;
    assert_eq!(stats.get("status").map(String::as_str), Some("up"));
}
