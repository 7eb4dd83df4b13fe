//! PostgreSQL 持久化网关。

pub mod message_repository;
pub mod room_repository;

pub use message_repository::PgMessageRepository;
pub use room_repository::PgRoomRepository;

pub type DbPool = sqlx::PgPool;

/// 创建 PostgreSQL 连接池
pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}
