//! 房间Repository实现
//!
//! 房间由 CRUD 层拥有，这里只提供实时层需要的存在性查询。

use application::RoomRepository;
use async_trait::async_trait;
use domain::{RepositoryError, RoomId};
use uuid::Uuid;

use crate::db::DbPool;

pub struct PgRoomRepository {
    pool: DbPool,
}

impl PgRoomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn room_exists(&self, room_id: RoomId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rooms WHERE id = $1)")
            .bind(Uuid::from(room_id))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(exists)
    }
}
