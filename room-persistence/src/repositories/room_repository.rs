use async_trait::async_trait;
use room_types::{Room, RoomId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::debug;

use crate::entities::{prelude::*, rooms};
use crate::{RoomStore, StoreError, StoreResult, VersionedRoom};

/// Rooms persisted through sea-orm.
pub struct SqlRoomStore {
    db: DatabaseConnection,
}

impl SqlRoomStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_room(model: rooms::Model) -> StoreResult<VersionedRoom> {
        let room: Room = serde_json::from_str(&model.document)?;
        Ok(VersionedRoom {
            room,
            version: model.version.max(0) as u64,
        })
    }
}

#[async_trait]
impl RoomStore for SqlRoomStore {
    async fn load(&self, room_id: &str) -> StoreResult<Option<VersionedRoom>> {
        Rooms::find_by_id(room_id.to_string())
            .one(&self.db)
            .await?
            .map(Self::model_to_room)
            .transpose()
    }

    async fn insert(&self, room: &Room) -> StoreResult<VersionedRoom> {
        if Rooms::find_by_id(room.id.clone()).one(&self.db).await?.is_some() {
            return Err(StoreError::AlreadyExists(room.id.clone()));
        }

        let now = chrono::Utc::now().into();
        let model = rooms::ActiveModel {
            id: ActiveValue::Set(room.id.clone()),
            version: ActiveValue::Set(0),
            document: ActiveValue::Set(serde_json::to_string(room)?),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        Rooms::insert(model).exec(&self.db).await?;

        Ok(VersionedRoom {
            room: room.clone(),
            version: 0,
        })
    }

    async fn compare_and_swap(&self, room: &Room, expected: u64) -> StoreResult<Option<u64>> {
        let next = expected + 1;
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let result = Rooms::update_many()
            .col_expr(rooms::Column::Document, Expr::value(serde_json::to_string(room)?))
            .col_expr(rooms::Column::Version, Expr::value(next as i64))
            .col_expr(rooms::Column::UpdatedAt, Expr::value(now))
            .filter(rooms::Column::Id.eq(room.id.clone()))
            .filter(rooms::Column::Version.eq(expected as i64))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            debug!(room_id = %room.id, expected, "Version check failed");
            return Ok(None);
        }
        Ok(Some(next))
    }

    async fn delete_if_version(&self, room_id: &str, expected: u64) -> StoreResult<bool> {
        let result = Rooms::delete_many()
            .filter(rooms::Column::Id.eq(room_id))
            .filter(rooms::Column::Version.eq(expected as i64))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            debug!(room_id, expected, "Delete skipped, version moved on");
        }
        Ok(result.rows_affected > 0)
    }

    async fn list_room_ids(&self) -> StoreResult<Vec<RoomId>> {
        let ids = Rooms::find()
            .select_only()
            .column(rooms::Column::Id)
            .order_by_asc(rooms::Column::UpdatedAt)
            .into_tuple::<String>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }
}
