use crate::entities::participant_entity as participants;
use crate::error::AppResult;
use crate::models::{ParticipantImportResponse, ParticipantListResponse};
use crate::utils::{UploadedFile, parse_participants};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait};
use std::sync::Arc;
use tokio::sync::RwLock;

/// SQLite 单条语句的参数上限较低，分批插入
const INSERT_CHUNK: usize = 400;

/// 内存中的抽奖名单（按导入顺序，允许重名）
#[derive(Clone, Default)]
pub struct ParticipantRoster {
    names: Arc<RwLock<Vec<String>>>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(names: Vec<String>) -> Self {
        Self {
            names: Arc::new(RwLock::new(names)),
        }
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.names.read().await.clone()
    }

    pub async fn replace(&self, names: Vec<String>) {
        *self.names.write().await = names;
    }

    pub async fn len(&self) -> usize {
        self.names.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.names.read().await.is_empty()
    }
}

#[derive(Clone)]
pub struct ParticipantService {
    pool: DatabaseConnection,
    roster: ParticipantRoster,
}

impl ParticipantService {
    pub fn new(pool: DatabaseConnection, roster: ParticipantRoster) -> Self {
        Self { pool, roster }
    }

    pub fn roster(&self) -> &ParticipantRoster {
        &self.roster
    }

    /// 启动时从数据库恢复名单
    pub async fn load(&self) -> AppResult<usize> {
        let rows = participants::Entity::find()
            .order_by_asc(participants::Column::Position)
            .all(&self.pool)
            .await?;
        let names: Vec<String> = rows.into_iter().map(|m| m.name).collect();
        let count = names.len();
        self.roster.replace(names).await;
        Ok(count)
    }

    pub async fn list(&self) -> ParticipantListResponse {
        let participants = self.roster.snapshot().await;
        ParticipantListResponse {
            count: participants.len(),
            participants,
        }
    }

    /// 整体替换名单：先落库（同一事务），成功后再更新内存
    pub async fn replace(&self, names: Vec<String>) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        participants::Entity::delete_many().exec(&txn).await?;

        let rows: Vec<participants::ActiveModel> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| participants::ActiveModel {
                position: Set(idx as i32),
                name: Set(name.clone()),
                ..Default::default()
            })
            .collect();
        for chunk in rows.chunks(INSERT_CHUNK) {
            participants::Entity::insert_many(chunk.to_vec())
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        self.roster.replace(names).await;
        Ok(())
    }

    /// 导入名单文件；解析失败时名单保持不变
    pub async fn import(&self, file: UploadedFile) -> AppResult<ParticipantImportResponse> {
        let names = parse_participants(&file.bytes, &file.file_name, file.content_type.as_deref())?;
        self.replace(names.clone()).await?;

        log::info!(
            "Imported {} participants from {}",
            names.len(),
            file.file_name
        );
        Ok(ParticipantImportResponse {
            count: names.len(),
            participants: names,
            file_name: file.file_name,
        })
    }

    pub async fn clear(&self) -> AppResult<()> {
        self.replace(Vec::new()).await?;
        log::info!("Participant roster cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_pool;
    use crate::error::AppError;

    fn csv_file(body: &str) -> UploadedFile {
        UploadedFile {
            file_name: "guests.csv".to_string(),
            content_type: Some("text/csv".to_string()),
            bytes: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_import_persists_and_reloads_in_order() {
        let pool = memory_pool().await;
        let service = ParticipantService::new(pool.clone(), ParticipantRoster::new());

        let resp = service.import(csv_file("Cid\nAnn\nBob\nAnn\n")).await.unwrap();
        assert_eq!(resp.count, 4);
        assert_eq!(resp.file_name, "guests.csv");

        let reloaded = ParticipantService::new(pool, ParticipantRoster::new());
        assert_eq!(reloaded.load().await.unwrap(), 4);
        assert_eq!(
            reloaded.roster().snapshot().await,
            vec!["Cid", "Ann", "Bob", "Ann"]
        );
    }

    #[tokio::test]
    async fn test_malformed_import_leaves_roster_untouched() {
        let service = ParticipantService::new(
            memory_pool().await,
            ParticipantRoster::with_names(vec!["Ann".into()]),
        );

        let err = service.import(csv_file(" \n\n")).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedImport(_)));
        assert_eq!(service.list().await.participants, vec!["Ann"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let service = ParticipantService::new(memory_pool().await, ParticipantRoster::new());
        service.replace(vec!["Ann".into(), "Bob".into()]).await.unwrap();
        service.clear().await.unwrap();

        assert!(service.roster().is_empty().await);
        assert_eq!(service.load().await.unwrap(), 0);
    }
}
