use sea_orm_migration::prelude::*;

/// Participants (抽奖名单，按导入顺序保存)
#[derive(DeriveIden)]
enum Participants {
    Table,
    Id,
    Position,
    Name,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 名单允许重名，不做唯一约束
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Participants::Position).integer().not_null())
                    .col(ColumnDef::new(Participants::Name).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_participants_position")
                    .table(Participants::Table)
                    .col(Participants::Position)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(Participants::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
