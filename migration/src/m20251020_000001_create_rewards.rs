use sea_orm_migration::prelude::*;

/// Rewards (奖项 / 奖池)
#[derive(DeriveIden)]
enum Rewards {
    Table,
    Id,
    Name,
    Image,
    TotalQuantity,
    RemainingQuantity,
    Winners,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 说明:
/// - id 为创建时生成的字符串 (UUID)，不使用自增
/// - winners 按中奖顺序保存为 JSON 数组
/// - remaining_quantity 与 winners 的一致性由调用方（抽奖引擎）维护，数据库不做约束
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rewards::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rewards::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Rewards::Image).text().not_null())
                    .col(
                        ColumnDef::new(Rewards::TotalQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rewards::RemainingQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Rewards::Winners).json().not_null())
                    .col(
                        ColumnDef::new(Rewards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rewards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 列表按创建时间排序
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rewards_created_at")
                    .table(Rewards::Table)
                    .col(Rewards::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Rewards::Table).to_owned())
            .await?;
        Ok(())
    }
}
