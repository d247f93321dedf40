use sea_orm_migration::prelude::*;

/// Settings (单行配置表，id 固定为 1)
#[derive(DeriveIden)]
enum Settings {
    Table,
    Id,
    BackgroundImage,
    AudioUrl,
    DrawMode,
    ShowCongratulationModal,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 所有字段可空：未设置时由服务层返回默认值
/// - draw_mode: 'one-by-one' | 'all-at-once'
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::BackgroundImage).text().null())
                    .col(ColumnDef::new(Settings::AudioUrl).text().null())
                    .col(ColumnDef::new(Settings::DrawMode).string_len(32).null())
                    .col(
                        ColumnDef::new(Settings::ShowCongratulationModal)
                            .boolean()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Settings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Settings::Table).to_owned())
            .await?;
        Ok(())
    }
}
