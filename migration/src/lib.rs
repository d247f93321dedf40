pub use sea_orm_migration::prelude::*;

mod m20251020_000001_create_rewards;
mod m20251020_000002_create_settings;
mod m20251021_000001_create_participants;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251020_000001_create_rewards::Migration),
            Box::new(m20251020_000002_create_settings::Migration),
            Box::new(m20251021_000001_create_participants::Migration),
        ]
    }
}
