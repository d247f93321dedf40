use actix_files::Files;
use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use lucky_draw_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // SQLite 文件所在目录需要先存在
    if let Some(dir) = sqlite_parent_dir(&config.database.url) {
        std::fs::create_dir_all(dir)?;
    }

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 奖项存储与缓存
    let store: Arc<dyn RewardStore> = Arc::new(SeaOrmRewardStore::new(pool.clone()));
    let reward_cache = RewardCache::new();
    match reward_cache.refresh(store.as_ref()).await {
        Ok(n) => log::info!("Loaded {n} rewards"),
        Err(e) => log::error!("Failed to load rewards: {e}"),
    }

    // 名单
    let roster = ParticipantRoster::new();
    let participant_service = ParticipantService::new(pool.clone(), roster.clone());
    match participant_service.load().await {
        Ok(n) => log::info!("Loaded {n} participants"),
        Err(e) => log::error!("Failed to load participants: {e}"),
    }

    // 创建服务
    let events = DrawEventBus::default();
    let animator = Arc::new(ReelAnimator::new(events.clone(), config.draw.clone()));
    let draw_engine = DrawEngine::new(
        store.clone(),
        reward_cache.clone(),
        roster,
        animator.clone(),
        events,
        config.draw.clone(),
    );
    let reward_service = RewardService::new(store.clone(), reward_cache.clone());
    let settings_service = SettingsService::new(pool.clone());
    let upload_service = UploadService::new(&config.storage.public_dir);
    let export_service = ExportService::new(store.clone());

    for kind in [MediaKind::RewardImage, MediaKind::Background, MediaKind::Audio] {
        std::fs::create_dir_all(upload_service.media_dir(kind))?;
    }

    // 启动后台任务
    tasks::spawn_all(reward_cache, store, config.refresh.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let storage = config.storage.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(draw_engine.clone()))
            .app_data(web::Data::new(reward_service.clone()))
            .app_data(web::Data::new(settings_service.clone()))
            .app_data(web::Data::new(participant_service.clone()))
            .app_data(web::Data::new(upload_service.clone()))
            .app_data(web::Data::new(export_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::reward_config)
                    .configure(handlers::settings_config)
                    .configure(handlers::participant_config)
                    .configure(handlers::upload_config)
                    .configure(handlers::export_config)
                    .configure(handlers::draw_config),
            )
            .service(Files::new("/rewards", upload_service.media_dir(MediaKind::RewardImage)))
            .service(Files::new(
                "/backgrounds",
                upload_service.media_dir(MediaKind::Background),
            ))
            .service(Files::new("/audio", upload_service.media_dir(MediaKind::Audio)))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run();

    let result = server.await;
    // 停机后不再落定进行中的动画
    animator.close();
    result
}

/// sqlite://data/lucky_draw.db?mode=rwc -> data
fn sqlite_parent_dir(url: &str) -> Option<std::path::PathBuf> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    let parent = std::path::Path::new(path).parent()?;
    if parent.as_os_str().is_empty() {
        return None;
    }
    Some(parent.to_path_buf())
}
