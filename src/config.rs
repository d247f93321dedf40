use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub draw: DrawConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 上传文件存放位置与大小限制
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub public_dir: String,
    #[serde(default = "default_participant_file_bytes")]
    pub max_participant_file_bytes: usize,
    #[serde(default = "default_media_file_bytes")]
    pub max_media_file_bytes: usize,
}

fn default_participant_file_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_media_file_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_dir: "public".to_string(),
            max_participant_file_bytes: default_participant_file_bytes(),
            max_media_file_bytes: default_media_file_bytes(),
        }
    }
}

/// 抽奖节奏（毫秒）
/// - spin_duration_ms: 滚轮减速动画总时长
/// - settle_hold_ms: 动画停止后到公布结果的停顿
/// - congratulation_hold_ms / congratulation_gap_ms: 开启祝贺弹窗时，连抽每一步的展示时间与间隔
/// - silent_pause_ms: 关闭祝贺弹窗时，连抽每一步之间的停顿
/// - persist_timeout_ms: 单次写入奖项的超时时间
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    pub spin_duration_ms: u64,
    pub settle_hold_ms: u64,
    pub congratulation_hold_ms: u64,
    pub congratulation_gap_ms: u64,
    pub silent_pause_ms: u64,
    pub persist_timeout_ms: u64,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            spin_duration_ms: 5000,
            settle_hold_ms: 500,
            congratulation_hold_ms: 6000,
            congratulation_gap_ms: 500,
            silent_pause_ms: 2000,
            persist_timeout_ms: 10_000,
        }
    }
}

impl DrawConfig {
    /// 所有停顿为 0，用于测试
    pub fn immediate() -> Self {
        Self {
            spin_duration_ms: 0,
            settle_hold_ms: 0,
            congratulation_hold_ms: 0,
            congratulation_gap_ms: 0,
            silent_pause_ms: 0,
            persist_timeout_ms: 1000,
        }
    }

    pub fn spin_duration(&self) -> Duration {
        Duration::from_millis(self.spin_duration_ms)
    }

    pub fn settle_hold(&self) -> Duration {
        Duration::from_millis(self.settle_hold_ms)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    /// 连抽两步之间的停顿
    pub fn step_pause(&self, show_congratulation: bool) -> Duration {
        if show_congratulation {
            Duration::from_millis(self.congratulation_hold_ms + self.congratulation_gap_ms)
        } else {
            Duration::from_millis(self.silent_pause_ms)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// 奖项缓存轮询间隔（秒），0 表示关闭
    pub reward_poll_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            reward_poll_secs: 30,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: get_env("DATABASE_URL")
                            .unwrap_or_else(|| "sqlite://data/lucky_draw.db?mode=rwc".to_string()),
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 5u32),
                    },
                    storage: StorageConfig::default(),
                    draw: DrawConfig::default(),
                    refresh: RefreshConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        Ok(config)
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("PUBLIC_DIR") {
            self.storage.public_dir = v;
        }
        if let Ok(v) = env::var("DRAW_PERSIST_TIMEOUT_MS")
            && let Ok(ms) = v.parse()
        {
            self.draw.persist_timeout_ms = ms;
        }
        if let Ok(v) = env::var("REWARD_POLL_SECS")
            && let Ok(secs) = v.parse()
        {
            self.refresh.reward_poll_secs = secs;
        }
    }
}
