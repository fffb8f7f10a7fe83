//! 应用配置
//!
//! 默认值可被环境变量覆盖：
//! - `GEOMEASURE_STORE`: 快照文件路径
//! - `GEOMEASURE_PROJECTION`: 测量投影（`spherical` / `web-mercator`）
//! - `GEOMEASURE_LOG`: 日志级别

use anyhow::{anyhow, Context, Result};
use geomeasure_core::measure::Projection;
use std::path::PathBuf;
use tracing::Level;

const DEFAULT_STORE_PATH: &str = "geomeasure.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 快照文件路径
    pub store_path: PathBuf,
    pub projection: Projection,
    pub log_level: Level,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            projection: Projection::default(),
            log_level: Level::INFO,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过查找函数读取覆盖值，空字符串视为未设置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("GEOMEASURE_STORE") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(name) = get("GEOMEASURE_PROJECTION") {
            config.projection = name
                .parse()
                .map_err(|e: String| anyhow!(e))
                .context("Invalid GEOMEASURE_PROJECTION")?;
        }
        if let Some(level) = get("GEOMEASURE_LOG") {
            config.log_level = level
                .trim()
                .parse()
                .with_context(|| format!("Invalid GEOMEASURE_LOG `{level}`"))?;
        }
        Ok(config)
    }
}
