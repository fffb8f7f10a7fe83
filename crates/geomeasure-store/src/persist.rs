//! JSON 快照文件
//!
//! 把全部记录保存为一个带格式头的 JSON 文件：
//! - 人类可读，记录本身就是线上格式
//! - 加载时每个几何都重新经过坐标校验
//! - 写入先落到临时文件再改名，避免半写的快照

use crate::error::StoreError;
use crate::memory::MemoryStore;
use geomeasure_core::record::Record;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// 文件格式标识
const FORMAT_TAG: &str = "geomeasure";

/// 当前文件格式版本
const FORMAT_VERSION: u32 = 1;

/// 可序列化的文件内容
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format: String,
    version: u32,
    records: Vec<Record>,
}

/// 保存记录到文件
pub fn save(records: &[Record], path: &Path) -> Result<(), StoreError> {
    let snapshot = Snapshot {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        records: records.to_vec(),
    };

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;
    }
    std::fs::rename(&tmp_path, path)?;

    tracing::info!("Saved {} records to {}", snapshot.records.len(), path.display());
    Ok(())
}

/// 从文件加载记录；文件不存在时返回空列表
pub fn load(path: &Path) -> Result<Vec<Record>, StoreError> {
    if !path.exists() {
        tracing::info!("No snapshot at {}, starting empty", path.display());
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;

    if snapshot.format != FORMAT_TAG {
        return Err(StoreError::InvalidFormat(format!(
            "Unexpected format tag `{}`, not a geomeasure snapshot",
            snapshot.format
        )));
    }

    // 版本检查
    if snapshot.version > FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion(format!(
            "Snapshot version {} is newer than supported version {}",
            snapshot.version, FORMAT_VERSION
        )));
    }

    tracing::info!("Loaded {} records from {}", snapshot.records.len(), path.display());
    Ok(snapshot.records)
}

impl MemoryStore {
    /// 从快照文件打开内存存储
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::with_records(load(path)?))
    }

    /// 把当前内容写入快照文件
    pub async fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let records = self.snapshot().await;
        save(&records, path)
    }
}
