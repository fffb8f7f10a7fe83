//! 命令行分发

use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use geomeasure_core::error::ValidationError;
use geomeasure_core::geometry::GeometryKind;
use geomeasure_core::measure::{format_measurement, Measurer};
use geomeasure_core::record::{NewRecord, RecordId};
use geomeasure_core::validation::{validate_create, validate_geometry};
use geomeasure_store::{MeasurementStore, MemoryStore};
use geomeasure_sync::{SyncSession, SyncState};
use serde_json::Value;
use std::path::Path;

pub async fn handle_commands(args: &[String], config: &AppConfig) -> Result<()> {
    match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("measure"), Some(file)) => measure(Path::new(file), config),
        (Some("import"), Some(file)) => import(Path::new(file), config).await,
        (Some("list"), _) => list(config).await,
        (Some("delete"), Some(id)) => delete(id, config).await,
        (Some("help") | Some("--help") | Some("-h"), _) | (None, _) => {
            print_help();
            Ok(())
        }
        (Some(command), _) => {
            print_help();
            bail!("Unknown or incomplete command `{command}`")
        }
    }
}

pub fn print_help() {
    println!("Usage: geomeasure <command>");
    println!();
    println!("Commands:");
    println!("  measure <file.json>   Measure a GeoJSON geometry");
    println!("  import <file.json>    Import one create payload or an array of them");
    println!("  list                  List stored measurements");
    println!("  delete <id>           Delete a stored measurement");
    println!();
    println!("Environment:");
    println!("  GEOMEASURE_STORE       Snapshot file (default geomeasure.json)");
    println!("  GEOMEASURE_PROJECTION  spherical | web-mercator");
    println!("  GEOMEASURE_LOG         trace | debug | info | warn | error");
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// 把校验错误按响应格式输出
fn report(err: &ValidationError) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&err.to_response())?);
    Ok(())
}

fn measure(path: &Path, config: &AppConfig) -> Result<()> {
    let raw = read_json(path)?;
    let geometry = match validate_geometry(&raw) {
        Ok(geometry) => geometry,
        Err(err) => {
            report(&err)?;
            bail!(err);
        }
    };

    let measurer = Measurer::new(config.projection);
    println!("type:  {}", geometry.kind());
    println!("value: {}", measurer.measure(&geometry));
    println!("label: {}", measurer.label(&geometry));
    for (i, label) in measurer.segment_labels(&geometry).iter().enumerate() {
        println!("  segment {}: {}", i + 1, label);
    }
    Ok(())
}

async fn open_session(config: &AppConfig) -> Result<SyncSession<MemoryStore>> {
    let store = MemoryStore::open(&config.store_path)
        .with_context(|| format!("Failed to open store {}", config.store_path.display()))?;
    let mut session = SyncSession::new(store, Measurer::new(config.projection));
    session.load().await?;
    Ok(session)
}

async fn save_session(session: &SyncSession<MemoryStore>, config: &AppConfig) -> Result<()> {
    session
        .store()
        .persist(&config.store_path)
        .await
        .with_context(|| format!("Failed to save store {}", config.store_path.display()))
}

async fn import(path: &Path, config: &AppConfig) -> Result<()> {
    let payloads = match read_json(path)? {
        Value::Array(items) => items,
        single => vec![single],
    };

    // 先整体校验，任何一条失败都不写入
    let mut records: Vec<NewRecord> = Vec::with_capacity(payloads.len());
    let mut failed = 0;
    for (i, payload) in payloads.iter().enumerate() {
        match validate_create(payload) {
            Ok(record) => records.push(record),
            Err(err) => {
                println!("payload {i}:");
                report(&err)?;
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} payloads failed validation", payloads.len());
    }

    let mut session = open_session(config).await?;
    for record in records {
        let key = session.import(record).await?;
        match session.registry().get(key).and_then(|s| s.id()) {
            Some(id) => println!("{id}"),
            None => tracing::warn!(
                "{} not saved: {}",
                key,
                session.last_error(key).unwrap_or("unknown error")
            ),
        }
    }

    save_session(&session, config).await
}

async fn list(config: &AppConfig) -> Result<()> {
    let store = MemoryStore::open(&config.store_path)
        .with_context(|| format!("Failed to open store {}", config.store_path.display()))?;

    let records = store.list_all().await?;
    if records.is_empty() {
        println!("No measurements in {}", config.store_path.display());
        return Ok(());
    }

    for record in records {
        let value = match GeometryKind::from_name(&record.properties.kind) {
            Some(kind) => format_measurement(kind, record.properties.calculated_value),
            None => record.properties.calculated_value.to_string(),
        };
        println!(
            "{}  {:<10}  {:>16}  {}",
            record.id, record.properties.kind, value, record.properties.label
        );
    }
    Ok(())
}

async fn delete(id: &str, config: &AppConfig) -> Result<()> {
    let id = RecordId::new(id);
    let mut session = open_session(config).await?;
    if session.registry().find_by_id(&id).is_none() {
        bail!("No measurement with id {id}");
    }

    session.delete(&id).await?;
    if session.state(&id) == Some(SyncState::Failed) {
        bail!(
            "Failed to delete {id}: {}",
            session.last_error(&id).unwrap_or("unknown error")
        );
    }

    save_session(&session, config).await?;
    println!("Deleted {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomeasure_store::persist;
    use std::path::PathBuf;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{name}-{}.json", std::process::id()))
    }

    fn args(items: &[&str]) -> Vec<String> {
        std::iter::once("geomeasure")
            .chain(items.iter().copied())
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_import_list_delete() {
        let store_path = temp_file("geomeasure-cli-store");
        let payload_path = temp_file("geomeasure-cli-payload");
        std::fs::write(
            &payload_path,
            r#"[{
                "geometry": {"type": "LineString", "coordinates": [[2.35, 48.85], [2.36, 48.86]]},
                "properties": {"calculatedValue": 0, "type": "LineString", "label": "quai"}
            }]"#,
        )
        .unwrap();

        let config = AppConfig {
            store_path: store_path.clone(),
            ..AppConfig::default()
        };

        let payload = payload_path.to_string_lossy().into_owned();
        handle_commands(&args(&["import", &payload]), &config).await.unwrap();
        handle_commands(&args(&["list"]), &config).await.unwrap();

        let records = persist::load(&store_path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].properties.label, "quai");
        assert!(records[0].properties.calculated_value > 0.0);

        let id = records[0].id.to_string();
        handle_commands(&args(&["delete", &id]), &config).await.unwrap();
        assert!(persist::load(&store_path).unwrap().is_empty());
        assert!(handle_commands(&args(&["delete", &id]), &config).await.is_err());

        std::fs::remove_file(&store_path).ok();
        std::fs::remove_file(&payload_path).ok();
    }

    #[tokio::test]
    async fn test_invalid_import_writes_nothing() {
        let store_path = temp_file("geomeasure-cli-invalid");
        let payload_path = temp_file("geomeasure-cli-invalid-payload");
        std::fs::write(
            &payload_path,
            r#"{"geometry": {"type": "Point", "coordinates": [200, 10]}, "properties": {}}"#,
        )
        .unwrap();

        let config = AppConfig {
            store_path: store_path.clone(),
            ..AppConfig::default()
        };
        let payload = payload_path.to_string_lossy().into_owned();
        assert!(handle_commands(&args(&["import", &payload]), &config).await.is_err());
        assert!(!store_path.exists());

        std::fs::remove_file(&payload_path).ok();
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let config = AppConfig::default();
        assert!(handle_commands(&args(&["frobnicate"]), &config).await.is_err());
        assert!(handle_commands(&args(&[]), &config).await.is_ok());
    }
}
