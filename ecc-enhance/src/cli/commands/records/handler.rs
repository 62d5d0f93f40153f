use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use super::RecordCommands;
use crate::config::Config;
use crate::entity::EntityKind;
use crate::reconcile::{self, Reconciler};
use crate::services::records::RecordService;
use crate::store::Store;

pub async fn handle_record_command(
    config: &Config,
    store: &Store,
    kind: EntityKind,
    command: RecordCommands,
) -> Result<()> {
    let service = RecordService::new(store, config.listing);

    match command {
        RecordCommands::List { page, per_page } => {
            let page = service.list(kind, page, per_page).await?;
            print_json(&page)?;
        }
        RecordCommands::Get { id } => {
            let record = service.get(kind, id).await?;
            print_json(&record)?;
        }
        RecordCommands::Add { fields } => {
            let fields = fields.into_fields()?;
            let id = service.create(kind, &fields).await?;
            print_json(&json!({ "message": "created", "id": id }))?;
        }
        RecordCommands::Update { id, fields } => {
            let fields = fields.into_fields()?;
            service.update(kind, id, &fields).await?;
            print_json(&json!({ "message": "updated", "id": id }))?;
        }
        RecordCommands::Delete { id } => {
            service.delete(kind, id).await?;
            print_json(&json!({ "message": "deleted", "id": id }))?;
        }
        RecordCommands::Import { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = Reconciler::new(store, config.import)
                .import(kind, &bytes)
                .await?;
            print_json(&json!({
                "message": summary.message(),
                "rows_read": summary.rows_read,
                "skipped": summary.skipped,
                "inserted": summary.inserted,
                "updated": summary.updated,
            }))?;
        }
        RecordCommands::Export { output } => {
            let file = reconcile::export(store, kind).await?;
            let dir = output_dir(output, config);
            let path = write_export(&dir, &file.filename, &file.bytes).await?;
            log::info!("Wrote {} rows to {}", file.rows, path.display());
            print_json(&json!({
                "message": "exported",
                "file": path,
                "sheet": file.sheet_name,
                "rows": file.rows,
            }))?;
        }
    }

    Ok(())
}

fn output_dir(explicit: Option<PathBuf>, config: &Config) -> PathBuf {
    explicit
        .or_else(|| config.export.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn write_export(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
