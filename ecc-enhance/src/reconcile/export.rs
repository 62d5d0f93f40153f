//! Export joiner: denormalized spreadsheet reports
//!
//! Joined exports walk a listing table (parks, brand/store pairs) and left
//! join the detail table on the listing's name column, so every listing row
//! appears exactly once whether or not a detail record exists. Categories
//! without a listing parent export their own table with the import header,
//! which makes the file importable again as-is.

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime};

use crate::entity::{EntityKind, Record, is_blank};
use crate::error::{EngineError, EngineResult};
use crate::sheet;
use crate::store::{Store, records};

use super::registry;

/// Where an output column takes its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Parent(&'static str),
    Detail(&'static str),
}

/// One output column: value source plus its header label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub source: Source,
    pub label: &'static str,
}

const fn parent(field: &'static str, label: &'static str) -> Column {
    Column {
        source: Source::Parent(field),
        label,
    }
}

const fn detail(field: &'static str, label: &'static str) -> Column {
    Column {
        source: Source::Detail(field),
        label,
    }
}

const VISIT_DETAIL_COLUMNS: &[Column] = &[
    detail("actual_people_count", "单位实际人数"),
    detail("other_carrier", "异网运营商"),
    detail("key_person_name", "关键人姓名"),
    detail("key_person_phone", "关键人电话"),
    detail("competitor_services", "友商已有业务"),
    detail("competitor_price", "友商合同价格"),
    detail("competitor_expiry", "友商产品到期时间"),
    detail("visitor_name", "拜访人"),
    detail("remarks", "备注"),
    detail("update_time", "更新时间"),
];

/// Detail table joined to each parent row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join {
    pub detail: EntityKind,
    /// Parent field compared with the detail's natural key
    pub link_field: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    pub parent: EntityKind,
    pub join: Option<Join>,
    pub columns: Vec<Column>,
    pub sheet_name: &'static str,
    pub file_prefix: &'static str,
}

impl ExportSpec {
    /// The export offered for each category
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Company => Self::park_companies(),
            EntityKind::ChainStore => Self::brand_stores(),
            EntityKind::Park => Self::flat(kind, "BusinessParks", "park_data"),
            EntityKind::Hotel => Self::flat(kind, "HotelData", "hotel_data"),
            EntityKind::ChainBand => Self::flat(kind, "ChainBands", "chain_band_data"),
        }
    }

    /// Every park with the visit details of the company it lists
    pub fn park_companies() -> Self {
        let mut columns = vec![parent("name", "楼园名称"), parent("company_name", "企业名称")];
        columns.extend_from_slice(VISIT_DETAIL_COLUMNS);
        Self {
            parent: EntityKind::Park,
            join: Some(Join {
                detail: EntityKind::Company,
                link_field: "company_name",
            }),
            columns,
            sheet_name: "楼园企业导出",
            file_prefix: "楼园企业导出",
        }
    }

    /// Every brand/store pair with the visit details of the store
    pub fn brand_stores() -> Self {
        let mut columns = vec![parent("band", "连锁品牌名称"), parent("store", "连锁商铺名称")];
        columns.extend_from_slice(VISIT_DETAIL_COLUMNS);
        Self {
            parent: EntityKind::ChainBand,
            join: Some(Join {
                detail: EntityKind::ChainStore,
                link_field: "store",
            }),
            columns,
            sheet_name: "连锁品牌商铺导出",
            file_prefix: "连锁品牌商铺导出",
        }
    }

    /// The table itself, labelled with its own field names. Import columns
    /// lead so the file passes the header check; remaining fields trail.
    pub fn flat(kind: EntityKind, sheet_name: &'static str, file_prefix: &'static str) -> Self {
        let leading = registry::expected_columns(kind);
        let trailing = kind.fields().iter().filter(|field| !leading.contains(field));
        Self {
            parent: kind,
            join: None,
            columns: leading
                .iter()
                .chain(trailing)
                .map(|&field| parent(field, field))
                .collect(),
            sheet_name,
            file_prefix,
        }
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.label).collect()
    }

    pub fn filename(&self, now: NaiveDateTime) -> String {
        format!("{}_{}.xlsx", self.file_prefix, now.format("%Y%m%d_%H%M%S"))
    }
}

/// A generated workbook ready to hand back to the caller
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub sheet_name: String,
    /// Data rows written (header excluded)
    pub rows: usize,
    pub bytes: Vec<u8>,
}

/// Export the report offered for `kind`, stamped with the local time
pub async fn export(store: &Store, kind: EntityKind) -> EngineResult<ExportFile> {
    export_at(store, &ExportSpec::for_kind(kind), Local::now().naive_local()).await
}

pub async fn export_at(
    store: &Store,
    spec: &ExportSpec,
    now: NaiveDateTime,
) -> EngineResult<ExportFile> {
    // Both tables are read inside one transaction for a consistent snapshot
    let mut tx = store.pool().begin().await?;

    let parents = records::list_all(&mut *tx, spec.parent).await?;
    if parents.is_empty() {
        return Err(EngineError::NoData { kind: spec.parent });
    }

    let details = match &spec.join {
        Some(join) => records::list_all(&mut *tx, join.detail).await?,
        None => Vec::new(),
    };
    tx.commit().await?;

    let rows = join_rows(spec, &parents, &details);
    let bytes = sheet::write_table(spec.sheet_name, &spec.header(), &rows)?;

    log::info!(
        "Exported {} rows from {}{}",
        rows.len(),
        spec.parent.table(),
        spec.join
            .map(|join| format!(" joined with {}", join.detail.table()))
            .unwrap_or_default()
    );

    Ok(ExportFile {
        filename: spec.filename(now),
        sheet_name: spec.sheet_name.to_string(),
        rows: rows.len(),
        bytes,
    })
}

/// One output row per parent, detail columns blank when nothing matches
fn join_rows(spec: &ExportSpec, parents: &[Record], details: &[Record]) -> Vec<Vec<String>> {
    let index = spec
        .join
        .map(|join| detail_index(join.detail, details))
        .unwrap_or_default();

    parents
        .iter()
        .map(|parent| {
            let matched = spec.join.and_then(|join| {
                let link = parent.get(join.link_field);
                if is_blank(link) {
                    None
                } else {
                    index.get(link).copied()
                }
            });

            spec.columns
                .iter()
                .map(|column| match column.source {
                    Source::Parent(field) => parent.get(field).to_string(),
                    Source::Detail(field) => matched
                        .map(|record| record.get(field).to_string())
                        .unwrap_or_default(),
                })
                .collect()
        })
        .collect()
}

/// Natural key to record; on duplicate keys the lowest id wins
fn detail_index(kind: EntityKind, details: &[Record]) -> HashMap<&str, &Record> {
    let mut index = HashMap::new();
    for record in details {
        index.entry(record.key(kind)).or_insert(record);
    }
    index
}
