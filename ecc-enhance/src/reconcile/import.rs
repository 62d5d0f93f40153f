//! Import reconciler: upsert every row of a spreadsheet into one table
//!
//! Rows are applied strictly in file order inside a single transaction.
//! Each row is matched on the category's natural key:
//! - no match: insert the row's non-blank fields
//! - match: overwrite only the fields the row supplies non-blank (sparse merge)
//!
//! A later row with the same key therefore finds and enriches the record an
//! earlier row created, instead of duplicating it.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::config::ImportLimits;
use crate::entity::{EntityKind, FieldMap, UPDATE_TIME, is_blank};
use crate::error::{EngineError, EngineResult};
use crate::sheet::{self, Table};
use crate::store::{Store, records};

use super::registry;

/// Outcome of one import call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Data rows in the file (header excluded)
    pub rows_read: usize,
    /// Rows without a natural key
    pub skipped: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl ImportSummary {
    pub fn message(&self) -> &'static str {
        "import complete"
    }
}

pub struct Reconciler<'a> {
    store: &'a Store,
    limits: ImportLimits,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a Store, limits: ImportLimits) -> Self {
        Self { store, limits }
    }

    /// Import `bytes` into `kind`, stamping blank `update_time` with today's date
    pub async fn import(&self, kind: EntityKind, bytes: &[u8]) -> EngineResult<ImportSummary> {
        self.import_on(kind, bytes, Local::now().date_naive()).await
    }

    /// Import with an explicit date for the `update_time` stamp
    pub async fn import_on(
        &self,
        kind: EntityKind,
        bytes: &[u8],
        today: NaiveDate,
    ) -> EngineResult<ImportSummary> {
        check_limit("file size", bytes.len() as u64, self.limits.max_file_bytes)?;

        let table = sheet::read_table(bytes)?;
        registry::check_header(kind, &table.header)?;
        check_limit("row count", table.rows.len() as u64, self.limits.max_rows)?;

        log::info!("Importing {} rows into {}", table.rows.len(), kind.table());

        let stamp = today.format("%Y%m%d").to_string();
        let mut summary = ImportSummary::default();
        let mut tx = self.store.pool().begin().await?;

        for row in 0..table.rows.len() {
            summary.rows_read += 1;

            let mut incoming = row_fields(kind, &table, row);
            let Some(key) = incoming.get(kind.natural_key()).cloned() else {
                log::debug!("Row {}: blank {}, skipped", row + 2, kind.natural_key());
                summary.skipped += 1;
                continue;
            };

            // Blank update_time is filled only where the store has none yet
            let stamp_missing = kind.stamps_update_time() && !incoming.contains_key(UPDATE_TIME);

            match records::find_by_key(&mut *tx, kind, &key).await? {
                Some(existing) => {
                    let mut changes = merge_changes(kind, &incoming);
                    if stamp_missing && is_blank(existing.get(UPDATE_TIME)) {
                        changes.insert(UPDATE_TIME.to_string(), stamp.clone());
                    }
                    if !changes.is_empty() {
                        records::update_fields(&mut *tx, kind, existing.id, &changes).await?;
                    }
                    log::debug!("Row {}: merged into {} {}", row + 2, kind, existing.id);
                    summary.updated += 1;
                }
                None => {
                    if stamp_missing {
                        incoming.insert(UPDATE_TIME.to_string(), stamp.clone());
                    }
                    let id = records::insert(&mut *tx, kind, &incoming).await?;
                    log::debug!("Row {}: created {} {}", row + 2, kind, id);
                    summary.inserted += 1;
                }
            }
        }

        tx.commit().await?;

        log::info!(
            "Import into {} complete: {} rows, {} inserted, {} updated, {} skipped",
            kind.table(),
            summary.rows_read,
            summary.inserted,
            summary.updated,
            summary.skipped
        );
        Ok(summary)
    }
}

fn check_limit(what: &'static str, actual: u64, limit: u64) -> EngineResult<()> {
    if actual > limit {
        return Err(EngineError::TooLarge { what, actual, limit });
    }
    Ok(())
}

/// Trimmed, non-blank values of the category's import columns in one data
/// row. Column positions follow the validated header.
fn row_fields(kind: EntityKind, table: &Table, row: usize) -> FieldMap {
    registry::expected_columns(kind)
        .iter()
        .enumerate()
        .filter_map(|(col, field)| {
            let value = table.cell(row, col).trim();
            (!value.is_empty()).then(|| (field.to_string(), value.to_string()))
        })
        .collect()
}

/// Fields a matched row overwrites: everything it supplies except the key
fn merge_changes(kind: EntityKind, incoming: &FieldMap) -> FieldMap {
    incoming
        .iter()
        .filter(|(field, _)| field.as_str() != kind.natural_key())
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Record;
    use rust_xlsxwriter::Workbook;

    const PARK_HEADER: &[&str] = &["name", "area", "company_name", "remark"];

    fn xlsx(header: &[&str], rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in header.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32 + 1, col as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    async fn all(store: &Store, kind: EntityKind) -> Vec<Record> {
        let mut conn = store.pool().acquire().await.unwrap();
        records::list_all(&mut conn, kind).await.unwrap()
    }

    async fn import(store: &Store, kind: EntityKind, bytes: &[u8]) -> EngineResult<ImportSummary> {
        Reconciler::new(store, ImportLimits::default())
            .import_on(kind, bytes, today())
            .await
    }

    #[tokio::test]
    async fn test_import_creates_new_record() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(PARK_HEADER, &[&["Park A", "East", "Acme", ""]]);

        let summary = import(&store, EntityKind::Park, &file).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 0);

        let parks = all(&store, EntityKind::Park).await;
        assert_eq!(parks.len(), 1);
        assert_eq!(parks[0].get("name"), "Park A");
        assert_eq!(parks[0].get("area"), "East");
        assert_eq!(parks[0].get("company_name"), "Acme");
        assert_eq!(parks[0].get("remark"), "");
    }

    #[tokio::test]
    async fn test_reimport_merges_only_non_blank_fields() {
        let store = Store::in_memory().await.unwrap();
        import(&store, EntityKind::Park, &xlsx(PARK_HEADER, &[&["Park A", "East", "Acme", ""]]))
            .await
            .unwrap();

        let second = xlsx(PARK_HEADER, &[&["Park A", "", "Beta", "newremark"]]);
        let summary = import(&store, EntityKind::Park, &second).await.unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.inserted, 0);

        let parks = all(&store, EntityKind::Park).await;
        assert_eq!(parks.len(), 1);
        assert_eq!(parks[0].get("area"), "East");
        assert_eq!(parks[0].get("company_name"), "Beta");
        assert_eq!(parks[0].get("remark"), "newremark");
    }

    #[tokio::test]
    async fn test_reordered_header_is_rejected_without_mutation() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(
            &["area", "name", "company_name", "remark"],
            &[&["East", "Park A", "Acme", ""]],
        );

        let err = import(&store, EntityKind::Park, &file).await.unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch { .. }));
        assert!(all(&store, EntityKind::Park).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_format_error() {
        let store = Store::in_memory().await.unwrap();
        let err = import(&store, EntityKind::Park, b"not a workbook").await.unwrap_err();
        assert!(matches!(err, EngineError::Format(_)));
        assert!(all(&store, EntityKind::Park).await.is_empty());
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(
            PARK_HEADER,
            &[
                &["Park A", "East", "Acme", ""],
                &["Park B", "", "Beta", "r"],
                &["Park A", "", "", "late"],
            ],
        );

        import(&store, EntityKind::Park, &file).await.unwrap();
        let once = all(&store, EntityKind::Park).await;
        import(&store, EntityKind::Park, &file).await.unwrap();
        let twice = all(&store, EntityKind::Park).await;

        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_blank_key_rows_are_skipped() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(
            PARK_HEADER,
            &[
                &["", "East", "Ghost", "x"],
                &["   ", "West", "Ghost", "y"],
                &["Park A", "", "", ""],
            ],
        );

        let summary = import(&store, EntityKind::Park, &file).await.unwrap();
        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.inserted, 1);

        let parks = all(&store, EntityKind::Park).await;
        assert_eq!(parks.len(), 1);
        assert!(parks.iter().all(|p| p.get("company_name") != "Ghost"));

        let mut conn = store.pool().acquire().await.unwrap();
        assert!(records::find_by_key(&mut conn, EntityKind::Park, "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_keys_in_one_file_merge_in_order() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(
            PARK_HEADER,
            &[
                &["Park A", "East", "Acme", "first"],
                &["Park A", "", "Beta", ""],
                &["Park A", "North", "", "third"],
            ],
        );

        let summary = import(&store, EntityKind::Park, &file).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 2);

        let parks = all(&store, EntityKind::Park).await;
        assert_eq!(parks.len(), 1);
        assert_eq!(parks[0].get("area"), "North");
        assert_eq!(parks[0].get("company_name"), "Beta");
        assert_eq!(parks[0].get("remark"), "third");
    }

    #[tokio::test]
    async fn test_values_are_trimmed() {
        let store = Store::in_memory().await.unwrap();
        import(&store, EntityKind::Park, &xlsx(PARK_HEADER, &[&["  Park A ", " East", "", ""]]))
            .await
            .unwrap();
        import(&store, EntityKind::Park, &xlsx(PARK_HEADER, &[&["Park A", "", "Acme", ""]]))
            .await
            .unwrap();

        let parks = all(&store, EntityKind::Park).await;
        assert_eq!(parks.len(), 1);
        assert_eq!(parks[0].get("name"), "Park A");
        assert_eq!(parks[0].get("area"), "East");
        assert_eq!(parks[0].get("company_name"), "Acme");
    }

    #[tokio::test]
    async fn test_update_time_is_stamped_only_when_blank() {
        let store = Store::in_memory().await.unwrap();
        let header = EntityKind::Company.fields();
        let mut stamped = vec![""; header.len()];
        stamped[0] = "Acme";
        let mut dated = vec![""; header.len()];
        dated[0] = "Beta";
        dated[header.len() - 1] = "20240101";

        let file = xlsx(header, &[stamped.as_slice(), dated.as_slice()]);
        import(&store, EntityKind::Company, &file).await.unwrap();

        let companies = all(&store, EntityKind::Company).await;
        assert_eq!(companies[0].get(UPDATE_TIME), "20250314");
        assert_eq!(companies[1].get(UPDATE_TIME), "20240101");
    }

    /// Company sheet row with only the key and `remarks` filled
    fn company_row(key: &'static str, remarks: &'static str) -> Vec<&'static str> {
        let header = registry::expected_columns(EntityKind::Company);
        let mut row = vec![""; header.len()];
        row[0] = key;
        row[header.iter().position(|c| *c == "remarks").unwrap()] = remarks;
        row
    }

    #[tokio::test]
    async fn test_reimport_on_a_later_day_keeps_the_first_stamp() {
        let store = Store::in_memory().await.unwrap();
        let header = registry::expected_columns(EntityKind::Company);
        let row = company_row("Acme", "first visit");
        let file = xlsx(header, &[row.as_slice()]);

        import(&store, EntityKind::Company, &file).await.unwrap();
        let once = all(&store, EntityKind::Company).await;

        let next_day = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        Reconciler::new(&store, ImportLimits::default())
            .import_on(EntityKind::Company, &file, next_day)
            .await
            .unwrap();
        let twice = all(&store, EntityKind::Company).await;

        assert_eq!(once[0].get(UPDATE_TIME), "20250314");
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_blank_update_time_cell_keeps_stored_value() {
        let store = Store::in_memory().await.unwrap();
        {
            let mut conn = store.pool().acquire().await.unwrap();
            let seeded: FieldMap = [("company_name", "Acme"), (UPDATE_TIME, "20240101")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            records::insert(&mut conn, EntityKind::Company, &seeded).await.unwrap();
        }

        let header = registry::expected_columns(EntityKind::Company);
        let row = company_row("Acme", "second visit");
        import(&store, EntityKind::Company, &xlsx(header, &[row.as_slice()]))
            .await
            .unwrap();

        let companies = all(&store, EntityKind::Company).await;
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].get("remarks"), "second visit");
        assert_eq!(companies[0].get(UPDATE_TIME), "20240101");
    }

    #[tokio::test]
    async fn test_merge_stamps_record_that_has_no_update_time() {
        let store = Store::in_memory().await.unwrap();
        {
            let mut conn = store.pool().acquire().await.unwrap();
            let seeded: FieldMap = [("company_name".to_string(), "Acme".to_string())].into();
            records::insert(&mut conn, EntityKind::Company, &seeded).await.unwrap();
        }

        let header = registry::expected_columns(EntityKind::Company);
        let row = company_row("Acme", "");
        let summary = import(&store, EntityKind::Company, &xlsx(header, &[row.as_slice()]))
            .await
            .unwrap();
        assert_eq!(summary.updated, 1);

        let companies = all(&store, EntityKind::Company).await;
        assert_eq!(companies[0].get(UPDATE_TIME), "20250314");
    }

    #[tokio::test]
    async fn test_hotel_sheet_without_business_park_imports() {
        let store = Store::in_memory().await.unwrap();
        let header = [
            "hotel_name",
            "visitor_name",
            "actual_people_count",
            "other_carrier",
            "key_person_name",
            "key_person_phone",
            "competitor_services",
            "competitor_price",
            "competitor_expiry",
            "remarks",
            "update_time",
        ];
        let file = xlsx(
            &header,
            &[&["Grand", "Zhang", "120", "", "", "13800138000", "", "", "", "lobby", ""]],
        );

        let summary = import(&store, EntityKind::Hotel, &file).await.unwrap();
        assert_eq!(summary.inserted, 1);

        let hotels = all(&store, EntityKind::Hotel).await;
        assert_eq!(hotels[0].get("hotel_name"), "Grand");
        assert_eq!(hotels[0].get("visitor_name"), "Zhang");
        assert_eq!(hotels[0].get("actual_people_count"), "120");
        assert_eq!(hotels[0].get("key_person_phone"), "13800138000");
        assert_eq!(hotels[0].get("remarks"), "lobby");
        assert_eq!(hotels[0].get(UPDATE_TIME), "20250314");
        assert_eq!(hotels[0].get("business_park"), "");
    }

    #[tokio::test]
    async fn test_failed_row_rolls_back_whole_batch() {
        let store = Store::in_memory().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON business_park \
             WHEN NEW.name = 'Boom' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let file = xlsx(PARK_HEADER, &[&["Park A", "East", "", ""], &["Boom", "", "", ""]]);
        let err = import(&store, EntityKind::Park, &file).await.unwrap_err();

        assert!(matches!(err, EngineError::Store(_)));
        assert!(all(&store, EntityKind::Park).await.is_empty());
    }

    #[tokio::test]
    async fn test_listing_tables_are_not_stamped() {
        let store = Store::in_memory().await.unwrap();
        import(&store, EntityKind::ChainBand, &xlsx(&["band", "area", "store", "remark"], &[&["B", "", "S", ""]]))
            .await
            .unwrap();

        let bands = all(&store, EntityKind::ChainBand).await;
        assert_eq!(bands.len(), 1);
        let expected: FieldMap = [("band", "B"), ("area", ""), ("store", "S"), ("remark", "")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(bands[0].fields, expected);
    }

    #[tokio::test]
    async fn test_band_rows_upsert_on_band_name() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(
            &["band", "area", "store", "remark"],
            &[&["Brand", "East", "S1", ""], &["Brand", "", "S2", ""]],
        );

        let summary = import(&store, EntityKind::ChainBand, &file).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 1);

        // One row per band: the later store replaces the earlier one
        let bands = all(&store, EntityKind::ChainBand).await;
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].get("area"), "East");
        assert_eq!(bands[0].get("store"), "S2");
    }

    #[tokio::test]
    async fn test_trailing_columns_are_ignored() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(
            &["name", "area", "company_name", "remark", "id", "extra"],
            &[&["Park A", "East", "Acme", "", "999", "junk"]],
        );

        import(&store, EntityKind::Park, &file).await.unwrap();

        let parks = all(&store, EntityKind::Park).await;
        assert_eq!(parks.len(), 1);
        assert_ne!(parks[0].id, 999);
        assert!(!parks[0].fields.contains_key("extra"));
    }

    #[tokio::test]
    async fn test_limits_reject_before_any_write() {
        let store = Store::in_memory().await.unwrap();
        let file = xlsx(PARK_HEADER, &[&["A", "", "", ""], &["B", "", "", ""], &["C", "", "", ""]]);

        let rows_limited = Reconciler::new(&store, ImportLimits { max_file_bytes: u64::MAX, max_rows: 2 });
        let err = rows_limited.import_on(EntityKind::Park, &file, today()).await.unwrap_err();
        assert!(matches!(err, EngineError::TooLarge { what: "row count", .. }));

        let bytes_limited = Reconciler::new(&store, ImportLimits { max_file_bytes: 16, max_rows: 100 });
        let err = bytes_limited.import_on(EntityKind::Park, &file, today()).await.unwrap_err();
        assert!(matches!(err, EngineError::TooLarge { what: "file size", .. }));

        assert!(all(&store, EntityKind::Park).await.is_empty());
    }

    #[test]
    fn test_merge_changes_never_rewrites_the_key() {
        let incoming: FieldMap = [("name", "Park A"), ("remark", "r")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let changes = merge_changes(EntityKind::Park, &incoming);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("remark").map(String::as_str), Some("r"));
    }
}
