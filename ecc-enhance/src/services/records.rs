//! CRUD façade over the record store
//!
//! Direct creates do not look for an existing natural key the way imports
//! do, so a manual record can sit next to an imported one with the same
//! name. Updates overwrite exactly the supplied fields, blanks included.

use serde::Serialize;

use crate::config::ListingConfig;
use crate::entity::{EntityKind, FieldMap, Record, is_blank};
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, records};

/// One page of records plus pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub data: Vec<Record>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

pub struct RecordService<'a> {
    store: &'a Store,
    listing: ListingConfig,
}

impl<'a> RecordService<'a> {
    pub fn new(store: &'a Store, listing: ListingConfig) -> Self {
        Self { store, listing }
    }

    /// Page numbers start at 1. A page past the end is empty, not an error.
    pub async fn list(
        &self,
        kind: EntityKind,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> EngineResult<Page> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(self.listing.default_per_page)
            .clamp(1, self.listing.max_per_page.max(1));

        let mut conn = self.store.pool().acquire().await?;
        let total = records::count(&mut conn, kind).await?;
        let offset = (page as i64 - 1) * per_page as i64;
        let data = records::list_page(&mut conn, kind, per_page as i64, offset).await?;

        let pages = ((total + per_page as i64 - 1) / per_page as i64) as u32;
        Ok(Page {
            data,
            total,
            page,
            per_page,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        })
    }

    pub async fn get(&self, kind: EntityKind, id: i64) -> EngineResult<Record> {
        let mut conn = self.store.pool().acquire().await?;
        records::get(&mut conn, kind, id)
            .await?
            .ok_or(EngineError::NotFound { kind, id })
    }

    /// Create one record; the natural key is required
    pub async fn create(&self, kind: EntityKind, fields: &FieldMap) -> EngineResult<i64> {
        kind.check_fields(fields)?;
        let key = fields.get(kind.natural_key()).map(String::as_str).unwrap_or("");
        if is_blank(key) {
            return Err(EngineError::MissingNaturalKey {
                kind,
                field: kind.natural_key(),
            });
        }

        let mut conn = self.store.pool().acquire().await?;
        let id = records::insert(&mut conn, kind, fields).await?;
        log::info!("Created {} {}", kind, id);
        Ok(id)
    }

    /// Overwrite the supplied fields of an existing record
    pub async fn update(&self, kind: EntityKind, id: i64, fields: &FieldMap) -> EngineResult<()> {
        kind.check_fields(fields)?;
        if fields.get(kind.natural_key()).is_some_and(|key| is_blank(key)) {
            return Err(EngineError::MissingNaturalKey {
                kind,
                field: kind.natural_key(),
            });
        }

        let mut conn = self.store.pool().acquire().await?;
        if !records::update_fields(&mut conn, kind, id, fields).await? {
            return Err(EngineError::NotFound { kind, id });
        }
        log::info!("Updated {} {} ({} fields)", kind, id, fields.len());
        Ok(())
    }

    pub async fn delete(&self, kind: EntityKind, id: i64) -> EngineResult<()> {
        let mut conn = self.store.pool().acquire().await?;
        if !records::delete(&mut conn, kind, id).await? {
            return Err(EngineError::NotFound { kind, id });
        }
        log::info!("Deleted {} {}", kind, id);
        Ok(())
    }
}
