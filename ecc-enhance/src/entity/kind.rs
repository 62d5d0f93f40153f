//! Entity categories and their field allow-lists

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FieldMap;
use crate::error::{EngineError, EngineResult};

/// Free-text stamp column carried by the detail categories
pub const UPDATE_TIME: &str = "update_time";

const PARK_FIELDS: &[&str] = &["name", "area", "company_name", "remark"];

const CHAIN_BAND_FIELDS: &[&str] = &["band", "area", "store", "remark"];

const COMPANY_FIELDS: &[&str] = &[
    "company_name",
    "business_park",
    "visitor_name",
    "actual_people_count",
    "other_carrier",
    "key_person_name",
    "key_person_phone",
    "competitor_services",
    "competitor_price",
    "competitor_expiry",
    "remarks",
    UPDATE_TIME,
];

const HOTEL_FIELDS: &[&str] = &[
    "hotel_name",
    "business_park",
    "visitor_name",
    "actual_people_count",
    "other_carrier",
    "key_person_name",
    "key_person_phone",
    "competitor_services",
    "competitor_price",
    "competitor_expiry",
    "remarks",
    UPDATE_TIME,
];

const CHAIN_STORE_FIELDS: &[&str] = &[
    "chain_store_name",
    "chain_band",
    "visitor_name",
    "actual_people_count",
    "other_carrier",
    "key_person_name",
    "key_person_phone",
    "competitor_services",
    "competitor_price",
    "competitor_expiry",
    "remarks",
    UPDATE_TIME,
];

/// A business category with its own table in the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Park,
    Company,
    Hotel,
    ChainBand,
    ChainStore,
}

impl EntityKind {
    /// Get all variants
    pub fn all_variants() -> &'static [EntityKind] {
        &[
            EntityKind::Park,
            EntityKind::Company,
            EntityKind::Hotel,
            EntityKind::ChainBand,
            EntityKind::ChainStore,
        ]
    }

    /// Storage table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Park => "business_park",
            EntityKind::Company => "company",
            EntityKind::Hotel => "hotel",
            EntityKind::ChainBand => "chain_band",
            EntityKind::ChainStore => "chain_store",
        }
    }

    /// Short name used on the command line and in route prefixes
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::Park => "park",
            EntityKind::Company => "company",
            EntityKind::Hotel => "hotel",
            EntityKind::ChainBand => "chain_band",
            EntityKind::ChainStore => "chain_store",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Park => "business park",
            EntityKind::Company => "company",
            EntityKind::Hotel => "hotel",
            EntityKind::ChainBand => "chain brand",
            EntityKind::ChainStore => "chain store",
        }
    }

    /// Field used to match spreadsheet rows against stored records
    pub fn natural_key(&self) -> &'static str {
        self.fields()[0]
    }

    /// Writable fields in storage order, natural key first
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Park => PARK_FIELDS,
            EntityKind::Company => COMPANY_FIELDS,
            EntityKind::Hotel => HOTEL_FIELDS,
            EntityKind::ChainBand => CHAIN_BAND_FIELDS,
            EntityKind::ChainStore => CHAIN_STORE_FIELDS,
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields().contains(&field)
    }

    /// Whether imports stamp `update_time` on rows that leave it blank
    pub fn stamps_update_time(&self) -> bool {
        self.has_field(UPDATE_TIME)
    }

    /// Reject any key outside this category's allow-list
    pub fn check_fields(&self, fields: &FieldMap) -> EngineResult<()> {
        match fields.keys().find(|name| !self.has_field(name)) {
            Some(name) => Err(EngineError::UnknownField {
                kind: *self,
                field: name.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::all_variants()
            .iter()
            .copied()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_keys() {
        assert_eq!(EntityKind::Park.natural_key(), "name");
        assert_eq!(EntityKind::ChainBand.natural_key(), "band");
        assert_eq!(EntityKind::Company.natural_key(), "company_name");
        assert_eq!(EntityKind::Hotel.natural_key(), "hotel_name");
        assert_eq!(EntityKind::ChainStore.natural_key(), "chain_store_name");
    }

    #[test]
    fn test_update_time_only_on_detail_categories() {
        assert!(!EntityKind::Park.stamps_update_time());
        assert!(!EntityKind::ChainBand.stamps_update_time());
        assert!(EntityKind::Company.stamps_update_time());
        assert!(EntityKind::Hotel.stamps_update_time());
        assert!(EntityKind::ChainStore.stamps_update_time());
    }

    #[test]
    fn test_check_fields_rejects_id_and_unknown_keys() {
        let mut fields = FieldMap::new();
        fields.insert("name".into(), "Park A".into());
        assert!(EntityKind::Park.check_fields(&fields).is_ok());

        fields.insert("id".into(), "7".into());
        match EntityKind::Park.check_fields(&fields) {
            Err(EngineError::UnknownField { field, .. }) => assert_eq!(field, "id"),
            other => panic!("expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn test_slug_round_trip() {
        for kind in EntityKind::all_variants() {
            assert_eq!(kind.slug().parse::<EntityKind>().unwrap(), *kind);
        }
        assert!("parks".parse::<EntityKind>().is_err());
    }
}
