//! Schema registry: the exact ordered header each import must start with

use crate::entity::{EntityKind, UPDATE_TIME};
use crate::error::{EngineError, EngineResult};

/// Hotel sheets carry no `business_park` column; it is set through edits only
const HOTEL_IMPORT_COLUMNS: &[&str] = &[
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
    UPDATE_TIME,
];

/// Expected leading header columns for an import into `kind`. Every column
/// is a writable field of the category, but not every field is a column.
pub fn expected_columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Hotel => HOTEL_IMPORT_COLUMNS,
        _ => kind.fields(),
    }
}

/// True iff the first `expected.len()` observed columns equal the expected
/// list, in order, case-sensitively. Trailing extras are ignored.
pub fn validate_header<S: AsRef<str>>(kind: EntityKind, observed: &[S]) -> bool {
    let expected = expected_columns(kind);
    observed.len() >= expected.len()
        && expected
            .iter()
            .zip(observed)
            .all(|(want, got)| {
                let got: &str = got.as_ref();
                *want == got
            })
}

/// [`validate_header`] with diagnostics for the caller's log
pub fn check_header<S: AsRef<str>>(kind: EntityKind, observed: &[S]) -> EngineResult<()> {
    if validate_header(kind, observed) {
        return Ok(());
    }

    let expected: Vec<String> = expected_columns(kind).iter().map(|c| c.to_string()).collect();
    let observed: Vec<String> = observed.iter().map(|c| c.as_ref().to_string()).collect();
    log::warn!(
        "Header mismatch for {}: expected {:?}, found {:?}",
        kind,
        expected,
        observed
    );
    Err(EngineError::SchemaMismatch {
        kind,
        expected,
        observed,
    })
}
