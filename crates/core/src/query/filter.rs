//! Record filter pipeline: search, sort, then limit

use jiff::tz::TimeZone;

use super::field::{FieldRegistry, normalize_field_name};
use super::parser::QueryParser;
use crate::error::QueryError;
use crate::record::MetadataRecord;

/// Options for [`RecordFilter::apply`]
///
/// ```
/// use omni_core::query::{FieldRegistry, RecordFilter};
/// use omni_core::MetadataRecord;
///
/// let registry = FieldRegistry::bucket();
/// let records = vec![
///     MetadataRecord::file("b", "small.bin", 10),
///     MetadataRecord::file("b", "large.bin", 10_000_000),
/// ];
/// let kept = RecordFilter::new(&registry)
///     .search("size<1MB")
///     .apply(records)
///     .unwrap();
/// assert_eq!(kept.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecordFilter<'r> {
    registry: &'r FieldRegistry,
    search: Option<String>,
    sort_by: Option<String>,
    ascending: bool,
    limit: i64,
    tz: TimeZone,
}

impl<'r> RecordFilter<'r> {
    pub fn new(registry: &'r FieldRegistry) -> Self {
        Self {
            registry,
            search: None,
            sort_by: None,
            ascending: false,
            limit: 0,
            tz: TimeZone::system(),
        }
    }

    /// Keep only records matching every clause of `expr`
    pub fn search(mut self, expr: impl Into<String>) -> Self {
        self.search = Some(expr.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    /// Maximum number of records returned; zero or negative is unlimited
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn time_zone(mut self, tz: TimeZone) -> Self {
        self.tz = tz;
        self
    }

    /// Run the pipeline. Query and sort validation happen before any record
    /// is touched, so an invalid request never yields a partial result.
    pub fn apply(&self, records: Vec<MetadataRecord>) -> Result<Vec<MetadataRecord>, QueryError> {
        let predicates = match &self.search {
            Some(expr) => QueryParser::new(self.registry)
                .with_time_zone(self.tz.clone())
                .parse_all(expr)?,
            None => Vec::new(),
        };

        let sort_field = match &self.sort_by {
            Some(name) => Some(self.registry.get(name).ok_or_else(|| QueryError::SortField {
                original: name.clone(),
                normalized: normalize_field_name(name),
                valid: self.registry.names(),
            })?),
            None => None,
        };

        let mut records: Vec<MetadataRecord> = records
            .into_iter()
            .filter(|record| predicates.iter().all(|p| p.matches(record)))
            .collect();

        match sort_field {
            Some(field) => {
                let ascending = self.ascending;
                // sort_by is stable; reversing the comparator keeps ties in listing order
                records.sort_by(|a, b| {
                    let ord = field.read(a).sort_cmp(&field.read(b));
                    if ascending { ord } else { ord.reverse() }
                });
            }
            None if !self.ascending => records.reverse(),
            None => {}
        }

        if self.limit > 0 {
            records.truncate(usize::try_from(self.limit).unwrap_or(usize::MAX));
        }

        tracing::debug!(
            kept = records.len(),
            clauses = predicates.len(),
            "Filtered records"
        );

        Ok(records)
    }
}

/// Filter, sort and limit `records` in the system time zone
pub fn filter_records(
    records: Vec<MetadataRecord>,
    limit: i64,
    search: Option<&str>,
    sort_by: Option<&str>,
    ascending: bool,
    registry: &FieldRegistry,
) -> Result<Vec<MetadataRecord>, QueryError> {
    let mut filter = RecordFilter::new(registry).limit(limit).ascending(ascending);
    if let Some(expr) = search {
        filter = filter.search(expr);
    }
    if let Some(field) = sort_by {
        filter = filter.sort_by(field);
    }
    filter.apply(records)
}
