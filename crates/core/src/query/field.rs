//! Searchable fields and their typed comparison strategies
//!
//! A [`FieldRegistry`] maps the external field names accepted in queries
//! (`"last modified"`, `"size"`, ...) to a [`SearchField`], which binds a
//! [`FieldKind`] searcher to the record attribute it reads. Registries are
//! plain values built per backend variant; nothing here is global.

use std::cmp::Ordering;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use super::value::{parse_bytes, parse_datetime, render_bytes, render_datetime};
use crate::client::BackendKind;
use crate::error::QueryError;
use crate::record::MetadataRecord;

/// Normalize a field name: case-insensitive, with runs of spaces or
/// underscores treated as a single separator.
pub fn normalize_field_name(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Record attribute a field reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Identifier,
    Name,
    Path,
    Size,
    MimeType,
    LastModified,
    Container,
    NumFiles,
}

impl Attribute {
    /// Read this attribute from a record
    pub fn read<'a>(&self, record: &'a MetadataRecord) -> FieldValue<'a> {
        match self {
            Attribute::Identifier => FieldValue::Text(Some(&record.identifier)),
            Attribute::Name => FieldValue::Text(Some(&record.name)),
            Attribute::Path => FieldValue::Text(Some(&record.path)),
            Attribute::MimeType => FieldValue::Text(record.mime_type.as_deref()),
            Attribute::Container => FieldValue::Text(Some(&record.container)),
            Attribute::Size => FieldValue::Bytes(record.size),
            Attribute::NumFiles => FieldValue::Bytes(record.num_files),
            Attribute::LastModified => FieldValue::Datetime(record.last_modified),
        }
    }
}

/// A borrowed attribute value. `None` means the backend did not report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(Option<&'a str>),
    Bytes(Option<u64>),
    Datetime(Option<Timestamp>),
}

impl FieldValue<'_> {
    /// Total order used for sorting; missing values sort first.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Bytes(a), FieldValue::Bytes(b)) => a.cmp(b),
            (FieldValue::Datetime(a), FieldValue::Datetime(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Binary relation applied as `relation(user_value, record_value)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl Relation {
    pub fn holds<T: Ord + ?Sized>(self, usr: &T, rec: &T) -> bool {
        match self {
            Relation::Equal => usr == rec,
            Relation::LessThan => usr < rec,
            Relation::LessOrEqual => usr <= rec,
            Relation::GreaterThan => usr > rec,
            Relation::GreaterOrEqual => usr >= rec,
        }
    }
}

/// A user comparison value already parsed for a field's kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Text(String),
    Bytes(u64),
    Datetime(Timestamp),
}

impl Operand {
    /// Evaluate `relation(self, rec)`. Missing or mismatched record values
    /// never match.
    pub fn compare(&self, rec: &FieldValue<'_>, relation: Relation) -> bool {
        match (self, rec) {
            (Operand::Text(usr), FieldValue::Text(Some(rec))) => relation.holds(usr.as_str(), *rec),
            (Operand::Bytes(usr), FieldValue::Bytes(Some(rec))) => relation.holds(usr, rec),
            (Operand::Datetime(usr), FieldValue::Datetime(Some(rec))) => relation.holds(usr, rec),
            _ => false,
        }
    }
}

/// Typed searcher strategy for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    ByteSize,
    Datetime,
}

impl FieldKind {
    /// Substring search against the record value's rendered form
    pub fn contains(self, usr: &str, rec: &FieldValue<'_>, tz: &TimeZone) -> bool {
        match (self, rec) {
            (FieldKind::String, FieldValue::Text(Some(rec))) => rec.contains(usr),
            (FieldKind::ByteSize, FieldValue::Bytes(Some(rec))) => render_bytes(*rec).contains(usr),
            (FieldKind::Datetime, FieldValue::Datetime(Some(rec))) => {
                render_datetime(*rec, tz).contains(usr)
            }
            _ => false,
        }
    }

    /// Parse a user literal into an operand of this kind
    pub fn parse_operand(self, usr: &str, tz: &TimeZone) -> Result<Operand, QueryError> {
        match self {
            FieldKind::String => Ok(Operand::Text(usr.to_string())),
            FieldKind::ByteSize => parse_bytes(usr).map(Operand::Bytes),
            FieldKind::Datetime => parse_datetime(usr, tz).map(Operand::Datetime),
        }
    }

    /// Ordered comparison `relation(usr, rec)` after typed parsing of `usr`
    pub fn compare(
        self,
        usr: &str,
        rec: &FieldValue<'_>,
        relation: Relation,
        tz: &TimeZone,
    ) -> Result<bool, QueryError> {
        Ok(self.parse_operand(usr, tz)?.compare(rec, relation))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::ByteSize => "bytes",
            FieldKind::Datetime => "datetime",
        }
    }
}

/// A searchable field: canonical name, searcher kind and attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchField {
    name: String,
    kind: FieldKind,
    attribute: Attribute,
}

impl SearchField {
    pub fn new(name: &str, kind: FieldKind, attribute: Attribute) -> Self {
        Self {
            name: normalize_field_name(name),
            kind,
            attribute,
        }
    }

    /// Canonical (normalized) field name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    pub fn read<'a>(&self, record: &'a MetadataRecord) -> FieldValue<'a> {
        self.attribute.read(record)
    }
}

/// Immutable mapping from field names to [`SearchField`]s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<SearchField>,
}

impl FieldRegistry {
    pub fn new(fields: Vec<SearchField>) -> Self {
        Self { fields }
    }

    /// Fields for bucket-style object stores
    pub fn bucket() -> Self {
        Self::new(vec![
            SearchField::new("bucket", FieldKind::String, Attribute::Container),
            SearchField::new("name", FieldKind::String, Attribute::Name),
            SearchField::new("size", FieldKind::ByteSize, Attribute::Size),
            SearchField::new("type", FieldKind::String, Attribute::MimeType),
            SearchField::new("last modified", FieldKind::Datetime, Attribute::LastModified),
        ])
    }

    /// Fields for drive-style stores addressed by file id
    pub fn drive() -> Self {
        Self::new(vec![
            SearchField::new("id", FieldKind::String, Attribute::Identifier),
            SearchField::new("name", FieldKind::String, Attribute::Name),
            SearchField::new("size", FieldKind::ByteSize, Attribute::Size),
            SearchField::new("type", FieldKind::String, Attribute::MimeType),
            SearchField::new("last modified", FieldKind::Datetime, Attribute::LastModified),
        ])
    }

    /// Fields for path-addressed stores (filesystems, HTTP)
    pub fn filesystem() -> Self {
        Self::new(vec![
            SearchField::new("path", FieldKind::String, Attribute::Path),
            SearchField::new("name", FieldKind::String, Attribute::Name),
            SearchField::new("size", FieldKind::ByteSize, Attribute::Size),
            SearchField::new("type", FieldKind::String, Attribute::MimeType),
            SearchField::new("last modified", FieldKind::Datetime, Attribute::LastModified),
        ])
    }

    pub fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::S3 => Self::bucket(),
            BackendKind::GoogleDrive => Self::drive(),
            BackendKind::Http | BackendKind::Sftp | BackendKind::Local => Self::filesystem(),
        }
    }

    /// Look up a field by any spelling of its name
    pub fn get(&self, name: &str) -> Option<&SearchField> {
        let normalized = normalize_field_name(name);
        self.fields.iter().find(|f| f.name == normalized)
    }

    pub fn fields(&self) -> &[SearchField] {
        &self.fields
    }

    /// Canonical names of all registered fields, in registration order
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}
