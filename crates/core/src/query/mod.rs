//! Field-aware search over metadata records
//!
//! - [`field`]: field registries and typed searchers
//! - [`value`]: byte size and datetime rendering/parsing
//! - [`parser`]: search expressions compiled into [`Predicate`]s
//! - [`filter`]: the search, sort and limit pipeline

pub mod field;
pub mod filter;
pub mod parser;
pub mod value;

pub use field::{
    Attribute, FieldKind, FieldRegistry, FieldValue, Operand, Relation, SearchField,
    normalize_field_name,
};
pub use filter::{RecordFilter, filter_records};
pub use parser::{Operator, Predicate, QueryParser};
pub use value::{parse_bytes, parse_datetime, render_bytes, render_datetime};
