//! ls command - List a folder with optional search, sort and limit
//!
//! Listings go through the record filter, so `-s "size>10MB,type:image"`
//! works the same against every backend. Columns follow the backend's
//! searchable fields.

use clap::Args;
use comfy_table::{ContentArrangement, Table, presets};
use jiff::tz::TimeZone;
use omni_core::query::{
    FieldKind, FieldRegistry, FieldValue, SearchField, render_bytes, render_datetime,
};
use omni_core::{Error, MetadataRecord, RecordFilter};
use serde::Serialize;

use crate::commands::parse_arg;
use crate::connect::open_folder;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Role};

/// List a folder
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Folder to list (REMOTE:PATH or a local path)
    pub path: String,

    /// List the whole subtree
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum number of records to show (0 or less = no limit)
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub limit: i64,

    /// Search expression, e.g. "size>10MB,name:report"
    #[arg(short, long)]
    pub search: Option<String>,

    /// Field to sort by, e.g. "size" or "last modified"
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub ascending: bool,

    /// Only print the number of records and their total size
    #[arg(short, long)]
    pub count: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<MetadataRecord>,
    count: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

#[derive(Debug, Serialize)]
struct CountOutput {
    count: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let location = match parse_arg(&args.path, &formatter) {
        Ok(l) => l,
        Err(code) => return code,
    };

    let target = match open_folder(&location).await {
        Ok(t) => t,
        Err(e) => return formatter.fail("Failed to open location", &e),
    };

    let records = match target.client.list_folder(&target.path, args.recursive).await {
        Ok(r) => r,
        Err(e) => return formatter.fail(&format!("Failed to list {location}"), &e),
    };

    let registry = target.client.field_registry();
    let tz = TimeZone::system();

    let mut filter = RecordFilter::new(&registry)
        .time_zone(tz.clone())
        .ascending(args.ascending)
        .limit(args.limit);
    if let Some(search) = &args.search {
        filter = filter.search(search.as_str());
    }
    if let Some(sort_by) = &args.sort_by {
        filter = filter.sort_by(sort_by.as_str());
    }

    let records = match filter.apply(records) {
        Ok(r) => r,
        Err(e) => return formatter.fail("Invalid query", &Error::from(e)),
    };

    let total_size = total_size(&records);
    let total_size_human = render_bytes(total_size);

    if args.count {
        if formatter.is_json() {
            formatter.json(&CountOutput {
                count: records.len(),
                total_size_bytes: total_size,
                total_size_human,
            });
        } else {
            let styled_size = formatter.paint(Role::Size, &total_size_human);
            formatter.println(&format!("{} record(s), {styled_size}", records.len()));
        }
        return ExitCode::Success;
    }

    if formatter.is_json() {
        formatter.json(&LsOutput {
            count: records.len(),
            items: records,
            total_size_bytes: total_size,
            total_size_human,
        });
    } else if records.is_empty() {
        formatter.println("No matching records.");
    } else {
        let table = build_table(&records, &registry, &tz, &formatter);
        formatter.println(&table.to_string());
        formatter.println(&format!(
            "{} record(s), {}",
            records.len(),
            formatter.paint(Role::Size, &total_size_human)
        ));
    }

    ExitCode::Success
}

/// Sum of file sizes; folders are not counted
fn total_size(records: &[MetadataRecord]) -> u64 {
    records
        .iter()
        .filter(|r| !r.is_folder)
        .filter_map(|r| r.size)
        .sum()
}

fn column_header(field: &SearchField) -> String {
    field.name().replace('_', " ").to_uppercase()
}

/// Render one cell the same way searches see the value
fn render_cell(value: FieldValue<'_>, tz: &TimeZone) -> String {
    match value {
        FieldValue::Text(text) => text.unwrap_or_default().to_string(),
        FieldValue::Bytes(bytes) => bytes.map(render_bytes).unwrap_or_default(),
        FieldValue::Datetime(ts) => ts.map(|ts| render_datetime(ts, tz)).unwrap_or_default(),
    }
}

fn build_table(
    records: &[MetadataRecord],
    registry: &FieldRegistry,
    tz: &TimeZone,
    formatter: &Formatter,
) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(registry.fields().iter().map(column_header));

    for record in records {
        table.add_row(registry.fields().iter().map(|field| {
            let text = render_cell(field.read(record), tz);
            match field.kind() {
                _ if record.is_folder && field.name() == "name" => formatter.paint(Role::Folder, &text),
                FieldKind::ByteSize => formatter.paint(Role::Size, &text),
                FieldKind::Datetime => formatter.paint(Role::Timestamp, &text),
                FieldKind::String => text,
            }
        }));
    }

    table
}
