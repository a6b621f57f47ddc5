//! info command - Show file or folder metadata

use clap::Args;
use jiff::tz::TimeZone;
use omni_core::query::{render_bytes, render_datetime};
use omni_core::{Error, Location, MetadataRecord};

use crate::commands::parse_arg;
use crate::connect::{open_file, open_folder};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Role};

const KEY_WIDTH: usize = 14;

/// Show metadata for one or more paths
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Paths to inspect (REMOTE:PATH or local paths)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Treat the paths as folders and report aggregate size and file count
    #[arg(long)]
    pub folder: bool,
}

/// Execute the info command
pub async fn execute(args: InfoArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let tz = TimeZone::system();

    let mut records = Vec::with_capacity(args.paths.len());
    let mut exit = ExitCode::Success;

    for (i, input) in args.paths.iter().enumerate() {
        let location = match parse_arg(input, &formatter) {
            Ok(l) => l,
            Err(code) => {
                exit = code;
                continue;
            }
        };

        match fetch(&location, args.folder).await {
            Ok(record) => {
                if formatter.is_json() {
                    records.push(record);
                } else {
                    if i > 0 {
                        formatter.println("");
                    }
                    print_record(&record, &tz, &formatter);
                }
            }
            Err(e) => exit = formatter.fail(&format!("Failed to inspect {location}"), &e),
        }
    }

    if formatter.is_json() {
        formatter.json(&records);
    }

    exit
}

async fn fetch(location: &Location, folder: bool) -> Result<MetadataRecord, Error> {
    if folder {
        let target = open_folder(location).await?;
        target.client.folder_metadata(&target.path).await
    } else {
        let target = open_file(location).await?;
        target.client.file_metadata(&target.path).await
    }
}

fn print_record(record: &MetadataRecord, tz: &TimeZone, formatter: &Formatter) {
    for (key, value) in describe(record, tz) {
        let value = match key {
            "Name" if record.is_folder => formatter.paint(Role::Folder, &value),
            "Size" => formatter.paint(Role::Size, &value),
            "Last modified" => formatter.paint(Role::Timestamp, &value),
            _ => value,
        };
        formatter.key_value(&format!("{key}:"), &value, KEY_WIDTH);
    }
}

/// Human-readable properties of a record, skipping unknown values
fn describe(record: &MetadataRecord, tz: &TimeZone) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Name", record.name.clone()),
        ("Path", record.path.clone()),
        ("Container", record.container.clone()),
    ];
    if record.identifier != record.path {
        lines.push(("ID", record.identifier.clone()));
    }
    lines.push((
        "Kind",
        if record.is_folder { "folder" } else { "file" }.to_string(),
    ));
    if let Some(size) = record.size {
        lines.push(("Size", format!("{} ({size} bytes)", render_bytes(size))));
    }
    if let Some(files) = record.num_files {
        lines.push(("Files", files.to_string()));
    }
    if let Some(mime) = &record.mime_type
        && !record.is_folder
    {
        lines.push(("Type", mime.clone()));
    }
    if let Some(ts) = record.last_modified {
        lines.push(("Last modified", render_datetime(ts, tz)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_file() {
        let record = MetadataRecord::file("media", "raw/IMG_0001.jpg", 2_000)
            .with_mime_type("image/jpeg")
            .with_last_modified("2019-06-01T12:00:00Z".parse().unwrap());
        let lines = describe(&record, &TimeZone::UTC);
        let keys: Vec<&str> = lines.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            ["Name", "Path", "Container", "Kind", "Size", "Type", "Last modified"]
        );
        assert_eq!(lines[4].1, "2 KB (2000 bytes)");
    }

    #[test]
    fn test_describe_folder() {
        let record = MetadataRecord::folder("drive", "Reports")
            .with_identifier("9XyZ")
            .with_folder_stats(1_500, 3);
        let lines = describe(&record, &TimeZone::UTC);
        assert!(lines.contains(&("ID", "9XyZ".to_string())));
        assert!(lines.contains(&("Kind", "folder".to_string())));
        assert!(lines.contains(&("Files", "3".to_string())));
        assert!(!lines.iter().any(|(k, _)| *k == "Type"));
    }
}
