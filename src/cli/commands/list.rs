//! List downloaded flyers command.

use console::style;

use crate::config::Settings;
use crate::models::FlyerRecord;
use crate::repository::{JsonMetadataStore, MetadataStore};

/// Print the records in the metadata store.
pub fn cmd_list(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let store = JsonMetadataStore::load(settings.metadata_path())?;
    let records = store.records();

    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!(
            "{} No flyers recorded in {}",
            style("!").yellow(),
            store.path().display()
        );
        return Ok(());
    }

    println!(
        "{:<45} {:<16} {:>4} {:<10} {:>8}",
        style("File").bold(),
        style("Type").bold(),
        style("Year").bold(),
        style("Period").bold(),
        style("Size").bold()
    );
    println!("{}", "-".repeat(87));
    for record in records {
        println!("{}", format_row(record));
    }
    println!(
        "\n{} {} flyers in {}",
        style("✓").green(),
        records.len(),
        store.path().display()
    );

    Ok(())
}

fn format_row(record: &FlyerRecord) -> String {
    let d = &record.descriptor;
    format!(
        "{:<45} {:<16} {:>4} {:<10} {:>5} KB",
        record.filename,
        d.flyer_type.as_str(),
        d.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
        d.period_token().unwrap_or_else(|| "-".to_string()),
        record.file_size / 1024
    )
}
