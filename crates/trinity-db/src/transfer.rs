// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Bulk CSV import and export of catalog items.
//!
//! Files carry a UTF-8 byte-order mark so spreadsheet tools pick the right
//! encoding. Import maps columns by header name, so column order and extra
//! columns do not matter. Each row is inserted on its own; a bad row is
//! skipped and the rest of the file still loads.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use trinity_app::{ItemDraft, UserId};

use crate::Store;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_COLUMNS: [&str; 14] = [
    "name",
    "name_en",
    "field",
    "element1",
    "element2",
    "element3",
    "description",
    "element1_sacrifice_explanation",
    "element2_sacrifice_explanation",
    "element3_sacrifice_explanation",
    "hyperlink",
    "element1_image_url",
    "element2_image_url",
    "element3_image_url",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

fn draft_record(draft: &ItemDraft) -> [&str; 14] {
    [
        draft.name.as_str(),
        draft.name_en.as_str(),
        draft.field.as_str(),
        draft.element1.as_str(),
        draft.element2.as_str(),
        draft.element3.as_str(),
        draft.description.as_str(),
        draft.element1_sacrifice_explanation.as_str(),
        draft.element2_sacrifice_explanation.as_str(),
        draft.element3_sacrifice_explanation.as_str(),
        draft.hyperlink.as_str(),
        draft.element1_image_url.as_str(),
        draft.element2_image_url.as_str(),
        draft.element3_image_url.as_str(),
    ]
}

fn draft_from_columns(lookup: impl Fn(&str) -> String) -> ItemDraft {
    ItemDraft {
        name: lookup("name"),
        name_en: lookup("name_en"),
        field: lookup("field"),
        element1: lookup("element1"),
        element2: lookup("element2"),
        element3: lookup("element3"),
        description: lookup("description"),
        element1_sacrifice_explanation: lookup("element1_sacrifice_explanation"),
        element2_sacrifice_explanation: lookup("element2_sacrifice_explanation"),
        element3_sacrifice_explanation: lookup("element3_sacrifice_explanation"),
        hyperlink: lookup("hyperlink"),
        element1_image_url: lookup("element1_image_url"),
        element2_image_url: lookup("element2_image_url"),
        element3_image_url: lookup("element3_image_url"),
    }
}

impl Store {
    /// Write every item to `writer`, oldest first. Returns the row count.
    pub fn export_csv<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(UTF8_BOM).context("write csv byte-order mark")?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(CSV_COLUMNS)
            .context("write csv header")?;

        let drafts = self.list_drafts()?;
        for draft in &drafts {
            csv_writer
                .write_record(draft_record(draft))
                .with_context(|| format!("write csv row for {}", draft.name))?;
        }
        csv_writer.flush().context("flush csv output")?;
        Ok(drafts.len())
    }

    pub fn export_csv_path(&self, path: &Path) -> Result<usize> {
        let file = File::create(path)
            .with_context(|| format!("create export file {}", path.display()))?;
        let count = self.export_csv(file)?;
        info!(rows = count, path = %path.display(), "exported catalog");
        Ok(count)
    }

    /// Insert one item per valid row of `reader`. Rows missing a name or
    /// any element, and rows the CSV parser rejects, are skipped.
    pub fn import_csv<R: Read>(&self, reader: R, author: Option<UserId>) -> Result<ImportSummary> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("read csv header")?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').to_owned())
            .collect();

        let mut summary = ImportSummary::default();
        for (index, record) in csv_reader.records().enumerate() {
            let line = index + 2;
            let record = match record {
                Ok(record) => record,
                Err(error) => {
                    warn!(line, %error, "skipping unreadable csv row");
                    summary.skipped += 1;
                    continue;
                }
            };

            let draft = draft_from_columns(|column| {
                headers
                    .iter()
                    .position(|header| header == column)
                    .and_then(|position| record.get(position))
                    .unwrap_or_default()
                    .to_owned()
            });

            if let Err(error) = draft.validate() {
                warn!(line, error = %format!("{error:#}"), "skipping invalid csv row");
                summary.skipped += 1;
                continue;
            }
            match self.create_item(&draft, author) {
                Ok(_) => summary.imported += 1,
                Err(error) => {
                    warn!(line, error = %format!("{error:#}"), "skipping csv row that failed to insert");
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    pub fn import_csv_path(&self, path: &Path, author: Option<UserId>) -> Result<ImportSummary> {
        let file =
            File::open(path).with_context(|| format!("open import file {}", path.display()))?;
        let summary = self.import_csv(file, author)?;
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            path = %path.display(),
            "imported catalog"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::{CSV_COLUMNS, UTF8_BOM};
    use crate::Store;
    use trinity_app::ItemDraft;

    #[test]
    fn export_starts_with_bom_and_header() -> anyhow::Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.create_item(&ItemDraft::new("CAP", "Computer Science", ["C", "A", "P"]), None)?;

        let mut buffer = Vec::new();
        let rows = store.export_csv(&mut buffer)?;
        assert_eq!(rows, 1);
        assert!(buffer.starts_with(UTF8_BOM));

        let text = String::from_utf8(buffer[UTF8_BOM.len()..].to_vec())?;
        let header = text.lines().next().expect("header line");
        assert_eq!(header, CSV_COLUMNS.join(","));
        assert!(text.contains("CAP,Impossible Trinity,Computer Science,C,A,P"));
        Ok(())
    }

    #[test]
    fn import_maps_columns_by_header_name() -> anyhow::Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        let csv = "\u{feff}element3,element2,element1,name,field\nP,A,C,CAP,Computer Science\n";
        let summary = store.import_csv(csv.as_bytes(), None)?;
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 0);

        let drafts = store.list_drafts()?;
        assert_eq!(drafts[0].element1, "C");
        assert_eq!(drafts[0].element3, "P");
        assert_eq!(drafts[0].name_en, "Impossible Trinity");
        Ok(())
    }
}
