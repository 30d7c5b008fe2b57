//! # Sheet Export
//!
//! Offline dump of the card feed, for checking a sheet edit without running the server.
//!
//! 1. Fetch every requested sheet with the same service account the server uses
//! 2. Group rows into cards and make Drive image links direct
//! 3. Write one JSON document with a deck per sheet, to a file or stdout
//!
//! Sheets are fetched one at a time, a failure stops the export.
use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Error};
use deck::{Layout, PromptCard, SheetRef, SheetSource, drive::rewrite_images, group_rows};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub sheet: SheetRef,
    pub layout: Layout,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExportedDeck {
    pub source: String,
    pub range: String,
    pub layout: String,
    pub cards: Vec<PromptCard>,
}

pub async fn collect(
    source: &dyn SheetSource,
    targets: &[Target],
) -> Result<Vec<ExportedDeck>, Error> {
    let pb = ProgressBar::new(targets.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}")?,
    );

    let mut decks = Vec::with_capacity(targets.len());

    for target in targets {
        pb.set_message(format!("Fetching {}", target.name));

        let data = source.fetch(&target.sheet).await.with_context(|| {
            format!(
                "Failed to fetch {} ({} / {})",
                target.name, target.sheet.spreadsheet_id, target.sheet.sheet_name
            )
        })?;

        let mut cards = group_rows(&data.values, target.layout);
        rewrite_images(&mut cards);

        pb.println(format!(
            "{}: {} rows, {} cards",
            target.name,
            data.values.len(),
            cards.len()
        ));
        pb.inc(1);

        decks.push(ExportedDeck {
            source: target.name.clone(),
            range: data.range,
            layout: target.layout.to_string(),
            cards,
        });
    }

    pb.finish_with_message("Done");

    Ok(decks)
}

/// Pretty JSON to `output`, or stdout when there is none.
pub fn write(decks: &[ExportedDeck], output: Option<&Path>) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(decks)?;

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writeln!(file, "{json}")?;
        }
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use deck::{SheetData, SheetsError};

    use super::*;

    struct OneSheet;

    #[async_trait]
    impl SheetSource for OneSheet {
        async fn fetch(&self, sheet: &SheetRef) -> Result<SheetData, SheetsError> {
            if sheet.sheet_name != "special" {
                return Err(SheetsError::SheetNotFound);
            }

            Ok(SheetData {
                values: vec![
                    vec!["title".to_string()],
                    vec![
                        "Bonus".to_string(),
                        "en".to_string(),
                        "ko".to_string(),
                        "tool".to_string(),
                    ],
                ],
                range: "'special'!A1:D2".to_string(),
            })
        }
    }

    fn target(sheet_name: &str) -> Target {
        Target {
            name: sheet_name.to_string(),
            sheet: SheetRef::new("sheet-id", sheet_name),
            layout: Layout::Special,
        }
    }

    #[tokio::test]
    async fn test_collect() {
        let decks = collect(&OneSheet, &[target("special")]).await.unwrap();

        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].source, "special");
        assert_eq!(decks[0].layout, "special");
        assert_eq!(decks[0].range, "'special'!A1:D2");
        assert_eq!(decks[0].cards[0].id, "special-title-Bonus-1");
    }

    #[tokio::test]
    async fn test_collect_stops_on_failure() {
        let error = collect(&OneSheet, &[target("special"), target("missing")])
            .await
            .err()
            .unwrap();

        assert!(error.to_string().starts_with("Failed to fetch missing"));
    }

    #[tokio::test]
    async fn test_write_file() {
        let decks = collect(&OneSheet, &[target("special")]).await.unwrap();
        let path = std::env::temp_dir()
            .join(format!("promptdeck-export-{}.json", std::process::id()));

        write(&decks, Some(&path)).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(written[0]["cards"][0]["title"], "Bonus");
        assert_eq!(written[0]["cards"][0]["beforeItems"][0]["tool"], "tool");
    }
}
