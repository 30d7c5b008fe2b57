use std::path::PathBuf;

use anyhow::Error;
use clap::{Parser, ValueEnum};
use deck::{
    Layout, SheetRef, SheetsClient,
    remote::{DEFAULT_SHEET_NAME, DEFAULT_SPECIAL_SHEET_NAME, DEFAULT_SPREADSHEET_ID},
};
use export::{Target, collect, write};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Primary,
    Special,
    Both,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Which sheets to export
    #[arg(long, value_enum, default_value_t = Source::Both)]
    source: Source,

    #[arg(long, env = "SPREADSHEET_ID", default_value = DEFAULT_SPREADSHEET_ID)]
    spreadsheet_id: String,

    #[arg(long, env = "SHEET_NAME", default_value = DEFAULT_SHEET_NAME)]
    sheet_name: String,

    /// Defaults to the primary spreadsheet
    #[arg(long, env = "SPECIAL_SPREADSHEET_ID")]
    special_spreadsheet_id: Option<String>,

    #[arg(long, env = "SPECIAL_SHEET_NAME", default_value = DEFAULT_SPECIAL_SHEET_NAME)]
    special_sheet_name: String,

    /// Column layout of the primary sheet: super or tips
    #[arg(long, env = "PRIMARY_LAYOUT", default_value = "super")]
    layout: Layout,

    /// Writes to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT_JSON", hide_env_values = true)]
    service_account_json: String,
}

impl Args {
    fn targets(&self) -> Vec<Target> {
        let primary = Target {
            name: "primary".to_string(),
            sheet: SheetRef::new(&self.spreadsheet_id, &self.sheet_name),
            layout: self.layout,
        };
        let special = Target {
            name: "special".to_string(),
            sheet: SheetRef::new(
                self.special_spreadsheet_id
                    .as_deref()
                    .unwrap_or(&self.spreadsheet_id),
                &self.special_sheet_name,
            ),
            layout: Layout::Special,
        };

        match self.source {
            Source::Primary => vec![primary],
            Source::Special => vec![special],
            Source::Both => vec![primary, special],
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let client = SheetsClient::from_service_account_json(&args.service_account_json)?;
    let decks = collect(&client, &args.targets()).await?;

    write(&decks, args.output.as_deref())
}
