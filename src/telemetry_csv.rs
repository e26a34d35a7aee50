//! Telemetry ingestion and export as CSV
//!
//! The header row names [`TelemetryRecord`] fields by their wire names. Import
//! accepts the columns in any order; export always writes declaration order.
//!
//! ```text
//! generatorPower,voltage,current,...,materialProperties,foundationType
//! 1800,690,1500,...,210,gravity
//! ```

use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::TelemetryRecord;

/// Errors that reject a whole CSV document.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("header is missing column '{0}'")]
    MissingColumn(&'static str),
}

/// Result of a CSV import.
#[derive(Debug, Clone, Default)]
pub struct CsvImport {
    /// Valid rows in file order.
    pub records: Vec<TelemetryRecord>,
    /// Rows dropped for a field-count mismatch or an invalid value.
    pub skipped: usize,
}

impl CsvImport {
    /// The row that becomes current telemetry after an import.
    pub fn last(&self) -> Option<&TelemetryRecord> {
        self.records.last()
    }
}

/// Parse a telemetry CSV document.
///
/// Numeric-looking cells become JSON numbers and everything else text, so a
/// categorical column holding a number (or a numeric column holding a word)
/// fails record validation and the row is skipped.
pub fn parse_csv(text: &str) -> Result<CsvImport, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if let Some(missing) = TelemetryRecord::FIELD_NAMES
        .iter()
        .find(|name| !headers.iter().any(|h| h == **name))
    {
        return Err(ImportError::MissingColumn(*missing));
    }

    let mut import = CsvImport::default();
    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Error reading CSV row");
                import.skipped += 1;
                continue;
            }
        };
        let line = row.position().map_or(0, |p| p.line());

        if row.len() != headers.len() {
            warn!(
                line,
                expected = headers.len(),
                got = row.len(),
                "Skipping CSV row with wrong field count"
            );
            import.skipped += 1;
            continue;
        }

        let object: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .filter(|(name, _)| TelemetryRecord::FIELD_NAMES.iter().any(|f| f == name))
            .map(|(name, cell)| (name.to_string(), cell_value(cell)))
            .collect();

        match TelemetryRecord::from_json(Value::Object(object)) {
            Ok(record) => import.records.push(record),
            Err(e) => {
                warn!(line, error = %e, "Skipping invalid CSV row");
                import.skipped += 1;
            }
        }
    }

    Ok(import)
}

/// Read and parse a telemetry CSV file.
pub fn read_csv_file(path: &Path) -> Result<CsvImport, ImportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let import = parse_csv(&text)?;
    info!(
        count = import.records.len(),
        skipped = import.skipped,
        path = %path.display(),
        "Loaded telemetry records from CSV"
    );
    Ok(import)
}

/// Write records as CSV: header row, then one row per record.
pub fn to_csv(records: &[TelemetryRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TelemetryRecord::FIELD_NAMES)?;
    for record in records {
        writer.write_record(
            TelemetryRecord::FIELD_NAMES
                .iter()
                .map(|name| record.field_text(name).unwrap_or_default()),
        )?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn cell_value(cell: &str) -> Value {
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}
