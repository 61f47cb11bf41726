// CSV Ingestion - raw bytes -> ordered column/value rows

use crate::domain::RawPayload;
use crate::error::IngestError;
use csv::{ReaderBuilder, StringRecord, Trim};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One data line of the uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// Spreadsheet line number: header is line 1, first data row is line 2
    pub row_number: i64,
    pub values: RawPayload,
}

/// Parse a CSV upload using its first line as header.
///
/// Values and headers are trimmed, empty lines skipped, a leading UTF-8 BOM
/// stripped. Delimiter-only lines are kept as rows with empty values. Fails with `NoRows` when no data rows remain and with
/// `MissingHeaders` naming every absent required column.
pub fn parse_csv(bytes: &[u8], required_headers: &[String]) -> Result<Vec<ParsedRow>, IngestError> {
    let input = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Malformed(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IngestError::Malformed(e.to_string()))?;
        if is_empty_line(&record) {
            continue;
        }
        if record.len() != headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(IngestError::Malformed(format!(
                "line {} has {} fields, header has {}",
                line,
                record.len(),
                headers.len()
            )));
        }
        let row_number = rows.len() as i64 + 2;
        rows.push(ParsedRow {
            row_number,
            values: to_payload(&headers, &record),
        });
    }

    if rows.is_empty() {
        return Err(IngestError::NoRows);
    }

    let missing: Vec<String> = required_headers
        .iter()
        .filter(|required| !headers.iter().any(|h| h == required.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingHeaders(missing));
    }

    Ok(rows)
}

/// A line with nothing on it but whitespace
fn is_empty_line(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn to_payload(headers: &StringRecord, record: &StringRecord) -> RawPayload {
    headers
        .iter()
        .zip(record.iter())
        .map(|(h, v)| (h.to_string(), v.to_string()))
        .collect()
}
