use crate::error::Result;
use serde::Serialize;
use std::io::Read;

const FIELD_MARKER: char = '`';
const BOM: char = '\u{feff}';

/// Totals block at the end of a downloaded bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillSummary {
    pub headers: Vec<String>,
    pub values: Vec<String>,
}

/// A parsed statement. Values are kept as text exactly as the gateway wrote
/// them, minus the back-tick each field is prefixed with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bill {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
    pub summary: Option<BillSummary>,
}

impl Bill {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Value of column `name` in data row `row`.
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let column = self.column(name)?;
        self.records.get(row)?.get(column).map(String::as_str)
    }
}

/// Reads bill text as returned by the bill download endpoint.
///
/// The layout is a header row, data rows whose fields all start with a
/// back-tick, then a summary header row and a single summary value row.
pub struct BillReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> BillReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn read(mut self) -> Result<Bill> {
        let mut bill = Bill::default();
        let mut headers_seen = false;
        let mut summary_headers: Option<Vec<String>> = None;

        for record in self.reader.records() {
            let record = record?;
            let fields: Vec<String> = record
                .iter()
                .map(|field| field.trim_start_matches(BOM).to_string())
                .collect();
            if fields.iter().all(String::is_empty) {
                continue;
            }

            if !headers_seen {
                bill.headers = fields;
                headers_seen = true;
            } else if let Some(headers) = summary_headers.take() {
                bill.summary = Some(BillSummary {
                    headers,
                    values: strip_markers(fields),
                });
                break;
            } else if fields[0].starts_with(FIELD_MARKER) {
                bill.records.push(strip_markers(fields));
            } else {
                summary_headers = Some(fields);
            }
        }

        if let Some(headers) = summary_headers {
            bill.summary = Some(BillSummary {
                headers,
                values: Vec::new(),
            });
        }
        Ok(bill)
    }
}

fn strip_markers(fields: Vec<String>) -> Vec<String> {
    fields
        .into_iter()
        .map(|field| match field.strip_prefix(FIELD_MARKER) {
            Some(stripped) => stripped.to_string(),
            None => field,
        })
        .collect()
}
