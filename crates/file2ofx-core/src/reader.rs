//! Streaming row reader.
//!
//! [`RawRecords`] splits decoded text into records according to a
//! [`Layout`]; [`TransactionReader`] turns data records into
//! [`TransactionRecord`]s, reporting rows it has to drop instead of failing.
//! Both are iterators that hold only one chunk of input at a time.

use std::{
    io::{BufRead, BufReader, Read},
    ops::Range,
};

use rust_decimal::Decimal;
use tracing::warn;

use crate::{
    detect::{Role, RoleAssignment},
    diagnostics::RowSkipped,
    error::{ConvertError, ConvertResult},
    fields::{FieldError, parse_amount, parse_date},
    sniff::Layout,
    transaction::{TransactionRecord, TransactionType},
};

/// One split input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line the record starts on.
    pub line: u64,
    /// Trimmed field values.
    pub fields: Vec<String>,
}

impl RawRecord {
    /// Whether every field is empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.trim().is_empty())
    }

    fn field(&self, role: Role, assignment: &RoleAssignment) -> Option<Result<&str, FieldError>> {
        let column = assignment.column(role)?;
        Some(
            self.fields
                .get(column)
                .map(String::as_str)
                .ok_or(FieldError::MissingColumn { role: role.as_str(), column }),
        )
    }
}

enum Splitter<R> {
    Delimited { reader: csv::Reader<R>, record: csv::StringRecord },
    Fixed { reader: BufReader<R>, columns: Vec<Range<usize>>, line: u64, buf: String },
}

/// Iterator over the non-blank records of a decoded stream.
pub struct RawRecords<R> {
    splitter: Splitter<R>,
    finished: bool,
}

impl<R: Read> RawRecords<R> {
    /// Splits `reader` per `layout`, buffering `chunk_size` bytes at a time.
    pub fn new(reader: R, layout: &Layout, chunk_size: usize) -> Self {
        let splitter = match layout {
            Layout::Delimited { delimiter } => Splitter::Delimited {
                reader: csv::ReaderBuilder::new()
                    .delimiter(*delimiter)
                    .has_headers(false)
                    .flexible(true)
                    .trim(csv::Trim::All)
                    .buffer_capacity(chunk_size)
                    .from_reader(reader),
                record: csv::StringRecord::new(),
            },
            Layout::FixedWidth { columns } => Splitter::Fixed {
                reader: BufReader::with_capacity(chunk_size, reader),
                columns: columns.clone(),
                line: 0,
                buf: String::new(),
            },
        };
        Self { splitter, finished: false }
    }

    fn read_next(&mut self) -> ConvertResult<Option<RawRecord>> {
        match &mut self.splitter {
            Splitter::Delimited { reader, record } => {
                if !reader.read_record(record)? {
                    return Ok(None);
                }
                let line = record.position().map_or(0, csv::Position::line);
                Ok(Some(RawRecord { line, fields: record.iter().map(str::to_string).collect() }))
            }
            Splitter::Fixed { reader, columns, line, buf } => {
                buf.clear();
                if reader.read_line(buf)? == 0 {
                    return Ok(None);
                }
                *line += 1;
                let text = buf.trim_end_matches(['\r', '\n']);
                Ok(Some(RawRecord { line: *line, fields: slice_columns(text, columns) }))
            }
        }
    }
}

impl<R: Read> Iterator for RawRecords<R> {
    type Item = ConvertResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.read_next() {
                Ok(Some(record)) if record.is_blank() => continue,
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => self.finished = true,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Cuts a line at character ranges, trimming each field.
fn slice_columns(line: &str, columns: &[Range<usize>]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    columns
        .iter()
        .map(|range| {
            let start = range.start.min(chars.len());
            let end = range.end.min(chars.len());
            chars[start..end].iter().collect::<String>().trim().to_string()
        })
        .collect()
}

/// Outcome of one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    /// Row parsed.
    Record(TransactionRecord),
    /// Row dropped.
    Skipped(RowSkipped),
}

/// Parses one record with the given assignment.
///
/// # Errors
///
/// The first field that fails: missing column, bad date or bad amount.
pub fn parse_row(
    record: &RawRecord,
    assignment: &RoleAssignment,
) -> Result<TransactionRecord, FieldError> {
    let posted = match record.field(Role::Date, assignment) {
        Some(value) => parse_date(value?)?,
        None => return Err(FieldError::MissingColumn { role: Role::Date.as_str(), column: 0 }),
    };
    let amount = if assignment.has_split_amount() {
        split_amount(record, assignment)?
    } else {
        match record.field(Role::Amount, assignment) {
            Some(value) => parse_amount(value?)?,
            None => {
                return Err(FieldError::MissingColumn { role: Role::Amount.as_str(), column: 0 });
            }
        }
    };
    let description = record
        .field(Role::Description, assignment)
        .and_then(Result::ok)
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let type_word = record.field(Role::Type, assignment).and_then(Result::ok);

    Ok(TransactionRecord {
        line: record.line,
        posted,
        amount,
        description,
        kind: TransactionType::resolve(type_word, &amount),
    })
}

/// Signed amount of a debit/credit pair: `|credit| - |debit|`.
///
/// A blank cell on one side counts as zero; both blank is an error.
fn split_amount(record: &RawRecord, assignment: &RoleAssignment) -> Result<Decimal, FieldError> {
    let side = |role: Role| -> Result<Option<Decimal>, FieldError> {
        match record.field(role, assignment) {
            None => Ok(None),
            Some(value) => {
                let value = value?;
                if value.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(parse_amount(value)?.abs()))
                }
            }
        }
    };
    match (side(Role::Debit)?, side(Role::Credit)?) {
        (None, None) => Err(FieldError::NoSplitAmount),
        (debit, credit) => Ok(credit.unwrap_or_default() - debit.unwrap_or_default()),
    }
}

/// Streaming transaction reader.
///
/// Skips the first `skip` records (preamble and header), then yields one
/// [`RowEvent`] per data record. Stops after the first I/O or CSV error.
pub struct TransactionReader<R> {
    records: RawRecords<R>,
    assignment: RoleAssignment,
    skip: usize,
    /// Data rows seen so far, skipped ones included.
    rows_seen: usize,
    /// Rows parsed successfully.
    records_read: usize,
    finished: bool,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a reader over split records.
    pub fn new(records: RawRecords<R>, assignment: RoleAssignment, skip: usize) -> Self {
        Self { records, assignment, skip, rows_seen: 0, records_read: 0, finished: false }
    }

    /// Number of rows parsed successfully.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Number of data rows seen, including skipped ones.
    #[must_use]
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }
}

impl<R: Read> Iterator for TransactionReader<R> {
    type Item = ConvertResult<RowEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while self.skip > 0 {
            self.skip -= 1;
            match self.records.next() {
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }

        match self.records.next() {
            Some(Ok(record)) => {
                self.rows_seen += 1;
                match parse_row(&record, &self.assignment) {
                    Ok(tx) => {
                        self.records_read += 1;
                        Some(Ok(RowEvent::Record(tx)))
                    }
                    Err(e) => {
                        warn!(line = record.line, error = %e, "skipping row");
                        Some(Ok(RowEvent::Skipped(RowSkipped {
                            line: record.line,
                            reason: e.to_string(),
                        })))
                    }
                }
            }
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

/// Every row of a source, split into parsed and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRows {
    /// Valid rows in input order.
    pub records: Vec<TransactionRecord>,
    /// Dropped rows in input order.
    pub skipped: Vec<RowSkipped>,
    /// Data rows seen (valid + skipped).
    pub total: usize,
}

impl ParsedRows {
    /// Drains a reader.
    ///
    /// # Errors
    ///
    /// I/O and CSV errors from the underlying stream.
    pub fn collect<R: Read>(reader: TransactionReader<R>) -> ConvertResult<Self> {
        let mut rows = Self::default();
        for event in reader {
            match event? {
                RowEvent::Record(record) => rows.records.push(record),
                RowEvent::Skipped(skipped) => rows.skipped.push(skipped),
            }
            rows.total += 1;
        }
        Ok(rows)
    }

    /// Applies the skip ceiling (inclusive) and rejects empty results.
    ///
    /// # Errors
    ///
    /// [`ConvertError::TooManyInvalidRows`] when `skipped / total > ceiling`,
    /// [`ConvertError::NoTransactions`] when nothing parsed.
    pub fn enforce(self, ceiling: f64) -> ConvertResult<Self> {
        if self.total > 0 && self.skipped.len() as f64 / self.total as f64 > ceiling {
            return Err(ConvertError::TooManyInvalidRows {
                skipped: self.skipped,
                total: self.total,
                ceiling,
            });
        }
        if self.records.is_empty() {
            return Err(ConvertError::NoTransactions);
        }
        Ok(self)
    }
}
