//! End-to-end conversion of one source file.
//!
//! The pipeline runs leaf-first: version check, sampling, layout, column
//! mapping (explicit or detected), streaming parse, assembly, rendering.
//! Every fatal problem surfaces as a [`ConvertError`] before the
//! destination is touched.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    decode::{DEFAULT_CHUNK_SIZE, DecodingReader},
    detect::{
        ProfileWeights, RoleAssignment, assign_roles, locate_header,
        profile::{HEADER_SEARCH_ROWS, MAX_PROFILE_VALUES},
        profile_columns,
    },
    diagnostics::Diagnostic,
    error::{ConvertError, ConvertResult},
    mapping::read_companion,
    ofx::{BalanceInfo, InstitutionConfig, OfxVersion, OutputDocument, assemble, write_document},
    reader::{ParsedRows, RawRecords, TransactionReader},
    sniff::{Layout, SourceSample, fixed_width_columns},
    transaction::TransactionRecord,
    writer::OutputFile,
};

/// Default ceiling on `skipped / rows`.
pub const DEFAULT_MAX_INVALID_RATIO: f64 = 0.25;

/// Declared input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Decide from the file extension.
    #[default]
    Auto,
    /// Delimited text; a fixed-width sniff result is rejected.
    Csv,
    /// Delimited or fixed-width text.
    Txt,
}

impl InputFormat {
    /// Resolves `Auto` from the extension of `source` (`.csv` or else `txt`).
    #[must_use]
    pub fn resolve(self, source: &Path) -> Self {
        match self {
            Self::Auto => {
                let is_csv = source
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
                if is_csv { Self::Csv } else { Self::Txt }
            }
            other => other,
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "csv" => Ok(Self::Csv),
            "txt" | "text" => Ok(Self::Txt),
            _ => Err(format!("unknown input format '{s}' (expected auto, csv or txt)")),
        }
    }
}

/// Everything a conversion needs besides the source path.
///
/// Built with `Default` and the `with_*` methods:
///
/// ```
/// use file2ofx_core::{convert::ConvertOptions, ofx::InstitutionConfig};
///
/// let options = ConvertOptions::default()
///     .with_institution(InstitutionConfig::new("123456789", "000111222"))
///     .with_version("2.2.0")
///     .with_max_invalid_ratio(0.1);
/// assert_eq!(options.version, "2.2.0");
/// ```
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Declared input format.
    pub format: InputFormat,
    /// Encoding label overriding detection.
    pub encoding: Option<String>,
    /// Destination path; required by [`convert`].
    pub output: Option<PathBuf>,
    /// Column names in column order; bypasses detection.
    pub columns: Option<Vec<String>>,
    /// Explicit role-to-column mapping; bypasses detection.
    pub column_indices: Option<RoleAssignment>,
    /// Institution and account.
    pub institution: InstitutionConfig,
    /// Closing balances.
    pub balance: Option<BalanceInfo>,
    /// Requested OFX version, e.g. `"102"` or `"2.2.0"`.
    pub version: String,
    /// Ceiling on the share of skipped rows (inclusive).
    pub max_invalid_ratio: f64,
    /// Read chunk size in bytes.
    pub chunk_size: usize,
    /// Detection weights and thresholds.
    pub profile_weights: ProfileWeights,
    /// Generation time; the local clock when `None`.
    pub generated_at: Option<NaiveDateTime>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: InputFormat::default(),
            encoding: None,
            output: None,
            columns: None,
            column_indices: None,
            institution: InstitutionConfig::default(),
            balance: None,
            version: OfxVersion::default().to_string(),
            max_invalid_ratio: DEFAULT_MAX_INVALID_RATIO,
            chunk_size: DEFAULT_CHUNK_SIZE,
            profile_weights: ProfileWeights::default(),
            generated_at: None,
        }
    }
}

impl ConvertOptions {
    /// Sets the input format.
    #[must_use]
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    /// Forces an encoding label.
    #[must_use]
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Supplies column names.
    #[must_use]
    pub fn with_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Supplies an explicit role assignment.
    #[must_use]
    pub fn with_column_indices(mut self, assignment: RoleAssignment) -> Self {
        self.column_indices = Some(assignment);
        self
    }

    /// Sets the institution.
    #[must_use]
    pub fn with_institution(mut self, institution: InstitutionConfig) -> Self {
        self.institution = institution;
        self
    }

    /// Sets closing balances.
    #[must_use]
    pub fn with_balance(mut self, balance: BalanceInfo) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Sets the requested OFX version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the skipped-row ceiling.
    #[must_use]
    pub fn with_max_invalid_ratio(mut self, ratio: f64) -> Self {
        self.max_invalid_ratio = ratio;
        self
    }

    /// Sets the read chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Sets detection weights.
    #[must_use]
    pub fn with_profile_weights(mut self, weights: ProfileWeights) -> Self {
        self.profile_weights = weights;
        self
    }

    /// Pins the generation time.
    #[must_use]
    pub fn with_generated_at(mut self, at: NaiveDateTime) -> Self {
        self.generated_at = Some(at);
        self
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Committed destination; `None` when rendered into a caller's writer.
    pub output: Option<PathBuf>,
    /// Records written, in input order.
    pub transactions: Vec<TransactionRecord>,
    /// Non-fatal findings.
    pub diagnostics: Vec<Diagnostic>,
}

impl Conversion {
    /// Skipped-row diagnostics only.
    pub fn skipped_rows(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_row_skipped())
    }
}

/// Converts `source` and commits the document to `options.output`.
///
/// # Errors
///
/// Any [`ConvertError`]; the destination is left untouched on failure.
pub fn convert(source: &Path, options: &ConvertOptions) -> ConvertResult<Conversion> {
    let path = options.output.as_deref().ok_or_else(|| ConvertError::OutputWriteFailed {
        path: PathBuf::new(),
        reason: "no output path given".to_string(),
        source: None,
    })?;

    let prepared = prepare(source, options)?;

    let mut out = OutputFile::create(path)?;
    write_document(&prepared.document, &mut out).map_err(|e| {
        ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            reason: "rendering failed".to_string(),
            source: Some(e),
        }
    })?;
    let output = out.commit()?;

    info!(output = %output.display(), transactions = prepared.records.len(), "wrote document");
    Ok(Conversion {
        output: Some(output),
        transactions: prepared.records,
        diagnostics: prepared.diagnostics,
    })
}

/// Runs the same pipeline but renders into `out` instead of a file.
///
/// `options.output` is ignored.
///
/// # Errors
///
/// Any [`ConvertError`]; [`ConvertError::Write`] when `out` fails.
pub fn convert_to_writer<W: Write>(
    source: &Path,
    options: &ConvertOptions,
    out: &mut W,
) -> ConvertResult<Conversion> {
    let prepared = prepare(source, options)?;
    write_document(&prepared.document, out).map_err(ConvertError::Write)?;
    Ok(Conversion {
        output: None,
        transactions: prepared.records,
        diagnostics: prepared.diagnostics,
    })
}

struct Prepared {
    document: OutputDocument,
    records: Vec<TransactionRecord>,
    diagnostics: Vec<Diagnostic>,
}

/// Where the column mapping comes from.
enum Mapping {
    Names(Vec<String>),
    Indices(RoleAssignment),
    Detect,
}

fn prepare(source: &Path, options: &ConvertOptions) -> ConvertResult<Prepared> {
    let version: OfxVersion = options.version.parse()?;
    let chunk_size = options.chunk_size.max(16);
    let mut diagnostics = Vec::new();
    info!(source = %source.display(), %version, "converting");

    let sample = SourceSample::read(source, options.encoding.as_deref())?;
    if sample.encoding_fallback {
        warn!(encoding = sample.encoding.name(), "input is not valid UTF-8");
        diagnostics.push(Diagnostic::EncodingFallback { encoding: sample.encoding.name() });
    }
    if sample.lines().next().is_none() {
        return Err(ConvertError::NoTransactions);
    }

    let format = options.format.resolve(source);
    let sniffed = sample.layout();
    // a companion mapping only describes fixed-width text
    let wants_companion =
        format == InputFormat::Txt && matches!(sniffed, Layout::FixedWidth { .. });
    let mapping = match (&options.columns, &options.column_indices) {
        (Some(names), _) => Mapping::Names(names.clone()),
        (None, Some(assignment)) => Mapping::Indices(assignment.clone()),
        (None, None) if wants_companion => match read_companion(source)? {
            Some(names) => {
                debug!(columns = ?names, "using companion column mapping");
                Mapping::Names(names)
            }
            None => Mapping::Detect,
        },
        (None, None) => Mapping::Detect,
    };

    let layout = resolve_layout(&sample, sniffed, format, &mapping)?;
    info!(encoding = sample.encoding.name(), layout = %layout.describe(), "resolved input format");

    let sampled: Vec<Vec<String>> = RawRecords::new(sample.text.as_bytes(), &layout, chunk_size)
        .take(HEADER_SEARCH_ROWS + MAX_PROFILE_VALUES)
        .map(|record| record.map(|r| r.fields))
        .collect::<ConvertResult<_>>()?;

    let (assignment, skip) = match mapping {
        Mapping::Names(names) => (RoleAssignment::from_names(&names).require_mandatory()?, 0),
        Mapping::Indices(assignment) => {
            let skip = locate_header(&sampled).map_or(0, |h| h + 1);
            (assignment.require_mandatory()?, skip)
        }
        Mapping::Detect => {
            let weights = &options.profile_weights;
            let header = locate_header(&sampled);
            let skip = header.map_or(0, |h| h + 1);
            if header.is_none() {
                diagnostics.push(Diagnostic::HeaderlessInput);
            }
            let labels = header.map(|h| sampled[h].as_slice());
            let rows = sampled.get(skip..).unwrap_or_default();
            let profiles = profile_columns(labels, rows, weights);
            let assignment = assign_roles(&profiles, weights).require_mandatory()?;
            diagnostics.extend(assignment.low_confidence(weights.confidence_threshold));
            (assignment, skip)
        }
    };
    for (role, slot) in assignment.iter() {
        info!(%role, column = slot.column, score = slot.score, "column role");
    }

    let file = File::open(source).map_err(|e| ConvertError::io(source, e))?;
    let decoded = DecodingReader::new(file, sample.encoding, chunk_size);
    let records = RawRecords::new(decoded, &layout, chunk_size);
    let rows = ParsedRows::collect(TransactionReader::new(records, assignment, skip))?
        .enforce(options.max_invalid_ratio)?;
    info!(parsed = rows.records.len(), skipped = rows.skipped.len(), "parsed rows");
    diagnostics.extend(rows.skipped.into_iter().map(Diagnostic::RowSkipped));

    let generated_at = options.generated_at.unwrap_or_else(|| Local::now().naive_local());
    let document = assemble(
        &rows.records,
        &options.institution,
        options.balance.as_ref(),
        version,
        generated_at,
    )?;

    Ok(Prepared { document, records: rows.records, diagnostics })
}

/// Sniffs the layout and checks it against the format and the mapping.
fn resolve_layout(
    sample: &SourceSample,
    sniffed: Layout,
    format: InputFormat,
    mapping: &Mapping,
) -> ConvertResult<Layout> {
    match sniffed {
        layout @ Layout::Delimited { .. } => Ok(layout),
        Layout::FixedWidth { .. } if format == InputFormat::Csv => Err(ConvertError::unresolved(
            "no consistent delimiter found in CSV input",
        )),
        Layout::FixedWidth { .. } => {
            let Mapping::Names(names) = mapping else {
                return Err(ConvertError::unresolved(
                    "fixed-width input needs column names (a .cols file or explicit columns)",
                ));
            };
            let lines: Vec<&str> = sample.lines().collect();
            let columns = fixed_width_columns(&lines, Some(names.len()));
            if columns.len() != names.len() {
                return Err(ConvertError::unresolved(format!(
                    "found {} fixed-width columns but the mapping names {}",
                    columns.len(),
                    names.len()
                )));
            }
            Ok(Layout::FixedWidth { columns })
        }
    }
}
