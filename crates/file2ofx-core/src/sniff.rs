//! Encoding and layout detection from a byte sample.

use std::{fs::File, io::Read, ops::Range, path::Path};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};
use tracing::debug;

use crate::error::{ConvertError, ConvertResult};

/// Bytes read from the top of the file for sniffing.
pub const SAMPLE_SIZE: usize = 64 * 1024;

/// Records inspected per delimiter candidate.
pub const SNIFF_RECORDS: usize = 50;

/// Delimiter candidates in preference order.
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Bytes inspected by the BOM-less UTF-16 heuristic.
const NUL_WINDOW: usize = 1024;

/// How fields are separated in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Fields split by a delimiter byte, with CSV quoting.
    Delimited {
        /// Separator byte.
        delimiter: u8,
    },
    /// Fields at fixed character positions.
    FixedWidth {
        /// Character ranges per column; the last one runs to end of line.
        columns: Vec<Range<usize>>,
    },
}

impl Layout {
    /// Human-readable name for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Delimited { delimiter: b'\t' } => "delimited (tab)".to_string(),
            Self::Delimited { delimiter } => format!("delimited ('{}')", *delimiter as char),
            Self::FixedWidth { columns } => format!("fixed-width ({} columns)", columns.len()),
        }
    }
}

/// Decoded head of the source file.
#[derive(Debug, Clone)]
pub struct SourceSample {
    /// Encoding the whole file will be decoded with.
    pub encoding: &'static Encoding,
    /// Whether the encoding is the Windows-1252 fallback.
    pub encoding_fallback: bool,
    /// Decoded text, cut at the last complete line when the file is longer
    /// than the sample.
    pub text: String,
}

impl SourceSample {
    /// Reads and decodes the first [`SAMPLE_SIZE`] bytes of `path`.
    ///
    /// # Errors
    ///
    /// I/O failures, or an unknown encoding label.
    pub fn read(path: &Path, encoding_label: Option<&str>) -> ConvertResult<Self> {
        let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
        let mut bytes = Vec::with_capacity(SAMPLE_SIZE + 1);
        file.take(SAMPLE_SIZE as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| ConvertError::io(path, e))?;

        let truncated = bytes.len() > SAMPLE_SIZE;
        bytes.truncate(SAMPLE_SIZE);
        Self::from_bytes(&bytes, truncated, encoding_label)
    }

    /// Decodes an in-memory sample. `truncated` marks that the source
    /// continues past `bytes`.
    ///
    /// # Errors
    ///
    /// [`ConvertError::UnresolvedFormat`] for an unknown encoding label.
    pub fn from_bytes(
        bytes: &[u8],
        truncated: bool,
        encoding_label: Option<&str>,
    ) -> ConvertResult<Self> {
        let (encoding, encoding_fallback) = detect_encoding(bytes, truncated, encoding_label)?;
        let (decoded, _) = encoding.decode_with_bom_removal(bytes);
        let mut text = decoded.into_owned();

        if truncated {
            match text.rfind('\n') {
                Some(end) => text.truncate(end + 1),
                None => text.clear(),
            }
        }

        debug!(encoding = encoding.name(), chars = text.len(), truncated, "sampled source");
        Ok(Self { encoding, encoding_fallback, text })
    }

    /// Non-blank sample lines, without line terminators.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().filter(|line| !line.trim().is_empty())
    }

    /// Detects the sample's layout.
    #[must_use]
    pub fn layout(&self) -> Layout {
        sniff_layout(&self.text)
    }
}

/// Picks the encoding for a sample.
///
/// Order: explicit label, BOM, BOM-less UTF-16, valid UTF-8, then
/// Windows-1252 (reported as a fallback).
///
/// # Errors
///
/// [`ConvertError::UnresolvedFormat`] for a label `encoding_rs` does not know.
pub fn detect_encoding(
    bytes: &[u8],
    truncated: bool,
    label: Option<&str>,
) -> ConvertResult<(&'static Encoding, bool)> {
    if let Some(label) = label {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ConvertError::unresolved(format!("unknown encoding '{label}'")))?;
        return Ok((encoding, false));
    }

    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Ok((encoding, false));
    }

    if let Some(encoding) = utf16_without_bom(bytes) {
        return Ok((encoding, false));
    }

    let valid = Encoding::utf8_valid_up_to(bytes);
    let cut_tail = truncated && bytes.len() - valid < 4;
    if valid == bytes.len() || cut_tail {
        return Ok((UTF_8, false));
    }

    Ok((WINDOWS_1252, true))
}

/// Text with NULs in every other byte is UTF-16.
fn utf16_without_bom(bytes: &[u8]) -> Option<&'static Encoding> {
    let window = &bytes[..bytes.len().min(NUL_WINDOW) & !1];
    if window.len() < 4 {
        return None;
    }
    let pairs = window.len() / 2;
    let even_nuls = window.iter().step_by(2).filter(|b| **b == 0).count();
    let odd_nuls = window.iter().skip(1).step_by(2).filter(|b| **b == 0).count();

    if odd_nuls * 10 >= pairs * 9 && even_nuls * 10 < pairs {
        Some(UTF_16LE)
    } else if even_nuls * 10 >= pairs * 9 && odd_nuls * 10 < pairs {
        Some(UTF_16BE)
    } else {
        None
    }
}

/// Detects delimiter or fixed-width layout.
///
/// A delimiter is accepted when its modal field count is at least 2 and a
/// strict majority of the first [`SNIFF_RECORDS`] records share it.
#[must_use]
pub fn sniff_layout(text: &str) -> Layout {
    let mut best: Option<(u8, usize, usize)> = None;

    for delimiter in DELIMITER_CANDIDATES {
        let Some((consistent, fields)) = delimiter_consistency(text, delimiter) else {
            continue;
        };
        debug!(
            delimiter = %(delimiter as char).escape_default(),
            consistent,
            fields,
            "delimiter candidate"
        );
        let better = match best {
            None => true,
            Some((_, c, f)) => consistent > c || (consistent == c && fields > f),
        };
        if better {
            best = Some((delimiter, consistent, fields));
        }
    }

    match best {
        Some((delimiter, ..)) => Layout::Delimited { delimiter },
        None => {
            let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            Layout::FixedWidth { columns: fixed_width_columns(&lines, None) }
        }
    }
}

/// Returns `(records sharing the modal count, modal count)` when accepted.
fn delimiter_consistency(text: &str, delimiter: u8) -> Option<(usize, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let counts: Vec<usize> = reader
        .records()
        .filter_map(Result::ok)
        .filter(|record| record.iter().any(|field| !field.trim().is_empty()))
        .take(SNIFF_RECORDS)
        .map(|record| record.len())
        .collect();
    if counts.is_empty() {
        return None;
    }

    let mut tally: Vec<(usize, usize)> = Vec::new();
    for count in &counts {
        match tally.iter_mut().find(|(c, _)| c == count) {
            Some((_, n)) => *n += 1,
            None => tally.push((*count, 1)),
        }
    }
    let (modal, shared) = tally
        .into_iter()
        .max_by(|(ca, na), (cb, nb)| na.cmp(nb).then(ca.cmp(cb)))?;

    (modal >= 2 && shared * 2 > counts.len()).then_some((shared, modal))
}

/// Column ranges from whitespace gaps shared by every line.
///
/// Positions are character offsets. A position is a gap when every line has
/// whitespace there or ends before it. With `expected` set, only the
/// `expected - 1` widest gaps (leftmost on ties) split columns, so single
/// spaces that happen to line up inside a text column are ignored. The last
/// column extends to end of line.
#[must_use]
pub fn fixed_width_columns(lines: &[&str], expected: Option<usize>) -> Vec<Range<usize>> {
    let rows: Vec<Vec<char>> = lines.iter().map(|l| l.trim_end().chars().collect()).collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let is_gap =
        |pos: usize| rows.iter().all(|row| row.get(pos).is_none_or(|c| c.is_whitespace()));

    let Some(first) = (0..width).find(|pos| !is_gap(*pos)) else {
        return Vec::new();
    };

    let mut gaps: Vec<Range<usize>> = Vec::new();
    let mut gap_start: Option<usize> = None;
    for pos in first..width {
        match (is_gap(pos), gap_start) {
            (true, None) => gap_start = Some(pos),
            (false, Some(s)) => {
                gaps.push(s..pos);
                gap_start = None;
            }
            _ => {}
        }
    }

    if let Some(k) = expected
        && k > 0
        && gaps.len() >= k
    {
        let mut widest = gaps.clone();
        widest.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));
        widest.truncate(k - 1);
        widest.sort_by_key(|g| g.start);
        gaps = widest;
    }

    let mut columns = Vec::with_capacity(gaps.len() + 1);
    let mut start = first;
    for gap in gaps {
        columns.push(start..gap.start);
        start = gap.end;
    }
    columns.push(start..usize::MAX);
    columns
}
