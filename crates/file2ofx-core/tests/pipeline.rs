//! Pipeline tests over real files on disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveDateTime};
use file2ofx_core::{
    detect::{ProfileWeights, assign_roles, locate_header, profile_columns},
    prelude::*,
    reader::RawRecords,
    sniff::SourceSample,
};
use quick_xml::{Reader, events::Event};
use rust_decimal::Decimal;
use tempfile::{TempDir, tempdir};

const SCENARIO: &str = "Date,Description,Amount,Type\n2024-01-15,\"Coffee Shop\",-4.50,DEBIT\n";

fn generated() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
}

fn options() -> ConvertOptions {
    ConvertOptions::default()
        .with_institution(InstitutionConfig::new("123456789", "000111222").with_org("Test Bank"))
        .with_generated_at(generated())
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn render(path: &Path, options: &ConvertOptions) -> (Conversion, String) {
    let mut out = Vec::new();
    let conversion = convert_to_writer(path, options, &mut out).unwrap();
    (conversion, String::from_utf8(out).unwrap())
}

/// `(tag, value)` pairs of every leaf, in document order, for either syntax.
fn leaves(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('<') && !line.starts_with("</") && !line.starts_with("<?"))
        .filter_map(|line| {
            let close = line.find('>')?;
            let tag = &line[1..close];
            let rest = &line[close + 1..];
            if rest.is_empty() {
                return None;
            }
            let value = rest.strip_suffix(&format!("</{tag}>")).unwrap_or(rest);
            Some((tag.to_string(), value.to_string()))
        })
        .collect()
}

// ==================== Scenario ====================

#[test]
fn test_scenario_roles() {
    let sample = SourceSample::from_bytes(SCENARIO.as_bytes(), false, None).unwrap();
    let layout = sample.layout();
    let records: Vec<Vec<String>> = RawRecords::new(sample.text.as_bytes(), &layout, 1024)
        .map(|r| r.unwrap().fields)
        .collect();

    let header = locate_header(&records).unwrap();
    assert_eq!(header, 0);
    let weights = ProfileWeights::default();
    let profiles = profile_columns(Some(records[0].as_slice()), &records[1..], &weights);
    let assignment = assign_roles(&profiles, &weights);

    for (role, column) in
        [(Role::Date, 0), (Role::Description, 1), (Role::Amount, 2), (Role::Type, 3)]
    {
        let slot = assignment.slot(role).unwrap();
        assert_eq!(slot.column, column, "{role}");
        assert!((slot.score - 1.0).abs() < 1e-9, "{role}: {}", slot.score);
    }
}

#[test]
fn test_scenario_legacy_output() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "scenario.csv", SCENARIO);

    let (conversion, text) = render(&path, &options());
    assert_eq!(conversion.transactions.len(), 1);
    let record = &conversion.transactions[0];
    assert_eq!(record.kind, TransactionType::Debit);
    assert_eq!(record.amount, Decimal::new(-450, 2));
    assert!(conversion.diagnostics.is_empty());

    assert!(text.starts_with("OFXHEADER:100\n"));
    assert!(text.contains("<DTPOSTED>20240115000000\n"));
    assert!(text.contains("<DTUSER>20240115000000\n"));
    assert!(text.contains("<DTPROFUP>20240201093000\n"));
    assert!(text.contains("<DTACCTUP>20240201093000\n"));
    assert!(text.contains("<TRNAMT>-4.50\n"));
    assert!(text.contains("<TRNTYPE>DEBIT\n"));
    assert!(text.contains("<NAME>Coffee Shop\n"));
}

// ==================== Properties ====================

#[test]
fn test_deterministic_output() {
    let dir = tempdir().unwrap();
    let path = write(
        &dir,
        "repeat.csv",
        "Date,Description,Amount\n2024-01-15,Coffee,-4.50\n2024-01-15,Coffee,-4.50\n",
    );
    let (_, first) = render(&path, &options());
    let (_, second) = render(&path, &options());
    assert_eq!(first, second);

    let fitids: Vec<_> = leaves(&first).into_iter().filter(|(tag, _)| tag == "FITID").collect();
    assert_eq!(fitids.len(), 2);
    assert_ne!(fitids[0], fitids[1]);
}

#[test]
fn test_skip_ceiling_is_inclusive() {
    let dir = tempdir().unwrap();
    let mut rows = String::from("Date,Description,Amount\n");
    for day in 1..=6 {
        rows.push_str(&format!("2024-03-{day:02},Shop,-1.00\n"));
    }
    let at_ceiling = format!("{rows}bad,Shop,-1.00\n2024-03-07,Shop,oops\n");
    let path = write(&dir, "ceiling.csv", &at_ceiling);

    // 2 of 8 skipped is exactly the 0.25 ceiling
    let (conversion, _) = render(&path, &options());
    assert_eq!(conversion.transactions.len(), 6);
    let lines: Vec<u64> = conversion
        .skipped_rows()
        .map(|d| match d {
            Diagnostic::RowSkipped(row) => row.line,
            other => panic!("unexpected diagnostic {other}"),
        })
        .collect();
    assert_eq!(lines, vec![8, 9]);

    let over = format!("{at_ceiling}2024-03-08,Shop,n/a\n");
    let path = write(&dir, "over.csv", &over);
    let mut out = Vec::new();
    let err = convert_to_writer(&path, &options(), &mut out).unwrap_err();
    match err {
        ConvertError::TooManyInvalidRows { skipped, total, .. } => {
            assert_eq!(skipped.len(), 3);
            assert_eq!(total, 9);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(out.is_empty());
}

#[test]
fn test_version_families_share_content() {
    let dir = tempdir().unwrap();
    let path = write(
        &dir,
        "both.csv",
        "Date,Description,Amount\n2024-01-15,AT&T <bill>,-80.00\n2024-01-20,Salary,2500\n",
    );

    let (_, legacy) = render(&path, &options().with_version("1.0.2"));
    let (_, modern) = render(&path, &options().with_version("220"));

    assert!(legacy.starts_with("OFXHEADER:100"));
    assert!(modern.starts_with("<?xml version=\"1.0\""));
    assert!(modern.contains("VERSION=\"220\""));
    assert_eq!(leaves(&legacy), leaves(&modern));
    assert!(leaves(&legacy).contains(&("NAME".to_string(), "AT&amp;T &lt;bill&gt;".to_string())));
}

#[test]
fn test_modern_output_is_well_formed() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "xml.csv", SCENARIO);
    let (_, text) = render(&path, &options().with_version("2.1.1"));

    let mut reader = Reader::from_str(&text);
    let mut open = Vec::new();
    let mut root_closed = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(start) => {
                assert!(!root_closed, "content after root");
                open.push(String::from_utf8(start.name().as_ref().to_vec()).unwrap());
            }
            Event::End(end) => {
                let name = String::from_utf8(end.name().as_ref().to_vec()).unwrap();
                assert_eq!(open.pop(), Some(name));
                root_closed = open.is_empty();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    assert!(open.is_empty());
    assert!(root_closed);
}

// ==================== Explicit mappings ====================

#[test]
fn test_fixed_width_with_companion_mapping() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "bank.txt", "2024-01-15      -4.50\n2024-01-16    -120.00\n");
    write(&dir, "bank.cols", "\"Date\",\"Amount\"\n");

    let (conversion, text) = render(&path, &options());
    assert!(conversion.diagnostics.is_empty(), "{:?}", conversion.diagnostics);
    let amounts: Vec<Decimal> = conversion.transactions.iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![Decimal::new(-450, 2), Decimal::new(-12000, 2)]);
    assert!(conversion.transactions.iter().all(|r| r.description.is_empty()));
    assert!(text.contains("<TRNAMT>-120.00"));
    assert!(!text.contains("<NAME>"));
}

#[test]
fn test_malformed_companion_mapping() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "bank.txt", "2024-01-15      -4.50\n");
    write(&dir, "bank.cols", "\n  \n");

    let mut out = Vec::new();
    let err = convert_to_writer(&path, &options(), &mut out).unwrap_err();
    assert!(matches!(err, ConvertError::MappingFile { .. }));
}

#[test]
fn test_commit_to_disk() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "scenario.csv", SCENARIO);
    let output = dir.path().join("scenario.ofx");

    let conversion = convert(&path, &options().with_output(&output).with_version("200")).unwrap();
    assert_eq!(conversion.output, Some(output.clone()));
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("<TRNAMT>-4.50</TRNAMT>"));
}
