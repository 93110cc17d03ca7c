//! CSV serialization of output records
//!
//! One row per record. Formant values go into wide `F<n>` columns, one per
//! requested formant; a row fills only the column of its own formant.

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::info;

use crate::formant::FormantIndex;
use crate::record::OutputRecord;
use crate::Result;

/// Columns that precede the per-formant value columns
pub const FIXED_COLUMNS: [&str; 7] = [
    "speaker",
    "phone",
    "preceding_phone",
    "following_phone",
    "point",
    "interval_start",
    "interval_end",
];

/// Requested formants in order of first appearance, duplicates dropped
fn formant_columns(formants: &[FormantIndex]) -> Vec<FormantIndex> {
    let mut columns: Vec<FormantIndex> = Vec::with_capacity(formants.len());
    for &formant in formants {
        if !columns.contains(&formant) {
            columns.push(formant);
        }
    }
    columns
}

/// Render a float so it always carries a decimal point (`1.0`, not `1`)
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Write a header and all records to `writer`
///
/// `None` fields (missing neighbours, missing values) become empty fields.
/// A row whose value is missing therefore has every `F<n>` column empty;
/// its formant is only recoverable from row order, which is formant-major
/// within each occurrence (see [`crate::extract_from_grid`]).
pub fn write_records<W: io::Write>(
    writer: W,
    records: &[OutputRecord],
    formants: &[FormantIndex],
) -> Result<()> {
    let columns = formant_columns(formants);
    let mut csv = csv::Writer::from_writer(writer);

    let header = FIXED_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain(columns.iter().map(|column| column.column_name()));
    csv.write_record(header)?;

    for record in records {
        let mut row = vec![
            record.speaker.clone(),
            record.phone.clone(),
            record.preceding_phone.clone().unwrap_or_default(),
            record.following_phone.clone().unwrap_or_default(),
            format_float(record.point),
            format_float(record.interval_start),
            format_float(record.interval_end),
        ];
        row.extend(columns.iter().map(|&column| match record.value {
            Some(value) if column == record.formant => format_float(value),
            _ => String::new(),
        }));
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write the records to it
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    records: &[OutputRecord],
    formants: &[FormantIndex],
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_records(io::BufWriter::new(file), records, formants)?;
    info!(path = %path.display(), rows = records.len(), "CSV written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(n: u8) -> FormantIndex {
        FormantIndex::new(n).unwrap()
    }

    fn record(formant: u8, value: Option<f64>) -> OutputRecord {
        OutputRecord {
            speaker: "spk1".to_string(),
            phone: "ae".to_string(),
            preceding_phone: Some("sil".to_string()),
            following_phone: None,
            point: 0.5,
            interval_start: 0.5,
            interval_end: 1.0,
            formant: index(formant),
            value,
        }
    }

    fn render(records: &[OutputRecord], formants: &[FormantIndex]) -> String {
        let mut buffer = Vec::new();
        write_records(&mut buffer, records, formants).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_header_only_when_empty() {
        let text = render(&[], &[index(1), index(2)]);
        assert_eq!(
            text,
            "speaker,phone,preceding_phone,following_phone,point,interval_start,interval_end,F1,F2\n"
        );
    }

    #[test]
    fn test_duplicate_formants_collapse_to_one_column() {
        let text = render(&[], &[index(2), index(1), index(2)]);
        assert!(text.trim_end().ends_with(",F2,F1"));
    }

    #[test]
    fn test_rows_fill_their_own_column() {
        let records = vec![record(1, Some(712.5)), record(2, Some(1650.0)), record(2, None)];
        let text = render(&records, &[index(1), index(2)]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "spk1,ae,sil,,0.5,0.5,1.0,712.5,");
        assert_eq!(lines[2], "spk1,ae,sil,,0.5,0.5,1.0,,1650.0");
        assert_eq!(lines[3], "spk1,ae,sil,,0.5,0.5,1.0,,");
    }

    #[test]
    fn test_whole_numbers_keep_a_decimal_point() {
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-3.0), "-3.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(717.78125), "717.78125");
    }

    #[test]
    fn test_labels_with_commas_are_quoted() {
        let mut odd = record(1, Some(500.0));
        odd.phone = "a,e".to_string();
        let text = render(&[odd], &[index(1)]);
        assert!(text.lines().nth(1).unwrap().starts_with("spk1,\"a,e\",sil"));
    }

    #[test]
    fn test_write_csv_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[record(1, Some(700.0))], &[index(1)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
