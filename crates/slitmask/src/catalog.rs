pub mod reader;
pub mod writer;

pub use reader::{CatalogOptions, read_catalog, read_catalog_from_reader};
pub use writer::{
    CatalogHeader, format_record, record_fields, write_catalog, write_mask_catalog,
    write_mask_catalogs,
};

use crate::error::Result;
use csv::ReaderBuilder;
use log::debug;

/// Splits whitespace separated input into non-empty records.
/// Tabs and repeated blanks count as one separator, `#` starts a comment line.
/// Rows that are not valid UTF-8 are skipped.
pub(crate) fn whitespace_records(input: &[u8]) -> Result<Vec<Vec<String>>> {
    let normalized: Vec<u8> = input
        .iter()
        .map(|&b| if b == b'\t' { b' ' } else { b })
        .collect();
    let mut rdr = ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .from_reader(normalized.as_slice());

    let mut records = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let fields: Option<Vec<String>> = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(|field| std::str::from_utf8(field).ok().map(str::to_string))
            .collect();
        match fields {
            Some(fields) if !fields.is_empty() => records.push(fields),
            Some(_) => {}
            None => debug!(
                "Skipping line {} with invalid UTF-8",
                record.position().map_or(0, |pos| pos.line())
            ),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_records() {
        let text = "# comment\n1  2\t3\n\n   \n4 5\r\n";
        let records = whitespace_records(text.as_bytes()).unwrap();
        assert_eq!(records, vec![vec!["1", "2", "3"], vec!["4", "5"]]);
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let input = b"1 2\n# observer: Jos\xe9\nbad \xff row\n3 4\n";
        let records = whitespace_records(input).unwrap();
        assert_eq!(records, vec![vec!["1", "2"], vec!["3", "4"]]);
    }
}
