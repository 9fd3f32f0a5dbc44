use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::types::*;

/// Records parsed from one inventory snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub source: String,
    pub records: Vec<InventoryRecord>,
}

/// Snapshot columns the parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Hospital,
    BloodType,
    Units,
    Percentage,
    Target,
}

/// Match a header cell against the known column aliases (case-insensitive)
pub fn match_column(header: &str) -> Option<Column> {
    let header_lower = header.trim().trim_matches('"').trim().to_lowercase();

    let column = match header_lower.as_str() {
        "hospital" | "hospital_name" | "site" => Column::Hospital,
        "blood_type" | "bloodtype" | "blood type" | "type" | "group" => Column::BloodType,
        "units" | "units_on_hand" | "quantity" => Column::Units,
        "percentage" | "percent" | "percentage_of_target" => Column::Percentage,
        "target" | "target_units" => Column::Target,
        _ => return None,
    };

    Some(column)
}

/// Map header cells to column positions; the first occurrence of a column wins
fn column_mapping<'a, I>(headers: I) -> HashMap<Column, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut mapping = HashMap::new();
    for (i, header) in headers.into_iter().enumerate() {
        if let Some(column) = match_column(header) {
            mapping.entry(column).or_insert(i);
        }
    }
    mapping
}

fn check_required_columns(mapping: &HashMap<Column, usize>) -> Result<()> {
    if !mapping.contains_key(&Column::BloodType) || !mapping.contains_key(&Column::Units) {
        return Err(anyhow!("Required columns (blood_type, units) not found"));
    }
    if !mapping.contains_key(&Column::Percentage) && !mapping.contains_key(&Column::Target) {
        return Err(anyhow!("Either a percentage or a target column is required"));
    }
    Ok(())
}

/// Whether a header line carries every column the parser needs
pub fn is_inventory_header(line: &str) -> bool {
    let delimiter = char::from(detect_delimiter(line));
    check_required_columns(&column_mapping(line.split(delimiter))).is_ok()
}

/// Pick the delimiter that occurs most often in the header line
pub fn detect_delimiter(header: &str) -> u8 {
    [b'\t', b',', b';']
        .into_iter()
        .max_by_key(|&d| header.bytes().filter(|&b| b == d).count())
        .filter(|&d| header.as_bytes().contains(&d))
        .unwrap_or(b',')
}

/// Parser for delimited inventory snapshots (CSV/TSV)
pub struct InventoryParser;

impl InventoryParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<InventorySnapshot> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory file: {}", path.display()))?;

        let hospital = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        let records = self
            .parse_str(&contents, hospital)
            .with_context(|| format!("Failed to parse inventory file: {}", path.display()))?;

        debug!("Parsed {} rows from {}", records.len(), path.display());

        Ok(InventorySnapshot {
            source: path.to_string_lossy().to_string(),
            records,
        })
    }

    /// Parse snapshot text. `default_hospital` is used when the file has no hospital column.
    pub fn parse_str(
        &self,
        contents: &str,
        default_hospital: &str,
    ) -> Result<Vec<InventoryRecord>> {
        let header = contents
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| anyhow!("Inventory file is empty"))?;

        let mut reader = ReaderBuilder::new()
            .delimiter(detect_delimiter(header))
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(contents.as_bytes());

        let headers = reader.headers()?.clone();
        let column_mapping = column_mapping(headers.iter());
        check_required_columns(&column_mapping)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            if row.iter().all(|field| field.is_empty()) {
                continue;
            }

            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let record = self
                .parse_row(&row, &column_mapping, default_hospital)
                .with_context(|| format!("Invalid inventory row at line {}", line))?;
            records.push(record);
        }

        Ok(records)
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        column_mapping: &HashMap<Column, usize>,
        default_hospital: &str,
    ) -> Result<InventoryRecord> {
        let field = |column: Column| {
            column_mapping
                .get(&column)
                .and_then(|&idx| row.get(idx))
                .filter(|value| !value.is_empty())
        };

        let blood_type: BloodType = field(Column::BloodType)
            .ok_or_else(|| anyhow!("Missing blood type"))?
            .parse()?;

        let units_raw = field(Column::Units).ok_or_else(|| anyhow!("Missing units"))?;
        let units: u32 = units_raw
            .parse()
            .with_context(|| format!("Invalid units: {}", units_raw))?;

        let level = match (field(Column::Percentage), field(Column::Target)) {
            (Some(percentage), _) => {
                let percentage: f64 = percentage
                    .trim_end_matches('%')
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid percentage: {}", percentage))?;
                InventoryLevel::new(units, percentage)
            }
            (None, Some(target)) => {
                let target: u32 = target
                    .parse()
                    .with_context(|| format!("Invalid target: {}", target))?;
                InventoryLevel::from_target(units, target)
            }
            (None, None) => return Err(anyhow!("Row has neither percentage nor target")),
        };

        let hospital = field(Column::Hospital).unwrap_or(default_hospital);

        Ok(InventoryRecord::new(hospital, blood_type, level))
    }
}

impl Default for InventoryParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("hospital\tblood_type\tunits"), b'\t');
        assert_eq!(detect_delimiter("hospital,blood_type,units"), b',');
        assert_eq!(detect_delimiter("hospital;blood_type;units"), b';');
        assert_eq!(detect_delimiter("blood_type"), b',');
    }

    #[test]
    fn test_parse_csv_with_percentage() -> Result<()> {
        let contents = "hospital,blood_type,units,percentage\n\
                        General,O-,4,12.5\n\
                        General,AB+,30,85%\n";

        let records = InventoryParser::new().parse_str(contents, "fallback")?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hospital, "General");
        assert_eq!(records[0].blood_type, BloodType::ONeg);
        assert_eq!(records[0].level, InventoryLevel::new(4, 12.5));
        assert_eq!(records[1].level.percentage_of_target, 85.0);

        Ok(())
    }

    #[test]
    fn test_parse_tsv_with_target() -> Result<()> {
        let contents = "Blood Type\tUnits_On_Hand\tTarget_Units\n\
                        A+\t15\t60\n\
                        \n\
                        b neg\t0\t10\n";

        let records = InventoryParser::new().parse_str(contents, "St. Mary")?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hospital, "St. Mary");
        assert_eq!(records[0].level.percentage_of_target, 25.0);
        assert_eq!(records[1].blood_type, BloodType::BNeg);
        assert_eq!(records[1].level, InventoryLevel::new(0, 0.0));

        Ok(())
    }

    #[test]
    fn test_missing_columns() {
        let parser = InventoryParser::new();
        assert!(parser.parse_str("hospital,units,percentage\nX,1,2\n", "h").is_err());
        assert!(parser.parse_str("blood_type,units\nO+,1\n", "h").is_err());
        assert!(parser.parse_str("", "h").is_err());
    }

    #[test]
    fn test_header_check_agrees_with_parser() {
        let parser = InventoryParser::new();
        for header in [
            "group,quantity,percent",
            "Site;Type;Units;Target_Units",
            "\"Blood Type\"\tUnits_On_Hand\tPercentage_Of_Target",
        ] {
            assert!(is_inventory_header(header), "{}", header);
            let contents = format!("{}\n", header);
            assert!(parser.parse_str(&contents, "h").is_ok(), "{}", header);
        }

        for header in ["blood_type,units", "hospital,units,percentage", "meeting notes"] {
            assert!(!is_inventory_header(header), "{}", header);
        }
    }

    #[test]
    fn test_bad_row_reports_line() {
        let contents = "blood_type,units,percentage\nO+,3,50\nQ+,1,10\n";
        let err = InventoryParser::new().parse_str(contents, "h").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("line 3"), "{}", message);
        assert!(message.contains("Q+"), "{}", message);
    }

    #[test]
    fn test_parse_file_uses_stem_as_hospital() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("riverside.tsv");
        let mut file = fs::File::create(&path)?;
        writeln!(file, "blood_type\tunits\tpercentage")?;
        writeln!(file, "O+\t22\t55")?;

        let snapshot = InventoryParser::new().parse(&path)?;
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].hospital, "riverside");
        assert_eq!(snapshot.source, path.to_string_lossy());

        Ok(())
    }
}
