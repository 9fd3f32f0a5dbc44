use anyhow::{Context as _, Result};
use chrono::Local;
use csv::WriterBuilder;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::info;

use crate::analysis::AnalysisResults;
use crate::classification::Palette;
use crate::compatibility::CompatibilityTable;
use crate::types::*;

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Blood Inventory Report</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; background-color: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; background-color: white; padding: 30px;
                     border-radius: 10px; box-shadow: 0 0 10px rgba(0,0,0,0.1); }
        h1, h2 { color: #2c3e50; }
        table { width: 100%; border-collapse: collapse; margin: 20px 0; }
        th, td { border: 1px solid #ddd; padding: 10px; text-align: left; }
        th { background-color: #3498db; color: white; }
        .summary-box { background-color: #e8f4f8; padding: 20px; border-radius: 5px; margin: 20px 0; }
        .swatch { display: inline-block; width: 14px; height: 14px; border-radius: 3px; vertical-align: middle; }
        .compatible { background-color: #d4edda; text-align: center; }
        .incompatible { background-color: #f8f9fa; }
    </style>
</head>
<body>
<div class="container">
    <h1>Blood Inventory Report</h1>
    <p>Generated on: {{ generated_at }}</p>

    <div class="summary-box">
        <h2>Summary</h2>
        <p>{{ summary.critical }} critical, {{ summary.warning }} warning and {{ summary.healthy }} healthy rows;
           {{ summary.total_units }} units on hand.</p>
    </div>

    <div class="section">
        <h2>Alerts</h2>
        {% if alerts %}
        <table>
            <tr><th>Hospital</th><th>Blood Type</th><th>Severity</th><th>Units</th><th>% of Target</th><th>Substitutes</th></tr>
            {% for alert in alerts %}
            <tr>
                <td>{{ alert.hospital }}</td><td>{{ alert.blood_type }}</td>
                <td><span class="swatch" style="background-color: {{ alert.color }}"></span> {{ alert.tier }}</td>
                <td>{{ alert.units }}</td><td>{{ alert.percentage }}</td><td>{{ alert.substitutes }}</td>
            </tr>
            {% endfor %}
        </table>
        {% else %}
        <p>No alerts.</p>
        {% endif %}
    </div>

    <div class="section">
        <h2>Inventory</h2>
        {% if inventory %}
        <table>
            <tr><th>Hospital</th><th>Blood Type</th><th>Units</th><th>% of Target</th><th>Severity</th></tr>
            {% for row in inventory %}
            <tr>
                <td>{{ row.hospital }}</td><td>{{ row.blood_type }}</td><td>{{ row.units }}</td>
                <td>{{ row.percentage }}</td>
                <td><span class="swatch" style="background-color: {{ row.color }}"></span> {{ row.tier }}</td>
            </tr>
            {% endfor %}
        </table>
        {% else %}
        <p>No inventory rows.</p>
        {% endif %}
    </div>

    <div class="section">
        <h2>Compatibility Matrix</h2>
        <table>
            <tr><th>Donor / Recipient</th>{% for label in labels %}<th>{{ label }}</th>{% endfor %}</tr>
            {% for row in matrix %}
            <tr><th>{{ row.donor }}</th>{% for cell in row.cells %}{% if cell %}<td class="compatible">&#10003;</td>{% else %}<td class="incompatible"></td>{% endif %}{% endfor %}</tr>
            {% endfor %}
        </table>
    </div>
</div>
</body>
</html>
"#;

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Csv,
    Tsv,
    Json,
    All,
}

#[derive(Serialize)]
struct InventoryRow<'a> {
    hospital: &'a str,
    blood_type: &'static str,
    units: u32,
    percentage: String,
    tier: &'static str,
    color: &'a str,
}

#[derive(Serialize)]
struct AlertRow<'a> {
    hospital: &'a str,
    blood_type: &'static str,
    units: u32,
    percentage: String,
    tier: &'static str,
    color: &'a str,
    substitutes: String,
}

#[derive(Serialize)]
struct MatrixRow {
    donor: &'static str,
    cells: Vec<bool>,
}

/// Report generator for analysis results
pub struct ReportGenerator {
    output_dir: PathBuf,
    palette: Palette,
}

impl ReportGenerator {
    pub fn new(output_dir: &Path, palette: Palette) -> Result<Self> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir).with_context(|| {
                format!("Failed to create output directory: {}", output_dir.display())
            })?;
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            palette,
        })
    }

    /// Generate reports in specified format(s), returning the files written
    pub fn generate(
        &self,
        results: &AnalysisResults,
        format: ReportFormat,
    ) -> Result<Vec<PathBuf>> {
        let ts = self.report_stamp();
        let mut written = Vec::new();

        match format {
            ReportFormat::Html => written.push(self.generate_html_report(results, &ts)?),
            ReportFormat::Csv => {
                written.extend(self.generate_delimited_report(results, &ts, b',', "csv")?)
            }
            ReportFormat::Tsv => {
                written.extend(self.generate_delimited_report(results, &ts, b'\t', "tsv")?)
            }
            ReportFormat::Json => written.push(self.generate_json_report(results, &ts)?),
            ReportFormat::All => {
                written.push(self.generate_html_report(results, &ts)?);
                written.extend(self.generate_delimited_report(results, &ts, b',', "csv")?);
                written.extend(self.generate_delimited_report(results, &ts, b'\t', "tsv")?);
                written.push(self.generate_json_report(results, &ts)?);
            }
        }

        for path in &written {
            info!("Wrote report {}", path.display());
        }

        Ok(written)
    }

    /// Millisecond timestamp for report filenames, suffixed when a report with
    /// the same stamp already exists in the output directory
    fn report_stamp(&self) -> String {
        let base = Local::now().format("%Y-%m-%d_%H-%M-%S-%3f").to_string();

        let taken = |ts: &str| {
            [
                format!("report_{}.html", ts),
                format!("report_{}.json", ts),
                format!("inventory_{}.csv", ts),
                format!("inventory_{}.tsv", ts),
                format!("alerts_{}.csv", ts),
                format!("alerts_{}.tsv", ts),
            ]
            .iter()
            .any(|name| self.output_dir.join(name).exists())
        };

        let mut ts = base.clone();
        let mut n = 1;
        while taken(&ts) {
            ts = format!("{}_{}", base, n);
            n += 1;
        }
        ts
    }

    /// Render the HTML report without writing it
    pub fn render_html(&self, results: &AnalysisResults) -> Result<String> {
        let mut context = Context::new();
        context.insert(
            "generated_at",
            &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        context.insert("summary", &results.summary);

        let inventory: Vec<InventoryRow> = results
            .classified
            .iter()
            .map(|c| InventoryRow {
                hospital: &c.record.hospital,
                blood_type: c.record.blood_type.label(),
                units: c.record.level.units_on_hand,
                percentage: format!("{:.1}%", c.record.level.percentage_of_target),
                tier: c.tier.label(),
                color: self.palette.hex_for(c.tier),
            })
            .collect();
        context.insert("inventory", &inventory);

        let alerts: Vec<AlertRow> = results
            .alerts
            .iter()
            .map(|a| AlertRow {
                hospital: &a.hospital,
                blood_type: a.blood_type.label(),
                units: a.units_on_hand,
                percentage: format!("{:.1}%", a.percentage_of_target),
                tier: a.tier.label(),
                color: self.palette.hex_for(a.tier),
                substitutes: join_labels(&a.substitutes),
            })
            .collect();
        context.insert("alerts", &alerts);

        let labels: Vec<&str> = BloodType::ALL.iter().map(|t| t.label()).collect();
        let matrix: Vec<MatrixRow> = CompatibilityTable::global()
            .matrix()
            .iter()
            .zip(BloodType::ALL)
            .map(|(cells, donor)| MatrixRow {
                donor: donor.label(),
                cells: cells.to_vec(),
            })
            .collect();
        context.insert("labels", &labels);
        context.insert("matrix", &matrix);

        Tera::one_off(HTML_TEMPLATE, &context, true).context("Failed to render HTML report")
    }

    fn generate_html_report(&self, results: &AnalysisResults, timestamp: &str) -> Result<PathBuf> {
        let filename = self.output_dir.join(format!("report_{}.html", timestamp));

        let html_content = self.render_html(results)?;
        fs::write(&filename, html_content)
            .with_context(|| format!("Failed to write HTML report to {}", filename.display()))?;

        Ok(filename)
    }

    fn generate_delimited_report(
        &self,
        results: &AnalysisResults,
        timestamp: &str,
        delimiter: u8,
        extension: &str,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        let filename = self
            .output_dir
            .join(format!("inventory_{}.{}", timestamp, extension));
        let mut wtr = WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(&filename)
            .with_context(|| format!("Failed to create writer for {}", filename.display()))?;

        wtr.write_record([
            "hospital",
            "blood_type",
            "units_on_hand",
            "percentage_of_target",
            "tier",
            "color",
        ])?;

        for c in &results.classified {
            wtr.write_record([
                c.record.hospital.as_str(),
                c.record.blood_type.label(),
                c.record.level.units_on_hand.to_string().as_str(),
                format!("{:.2}", c.record.level.percentage_of_target).as_str(),
                c.tier.label(),
                c.color.token(),
            ])?;
        }

        wtr.flush()?;
        written.push(filename);

        if !results.alerts.is_empty() {
            let filename = self
                .output_dir
                .join(format!("alerts_{}.{}", timestamp, extension));
            let mut wtr = WriterBuilder::new()
                .delimiter(delimiter)
                .from_path(&filename)
                .with_context(|| format!("Failed to create writer for {}", filename.display()))?;

            wtr.write_record([
                "hospital",
                "blood_type",
                "tier",
                "units_on_hand",
                "percentage_of_target",
                "substitutes",
                "message",
            ])?;

            for alert in &results.alerts {
                wtr.write_record([
                    alert.hospital.as_str(),
                    alert.blood_type.label(),
                    alert.tier.label(),
                    alert.units_on_hand.to_string().as_str(),
                    format!("{:.2}", alert.percentage_of_target).as_str(),
                    join_labels(&alert.substitutes).as_str(),
                    alert.message.as_str(),
                ])?;
            }

            wtr.flush()?;
            written.push(filename);
        }

        Ok(written)
    }

    fn generate_json_report(&self, results: &AnalysisResults, timestamp: &str) -> Result<PathBuf> {
        let filename = self.output_dir.join(format!("report_{}.json", timestamp));

        let json = to_string_pretty(results).context("Failed to serialize results")?;
        fs::write(&filename, json)
            .with_context(|| format!("Failed to write JSON report to {}", filename.display()))?;

        Ok(filename)
    }
}

fn join_labels(types: &[BloodType]) -> String {
    types
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::InventoryAnalyzer;
    use tempfile::TempDir;

    fn sample_results() -> AnalysisResults {
        let records = vec![
            InventoryRecord::new("General", BloodType::BPos, InventoryLevel::new(2, 8.0)),
            InventoryRecord::new("General", BloodType::BNeg, InventoryLevel::new(30, 75.0)),
            InventoryRecord::new("<Annex>", BloodType::ONeg, InventoryLevel::new(9, 45.0)),
        ];
        InventoryAnalyzer::default().analyze(&records)
    }

    #[test]
    fn test_html_contains_matrix_and_palette() -> Result<()> {
        let palette = Palette {
            critical: "#abcdef".to_string(),
            ..Palette::default()
        };
        let temp_dir = TempDir::new()?;
        let generator = ReportGenerator::new(temp_dir.path(), palette)?;

        let html = generator.render_html(&sample_results())?;
        assert!(html.contains("Compatibility Matrix"));
        assert!(html.contains("<th>AB+</th>"));
        assert!(html.contains("#abcdef"));
        assert!(html.contains("&lt;Annex&gt;"));
        assert_eq!(html.matches("class=\"compatible\"").count(), 27);

        Ok(())
    }

    #[test]
    fn test_all_formats_written() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = ReportGenerator::new(&temp_dir.path().join("nested"), Palette::default())?;

        let written = generator.generate(&sample_results(), ReportFormat::All)?;
        // html + (inventory, alerts) x 2 + json
        assert_eq!(written.len(), 6);
        for path in &written {
            assert!(path.exists(), "{}", path.display());
        }

        let csv_path = written
            .iter()
            .find(|p| {
                p.to_string_lossy().contains("inventory_") && p.extension().unwrap() == "csv"
            })
            .unwrap();
        let csv = fs::read_to_string(csv_path)?;
        assert!(csv.starts_with("hospital,blood_type,units_on_hand"));
        assert!(csv.contains("General,B+,2,8.00,Critical,red"));

        let json_path = written.iter().find(|p| p.extension().unwrap() == "json").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(json_path)?)?;
        assert_eq!(parsed["summary"]["critical"], 1);
        assert_eq!(parsed["alerts"][0]["substitutes"][0], "B-");

        Ok(())
    }

    #[test]
    fn test_no_alert_file_without_alerts() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = ReportGenerator::new(temp_dir.path(), Palette::default())?;

        let written = generator.generate(&AnalysisResults::new(), ReportFormat::Tsv)?;
        assert_eq!(written.len(), 1);
        assert!(written[0].to_string_lossy().contains("inventory_"));

        Ok(())
    }

    #[test]
    fn test_repeated_runs_do_not_overwrite() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = ReportGenerator::new(temp_dir.path(), Palette::default())?;

        let first = generator.generate(&sample_results(), ReportFormat::All)?;
        let second = generator.generate(&sample_results(), ReportFormat::All)?;

        for path in &second {
            assert!(!first.contains(path), "{}", path.display());
        }
        assert_eq!(fs::read_dir(temp_dir.path())?.count(), 12);

        let name = first[0].file_name().unwrap().to_string_lossy().to_string();
        let stamp = name.trim_start_matches("report_").trim_end_matches(".html");
        // YYYY-MM-DD_HH-MM-SS-mmm
        assert_eq!(stamp.len(), 23, "{}", name);

        Ok(())
    }
}
