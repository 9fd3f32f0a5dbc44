use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::inventory::is_inventory_header;

/// File discovery system for finding inventory snapshot files
pub struct FileDiscovery {
    recursive: bool,
}

impl FileDiscovery {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    /// Discover snapshot files from a mix of file and directory paths
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_file() {
                // Explicitly named files are taken as-is
                files.push(path.clone());
            } else if path.is_dir() {
                files.extend(self.discover_in_directory(path)?);
            } else {
                warn!("Skipping missing path: {}", path.display());
            }
        }

        // Remove duplicates while preserving order
        let mut seen = HashSet::new();
        files.retain(|path| seen.insert(path.clone()));

        debug!("Discovered {} snapshot files", files.len());
        Ok(files)
    }

    fn discover_in_directory(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if self.recursive {
            for entry in WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && self.is_snapshot_file(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            let entries = fs::read_dir(dir)
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

            for entry in entries {
                let entry = entry.with_context(|| {
                    format!("Failed to read directory entry in: {}", dir.display())
                })?;
                let path = entry.path();

                if path.is_file() && self.is_snapshot_file(&path) {
                    files.push(path);
                }
            }
            files.sort();
        }

        Ok(files)
    }

    fn is_snapshot_file(&self, path: &Path) -> bool {
        match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
            Some(ext) if ext == "csv" || ext == "tsv" => true,
            Some(ext) if ext == "txt" => self.has_inventory_header(path),
            Some(_) => false,
            None => self.has_inventory_header(path),
        }
    }

    fn has_inventory_header(&self, path: &Path) -> bool {
        let Ok(file) = fs::File::open(path) else {
            return false;
        };

        // Same blank-line skipping and column aliases as the parser
        BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .find(|line| !line.trim().is_empty())
            .is_some_and(|header| is_inventory_header(&header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_file_discovery() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir_path = temp_dir.path();

        let csv_path = dir_path.join("general.csv");
        let mut csv_file = File::create(&csv_path)?;
        writeln!(csv_file, "blood_type,units,percentage")?;
        writeln!(csv_file, "O-,4,12")?;

        let txt_path = dir_path.join("export.txt");
        let mut txt_file = File::create(&txt_path)?;
        writeln!(txt_file, "Blood Type\tUnits\tTarget")?;
        writeln!(txt_file, "A+\t10\t40")?;

        let invalid_path = dir_path.join("notes.txt");
        let mut invalid_file = File::create(&invalid_path)?;
        writeln!(invalid_file, "Remember to restock the freezer")?;

        let nested = dir_path.join("archive");
        fs::create_dir(&nested)?;
        let nested_path = nested.join("old.tsv");
        File::create(&nested_path)?;

        let discovery = FileDiscovery::new(false);
        let files = discovery.discover(&[dir_path.to_path_buf()])?;
        assert_eq!(files.len(), 2);
        assert!(files.contains(&csv_path));
        assert!(files.contains(&txt_path));
        assert!(!files.contains(&invalid_path));

        let recursive = FileDiscovery::new(true);
        let files = recursive.discover(&[dir_path.to_path_buf()])?;
        assert_eq!(files.len(), 3);
        assert!(files.contains(&nested_path));

        Ok(())
    }

    #[test]
    fn test_text_snapshots_follow_parser_aliases() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir_path = temp_dir.path();

        let stock_path = dir_path.join("stock.txt");
        let mut stock_file = File::create(&stock_path)?;
        writeln!(stock_file)?;
        writeln!(stock_file, "group,quantity,percent")?;
        writeln!(stock_file, "O-,3,12")?;

        // Looks like inventory but has no percentage or target column
        let partial_path = dir_path.join("partial.txt");
        let mut partial_file = File::create(&partial_path)?;
        writeln!(partial_file, "blood_type,units")?;
        writeln!(partial_file, "O-,3")?;

        let files = FileDiscovery::new(false).discover(&[dir_path.to_path_buf()])?;
        assert_eq!(files, vec![stock_path.clone()]);

        let snapshot = crate::inventory::InventoryParser::new().parse(&stock_path)?;
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].level.units_on_hand, 3);

        Ok(())
    }

    #[test]
    fn test_duplicates_removed_in_order() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let a = temp_dir.path().join("a.csv");
        let b = temp_dir.path().join("b.csv");
        File::create(&a)?;
        File::create(&b)?;

        let discovery = FileDiscovery::new(false);
        let files = discovery.discover(&[b.clone(), temp_dir.path().to_path_buf(), a.clone()])?;
        assert_eq!(files, vec![b, a]);

        Ok(())
    }
}
