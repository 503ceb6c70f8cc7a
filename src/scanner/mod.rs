//! Paper scanner for discovering candidate files.
//!
//! This module walks the papers directory recursively and filters
//! candidates by extension, exclude list, and file size.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for paper scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["pdf", "txt"])
    pub extensions: Vec<String>,
    /// Directory names to exclude (e.g., ["drafts", "duplicates"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: usize,
    /// Maximum number of papers to scan
    pub max_papers: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["pdf", "txt"].into_iter().map(String::from).collect(),
            excludes: vec!["excluded", "duplicates", "drafts"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_file_size: 50 * 1024 * 1024,
            max_papers: None,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_papers: Some(config.max_papers),
        }
    }
}

/// A discovered paper file.
#[derive(Debug, Clone)]
pub struct ScannedPaper {
    /// Path relative to the papers root. Used as the record id.
    pub path: String,
    /// Absolute path for reading the file.
    pub absolute_path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Scanner for discovering papers under a root directory.
pub struct PaperScanner {
    config: ScanConfig,
    papers_root: PathBuf,
}

impl PaperScanner {
    /// Create a new paper scanner.
    pub fn new(papers_root: PathBuf, config: ScanConfig) -> Self {
        Self {
            config,
            papers_root,
        }
    }

    /// Scan for all matching papers.
    ///
    /// Entries are visited in file-name order so repeated runs produce
    /// the same batch order, which in turn keeps the ranking tie-break
    /// reproducible.
    pub fn scan(&self) -> Result<Vec<ScannedPaper>> {
        let mut papers = Vec::new();

        // depth 0 is the papers root itself; never filter it out
        let walker = WalkDir::new(&self.papers_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !self.is_excluded_name(e.file_name().to_string_lossy().as_ref())
            });

        for entry in walker {
            if let Some(max) = self.config.max_papers {
                if papers.len() >= max {
                    break;
                }
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.matches(path) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let rel_path = path.strip_prefix(&self.papers_root).unwrap_or(path);

            papers.push(ScannedPaper {
                path: rel_path.to_string_lossy().to_string(),
                absolute_path: path.to_path_buf(),
                size,
            });
        }

        Ok(papers)
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !self.config.extensions.contains(&ext) {
            return false;
        }

        if let Ok(metadata) = std::fs::metadata(path) {
            if metadata.len() > self.config.max_file_size as u64 {
                debug!("Skipping oversized file: {}", path.display());
                return false;
            }
        } else {
            return false;
        }

        true
    }

    /// Check if an entry name matches exclusion patterns.
    fn is_excluded_name(&self, name: &str) -> bool {
        // Hidden files and directories
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scanner_over(dir: &TempDir, config: ScanConfig) -> PaperScanner {
        PaperScanner::new(dir.path().to_path_buf(), config)
    }

    #[test]
    fn test_scan_finds_matching_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b_study.txt"), "text").unwrap();
        fs::write(dir.path().join("a_study.txt"), "text").unwrap();
        fs::write(dir.path().join("notes.rst"), "not a paper").unwrap();

        let papers = scanner_over(&dir, ScanConfig::default()).scan().unwrap();
        let names: Vec<&str> = papers.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(names, vec!["a_study.txt", "b_study.txt"]);
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("2023")).unwrap();
        fs::write(dir.path().join("2023").join("paper.txt"), "text").unwrap();

        let papers = scanner_over(&dir, ScanConfig::default()).scan().unwrap();
        assert_eq!(papers.len(), 1);
        assert!(papers[0].path.ends_with("paper.txt"));
    }

    #[test]
    fn test_scan_skips_excluded_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts").join("wip.txt"), "text").unwrap();
        fs::write(dir.path().join("final.txt"), "text").unwrap();

        let papers = scanner_over(&dir, ScanConfig::default()).scan().unwrap();
        let names: Vec<&str> = papers.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(names, vec!["final.txt"]);
    }

    #[test]
    fn test_scan_respects_max_papers() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("paper{i}.txt")), "text").unwrap();
        }

        let config = ScanConfig {
            max_papers: Some(2),
            ..ScanConfig::default()
        };
        let papers = scanner_over(&dir, config).scan().unwrap();
        assert_eq!(papers.len(), 2);
    }

    #[test]
    fn test_scan_skips_oversized_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(100)).unwrap();
        fs::write(dir.path().join("small.txt"), "x").unwrap();

        let config = ScanConfig {
            max_file_size: 10,
            ..ScanConfig::default()
        };
        let papers = scanner_over(&dir, config).scan().unwrap();
        let names: Vec<&str> = papers.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(names, vec!["small.txt"]);
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("SHOUTING.TXT"), "text").unwrap();

        let papers = scanner_over(&dir, ScanConfig::default()).scan().unwrap();
        assert_eq!(papers.len(), 1);
    }
}
