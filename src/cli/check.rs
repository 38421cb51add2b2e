use crate::cli::info::{chunk_tree, InfoOptions};
use crate::error::{Result, ZerofileError};
use crate::params::ExtractionParameters;
use crate::zerofile::Zerofile;
use std::fmt;
use std::fs;
use std::path::Path;

/// Outcome of validating every payload in a Zerofile
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub params: ExtractionParameters,
    /// Chunks below the envelope, leading record and nested chunks included
    pub chunks: usize,
    /// Payloads that passed the geometry check
    pub valid_payloads: usize,
    /// One line per damaged payload or structural problem
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Format version: {}", self.params.format_version)?;
        writeln!(f, "Geometry: {} x {}", self.params.width, self.params.height)?;
        writeln!(f, "Pitch: {}", self.params.h_pitch)?;
        writeln!(f, "Chunks: {}", self.chunks)?;
        writeln!(f, "Valid payloads: {}", self.valid_payloads)?;
        if self.is_clean() {
            writeln!(f, "Status: OK")
        } else {
            writeln!(f, "Status: {} problem(s)", self.problems.len())?;
            for problem in &self.problems {
                writeln!(f, "  {}", problem)?;
            }
            Ok(())
        }
    }
}

/// Validate a Zerofile on disk
pub fn check_file(path: &Path) -> Result<CheckReport> {
    let data = fs::read(path)?;
    check_bytes(&data)
}

/// Validate an in-memory Zerofile.
///
/// Envelope and leading-record failures are returned as errors. Payload
/// problems are collected, skipping over chunks with a bad size, along with
/// any damage found inside nested containers.
pub fn check_bytes(data: &[u8]) -> Result<CheckReport> {
    let mut file = Zerofile::open(data)?;
    let params = *file.params();

    let mut valid_payloads = 0;
    let mut problems = Vec::new();
    for payload in file.payloads() {
        match payload {
            Ok(_) => valid_payloads += 1,
            Err(e @ ZerofileError::SizeMismatch { .. }) => problems.push(e.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "payload walk stopped");
                problems.push(e.to_string());
            }
        }
    }
    let tree_options = InfoOptions {
        rows: 0,
        ..Default::default()
    };
    let tree = chunk_tree(data, &tree_options)?;
    for error in tree.walk_errors() {
        if !problems.contains(&error) {
            problems.push(error);
        }
    }
    let chunks = tree.descendants();

    Ok(CheckReport {
        params,
        chunks,
        valid_payloads,
        problems,
    })
}
