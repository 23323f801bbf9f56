//! JSONL persistence: one statement per line.
//!
//! Local repositories and the on-disk management store keep their committed
//! state in a single `statements.jsonl` file that is replaced atomically on
//! every commit.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::model::{Graph, Statement};

/// File name used inside a store directory.
pub const STATEMENTS_FILE: &str = "statements.jsonl";

/// Read statements from a JSONL reader.
pub fn read_statements(reader: impl BufRead) -> Result<Graph, JsonlError> {
    let mut graph = Graph::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JsonlError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let statement: Statement = serde_json::from_str(trimmed)
            .map_err(|e| JsonlError::Parse(line_no + 1, e.to_string()))?;
        graph.insert(statement);
    }
    Ok(graph)
}

/// Write statements to a JSONL writer.
pub fn write_statements(writer: &mut impl Write, graph: &Graph) -> Result<(), JsonlError> {
    for statement in graph {
        let line =
            serde_json::to_string(statement).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read statements from a JSONL file; a missing file is an empty graph.
pub fn read_statements_from_path(path: impl AsRef<Path>) -> Result<Graph, JsonlError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Graph::new());
    }
    let file = File::open(path).map_err(|e| JsonlError::Io(0, format!("{}: {e}", path.display())))?;
    read_statements(BufReader::new(file))
}

/// Replace a JSONL file through a temporary sibling and a rename.
pub fn write_statements_to_path(path: impl AsRef<Path>, graph: &Graph) -> Result<(), JsonlError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| JsonlError::Io(0, format!("{}: {e}", parent.display())))?;
        }
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), JsonlError> {
        let file = File::create(&tmp_path)
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        write_statements(&mut writer, graph)?;
        writer
            .flush()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        let file = writer
            .into_inner()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        JsonlError::Io(
            0,
            format!("{} -> {}: {e}", tmp_path.display(), path.display()),
        )
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), uuid::Uuid::new_v4().simple()));
    PathBuf::from(tmp)
}

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),
}
