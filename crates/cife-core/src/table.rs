//! Table I/O: JSON-lines and CSV in, JSON-lines out
//!
//! Tables are read fully into memory. Row order is preserved everywhere.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{CifeError, Result};
use crate::row::RowMap;

/// Extension of the per-model result files ranking and filtering operate on
pub const TABLE_EXTENSION: &str = "jsonl";

/// An in-memory table and the file it came from
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub path: PathBuf,
    pub rows: Vec<RowMap>,
}

impl Table {
    /// Read a `.jsonl` (or `.ndjson`) or `.csv` file
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CifeError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let rows = match extension.as_str() {
            "jsonl" | "ndjson" => read_jsonl(path)?,
            "csv" => read_csv(path)?,
            other => {
                return Err(CifeError::unsupported(
                    "table format",
                    format!("{:?} ({})", other, path.display()),
                    "jsonl, ndjson, csv",
                ))
            }
        };

        tracing::debug!(path = %path.display(), rows = rows.len(), "read_table");
        Ok(Table {
            path: path.to_path_buf(),
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// File name without extension, used to name derived outputs
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string())
    }

    /// Fail with a data error when no row carries `column`.
    ///
    /// An empty table has no columns to check and passes.
    pub fn require_column(&self, column: &str) -> Result<()> {
        if self.rows.is_empty() || self.rows.iter().any(|row| row.contains_key(column)) {
            Ok(())
        } else {
            Err(CifeError::missing_column(column, &self.path))
        }
    }
}

fn read_jsonl(path: &Path) -> Result<Vec<RowMap>> {
    let file = File::open(path).map_err(|e| CifeError::io_operation("open", path.display(), e))?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |reason: String| CifeError::MalformedTable {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        };
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(map)) => rows.push(map),
            Ok(other) => {
                return Err(malformed(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )))
            }
            Err(e) => return Err(malformed(e.to_string())),
        }
    }

    Ok(rows)
}

fn read_csv(path: &Path) -> Result<Vec<RowMap>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: RowMap = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (header.to_string(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write rows as JSON lines, creating parent directories
pub fn write_jsonl(path: &Path, rows: &[RowMap]) -> Result<()> {
    ensure_parent(path)?;
    let file =
        File::create(path).map_err(|e| CifeError::io_operation("create", path.display(), e))?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "write_jsonl");
    Ok(())
}

/// Append one summary record as a single line
pub fn append_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    ensure_parent(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CifeError::io_operation("open", path.display(), e))?;
    let line = serde_json::to_string(summary)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| CifeError::io_operation("create directory", parent.display(), e))?;
        }
    }
    Ok(())
}

/// List the `.jsonl` files directly inside `dir`, sorted by path
pub fn list_tables(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CifeError::InputNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == TABLE_EXTENSION)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Decode a cell that may hold a list or object serialized as text.
///
/// Strings are tried as JSON first, then as a Python literal (`True`,
/// `False`, `None`, single-quoted strings). Anything that does not decode to
/// a list or object is returned unchanged.
pub fn decode_embedded(value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    let trimmed = text.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return value.clone();
    }

    serde_json::from_str::<Value>(trimmed)
        .ok()
        .or_else(|| {
            let rewritten = python_literal_to_json(trimmed)?;
            serde_json::from_str::<Value>(&rewritten).ok()
        })
        .filter(|decoded| decoded.is_array() || decoded.is_object())
        .unwrap_or_else(|| value.clone())
}

/// Rewrite a Python literal into JSON text. Returns `None` on an
/// unterminated string.
fn python_literal_to_json(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let quote = c;
                let mut literal = String::new();
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            let escaped = chars.next()?;
                            match escaped {
                                '\'' => literal.push('\''),
                                '"' => literal.push('"'),
                                'n' => literal.push('\n'),
                                't' => literal.push('\t'),
                                'r' => literal.push('\r'),
                                '\\' => literal.push('\\'),
                                other => {
                                    literal.push('\\');
                                    literal.push(other);
                                }
                            }
                        }
                        q if q == quote => {
                            closed = true;
                            break;
                        }
                        other => literal.push(other),
                    }
                }
                if !closed {
                    return None;
                }
                out.push_str(&Value::String(literal).to_string());
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    other => out.push_str(other),
                }
            }
            other => out.push(other),
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_read_jsonl_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        fs::write(&path, "{\"id\": 1}\n\n{\"id\": 2}\n").unwrap();

        let table = Table::read(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1]["id"], json!(2));
        assert_eq!(table.stem(), "a");
    }

    #[test]
    fn test_read_jsonl_reports_line_of_non_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"id\": 1}\n[1, 2]\n").unwrap();

        let err = Table::read(&path).unwrap_err();
        match err {
            CifeError::MalformedTable { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_missing_file_is_data_error() {
        let dir = tempdir().unwrap();
        let err = Table::read(&dir.path().join("nope.jsonl")).unwrap_err();
        assert!(matches!(err, CifeError::InputNotFound { .. }));
    }

    #[test]
    fn test_read_csv_empty_cell_is_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "id,dataset,flags\n1,,\"[1, 0]\"\n").unwrap();

        let table = Table::read(&path).unwrap();
        assert_eq!(table.rows[0]["id"], json!("1"));
        assert_eq!(table.rows[0]["dataset"], Value::Null);
        assert_eq!(decode_embedded(&table.rows[0]["flags"]), json!([1, 0]));
    }

    #[test]
    fn test_require_column() {
        let mut row = RowMap::new();
        row.insert("id".into(), json!("x"));
        let table = Table {
            path: PathBuf::from("t.jsonl"),
            rows: vec![row],
        };
        assert!(table.require_column("id").is_ok());
        assert!(matches!(
            table.require_column("dataset"),
            Err(CifeError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_write_then_append_summary() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested/out.jsonl");
        let mut row = RowMap::new();
        row.insert("id".into(), json!("r1"));
        write_jsonl(&out, &[row]).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "{\"id\":\"r1\"}\n");

        let summary = dir.path().join("summary.jsonl");
        append_summary(&summary, &json!({"run": 1})).unwrap();
        append_summary(&summary, &json!({"run": 2})).unwrap();
        assert_eq!(fs::read_to_string(&summary).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_list_tables_sorted_jsonl_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.jsonl"), "").unwrap();
        fs::write(dir.path().join("a.jsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let names: Vec<String> = list_tables(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.jsonl"]);
    }

    #[test]
    fn test_decode_embedded_python_literal() {
        let cell = json!("[{'type': 'Style', 'ok': True, 'note': None, 'q': 'it\\'s'}]");
        assert_eq!(
            decode_embedded(&cell),
            json!([{"type": "Style", "ok": true, "note": null, "q": "it's"}])
        );
    }

    #[test]
    fn test_decode_embedded_leaves_plain_text() {
        assert_eq!(decode_embedded(&json!("hello")), json!("hello"));
        assert_eq!(decode_embedded(&json!("[unclosed")), json!("[unclosed"));
        assert_eq!(decode_embedded(&json!([true])), json!([true]));
    }
}
