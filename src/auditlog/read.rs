use crate::auditlog::record::{AuditRecord, decode};
use crate::error::MalformedRecordError;
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// File name the log exporter writes, one per project directory.
pub const AUDIT_LOG_FILE_NAME: &str = "auditlog.json";

/// Lazily decodes newline-delimited audit records.
///
/// Yields `(line number, decode result)` for every non-blank line. Lines are
/// read as raw bytes, so invalid UTF-8 is a malformed record rather than an
/// I/O error. I/O errors end the iteration with an `Err` item.
pub struct AuditLogReader<R> {
    reader: R,
    buf: Vec<u8>,
    lineno: usize,
}

impl<R: BufRead> AuditLogReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            lineno: 0,
        }
    }
}

impl AuditLogReader<BufReader<File>> {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file =
            File::open(path).with_context(|| format!("open audit log {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for AuditLogReader<R> {
    type Item = std::io::Result<(usize, Result<AuditRecord, MalformedRecordError>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            self.lineno += 1;

            let line = self.buf.trim_ascii();
            if line.is_empty() {
                continue;
            }
            return Some(Ok((self.lineno, decode(line))));
        }
    }
}

/// Find every exported audit log file under `data_dir`, sorted by path.
pub fn find_audit_log_files(data_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = data_dir.join("**").join(AUDIT_LOG_FILE_NAME);
    let pattern = pattern
        .to_str()
        .with_context(|| format!("data dir is not valid UTF-8: {}", data_dir.display()))?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern {}", pattern))? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
