//! In-memory copy of a target file, split into lines

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// A file's lines with their original endings kept aside
///
/// Lines are stored without terminators so patterns never see `\n`;
/// [`LineBuffer::to_text`] restores the exact original bytes for any line
/// that was not replaced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineBuffer {
    lines: Vec<String>,
    endings: Vec<&'static str>,
}

impl LineBuffer {
    pub fn parse(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut endings = Vec::new();
        for raw in text.split_inclusive('\n') {
            let (body, ending) = if let Some(body) = raw.strip_suffix("\r\n") {
                (body, "\r\n")
            } else if let Some(body) = raw.strip_suffix('\n') {
                (body, "\n")
            } else {
                (raw, "")
            };
            lines.push(body.to_string());
            endings.push(ending);
        }
        Self { lines, endings }
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Replace a line's text, returning true if it actually changed
    pub fn replace(&mut self, index: usize, text: String) -> bool {
        match self.lines.get_mut(index) {
            Some(line) if *line != text => {
                *line = text;
                true
            }
            _ => false,
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (line, ending) in self.lines.iter().zip(&self.endings) {
            out.push_str(line);
            out.push_str(ending);
        }
        out
    }

    /// Write the buffer over `path` via a temp file in the same directory
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        write_atomic(path, self.to_text().as_bytes())
    }
}

/// Replace `path` with `bytes` so readers see either the old or new content
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    if let Ok(meta) = std::fs::metadata(path) {
        temp.as_file().set_permissions(meta.permissions())?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
