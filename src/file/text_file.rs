//! UTF-8 text view over a [`BasicFile`].

use std::io::{self, SeekFrom};

use super::basic_file::BasicFile;
use crate::core::{FileReader, PathOps, Result};
use crate::error::FileError;

pub const DEFAULT_LINE_SEP: char = '\n';
pub const DEFAULT_RECORD_SEP: char = '\t';
pub const DEFAULT_WORD_SEP: char = ' ';

/// Text content of a file, loaded once and split on demand.
///
/// The content is read from the start of the file on first access and kept until
/// the view is marked dirty, either explicitly or by borrowing the file mutably
/// through [`file_mut`](Self::file_mut).
#[derive(Debug)]
pub struct TextFile {
    file: BasicFile,
    line_sep: char,
    record_sep: char,
    word_sep: char,
    text: Option<String>,
    dirty: bool,
}

impl TextFile {
    pub fn new(file: BasicFile) -> Self {
        Self {
            file,
            line_sep: DEFAULT_LINE_SEP,
            record_sep: DEFAULT_RECORD_SEP,
            word_sep: DEFAULT_WORD_SEP,
            text: None,
            dirty: false,
        }
    }

    /// Whole content of the file. Fails if it is not valid UTF-8.
    pub fn text(&mut self) -> Result<&str> {
        if self.dirty || self.text.is_none() {
            let loaded = self.load()?;
            self.text = Some(loaded);
            self.dirty = false;
        }
        Ok(self.text.as_deref().unwrap_or_default())
    }

    /// Content split on the line separator. A trailing separator does not yield an
    /// empty last line, and with the default separator a `\r` before it is dropped.
    pub fn lines(&mut self) -> Result<Vec<&str>> {
        let sep = self.line_sep;
        let text = self.text()?;
        Ok(text
            .split_terminator(sep)
            .map(|line| if sep == '\n' { line.strip_suffix('\r').unwrap_or(line) } else { line })
            .collect())
    }

    /// Every line split into fields on the record separator.
    pub fn records(&mut self) -> Result<Vec<Vec<&str>>> {
        let sep = self.record_sep;
        Ok(self
            .lines()?
            .into_iter()
            .map(|line| line.split(sep).collect())
            .collect())
    }

    /// Non-empty words of every line, split on the word separator.
    pub fn words(&mut self) -> Result<Vec<&str>> {
        let sep = self.word_sep;
        Ok(self
            .lines()?
            .into_iter()
            .flat_map(|line| line.split(sep))
            .filter(|word| !word.is_empty())
            .collect())
    }

    pub fn line_sep(&self) -> char {
        self.line_sep
    }

    pub fn set_line_sep(&mut self, sep: char) {
        self.line_sep = sep;
    }

    pub fn record_sep(&self) -> char {
        self.record_sep
    }

    pub fn set_record_sep(&mut self, sep: char) {
        self.record_sep = sep;
    }

    pub fn word_sep(&self) -> char {
        self.word_sep
    }

    pub fn set_word_sep(&mut self, sep: char) {
        self.word_sep = sep;
    }

    /// Forces the next access to reload the content.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn file(&self) -> &BasicFile {
        &self.file
    }

    /// Mutable access to the wrapped file. The loaded text is considered stale.
    pub fn file_mut(&mut self) -> &mut BasicFile {
        self.dirty = true;
        &mut self.file
    }

    pub fn into_inner(self) -> BasicFile {
        self.file
    }

    fn load(&mut self) -> Result<String> {
        self.file.seek(SeekFrom::Start(0))?;
        let bytes = self.file.read_to_end()?;
        String::from_utf8(bytes).map_err(|e| {
            FileError::io(
                "decode",
                self.file.abs(),
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })
    }
}

impl From<BasicFile> for TextFile {
    fn from(file: BasicFile) -> Self {
        Self::new(file)
    }
}
