use std::io::{self, BufRead};

/// Reads blank-line delimited records from a line oriented stream.
///
/// Each call to [`RecordReader::read_record`] consumes lines up to and
/// including the next empty line, or up to the end of the stream. The empty
/// line itself never ends up in a record.
#[derive(Debug)]
pub struct RecordReader<R: BufRead> {
    inner: R,
    exhausted: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            exhausted: false,
        }
    }
    /// Returns the next record.
    ///
    /// Reaching the end of the stream is not an error: whatever was
    /// accumulated so far (possibly nothing) is returned. A read fault aborts
    /// the call and drops the partial record.
    pub fn read_record(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.inner.read_line(&mut line)? == 0 {
                self.exhausted = true;
                tracing::trace!(lines = lines.len(), "input stream exhausted");
                return Ok(lines);
            }
            let text = trim_line_ending(&line);
            if text.is_empty() {
                return Ok(lines);
            }
            lines.push(text.to_string());
        }
    }
    /// True once the underlying stream has reported end-of-stream.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            reader: self,
            failed: false,
        }
    }
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Iterator over the remaining records of a [`RecordReader`].
///
/// Stops after the stream is exhausted or after yielding a read fault.
pub struct Records<'a, R: BufRead> {
    reader: &'a mut RecordReader<R>,
    failed: bool,
}

impl<R: BufRead> Iterator for Records<'_, R> {
    type Item = io::Result<Vec<String>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_exhausted() {
            return None;
        }
        match self.reader.read_record() {
            Ok(record) if record.is_empty() && self.reader.is_exhausted() => None,
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
