use std::{
    collections::HashMap,
    io::{self, BufRead},
};

use thiserror::Error;

/// Number of fixed VCF columns before the per-sample columns.
const FIXED_COLUMNS: usize = 9;
const FORMAT_COLUMN: usize = 8;

/// The decoded VCF header: column names and the ordered sample ids.
#[derive(Debug)]
pub struct Header {
    columns: Vec<String>,
    sample_indices: HashMap<String, usize>,
}

impl Header {
    fn from_column_line(line: &str) -> Result<Self, DecodeError> {
        let columns: Vec<String> = line
            .trim_start_matches('#')
            .split('\t')
            .map(str::to_string)
            .collect();
        if columns.len() < FIXED_COLUMNS {
            return Err(DecodeError::MalformedHeaderLine {
                found: columns.len(),
            });
        }

        let sample_indices = columns
            .iter()
            .enumerate()
            .skip(FIXED_COLUMNS)
            .map(|(index, id)| (id.clone(), index))
            .collect();

        Ok(Self {
            columns,
            sample_indices,
        })
    }

    /// Sample ids in header order.
    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.columns[FIXED_COLUMNS..].iter().map(String::as_str)
    }

    pub fn contains_sample(&self, id: &str) -> bool {
        self.sample_indices.contains_key(id)
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// One decoded variant line. Transient: holds the split columns for the
/// duration of processing a single record.
#[derive(Debug)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    fn parse(line: &str, header: &Header) -> Result<Self, DecodeError> {
        let fields: Vec<String> = line.split('\t').map(str::to_string).collect();
        if fields.len() != header.column_count() {
            return Err(DecodeError::ColumnCount {
                expected: header.column_count(),
                found: fields.len(),
            });
        }
        Ok(Self { fields })
    }

    /// The declared FORMAT field, e.g. `GT:AD:GQ`.
    pub fn format(&self) -> &str {
        &self.fields[FORMAT_COLUMN]
    }

    /// The raw colon-joined genotype column for one sample.
    pub fn sample(&self, header: &Header, id: &str) -> Option<&str> {
        header
            .sample_indices
            .get(id)
            .map(|&index| self.fields[index].as_str())
    }

    /// `CHROM_POS_REF_ALT` identifier, for diagnostics.
    pub fn variant_id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.fields[0], self.fields[1], self.fields[3], self.fields[4]
        )
    }
}

/// Streaming reader over a VCF text stream: parses the header block, then
/// yields one `Record` per data line. Nothing is buffered across lines.
pub struct Reader<R> {
    inner: R,
    line: u64,
    buf: String,
}

impl<R> Reader<R>
where
    R: BufRead,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: String::new(),
        }
    }

    /// Consume `##` meta lines and the `#CHROM` column line. The column
    /// line terminates the header block, so no data line is consumed.
    pub fn read_header(&mut self) -> Result<Header, DecodeError> {
        loop {
            if !self.fill_line()? {
                return Err(DecodeError::MissingHeaderLine);
            }
            let line_number = self.line;
            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.starts_with("##") {
                continue;
            }
            return match line.strip_prefix('#') {
                Some(rest) => {
                    Header::from_column_line(rest).map_err(|e| e.at_line(line_number))
                }
                None => Err(DecodeError::MissingHeaderLine),
            };
        }
    }

    /// Iterate the remaining data lines as records.
    pub fn records<'a>(&'a mut self, header: &'a Header) -> Records<'a, R> {
        Records {
            reader: self,
            header,
        }
    }

    /// Read the next non-empty line into the buffer. `false` on EOF.
    fn fill_line(&mut self) -> Result<bool, DecodeError> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return Ok(false),
                Ok(_) => {
                    self.line += 1;
                    if !self.buf.trim_end_matches(&['\n', '\r'][..]).is_empty() {
                        return Ok(true);
                    }
                }
                Err(e) => return Err(DecodeError::Io(e)),
            }
        }
    }
}

pub struct Records<'a, R> {
    reader: &'a mut Reader<R>,
    header: &'a Header,
}

impl<R> Iterator for Records<'_, R>
where
    R: BufRead,
{
    type Item = Result<Record, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.fill_line() {
            Err(e) => Some(Err(e)),
            Ok(false) => None,
            Ok(true) => {
                let line_number = self.reader.line;
                let line = self.reader.buf.trim_end_matches(&['\n', '\r'][..]);
                Some(Record::parse(line, self.header).map_err(|e| e.at_line(line_number)))
            }
        }
    }
}

/// Errors raised while decoding the VCF stream. All are fatal for the run.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error reading variant stream")]
    Io(#[from] io::Error),
    #[error("variant stream has no #CHROM header line")]
    MissingHeaderLine,
    #[error("malformed header line: expected at least {FIXED_COLUMNS} columns, found {found}")]
    MalformedHeaderLine { found: usize },
    #[error("record has {found} columns where the header declares {expected}")]
    ColumnCount { expected: usize, found: usize },
    #[error("line {line}: {source}")]
    AtLine {
        line: u64,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    fn at_line(self, line: u64) -> Self {
        Self::AtLine {
            line,
            source: Box::new(self),
        }
    }
}
