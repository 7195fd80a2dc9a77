//! CSV input driven through a [`Template`].

use std::io::Read;

use csv::StringRecord;
use serde_json::Value;

use crate::options::Options;
use crate::template::Template;
use crate::{Error, Result};

/// How CSV text is split into headers and rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Field delimiter byte. Default `,`.
    pub delimiter: u8,
    /// Strip surrounding whitespace from headers and fields.
    pub trim: bool,
    /// Header list to use instead of the first line of input. When set, the
    /// first line is read as data.
    pub headers: Option<Vec<String>>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: false,
            headers: None,
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }
}

/// Convert CSV with a header line into one nested record per data row.
///
/// # Examples
/// ```
/// use csv2json::{csv_to_json, Options};
/// use serde_json::json;
///
/// let input = "abc.0,abc.1,status\n1,2,3\n";
/// let records: Vec<_> = csv_to_json(input.as_bytes(), Options::default())
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(records, vec![json!({"abc": ["1", "2"], "status": "3"})]);
/// ```
pub fn csv_to_json<R: Read>(reader: R, options: Options) -> Result<Records<R>> {
    csv_to_json_with_config(reader, &ReaderConfig::default(), options)
}

/// Like [`csv_to_json`] with explicit delimiter, trimming and headers.
///
/// Fails with [`Error::MissingHeaders`] when no header list is configured and
/// the input has no header line.
pub fn csv_to_json_with_config<R: Read>(
    reader: R,
    config: &ReaderConfig,
    options: Options,
) -> Result<Records<R>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.headers.is_none())
        .flexible(true)
        .trim(if config.trim {
            csv::Trim::All
        } else {
            csv::Trim::None
        })
        .from_reader(reader);

    let template = match &config.headers {
        Some(headers) => Template::with_options(headers, options)?,
        None => {
            let headers = csv_reader.headers()?;
            if headers.is_empty() {
                return Err(Error::MissingHeaders);
            }
            Template::with_options(headers.iter(), options)?
        }
    };
    log::debug!(
        "reading csv rows for {} headers (delimiter {:?})",
        template.len(),
        config.delimiter as char
    );

    Ok(Records {
        reader: csv_reader,
        template,
        record: StringRecord::new(),
        row: 0,
    })
}

/// Lazy iterator of rendered records.
///
/// Errors carry the 1-based number of the data row they belong to. A row
/// error leaves the iterator usable; the next call reads the next row.
pub struct Records<R> {
    reader: csv::Reader<R>,
    template: Template,
    record: StringRecord,
    row: u64,
}

impl<R: Read> Records<R> {
    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn headers(&self) -> &[String] {
        self.template.headers()
    }

    /// Number of data rows read so far.
    pub fn rows_read(&self) -> u64 {
        self.row
    }
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => return None,
            Ok(true) => {}
            Err(err) => {
                self.row += 1;
                return Some(Err(Error::from(err).at_row(self.row)));
            }
        }
        self.row += 1;
        let rendered = self.template.render(self.record.iter());
        Some(rendered.map_err(|err| err.at_row(self.row)))
    }
}
