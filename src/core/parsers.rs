use crate::domain::model::{InputFormat, Record, SourceSpec};
use crate::domain::ports::DataParser;
use crate::utils::error::{DataError, Result};
use crate::utils::validation::parse_delimiter;
use serde::de::DeserializeOwned;
use std::io::{BufRead, BufReader, Read};
use std::marker::PhantomData;

/// One record per CSV row, deserialized with serde.
#[derive(Debug, Clone)]
pub struct CsvParser<T> {
    delimiter: u8,
    has_headers: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T> CsvParser<T> {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            _record: PhantomData,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn has_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

impl<T> Default for CsvParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DataParser for CsvParser<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Record = T;

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<T>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .trim(csv::Trim::All)
            .from_reader(input);

        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

/// A JSON array yields one record per element; any other document yields one record.
#[derive(Debug, Clone)]
pub struct JsonParser<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonParser<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for JsonParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DataParser for JsonParser<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Record = T;

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<T>> {
        let document: serde_json::Value = serde_json::from_reader(input)?;
        match document {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(DataError::from))
                .collect(),
            other => Ok(vec![serde_json::from_value(other)?]),
        }
    }
}

/// Maps every non-blank line through a closure.
pub struct LineParser<F, R> {
    map: F,
    _record: PhantomData<fn() -> R>,
}

impl<F, R> LineParser<F, R>
where
    F: Fn(&str) -> Result<R>,
{
    pub fn new(map: F) -> Self {
        Self {
            map,
            _record: PhantomData,
        }
    }
}

impl<F, R> DataParser for LineParser<F, R>
where
    F: Fn(&str) -> Result<R> + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    type Record = R;

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<R>> {
        let mut records = Vec::new();
        for (index, line) in BufReader::new(input).lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let record = (self.map)(line).map_err(|e| match e {
                DataError::MalformedError { .. } => e,
                other => DataError::MalformedError {
                    line: index + 1,
                    message: other.to_string(),
                },
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Produces dynamic [`Record`]s according to an [`InputFormat`].
#[derive(Debug, Clone)]
pub struct FormatParser {
    format: InputFormat,
    delimiter: u8,
    has_headers: bool,
}

impl FormatParser {
    pub fn new(format: InputFormat) -> Self {
        Self {
            format,
            delimiter: b',',
            has_headers: true,
        }
    }

    pub fn from_spec(spec: &SourceSpec) -> Result<Self> {
        Ok(Self {
            format: spec.format,
            delimiter: parse_delimiter("delimiter", &spec.delimiter)?,
            has_headers: spec.has_headers,
        })
    }
}

/// Key given to the `index`-th field of a CSV row read without a header row.
pub fn column_key(index: usize) -> String {
    format!("column_{}", index + 1)
}

impl DataParser for FormatParser {
    type Record = Record;

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<Record>> {
        match self.format {
            InputFormat::Csv if self.has_headers => {
                CsvParser::new().delimiter(self.delimiter).parse(input)
            }
            InputFormat::Csv => {
                let rows = CsvParser::<Vec<serde_json::Value>>::new()
                    .delimiter(self.delimiter)
                    .has_headers(false)
                    .parse(input)?;
                Ok(rows
                    .into_iter()
                    .map(|row| Record {
                        data: row
                            .into_iter()
                            .enumerate()
                            .map(|(i, value)| (column_key(i), value))
                            .collect(),
                    })
                    .collect())
            }
            InputFormat::Json => JsonParser::new().parse(input),
            InputFormat::Lines => {
                LineParser::new(|line: &str| Ok(Record::new().with_field("line", line)))
                    .parse(input)
            }
        }
    }

    fn name(&self) -> &str {
        match self.format {
            InputFormat::Csv => "CsvParser",
            InputFormat::Json => "JsonParser",
            InputFormat::Lines => "LineParser",
        }
    }
}
