use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use polars::prelude::*;
use reqwest::blocking::{Client, Response};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, trace};

use crate::domain::SourceError;
use crate::record::{ID_FIELD, Record, RecordId, records_from_json};

pub trait RecordSource {
    fn describe(&self) -> String;
    fn list(&mut self) -> Result<Vec<Record>, SourceError>;
    fn get(&mut self, id: RecordId) -> Result<Record, SourceError>;
    fn create(&mut self, draft: &Record) -> Result<Record, SourceError>;
    fn update(&mut self, record: &Record) -> Result<Record, SourceError>;
    fn delete(&mut self, id: RecordId) -> Result<(), SourceError>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    path: String,
    http: Client,
}

impl HttpSource {
    pub fn new(base_url: &str, path: &str) -> Result<Self, SourceError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| SourceError::Unavailable(format!("invalid base url '{base_url}': {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("kennel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            path: format!("/{}", path.trim_matches('/')),
            http,
        })
    }

    pub fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    pub fn record_url(&self, id: RecordId) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn check(response: Response) -> Result<Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(SourceError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            })
        }
    }

    fn read_json(response: Response) -> Result<JsonValue, SourceError> {
        let body = Self::check(response)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn body_without_id(record: &Record) -> JsonValue {
    let mut body = record.to_json();
    if let JsonValue::Object(map) = &mut body {
        map.remove(ID_FIELD);
    }
    body
}

impl RecordSource for HttpSource {
    fn describe(&self) -> String {
        self.collection_url()
    }

    fn list(&mut self) -> Result<Vec<Record>, SourceError> {
        let url = self.collection_url();
        debug!(%url, "GET collection");
        let start = Instant::now();
        let payload = Self::read_json(self.http.get(&url).send()?)?;
        let records = records_from_json(&payload)?;
        info!("Fetched {} records from {url} in {}ms", records.len(), start.elapsed().as_millis());
        Ok(records)
    }

    fn get(&mut self, id: RecordId) -> Result<Record, SourceError> {
        let url = self.record_url(id);
        debug!(%url, "GET record");
        let response = self.http.get(&url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(id));
        }
        Record::from_json(&Self::read_json(response)?)
    }

    fn create(&mut self, draft: &Record) -> Result<Record, SourceError> {
        let url = self.collection_url();
        debug!(%url, "POST record");
        let response = self.http.post(&url).json(&body_without_id(draft)).send()?;
        Record::from_json(&Self::read_json(response)?)
    }

    fn update(&mut self, record: &Record) -> Result<Record, SourceError> {
        let url = self.record_url(record.id());
        debug!(%url, "PUT record");
        let response = self.http.put(&url).json(&record.to_json()).send()?;
        Record::from_json(&Self::read_json(response)?)
    }

    fn delete(&mut self, id: RecordId) -> Result<(), SourceError> {
        let url = self.record_url(id);
        debug!(%url, "DELETE record");
        Self::check(self.http.delete(&url).send()?)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    records: Vec<Record>,
    failure: Option<String>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            failure: None,
        }
    }

    pub fn fail_with(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
    }

    pub fn recover(&mut self) {
        self.failure = None;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    fn available(&self) -> Result<(), SourceError> {
        match &self.failure {
            Some(reason) => Err(SourceError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn position(&self, id: RecordId) -> Result<usize, SourceError> {
        self.records
            .iter()
            .position(|r| r.id() == id)
            .ok_or(SourceError::NotFound(id))
    }
}

impl RecordSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn list(&mut self) -> Result<Vec<Record>, SourceError> {
        self.available()?;
        Ok(self.records.clone())
    }

    fn get(&mut self, id: RecordId) -> Result<Record, SourceError> {
        self.available()?;
        let idx = self.position(id)?;
        Ok(self.records[idx].clone())
    }

    fn create(&mut self, draft: &Record) -> Result<Record, SourceError> {
        self.available()?;
        let next = self.records.iter().map(|r| r.id().0).max().map_or(1, |m| m + 1);
        let mut record = Record::new(RecordId(next));
        record.merge(draft);
        self.records.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, record: &Record) -> Result<Record, SourceError> {
        self.available()?;
        let idx = self.position(record.id())?;
        self.records[idx] = record.clone();
        Ok(record.clone())
    }

    fn delete(&mut self, id: RecordId) -> Result<(), SourceError> {
        self.available()?;
        let idx = self.position(id)?;
        self.records.remove(idx);
        Ok(())
    }
}

#[derive(Debug)]
enum FileType {
    Json,
    Csv,
    Parquet,
    Arrow,
}

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    loaded: Option<MemorySource>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: None,
        }
    }

    fn detect_file_type(path: &Path) -> Result<FileType, SourceError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("JSON") => Ok(FileType::Json),
            Some("CSV") => Ok(FileType::Csv),
            Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
            _ => Err(SourceError::UnknownFileType(path.display().to_string())),
        }
    }

    fn load(path: &Path) -> Result<Vec<Record>, SourceError> {
        let start = Instant::now();
        let payload = match Self::detect_file_type(path)? {
            FileType::Json => serde_json::from_str(&fs::read_to_string(path)?)?,
            FileType::Csv => frame_to_json(&load_csv(path)?.collect()?)?,
            FileType::Parquet => frame_to_json(&load_parquet(path)?.collect()?)?,
            FileType::Arrow => frame_to_json(&load_arrow(path)?.collect()?)?,
        };
        let records = records_from_json(&payload)?;
        info!(
            "Loaded {} records from {} in {}ms",
            records.len(),
            path.display(),
            start.elapsed().as_millis()
        );
        Ok(records)
    }

    fn store(&mut self) -> Result<&mut MemorySource, SourceError> {
        if self.loaded.is_none() {
            self.loaded = Some(MemorySource::new(Self::load(&self.path)?));
        }
        self.loaded
            .as_mut()
            .ok_or_else(|| SourceError::Unavailable(self.path.display().to_string()))
    }
}

impl RecordSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn list(&mut self) -> Result<Vec<Record>, SourceError> {
        self.store()?.list()
    }

    fn get(&mut self, id: RecordId) -> Result<Record, SourceError> {
        self.store()?.get(id)
    }

    fn create(&mut self, draft: &Record) -> Result<Record, SourceError> {
        self.store()?.create(draft)
    }

    fn update(&mut self, record: &Record) -> Result<Record, SourceError> {
        self.store()?.update(record)
    }

    fn delete(&mut self, id: RecordId) -> Result<(), SourceError> {
        self.store()?.delete(id)
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn number_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        JsonValue::from(n as i64)
    } else {
        JsonValue::from(n)
    }
}

// Numeric columns keep their numbers, everything else is read as text.
fn frame_to_json(df: &DataFrame) -> Result<JsonValue, PolarsError> {
    let mut rows: Vec<Map<String, JsonValue>> = vec![Map::new(); df.height()];
    for name in df.get_column_names() {
        let column = df.column(name.as_str())?;
        trace!("Column {} {:?}", name, column.dtype());
        if is_numeric_type(column.dtype()) {
            let cast = column.cast(&DataType::Float64)?;
            for (row, value) in rows.iter_mut().zip(cast.f64()?.into_iter()) {
                row.insert(name.to_string(), value.map(number_json).unwrap_or(JsonValue::Null));
            }
        } else {
            let cast = column.cast(&DataType::String)?;
            for (row, value) in rows.iter_mut().zip(cast.str()?.into_iter()) {
                let value = value.map(|s| JsonValue::String(s.to_string()));
                row.insert(name.to_string(), value.unwrap_or(JsonValue::Null));
            }
        }
    }
    Ok(JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect()))
}
