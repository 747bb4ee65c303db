use std::io;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::paginator::DEFAULT_PAGE_SIZES;
use crate::record::RecordId;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("unknown file type: {0}")]
    UnknownFileType(String),
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::MalformedPayload(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("unknown field \"{0}\"")]
    UnknownField(String),
    #[error("field \"{0}\" is not sortable")]
    NotSortable(String),
    #[error("unknown filter \"{0}\"")]
    UnknownFilter(String),
    #[error("invalid value \"{value}\" for filter \"{filter}\"")]
    InvalidFilterValue { filter: String, value: String },
    #[error("page size {size} is not one of {allowed:?}")]
    InvalidPageSize { size: usize, allowed: Vec<usize> },
    #[error("nothing selected to export")]
    NothingToExport,
    #[error("unknown record {0}")]
    UnknownRecord(RecordId),
}

#[derive(Debug, Error)]
pub enum KennelError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, Setters)]
pub struct AppConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub page_sizes: Vec<usize>,
    pub page_size: usize,
    pub export_dir: PathBuf,
    pub session_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
            page_size: DEFAULT_PAGE_SIZES[0],
            export_dir: PathBuf::from("."),
            session_file: PathBuf::from(".kennel-session.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GrowPageSize,
    ShrinkPageSize,
    SortBy(usize),
    ToggleRow,
    ToggleAll,
    DeleteRow,
    ExportDocument,
    ExportDelimited,
    ToggleExportScope,
    ColumnPicker,
    CopySelection,
    Refresh,
    Help,
    Search,
    Filter,
    ClearFilters,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
kennel - shelter records

  /        search (name, species, status, id)
  f        set filter, e.g. especie=Perro or edadMin=3
  c        clear all filters
  1-9      sort by column, again to reverse
  j/k      move cursor
  n/p      next / previous page
  g/G      first / last page
  +/-      change page size
  space    select row
  a        select all matching rows
  d        delete row under cursor
  e        export document
  x        export csv
  s        switch export scope (selection / all matching)
  m        choose exported columns
  y        copy selection as csv
  r        reload records
  ?        this help
  q        quit
";
