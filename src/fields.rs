use derive_setters::Setters;

use crate::domain::EngineError;
use crate::record::{Record, Value};

pub type Formatter = fn(&FieldDescriptor, &Record) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct FieldDescriptor {
    #[setters(skip)]
    pub name: &'static str,
    #[setters(skip)]
    pub label: &'static str,
    #[setters(skip)]
    pub kind: FieldKind,
    pub sortable: bool,
    #[setters(strip_option)]
    pub placeholder: Option<&'static str>,
    pub formatter: Formatter,
}

impl FieldDescriptor {
    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn number(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            sortable: true,
            placeholder: None,
            formatter: format_plain,
        }
    }

    pub fn value<'r>(&self, record: &'r Record) -> &'r Value {
        record.get(self.name)
    }

    pub fn format(&self, record: &Record) -> String {
        (self.formatter)(self, record)
    }
}

pub fn format_plain(field: &FieldDescriptor, record: &Record) -> String {
    let value = field.value(record);
    let blank = match value {
        Value::Missing => true,
        Value::Text(s) => s.trim().is_empty(),
        Value::Number(_) => false,
    };
    if blank {
        field.placeholder.unwrap_or_default().to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub field: FieldDescriptor,
    pub included: bool,
}

#[derive(Debug, Clone)]
pub struct ColumnManifest {
    entries: Vec<ManifestEntry>,
}

impl ColumnManifest {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            entries: fields
                .into_iter()
                .map(|field| ManifestEntry {
                    field,
                    included: true,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.entries.iter().map(|e| &e.field)
    }

    pub fn included(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.entries.iter().filter(|e| e.included).map(|e| &e.field)
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.included().map(|f| f.label).collect()
    }

    pub fn find(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.name == name)
    }

    pub fn is_included(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.field.name == name && e.included)
    }

    pub fn set_included(&mut self, name: &str, included: bool) -> Result<(), EngineError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.field.name == name)
            .ok_or_else(|| EngineError::UnknownField(name.to_string()))?;
        entry.included = included;
        Ok(())
    }

    pub fn toggle(&mut self, name: &str) -> Result<bool, EngineError> {
        let included = !self.is_included(name);
        self.set_included(name, included)?;
        Ok(included)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
