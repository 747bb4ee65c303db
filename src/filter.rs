use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::domain::EngineError;
use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Equals,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub field: &'static str,
    pub kind: FilterKind,
}

impl FilterDescriptor {
    pub fn equals(name: &'static str, label: &'static str, field: &'static str) -> Self {
        Self {
            name,
            label,
            field,
            kind: FilterKind::Equals,
        }
    }

    pub fn min(name: &'static str, label: &'static str, field: &'static str) -> Self {
        Self {
            name,
            label,
            field,
            kind: FilterKind::Min,
        }
    }

    pub fn max(name: &'static str, label: &'static str, field: &'static str) -> Self {
        Self {
            name,
            label,
            field,
            kind: FilterKind::Max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    values: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn set(&mut self, filter: &FilterDescriptor, raw: &str) -> Result<(), EngineError> {
        let raw = raw.trim();
        if raw.is_empty() {
            self.values.remove(filter.name);
            return Ok(());
        }
        let value = match filter.kind {
            FilterKind::Equals => FilterValue::Text(raw.to_string()),
            FilterKind::Min | FilterKind::Max => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FilterValue::Number)
                .ok_or_else(|| EngineError::InvalidFilterValue {
                    filter: filter.name.to_string(),
                    value: raw.to_string(),
                })?,
        };
        self.values.insert(filter.name.to_string(), value);
        Ok(())
    }

    pub fn unset(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

pub fn term_matches(filter: &FilterDescriptor, value: Option<&FilterValue>, record: &Record) -> bool {
    let Some(value) = value else {
        return true;
    };
    let field = record.get(filter.field);
    match (filter.kind, value) {
        (FilterKind::Equals, FilterValue::Text(wanted)) => match field {
            Value::Missing => false,
            present => normalize(&present.to_string()) == normalize(wanted),
        },
        (FilterKind::Min, FilterValue::Number(bound)) => {
            field.as_number().is_some_and(|n| n >= *bound)
        }
        (FilterKind::Max, FilterValue::Number(bound)) => {
            field.as_number().is_some_and(|n| n <= *bound)
        }
        // A value of the wrong shape can only come from hand built state
        _ => false,
    }
}

/// Visibility test combining structured filters (AND) with free-text search
/// (OR across the search fields, then AND with the filters).
pub struct Predicate<'a> {
    filters: &'a [FilterDescriptor],
    state: &'a FilterState,
    search_fields: &'a [&'static str],
    search: String,
}

impl<'a> Predicate<'a> {
    pub fn new(
        filters: &'a [FilterDescriptor],
        state: &'a FilterState,
        search_fields: &'a [&'static str],
        search_text: &str,
    ) -> Self {
        Self {
            filters,
            state,
            search_fields,
            search: search_text.trim().to_lowercase(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.matches_filters(record) && self.matches_search(record)
    }

    pub fn matches_filters(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|f| term_matches(f, self.state.get(f.name), record))
    }

    pub fn matches_search(&self, record: &Record) -> bool {
        if self.search.is_empty() {
            return true;
        }
        self.search_fields.iter().any(|name| {
            record
                .get(name)
                .to_string()
                .to_lowercase()
                .contains(&self.search)
        })
    }

    pub fn apply<'r>(&self, records: &'r [Record]) -> Vec<&'r Record> {
        records.par_iter().filter(|r| self.matches(r)).collect()
    }
}

pub fn matches(
    record: &Record,
    filters: &[FilterDescriptor],
    state: &FilterState,
    search_fields: &[&'static str],
    search_text: &str,
) -> bool {
    Predicate::new(filters, state, search_fields, search_text).matches(record)
}
