use std::borrow::Cow;
use std::cmp::Ordering;

use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn apply(self, ascending: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ascending,
            SortDirection::Descending => ascending.reverse(),
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: &'static str,
    pub direction: SortDirection,
}

impl SortState {
    pub fn ascending(key: &'static str) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }

    pub fn click(&mut self, key: &'static str) {
        if self.key == key {
            self.direction = self.direction.toggled();
        } else {
            self.key = key;
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Ascending natural order: numbers before text, missing values last.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Number(_), Value::Text(_)) => Ordering::Less,
        (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        (Value::Missing, Value::Missing) => Ordering::Equal,
        (Value::Missing, _) => Ordering::Greater,
        (_, Value::Missing) => Ordering::Less,
    }
}

// A missing or blank value sorts as the placeholder shown in its place.
fn sort_value<'r>(record: &'r Record, key: &str, placeholder: Option<&'static str>) -> Cow<'r, Value> {
    let value = record.get(key);
    match (value, placeholder) {
        (Value::Missing, Some(p)) => Cow::Owned(Value::from(p)),
        (Value::Text(s), Some(p)) if s.trim().is_empty() => Cow::Owned(Value::from(p)),
        _ => Cow::Borrowed(value),
    }
}

pub fn compare(
    a: &Record,
    b: &Record,
    key: &str,
    direction: SortDirection,
    placeholder: Option<&'static str>,
) -> Ordering {
    let a = sort_value(a, key, placeholder);
    let b = sort_value(b, key, placeholder);
    direction.apply(compare_values(&a, &b))
}

/// Orders `records` by `key`, keeping the input order of records that compare
/// equal. The input is left untouched.
pub fn stable_sort<'r>(
    records: &[&'r Record],
    key: &str,
    direction: SortDirection,
    placeholder: Option<&'static str>,
) -> Vec<&'r Record> {
    let mut decorated: Vec<(usize, &'r Record)> = records.iter().copied().enumerate().collect();
    decorated.sort_unstable_by(|(ia, a), (ib, b)| compare(a, b, key, direction, placeholder).then(ia.cmp(ib)));
    decorated.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;

    fn aged(ages: &[i64]) -> Vec<Record> {
        ages.iter()
            .enumerate()
            .map(|(i, age)| Record::new(RecordId(i as u64 + 1)).with("edad", *age))
            .collect()
    }

    fn ids(records: &[&Record]) -> Vec<u64> {
        records.iter().map(|r| r.id().0).collect()
    }

    #[test]
    fn ties_keep_input_order() {
        let records = aged(&[1, 3, 3, 2, 5, 3, 1]);
        let refs: Vec<&Record> = records.iter().collect();
        let sorted = stable_sort(&refs, "edad", SortDirection::Ascending, None);
        assert_eq!(ids(&sorted), vec![1, 7, 4, 2, 3, 6, 5]);

        let sorted = stable_sort(&refs, "edad", SortDirection::Descending, None);
        assert_eq!(ids(&sorted), vec![5, 2, 3, 6, 4, 1, 7]);
    }

    #[test]
    fn sorting_is_idempotent() {
        let records = aged(&[4, 2, 4, 4, 1, 2, 9, 1]);
        let refs: Vec<&Record> = records.iter().collect();
        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            let once = stable_sort(&refs, "edad", direction, None);
            let twice = stable_sort(&once, "edad", direction, None);
            assert_eq!(ids(&once), ids(&twice));
        }
    }

    #[test]
    fn directions_are_inverse() {
        let values = [
            Value::Number(2.0),
            Value::Number(-1.0),
            Value::from("Gato"),
            Value::from("gato"),
            Value::Missing,
        ];
        for a in values.iter() {
            for b in values.iter() {
                let asc = SortDirection::Ascending.apply(compare_values(a, b));
                let desc = SortDirection::Descending.apply(compare_values(a, b));
                assert_eq!(asc, desc.reverse());
                assert_eq!(compare_values(a, b), compare_values(b, a).reverse());
            }
        }
    }

    #[test]
    fn missing_values_sort_last_ascending() {
        let records = vec![
            Record::new(RecordId(1)),
            Record::new(RecordId(2)).with("nombre", "Zeus"),
            Record::new(RecordId(3)).with("nombre", "Atlas"),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        assert_eq!(ids(&stable_sort(&refs, "nombre", SortDirection::Ascending, None)), vec![3, 2, 1]);
        assert_eq!(ids(&stable_sort(&refs, "nombre", SortDirection::Descending, None)), vec![1, 2, 3]);
    }

    #[test]
    fn missing_value_sorts_as_its_placeholder() {
        let records = vec![
            Record::new(RecordId(1)).with("genero", "Otro"),
            Record::new(RecordId(2)),
            Record::new(RecordId(3)).with("genero", "Macho"),
            Record::new(RecordId(4)).with("genero", " "),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sorted = stable_sort(&refs, "genero", SortDirection::Ascending, Some("No especificado"));
        assert_eq!(ids(&sorted), vec![3, 2, 4, 1]);
        assert_eq!(ids(&stable_sort(&refs, "genero", SortDirection::Ascending, None)), vec![4, 3, 1, 2]);
    }

    #[test]
    fn header_click_rule() {
        let mut sort = SortState::ascending("nombre");
        sort.click("nombre");
        assert_eq!(sort.direction, SortDirection::Descending);
        sort.click("edad");
        assert_eq!(sort, SortState::ascending("edad"));
        sort.click("edad");
        sort.click("edad");
        assert_eq!(sort.direction, SortDirection::Ascending);
    }

    #[test]
    fn input_is_not_mutated() {
        let records = aged(&[3, 1, 2]);
        let refs: Vec<&Record> = records.iter().collect();
        let _ = stable_sort(&refs, "edad", SortDirection::Ascending, None);
        assert_eq!(ids(&refs), vec![1, 2, 3]);
    }
}
