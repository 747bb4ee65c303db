use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_setters::Setters;
use tracing::info;

use crate::fields::ColumnManifest;
use crate::record::Record;

pub const DOCUMENT_MIME: &str = "text/plain;charset=utf-8";
pub const DELIMITED_MIME: &str = "text/csv;charset=utf-8";

const COLUMN_WIDTH_MARGIN: usize = 1;
const COLUMN_SEPARATOR: &str = " ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Document,
    Delimited,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Document => "txt",
            ExportFormat::Delimited => "csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Document => DOCUMENT_MIME,
            ExportFormat::Delimited => DELIMITED_MIME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
    pub rows: usize,
}

impl ExportArtifact {
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, self.content.as_bytes())?;
        info!("Wrote {} rows to {}", self.rows, path.display());
        Ok(path)
    }
}

pub struct Projection {
    pub labels: Vec<&'static str>,
    pub cells: Vec<Vec<String>>,
}

pub fn project(rows: &[&Record], manifest: &ColumnManifest) -> Projection {
    let columns: Vec<_> = manifest.included().collect();
    Projection {
        labels: columns.iter().map(|f| f.label).collect(),
        cells: rows
            .iter()
            .map(|record| columns.iter().map(|f| f.format(record)).collect())
            .collect(),
    }
}

#[derive(Debug, Clone, Setters)]
pub struct Exporter {
    #[setters(into)]
    pub title: String,
    #[setters(into)]
    pub file_stem: String,
    pub max_column_width: usize,
}

impl Exporter {
    pub fn new(title: impl Into<String>, file_stem: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_stem: file_stem.into(),
            max_column_width: 40,
        }
    }

    pub fn file_name(&self, format: ExportFormat) -> String {
        format!("{}.{}", self.file_stem, format.extension())
    }

    pub fn export(&self, rows: &[&Record], manifest: &ColumnManifest, format: ExportFormat) -> ExportArtifact {
        let projection = project(rows, manifest);
        let content = match format {
            ExportFormat::Document => render_document(&self.title, &projection, self.max_column_width),
            ExportFormat::Delimited => render_delimited(&projection),
        };
        ExportArtifact {
            file_name: self.file_name(format),
            mime_type: format.mime_type(),
            content,
            rows: rows.len(),
        }
    }
}

pub fn escape_delimited(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn delimited_line<S: AsRef<str>>(cells: &[S]) -> String {
    cells
        .iter()
        .map(|c| escape_delimited(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn render_delimited(projection: &Projection) -> String {
    let mut out = delimited_line(&projection.labels);
    out.push('\n');
    for row in projection.cells.iter() {
        out.push_str(&delimited_line(row));
        out.push('\n');
    }
    out
}

fn char_width(s: &str) -> usize {
    s.chars().count()
}

fn column_widths(projection: &Projection, max_column_width: usize) -> Vec<usize> {
    projection
        .labels
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let widest_cell = projection
                .cells
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|c| char_width(c))
                .max()
                .unwrap_or(0);
            let width = std::cmp::max(char_width(label), widest_cell) + COLUMN_WIDTH_MARGIN;
            std::cmp::min(width, max_column_width.max(3))
        })
        .collect()
}

// Cuts `s` to `width` characters, marking the cut with "..."
fn fit_cell(s: &str, width: usize) -> String {
    let len = char_width(s);
    let mut out: String = if len > width {
        if width < 3 {
            return " ".repeat(width);
        }
        let mut cut: String = s.chars().take(width - 3).collect();
        cut.push_str("...");
        cut
    } else {
        s.to_string()
    };
    let used = char_width(&out);
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    out
}

fn document_line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, w)| fit_cell(c.as_ref(), *w))
        .collect::<Vec<_>>()
        .join(COLUMN_SEPARATOR)
        .trim_end()
        .to_string()
}

pub fn render_document(title: &str, projection: &Projection, max_column_width: usize) -> String {
    let widths = column_widths(projection, max_column_width);
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join(COLUMN_SEPARATOR);

    let mut out = String::new();
    out.push_str(title);
    out.push_str("\n\n");
    out.push_str(&document_line(&projection.labels, &widths));
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    for row in projection.cells.iter() {
        out.push_str(&document_line(row, &widths));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDescriptor;
    use crate::record::RecordId;

    fn manifest() -> ColumnManifest {
        ColumnManifest::new(vec![
            FieldDescriptor::text("nombre", "Nombre"),
            FieldDescriptor::text("direccion", "Dirección"),
            FieldDescriptor::number("adoptanteId", "ID Cliente").with_placeholder("No asignado"),
        ])
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new(RecordId(1))
                .with("nombre", "Ana")
                .with("direccion", "Calle 1, Lima")
                .with("adoptanteId", 4i64),
            Record::new(RecordId(2))
                .with("nombre", "Luis \"Lucho\"")
                .with("direccion", "Av. Sol"),
        ]
    }

    #[test]
    fn delimited_has_header_and_rows() {
        let records = records();
        let rows: Vec<&Record> = records.iter().collect();
        let artifact = Exporter::new("Lista de Clientes", "Lista_Clientes").export(
            &rows,
            &manifest(),
            ExportFormat::Delimited,
        );
        assert_eq!(artifact.file_name, "Lista_Clientes.csv");
        assert_eq!(artifact.mime_type, "text/csv;charset=utf-8");
        assert_eq!(
            artifact.content,
            "Nombre,Dirección,ID Cliente\n\
             Ana,\"Calle 1, Lima\",4\n\
             \"Luis \"\"Lucho\"\"\",Av. Sol,No asignado\n"
        );
        assert_eq!(artifact.rows, 2);
    }

    #[test]
    fn excluded_columns_are_skipped() {
        let records = records();
        let rows: Vec<&Record> = records.iter().collect();
        let mut manifest = manifest();
        manifest.toggle("direccion").unwrap();
        let artifact = Exporter::new("t", "t").export(&rows, &manifest, ExportFormat::Delimited);
        assert_eq!(artifact.content.lines().next(), Some("Nombre,ID Cliente"));
        assert_eq!(artifact.content.lines().nth(1), Some("Ana,4"));
    }

    #[test]
    fn empty_export_is_header_only() {
        let exporter = Exporter::new("Lista de Clientes", "Lista_Clientes");
        let csv = exporter.export(&[], &manifest(), ExportFormat::Delimited);
        assert_eq!(csv.content, "Nombre,Dirección,ID Cliente\n");

        let doc = exporter.export(&[], &manifest(), ExportFormat::Document);
        let lines: Vec<&str> = doc.content.lines().collect();
        assert_eq!(lines[0], "Lista de Clientes");
        assert_eq!(lines.len(), 4);
        assert_eq!(doc.file_name, "Lista_Clientes.txt");
    }

    #[test]
    fn document_columns_are_aligned() {
        let records = records();
        let rows: Vec<&Record> = records.iter().collect();
        let doc = Exporter::new("Lista", "l").export(&rows, &manifest(), ExportFormat::Document);
        let lines: Vec<&str> = doc.content.lines().collect();
        assert_eq!(lines[0], "Lista");
        assert_eq!(lines[1], "");
        // "Luis \"Lucho\"" is the widest name (12 chars) plus margin
        let second_column = lines[2].find("Dirección").unwrap();
        assert_eq!(second_column, 14);
        for row in &lines[4..] {
            let start: String = row.chars().skip(14).take(3).collect();
            assert!(start == "Cal" || start == "Av.", "{row}");
        }
    }

    #[test]
    fn long_cells_are_truncated() {
        assert_eq!(fit_cell("Estado de Salud", 8), "Estad...");
        assert_eq!(fit_cell("Sano", 6), "Sano  ");
        assert_eq!(fit_cell("abcdef", 2), "  ");
    }

    #[test]
    fn writes_artifact_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Exporter::new("t", "Animales_Atencion").export(&[], &manifest(), ExportFormat::Delimited);
        let path = artifact.write_to(&dir.path().join("out")).unwrap();
        assert!(path.ends_with("Animales_Atencion.csv"));
        assert_eq!(fs::read_to_string(path).unwrap(), artifact.content);
    }
}
