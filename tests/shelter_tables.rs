use std::path::{Path, PathBuf};

use kennel::domain::{AppConfig, EngineError, NotificationLevel, SourceError};
use kennel::entity::EntityProfile;
use kennel::export::ExportFormat;
use kennel::record::{Record, RecordId};
use kennel::selection::SelectionState;
use kennel::source::{FileSource, MemorySource, RecordSource};
use kennel::table::{ExportScope, LoadStatus, TableController};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn load(profile: EntityProfile, file: &str) -> TableController {
    let mut source = FileSource::new(fixture(file));
    let mut table = TableController::new(profile, &AppConfig::default()).unwrap();
    table.begin_fetch();
    table.finish_fetch(source.list()).unwrap();
    table
}

fn ids(records: &[&Record]) -> Vec<u64> {
    records.iter().map(|r| r.id().0).collect()
}

fn cells(table: &TableController, record: &Record) -> Vec<String> {
    table.manifest().included().map(|f| f.format(record)).collect()
}

#[test]
fn json_and_csv_fixtures_render_the_same() {
    let from_json = load(EntityProfile::animals(), "animales.json");
    let from_csv = load(EntityProfile::animals(), "animales.csv");

    assert_eq!(from_json.records().len(), 7);
    assert_eq!(ids(&from_json.sorted()), ids(&from_csv.sorted()));
    for (a, b) in from_json.sorted().iter().zip(from_csv.sorted().iter()) {
        assert_eq!(cells(&from_json, a), cells(&from_csv, b));
    }
}

#[test]
fn placeholders_and_age_units() {
    let table = load(EntityProfile::animals(), "animales.csv");
    let michi = table.records().iter().find(|r| r.id() == RecordId(2)).unwrap();
    assert_eq!(
        cells(&table, michi),
        ["Michi", "Gato", "1 años", "No especificado", "En tratamiento", "No asignado"]
    );
    let kira = table.records().iter().find(|r| r.id() == RecordId(6)).unwrap();
    assert_eq!(cells(&table, kira)[2], "8 meses");
}

#[test]
fn filters_search_and_pages() {
    let mut table = load(EntityProfile::animals(), "animales.json");

    table.set_filter("genero", "HEMBRA").unwrap();
    assert_eq!(ids(&table.sorted()), vec![6, 1, 4]);

    table.set_filter("edadMin", "4").unwrap();
    assert_eq!(ids(&table.sorted()), vec![6, 4]);

    table.clear_filters();
    table.set_filter("estadoSalud", "sano").unwrap();
    table.set_search("perro");
    assert_eq!(ids(&table.sorted()), vec![1, 3]);

    table.set_search("");
    table.clear_filters();
    assert_eq!(table.page_count(), 2);
    table.next_page();
    table.next_page();
    assert_eq!(table.pagination().page_index(), 1);
    assert_eq!(ids(&table.visible_page()), vec![3, 5]);
}

#[test]
fn unknown_gender_sorts_as_shown() {
    let mut table = load(EntityProfile::animals(), "animales.json");
    table.click_header("genero").unwrap();
    assert_eq!(ids(&table.sorted()), vec![1, 6, 3, 5, 7, 2, 4]);
}

#[test]
fn distinct_options_for_filters() {
    let table = load(EntityProfile::animals(), "animales.json");
    assert_eq!(table.distinct_values("especie"), ["Perro", "Gato", "Conejo"]);
    assert_eq!(
        table.distinct_values("estadoSalud"),
        ["Sano", "En tratamiento", "En observación"]
    );
}

#[test]
fn delete_flow_against_memory_source() {
    let records = FileSource::new(fixture("animales.json")).list().unwrap();
    let mut source = MemorySource::new(records);
    let mut table = TableController::new(EntityProfile::animals(), &AppConfig::default()).unwrap();
    table.finish_fetch(source.list()).unwrap();
    table.toggle_all(true);

    source.fail_with("timeout");
    let failed = source.delete(RecordId(3));
    assert!(table.apply_delete(RecordId(3), failed).is_err());
    assert!(table.selection().is_selected(RecordId(3)));

    source.recover();
    let done = source.delete(RecordId(3));
    table.apply_delete(RecordId(3), done).unwrap();
    assert!(!table.selection().is_selected(RecordId(3)));
    assert_eq!(table.selection_state(), SelectionState::All);

    let levels: Vec<NotificationLevel> = table.drain_notifications().iter().map(|n| n.level).collect();
    assert_eq!(levels, [NotificationLevel::Error, NotificationLevel::Success]);

    table.begin_fetch();
    table.finish_fetch(source.list()).unwrap();
    assert_eq!(table.records().len(), 6);
    assert_eq!(table.status(), &LoadStatus::Idle);
}

#[test]
fn adopter_export_matches_screen() {
    let mut table = load(EntityProfile::adopters(), "adoptantes.json");
    assert_eq!(ids(&table.sorted()), vec![1, 2, 4]);

    let artifact = table
        .request_export(ExportScope::Filtered, ExportFormat::Delimited)
        .unwrap();
    assert_eq!(artifact.file_name, "Lista_Clientes.csv");
    let expected = "ID,Nombre,Email,Dirección,Teléfono\n\
                    1,\"Luis \"\"Lucho\"\" Paz\",luis@example.com,Av. Sol 45,\n\
                    2,Ana Torres,ana@example.com,\"Calle 1, Lima\",999 111 222\n\
                    4,Marta Ruiz,marta@example.com,Jr. Luna 3,988 000 111\n";
    assert_eq!(artifact.content, expected);

    let document = table
        .request_export(ExportScope::Filtered, ExportFormat::Document)
        .unwrap();
    let lines: Vec<&str> = document.content.lines().collect();
    assert_eq!(lines[0], "Lista de Clientes");
    assert!(lines[4].starts_with("1   Luis \"Lucho\" Paz"));
    assert_eq!(lines.len(), 7);
}

#[test]
fn selection_export_needs_a_selection() {
    let mut table = load(EntityProfile::adopters(), "adoptantes.json");
    assert_eq!(
        table.request_export(ExportScope::Selection, ExportFormat::Document),
        Err(EngineError::NothingToExport)
    );
    table.toggle_row(RecordId(4)).unwrap();
    let artifact = table
        .request_export(ExportScope::Selection, ExportFormat::Delimited)
        .unwrap();
    assert_eq!(artifact.rows, 1);
}

#[test]
fn malformed_file_keeps_table_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("citas.json");
    std::fs::write(&path, r#"[{"id": 1}, {"id": 1}]"#).unwrap();

    let mut table = TableController::new(EntityProfile::appointments(), &AppConfig::default()).unwrap();
    table.begin_fetch();
    let result = table.finish_fetch(FileSource::new(&path).list());
    assert!(matches!(result, Err(SourceError::MalformedPayload(_))));
    assert!(table.records().is_empty());
    assert!(matches!(table.status(), LoadStatus::Failed(_)));
}
