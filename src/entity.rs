use clap::ValueEnum;

use crate::export::Exporter;
use crate::fields::{FieldDescriptor, format_plain};
use crate::filter::FilterDescriptor;
use crate::record::{ID_FIELD, Record};
use crate::sort::SortState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Animals,
    Adopters,
    Appointments,
}

#[derive(Debug, Clone)]
pub struct EntityProfile {
    pub kind: EntityKind,
    pub title: &'static str,
    pub path: &'static str,
    pub fields: Vec<FieldDescriptor>,
    pub filters: Vec<FilterDescriptor>,
    pub search_fields: Vec<&'static str>,
    pub default_sort: SortState,
    pub export_title: &'static str,
    pub export_stem: &'static str,
    pub noun: &'static str,
    pub fetch_failed_message: &'static str,
    pub deleted_message: &'static str,
    pub delete_failed_message: &'static str,
}

impl EntityProfile {
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Animals => Self::animals(),
            EntityKind::Adopters => Self::adopters(),
            EntityKind::Appointments => Self::appointments(),
        }
    }

    pub fn animals() -> Self {
        Self {
            kind: EntityKind::Animals,
            title: "Animales en Atención",
            path: "/animales",
            fields: vec![
                FieldDescriptor::text("nombre", "Nombre"),
                FieldDescriptor::text("especie", "Especie"),
                FieldDescriptor::number("edad", "Edad").with_formatter(format_age),
                FieldDescriptor::text("genero", "Género").with_placeholder("No especificado"),
                FieldDescriptor::text("estadoSalud", "Estado de Salud"),
                FieldDescriptor::number("adoptanteId", "ID Cliente").with_placeholder("No asignado"),
            ],
            filters: vec![
                FilterDescriptor::equals("especie", "Especie", "especie"),
                FilterDescriptor::equals("estadoSalud", "Estado de Salud", "estadoSalud"),
                FilterDescriptor::equals("genero", "Género", "genero"),
                FilterDescriptor::min("edadMin", "Edad Mínima", "edad"),
                FilterDescriptor::max("edadMax", "Edad Máxima", "edad"),
            ],
            search_fields: vec!["nombre", "especie", "estadoSalud", ID_FIELD],
            default_sort: SortState::ascending("nombre"),
            export_title: "Lista de Animales en Atención",
            export_stem: "Animales_Atencion",
            noun: "animales",
            fetch_failed_message: "Error al obtener animales.",
            deleted_message: "Animal eliminado correctamente.",
            delete_failed_message: "Error al eliminar el animal. Por favor, intenta nuevamente.",
        }
    }

    pub fn adopters() -> Self {
        Self {
            kind: EntityKind::Adopters,
            title: "Lista de Clientes",
            path: "/adoptantes",
            fields: vec![
                FieldDescriptor::number(ID_FIELD, "ID"),
                FieldDescriptor::text("nombre", "Nombre"),
                FieldDescriptor::text("email", "Email"),
                FieldDescriptor::text("direccion", "Dirección"),
                FieldDescriptor::text("telefono", "Teléfono"),
            ],
            filters: Vec::new(),
            search_fields: vec![ID_FIELD, "nombre", "email", "telefono"],
            default_sort: SortState::ascending(ID_FIELD),
            export_title: "Lista de Clientes",
            export_stem: "Lista_Clientes",
            noun: "clientes",
            fetch_failed_message: "Error al obtener los Clientes. Por favor, verifica la conexión con la API.",
            deleted_message: "Cliente eliminado exitosamente.",
            delete_failed_message: "Error al eliminar el Cliente. Por favor, intenta nuevamente.",
        }
    }

    pub fn appointments() -> Self {
        Self {
            kind: EntityKind::Appointments,
            title: "Citas",
            path: "/citas",
            fields: vec![
                FieldDescriptor::number(ID_FIELD, "ID"),
                FieldDescriptor::text("fechaCita", "Fecha y Hora"),
                FieldDescriptor::text("motivo", "Motivo"),
                FieldDescriptor::text("veterinario", "Veterinario"),
                FieldDescriptor::text("estado", "Estado").with_placeholder("Pendiente"),
                FieldDescriptor::number("animalId", "ID Animal"),
            ],
            filters: vec![
                FilterDescriptor::equals("estado", "Estado", "estado"),
                FilterDescriptor::equals("veterinario", "Veterinario", "veterinario"),
                FilterDescriptor::equals("animalId", "ID Animal", "animalId"),
            ],
            search_fields: vec![ID_FIELD, "motivo", "veterinario", "estado"],
            default_sort: SortState::ascending("fechaCita"),
            export_title: "Lista de Citas",
            export_stem: "Lista_Citas",
            noun: "citas",
            fetch_failed_message: "Error al obtener las citas.",
            deleted_message: "Cita eliminada exitosamente.",
            delete_failed_message: "Error al eliminar la cita. Por favor, intenta nuevamente.",
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn filter(&self, name: &str) -> Option<&FilterDescriptor> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn exporter(&self, max_column_width: usize) -> Exporter {
        Exporter::new(self.export_title, self.export_stem).max_column_width(max_column_width)
    }
}

pub fn format_age(field: &FieldDescriptor, record: &Record) -> String {
    let age = format_plain(field, record);
    match record.get("unidadEdad").as_text().map(str::trim) {
        Some(unit) if !age.is_empty() && !unit.is_empty() => format!("{age} {unit}"),
        _ => age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;

    #[test]
    fn age_is_rendered_with_unit() {
        let profile = EntityProfile::animals();
        let edad = profile.field("edad").unwrap();
        let record = Record::new(RecordId(1))
            .with("edad", 3i64)
            .with("unidadEdad", "años");
        assert_eq!(edad.format(&record), "3 años");

        let record = Record::new(RecordId(2)).with("edad", 8i64);
        assert_eq!(edad.format(&record), "8");
    }

    #[test]
    fn profiles_reference_their_own_fields() {
        for kind in [EntityKind::Animals, EntityKind::Adopters, EntityKind::Appointments] {
            let profile = EntityProfile::for_kind(kind);
            assert!(profile.field(profile.default_sort.key).is_some(), "{kind:?}");
            for filter in profile.filters.iter() {
                assert!(profile.field(filter.field).is_some(), "{kind:?} {}", filter.name);
            }
        }
    }

    #[test]
    fn export_names_are_fixed_per_entity() {
        let exporter = EntityProfile::animals().exporter(30);
        assert_eq!(exporter.title, "Lista de Animales en Atención");
        assert_eq!(exporter.file_stem, "Animales_Atencion");
        assert_eq!(exporter.max_column_width, 30);
    }
}
