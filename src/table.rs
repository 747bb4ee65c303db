use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::domain::{AppConfig, EngineError, KennelError, Notification, SourceError};
use crate::entity::EntityProfile;
use crate::export::{ExportArtifact, ExportFormat, Exporter};
use crate::fields::ColumnManifest;
use crate::filter::{FilterState, Predicate};
use crate::paginator::Pagination;
use crate::record::{Record, RecordId};
use crate::selection::{Selection, SelectionState};
use crate::sort::{SortState, stable_sort};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    #[default]
    Selection,
    Filtered,
}

impl ExportScope {
    pub fn toggled(self) -> Self {
        match self {
            ExportScope::Selection => ExportScope::Filtered,
            ExportScope::Filtered => ExportScope::Selection,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportScope::Selection => "selection",
            ExportScope::Filtered => "all matching",
        }
    }
}

#[derive(Debug)]
pub struct TableController {
    profile: EntityProfile,
    records: Vec<Record>,
    search: String,
    filters: FilterState,
    sort: SortState,
    pagination: Pagination,
    selection: Selection,
    manifest: ColumnManifest,
    status: LoadStatus,
    notifications: VecDeque<Notification>,
    exporter: Exporter,
}

impl TableController {
    pub fn new(profile: EntityProfile, config: &AppConfig) -> Result<Self, EngineError> {
        let pagination = Pagination::new(config.page_sizes.clone(), config.page_size)?;
        Ok(Self {
            sort: profile.default_sort.clone(),
            manifest: ColumnManifest::new(profile.fields.clone()),
            exporter: profile.exporter(config.max_column_width),
            profile,
            records: Vec::new(),
            search: String::new(),
            filters: FilterState::default(),
            pagination,
            selection: Selection::default(),
            status: LoadStatus::Idle,
            notifications: VecDeque::new(),
        })
    }

    pub fn profile(&self) -> &EntityProfile {
        &self.profile
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn manifest(&self) -> &ColumnManifest {
        &self.manifest
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    // ---------------------------------------------------------------------
    // Derived views
    // ---------------------------------------------------------------------

    fn predicate(&self) -> Predicate<'_> {
        Predicate::new(
            &self.profile.filters,
            &self.filters,
            &self.profile.search_fields,
            &self.search,
        )
    }

    pub fn filtered(&self) -> Vec<&Record> {
        self.predicate().apply(&self.records)
    }

    pub fn sorted(&self) -> Vec<&Record> {
        let placeholder = self.profile.field(self.sort.key).and_then(|f| f.placeholder);
        stable_sort(&self.filtered(), self.sort.key, self.sort.direction, placeholder)
    }

    pub fn visible_page(&self) -> Vec<&Record> {
        self.pagination.slice(&self.sorted()).to_vec()
    }

    pub fn filtered_count(&self) -> usize {
        let predicate = self.predicate();
        self.records.iter().filter(|r| predicate.matches(r)).count()
    }

    pub fn page_count(&self) -> usize {
        self.pagination.page_count(self.filtered_count())
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state(self.filtered_count())
    }

    pub fn distinct_values(&self, field: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.get(field))
            .filter(|v| !v.is_missing())
            .map(|v| v.to_string().trim().to_string())
            .filter(|v| !v.is_empty() && seen.insert(v.clone()))
            .collect()
    }

    fn visible_ids(&self) -> HashSet<RecordId> {
        self.filtered().iter().map(|r| r.id()).collect()
    }

    fn prune_selection(&mut self) {
        let visible = self.visible_ids();
        self.selection.retain_visible(&visible);
    }

    fn clamp_page(&mut self) {
        let pages = self.page_count();
        if pages > 0 && self.pagination.page_index() >= pages {
            self.pagination.set_page(pages - 1);
        }
    }

    // ---------------------------------------------------------------------
    // Search, filters and sorting
    // ---------------------------------------------------------------------

    pub fn set_search(&mut self, text: &str) {
        debug!("Search {:?}", text);
        self.search = text.to_string();
        self.pagination.reset();
        self.prune_selection();
    }

    pub fn set_filter(&mut self, name: &str, raw: &str) -> Result<(), EngineError> {
        let filter = self
            .profile
            .filter(name)
            .ok_or_else(|| EngineError::UnknownFilter(name.to_string()))?;
        self.filters.set(filter, raw)?;
        debug!("Filter {} = {:?}", name, raw);
        self.pagination.reset();
        self.prune_selection();
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.pagination.reset();
        self.prune_selection();
    }

    pub fn click_header(&mut self, key: &str) -> Result<(), EngineError> {
        let field = self
            .profile
            .field(key)
            .ok_or_else(|| EngineError::UnknownField(key.to_string()))?;
        if !field.sortable {
            return Err(EngineError::NotSortable(key.to_string()));
        }
        self.sort.click(field.name);
        debug!("Sort by {} {:?}", self.sort.key, self.sort.direction);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Pagination
    // ---------------------------------------------------------------------

    pub fn set_page(&mut self, page_index: usize) {
        self.pagination.set_page(page_index);
    }

    pub fn next_page(&mut self) {
        if self.pagination.has_next(self.filtered_count()) {
            self.pagination.set_page(self.pagination.page_index() + 1);
        }
    }

    pub fn prev_page(&mut self) {
        if self.pagination.has_prev() {
            self.pagination.set_page(self.pagination.page_index() - 1);
        }
    }

    pub fn first_page(&mut self) {
        self.pagination.reset();
    }

    pub fn last_page(&mut self) {
        self.pagination.set_page(self.page_count().saturating_sub(1));
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), EngineError> {
        self.pagination.set_page_size(page_size)
    }

    pub fn grow_page_size(&mut self) -> Result<(), EngineError> {
        self.pagination.grow()
    }

    pub fn shrink_page_size(&mut self) -> Result<(), EngineError> {
        self.pagination.shrink()
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    pub fn toggle_row(&mut self, id: RecordId) -> Result<bool, EngineError> {
        if !self.visible_ids().contains(&id) {
            return Err(EngineError::UnknownRecord(id));
        }
        Ok(self.selection.toggle(id))
    }

    pub fn toggle_all(&mut self, select: bool) {
        let visible = self.visible_ids();
        self.selection.toggle_all(select, visible);
    }

    // ---------------------------------------------------------------------
    // Loading and mutations
    // ---------------------------------------------------------------------

    pub fn begin_fetch(&mut self) {
        self.status = LoadStatus::Loading;
    }

    /// Replaces the raw records on success. On failure the previous records
    /// and every piece of view state are kept.
    pub fn finish_fetch(&mut self, result: Result<Vec<Record>, SourceError>) -> Result<usize, SourceError> {
        match result {
            Ok(records) => {
                info!("{} {} loaded", records.len(), self.profile.noun);
                self.records = records;
                self.status = LoadStatus::Idle;
                self.prune_selection();
                self.clamp_page();
                Ok(self.records.len())
            }
            Err(e) => {
                error!("Fetching {} failed: {}", self.profile.noun, e);
                let message = match &e {
                    SourceError::MalformedPayload(_) => "La respuesta de la API no es válida.",
                    _ => self.profile.fetch_failed_message,
                };
                self.status = LoadStatus::Failed(e.to_string());
                self.notify(Notification::error(message));
                Err(e)
            }
        }
    }

    pub fn apply_delete(&mut self, id: RecordId, result: Result<(), SourceError>) -> Result<(), SourceError> {
        match result {
            Ok(()) => {
                info!("Deleted record {}", id);
                self.records.retain(|r| r.id() != id);
                self.selection.remove(id);
                self.clamp_page();
                self.notify(Notification::success(self.profile.deleted_message));
                Ok(())
            }
            Err(e) => {
                error!("Deleting record {} failed: {}", id, e);
                self.notify(Notification::error(self.profile.delete_failed_message));
                Err(e)
            }
        }
    }

    pub fn upsert(&mut self, record: Record) {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.prune_selection();
    }

    // ---------------------------------------------------------------------
    // Export
    // ---------------------------------------------------------------------

    pub fn toggle_column(&mut self, name: &str) -> Result<bool, EngineError> {
        self.manifest.toggle(name)
    }

    fn export_rows(&self, scope: ExportScope) -> Vec<&Record> {
        let sorted = self.sorted();
        match scope {
            ExportScope::Filtered => sorted,
            ExportScope::Selection => sorted
                .into_iter()
                .filter(|r| self.selection.is_selected(r.id()))
                .collect(),
        }
    }

    pub fn request_export(&mut self, scope: ExportScope, format: ExportFormat) -> Result<ExportArtifact, EngineError> {
        let artifact = {
            let rows = self.export_rows(scope);
            (!rows.is_empty()).then(|| self.exporter.export(&rows, &self.manifest, format))
        };
        match artifact {
            Some(artifact) => {
                debug!("Exported {} rows as {}", artifact.rows, artifact.file_name);
                Ok(artifact)
            }
            None => {
                warn!("Export of {} rejected, nothing to export", scope.label());
                self.notify(Notification::warning("No hay registros seleccionados para exportar."));
                Err(EngineError::NothingToExport)
            }
        }
    }

    pub fn export_to(&mut self, dir: &Path, scope: ExportScope, format: ExportFormat) -> Result<PathBuf, KennelError> {
        let artifact = self.request_export(scope, format)?;
        match artifact.write_to(dir) {
            Ok(path) => {
                self.notify(Notification::success(format!(
                    "Archivo {} exportado exitosamente.",
                    artifact.file_name
                )));
                Ok(path)
            }
            Err(e) => {
                error!("Writing {} failed: {}", artifact.file_name, e);
                self.notify(Notification::error(format!("No se pudo guardar {}.", artifact.file_name)));
                Err(e.into())
            }
        }
    }

    // ---------------------------------------------------------------------
    // Notifications
    // ---------------------------------------------------------------------

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }
}
