use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::domain::{AppConfig, CMDMode, HELP_TEXT, KennelError, Message, Notification, NotificationLevel};
use crate::export::ExportFormat;
use crate::filter::FilterKind;
use crate::inputter::{InputResult, Inputter};
use crate::record::{Record, RecordId};
use crate::session::Session;
use crate::source::RecordSource;
use crate::table::{ExportScope, TableController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Loading,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modus {
    Table,
    Popup,
    CmdInput,
    ColumnPicker,
}

pub struct Model {
    config: AppConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: TableController,
    source: Box<dyn RecordSource>,
    session: Session,
    pending_fetch: bool,
    cursor_row: usize,
    picker_row: usize,
    export_scope: ExportScope,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    popup_message: String,
    status_message: String,
    status_level: NotificationLevel,
    last_status_message_update: Instant,
    ui_size: (usize, usize),
}

impl Model {
    pub fn init(
        config: &AppConfig,
        table: TableController,
        source: Box<dyn RecordSource>,
        session: Session,
    ) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                warn!("Clipboard not available: {e}");
                None
            }
        };
        let mut model = Self {
            config: config.clone(),
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            table,
            source,
            session,
            pending_fetch: false,
            cursor_row: 0,
            picker_row: 0,
            export_scope: ExportScope::default(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            popup_message: String::new(),
            status_message: String::new(),
            status_level: NotificationLevel::Success,
            last_status_message_update: Instant::now(),
            ui_size: (0, 0),
        };
        model.request_fetch();
        model
    }

    // ----------------------------- Accessors ------------------------------ //

    pub fn table(&self) -> &TableController {
        &self.table
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn picker_row(&self) -> usize {
        self.picker_row
    }

    pub fn export_scope(&self) -> ExportScope {
        self.export_scope
    }

    pub fn popup_message(&self) -> &str {
        &self.popup_message
    }

    pub fn status_message(&self) -> (&str, NotificationLevel) {
        (&self.status_message, self.status_level)
    }

    pub fn status_message_age(&self) -> Duration {
        self.last_status_message_update.elapsed()
    }

    pub fn cmd_line(&self) -> Option<(CMDMode, &InputResult)> {
        self.cmd_mode
            .filter(|_| self.active_cmdinput)
            .map(|mode| (mode, &self.last_input))
    }

    pub fn user(&self) -> Option<&str> {
        self.session.user_id()
    }

    pub fn source_name(&self) -> String {
        self.source.describe()
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn set_status_message(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_level = level;
        self.last_status_message_update = Instant::now();
        trace!("Status message: {}", self.status_message);
    }

    fn sync_notifications(&mut self) {
        if let Some(last) = self.table.drain_notifications().pop() {
            self.set_status_message(last.level, last.message);
        }
    }

    // ------------------------------ Loading ------------------------------- //

    /// Marks the table as loading. The request itself runs on the next
    /// `update`, after the loading state has been drawn once.
    pub fn request_fetch(&mut self) {
        if let Err(e) = self.session.require() {
            info!("Not loading records: {e}");
            self.set_status_message(
                NotificationLevel::Warning,
                "Inicia sesión para ver los registros (kennel --user <id>).",
            );
            return;
        }
        self.table.begin_fetch();
        self.pending_fetch = true;
        self.status = Status::Loading;
        self.set_status_message(NotificationLevel::Success, "Cargando ...");
    }

    fn fetch(&mut self) {
        self.pending_fetch = false;
        let start = Instant::now();
        let result = self.source.list();
        match self.table.finish_fetch(result) {
            Ok(count) => self.set_status_message(
                NotificationLevel::Success,
                format!("{} registros cargados en {}ms", count, start.elapsed().as_millis()),
            ),
            Err(e) => debug!("Fetch failed: {e}"),
        }
        self.status = Status::Ready;
        self.clamp_cursor();
    }

    // ------------------------------ Updates ------------------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), KennelError> {
        if self.pending_fetch {
            self.fetch();
        }

        if let Some(msg) = message {
            match self.modus {
                Modus::Table => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_cursor_down(),
                    Message::MoveUp => self.move_cursor_up(),
                    Message::NextPage => self.change_page(TableController::next_page),
                    Message::PrevPage => self.change_page(TableController::prev_page),
                    Message::FirstPage => self.change_page(TableController::first_page),
                    Message::LastPage => self.change_page(TableController::last_page),
                    Message::GrowPageSize => self.change_page_size(true),
                    Message::ShrinkPageSize => self.change_page_size(false),
                    Message::SortBy(column) => self.sort_by(column),
                    Message::ToggleRow => self.toggle_row(),
                    Message::ToggleAll => self.toggle_all(),
                    Message::DeleteRow => self.delete_row(),
                    Message::ExportDocument => self.export(ExportFormat::Document),
                    Message::ExportDelimited => self.export(ExportFormat::Delimited),
                    Message::ToggleExportScope => self.toggle_export_scope(),
                    Message::ColumnPicker => self.enter_column_picker(),
                    Message::CopySelection => self.copy_selection(),
                    Message::Refresh => self.request_fetch(),
                    Message::Help => self.show_help(),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                    Message::ClearFilters => self.clear_filters(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::ColumnPicker => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_picker(1),
                    Message::MoveUp => self.move_picker(-1),
                    Message::ToggleRow | Message::Enter => self.toggle_picked_column(),
                    Message::Exit | Message::ColumnPicker => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::Popup => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CmdInput => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        self.sync_notifications();
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_size.0, width, self.ui_size.1, height
        );
        self.ui_size = (width, height);
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::Table | Modus::CmdInput => {}
            Modus::Popup | Modus::ColumnPicker => {
                trace!("Leaving {:?}", self.modus);
                self.modus = self.previous_modus;
                self.previous_modus = Modus::Popup;
                self.popup_message.clear();
            }
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup_message = HELP_TEXT.to_string();
    }

    // --------------------------- Command line ----------------------------- //

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?}", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        match mode {
            CMDMode::Search => {
                let current = self.table.search().to_string();
                self.input.set(&current);
            }
            CMDMode::Filter => {
                if self.table.profile().filters.is_empty() {
                    self.set_status_message(NotificationLevel::Warning, "Esta lista no tiene filtros.");
                } else {
                    let hint = self.filter_hint();
                    self.set_status_message(NotificationLevel::Success, hint);
                }
            }
        }
        self.last_input = self.input.get();
    }

    // "especie: Perro, Gato | estadoSalud: Sano | edadMin | edadMax"
    fn filter_hint(&self) -> String {
        self.table
            .profile()
            .filters
            .iter()
            .map(|f| {
                let options = self.table.distinct_values(f.field);
                match f.kind {
                    FilterKind::Equals if !options.is_empty() => {
                        format!("{}: {}", f.name, options.join(", "))
                    }
                    _ => f.name.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CmdInput;

        let cmd_input = self.last_input.input.clone();
        let mode = self.cmd_mode.take();
        if self.last_input.canceled {
            return;
        }
        match mode {
            Some(CMDMode::Search) => {
                self.table.set_search(&cmd_input);
                self.cursor_row = 0;
            }
            Some(CMDMode::Filter) => self.apply_filter_command(&cmd_input),
            None => info!("Cmd mode is none!"),
        }
    }

    /// `name=value` sets a filter, `name=` unsets it.
    fn apply_filter_command(&mut self, command: &str) {
        let Some((name, value)) = command.split_once('=') else {
            self.set_status_message(
                NotificationLevel::Error,
                format!("Filtro inválido \"{command}\", usa nombre=valor"),
            );
            return;
        };
        match self.table.set_filter(name.trim(), value) {
            Ok(()) => {
                self.cursor_row = 0;
                let count = self.table.filtered_count();
                self.set_status_message(NotificationLevel::Success, format!("{count} registros coinciden"));
            }
            Err(e) => {
                warn!("Filter rejected: {e}");
                self.set_status_message(NotificationLevel::Error, e.to_string());
            }
        }
    }

    fn clear_filters(&mut self) {
        self.table.clear_filters();
        self.cursor_row = 0;
        self.set_status_message(NotificationLevel::Success, "Filtros borrados");
    }

    // ------------------------- Table navigation --------------------------- //

    fn visible_len(&self) -> usize {
        self.table.visible_page().len()
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible_len();
        self.cursor_row = self.cursor_row.min(len.saturating_sub(1));
    }

    fn move_cursor_down(&mut self) {
        if self.cursor_row + 1 < self.visible_len() {
            self.cursor_row += 1;
        }
    }

    fn move_cursor_up(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
    }

    fn change_page(&mut self, action: fn(&mut TableController)) {
        action(&mut self.table);
        self.clamp_cursor();
    }

    fn change_page_size(&mut self, grow: bool) {
        let before = self.table.pagination().page_size();
        let result = if grow {
            self.table.grow_page_size()
        } else {
            self.table.shrink_page_size()
        };
        match result {
            Ok(()) => {
                let size = self.table.pagination().page_size();
                if size != before {
                    self.cursor_row = 0;
                }
                self.set_status_message(NotificationLevel::Success, format!("{size} filas por página"));
            }
            Err(e) => error!("Changing page size failed: {e}"),
        }
    }

    fn current_record_id(&self) -> Option<RecordId> {
        self.table.visible_page().get(self.cursor_row).map(|r| r.id())
    }

    fn sort_by(&mut self, column: usize) {
        let Some(name) = self.table.manifest().included().nth(column).map(|f| f.name) else {
            trace!("No column {column} to sort by");
            return;
        };
        if let Err(e) = self.table.click_header(name) {
            self.set_status_message(NotificationLevel::Error, e.to_string());
        }
    }

    fn toggle_row(&mut self) {
        if let Some(id) = self.current_record_id()
            && let Err(e) = self.table.toggle_row(id)
        {
            error!("Toggle row failed: {e}");
        }
        if self.cursor_row + 1 < self.visible_len() {
            self.cursor_row += 1;
        }
    }

    fn toggle_all(&mut self) {
        let select = self.table.selection().count() < self.table.filtered_count();
        self.table.toggle_all(select);
    }

    fn delete_row(&mut self) {
        let Some(id) = self.current_record_id() else {
            return;
        };
        let result = self.source.delete(id);
        if self.table.apply_delete(id, result).is_ok() {
            self.clamp_cursor();
        }
    }

    // ------------------------------ Export -------------------------------- //

    fn toggle_export_scope(&mut self) {
        self.export_scope = self.export_scope.toggled();
        self.set_status_message(
            NotificationLevel::Success,
            format!("Exportar: {}", self.export_scope.label()),
        );
    }

    fn export(&mut self, format: ExportFormat) {
        let dir = self.config.export_dir.clone();
        if let Err(e) = self.table.export_to(&dir, self.export_scope, format) {
            debug!("Export failed: {e}");
        }
    }

    fn copy_selection(&mut self) {
        let artifact = match self.table.request_export(self.export_scope, ExportFormat::Delimited) {
            Ok(artifact) => artifact,
            Err(e) => {
                debug!("Nothing copied: {e}");
                return;
            }
        };
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.table.notify(Notification::error("Portapapeles no disponible."));
            return;
        };
        match clipboard.set_text(artifact.content) {
            Ok(_) => {
                trace!("Copied {} rows to clipboard.", artifact.rows);
                self.table
                    .notify(Notification::success(format!("{} filas copiadas.", artifact.rows)));
            }
            Err(e) => {
                error!("Error copying to clipboard: {:?}", e);
                self.table.notify(Notification::error("No se pudo copiar al portapapeles."));
            }
        }
    }

    fn enter_column_picker(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::ColumnPicker;
        self.picker_row = 0;
    }

    fn move_picker(&mut self, step: isize) {
        let len = self.table.manifest().len();
        if len == 0 {
            return;
        }
        self.picker_row = self.picker_row.saturating_add_signed(step).min(len - 1);
    }

    fn toggle_picked_column(&mut self) {
        let Some(name) = self.table.manifest().entries().get(self.picker_row).map(|e| e.field.name) else {
            return;
        };
        if let Err(e) = self.table.toggle_column(name) {
            error!("Toggle column failed: {e}");
        }
    }

    pub fn page_rows(&self) -> Vec<&Record> {
        self.table.visible_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityProfile;
    use crate::source::MemorySource;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::path::Path;

    fn animals() -> Vec<Record> {
        [("Luna", "Perro", 3), ("Michi", "Gato", 1), ("Rocky", "Perro", 7)]
            .iter()
            .enumerate()
            .map(|(i, (name, species, age))| {
                Record::new(RecordId(i as u64 + 1))
                    .with("nombre", *name)
                    .with("especie", *species)
                    .with("edad", *age as i64)
            })
            .collect()
    }

    fn model(dir: &Path, logged_in: bool, source: MemorySource) -> Model {
        let config = AppConfig::default().export_dir(dir.join("exports"));
        let mut session = Session::init(dir.join("session.json")).unwrap();
        if logged_in {
            session.login("7").unwrap();
        }
        let table = TableController::new(EntityProfile::animals(), &config).unwrap();
        let mut model = Model::init(&config, table, Box::new(source), session);
        model.update(None).unwrap();
        model
    }

    fn type_line(model: &mut Model, line: &str) {
        for c in line.chars() {
            let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
            model.update(Some(Message::RawKey(key))).unwrap();
        }
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        model.update(Some(Message::RawKey(enter))).unwrap();
    }

    #[test]
    fn records_are_not_loaded_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let model = model(dir.path(), false, MemorySource::new(animals()));
        assert!(model.table().records().is_empty());
        assert_eq!(model.status_message().1, NotificationLevel::Warning);
    }

    #[test]
    fn loads_on_first_update() {
        let dir = tempfile::tempdir().unwrap();
        let model = model(dir.path(), true, MemorySource::new(animals()));
        assert_eq!(model.status, Status::Ready);
        assert_eq!(model.page_rows().len(), 3);
        assert_eq!(model.user(), Some("7"));
    }

    #[test]
    fn failed_load_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::new(animals());
        source.fail_with("offline");
        let model = model(dir.path(), true, source);
        assert_eq!(
            model.status_message(),
            ("Error al obtener animales.", NotificationLevel::Error)
        );
    }

    #[test]
    fn search_and_filter_through_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path(), true, MemorySource::new(animals()));

        model.update(Some(Message::Search)).unwrap();
        assert!(model.raw_keyevents());
        type_line(&mut model, "mi");
        assert!(!model.raw_keyevents());
        assert_eq!(model.table().search(), "mi");
        assert_eq!(model.page_rows().len(), 1);

        model.update(Some(Message::Search)).unwrap();
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        model.update(Some(Message::RawKey(esc))).unwrap();
        assert_eq!(model.table().search(), "mi");

        model.update(Some(Message::Search)).unwrap();
        let backspace = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);
        model.update(Some(Message::RawKey(backspace))).unwrap();
        model.update(Some(Message::RawKey(backspace))).unwrap();
        type_line(&mut model, "");
        assert_eq!(model.page_rows().len(), 3);

        model.update(Some(Message::Filter)).unwrap();
        type_line(&mut model, "especie=perro");
        assert_eq!(model.page_rows().len(), 2);
        assert_eq!(model.status_message().0, "2 registros coinciden");

        model.update(Some(Message::Filter)).unwrap();
        type_line(&mut model, "edadMin");
        assert_eq!(model.status_message().1, NotificationLevel::Error);
        assert_eq!(model.page_rows().len(), 2);

        model.update(Some(Message::ClearFilters)).unwrap();
        assert_eq!(model.page_rows().len(), 3);
    }

    #[test]
    fn delete_goes_through_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path(), true, MemorySource::new(animals()));
        // sorted by name: Luna, Michi, Rocky
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::DeleteRow)).unwrap();
        let names: Vec<String> = model.page_rows().iter().map(|r| r.get("nombre").to_string()).collect();
        assert_eq!(names, ["Luna", "Rocky"]);
        assert_eq!(
            model.status_message(),
            ("Animal eliminado correctamente.", NotificationLevel::Success)
        );

        // a reload sees the delete as well
        model.update(Some(Message::Refresh)).unwrap();
        model.update(None).unwrap();
        assert_eq!(model.table().records().len(), 2);
    }

    #[test]
    fn export_selection_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path(), true, MemorySource::new(animals()));
        model.update(Some(Message::ExportDelimited)).unwrap();
        assert_eq!(model.status_message().1, NotificationLevel::Warning);

        model.update(Some(Message::ToggleRow)).unwrap();
        model.update(Some(Message::ExportDelimited)).unwrap();
        let content = std::fs::read_to_string(dir.path().join("exports").join("Animales_Atencion.csv")).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().nth(1).unwrap().starts_with("Luna,Perro,3"));

        model.update(Some(Message::ToggleExportScope)).unwrap();
        assert_eq!(model.export_scope(), ExportScope::Filtered);
        model.update(Some(Message::ExportDocument)).unwrap();
        let doc = std::fs::read_to_string(dir.path().join("exports").join("Animales_Atencion.txt")).unwrap();
        assert_eq!(doc.lines().count(), 7);
    }

    #[test]
    fn column_picker_toggles_export_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path(), true, MemorySource::new(animals()));
        model.update(Some(Message::ColumnPicker)).unwrap();
        assert_eq!(model.modus(), Modus::ColumnPicker);
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::ToggleRow)).unwrap();
        model.update(Some(Message::Exit)).unwrap();
        assert_eq!(model.modus(), Modus::Table);
        assert!(!model.table().manifest().is_included("especie"));
    }

    #[test]
    fn sort_keys_follow_visible_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path(), true, MemorySource::new(animals()));
        model.update(Some(Message::SortBy(2))).unwrap();
        assert_eq!(model.table().sort().key, "edad");
        let first = model.page_rows()[0].get("nombre").to_string();
        assert_eq!(first, "Michi");
        model.update(Some(Message::SortBy(8))).unwrap();
        assert_eq!(model.table().sort().key, "edad");
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path(), true, MemorySource::new(animals()));
        model.update(Some(Message::Help)).unwrap();
        assert_eq!(model.modus(), Modus::Popup);
        assert!(model.popup_message().contains("quit"));
        model.update(Some(Message::Exit)).unwrap();
        assert_eq!(model.modus(), Modus::Table);
    }
}
