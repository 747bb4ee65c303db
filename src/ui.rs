use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::{AppConfig, CMDMode, NotificationLevel};
use crate::fields::FieldKind;
use crate::model::{Model, Modus};
use crate::selection::SelectionState;
use crate::table::LoadStatus;

pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const CHECKBOX_WIDTH: u16 = 3;
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(8);

pub struct TableUI {
    max_column_width: usize,
}

fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

fn header_checkbox(state: SelectionState) -> &'static str {
    match state {
        SelectionState::None => "[ ]",
        SelectionState::Partial => "[-]",
        SelectionState::All => "[x]",
    }
}

fn aligned(kind: FieldKind, text: String) -> Line<'static> {
    match kind {
        FieldKind::Number => Line::from(text).right_aligned(),
        FieldKind::Text => Line::from(text),
    }
}

fn level_color(level: NotificationLevel) -> Color {
    match level {
        NotificationLevel::Success => Color::Green,
        NotificationLevel::Warning => Color::Yellow,
        NotificationLevel::Error => Color::Red,
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

impl TableUI {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let [title_area, table_area, footer_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_title(model, frame, title_area);
        self.draw_table(model, frame, table_area);
        self.draw_footer(model, frame, footer_area);
        self.draw_statusline(model, frame, status_area);

        match model.modus() {
            Modus::Popup => self.draw_popup(model, frame),
            Modus::ColumnPicker => self.draw_column_picker(model, frame),
            Modus::Table | Modus::CmdInput => {}
        }
    }

    fn draw_title(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let profile = model.table().profile();
        let user = model.user().map(|u| format!(" usuario {u} ")).unwrap_or_default();
        let line = Line::from(vec![
            Span::from(format!(" {} ", profile.title)).bold(),
            Span::from(format!("({})", model.source_name())).dark_gray(),
            Span::from(user).cyan(),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn column_width(&self, label: &str, cells: &[String]) -> u16 {
        let widest = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);
        let width = std::cmp::max(label.chars().count() + 2, widest) + COLUMN_WIDTH_MARGIN;
        std::cmp::min(width, self.max_column_width) as u16
    }

    fn draw_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let table = model.table();
        match table.status() {
            LoadStatus::Loading => {
                frame.render_widget(Paragraph::new("Cargando ...").centered(), area);
                return;
            }
            LoadStatus::Failed(reason) if table.records().is_empty() => {
                frame.render_widget(
                    Paragraph::new(format!("Error: {reason}"))
                        .centered()
                        .red()
                        .wrap(Wrap { trim: true }),
                    area,
                );
                return;
            }
            _ => {}
        }

        let rows = model.page_rows();
        if rows.is_empty() {
            frame.render_widget(Paragraph::new("No hay registros.").centered(), area);
            return;
        }

        let fields: Vec<_> = table.manifest().included().collect();
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|record| fields.iter().map(|f| f.format(record)).collect())
            .collect();

        let sort = table.sort();
        let headers: Vec<Cell> = std::iter::once(Cell::from(header_checkbox(table.selection_state())))
            .chain(fields.iter().enumerate().map(|(idx, f)| {
                let arrow = if f.name == sort.key { sort.direction.arrow() } else { "" };
                Cell::from(format!("{} {}{}", idx + 1, f.label, arrow))
            }))
            .collect();

        let mut widths = vec![Constraint::Length(CHECKBOX_WIDTH)];
        widths.extend(fields.iter().enumerate().map(|(idx, f)| {
            let column: Vec<String> = cells.iter().map(|row| row[idx].clone()).collect();
            Constraint::Length(self.column_width(f.label, &column))
        }));

        let body: Vec<Row> = rows
            .iter()
            .zip(cells)
            .map(|(record, row)| {
                let selected = table.selection().is_selected(record.id());
                let mut row_cells = vec![Cell::from(checkbox(selected))];
                row_cells.extend(
                    row.into_iter()
                        .zip(fields.iter())
                        .map(|(text, f)| Cell::from(aligned(f.kind, text))),
                );
                Row::new(row_cells)
            })
            .collect();

        let widget = Table::new(body, widths)
            .column_spacing(1)
            .header(Row::new(headers).bold().underlined())
            .row_highlight_style(Style::new().bg(Color::Blue));
        let mut state = TableState::default().with_selected(Some(model.cursor_row()));
        frame.render_stateful_widget(widget, area, &mut state);
    }

    fn draw_footer(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let table = model.table();
        let pagination = table.pagination();
        let len = table.filtered_count();
        let mut parts = vec![
            pagination.page_info(len),
            pagination.range_info(len),
            format!("{} por página", pagination.page_size()),
            format!("{} seleccionados", table.selection().count()),
            format!("exportar: {}", model.export_scope().label()),
        ];
        if !table.search().is_empty() {
            parts.push(format!("búsqueda \"{}\"", table.search()));
        }
        if !table.filters().is_empty() {
            let filters: Vec<String> = table
                .filters()
                .iter()
                .map(|(name, value)| format!("{name}={value:?}"))
                .collect();
            parts.push(filters.join(" "));
        }
        frame.render_widget(Paragraph::new(format!(" {}", parts.join(" | "))).reversed(), area);
    }

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if let Some((mode, input)) = model.cmd_line() {
            let prompt = match mode {
                CMDMode::Search => "/",
                CMDMode::Filter => "filtro: ",
            };
            frame.render_widget(Paragraph::new(format!("{prompt}{}", input.input)), area);
            let x = area.x + (prompt.chars().count() + input.cursor_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let (message, level) = model.status_message();
        if model.status_message_age() > STATUS_MESSAGE_TIMEOUT && level == NotificationLevel::Success {
            frame.render_widget(Paragraph::new(" ? ayuda").dark_gray(), area);
        } else {
            frame.render_widget(Paragraph::new(message.to_string()).fg(level_color(level)), area);
        }
    }

    fn draw_popup(&self, model: &Model, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, 80);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(model.popup_message()).block(Block::bordered().title(" Help ")),
            area,
        );
    }

    fn draw_column_picker(&self, model: &Model, frame: &mut Frame) {
        let area = popup_area(frame.area(), 40, 60);
        let lines: Vec<Line> = model
            .table()
            .manifest()
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let line = Line::from(format!("{} {}", checkbox(entry.included), entry.field.label));
                if idx == model.picker_row() {
                    line.style(Style::new().bg(Color::Blue))
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines).block(Block::bordered().title(" Columnas exportadas ")),
            area,
        );
    }
}
