//! Patient table pane.

use anagrafe_core::{
  persistence::KeyValueStore,
  view::{NOTE_PREVIEW_CHARS, NoteCell, RowView, TableView},
};
use ratatui::{
  Frame,
  layout::{Constraint, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span, Text},
  widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

use crate::app::{App, Focus};

const HEADERS: [&str; 7] = [
  "Nome",
  "Cognome",
  "Codice Fiscale",
  "N. Cartella",
  "Data Registrazione",
  "Note",
  "Azioni",
];

/// Render the table into `area`.
pub fn draw<K: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<K>) {
  let visible = app.visible_rows();
  let total = app.table.rows().len();

  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" Pazienti ({}/{}) ", visible.len(), total)
  } else {
    format!(" Pazienti ({}) ", total)
  };

  let border = if app.focus == Focus::Table && app.pending.is_none() {
    Color::Cyan
  } else {
    Color::DarkGray
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  // Filter bar at the bottom of the pane.
  if (app.filter_active || !app.filter.is_empty()) && inner_area.height > 2 {
    let filter_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let filter_text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(filter_text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  let header = Row::new(HEADERS.map(|h| {
    Cell::from(h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
  }));

  if let TableView::Empty { message } = app.table {
    let table = Table::new(Vec::<Row>::new(), widths()).header(header);
    f.render_widget(table, inner_area);
    let placeholder_area = Rect {
      y: inner_area.y + 1,
      height: inner_area.height.saturating_sub(1),
      ..inner_area
    };
    f.render_widget(
      Paragraph::new(message)
        .alignment(ratatui::layout::Alignment::Center)
        .style(Style::default().fg(Color::DarkGray)),
      placeholder_area,
    );
    return;
  }

  let rows: Vec<Row> = visible.iter().map(|r| table_row(r)).collect();

  let mut state = TableState::default();
  state.select(if visible.is_empty() { None } else { Some(app.cursor) });

  let table = Table::new(rows, widths())
    .header(header)
    .row_highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    );
  f.render_stateful_widget(table, inner_area, &mut state);
}

fn widths() -> [Constraint; 7] {
  [
    Constraint::Length(14),
    Constraint::Length(14),
    Constraint::Length(16),
    Constraint::Length(11),
    Constraint::Length(18),
    Constraint::Min(NOTE_PREVIEW_CHARS as u16 + 5),
    Constraint::Length(22),
  ]
}

fn table_row(r: &RowView) -> Row<'static> {
  let note = note_text(&r.note);
  let height = note.height().max(1) as u16;

  let enabled = Style::default().fg(Color::White);
  let disabled = Style::default().fg(Color::DarkGray);
  let actions = Line::from(vec![
    Span::styled("[e] Modifica ", if r.edit_enabled { enabled } else { disabled }),
    Span::styled("[d] Elimina", if r.delete_enabled { enabled } else { disabled }),
  ]);

  let row = Row::new(vec![
    Cell::from(r.first_name.clone()),
    Cell::from(r.last_name.clone()),
    Cell::from(r.fiscal_code.clone()),
    Cell::from(r.file_number.clone()),
    Cell::from(r.registered_at.clone()),
    Cell::from(note),
    Cell::from(actions),
  ])
  .height(height);

  if r.highlighted {
    row.style(Style::default().bg(Color::Yellow).fg(Color::Black))
  } else {
    row
  }
}

/// The note cell: the preview with a ▼ control, or the full note wrapped at
/// the preview width with a ▲ control.
fn note_text(note: &NoteCell) -> Text<'static> {
  if !note.expandable {
    return Text::from(note.text.clone());
  }

  let marker = Span::styled(
    if note.expanded { " ▲" } else { " ▼" },
    Style::default().fg(Color::Cyan),
  );

  if !note.expanded {
    return Text::from(Line::from(vec![Span::raw(note.text.clone()), marker]));
  }

  let chars: Vec<char> = note.text.chars().collect();
  let mut lines: Vec<Line> = chars
    .chunks(NOTE_PREVIEW_CHARS)
    .map(|chunk| Line::from(chunk.iter().collect::<String>()))
    .collect();
  if let Some(last) = lines.last_mut() {
    last.spans.push(marker);
  }
  Text::from(lines)
}
