//! TUI rendering: orchestrates all panes.

pub mod patient_form;
pub mod patient_table;

use anagrafe_core::{persistence::KeyValueStore, registry::Severity};
use chrono::Local;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, Focus};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<K: KeyValueStore>(f: &mut Frame, app: &App<K>) {
  let area = f.area();

  // Vertical stack: header, banner, table, form, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),                   // header
      Constraint::Length(1),                   // banner
      Constraint::Min(5),                      // table
      Constraint::Length(patient_form::HEIGHT), // form
      Constraint::Length(1),                   // status bar
    ])
    .split(area);

  draw_header(f, rows[0]);
  draw_banner(f, rows[1], app);
  patient_table::draw(f, rows[2], app);
  patient_form::draw(f, rows[3], app);
  draw_status(f, rows[4], app);

  if app.pending.is_some() {
    draw_confirm(f, area, app);
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect) {
  let date = Local::now().format("%d/%m/%Y").to_string();

  let left = Span::styled(
    " anagrafe  registro pazienti",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{date} "),
    Style::default().fg(Color::Gray),
  );

  // Simple left-right header: pad the middle.
  let left_width = left.content.chars().count() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Banner ───────────────────────────────────────────────────────────────────

fn draw_banner<K: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<K>) {
  let Some(banner) = &app.banner else {
    return;
  };
  let bg = match banner.notification.severity {
    Severity::Success => Color::Green,
    Severity::Error => Color::Red,
  };
  f.render_widget(
    Paragraph::new(format!(" {}", banner.notification.message))
      .style(Style::default().fg(Color::White).bg(bg).add_modifier(Modifier::BOLD)),
    area,
  );
}

// ─── Confirmation dialog ──────────────────────────────────────────────────────

fn draw_confirm<K: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<K>) {
  let Some(pending) = app.pending else {
    return;
  };

  let dialog = centered(area, 60, 7);
  f.render_widget(Clear, dialog);

  let block = Block::default()
    .title(" Conferma ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));

  let text = vec![
    Line::from(pending.prompt()),
    Line::from(""),
    Line::from(vec![
      Span::styled("[s] Sì", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
      Span::raw("    "),
      Span::styled("[n] No", Style::default().add_modifier(Modifier::BOLD)),
    ]),
  ];

  f.render_widget(
    Paragraph::new(text)
      .block(block)
      .alignment(Alignment::Center)
      .wrap(Wrap { trim: true }),
    dialog,
  );
}

/// A `width` × `height` rectangle centred in `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<K: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<K>) {
  let (mode_label, hints) = if app.pending.is_some() {
    ("CONFERMA", "s conferma  n/Esc annulla")
  } else if app.filter_active {
    ("CERCA", "Digita per filtrare  Esc annulla  Invio conferma")
  } else {
    match (app.focus, app.is_editing()) {
      (Focus::Table, _) => (
        "TABELLA",
        "↑↓/jk muovi  Invio nota  e modifica  d elimina  X svuota tabella  n form  / cerca  q esci",
      ),
      (Focus::Form, false) => (
        "INSERIMENTO",
        "Tab campo successivo  Invio registra  Ctrl-R svuota  Esc tabella",
      ),
      (Focus::Form, true) => (
        "MODIFICA",
        "Tab campo successivo  Invio salva  Esc annulla modifica",
      ),
    }
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {hints}"),
    Style::default().fg(Color::DarkGray),
  );

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span]))
      .style(Style::default().bg(Color::Black)),
    area,
  );
}
