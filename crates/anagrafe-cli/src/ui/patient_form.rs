//! Patient form pane.

use anagrafe_core::persistence::KeyValueStore;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::{
  app::{App, Focus},
  form::FormField,
};

/// Rows needed to draw the form, borders included.
pub const HEIGHT: u16 = FormField::ALL.len() as u16 + 3;

/// Render the form into `area`.
pub fn draw<K: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<K>) {
  let editing = app.is_editing();
  let focused = app.focus == Focus::Form && app.pending.is_none();

  let title = if editing { " Modifica Paziente " } else { " Nuovo Paziente " };
  let border = match (focused, editing) {
    (true, true) => Color::Green,
    (true, false) => Color::Cyan,
    _ => Color::DarkGray,
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  let label_width = FormField::ALL
    .iter()
    .map(|field| field.label().chars().count())
    .max()
    .unwrap_or_default();

  let mut lines: Vec<Line> = FormField::ALL
    .iter()
    .map(|&field| {
      let active = focused && app.form.focus() == field;
      let label_style = if active {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(Color::Cyan)
      };
      let cursor = if active { "_" } else { "" };
      Line::from(vec![
        Span::styled(format!("{:<label_width$}  ", field.label()), label_style),
        Span::raw(format!("{}{cursor}", app.form.value(field))),
      ])
    })
    .collect();

  // Buttons, as key hints.
  let submit = if editing { "[Invio] Salva Modifiche" } else { "[Invio] Registra Paziente" };
  let mut buttons = vec![Span::styled(
    submit,
    Style::default()
      .fg(if editing { Color::Green } else { Color::Blue })
      .add_modifier(Modifier::BOLD),
  )];
  if editing {
    buttons.push(Span::styled("  [Esc] Annulla Modifica", Style::default().fg(Color::Gray)));
  }
  buttons.push(Span::styled("  [Ctrl-R] Svuota Campi", Style::default().fg(Color::DarkGray)));
  lines.push(Line::from(buttons));

  f.render_widget(Paragraph::new(lines).block(block), area);
}
