//! The patient form: five text inputs and the focused one.

use anagrafe_core::patient::{Field, PatientFields, PatientRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  FirstName,
  LastName,
  FiscalCode,
  FileNumber,
  Note,
}

impl FormField {
  /// Tab order.
  pub const ALL: [FormField; 5] = [
    Self::FirstName,
    Self::LastName,
    Self::FiscalCode,
    Self::FileNumber,
    Self::Note,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Self::FirstName => "Nome *",
      Self::LastName => "Cognome *",
      Self::FiscalCode => "Codice Fiscale *",
      Self::FileNumber => "Numero Cartella *",
      Self::Note => "Note",
    }
  }

  fn index(self) -> usize {
    Self::ALL.iter().position(|f| *f == self).unwrap_or_default()
  }
}

impl From<Field> for FormField {
  fn from(field: Field) -> Self {
    match field {
      Field::FirstName => Self::FirstName,
      Field::LastName => Self::LastName,
      Field::FiscalCode => Self::FiscalCode,
      Field::FileNumber => Self::FileNumber,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Form {
  values: [String; 5],
  focus:  FormField,
}

impl Default for Form {
  fn default() -> Self { Self { values: Default::default(), focus: FormField::FirstName } }
}

impl Form {
  pub fn focus(&self) -> FormField { self.focus }

  pub fn set_focus(&mut self, field: FormField) { self.focus = field; }

  pub fn focus_next(&mut self) {
    let next = (self.focus.index() + 1) % FormField::ALL.len();
    self.focus = FormField::ALL[next];
  }

  pub fn focus_prev(&mut self) {
    let len = FormField::ALL.len();
    let prev = (self.focus.index() + len - 1) % len;
    self.focus = FormField::ALL[prev];
  }

  pub fn value(&self, field: FormField) -> &str { &self.values[field.index()] }

  /// Type a character into the focused input. The fiscal code is uppercased
  /// as it is typed.
  pub fn input(&mut self, c: char) {
    let value = &mut self.values[self.focus.index()];
    if self.focus == FormField::FiscalCode {
      value.extend(c.to_uppercase());
    } else {
      value.push(c);
    }
  }

  pub fn backspace(&mut self) { self.values[self.focus.index()].pop(); }

  /// Empty every input and focus the first one.
  pub fn reset(&mut self) { *self = Self::default(); }

  /// Pre-populate from an existing record.
  pub fn fill(&mut self, record: &PatientRecord) {
    let fields = PatientFields::from(record);
    self.values = [
      fields.first_name,
      fields.last_name,
      fields.fiscal_code,
      fields.file_number,
      fields.note,
    ];
    self.focus = FormField::FirstName;
  }

  pub fn to_fields(&self) -> PatientFields {
    PatientFields {
      first_name:  self.value(FormField::FirstName).to_owned(),
      last_name:   self.value(FormField::LastName).to_owned(),
      fiscal_code: self.value(FormField::FiscalCode).to_owned(),
      file_number: self.value(FormField::FileNumber).to_owned(),
      note:        self.value(FormField::Note).to_owned(),
    }
  }
}
