//! Italian fiscal code helpers.

/// Length of a personal fiscal code.
pub const LENGTH: usize = 16;

/// Uppercase and trim a fiscal code as typed.
pub fn normalize(raw: &str) -> String { raw.trim().to_uppercase() }

/// Structural check against `[A-Z]{6}[0-9]{2}[A-Z][0-9]{2}[A-Z][0-9]{3}[A-Z]`.
///
/// Case-insensitive. The check digit and omocodia substitutions are not
/// verified.
pub fn is_well_formed(code: &str) -> bool {
  let code = code.to_ascii_uppercase();
  let bytes = code.as_bytes();
  if bytes.len() != LENGTH {
    return false;
  }

  const LETTER: u8 = b'A';
  const DIGIT: u8 = b'0';
  const SHAPE: [u8; LENGTH] = [
    LETTER, LETTER, LETTER, LETTER, LETTER, LETTER, // surname + name
    DIGIT, DIGIT, // year
    LETTER, // month
    DIGIT, DIGIT, // day + sex
    LETTER, DIGIT, DIGIT, DIGIT, // place
    LETTER, // check character
  ];

  bytes.iter().zip(SHAPE).all(|(b, kind)| match kind {
    LETTER => b.is_ascii_uppercase(),
    _ => b.is_ascii_digit(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_well_formed_code() {
    assert!(is_well_formed("RSSMRA85T10A562S"));
    assert!(is_well_formed("rssmra85t10a562s"));
  }

  #[test]
  fn rejects_misplaced_digits() {
    assert!(!is_well_formed("RSSMRA8XT10A562S"));
    assert!(!is_well_formed("1SSMRA85T10A562S"));
    assert!(!is_well_formed("RSSMRA85T10A5621"));
  }

  #[test]
  fn rejects_wrong_length() {
    assert!(!is_well_formed("RSSMRA85T10A562"));
    assert!(!is_well_formed("RSSMRA85T10A562SX"));
    assert!(!is_well_formed(""));
  }

  #[test]
  fn rejects_non_ascii() {
    assert!(!is_well_formed("RSSMRÀ85T10A562S"));
  }

  #[test]
  fn normalize_trims_and_uppercases() {
    assert_eq!(normalize("  rssmra85t10a562s "), "RSSMRA85T10A562S");
  }
}
