//! Interactive confirmation on stdin for the one-shot subcommands.

use anagrafe_core::registry::Confirm;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Prints the prompt and reads one line. Anything but an explicit yes is a
/// no, including end of input.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
  async fn confirm(&self, prompt: &str) -> bool {
    let mut stdout = tokio::io::stdout();
    if stdout.write_all(format!("{prompt} [s/N] ").as_bytes()).await.is_err() {
      return false;
    }
    stdout.flush().await.ok();

    let mut line = String::new();
    match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
      Ok(_) => is_yes(&line),
      Err(_) => false,
    }
  }
}

fn is_yes(answer: &str) -> bool {
  matches!(
    answer.trim().to_lowercase().as_str(),
    "s" | "si" | "sì" | "y" | "yes"
  )
}

#[cfg(test)]
mod tests {
  use super::is_yes;

  #[test]
  fn accepts_italian_and_english_yes() {
    for answer in ["s\n", "SI", " sì ", "y", "Yes\r\n"] {
      assert!(is_yes(answer), "{answer:?}");
    }
  }

  #[test]
  fn everything_else_is_no() {
    for answer in ["", "\n", "n", "no", "forse", "ss"] {
      assert!(!is_yes(answer), "{answer:?}");
    }
  }
}
