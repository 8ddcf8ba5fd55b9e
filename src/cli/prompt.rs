//! Terminal confirmation for the loan checkpoint

use std::io::{self, Write};

use super::input::Terminal;
use crate::{
    models::loan::{Checkpoint, Confirmation},
    services::ConfirmationPort,
};

/// Asks on stderr and takes the answer from the shared [`Terminal`].
/// Anything other than an explicit yes cancels, including EOF and an
/// expired deadline.
pub struct TerminalConfirm {
    terminal: Terminal,
}

impl TerminalConfirm {
    pub fn new(terminal: Terminal) -> Self {
        Self { terminal }
    }
}

impl ConfirmationPort for TerminalConfirm {
    fn confirm(&self, checkpoint: &Checkpoint) -> Confirmation {
        let mut stderr = io::stderr();
        let asked = match checkpoint.remaining() {
            Some(left) => write!(
                stderr,
                "{} Continue? [y/N] ({}s) ",
                checkpoint,
                left.as_secs()
            ),
            None => write!(stderr, "{} Continue? [y/N] ", checkpoint),
        };
        if asked.and_then(|_| stderr.flush()).is_err() {
            return Confirmation::Cancel;
        }

        match self.terminal.blocking_next_line_before(checkpoint.deadline) {
            Some(answer) => parse_answer(&answer),
            None => {
                let _ = writeln!(stderr);
                Confirmation::Cancel
            }
        }
    }
}

pub fn parse_answer(answer: &str) -> Confirmation {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "ok" => Confirmation::Proceed,
        _ => Confirmation::Cancel,
    }
}
