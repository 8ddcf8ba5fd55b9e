//! Interactive command loop

use std::io::{self, Write};

use clap::Parser;

use super::{execute, input::Terminal, Command};
use crate::{config::LoansConfig, error::AppResult, AppState};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// Read and run commands until `quit`, `exit` or EOF. Non-fatal errors are
/// printed and the loop continues; fatal ones end the session.
pub async fn run(state: &AppState, terminal: &Terminal) -> AppResult<()> {
    println!("{}", banner(&state.config.loans));

    loop {
        print!("library> ");
        io::stdout().flush()?;
        let Some(line) = terminal.next_line().await else {
            return Ok(());
        };
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => return Ok(()),
            _ => {}
        }

        let command = match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match execute(state, command).await {
            Ok(Some(report)) => println!("{}\n", report),
            Ok(None) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                err.trace();
                println!("{}\n", err);
            }
        }
    }
}

fn banner(loans: &LoansConfig) -> String {
    let mut banner = String::from("Library Desk. Type `help` for commands, `quit` to leave.");
    if let Some(secs) = loans.confirmation_timeout_secs {
        banner.push_str(&format!(
            "\nUnanswered loan checkpoints cancel after {} seconds.",
            secs
        ));
    }
    banner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_line_parses_without_binary_name() {
        let parsed = ShellLine::try_parse_from(["book", "111"]).unwrap();
        assert_eq!(parsed.command, Command::Book { isbn: 111 });
    }

    #[test]
    fn test_banner_mentions_configured_timeout() {
        assert!(!banner(&LoansConfig::default()).contains("cancel after"));

        let loans = LoansConfig {
            confirmation_timeout_secs: Some(30),
            ..LoansConfig::default()
        };
        assert!(banner(&loans).ends_with("Unanswered loan checkpoints cancel after 30 seconds."));
    }
}
