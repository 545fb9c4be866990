//! Terminal progress output

use std::cell::RefCell;
use std::time::Duration;

use console::style;
use exporter_provision::{CommandResult, Outcome, Reporter};
use indicatif::{ProgressBar, ProgressStyle};

/// Reporter with one spinner per running step
#[derive(Default)]
pub struct ConsoleReporter {
    current: RefCell<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear a spinner left behind by an aborted step
    pub fn finish(&self) {
        if let Some(spinner) = self.current.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }

    // Print above the spinner so the line is not overwritten
    fn line(&self, message: &str) {
        match self.current.borrow().as_ref() {
            Some(spinner) => spinner.println(message),
            None => println!("{message}"),
        }
    }

    fn block(&self, label: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.line(&format!("    {}", style(label).dim()));
        for line in text.lines() {
            self.line(&format!("    {line}"));
        }
    }
}

/// Lines shown for a successful command; ufw and firewall-cmd warn on stderr even on success
fn output_lines(result: &CommandResult) -> impl Iterator<Item = &str> {
    result.stdout.lines().chain(result.stderr.lines())
}

impl Reporter for ConsoleReporter {
    fn step_started(&self, index: usize, total: usize, _name: &str, description: &str) {
        self.finish();

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template(&format!("{{spinner:.cyan}} [{index}/{total}] {{msg}}"))
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(description.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        *self.current.borrow_mut() = Some(spinner);
    }

    fn step_finished(&self, index: usize, total: usize, name: &str, outcome: &Outcome) {
        self.finish();
        match outcome {
            Outcome::Success => println!("[{index}/{total}] {} {name}", style("v").green()),
            Outcome::ToleratedFailure(reason) => println!(
                "[{index}/{total}] {} {name} {}",
                style("v").green(),
                style(format!("({reason})")).dim()
            ),
            Outcome::FatalFailure(reason) => {
                println!("[{index}/{total}] {} {name}", style("x").red());
                for line in reason.lines() {
                    println!("    {}", style(line).red());
                }
            }
        }
    }

    fn step_skipped(&self, index: usize, total: usize, name: &str, reason: &str) {
        self.finish();
        println!(
            "[{index}/{total}] {} {name} {}",
            style("o").yellow(),
            style(format!("(skipped: {reason})")).dim()
        );
    }

    fn command(&self, argv: &[&str]) {
        self.line(&format!("  {} {}", style("$").dim(), argv.join(" ")));
    }

    fn command_output(&self, result: &CommandResult) {
        for line in output_lines(result) {
            self.line(&format!("    {}", style(line).dim()));
        }
    }

    fn command_failed(&self, argv: &[&str], result: &CommandResult) {
        self.line(&format!(
            "  {} '{}' exited with code {}",
            style("!").red(),
            argv.join(" "),
            result.exit_code
        ));
        self.block("stdout:", &result.stdout);
        self.block("stderr:", &result.stderr);
    }

    fn info(&self, message: &str) {
        self.line(&format!("  {} {message}", style("i").cyan()));
    }

    fn warn(&self, message: &str) {
        self.line(&format!("  {} {message}", style("!").yellow()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command_output_includes_stderr() {
        let result = CommandResult::new(
            0,
            "Rule added\n",
            "WARN: Rule for 10.0.0.5 already present\n",
        );

        let lines: Vec<&str> = output_lines(&result).collect();
        assert_eq!(
            lines,
            ["Rule added", "WARN: Rule for 10.0.0.5 already present"]
        );
    }

    #[test]
    fn test_silent_command_has_no_output_lines() {
        assert_eq!(output_lines(&CommandResult::ok()).count(), 0);
    }
}
