//! Terminal output.

use archives_core::Reporter;
use crossterm::style::Stylize;

/// Prints installer progress to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!("{}", title.bold());
    }

    fn repository(&self, kind: &str, location: &str) {
        println!("  {}{}", format!("{kind:<4}").dark_grey(), location.white().bold());
    }

    fn changed(&self, _location: &str, detail: &str) {
        println!("      {} {detail}", "✓".green());
    }

    fn unchanged(&self, _location: &str, detail: &str) {
        println!("      {} {}", "·".dark_grey(), detail.dark_grey());
    }

    fn info(&self, msg: &str) {
        println!("{msg}");
    }

    fn warning(&self, msg: &str) {
        warning(msg);
    }

    fn summary(&self, count: usize, refresh_required: bool) {
        println!();
        let noun = if count == 1 { "repository" } else { "repositories" };
        if refresh_required {
            println!(
                "{} {count} package {noun} installed, package index refresh required",
                "✓".green()
            );
        } else {
            println!("{} {count} package {noun} already up to date", "✓".green());
        }
    }
}

/// Print a success line.
pub fn success(msg: &str) {
    println!("{} {msg}", "✓".green());
}

/// Print a warning to stderr.
pub fn warning(msg: &str) {
    eprintln!("{} {msg}", "warning:".yellow().bold());
}

/// Print what a dry run would do.
pub fn would(msg: &str) {
    println!("{} {msg}", "would".cyan());
}
