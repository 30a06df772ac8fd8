//! Rendering of usage, version, help and error text.
//!
//! Everything here is pure string formatting over the registered options
//! and parser metadata.  Printing and process exit stay with the caller.

use crate::{Error, Opt, OptionParser};

impl OptionParser {
    /// The usage line, with `%prog` expanded.
    pub fn format_usage(&self) -> String {
        format!("Usage: {}\n", self.expand_prog(&self.usage))
    }

    /// The version string, with `%prog` expanded.
    pub fn format_version(&self) -> String {
        format!("{}\n", self.expand_prog(&self.version))
    }

    /// The full help page: usage, description, the option table, epilog.
    pub fn format_help(&self) -> String {
        let mut out = self.format_usage();
        if !self.description.is_empty() {
            out.push('\n');
            out.push_str(self.description.trim_end());
            out.push('\n');
        }
        out.push_str(&self.format_option_help());
        if !self.epilog.is_empty() {
            out.push('\n');
            out.push_str(self.epilog.trim_end());
            out.push('\n');
        }
        out
    }

    /// The `Options:` table alone, in registration order.
    pub fn format_option_help(&self) -> String {
        if self.opts.is_empty() {
            return String::new();
        }
        let rows: Vec<(String, &str)> = self
            .opts
            .iter()
            .map(|opt| (format_option_flags(opt), opt.help.as_str()))
            .collect();
        let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
        let mut out = String::from("\nOptions:\n");
        for (left, help) in rows {
            if help.is_empty() {
                out.push_str(&format!("  {}\n", left));
            } else {
                out.push_str(&format!("  {:width$}  {}\n", left, help, width = width));
            }
        }
        out
    }

    /// The text the classic `error()` printed before exiting: the usage
    /// line followed by `prog: error: message`.
    pub fn format_error(&self, err: &Error) -> String {
        let mut out = self.format_usage();
        if self.prog.is_empty() {
            out.push_str(&format!("error: {}\n", err));
        } else {
            out.push_str(&format!("{}: error: {}\n", self.prog, err));
        }
        out
    }

    fn expand_prog(&self, template: &str) -> String {
        template.replace("%prog", &self.prog)
    }
}

/// The left column of an option row, e.g. `-f FILE, --file=FILE`.
fn format_option_flags(opt: &Opt) -> String {
    let metavar = opt
        .metavar
        .clone()
        .unwrap_or_else(|| opt.dest_key().to_uppercase());
    let mut parts = Vec::new();
    for &c in &opt.short_flags {
        if opt.takes_value() {
            parts.push(format!("-{} {}", c, metavar));
        } else {
            parts.push(format!("-{}", c));
        }
    }
    for name in &opt.long_flags {
        if opt.takes_value() {
            parts.push(format!("--{}={}", name, metavar));
        } else {
            parts.push(format!("--{}", name));
        }
    }
    parts.join(", ")
}
