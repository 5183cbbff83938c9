//! Status indicators for CLI output: `[•ok]`, `[•--]` and `[•!!]`.

use console::style;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Green `[•ok]`
    Ok,
    /// Dim `[•--]`, for checks that didn't apply
    Skip,
    /// Red `[•!!]`
    Error,
}

impl Status {
    #[must_use]
    pub fn render(self) -> String {
        match self {
            Self::Ok => format!("[{}]", style("•ok").green()),
            Self::Skip => format!("[{}]", style("•--").dim()),
            Self::Error => format!("[{}]", style("•!!").red()),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// A status line with indicator and message.
pub struct StatusLine {
    status: Status,
    message: String,
}

impl StatusLine {
    #[must_use]
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Status::Ok, message)
    }

    #[must_use]
    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(Status::Skip, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    /// Ok or error line for a check result, with the error appended.
    #[must_use]
    pub fn from_result<T>(label: &str, result: &anyhow::Result<T>) -> Self {
        match result {
            Ok(_) => Self::ok(label),
            Err(e) => Self::error(format!("{label}: {e}")),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, Status::Error)
    }

    pub fn print(&self) {
        println!("  {} {}", self.status, self.message);
    }
}

/// Dim, indented hint line.
pub fn hint(message: &str) {
    println!("  {}", style(message).dim());
}

/// Print an error message with help text.
pub fn print_error(message: &str, help: Option<&str>) {
    println!();
    StatusLine::error(message).print();

    if let Some(help_text) = help {
        println!();
        for line in help_text.lines() {
            println!("  {line}");
        }
    }
    println!();
}

/// Print a success completion message.
pub fn print_success(title: &str, details: Option<&str>) {
    println!();
    println!("{} {}", style(title).bold(), style("✓").green());
    println!();

    if let Some(detail_text) = details {
        for line in detail_text.lines() {
            println!("  {line}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_result_picks_status() {
        let ok: anyhow::Result<()> = Ok(());
        assert_eq!(StatusLine::from_result("Store", &ok).status, Status::Ok);

        let err: anyhow::Result<()> = Err(anyhow::anyhow!("locked"));
        let line = StatusLine::from_result("Store", &err);
        assert!(line.is_error());
        assert_eq!(line.message, "Store: locked");
    }

    #[test]
    fn skip_is_not_an_error() {
        assert!(!StatusLine::skip("Webhook (not configured)").is_error());
    }
}
