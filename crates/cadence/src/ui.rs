use dialoguer::console::{Style, style};

pub const SUCCESS_PREFIX: &str = "✔";
pub const WARNING_PREFIX: &str = "⚠";
pub const HINT_PREFIX: &str = "💡";

pub fn log_success_value(label: &str, value: &str) {
    let prefix = style(SUCCESS_PREFIX.to_string()).for_stdout().green();
    let values = Style::new().for_stdout().bold();
    println!("{prefix} {label}: {}", values.apply_to(value));
}

pub fn log_warning(message: &str) {
    let prefix = style(WARNING_PREFIX.to_string()).for_stderr().yellow();
    let message_style = Style::new().for_stderr().yellow();
    eprintln!("{prefix} {}", message_style.apply_to(message));
}

pub fn log_error(message: &str) {
    let prefix = style("✘".to_string()).for_stderr().red();
    let message_style = Style::new().for_stderr().red();
    eprintln!("{prefix} {}", message_style.apply_to(message));
}

/// Prints a hint message to stderr with a distinct visual style.
///
/// Used for non-critical suggestions such as how to apply a dry run.
pub fn log_hint(message: &str) {
    let prefix = style(HINT_PREFIX.to_string()).for_stderr().yellow();
    let message_style = Style::new().for_stderr().yellow();
    eprintln!("{prefix} {}", message_style.apply_to(message));
}
