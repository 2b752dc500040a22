use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

/// Status line after a file check, on stderr so the report stays clean
pub fn missing_summary(missing: usize, total: usize) {
    if missing == 0 {
        eprintln!("{} {}", Icons::CHECK, format!("All {} files found", total).style(theme().success.clone()));
    } else {
        eprintln!(
            "{} {}",
            Icons::WARN,
            format!("{} of {} files missing", missing, total).style(theme().missing.clone())
        );
    }
}

pub fn info(icon: &str, label: &str, value: &str) {
    println!(
        "{} {}: {}",
        icon.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}
