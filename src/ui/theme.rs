use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for status output. Listings written by `dumplist` and
/// `checkfiles` stay plain so they can be piped.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub warn: Style,
    /// Summary of files absent from the data directory
    pub missing: Style,
    pub info: Style,
    pub dim: Style,
}

impl Theme {
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::for_terminal(console::Term::stdout().is_term(), no_color)
    }

    pub fn for_terminal(is_term: bool, no_color: bool) -> Self {
        if is_term && !no_color {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            warn: Style::new().yellow().bold(),
            missing: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            warn: Style::new(),
            missing: Style::new(),
            info: Style::new(),
            dim: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_no_color_wins_over_terminal() {
        let theme = Theme::for_terminal(true, true);
        assert_eq!("12 files".style(theme.missing).to_string(), "12 files");
    }

    #[test]
    fn test_terminal_gets_colors() {
        let theme = Theme::for_terminal(true, false);
        assert_ne!("12 files".style(theme.missing).to_string(), "12 files");

        let piped = Theme::for_terminal(false, false);
        assert_eq!("12 files".style(piped.header).to_string(), "12 files");
    }
}
