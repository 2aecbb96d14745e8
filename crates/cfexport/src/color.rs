use crate::cli::ColorChoice;
use std::io::IsTerminal;

/// Whether each output stream gets ANSI colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMode {
    /// Run summary on stdout
    pub summary: bool,
    /// Log lines on stderr
    pub logs: bool,
}

impl ColorMode {
    /// Decide per stream; `Auto` honours NO_COLOR (https://no-color.org/)
    pub fn resolve(choice: ColorChoice, no_color: bool, stdout_tty: bool, stderr_tty: bool) -> Self {
        let enabled = |tty: bool| match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => !no_color && tty,
        };
        Self {
            summary: enabled(stdout_tty),
            logs: enabled(stderr_tty),
        }
    }
}

/// Apply the color choice to `colored` and return the mode for the log layer
pub fn init(choice: ColorChoice) -> ColorMode {
    let mode = ColorMode::resolve(
        choice,
        std::env::var_os("NO_COLOR").is_some(),
        std::io::stdout().is_terminal(),
        std::io::stderr().is_terminal(),
    );
    colored::control::set_override(mode.summary);
    mode
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_follows_each_stream() {
        let mode = ColorMode::resolve(ColorChoice::Auto, false, false, true);
        assert!(!mode.summary);
        assert!(mode.logs);
    }

    #[test]
    fn no_color_wins_in_auto_mode() {
        let mode = ColorMode::resolve(ColorChoice::Auto, true, true, true);
        assert_eq!(
            mode,
            ColorMode {
                summary: false,
                logs: false
            }
        );
    }

    #[test]
    fn explicit_choice_ignores_terminals() {
        assert!(ColorMode::resolve(ColorChoice::Always, true, false, false).logs);
        assert!(!ColorMode::resolve(ColorChoice::Never, false, true, true).summary);
    }
}
