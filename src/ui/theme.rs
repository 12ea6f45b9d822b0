//! cliclack theme

use cliclack::ThemeState;
use console::Style;

/// Cyan while a prompt is open, green once answered
#[derive(Debug, Clone, Default)]
pub struct PlaceboardTheme;

impl cliclack::Theme for PlaceboardTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().cyan(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().cyan(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

/// Install [`PlaceboardTheme`] for every prompt of the process
pub fn init_theme() {
    cliclack::set_theme(PlaceboardTheme);
}
