// Pairing screen input handling

/// What a line typed on the pairing screen asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCommand {
    /// Pull-to-refresh
    Refresh,
    /// Tap on a list row (0-based)
    Select(usize),
    Help,
    /// Leave the screen
    Quit,
    /// Nothing we understand; carries the trimmed input
    Unknown(String),
}

pub const HELP: &str = "commands: <number> connect to device, r refresh, h help, q quit";

/// Parse one line of user input.
///
/// Rows are shown 1-based, so "1" selects index 0. An empty line refreshes,
/// matching a pull on the list.
pub fn parse_command(line: &str) -> ScreenCommand {
    let line = line.trim();

    match line.to_ascii_lowercase().as_str() {
        "" | "r" | "refresh" => return ScreenCommand::Refresh,
        "q" | "quit" | "exit" => return ScreenCommand::Quit,
        "h" | "help" | "?" => return ScreenCommand::Help,
        _ => {}
    }

    match line.parse::<usize>() {
        Ok(row) if row >= 1 => ScreenCommand::Select(row - 1),
        _ => ScreenCommand::Unknown(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_one_based() {
        assert_eq!(parse_command("1"), ScreenCommand::Select(0));
        assert_eq!(parse_command(" 12 \n"), ScreenCommand::Select(11));
        assert_eq!(parse_command("0"), ScreenCommand::Unknown("0".to_string()));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse_command(""), ScreenCommand::Refresh);
        assert_eq!(parse_command("R"), ScreenCommand::Refresh);
        assert_eq!(parse_command("quit"), ScreenCommand::Quit);
        assert_eq!(parse_command("Q\n"), ScreenCommand::Quit);
        assert_eq!(parse_command("?"), ScreenCommand::Help);
    }

    #[test]
    fn test_unknown_input() {
        assert_eq!(
            parse_command("connect -1"),
            ScreenCommand::Unknown("connect -1".to_string())
        );
    }
}
