// Console front end for the pairing screen
// Line-based commands in, plain text list/status/notices out

pub mod console;
pub mod input;

pub use console::ConsoleView;
pub use input::{parse_command, ScreenCommand, HELP};
