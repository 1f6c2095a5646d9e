// Application commands

pub mod cursor_commands;
