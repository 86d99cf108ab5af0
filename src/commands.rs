//! Slash command parsing for the chat loop.
//!
//! Input starting with `/` controls the session and is never sent to the model.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Redraw the conversation so far.
    History,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use travelbot::commands::{parse_command, ChatCommand};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("請規劃嘉義3天2夜行程").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "history" | "h" => no_argument(ChatCommand::History, "/history", argument),
        "stats" | "status" => no_argument(ChatCommand::Stats, "/stats", argument),
        "config" => no_argument(ChatCommand::ShowConfig, "/config", argument),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "" => ChatCommand::Invalid("empty command; type /help for commands".to_string()),
        other => ChatCommand::Invalid(format!(
            "unknown command /{other}; type /help for commands"
        )),
    };
    Some(result)
}

fn no_argument(command: ChatCommand, name: &str, argument: Option<&str>) -> ChatCommand {
    match argument {
        None => command,
        Some(_) => ChatCommand::Invalid(format!("{name} takes no arguments")),
    }
}

/// Help text listing the available commands.
pub fn help_text() -> &'static str {
    "/history   Show the conversation so far\n\
     /stats     Show session statistics\n\
     /config    Show the current configuration\n\
     /help      Show this help\n\
     /quit      Exit (also /exit, /q, Ctrl+D)"
}
