#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Steer(String),
    Help,
    Status,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "Type a topic and press Enter to start research, or answer a clarification question.\n\
Commands: /steer <instruction>, /status, /help, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim_start()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/steer" => SlashCommand::Steer(rest.to_string()),
        "/help" => SlashCommand::Help,
        "/status" => SlashCommand::Status,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
