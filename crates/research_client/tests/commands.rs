use research_client::commands::{parse_slash_command, SlashCommand};

#[test]
fn plain_lines_are_not_commands() {
    assert_eq!(parse_slash_command("history of tea"), None);
    assert_eq!(parse_slash_command("  B  "), None);
    assert_eq!(parse_slash_command(""), None);
}

#[test]
fn parser_recognizes_known_and_unknown_commands() {
    assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
    assert_eq!(parse_slash_command(" /status "), Some(SlashCommand::Status));
    assert_eq!(parse_slash_command("/quit"), Some(SlashCommand::Quit));
    assert_eq!(parse_slash_command("/exit"), Some(SlashCommand::Quit));
    assert_eq!(
        parse_slash_command("/nope extra args"),
        Some(SlashCommand::Unknown("/nope".to_string()))
    );
}

#[test]
fn steer_keeps_instruction_text_after_command() {
    assert_eq!(
        parse_slash_command("/steer focus on   European markets"),
        Some(SlashCommand::Steer("focus on   European markets".to_string()))
    );
    assert_eq!(
        parse_slash_command("/steer"),
        Some(SlashCommand::Steer(String::new()))
    );
    assert_eq!(
        parse_slash_command("/steer\tskip 2019"),
        Some(SlashCommand::Steer("skip 2019".to_string()))
    );
}
