use super::*;

#[test]
fn plain_text_is_sent() {
    assert_eq!(parse_line("  what is on slide 4?  "), ShellCommand::Send("what is on slide 4?".into()));
}

#[test]
fn blank_line_is_ignored() {
    assert_eq!(parse_line("   "), ShellCommand::Empty);
}

#[test]
fn commands_without_arguments() {
    assert_eq!(parse_line("/chats"), ShellCommand::Chats);
    assert_eq!(parse_line("/close"), ShellCommand::Close);
    assert_eq!(parse_line("/unref"), ShellCommand::Unreference);
    assert_eq!(parse_line("/exit"), ShellCommand::Quit);
}

#[test]
fn open_and_ref_take_an_argument() {
    assert_eq!(parse_line("/open 2"), ShellCommand::Open("2".into()));
    assert_eq!(parse_line("/ref  m-17 "), ShellCommand::Reference("m-17".into()));
    assert!(matches!(parse_line("/open"), ShellCommand::Invalid(_)));
}

#[test]
fn new_splits_file_from_title() {
    assert_eq!(
        parse_line("/new decks/q3.pptx Quarterly review"),
        ShellCommand::New { path: PathBuf::from("decks/q3.pptx"), title: "Quarterly review".into() }
    );
    assert!(matches!(parse_line("/new decks/q3.pptx"), ShellCommand::Invalid(_)));
}

#[test]
fn unknown_command_is_invalid() {
    assert!(matches!(parse_line("/frobnicate"), ShellCommand::Invalid(_)));
}
