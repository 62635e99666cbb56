//! Chat command parsing.

/// Character that marks a chat message as a command.
pub const COMMAND_PREFIX: char = '!';

/// A command extracted from a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Command name without the prefix, e.g. `scene`.
    pub name: String,
    /// Everything after the name, trimmed. `None` when nothing follows.
    pub argument: Option<String>,
}

impl CommandInvocation {
    /// Returns the argument as a string slice.
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

/// Extracts a command from a chat message.
///
/// Returns `None` for messages that do not start with [`COMMAND_PREFIX`]. The
/// remainder is split at the first run of whitespace into the command name
/// and its argument; the argument is passed through verbatim apart from
/// trimming.
///
/// ```
/// use kiwicast_core::parse_command;
///
/// let cmd = parse_command("!scene lobby").unwrap();
/// assert_eq!(cmd.name, "scene");
/// assert_eq!(cmd.argument(), Some("lobby"));
///
/// assert!(parse_command("hello").is_none());
/// ```
pub fn parse_command(text: &str) -> Option<CommandInvocation> {
    let body = text.strip_prefix(COMMAND_PREFIX)?;

    let (name, rest) = match body.find(char::is_whitespace) {
        Some(split) => body.split_at(split),
        None => (body, ""),
    };

    let rest = rest.trim();
    Some(CommandInvocation {
        name: name.trim().to_string(),
        argument: (!rest.is_empty()).then(|| rest.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Option<(String, Option<String>)> {
        parse_command(text).map(|c| (c.name, c.argument))
    }

    #[test]
    fn test_command_with_argument() {
        assert_eq!(
            parsed("!scene lobby"),
            Some(("scene".into(), Some("lobby".into())))
        );
    }

    #[test]
    fn test_command_without_argument() {
        assert_eq!(parsed("!stop"), Some(("stop".into(), None)));
    }

    #[test]
    fn test_plain_message_is_not_a_command() {
        assert_eq!(parsed("hello"), None);
        assert_eq!(parsed(""), None);
        assert_eq!(parsed(" !stop"), None);
    }

    #[test]
    fn test_prefix_with_only_whitespace() {
        assert_eq!(parsed("!  "), Some((String::new(), None)));
        assert_eq!(parsed("!"), Some((String::new(), None)));
    }

    #[test]
    fn test_argument_is_trimmed_but_kept_verbatim() {
        assert_eq!(
            parsed("!scene   Main  Camera  "),
            Some(("scene".into(), Some("Main  Camera".into())))
        );
    }

    #[test]
    fn test_any_whitespace_splits() {
        assert_eq!(
            parsed("!scene\tlobby"),
            Some(("scene".into(), Some("lobby".into())))
        );
    }

    #[test]
    fn test_trailing_whitespace_without_argument() {
        assert_eq!(parsed("!reload   "), Some(("reload".into(), None)));
    }

    #[test]
    fn test_case_is_preserved() {
        assert_eq!(parsed("!Scene Lobby"), Some(("Scene".into(), Some("Lobby".into()))));
    }
}
