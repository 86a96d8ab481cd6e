//! Message parser - Extracts a command name and arguments from raw text

/// How command names are recognised in free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixPolicy {
    /// Only messages starting with this literal are commands
    Literal(String),
    /// Every message is a command; the first word is its name
    Bare,
}

impl PrefixPolicy {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if prefix.is_empty() {
            PrefixPolicy::Bare
        } else {
            PrefixPolicy::Literal(prefix)
        }
    }

    /// The prefix as typed by users ("" in bare mode)
    pub fn as_str(&self) -> &str {
        match self {
            PrefixPolicy::Literal(prefix) => prefix,
            PrefixPolicy::Bare => "",
        }
    }

    pub fn is_bare(&self) -> bool {
        matches!(self, PrefixPolicy::Bare)
    }
}

/// A command invocation pulled out of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Parses incoming text into commands
#[derive(Debug, Clone)]
pub struct MessageParser {
    policy: PrefixPolicy,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            policy: PrefixPolicy::new(prefix),
        }
    }

    pub fn policy(&self) -> &PrefixPolicy {
        &self.policy
    }

    /// Returns `None` when the text is not addressed to the bot
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let cmd_text = match &self.policy {
            PrefixPolicy::Literal(prefix) => text.strip_prefix(prefix.as_str())?,
            PrefixPolicy::Bare => text,
        };

        let mut parts = cmd_text.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let args = parts.map(str::to_string).collect();

        Some(ParsedCommand { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str, args: &[&str]) -> Option<ParsedCommand> {
        Some(ParsedCommand {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn prefixed_command_with_args() {
        let parser = MessageParser::new("!");
        assert_eq!(parser.parse("!echo hello world"), parsed("echo", &["hello", "world"]));
    }

    #[test]
    fn text_without_prefix_is_not_a_command() {
        let parser = MessageParser::new("!");
        for text in ["echo hi", " !echo", "?help", ""] {
            assert_eq!(parser.parse(text), None, "{:?}", text);
        }
    }

    #[test]
    fn multi_char_prefix_and_case() {
        let parser = MessageParser::new("bot ");
        assert_eq!(parser.parse("bot HeLP   me  now"), parsed("help", &["me", "now"]));
        assert_eq!(parser.parse("Bot help"), None);
    }

    #[test]
    fn bare_mode_takes_first_word() {
        let parser = MessageParser::new("");
        assert!(parser.policy().is_bare());
        assert_eq!(parser.parse("help"), parsed("help", &[]));
        assert_eq!(parser.parse("  Weather \t New   York "), parsed("weather", &["New", "York"]));
    }

    #[test]
    fn bare_mode_name_is_lowercased_first_token() {
        let parser = MessageParser::new("");
        for text in ["Hello there", "ECHO", "x y z", "Ünïcode Wörds"] {
            let expected = text.split_whitespace().next().unwrap().to_lowercase();
            assert_eq!(parser.parse(text).unwrap().name, expected);
        }
    }

    #[test]
    fn prefix_only_yields_empty_name() {
        let parser = MessageParser::new("!");
        assert_eq!(parser.parse("!"), parsed("", &[]));
        assert_eq!(parser.parse("!   echo x"), parsed("echo", &["x"]));
    }
}
