/// A command line split into its name and arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// Splits on whitespace. Blank lines are not commands.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?.to_string();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }

    pub fn has_switch(&self, names: &[&str]) -> bool {
        self.args.iter().any(|a| names.contains(&a.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_and_args() {
        let cmd = ParsedCommand::parse("  tut   -r ").unwrap();
        assert_eq!(cmd.name, "tut");
        assert_eq!(cmd.args, vec!["-r"]);
        assert!(cmd.has_switch(&["-r", "--reset"]));
    }

    #[test]
    fn blank_line_is_not_a_command() {
        assert!(ParsedCommand::parse("").is_none());
        assert!(ParsedCommand::parse("   ").is_none());
    }

    #[test]
    fn switch_absent() {
        let cmd = ParsedCommand::parse("play").unwrap();
        assert!(cmd.args.is_empty());
        assert!(!cmd.has_switch(&["-r"]));
    }
}
