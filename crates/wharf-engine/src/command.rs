//! Command trees and shell serialization.

use crate::error::EngineError;

/// A composable command.
///
/// Plain command tasks use only leaves and sequences, which flatten to one
/// argv. The operator variants exist for session scripts, where the whole
/// tree is serialized into a single shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandNode {
    /// One program invocation: the program plus its arguments.
    Leaf { program: String, args: Vec<String> },
    /// Ordered concatenation of sub-trees, joined by single spaces. This is
    /// how nested config lists splice extra tokens into one command line.
    Sequence(Vec<CommandNode>),
    /// `( ... )`: runs the inner tree in an isolated subshell.
    Group(Box<CommandNode>),
    /// `&& ...`: runs the inner tree only if the preceding segment succeeded.
    And(Box<CommandNode>),
    /// `| ...`: feeds the preceding segment's stdout to the inner tree.
    Pipe(Box<CommandNode>),
}

impl CommandNode {
    /// Build a leaf from a program and its arguments.
    pub fn leaf<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandNode::Leaf {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a leaf from one bare word.
    pub fn word(word: impl Into<String>) -> Self {
        CommandNode::Leaf {
            program: word.into(),
            args: Vec::new(),
        }
    }

    /// Flatten the tree into a single POSIX-safe shell line.
    ///
    /// A pure depth-first traversal: the same tree always produces the same
    /// string, so session scripts can be generated entirely up front.
    pub fn serialize(&self) -> String {
        match self {
            CommandNode::Leaf { program, args } => {
                let mut line = shell_quote(program);
                for arg in args {
                    line.push(' ');
                    line.push_str(&shell_quote(arg));
                }
                line
            }
            CommandNode::Sequence(children) => children
                .iter()
                .map(CommandNode::serialize)
                .collect::<Vec<_>>()
                .join(" "),
            CommandNode::Group(inner) => format!("({})", inner.serialize()),
            CommandNode::And(inner) => format!("&& {}", inner.serialize()),
            CommandNode::Pipe(inner) => format!("| {}", inner.serialize()),
        }
    }

    /// Flatten the tree into a plain argv.
    ///
    /// Fails on operator nodes: those belong to session scripts, plain
    /// command tasks carry no shell operators.
    pub fn flatten_argv(&self) -> Result<Vec<String>, EngineError> {
        let mut argv = Vec::new();
        self.push_argv(&mut argv)?;
        Ok(argv)
    }

    fn push_argv(&self, argv: &mut Vec<String>) -> Result<(), EngineError> {
        match self {
            CommandNode::Leaf { program, args } => {
                argv.push(program.clone());
                argv.extend(args.iter().cloned());
                Ok(())
            }
            CommandNode::Sequence(children) => {
                for child in children {
                    child.push_argv(argv)?;
                }
                Ok(())
            }
            CommandNode::Group(_) => Err(EngineError::OperatorInPlainTask("group".to_string())),
            CommandNode::And(_) => Err(EngineError::OperatorInPlainTask("and".to_string())),
            CommandNode::Pipe(_) => Err(EngineError::OperatorInPlainTask("pipe".to_string())),
        }
    }

    /// True when the tree is built only from leaves and sequences.
    pub fn is_plain(&self) -> bool {
        match self {
            CommandNode::Leaf { .. } => true,
            CommandNode::Sequence(children) => children.iter().all(CommandNode::is_plain),
            _ => false,
        }
    }
}

/// Quote one word for POSIX shells.
///
/// Words made only of unambiguously safe bytes pass through bare; everything
/// else is single-quoted, with embedded quotes rewritten as `'\''` so
/// argument boundaries survive re-parsing verbatim.
pub fn shell_quote(word: &str) -> String {
    let safe = |b: u8| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'_' | b'-' | b'.' | b'/' | b':' | b'=' | b'@' | b'%' | b'+' | b','
            )
    };
    if !word.is_empty() && word.bytes().all(safe) {
        return word.to_string();
    }

    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('\'');
    for ch in word.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
