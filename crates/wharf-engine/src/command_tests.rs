use super::*;

use std::process::Command;

fn sh(line: &str) -> std::process::Output {
    Command::new("sh")
        .arg("-c")
        .arg(line)
        .output()
        .expect("sh should be available")
}

#[test]
fn test_serialize_bare_leaf() {
    let node = CommandNode::leaf("cargo", ["build", "--release"]);
    assert_eq!(node.serialize(), "cargo build --release");
}

#[test]
fn test_serialize_quotes_spaces() {
    let node = CommandNode::leaf("echo", ["hello world"]);
    assert_eq!(node.serialize(), "echo 'hello world'");
}

#[test]
fn test_serialize_quotes_metacharacters() {
    assert_eq!(CommandNode::word("$HOME").serialize(), "'$HOME'");
    assert_eq!(CommandNode::word("a&&b").serialize(), "'a&&b'");
    assert_eq!(CommandNode::word("a|b").serialize(), "'a|b'");
    assert_eq!(CommandNode::word("it's").serialize(), "'it'\\''s'");
    assert_eq!(CommandNode::word("").serialize(), "''");
}

#[test]
fn test_serialize_is_deterministic() {
    let node = CommandNode::Sequence(vec![
        CommandNode::leaf("echo", ["a b", "$x"]),
        CommandNode::And(Box::new(CommandNode::word("true"))),
        CommandNode::Pipe(Box::new(CommandNode::leaf("grep", ["a"]))),
    ]);
    let first = node.serialize();
    let second = node.serialize();
    assert_eq!(first, second);
    assert_eq!(node.clone().serialize(), first);
}

#[test]
fn test_serialize_sequence_preserves_order() {
    let node = CommandNode::Sequence(vec![
        CommandNode::word("one"),
        CommandNode::word("two"),
        CommandNode::word("three"),
    ]);
    assert_eq!(node.serialize(), "one two three");
}

#[test]
fn test_serialize_operators() {
    let group = CommandNode::Group(Box::new(CommandNode::leaf("make", ["test"])));
    assert_eq!(group.serialize(), "(make test)");

    let and = CommandNode::And(Box::new(CommandNode::word("ok")));
    assert_eq!(and.serialize(), "&& ok");

    let pipe = CommandNode::Pipe(Box::new(CommandNode::leaf("grep", ["foo"])));
    assert_eq!(pipe.serialize(), "| grep foo");
}

#[test]
fn test_serialize_nested_composition() {
    let node = CommandNode::Sequence(vec![
        CommandNode::leaf("cd", ["build"]),
        CommandNode::And(Box::new(CommandNode::word("make"))),
    ]);
    assert_eq!(node.serialize(), "cd build && make");

    let grouped = CommandNode::Sequence(vec![
        CommandNode::Group(Box::new(node)),
        CommandNode::And(Box::new(CommandNode::leaf("echo", ["done"]))),
    ]);
    assert_eq!(grouped.serialize(), "(cd build && make) && echo done");
}

#[test]
fn test_flatten_argv_splices_sequences() {
    let node = CommandNode::Sequence(vec![
        CommandNode::Sequence(vec![
            CommandNode::word("docker"),
            CommandNode::word("compose"),
            CommandNode::word("build"),
        ]),
        CommandNode::leaf("--build-arg", ["UID=1000"]),
    ]);
    assert_eq!(
        node.flatten_argv().unwrap(),
        vec!["docker", "compose", "build", "--build-arg", "UID=1000"]
    );
}

#[test]
fn test_flatten_argv_rejects_operators() {
    let cases = [
        (
            CommandNode::Group(Box::new(CommandNode::word("x"))),
            "group",
        ),
        (CommandNode::And(Box::new(CommandNode::word("x"))), "and"),
        (CommandNode::Pipe(Box::new(CommandNode::word("x"))), "pipe"),
    ];
    for (node, expected) in cases {
        let wrapped = CommandNode::Sequence(vec![CommandNode::word("echo"), node]);
        match wrapped.flatten_argv() {
            Err(EngineError::OperatorInPlainTask(name)) => assert_eq!(name, expected),
            other => panic!("expected operator rejection, got {:?}", other),
        }
    }
}

#[test]
fn test_is_plain() {
    let plain = CommandNode::Sequence(vec![
        CommandNode::word("echo"),
        CommandNode::Sequence(vec![CommandNode::word("hi")]),
    ]);
    assert!(plain.is_plain());

    let piped = CommandNode::Sequence(vec![
        CommandNode::word("echo"),
        CommandNode::Pipe(Box::new(CommandNode::word("cat"))),
    ]);
    assert!(!piped.is_plain());
}

#[test]
fn test_shell_quote_safe_words_stay_bare() {
    for word in ["abc", "a-b_c.d", "/usr/bin/env", "x=1", "a:b", "v1.2%+,@"] {
        assert_eq!(shell_quote(word), word);
    }
}

// The properties below run the serialized line through a real shell and
// check the child received the literal bytes.

#[test]
fn test_executed_line_preserves_literal_args() {
    let nasty = [
        "hello world",
        "it's",
        "$HOME",
        "a&&b",
        "a|b",
        "semi;colon",
        "star*glob",
        "back\\slash",
        "tab\tchar",
        "line\nbreak",
        "héllo",
    ];
    for arg in nasty {
        let line = CommandNode::leaf("printf", ["%s", arg]).serialize();
        let output = sh(&line);
        assert!(output.status.success(), "failed to run: {}", line);
        assert_eq!(
            output.stdout,
            arg.as_bytes(),
            "argument mangled by: {}",
            line
        );
    }
}

#[test]
fn test_executed_and_short_circuits() {
    let failing = CommandNode::Sequence(vec![
        CommandNode::word("false"),
        CommandNode::And(Box::new(CommandNode::leaf("echo", ["no"]))),
    ]);
    let output = sh(&failing.serialize());
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let passing = CommandNode::Sequence(vec![
        CommandNode::word("true"),
        CommandNode::And(Box::new(CommandNode::leaf("echo", ["yes"]))),
    ]);
    let output = sh(&passing.serialize());
    assert!(output.status.success());
    assert_eq!(output.stdout, b"yes\n");
}

#[test]
fn test_executed_pipe_connects_stdout() {
    let node = CommandNode::Sequence(vec![
        CommandNode::leaf("echo", ["wharf"]),
        CommandNode::Pipe(Box::new(CommandNode::leaf("tr", ["a-z", "A-Z"]))),
    ]);
    let output = sh(&node.serialize());
    assert!(output.status.success());
    assert_eq!(output.stdout, b"WHARF\n");
}

#[test]
fn test_executed_group_isolates_directory() {
    let node = CommandNode::Sequence(vec![
        CommandNode::Group(Box::new(CommandNode::Sequence(vec![
            CommandNode::leaf("cd", ["/"]),
            CommandNode::And(Box::new(CommandNode::word("pwd"))),
        ]))),
        CommandNode::And(Box::new(CommandNode::word("pwd"))),
    ]);
    assert_eq!(node.serialize(), "(cd / && pwd) && pwd");

    let dir = tempfile::tempdir().unwrap();
    let output = Command::new("sh")
        .arg("-c")
        .arg(node.serialize())
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    let mut lines = text.lines();
    // The subshell's cd must not leak into the outer shell.
    assert_eq!(lines.next(), Some("/"));
    assert_ne!(lines.next(), Some("/"));
}
