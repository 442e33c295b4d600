//! Schema of the `.ci.yaml` definition file.
//!
//! The file is parsed in two steps: serde gives the top-level shape
//! (workflow table, task table), then each task value is walked by hand
//! because the command grammar uses YAML tags, which derived
//! deserializers do not see. The tag set is closed: `!env`, `!group`,
//! `!and`, `!pipe`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yml::value::TaggedValue;
use serde_yml::{Mapping, Value};
use wharf_engine::{CommandNode, Task};

use crate::error::ConfigError;
use crate::template::{expand, TemplateVars};

/// A parsed workflow definition.
#[derive(Debug, Clone)]
pub struct Config {
    pub workflows: BTreeMap<String, Vec<String>>,
    pub tasks: BTreeMap<String, Task>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    workflows: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    tasks: BTreeMap<String, Value>,
}

pub(crate) fn parse_config(content: &str, vars: &TemplateVars) -> Result<Config, ConfigError> {
    let raw: RawConfig = serde_yml::from_str(content)?;
    let mut tasks = BTreeMap::new();
    for (id, value) in raw.tasks {
        let task = parse_task(&id, value, vars)?;
        tasks.insert(id, task);
    }
    Ok(Config {
        workflows: raw.workflows,
        tasks,
    })
}

/// A sequence is a plain command-list task, a mapping is a session task.
fn parse_task(id: &str, value: Value, vars: &TemplateVars) -> Result<Task, ConfigError> {
    match value {
        Value::Sequence(entries) => {
            let mut commands = Vec::with_capacity(entries.len());
            for entry in entries {
                let node = parse_command(entry, vars)?;
                if !node.is_plain() {
                    return Err(ConfigError::InvalidTask {
                        task: id.to_string(),
                        message: "shell operators are only allowed in session tasks".to_string(),
                    });
                }
                commands.push(node);
            }
            Ok(Task::Commands(commands))
        }
        Value::Mapping(map) => parse_session_task(id, map, vars),
        other => Err(ConfigError::InvalidTask {
            task: id.to_string(),
            message: format!(
                "expected a command list or a session mapping, got {}",
                kind_name(&other)
            ),
        }),
    }
}

fn parse_session_task(id: &str, map: Mapping, vars: &TemplateVars) -> Result<Task, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidTask {
        task: id.to_string(),
        message,
    };

    let mut image = None;
    let mut commands = None;
    let mut default_user = false;
    for (key, value) in map {
        let Value::String(key) = key else {
            return Err(invalid(format!("non-string key {}", kind_name(&key))));
        };
        match key.as_str() {
            "image" => match value {
                Value::String(name) => image = Some(name),
                other => return Err(invalid(format!("'image' must be a string, got {}", kind_name(&other)))),
            },
            "commands" => match value {
                Value::Sequence(entries) => {
                    let mut nodes = Vec::with_capacity(entries.len());
                    for entry in entries {
                        nodes.push(parse_command(entry, vars)?);
                    }
                    commands = Some(nodes);
                }
                other => return Err(invalid(format!("'commands' must be a list, got {}", kind_name(&other)))),
            },
            "default_user" => match value {
                Value::Bool(flag) => default_user = flag,
                other => return Err(invalid(format!("'default_user' must be a boolean, got {}", kind_name(&other)))),
            },
            unknown => return Err(invalid(format!("unknown key '{unknown}'"))),
        }
    }

    let image = image.ok_or_else(|| invalid("missing 'image'".to_string()))?;
    let commands = commands.ok_or_else(|| invalid("missing 'commands'".to_string()))?;
    Ok(Task::Session {
        image,
        commands,
        default_user,
    })
}

/// Scalars become single words and lists splice into the surrounding
/// argv; tags build operator nodes or expand templates. Words must be
/// nonempty.
fn parse_command(value: Value, vars: &TemplateVars) -> Result<CommandNode, ConfigError> {
    match value {
        Value::String(word) if word.is_empty() => {
            Err(ConfigError::InvalidCommand("empty word".to_string()))
        }
        Value::String(word) => Ok(CommandNode::word(word)),
        Value::Number(number) => Ok(CommandNode::word(number.to_string())),
        Value::Bool(flag) => Ok(CommandNode::word(flag.to_string())),
        Value::Sequence(entries) => {
            let mut children = Vec::with_capacity(entries.len());
            for entry in entries {
                children.push(parse_command(entry, vars)?);
            }
            Ok(CommandNode::Sequence(children))
        }
        Value::Tagged(tagged) => parse_tagged(*tagged, vars),
        other => Err(ConfigError::InvalidCommand(format!(
            "expected a word, a list, or a tagged node, got {}",
            kind_name(&other)
        ))),
    }
}

fn parse_tagged(tagged: TaggedValue, vars: &TemplateVars) -> Result<CommandNode, ConfigError> {
    let TaggedValue { tag, value } = tagged;
    if tag == "env" {
        let Value::String(template) = value else {
            return Err(ConfigError::InvalidCommand(format!(
                "!env expects a string, got {}",
                kind_name(&value)
            )));
        };
        let word = expand(&template, vars)?;
        if word.is_empty() {
            return Err(ConfigError::InvalidCommand(
                "!env expanded to an empty word".to_string(),
            ));
        }
        return Ok(CommandNode::word(word));
    }

    let wrap = if tag == "group" {
        CommandNode::Group as fn(Box<CommandNode>) -> CommandNode
    } else if tag == "and" {
        CommandNode::And
    } else if tag == "pipe" {
        CommandNode::Pipe
    } else {
        let name = tag.to_string();
        return Err(ConfigError::UnknownTag(
            name.trim_start_matches('!').to_string(),
        ));
    };
    Ok(wrap(Box::new(parse_command(value, vars)?)))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
