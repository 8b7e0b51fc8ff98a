// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node name, namespace and topic name rules.
//!
//! Namespaces are kept exactly as given (empty or absolute) so that the
//! name/namespace accessors round-trip their inputs. Topic names are
//! expanded against the owning node: relative names get the namespace
//! prefix, `~` stands for the node's fully qualified name.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    InvalidCharacter { index: usize, ch: char },
    StartsWithDigit,
    NotAbsolute,
    EmptyToken,
    TrailingSlash,
    MisplacedTilde,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "must not be empty"),
            NameError::InvalidCharacter { index, ch } => {
                write!(f, "invalid character '{}' at index {}", ch, index)
            }
            NameError::StartsWithDigit => write!(f, "must not start with a digit"),
            NameError::NotAbsolute => write!(f, "must be empty or start with '/'"),
            NameError::EmptyToken => write!(f, "must not contain repeated '/'"),
            NameError::TrailingSlash => write!(f, "must not end with '/'"),
            NameError::MisplacedTilde => write!(f, "'~' is only allowed as the first token"),
        }
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn validate_token(token: &str, offset: usize) -> Result<(), NameError> {
    if token.is_empty() {
        return Err(NameError::EmptyToken);
    }
    if let Some((index, ch)) = token.char_indices().find(|&(_, ch)| !is_name_char(ch)) {
        return Err(NameError::InvalidCharacter {
            index: offset + index,
            ch,
        });
    }
    if token.starts_with(|ch: char| ch.is_ascii_digit()) {
        return Err(NameError::StartsWithDigit);
    }
    Ok(())
}

/// Node names: non-empty, `[A-Za-z0-9_]`, no leading digit.
pub fn validate_node_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    validate_token(name, 0)
}

/// Namespaces: empty (root), `/`, or `/`-separated name tokens.
pub fn validate_namespace(namespace: &str) -> Result<(), NameError> {
    if namespace.is_empty() || namespace == "/" {
        return Ok(());
    }
    let Some(rest) = namespace.strip_prefix('/') else {
        return Err(NameError::NotAbsolute);
    };
    if rest.ends_with('/') {
        return Err(NameError::TrailingSlash);
    }
    let mut offset = 1;
    for token in rest.split('/') {
        validate_token(token, offset)?;
        offset += token.len() + 1;
    }
    Ok(())
}

/// Fully qualified node name (`/ns/name`, or `/name` in the root namespace).
#[must_use]
pub fn fully_qualified_name(name: &str, namespace: &str) -> String {
    let trimmed = namespace.trim_end_matches('/');
    format!("{}/{}", trimmed, name)
}

/// Validate `topic` and expand it against the node it is created on.
pub fn expand_topic_name(topic: &str, node_name: &str, namespace: &str) -> Result<String, NameError> {
    if topic.is_empty() {
        return Err(NameError::Empty);
    }

    let expanded = if let Some(rest) = topic.strip_prefix('~') {
        let base = fully_qualified_name(node_name, namespace);
        match rest {
            "" => base,
            _ if rest.starts_with('/') => format!("{}{}", base, rest),
            _ => return Err(NameError::MisplacedTilde),
        }
    } else if topic.starts_with('/') {
        topic.to_string()
    } else {
        let trimmed = namespace.trim_end_matches('/');
        format!("{}/{}", trimmed, topic)
    };

    let rest = &expanded[1..];
    if rest.is_empty() || rest.ends_with('/') {
        return Err(NameError::TrailingSlash);
    }
    let mut offset = 1;
    for token in rest.split('/') {
        if token.contains('~') {
            return Err(NameError::MisplacedTilde);
        }
        validate_token(token, offset)?;
        offset += token.len() + 1;
    }
    Ok(expanded)
}
