//! The `macros <verb> [target]` management grammar.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementOp {
    List,
    Show(String),
    Delete(String),
    /// Not supported; answered with a "delete and recreate" notice
    Edit(String),
    Search(String),
    /// `macros tag <name> #tag [#tag ...]`
    Tag { name: String, tags: Vec<String> },
    Stats,
}

impl fmt::Display for ManagementOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagementOp::List => write!(f, "list"),
            ManagementOp::Show(name) => write!(f, "show {name}"),
            ManagementOp::Delete(name) => write!(f, "delete {name}"),
            ManagementOp::Edit(name) => write!(f, "edit {name}"),
            ManagementOp::Search(query) => write!(f, "search {query}"),
            ManagementOp::Tag { name, tags } => {
                write!(f, "tag {name}")?;
                for tag in tags {
                    write!(f, " #{tag}")?;
                }
                Ok(())
            }
            ManagementOp::Stats => write!(f, "stats"),
        }
    }
}

/// Recognize a management command. Verbs are case-insensitive; the target
/// keeps its case and is trimmed. Verbs that need a target and have none are
/// not management commands.
pub fn parse_management(input: &str) -> Option<ManagementOp> {
    let input = input.trim();
    let (first, rest) = split_word(input);

    if first.eq_ignore_ascii_case("list") && rest.eq_ignore_ascii_case("macros") {
        return Some(ManagementOp::List);
    }
    if !first.eq_ignore_ascii_case("macros") {
        return None;
    }

    let (verb, target) = split_word(rest);
    let verb = verb.to_ascii_lowercase();
    match (verb.as_str(), target) {
        ("list", "") => Some(ManagementOp::List),
        ("stats", "") => Some(ManagementOp::Stats),
        (_, "") => None,
        ("show", target) => Some(ManagementOp::Show(target.to_string())),
        ("delete", target) => Some(ManagementOp::Delete(target.to_string())),
        ("edit", target) => Some(ManagementOp::Edit(target.to_string())),
        ("search", target) => Some(ManagementOp::Search(target.to_string())),
        ("tag", target) => parse_tag(target),
        _ => None,
    }
}

/// `<name> #tag [#tag ...]`: the trailing `#words` are the tags. Both parts
/// are required.
fn parse_tag(target: &str) -> Option<ManagementOp> {
    let words: Vec<&str> = target.split_whitespace().collect();
    let split = words
        .iter()
        .rposition(|w| !is_tag_word(w))
        .map_or(0, |i| i + 1);
    let (name, tags) = words.split_at(split);
    if name.is_empty() || tags.is_empty() {
        return None;
    }
    Some(ManagementOp::Tag {
        name: name.join(" "),
        tags: tags.iter().map(|t| t[1..].to_string()).collect(),
    })
}

fn is_tag_word(word: &str) -> bool {
    word.len() > 1 && word.starts_with('#')
}

/// First whitespace-delimited word and the trimmed remainder
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim()),
        None => (text, ""),
    }
}
