//! Message tokenizing and switch parsing.

use crate::commands::CommandArgs;

/// The lowercase command name, if the first word carries the prefix.
///
/// Messages that do not start with the prefix are not commands.
pub fn command_name(text: &str, prefix: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix(prefix)?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// Split message text into tokens.
///
/// Quoted runs stay one token (`-h "says hi"`). Text with unbalanced
/// quotes falls back to whitespace splitting.
pub fn tokenize(text: &str) -> Vec<String> {
    if !text.contains(['"', '\'']) {
        return text.split_whitespace().map(str::to_string).collect();
    }

    match shell_words::split(&escape_comments(text)) {
        Ok(tokens) => tokens,
        Err(_) => text.split_whitespace().map(str::to_string).collect(),
    }
}

/// Escape unquoted `#` at word starts so it is not read as a comment.
fn escape_comments(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut word_start = true;

    for c in text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' && word_start => escaped.push('\\'),
            None => {}
        }
        word_start = c.is_whitespace();
        escaped.push(c);
    }

    escaped
}

/// Separate positional arguments from switches.
///
/// A token starting with `-` or `--` names a switch. The next token is
/// its value unless it also starts with `-`, in which case the switch
/// is present with the value `"true"`. Short names are rewritten to
/// their long form through `aliases`.
pub fn parse_arguments(tokens: &[String], aliases: &[(&str, &str)]) -> CommandArgs {
    let mut args = CommandArgs::default();
    let mut tokens = tokens.iter().peekable();

    while let Some(token) = tokens.next() {
        let Some(name) = switch_name(token) else {
            args.positional.push(token.clone());
            continue;
        };

        let name = aliases
            .iter()
            .find(|(short, _)| *short == name)
            .map(|(_, long)| long.to_string())
            .unwrap_or(name);

        let value = match tokens.next_if(|next| !next.starts_with('-')) {
            Some(value) => value.clone(),
            None => "true".to_string(),
        };

        args.switches.insert(name, value);
    }

    args
}

fn switch_name(token: &str) -> Option<String> {
    let name = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}
