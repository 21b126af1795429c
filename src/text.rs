//! Text helpers used by the built-in commands.

/// Splits a comma-separated list, trimming each entry.
/// A list made only of whitespace has no entries.
pub fn split_list(list: &str) -> Vec<&str> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(str::trim).collect()
}

/// Takes up to `count` characters starting at character `from`.
pub fn substring(text: &str, from: usize, count: usize) -> String {
    text.chars().skip(from).take(count).collect()
}

/// Word-wraps each line of `text` to `width` columns.
///
/// Continuation lines are indented by `indent` spaces; existing line breaks
/// and the leading whitespace of each line are kept. Words longer than the
/// width are never split. A width of zero disables wrapping.
pub fn wrap(text: &str, width: usize, indent: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    let pad = " ".repeat(indent);
    let mut result = String::with_capacity(text.len());

    for raw in text.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\r', '\n']);
        let terminator = &raw[line.len()..];
        let leading = &line[..line.len() - line.trim_start().len()];
        result.push_str(leading);
        let mut line_len = leading.chars().count();
        let mut has_word = false;

        for word in line.split_whitespace() {
            let word_len = word.chars().count();
            if has_word && line_len + 1 + word_len > width {
                result.push('\n');
                result.push_str(&pad);
                line_len = indent;
                has_word = false;
            }
            if has_word {
                result.push(' ');
                line_len += 1;
            }
            result.push_str(word);
            line_len += word_len;
            has_word = true;
        }
        result.push_str(terminator);
    }
    result
}

/// Quotes an SQL identifier unless it is a plain upper-case name.
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
