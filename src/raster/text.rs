use crate::fragment::{cell_width, sanitize_cells};

/// Splits a label on explicit line breaks (`\n`, a literal `\n` escape or
/// `<br>`), trimming each line.
pub fn split_lines(text: &str) -> Vec<String> {
    let current = text
        .replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("\\n", "\n");
    current.split('\n').map(|line| line.trim().to_string()).collect()
}

/// Greedy word wrap to `max_width` cells. Words longer than a whole line are
/// broken hard.
pub fn wrap_line(line: &str, max_width: usize) -> Vec<String> {
    let line = sanitize_cells(line);
    let max_width = max_width.max(1);
    if cell_width(&line) <= max_width {
        return vec![line];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if cell_width(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > max_width {
            lines.push(chars.drain(..max_width).collect());
        }
        current = chars.into_iter().collect();
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Wrapped label lines; always at least one (possibly empty) line.
pub fn layout_label(text: &str, max_width: usize) -> Vec<String> {
    let mut lines: Vec<String> = split_lines(text)
        .iter()
        .flat_map(|line| wrap_line(line, max_width))
        .collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
