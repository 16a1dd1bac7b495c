use regex_lite::Regex;

use super::buffer::TextBuffer;

/// A selection over the buffer in character offsets, `from <= to`.
/// A collapsed selection (`from == to`) is a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub from: usize,
    pub to: usize,
}

impl Selection {
    pub fn cursor(at: usize) -> Self {
        Self { from: at, to: at }
    }

    pub fn is_cursor(&self) -> bool {
        self.from == self.to
    }

    fn clamped(self, len: usize) -> Self {
        let from = self.from.min(len);
        let to = self.to.max(from).min(len);
        Self { from, to }
    }
}

/// Wrap or unwrap the selection with an inline marker such as `**` or
/// `*`. A selection already carrying the marker on both ends is
/// unwrapped; a cursor gets an empty wrapped pair to type into. Returns
/// the selection over the inner text.
pub fn toggle_wrap(buf: &mut dyn TextBuffer, sel: Selection, marker: &str) -> Selection {
    let sel = sel.clamped(buf.len_chars());
    let text = buf.text();
    let selected = char_slice(&text, sel.from, sel.to);
    let marker_len = marker.chars().count();

    if selected.chars().count() >= 2 * marker_len
        && selected.starts_with(marker)
        && selected.ends_with(marker)
    {
        let inner_len = selected.chars().count() - 2 * marker_len;
        let inner = char_slice(&selected, marker_len, marker_len + inner_len);
        buf.replace(sel.from, sel.to, &inner);
        return Selection { from: sel.from, to: sel.from + inner_len };
    }

    let wrapped = format!("{marker}{selected}{marker}");
    buf.replace(sel.from, sel.to, &wrapped);
    Selection {
        from: sel.from + marker_len,
        to: sel.to + marker_len,
    }
}

/// Set the heading level of the line containing the selection start.
/// Level 0 strips any heading marker; levels 1 through 6 replace it.
pub fn set_heading(buf: &mut dyn TextBuffer, sel: Selection, level: usize) -> Selection {
    let level = level.min(6);
    let text = buf.text();
    let sel = sel.clamped(text.chars().count());
    let (line_start, line_end) = line_bounds(&text, sel.from);
    let line = char_slice(&text, line_start, line_end);

    let heading = Regex::new(r"^\s{0,3}#{1,6}\s+").unwrap();
    let stripped = heading.replace(&line, "").into_owned();
    let replaced = if level == 0 {
        stripped
    } else {
        format!("{} {}", "#".repeat(level), stripped)
    };

    let new_len = replaced.chars().count();
    buf.replace(line_start, line_end, &replaced);
    Selection::cursor(line_start + new_len)
}

/// Toggle a line prefix (`"> "` for quotes, `"- [ ] "` for task items)
/// on every line the selection touches. If every touched line already
/// carries the prefix it is removed, otherwise it is added everywhere.
pub fn toggle_line_prefix(buf: &mut dyn TextBuffer, sel: Selection, prefix: &str) -> Selection {
    let text = buf.text();
    let sel = sel.clamped(text.chars().count());
    let (start, _) = line_bounds(&text, sel.from);
    let (_, end) = line_bounds(&text, sel.to);
    let block = char_slice(&text, start, end);

    let lines: Vec<&str> = block.split('\n').collect();
    let all_prefixed = lines.iter().all(|l| l.starts_with(prefix));

    let replaced: Vec<String> = lines
        .iter()
        .map(|l| {
            if all_prefixed {
                l.strip_prefix(prefix).unwrap_or(l).to_string()
            } else {
                format!("{prefix}{l}")
            }
        })
        .collect();
    let replaced = replaced.join("\n");
    let new_len = replaced.chars().count();
    buf.replace(start, end, &replaced);
    Selection { from: start, to: start + new_len }
}

/// Insert an empty table skeleton at the cursor, on its own lines.
pub fn insert_table(buf: &mut dyn TextBuffer, sel: Selection, cols: usize, rows: usize) -> Selection {
    let sel = sel.clamped(buf.len_chars());
    let cols = cols.max(1);
    let rows = rows.max(1);

    let header: String = format!("|{}\n", " Column |".repeat(cols));
    let divider: String = format!("|{}\n", " --- |".repeat(cols));
    let body: String = format!("|{}\n", "   |".repeat(cols)).repeat(rows);
    let table = format!("\n{header}{divider}{body}");

    let len = table.chars().count();
    buf.replace(sel.from, sel.to, &table);
    Selection::cursor(sel.from + len)
}

/// Fence the selection as a code block with an optional language tag.
pub fn fence_code(buf: &mut dyn TextBuffer, sel: Selection, lang: &str) -> Selection {
    let sel = sel.clamped(buf.len_chars());
    let text = buf.text();
    let selected = char_slice(&text, sel.from, sel.to);

    let body = if selected.is_empty() {
        "\n".to_string()
    } else {
        format!("\n{}\n", selected.trim_end_matches('\n'))
    };
    let fenced = format!("```{lang}{body}```");
    let len = fenced.chars().count();
    buf.replace(sel.from, sel.to, &fenced);
    Selection::cursor(sel.from + len)
}

fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// Character offsets of the start and end of the line containing `at`,
/// excluding the trailing newline.
fn line_bounds(text: &str, at: usize) -> (usize, usize) {
    let chars: Vec<char> = text.chars().collect();
    let at = at.min(chars.len());
    let start = chars[..at]
        .iter()
        .rposition(|&c| c == '\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    let end = chars[at..]
        .iter()
        .position(|&c| c == '\n')
        .map(|p| at + p)
        .unwrap_or(chars.len());
    (start, end)
}
