//! Revision diffs for edit notifications.
//!
//! Content is first tidied into a full, indented HTML document so that the
//! line-level diff tracks structure rather than raw source formatting.

// ---------------------------------------------------------------------------
// Tidy
// ---------------------------------------------------------------------------

const INDENT: &str = "  ";

/// Elements rendered inside the surrounding text line.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em", "i", "img", "kbd",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose inner text is kept byte-for-byte.
const VERBATIM_ELEMENTS: &[&str] = &["pre", "script", "style", "textarea"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Open { name: String, raw: &'a str, self_closing: bool },
    Close { name: String, raw: &'a str },
    Text(&'a str),
    Comment(&'a str),
    /// Inner content of a verbatim element
    Verbatim(&'a str),
}

fn tag_name(inner: &str) -> String {
    inner
        .trim_start_matches('/')
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Whether a '<' opens a tag, end tag, comment, doctype or processing instruction.
fn starts_markup(rest: &str) -> bool {
    let mut chars = rest.chars().skip(1);
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '!' || c == '?' => true,
        Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < html.len() {
        let rest = &html[pos..];

        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            tokens.push(Token::Text(&rest[..end]));
            pos += end;
            continue;
        }

        if !starts_markup(rest) {
            // Bare '<' in running text
            tokens.push(Token::Text(&rest[..1]));
            pos += 1;
            continue;
        }

        if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|e| e + 3).unwrap_or(rest.len());
            tokens.push(Token::Comment(&rest[..end]));
            pos += end;
            continue;
        }

        let Some(end) = rest.find('>') else {
            // Stray '<' without a closing bracket is text
            tokens.push(Token::Text(rest));
            break;
        };
        let raw = &rest[..=end];
        pos += end + 1;

        // Doctype and processing instructions are regenerated by the wrapper
        if raw.starts_with("<!") || raw.starts_with("<?") {
            continue;
        }

        let inner = &raw[1..raw.len() - 1];
        let name = tag_name(inner);
        if name.is_empty() {
            tokens.push(Token::Text(raw));
            continue;
        }

        if inner.starts_with('/') {
            tokens.push(Token::Close { name, raw });
            continue;
        }

        let self_closing = inner.trim_end().ends_with('/');
        let verbatim = !self_closing && VERBATIM_ELEMENTS.contains(&name.as_str());
        tokens.push(Token::Open {
            name: name.clone(),
            raw,
            self_closing,
        });

        if verbatim {
            let remaining = &html[pos..];
            let close = find_ci(remaining, &format!("</{}", name)).unwrap_or(remaining.len());
            if close > 0 {
                tokens.push(Token::Verbatim(&remaining[..close]));
            }
            pos += close;
        }
    }

    tokens
}

struct Printer {
    lines: Vec<String>,
    depth: usize,
    inline: String,
}

impl Printer {
    fn new(depth: usize) -> Self {
        Self {
            lines: Vec::new(),
            depth,
            inline: String::new(),
        }
    }

    fn push_line(&mut self, text: &str) {
        self.lines.push(format!("{}{}", INDENT.repeat(self.depth), text));
    }

    fn flush_inline(&mut self) {
        let collapsed = self.inline.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            self.push_line(&collapsed);
        }
        self.inline.clear();
    }
}

/// Pretty-print a content fragment inside a synthetic HTML document.
///
/// Block elements land on their own lines, indented two spaces per nesting
/// level; text and inline elements share a single collapsed line.
pub fn tidy_content(content: &str) -> String {
    let mut printer = Printer::new(2);
    let mut in_head = false;

    for token in tokenize(content) {
        match token {
            Token::Open { name, raw, self_closing } => {
                match name.as_str() {
                    "html" | "body" => continue,
                    "head" => {
                        in_head = !self_closing;
                        continue;
                    }
                    _ if in_head => continue,
                    _ => {}
                }

                if INLINE_ELEMENTS.contains(&name.as_str()) {
                    printer.inline.push_str(raw);
                    continue;
                }

                printer.flush_inline();
                printer.push_line(raw);
                if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
                    printer.depth += 1;
                }
            }
            Token::Close { name, raw } => {
                match name.as_str() {
                    "html" | "body" => continue,
                    "head" => {
                        in_head = false;
                        continue;
                    }
                    _ if in_head => continue,
                    _ => {}
                }

                if INLINE_ELEMENTS.contains(&name.as_str()) {
                    printer.inline.push_str(raw);
                    continue;
                }
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }

                printer.flush_inline();
                printer.depth = printer.depth.saturating_sub(1).max(2);
                printer.push_line(raw);
            }
            Token::Text(text) => {
                if !in_head {
                    printer.inline.push_str(text);
                }
            }
            Token::Comment(raw) => {
                if !in_head {
                    printer.flush_inline();
                    printer.push_line(raw);
                }
            }
            Token::Verbatim(text) => {
                printer.flush_inline();
                for line in text.trim_matches('\n').lines() {
                    printer.lines.push(line.to_string());
                }
            }
        }
    }
    printer.flush_inline();

    let mut lines = vec![
        "<!DOCTYPE html>".to_string(),
        "<html>".to_string(),
        format!("{}<head>", INDENT),
        format!("{}<title></title>", INDENT.repeat(2)),
        format!("{}</head>", INDENT),
        format!("{}<body>", INDENT),
    ];
    lines.extend(printer.lines);
    lines.push(format!("{}</body>", INDENT));
    lines.push("</html>".to_string());

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Unified diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Equal,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy)]
struct Op<'a> {
    kind: OpKind,
    text: &'a str,
    /// Old lines consumed before this op
    old_pos: usize,
    /// New lines consumed before this op
    new_pos: usize,
}

/// Line-level edit script using LCS, deletions ordered before insertions.
///
/// The common prefix and suffix are matched up front so the LCS table only
/// covers the changed window.
fn line_ops<'a>(old_lines: &[&'a str], new_lines: &[&'a str]) -> Vec<Op<'a>> {
    let prefix = old_lines
        .iter()
        .zip(new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_lines[prefix..]
        .iter()
        .rev()
        .zip(new_lines[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old_lines[prefix..old_lines.len() - suffix];
    let new_mid = &new_lines[prefix..new_lines.len() - suffix];

    let mut script: Vec<(OpKind, &'a str)> = Vec::with_capacity(old_lines.len() + new_mid.len());
    script.extend(old_lines[..prefix].iter().map(|line| (OpKind::Equal, *line)));
    script.extend(lcs_script(old_mid, new_mid));
    script.extend(
        old_lines[old_lines.len() - suffix..]
            .iter()
            .map(|line| (OpKind::Equal, *line)),
    );

    let mut ops = Vec::with_capacity(script.len());
    let (mut old_pos, mut new_pos) = (0, 0);
    for (kind, text) in script {
        ops.push(Op {
            kind,
            text,
            old_pos,
            new_pos,
        });
        match kind {
            OpKind::Equal => {
                old_pos += 1;
                new_pos += 1;
            }
            OpKind::Delete => old_pos += 1,
            OpKind::Insert => new_pos += 1,
        }
    }
    ops
}

/// Edit script for a window with no shared prefix or suffix.
fn lcs_script<'a>(old_lines: &[&'a str], new_lines: &[&'a str]) -> Vec<(OpKind, &'a str)> {
    let m = old_lines.len();
    let n = new_lines.len();
    let width = n + 1;

    // Row-major (m+1) x (n+1) table
    let mut lcs = vec![0u32; (m + 1) * width];
    for i in 1..=m {
        for j in 1..=n {
            lcs[i * width + j] = if old_lines[i - 1] == new_lines[j - 1] {
                lcs[(i - 1) * width + j - 1] + 1
            } else {
                lcs[(i - 1) * width + j].max(lcs[i * width + j - 1])
            };
        }
    }

    // Backtrack from the end, then reverse.
    let mut reversed = Vec::with_capacity(m + n);
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_lines[i - 1] == new_lines[j - 1] {
            reversed.push((OpKind::Equal, old_lines[i - 1]));
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || lcs[i * width + j - 1] >= lcs[(i - 1) * width + j]) {
            reversed.push((OpKind::Insert, new_lines[j - 1]));
            j -= 1;
        } else {
            reversed.push((OpKind::Delete, old_lines[i - 1]));
            i -= 1;
        }
    }
    reversed.reverse();
    reversed
}

fn format_range(start: usize, length: usize) -> String {
    let beginning = start + 1;
    match length {
        0 => format!("{},0", beginning - 1),
        1 => beginning.to_string(),
        _ => format!("{},{}", beginning, length),
    }
}

/// Unified diff of two texts with `context` unchanged lines around each hunk.
///
/// Header lines are followed by an empty line and body lines carry no
/// terminator, so the result reads like a line list joined with newlines.
/// Identical inputs produce an empty string.
pub fn unified_diff(old: &str, new: &str, from_label: &str, to_label: &str, context: usize) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ops = line_ops(&old_lines, &new_lines);

    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| op.kind != OpKind::Equal)
        .map(|(idx, _)| idx)
        .collect();
    if changes.is_empty() {
        return String::new();
    }

    // Group changes separated by at most 2 * context unchanged lines.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &idx in &changes {
        match groups.last_mut() {
            Some((_, last)) if idx - *last - 1 <= 2 * context => *last = idx,
            _ => groups.push((idx, idx)),
        }
    }

    let mut out = vec![format!("--- {}\n", from_label), format!("+++ {}\n", to_label)];

    for (first, last) in groups {
        let start = first.saturating_sub(context);
        let end = (last + context + 1).min(ops.len());
        let hunk = &ops[start..end];

        let old_len = hunk.iter().filter(|op| op.kind != OpKind::Insert).count();
        let new_len = hunk.iter().filter(|op| op.kind != OpKind::Delete).count();
        out.push(format!(
            "@@ -{} +{} @@\n",
            format_range(hunk[0].old_pos, old_len),
            format_range(hunk[0].new_pos, new_len)
        ));

        for op in hunk {
            let marker = match op.kind {
                OpKind::Equal => ' ',
                OpKind::Delete => '-',
                OpKind::Insert => '+',
            };
            out.push(format!("{}{}", marker, op.text));
        }
    }

    out.join("\n")
}

/// Diff between two revisions' tidied content.
pub fn content_diff(
    old_content: &str,
    new_content: &str,
    from_label: &str,
    to_label: &str,
    context: usize,
) -> String {
    unified_diff(
        &tidy_content(old_content),
        &tidy_content(new_content),
        from_label,
        to_label,
        context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tidy_paragraph() {
        let tidied = tidy_content("<p>Getting started...</p>");
        let expected = "\
<!DOCTYPE html>
<html>
  <head>
    <title></title>
  </head>
  <body>
    <p>
      Getting started...
    </p>
  </body>
</html>";
        assert_eq!(tidied, expected);
    }

    #[test]
    fn test_tidy_nested_blocks_and_inline() {
        let tidied = tidy_content("<ul>\n<li>Use <code>let</code>  here</li><li>Two</li></ul><hr>");
        let body: Vec<&str> = tidied.lines().skip(6).collect();
        assert_eq!(
            body,
            vec![
                "    <ul>",
                "      <li>",
                "        Use <code>let</code> here",
                "      </li>",
                "      <li>",
                "        Two",
                "      </li>",
                "    </ul>",
                "    <hr>",
                "  </body>",
                "</html>",
            ]
        );
    }

    #[test]
    fn test_tidy_keeps_pre_verbatim() {
        let tidied = tidy_content("<pre>fn main() {\n    run();\n}</pre>");
        assert!(tidied.contains("    <pre>\nfn main() {\n    run();\n}\n    </pre>"));
    }

    #[test]
    fn test_tidy_strips_existing_document_wrapper() {
        let tidied = tidy_content(
            "<!DOCTYPE html><html><head><title>Old</title></head><body><p>Hi</p></body></html>",
        );
        assert_eq!(tidied, tidy_content("<p>Hi</p>"));
    }

    #[test]
    fn test_tidy_bare_less_than_in_text() {
        let tidied = tidy_content("<p>a < b</p><p>c</p>");
        let body: Vec<&str> = tidied.lines().skip(6).collect();
        assert_eq!(
            body,
            vec![
                "    <p>",
                "      a < b",
                "    </p>",
                "    <p>",
                "      c",
                "    </p>",
                "  </body>",
                "</html>",
            ]
        );
    }

    #[test]
    fn test_tidy_less_than_before_slash_and_digit() {
        let tidied = tidy_content("<p>x </ y <3</p>");
        assert!(tidied.contains("\n      x </ y <3\n    </p>\n"));
    }

    #[test]
    fn test_tidy_empty_content() {
        let tidied = tidy_content("");
        assert_eq!(tidied.lines().count(), 8);
    }

    #[test]
    fn test_unified_diff_identical() {
        assert_eq!(unified_diff("a\nb", "a\nb", "old", "new", 3), "");
    }

    #[test]
    fn test_unified_diff_single_change() {
        let diff = unified_diff("a\nb\nc", "a\nx\nc", "old", "new", 3);
        assert_eq!(diff, "--- old\n\n+++ new\n\n@@ -1,3 +1,3 @@\n\n a\n-b\n+x\n c");
    }

    #[test]
    fn test_unified_diff_pure_insert_range() {
        let diff = unified_diff("", "a", "old", "new", 3);
        assert_eq!(diff, "--- old\n\n+++ new\n\n@@ -0,0 +1 @@\n\n+a");
    }

    #[test]
    fn test_unified_diff_separate_hunks() {
        let old: Vec<String> = (1..=20).map(|i| format!("line {}", i)).collect();
        let mut new = old.clone();
        new[1] = "changed 2".to_string();
        new[17] = "changed 18".to_string();

        let diff = unified_diff(&old.join("\n"), &new.join("\n"), "old", "new", 3);
        let headers: Vec<&str> = diff.lines().filter(|l| l.starts_with("@@")).collect();
        assert_eq!(headers, vec!["@@ -1,5 +1,5 @@", "@@ -15,6 +15,6 @@"]);
    }

    #[test]
    fn test_unified_diff_nearby_changes_merge() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8";
        let new = "1\nX\n3\n4\n5\n6\nY\n8";
        let diff = unified_diff(old, new, "old", "new", 2);
        assert_eq!(diff.lines().filter(|l| l.starts_with("@@")).count(), 1);
    }

    #[test]
    fn test_unified_diff_long_text_single_change() {
        let old: Vec<String> = (1..=50_000).map(|i| format!("line {}", i)).collect();
        let mut new = old.clone();
        new[24_999] = "changed".to_string();

        let diff = unified_diff(&old.join("\n"), &new.join("\n"), "old", "new", 3);
        let headers: Vec<&str> = diff.lines().filter(|l| l.starts_with("@@")).collect();
        assert_eq!(headers, vec!["@@ -24997,7 +24997,7 @@"]);
        assert!(diff.contains("\n-line 25000\n+changed\n"));
    }

    #[test]
    fn test_content_diff_large_page_appended_paragraph() {
        let old: String = (0..12_000).map(|i| format!("<p>Paragraph {}</p>", i)).collect();
        let new = format!("{}<p>Appended</p>", old);

        let diff = content_diff(&old, &new, "old", "new", 3);
        let headers: Vec<&str> = diff.lines().filter(|l| l.starts_with("@@")).collect();
        assert_eq!(headers, vec!["@@ -36004,5 +36004,8 @@"]);

        let added: Vec<&str> = diff
            .lines()
            .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
            .collect();
        assert_eq!(added, vec!["+    <p>", "+      Appended", "+    </p>"]);
    }

    #[test]
    fn test_content_diff_between_revisions() {
        let diff = content_diff(
            "<p>Getting started...</p>",
            "<p>The root document.</p>",
            "[en-US] #1",
            "[en-US] #2",
            3,
        );
        let expected = "\
--- [en-US] #1

+++ [en-US] #2

@@ -5,7 +5,7 @@

   </head>
   <body>
     <p>
-      Getting started...
+      The root document.
     </p>
   </body>
 </html>";
        assert_eq!(diff, expected);
    }
}
