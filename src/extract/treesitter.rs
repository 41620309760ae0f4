//! Shared tree-sitter plumbing for the structured extractors.

use tree_sitter::{Language, Node, Parser, Tree};

/// Holds a parsed tree-sitter tree and the source it was built from.
pub struct ParsedSource<'s> {
    /// The tree-sitter parse tree.
    pub tree: Tree,
    /// The original source code (kept for node text extraction).
    pub source: &'s [u8],
}

impl<'s> ParsedSource<'s> {
    /// Parse `text` with the given grammar.
    ///
    /// Syntax errors still produce a tree with ERROR nodes; only a
    /// grammar/ABI mismatch or cancellation fails outright.
    pub fn parse(language: &Language, text: &'s str) -> anyhow::Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(language)?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| anyhow::anyhow!("tree-sitter returned no tree"))?;
        Ok(Self {
            tree,
            source: text.as_bytes(),
        })
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source).unwrap_or("")
    }

    /// Text of a named field, if present and non-empty.
    pub fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| self.node_text(n).trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// 1-indexed line of a node.
pub fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// Collect the contiguous comment block directly above `node`.
///
/// Walks previous siblings while they are comments (skipping the kinds in
/// `skip`, e.g. attributes or decorators) and stops at the first blank-line
/// gap or non-comment sibling. `strip` turns one raw comment into its text,
/// returning None for comments that are not documentation.
pub fn preceding_comments<F>(
    parsed: &ParsedSource,
    node: Node,
    comment_kinds: &[&str],
    skip: &[&str],
    strip: F,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut lines: Vec<String> = Vec::new();
    let mut expected_end_row = node.start_position().row;
    let mut current = node.prev_sibling();

    while let Some(sibling) = current {
        let kind = sibling.kind();
        if skip.contains(&kind) {
            expected_end_row = sibling.start_position().row;
            current = sibling.prev_sibling();
            continue;
        }
        if !comment_kinds.contains(&kind) {
            break;
        }
        // Line comment nodes may swallow their newline and end at column 0
        // of the following row.
        let end = sibling.end_position();
        let end_row = if end.column == 0 && end.row > sibling.start_position().row {
            end.row - 1
        } else {
            end.row
        };
        if end_row + 1 < expected_end_row {
            break;
        }
        match strip(parsed.node_text(sibling)) {
            Some(text) => lines.push(text),
            None => break,
        }
        expected_end_row = sibling.start_position().row;
        current = sibling.prev_sibling();
    }

    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    let joined = lines.join("\n").trim().to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Dedent and trim a docstring or block comment body.
pub fn clean_doc(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let leading = line.len() - line.trim_start().len();
        match line.get(indent..) {
            Some(rest) if i > 0 && leading >= indent => out.push(rest.trim_end().to_string()),
            _ => out.push(line.trim().to_string()),
        }
    }
    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_doc_dedents() {
        let raw = "Summary line.\n\n    Details here.\n      nested\n";
        assert_eq!(clean_doc(raw), "Summary line.\n\nDetails here.\n  nested");
    }
}
