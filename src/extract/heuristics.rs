//! Line-oriented helpers shared by the pattern-based extractors.

/// Maximum number of physical lines joined into one logical declaration.
pub const MAX_JOINED_LINES: usize = 10;

/// Net parenthesis depth of a line, ignoring string and char literals.
fn paren_balance(line: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Join `lines[start..]` until parentheses balance.
///
/// Returns the joined text (single spaces between trimmed lines) and the
/// index of the last line consumed. A declaration whose parameter list
/// opens on `start` but never closes within the window stays unjoined.
pub fn join_declaration(lines: &[&str], start: usize) -> (String, usize) {
    let first = lines[start].trim();
    let mut depth = paren_balance(first);
    if depth <= 0 {
        return (first.to_string(), start);
    }

    let mut joined = first.to_string();
    let end = (start + MAX_JOINED_LINES).min(lines.len());
    for (idx, line) in lines.iter().enumerate().take(end).skip(start + 1) {
        let trimmed = line.trim();
        joined.push(' ');
        joined.push_str(trimmed);
        depth += paren_balance(trimmed);
        if depth <= 0 {
            return (joined, idx);
        }
    }
    (first.to_string(), start)
}

/// Split on `sep` at nesting depth zero (brackets, generics, literals).
pub fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut prev = '\0';

    for ch in text.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q && prev != '\\' {
                quote = None;
            }
            prev = ch;
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            // `=>` inside a default value is not a closing generic.
            '>' if prev != '=' => depth -= 1,
            c if c == sep && depth <= 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                prev = ch;
                continue;
            }
            _ => {}
        }
        current.push(ch);
        prev = ch;
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts.retain(|p| !p.is_empty());
    parts
}

/// Find the first `sep` at depth zero and split there.
pub fn split_once_top_level(text: &str, sep: char) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for (idx, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            prev = ch;
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '>' if prev != '=' => depth -= 1,
            c if c == sep && depth <= 0 && !is_compound_operator(text, idx, prev) => {
                return Some((&text[..idx], &text[idx + ch.len_utf8()..]));
            }
            _ => {}
        }
        prev = ch;
    }
    None
}

/// `=` that belongs to `=>`, `==`, `!=`, `<=` or `>=`.
fn is_compound_operator(text: &str, idx: usize, prev: char) -> bool {
    if text.as_bytes()[idx] != b'=' {
        return false;
    }
    let next = text[idx + 1..].chars().next();
    matches!(next, Some('>') | Some('=')) || matches!(prev, '=' | '!' | '<' | '>')
}

/// Content between the first `(` of `decl` and its matching `)`.
pub fn parenthesized(decl: &str) -> Option<&str> {
    let open = decl.find('(')?;
    let mut depth = 0i32;
    for (idx, ch) in decl[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&decl[open + 1..open + idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The `/** ... */` block ending directly above `lines[decl_idx]`.
///
/// Annotation/decorator lines (`@...`) and line comments between the block
/// and the declaration are skipped; any other code line stops the search.
pub fn preceding_block_doc(lines: &[&str], decl_idx: usize) -> Option<String> {
    let mut idx = decl_idx;
    let mut block: Vec<&str> = Vec::new();
    let mut inside = false;

    while idx > 0 {
        idx -= 1;
        let line = lines[idx].trim();
        if inside {
            block.push(line);
            if line.starts_with("/**") {
                break;
            }
            if line.starts_with("/*") {
                // Plain block comment, not documentation.
                return None;
            }
            continue;
        }
        if line.ends_with("*/") {
            block.push(line);
            if line.starts_with("/**") {
                break;
            }
            inside = true;
            continue;
        }
        if line.is_empty() || line.starts_with('@') || line.starts_with("//") {
            continue;
        }
        return None;
    }

    if block.is_empty() || !block.last().is_some_and(|l| l.starts_with("/**")) {
        return None;
    }
    block.reverse();

    let cleaned: Vec<String> = block
        .iter()
        .map(|line| {
            let line = line.trim_start_matches("/**");
            let line = line.strip_suffix("*/").unwrap_or(line);
            let line = line.trim();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line).trim_end().to_string()
        })
        .collect();

    let text = cleaned.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Brace depth change of a line, ignoring literals and `//` comments.
pub fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for ch in line.chars() {
        if let Some(q) = quote {
            if ch == q && prev != '\\' {
                quote = None;
            }
            prev = ch;
            continue;
        }
        match ch {
            '/' if prev == '/' => break,
            '"' | '\'' | '`' => quote = Some(ch),
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
        prev = ch;
    }
    delta
}

/// A class whose declaration line has been seen.
#[derive(Debug)]
struct OpenClass {
    name: String,
    /// Brace depth at the declaration line
    depth: i32,
    /// Whether the class body brace has been seen yet
    opened: bool,
}

/// Tracks the enclosing class by brace depth, line by line.
#[derive(Debug, Default)]
pub struct ClassTracker {
    depth: i32,
    stack: Vec<OpenClass>,
}

impl ClassTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a class declaration starting on the current line.
    pub fn enter(&mut self, name: &str) {
        self.stack.push(OpenClass {
            name: name.to_string(),
            depth: self.depth,
            opened: false,
        });
    }

    /// Account for the braces of one consumed line.
    pub fn advance(&mut self, line: &str) {
        self.depth += brace_delta(line);
        if let Some(top) = self.stack.last_mut() {
            if self.depth > top.depth {
                top.opened = true;
            }
        }
        while self
            .stack
            .last()
            .is_some_and(|c| c.opened && self.depth <= c.depth)
        {
            self.stack.pop();
        }
    }

    /// Innermost enclosing class name.
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(|c| c.name.as_str())
    }

    /// True when the current line sits directly in a class body.
    pub fn in_class_body(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|c| c.opened && self.depth == c.depth + 1)
    }
}
