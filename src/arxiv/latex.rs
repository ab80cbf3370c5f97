//! LaTeX flattening: main file detection, `\input`/`\include` expansion and
//! comment removal.

use crate::arxiv::archive::{normalize_path, SourceTree};
use crate::config::arxiv::{MAX_FLATTENED_BYTES, MAX_INCLUDE_DEPTH};

const INCLUDE_COMMANDS: [&str; 2] = ["\\include", "\\input"];
const PREFERRED_MAIN_NAMES: [&str; 5] = ["main.tex", "ms.tex", "paper.tex", "article.tex", "manuscript.tex"];
const VERBATIM_ENVS: [&str; 3] = ["verbatim", "lstlisting", "minted"];

/// Pick the root document of a source tree.
///
/// Candidates are `.tex`/`.ltx` files with an uncommented `\documentclass`. Those
/// that also contain `\begin{document}` win, then conventional names, then size.
pub fn find_main_file(tree: &SourceTree) -> Option<&str> {
    tree.iter()
        .filter(|(path, _)| {
            let lower = path.to_ascii_lowercase();
            lower.ends_with(".tex") || lower.ends_with(".ltx")
        })
        .filter(|(_, contents)| has_command(contents, "\\documentclass"))
        .max_by_key(|(path, contents)| {
            let file_name = path.rsplit('/').next().unwrap_or_default();
            (
                has_command(contents, "\\begin{document}"),
                PREFERRED_MAIN_NAMES.contains(&file_name.to_ascii_lowercase().as_str()),
                contents.len(),
            )
        })
        .map(|(path, _)| path)
}

/// Whether `command` appears outside comments
fn has_command(contents: &str, command: &str) -> bool {
    contents
        .lines()
        .any(|line| line[..comment_start(line).unwrap_or(line.len())].contains(command))
}

/// Byte offset of the first unescaped `%` in a line
pub fn comment_start(line: &str) -> Option<usize> {
    let mut backslashes = 0usize;
    for (i, c) in line.char_indices() {
        match c {
            '\\' => backslashes += 1,
            '%' if backslashes % 2 == 0 => return Some(i),
            _ => backslashes = 0,
        }
    }
    None
}

/// Inline every resolvable `\input`/`\include` starting from `main`.
///
/// Unresolvable targets, cycles, nesting beyond the depth limit and includes
/// past the output size limit leave the original command in place.
pub fn flatten(tree: &SourceTree, main: &str) -> String {
    flatten_with_limit(tree, main, MAX_FLATTENED_BYTES)
}

pub(crate) fn flatten_with_limit(tree: &SourceTree, main: &str, limit: usize) -> String {
    let mut flattener = Flattener {
        tree,
        stack: Vec::new(),
        emitted: 0,
        limit,
    };
    flattener.expand_file(main)
}

struct Flattener<'a> {
    tree: &'a SourceTree,
    stack: Vec<String>,
    /// Bytes of source text written so far across all files
    emitted: usize,
    limit: usize,
}

impl Flattener<'_> {
    fn expand_file(&mut self, path: &str) -> String {
        let tree = self.tree;
        let Some(contents) = tree.get(path) else {
            return String::new();
        };

        self.stack.push(path.to_string());
        let mut out = String::with_capacity(contents.len());
        for line in contents.split_inclusive('\n') {
            self.expand_line(path, line, &mut out);
        }
        self.stack.pop();
        out
    }

    fn expand_line(&mut self, current: &str, line: &str, out: &mut String) {
        let (code, comment) = line.split_at(comment_start(line).unwrap_or(line.len()));
        let mut cursor = 0;

        while let Some(include) = find_include(code, cursor) {
            self.emit(out, &code[cursor..include.start]);

            match resolve(self.tree, current, include.target) {
                Some(target) if self.stack.contains(&target) => {
                    tracing::warn!(file = %target, "Include cycle, leaving command in place");
                    self.emit(out, &code[include.start..include.end]);
                }
                Some(_) if self.stack.len() > MAX_INCLUDE_DEPTH => {
                    tracing::warn!(file = include.target, "Include nesting too deep");
                    self.emit(out, &code[include.start..include.end]);
                }
                Some(_) if self.emitted >= self.limit => {
                    tracing::warn!(file = include.target, limit = self.limit, "Flattened source too large");
                    self.emit(out, &code[include.start..include.end]);
                }
                Some(target) => {
                    let body = self.expand_file(&target);
                    out.push_str(&body);
                    if include.command == "\\include" || !body.ends_with('\n') {
                        self.emit(out, "\n");
                    }
                }
                None => {
                    tracing::warn!(file = include.target, "Included file not found in source");
                    self.emit(out, &code[include.start..include.end]);
                }
            }
            cursor = include.end;
        }

        self.emit(out, &code[cursor..]);
        self.emit(out, comment);
    }

    fn emit(&mut self, out: &mut String, text: &str) {
        self.emitted += text.len();
        out.push_str(text);
    }
}

struct Include<'a> {
    start: usize,
    end: usize,
    target: &'a str,
    command: &'static str,
}

fn find_include(code: &str, from: usize) -> Option<Include<'_>> {
    let mut search = from;
    while let Some(offset) = code[search..].find('\\') {
        let start = search + offset;
        let tail = &code[start..];

        // `\\` is a line break, not the start of a command
        if tail.starts_with("\\\\") {
            search = start + 2;
            continue;
        }

        for command in INCLUDE_COMMANDS {
            let Some(after) = tail.strip_prefix(command) else {
                continue;
            };
            if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                continue;
            }
            if let Some((target, len)) = parse_argument(after, command == "\\input") {
                return Some(Include {
                    start,
                    end: start + command.len() + len,
                    target,
                    command,
                });
            }
        }
        search = start + 1;
    }
    None
}

/// Returns the target and the number of bytes consumed after the command name
fn parse_argument(after: &str, allow_bare: bool) -> Option<(&str, usize)> {
    let trimmed = after.trim_start_matches([' ', '\t']);
    let skipped = after.len() - trimmed.len();

    if let Some(inner) = trimmed.strip_prefix('{') {
        let close = inner.find('}')?;
        let target = inner[..close].trim();
        return (!target.is_empty()).then_some((target, skipped + close + 2));
    }

    // plain TeX form: `\input file`
    if allow_bare && skipped > 0 {
        let len = trimmed
            .find(|c: char| c.is_whitespace() || matches!(c, '\\' | '}' | '%'))
            .unwrap_or(trimmed.len());
        return (len > 0).then(|| (&trimmed[..len], skipped + len));
    }

    None
}

fn resolve(tree: &SourceTree, current: &str, target: &str) -> Option<String> {
    let dir = current.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let names = [target.to_string(), format!("{}.tex", target)];

    for base in [dir, ""] {
        for name in &names {
            let joined = if base.is_empty() {
                normalize_path(name)
            } else {
                normalize_path(&format!("{}/{}", base, name))
            };
            if tree.contains(&joined) {
                return Some(joined);
            }
        }
    }
    None
}

/// Remove comments. Lines that held only a comment disappear; `\%` is kept and
/// verbatim-like environments are left untouched.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut verbatim: Option<&str> = None;

    for line in source.lines() {
        if let Some(env) = verbatim {
            out.push_str(line);
            out.push('\n');
            if line.contains(&format!("\\end{{{}}}", env)) {
                verbatim = None;
            }
            continue;
        }

        match comment_start(line) {
            Some(pos) => {
                let code = line[..pos].trim_end();
                if !code.trim().is_empty() {
                    out.push_str(code);
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }

        let code = &line[..comment_start(line).unwrap_or(line.len())];
        verbatim = VERBATIM_ENVS.into_iter().find(|env| {
            code.contains(&format!("\\begin{{{}}}", env)) && !code.contains(&format!("\\end{{{}}}", env))
        });
    }

    out
}
