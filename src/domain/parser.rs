//! Shell command inspection for the pre-tool hook.
//!
//! Only single simple commands are rewritten to run through `wrap`. Anything
//! with pipes, lists, redirections or substitutions is left alone, because
//! the compressed output would no longer correspond to a single tool.
//! Uses tree-sitter-bash when the `ast-parser` feature is enabled; a
//! quote-aware scanner runs in both builds.

use std::sync::LazyLock;

use regex::Regex;
#[cfg(feature = "ast-parser")]
use tree_sitter::{Node, Parser};

static ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*=").expect("valid assignment pattern")
});

/// Node kinds that make a statement more than one plain command.
#[cfg(feature = "ast-parser")]
const COMPOUND_KINDS: &[&str] = &[
    "pipeline",
    "list",
    "redirected_statement",
    "file_redirect",
    "heredoc_redirect",
    "herestring_redirect",
    "command_substitution",
    "process_substitution",
    "arithmetic_expansion",
    "subshell",
    "compound_statement",
    "variable_assignment",
    "negated_command",
];

/// Shell command parser using tree-sitter-bash for AST-based analysis.
pub struct ShellParser {
    #[cfg(feature = "ast-parser")]
    parser: Parser,
}

impl ShellParser {
    /// Create a new ShellParser.
    pub fn new() -> Self {
        #[cfg(feature = "ast-parser")]
        {
            let mut parser = Parser::new();
            parser
                .set_language(&tree_sitter_bash::LANGUAGE.into())
                .expect("Failed to load tree-sitter-bash grammar");
            Self { parser }
        }
        #[cfg(not(feature = "ast-parser"))]
        {
            Self {}
        }
    }

    /// Check if `command` is exactly one simple command.
    ///
    /// Rejects pipelines, `&&`/`||`/`;` lists, background jobs, redirections,
    /// command and process substitution, subshells and `NAME=value` prefixes.
    #[cfg(feature = "ast-parser")]
    pub fn is_simple_command(&mut self, command: &str) -> bool {
        let command = command.trim();
        if !Self::scan_is_simple(command) {
            return false;
        }

        let tree = match self.parser.parse(command, None) {
            Some(tree) => tree,
            None => return true,
        };
        let root = tree.root_node();
        if root.has_error() {
            return false;
        }

        let statements: Vec<Node> = root
            .named_children(&mut root.walk())
            .filter(|node| node.kind() != "comment")
            .collect();
        match statements.as_slice() {
            [only] => only.kind() == "command" && !Self::has_compound(*only),
            _ => false,
        }
    }

    #[cfg(not(feature = "ast-parser"))]
    pub fn is_simple_command(&mut self, command: &str) -> bool {
        Self::scan_is_simple(command.trim())
    }

    #[cfg(feature = "ast-parser")]
    fn has_compound(node: Node) -> bool {
        COMPOUND_KINDS.contains(&node.kind())
            || node.children(&mut node.walk()).any(Self::has_compound)
    }

    /// Quote-aware scan for unquoted shell operators.
    fn scan_is_simple(command: &str) -> bool {
        if command.is_empty() || ASSIGNMENT_RE.is_match(command) {
            return false;
        }

        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut prev: Option<char> = None;

        for c in command.chars() {
            if escaped {
                escaped = false;
                prev = Some(c);
                continue;
            }

            match (quote, c) {
                (Some('\''), '\'') => quote = None,
                (Some('\''), _) => {}
                (_, '\\') => escaped = true,
                (Some('"'), '"') => quote = None,
                // Substitutions stay active inside double quotes
                (_, '`') => return false,
                (_, '(') if prev == Some('$') => return false,
                (Some(_), _) => {}
                (None, '\'' | '"') => quote = Some(c),
                (None, '|' | '&' | ';' | '<' | '>' | '(' | ')' | '\n') => return false,
                (None, _) => {}
            }
            prev = Some(c);
        }

        quote.is_none() && !escaped
    }
}

impl Default for ShellParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Base name of the program a command runs (`/usr/bin/vim x` gives `vim`).
pub fn program_name(command: &str) -> Option<String> {
    let mut word = String::new();
    let mut quote: Option<char> = None;

    for c in command.trim_start().chars() {
        match (quote, c) {
            (None, ' ' | '\t') => break,
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => word.push(c),
        }
    }

    let name = word.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
