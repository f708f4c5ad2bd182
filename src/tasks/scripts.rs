// src/tasks/scripts.rs

//! Script minification. Production builds also drop `console.*(...)` calls.

use minify_js::{Session, TopLevelMode, minify};

use crate::context::BuildContext;
use crate::tasks::{AssetError, AssetErrorKind, Emitted, SourceFile, Transform};
use crate::types::{AssetCategory, TaskId};

pub const LABEL: &str = "Error Running JS";

const REPLACEMENT: &str = "void 0";

#[derive(Debug, Clone, Copy, Default)]
pub struct Scripts;

impl Transform for Scripts {
    fn id(&self) -> TaskId {
        TaskId::Js
    }

    fn category(&self) -> AssetCategory {
        AssetCategory::Scripts
    }

    fn label(&self) -> &str {
        LABEL
    }

    fn transform(&self, ctx: &BuildContext, source: &SourceFile) -> Result<Vec<Emitted>, AssetError> {
        let text = ctx
            .fs()
            .read_to_string(&source.path)
            .map_err(|e| AssetError::io(&source.path, &e))?;

        let text = if ctx.mode().is_production() {
            strip_console_calls(&text)
        } else {
            text
        };

        let out = minify_script(&text)
            .map_err(|m| AssetError::new(AssetErrorKind::Script, &source.path, m))?;
        Ok(vec![Emitted::new(&source.rel, out)])
    }
}

pub fn minify_script(text: &str) -> Result<Vec<u8>, String> {
    let session = Session::new();
    let mut out = Vec::with_capacity(text.len());
    minify(&session, TopLevelMode::Global, text.as_bytes(), &mut out).map_err(|e| format!("{e:?}"))?;
    Ok(out)
}

/// Replace every `console.<name>(...)` call expression with `void 0`.
///
/// Works on tokens, so strings, template literals (including their `${}`
/// expressions), regex literals and comments are never rewritten. Member
/// accesses such as `window.console.log` and identifiers like `myconsole`
/// are left alone.
pub fn strip_console_calls(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut copied = 0;
    let mut scanner = Scanner::new(src.as_bytes());
    let mut after_dot = false;

    while let Some(token) = scanner.next_token() {
        let is_member = after_dot;
        after_dot = token.kind == Kind::Punct(b'.');
        if is_member || token.kind != Kind::Ident || &src[token.start..token.end] != "console" {
            continue;
        }

        let mut ahead = scanner.clone();
        if let Some(end) = console_call_end(&mut ahead) {
            out.push_str(&src[copied..token.start]);
            out.push_str(REPLACEMENT);
            copied = end;
            scanner = ahead;
        }
    }

    out.push_str(&src[copied..]);
    out
}

/// End of `.name(...)` following a `console` token, if it is a call.
fn console_call_end(scanner: &mut Scanner<'_>) -> Option<usize> {
    if scanner.next_token()?.kind != Kind::Punct(b'.') {
        return None;
    }
    if scanner.next_token()?.kind != Kind::Ident {
        return None;
    }
    if scanner.next_token()?.kind != Kind::Punct(b'(') {
        return None;
    }

    let mut depth = 1usize;
    while let Some(token) = scanner.next_token() {
        match token.kind {
            Kind::Punct(b'(') => depth += 1,
            Kind::Punct(b')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(token.end);
                }
            }
            _ => {}
        }
    }
    None
}

/// Keywords after which a `/` starts a regex literal rather than a division.
const KEYWORDS_BEFORE_EXPRESSION: &[&[u8]] = &[
    b"return",
    b"typeof",
    b"instanceof",
    b"in",
    b"of",
    b"new",
    b"delete",
    b"void",
    b"throw",
    b"case",
    b"do",
    b"else",
    b"yield",
    b"await",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Ident,
    Punct(u8),
    /// String, regex, or a template chunk that closes the template.
    Literal,
    /// Template chunk ending in `${`.
    TemplateHead,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: Kind,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Block,
    Template,
}

/// A minimal JavaScript tokenizer: just enough to know which bytes are code.
#[derive(Debug, Clone)]
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    regex_allowed: bool,
    braces: Vec<Brace>,
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            regex_allowed: true,
            braces: Vec::new(),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_trivia();
        let start = self.pos;
        let b = *self.bytes.get(start)?;

        let kind = match b {
            b'"' | b'\'' => {
                self.pos = skip_string(self.bytes, start);
                Kind::Literal
            }
            b'`' => self.template_chunk(start + 1),
            b'/' if self.regex_allowed => match regex_end(self.bytes, start) {
                Some(end) => {
                    self.pos = end;
                    Kind::Literal
                }
                None => {
                    self.pos += 1;
                    Kind::Punct(b)
                }
            },
            b'{' => {
                self.braces.push(Brace::Block);
                self.pos += 1;
                Kind::Punct(b)
            }
            b'}' if self.braces.last() == Some(&Brace::Template) => {
                self.braces.pop();
                self.template_chunk(start + 1)
            }
            b'}' => {
                self.braces.pop();
                self.pos += 1;
                Kind::Punct(b)
            }
            b if is_ident(b) => {
                while self.bytes.get(self.pos).copied().is_some_and(is_ident) {
                    self.pos += 1;
                }
                Kind::Ident
            }
            _ => {
                self.pos += 1;
                Kind::Punct(b)
            }
        };

        self.regex_allowed = match kind {
            Kind::Ident => KEYWORDS_BEFORE_EXPRESSION.contains(&&self.bytes[start..self.pos]),
            Kind::Literal => false,
            Kind::TemplateHead => true,
            Kind::Punct(p) => !matches!(p, b')' | b']' | b'}'),
        };

        Some(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    /// Scan template text from `from` up to the closing backtick or the
    /// next `${`.
    fn template_chunk(&mut self, from: usize) -> Kind {
        let mut i = from;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'`' => {
                    self.pos = i + 1;
                    return Kind::Literal;
                }
                b'$' if self.bytes.get(i + 1) == Some(&b'{') => {
                    self.braces.push(Brace::Template);
                    self.pos = i + 2;
                    return Kind::TemplateHead;
                }
                _ => i += 1,
            }
        }
        self.pos = self.bytes.len();
        Kind::Literal
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.bytes.get(self.pos) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    self.pos = skip_line_comment(self.bytes, self.pos);
                }
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    self.pos = skip_block_comment(self.bytes, self.pos);
                }
                _ => return,
            }
        }
    }
}

/// Non-ASCII bytes count as identifier bytes so multi-byte characters are
/// never split.
fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Index just past the string literal opening at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the regex literal (flags included) opening at `start`.
///
/// `None` when the line ends first, in which case the `/` is a division.
fn regex_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut in_class = false;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'\n' | b'\r' => return None,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => {
                i += 1;
                while bytes.get(i).copied().is_some_and(is_ident) {
                    i += 1;
                }
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + 2 + p + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_calls_with_nested_arguments() {
        let src = "a();console.log('x(', f(1, [2]));b();";
        assert_eq!(strip_console_calls(src), "a();void 0;b();");
    }

    #[test]
    fn leaves_strings_comments_and_members_alone() {
        let src = concat!(
            "const s = \"console.log(1)\";\n",
            "// console.warn(2)\n",
            "/* console.error(3) */\n",
            "window.console.log(4);\n",
            "myconsole.log(5);\n",
            "console.table;\n",
        );
        assert_eq!(strip_console_calls(src), src);
    }

    #[test]
    fn whitespace_between_tokens_is_allowed() {
        assert_eq!(strip_console_calls("console . info ( 1 )"), "void 0");
    }

    #[test]
    fn unbalanced_call_is_kept() {
        let src = "console.log(1";
        assert_eq!(strip_console_calls(src), src);
    }

    #[test]
    fn quotes_inside_regex_literals_do_not_hide_code() {
        let src = "var re = /'/; var s = 'console.log(1)'; console.log(re);";
        assert_eq!(
            strip_console_calls(src),
            "var re = /'/; var s = 'console.log(1)'; void 0;"
        );
        let src = "if (/[/\"]/.test(x)) { console.warn(x) }";
        assert_eq!(strip_console_calls(src), "if (/[/\"]/.test(x)) { void 0 }");
    }

    #[test]
    fn division_is_not_a_regex() {
        let src = "a = b / c; s = 'console.log(1)'; d = e / f;";
        assert_eq!(strip_console_calls(src), src);
    }

    #[test]
    fn template_expressions_are_code_and_template_text_is_not() {
        let src = "`a ${ {x: 1}.x } console.log(1)`;";
        assert_eq!(strip_console_calls(src), src);

        let src = "`${f(`inner console.log(2)`)}`;console.log(3);";
        assert_eq!(
            strip_console_calls(src),
            "`${f(`inner console.log(2)`)}`;void 0;"
        );

        let src = "`${ console.log(4) }`";
        assert_eq!(strip_console_calls(src), "`${ void 0 }`");
    }

    #[test]
    fn minify_shrinks_and_rejects_bad_syntax() {
        let src = "function add(first, second) {\n    return first + second;\n}\nadd(1, 2);\n";
        let out = minify_script(src).unwrap();
        assert!(out.len() < src.len());
        assert!(minify_script("function (").is_err());
    }
}
