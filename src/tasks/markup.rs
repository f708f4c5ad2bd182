// src/tasks/markup.rs

//! Page rendering: `@@include('file', {ctx})` and `@@variable` substitution.
//!
//! Partials are resolved against the partials directory. An include's JSON5
//! argument is merged over the including file's variables for the partial.
//! Variables support dotted lookups (`@@site.name`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::context::BuildContext;
use crate::fs::FileSystem;
use crate::tasks::{AssetError, AssetErrorKind, Emitted, SourceFile, Transform};
use crate::types::{AssetCategory, TaskId};

pub const LABEL: &str = "Error Running html-include";

/// Nesting limit; deeper chains are treated as include cycles.
pub const MAX_INCLUDE_DEPTH: usize = 16;

const MARKER: &str = "@@";
const INCLUDE_OPEN: &str = "@@include(";

/// Substitution variables visible to a file.
pub type Variables = Map<String, Value>;

/// Built-in variables, with configured overrides applied on top.
pub fn default_variables(year: i32, overrides: &BTreeMap<String, Value>) -> Variables {
    let mut vars = Map::new();
    vars.insert("title".into(), Value::from("Page Title"));
    vars.insert("breadcrumb".into(), Value::from("Current Page"));
    vars.insert("author".into(), Value::from("Hop-Syder"));
    vars.insert("year".into(), Value::from(year));
    for (k, v) in overrides {
        vars.insert(k.clone(), v.clone());
    }
    vars
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Markup;

impl Transform for Markup {
    fn id(&self) -> TaskId {
        TaskId::Html
    }

    fn category(&self) -> AssetCategory {
        AssetCategory::Markup
    }

    fn label(&self) -> &str {
        LABEL
    }

    fn transform(&self, ctx: &BuildContext, source: &SourceFile) -> Result<Vec<Emitted>, AssetError> {
        let text = ctx
            .fs()
            .read_to_string(&source.path)
            .map_err(|e| AssetError::io(&source.path, &e))?;

        let vars = default_variables(ctx.year(), ctx.config().context_overrides());
        let renderer = Renderer::new(ctx.fs(), ctx.partials_dir());
        let html = renderer.render(&text, &vars, &source.path)?;

        Ok(vec![Emitted::new(&source.rel, html)])
    }
}

/// Expands includes and variables for one page.
#[derive(Debug)]
pub struct Renderer<'a> {
    fs: &'a dyn FileSystem,
    partials: PathBuf,
}

impl<'a> Renderer<'a> {
    pub fn new(fs: &'a dyn FileSystem, partials: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            partials: partials.into(),
        }
    }

    pub fn render(&self, text: &str, vars: &Variables, origin: &Path) -> Result<String, AssetError> {
        self.render_at(text, vars, origin, 0)
    }

    fn render_at(
        &self,
        text: &str,
        vars: &Variables,
        origin: &Path,
        depth: usize,
    ) -> Result<String, AssetError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find(MARKER) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(args) = tail.strip_prefix(INCLUDE_OPEN) {
                let (include, consumed) = parse_include(args)
                    .map_err(|m| AssetError::new(AssetErrorKind::Include, origin, m))?;
                out.push_str(&self.expand_include(&include, vars, origin, depth)?);
                rest = &args[consumed..];
            } else if let Some(name) = variable_name(&tail[MARKER.len()..]) {
                let value = lookup(vars, name).ok_or_else(|| {
                    AssetError::new(
                        AssetErrorKind::Template,
                        origin,
                        format!("unresolved variable '@@{name}'"),
                    )
                })?;
                out.push_str(&value);
                rest = &tail[MARKER.len() + name.len()..];
            } else {
                out.push_str(MARKER);
                rest = &tail[MARKER.len()..];
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    fn expand_include(
        &self,
        include: &Include,
        vars: &Variables,
        origin: &Path,
        depth: usize,
    ) -> Result<String, AssetError> {
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(AssetError::new(
                AssetErrorKind::Include,
                origin,
                format!(
                    "includes nested deeper than {MAX_INCLUDE_DEPTH} levels at '{}'; is there a cycle?",
                    include.file
                ),
            ));
        }

        let path = self.partials.join(&include.file);
        if !self.fs.is_file(&path) {
            return Err(AssetError::new(
                AssetErrorKind::Include,
                origin,
                format!("included file '{}' not found in {:?}", include.file, self.partials),
            ));
        }
        let text = self
            .fs
            .read_to_string(&path)
            .map_err(|e| AssetError::io(&path, &e))?;

        let mut scoped = vars.clone();
        scoped.extend(include.vars.clone());
        self.render_at(&text, &scoped, &path, depth + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Include {
    file: String,
    vars: Variables,
}

/// Parse the arguments of `@@include(` up to and including `)`.
///
/// Returns the include and the number of bytes consumed from `s`.
fn parse_include(s: &str) -> Result<(Include, usize), String> {
    let mut i = skip_ws(s, 0);

    let quote = s[i..]
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or("expected a quoted file name after '@@include('")?;
    i += 1;
    let end = s[i..]
        .find(quote)
        .ok_or("unterminated file name in '@@include'")?;
    let file = s[i..i + end].to_string();
    i = skip_ws(s, i + end + 1);

    let mut vars = Map::new();
    if s[i..].starts_with(',') {
        i = skip_ws(s, i + 1);
        let len = balanced_object_len(&s[i..]).ok_or("malformed context object in '@@include'")?;
        let parsed: Value = json5::from_str(&s[i..i + len])
            .map_err(|e| format!("invalid JSON5 context for '{file}': {e}"))?;
        match parsed {
            Value::Object(map) => vars = map,
            _ => return Err(format!("context for '{file}' must be an object")),
        }
        i = skip_ws(s, i + len);
    }

    if !s[i..].starts_with(')') {
        return Err(format!("expected ')' to close '@@include' of '{file}'"));
    }

    Ok((Include { file, vars }, i + 1))
}

fn skip_ws(s: &str, from: usize) -> usize {
    from + (s[from..].len() - s[from..].trim_start().len())
}

/// Byte length of the `{...}` object at the start of `s`, honouring quotes.
fn balanced_object_len(s: &str) -> Option<usize> {
    if !s.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// The variable reference at the start of `s`, if any.
fn variable_name(s: &str) -> Option<&str> {
    let first = s.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(s.len());
    // A trailing dot ends the sentence, not the path.
    Some(s[..end].trim_end_matches('.'))
}

fn lookup(vars: &Variables, name: &str) -> Option<String> {
    let mut parts = name.split('.');
    let mut current = vars.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }

    Some(match current {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) => current.to_string(),
        Value::Array(_) | Value::Object(_) => current.to_string(),
    })
}
