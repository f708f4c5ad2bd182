// src/tasks/styles.rs

//! Stylesheets: SCSS → CSS, vendor prefixes, optional minification and a
//! source map under `maps/`.
//!
//! The map describes the prefixed (and minified) CSS against the compiled
//! CSS; the SCSS compiler itself does not emit one.

use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use crate::context::BuildContext;
use crate::tasks::sources::relative_str;
use crate::tasks::{AssetError, AssetErrorKind, Emitted, SourceFile, Transform};
use crate::types::{AssetCategory, TaskId};

pub const LABEL: &str = "Error Running Sass";

/// Directory, below the stylesheet output, that receives source maps.
pub const MAPS_DIR: &str = "maps";

#[derive(Debug, Clone, Copy)]
pub struct Styles {
    minify: bool,
}

impl Styles {
    pub fn expanded() -> Self {
        Self { minify: false }
    }

    pub fn minified() -> Self {
        Self { minify: true }
    }
}

impl Transform for Styles {
    fn id(&self) -> TaskId {
        if self.minify { TaskId::ScssMin } else { TaskId::Scss }
    }

    fn category(&self) -> AssetCategory {
        AssetCategory::Stylesheets
    }

    fn label(&self) -> &str {
        LABEL
    }

    /// `_partial.scss` files are only imported, never emitted.
    fn accepts(&self, source: &SourceFile) -> bool {
        !source.file_name().starts_with('_')
    }

    fn transform(&self, ctx: &BuildContext, source: &SourceFile) -> Result<Vec<Emitted>, AssetError> {
        let scss = ctx
            .fs()
            .read_to_string(&source.path)
            .map_err(|e| AssetError::io(&source.path, &e))?;

        let styles = ctx.config().styles();
        let mut load_paths: Vec<PathBuf> = source.path.parent().map(Path::to_path_buf).into_iter().collect();
        load_paths.extend(styles.include_paths.iter().map(|p| ctx.root().join(p)));

        let compiled = compile_scss(&scss, &load_paths).map_err(|m| stylesheet_error(source, m))?;

        let scss_name = relative_str(ctx.root(), &source.path)
            .unwrap_or_else(|| source.rel.to_string_lossy().replace('\\', "/"));
        let name = compiled_source_name(&scss_name);
        let processed = postprocess(&compiled, &name, &styles.browsers, self.minify)
            .map_err(|m| stylesheet_error(source, m))?;

        let (code, map) = if self.minify {
            wrap_with_map(&processed, styles.max_line_len).map_err(|m| stylesheet_error(source, m))?
        } else {
            (processed.code, processed.map)
        };

        let css_rel = source.rel.with_extension("css");
        let map_rel = Path::new(MAPS_DIR).join(source.rel.with_extension("css.map"));
        let map_json = map_to_json(map).map_err(|m| stylesheet_error(source, m))?;

        let mut css = code;
        if !css.ends_with('\n') {
            css.push('\n');
        }
        css.push_str(&format!("/*# sourceMappingURL={} */\n", map_url(&css_rel)));

        Ok(vec![Emitted::new(css_rel, css), Emitted::new(map_rel, map_json)])
    }
}

fn stylesheet_error(source: &SourceFile, message: String) -> AssetError {
    AssetError::new(AssetErrorKind::Stylesheet, &source.path, message)
}

/// Compile SCSS to expanded CSS.
pub fn compile_scss(scss: &str, load_paths: &[PathBuf]) -> Result<String, String> {
    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    for path in load_paths {
        options = options.load_path(path);
    }
    grass::from_string(scss.to_string(), &options).map_err(|e| e.to_string())
}

/// Name the source map gives the compiled CSS of `scss_name`.
///
/// `src/scss/main.scss` becomes `src/scss/main.scss.compiled.css`.
pub fn compiled_source_name(scss_name: &str) -> String {
    format!("{scss_name}.compiled.css")
}

/// Prefixed CSS plus the map from it back to the compiled input.
pub struct Processed {
    pub code: String,
    pub map: SourceMap,
}

/// Prefix for the given browserslist queries; minify when asked.
pub fn postprocess(css: &str, name: &str, browsers: &[String], minify: bool) -> Result<Processed, String> {
    let browsers = Browsers::from_browserslist(browsers).map_err(|e| e.to_string())?;
    let targets = Targets {
        browsers,
        ..Targets::default()
    };

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: name.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let mut map = SourceMap::new("/");
    map.add_source(name);
    map.set_source_content(0, css).map_err(|e| format!("{e:?}"))?;

    let code = sheet
        .to_css(PrinterOptions {
            minify,
            source_map: Some(&mut map),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?
        .code;

    Ok(Processed { code, map })
}

fn map_to_json(mut map: SourceMap) -> Result<String, String> {
    map.to_json(None).map_err(|e| format!("{e:?}"))
}

/// Relative URL from `css/<rel>.css` to `css/maps/<rel>.css.map`.
fn map_url(css_rel: &Path) -> String {
    let depth = css_rel.parent().map_or(0, |p| p.components().count());
    let target = Path::new(MAPS_DIR).join(css_rel.with_extension("css.map"));
    format!(
        "{}{}",
        "../".repeat(depth),
        target.to_string_lossy().replace('\\', "/")
    )
}

/// Wrap minified CSS and shift its source map to match.
fn wrap_with_map(processed: &Processed, max_line_len: usize) -> Result<(String, SourceMap), String> {
    let (code, breaks) = wrap_css(&processed.code, max_line_len);
    let old = &processed.map;

    let mut map = SourceMap::new("/");
    for (idx, source) in old.get_sources().iter().enumerate() {
        map.add_source(source);
        if let Ok(content) = old.get_source_content(idx as u32) {
            map.set_source_content(idx, content).map_err(|e| format!("{e:?}"))?;
        }
    }
    for name in old.get_names() {
        map.add_name(name);
    }

    // Lines that precede each original line once breaks are inserted.
    let mut line_base = Vec::with_capacity(breaks.len());
    let mut acc = 0u32;
    for (line, line_breaks) in breaks.iter().enumerate() {
        line_base.push(line as u32 + acc);
        acc += line_breaks.len() as u32;
    }

    for mapping in old.get_mappings() {
        let line = mapping.generated_line as usize;
        let col = mapping.generated_column as usize;
        let (new_line, new_col) = match breaks.get(line) {
            Some(line_breaks) => {
                let passed = line_breaks.iter().take_while(|b| **b <= col).count();
                let start = if passed == 0 { 0 } else { line_breaks[passed - 1] };
                (line_base[line] + passed as u32, (col - start) as u32)
            }
            None => (mapping.generated_line + acc, mapping.generated_column),
        };
        map.add_mapping(new_line, new_col, mapping.original);
    }

    Ok((code, map))
}

/// Insert line breaks after `}` so that no line exceeds `max` bytes where
/// possible; a single rule longer than `max` keeps a line of its own.
///
/// Returns the wrapped text and, per input line, the byte offsets at which
/// new lines now start.
pub fn wrap_css(code: &str, max: usize) -> (String, Vec<Vec<usize>>) {
    let mut out = String::with_capacity(code.len() + code.len() / max.max(1));
    let mut breaks = Vec::new();

    for (i, line) in code.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut line_breaks = Vec::new();
        let mut line_len = 0usize;
        let mut seg_start = 0usize;

        for end in rule_ends(line) {
            let seg = &line[seg_start..end];
            if line_len > 0 && line_len + seg.len() > max {
                out.push('\n');
                line_breaks.push(seg_start);
                line_len = 0;
            }
            out.push_str(seg);
            line_len += seg.len();
            seg_start = end;
        }
        let tail = &line[seg_start..];
        if line_len > 0 && !tail.is_empty() && line_len + tail.len() > max {
            out.push('\n');
            line_breaks.push(seg_start);
        }
        out.push_str(tail);
        breaks.push(line_breaks);
    }

    (out, breaks)
}

/// Byte offsets just past each `}` outside string literals.
fn rule_ends(line: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in line.char_indices() {
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
            '"' | '\'' => quote = Some(c),
            '}' => ends.push(idx + 1),
            _ => {}
        }
    }
    ends
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_between_rules_only() {
        let css = "a{color:red}b{color:blue}c{content:\"}\"}";
        let (out, breaks) = wrap_css(css, 14);
        assert_eq!(out, "a{color:red}\nb{color:blue}\nc{content:\"}\"}");
        assert_eq!(breaks, vec![vec![12, 25]]);
        for line in out.lines() {
            assert!(line.len() <= 16);
        }
    }

    #[test]
    fn long_rule_keeps_its_own_line() {
        let (out, _) = wrap_css("a{b:c}verylongselector{x:y}", 4);
        assert_eq!(out, "a{b:c}\nverylongselector{x:y}");
    }

    #[test]
    fn map_url_climbs_out_of_subdirectories() {
        assert_eq!(map_url(Path::new("main.css")), "maps/main.css.map");
        assert_eq!(map_url(Path::new("pages/home.css")), "../maps/pages/home.css.map");
    }

    #[test]
    fn compile_reports_syntax_errors() {
        assert!(compile_scss("a { color: red", &[]).is_err());
        let css = compile_scss("$c: red; a { b { color: $c; } }", &[]).unwrap();
        assert!(css.contains("a b"));
        assert!(css.contains("color: red"));
    }

    #[test]
    fn minified_output_has_no_comments_or_indentation() {
        let out = postprocess("/* note */\na {\n  color: red;\n}\n", "main.css", &["last 2 versions".into()], true)
            .unwrap();
        assert_eq!(out.code, "a{color:red}");
    }

    #[test]
    fn map_names_the_compiled_css_as_its_source() {
        let compiled = compile_scss("$c: red; a { color: $c; }", &[]).unwrap();
        let name = compiled_source_name("src/scss/main.scss");
        let out = postprocess(&compiled, &name, &["last 2 versions".into()], true).unwrap();

        let json: serde_json::Value = serde_json::from_str(&map_to_json(out.map).unwrap()).unwrap();
        let source = json["sources"][0].as_str().unwrap();
        assert!(source.ends_with("main.scss.compiled.css"), "{source}");
        assert_eq!(json["sourcesContent"][0].as_str().unwrap(), compiled);
    }

    #[test]
    fn old_browsers_get_prefixes() {
        let out = postprocess(
            "a { user-select: none; }",
            "main.css",
            &["safari 8".into()],
            false,
        )
        .unwrap();
        assert!(out.code.contains("-webkit-user-select"));
    }
}
