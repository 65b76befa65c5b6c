//! Workspace source hygiene.
//!
//! Scans the production sources of the scene engine, the frame codec and the
//! server for constructs that panic at runtime or lose errors unseen. Sibling
//! `_test.rs` files and `#[cfg(test)]` module bodies are skipped. Server
//! startup in `main.rs` fails fast on bad config and is exempt from the panic
//! rules.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tree {
    Scene,
    Frames,
    Server,
}

impl Tree {
    const ALL: [Tree; 3] = [Tree::Scene, Tree::Frames, Tree::Server];

    fn root(self) -> PathBuf {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
        match self {
            Tree::Scene => manifest.join("src"),
            Tree::Frames => manifest.join("../frames/src"),
            Tree::Server => manifest.join("../src"),
        }
    }
}

struct SourceFile {
    tree: Tree,
    path: String,
    /// Production lines only; a trailing test module is cut off.
    lines: Vec<String>,
}

impl SourceFile {
    fn is_server_main(&self) -> bool {
        self.tree == Tree::Server && self.path.ends_with("main.rs")
    }

    fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, l)| (i, l.as_str()))
            .filter(|(_, l)| !l.trim_start().starts_with("//"))
    }
}

fn sources(trees: &[Tree]) -> Vec<SourceFile> {
    let mut files = Vec::new();
    for &tree in trees {
        collect(tree, &tree.root(), &mut files);
    }
    files
}

fn collect(tree: Tree, dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(tree, &path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if path.extension().is_none_or(|e| e != "rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { tree, path: path_str, lines: production_lines(&content) });
        }
    }
}

/// Everything above the first inline `#[cfg(test)] mod ... {` block.
/// `#[cfg(test)] mod x;` declarations pointing at sibling files are kept.
fn production_lines(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.trim() == "#[cfg(test)]" {
            let item = lines[i + 1..].iter().find(|l| !l.trim_start().starts_with("#["));
            if item.is_some_and(|l| l.contains("mod ") && l.trim_end().ends_with('{')) {
                break;
            }
        }
        out.push((*line).to_owned());
    }
    out
}

fn report(hits: &[String]) -> String {
    hits.iter().map(|h| format!("  {h}")).collect::<Vec<_>>().join("\n")
}

// =============================================================================
// LINE PATTERNS
// =============================================================================

fn find_pattern(files: &[SourceFile], pattern: &str) -> Vec<String> {
    files
        .iter()
        .flat_map(|file| {
            file.code_lines()
                .filter(move |(_, line)| line.contains(pattern))
                .map(move |(i, line)| format!("{}:{}: {}", file.path, i + 1, line.trim()))
        })
        .collect()
}

#[test]
fn every_tree_is_scanned() {
    for tree in Tree::ALL {
        let files = sources(&[tree]);
        assert!(!files.is_empty(), "no sources found for {tree:?} under {}", tree.root().display());
    }
}

#[test]
fn no_panicking_calls() {
    let files: Vec<SourceFile> = sources(&Tree::ALL).into_iter().filter(|f| !f.is_server_main()).collect();
    let mut hits = Vec::new();
    for pattern in [".unwrap()", ".expect(", "panic!(", "unreachable!(", "todo!(", "unimplemented!("] {
        hits.extend(find_pattern(&files, pattern));
    }
    assert!(hits.is_empty(), "panicking calls in production code:\n{}", report(&hits));
}

#[test]
fn engine_and_codec_never_discard_errors() {
    let files = sources(&[Tree::Scene, Tree::Frames]);
    let mut hits = find_pattern(&files, "let _ =");
    hits.extend(find_pattern(&files, ".ok()"));
    assert!(hits.is_empty(), "discarded results in engine or codec:\n{}", report(&hits));
}

#[test]
fn no_dead_code_allowances() {
    let hits = find_pattern(&sources(&Tree::ALL), "allow(dead_code)");
    assert!(hits.is_empty(), "#[allow(dead_code)] found:\n{}", report(&hits));
}

// =============================================================================
// NARROWING CASTS
// =============================================================================

const NARROWING: [&str; 5] = [" as u8", " as u16", " as u32", " as i32", " as i64"];

fn has_narrowing_cast(line: &str) -> bool {
    NARROWING.iter().any(|pat| {
        line.match_indices(pat)
            .any(|(at, _)| !line[at + pat.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_'))
    })
}

fn is_fn_header(line: &str) -> bool {
    let mut rest = line.trim_start();
    loop {
        let before = rest;
        for prefix in ["pub(crate) ", "pub ", "const ", "async ", "unsafe "] {
            rest = rest.strip_prefix(prefix).unwrap_or(rest);
        }
        if rest == before {
            return rest.starts_with("fn ");
        }
    }
}

/// Attribute and doc lines stacked directly above the function that
/// encloses line `idx`.
fn enclosing_fn_attributes(lines: &[String], idx: usize) -> Vec<&str> {
    let Some(header) = (0..=idx).rev().find(|&i| is_fn_header(&lines[i])) else {
        return Vec::new();
    };
    lines[..header]
        .iter()
        .rev()
        .map(|l| l.trim())
        .take_while(|l| l.starts_with("#[") || l.starts_with("///"))
        .collect()
}

#[test]
fn narrowing_casts_are_acknowledged() {
    let mut hits = Vec::new();
    for file in sources(&Tree::ALL) {
        let module_allow = file.lines.iter().any(|l| l.trim_start().starts_with("#![allow(clippy::cast_"));
        for (i, line) in file.code_lines() {
            if !has_narrowing_cast(line) || module_allow {
                continue;
            }
            let allowed = enclosing_fn_attributes(&file.lines, i).iter().any(|a| a.contains("allow(clippy::cast_"));
            if !allowed {
                hits.push(format!("{}:{}: {}", file.path, i + 1, line.trim()));
            }
        }
    }
    assert!(
        hits.is_empty(),
        "narrowing casts outside a function carrying #[allow(clippy::cast_*)]:\n{}",
        report(&hits)
    );
}

#[test]
fn cast_detection_ignores_wider_targets() {
    assert!(has_narrowing_cast("let n = v as u32;"));
    assert!(has_narrowing_cast("(x as i32).max(1)"));
    assert!(!has_narrowing_cast("let n = v as usize;"));
    assert!(!has_narrowing_cast("let n = v as u64;"));
    assert!(!has_narrowing_cast("let n = v as i32x4;"));
}

// =============================================================================
// CLAMP BOUNDS
// =============================================================================

/// `(lo, hi)` argument text of each `.clamp(` call on the line.
fn clamp_calls(line: &str) -> Vec<(String, String)> {
    let mut calls = Vec::new();
    for (at, pat) in line.match_indices(".clamp(") {
        let args = &line[at + pat.len()..];
        let mut depth = 0usize;
        let mut comma = None;
        let mut end = None;
        for (i, c) in args.char_indices() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    end = Some(i);
                    break;
                }
                ')' => depth -= 1,
                ',' if depth == 0 => comma = Some(i),
                _ => {}
            }
        }
        if let (Some(comma), Some(end)) = (comma, end) {
            calls.push((args[..comma].trim().to_owned(), args[comma + 1..end].trim().to_owned()));
        }
    }
    calls
}

/// A literal or a SCREAMING_CASE constant path.
fn is_fixed(expr: &str) -> bool {
    let literal = !expr.is_empty() && expr.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    let constant = expr.chars().any(|c| c.is_ascii_uppercase())
        && expr.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '_' | ':'));
    literal || constant
}

/// `clamp` panics when `lo > hi`. Safe when both bounds are fixed, or when
/// the upper bound is itself raised to the lower one.
fn clamp_is_safe(lo: &str, hi: &str) -> bool {
    is_fixed(lo) && (is_fixed(hi) || hi.ends_with(&format!(".max({lo})")))
}

#[test]
fn clamp_bounds_cannot_cross() {
    let mut hits = Vec::new();
    for file in sources(&Tree::ALL) {
        for (i, line) in file.code_lines() {
            if clamp_calls(line).iter().any(|(lo, hi)| !clamp_is_safe(lo, hi)) {
                hits.push(format!("{}:{}: {}", file.path, i + 1, line.trim()));
            }
        }
    }
    assert!(hits.is_empty(), "clamp with a data-dependent upper bound:\n{}", report(&hits));
}

#[test]
fn clamp_rules() {
    assert_eq!(clamp_calls("x.clamp(ZOOM_MIN, ZOOM_MAX)"), vec![(String::from("ZOOM_MIN"), String::from("ZOOM_MAX"))]);
    assert!(clamp_is_safe("0.0", "255.0"));
    assert!(clamp_is_safe("0", "max.max(0)"));
    assert!(!clamp_is_safe("0", "max"));
    assert!(!clamp_is_safe("lo", "HI"));
    let nested = clamp_calls("Some(hp.clamp(0, f(a, b)))");
    assert_eq!(nested, vec![(String::from("0"), String::from("f(a, b)"))]);
}
