//! Word expansion: parameters, field splitting and pathname expansion.
//!
//! Pathname expansion never reads the filesystem directly. Directory
//! listings come from [`Opener::read_dir`], so a host that refuses a
//! directory also hides its entries; the pattern is then kept literally, as
//! a shell does when nothing matches.

use std::mem;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

use crate::ast::{Param, Word, WordPart};
use crate::handler::Opener;
use crate::runner::State;

/// A field under construction: each character remembers whether it was
/// quoted, which decides whether it may act as a glob metacharacter.
type Field = Vec<(char, bool)>;

/// Expands command words into argument strings.
pub(crate) fn expand_words(words: &[Word], state: &State, opener: &dyn Opener) -> Vec<String> {
    let mut argv = Vec::new();
    for word in words {
        for field in fields(word, state) {
            if has_glob(&field)
                && let Some(matches) = glob(&field, &state.dir, opener)
            {
                argv.extend(matches);
                continue;
            }
            argv.push(field.iter().map(|(c, _)| *c).collect());
        }
    }
    argv
}

/// Expands a word into a single string without splitting or globbing, as
/// used for assignments and redirection targets.
pub(crate) fn expand_string(word: &Word, state: &State) -> String {
    let mut text = String::new();
    append_parts(&word.parts, state, &mut text);
    text
}

fn append_parts(parts: &[WordPart], state: &State, text: &mut String) {
    for part in parts {
        match part {
            WordPart::Literal(value) | WordPart::Quoted(value) => text.push_str(value),
            WordPart::DoubleQuoted(inner) => append_parts(inner, state, text),
            WordPart::Param(param) => text.push_str(&param_value(param, state)),
        }
    }
}

fn param_value(param: &Param, state: &State) -> String {
    let value = state.var(&param.name).unwrap_or_default();
    match &param.fallback {
        Some(fallback) if value.is_empty() => expand_string(fallback, state),
        _ => value,
    }
}

#[derive(Default)]
struct FieldBuilder {
    fields: Vec<Field>,
    current: Field,
    /// Set once a quoted section is seen, so `""` still yields a field.
    present: bool,
}

impl FieldBuilder {
    fn push(&mut self, text: &str, quoted: bool) {
        if quoted {
            self.present = true;
        }
        self.current.extend(text.chars().map(|c| (c, quoted)));
    }

    fn push_split(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.end_field();
            } else {
                self.current.push((c, false));
            }
        }
    }

    fn end_field(&mut self) {
        if !self.current.is_empty() || self.present {
            self.fields.push(mem::take(&mut self.current));
        }
        self.present = false;
    }

    fn finish(mut self) -> Vec<Field> {
        self.end_field();
        self.fields
    }
}

fn fields(word: &Word, state: &State) -> Vec<Field> {
    let mut builder = FieldBuilder::default();
    for part in &word.parts {
        match part {
            WordPart::Literal(text) => builder.push(text, false),
            WordPart::Quoted(text) => builder.push(text, true),
            WordPart::DoubleQuoted(inner) => {
                let mut text = String::new();
                append_parts(inner, state, &mut text);
                builder.push(&text, true);
            }
            WordPart::Param(param) => builder.push_split(&param_value(param, state)),
        }
    }
    builder.finish()
}

fn has_glob(field: &[(char, bool)]) -> bool {
    field
        .iter()
        .any(|&(c, quoted)| !quoted && matches!(c, '*' | '?' | '['))
}

fn glob(field: &[(char, bool)], dir: &Path, opener: &dyn Opener) -> Option<Vec<String>> {
    let absolute = field.first().is_some_and(|&(c, _)| c == '/');
    let trailing_slash = field.len() > 1 && field.last().is_some_and(|&(c, _)| c == '/');
    let mut candidates = vec![if absolute { "/".to_owned() } else { String::new() }];
    let mut after_pattern = false;

    for segment in field.split(|&(c, _)| c == '/').filter(|s| !s.is_empty()) {
        if !has_glob(segment) {
            let literal: String = segment.iter().map(|(c, _)| *c).collect();
            if after_pattern {
                candidates.retain(|candidate| entry_exists(opener, dir, candidate, &literal));
                if candidates.is_empty() {
                    return None;
                }
            }
            for candidate in &mut candidates {
                *candidate = join(candidate, &literal);
            }
            continue;
        }

        after_pattern = true;
        let matcher = compile(segment)?;
        let include_hidden = segment.first().is_some_and(|&(c, _)| c == '.');
        let mut next = Vec::new();
        for candidate in &candidates {
            let Ok(names) = opener.read_dir(dir, listing_path(candidate)) else {
                continue;
            };
            next.extend(
                names
                    .into_iter()
                    .filter(|name| include_hidden || !name.starts_with('.'))
                    .filter(|name| matcher.is_match(name))
                    .map(|name| join(candidate, &name)),
            );
        }
        candidates = next;
        if candidates.is_empty() {
            return None;
        }
    }

    if trailing_slash {
        for candidate in &mut candidates {
            candidate.push('/');
        }
    }
    candidates.sort();
    Some(candidates)
}

fn compile(segment: &[(char, bool)]) -> Option<GlobMatcher> {
    let mut pattern = String::new();
    for &(c, quoted) in segment {
        let special = matches!(c, '*' | '?' | '[' | ']' | '\\' | '{' | '}');
        if special && (quoted || matches!(c, '{' | '}')) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    GlobBuilder::new(&pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .ok()
        .map(|glob| glob.compile_matcher())
}

fn entry_exists(opener: &dyn Opener, dir: &Path, candidate: &str, name: &str) -> bool {
    if matches!(name, "." | "..") {
        return true;
    }
    opener
        .read_dir(dir, listing_path(candidate))
        .is_ok_and(|names| names.iter().any(|entry| entry == name))
}

fn listing_path(candidate: &str) -> &str {
    if candidate.is_empty() { "." } else { candidate }
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}
