//! Cache keys. A [`Signature`] names one partition: (scope, source, theme, sdg).
//! Every component goes through [`slugify`] so equivalent filters share a file.

use std::fmt;

use crate::model::Scope;

/// Placeholder for an unset theme or SDG.
pub const NONE_SLUG: &str = "none";
/// Pseudo-source for the merged partition.
pub const ALL_SOURCES: &str = "all";

/// Lowercase, fold common Latin accents to ASCII, collapse runs of anything
/// non-alphanumeric into a single `_`, trim `_` at both ends.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_sep = false;
    for ch in value.chars().flat_map(char::to_lowercase) {
        let ch = fold_accent(ch);
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

fn slug_or_none(value: &str) -> String {
    let s = slugify(value);
    if s.is_empty() {
        NONE_SLUG.to_string()
    } else {
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub scope: Scope,
    pub source: String,
    pub theme: String,
    pub sdg: String,
}

impl Signature {
    pub fn new(scope: Scope, source: &str, theme: &str, sdg: &str) -> Self {
        Self {
            scope,
            source: slug_or_none(source),
            theme: slug_or_none(theme),
            sdg: slug_or_none(sdg),
        }
    }

    /// The merged partition for the same scope/theme/SDG.
    pub fn all(&self) -> Self {
        Self {
            scope: self.scope,
            source: ALL_SOURCES.to_string(),
            theme: self.theme.clone(),
            sdg: self.sdg.clone(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.source == ALL_SOURCES
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}{}_{}_{}.csv",
            self.scope.file_prefix(),
            self.source,
            self.theme,
            self.sdg
        )
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.theme, self.sdg)
    }
}
