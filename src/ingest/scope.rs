//! Lexical scope frames and composite graph keys.
//!
//! A [`Scope`] is the ordered list of enclosing constructs of a declaration,
//! outermost first. The file frame is implicit: it is the path prefix of every
//! key, so the serialized chain only carries the named frames.
//!
//! Key format: `${absolutePath}::${chain}` where `chain` joins frame names
//! with `::`, e.g. `/repo/src/caller.ts::Caller::run`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between a file path and the scope chain, and between frames.
pub const KEY_SEPARATOR: &str = "::";

/// Kind of lexical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    File,
    Class,
    Interface,
    Enum,
    Function,
    /// A function frame whose parent frame is a type frame
    Method,
    /// Terminal frame of a type alias key; aliases never enclose other declarations
    Alias,
}

impl ScopeKind {
    /// Class, Interface, and Enum frames own methods.
    pub fn is_type(&self) -> bool {
        matches!(self, ScopeKind::Class | ScopeKind::Interface | ScopeKind::Enum)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, ScopeKind::Function | ScopeKind::Method)
    }
}

/// One `{kind, name}` frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeFrame {
    pub kind: ScopeKind,
    pub name: String,
}

impl ScopeFrame {
    pub fn new(kind: ScopeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Ordered frames from outermost to innermost, excluding the implicit file frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    frames: Vec<ScopeFrame>,
}

impl Scope {
    /// The file-level scope (no named frames).
    pub fn file() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[ScopeFrame] {
        &self.frames
    }

    pub fn is_file_level(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a frame. A function frame directly inside a type frame becomes a method.
    pub fn push(&mut self, mut frame: ScopeFrame) {
        if frame.kind == ScopeKind::Function
            && self.frames.last().map(|f| f.kind.is_type()).unwrap_or(false)
        {
            frame.kind = ScopeKind::Method;
        }
        self.frames.push(frame);
    }

    /// Copy of this scope with one more frame.
    pub fn child(&self, frame: ScopeFrame) -> Self {
        let mut next = self.clone();
        next.push(frame);
        next
    }

    pub fn innermost(&self) -> Option<&ScopeFrame> {
        self.frames.last()
    }

    /// The scope with the innermost function/method frame (and anything inside it) removed.
    ///
    /// Call targets are resolved here: a call inside `Caller::run` looks up
    /// instance types recorded on `Caller`.
    pub fn without_innermost_function(&self) -> Scope {
        match self.frames.iter().rposition(|f| f.kind.is_function()) {
            Some(idx) => Scope {
                frames: self.frames[..idx].to_vec(),
            },
            None => self.clone(),
        }
    }

    /// The scope up to and including the innermost function/method frame.
    ///
    /// A call site's scope truncated this way is the key scope of the
    /// function that owns the call.
    pub fn enclosing_function(&self) -> Option<Scope> {
        let idx = self.frames.iter().rposition(|f| f.kind.is_function())?;
        Some(Scope {
            frames: self.frames[..=idx].to_vec(),
        })
    }

    /// Drop the innermost frame, if any.
    pub fn parent(&self) -> Option<Scope> {
        if self.frames.is_empty() {
            return None;
        }
        Some(Scope {
            frames: self.frames[..self.frames.len() - 1].to_vec(),
        })
    }

    /// Name of the innermost enclosing type frame.
    pub fn enclosing_type(&self) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.kind.is_type())
            .map(|f| f.name.as_str())
    }

    /// Frames joined by `::`; empty at file level.
    pub fn chain_string(&self) -> String {
        self.frames
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }

    /// `chain::name`, or just `name` at file level.
    pub fn qualify(&self, name: &str) -> String {
        if self.frames.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", self.chain_string(), KEY_SEPARATOR, name)
        }
    }

    /// Composite graph key for this scope inside `absolute_path`.
    pub fn key(&self, absolute_path: &str) -> String {
        composite_key(absolute_path, &self.chain_string())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chain_string())
    }
}

/// `${path}::${rest}`
pub fn composite_key(path: &str, rest: &str) -> String {
    format!("{}{}{}", path, KEY_SEPARATOR, rest)
}

/// Split a composite `file::identifier` reference at the first separator.
///
/// Paths never contain `::`, identifiers may (Rust paths), so the first
/// occurrence is the boundary.
pub fn split_composite(reference: &str) -> Option<(&str, &str)> {
    let idx = reference.find(KEY_SEPARATOR)?;
    let (file, rest) = reference.split_at(idx);
    Some((file, &rest[KEY_SEPARATOR.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(frames: &[(ScopeKind, &str)]) -> Scope {
        let mut s = Scope::file();
        for (kind, name) in frames {
            s.push(ScopeFrame::new(*kind, *name));
        }
        s
    }

    #[test]
    fn test_function_in_class_becomes_method() {
        let s = scope(&[(ScopeKind::Class, "Caller"), (ScopeKind::Function, "run")]);
        assert_eq!(s.innermost().unwrap().kind, ScopeKind::Method);
        assert_eq!(s.chain_string(), "Caller::run");
    }

    #[test]
    fn test_enclosing_function_truncates_inner_types() {
        let s = scope(&[
            (ScopeKind::Class, "Outer"),
            (ScopeKind::Function, "run"),
            (ScopeKind::Class, "Local"),
        ]);
        assert_eq!(s.enclosing_function().unwrap().chain_string(), "Outer::run");
        assert!(scope(&[(ScopeKind::Class, "A")]).enclosing_function().is_none());
    }

    #[test]
    fn test_nested_function_stays_function() {
        let s = scope(&[(ScopeKind::Function, "outer"), (ScopeKind::Function, "inner")]);
        assert_eq!(s.innermost().unwrap().kind, ScopeKind::Function);
    }

    #[test]
    fn test_key_format() {
        let s = scope(&[(ScopeKind::Class, "A"), (ScopeKind::Function, "m")]);
        assert_eq!(s.key("/repo/a.ts"), "/repo/a.ts::A::m");
    }

    #[test]
    fn test_without_innermost_function() {
        let s = scope(&[
            (ScopeKind::Class, "Caller"),
            (ScopeKind::Function, "run"),
            (ScopeKind::Function, "inner"),
        ]);
        assert_eq!(s.without_innermost_function().chain_string(), "Caller::run");
        let m = scope(&[(ScopeKind::Class, "Caller"), (ScopeKind::Function, "run")]);
        assert_eq!(m.without_innermost_function().chain_string(), "Caller");
        assert_eq!(m.enclosing_type(), Some("Caller"));
    }

    #[test]
    fn test_qualify_at_file_level() {
        assert_eq!(Scope::file().qualify("service"), "service");
        let s = scope(&[(ScopeKind::Class, "C")]);
        assert_eq!(s.qualify("service"), "C::service");
    }

    #[test]
    fn test_split_composite_first_separator() {
        assert_eq!(
            split_composite("/repo/lib.rs::fmt::Display"),
            Some(("/repo/lib.rs", "fmt::Display"))
        );
        assert_eq!(split_composite("no-separator"), None);
    }
}
