//! Thread-local tree-sitter parser pool.
//!
//! Extraction runs on blocking worker threads; each thread lazily builds at
//! most one parser per language and reuses it for every file it handles.
//! Parsers are never shared across threads, so no locking is needed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use blastmap::ingest::pool::with_parser;
//! use blastmap::ingest::Language;
//!
//! let tree = with_parser(Language::Rust, |parser| parser.parse(source, None))?;
//! ```

use crate::ingest::detect::Language;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Language, tree_sitter::Parser>> = RefCell::new(HashMap::new());
}

/// Grammar for a language. TSX gets its own grammar but shares the TypeScript rules.
pub fn grammar_for(language: Language) -> tree_sitter::Language {
    match language {
        Language::Rust => tree_sitter_rust::language(),
        Language::Python => tree_sitter_python::language(),
        Language::Java => tree_sitter_java::language(),
        Language::JavaScript => tree_sitter_javascript::language(),
        Language::TypeScript => tree_sitter_typescript::language_typescript(),
        Language::Tsx => tree_sitter_typescript::language_tsx(),
    }
}

/// Run `f` with this thread's parser for `language`, creating it on first use.
///
/// Fails only when the grammar cannot be loaded into a parser (ABI mismatch).
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R>
where
    F: FnOnce(&mut tree_sitter::Parser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(language) {
            std::collections::hash_map::Entry::Occupied(slot) => slot.into_mut(),
            std::collections::hash_map::Entry::Vacant(slot) => {
                let mut parser = tree_sitter::Parser::new();
                parser.set_language(&grammar_for(language))?;
                log::debug!("initialized {} parser on {:?}", language, std::thread::current().id());
                slot.insert(parser)
            }
        };
        // A previous timed-out parse on this thread may have left state behind.
        parser.reset();
        Ok(f(parser))
    })
}

/// Parse one minimal snippet per language so the first real file does not
/// pay parser construction cost on this thread.
pub fn warmup_parsers() -> Result<()> {
    let snippets: [(Language, &[u8]); 6] = [
        (Language::Rust, b"fn warm() {}"),
        (Language::Python, b"def warm(): pass"),
        (Language::Java, b"class Warm {}"),
        (Language::JavaScript, b"function warm() {}"),
        (Language::TypeScript, b"function warm(): void {}"),
        (Language::Tsx, b"const warm = () => <div />;"),
    ];

    for (language, source) in snippets {
        with_parser(language, |parser| {
            parser.parse(source, None);
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_reused_on_same_thread() {
        let first = with_parser(Language::Python, |p| p.parse(b"x = 1", None).is_some()).unwrap();
        let second = with_parser(Language::Python, |p| p.parse(b"y = 2", None).is_some()).unwrap();
        assert!(first && second);
        let count = PARSERS.with(|cell| cell.borrow().len());
        assert!(count >= 1);
    }

    #[test]
    fn test_warmup_all_languages() {
        warmup_parsers().unwrap();
        let count = PARSERS.with(|cell| cell.borrow().len());
        assert_eq!(count, 6);
    }

    #[test]
    fn test_tsx_and_typescript_are_distinct_grammars() {
        let tsx = with_parser(Language::Tsx, |p| {
            p.parse(b"const v = <div>hi</div>;", None)
                .map(|t| t.root_node().has_error())
        })
        .unwrap();
        assert_eq!(tsx, Some(false));
    }
}
