//! Call-chain resolution.
//!
//! A call site like `this.service.run()` is decomposed into ordered links
//! `[this: MEMBER, service: MEMBER, run: FUNCTION]`. The walk first descends
//! from the call node through receiver/callee children to the leftmost atom,
//! then climbs back up, letting the language rules classify each node on the
//! way. Partial chains are cached per node, so nested calls sharing a
//! receiver prefix (`a.b().c()`) reuse the inner walk.

use crate::ingest::context::ExtractionContext;
use crate::ingest::rules::LanguageRules;
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// Role of a chain link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkRole {
    /// Invoked name
    Function,
    /// Receiver, namespace, or property access
    Member,
}

/// One `{name, role}` step of a resolved chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainLink {
    pub name: String,
    pub role: LinkRole,
}

impl ChainLink {
    pub fn member(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: LinkRole::Member,
        }
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: LinkRole::Function,
        }
    }
}

/// Classification of one node during the upward walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStep {
    /// Append a link (identifier, property access, path segment)
    Push(LinkRole, String),
    /// The node invokes whatever the chain currently ends with
    MarkInvoked,
    /// The node both names and invokes (Java `method_invocation`)
    PushInvoked(String),
    /// Transparent wrapper (parentheses, `await`, `?`, generics)
    Skip,
    /// Not resolvable as a name chain; discard the whole walk
    Stop,
}

/// Resolve the chain for a call-site node.
///
/// Returns an empty vector when any node on the path is unresolvable.
pub fn chain_for(
    rules: &dyn LanguageRules,
    call_site: Node<'_>,
    source: &[u8],
    ctx: &mut ExtractionContext,
) -> Vec<ChainLink> {
    // Descend until the leftmost atom or a node whose chain is already cached.
    let mut path = vec![call_site];
    let mut prefix: Option<Vec<ChainLink>> = None;
    let mut current = call_site;
    loop {
        let id = ctx.synthetic_id(&current);
        if let Some(cached) = ctx.cached_chain(&id) {
            prefix = Some(cached.clone());
            path.pop();
            break;
        }
        match rules.descend(&current) {
            Some(next) => {
                path.push(next);
                current = next;
            }
            None => break,
        }
    }

    let mut links = match prefix {
        Some(cached) => cached,
        None => Vec::new(),
    };
    let mut broken = false;

    for node in path.iter().rev() {
        if !broken {
            match rules.classify(node, source) {
                ChainStep::Push(role, name) => links.push(ChainLink { name, role }),
                ChainStep::MarkInvoked => match links.last_mut() {
                    Some(last) => last.role = LinkRole::Function,
                    None => broken = true,
                },
                ChainStep::PushInvoked(name) => links.push(ChainLink::function(name)),
                ChainStep::Skip => {}
                ChainStep::Stop => broken = true,
            }
        }
        if broken {
            // Every node above an unresolvable atom is unresolvable too.
            links.clear();
        }
        let id = ctx.synthetic_id(node);
        ctx.cache_chain(id, links.clone());
    }

    links
}

/// Split a resolved chain into `(caller_chain, function_link)`.
///
/// Returns `None` for empty chains and chains whose last link is not
/// invoked (property access rather than a call).
pub fn split_chain(links: &[ChainLink]) -> Option<(&[ChainLink], &ChainLink)> {
    let (last, rest) = links.split_last()?;
    if last.role != LinkRole::Function {
        return None;
    }
    Some((rest, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::detect::Language;
    use crate::ingest::pool::with_parser;
    use crate::ingest::rules::rules_for;

    fn first_call_chain(language: Language, source: &str) -> Vec<Vec<ChainLink>> {
        let rules = rules_for(language);
        let tree = with_parser(language, |p| p.parse(source.as_bytes(), None))
            .unwrap()
            .unwrap();
        let mut ctx = ExtractionContext::new("/t/file", language);
        let mut sites = Vec::new();
        collect_sites(rules, tree.root_node(), &mut sites);
        sites
            .into_iter()
            .map(|n| chain_for(rules, n, source.as_bytes(), &mut ctx))
            .collect()
    }

    fn collect_sites<'t>(rules: &dyn LanguageRules, node: Node<'t>, out: &mut Vec<Node<'t>>) {
        if rules.is_call_site(&node) {
            out.push(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            collect_sites(rules, child, out);
        }
    }

    #[test]
    fn test_this_member_chain_typescript() {
        let chains = first_call_chain(Language::TypeScript, "this.service.run();");
        assert_eq!(
            chains[0],
            vec![
                ChainLink::member("this"),
                ChainLink::member("service"),
                ChainLink::function("run"),
            ]
        );
    }

    #[test]
    fn test_nested_call_chain_marks_inner_invocation() {
        let chains = first_call_chain(Language::JavaScript, "a.b().c();");
        assert_eq!(
            chains[0],
            vec![
                ChainLink::member("a"),
                ChainLink::function("b"),
                ChainLink::function("c"),
            ]
        );
        // inner call site hits the cache populated by the outer walk
        assert_eq!(chains[1], vec![ChainLink::member("a"), ChainLink::function("b")]);
    }

    #[test]
    fn test_property_access_is_not_a_call() {
        assert!(split_chain(&[ChainLink::member("a"), ChainLink::member("b")]).is_none());
        assert!(split_chain(&[]).is_none());
        let links = vec![ChainLink::member("a"), ChainLink::function("b")];
        let (callers, f) = split_chain(&links).unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(f.name, "b");
    }

    #[test]
    fn test_literal_receiver_discards_chain() {
        let chains = first_call_chain(Language::JavaScript, "'x'.trim();");
        assert!(chains[0].is_empty());
    }

    #[test]
    fn test_java_method_invocation_chain() {
        let chains = first_call_chain(
            Language::Java,
            "class C { void f() { this.service.run(); } }",
        );
        assert_eq!(
            chains[0],
            vec![
                ChainLink::member("this"),
                ChainLink::member("service"),
                ChainLink::function("run"),
            ]
        );
    }

    #[test]
    fn test_rust_scoped_and_field_chains() {
        let chains = first_call_chain(Language::Rust, "fn f() { Foo::new(); self.repo.save(); }");
        assert_eq!(chains[0], vec![ChainLink::member("Foo"), ChainLink::function("new")]);
        assert_eq!(
            chains[1],
            vec![
                ChainLink::member("self"),
                ChainLink::member("repo"),
                ChainLink::function("save"),
            ]
        );
    }

    #[test]
    fn test_python_attribute_chain() {
        let chains = first_call_chain(Language::Python, "self.client.fetch(1)\n");
        assert_eq!(
            chains[0],
            vec![
                ChainLink::member("self"),
                ChainLink::member("client"),
                ChainLink::function("fetch"),
            ]
        );
    }
}
