use std::collections::BTreeSet;

use crate::token::TokenId;
use crate::tokenlist::TokenList;

/// Handle to a [`ScopeInfo`] node inside a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace,
    Record,
    MemberFunction,
    Other,
}

/// Immutable description of one lexical scope, shared by reference from
/// every token inside it.
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub full_name: String,
    pub kind: ScopeKind,
    pub body_start: Option<TokenId>,
    pub body_end: Option<TokenId>,
    pub using_namespaces: BTreeSet<String>,
    /// Record types declared directly inside this scope.
    pub record_types: BTreeSet<String>,
    /// Base classes of a record scope.
    pub base_types: BTreeSet<String>,
    pub parent: Option<ScopeId>,
}

/// Arena of scope nodes for one translation unit. Index 0 is always the
/// global scope.
pub struct ScopeArena {
    nodes: Vec<ScopeInfo>,
}

impl ScopeArena {
    pub fn new() -> Self {
        ScopeArena {
            nodes: vec![ScopeInfo {
                full_name: String::new(),
                kind: ScopeKind::Global,
                body_start: None,
                body_end: None,
                using_namespaces: BTreeSet::new(),
                record_types: BTreeSet::new(),
                base_types: BTreeSet::new(),
                parent: None,
            }],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &ScopeInfo {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut ScopeInfo {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn push(&mut self, info: ScopeInfo) -> ScopeId {
        let id = ScopeId(self.nodes.len() as u32);
        self.nodes.push(info);
        id
    }

    /// Walk from `id` outward to the global scope.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        let mut cur = Some(id);
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self.get(id).parent;
            Some(id)
        })
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a possibly qualified name (`a :: b :: c`) starting at `tok`.
/// Returns the joined name and the token after it.
fn read_qualified_name(list: &TokenList, mut tok: TokenId) -> (String, Option<TokenId>) {
    let mut name = String::new();
    loop {
        if !list.get(tok).is_name() {
            break;
        }
        name.push_str(list.str(tok));
        match list.next(tok) {
            Some(n) if list.is(n, "::") => match list.next(n) {
                Some(nn) if list.get(nn).is_name() => {
                    name.push_str("::");
                    tok = nn;
                }
                _ => return (name, list.next(n)),
            },
            next => return (name, next),
        }
    }
    (name, Some(tok))
}

/// What the `{` starting at `open` introduces, judged from the tokens
/// before it.
fn classify_body(list: &TokenList, open: TokenId, inside_record: bool) -> (ScopeKind, String, BTreeSet<String>) {
    let mut base_types = BTreeSet::new();

    // Function body: `) {` or `) const {` etc.
    let mut before = list.prev(open);
    while let Some(t) = before {
        if list.is(t, "const")
            || list.is(t, "noexcept")
            || list.is(t, "override")
            || list.is(t, "final")
            || list.is(t, "volatile")
        {
            before = list.prev(t);
            continue;
        }
        break;
    }
    if let Some(t) = before {
        if list.is(t, ")") {
            let kind = if inside_record {
                ScopeKind::MemberFunction
            } else {
                ScopeKind::Other
            };
            let name = list
                .link_of(t)
                .and_then(|op| list.prev(op))
                .filter(|&n| list.get(n).is_name())
                .map(|n| list.str(n).to_string())
                .unwrap_or_default();
            return (kind, name, base_types);
        }
    }

    // Scan back over a base-class clause and the record/namespace header.
    let mut t = list.prev(open);
    let mut name_tok = None;
    let mut steps = 0;
    while let Some(cur) = t {
        steps += 1;
        if steps > 64 || list.is(cur, ";") || list.is(cur, "}") || list.is(cur, "{") {
            break;
        }
        let s = list.str(cur);
        match s {
            "namespace" => {
                let name = list
                    .next(cur)
                    .filter(|&n| list.get(n).is_name())
                    .map(|n| read_qualified_name(list, n).0)
                    .unwrap_or_default();
                return (ScopeKind::Namespace, name, base_types);
            }
            "class" | "struct" | "union" => {
                let name = name_tok
                    .map(|n| read_qualified_name(list, n).0)
                    .unwrap_or_default();
                return (ScopeKind::Record, name, base_types);
            }
            ":" => {
                // Base clause: collect the base type names after it.
                let mut b = list.next(cur);
                while let Some(bt) = b {
                    if bt == open {
                        break;
                    }
                    if list.get(bt).is_name()
                        && !matches!(list.str(bt), "public" | "protected" | "private" | "virtual")
                    {
                        let (base, after) = read_qualified_name(list, bt);
                        base_types.insert(base);
                        b = after;
                        continue;
                    }
                    b = list.next(bt);
                }
                name_tok = None;
            }
            _ if list.get(cur).kind == crate::token::TokenKind::Name => {
                name_tok = Some(cur);
            }
            _ => {}
        }
        t = list.prev(cur);
    }
    (ScopeKind::Other, String::new(), base_types)
}

/// Build the scope tree and stamp every token with its innermost scope.
/// Requires bracket links (linker pass A).
pub fn build_scopes(list: &mut TokenList) -> ScopeArena {
    let mut arena = ScopeArena::new();
    let mut stack: Vec<ScopeId> = vec![arena.global()];

    let mut tok = list.head();
    while let Some(t) = tok {
        let current = *stack.last().unwrap_or(&arena.global());

        if list.is(t, "{") {
            let inside_record = arena.get(current).kind == ScopeKind::Record;
            let (kind, name, base_types) = classify_body(list, t, inside_record);
            let full_name = if name.is_empty() {
                arena.get(current).full_name.clone()
            } else {
                let parent_name = &arena.get(current).full_name;
                if parent_name.is_empty() {
                    name.clone()
                } else {
                    format!("{}::{}", parent_name, name)
                }
            };
            if kind == ScopeKind::Record && !name.is_empty() {
                arena.get_mut(current).record_types.insert(name);
            }
            let id = arena.push(ScopeInfo {
                full_name,
                kind,
                body_start: Some(t),
                body_end: list.link_of(t),
                using_namespaces: BTreeSet::new(),
                record_types: BTreeSet::new(),
                base_types,
                parent: Some(current),
            });
            stack.push(id);
            list.get_mut(t).scope = Some(id);
            tok = list.next(t);
            continue;
        }

        list.get_mut(t).scope = Some(current);

        if list.is(t, "}") && stack.len() > 1 {
            stack.pop();
        } else if list.is(t, "using") {
            if let Some(ns_kw) = list.next(t).filter(|&n| list.is(n, "namespace")) {
                if let Some(first) = list.next(ns_kw).filter(|&n| list.get(n).is_name()) {
                    let (name, _) = read_qualified_name(list, first);
                    arena.get_mut(current).using_namespaces.insert(name);
                }
            }
        }

        tok = list.next(t);
    }
    arena
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker;
    use crate::settings::Language;

    fn scoped(code: &str) -> (TokenList, ScopeArena) {
        let mut list = TokenList::new(Language::Cpp);
        list.create_tokens(code, "test.cpp").unwrap();
        linker::create_links(&mut list).unwrap();
        let arena = build_scopes(&mut list);
        (list, arena)
    }

    fn scope_of<'a>(list: &TokenList, arena: &'a ScopeArena, lexeme: &str) -> &'a ScopeInfo {
        let tok = list
            .iter()
            .find(|&t| list.is(t, lexeme))
            .expect("token not found");
        arena.get(list.get(tok).scope.expect("token has no scope"))
    }

    #[test]
    fn namespace_members_get_qualified_scope_names() {
        let (list, arena) = scoped("namespace a { namespace b { int x ; } }");
        let info = scope_of(&list, &arena, "x");
        assert_eq!(info.kind, ScopeKind::Namespace);
        assert_eq!(info.full_name, "a::b");
    }

    #[test]
    fn record_scope_collects_base_types() {
        let (list, arena) = scoped("class D : public B1 , private ns :: B2 { int m ; } ;");
        let info = scope_of(&list, &arena, "m");
        assert_eq!(info.kind, ScopeKind::Record);
        assert_eq!(info.full_name, "D");
        assert!(info.base_types.contains("B1"));
        assert!(info.base_types.contains("ns::B2"));
    }

    #[test]
    fn member_function_bodies_are_member_function_scopes() {
        let (list, arena) = scoped("struct S { void f ( ) { int local ; } } ;");
        let info = scope_of(&list, &arena, "local");
        assert_eq!(info.kind, ScopeKind::MemberFunction);
    }

    #[test]
    fn free_function_bodies_are_other_scopes() {
        let (list, arena) = scoped("void f ( ) { int local ; }");
        let info = scope_of(&list, &arena, "local");
        assert_eq!(info.kind, ScopeKind::Other);
    }

    #[test]
    fn using_namespace_is_recorded_on_the_enclosing_scope() {
        let (list, arena) = scoped("void f ( ) { using namespace std ; int x ; }");
        let info = scope_of(&list, &arena, "x");
        assert!(info.using_namespaces.contains("std"));
    }

    #[test]
    fn record_types_are_registered_in_the_parent_scope() {
        let (list, arena) = scoped("namespace n { struct S { } ; }");
        let info = scope_of(&list, &arena, "struct");
        assert!(info.record_types.contains("S"));
    }
}
