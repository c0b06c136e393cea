use std::collections::HashMap;

use crate::error::InternalError;
use crate::matcher::Matcher;
use crate::token::{is_type_keyword, TokenId, TokenKind};
use crate::tokenlist::TokenList;

/// Layered name → id map with a per-scope undo log, so names fall back
/// to their outer binding when a block closes.
#[derive(Default)]
struct VariableMap {
    map: HashMap<String, u32>,
    undo: Vec<Vec<(String, Option<u32>)>>,
    next_id: u32,
}

impl VariableMap {
    fn new() -> Self {
        VariableMap {
            map: HashMap::new(),
            undo: vec![Vec::new()],
            next_id: 1,
        }
    }

    fn enter_scope(&mut self) {
        self.undo.push(Vec::new());
    }

    fn leave_scope(&mut self) {
        if let Some(log) = self.undo.pop() {
            for (name, old) in log.into_iter().rev() {
                match old {
                    Some(id) => {
                        self.map.insert(name, id);
                    }
                    None => {
                        self.map.remove(&name);
                    }
                }
            }
        }
        if self.undo.is_empty() {
            self.undo.push(Vec::new());
        }
    }

    fn declare(&mut self, name: &str) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let old = self.map.insert(name.to_string(), id);
        if let Some(log) = self.undo.last_mut() {
            log.push((name.to_string(), old));
        }
        id
    }

    fn lookup(&self, name: &str) -> Option<u32> {
        self.map.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct VarIdScopeInfo {
    is_executable: bool,
    is_struct_init: bool,
    is_enum: bool,
    /// First id allocated inside this scope; kept for the dump and for
    /// debugging id leaks across scopes.
    #[allow(dead_code)]
    start_varid: u32,
}

/// Candidate declarator names consumed by [`parse_declaration`].
enum Declaration {
    None,
    /// Ordinary declarators (one, or several for structured bindings).
    Names(Vec<TokenId>),
}

/// Decide whether the statement starting at `t` declares variables, and
/// which tokens are the declared names. Errs toward `None`: a wrong id
/// is worse than a missing one.
fn parse_declaration(list: &TokenList, m: &Matcher, t: TokenId) -> Declaration {
    let mut cur = Some(t);
    let mut type_tokens = 0;
    let mut tag_decl = false;

    while let Some(c) = cur {
        let s = list.str(c);
        match s {
            "static" | "const" | "constexpr" | "volatile" | "register" | "mutable"
            | "extern" | "inline" | "thread_local" | "_Atomic" | "restrict" => {
                cur = list.next(c);
            }
            "struct" | "class" | "union" | "enum" => {
                // `struct S x ;` declares x; a bare tag declaration or
                // definition declares no variable here.
                tag_decl = true;
                cur = list.next(c);
            }
            "::" => cur = list.next(c),
            "*" | "&" | "&&" if type_tokens > 0 => cur = list.next(c),
            "<" if type_tokens > 0 => match list.find_closing_angle(c) {
                Some(close) => cur = list.next(close),
                None => return Declaration::None,
            },
            _ => {
                let data = list.get(c);
                if !data.is_name() {
                    break;
                }
                if data.kind == TokenKind::Keyword && !is_type_keyword(s) {
                    return Declaration::None;
                }
                // Structured binding `auto [ a , b ] = ...`.
                if s == "auto" {
                    let mut n = list.next(c);
                    while let Some(nn) = n {
                        if matches!(list.str(nn), "&" | "&&" | "const") {
                            n = list.next(nn);
                        } else {
                            break;
                        }
                    }
                    if let Some(open) = n.filter(|&nn| list.is(nn, "[")) {
                        if let Some(close) = list.link_of(open) {
                            if m.matches(list, list.next(close), "=|:") {
                                let names = list
                                    .iter_range(open, close)
                                    .filter(|&b| list.get(b).kind == TokenKind::Name)
                                    .collect();
                                return Declaration::Names(names);
                            }
                        }
                        return Declaration::None;
                    }
                }
                // Is this name the declarator or part of the type?
                let next = list.next(c);
                let declarator_follows = m.matches(list, next, ";|,|=|[|)|:|{")
                    && !m.matches(list, next, "::");
                if declarator_follows && type_tokens > 0 && data.kind == TokenKind::Name {
                    // Bitfield `int x : 3 ;` yes; label `x :` was ruled
                    // out by type_tokens > 0; range-for `x : v` is the
                    // declarator of the header.
                    return Declaration::Names(vec![c]);
                }
                if declarator_follows {
                    // Single name followed by `;` etc. — an expression
                    // statement, not a declaration.
                    return Declaration::None;
                }
                type_tokens += 1;
                cur = next;
            }
        }
    }

    // `int ( * fp ) ( ... ) ;` — pointer declarator in parentheses.
    if type_tokens > 0 && !tag_decl {
        if let Some(c) = cur {
            if m.matches(list, Some(c), "( * %name% )") {
                if let Some(name) = list.at(c, 2) {
                    return Declaration::Names(vec![name]);
                }
            }
        }
    }
    Declaration::None
}

/// Whether the `{` at `open` starts executable code: function bodies and
/// any block nested in one.
fn opens_executable(list: &TokenList, open: TokenId, enclosing_executable: bool) -> bool {
    if enclosing_executable {
        return true;
    }
    let mut before = list.prev(open);
    while let Some(t) = before {
        if matches!(list.str(t), "const" | "noexcept" | "override" | "final" | "volatile") {
            before = list.prev(t);
            continue;
        }
        break;
    }
    match before {
        Some(t) if list.is(t, ")") => {
            // A `) {` is a function definition header unless it closes
            // an `if`/`for`/`while`/`switch` at namespace level, which
            // garbage detection rejects anyway.
            true
        }
        Some(t) => matches!(list.str(t), "else" | "do" | "try"),
        None => false,
    }
}

fn opens_enum(list: &TokenList, open: TokenId) -> bool {
    let mut t = list.prev(open);
    let mut steps = 0;
    while let Some(cur) = t {
        steps += 1;
        if steps > 16 || matches!(list.str(cur), ";" | "{" | "}" | ")") {
            return false;
        }
        if list.is(cur, "enum") {
            return true;
        }
        t = list.prev(cur);
    }
    false
}

fn opens_struct_init(list: &TokenList, open: TokenId) -> bool {
    list.prev(open)
        .is_some_and(|p| matches!(list.str(p), "=" | "," | "{" | "(" | "return"))
}

/// Member access that still refers to a local: `this . x` and
/// `( * this ) . x`.
fn is_this_access(list: &TokenList, dot: TokenId) -> bool {
    if let Some(p) = list.prev(dot) {
        if list.is(p, "this") {
            return true;
        }
        if list.is(p, ")") {
            if let Some(open) = list.link_of(p) {
                let mut cur = list.next(open);
                if cur.is_some_and(|c| list.is(c, "*")) {
                    cur = cur.and_then(|c| list.next(c));
                    return cur.is_some_and(|c| list.is(c, "this"));
                }
            }
        }
    }
    false
}

/// A name token that must not receive an id from the surrounding maps.
fn is_excluded_use(list: &TokenList, t: TokenId) -> bool {
    if let Some(p) = list.prev(t) {
        match list.str(p) {
            "::" => return true,
            "." | "->" => return !is_this_access(list, p),
            "struct" | "class" | "union" | "enum" => return true,
            "goto" => return true,
            _ => {}
        }
    }
    // Labels: name at statement start directly followed by `:` (but not
    // `::`), as in `retry:`.
    if list
        .prev(t)
        .map_or(true, |p| matches!(list.str(p), ";" | "{" | "}"))
        && list.next(t).is_some_and(|n| list.is(n, ":"))
    {
        return true;
    }
    false
}

struct ClassInfo {
    name: String,
    body_open: TokenId,
    body_close: TokenId,
    bases: Vec<String>,
    members: HashMap<String, u32>,
}

/// Assign a unique nonzero id to every variable binding. Pass 1 walks
/// declarations of locals, parameters and direct member/global
/// declarations; pass 2 propagates member ids to qualified and
/// object-access uses, following base classes.
pub fn set_var_ids(list: &mut TokenList, m: &Matcher) -> Result<u32, InternalError> {
    let mut map = VariableMap::new();
    pass1(list, m, &mut map)?;
    pass2(list, m)?;
    Ok(map.next_id)
}

fn pass1(list: &mut TokenList, m: &Matcher, map: &mut VariableMap) -> Result<(), InternalError> {
    let mut scopes: Vec<VarIdScopeInfo> = vec![VarIdScopeInfo {
        is_executable: false,
        is_struct_init: false,
        is_enum: false,
        start_varid: map.next_id,
    }];
    // Braces whose scope must pop an extra map layer (for-header
    // scopes extending over the loop body).
    let mut extra_layer_close: Vec<TokenId> = Vec::new();

    let mut tok = list.head();
    while let Some(t) = tok {
        let in_executable = scopes.last().is_some_and(|s| s.is_executable);
        let in_enum = scopes.last().is_some_and(|s| s.is_enum);
        let in_struct_init = scopes.last().is_some_and(|s| s.is_struct_init);

        match list.str(t) {
            "{" => {
                scopes.push(VarIdScopeInfo {
                    is_executable: opens_executable(list, t, in_executable),
                    is_struct_init: opens_struct_init(list, t),
                    is_enum: opens_enum(list, t),
                    start_varid: map.next_id,
                });
                map.enter_scope();
                tok = list.next(t);
                continue;
            }
            "}" => {
                if scopes.len() > 1 {
                    scopes.pop();
                }
                map.leave_scope();
                while extra_layer_close.last() == Some(&t) {
                    extra_layer_close.pop();
                    map.leave_scope();
                }
                tok = list.next(t);
                continue;
            }
            "for" => {
                // The loop variable lives in a scope covering header
                // and body.
                if let Some(open) = list.next(t).filter(|&n| list.is(n, "(")) {
                    if let Some(close) = list.link_of(open) {
                        map.enter_scope();
                        match list.next(close) {
                            Some(body) if list.is(body, "{") => {
                                if let Some(body_close) = list.link_of(body) {
                                    extra_layer_close.push(body_close);
                                } else {
                                    map.leave_scope();
                                }
                            }
                            _ => {
                                // Braceless body: the layer closes at the
                                // semicolon ending the loop statement.
                                match statement_end_after(list, close) {
                                    Some(end) => extra_layer_close.push(end),
                                    None => map.leave_scope(),
                                }
                            }
                        }
                        if in_executable {
                            declare_at(list, m, map, list.next(open));
                        }
                        tok = list.next(open);
                        continue;
                    }
                }
                tok = list.next(t);
                continue;
            }
            ";" => {
                while extra_layer_close.last() == Some(&t) {
                    extra_layer_close.pop();
                    map.leave_scope();
                }
                tok = list.next(t);
                continue;
            }
            "sizeof" => {
                // No declarations are parsed inside sizeof; uses inside
                // still resolve below.
                if let Some(open) = list.next(t).filter(|&n| list.is(n, "(")) {
                    if let Some(close) = list.link_of(open) {
                        let mut cur = list.next(open);
                        while let Some(c) = cur {
                            if c == close {
                                break;
                            }
                            assign_use(list, map, c);
                            cur = list.next(c);
                        }
                        tok = list.next(close);
                        continue;
                    }
                }
                tok = list.next(t);
                continue;
            }
            _ => {}
        }

        // Candidate declaration positions: statement starts, and
        // parameter lists of function definitions.
        let at_statement_start = list
            .prev(t)
            .map_or(true, |p| matches!(list.str(p), ";" | "{" | "}"));
        if at_statement_start && !in_enum && !in_struct_init {
            if let Declaration::Names(names) = parse_declaration(list, m, t) {
                for name in names {
                    let id = map.declare(list.str(name));
                    list.get_mut(name).var_id = id;
                }
                tok = list.next(t);
                continue;
            }
        }

        // Function definition parameters: `f ( ... ) {`.
        if list.is(t, "(") && !in_executable {
            if let Some(close) = list.link_of(t) {
                if is_function_definition_header(list, t, close) {
                    map.enter_scope();
                    declare_parameters(list, m, map, t, close);
                    if let Some(body) = find_body_open(list, close) {
                        if let Some(body_close) = list.link_of(body) {
                            extra_layer_close.push(body_close);
                        } else {
                            map.leave_scope();
                        }
                    } else {
                        map.leave_scope();
                    }
                }
            }
        }

        if (in_executable || scopes.len() == 1) && !in_enum {
            assign_use(list, map, t);
        }

        tok = list.next(t);
    }
    Ok(())
}

fn statement_end_after(list: &TokenList, t: TokenId) -> Option<TokenId> {
    let mut cur = list.next(t);
    while let Some(c) = cur {
        match list.str(c) {
            ";" => return Some(c),
            "{" | "(" | "[" => cur = list.link_of(c).and_then(|l| list.next(l)),
            "}" => return None,
            _ => cur = list.next(c),
        }
    }
    None
}

fn find_body_open(list: &TokenList, close: TokenId) -> Option<TokenId> {
    let mut cur = list.next(close);
    while let Some(c) = cur {
        match list.str(c) {
            "{" => return Some(c),
            "const" | "noexcept" | "override" | "final" | "volatile" | "->" => {
                cur = list.next(c)
            }
            _ if list.get(c).is_name() => cur = list.next(c),
            _ => return None,
        }
    }
    None
}

fn is_function_definition_header(list: &TokenList, open: TokenId, close: TokenId) -> bool {
    // Name before the parens, body brace after them.
    let named = list
        .prev(open)
        .is_some_and(|p| list.get(p).is_name() && !matches!(list.str(p), "if" | "for" | "while" | "switch" | "return" | "sizeof"));
    named && find_body_open(list, close).is_some()
}

fn declare_parameters(
    list: &mut TokenList,
    m: &Matcher,
    map: &mut VariableMap,
    open: TokenId,
    close: TokenId,
) {
    let mut cur = list.next(open);
    while let Some(seg_start) = cur {
        if seg_start == close {
            break;
        }
        if let Declaration::Names(names) = parse_declaration(list, m, seg_start) {
            for name in names {
                let id = map.declare(list.str(name));
                list.get_mut(name).var_id = id;
            }
        }
        // Advance to the next top-level comma.
        let mut c = Some(seg_start);
        while let Some(x) = c {
            if x == close {
                cur = Some(close);
                break;
            }
            match list.str(x) {
                "," => {
                    cur = list.next(x);
                    break;
                }
                "(" | "[" | "{" => {
                    c = list.link_of(x).and_then(|l| list.next(l));
                }
                "<" => match list.find_closing_angle(x) {
                    Some(l) => c = list.next(l),
                    None => c = list.next(x),
                },
                _ => c = list.next(x),
            }
        }
        if c.is_none() {
            break;
        }
    }
}

fn declare_at(list: &mut TokenList, m: &Matcher, map: &mut VariableMap, t: Option<TokenId>) {
    if let Some(t) = t {
        if let Declaration::Names(names) = parse_declaration(list, m, t) {
            for name in names {
                let id = map.declare(list.str(name));
                list.get_mut(name).var_id = id;
            }
        }
    }
}

fn assign_use(list: &mut TokenList, map: &VariableMap, t: TokenId) {
    let data = list.get(t);
    if data.kind != TokenKind::Name || data.var_id != 0 {
        return;
    }
    if is_excluded_use(list, t) {
        return;
    }
    if let Some(id) = map.lookup(list.str(t)) {
        list.get_mut(t).var_id = id;
    }
}

fn pass2(list: &mut TokenList, m: &Matcher) -> Result<(), InternalError> {
    // Collect record/namespace bodies and their direct member ids.
    let mut classes: Vec<ClassInfo> = Vec::new();
    let mut tok = list.head();
    while let Some(t) = tok {
        if matches!(list.str(t), "class" | "struct" | "union" | "namespace") {
            if let Some(name_tok) = list.next(t).filter(|&n| list.get(n).kind == TokenKind::Name) {
                let mut bases = Vec::new();
                let mut cur = list.next(name_tok);
                // Base clause.
                if cur.is_some_and(|c| list.is(c, ":")) {
                    let mut b = cur.and_then(|c| list.next(c));
                    while let Some(bt) = b {
                        if list.is(bt, "{") {
                            break;
                        }
                        if list.get(bt).kind == TokenKind::Name
                            && !matches!(list.str(bt), "public" | "protected" | "private" | "virtual")
                        {
                            bases.push(list.str(bt).to_string());
                        }
                        b = list.next(bt);
                    }
                    cur = b;
                }
                if let Some(open) = cur.filter(|&c| list.is(c, "{")) {
                    if let Some(close) = list.link_of(open) {
                        let members = collect_members(list, open, close);
                        classes.push(ClassInfo {
                            name: list.str(name_tok).to_string(),
                            body_open: open,
                            body_close: close,
                            bases,
                            members,
                        });
                    }
                }
            }
        }
        tok = list.next(t);
    }

    // Fold base-class members into the deriving class maps.
    let by_name: HashMap<String, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.clone(), i))
        .collect();
    for i in 0..classes.len() {
        let mut inherited: Vec<(String, u32)> = Vec::new();
        let mut queue: Vec<String> = classes[i].bases.clone();
        let mut seen = std::collections::HashSet::new();
        while let Some(base) = queue.pop() {
            if !seen.insert(base.clone()) {
                continue;
            }
            if let Some(&b) = by_name.get(&base) {
                for (name, id) in &classes[b].members {
                    inherited.push((name.clone(), *id));
                }
                queue.extend(classes[b].bases.iter().cloned());
            }
        }
        for (name, id) in inherited {
            classes[i].members.entry(name).or_insert(id);
        }
    }

    // Variable type names recorded from declarations: var id -> class.
    let mut var_types: HashMap<u32, String> = HashMap::new();
    for t in list.iter().collect::<Vec<_>>() {
        let data = list.get(t);
        if data.var_id != 0 {
            if let Some(p) = list.prev(t) {
                let mut type_tok = p;
                if matches!(list.str(p), "*" | "&") {
                    match list.prev(p) {
                        Some(pp) => type_tok = pp,
                        None => continue,
                    }
                }
                if list.get(type_tok).kind == TokenKind::Name {
                    var_types
                        .entry(data.var_id)
                        .or_insert_with(|| list.str(type_tok).to_string());
                }
            }
        }
    }

    for class in &classes {
        // Qualified uses `X :: member` (not calls).
        let mut tok = list.head();
        while let Some(t) = tok {
            if list.is(t, &class.name) && m.matches(list, list.next(t), ":: %name%") {
                if let Some(member) = list.at(t, 2) {
                    let next_after = list.next(member);
                    let is_call = next_after.is_some_and(|n| list.is(n, "("));
                    if !is_call && list.get(member).var_id == 0 {
                        if let Some(&id) = class.members.get(list.str(member)) {
                            list.get_mut(member).var_id = id;
                        }
                    }
                }
            }
            tok = list.next(t);
        }

        // Object accesses `obj . member` where obj's declared type is X.
        let mut tok = list.head();
        while let Some(t) = tok {
            if matches!(list.str(t), "." | "->") {
                let obj_id = list.prev(t).map_or(0, |p| list.get(p).var_id);
                if obj_id != 0 && var_types.get(&obj_id).map(String::as_str) == Some(&class.name) {
                    if let Some(member) = list.next(t) {
                        let is_call = list.next(member).is_some_and(|n| list.is(n, "("));
                        if !is_call && list.get(member).var_id == 0 {
                            if let Some(&id) = class.members.get(list.str(member)) {
                                list.get_mut(member).var_id = id;
                            }
                        }
                    }
                }
            }
            tok = list.next(t);
        }

        // Unqualified member uses inside member function bodies of X
        // (inline bodies, and out-of-line `T X :: f ( ... ) { ... }`).
        let mut ranges: Vec<(TokenId, TokenId)> = vec![(class.body_open, class.body_close)];
        let mut tok = list.head();
        while let Some(t) = tok {
            if list.is(t, &class.name)
                && m.matches(list, list.next(t), ":: %name% (")
            {
                if let Some(open) = list.at(t, 3) {
                    if let Some(close) = list.link_of(open) {
                        if let Some(body) = find_body_open(list, close) {
                            if let Some(body_close) = list.link_of(body) {
                                ranges.push((body, body_close));
                            }
                        }
                    }
                }
            }
            tok = list.next(t);
        }
        for (open, close) in ranges {
            let ids: Vec<TokenId> = list.iter_range(open, close).collect();
            for t in ids {
                let data = list.get(t);
                if data.kind != TokenKind::Name || data.var_id != 0 {
                    continue;
                }
                if is_excluded_use(list, t) {
                    continue;
                }
                let is_call = list.next(t).is_some_and(|n| list.is(n, "("));
                if is_call {
                    continue;
                }
                if let Some(&id) = class.members.get(list.str(t)) {
                    list.get_mut(t).var_id = id;
                }
            }
        }
    }
    Ok(())
}

/// Direct member variables of a record body: names with ids assigned by
/// pass 1 at body depth; method bodies and parameter lists are skipped.
fn collect_members(list: &TokenList, open: TokenId, close: TokenId) -> HashMap<String, u32> {
    let mut members = HashMap::new();
    let mut cur = list.next(open);
    while let Some(t) = cur {
        if t == close {
            break;
        }
        if list.is(t, "{") || list.is(t, "(") {
            cur = list.link_of(t).and_then(|l| list.next(l));
            continue;
        }
        let data = list.get(t);
        if data.kind == TokenKind::Name && data.var_id != 0 {
            members.insert(list.str(t).to_string(), data.var_id);
        }
        cur = list.next(t);
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker;
    use crate::settings::Language;

    fn with_ids(code: &str) -> TokenList {
        let mut list = TokenList::new(Language::Cpp);
        list.create_tokens(code, "test.cpp").unwrap();
        linker::create_links(&mut list).unwrap();
        let m = Matcher::new();
        set_var_ids(&mut list, &m).unwrap();
        list
    }

    fn id_of(list: &TokenList, lexeme: &str, nth: usize) -> u32 {
        let t = list
            .iter()
            .filter(|&t| list.is(t, lexeme))
            .nth(nth)
            .unwrap_or_else(|| panic!("no {:?} #{}", lexeme, nth));
        list.get(t).var_id
    }

    #[test]
    fn locals_get_distinct_nonzero_ids() {
        let list = with_ids("void f ( ) { int a ; char b ; a = 1 ; b = 2 ; }");
        let a = id_of(&list, "a", 0);
        let b = id_of(&list, "b", 0);
        assert!(a > 0 && b > 0 && a != b);
        assert_eq!(id_of(&list, "a", 1), a);
        assert_eq!(id_of(&list, "b", 1), b);
    }

    #[test]
    fn parameters_share_the_body_scope() {
        let list = with_ids("void f ( int n , char * s ) { n = 1 ; s = 0 ; }");
        assert_ne!(id_of(&list, "n", 0), 0);
        assert_eq!(id_of(&list, "n", 0), id_of(&list, "n", 1));
        assert_eq!(id_of(&list, "s", 0), id_of(&list, "s", 1));
    }

    #[test]
    fn inner_scopes_shadow_and_restore() {
        let list = with_ids("void f ( ) { int x ; { int x ; x = 1 ; } x = 2 ; }");
        let outer = id_of(&list, "x", 0);
        let inner = id_of(&list, "x", 1);
        assert_ne!(outer, inner);
        assert_eq!(id_of(&list, "x", 2), inner);
        assert_eq!(id_of(&list, "x", 3), outer);
    }

    #[test]
    fn function_names_and_calls_get_no_id() {
        let list = with_ids("int g ( ) ; void f ( ) { g ( ) ; }");
        assert_eq!(id_of(&list, "g", 0), 0);
        assert_eq!(id_of(&list, "g", 1), 0);
    }

    #[test]
    fn tag_names_get_no_id() {
        let list = with_ids("struct S { int m ; } ; void f ( ) { struct S s ; }");
        assert_eq!(id_of(&list, "S", 0), 0);
        assert_eq!(id_of(&list, "S", 1), 0);
        assert_ne!(id_of(&list, "s", 0), 0);
    }

    #[test]
    fn member_access_names_get_no_fresh_id() {
        let list = with_ids("void f ( ) { int y ; obj . y = 1 ; p -> y = 2 ; }");
        let y = id_of(&list, "y", 0);
        assert_ne!(y, 0);
        assert_eq!(id_of(&list, "y", 1), 0);
        assert_eq!(id_of(&list, "y", 2), 0);
    }

    #[test]
    fn qualified_names_get_no_fresh_id() {
        let list = with_ids("void f ( ) { int v ; ns :: v = 1 ; }");
        assert_eq!(id_of(&list, "v", 1), 0);
    }

    #[test]
    fn this_access_resolves_to_the_member() {
        let list = with_ids("struct S { int m ; void f ( ) { this . m = 1 ; } } ;");
        let m0 = id_of(&list, "m", 0);
        assert_ne!(m0, 0);
        assert_eq!(id_of(&list, "m", 1), m0);
    }

    #[test]
    fn sizeof_contents_do_not_declare() {
        let list = with_ids("void f ( ) { int x ; y = sizeof ( int ) + sizeof ( x ) ; }");
        let x = id_of(&list, "x", 0);
        assert_eq!(id_of(&list, "x", 1), x);
        assert_eq!(id_of(&list, "int", 1), 0);
    }

    #[test]
    fn structured_bindings_declare_every_name() {
        let list = with_ids("void f ( ) { auto [ a , b ] = p ; a = b ; }");
        let a = id_of(&list, "a", 0);
        let b = id_of(&list, "b", 0);
        assert!(a != 0 && b != 0 && a != b);
        assert_eq!(id_of(&list, "a", 1), a);
        assert_eq!(id_of(&list, "b", 1), b);
    }

    #[test]
    fn range_for_variable_is_scoped_to_the_loop() {
        let list = with_ids("void f ( ) { for ( auto e : v ) { g ( e ) ; } e = 1 ; }");
        let e_decl = id_of(&list, "e", 0);
        assert_ne!(e_decl, 0);
        assert_eq!(id_of(&list, "e", 1), e_decl);
        assert_eq!(id_of(&list, "e", 2), 0, "loop variable leaked its scope");
    }

    #[test]
    fn enum_constants_get_no_id() {
        let list = with_ids("enum E { RED , GREEN } ; void f ( ) { x = RED ; }");
        assert_eq!(id_of(&list, "RED", 0), 0);
        assert_eq!(id_of(&list, "GREEN", 0), 0);
        assert_eq!(id_of(&list, "RED", 1), 0);
    }

    #[test]
    fn globals_get_ids() {
        let list = with_ids("int g ; void f ( ) { g = 1 ; }");
        let g = id_of(&list, "g", 0);
        assert_ne!(g, 0);
        assert_eq!(id_of(&list, "g", 1), g);
    }

    #[test]
    fn member_ids_propagate_to_qualified_uses() {
        let list = with_ids("struct X { static int count ; } ; void f ( ) { X :: count = 1 ; }");
        let decl = id_of(&list, "count", 0);
        assert_ne!(decl, 0);
        assert_eq!(id_of(&list, "count", 1), decl);
    }

    #[test]
    fn member_ids_propagate_through_typed_objects() {
        let list = with_ids("struct X { int m ; } ; void f ( ) { X o ; o . m = 1 ; }");
        let decl = id_of(&list, "m", 0);
        assert_ne!(decl, 0);
        assert_eq!(id_of(&list, "m", 1), decl);
    }

    #[test]
    fn out_of_line_member_function_sees_members() {
        let list = with_ids("struct X { int m ; void f ( ) ; } ; void X :: f ( ) { m = 1 ; }");
        let decl = id_of(&list, "m", 0);
        assert_ne!(decl, 0);
        assert_eq!(id_of(&list, "m", 1), decl);
    }

    #[test]
    fn base_class_members_are_visible_in_derived() {
        let list = with_ids(
            "struct B { int m ; } ; struct D : B { void f ( ) ; } ; void D :: f ( ) { m = 1 ; }",
        );
        let decl = id_of(&list, "m", 0);
        assert_ne!(decl, 0);
        assert_eq!(id_of(&list, "m", 1), decl);
    }

    #[test]
    fn ambiguous_function_style_declaration_gets_no_id() {
        let list = with_ids("void f ( ) { Foo x ( Bar ( ) ) ; }");
        assert_eq!(id_of(&list, "x", 0), 0, "could be a function declaration");
    }

    #[test]
    fn function_pointer_declarator_gets_an_id() {
        let list = with_ids("void f ( ) { int ( * fp ) ( ) ; fp = 0 ; }");
        let fp = id_of(&list, "fp", 0);
        assert_ne!(fp, 0);
        assert_eq!(id_of(&list, "fp", 1), fp);
    }

    #[test]
    fn labels_get_no_id() {
        let list = with_ids("void f ( ) { retry : x = 1 ; goto retry ; }");
        assert_eq!(id_of(&list, "retry", 0), 0);
        assert_eq!(id_of(&list, "retry", 1), 0);
    }
}
