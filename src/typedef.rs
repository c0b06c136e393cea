use std::collections::BTreeSet;

use crate::error::{InternalError, Reporter};
use crate::matcher::Matcher;
use crate::token::{is_type_keyword, TokenId, TokenKind};
use crate::tokenlist::TokenList;

/// Bookkeeping for one processed typedef, surfaced to diagnostics and
/// the dump.
#[derive(Debug, Clone)]
pub struct TypedefInfo {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub used: bool,
}

/// One frame of the lexical-scope stack maintained while scanning for
/// substitution sites.
#[derive(Debug, Clone)]
struct Space {
    name: String,
    is_namespace: bool,
    using_namespaces: BTreeSet<String>,
}

fn global_space() -> Space {
    Space {
        name: String::new(),
        is_namespace: true,
        using_namespaces: BTreeSet::new(),
    }
}

/// The declarator shape a typedef binds its name to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    /// `typedef unsigned long size_type;` and qualified/template types.
    Plain,
    /// `typedef struct S T;` (possibly after hoisting an inline body).
    /// The statement is kept in its reduced form.
    Tag,
    /// `typedef int (*fp)(int);`, optionally a member pointer.
    FuncPtr {
        params: Vec<String>,
        member_of: Option<String>,
    },
    /// `typedef int arr[4][2];`
    Array { dims: Vec<String> },
}

#[derive(Debug, Clone)]
struct TypedefDecl {
    name: String,
    /// Replacement tokens, pointer qualifiers included.
    type_text: Vec<String>,
    /// Number of leading `name ::` qualifier pairs in `type_text` that
    /// may be dropped when the use site already sits inside them.
    quals: usize,
    shape: Shape,
    /// Named class/namespace the typedef was declared in; qualified
    /// `Outer :: Name` uses after the scope closes still substitute.
    declared_in: Option<String>,
}

/// Find the `;` ending the statement starting at `from`, jumping over
/// linked bracket groups.
fn statement_end(list: &TokenList, from: TokenId) -> Option<TokenId> {
    let mut cur = Some(from);
    while let Some(t) = cur {
        match list.str(t) {
            ";" => return Some(t),
            "{" | "(" | "[" => {
                cur = list.link_of(t).and_then(|l| list.next(l));
                continue;
            }
            "}" => return None,
            _ => {}
        }
        cur = list.next(t);
    }
    None
}

fn count_quals(tokens: &[String]) -> usize {
    let mut quals = 0;
    let mut i = 0;
    while i + 2 < tokens.len() && tokens[i + 1] == "::" {
        quals += 1;
        i += 2;
    }
    quals
}

/// Drop leading qualifiers that the use site is already inside, then any
/// single leading qualifier imported by `using namespace`.
fn minimize_qualification(
    type_text: &[String],
    quals: usize,
    path: &[String],
    usings: &BTreeSet<String>,
) -> Vec<String> {
    let mut drop = 0;
    while drop < quals && drop < path.len() && type_text[drop * 2] == path[drop] {
        drop += 1;
    }
    if drop < quals && usings.contains(&type_text[drop * 2]) {
        drop += 1;
    }
    type_text[drop * 2..].to_vec()
}

pub struct TypedefSimplifier<'a> {
    matcher: &'a Matcher,
    /// Monotone counter for `Unnamed%` synthetic tag names, owned by the
    /// driver so names stay unique across restarted passes.
    unnamed_counter: &'a mut u32,
    pub infos: Vec<TypedefInfo>,
}

impl<'a> TypedefSimplifier<'a> {
    pub fn new(matcher: &'a Matcher, unnamed_counter: &'a mut u32) -> Self {
        TypedefSimplifier {
            matcher,
            unnamed_counter,
            infos: Vec::new(),
        }
    }

    /// Expand every typedef in the list. Unsupported forms are deleted
    /// without substitution (with a debug record when enabled); malformed
    /// declarators raise syntax errors. Returns whether any substitution
    /// fired.
    pub fn simplify(
        &mut self,
        list: &mut TokenList,
        rep: &mut Reporter<'_>,
        mut checkpoint: impl FnMut() -> bool,
    ) -> Result<bool, InternalError> {
        let mut substituted_any = false;
        let mut spaces: Vec<Space> = vec![global_space()];
        let mut tok = list.head();
        while let Some(t) = tok {
            if checkpoint() {
                return Ok(substituted_any);
            }
            match list.str(t) {
                "{" => {
                    let space = open_space(list, t);
                    spaces.push(space);
                    tok = list.next(t);
                    continue;
                }
                "}" => {
                    if spaces.len() > 1 {
                        spaces.pop();
                    }
                    tok = list.next(t);
                    continue;
                }
                "using" => {
                    note_using_namespace(list, t, &mut spaces);
                    tok = list.next(t);
                    continue;
                }
                "typedef" => {}
                _ => {
                    tok = list.next(t);
                    continue;
                }
            }

            let loc = list.location(t);
            let (decl, anchor) = match self.parse(list, t)? {
                Parsed::Decl(decl, anchor) => (decl, anchor),
                Parsed::Unsupported(anchor) => {
                    rep.debug("simplifyTypedef", "unsupported typedef format", Some(loc));
                    tok = delete_statement(list, anchor)?;
                    continue;
                }
            };

            let mut decl = decl;
            decl.declared_in = spaces
                .last()
                .filter(|s| !s.name.is_empty())
                .map(|s| s.name.clone());

            self.infos.push(TypedefInfo {
                name: decl.name.clone(),
                file: loc.file,
                line: loc.line,
                column: loc.column,
                used: false,
            });
            let info_index = self.infos.len() - 1;

            // Tag typedefs keep their reduced statement; everything else
            // is removed after capture.
            let resume = if decl.shape == Shape::Tag {
                let end = statement_end(list, anchor).ok_or_else(|| {
                    InternalError::syntax("typedef without trailing ';'").at(loc_of(list, anchor))
                })?;
                list.next(end)
            } else {
                delete_statement(list, anchor)?
            };

            let used = self.substitute_all(list, resume, &decl, &spaces)?;
            if used {
                self.infos[info_index].used = true;
                substituted_any = true;
            }
            tok = resume;
        }
        Ok(substituted_any)
    }

    /// Parse the typedef statement at `t` (pointing at `typedef`).
    /// Tag typedefs with inline bodies are hoisted here, reducing the
    /// statement to `typedef struct Name T ;` in place; the returned
    /// anchor is a live token of the (possibly rewritten) statement.
    fn parse(&mut self, list: &mut TokenList, t: TokenId) -> Result<Parsed, InternalError> {
        let first = list
            .next(t)
            .ok_or_else(|| InternalError::syntax("incomplete typedef").at(list.location(t)))?;

        if matches!(list.str(first), "struct" | "class" | "union" | "enum") {
            return self.parse_tag(list, t, first);
        }

        let end = statement_end(list, first).ok_or_else(|| {
            InternalError::syntax("typedef without trailing ';'").at(list.location(t))
        })?;

        // Function pointer / member pointer form?
        let mut cur = list.next(t);
        while let Some(c) = cur {
            if c == end {
                break;
            }
            if list.is(c, "(") {
                return self.parse_funcptr(list, t, c, end);
            }
            if list.is(c, "<") {
                match list.find_closing_angle(c) {
                    Some(l) => {
                        cur = list.next(l);
                        continue;
                    }
                    None => return Ok(Parsed::Unsupported(t)),
                }
            }
            cur = list.next(c);
        }

        // Plain / array. Collect the statement tokens; commas nested in
        // template arguments or array dimensions are not declarator
        // separators.
        let mut tokens: Vec<(TokenId, String)> = Vec::new();
        let mut closes: Vec<TokenId> = Vec::new();
        let mut has_top_level_comma = false;
        let mut cur = list.next(t);
        while let Some(c) = cur {
            if c == end {
                break;
            }
            tokens.push((c, list.str(c).to_string()));
            if list.is(c, "<") {
                if let Some(l) = list.find_closing_angle(c) {
                    closes.push(l);
                }
            } else if list.is(c, "[") {
                if let Some(l) = list.link_of(c) {
                    closes.push(l);
                }
            } else if closes.last() == Some(&c) {
                closes.pop();
            } else if list.is(c, ",") && closes.is_empty() {
                has_top_level_comma = true;
            }
            cur = list.next(c);
        }
        if tokens.len() < 2 {
            return Err(InternalError::syntax("incomplete typedef").at(list.location(t)));
        }

        // Comma declarator lists would need the statement re-split
        // first; treat them as unsupported.
        if has_top_level_comma {
            return Ok(Parsed::Unsupported(t));
        }

        // Strip trailing array dimensions.
        let mut name_idx = tokens.len() - 1;
        let mut dims: Vec<String> = Vec::new();
        while tokens[name_idx].1 == "]" {
            let close = name_idx;
            let mut depth = 0i32;
            loop {
                match tokens[name_idx].1.as_str() {
                    "]" => depth += 1,
                    "[" => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                if name_idx == 0 {
                    return Err(InternalError::syntax("bad typedef array dimension")
                        .at(loc_of(list, tokens[close].0)));
                }
                name_idx -= 1;
            }
            let dim: Vec<String> = tokens[name_idx..=close]
                .iter()
                .map(|(_, s)| s.clone())
                .collect();
            dims.splice(0..0, dim);
            if name_idx == 0 {
                return Err(InternalError::syntax("typedef without a name").at(list.location(t)));
            }
            name_idx -= 1;
        }

        let (name_tok, name) = tokens[name_idx].clone();
        if list.get(name_tok).kind != TokenKind::Name {
            return Ok(Parsed::Unsupported(t));
        }
        let type_text: Vec<String> = tokens[..name_idx].iter().map(|(_, s)| s.clone()).collect();
        if type_text.is_empty() {
            return Err(InternalError::syntax("typedef without a type").at(list.location(t)));
        }

        let quals = count_quals(&type_text);
        let shape = if dims.is_empty() {
            Shape::Plain
        } else {
            Shape::Array { dims }
        };
        Ok(Parsed::Decl(
            TypedefDecl {
                name,
                type_text,
                quals,
                shape,
                declared_in: None,
            },
            t,
        ))
    }

    /// `typedef struct [Name] [{ ... }] Alias ;` — hoist an inline body
    /// out and reduce the statement to the forward form.
    fn parse_tag(
        &mut self,
        list: &mut TokenList,
        typedef_tok: TokenId,
        kw: TokenId,
    ) -> Result<Parsed, InternalError> {
        let kw_str = list.str(kw).to_string();
        let mut after_kw = list
            .next(kw)
            .ok_or_else(|| InternalError::syntax("incomplete typedef").at(list.location(kw)))?;

        let tag_name;
        if list.get(after_kw).kind == TokenKind::Name {
            tag_name = list.str(after_kw).to_string();
            after_kw = list
                .next(after_kw)
                .ok_or_else(|| InternalError::syntax("incomplete typedef").at(list.location(kw)))?;
        } else if list.is(after_kw, "{") {
            // Anonymous aggregate: give it a unique synthetic name.
            *self.unnamed_counter += 1;
            tag_name = format!("Unnamed{}", *self.unnamed_counter);
            let inserted = list.insert_after(kw, &tag_name);
            after_kw = list
                .next(inserted)
                .ok_or_else(|| InternalError::syntax("incomplete typedef").at(list.location(kw)))?;
        } else {
            return Ok(Parsed::Unsupported(typedef_tok));
        }

        // Skip an enum base (`enum E : int { ... }`).
        let mut cur = Some(after_kw);
        let mut body_open = None;
        while let Some(c) = cur {
            match list.str(c) {
                "{" => {
                    body_open = Some(c);
                    break;
                }
                ":" | "int" | "char" | "short" | "long" | "unsigned" | "signed" => {
                    cur = list.next(c)
                }
                _ => break,
            }
        }

        if let Some(open) = body_open {
            let close = list
                .link_of(open)
                .ok_or_else(|| InternalError::syntax("unlinked brace").at(list.location(open)))?;
            // Alias (with optional pointer declarator) follows the body.
            let mut p = list.next(close);
            let mut pointer = Vec::new();
            while let Some(c) = p {
                if matches!(list.str(c), "*" | "&") {
                    pointer.push(list.str(c).to_string());
                    p = list.next(c);
                } else {
                    break;
                }
            }
            let alias = match p {
                Some(a) if list.get(a).kind == TokenKind::Name => a,
                _ => return Ok(Parsed::Unsupported(typedef_tok)),
            };
            if !self.matcher.simple(list, list.next(alias), ";") {
                return Ok(Parsed::Unsupported(typedef_tok));
            }

            // Hoist: `typedef struct N { ... } T ;` becomes
            // `struct N { ... } ; typedef struct N T ;`.
            list.erase(typedef_tok);
            let semi = list.insert_after(close, ";");
            let td = list.insert_after(semi, "typedef");
            let kw2 = list.insert_after(td, &kw_str);
            list.insert_after(kw2, &tag_name);

            let alias_name = list.str(alias).to_string();
            if pointer.is_empty() {
                return Ok(Parsed::Decl(
                    TypedefDecl {
                        name: alias_name,
                        type_text: vec![kw_str, tag_name],
                        quals: 0,
                        shape: Shape::Tag,
                        declared_in: None,
                    },
                    td,
                ));
            }
            // Pointer alias: the reduced statement is deleted like a
            // plain typedef, substituting `struct N *`.
            let mut type_text = vec![kw_str, tag_name];
            type_text.extend(pointer);
            Ok(Parsed::Decl(
                TypedefDecl {
                    name: alias_name,
                    type_text,
                    quals: 0,
                    shape: Shape::Plain,
                    declared_in: None,
                },
                td,
            ))
        } else {
            // Forward form `typedef struct S T ;`.
            let alias = match cur.filter(|&c| list.get(c).kind == TokenKind::Name) {
                Some(a) => a,
                None => return Ok(Parsed::Unsupported(typedef_tok)),
            };
            if !self.matcher.simple(list, list.next(alias), ";") {
                return Ok(Parsed::Unsupported(typedef_tok));
            }
            Ok(Parsed::Decl(
                TypedefDecl {
                    name: list.str(alias).to_string(),
                    type_text: vec![kw_str, tag_name],
                    quals: 0,
                    shape: Shape::Tag,
                    declared_in: None,
                },
                typedef_tok,
            ))
        }
    }

    fn parse_funcptr(
        &mut self,
        list: &TokenList,
        typedef_tok: TokenId,
        open: TokenId,
        end: TokenId,
    ) -> Result<Parsed, InternalError> {
        // `typedef RET ( * name ) ( params ) ;`
        // `typedef RET ( C :: * name ) ( params ) ;`
        let mut type_text = Vec::new();
        let mut cur = list.next(typedef_tok);
        while let Some(c) = cur {
            if c == open {
                break;
            }
            type_text.push(list.str(c).to_string());
            cur = list.next(c);
        }
        if type_text.is_empty() {
            return Err(InternalError::syntax("typedef without a type").at(list.location(open)));
        }
        let close = list
            .link_of(open)
            .ok_or_else(|| InternalError::syntax("unlinked parenthesis").at(list.location(open)))?;

        let mut member_of = None;
        let mut p = list.next(open);
        if let Some(c) = p {
            if self.matcher.matches(list, Some(c), "%name% :: *") {
                member_of = Some(list.str(c).to_string());
                p = list.at(c, 2);
            }
        }
        let star = match p.filter(|&c| list.is(c, "*")) {
            Some(s) => s,
            None => return Ok(Parsed::Unsupported(typedef_tok)),
        };
        let name_tok = match list
            .next(star)
            .filter(|&c| list.get(c).kind == TokenKind::Name)
        {
            Some(n) => n,
            None => return Ok(Parsed::Unsupported(typedef_tok)),
        };
        if list.next(name_tok) != Some(close) {
            return Ok(Parsed::Unsupported(typedef_tok));
        }
        let params_open = match list.next(close).filter(|&c| list.is(c, "(")) {
            Some(po) => po,
            None => return Ok(Parsed::Unsupported(typedef_tok)),
        };
        let params_close = list.link_of(params_open).ok_or_else(|| {
            InternalError::syntax("unlinked parenthesis").at(list.location(params_open))
        })?;
        if list.next(params_close) != Some(end) {
            return Ok(Parsed::Unsupported(typedef_tok));
        }
        let params: Vec<String> = list
            .iter_range(params_open, params_close)
            .map(|c| list.str(c).to_string())
            .collect();

        let quals = count_quals(&type_text);
        Ok(Parsed::Decl(
            TypedefDecl {
                name: list.str(name_tok).to_string(),
                type_text,
                quals,
                shape: Shape::FuncPtr { params, member_of },
                declared_in: None,
            },
            typedef_tok,
        ))
    }

    /// Substitute every in-scope use of `decl.name` from `start` onward;
    /// once the declaring scope closes, only `Outer :: Name` qualified
    /// uses keep substituting.
    fn substitute_all(
        &mut self,
        list: &mut TokenList,
        start: Option<TokenId>,
        decl: &TypedefDecl,
        outer_spaces: &[Space],
    ) -> Result<bool, InternalError> {
        let mut spaces: Vec<Space> = outer_spaces.to_vec();
        let base_depth = spaces.len();
        let mut shadow_depth: Option<usize> = None;
        let mut in_scope = true;
        let mut used = false;

        let mut tok = start;
        while let Some(t) = tok {
            match list.str(t) {
                "{" => {
                    spaces.push(open_space(list, t));
                    tok = list.next(t);
                    continue;
                }
                "}" => {
                    if in_scope && spaces.len() == base_depth {
                        // The declaring scope ends; continue only for
                        // qualified uses.
                        if decl.declared_in.is_none() {
                            break;
                        }
                        in_scope = false;
                        if spaces.len() > 1 {
                            spaces.pop();
                        }
                    } else if spaces.len() > 1 {
                        if shadow_depth == Some(spaces.len()) {
                            shadow_depth = None;
                        }
                        spaces.pop();
                    }
                    tok = list.next(t);
                    continue;
                }
                "using" => {
                    note_using_namespace(list, t, &mut spaces);
                    tok = list.next(t);
                    continue;
                }
                _ => {}
            }

            if list.get(t).kind != TokenKind::Name || !list.is(t, &decl.name) {
                tok = list.next(t);
                continue;
            }
            if !in_scope {
                // Only `Outer :: Name` still refers to this typedef.
                let qualified = match (list.prev(t), &decl.declared_in) {
                    (Some(p), Some(outer)) if list.is(p, "::") => {
                        list.prev(p).is_some_and(|q| list.is(q, outer))
                    }
                    _ => false,
                };
                if !qualified {
                    tok = list.next(t);
                    continue;
                }
            } else if shadow_depth.is_some() {
                tok = list.next(t);
                continue;
            }
            if !self.substitutable(list, t, decl) {
                if is_shadowing_declaration(self.matcher, list, t) {
                    shadow_depth = Some(spaces.len());
                }
                tok = list.next(t);
                continue;
            }

            tok = Some(self.substitute_one(list, t, decl, &spaces));
            used = true;
        }
        Ok(used)
    }

    fn substitutable(&self, list: &TokenList, t: TokenId, decl: &TypedefDecl) -> bool {
        if let Some(p) = list.prev(t) {
            // Overloaded `operator T`.
            if list.is(p, "operator") {
                return false;
            }
            // Tag references to an aggregate of the same name.
            if matches!(list.str(p), "struct" | "class" | "union" | "enum") {
                return false;
            }
            // Member access.
            if matches!(list.str(p), "." | "->") {
                return false;
            }
            // Foreign qualification; the declaring scope's own
            // qualification is fine.
            if list.is(p, "::") {
                let from_declaring_scope = match (&decl.declared_in, list.prev(p)) {
                    (Some(outer), Some(q)) => list.is(q, outer),
                    _ => false,
                };
                if !from_declaring_scope {
                    return false;
                }
            }
        }
        !is_shadowing_declaration(self.matcher, list, t)
    }

    fn substitute_one(
        &mut self,
        list: &mut TokenList,
        t: TokenId,
        decl: &TypedefDecl,
        spaces: &[Space],
    ) -> TokenId {
        // `Outer :: T` — drop the now-redundant qualification.
        if let Some(p) = list.prev(t).filter(|&p| list.is(p, "::")) {
            if let Some(q) = list.prev(p) {
                list.erase(q);
            }
            list.erase(p);
        }

        let path: Vec<String> = spaces
            .iter()
            .filter(|s| !s.name.is_empty())
            .map(|s| s.name.clone())
            .collect();
        let mut usings: BTreeSet<String> = BTreeSet::new();
        for s in spaces {
            usings.extend(s.using_namespaces.iter().cloned());
        }
        let text = minimize_qualification(&decl.type_text, decl.quals, &path, &usings);

        // Replace the name token with the type text.
        list.remember_original(t);
        let mut anchor = t;
        for (i, word) in text.iter().enumerate() {
            if i == 0 {
                list.set_str(anchor, word);
            } else {
                anchor = list.insert_after(anchor, word);
            }
        }

        match &decl.shape {
            Shape::Plain | Shape::Tag => {}
            Shape::Array { dims } => {
                // Dimensions belong after the declared name when one
                // follows; otherwise directly after the type.
                let dim_anchor = match list.next(anchor) {
                    Some(n) if list.get(n).kind == TokenKind::Name => n,
                    _ => anchor,
                };
                let mut a = dim_anchor;
                for word in dims {
                    a = list.insert_after(a, word);
                }
            }
            Shape::FuncPtr { params, member_of } => {
                // `FP f ;`   -> `RET ( * f ) ( params ) ;`
                // `( FP ) x` -> `( RET ( * ) ( params ) ) x`
                anchor = list.insert_after(anchor, "(");
                let inner_open = anchor;
                if let Some(outer) = member_of {
                    anchor = list.insert_after(anchor, outer);
                    anchor = list.insert_after(anchor, "::");
                }
                anchor = list.insert_after(anchor, "*");
                if let Some(n) = list.next(anchor) {
                    if list.get(n).kind == TokenKind::Name {
                        anchor = n;
                    }
                }
                anchor = list.insert_after(anchor, ")");
                list.get_mut(inner_open).link = Some(anchor);
                let inner_close = anchor;
                list.get_mut(inner_close).link = Some(inner_open);
                let mut pending: Vec<TokenId> = Vec::new();
                for word in params {
                    anchor = list.insert_after(anchor, word);
                    match word.as_str() {
                        "(" => pending.push(anchor),
                        ")" => {
                            if let Some(open) = pending.pop() {
                                list.get_mut(open).link = Some(anchor);
                                list.get_mut(anchor).link = Some(open);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        list.next(anchor).unwrap_or(anchor)
    }
}

enum Parsed {
    Decl(TypedefDecl, TokenId),
    Unsupported(TokenId),
}

fn loc_of(list: &TokenList, t: TokenId) -> crate::error::FileLocation {
    list.location(t)
}

/// Erase the statement starting at `anchor` up to and including its `;`;
/// returns the token after it.
fn delete_statement(
    list: &mut TokenList,
    anchor: TokenId,
) -> Result<Option<TokenId>, InternalError> {
    let end = statement_end(list, anchor)
        .ok_or_else(|| InternalError::syntax("typedef without trailing ';'").at(list.location(anchor)))?;
    let after = list.next(end);
    let mut cur = Some(anchor);
    while let Some(c) = cur {
        if Some(c) == after {
            break;
        }
        cur = list.erase(c);
    }
    Ok(after)
}

/// Name the scope a `{` introduces: `namespace N {`, `struct N ... {`,
/// or an anonymous frame.
fn open_space(list: &TokenList, open: TokenId) -> Space {
    let mut name = String::new();
    let mut is_namespace = false;
    let mut t = list.prev(open);
    let mut steps = 0;
    let mut last_name = None;
    while let Some(cur) = t {
        steps += 1;
        if steps > 32 || matches!(list.str(cur), ";" | "{" | "}" | ")") {
            break;
        }
        match list.str(cur) {
            "namespace" => {
                is_namespace = true;
                if let Some(n) = last_name {
                    name = n;
                }
                break;
            }
            "struct" | "class" | "union" => {
                if let Some(n) = last_name {
                    name = n;
                }
                break;
            }
            ":" => last_name = None,
            _ if list.get(cur).kind == TokenKind::Name => {
                if last_name.is_none() {
                    last_name = Some(list.str(cur).to_string());
                }
            }
            _ => {}
        }
        t = list.prev(cur);
    }
    Space {
        name,
        is_namespace,
        using_namespaces: BTreeSet::new(),
    }
}

fn note_using_namespace(list: &TokenList, using_tok: TokenId, spaces: &mut Vec<Space>) {
    let ns = match list.next(using_tok) {
        Some(n) if list.is(n, "namespace") => n,
        _ => return,
    };
    let mut name = String::new();
    let mut cur = list.next(ns);
    while let Some(c) = cur {
        if list.get(c).is_name() {
            name.push_str(list.str(c));
        } else if list.is(c, "::") {
            name.push_str("::");
        } else {
            break;
        }
        cur = list.next(c);
    }
    if let Some(space) = spaces.last_mut() {
        if !name.is_empty() {
            space.using_namespaces.insert(name);
        }
    }
}

/// `A T ;` where `A` is itself a type re-declares `T` as a variable and
/// shadows the typedef for the rest of the block.
fn is_shadowing_declaration(m: &Matcher, list: &TokenList, t: TokenId) -> bool {
    let prev_is_type = match list.prev(t) {
        Some(p) => {
            let data = list.get(p);
            (data.kind == TokenKind::Name)
                || is_type_keyword(list.str(p))
                || matches!(list.str(p), "*" | "&")
        }
        None => false,
    };
    prev_is_type && m.matches(list, list.next(t), ";|,|=|[|)")
}
