//! The fixed-order battery of local rewrites. Each rewrite is idempotent
//! and a no-op on already-canonical input; the order matters because
//! later groups assume earlier ones have run.

use crate::error::{InternalError, Reporter, Severity};
use crate::matcher::Matcher;
use crate::settings::Settings;
use crate::token::{is_operator_keyword, TokenId, TokenKind};
use crate::tokenlist::TokenList;

// ----------------------------------------------------------------------
// Group 1: macro removal and normalization
// ----------------------------------------------------------------------

/// Closing bracket for `open`, by link when available and by depth
/// counting before the linker has run.
fn match_close(list: &TokenList, open: TokenId) -> Option<TokenId> {
    if let Some(l) = list.link_of(open) {
        return Some(l);
    }
    let close = match list.str(open) {
        "(" => ")",
        "[" => "]",
        "{" => "}",
        _ => return None,
    };
    let open_str = list.str(open).to_string();
    let mut depth = 1i32;
    let mut cur = list.next(open);
    while let Some(t) = cur {
        if list.is(t, &open_str) {
            depth += 1;
        } else if list.is(t, close) {
            depth -= 1;
            if depth == 0 {
                return Some(t);
            }
        }
        cur = list.next(t);
    }
    None
}

pub fn simplify_pragmas(list: &mut TokenList) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.is(t, "_Pragma") {
            if let Some(open) = list.next(t).filter(|&n| list.is(n, "(")) {
                if let Some(close) = match_close(list, open) {
                    let after = list.next(close);
                    let mut cur = Some(t);
                    while let Some(c) = cur {
                        if Some(c) == after {
                            break;
                        }
                        cur = list.erase(c);
                    }
                    tok = after;
                    continue;
                }
            }
        }
        tok = list.next(t);
    }
}

/// Remove `extern "C"` wrappers, stamping the wrapped tokens.
pub fn simplify_extern_c(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if !list.is(t, "extern") || !m.matches(list, list.next(t), "%str%") {
            tok = list.next(t);
            continue;
        }
        let lang_tok = match list.next(t) {
            Some(l) if list.is(l, "\"C\"") => l,
            _ => {
                tok = list.next(t);
                continue;
            }
        };
        match list.next(lang_tok) {
            Some(open) if list.is(open, "{") => {
                if let Some(close) = list.link_of(open) {
                    let ids: Vec<TokenId> = list.iter_range(open, close).collect();
                    for id in ids {
                        list.get_mut(id).flags.set_extern_c(true);
                    }
                    list.erase(close);
                    list.erase(open);
                }
                let after = list.next(lang_tok);
                list.erase(lang_tok);
                list.erase(t);
                tok = after;
            }
            Some(first) => {
                let mut cur = Some(first);
                while let Some(c) = cur {
                    list.get_mut(c).flags.set_extern_c(true);
                    if list.is(c, ";") {
                        break;
                    }
                    cur = list.next(c);
                }
                list.erase(lang_tok);
                list.erase(t);
                tok = Some(first);
            }
            None => tok = list.next(t),
        }
    }
}

fn apply_attribute(list: &mut TokenList, target: Option<TokenId>, name: &str) {
    let target = match target {
        Some(t) => t,
        None => return,
    };
    let flags = &mut list.get_mut(target).flags;
    match name {
        "noreturn" => flags.set_attr_noreturn(true),
        "nodiscard" | "warn_unused_result" => flags.set_attr_nodiscard(true),
        "pure" => flags.set_attr_pure(true),
        "const" => flags.set_attr_const(true),
        "packed" => flags.set_attr_packed(true),
        "unused" => flags.set_attr_unused(true),
        "maybe_unused" => flags.set_attr_maybe_unused(true),
        _ => {}
    }
}

/// Next name token, the usual attachment point of an attribute written
/// before a declaration.
fn attribute_target(list: &TokenList, after: Option<TokenId>, before: Option<TokenId>) -> Option<TokenId> {
    let mut cur = after;
    let mut steps = 0;
    while let Some(t) = cur {
        steps += 1;
        if steps > 16 {
            break;
        }
        if list.get(t).is_name() && list.get(t).kind == TokenKind::Name {
            return Some(t);
        }
        if matches!(list.str(t), ";" | "{" | "}") {
            break;
        }
        cur = list.next(t);
    }
    // Trailing attribute: attach backwards (`void f() __attribute__...`).
    let mut cur = before;
    let mut steps = 0;
    while let Some(t) = cur {
        steps += 1;
        if steps > 16 {
            break;
        }
        if list.get(t).kind == TokenKind::Name {
            return Some(t);
        }
        cur = list.prev(t);
    }
    None
}

/// `__attribute__((...))`, `__declspec(...)`, `[[...]]` and `alignas(...)`
/// are parsed for the flags the analysis cares about and stripped.
pub fn simplify_attributes(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        let is_gnu = list.is(t, "__attribute__") || list.is(t, "__attribute");
        let is_declspec = list.is(t, "__declspec");
        let is_alignas = list.is(t, "alignas") || list.is(t, "_Alignas");
        let is_cpp_attr = list.is(t, "[") && m.matches(list, list.next(t), "[") && is_attr_position(list, t);

        if is_gnu || is_declspec || is_alignas {
            if let Some(open) = list.next(t).filter(|&n| list.is(n, "(")) {
                if let Some(close) = match_close(list, open) {
                    if !is_alignas {
                        let names: Vec<String> = list
                            .iter_range(open, close)
                            .filter(|&c| list.get(c).is_name())
                            .map(|c| list.str(c).trim_matches('_').to_string())
                            .collect();
                        let target = attribute_target(list, list.next(close), list.prev(t));
                        for name in names {
                            apply_attribute(list, target, &name);
                        }
                    }
                    let after = list.next(close);
                    let mut cur = Some(t);
                    while let Some(c) = cur {
                        if Some(c) == after {
                            break;
                        }
                        cur = list.erase(c);
                    }
                    tok = after;
                    continue;
                }
            }
        } else if is_cpp_attr {
            let inner_open = list.next(t);
            let inner_close = inner_open.and_then(|c| match_close(list, c));
            let outer_close = inner_close.and_then(|c| list.next(c));
            if let (Some(inner_open), Some(inner_close), Some(outer_close)) =
                (inner_open, inner_close, outer_close)
            {
                if list.is(outer_close, "]") && match_close(list, t) == Some(outer_close) {
                    let names: Vec<String> = list
                        .iter_range(inner_open, inner_close)
                        .filter(|&c| list.get(c).is_name())
                        .map(|c| list.str(c).to_string())
                        .collect();
                    let target = attribute_target(list, list.next(outer_close), list.prev(t));
                    for name in names {
                        apply_attribute(list, target, &name);
                    }
                    let after = list.next(outer_close);
                    let mut cur = Some(t);
                    while let Some(c) = cur {
                        if Some(c) == after {
                            break;
                        }
                        cur = list.erase(c);
                    }
                    tok = after;
                    continue;
                }
            }
        }
        tok = list.next(t);
    }
}

/// `[ [` opens an attribute only in a statement/declaration position,
/// never after a subscriptable expression.
fn is_attr_position(list: &TokenList, open: TokenId) -> bool {
    match list.prev(open) {
        None => true,
        Some(p) => !(list.get(p).is_name()
            || matches!(list.get(p).kind, TokenKind::Number | TokenKind::String)
            || matches!(list.str(p), ")" | "]")),
    }
}

pub fn simplify_calling_conventions(list: &mut TokenList) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if matches!(
            list.str(t),
            "__cdecl"
                | "__stdcall"
                | "__fastcall"
                | "__thiscall"
                | "__clrcall"
                | "__syscall"
                | "__pascal"
                | "__fortran"
                | "__far"
                | "__near"
                | "WINAPI"
                | "APIENTRY"
                | "CALLBACK"
        ) {
            tok = list.erase(t);
            continue;
        }
        tok = list.next(t);
    }
}

/// Qt's `signals:`/`slots:` sections become plain access specifiers;
/// Borland's `__closure` is dropped and `__property` declarations are
/// removed whole.
pub fn simplify_qt_and_borland(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if (list.is(t, "signals") || list.is(t, "Q_SIGNALS")) && m.simple(list, list.next(t), ":") {
            list.set_str(t, "protected");
            tok = list.next(t);
            continue;
        }
        if (list.is(t, "slots") || list.is(t, "Q_SLOTS")) && m.simple(list, list.next(t), ":") {
            list.set_str(t, "public");
            tok = list.next(t);
            continue;
        }
        if list.is(t, "__closure") {
            tok = list.erase(t);
            continue;
        }
        if list.is(t, "__property") {
            let mut cur = Some(t);
            while let Some(c) = cur {
                let was_semi = list.is(c, ";");
                cur = list.erase(c);
                if was_semi {
                    break;
                }
            }
            tok = cur;
            continue;
        }
        tok = list.next(t);
    }
}

// ----------------------------------------------------------------------
// Group 2: lexical combinations
// ----------------------------------------------------------------------

/// Fuse operator pairs that a pre-tokenized ingestion may deliver split
/// (`+ =` into `+=`), and concatenate adjacent string literals.
pub fn combine_operators(list: &mut TokenList) {
    let mut tok = list.head();
    while let Some(t) = tok {
        let next = match list.next(t) {
            Some(n) => n,
            None => break,
        };
        let fused = match (list.str(t), list.str(next)) {
            ("+", "=") => Some("+="),
            ("-", "=") => Some("-="),
            ("*", "=") => Some("*="),
            ("/", "=") => Some("/="),
            ("%", "=") => Some("%="),
            ("&", "=") => Some("&="),
            ("|", "=") => Some("|="),
            ("^", "=") => Some("^="),
            ("<<", "=") => Some("<<="),
            (">>", "=") => Some(">>="),
            (":", ":") => Some("::"),
            _ => None,
        };
        if let Some(s) = fused {
            let same_spot = {
                let (a, b) = (list.get(t), list.get(next));
                a.line == b.line && b.column <= a.column + list.str(t).len() as u32
            };
            if same_spot {
                list.set_str(t, s);
                list.erase(next);
                continue;
            }
        }
        // String literal concatenation.
        if list.get(t).kind == TokenKind::String && list.get(next).kind == TokenKind::String {
            let a = list.str(t).to_string();
            let b = list.str(next).to_string();
            if let (Some(head), Some(tail_at)) = (a.strip_suffix('"'), b.find('"')) {
                let merged = format!("{}{}", head, &b[tail_at + 1..]);
                list.set_str(t, &merged);
                list.erase(next);
                continue;
            }
        }
        tok = Some(next);
    }
}

/// `, -3` and friends: fuse a sign into the literal when no left operand
/// can exist.
pub fn concatenate_negative_numbers(list: &mut TokenList) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if !matches!(list.str(t), "-" | "+") {
            tok = list.next(t);
            continue;
        }
        let starts_operand = list.prev(t).map_or(true, |p| {
            matches!(
                list.str(p),
                "[" | "(" | "," | "=" | "return" | "case" | "?" | ":" | ";" | "{" | "<" | ">"
                    | "<=" | ">=" | "==" | "!=" | "&&" | "||" | "+" | "-" | "*" | "/" | "%"
            )
        });
        let num = list.next(t).filter(|&n| list.get(n).kind == TokenKind::Number);
        if let (true, Some(num)) = (starts_operand, num) {
            if list.is(t, "-") {
                let fused = format!("-{}", list.str(num));
                list.set_str(num, &fused);
            }
            tok = list.erase(t);
            continue;
        }
        tok = list.next(t);
    }
}

/// C++ alternative operator spellings become their symbolic forms. For C
/// the rewrite runs only when the whole unit never uses the spelling as
/// an identifier, so code that really has a variable named `and` is left
/// alone.
pub fn simplify_alternative_tokens(list: &mut TokenList, m: &Matcher) {
    if !list.is_cpp() {
        let mut used_as_identifier = false;
        for t in list.iter() {
            if !is_operator_keyword(list.str(t)) {
                continue;
            }
            let declaredish = m.matches(list, Some(t), "%name% ;|=|,|)|[")
                && list.prev(t).is_some_and(|p| {
                    list.get(p).is_name() || matches!(list.str(p), "*" | "&")
                });
            if declaredish {
                used_as_identifier = true;
                break;
            }
        }
        if used_as_identifier {
            return;
        }
    }
    let ids: Vec<TokenId> = list.iter().collect();
    for t in ids {
        let replacement = match list.str(t) {
            "and" => "&&",
            "or" => "||",
            "bitand" => "&",
            "bitor" => "|",
            "xor" => "^",
            "compl" => "~",
            "not" => "!",
            "not_eq" => "!=",
            "and_eq" => "&=",
            "or_eq" => "|=",
            "xor_eq" => "^=",
            _ => continue,
        };
        // Only rewrite operator positions: an operand must precede
        // binary spellings.
        let binary = !matches!(list.str(t), "compl" | "not");
        let has_left = list.prev(t).is_some_and(|p| {
            list.get(p).is_name()
                || matches!(
                    list.get(p).kind,
                    TokenKind::Number | TokenKind::String | TokenKind::Char | TokenKind::Boolean
                )
                || matches!(list.str(p), ")" | "]")
        });
        if binary != has_left && !list.is_cpp() {
            continue;
        }
        list.remember_original(t);
        list.set_str(t, replacement);
        list.get_mut(t).flags.set_operator_keyword(true);
    }
}

// ----------------------------------------------------------------------
// Group 3: structural canonicalization
// ----------------------------------------------------------------------

/// GCC statement expressions `({ ... })` lose their wrappers.
pub fn simplify_statement_expressions(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.is(t, "(") && m.simple(list, list.next(t), "{") {
            let inner_open = match list.next(t) {
                Some(o) => o,
                None => break,
            };
            let inner_close = list.link_of(inner_open);
            let outer_close = list.link_of(t);
            if let (Some(ic), Some(oc)) = (inner_close, outer_close) {
                if list.next(ic) == Some(oc) {
                    list.erase(oc);
                    list.erase(ic);
                    list.erase(inner_open);
                    tok = list.erase(t);
                    continue;
                }
            }
        }
        tok = list.next(t);
    }
}

/// `case A ... B :` becomes an explicit label per value, up to the cap.
pub fn simplify_case_ranges(list: &mut TokenList, m: &Matcher, settings: &Settings) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.is(t, "case") && m.matches(list, list.next(t), "%num% ... %num% :") {
            let lo_tok = list.at(t, 1);
            let hi_tok = list.at(t, 3);
            let lo = lo_tok.and_then(|x| list.str(x).parse::<i64>().ok());
            let hi = hi_tok.and_then(|x| list.str(x).parse::<i64>().ok());
            if let (Some(lo), Some(hi)) = (lo, hi) {
                if lo <= hi && (hi - lo) as u64 <= settings.max_case_range as u64 {
                    // `case lo : case lo+1 : ... case hi :`
                    list.erase_next(t, 2); // `... hi`
                    let mut anchor = match list.next(t) {
                        Some(colon) => colon,
                        None => break,
                    };
                    for v in lo + 1..=hi {
                        anchor = list.insert_after(anchor, "case");
                        anchor = list.insert_after(anchor, &v.to_string());
                        anchor = list.insert_after(anchor, ":");
                    }
                    tok = list.next(anchor);
                    continue;
                }
            }
        }
        tok = list.next(t);
    }
}

/// `0 [ a ]` reads backwards; canonicalize to `a [ 0 ]`.
pub fn simplify_commutative_subscript(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.get(t).kind == TokenKind::Number
            && m.matches(list, list.next(t), "[ %name% ]")
            && !list
                .prev(t)
                .is_some_and(|p| list.get(p).is_name() || matches!(list.str(p), ")" | "]"))
        {
            if let Some(name) = list.at(t, 2) {
                let num = list.str(t).to_string();
                let name_str = list.str(name).to_string();
                list.set_str(t, &name_str);
                list.set_str(name, &num);
            }
        }
        tok = list.next(t);
    }
}

/// `"abc" [ 1 ]` is the char literal `'b'`; `* ( p + n )` is `p [ n ]`;
/// `& p [ n ]` is `( p + n )`.
pub fn simplify_pointer_sugar(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        // "str"[n] -> 'c'
        if list.get(t).kind == TokenKind::String && m.matches(list, list.next(t), "[ %num% ]") {
            let idx = list
                .at(t, 2)
                .and_then(|n| list.str(n).parse::<usize>().ok());
            let body: Vec<char> = {
                let s = list.str(t);
                let inner = &s[s.find('"').map(|i| i + 1).unwrap_or(0)..s.len().saturating_sub(1)];
                inner.chars().collect()
            };
            if let Some(idx) = idx {
                let plain = !body.contains(&'\\');
                if plain && idx < body.len() {
                    let lit = format!("'{}'", body[idx]);
                    list.erase_next(t, 3);
                    list.set_str(t, &lit);
                    tok = list.next(t);
                    continue;
                }
            }
        }
        // * ( p + n ) -> p [ n ]
        if list.is(t, "*")
            && m.matches(list, list.next(t), "( %name% + %num% )")
            && !list
                .prev(t)
                .is_some_and(|p| {
                    list.get(p).is_name()
                        || matches!(list.get(p).kind, TokenKind::Number)
                        || matches!(list.str(p), ")" | "]")
                })
        {
            let name = list.at(t, 2).map(|x| list.str(x).to_string());
            let num = list.at(t, 4).map(|x| list.str(x).to_string());
            if let (Some(name), Some(num)) = (name, num) {
                list.erase_next(t, 5);
                list.set_str(t, &name);
                let open = list.insert_after(t, "[");
                let num_tok = list.insert_after(open, &num);
                let close = list.insert_after(num_tok, "]");
                list.get_mut(open).link = Some(close);
                list.get_mut(close).link = Some(open);
                tok = list.next(close);
                continue;
            }
        }
        // & p [ n ] -> ( p + n )
        if list.is(t, "&")
            && m.matches(list, list.next(t), "%name% [ %num% ]")
            && !list
                .prev(t)
                .is_some_and(|p| {
                    list.get(p).is_name()
                        || matches!(list.get(p).kind, TokenKind::Number)
                        || matches!(list.str(p), ")" | "]")
                })
        {
            let name = list.at(t, 1).map(|x| list.str(x).to_string());
            let num = list.at(t, 3).map(|x| list.str(x).to_string());
            if let (Some(name), Some(num)) = (name, num) {
                list.erase_next(t, 4);
                list.set_str(t, "(");
                let name_tok = list.insert_after(t, &name);
                let plus = list.insert_after(name_tok, "+");
                let num_tok = list.insert_after(plus, &num);
                let close = list.insert_after(num_tok, ")");
                list.get_mut(t).link = Some(close);
                list.get_mut(close).link = Some(t);
                tok = list.next(close);
                continue;
            }
        }
        tok = list.next(t);
    }
}

// ----------------------------------------------------------------------
// Group 4: declarations
// ----------------------------------------------------------------------

/// `static`/`const` drift to a canonical prefix order in declarations:
/// `static` first, `const` second, the type after.
pub fn simplify_static_const(list: &mut TokenList, m: &Matcher) {
    let mut changed = true;
    while changed {
        changed = false;
        let ids: Vec<TokenId> = list.iter().collect();
        for t in ids {
            if m.matches(list, Some(t), "const static") || m.matches(list, Some(t), "%type% static")
            {
                if let Some(n) = list.next(t).filter(|&n| list.is(n, "static")) {
                    let a = list.str(t).to_string();
                    list.set_str(t, "static");
                    list.set_str(n, &a);
                    changed = true;
                }
            } else if m.matches(list, Some(t), "%type% const") && !list.is(t, "const") {
                // `int const x` -> `const int x`
                if let Some(n) = list.next(t).filter(|&n| list.is(n, "const")) {
                    let a = list.str(t).to_string();
                    list.set_str(t, "const");
                    list.set_str(n, &a);
                    changed = true;
                }
            }
        }
    }
}

/// K&R parameter declarations move into the parameter list:
/// `int f(a) int a; { }` becomes `int f(int a) { }`.
pub fn simplify_knr_parameters(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        // Function header with bare names, declarations before the body.
        if !(list.is(t, "(") && list.prev(t).is_some_and(|p| list.get(p).kind == TokenKind::Name))
        {
            tok = list.next(t);
            continue;
        }
        let close = match list.link_of(t) {
            Some(c) => c,
            None => {
                tok = list.next(t);
                continue;
            }
        };
        if !m.matches(list, list.next(close), "%type%") {
            tok = list.next(t);
            continue;
        }
        // Every parameter must be a bare name.
        let params: Vec<TokenId> = list
            .iter_range(t, close)
            .filter(|&c| list.get(c).kind == TokenKind::Name)
            .collect();
        let seps_ok = list
            .iter_range(t, close)
            .all(|c| c == t || c == close || list.is(c, ",") || list.get(c).kind == TokenKind::Name);
        if params.is_empty() || !seps_ok {
            tok = list.next(t);
            continue;
        }
        // Collect `TYPE name ;` declarations up to the `{`.
        let mut types: Vec<(String, Vec<String>)> = Vec::new();
        let mut cur = list.next(close);
        let mut body = None;
        while let Some(c) = cur {
            if list.is(c, "{") {
                body = Some(c);
                break;
            }
            // TYPE name [, name] ;
            let mut type_words = Vec::new();
            let mut names = Vec::new();
            let mut x = Some(c);
            let mut ok = false;
            while let Some(w) = x {
                if list.is(w, ";") {
                    ok = !names.is_empty();
                    cur = list.next(w);
                    break;
                }
                if list.is(w, ",") {
                    x = list.next(w);
                    continue;
                }
                if !list.get(w).is_name() && !matches!(list.str(w), "*") {
                    break;
                }
                let followed_by_end = m.matches(list, list.next(w), ";|,");
                if followed_by_end && list.get(w).kind == TokenKind::Name {
                    names.push(list.str(w).to_string());
                } else {
                    type_words.push(list.str(w).to_string());
                }
                x = list.next(w);
            }
            if !ok {
                break;
            }
            for name in names {
                types.push((name, type_words.clone()));
            }
        }
        let body = match body {
            Some(b) if !types.is_empty() => b,
            _ => {
                tok = list.next(t);
                continue;
            }
        };
        // All parameters need a declaration.
        let all_typed = params
            .iter()
            .all(|&p| types.iter().any(|(n, _)| n == list.str(p)));
        if !all_typed {
            tok = list.next(t);
            continue;
        }
        // Insert the types into the parameter list and drop the
        // declaration statements.
        for &p in &params {
            let name = list.str(p).to_string();
            if let Some((_, words)) = types.iter().find(|(n, _)| *n == name) {
                for w in words.iter().rev() {
                    list.insert_before(p, w);
                }
            }
        }
        list.erase_range(close, body);
        tok = Some(body);
    }
}

/// `int a, b = 3, c;` becomes three independent declarations. The
/// inserted semicolons carry the split flag so later passes can tell
/// them from source semicolons.
pub fn split_var_declarations(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        let at_start = list
            .prev(t)
            .map_or(true, |p| matches!(list.str(p), ";" | "{" | "}"));
        if !at_start {
            tok = list.next(t);
            continue;
        }
        // Collect type tokens.
        let mut type_tokens: Vec<TokenId> = Vec::new();
        let mut cur = Some(t);
        while let Some(c) = cur {
            let s = list.str(c);
            if matches!(s, "static" | "const" | "constexpr" | "volatile" | "unsigned" | "signed"
                | "struct" | "class" | "union" | "enum" | "register" | "extern" | "mutable")
                || (list.get(c).is_name()
                    && (list.get(c).kind != TokenKind::Keyword
                        || crate::token::is_type_keyword(s)))
            {
                type_tokens.push(c);
                cur = list.next(c);
                continue;
            }
            break;
        }
        if type_tokens.len() < 1 {
            tok = list.next(t);
            continue;
        }
        // The last collected token could be the first declarator name.
        let first_decl = match type_tokens.pop() {
            Some(d) if list.get(d).kind == TokenKind::Name => d,
            _ => {
                tok = list.next(t);
                continue;
            }
        };
        // Pointer declarators hang off the declarator, not the type.
        let mut decl_start = first_decl;
        while let Some(p) = list.prev(decl_start) {
            if matches!(list.str(p), "*" | "&") {
                if type_tokens.last() == Some(&p) {
                    type_tokens.pop();
                }
                decl_start = p;
            } else {
                break;
            }
        }
        if type_tokens.is_empty() {
            tok = list.next(t);
            continue;
        }
        // Find the statement end and the top-level commas.
        let mut commas: Vec<TokenId> = Vec::new();
        let mut end = None;
        let mut c = list.next(first_decl);
        while let Some(x) = c {
            match list.str(x) {
                ";" => {
                    end = Some(x);
                    break;
                }
                "," => {
                    commas.push(x);
                    c = list.next(x);
                }
                "(" | "[" | "{" => c = list.link_of(x).and_then(|l| list.next(l)),
                "=" | "*" | "&" => c = list.next(x),
                _ if list.get(x).is_name()
                    || list.get(x).is_literal()
                    || crate::token::is_operator_str(list.str(x)) =>
                {
                    c = list.next(x)
                }
                _ => break,
            }
        }
        if end.is_none() || commas.is_empty() {
            tok = list.next(t);
            continue;
        }
        // Guard against parameter lists and expressions: the first
        // declarator must look like a declaration.
        if !m.matches(list, list.next(first_decl), ";|,|=|[") {
            tok = list.next(t);
            continue;
        }
        let type_words: Vec<String> = type_tokens.iter().map(|&x| list.str(x).to_string()).collect();
        for comma in commas {
            list.set_str(comma, ";");
            list.get_mut(comma).flags.set_split_var_decl_comma(true);
            let mut anchor = comma;
            for w in &type_words {
                anchor = list.insert_after(anchor, w);
            }
        }
        tok = list.next(t);
    }
}

/// `int a ( 0 ) ;` becomes `int a ; a = 0 ;` — except const scalars,
/// which the known-value pass propagates better in the folded form.
pub fn split_ctor_initializers(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        let at_start = list
            .prev(t)
            .map_or(true, |p| matches!(list.str(p), ";" | "{" | "}"));
        let is_const = list.is(t, "const");
        if at_start
            && !is_const
            && m.matches(list, Some(t), "%type% %name% ( %num%|%str%|%bool%|%char% ) ;")
            && !list.is(t, "return")
        {
            let name = match list.at(t, 1) {
                Some(n) => n,
                None => break,
            };
            let value = match list.at(t, 3) {
                Some(v) => list.str(v).to_string(),
                None => break,
            };
            let close = match list.at(t, 4) {
                Some(c) => c,
                None => break,
            };
            let name_str = list.str(name).to_string();
            // The original trailing `;` survives as the end of the new
            // assignment statement.
            list.erase_range(name, list.next(close).unwrap_or(close));
            let semi = list.insert_after(name, ";");
            list.get_mut(semi).flags.set_split_var_decl_eq(true);
            let lhs = list.insert_after(semi, &name_str);
            let eq = list.insert_after(lhs, "=");
            list.insert_after(eq, &value);
            tok = list.next(t);
            continue;
        }
        tok = list.next(t);
    }
}

// ----------------------------------------------------------------------
// Group 5: expression normalization
// ----------------------------------------------------------------------

pub fn simplify_not_bool(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.is(t, "!") && m.matches(list, list.next(t), "%bool%") {
            let next = match list.next(t) {
                Some(n) => n,
                None => break,
            };
            let flipped = if list.is(next, "true") { "false" } else { "true" };
            list.erase(next);
            list.set_str(t, flipped);
        }
        tok = list.next(t);
    }
}

fn literal_truth(list: &TokenList, t: TokenId) -> Option<bool> {
    match list.get(t).kind {
        TokenKind::Boolean => Some(list.is(t, "true")),
        TokenKind::Number => {
            let s = list.str(t);
            let value = parse_int(s)?;
            Some(value != 0)
        }
        _ => None,
    }
}

pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()
    } else if s.len() > 1 && s.starts_with('0') && s.chars().all(|c| c.is_ascii_digit()) {
        i64::from_str_radix(&s[1..], 8).ok()
    } else {
        s.parse().ok()
    }
}

/// `if (true)`/`if (false)` with brace bodies: keep the live branch,
/// drop the dead one.
pub fn simplify_const_conditions(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if !list.is(t, "if") || !m.matches(list, list.next(t), "( %bool%|%num% ) {") {
            tok = list.next(t);
            continue;
        }
        let cond = match list.at(t, 2) {
            Some(c) => c,
            None => break,
        };
        let truth = match literal_truth(list, cond) {
            Some(v) => v,
            None => {
                tok = list.next(t);
                continue;
            }
        };
        let body_open = match list.at(t, 4) {
            Some(b) => b,
            None => break,
        };
        let body_close = match list.link_of(body_open) {
            Some(c) => c,
            None => {
                tok = list.next(t);
                continue;
            }
        };
        // Optional `else {...}` / `else if ...` tail.
        let else_tok = list.next(body_close).filter(|&e| list.is(e, "else"));

        if truth {
            // Drop `if ( cond )`, keep the braces; drop the else branch.
            if let Some(e) = else_tok {
                let else_end = else_branch_end(list, e);
                if let Some(end) = else_end {
                    let after = list.next(end);
                    let mut cur = Some(e);
                    while let Some(c) = cur {
                        if Some(c) == after {
                            break;
                        }
                        cur = list.erase(c);
                    }
                }
            }
            list.erase_range(t, body_open);
            let resume = list.erase(t);
            tok = resume;
            continue;
        }
        // False: drop `if (cond) { ... }`; promote an else body.
        match else_tok {
            Some(e) => {
                let mut cur = Some(t);
                while let Some(c) = cur {
                    if c == e {
                        break;
                    }
                    cur = list.erase(c);
                }
                let resume = list.erase(e);
                tok = resume;
            }
            None => {
                let after = list.next(body_close);
                let mut cur = Some(t);
                while let Some(c) = cur {
                    if Some(c) == after {
                        break;
                    }
                    cur = list.erase(c);
                }
                tok = after;
            }
        }
    }
}

fn else_branch_end(list: &TokenList, else_tok: TokenId) -> Option<TokenId> {
    let next = list.next(else_tok)?;
    if list.is(next, "{") {
        return list.link_of(next);
    }
    if list.is(next, "if") {
        // `else if ( ... ) { ... }` possibly chained.
        let open = list.next(next)?;
        let close = list.link_of(open)?;
        let body = list.next(close)?;
        if list.is(body, "{") {
            let body_close = list.link_of(body)?;
            return match list.next(body_close) {
                Some(e2) if list.is(e2, "else") => else_branch_end(list, e2),
                _ => Some(body_close),
            };
        }
    }
    // Single statement.
    let mut cur = Some(next);
    while let Some(c) = cur {
        if list.is(c, ";") {
            return Some(c);
        }
        cur = match list.str(c) {
            "(" | "[" | "{" => list.link_of(c).and_then(|l| list.next(l)),
            _ => list.next(c),
        };
    }
    None
}

/// Constant ternaries with simple branches: `true ? a : b` -> `a`.
pub fn simplify_const_ternary(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        let truth = match literal_truth(list, t) {
            Some(v) => v,
            None => {
                tok = list.next(t);
                continue;
            }
        };
        if !m.matches(list, list.next(t), "? %name%|%num%|%str%|%bool% : %name%|%num%|%str%|%bool%")
        {
            tok = list.next(t);
            continue;
        }
        // cond ? a : b
        let a = match list.at(t, 2) {
            Some(x) => x,
            None => break,
        };
        let keep = if truth {
            list.str(a).to_string()
        } else {
            match list.at(t, 4) {
                Some(b) => list.str(b).to_string(),
                None => break,
            }
        };
        list.erase_next(t, 5);
        list.set_str(t, &keep);
        tok = list.next(t);
    }
}

/// Fold literal integer arithmetic, higher precedence first.
pub fn simplify_calculations(list: &mut TokenList, m: &Matcher) {
    let op_tiers: [&[&str]; 5] = [
        &["*", "/", "%"],
        &["+", "-"],
        &["<<", ">>"],
        &["<", "<=", ">", ">=", "==", "!="],
        &["&", "^", "|"],
    ];
    let mut changed = true;
    while changed {
        changed = false;
        for tier in op_tiers {
            let mut tok = list.head();
            while let Some(t) = tok {
                if list.get(t).kind != TokenKind::Number
                    || !m.matches(list, list.next(t), "%op% %num%")
                {
                    tok = list.next(t);
                    continue;
                }
                let op_tok = match list.next(t) {
                    Some(o) => o,
                    None => break,
                };
                if !tier.contains(&list.str(op_tok)) {
                    tok = list.next(t);
                    continue;
                }
                // A name or closing bracket before means `t` is not the
                // left operand start; a higher-precedence op after the
                // right operand means it binds tighter.
                let left_blocked = list.prev(t).is_some_and(|p| {
                    list.get(p).is_name()
                        || matches!(list.str(p), ")" | "]")
                        || (list.get(p).kind == TokenKind::Number)
                });
                let rhs = match list.at(t, 2) {
                    Some(r) => r,
                    None => break,
                };
                let right_blocked = list.next(rhs).is_some_and(|n| {
                    let s = list.str(n);
                    op_tiers
                        .iter()
                        .position(|tier2| tier2.contains(&s))
                        .is_some_and(|tier_idx| {
                            op_tiers
                                .iter()
                                .position(|t2| t2.contains(&list.str(op_tok)))
                                .is_some_and(|own| tier_idx < own)
                        })
                });
                if left_blocked || right_blocked {
                    tok = list.next(t);
                    continue;
                }
                let (lhs_v, rhs_v) = match (parse_int(list.str(t)), parse_int(list.str(rhs))) {
                    (Some(a), Some(b)) => (a, b),
                    _ => {
                        tok = list.next(t);
                        continue;
                    }
                };
                let result = match list.str(op_tok) {
                    "*" => lhs_v.checked_mul(rhs_v),
                    "/" if rhs_v != 0 => Some(lhs_v / rhs_v),
                    "%" if rhs_v != 0 => Some(lhs_v % rhs_v),
                    "+" => lhs_v.checked_add(rhs_v),
                    "-" => lhs_v.checked_sub(rhs_v),
                    "<<" if (0..63).contains(&rhs_v) => lhs_v.checked_shl(rhs_v as u32),
                    ">>" if (0..63).contains(&rhs_v) => Some(lhs_v >> rhs_v),
                    "&" => Some(lhs_v & rhs_v),
                    "|" => Some(lhs_v | rhs_v),
                    "^" => Some(lhs_v ^ rhs_v),
                    "<" => Some((lhs_v < rhs_v) as i64),
                    "<=" => Some((lhs_v <= rhs_v) as i64),
                    ">" => Some((lhs_v > rhs_v) as i64),
                    ">=" => Some((lhs_v >= rhs_v) as i64),
                    "==" => Some((lhs_v == rhs_v) as i64),
                    "!=" => Some((lhs_v != rhs_v) as i64),
                    _ => None,
                };
                match result {
                    Some(v) => {
                        list.erase_next(t, 2);
                        list.set_str(t, &v.to_string());
                        changed = true;
                        tok = Some(t);
                    }
                    None => tok = list.next(t),
                }
            }
        }
    }
}

/// `a += b ;` becomes `a = a + ( b ) ;` (parens dropped for one-token
/// right sides). Calls on the right side may have side effects that
/// must not run twice if the left side repeats them, so those stay.
pub fn expand_compound_assignment(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if !m.matches(list, Some(t), "%assign%") || list.is(t, "=") {
            tok = list.next(t);
            continue;
        }
        // LHS: a name, optionally subscripted.
        let lhs_words: Vec<String> = match list.prev(t) {
            Some(p) if list.get(p).kind == TokenKind::Name => vec![list.str(p).to_string()],
            Some(p) if list.is(p, "]") => {
                let open = match list.link_of(p) {
                    Some(o) => o,
                    None => {
                        tok = list.next(t);
                        continue;
                    }
                };
                match list.prev(open) {
                    Some(base) if list.get(base).kind == TokenKind::Name => list
                        .iter_range(base, p)
                        .map(|x| list.str(x).to_string())
                        .collect(),
                    _ => {
                        tok = list.next(t);
                        continue;
                    }
                }
            }
            _ => {
                tok = list.next(t);
                continue;
            }
        };
        // Statement context only; `)` covers braceless loop and branch
        // bodies, which grow their braces one group later.
        let stmt_start = {
            let mut base = list.prev(t);
            for _ in 0..lhs_words.len() {
                base = base.and_then(|b| list.prev(b));
            }
            base.map_or(true, |b| matches!(list.str(b), ";" | "{" | "}" | ")"))
        };
        if !stmt_start {
            tok = list.next(t);
            continue;
        }
        // RHS up to `;`; skip if it contains a call.
        let mut rhs: Vec<TokenId> = Vec::new();
        let mut has_call = false;
        let mut cur = list.next(t);
        while let Some(c) = cur {
            if list.is(c, ";") {
                break;
            }
            if list.is(c, "(")
                && list.prev(c).is_some_and(|p| list.get(p).is_name())
            {
                has_call = true;
            }
            rhs.push(c);
            cur = list.next(c);
        }
        if rhs.is_empty() || has_call || cur.is_none() {
            tok = list.next(t);
            continue;
        }
        // Parentheses are needed only when the right side has a
        // top-level operator of its own.
        let needs_parens = {
            let mut depth = 0i32;
            let mut needed = false;
            for &c in &rhs {
                match list.str(c) {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth -= 1,
                    s if depth == 0
                        && (crate::token::is_const_op(s) || s == "?" || s == ":") =>
                    {
                        needed = true;
                    }
                    _ => {}
                }
            }
            needed
        };
        let semi = match cur {
            Some(s) => s,
            None => break,
        };
        let op = list.str(t).trim_end_matches('=').to_string();
        list.remember_original(t);
        list.set_str(t, "=");
        let mut anchor = t;
        for w in &lhs_words {
            anchor = list.insert_after(anchor, w);
        }
        anchor = list.insert_after(anchor, &op);
        if needs_parens {
            let open = list.insert_after(anchor, "(");
            let close = list.insert_before(semi, ")");
            list.get_mut(open).link = Some(close);
            list.get_mut(close).link = Some(open);
        }
        tok = Some(semi);
    }
}

// ----------------------------------------------------------------------
// Group 6: control flow
// ----------------------------------------------------------------------

/// End of the single statement starting at `t`, brace blocks and nested
/// control statements included.
fn skip_statement(list: &TokenList, t: TokenId) -> Option<TokenId> {
    match list.str(t) {
        "{" => list.link_of(t),
        "if" | "while" | "for" | "switch" => {
            let open = list.next(t)?;
            let close = list.link_of(open)?;
            let body = list.next(close)?;
            let body_end = skip_statement(list, body)?;
            // `if ... else ...`
            if list.is(t, "if") {
                if let Some(e) = list.next(body_end).filter(|&e| list.is(e, "else")) {
                    let else_body = list.next(e)?;
                    return skip_statement(list, else_body);
                }
            }
            Some(body_end)
        }
        "do" => {
            let body = list.next(t)?;
            let body_end = skip_statement(list, body)?;
            // `while ( ... ) ;`
            let w = list.next(body_end)?;
            if list.is(w, "while") {
                let open = list.next(w)?;
                let close = list.link_of(open)?;
                return list.next(close).filter(|&s| list.is(s, ";"));
            }
            None
        }
        _ => {
            let mut cur = Some(t);
            while let Some(c) = cur {
                match list.str(c) {
                    ";" => return Some(c),
                    "(" | "[" | "{" => cur = list.link_of(c).and_then(|l| list.next(l)),
                    "}" => return None,
                    _ => cur = list.next(c),
                }
            }
            None
        }
    }
}

/// Wrap single-statement bodies of `if`/`else`/`while`/`for`/`do` in
/// braces, and re-nest `else if` as `else { if ... }`.
pub fn add_braces(list: &mut TokenList) -> Result<(), InternalError> {
    let mut changed = true;
    let mut guard = 0;
    while changed {
        changed = false;
        guard += 1;
        if guard > 10_000 {
            return Err(InternalError::internal("brace insertion did not settle"));
        }
        let ids: Vec<TokenId> = list.iter().collect();
        for t in ids {
            match list.str(t) {
                "if" | "while" | "for" | "switch" => {
                    let open = match list.next(t) {
                        Some(o) if list.is(o, "(") => o,
                        _ => continue,
                    };
                    let close = match list.link_of(open) {
                        Some(c) => c,
                        None => continue,
                    };
                    let body = match list.next(close) {
                        Some(b) => b,
                        None => continue,
                    };
                    if list.is(body, "{") || list.is(body, ";") {
                        continue;
                    }
                    let end = match skip_statement(list, body) {
                        Some(e) => e,
                        None => continue,
                    };
                    let ob = list.insert_after(close, "{");
                    let cb = list.insert_after(end, "}");
                    list.get_mut(ob).link = Some(cb);
                    list.get_mut(cb).link = Some(ob);
                    changed = true;
                }
                "do" => {
                    let body = match list.next(t) {
                        Some(b) => b,
                        None => continue,
                    };
                    if list.is(body, "{") {
                        continue;
                    }
                    let end = match skip_statement(list, body) {
                        Some(e) => e,
                        None => continue,
                    };
                    let ob = list.insert_after(t, "{");
                    let cb = list.insert_after(end, "}");
                    list.get_mut(ob).link = Some(cb);
                    list.get_mut(cb).link = Some(ob);
                    changed = true;
                }
                "else" => {
                    let body = match list.next(t) {
                        Some(b) => b,
                        None => continue,
                    };
                    if list.is(body, "{") {
                        continue;
                    }
                    // `else if` re-nests as `else { if ... }`.
                    let end = match skip_statement(list, body) {
                        Some(e) => e,
                        None => continue,
                    };
                    let ob = list.insert_after(t, "{");
                    let cb = list.insert_after(end, "}");
                    list.get_mut(ob).link = Some(cb);
                    list.get_mut(cb).link = Some(ob);
                    changed = true;
                }
                _ => {}
            }
            if changed {
                break;
            }
        }
    }
    Ok(())
}

/// Pull `if (init; cond)` / `for (TYPE x = e; ...)` initializers into an
/// enclosing block above the statement.
pub fn extract_condition_init(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        // for ( TYPE name = expr ; ... -> { TYPE name ; for ( name = expr ; ...
        if list.is(t, "for") && m.matches(list, list.next(t), "( %type%") {
            let open = match list.next(t) {
                Some(o) => o,
                None => break,
            };
            // TYPE... name = — collect type tokens up to name.
            let mut type_words: Vec<String> = Vec::new();
            let mut cur = list.next(open);
            let mut name = None;
            while let Some(c) = cur {
                if list.get(c).is_name() && m.matches(list, list.next(c), "=") {
                    name = Some(c);
                    break;
                }
                if list.get(c).is_name() || matches!(list.str(c), "*" | "&" | "::") {
                    type_words.push(list.str(c).to_string());
                    cur = list.next(c);
                    continue;
                }
                break;
            }
            let name = match name {
                Some(n) if !type_words.is_empty() => n,
                _ => {
                    tok = list.next(t);
                    continue;
                }
            };
            let var_id = list.get(name).var_id;
            let name_str = list.str(name).to_string();
            // Wrap the whole loop in an outer block carrying the
            // declaration.
            let stmt_end = match skip_statement(list, t) {
                Some(e) => e,
                None => {
                    tok = list.next(t);
                    continue;
                }
            };
            let ob = list.insert_before(t, "{");
            let mut anchor = ob;
            for w in &type_words {
                anchor = list.insert_after(anchor, w);
            }
            let decl_name = list.insert_after(anchor, &name_str);
            list.get_mut(decl_name).var_id = var_id;
            let semi = list.insert_after(decl_name, ";");
            list.get_mut(semi).flags.set_split_var_decl_eq(true);
            let cb = list.insert_after(stmt_end, "}");
            list.get_mut(ob).link = Some(cb);
            list.get_mut(cb).link = Some(ob);
            // Drop the type tokens inside the header, keeping `name = ...`.
            list.erase_range(open, name);
            tok = list.next(cb);
            continue;
        }
        // if ( init ; cond ) -> { init ; if ( cond ) ... }
        if list.is(t, "if") && m.simple(list, list.next(t), "(") {
            let open = match list.next(t) {
                Some(o) => o,
                None => break,
            };
            let close = match list.link_of(open) {
                Some(c) => c,
                None => {
                    tok = list.next(t);
                    continue;
                }
            };
            // A top-level `;` inside the condition marks an init clause.
            let mut semi = None;
            let mut c = list.next(open);
            while let Some(x) = c {
                if x == close {
                    break;
                }
                match list.str(x) {
                    ";" => {
                        semi = Some(x);
                        break;
                    }
                    "(" | "[" | "{" => c = list.link_of(x).and_then(|l| list.next(l)),
                    _ => c = list.next(x),
                }
            }
            let semi = match semi {
                Some(s) => s,
                None => {
                    tok = list.next(t);
                    continue;
                }
            };
            let stmt_end = match skip_statement(list, t) {
                Some(e) => e,
                None => {
                    tok = list.next(t);
                    continue;
                }
            };
            let ob = list.insert_before(t, "{");
            // Move `init ;` out of the parens, before the if.
            let init_first = match list.next(open) {
                Some(f) if f != semi => f,
                _ => {
                    // Empty init: just drop the semicolon.
                    list.erase(semi);
                    list.erase(ob);
                    tok = list.next(t);
                    continue;
                }
            };
            list.splice_after(ob, init_first, semi);
            let cb = list.insert_after(stmt_end, "}");
            list.get_mut(ob).link = Some(cb);
            list.get_mut(cb).link = Some(ob);
            tok = list.next(cb);
            continue;
        }
        tok = list.next(t);
    }
}

/// `while (var = expr)` gains an inner pair of parentheses to mark the
/// assignment-as-condition as intentional.
pub fn parenthesize_assignment_conditions(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if matches!(list.str(t), "while" | "if") && m.matches(list, list.next(t), "( %name% =")
        {
            let open = match list.next(t) {
                Some(o) => o,
                None => break,
            };
            let close = match list.link_of(open) {
                Some(c) => c,
                None => {
                    tok = list.next(t);
                    continue;
                }
            };
            // Already double-parenthesized?
            if list.next(open).is_some_and(|n| list.is(n, "(")) {
                tok = list.next(t);
                continue;
            }
            let inner_open = list.insert_after(open, "(");
            let inner_close = list.insert_before(close, ")");
            list.get_mut(inner_open).link = Some(inner_close);
            list.get_mut(inner_close).link = Some(inner_open);
        }
        tok = list.next(t);
    }
}

// ----------------------------------------------------------------------
// Group 7: dead code after flow control
// ----------------------------------------------------------------------

/// After `return`/`break`/`continue`/`throw`/`goto`/a noreturn call at
/// statement level, erase up to the next label or the closing brace.
pub fn eliminate_dead_code(list: &mut TokenList, m: &Matcher, settings: &Settings) {
    let mut tok = list.head();
    while let Some(t) = tok {
        let at_start = list
            .prev(t)
            .map_or(false, |p| matches!(list.str(p), ";" | "{" | "}"));
        let noreturn_call = at_start
            && list.get(t).kind == TokenKind::Name
            && settings.library.is_noreturn(list.str(t))
            && list
                .next(t)
                .filter(|&n| list.is(n, "("))
                .and_then(|n| list.link_of(n))
                .and_then(|close| list.next(close))
                .is_some_and(|s| list.is(s, ";"));
        let jumps = matches!(list.str(t), "return" | "break" | "continue" | "throw" | "goto")
            || noreturn_call;
        if !jumps || !at_start {
            tok = list.next(t);
            continue;
        }
        let semi = match skip_statement(list, t) {
            Some(s) if list.is(s, ";") => s,
            _ => {
                tok = list.next(t);
                continue;
            }
        };
        // Erase until a label, `case`/`default`, or the scope's `}`.
        let mut cur = list.next(semi);
        while let Some(c) = cur {
            if list.is(c, "}") || matches!(list.str(c), "case" | "default") {
                break;
            }
            if list.get(c).kind == TokenKind::Name && m.matches(list, list.next(c), ":") {
                break;
            }
            if list.is(c, "{") {
                match list.link_of(c) {
                    Some(close) => {
                        // A label inside keeps the block alive.
                        let has_label = list.iter_range(c, close).any(|x| {
                            matches!(list.str(x), "case" | "default")
                                || (list.get(x).kind == TokenKind::Name
                                    && m.matches(list, list.next(x), ":"))
                        });
                        if has_label {
                            break;
                        }
                        let after = list.next(close);
                        let mut e = Some(c);
                        while let Some(x) = e {
                            if Some(x) == after {
                                break;
                            }
                            e = list.erase(x);
                        }
                        cur = after;
                        continue;
                    }
                    None => break,
                }
            }
            cur = list.erase(c);
        }
        tok = list.next(semi);
    }
}

// ----------------------------------------------------------------------
// Group 8: known-value propagation
// ----------------------------------------------------------------------

/// Within one function body, a variable assigned a literal exactly once
/// and never address-taken or mutated again has that literal substituted
/// at every later use.
pub fn propagate_known_values(list: &mut TokenList, m: &Matcher) {
    // Function bodies: `) {` pairs.
    let bodies: Vec<(TokenId, TokenId)> = {
        let mut v = Vec::new();
        let mut tok = list.head();
        while let Some(t) = tok {
            if list.is(t, "{")
                && list.prev(t).is_some_and(|p| list.is(p, ")"))
                && list
                    .prev(t)
                    .and_then(|p| list.link_of(p))
                    .and_then(|o| list.prev(o))
                    .is_some_and(|f| list.get(f).kind == TokenKind::Name)
            {
                if let Some(close) = list.link_of(t) {
                    v.push((t, close));
                    tok = list.next(t);
                    continue;
                }
            }
            tok = list.next(t);
        }
        v
    };

    for (open, close) in bodies {
        // Candidate: first `x = LIT ;` per var id.
        let ids: Vec<TokenId> = list.iter_range(open, close).collect();
        let mut candidates: Vec<(u32, TokenId, String)> = Vec::new();
        for &t in &ids {
            let var_id = list.get(t).var_id;
            if var_id == 0 || list.get(t).kind != TokenKind::Name {
                continue;
            }
            let stmt_pos = list
                .prev(t)
                .is_some_and(|p| matches!(list.str(p), ";" | "{" | "}"));
            if stmt_pos && m.matches(list, list.next(t), "= %num%|%bool%|%char% ;") {
                if !candidates.iter().any(|(id, _, _)| *id == var_id) {
                    let lit = match list.at(t, 2) {
                        Some(l) => list.str(l).to_string(),
                        None => continue,
                    };
                    candidates.push((var_id, t, lit));
                }
            }
        }
        for (var_id, assign_tok, lit) in candidates {
            // Disqualify on reassignment, address-taking, or mutation.
            let mut safe = true;
            for &t in &ids {
                if list.get(t).var_id != var_id || t == assign_tok {
                    continue;
                }
                if m.matches_varid(list, Some(t), "%varid% =|++|--|[", var_id)
                    || m.matches_varid(list, Some(t), "%varid% %assign%", var_id)
                    || list.prev(t).is_some_and(|p| matches!(list.str(p), "&" | "++" | "--"))
                {
                    safe = false;
                    break;
                }
            }
            if !safe {
                continue;
            }
            // Substitute uses after the assignment.
            let mut cur = list.next(assign_tok);
            // Skip the `= LIT ;` itself.
            for _ in 0..3 {
                cur = cur.and_then(|c| list.next(c));
            }
            while let Some(t) = cur {
                if t == close {
                    break;
                }
                if list.get(t).var_id == var_id && list.get(t).kind == TokenKind::Name {
                    list.remember_original(t);
                    list.set_str(t, &lit);
                    list.get_mut(t).var_id = 0;
                }
                cur = list.next(t);
            }
        }
    }
}

// ----------------------------------------------------------------------
// Second-phase rewrites (driver `simplify_tokens2`)
// ----------------------------------------------------------------------

/// `( TYPE )` / `( TYPE * )` before an operand is a cast; flag it, and
/// in the aggressive phase drop value-preserving ones.
pub fn mark_casts(list: &mut TokenList, m: &Matcher) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.is(t, "(")
            && (m.matches(list, list.next(t), "%type% )")
                || m.matches(list, list.next(t), "%type% * )")
                || m.matches(list, list.next(t), "const %type% )")
                || m.matches(list, list.next(t), "const %type% * )"))
        {
            if let Some(close) = list.link_of(t) {
                let operand = list.next(close).is_some_and(|n| {
                    list.get(n).is_name()
                        || list.get(n).is_literal()
                        || matches!(list.str(n), "(" | "&" | "*" | "-" | "+" | "~" | "!")
                });
                // `f ( int )` is a declaration parameter, not a cast.
                let call_like = list
                    .prev(t)
                    .is_some_and(|p| list.get(p).is_name() || matches!(list.str(p), ")" | "]"));
                if operand && !call_like {
                    list.get_mut(t).flags.set_cast(true);
                }
            }
        }
        tok = list.next(t);
    }
}

/// Remove flagged casts entirely (aggressive phase).
pub fn remove_casts(list: &mut TokenList) {
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.is(t, "(") && list.get(t).flags.is_cast() {
            if let Some(close) = list.link_of(t) {
                let after = list.next(close);
                let mut cur = Some(t);
                while let Some(c) = cur {
                    if Some(c) == after {
                        break;
                    }
                    cur = list.erase(c);
                }
                tok = after;
                continue;
            }
        }
        tok = list.next(t);
    }
}

/// `p -> m` reads as `p . m` with the original spelling kept for
/// diagnostics (aggressive phase).
pub fn arrow_to_dot(list: &mut TokenList) {
    let ids: Vec<TokenId> = list.iter().collect();
    for t in ids {
        if list.is(t, "->") {
            list.remember_original(t);
            list.set_str(t, ".");
        }
    }
}

// ----------------------------------------------------------------------
// Portability diagnostics recovered alongside the rewrites
// ----------------------------------------------------------------------

/// Multi-character literals are implementation-defined; escape forms the
/// tokenizer cannot evaluate are reported too.
pub fn check_char_literals(list: &TokenList, rep: &mut Reporter<'_>) {
    for t in list.iter() {
        if list.get(t).kind != TokenKind::Char {
            continue;
        }
        let s = list.str(t);
        let inner = &s[s.find('\'').map(|i| i + 1).unwrap_or(0)..s.len().saturating_sub(1)];
        let chars: Vec<char> = inner.chars().collect();
        let logical_len = if chars.first() == Some(&'\\') {
            1
        } else {
            chars.len()
        };
        if logical_len > 1 {
            rep.portability(
                "nonStandardCharLiteral",
                format!("multi-character character literal {}", s),
                Some(list.location(t)),
            );
        } else if chars.first() == Some(&'\\')
            && !matches!(
                chars.get(1).copied(),
                Some('n' | 't' | 'r' | '\\' | '\'' | '"' | 'a' | 'b' | 'f' | 'v' | 'x')
                    | Some('0'..='7')
            )
        {
            rep.portability(
                "unhandledCharLiteral",
                format!("unhandled character literal {}", s),
                Some(list.location(t)),
            );
        }
    }
}

/// `class EXPORT X { ... }` — two names between the class keyword and
/// the body usually mean an unconfigured export/attribute macro.
pub fn check_class_macros(list: &TokenList, m: &Matcher, rep: &mut Reporter<'_>) {
    for t in list.iter() {
        if !matches!(list.str(t), "class" | "struct") {
            continue;
        }
        if !m.matches(list, list.next(t), "%name% %name% {|:") {
            continue;
        }
        let first = match list.next(t) {
            Some(f) => f,
            None => continue,
        };
        let second = match list.next(first) {
            Some(s) => s,
            None => continue,
        };
        let mut msg = crate::error::ErrorMessage::new(
            Severity::Information,
            &format!("class_{}_{}", list.str(first), list.str(second)),
            format!(
                "unknown macro {} in the declaration of {} {}",
                list.str(first),
                list.str(t),
                list.str(second)
            ),
        );
        msg.locations.push(list.location(first));
        rep.report(msg);
    }
}

/// `MACRO ( ... ) ;` at file scope whose name is unconfigured: the
/// trailing semicolon usually means a macro definition is missing it.
pub fn check_macro_with_semicolon(list: &TokenList, m: &Matcher, rep: &mut Reporter<'_>) {
    let mut depth = 0i32;
    for t in list.iter() {
        match list.str(t) {
            "{" => depth += 1,
            "}" => depth -= 1,
            _ => {}
        }
        if depth == 0
            && list.get(t).kind == TokenKind::Name
            && list.str(t).chars().all(|c| c.is_ascii_uppercase() || c == '_')
            && list.str(t).len() >= 2
            && m.matches(list, list.next(t), "( ) ;")
            && list
                .prev(t)
                .map_or(true, |p| matches!(list.str(p), ";" | "}"))
        {
            let mut msg = crate::error::ErrorMessage::new(
                Severity::Information,
                "macroWithSemicolon",
                format!("the macro call {} ( ) ends with a semicolon at file scope", list.str(t)),
            );
            msg.locations.push(list.location(t));
            rep.report(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NullLogger;
    use crate::linker;
    use crate::settings::Language;

    fn prepared(code: &str, lang: Language) -> (TokenList, Matcher) {
        let mut list = TokenList::new(lang);
        list.create_tokens(code, "test.cpp").unwrap();
        linker::create_links(&mut list).unwrap();
        (list, Matcher::new())
    }

    fn cpp(code: &str) -> (TokenList, Matcher) {
        prepared(code, Language::Cpp)
    }

    #[test]
    fn pragma_operator_is_removed() {
        let (mut list, _) = cpp("_Pragma ( \"once\" ) int x ;");
        simplify_pragmas(&mut list);
        assert_eq!(list.stringify(), "int x ;");
    }

    #[test]
    fn extern_c_block_is_unwrapped_and_flagged() {
        let (mut list, m) = cpp("extern \"C\" { void f ( ) ; } int x ;");
        simplify_extern_c(&mut list, &m);
        assert_eq!(list.stringify(), "void f ( ) ; int x ;");
        let f = list.iter().find(|&t| list.is(t, "f")).unwrap();
        assert!(list.get(f).flags.is_extern_c());
        let x = list.iter().find(|&t| list.is(t, "x")).unwrap();
        assert!(!list.get(x).flags.is_extern_c());
    }

    #[test]
    fn gnu_attribute_is_parsed_and_stripped() {
        let (mut list, m) = cpp("void f ( ) __attribute__ ( ( noreturn , unused ) ) ;");
        simplify_attributes(&mut list, &m);
        assert_eq!(list.stringify(), "void f ( ) ;");
        let f = list.iter().find(|&t| list.is(t, "f")).unwrap();
        assert!(list.get(f).flags.is_attr_noreturn());
        assert!(list.get(f).flags.is_attr_unused());
    }

    #[test]
    fn cpp_attribute_is_parsed_and_stripped() {
        let (mut list, m) = cpp("[ [ nodiscard ] ] int g ( ) ;");
        simplify_attributes(&mut list, &m);
        assert_eq!(list.stringify(), "int g ( ) ;");
        let g = list.iter().find(|&t| list.is(t, "g")).unwrap();
        assert!(list.get(g).flags.is_attr_nodiscard());
    }

    #[test]
    fn subscripts_are_not_mistaken_for_attributes() {
        let (mut list, m) = cpp("x = a [ b [ 0 ] ] ;");
        simplify_attributes(&mut list, &m);
        assert_eq!(list.stringify(), "x = a [ b [ 0 ] ] ;");
    }

    #[test]
    fn calling_conventions_are_dropped() {
        let (mut list, _) = cpp("int __stdcall f ( ) ; int WINAPI g ( ) ;");
        simplify_calling_conventions(&mut list);
        assert_eq!(list.stringify(), "int f ( ) ; int g ( ) ;");
    }

    #[test]
    fn qt_sections_become_access_specifiers() {
        let (mut list, m) = cpp("class A { signals : void s ( ) ; slots : void t ( ) ; } ;");
        simplify_qt_and_borland(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "class A { protected : void s ( ) ; public : void t ( ) ; } ;"
        );
    }

    #[test]
    fn split_operator_pairs_are_fused() {
        use crate::tokenlist::RawToken;
        let mut list = TokenList::new(Language::C);
        let file = list.add_file("pre.c");
        let toks = [("a", 1), ("+", 3), ("=", 4), ("1", 6), (";", 7)];
        list.append_pretokenized(toks.iter().map(|&(lexeme, column)| RawToken {
            lexeme,
            file_index: file,
            line: 1,
            column,
            expanded_macro: false,
        }));
        combine_operators(&mut list);
        assert_eq!(list.stringify(), "a += 1 ;");
    }

    #[test]
    fn adjacent_strings_concatenate() {
        let (mut list, _) = cpp("const char * s = \"ab\" \"cd\" ;");
        combine_operators(&mut list);
        assert_eq!(list.stringify(), "const char * s = \"abcd\" ;");
    }

    #[test]
    fn negative_literal_fuses_after_comma() {
        let (mut list, _) = cpp("f ( x , - 3 ) ; y = a - 3 ;");
        concatenate_negative_numbers(&mut list);
        assert_eq!(list.stringify(), "f ( x , -3 ) ; y = a - 3 ;");
    }

    #[test]
    fn alternative_tokens_in_cpp() {
        let (mut list, m) = cpp("if ( a and b or not c ) { }");
        simplify_alternative_tokens(&mut list, &m);
        assert_eq!(list.stringify(), "if ( a && b || ! c ) { }");
        let amp = list.iter().find(|&t| list.is(t, "&&")).unwrap();
        assert!(list.get(amp).flags.is_operator_keyword());
        assert_eq!(list.resolve(list.get(amp).original_sym.unwrap()), "and");
    }

    #[test]
    fn alternative_tokens_left_alone_when_c_uses_them_as_names() {
        let (mut list, m) = prepared("int and = 1 ; x = and + 2 ;", Language::C);
        simplify_alternative_tokens(&mut list, &m);
        assert_eq!(list.stringify(), "int and = 1 ; x = and + 2 ;");
    }

    #[test]
    fn statement_expression_wrappers_vanish() {
        let (mut list, m) = cpp("x = ( { f ( ) ; 1 ; } ) ;");
        simplify_statement_expressions(&mut list, &m);
        assert_eq!(list.stringify(), "x = f ( ) ; 1 ; ;");
    }

    #[test]
    fn case_ranges_expand() {
        let (mut list, m) = cpp("switch ( x ) { case 1 ... 3 : g ( ) ; break ; }");
        simplify_case_ranges(&mut list, &m, &Settings::default());
        assert_eq!(
            list.stringify(),
            "switch ( x ) { case 1 : case 2 : case 3 : g ( ) ; break ; }"
        );
    }

    #[test]
    fn case_ranges_beyond_the_cap_stay() {
        let (mut list, m) = cpp("switch ( x ) { case 1 ... 500 : break ; }");
        simplify_case_ranges(&mut list, &m, &Settings::default());
        assert_eq!(list.stringify(), "switch ( x ) { case 1 ... 500 : break ; }");
    }

    #[test]
    fn reversed_subscript_is_canonicalized() {
        let (mut list, m) = cpp("y = 0 [ a ] ;");
        simplify_commutative_subscript(&mut list, &m);
        assert_eq!(list.stringify(), "y = a [ 0 ] ;");
    }

    #[test]
    fn string_subscript_folds_to_char() {
        let (mut list, m) = cpp("c = \"abc\" [ 1 ] ;");
        simplify_pointer_sugar(&mut list, &m);
        assert_eq!(list.stringify(), "c = 'b' ;");
    }

    #[test]
    fn deref_of_pointer_sum_becomes_subscript() {
        let (mut list, m) = cpp("v = * ( p + 2 ) ;");
        simplify_pointer_sugar(&mut list, &m);
        assert_eq!(list.stringify(), "v = p [ 2 ] ;");
    }

    #[test]
    fn address_of_element_becomes_pointer_sum() {
        let (mut list, m) = cpp("q = & buf [ 4 ] ;");
        simplify_pointer_sugar(&mut list, &m);
        assert_eq!(list.stringify(), "q = ( buf + 4 ) ;");
    }

    #[test]
    fn multiplication_is_not_rewritten() {
        let (mut list, m) = cpp("v = n * ( p + 2 ) ;");
        simplify_pointer_sugar(&mut list, &m);
        assert_eq!(list.stringify(), "v = n * ( p + 2 ) ;");
    }

    #[test]
    fn static_const_order_is_canonical() {
        let (mut list, m) = cpp("const static int x = 1 ; int const y = 2 ;");
        simplify_static_const(&mut list, &m);
        assert_eq!(list.stringify(), "static const int x = 1 ; const int y = 2 ;");
    }

    #[test]
    fn knr_parameters_modernize() {
        let (mut list, m) = cpp("int f ( a , b ) int a ; char b ; { return a ; }");
        simplify_knr_parameters(&mut list, &m);
        assert_eq!(list.stringify(), "int f ( int a , char b ) { return a ; }");
    }

    #[test]
    fn declarations_split_at_commas() {
        let (mut list, m) = cpp("int a = 3 , * b = & a , c [ 4 ] ;");
        split_var_declarations(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "int a = 3 ; int * b = & a ; int c [ 4 ] ;"
        );
        let split_semi = list
            .iter()
            .filter(|&t| list.is(t, ";"))
            .find(|&t| list.get(t).flags.is_split_var_decl_comma());
        assert!(split_semi.is_some());
    }

    #[test]
    fn function_calls_are_not_split() {
        let (mut list, m) = cpp("f ( a , b ) ;");
        split_var_declarations(&mut list, &m);
        assert_eq!(list.stringify(), "f ( a , b ) ;");
    }

    #[test]
    fn ctor_initializer_splits() {
        let (mut list, m) = cpp("void f ( ) { int a ( 0 ) ; }");
        split_ctor_initializers(&mut list, &m);
        assert_eq!(list.stringify(), "void f ( ) { int a ; a = 0 ; }");
    }

    #[test]
    fn const_ctor_initializer_is_kept() {
        let (mut list, m) = cpp("void f ( ) { const int a ( 0 ) ; }");
        split_ctor_initializers(&mut list, &m);
        assert_eq!(list.stringify(), "void f ( ) { const int a ( 0 ) ; }");
    }

    #[test]
    fn negated_booleans_fold() {
        let (mut list, m) = cpp("b = ! true ; c = ! false ;");
        simplify_not_bool(&mut list, &m);
        assert_eq!(list.stringify(), "b = false ; c = true ;");
    }

    #[test]
    fn true_branch_is_kept_else_dropped() {
        let (mut list, m) = cpp("void h ( ) { if ( 1 ) { f ( ) ; } else { g ( ) ; } }");
        simplify_const_conditions(&mut list, &m);
        assert_eq!(list.stringify(), "void h ( ) { { f ( ) ; } }");
    }

    #[test]
    fn false_branch_promotes_the_else() {
        let (mut list, m) = cpp("void h ( ) { if ( 0 ) { f ( ) ; } else { g ( ) ; } }");
        simplify_const_conditions(&mut list, &m);
        assert_eq!(list.stringify(), "void h ( ) { { g ( ) ; } }");
    }

    #[test]
    fn false_without_else_vanishes() {
        let (mut list, m) = cpp("void h ( ) { if ( false ) { f ( ) ; } g ( ) ; }");
        simplify_const_conditions(&mut list, &m);
        assert_eq!(list.stringify(), "void h ( ) { g ( ) ; }");
    }

    #[test]
    fn const_ternary_selects_a_branch() {
        let (mut list, m) = cpp("x = true ? a : b ; y = 0 ? c : d ;");
        simplify_const_ternary(&mut list, &m);
        assert_eq!(list.stringify(), "x = a ; y = d ;");
    }

    #[test]
    fn literal_arithmetic_folds_with_precedence() {
        let (mut list, m) = cpp("x = 1 + 2 * 3 ; y = 10 - 4 - 3 ; z = 1 << 4 ;");
        simplify_calculations(&mut list, &m);
        assert_eq!(list.stringify(), "x = 7 ; y = 3 ; z = 16 ;");
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        let (mut list, m) = cpp("x = 1 / 0 ;");
        simplify_calculations(&mut list, &m);
        assert_eq!(list.stringify(), "x = 1 / 0 ;");
    }

    #[test]
    fn compound_assignment_expands() {
        let (mut list, m) = cpp("sum += a [ i ] ; x *= y + z ;");
        expand_compound_assignment(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "sum = sum + a [ i ] ; x = x * ( y + z ) ;"
        );
    }

    #[test]
    fn compound_assignment_with_call_is_kept() {
        let (mut list, m) = cpp("x += f ( ) ;");
        expand_compound_assignment(&mut list, &m);
        assert_eq!(list.stringify(), "x += f ( ) ;");
    }

    #[test]
    fn braces_are_added_around_single_statements() {
        let (mut list, _) = cpp("void f ( ) { if ( a ) g ( ) ; while ( b ) h ( ) ; }");
        add_braces(&mut list).unwrap();
        assert_eq!(
            list.stringify(),
            "void f ( ) { if ( a ) { g ( ) ; } while ( b ) { h ( ) ; } }"
        );
    }

    #[test]
    fn else_if_re_nests() {
        let (mut list, _) = cpp("void f ( ) { if ( a ) { } else if ( b ) { } }");
        add_braces(&mut list).unwrap();
        assert_eq!(
            list.stringify(),
            "void f ( ) { if ( a ) { } else { if ( b ) { } } }"
        );
    }

    #[test]
    fn for_init_declaration_is_pulled_out() {
        let (mut list, m) = cpp("void f ( ) { for ( int i = 0 ; i < N ; ++ i ) { s ( ) ; } }");
        extract_condition_init(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "void f ( ) { { int i ; for ( i = 0 ; i < N ; ++ i ) { s ( ) ; } } }"
        );
    }

    #[test]
    fn if_init_is_pulled_out() {
        let (mut list, m) = cpp("void f ( ) { if ( x = g ( ) ; x ) { use ( x ) ; } }");
        extract_condition_init(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "void f ( ) { { x = g ( ) ; if ( x ) { use ( x ) ; } } }"
        );
    }

    #[test]
    fn assignment_conditions_gain_parentheses() {
        let (mut list, m) = cpp("void f ( ) { while ( c = next ( ) ) { } }");
        parenthesize_assignment_conditions(&mut list, &m);
        assert_eq!(list.stringify(), "void f ( ) { while ( ( c = next ( ) ) ) { } }");
    }

    #[test]
    fn code_after_return_is_erased() {
        let (mut list, m) = cpp("int f ( ) { return 1 ; x = 2 ; y = 3 ; }");
        eliminate_dead_code(&mut list, &m, &Settings::default());
        assert_eq!(list.stringify(), "int f ( ) { return 1 ; }");
    }

    #[test]
    fn labels_stop_dead_code_elimination() {
        let (mut list, m) = cpp("int f ( ) { goto out ; x = 2 ; out : return 1 ; }");
        eliminate_dead_code(&mut list, &m, &Settings::default());
        assert_eq!(list.stringify(), "int f ( ) { goto out ; out : return 1 ; }");
    }

    #[test]
    fn case_labels_survive_dead_code_elimination() {
        let (mut list, m) =
            cpp("void f ( ) { switch ( x ) { case 1 : break ; case 2 : g ( ) ; } }");
        eliminate_dead_code(&mut list, &m, &Settings::default());
        assert_eq!(
            list.stringify(),
            "void f ( ) { switch ( x ) { case 1 : break ; case 2 : g ( ) ; } }"
        );
    }

    #[test]
    fn known_value_propagates() {
        let (mut list, m) = cpp("void f ( ) { int n ; n = 3 ; g ( n ) ; h ( n + 1 ) ; }");
        crate::varid::set_var_ids(&mut list, &m).unwrap();
        propagate_known_values(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "void f ( ) { int n ; n = 3 ; g ( 3 ) ; h ( 3 + 1 ) ; }"
        );
    }

    #[test]
    fn reassigned_values_do_not_propagate() {
        let (mut list, m) = cpp("void f ( ) { int n ; n = 3 ; g ( n ) ; n = 4 ; h ( n ) ; }");
        crate::varid::set_var_ids(&mut list, &m).unwrap();
        propagate_known_values(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "void f ( ) { int n ; n = 3 ; g ( n ) ; n = 4 ; h ( n ) ; }"
        );
    }

    #[test]
    fn address_taken_values_do_not_propagate() {
        let (mut list, m) = cpp("void f ( ) { int n ; n = 3 ; p = & n ; g ( n ) ; }");
        crate::varid::set_var_ids(&mut list, &m).unwrap();
        propagate_known_values(&mut list, &m);
        assert_eq!(
            list.stringify(),
            "void f ( ) { int n ; n = 3 ; p = & n ; g ( n ) ; }"
        );
    }

    #[test]
    fn casts_are_flagged_and_removable() {
        let (mut list, m) = cpp("x = ( int ) y ; f ( ( char * ) p ) ;");
        mark_casts(&mut list, &m);
        let opens: Vec<bool> = list
            .iter()
            .filter(|&t| list.is(t, "("))
            .map(|t| list.get(t).flags.is_cast())
            .collect();
        assert_eq!(opens, [true, false, true]);
        remove_casts(&mut list);
        assert_eq!(list.stringify(), "x = y ; f ( p ) ;");
    }

    #[test]
    fn arrow_becomes_dot_with_original_name() {
        let (mut list, _) = cpp("p -> m = 1 ;");
        arrow_to_dot(&mut list);
        assert_eq!(list.stringify(), "p . m = 1 ;");
        let dot = list.iter().find(|&t| list.is(t, ".")).unwrap();
        assert_eq!(list.resolve(list.get(dot).original_sym.unwrap()), "->");
    }

    #[test]
    fn multichar_literal_is_reported() {
        use crate::error::{ErrorLogger, ErrorMessage};
        struct Collect(Vec<ErrorMessage>);
        impl ErrorLogger for Collect {
            fn report(&mut self, msg: &ErrorMessage) {
                self.0.push(msg.clone());
            }
        }
        let (list, _) = cpp("int c = 'ab' ;");
        let mut logger = Collect(Vec::new());
        let mut rep = Reporter::new(&mut logger, false);
        check_char_literals(&list, &mut rep);
        assert_eq!(logger.0.len(), 1);
        assert_eq!(logger.0[0].id, "nonStandardCharLiteral");
        assert_eq!(logger.0[0].severity, Severity::Portability);
    }

    #[test]
    fn class_declaration_macro_is_reported() {
        use crate::error::{ErrorLogger, ErrorMessage};
        struct Collect(Vec<ErrorMessage>);
        impl ErrorLogger for Collect {
            fn report(&mut self, msg: &ErrorMessage) {
                self.0.push(msg.clone());
            }
        }
        let (list, m) = cpp("class EXPORT Widget { } ;");
        let mut logger = Collect(Vec::new());
        let mut rep = Reporter::new(&mut logger, false);
        check_class_macros(&list, &m, &mut rep);
        assert_eq!(logger.0.len(), 1);
        assert_eq!(logger.0[0].id, "class_EXPORT_Widget");

        let (list, m) = cpp("class Plain { } ; class D : public B { } ;");
        let mut logger = Collect(Vec::new());
        let mut rep = Reporter::new(&mut logger, false);
        check_class_macros(&list, &m, &mut rep);
        assert!(logger.0.is_empty());
    }

    #[test]
    fn macro_with_semicolon_is_reported() {
        use crate::error::{ErrorLogger, ErrorMessage};
        struct Collect(Vec<ErrorMessage>);
        impl ErrorLogger for Collect {
            fn report(&mut self, msg: &ErrorMessage) {
                self.0.push(msg.clone());
            }
        }
        let (list, m) = cpp("MODULE_INIT ( ) ;");
        let mut logger = Collect(Vec::new());
        let mut rep = Reporter::new(&mut logger, false);
        check_macro_with_semicolon(&list, &m, &mut rep);
        assert!(logger.0.iter().any(|e| e.id == "macroWithSemicolon"));
        let _ = NullLogger;
    }
}
