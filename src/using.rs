use crate::error::{InternalError, Reporter};
use crate::matcher::Matcher;
use crate::token::TokenKind;
use crate::tokenlist::TokenList;
use crate::token::TokenId;

/// Find the `;` ending the statement starting at `from`, jumping linked
/// bracket groups.
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

fn delete_statement(
    list: &mut TokenList,
    anchor: TokenId,
) -> Result<Option<TokenId>, InternalError> {
    let end = statement_end(list, anchor).ok_or_else(|| {
        InternalError::syntax("using declaration without trailing ';'").at(list.location(anchor))
    })?;
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

/// Whether the `{` at `open` is a class/struct/union body; member
/// `using B::name;` declarations inside those pull in base members and
/// must not be rewritten into typedefs.
fn opens_record(list: &TokenList, open: TokenId) -> bool {
    let mut t = list.prev(open);
    let mut steps = 0;
    while let Some(cur) = t {
        steps += 1;
        if steps > 32 || matches!(list.str(cur), ";" | "{" | "}" | ")") {
            return false;
        }
        if matches!(list.str(cur), "struct" | "class" | "union") {
            return true;
        }
        t = list.prev(cur);
    }
    false
}

/// Normalize C++ `using` aliases into typedef form so the typedef
/// expander can substitute them:
///
/// - `using N = T ;`   becomes `typedef T N ;`
/// - `using a :: b ;`  becomes `typedef a :: b b ;` (namespace scope only)
///
/// Template aliases, pack declarations and `using enum` are out of
/// reach; those statements are deleted with a debug record. Returns
/// whether anything was rewritten, so the driver can loop the
/// using-then-typedef pair to a fixpoint.
pub fn simplify_using(
    list: &mut TokenList,
    m: &Matcher,
    rep: &mut Reporter<'_>,
    mut checkpoint: impl FnMut() -> bool,
) -> Result<bool, InternalError> {
    let mut changed = false;
    let mut record_stack: Vec<bool> = Vec::new();
    let mut tok = list.head();
    while let Some(t) = tok {
        if checkpoint() {
            return Ok(changed);
        }
        match list.str(t) {
            "{" => {
                let is_record = opens_record(list, t);
                record_stack.push(is_record);
                tok = list.next(t);
                continue;
            }
            "}" => {
                record_stack.pop();
                tok = list.next(t);
                continue;
            }
            "template" => {
                // `template < ... > using V = ...;` — alias templates
                // are left to a template instantiation pass that does
                // not exist here.
                let after_args = list
                    .next(t)
                    .filter(|&open| list.is(open, "<"))
                    .and_then(|open| list.find_closing_angle(open))
                    .and_then(|close| list.next(close));
                if let Some(u) = after_args.filter(|&u| list.is(u, "using")) {
                    rep.debug(
                        "simplifyUsing",
                        "unsupported template alias",
                        Some(list.location(u)),
                    );
                    tok = delete_statement(list, t)?;
                    changed = true;
                    continue;
                }
                tok = list.next(t);
                continue;
            }
            "using" => {}
            _ => {
                tok = list.next(t);
                continue;
            }
        }

        let loc = list.location(t);

        // `using namespace N ;` stays.
        if m.matches(list, list.next(t), "namespace") {
            tok = list.next(t);
            continue;
        }

        if m.matches(list, list.next(t), "enum") {
            rep.debug("simplifyUsing", "unsupported using-enum declaration", Some(loc));
            tok = delete_statement(list, t)?;
            changed = true;
            continue;
        }

        // `using N = T ;` -> `typedef T N ;`
        if m.matches(list, list.next(t), "%name% =") {
            let name = match list.next(t) {
                Some(n) => n,
                None => break,
            };
            let eq = match list.next(name) {
                Some(e) => e,
                None => break,
            };
            let end = statement_end(list, eq).ok_or_else(|| {
                InternalError::syntax("using declaration without trailing ';'")
                    .at(list.location(t))
            })?;
            if list.next(eq) == Some(end) {
                return Err(InternalError::syntax("using declaration without a type")
                    .at(list.location(eq)));
            }
            list.set_str(t, "typedef");
            let last_type = match list.prev(end) {
                Some(l) => l,
                None => break,
            };
            list.splice_after(last_type, name, name);
            list.erase(eq);
            changed = true;
            tok = list.next(t);
            continue;
        }

        // `using a :: b ;` at namespace scope -> `typedef a :: b b ;`
        let in_record = matches!(record_stack.last(), Some(true));
        let qualified = m.matches(list, list.next(t), "%name% ::")
            || m.matches(list, list.next(t), ":: %name%");
        if qualified && !in_record {
            let end = match statement_end(list, t) {
                Some(e) => e,
                None => {
                    return Err(InternalError::syntax(
                        "using declaration without trailing ';'",
                    )
                    .at(loc))
                }
            };
            // Multi-declarator using (`using a::b, c::d;`) is left out.
            if list.iter_range(t, end).any(|c| list.is(c, ",")) {
                rep.debug("simplifyUsing", "unsupported using declaration", Some(loc));
                tok = delete_statement(list, t)?;
                changed = true;
                continue;
            }
            let last = match list.prev(end) {
                Some(l) if list.get(l).kind == TokenKind::Name => l,
                _ => {
                    rep.debug("simplifyUsing", "unsupported using declaration", Some(loc));
                    tok = delete_statement(list, t)?;
                    changed = true;
                    continue;
                }
            };
            let alias = list.str(last).to_string();
            list.set_str(t, "typedef");
            list.insert_before(end, &alias);
            changed = true;
            tok = list.next(t);
            continue;
        }

        tok = list.next(t);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorLogger, ErrorMessage, NullLogger};
    use crate::linker;
    use crate::settings::Language;

    fn rewrite(code: &str) -> (String, bool) {
        let mut list = TokenList::new(Language::Cpp);
        list.create_tokens(code, "test.cpp").unwrap();
        linker::create_links(&mut list).unwrap();
        let m = Matcher::new();
        let mut logger = NullLogger;
        let mut rep = Reporter::new(&mut logger, false);
        let changed = simplify_using(&mut list, &m, &mut rep, || false).unwrap();
        list.check_links().unwrap();
        (list.stringify(), changed)
    }

    #[test]
    fn alias_becomes_typedef() {
        let (out, changed) = rewrite("using word = unsigned short ;");
        assert_eq!(out, "typedef unsigned short word ;");
        assert!(changed);
    }

    #[test]
    fn qualified_using_becomes_typedef_of_the_leaf_name() {
        let (out, changed) = rewrite("using a :: b ;");
        assert_eq!(out, "typedef a :: b b ;");
        assert!(changed);
    }

    #[test]
    fn using_namespace_is_untouched() {
        let (out, changed) = rewrite("using namespace std ;");
        assert_eq!(out, "using namespace std ;");
        assert!(!changed);
    }

    #[test]
    fn member_using_inside_a_class_is_untouched() {
        let (out, changed) = rewrite("struct D : B { using B :: f ; } ;");
        assert_eq!(out, "struct D : B { using B :: f ; } ;");
        assert!(!changed);
    }

    #[test]
    fn template_alias_is_deleted_with_a_debug_record() {
        struct Collect(Vec<ErrorMessage>);
        impl ErrorLogger for Collect {
            fn report(&mut self, msg: &ErrorMessage) {
                self.0.push(msg.clone());
            }
        }
        let mut list = TokenList::new(Language::Cpp);
        list.create_tokens("template < class T > using V = std :: vector < T > ; int x ;", "t.cpp")
            .unwrap();
        linker::create_links(&mut list).unwrap();
        let m = Matcher::new();
        let mut logger = Collect(Vec::new());
        let mut rep = Reporter::new(&mut logger, true);
        let changed = simplify_using(&mut list, &m, &mut rep, || false).unwrap();
        assert!(changed);
        assert_eq!(list.stringify(), "int x ;");
        assert!(logger.0.iter().any(|m| m.id == "simplifyUsing"));
    }

    #[test]
    fn alias_of_inline_struct_feeds_the_typedef_hoister() {
        let (out, changed) = rewrite("using S = struct { int x ; } ;");
        assert_eq!(out, "typedef struct { int x ; } S ;");
        assert!(changed);
    }

    #[test]
    fn missing_type_is_a_syntax_error() {
        let mut list = TokenList::new(Language::Cpp);
        list.create_tokens("using N = ;", "t.cpp").unwrap();
        linker::create_links(&mut list).unwrap();
        let m = Matcher::new();
        let mut logger = NullLogger;
        let mut rep = Reporter::new(&mut logger, false);
        let err = simplify_using(&mut list, &m, &mut rep, || false).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Syntax);
    }
}
