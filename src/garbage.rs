use crate::error::InternalError;
use crate::matcher::Matcher;
use crate::settings::Settings;
use crate::token::{is_const_op, is_flow_keyword, TokenId, TokenKind};
use crate::tokenlist::TokenList;

fn syntax_error(list: &TokenList, t: TokenId, what: &str) -> InternalError {
    InternalError::syntax(format!("syntax error: {}", what)).at(list.location(t))
}

/// Whether a name looks like an object-like/function-like macro that was
/// never expanded: all-caps with at least two characters.
fn looks_like_macro(s: &str) -> bool {
    s.len() >= 2
        && s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Operators that can only be binary; finding one with a missing operand
/// can only come from invalid input.
fn is_binary_only_op(s: &str) -> bool {
    matches!(
        s,
        "/" | "%" | "^" | "==" | "!=" | "<=" | ">=" | "&&" | "||" | "<<"
    )
}

fn is_unary_capable(s: &str) -> bool {
    matches!(s, "+" | "-" | "!" | "~" | "*" | "&" | "::" | "(" | "new" | "delete" | "sizeof")
}

fn check_operators(list: &TokenList, _m: &Matcher) -> Result<(), InternalError> {
    for t in list.iter() {
        if list.get(t).link.is_some() {
            continue; // linked angle brackets are template delimiters
        }
        let s = list.str(t);
        if !is_const_op(s) {
            continue;
        }
        if let Some(n) = list.next(t) {
            let ns = list.str(n);
            if is_binary_only_op(s) && matches!(ns, ")" | "]" | "}" | ";" | ",") {
                return Err(syntax_error(list, t, "operator without operand"));
            }
            if is_const_op(ns) && list.get(n).link.is_none() && !is_unary_capable(ns) {
                return Err(syntax_error(list, n, "operator without operand"));
            }
        } else if is_binary_only_op(s) {
            return Err(syntax_error(list, t, "operator without operand"));
        }
    }
    Ok(())
}

fn check_statement_starts(list: &TokenList, m: &Matcher) -> Result<(), InternalError> {
    for t in list.iter() {
        if !matches!(list.str(t), ";" | "{" | "}") {
            continue;
        }
        let n = match list.next(t) {
            Some(n) => n,
            None => break,
        };
        if m.matches(list, Some(n), "%assign%") && !list.is(n, "=") {
            return Err(syntax_error(list, n, "statement begins with an assignment operator"));
        }
        if list.is(n, "=") {
            return Err(syntax_error(list, n, "statement begins with '='"));
        }
    }
    Ok(())
}

/// `case`/`default` must live directly inside a `switch` body, and a
/// `case` needs an expression before its `:`.
fn check_case_labels(list: &TokenList, _m: &Matcher) -> Result<(), InternalError> {
    // For every brace scope remember whether it is a switch body.
    let mut switch_body: Vec<bool> = Vec::new();
    let mut tok = list.head();
    while let Some(t) = tok {
        match list.str(t) {
            "{" => {
                let is_switch = list
                    .prev(t)
                    .filter(|&p| list.is(p, ")"))
                    .and_then(|p| list.link_of(p))
                    .and_then(|open| list.prev(open))
                    .is_some_and(|kw| list.is(kw, "switch"));
                switch_body.push(is_switch);
            }
            "}" => {
                switch_body.pop();
            }
            "default" if list.prev(t).is_some_and(|p| list.is(p, "=")) => {}
            "case" | "default" => {
                if !matches!(switch_body.last(), Some(true)) {
                    return Err(syntax_error(list, t, "keyword 'case'/'default' outside switch"));
                }
                if list.is(t, "case") {
                    // Scan for the label colon; hitting a statement
                    // boundary first means the expression is malformed.
                    let mut ternary = 0u32;
                    let mut cur = list.next(t);
                    let mut seen_expr = false;
                    loop {
                        let c = match cur {
                            Some(c) => c,
                            None => return Err(syntax_error(list, t, "incomplete case label")),
                        };
                        match list.str(c) {
                            "?" => ternary += 1,
                            ":" if ternary > 0 => ternary -= 1,
                            ":" => {
                                if !seen_expr {
                                    return Err(syntax_error(list, t, "case label without expression"));
                                }
                                break;
                            }
                            ";" | "{" | "}" => {
                                return Err(syntax_error(list, c, "case label without colon"))
                            }
                            _ => seen_expr = true,
                        }
                        cur = list.next(c);
                    }
                }
            }
            _ => {}
        }
        tok = list.next(t);
    }
    Ok(())
}

/// A classic for-header carries exactly two top-level semicolons; the
/// range form carries a top-level `:` with at most one (C++20 init).
fn check_for_headers(list: &TokenList, m: &Matcher) -> Result<(), InternalError> {
    for t in list.iter() {
        if !m.simple(list, Some(t), "for (") {
            continue;
        }
        let open = match list.next(t) {
            Some(o) => o,
            None => continue,
        };
        let close = match list.link_of(open) {
            Some(c) => c,
            None => continue,
        };
        let mut semicolons = 0;
        let mut range_colon = false;
        let mut ternary = 0u32;
        let mut cur = list.next(open);
        while let Some(c) = cur {
            if c == close {
                break;
            }
            match list.str(c) {
                "(" | "[" | "{" => {
                    cur = list.link_of(c).and_then(|l| list.next(l));
                    continue;
                }
                ";" => semicolons += 1,
                "?" => ternary += 1,
                ":" if ternary > 0 => ternary -= 1,
                ":" if list.is_cpp() => range_colon = true,
                _ => {}
            }
            cur = list.next(c);
        }
        let ok = if range_colon && list.is_cpp() {
            semicolons <= 1
        } else {
            semicolons == 2
        };
        if !ok {
            return Err(syntax_error(list, t, "wrong number of ';' in for-header"));
        }
    }
    Ok(())
}

fn check_global_scope(list: &TokenList, _m: &Matcher) -> Result<(), InternalError> {
    let mut depth = 0i32;
    for t in list.iter() {
        match list.str(t) {
            "{" => depth += 1,
            "}" => depth -= 1,
            "default" | "delete" => {} // `= default;` / `= delete;` definitions
            s if depth == 0 && is_flow_keyword(s) => {
                return Err(syntax_error(list, t, "keyword outside of function body"));
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_unlinked_closers(list: &TokenList) -> Result<(), InternalError> {
    for t in list.iter() {
        if matches!(list.str(t), ")" | "]" | "}") && list.get(t).link.is_none() {
            return Err(
                InternalError::syntax(format!("Unmatched '{}'.", list.str(t)))
                    .at(list.location(t)),
            );
        }
    }
    Ok(())
}

/// A `?` that reaches the end of its statement without a matching `:`,
/// or with no operand at all before the next delimiter.
fn check_ternary(list: &TokenList, _m: &Matcher) -> Result<(), InternalError> {
    let mut pending: Vec<TokenId> = Vec::new();
    for t in list.iter() {
        match list.str(t) {
            "?" => {
                if list
                    .next(t)
                    .map_or(true, |n| matches!(list.str(n), ")" | "]" | "}" | ";" | "," | "?"))
                {
                    return Err(syntax_error(list, t, "unmatched '?'"));
                }
                pending.push(t);
            }
            ":" => {
                pending.pop();
            }
            ";" | "{" | "}" => {
                if let Some(&q) = pending.first() {
                    return Err(syntax_error(list, q, "unmatched '?'"));
                }
            }
            _ => {}
        }
    }
    match pending.first() {
        Some(&q) => Err(syntax_error(list, q, "unmatched '?'")),
        None => Ok(()),
    }
}

fn check_template_in_c(list: &TokenList, m: &Matcher) -> Result<(), InternalError> {
    if list.is_cpp() {
        return Ok(());
    }
    for t in list.iter() {
        if m.simple(list, Some(t), "template <") {
            return Err(syntax_error(list, t, "C++ template syntax in C code"));
        }
    }
    Ok(())
}

fn unknown_macro(list: &TokenList, t: TokenId) -> InternalError {
    InternalError::unknown_macro(format!(
        "There is an unknown macro here somewhere. Configuration is required. If {} is a macro then please configure it.",
        list.str(t)
    ))
    .at(list.location(t))
}

/// Unexpanded macro heuristics: `NAME ( ... )` whose argument range
/// encloses `;` or `return`, an `if` without parenthesis, or `) NAME (`
/// glued between an if-condition and its body.
fn check_unknown_macros(list: &TokenList, m: &Matcher) -> Result<(), InternalError> {
    for t in list.iter() {
        let data = list.get(t);
        if data.kind == TokenKind::Name && looks_like_macro(list.str(t)) {
            if let Some(open) = list.next(t).filter(|&n| list.is(n, "(")) {
                if let Some(close) = list.link_of(open) {
                    let mut cur = list.next(open);
                    while let Some(c) = cur {
                        if c == close {
                            break;
                        }
                        if matches!(list.str(c), ";" | "return") {
                            return Err(unknown_macro(list, t));
                        }
                        cur = list.next(c);
                    }
                }
            }
        }
        if list.is(t, "if") && list.is_cpp() && m.matches(list, list.next(t), "constexpr") {
            continue;
        }
        if list.is(t, "if") || list.is(t, "while") || list.is(t, "switch") {
            match list.next(t) {
                Some(n) if list.is(n, "(") => {}
                Some(n) if list.is(t, "if") && list.get(n).is_name() => {
                    return Err(unknown_macro(list, n));
                }
                Some(n) => return Err(syntax_error(list, n, "missing '(' after keyword")),
                None => return Err(syntax_error(list, t, "incomplete statement")),
            }
        }
        // `if ( x ) MACRO() {` or `... MACRO() else`.
        if list.is(t, ")") && list.get(t).link.is_some() {
            let is_condition = list
                .link_of(t)
                .and_then(|open| list.prev(open))
                .is_some_and(|kw| matches!(list.str(kw), "if" | "while" | "for"));
            if is_condition && m.matches(list, list.next(t), "%name% ( ) {|else") {
                if let Some(name) = list.next(t) {
                    if looks_like_macro(list.str(name)) {
                        return Err(unknown_macro(list, name));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Scan the list for shapes that cannot come from valid input. Runs after
/// linker pass A and again after the simplifier battery.
pub fn find_garbage_code(
    list: &TokenList,
    m: &Matcher,
    _settings: &Settings,
) -> Result<(), InternalError> {
    check_unlinked_closers(list)?;
    check_global_scope(list, m)?;
    check_case_labels(list, m)?;
    check_for_headers(list, m)?;
    check_operators(list, m)?;
    check_statement_starts(list, m)?;
    check_ternary(list, m)?;
    check_template_in_c(list, m)?;
    check_unknown_macros(list, m)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::linker;
    use crate::settings::Language;

    fn scan(code: &str, lang: Language) -> Result<(), InternalError> {
        let mut list = TokenList::new(lang);
        list.create_tokens(code, "test.cpp").unwrap();
        linker::create_links(&mut list)?;
        let m = Matcher::new();
        find_garbage_code(&list, &m, &Settings::default())
    }

    fn rejects(code: &str) -> InternalError {
        scan(code, Language::Cpp).expect_err(code)
    }

    fn accepts(code: &str) {
        scan(code, Language::Cpp).unwrap_or_else(|e| panic!("rejected {:?}: {}", code, e));
    }

    #[test]
    fn well_formed_code_passes() {
        accepts("void f ( ) { if ( x ) { y ( ) ; } }");
        accepts("int a [ 3 ] = { 1 , 2 , 3 } ;");
        accepts("void f ( ) { for ( i = 0 ; i < 3 ; ++ i ) { } }");
        accepts("void f ( ) { x = a ? b : c ; }");
    }

    #[test]
    fn operator_without_operand() {
        let err = rejects("void f ( ) { x = y / ; }");
        assert_eq!(err.kind, ErrorKind::Syntax);
        rejects("void f ( ) { x = a + / b ; }");
    }

    #[test]
    fn unary_sequences_are_allowed() {
        accepts("void f ( ) { x = a + - b ; }");
        accepts("void f ( ) { x = a * - 1 ; }");
        accepts("void f ( ) { p = & a ; }");
        accepts("void f ( int * ) ;");
    }

    #[test]
    fn case_outside_switch() {
        let err = rejects("void f ( ) { case 1 : ; }");
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn case_without_expression() {
        rejects("void f ( ) { switch ( n ) { case : z ( ) ; break ; } }");
        rejects("void f ( ) { switch ( n ) { case ; : z ( ) ; break ; } }");
        accepts("void f ( ) { switch ( n ) { case 1 : z ( ) ; break ; default : ; } }");
    }

    #[test]
    fn for_header_semicolons() {
        rejects("void f ( ) { for ( rl = reslist ) { } }");
        rejects("void f ( ) { for ( a ; b ) { } }");
        accepts("void f ( ) { for ( ; ; ) { } }");
        accepts("void f ( ) { for ( auto x : v ) { } }");
    }

    #[test]
    fn flow_keyword_at_global_scope() {
        rejects("return 1 ;");
        rejects("break ;");
        accepts("void f ( ) { return ; }");
    }

    #[test]
    fn statement_starting_with_assignment() {
        rejects("void f ( ) { = a ; }");
        rejects("void f ( ) { += a ; }");
    }

    #[test]
    fn unmatched_ternary() {
        let err = rejects("int b = ( 0 ? ) ;");
        assert_eq!(err.kind, ErrorKind::Syntax);
        accepts("int b = 0 ? 1 : 2 ;");
    }

    #[test]
    fn template_syntax_in_c() {
        let err = scan("template < typename T > void f ( ) ;", Language::C).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        scan("int template ;", Language::C).unwrap();
    }

    #[test]
    fn uppercase_call_enclosing_semicolon_is_unknown_macro() {
        let err = rejects("void f ( ) { MACRO ( x ; y ) ; }");
        assert_eq!(err.kind, ErrorKind::UnknownMacro);
        accepts("void f ( ) { MACRO ( x , y ) ; }");
    }

    #[test]
    fn if_without_parenthesis_is_unknown_macro() {
        let err = rejects("void f ( ) { if MACRO ( ) ; }");
        assert_eq!(err.kind, ErrorKind::UnknownMacro);
    }

    #[test]
    fn macro_between_condition_and_body() {
        let err = rejects("void f ( ) { if ( x ) MACRO ( ) { } }");
        assert_eq!(err.kind, ErrorKind::UnknownMacro);
        let err = rejects("void f ( ) { if ( x ) MACRO ( ) else ; }");
        assert_eq!(err.kind, ErrorKind::UnknownMacro);
    }
}
