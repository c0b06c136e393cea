//! Expression ASTs are reified as operand pointers on the tokens
//! themselves: unary operators through `ast_op1`, binary through
//! `ast_op1`/`ast_op2`, with every operand's `ast_parent` pointing back
//! at its operator.

use crate::token::{TokenId, TokenKind};
use crate::tokenlist::TokenList;

/// How tightly a binary operator binds; higher wins.
fn binary_power(s: &str) -> Option<u8> {
    Some(match s {
        "*" | "/" | "%" => 100,
        "+" | "-" => 90,
        "<<" | ">>" => 80,
        "<" | "<=" | ">" | ">=" => 70,
        "==" | "!=" => 65,
        "&" => 60,
        "^" => 55,
        "|" => 50,
        "&&" => 45,
        "||" => 40,
        "?" => 30,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => 20,
        "," => 10,
        _ => return None,
    })
}

fn right_associative(s: &str) -> bool {
    matches!(s, "?" | "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=")
}

pub struct AstBuilder<'a> {
    list: &'a mut TokenList,
}

impl<'a> AstBuilder<'a> {
    pub fn new(list: &'a mut TokenList) -> Self {
        AstBuilder { list }
    }

    fn set_op1(&mut self, node: TokenId, child: Option<TokenId>) {
        self.list.get_mut(node).ast_op1 = child;
        if let Some(c) = child {
            self.list.get_mut(c).ast_parent = Some(node);
        }
    }

    fn set_op2(&mut self, node: TokenId, child: Option<TokenId>) {
        self.list.get_mut(node).ast_op2 = child;
        if let Some(c) = child {
            self.list.get_mut(c).ast_parent = Some(node);
        }
    }

    /// Parse one expression with precedence climbing. Returns the root
    /// and the first unconsumed token.
    fn parse_expr(
        &mut self,
        tok: Option<TokenId>,
        min_power: u8,
    ) -> (Option<TokenId>, Option<TokenId>) {
        let (mut lhs, mut cur) = self.parse_unary(tok);
        if lhs.is_none() {
            return (None, cur);
        }
        loop {
            let op = match cur {
                Some(op) => op,
                None => break,
            };
            // Linked angle brackets delimit template arguments, not
            // comparisons.
            if self.list.get(op).link.is_some() {
                break;
            }
            let power = match binary_power(self.list.str(op)) {
                Some(p) if p >= min_power => p,
                _ => break,
            };
            if self.list.is(op, "?") {
                // cond ? then : else — `?` holds the condition and the
                // `:`; the `:` holds both branches.
                let (then_root, after_then) = self.parse_expr(self.list.next(op), 0);
                let colon = match after_then.filter(|&c| self.list.is(c, ":")) {
                    Some(c) => c,
                    None => break,
                };
                let (else_root, after_else) = self.parse_expr(self.list.next(colon), power);
                self.set_op1(colon, then_root);
                self.set_op2(colon, else_root);
                self.set_op1(op, lhs);
                self.set_op2(op, Some(colon));
                lhs = Some(op);
                cur = after_else;
                continue;
            }
            let next_min = if right_associative(self.list.str(op)) {
                power
            } else {
                power + 1
            };
            let (rhs, after) = self.parse_expr(self.list.next(op), next_min);
            if rhs.is_none() {
                // Not an expression on the right (brace initializer,
                // statement boundary); leave the operator untouched.
                break;
            }
            self.set_op1(op, lhs);
            self.set_op2(op, rhs);
            lhs = Some(op);
            cur = after;
        }
        (lhs, cur)
    }

    /// Whether `t` begins a value expression rather than a type: a
    /// variable name, a literal, or a unary/primary opener. Bare type
    /// names and type keywords stay out, so `sizeof(int)` keeps no
    /// operand while `sizeof(*p)` and `sizeof(f())` get theirs.
    fn starts_value_expression(&self, t: TokenId) -> bool {
        let data = self.list.get(t);
        if data.kind == TokenKind::Name {
            // A qualified name without a var id reads as a type here
            // (`sizeof(ns::Type)`), so `::` is deliberately absent.
            return data.var_id != 0
                || self
                    .list
                    .next(t)
                    .is_some_and(|n| matches!(self.list.str(n), "(" | "[" | "." | "->"));
        }
        data.is_literal()
            || matches!(
                self.list.str(t),
                "*" | "&" | "-" | "+" | "!" | "~" | "(" | "++" | "--"
            )
    }

    fn parse_unary(&mut self, tok: Option<TokenId>) -> (Option<TokenId>, Option<TokenId>) {
        let t = match tok {
            Some(t) => t,
            None => return (None, None),
        };
        match self.list.str(t) {
            "!" | "~" | "+" | "-" | "*" | "&" | "++" | "--" => {
                let (operand, after) = self.parse_unary(self.list.next(t));
                if operand.is_none() {
                    return (None, Some(t));
                }
                self.set_op1(t, operand);
                (Some(t), after)
            }
            "sizeof" => {
                let open = self.list.next(t).filter(|&n| self.list.is(n, "("));
                match open.and_then(|o| self.list.link_of(o)) {
                    Some(close) => {
                        // Expression operand when one is there; a type
                        // operand carries no AST.
                        let inner = open.and_then(|o| self.list.next(o));
                        if let Some(first) = inner.filter(|&f| f != close) {
                            if self.starts_value_expression(first) {
                                let (root, _) = self.parse_expr(Some(first), 0);
                                self.set_op1(t, root);
                            }
                        }
                        (Some(t), self.list.next(close))
                    }
                    None => (Some(t), self.list.next(t)),
                }
            }
            "(" if self.list.get(t).flags.is_cast() => {
                let close = match self.list.link_of(t) {
                    Some(c) => c,
                    None => return (None, Some(t)),
                };
                let (operand, after) = self.parse_unary(self.list.next(close));
                self.set_op1(t, operand);
                (Some(t), after)
            }
            "(" => {
                // Grouping parentheses are transparent.
                let close = match self.list.link_of(t) {
                    Some(c) => c,
                    None => return (None, Some(t)),
                };
                let (inner, _) = self.parse_expr(self.list.next(t), 0);
                match inner {
                    Some(root) => self.parse_postfix(root, self.list.next(close)),
                    None => (None, Some(t)),
                }
            }
            _ => {
                let data = self.list.get(t);
                if data.is_name() && data.kind != TokenKind::Keyword || data.is_literal() {
                    self.parse_postfix(t, self.list.next(t))
                } else {
                    (None, Some(t))
                }
            }
        }
    }

    /// Calls, subscripts, member access and postfix increments wrap the
    /// operand from the left.
    fn parse_postfix(
        &mut self,
        mut operand: TokenId,
        mut cur: Option<TokenId>,
    ) -> (Option<TokenId>, Option<TokenId>) {
        loop {
            let t = match cur {
                Some(t) => t,
                None => break,
            };
            match self.list.str(t) {
                "(" if !self.list.get(t).flags.is_cast() => {
                    let close = match self.list.link_of(t) {
                        Some(c) => c,
                        None => break,
                    };
                    let args_start = self.list.next(t).filter(|&a| a != close);
                    self.set_op1(t, Some(operand));
                    if let Some(args) = args_start {
                        let (root, _) = self.parse_expr(Some(args), 0);
                        self.set_op2(t, root);
                    }
                    operand = t;
                    cur = self.list.next(close);
                }
                "[" => {
                    let close = match self.list.link_of(t) {
                        Some(c) => c,
                        None => break,
                    };
                    let idx_start = self.list.next(t).filter(|&a| a != close);
                    self.set_op1(t, Some(operand));
                    if let Some(idx) = idx_start {
                        let (root, _) = self.parse_expr(Some(idx), 0);
                        self.set_op2(t, root);
                    }
                    operand = t;
                    cur = self.list.next(close);
                }
                "." | "->" | "::" => {
                    let member = match self.list.next(t) {
                        Some(m) if self.list.get(m).is_name() => m,
                        _ => break,
                    };
                    self.set_op1(t, Some(operand));
                    self.set_op2(t, Some(member));
                    operand = t;
                    cur = self.list.next(member);
                }
                "++" | "--" => {
                    self.set_op1(t, Some(operand));
                    operand = t;
                    cur = self.list.next(t);
                }
                _ => break,
            }
        }
        (Some(operand), cur)
    }
}

/// First `;` at this nesting level, or the brace closing it. Linked
/// groups are skipped whole.
fn statement_boundary(list: &TokenList, from: TokenId) -> Option<TokenId> {
    let mut cur = Some(from);
    while let Some(t) = cur {
        match list.str(t) {
            ";" | "}" => return Some(t),
            "{" => return Some(t),
            "(" | "[" => cur = list.link_of(t).and_then(|l| list.next(l)),
            _ => cur = list.next(t),
        }
    }
    None
}

/// Build expression trees for the whole list: statement expressions,
/// declaration initializers, conditions, for-clauses and return values.
pub fn build_ast(list: &mut TokenList) {
    let mut tok = list.head();
    while let Some(t) = tok {
        let at_start = list
            .prev(t)
            .map_or(true, |p| matches!(list.str(p), ";" | "{" | "}" | ":"));
        if !at_start {
            tok = list.next(t);
            continue;
        }
        match list.str(t) {
            "if" | "while" | "switch" => {
                if let Some(open) = list.next(t).filter(|&n| list.is(n, "(")) {
                    if let Some(close) = list.link_of(open) {
                        if list.next(open) != Some(close) {
                            let first = list.next(open);
                            AstBuilder::new(list).parse_expr(first, 0);
                        }
                        tok = list.next(close);
                        continue;
                    }
                }
                tok = list.next(t);
            }
            "for" => {
                if let Some(open) = list.next(t).filter(|&n| list.is(n, "(")) {
                    if let Some(close) = list.link_of(open) {
                        // Three clauses split at top-level semicolons.
                        let mut clause = list.next(open);
                        while let Some(start) = clause {
                            if start == close {
                                break;
                            }
                            if list.is(start, ";") {
                                clause = list.next(start);
                                continue;
                            }
                            let (_, after) = AstBuilder::new(list).parse_expr(Some(start), 0);
                            match after {
                                Some(a) if a != start => clause = Some(a),
                                _ => clause = list.next(start),
                            }
                        }
                        tok = list.next(close);
                        continue;
                    }
                }
                tok = list.next(t);
            }
            "return" | "throw" => {
                let first = list.next(t).filter(|&n| !list.is(n, ";"));
                if first.is_some() {
                    let (root, _) = AstBuilder::new(list).parse_expr(first, 0);
                    let mut b = AstBuilder::new(list);
                    b.set_op1(t, root);
                }
                tok = statement_boundary(list, t).map_or(None, |e| list.next(e));
            }
            "case" => {
                // Constant labels carry no AST.
                let mut cur = list.next(t);
                while let Some(c) = cur {
                    if list.is(c, ":") {
                        break;
                    }
                    cur = list.next(c);
                }
                tok = cur.and_then(|c| list.next(c));
            }
            "do" | "else" | "goto" | "break" | "continue" | "typedef" | "using" | "namespace" => {
                tok = list.next(t);
            }
            _ => {
                let data = list.get(t);
                let expr_start = (data.is_name() && data.kind != TokenKind::Keyword)
                    || data.is_literal()
                    || matches!(list.str(t), "(" | "*" | "&" | "!" | "~" | "++" | "--" | "-" | "+");
                if expr_start && !looks_like_declaration(list, t) {
                    AstBuilder::new(list).parse_expr(Some(t), 0);
                } else if let Some(eq) = declaration_initializer(list, t) {
                    AstBuilder::new(list).parse_expr(Some(eq), 0);
                }
                tok = statement_boundary(list, t).and_then(|e| {
                    if list.is(e, "{") {
                        Some(e)
                    } else {
                        list.next(e)
                    }
                });
            }
        }
    }
}

/// `TYPE name ...` — the statement is a declaration when two adjacent
/// names open it, or it opens with a type keyword.
fn looks_like_declaration(list: &TokenList, t: TokenId) -> bool {
    let data = list.get(t);
    if data.kind != TokenKind::Name {
        return false;
    }
    match list.next(t) {
        Some(n) => {
            let nd = list.get(n);
            (nd.is_name() && nd.kind != TokenKind::Keyword && list.get(n).var_id != 0)
                || (nd.kind == TokenKind::Name && data.var_id == 0 && nd.var_id == 0)
        }
        None => false,
    }
}

/// For `int a = 3 ;`-shaped statements return the declarator name token
/// so `a = 3` still gets its tree.
fn declaration_initializer(list: &TokenList, t: TokenId) -> Option<TokenId> {
    let mut cur = Some(t);
    let mut prev_name: Option<TokenId> = None;
    while let Some(c) = cur {
        match list.str(c) {
            ";" | "{" | "}" => return None,
            "=" => {
                let name = prev_name?;
                // Brace initializers carry no expression tree.
                if list.next(c).is_some_and(|n| list.is(n, "{")) {
                    return None;
                }
                return Some(name);
            }
            "[" => cur = list.link_of(c).and_then(|l| list.next(l)),
            "(" => return None,
            _ => {
                if list.get(c).kind == TokenKind::Name {
                    prev_name = Some(c);
                }
                cur = list.next(c);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker;
    use crate::matcher::Matcher;
    use crate::settings::Language;

    fn built(code: &str) -> TokenList {
        let mut list = TokenList::new(Language::Cpp);
        list.create_tokens(code, "test.cpp").unwrap();
        linker::create_links(&mut list).unwrap();
        linker::create_links2(&mut list).unwrap();
        let m = Matcher::new();
        crate::varid::set_var_ids(&mut list, &m).unwrap();
        build_ast(&mut list);
        list
    }

    fn find(list: &TokenList, lexeme: &str, nth: usize) -> TokenId {
        list.iter()
            .filter(|&t| list.is(t, lexeme))
            .nth(nth)
            .unwrap_or_else(|| panic!("no {:?} #{}", lexeme, nth))
    }

    #[test]
    fn binary_precedence_shapes_the_tree() {
        let list = built("void f ( ) { x = a + b * c ; }");
        let eq = find(&list, "=", 0);
        let plus = find(&list, "+", 0);
        let star = find(&list, "*", 0);
        assert_eq!(list.get(eq).ast_op2, Some(plus));
        assert_eq!(list.get(plus).ast_op2, Some(star));
        assert_eq!(list.get(star).ast_parent, Some(plus));
        assert_eq!(list.get(plus).ast_parent, Some(eq));
        assert_eq!(list.get(eq).ast_parent, None);
    }

    #[test]
    fn unary_operators_use_operand1() {
        let list = built("void f ( ) { y = - x ; p = & v ; }");
        let minus = find(&list, "-", 0);
        let x = find(&list, "x", 0);
        assert_eq!(list.get(minus).ast_op1, Some(x));
        assert_eq!(list.get(minus).ast_op2, None);
        let amp = find(&list, "&", 0);
        let v = find(&list, "v", 0);
        assert_eq!(list.get(amp).ast_op1, Some(v));
    }

    #[test]
    fn ternary_shape_matches_the_colon_convention() {
        let list = built("void f ( ) { r = c ? a : b ; }");
        let q = find(&list, "?", 0);
        let colon = find(&list, ":", 0);
        let c = find(&list, "c", 0);
        let a = find(&list, "a", 0);
        let b = find(&list, "b", 0);
        assert_eq!(list.get(q).ast_op1, Some(c));
        assert_eq!(list.get(q).ast_op2, Some(colon));
        assert_eq!(list.get(colon).ast_op1, Some(a));
        assert_eq!(list.get(colon).ast_op2, Some(b));
    }

    #[test]
    fn call_takes_callee_and_arguments() {
        let list = built("void f ( ) { g ( a , b ) ; }");
        let open = find(&list, "(", 1);
        let g = find(&list, "g", 0);
        let comma = find(&list, ",", 0);
        assert_eq!(list.get(open).ast_op1, Some(g));
        assert_eq!(list.get(open).ast_op2, Some(comma));
        let a = find(&list, "a", 0);
        let b = find(&list, "b", 0);
        assert_eq!(list.get(comma).ast_op1, Some(a));
        assert_eq!(list.get(comma).ast_op2, Some(b));
    }

    #[test]
    fn subscript_mirrors_call() {
        let list = built("void f ( ) { x = a [ i ] ; }");
        let open = find(&list, "[", 0);
        let a = find(&list, "a", 0);
        let i = find(&list, "i", 0);
        assert_eq!(list.get(open).ast_op1, Some(a));
        assert_eq!(list.get(open).ast_op2, Some(i));
    }

    #[test]
    fn grouping_parens_are_transparent() {
        let list = built("void f ( ) { x = ( a + b ) * c ; }");
        let star = find(&list, "*", 0);
        let plus = find(&list, "+", 0);
        assert_eq!(list.get(star).ast_op1, Some(plus));
        let open = find(&list, "(", 1);
        assert_eq!(list.get(open).ast_op1, None);
    }

    #[test]
    fn declaration_initializer_gets_a_tree() {
        let list = built("void f ( ) { int * b = & a ; }");
        let eq = find(&list, "=", 0);
        let b = find(&list, "b", 0);
        let amp = find(&list, "&", 0);
        assert_eq!(list.get(eq).ast_op1, Some(b));
        assert_eq!(list.get(eq).ast_op2, Some(amp));
    }

    #[test]
    fn return_holds_its_expression() {
        let list = built("int f ( ) { return a + 1 ; }");
        let ret = find(&list, "return", 0);
        let plus = find(&list, "+", 0);
        assert_eq!(list.get(ret).ast_op1, Some(plus));
    }

    #[test]
    fn condition_gets_a_tree() {
        let list = built("void f ( ) { if ( a < b ) { } }");
        let lt = find(&list, "<", 0);
        let a = find(&list, "a", 0);
        let b = find(&list, "b", 0);
        assert_eq!(list.get(lt).ast_op1, Some(a));
        assert_eq!(list.get(lt).ast_op2, Some(b));
    }

    #[test]
    fn template_angles_are_not_comparisons() {
        let list = built("void f ( ) { std :: vector < int > v ; v [ 0 ] = 1 ; }");
        let lt = find(&list, "<", 0);
        assert_eq!(list.get(lt).ast_op1, None);
        assert_eq!(list.get(lt).ast_op2, None);
    }

    #[test]
    fn ast_is_a_forest_without_cycles() {
        let list = built("void f ( ) { x = a + b * c - d ; y = g ( x , -2 ) ; }");
        for t in list.iter() {
            let mut seen = std::collections::HashSet::new();
            let mut cur = Some(t);
            while let Some(c) = cur {
                assert!(seen.insert(c), "ast_parent cycle at {:?}", list.str(c));
                cur = list.get(c).ast_parent;
            }
            for child in [list.get(t).ast_op1, list.get(t).ast_op2].into_iter().flatten() {
                assert_eq!(list.get(child).ast_parent, Some(t));
            }
        }
    }

    #[test]
    fn sizeof_value_operands_get_an_ast() {
        let list = built("void f ( ) { int * p ; n = sizeof ( * p ) + sizeof ( p ) ; }");
        let sizeofs: Vec<TokenId> = list.iter().filter(|&t| list.is(t, "sizeof")).collect();
        let star = find(&list, "*", 1);
        assert_eq!(list.get(sizeofs[0]).ast_op1, Some(star));
        let p_use = find(&list, "p", 2);
        assert_eq!(list.get(sizeofs[1]).ast_op1, Some(p_use));
    }

    #[test]
    fn sizeof_type_operands_stay_bare() {
        let list = built("void f ( ) { n = sizeof ( int ) + sizeof ( unsigned long ) ; }");
        for t in list.iter().filter(|&t| list.is(t, "sizeof")) {
            assert_eq!(list.get(t).ast_op1, None);
            assert_eq!(list.get(t).ast_op2, None);
        }
    }

    #[test]
    fn sizeof_call_operand_gets_an_ast() {
        let list = built("void f ( ) { n = sizeof ( g ( ) ) ; }");
        let sz = find(&list, "sizeof", 0);
        let call_open = find(&list, "(", 2);
        assert_eq!(list.get(sz).ast_op1, Some(call_open));
    }

    #[test]
    fn member_access_chains() {
        let list = built("void f ( ) { s . m = p -> q ; }");
        let dot = find(&list, ".", 0);
        let s = find(&list, "s", 0);
        let m = find(&list, "m", 0);
        assert_eq!(list.get(dot).ast_op1, Some(s));
        assert_eq!(list.get(dot).ast_op2, Some(m));
        let arrow = find(&list, "->", 0);
        let eq = find(&list, "=", 0);
        assert_eq!(list.get(eq).ast_op2, Some(arrow));
    }
}
