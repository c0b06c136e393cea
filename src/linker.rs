use crate::error::InternalError;
use crate::token::TokenId;
use crate::tokenlist::TokenList;

fn link_pair(list: &mut TokenList, open: TokenId, close: TokenId) {
    list.get_mut(open).link = Some(close);
    list.get_mut(close).link = Some(open);
}

/// Pass A: pair `(){}[]`. One stack per bracket kind plus a stack of the
/// kind expected at each nesting level, so a mismatched closer is blamed
/// on the exact offending token.
pub fn create_links(list: &mut TokenList) -> Result<(), InternalError> {
    let mut round: Vec<TokenId> = Vec::new();
    let mut square: Vec<TokenId> = Vec::new();
    let mut curly: Vec<TokenId> = Vec::new();
    let mut expected: Vec<u8> = Vec::new();

    let ids: Vec<TokenId> = list.iter().collect();
    for t in ids {
        let (open_stack, close_of): (&mut Vec<TokenId>, u8) = match list.str(t) {
            "(" => {
                round.push(t);
                expected.push(b'(');
                continue;
            }
            "[" => {
                square.push(t);
                expected.push(b'[');
                continue;
            }
            "{" => {
                curly.push(t);
                expected.push(b'{');
                continue;
            }
            ")" => (&mut round, b'('),
            "]" => (&mut square, b'['),
            "}" => (&mut curly, b'{'),
            _ => continue,
        };
        if expected.pop() != Some(close_of) || open_stack.is_empty() {
            return Err(unmatched(list, t));
        }
        let open = open_stack.pop().expect("expected-kind stack said non-empty");
        link_pair(list, open, t);
    }
    for stack in [&round, &square, &curly] {
        if let Some(&open) = stack.last() {
            return Err(unmatched(list, open));
        }
    }
    Ok(())
}

fn unmatched(list: &TokenList, t: TokenId) -> InternalError {
    InternalError::syntax(format!("Unmatched '{}'.", list.str(t))).at(list.location(t))
}

/// Early `>>` split, before any angle links exist: a `>>` preceded by
/// two pending `<` in the same statement closes two template lists and
/// becomes `> >`. Pass B attaches the links later.
pub fn split_right_angle_brackets(list: &mut TokenList) {
    if !list.is_cpp() {
        return;
    }
    let mut tok = list.head();
    while let Some(t) = tok {
        if !list.is(t, ">>") {
            tok = list.next(t);
            continue;
        }
        let mut depth = 0i32;
        let mut cur = list.prev(t);
        let mut steps = 0;
        let mut split = false;
        while let Some(c) = cur {
            steps += 1;
            if steps > 256 {
                break;
            }
            match list.str(c) {
                ">" => depth -= 1,
                ">>" => depth -= 2,
                "<" => {
                    depth += 1;
                    if depth == 2 {
                        split = true;
                        break;
                    }
                }
                ";" | "{" | "}" | "(" | ")" | "=" | "&&" | "||" => break,
                _ => {}
            }
            cur = list.prev(c);
        }
        if split {
            list.set_str(t, ">");
            let second = list.insert_after(t, ">");
            list.get_mut(second).column = list.get(t).column + 1;
            tok = list.next(second);
            continue;
        }
        tok = list.next(t);
    }
}

/// Whether `<` at `t` may open a template parameter list.
fn angle_opener_ok(list: &TokenList, t: TokenId) -> bool {
    if let Some(n) = list.next(t) {
        if list.is(n, ">") || list.is(n, ">>") {
            return true;
        }
    }
    match list.prev(t) {
        Some(p) => {
            let data = list.get(p);
            data.is_name() && (data.flags.is_template() || data.var_id == 0)
        }
        None => false,
    }
}

/// Whether the token after a candidate `>`/`>>` closer permits reading it
/// as the end of a template parameter list rather than as arithmetic.
fn angle_closer_ok(list: &TokenList, after: Option<TokenId>) -> bool {
    let n = match after {
        Some(n) => n,
        None => return true,
    };
    let data = list.get(n);
    if data.is_name() || data.kind == crate::token::TokenKind::Number {
        return true;
    }
    matches!(
        list.str(n),
        "%" | "," | ";" | "." | "=" | "{" | "::" | "(" | ")" | "[" | "]" | "}" | "..." | ">"
            | ">>" | "&" | "*" | ":"
    )
}

/// Pass B: disambiguate `<...>` as template parameter lists, splitting
/// `>>` when it closes two of them. Candidates are scoped per bracket
/// level and abandoned when an expression shape (`&&`, `||`, bare `;`)
/// rules a template list out; leftover candidates are plain comparisons.
pub fn create_links2(list: &mut TokenList) -> Result<(), InternalError> {
    if !list.is_cpp() {
        return Ok(());
    }
    // Stack of pending `<` candidates interleaved with the surrounding
    // bracket openers; a None entry marks a bracket level.
    let mut stack: Vec<Option<TokenId>> = Vec::new();
    let mut tok = list.head();
    while let Some(t) = tok {
        if list.get(t).link.is_some() && matches!(list.str(t), "(" | "[" | "{") {
            stack.push(None);
        } else if list.get(t).link.is_some() && matches!(list.str(t), ")" | "]" | "}") {
            while matches!(stack.last(), Some(Some(_))) {
                stack.pop();
            }
            stack.pop();
        } else if matches!(list.str(t), ";" | "&&" | "||") {
            while matches!(stack.last(), Some(Some(_))) {
                stack.pop();
            }
        } else if list.is(t, "<") && angle_opener_ok(list, t) {
            stack.push(Some(t));
        } else if list.is(t, ">")
            && matches!(stack.last(), Some(Some(_)))
            && angle_closer_ok(list, list.next(t))
        {
            if let Some(Some(open)) = stack.pop() {
                link_pair(list, open, t);
                if let Some(p) = list.prev(open) {
                    if list.get(p).is_name() {
                        list.get_mut(p).flags.set_template(true);
                    }
                }
            }
        } else if list.is(t, ">>")
            && stack.len() >= 2
            && matches!(&stack[stack.len() - 1], Some(_))
            && matches!(&stack[stack.len() - 2], Some(_))
            && angle_closer_ok(list, list.next(t))
        {
            // `>>` closing two stacked template lists: split in place,
            // keeping the source position on both halves.
            list.set_str(t, ">");
            let second = list.insert_after(t, ">");
            list.get_mut(second).column = list.get(t).column + 1;
            let inner = match stack.pop() {
                Some(Some(open)) => open,
                _ => unreachable!("checked above"),
            };
            let outer = match stack.pop() {
                Some(Some(open)) => open,
                _ => unreachable!("checked above"),
            };
            link_pair(list, inner, t);
            link_pair(list, outer, second);
            tok = list.next(second);
            continue;
        }
        tok = list.next(t);
    }
    Ok(())
}
