//! XML dump of the canonical token list, emitted only on request. One
//! `<token/>` element per token; attributes with no value are omitted so
//! the dump stays diffable.

use std::fmt::Write;

use crate::token::{TokenId, TokenKind};
use crate::tokenlist::TokenList;

fn escape(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

fn handle(id: TokenId) -> String {
    format!("tok{}", id.index())
}

fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Name => "name",
        TokenKind::Number => "number",
        TokenKind::String => "string",
        TokenKind::Char => "char",
        TokenKind::Boolean => "boolean",
        TokenKind::Op => "op",
        TokenKind::Bracket => "bracket",
        TokenKind::Keyword => "keyword",
        TokenKind::Other => "other",
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape(value, out);
    out.push('"');
}

fn push_flag(out: &mut String, name: &str, on: bool) {
    if on {
        push_attr(out, name, "true");
    }
}

/// Serialize the whole list as one `<tokenlist>` element.
pub fn dump(list: &TokenList, out: &mut String) -> std::fmt::Result {
    writeln!(out, "  <tokenlist>")?;
    for t in list.iter() {
        let data = list.get(t);
        out.push_str("    <token");
        push_attr(out, "id", &handle(t));
        push_attr(out, "file", list.file_path(data.file));
        push_attr(out, "linenr", &data.line.to_string());
        push_attr(out, "column", &data.column.to_string());
        push_attr(out, "str", list.str(t));
        if let Some(scope) = data.scope {
            push_attr(out, "scope", &format!("scope{}", scope.index()));
        }
        push_attr(out, "type", kind_name(data.kind));
        push_flag(out, "isUnsigned", data.flags.is_unsigned());
        push_flag(out, "isSigned", data.flags.is_signed());
        if data.kind == TokenKind::Number {
            let s = list.str(t);
            let float = s.contains('.')
                || (!s.starts_with("0x") && !s.starts_with("0X") && s.contains(['e', 'E']));
            push_flag(out, "isInt", !float);
            push_flag(out, "isFloat", float);
        }
        push_flag(out, "isExpandedMacro", data.flags.is_expanded_macro());
        push_flag(out, "isImplicitInt", data.flags.is_implicit_int());
        if let Some(link) = data.link {
            push_attr(out, "link", &handle(link));
        }
        if data.var_id != 0 {
            push_attr(out, "varId", &data.var_id.to_string());
        }
        if !data.values.is_empty() {
            let values: Vec<String> = data
                .values
                .iter()
                .map(|v| v.int_value.to_string())
                .collect();
            push_attr(out, "values", &values.join(","));
        }
        if let Some(p) = data.ast_parent {
            push_attr(out, "astParent", &handle(p));
        }
        if let Some(p) = data.ast_op1 {
            push_attr(out, "astOperand1", &handle(p));
        }
        if let Some(p) = data.ast_op2 {
            push_attr(out, "astOperand2", &handle(p));
        }
        if let Some(orig) = data.original_sym {
            push_attr(out, "originalName", list.resolve(orig));
        }
        out.push_str("/>\n");
    }
    writeln!(out, "  </tokenlist>")?;
    Ok(())
}
