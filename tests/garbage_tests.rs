//! Adversarial inputs must raise structured errors instead of crashing
//! or producing a half-canonical list.

use cpptok::settings::Language;
use cpptok::{ErrorKind, InternalError, NullLogger, Settings, Tokenizer};

fn check_code_lang(code: &str, lang: Language) -> Result<String, InternalError> {
    let settings = Settings::default();
    let mut tokenizer = Tokenizer::new(&settings, lang, Box::new(NullLogger));
    tokenizer.tokenize(code, "garbage.cpp", "")?;
    tokenizer.simplify_tokens1()?;
    Ok(tokenizer.list.stringify())
}

fn check_code(code: &str) -> Result<String, InternalError> {
    check_code_lang(code, Language::Cpp)
}

fn rejects(code: &str) -> InternalError {
    check_code(code).expect_err(code)
}

#[test]
fn unbalanced_brackets() {
    assert_eq!(rejects("void f ( ) {").kind, ErrorKind::Syntax);
    assert_eq!(rejects("int a [ 2 ;").kind, ErrorKind::Syntax);
    assert_eq!(rejects("void f ( ] ;").kind, ErrorKind::Syntax);
}

#[test]
fn if_followed_by_a_macro_name() {
    let err = rejects("void f() { if MACRO(); }");
    assert_eq!(err.kind, ErrorKind::UnknownMacro);
}

#[test]
fn macro_between_condition_and_body() {
    assert_eq!(
        rejects("void f() { if (x) MACRO() {} }").kind,
        ErrorKind::UnknownMacro
    );
    assert_eq!(
        rejects("void f() { if (x) MACRO() else ; }").kind,
        ErrorKind::UnknownMacro
    );
}

#[test]
fn uppercase_call_swallowing_statements() {
    let err = rejects("void f() { INIT(x; y); }");
    assert_eq!(err.kind, ErrorKind::UnknownMacro);
    assert!(err.msg.contains("INIT"), "{}", err.msg);
}

#[test]
fn anonymous_struct_assigned_to() {
    assert_eq!(rejects("struct { int x; } = {0};").kind, ErrorKind::Syntax);
    assert_eq!(rejects("struct { int x; } * = {0};").kind, ErrorKind::Syntax);
}

#[test]
fn malformed_case_labels() {
    assert_eq!(
        rejects("void f() {switch (n) { case: z(); break;}}").kind,
        ErrorKind::Syntax
    );
    assert_eq!(
        rejects("void f() {switch (n) { case;: z(); break;}}").kind,
        ErrorKind::Syntax
    );
    assert_eq!(rejects("switch(){case}").kind, ErrorKind::Syntax);
}

#[test]
fn case_outside_switch() {
    assert_eq!(rejects("void f() { case 1: ; }").kind, ErrorKind::Syntax);
}

#[test]
fn statement_starting_with_assignment() {
    assert_eq!(
        rejects("void f ( ) { = a ; if ( 1 ) { } }").kind,
        ErrorKind::Syntax
    );
}

#[test]
fn unmatched_ternary() {
    assert_eq!(rejects("int b = ( 0 ? ) 1 : 0 ;").kind, ErrorKind::Syntax);
}

#[test]
fn flow_keywords_at_global_scope() {
    assert_eq!(rejects("return 1 ;").kind, ErrorKind::Syntax);
    assert_eq!(rejects("break ;").kind, ErrorKind::Syntax);
    assert_eq!(rejects("continue ;").kind, ErrorKind::Syntax);
}

#[test]
fn keyword_without_its_parenthesis() {
    assert_eq!(
        rejects("void f ( ) { switch break ; }").kind,
        ErrorKind::Syntax
    );
    assert_eq!(
        rejects("void f ( ) { while 1 { } }").kind,
        ErrorKind::Syntax
    );
}

#[test]
fn template_syntax_in_c() {
    let err = check_code_lang("template < typename T > void f ( ) ;", Language::C).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    // `template` is an ordinary identifier in C.
    check_code_lang("int template ;", Language::C).unwrap();
}

#[test]
fn operators_without_operands() {
    assert_eq!(rejects("void f ( ) { x = y / ; }").kind, ErrorKind::Syntax);
    assert_eq!(
        rejects("void f ( ) { x = a + / b ; }").kind,
        ErrorKind::Syntax
    );
}

#[test]
fn wrong_for_header() {
    assert_eq!(
        rejects("void f ( ) { for ( a ; b ) { } }").kind,
        ErrorKind::Syntax
    );
}

#[test]
fn error_location_points_at_the_offender() {
    let err = rejects("void f ( ) {\n  case 1 : ;\n}");
    let loc = err.location.expect("location attached");
    assert_eq!(loc.line, 2);
    assert_eq!(loc.file, "garbage.cpp");
}

#[test]
fn valid_but_odd_code_is_accepted() {
    check_code("( asm : ; void : ) ;").unwrap();
    check_code("void f ( 0 * ) ;").unwrap();
    check_code("void f ( ) { MACRO ( a , b ) ; }").unwrap();
    check_code("int a [ 3 ] = { 1 , 2 , 3 } ;").unwrap();
    check_code("void f ( ) { for ( ; ; ) { break ; } }").unwrap();
}

#[test]
fn errors_do_not_leave_a_corrupt_list() {
    let settings = Settings::default();
    let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
    tokenizer
        .tokenize("void f ( ) { case 1 : ; }", "x.cpp", "")
        .unwrap();
    assert!(tokenizer.simplify_tokens1().is_err());
    tokenizer.list.check_links().unwrap();
}
