//! Typedef and using-alias expansion through the whole pipeline.

use cpptok::settings::Language;
use cpptok::{NullLogger, Settings, Tokenizer};

fn canonical(code: &str) -> String {
    let settings = Settings::default();
    let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
    tokenizer.tokenize(code, "test.cpp", "").unwrap();
    assert!(tokenizer.simplify_tokens1().unwrap());
    tokenizer.list.stringify()
}

#[test]
fn simple_typedef_expands_at_every_use() {
    assert_eq!(
        canonical("typedef unsigned long size_type; size_type n; size_type m;"),
        "unsigned long n ; unsigned long m ;"
    );
}

#[test]
fn template_typedef_expands_before_angle_links_exist() {
    assert_eq!(
        canonical("typedef std::pair<int,int> point; point p;"),
        "std :: pair < int , int > p ;"
    );
}

#[test]
fn array_typedef_expands_with_dimensions() {
    assert_eq!(canonical("typedef int four[4]; four a;"), "int a [ 4 ] ;");
}

#[test]
fn function_pointer_typedef_expands_both_ways() {
    assert_eq!(
        canonical("typedef void (*cb)(int); cb handler;"),
        "void ( * handler ) ( int ) ;"
    );
    assert_eq!(
        canonical("typedef void (*cb)(int); void g() { h = (cb)p; }"),
        "void g ( ) { h = ( void ( * ) ( int ) ) p ; }"
    );
}

#[test]
fn using_alias_behaves_like_typedef() {
    assert_eq!(
        canonical("using word = unsigned short; word w;"),
        "unsigned short w ;"
    );
}

#[test]
fn qualified_using_declaration_is_substituted() {
    assert_eq!(canonical("using a::b; b x;"), "a :: b x ;");
}

#[test]
fn chained_aliases_reach_the_base_type() {
    assert_eq!(
        canonical("typedef int base; typedef base level2; level2 v;"),
        "int v ;"
    );
    assert_eq!(
        canonical("using one = int; using two = one; two v;"),
        "int v ;"
    );
}

#[test]
fn hoisted_struct_typedef_matches_the_documented_shape() {
    assert_eq!(
        canonical("typedef struct { int x; } S; S v;"),
        "struct Unnamed1 { int x ; } ; typedef struct Unnamed1 S ; struct Unnamed1 v ;"
    );
}

#[test]
fn two_anonymous_aggregates_get_distinct_names() {
    let out = canonical("typedef struct { int x; } A; typedef struct { int y; } B; A a; B b;");
    assert!(out.contains("struct Unnamed1 { int x ; }"), "{}", out);
    assert!(out.contains("struct Unnamed2 { int y ; }"), "{}", out);
    assert!(out.contains("struct Unnamed1 a ;"), "{}", out);
    assert!(out.contains("struct Unnamed2 b ;"), "{}", out);
}

#[test]
fn qualification_is_minimal_at_the_use_site() {
    let out = canonical("typedef a::b::C T; namespace a { namespace b { T y; } T z; }");
    assert!(out.contains("C y ;"), "{}", out);
    assert!(out.contains("b :: C z ;"), "{}", out);
    assert!(!out.contains("a :: b :: C y"), "{}", out);
}

#[test]
fn typedef_shadowed_by_local_variable() {
    assert_eq!(
        canonical("typedef int T; void f() { char T; T = 0; }"),
        "void f ( ) { char T ; T = 0 ; }"
    );
}

#[test]
fn member_function_scoped_uses_expand() {
    assert_eq!(
        canonical("struct X { typedef int T; T a; }; X::T b;"),
        "struct X { int a ; } ; int b ;"
    );
}

#[test]
fn typedef_info_reports_usage() {
    let settings = Settings::default();
    let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
    tokenizer
        .tokenize("typedef int used_t; used_t x; typedef int unused_t;", "t.cpp", "")
        .unwrap();
    tokenizer.simplify_tokens1().unwrap();
    let used = tokenizer
        .typedef_info()
        .iter()
        .find(|i| i.name == "used_t")
        .unwrap();
    assert!(used.used);
    let unused = tokenizer
        .typedef_info()
        .iter()
        .find(|i| i.name == "unused_t")
        .unwrap();
    assert!(!unused.used);
    assert_eq!(used.file, "t.cpp");
}

#[test]
fn expansion_is_idempotent() {
    let once = canonical("typedef struct { int x; } S; S v; typedef char *str; str s;");
    let settings = Settings::default();
    let mut second = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
    second.tokenize(&once, "again.cpp", "").unwrap();
    second.simplify_tokens1().unwrap();
    assert_eq!(second.list.stringify(), once);
}
