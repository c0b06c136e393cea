//! cpptok turns preprocessed C/C++ source into a canonical,
//! analysis-ready token list: a doubly-linked token sequence with
//! bracket links, variable identities, scope information, simplified
//! syntactic sugar, and an expression AST attached at each operator.
//!
//! The pipeline is `tokenize` → [`Tokenizer::simplify_tokens1`] →
//! (on demand) [`Tokenizer::simplify_tokens2`]. Downstream analyses
//! consume the resulting [`TokenList`] read-only, or as an XML dump.
//!
//! ```
//! use cpptok::{NullLogger, Settings, Tokenizer};
//! use cpptok::settings::Language;
//!
//! let settings = Settings::default();
//! let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
//! tokenizer.tokenize("int a=3, *b=&a;", "example.cpp", "").unwrap();
//! assert!(tokenizer.simplify_tokens1().unwrap());
//! assert_eq!(tokenizer.list.stringify(), "int a = 3 ; int * b = & a ;");
//! ```
//!
//! One `TokenList` is owned by one thread for its lifetime; parallel
//! analysis runs one independent tokenizer per worker. Cancellation is
//! cooperative through [`Cancel`], checked at phase boundaries and
//! inside the expensive expander loops.

pub mod astbuild;
pub mod dump;
pub mod error;
pub mod garbage;
pub mod intern;
pub mod library;
pub mod linker;
pub mod matcher;
pub mod scope;
pub mod settings;
pub mod simplify;
pub mod token;
pub mod tokenizer;
pub mod tokenlist;
pub mod typedef;
pub mod using;
pub mod varid;

pub use error::{Certainty, ErrorKind, ErrorLogger, ErrorMessage, FileLocation, InternalError, NullLogger, Severity};
pub use library::Library;
pub use matcher::Matcher;
pub use settings::{Platform, Settings, Standards};
pub use token::{TokenData, TokenFlags, TokenId, TokenKind, TokenValue};
pub use tokenizer::{Cancel, ReportProgress, Tokenizer};
pub use tokenlist::{RawToken, TokenList};
pub use typedef::TypedefInfo;
