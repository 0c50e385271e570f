//! Host compiler surface: the syntax tree and the symbol queries the guard engine relies on.

pub mod ast;
pub mod symbols;

pub use symbols::{MemberLookup, SymbolTable};
