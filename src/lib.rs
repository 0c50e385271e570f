#![deny(clippy::all, clippy::pedantic, clippy::perf, clippy::suspicious)] // Catch correctness + perf + suspicious patterns early.
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

//! Lock guard verification for compilers that accept `@GuardedBy` annotations.
//!
//! The host compiler supplies a [`frontend::ast::CompilationUnit`]; the
//! [`lint::Scanner`] runs the registered checks over it and returns lint
//! diagnostics, or pushes them into a [`diagnostics::DiagnosticSink`].

pub mod diagnostics;
pub mod error;
pub mod frontend;
pub mod guard;
pub mod lint;
pub mod logging;

pub use error::{Error, Result};
