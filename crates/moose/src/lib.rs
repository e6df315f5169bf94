#![doc = include_str!("../../../README.md")]

mod ast;
mod builtins;
mod check;
mod classes;
mod error;
mod explore;
mod interpret;
mod io;
mod lex;
mod object;
mod parse;
mod resolve;
mod resource;
mod run;
mod scope;
mod token;
mod tracer;
mod types;
mod value;

pub use crate::{
    error::{CodeLoc, CompileError, CompileErrors, Panic, PanicKind, TraceFrame},
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    object::{Globals, Object},
    resource::{DEFAULT_MAX_RECURSION_DEPTH, ResourceLimits},
    run::Runner,
    tracer::{EvalTracer, NoopTracer, RecordingTracer},
};
