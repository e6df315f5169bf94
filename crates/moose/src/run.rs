//! Public interface for running Moose code.

use crate::{
    ast::Program,
    check::check,
    error::{CompileErrors, Panic},
    interpret,
    io::PrintWriter,
    lex::lex,
    object::Globals,
    parse::parse,
    resource::ResourceLimits,
    tracer::{EvalTracer, NoopTracer},
    types::Type,
};

/// Primary interface for running Moose code.
///
/// `Runner::new` performs the whole compile half of the pipeline: lexing,
/// parsing, global exploration, class flattening and type checking. All
/// compile errors are collected and returned together. A successful
/// `Runner` can be run any number of times; each `run` call owns a fresh
/// global environment.
///
/// # Example
/// ```
/// use moose::{NoPrint, Object, Runner};
///
/// let runner = Runner::new("mut a = 1\na = a + 2", "test.moose").unwrap();
/// let globals = runner.run(&mut NoPrint).unwrap();
/// assert_eq!(globals.get("a"), Some(&Object::Int(3)));
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Runner {
    script_name: String,
    code: String,
    program: Program,
    /// Expression types recorded by the checker, indexed by `ExprId`.
    expr_types: Vec<Option<Type>>,
}

impl Runner {
    /// Compiles `code`, reporting every collected error on failure.
    ///
    /// # Errors
    /// Returns `CompileErrors` when lexing, parsing, exploration,
    /// flattening or type checking fails.
    pub fn new(code: &str, script_name: &str) -> Result<Self, CompileErrors> {
        let (tokens, mut errors) = lex(code);
        let (program, parse_errors) = parse(tokens);
        errors.extend(parse_errors);
        if !errors.is_empty() {
            return Err(CompileErrors::new(script_name, errors));
        }
        match check(&program) {
            Ok(expr_types) => Ok(Self {
                script_name: script_name.to_owned(),
                code: code.to_owned(),
                program,
                expr_types,
            }),
            Err(errors) => Err(CompileErrors::new(script_name, errors)),
        }
    }

    /// The source code this runner was compiled from.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Evaluates the program with default limits and no tracing,
    /// returning a snapshot of the final global environment.
    ///
    /// # Errors
    /// Returns the `Panic` (with its accumulated trace) when the program
    /// panics at run time.
    pub fn run(&self, print: &mut impl PrintWriter) -> Result<Globals, Box<Panic>> {
        self.run_with(print, &mut NoopTracer, ResourceLimits::default())
    }

    /// Evaluates the program with explicit limits and an observer.
    pub fn run_with(
        &self,
        print: &mut impl PrintWriter,
        tracer: &mut impl EvalTracer,
        limits: ResourceLimits,
    ) -> Result<Globals, Box<Panic>> {
        interpret::run(&self.program, &self.expr_types, print, tracer, limits)
    }

    /// Serializes the compiled program to a binary format, so hosts can
    /// cache it and skip re-compilation with [`Runner::load`].
    ///
    /// # Errors
    /// Returns an error when serialization fails.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Restores a runner serialized with [`Runner::dump`].
    ///
    /// # Errors
    /// Returns an error when the bytes are not a valid dump.
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
