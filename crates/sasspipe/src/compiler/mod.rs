mod legacy;
mod modern;

pub use legacy::LegacyGrassCompiler;
pub use modern::GrassCompiler;

use crate::sourcemap::SourceMap;
use futures::future::{self, BoxFuture, FutureExt};
use std::path::PathBuf;
use thiserror::Error;

/// Placeholder the legacy API uses for content piped in rather than read
/// from disk
pub const STDIN_PLACEHOLDER: &str = "stdin";

/// Placeholder the legacy API assigns as the map's own file name
pub const STDOUT_PLACEHOLDER: &str = "stdout";

/// Concrete syntax of the input text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Scss,
    /// Whitespace-significant variant, selected by the `.sass` extension
    Indented,
    Css,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

/// Options for one compilation, built fresh per file and never shared
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub source: String,

    /// Path of the file being compiled, used for import resolution and as
    /// the fallback error location
    pub path: PathBuf,

    pub syntax: Syntax,

    /// Directories consulted for imports; the file's own directory is
    /// always first
    pub load_paths: Vec<PathBuf>,

    pub source_map: bool,
    pub source_map_include_sources: bool,
    pub style: OutputStyle,
}

/// Source map in the shape native to the compiler variant that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum MapPayload {
    /// Modern API: a structured map object
    Structured(SourceMap),
    /// Legacy API: serialized JSON that still needs parsing
    Serialized(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub css: String,
    pub map: Option<MapPayload>,
}

/// Location of a compiler diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// File URL or path; `stdin` when the failing content was piped in
    pub url: Option<String>,
    pub line: u32,
    pub column: u32,
}

/// A rejected compilation
///
/// `message` is the compiler's own diagnostic verbatim; `formatted` is the
/// multi-line explanation meant for display.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub formatted: String,
    pub span: Option<Span>,
}

/// One generation of the compiler API
///
/// The modern and legacy variants differ in option and result shapes; both
/// are driven by the same transform controller through this trait.
pub trait Compiler: Send + Sync {
    fn compile(&self, request: &CompileRequest) -> Result<CompileResult, CompileError>;

    /// Deferred compilation; the default defers to the synchronous entry
    /// point with an already-settled future
    fn compile_async<'a>(
        &'a self,
        request: &'a CompileRequest,
    ) -> BoxFuture<'a, Result<CompileResult, CompileError>> {
        future::ready(self.compile(request)).boxed()
    }
}

/// Translate canonical request options into the grass engine's options
pub(crate) fn grass_options(request: &CompileRequest) -> grass::Options<'static> {
    let mut options = grass::Options::default()
        .style(match request.style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        })
        .input_syntax(match request.syntax {
            Syntax::Scss => grass::InputSyntax::Scss,
            Syntax::Indented => grass::InputSyntax::Sass,
            Syntax::Css => grass::InputSyntax::Css,
        });

    for path in &request.load_paths {
        options = options.load_path(path.as_path());
    }

    options
}
