//! Pipeline stage that compiles SCSS/Sass files and reconciles their
//! source maps with the consuming pipeline's path conventions.
//!
//! The stage classifies each incoming [`SourceFile`] (pass through, drop,
//! or compile), dispatches to a [`Compiler`] variant synchronously or
//! asynchronously, rewrites the resulting source map so its sources point
//! at the originally-authored files, and converts compiler failures into
//! structured [`SassError`] diagnostics anchored to the failing location.

pub mod cli;
pub mod compiler;
pub mod error;
pub mod file;
mod reconcile;
pub mod sourcemap;
pub mod transform;

pub use compiler::{
    CompileError, CompileRequest, CompileResult, Compiler, GrassCompiler, LegacyGrassCompiler,
    MapPayload, OutputStyle, Span, Syntax,
};
pub use error::{log_error, strip_ansi, SassError, StageSignal, PLUGIN_NAME};
pub use file::{replace_ext, Contents, FileStat, SourceFile, OUTPUT_EXTENSION};
pub use sourcemap::{apply_source_map, SourceMap};
pub use transform::{
    legacy, legacy_sync, sass, sass_sync, DispatchMode, ErrorAction, LegacySassOptions,
    SassOptions, SassStage, StageEvent, StageOutput,
};
