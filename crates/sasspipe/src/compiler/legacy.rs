use super::{
    grass_options, CompileError, CompileRequest, CompileResult, Compiler, Span, STDIN_PLACEHOLDER,
};

/// Legacy-API compiler backed by the same [`grass`] engine
///
/// Differs from the modern variant only in its wire shapes: maps come back
/// as serialized JSON, errors carry a file/line/column triple with the
/// `stdin` placeholder for piped-in content. Like the modern variant it
/// emits no map of its own.
pub struct LegacyGrassCompiler;

impl LegacyGrassCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LegacyGrassCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler for LegacyGrassCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<CompileResult, CompileError> {
        let options = grass_options(request);

        match grass::from_string(request.source.clone(), &options) {
            Ok(css) => Ok(CompileResult { css, map: None }),
            Err(error) => {
                let message = error.to_string();
                // The legacy API reports the failing file as `stdin` because
                // the source text is handed over inline.
                Err(CompileError {
                    formatted: format!("Error: {message}"),
                    message,
                    span: Some(Span {
                        url: Some(STDIN_PLACEHOLDER.to_string()),
                        line: 0,
                        column: 0,
                    }),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{OutputStyle, Syntax};
    use std::path::PathBuf;

    fn request(source: &str) -> CompileRequest {
        CompileRequest {
            source: source.to_string(),
            path: PathBuf::from("/work/test.scss"),
            syntax: Syntax::Scss,
            load_paths: Vec::new(),
            source_map: false,
            source_map_include_sources: false,
            style: OutputStyle::Expanded,
        }
    }

    #[test]
    fn test_compiles_like_modern_variant() {
        let compiler = LegacyGrassCompiler::new();
        let result = compiler.compile(&request(".a { .b { color: #000; } }")).unwrap();
        assert!(result.css.contains(".a .b"));
    }

    #[test]
    fn test_error_location_uses_stdin_placeholder() {
        let compiler = LegacyGrassCompiler::new();
        let error = compiler.compile(&request("a { color: red\n")).unwrap_err();
        let span = error.span.unwrap();
        assert_eq!(span.url.as_deref(), Some(STDIN_PLACEHOLDER));
        assert!(error.formatted.starts_with("Error: "));
    }
}
