use super::{grass_options, CompileError, CompileRequest, CompileResult, Compiler};

/// Modern-API compiler backed by the [`grass`] engine
///
/// grass does not emit source maps, so `map` stays `None` even when the
/// request asks for one; the reconciliation path is engine-agnostic and any
/// map-emitting [`Compiler`] implementation flows through it unchanged.
pub struct GrassCompiler;

impl GrassCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrassCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler for GrassCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<CompileResult, CompileError> {
        let options = grass_options(request);

        match grass::from_string(request.source.clone(), &options) {
            Ok(css) => Ok(CompileResult { css, map: None }),
            Err(error) => Err(CompileError {
                message: error.to_string(),
                formatted: error.to_string(),
                span: None,
            }),
        }
    }
}
