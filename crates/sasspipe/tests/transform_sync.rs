use sasspipe::{
    sass_sync, CompileError, CompileRequest, CompileResult, Compiler, Contents, DispatchMode,
    SassOptions, SassStage, SourceFile, Span, StageOutput,
};
use std::path::Path;
use std::sync::Arc;

fn buffer_file(name: &str, contents: &str) -> SourceFile {
    SourceFile::buffer(format!("/work/src/{name}"), "/work/src", contents.as_bytes().to_vec())
}

/// Always answers with the same scripted outcome
struct ScriptedCompiler {
    outcome: Result<CompileResult, CompileError>,
}

impl Compiler for ScriptedCompiler {
    fn compile(&self, _request: &CompileRequest) -> Result<CompileResult, CompileError> {
        self.outcome.clone()
    }
}

fn scripted_stage(outcome: Result<CompileResult, CompileError>) -> SassStage {
    SassStage::with_compiler(
        Arc::new(ScriptedCompiler { outcome }),
        SassOptions::default(),
        DispatchMode::Sync,
    )
}

#[test]
fn passes_null_files_through_unchanged() {
    let stage = sass_sync(SassOptions::default());
    let file = SourceFile::null("/work/src/a.scss", "/work/src");

    let output = stage.transform(file.clone()).unwrap();

    assert_eq!(output, StageOutput::File(file));
}

#[test]
fn rejects_streaming_files() {
    let stage = sass_sync(SassOptions::default());
    let file = SourceFile::stream("/work/src/a.scss", "/work/src");

    let error = stage.transform(file).unwrap_err();

    assert_eq!(error.message, "Streaming not supported");
}

#[test]
fn drops_partial_files_without_output_or_error() {
    let stage = sass_sync(SassOptions::default());
    let file = buffer_file("_partial.scss", "$c: red;");

    assert_eq!(stage.transform(file).unwrap(), StageOutput::Dropped);
}

#[test]
fn empty_files_only_get_their_extension_rewritten() {
    let stage = sass_sync(SassOptions::default());
    let file = buffer_file("empty.scss", "");

    let output = stage.transform(file).unwrap();

    let StageOutput::File(file) = output else { panic!("expected a file") };
    assert_eq!(file.path, Path::new("/work/src/empty.css"));
    assert_eq!(file.contents, Contents::Buffer(Vec::new()));
}

#[test]
fn compiles_a_single_scss_file() {
    let stage = sass_sync(SassOptions::default());
    let file = buffer_file("nested.scss", ".a { .b { color: red; } }");

    let StageOutput::File(file) = stage.transform(file).unwrap() else {
        panic!("expected a file")
    };

    assert_eq!(file.path, Path::new("/work/src/nested.css"));
    let Contents::Buffer(bytes) = &file.contents else { panic!("expected buffered output") };
    assert!(String::from_utf8_lossy(bytes).contains(".a .b"));
}

#[test]
fn whitespace_and_comment_only_input_compiles_to_empty_output() {
    let stage = sass_sync(SassOptions::default());
    let file = buffer_file("comments.scss", "// just a comment\n\n  \n");

    let StageOutput::File(file) = stage.transform(file).unwrap() else {
        panic!("expected a file")
    };

    assert_eq!(file.contents, Contents::Buffer(Vec::new()));
}

#[test]
fn compiles_indented_syntax_by_extension() {
    let stage = sass_sync(SassOptions::default());
    let file = buffer_file("plain.sass", "a\n  color: red\n");

    let StageOutput::File(file) = stage.transform(file).unwrap() else {
        panic!("expected a file")
    };

    let Contents::Buffer(bytes) = &file.contents else { panic!("expected buffered output") };
    assert!(String::from_utf8_lossy(bytes).contains("color: red"));
    assert_eq!(file.path, Path::new("/work/src/plain.css"));
}

#[test]
fn renamed_files_keep_their_new_name() {
    let stage = sass_sync(SassOptions::default());
    let mut file = buffer_file("original.scss", "a { color: red; }");
    file.path = "/work/src/renamed.scss".into();

    let StageOutput::File(file) = stage.transform(file).unwrap() else {
        panic!("expected a file")
    };

    assert_eq!(file.path, Path::new("/work/src/renamed.css"));
}

#[test]
fn compile_failures_carry_the_original_diagnostic() {
    let stage = scripted_stage(Err(CompileError {
        message: "expected \"{\".\n  ╷\n2 │ color red;\n  ╵\n  error.scss 2:20  root stylesheet"
            .to_string(),
        formatted:
            "Error: expected \"{\".\n  ╷\n2 │ color red;\n  ╵\n  error.scss 2:20  root stylesheet"
                .to_string(),
        span: Some(Span { url: None, line: 2, column: 20 }),
    }));

    let error = stage.transform(buffer_file("error.scss", "a\n  color red;")).unwrap_err();

    assert!(error.message_original.contains("2:20  root stylesheet"));
    assert!(error.message_original.contains("expected"));
    assert!(error.message.contains("error.scss"));
    assert!(error.relative_path.ends_with("error.scss"));
}

#[test]
fn exactly_one_outcome_per_file() {
    let stage = sass_sync(SassOptions::default());

    let good = stage.transform(buffer_file("a.scss", "a { color: red; }"));
    let dropped = stage.transform(buffer_file("_b.scss", "a { color: red; }"));
    let empty = stage.transform(buffer_file("c.scss", ""));

    assert!(matches!(good, Ok(StageOutput::File(_))));
    assert!(matches!(dropped, Ok(StageOutput::Dropped)));
    assert!(matches!(empty, Ok(StageOutput::File(_))));
}
