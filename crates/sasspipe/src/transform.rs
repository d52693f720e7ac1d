use crate::compiler::{
    CompileRequest, Compiler, GrassCompiler, LegacyGrassCompiler, OutputStyle, Syntax,
};
use crate::error::{self, SassError, StageSignal};
use crate::file::{replace_ext, Contents, SourceFile, OUTPUT_EXTENSION};
use crate::reconcile;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Files whose base name starts with this marker are partials, meant only
/// for inclusion via import, and are dropped without output
const PARTIAL_MARKER: char = '_';

const INDENTED_EXTENSION: &str = "sass";

/// Caller options for the modern compiler API
#[derive(Debug, Clone, Default)]
pub struct SassOptions {
    pub load_paths: Vec<PathBuf>,
    pub style: OutputStyle,
}

/// Caller options for the legacy compiler API
#[derive(Debug, Clone, Default)]
pub struct LegacySassOptions {
    pub include_paths: Vec<PathBuf>,
    /// Force the indented syntax regardless of extension
    pub indented_syntax: bool,
    pub output_style: OutputStyle,
}

/// Whether the stage runner dispatches compilations inline or concurrently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Sync,
    Async,
}

/// Outcome of transforming one file: either a file to emit or a deliberate
/// no-emission (partials)
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    File(SourceFile),
    Dropped,
}

/// Event on a running stage's output channel
#[derive(Debug, Clone)]
pub enum StageEvent {
    File(SourceFile),
    Error(SassError),
    End,
}

/// Handler consulted for every propagated error; returning
/// [`StageSignal::End`] closes the stream instead of forwarding the error
pub type ErrorAction = Arc<dyn Fn(&SassError) -> StageSignal + Send + Sync>;

enum Action {
    PassThrough,
    Drop,
    Compile(CompileRequest),
}

/// A single-item stream stage: classifies each incoming file, dispatches it
/// to the compiler, and routes the outcome onward
///
/// No state is shared between files; every compilation gets an independent
/// copy of the caller options.
pub struct SassStage {
    compiler: Arc<dyn Compiler>,
    load_paths: Vec<PathBuf>,
    style: OutputStyle,
    forced_indented: bool,
    mode: DispatchMode,
}

/// Modern API, asynchronous mode
pub fn sass(options: SassOptions) -> SassStage {
    SassStage::with_compiler(Arc::new(GrassCompiler::new()), options, DispatchMode::Async)
}

/// Modern API, synchronous mode
pub fn sass_sync(options: SassOptions) -> SassStage {
    SassStage::with_compiler(Arc::new(GrassCompiler::new()), options, DispatchMode::Sync)
}

/// Legacy API, asynchronous mode
pub fn legacy(options: LegacySassOptions) -> SassStage {
    SassStage::legacy_with_compiler(Arc::new(LegacyGrassCompiler::new()), options, DispatchMode::Async)
}

/// Legacy API, synchronous mode
pub fn legacy_sync(options: LegacySassOptions) -> SassStage {
    SassStage::legacy_with_compiler(Arc::new(LegacyGrassCompiler::new()), options, DispatchMode::Sync)
}

impl SassStage {
    /// Stage over an arbitrary modern-shaped compiler
    pub fn with_compiler(
        compiler: Arc<dyn Compiler>,
        options: SassOptions,
        mode: DispatchMode,
    ) -> Self {
        Self {
            compiler,
            load_paths: options.load_paths,
            style: options.style,
            forced_indented: false,
            mode,
        }
    }

    /// Stage over an arbitrary legacy-shaped compiler
    pub fn legacy_with_compiler(
        compiler: Arc<dyn Compiler>,
        options: LegacySassOptions,
        mode: DispatchMode,
    ) -> Self {
        Self {
            compiler,
            load_paths: options.include_paths,
            style: options.output_style,
            forced_indented: options.indented_syntax,
            mode,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Classify one incoming file; mutates the file only for the empty
    /// buffer short-circuit
    fn classify(&self, file: &mut SourceFile) -> Result<Action, SassError> {
        if file.is_null() {
            return Ok(Action::PassThrough);
        }

        if file.is_stream() {
            return Err(SassError::streaming());
        }

        let bytes = match &file.contents {
            Contents::Buffer(bytes) => bytes,
            _ => return Ok(Action::PassThrough),
        };

        let base_name = file.path.file_name().and_then(|name| name.to_str()).unwrap_or("");
        if base_name.starts_with(PARTIAL_MARKER) {
            return Ok(Action::Drop);
        }

        if bytes.is_empty() {
            // Nothing to compile, but consumers key on the extension
            file.path = replace_ext(&file.path, OUTPUT_EXTENSION);
            return Ok(Action::PassThrough);
        }

        Ok(Action::Compile(self.request_for(file, bytes)))
    }

    /// Build the per-file compile request from a fresh copy of the caller
    /// options
    fn request_for(&self, file: &SourceFile, bytes: &[u8]) -> CompileRequest {
        let indented = self.forced_indented
            || file.path.extension().and_then(|ext| ext.to_str()) == Some(INDENTED_EXTENSION);

        // The file's own directory goes first so relative imports resolve
        // from the file's location
        let mut load_paths = Vec::with_capacity(self.load_paths.len() + 1);
        if let Some(parent) = file.path.parent() {
            load_paths.push(parent.to_path_buf());
        }
        load_paths.extend(self.load_paths.iter().cloned());

        let wants_map = file.source_map.is_some();

        CompileRequest {
            source: String::from_utf8_lossy(bytes).into_owned(),
            path: file.path.clone(),
            syntax: if indented { Syntax::Indented } else { Syntax::Scss },
            load_paths,
            source_map: wants_map,
            source_map_include_sources: wants_map,
            style: self.style,
        }
    }

    /// Transform one file through the synchronous compiler entry point
    pub fn transform(&self, mut file: SourceFile) -> Result<StageOutput, SassError> {
        match self.classify(&mut file)? {
            Action::PassThrough => Ok(StageOutput::File(file)),
            Action::Drop => Ok(StageOutput::Dropped),
            Action::Compile(request) => match self.compiler.compile(&request) {
                Ok(result) => {
                    reconcile::handle_file(&mut file, result)?;
                    Ok(StageOutput::File(file))
                }
                Err(compile_error) => Err(error::normalize(compile_error, &file)),
            },
        }
    }

    /// Transform one file, suspending at the compiler call boundary
    pub async fn transform_async(&self, mut file: SourceFile) -> Result<StageOutput, SassError> {
        match self.classify(&mut file)? {
            Action::PassThrough => Ok(StageOutput::File(file)),
            Action::Drop => Ok(StageOutput::Dropped),
            Action::Compile(request) => match self.compiler.compile_async(&request).await {
                Ok(result) => {
                    reconcile::handle_file(&mut file, result)?;
                    Ok(StageOutput::File(file))
                }
                Err(compile_error) => Err(error::normalize(compile_error, &file)),
            },
        }
    }

    /// Run the stage over channels, forwarding every error as an event
    pub fn spawn(self) -> (mpsc::Sender<SourceFile>, mpsc::Receiver<StageEvent>) {
        self.spawn_with(Arc::new(|_| StageSignal::Continue))
    }

    /// Run the stage over channels with a custom error handler
    ///
    /// Exactly one event is emitted per surviving input, and `End` is only
    /// sent once every accepted file has settled. Synchronous mode
    /// preserves arrival order; asynchronous mode compiles files
    /// concurrently and emits in completion order. A handler returning
    /// [`StageSignal::End`] closes the stream immediately; files still in
    /// flight at that point are abandoned.
    pub fn spawn_with(
        self,
        on_error: ErrorAction,
    ) -> (mpsc::Sender<SourceFile>, mpsc::Receiver<StageEvent>) {
        let (input_tx, mut input_rx) = mpsc::channel::<SourceFile>(16);
        let (output_tx, output_rx) = mpsc::channel::<StageEvent>(16);

        let stage = Arc::new(self);

        tokio::spawn(async move {
            let mut in_flight: JoinSet<Result<StageOutput, SassError>> = JoinSet::new();
            let mut accepting = true;

            loop {
                tokio::select! {
                    incoming = input_rx.recv(), if accepting => {
                        match incoming {
                            Some(file) => match stage.mode {
                                DispatchMode::Sync => {
                                    let event = route(stage.transform(file), &on_error);
                                    if forward(event, &output_tx).await == Flow::Stop {
                                        return;
                                    }
                                }
                                DispatchMode::Async => {
                                    let stage = Arc::clone(&stage);
                                    in_flight
                                        .spawn(async move { stage.transform_async(file).await });
                                }
                            },
                            None => accepting = false,
                        }
                    }
                    Some(settled) = in_flight.join_next() => {
                        let Ok(outcome) = settled else { continue };
                        let event = route(outcome, &on_error);
                        if forward(event, &output_tx).await == Flow::Stop {
                            return;
                        }
                    }
                    else => break,
                }
            }

            let _ = output_tx.send(StageEvent::End).await;
        });

        (input_tx, output_rx)
    }
}

/// Map one transform outcome to at most one output event
fn route(outcome: Result<StageOutput, SassError>, on_error: &ErrorAction) -> Option<StageEvent> {
    match outcome {
        Ok(StageOutput::File(file)) => Some(StageEvent::File(file)),
        Ok(StageOutput::Dropped) => None,
        Err(error) => match on_error(&error) {
            StageSignal::Continue => Some(StageEvent::Error(error)),
            StageSignal::End => Some(StageEvent::End),
        },
    }
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Forward at most one routed event; `End` and a closed output channel both
/// stop the runner
async fn forward(event: Option<StageEvent>, output: &mpsc::Sender<StageEvent>) -> Flow {
    match event {
        Some(StageEvent::End) => {
            let _ = output.send(StageEvent::End).await;
            Flow::Stop
        }
        Some(event) => {
            if output.send(event).await.is_err() {
                Flow::Stop
            } else {
                Flow::Continue
            }
        }
        None => Flow::Continue,
    }
}
