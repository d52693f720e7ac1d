use crate::sourcemap::SourceMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File extension given to every compiled output, regardless of input syntax
pub const OUTPUT_EXTENSION: &str = "css";

/// Body of a pipeline file
///
/// Upstream stages may hand over files that were already consumed (`Null`),
/// files backed by a stream we refuse to read (`Stream`), or fully buffered
/// contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    Null,
    Stream,
    Buffer(Vec<u8>),
}

/// Filesystem timestamps carried along with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl FileStat {
    /// Timestamps all set to the current time
    pub fn now() -> Self {
        let now = SystemTime::now();
        Self { atime: now, mtime: now, ctime: now }
    }
}

/// A mutable file record travelling through the pipeline
///
/// The stage mutates `path`, `contents` and `source_map` in place and
/// re-emits the same record downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Absolute path; rewritten to the output extension after compilation
    pub path: PathBuf,

    /// Directory against which `relative()` is computed
    pub base: PathBuf,

    pub contents: Contents,

    /// Source map attached by an upstream stage; its presence requests map
    /// generation from the compiler
    pub source_map: Option<SourceMap>,

    pub stat: Option<FileStat>,
}

impl SourceFile {
    /// A file with buffered contents
    pub fn buffer(
        path: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: Contents::Buffer(contents.into()),
            source_map: None,
            stat: None,
        }
    }

    /// A file whose contents were already consumed upstream
    pub fn null(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: Contents::Null,
            source_map: None,
            stat: None,
        }
    }

    /// A file backed by a streaming body
    pub fn stream(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: Contents::Stream,
            source_map: None,
            stat: None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream)
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self.contents, Contents::Buffer(_))
    }

    /// Path relative to `base`; falls back to the full path when the file
    /// lies outside its own base
    pub fn relative(&self) -> PathBuf {
        self.path.strip_prefix(&self.base).unwrap_or(&self.path).to_path_buf()
    }
}

/// Replace the final extension of a path (`foo.scss` becomes `foo.css`)
pub fn replace_ext(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}

/// Express `path` relative to `base` when it lies underneath it
///
/// Paths outside `base` are returned unchanged rather than rewritten with
/// `..` segments; a map source resolved from a caller load path therefore
/// keeps its absolute form.
pub fn relative_from(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}
