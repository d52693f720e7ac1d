use crate::compiler::{CompileResult, MapPayload, STDIN_PLACEHOLDER, STDOUT_PLACEHOLDER};
use crate::error::SassError;
use crate::file::{relative_from, replace_ext, Contents, FileStat, SourceFile, OUTPUT_EXTENSION};
use crate::sourcemap::{apply_source_map, file_uri_to_path, is_data_uri, SourceMap};
use std::path::Path;

/// Fold a successful compilation back into the file record
///
/// Replaces the contents with the compiled CSS, rewrites the path to the
/// output extension, refreshes timestamps, and reconciles the compiler's
/// source map with the pipeline's path conventions before composing it onto
/// any upstream map.
pub(crate) fn handle_file(
    file: &mut SourceFile,
    result: CompileResult,
) -> Result<(), SassError> {
    if let Some(payload) = result.map {
        let map = match payload {
            MapPayload::Structured(map) => rewrite_modern(file, map),
            MapPayload::Serialized(raw) => {
                let map = SourceMap::from_json(&raw).map_err(|error| {
                    SassError::plugin_message(format!("Malformed source map: {error}"), file)
                })?;
                rewrite_legacy(file, map)
            }
        };
        apply_source_map(file, map);
    }

    file.contents = Contents::Buffer(result.css.into_bytes());
    file.path = replace_ext(&file.path, OUTPUT_EXTENSION);

    // Regenerated content, not copied verbatim from disk
    if file.stat.is_some() {
        file.stat = Some(FileStat::now());
    }

    Ok(())
}

/// The original file's relative path, re-suffixed to the output extension,
/// as recorded in the map's own `file` field
fn output_file_name(file: &SourceFile) -> String {
    replace_ext(&file.relative(), OUTPUT_EXTENSION).display().to_string()
}

/// Modern API: sources arrive as `data:` URIs for inline content and
/// absolute `file:` URIs for everything read from disk
fn rewrite_modern(file: &SourceFile, mut map: SourceMap) -> SourceMap {
    let relative = file.relative().display().to_string();
    let file_dir = file.path.parent().unwrap_or(Path::new(""));

    for source in &mut map.sources {
        if is_data_uri(source) {
            // Inline content is the file being compiled, not a synthetic
            // placeholder
            *source = relative.clone();
        } else if let Some(path) = file_uri_to_path(source) {
            *source = relative_from(file_dir, &path).display().to_string();
        }
    }

    map.file = output_file_name(file);
    map
}

/// Legacy API: the map names its own file `stdout` and piped-in content
/// `stdin`; only genuinely different source files get the directory prefix,
/// and leftover placeholders are dropped from the final list
fn rewrite_legacy(file: &SourceFile, mut map: SourceMap) -> SourceMap {
    let map_file = if map.file == STDOUT_PLACEHOLDER {
        STDIN_PLACEHOLDER.to_string()
    } else {
        map.file.clone()
    };

    let relative = file.relative();
    let source_dir =
        relative.parent().filter(|dir| !dir.as_os_str().is_empty()).map(Path::to_path_buf);

    if let Some(dir) = &source_dir {
        let own_index = map.sources.iter().position(|source| *source == map_file);
        for (index, source) in map.sources.iter_mut().enumerate() {
            if Some(index) != own_index {
                *source = dir.join(source.as_str()).display().to_string();
            }
        }
    }

    map.retain_sources(|source| source != STDIN_PLACEHOLDER);

    map.file = output_file_name(file);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileResult;

    fn css_result(css: &str, map: Option<MapPayload>) -> CompileResult {
        CompileResult { css: css.to_string(), map }
    }

    fn buffer_file(path: &str, base: &str) -> SourceFile {
        SourceFile::buffer(path, base, b"a { color: red; }".to_vec())
    }

    #[test]
    fn test_rewrites_contents_and_extension() {
        let mut file = buffer_file("/work/src/a.scss", "/work/src");
        handle_file(&mut file, css_result("a{color:red}", None)).unwrap();

        assert_eq!(file.path, Path::new("/work/src/a.css"));
        assert_eq!(file.contents, Contents::Buffer(b"a{color:red}".to_vec()));
    }

    #[test]
    fn test_refreshes_stat_timestamps() {
        let epoch = std::time::SystemTime::UNIX_EPOCH;
        let mut file = buffer_file("/work/src/a.scss", "/work/src");
        file.stat = Some(FileStat { atime: epoch, mtime: epoch, ctime: epoch });

        handle_file(&mut file, css_result("", None)).unwrap();

        let stat = file.stat.unwrap();
        assert!(stat.mtime > epoch);
        assert_eq!(stat.mtime, stat.ctime);
    }

    #[test]
    fn test_missing_stat_stays_absent() {
        let mut file = buffer_file("/work/src/a.scss", "/work/src");
        handle_file(&mut file, css_result("", None)).unwrap();
        assert!(file.stat.is_none());
    }

    #[test]
    fn test_modern_map_substitutes_data_uris() {
        let mut map = SourceMap::initial("placeholder", None);
        map.sources = vec![
            "data:application/octet-stream;base64,QUFB".to_string(),
            "file:///work/src/includes/_cats.scss".to_string(),
        ];
        map.sources_content = None;

        let file = buffer_file("/work/src/inheritance.scss", "/work/src");
        let mut file = file;
        handle_file(&mut file, css_result("", Some(MapPayload::Structured(map)))).unwrap();

        let map = file.source_map.unwrap();
        assert_eq!(map.sources, vec!["inheritance.scss", "includes/_cats.scss"]);
        assert_eq!(map.file, "inheritance.css");
    }

    #[test]
    fn test_modern_map_keeps_out_of_tree_sources_absolute() {
        let mut map = SourceMap::initial("placeholder", None);
        map.sources = vec![
            "file:///work/src/page.scss".to_string(),
            "file:///shared/lib/_theme.scss".to_string(),
        ];

        let mut file = buffer_file("/work/src/page.scss", "/work/src");
        handle_file(&mut file, css_result("", Some(MapPayload::Structured(map)))).unwrap();

        // Sources resolved from a caller load path lie outside the file's
        // directory and keep their absolute form.
        let map = file.source_map.unwrap();
        assert_eq!(map.sources, vec!["page.scss", "/shared/lib/_theme.scss"]);
    }

    #[test]
    fn test_legacy_map_prefixes_and_filters_placeholders() {
        let raw = r#"{
            "version": 3,
            "file": "stdout",
            "sources": ["stdin", "includes/_cats.scss"],
            "names": [],
            "mappings": "AAAA"
        }"#;

        let mut file = buffer_file("/work/sub/entry.scss", "/work");
        handle_file(&mut file, css_result("", Some(MapPayload::Serialized(raw.to_string()))))
            .unwrap();

        let map = file.source_map.unwrap();
        assert_eq!(map.sources, vec!["sub/includes/_cats.scss"]);
        assert_eq!(map.file, "sub/entry.css");
    }

    #[test]
    fn test_legacy_map_at_base_root_gets_no_prefix() {
        let raw = r#"{
            "version": 3,
            "file": "stdout",
            "sources": ["stdin", "includes/_cats.scss"],
            "names": [],
            "mappings": "AAAA"
        }"#;

        let mut file = buffer_file("/work/entry.scss", "/work");
        handle_file(&mut file, css_result("", Some(MapPayload::Serialized(raw.to_string()))))
            .unwrap();

        let map = file.source_map.unwrap();
        assert_eq!(map.sources, vec!["includes/_cats.scss"]);
        assert_eq!(map.file, "entry.css");
    }

    #[test]
    fn test_malformed_legacy_map_is_surfaced() {
        let mut file = buffer_file("/work/entry.scss", "/work");
        let error = handle_file(
            &mut file,
            css_result("", Some(MapPayload::Serialized("not json".to_string()))),
        )
        .unwrap_err();

        assert!(error.message.contains("Malformed source map"));
    }
}
