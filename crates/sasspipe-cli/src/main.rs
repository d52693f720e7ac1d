use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use sasspipe::cli::{collect_entries, resolve_out_dir, Cli, FileConfig};
use sasspipe::{
    legacy_sync, log_error, sass_sync, LegacySassOptions, SassOptions, SourceFile, SourceMap,
    StageOutput,
};

/// Find default config file in directory
fn find_default_config(dir: &Path) -> Option<PathBuf> {
    let json_path = dir.join("sasspipe.json");
    if json_path.exists() {
        return Some(json_path);
    }

    let jsonc_path = dir.join("sasspipe.jsonc");
    if jsonc_path.exists() {
        return Some(jsonc_path);
    }

    None
}

/// Load config from file path, supporting .json and .jsonc
fn load_config_file(path: &Path) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let mut content = fs::read_to_string(path)?;
    json_strip_comments::strip(&mut content)?;
    let config: FileConfig = serde_json::from_str(&content)?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let file_config = if let Some(config_path) = &cli.config {
        if !config_path.exists() {
            eprintln!("Error: Config file not found: {}", config_path.display());
            std::process::exit(1);
        }
        Some(load_config_file(config_path)?)
    } else {
        match find_default_config(&cli.cwd) {
            Some(path) => match load_config_file(&path) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file '{}': {}", path.display(), e);
                    None
                }
            },
            None => None,
        }
    };

    // Merge config: CLI args override file config
    let entry = if !cli.entry.is_empty() {
        cli.entry
    } else if let Some(ref cfg) = file_config {
        if cfg.entry.is_empty() {
            eprintln!("Error: No entry files specified in config or CLI");
            std::process::exit(1);
        }
        cfg.entry.clone()
    } else {
        vec!["**/*.{scss,sass}".to_string()]
    };

    let out_dir = resolve_out_dir(
        cli.out.clone(),
        file_config.as_ref().and_then(|cfg| cfg.out.clone()),
    );

    let source_map =
        cli.source_map || file_config.as_ref().is_some_and(|cfg| cfg.source_map);

    let cwd = cli.cwd.canonicalize()?;

    let stage = if cli.legacy {
        legacy_sync(LegacySassOptions { output_style: cli.style.into(), ..Default::default() })
    } else {
        sass_sync(SassOptions { style: cli.style.into(), ..Default::default() })
    };

    let mut failures = 0usize;
    for path in collect_entries(&cwd, &entry) {
        let contents = fs::read(&path)?;
        let mut file = SourceFile::buffer(path, cwd.clone(), contents);

        if source_map {
            let relative = file.relative().display().to_string();
            let text = match &file.contents {
                sasspipe::Contents::Buffer(bytes) => {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                }
                _ => None,
            };
            file.source_map = Some(SourceMap::initial(relative, text));
        }

        match stage.transform(file) {
            Ok(StageOutput::File(file)) => write_output(&out_dir, &file)?,
            Ok(StageOutput::Dropped) => {}
            Err(error) => {
                log_error(&error);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn write_output(out_dir: &Path, file: &SourceFile) -> Result<(), Box<dyn std::error::Error>> {
    let target = out_dir.join(file.relative());
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    if let sasspipe::Contents::Buffer(bytes) = &file.contents {
        fs::write(&target, bytes)?;
    }

    if let Some(map) = &file.source_map {
        let map_path = target.with_extension("css.map");
        fs::write(map_path, map.to_json()?)?;
    }

    Ok(())
}
