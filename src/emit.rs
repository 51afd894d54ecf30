//! Emit stage: turns bundled assets into intermediate files for compilation.
//!
//! Stands in for the host bundler's emit hook. Script bundles are written
//! next to their final location as `*.temp.js` and registered on the batch;
//! JSON assets are copied through for card devices.

use crate::dispatch::Batch;
use crate::error::{GenAbcError, Result};
use crate::paths::{ensure_dir, to_unix_path, validate_file_path_length};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};

/// Prologue wrapped around page bundles.
const PAGE_PROLOGUE: &str = concat!(
    "(global.___mainEntry___ = function (globalObjects) {\n",
    "  var define = globalObjects.define;\n",
    "  var require = globalObjects.require;\n",
    "  var bootstrap = globalObjects.bootstrap;\n",
    "  var register = globalObjects.register;\n",
    "  var render = globalObjects.render;\n",
    "  var $app_define$ = globalObjects.$app_define$;\n",
    "  var $app_bootstrap$ = globalObjects.$app_bootstrap$;\n",
    "  var $app_require$ = globalObjects.$app_require$;\n",
    "  var history = globalObjects.history;\n",
    "  var Image = globalObjects.Image;\n",
    "  var OffscreenCanvas = globalObjects.OffscreenCanvas;\n",
    "  (function(global) {\n",
    "    \"use strict\";\n",
);

/// Epilogue closing [`PAGE_PROLOGUE`].
const PAGE_EPILOGUE: &str = "\n})(this.__appProto__);\n})";

/// Padding prepended to shared chunks and worker scripts.
const CHUNK_PADDING: &str = "\n\n\n\n\n\n\n\n\n\n\n\n\n\n";

const SHARED_CHUNKS: [&str; 2] = ["commons.js", "vendors.js"];

/// Device level whose JSON assets are copied through.
pub const CARD_DEVICE_LEVEL: &str = "card";

/// Options for the emit stage.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Worker script entries (without `.js`). `None` means any asset keyed
    /// `./workers/...` is a worker script.
    pub worker_entries: Option<Vec<String>>,
    /// Device level of the build (`card` enables JSON copying).
    pub device_level: Option<String>,
    /// Config output directory used for JSON assets.
    pub config_output: Option<PathBuf>,
    /// Project source root, used to skip `i18n` resources.
    pub project_path: Option<PathBuf>,
}

impl EmitOptions {
    fn copies_json(&self) -> bool {
        self.device_level.as_deref() == Some(CARD_DEVICE_LEVEL) && self.config_output.is_some()
    }

    /// Whether an asset key names a worker script.
    pub fn is_worker_script(&self, key: &str) -> bool {
        match &self.worker_entries {
            Some(entries) => entries.iter().any(|entry| format!("{}.js", entry) == key),
            None => key.starts_with("./workers/"),
        }
    }

    /// Whether a JSON asset belongs to the project's `i18n` resources.
    fn is_i18n(&self, key: &str, output_dir: &Path) -> bool {
        let (Some(config_output), Some(project_path)) = (&self.config_output, &self.project_path)
        else {
            return false;
        };
        let out_path = config_output.join(key);
        let project_side = match out_path.strip_prefix(output_dir) {
            Ok(rest) => project_path.join(rest),
            Err(_) => out_path,
        };
        project_side.starts_with(project_path.join("i18n"))
    }
}

/// How a script asset is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Application page: wrapped in the entry prologue/epilogue.
    Page,
    /// Shared chunk or worker script: padded only.
    Padded,
}

impl ScriptKind {
    pub fn classify(key: &str, options: &EmitOptions) -> Self {
        if SHARED_CHUNKS.contains(&key) || options.is_worker_script(key) {
            Self::Padded
        } else {
            Self::Page
        }
    }

    /// Rewrite a script. The source is spliced as raw bytes, so it need
    /// not be valid UTF-8.
    pub fn render(self, source: &[u8]) -> Vec<u8> {
        let (head, tail) = match self {
            Self::Page => (PAGE_PROLOGUE, PAGE_EPILOGUE),
            Self::Padded => (CHUNK_PADDING, ""),
        };
        let mut out = Vec::with_capacity(head.len() + source.len() + tail.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(source);
        out.extend_from_slice(tail.as_bytes());
        out
    }
}

/// Intermediate file name for a script key: `pages/index.js` → `pages/index.temp.js`.
pub fn intermediate_key(key: &str) -> String {
    match key.strip_suffix(".js") {
        Some(stem) => format!("{}.temp.js", stem),
        None => key.to_string(),
    }
}

/// Counters reported by [`emit_assets`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub scripts: usize,
    pub json: usize,
    pub skipped: usize,
}

/// Write a file, creating its parent directory.
fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    validate_file_path_length(path)?;
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Collect asset keys under `input_dir`, relative and `/`-separated, sorted.
///
/// Symlinked directories are not followed.
pub fn collect_assets(input_dir: &Path) -> Result<Vec<String>> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                walk(&path, root, out)?;
            } else if file_type.is_symlink() && path.is_dir() {
                trace!(path = %path.display(), "Skipping symlinked directory");
            } else if let Ok(rel) = path.strip_prefix(root) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(key);
            }
        }
        Ok(())
    }

    let mut keys = Vec::new();
    walk(input_dir, input_dir, &mut keys)?;
    keys.sort();
    Ok(keys)
}

/// Emit every asset under `input_dir` into `output_dir`.
///
/// Script intermediates are registered on `batch`. Per-asset failures are
/// recorded on the batch and do not stop the remaining assets; only a failure
/// to list the input directory is returned.
#[instrument(level = "debug", skip(options, batch))]
pub fn emit_assets(
    input_dir: &Path,
    output_dir: &Path,
    options: &EmitOptions,
    batch: &mut Batch,
) -> Result<EmitSummary> {
    let keys = collect_assets(input_dir)?;
    let mut summary = EmitSummary::default();

    for key in &keys {
        let source_path = input_dir.join(key);
        if key.ends_with(".js") {
            match emit_script(key, &source_path, output_dir, options)
                .and_then(|(path, size)| batch.register(path, size))
            {
                Ok(()) => summary.scripts += 1,
                Err(e) => batch.record_error(e),
            }
        } else if key.ends_with(".json")
            && options.copies_json()
            && !options.is_i18n(key, output_dir)
        {
            let copied = fs::read(&source_path)
                .map_err(GenAbcError::from)
                .and_then(|bytes| write_file(&output_dir.join(key), &bytes));
            match copied {
                Ok(()) => summary.json += 1,
                Err(e) => batch.record_error(e),
            }
        } else {
            trace!(key = %key, "Skipping asset");
            summary.skipped += 1;
        }
    }

    info!(
        scripts = summary.scripts,
        json = summary.json,
        skipped = summary.skipped,
        "Emitted assets"
    );
    Ok(summary)
}

fn emit_script(
    key: &str,
    source_path: &Path,
    output_dir: &Path,
    options: &EmitOptions,
) -> Result<(PathBuf, u64)> {
    let source = fs::read(source_path)?;
    let kind = ScriptKind::classify(key, options);
    let target = output_dir.join(intermediate_key(key));
    write_file(&target, &kind.render(&source))?;

    let size = fs::metadata(&target)
        .map_err(|_| GenAbcError::MissingOutput(target.clone()))?
        .len();
    debug!(key = %key, kind = ?kind, size, "Wrote intermediate file");
    Ok((to_unix_path(&target), size))
}
