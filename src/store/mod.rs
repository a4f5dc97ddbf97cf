//! JSON file loading and knowledge-base persistence
//!
//! Processes, knowledge bases and contexts are plain JSON files. The kb is
//! written back atomically (temp file + rename) whenever the engine
//! reaches an End activity. Instances that share one backing file must
//! also share one [`SharedLock`] so their writes never interleave.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::Mutex;

use crate::engine::callback::CallbackResolver;
use crate::engine::context::{Context, KnowledgeBase};
use crate::engine::error::{Result, StoreError};
use crate::engine::interpreter::{Engine, SaveHook};
use crate::engine::process::{Process, ProcessDescription};
use crate::nlu::NluAdapter;

/// Lock shared by every engine instance that reads or writes the same
/// backing files
pub type SharedLock = Arc<Mutex<()>>;

/// Create a lock for a set of engine instances sharing backing files
pub fn shared_lock() -> SharedLock {
    Arc::new(Mutex::new(()))
}

/// Load a JSON object file (kb or context)
pub fn load_map(path: impl AsRef<Path>) -> std::result::Result<KnowledgeBase, StoreError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate a process description file
pub fn load_process(path: impl AsRef<Path>) -> Result<Process> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let description: ProcessDescription =
        serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Process::try_from(description)?)
}

/// Write data atomically: temp file, sync, rename, sync parent
fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;
    file.write_all(data).context("Failed to write data")?;
    file.sync_all().context("Failed to sync file")?;
    drop(file);

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    if let Some(parent) = path.parent() {
        let dir = OpenOptions::new()
            .read(true)
            .open(parent)
            .with_context(|| format!("Failed to open directory: {:?}", parent))?;
        dir.sync_all().context("Failed to sync directory")?;
    }

    Ok(())
}

/// Save hook that writes the kb as pretty JSON to `path`, taking the
/// shared lock for the duration of the write
pub fn file_save_hook(path: impl Into<PathBuf>, lock: SharedLock) -> SaveHook {
    let path = path.into();
    Box::new(move |kb: &KnowledgeBase| {
        let _guard = lock.lock();
        let json = serde_json::to_vec_pretty(kb).context("Failed to serialize knowledge base")?;
        write_atomic(&path, &json)
    })
}

/// The initial context for a file-loaded engine: a file of its own, or an
/// in-memory map
#[derive(Debug, Clone)]
pub enum ContextSource {
    /// Load the context from a JSON object file
    Path(PathBuf),
    /// Use the given context directly
    Inline(Context),
}

impl From<PathBuf> for ContextSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ContextSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Context> for ContextSource {
    fn from(ctx: Context) -> Self {
        Self::Inline(ctx)
    }
}

impl Engine {
    /// Load an engine's configuration from files
    ///
    /// The process file must hold a process description, the kb file (and
    /// the context file, when given as a path) a JSON object. The kb is
    /// saved back to its file when the process completes. Every instance
    /// that can touch the same files must be handed the same `lock`.
    pub fn from_files(
        process_path: impl AsRef<Path>,
        kb_path: impl AsRef<Path>,
        initial_context: impl Into<ContextSource>,
        callbacks: impl CallbackResolver + Send + 'static,
        nlu: impl NluAdapter + Send + 'static,
        lock: SharedLock,
    ) -> Result<Self> {
        let kb_path = kb_path.as_ref().to_path_buf();

        let (process, kb, ctx) = {
            let _guard = lock.lock();
            let process = load_process(process_path)?;
            let kb = load_map(&kb_path)?;
            let ctx = match initial_context.into() {
                ContextSource::Path(path) => load_map(path)?,
                ContextSource::Inline(ctx) => ctx,
            };
            (process, kb, ctx)
        };

        let on_save = file_save_hook(kb_path, lock);
        Engine::new(process, kb, ctx, callbacks, nlu, on_save)
    }
}
