//! Connection to the local data catalogue and the export task registry
//!
//! A `Session` is opened once per process and passed by reference to
//! everything that loads products or submits exports.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Product;
use crate::config::CatalogConfig;
use crate::export::ExportTask;
use crate::raster::{Image, Raster, RasterError};
use crate::readers::{ReadError, open_image};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("catalogue root {0} does not exist")]
    RootNotFound(PathBuf),

    #[error("unknown product '{0}'")]
    UnknownProduct(String),

    #[error("product '{key}' expected at {path}")]
    MissingProduct { key: String, path: PathBuf },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("failed to start export task: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type TaskId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Running,
    Completed(PathBuf),
    Failed(String),
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Running => write!(f, "RUNNING"),
            TaskState::Completed(path) => write!(f, "COMPLETED ({})", path.display()),
            TaskState::Failed(reason) => write!(f, "FAILED ({})", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub id: TaskId,
    pub description: String,
    pub state: TaskState,
}

#[derive(Debug)]
pub struct Session {
    root: PathBuf,
    account: Option<String>,
    products: BTreeMap<String, PathBuf>,
    tasks: Arc<Mutex<Vec<TaskStatus>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Opens the catalogue. The root and every product listed in the
    /// configuration must exist.
    pub fn connect(config: &CatalogConfig) -> Result<Self, SessionError> {
        if !config.root.is_dir() {
            return Err(SessionError::RootNotFound(config.root.clone()));
        }

        for (key, dir) in &config.products {
            let path = config.root.join(dir);
            if !path.is_dir() {
                return Err(SessionError::MissingProduct {
                    key: key.clone(),
                    path,
                });
            }
        }

        info!(
            "connected to catalogue {}{}",
            config.root.display(),
            config
                .account
                .as_deref()
                .map(|a| format!(" as {}", a))
                .unwrap_or_default()
        );

        Ok(Self {
            root: config.root.clone(),
            account: config.account.clone(),
            products: config.products.clone(),
            tasks: Arc::new(Mutex::new(Vec::new())),
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Directory holding the band files of `key`.
    pub fn product_dir(&self, key: &str) -> Result<PathBuf, SessionError> {
        if let Some(dir) = self.products.get(key) {
            return Ok(self.root.join(dir));
        }
        if Product::from_key(key).is_some() {
            return Ok(self.root.join(key));
        }
        Err(SessionError::UnknownProduct(key.to_string()))
    }

    pub fn load_image(&self, key: &str) -> Result<Image, SessionError> {
        let dir = self.product_dir(key)?;
        if !dir.is_dir() {
            return Err(SessionError::MissingProduct {
                key: key.to_string(),
                path: dir,
            });
        }
        debug!("loading {} from {}", key, dir.display());
        Ok(open_image(dir)?)
    }

    /// The product's band.
    pub fn load(&self, product: &Product) -> Result<Raster, SessionError> {
        let image = self.load_image(product.key)?;
        Ok(image.band(product.band)?.clone())
    }

    /// Starts `task` on a background thread and returns at once.
    pub fn submit(&self, task: ExportTask) -> Result<TaskId, SessionError> {
        let id = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            let id = tasks.len();
            tasks.push(TaskStatus {
                id,
                description: task.description().to_string(),
                state: TaskState::Running,
            });
            id
        };

        let registry = Arc::clone(&self.tasks);
        let handle = thread::Builder::new()
            .name(format!("export-{}", id))
            .spawn(move || {
                let state = match task.run() {
                    Ok(path) => TaskState::Completed(path),
                    Err(e) => {
                        warn!("export {} failed: {}", task.description(), e);
                        TaskState::Failed(e.to_string())
                    }
                };
                let mut tasks = registry.lock().unwrap_or_else(PoisonError::into_inner);
                tasks[id].state = state;
            })?;

        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);

        info!("submitted export task {}", id);
        Ok(id)
    }

    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.get(id).map(|t| t.state.clone())
    }

    pub fn tasks(&self) -> Vec<TaskStatus> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Blocks until every submitted task has finished.
    pub fn wait_all(&self) -> Vec<TaskStatus> {
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for handle in handles {
            if handle.join().is_err() {
                warn!("an export thread panicked");
            }
        }
        self.tasks()
    }
}
