//! Durable record of in-flight tasks.
//!
//! Exists only for restart recovery: it never drives the live task state machine and is not
//! consulted when polling. All file access is serialized through a dedicated [`Arbiter`].

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use fleet_model::{TaskId, TaskInfo};
use tracing::trace;

use crate::{
    arbiter::Arbiter,
    error::{CoreError, ManagerError},
};

/// Persistence of [`TaskInfo`] records.
#[async_trait]
pub trait TaskManager: Send + Sync + 'static {
    /// All persisted task infos; an absent store means none.
    async fn get_task_infos(&self) -> Result<Vec<TaskInfo>, ManagerError>;

    async fn add_task_info(&self, info: TaskInfo) -> Result<(), ManagerError>;

    /// Removing an id that is not present is not an error.
    async fn remove_task_info(&self, id: &TaskId) -> Result<(), ManagerError>;
}

type TaskInfos = BTreeMap<TaskId, TaskInfo>;

/// [`TaskManager`] backed by one JSON object (`id → TaskInfo`) on disk.
///
/// Every mutation rewrites the whole file.
pub struct FileTaskManager {
    file: Arbiter<TaskFile>,
}

impl FileTaskManager {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let file = TaskFile { path: path.into() };
        Ok(Self {
            file: Arbiter::spawn("task-manager", file)?,
        })
    }
}

#[async_trait]
impl TaskManager for FileTaskManager {
    async fn get_task_infos(&self) -> Result<Vec<TaskInfo>, ManagerError> {
        let infos = self.file.call(|f| f.load()).await??;
        Ok(infos.into_values().collect())
    }

    async fn add_task_info(&self, info: TaskInfo) -> Result<(), ManagerError> {
        self.file
            .call(move |f| {
                let mut infos = f.load()?;
                infos.insert(info.task_id.clone(), info);
                f.store(&infos)
            })
            .await?
    }

    async fn remove_task_info(&self, id: &TaskId) -> Result<(), ManagerError> {
        let id = id.clone();
        self.file
            .call(move |f| {
                let mut infos = f.load()?;
                if infos.remove(&id).is_some() {
                    f.store(&infos)?;
                }
                Ok(())
            })
            .await?
    }
}

struct TaskFile {
    path: PathBuf,
}

impl TaskFile {
    fn load(&self) -> Result<TaskInfos, ManagerError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TaskInfos::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| ManagerError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Write through a sibling temp file so a crash never leaves a truncated store.
    fn store(&self, infos: &TaskInfos) -> Result<(), ManagerError> {
        let bytes = serde_json::to_vec(infos).map_err(ManagerError::Encode)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, &bytes).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        trace!(path = %self.path.display(), count = infos.len(), "task infos written");
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> ManagerError {
        ManagerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
