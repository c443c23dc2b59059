use std::io;
use std::path::{Path, PathBuf};

use sluice_api::task::{TaskContext, TaskId};
use sluice_api::writer::Committer;

use crate::error::EngineError;
use crate::fs::local_path;

/// Name of the staging directory under the output directory.
pub const TEMPORARY_DIR: &str = "_temporary";

/// Stages task output under `<output>/_temporary/<attempt>` and moves it
/// into `<output>` on commit.
///
/// File names are `<name>-m-<partition>` plus the writer's extension,
/// so tasks of one job never collide.
#[derive(Debug, Clone)]
pub struct WorkDirCommitter {
    output_dir: PathBuf,
    work_dir: PathBuf,
}

impl WorkDirCommitter {
    /// A `file://` output directory is staged and committed on its local path.
    pub fn new(output_dir: impl Into<PathBuf>, task: &TaskId) -> Self {
        let output_dir = local_path(&output_dir.into());
        let work_dir = output_dir.join(TEMPORARY_DIR).join(task.to_string());
        Self {
            output_dir,
            work_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create an empty work directory. Leftovers of an earlier attempt are removed.
    pub fn setup_task(&self) -> io::Result<()> {
        if self.work_dir.exists() {
            std::fs::remove_dir_all(&self.work_dir)?;
        }
        std::fs::create_dir_all(&self.work_dir)
    }

    /// Move every staged file into the output directory.
    ///
    /// Fails without moving anything if a destination already exists, and
    /// never replaces a destination created while the commit runs.
    /// Returns the committed paths, sorted.
    pub fn commit_task(&self) -> Result<Vec<PathBuf>, EngineError> {
        let mut moves = Vec::new();
        for entry in std::fs::read_dir(&self.work_dir)? {
            let entry = entry?;
            let dest = self.output_dir.join(entry.file_name());
            if dest.exists() {
                return Err(EngineError::CommitConflict(dest));
            }
            moves.push((entry.path(), dest));
        }
        moves.sort();

        let mut committed = Vec::with_capacity(moves.len());
        for (src, dest) in moves {
            commit_file(&src, &dest)?;
            tracing::debug!(from = %src.display(), to = %dest.display(), "file committed");
            committed.push(dest);
        }

        std::fs::remove_dir(&self.work_dir)?;
        // Other tasks may still be staging.
        let _ = std::fs::remove_dir(self.output_dir.join(TEMPORARY_DIR));

        Ok(committed)
    }

    /// Discard everything staged by the task.
    pub fn abort_task(&self) -> io::Result<()> {
        if self.work_dir.exists() {
            std::fs::remove_dir_all(&self.work_dir)?;
        }
        let _ = std::fs::remove_dir(self.output_dir.join(TEMPORARY_DIR));
        Ok(())
    }
}

/// Move `src` to `dest` unless `dest` exists.
///
/// The hard link fails atomically on an existing destination, unlike a
/// rename which would replace it.
fn commit_file(src: &Path, dest: &Path) -> Result<(), EngineError> {
    match std::fs::hard_link(src, dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(EngineError::CommitConflict(dest.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    }
    std::fs::remove_file(src)?;
    Ok(())
}

impl Committer for WorkDirCommitter {
    fn work_path(&self) -> &Path {
        &self.work_dir
    }

    fn unique_file(&self, ctx: &dyn TaskContext, name: &str, extension: &str) -> String {
        format!("{name}-m-{:05}{extension}", ctx.task_id().partition)
    }
}

#[cfg(test)]
mod tests {
    use sluice_api::config::ConfigValues;

    use super::*;
    use crate::task::TaskAttempt;

    fn committer(dir: &Path, partition: u32) -> (WorkDirCommitter, TaskAttempt) {
        let id = TaskId::new("job", partition, 0);
        let ctx = TaskAttempt::new(id.clone(), ConfigValues::new());
        (WorkDirCommitter::new(dir, &id), ctx)
    }

    #[test]
    fn test_work_path_and_unique_file() {
        let dir = tempfile::tempdir().unwrap();
        let (c, ctx) = committer(dir.path(), 12);

        assert_eq!(
            c.work_path(),
            dir.path().join("_temporary/attempt_job_m_000012_0")
        );
        assert_eq!(c.unique_file(&ctx, "events", ".gz"), "events-m-00012.gz");
        assert_eq!(c.unique_file(&ctx, "events", ""), "events-m-00012");
    }

    #[test]
    fn test_commit_moves_files() {
        let dir = tempfile::tempdir().unwrap();
        let (c, _) = committer(dir.path(), 0);

        c.setup_task().unwrap();
        std::fs::write(c.work_path().join("b-m-00000"), b"b").unwrap();
        std::fs::write(c.work_path().join("a-m-00000"), b"a").unwrap();

        let committed = c.commit_task().unwrap();

        assert_eq!(
            committed,
            vec![dir.path().join("a-m-00000"), dir.path().join("b-m-00000")]
        );
        assert_eq!(std::fs::read(dir.path().join("a-m-00000")).unwrap(), b"a");
        assert!(!dir.path().join("_temporary").exists());
    }

    #[test]
    fn test_commit_conflict_leaves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (c, _) = committer(dir.path(), 0);
        std::fs::write(dir.path().join("x-m-00000"), b"old").unwrap();

        c.setup_task().unwrap();
        std::fs::write(c.work_path().join("x-m-00000"), b"new").unwrap();

        let err = c.commit_task().unwrap_err();
        assert!(matches!(err, EngineError::CommitConflict(_)), "{err}");
        assert_eq!(std::fs::read(dir.path().join("x-m-00000")).unwrap(), b"old");
    }

    #[test]
    fn test_commit_file_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("staged");
        let dest = dir.path().join("x-m-00000");
        std::fs::write(&src, b"new").unwrap();
        // Appeared after the conflict scan.
        std::fs::write(&dest, b"old").unwrap();

        let err = commit_file(&src, &dest).unwrap_err();

        assert!(matches!(err, EngineError::CommitConflict(ref p) if p == &dest), "{err}");
        assert_eq!(std::fs::read(&dest).unwrap(), b"old");
        assert_eq!(std::fs::read(&src).unwrap(), b"new");
    }

    #[test]
    fn test_commit_file_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("staged");
        let dest = dir.path().join("x-m-00000");
        std::fs::write(&src, b"new").unwrap();

        commit_file(&src, &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert!(!src.exists());
    }

    #[test]
    fn test_file_uri_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("file://{}", dir.path().display());
        let (c, _) = committer(Path::new(&uri), 3);

        assert_eq!(c.output_dir(), dir.path());
        c.setup_task().unwrap();
        std::fs::write(c.work_path().join("x-m-00003"), b"x").unwrap();
        let committed = c.commit_task().unwrap();

        assert_eq!(committed, vec![dir.path().join("x-m-00003")]);
        assert_eq!(std::fs::read(dir.path().join("x-m-00003")).unwrap(), b"x");
    }

    #[test]
    fn test_abort_discards_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let (c, _) = committer(dir.path(), 1);

        c.setup_task().unwrap();
        std::fs::write(c.work_path().join("x-m-00001"), b"partial").unwrap();
        c.abort_task().unwrap();

        assert!(!c.work_path().exists());
        assert!(!dir.path().join("x-m-00001").exists());
        // Idempotent.
        c.abort_task().unwrap();
    }

    #[test]
    fn test_setup_clears_previous_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let (c, _) = committer(dir.path(), 0);

        c.setup_task().unwrap();
        std::fs::write(c.work_path().join("stale"), b"").unwrap();
        c.setup_task().unwrap();

        assert_eq!(std::fs::read_dir(c.work_path()).unwrap().count(), 0);
    }
}
