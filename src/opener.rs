use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::Result;

#[cfg(target_os = "macos")]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(target_os = "windows")]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(path);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}

/// Start `cmd` with null stdio and reap it from a background thread once it
/// exits. The handle yields the exit status.
fn spawn_detached(mut cmd: Command) -> Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let handle = thread::Builder::new()
        .name("viewer-reaper".into())
        .spawn(move || match child.wait() {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(error = %e, "waiting for viewer failed");
                None
            }
        })?;
    Ok(handle)
}

/// Open a generated document with the desktop's default application.
/// Does not wait for the viewer to exit.
pub fn open_file(path: &Path) -> Result<()> {
    tracing::debug!(path = %path.display(), "opening file");
    spawn_detached(viewer_command(path))?;
    Ok(())
}

/// Open each file in turn; returns one message per file that failed.
pub fn open_all<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| {
            let p = p.as_ref();
            open_file(p)
                .err()
                .map(|e| format!("Impossible d'ouvrir {} : {e}", p.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_command_targets_path() {
        let cmd = viewer_command(Path::new("/tmp/facture.pdf"));
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args.last().map(|a| a.to_os_string()), Some("/tmp/facture.pdf".into()));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawned_viewer_is_reaped() {
        let handle = spawn_detached(Command::new("true")).unwrap();
        let status = handle.join().unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let err = spawn_detached(Command::new("kdp-invoice-no-such-viewer")).unwrap_err();
        assert!(matches!(err, crate::error::InvoiceError::Io(_)));
    }
}
