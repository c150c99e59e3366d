//! Locating the target Go process by name through procfs
//!
//! The name is compared against both the `comm` field of `stat` and the
//! basename of the `exe` link, so `gscope api` finds `/srv/api` even when
//! the kernel truncated its command name.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A procfs entry whose name matched
#[derive(Debug)]
pub struct ProcessInfo {
    pub pid: i32,
    pub exe_path: PathBuf,
    pub command: String,
}

/// Pick the single running process called `name`
///
/// The calling process is skipped.
///
/// # Errors
/// Fails when nothing matches, or when more than one pid does; the
/// second message lists every candidate so the user can pass `--pid`.
pub fn find_process_by_name(name: &str) -> Result<ProcessInfo> {
    find_process_in(Path::new("/proc"), name)
}

/// Same lookup rooted at `proc_root` instead of `/proc`
///
/// # Errors
/// Same as [`find_process_by_name`]
pub fn find_process_in(proc_root: &Path, name: &str) -> Result<ProcessInfo> {
    let own_pid = std::process::id();
    let mut matches: Vec<ProcessInfo> = Vec::new();

    let proc_dir = fs::read_dir(proc_root)
        .with_context(|| format!("Failed to read {}", proc_root.display()))?;

    for entry in proc_dir.flatten() {
        let file_name = entry.file_name();
        let pid_str = file_name.to_string_lossy();

        let Ok(pid) = pid_str.parse::<i32>() else {
            continue;
        };
        if u32::try_from(pid).is_ok_and(|pid| pid == own_pid) {
            continue;
        }

        // no exe link: kernel thread, or owned by another user
        let Ok(exe_path) = fs::read_link(entry.path().join("exe")) else {
            continue;
        };

        let Ok(stat_content) = fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };

        let Ok(command) = extract_comm(&stat_content) else {
            continue;
        };

        if is_match(&command, &exe_path, name) {
            matches.push(ProcessInfo { pid, exe_path, command });
        }
    }

    match matches.len() {
        0 => bail!(
            "No process matching '{name}' found.\n\
             Check running processes with: ps aux | grep {name}"
        ),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort_by_key(|m| m.pid);
            let list: Vec<String> =
                matches.iter().map(|m| format!("  {} ({})", m.pid, m.command)).collect();
            bail!(
                "Multiple processes match '{name}':\n{}\n\n\
                 Specify PID explicitly: gscope --pid <PID>",
                list.join("\n")
            )
        }
    }
}

/// Binary behind `pid`, read from its `exe` link
///
/// # Errors
/// Fails when the pid is gone or its link cannot be followed.
pub fn resolve_exe_path(pid: i32) -> Result<PathBuf> {
    let exe_link = format!("/proc/{pid}/exe");
    fs::read_link(&exe_link).with_context(|| format!("Cannot read {exe_link}"))
}

/// `comm` sits between the first `(` and the last `)`, since the name
/// itself may contain parentheses.
fn extract_comm(stat_line: &str) -> Result<String> {
    let open = stat_line.find('(').context("Invalid stat format")?;
    let close = stat_line.rfind(')').context("Invalid stat format")?;
    if open >= close {
        bail!("Invalid stat format");
    }
    Ok(stat_line[open + 1..close].to_string())
}

/// Exact basename equality, else substring containment
fn is_match(command: &str, exe_path: &Path, pattern: &str) -> bool {
    let exe_basename = exe_path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    let pattern_basename =
        Path::new(pattern).file_name().and_then(|n| n.to_str()).unwrap_or(pattern);

    command == pattern_basename
        || exe_basename == pattern_basename
        || command.contains(pattern)
        || exe_basename.contains(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    fn fake_process(root: &Path, pid: i32, comm: &str, exe: &str) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), format!("{pid} ({comm}) S 1 {pid} {pid} 0 -1")).unwrap();
        symlink(exe, dir.join("exe")).unwrap();
    }

    #[test]
    fn test_extract_comm() {
        let stat = "1234 (my-app) S 1 1234 1234 0 -1 4194304";
        assert_eq!(extract_comm(stat).unwrap(), "my-app");
    }

    #[test]
    fn test_extract_comm_with_parens() {
        let stat = "1234 (app (v2)) S 1 1234";
        assert_eq!(extract_comm(stat).unwrap(), "app (v2)");
    }

    #[test]
    fn test_is_match() {
        let exe = Path::new("/usr/bin/my-server");
        assert!(is_match("my-server", exe, "my-server"));
        assert!(is_match("my-server", exe, "server"));
        assert!(is_match("my-server", exe, "./bin/my-server"));
        assert!(!is_match("my-server", exe, "other"));
    }

    #[test]
    fn test_find_in_fake_proc() {
        let root = tempfile::tempdir().unwrap();
        fake_process(root.path(), 5_000_100, "api", "/srv/api");
        fake_process(root.path(), 5_000_200, "worker", "/srv/worker");
        fs::create_dir(root.path().join("self")).unwrap();

        let info = find_process_in(root.path(), "worker").unwrap();
        assert_eq!(info.pid, 5_000_200);
        assert_eq!(info.exe_path, PathBuf::from("/srv/worker"));

        let err = find_process_in(root.path(), "missing").unwrap_err().to_string();
        assert!(err.contains("No process matching"));
    }

    #[test]
    fn test_truncated_comm_found_by_exe_name() {
        let root = tempfile::tempdir().unwrap();
        fake_process(root.path(), 5_000_400, "payment-gatewa", "/srv/payment-gateway-v2");

        let info = find_process_in(root.path(), "payment-gateway-v2").unwrap();
        assert_eq!(info.pid, 5_000_400);
        assert_eq!(info.command, "payment-gatewa");
    }

    #[test]
    fn test_ambiguous_name_lists_candidates() {
        let root = tempfile::tempdir().unwrap();
        fake_process(root.path(), 5_000_300, "queue-a", "/srv/queue-a");
        fake_process(root.path(), 5_000_301, "queue-b", "/srv/queue-b");

        let err = find_process_in(root.path(), "queue").unwrap_err().to_string();
        assert!(err.contains("Multiple processes"));
        assert!(err.contains("5000300 (queue-a)"));
        assert!(err.contains("5000301 (queue-b)"));
    }
}
