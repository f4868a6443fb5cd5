//! Helpers for the external programs frameaudit drives.

use std::path::Path;
use std::process::Command;

/// Whether `program` can be executed: an existing file when it contains a
/// path separator, otherwise a name that resolves on `PATH`.
pub fn command_exists(program: &str) -> bool {
    if program.is_empty() {
        return false;
    }
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        return Path::new(program).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v '{program}' >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_missing_programs() {
        assert!(!command_exists(""));
        assert!(!command_exists("/definitely/not/a/real/program"));
        assert!(!command_exists("frameaudit-no-such-binary-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_is_found() {
        assert!(command_exists("sh"));
    }
}
