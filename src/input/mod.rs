//! Reading CIDR expressions from the command line or a file.
//!
//! Both sources must yield at least one expression; the expressions
//! themselves are only validated later, by the enumerator.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the CIDR expressions come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Positional command-line arguments.
    Args(Vec<String>),
    /// A newline-delimited file.
    File(PathBuf),
}

impl InputSource {
    /// A file source when `file` is set, the argument list otherwise.
    pub fn select(file: Option<&Path>, args: &[String]) -> Self {
        match file {
            Some(path) => InputSource::File(path.to_path_buf()),
            None => InputSource::Args(args.to_vec()),
        }
    }

    fn describe(&self) -> String {
        match self {
            InputSource::Args(_) => "command-line arguments".to_string(),
            InputSource::File(path) => format!("file {}", path.display()),
        }
    }
}

/// Read the CIDR expressions from `source`.
///
/// Fails with [`Error::EmptyInputSource`] when the source holds no
/// expressions, and [`Error::UnreadableInputSource`] when the file cannot be
/// opened or read.
pub fn read_cidrs(source: &InputSource) -> Result<Vec<String>> {
    let cidrs = match source {
        InputSource::Args(args) => args.clone(),
        InputSource::File(path) => read_file(path)?,
    };

    if cidrs.is_empty() {
        return Err(Error::EmptyInputSource {
            source_name: source.describe(),
        });
    }

    debug!("Read {} CIDRs from {}", cidrs.len(), source.describe());
    Ok(cidrs)
}

/// One expression per line. Surrounding whitespace is trimmed; blank lines
/// and `#` comments are skipped.
fn read_file(path: &Path) -> Result<Vec<String>> {
    let unreadable = |source| Error::UnreadableInputSource {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    let metadata = file.metadata().map_err(unreadable)?;
    if metadata.len() == 0 {
        return Err(Error::EmptyInputSource {
            source_name: format!("empty file {}", path.display()),
        });
    }

    let mut cidrs = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(unreadable)?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        cidrs.push(line.to_string());
    }

    Ok(cidrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_args_are_passed_through() {
        let args = vec!["10.0.0.0/24".to_string(), "bogus".to_string()];
        let cidrs = read_cidrs(&InputSource::Args(args.clone())).unwrap();
        assert_eq!(cidrs, args);
    }

    #[test]
    fn test_no_args_is_empty_source() {
        let err = read_cidrs(&InputSource::Args(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::EmptyInputSource { .. }));
    }

    #[test]
    fn test_select_prefers_file() {
        let args = vec!["10.0.0.0/24".to_string()];
        assert_eq!(
            InputSource::select(Some(Path::new("cidrs")), &args),
            InputSource::File(PathBuf::from("cidrs"))
        );
        assert_eq!(InputSource::select(None, &args), InputSource::Args(args));
    }

    #[test]
    fn test_read_file_skips_blanks_and_comments() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cidrs.txt");
        fs::write(&path, "# office\n10.0.0.0/24\n\n  172.16.16.0/20  \r\n#192.168.0.0/16\n").unwrap();

        let cidrs = read_cidrs(&InputSource::File(path)).unwrap();
        assert_eq!(cidrs, vec!["10.0.0.0/24", "172.16.16.0/20"]);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent_file.txt");

        let err = read_cidrs(&InputSource::File(path.clone())).unwrap_err();
        match err {
            Error::UnreadableInputSource { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_file_is_empty_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty_file.txt");
        fs::write(&path, "").unwrap();

        let err = read_cidrs(&InputSource::File(path)).unwrap_err();
        assert!(matches!(err, Error::EmptyInputSource { .. }));
    }

    #[test]
    fn test_comment_only_file_is_empty_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("comments.txt");
        fs::write(&path, "# nothing here\n\n").unwrap();

        let err = read_cidrs(&InputSource::File(path)).unwrap_err();
        assert!(matches!(err, Error::EmptyInputSource { .. }));
    }

    #[test]
    fn test_fixture_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/cidrs");
        let cidrs = read_cidrs(&InputSource::File(path)).unwrap();
        assert_eq!(cidrs, vec!["10.0.1.0/24", "172.16.16.0/20", "192.168.0.0/16"]);
    }
}
