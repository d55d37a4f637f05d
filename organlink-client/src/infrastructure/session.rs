use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Keeps the signed-in session token on disk between runs.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    /// Returns the stored token, or `None` when there is no usable one.
    pub fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim().to_string();
                Ok(if token.is_empty() { None } else { Some(token) })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("state").join("session"));

        assert_eq!(session.load().unwrap(), None);
        session.save("token-1").unwrap();
        assert_eq!(session.load().unwrap().as_deref(), Some("token-1"));

        session.clear().unwrap();
        session.clear().unwrap();
        assert_eq!(session.load().unwrap(), None);
    }

    #[test]
    fn blank_file_means_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("session"));
        session.save("  \n").unwrap();
        assert_eq!(session.load().unwrap(), None);
    }
}
