use std::fs;
use std::io;
use std::path::PathBuf;

/// The access token is the only state that survives a restart.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> TokenStore {
        TokenStore { path }
    }

    pub fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> TokenStore {
        let path = std::env::temp_dir()
            .join(format!("taskboard-{}-{}", name, std::process::id()))
            .join("access_token");
        TokenStore::new(path)
    }

    #[test]
    fn test_save_load_clear() {
        let store = scratch("roundtrip");
        assert_eq!(store.load(), None);
        store.save("abc.def").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc.def"));
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_clear_without_file_is_ok() {
        let store = scratch("missing");
        assert!(store.clear().is_ok());
    }
}
