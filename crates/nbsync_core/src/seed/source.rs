//! Trusted seed sources.

use crate::seed::SeedNotebook;
use crate::template::TEMPLATE_NAME;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// File that seeds the reserved `template` notebook.
pub const DEFAULT_TEMPLATE_FILE: &str = "wprdf_template.py";

const NOTEBOOK_EXTENSION: &str = "py";

#[derive(Debug)]
pub enum SeedSourceError {
    MissingDirectory(PathBuf),
    Io { path: PathBuf, source: std::io::Error },
    InvalidFileName(PathBuf),
}

impl Display for SeedSourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDirectory(path) => {
                write!(f, "seed directory does not exist: {}", path.display())
            }
            Self::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            Self::InvalidFileName(path) => {
                write!(f, "seed file name is not valid UTF-8: {}", path.display())
            }
        }
    }
}

impl Error for SeedSourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Provider of trusted `(name, code)` pairs.
pub trait SeedSource {
    fn load(&self) -> Result<Vec<SeedNotebook>, SeedSourceError>;
}

/// Every `*.py` file of one directory, named by file stem, in file-name
/// order. The template file is named `template`.
#[derive(Debug, Clone)]
pub struct DirectorySeedSource {
    dir: PathBuf,
    template_file: String,
}

impl DirectorySeedSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            template_file: DEFAULT_TEMPLATE_FILE.to_string(),
        }
    }

    pub fn with_template_file(mut self, file_name: impl Into<String>) -> Self {
        self.template_file = file_name.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn notebook_name(&self, path: &Path) -> Result<String, SeedSourceError> {
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .ok_or_else(|| SeedSourceError::InvalidFileName(path.to_path_buf()))?;
        if file_name == self.template_file {
            return Ok(TEMPLATE_NAME.to_string());
        }
        path.file_stem()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .ok_or_else(|| SeedSourceError::InvalidFileName(path.to_path_buf()))
    }
}

impl SeedSource for DirectorySeedSource {
    fn load(&self) -> Result<Vec<SeedNotebook>, SeedSourceError> {
        if !self.dir.is_dir() {
            return Err(SeedSourceError::MissingDirectory(self.dir.clone()));
        }

        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SeedSourceError::Io { path, source }
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(io_error(&self.dir))? {
            let path = entry.map_err(io_error(&self.dir))?.path();
            let is_notebook = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(NOTEBOOK_EXTENSION);
            if is_notebook {
                paths.push(path);
            }
        }
        paths.sort();

        let mut notebooks = Vec::with_capacity(paths.len());
        for path in paths {
            let name = self.notebook_name(&path)?;
            let code = std::fs::read_to_string(&path).map_err(io_error(&path))?;
            notebooks.push(SeedNotebook { name, code });
        }
        Ok(notebooks)
    }
}
