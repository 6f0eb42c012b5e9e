use crate::common::*;
use glob::glob;

/// A source of ordered file paths: an explicit list, a directory scanned for
/// images, or a newline-delimited list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileList {
    Paths(Vec<PathBuf>),
    Dir(PathBuf),
    ListFile(PathBuf),
}

impl FileList {
    pub fn load(&self) -> Result<Vec<PathBuf>> {
        let paths = match self {
            Self::Paths(paths) => paths.clone(),
            Self::Dir(dir) => scan_image_dir(dir)?,
            Self::ListFile(file) => {
                let text = std::fs::read_to_string(file)
                    .with_context(|| format!("failed to read list file {}", file.display()))?;
                text.lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(PathBuf::from)
                    .collect()
            }
        };
        Ok(paths)
    }
}

/// Scan a directory for `*.jpg` and `*.png` files, sorted by path.
pub fn scan_image_dir<P>(dir: P) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
{
    let dir = dir.as_ref();

    let mut paths = vec![];
    for ext in ["jpg", "png"] {
        let pattern = dir.join(format!("*.{}", ext));
        let pattern = pattern
            .to_str()
            .ok_or_else(|| format_err!("non-utf8 path {}", pattern.display()))?;
        for entry in glob(pattern)? {
            paths.push(entry?);
        }
    }
    paths.sort();

    Ok(paths)
}
