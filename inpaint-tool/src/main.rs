use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;
use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Parser)]
enum Opts {
    /// Scan a directory tree and write the image paths as a list file.
    MakeFlist {
        /// dataset directory
        dataset_dir: PathBuf,
        /// output list file
        output_file: PathBuf,
    },
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::MakeFlist {
            dataset_dir,
            output_file,
        } => {
            make_flist(dataset_dir, output_file)?;
        }
    }

    Ok(())
}

fn make_flist(dataset_dir: impl AsRef<Path>, output_file: impl AsRef<Path>) -> Result<()> {
    let dataset_dir = dataset_dir.as_ref();
    let output_file = output_file.as_ref();
    ensure!(
        dataset_dir.is_dir(),
        "{} is not a directory",
        dataset_dir.display()
    );

    let mut paths = vec![];
    for ext in ["jpg", "png"] {
        let pattern = dataset_dir.join("**").join(format!("*.{}", ext));
        let pattern = pattern
            .to_str()
            .with_context(|| format!("non-utf8 path {}", pattern.display()))?;
        for entry in glob::glob(pattern)? {
            paths.push(entry?);
        }
    }
    paths.sort();

    let mut writer = BufWriter::new(
        File::create(output_file)
            .with_context(|| format!("failed to create {}", output_file.display()))?,
    );
    for path in &paths {
        writeln!(writer, "{}", path.display())?;
    }
    info!("wrote {} paths to {}", paths.len(), output_file.display());

    Ok(())
}
