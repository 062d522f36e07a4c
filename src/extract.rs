//! Archive and directory readers that turn raw inputs into [`SourceFile`]s.

use anyhow::{bail, Context, Result};
use glob::glob;
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info};
use zip::ZipArchive;

use crate::normalize::SourceFile;

fn is_csv(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

/// Buffer every `.csv` entry of the archive into memory, in archive order.
pub fn read_csv_entries<P: AsRef<Path>>(zip_path: P) -> Result<Vec<SourceFile>> {
    let zip_path = zip_path.as_ref();
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;

    let mut files = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{} in {:?}", i, zip_path))?;
        let name = entry.name().to_string();

        if entry.is_file() && is_csv(&name) {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut buf)
                .with_context(|| format!("Failed to read {} into memory", name))?;
            files.push(SourceFile::new(name, buf));
        } else {
            debug!(entry = %name, "skipping non-csv entry");
        }
    }

    Ok(files)
}

/// A local source that could not be read.
#[derive(Debug, Clone)]
pub struct LocalFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Sources loaded from a directory, plus the ones that failed.
#[derive(Debug, Default)]
pub struct LocalSources {
    pub files: Vec<SourceFile>,
    pub failures: Vec<LocalFailure>,
}

fn read_local(path: &Path) -> Result<Vec<SourceFile>> {
    if is_csv(&path.to_string_lossy()) {
        Ok(vec![SourceFile::from_path(path)?])
    } else {
        read_csv_entries(path)
    }
}

/// Read loose `*.csv` files and the CSV entries of `*.zip` archives found
/// directly in `dir`. Paths are visited in lexical order.
///
/// An unreadable file or archive is logged and recorded in
/// `LocalSources::failures`; only a directory that yields no CSV at all is
/// an error.
pub fn load_local_dir(dir: &Path) -> Result<LocalSources> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for pattern in ["*.csv", "*.CSV", "*.zip", "*.ZIP"] {
        let pattern = dir.join(pattern);
        let pattern = pattern.to_string_lossy();
        for entry in glob(&pattern).with_context(|| format!("bad glob pattern {}", pattern))? {
            paths.push(entry?);
        }
    }
    paths.sort();
    paths.dedup();

    let mut sources = LocalSources::default();
    for path in paths {
        match read_local(&path) {
            Ok(files) => sources.files.extend(files),
            Err(e) => {
                let error = format!("{:#}", e);
                error!(path = %path.display(), %error, "local source failed, skipping");
                sources.failures.push(LocalFailure { path, error });
            }
        }
    }

    if sources.files.is_empty() {
        bail!("no CSV files could be loaded from {}", dir.display());
    }
    info!(
        dir = %dir.display(),
        files = sources.files.len(),
        failures = sources.failures.len(),
        "loaded local sources"
    );
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn buffers_csv_entries_in_archive_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vlmo_cia_aberta_2024.zip");
        write_zip(
            &path,
            &[
                ("vlmo_cia_aberta_con_2024.csv", b"a;b\n1;2\n"),
                ("leia_me.txt", b"ignored"),
                ("vlmo_cia_aberta_2024.CSV", b"c\n3\n"),
            ],
        );

        let files = read_csv_entries(&path).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["vlmo_cia_aberta_con_2024.csv", "vlmo_cia_aberta_2024.CSV"]
        );
        assert_eq!(files[0].contents, b"a;b\n1;2\n");
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(read_csv_entries(&path).is_err());
    }

    #[test]
    fn local_dir_reads_loose_and_zipped_csv() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a_con_2023.csv"), b"x\n1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();
        write_zip(&dir.path().join("b_2024.zip"), &[("b_con_2024.csv", b"y\n2\n")]);

        let sources = load_local_dir(dir.path()).unwrap();
        assert_eq!(sources.files.len(), 2);
        assert!(sources.files[0].name.ends_with("a_con_2023.csv"));
        assert_eq!(sources.files[1].name, "b_con_2024.csv");
        assert!(sources.failures.is_empty());
    }

    #[test]
    fn corrupt_local_archive_is_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a_con_2023.csv"), b"x\n1\n").unwrap();
        std::fs::write(dir.path().join("broken_2024.zip"), b"not a zip").unwrap();

        let sources = load_local_dir(dir.path()).unwrap();
        assert_eq!(sources.files.len(), 1);
        assert!(sources.files[0].name.ends_with("a_con_2023.csv"));
        assert_eq!(sources.failures.len(), 1);
        assert!(sources.failures[0].path.ends_with("broken_2024.zip"));
    }

    #[test]
    fn local_dir_without_sources_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_local_dir(dir.path()).is_err());

        // only unreadable archives: still nothing to run on
        std::fs::write(dir.path().join("broken.zip"), b"not a zip").unwrap();
        let err = load_local_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no CSV files could be loaded"));
    }
}
