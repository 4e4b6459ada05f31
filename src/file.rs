// src/file.rs

use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

/// Create `dir` (and parents) unless it already exists as a directory.
pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    if dir.exists() && !dir.is_dir() {
        return Err(io::Error::other(format!("Path exists but is not a directory: {}", dir.display())));
    }
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Ensure the parent dir exists, then create/truncate `path` with `contents`.
pub fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(contents)?;
    out.flush()
}

/// File contents, or an empty string when the file does not exist yet.
pub fn read_text_or_empty(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(s!()),
        Err(e) => Err(e),
    }
}

/// Read a whole input; `-` means stdin.
pub fn read_input(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = s!();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    fs::read_to_string(path)
}

/// Write output bytes; `None` or `-` means stdout.
pub fn write_output(path: Option<&Path>, contents: &[u8]) -> io::Result<()> {
    match path {
        Some(p) if p.as_os_str() != "-" => write_file(p, contents),
        _ => {
            let mut out = io::stdout().lock();
            out.write_all(contents)?;
            out.flush()
        }
    }
}

/// Default PDF file name for an experiment.
pub fn pdf_path(experiment_id: u64) -> PathBuf {
    PathBuf::from(format!("experiment_{experiment_id}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("elab_bridge_file_{}", name));
        let _ = fs::remove_dir_all(&p);
        p
    }

    #[test]
    fn write_creates_parents() {
        let dir = tmp_dir("parents");
        let path = dir.join("a").join("b.txt");
        write_file(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tmp_dir("missing");
        assert_eq!(read_text_or_empty(&dir.join("nope.csv")).unwrap(), "");
    }

    #[test]
    fn file_in_the_way_is_an_error() {
        let dir = tmp_dir("blocked");
        write_file(&dir.join("x"), b"").unwrap();
        assert!(ensure_directory(&dir.join("x")).is_err());
    }

    #[test]
    fn pdf_names() {
        assert_eq!(pdf_path(7), PathBuf::from("experiment_7.pdf"));
    }
}
