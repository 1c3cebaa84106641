use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default location of the development append log.
pub const DEFAULT_LOG_PATH: &str = "./logs/out.log";

/// Rotation threshold for the development append log.
pub const MAX_LOG_BYTES: u64 = 100 * 1024;

/// Rotated generations kept next to the live file.
pub const KEEP_GENERATIONS: usize = 7;

/// Size-capped append-only log.
///
/// Lines are appended to `path`; once the file would exceed `max_bytes`
/// it is renamed to `path.1` (existing generations shift up, the oldest
/// beyond `keep` is discarded) and a fresh file is started. The parent
/// directory is created on demand. A single owner must serialize calls;
/// the emission worker is that owner.
pub struct RollingFile {
    path: PathBuf,
    max_bytes: u64,
    keep: usize,
    file: Option<File>,
    written: u64,
}

impl RollingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RollingFile {
            path: path.into(),
            max_bytes: MAX_LOG_BYTES,
            keep: KEEP_GENERATIONS,
            file: None,
            written: 0,
        }
    }

    #[cfg(test)]
    fn with_limits(path: impl Into<PathBuf>, max_bytes: u64, keep: usize) -> Self {
        RollingFile {
            path: path.into(),
            max_bytes,
            keep,
            file: None,
            written: 0,
        }
    }

    /// Append one line (a newline is added). Rotates first if the line
    /// would push the file past the size cap.
    pub fn append_line(&mut self, line: &str) -> io::Result<()> {
        let incoming = line.len() as u64 + 1;
        if self.file.is_some() && self.written + incoming > self.max_bytes {
            self.rotate()?;
        }
        if self.file.is_none() {
            self.open()?;
            if self.written + incoming > self.max_bytes && self.written > 0 {
                self.rotate()?;
                self.open()?;
            }
        }

        let file = self.file.as_mut().expect("log file open");
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        self.written += incoming;
        Ok(())
    }

    fn open(&mut self) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        self.written = 0;

        let _ = fs::remove_file(generation_path(&self.path, self.keep));
        for i in (1..self.keep).rev() {
            let from = generation_path(&self.path, i);
            if from.exists() {
                fs::rename(&from, generation_path(&self.path, i + 1))?;
            }
        }
        if self.path.exists() {
            fs::rename(&self.path, generation_path(&self.path, 1))?;
        }
        Ok(())
    }
}

fn generation_path(path: &Path, generation: usize) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(format!(".{}", generation));
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("correlog-rolling-{}", uuid::Uuid::new_v4()))
            .join("out.log")
    }

    #[test]
    fn creates_missing_directory_and_appends() {
        let path = temp_log_path();
        let mut log = RollingFile::new(&path);
        log.append_line("first").unwrap();
        log.append_line("second").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn rotates_when_the_cap_is_reached() {
        let path = temp_log_path();
        let mut log = RollingFile::with_limits(&path, 32, 3);
        log.append_line("aaaaaaaaaaaaaaaaaaaa").unwrap(); // 21 bytes
        log.append_line("bbbbbbbbbbbbbbbbbbbb").unwrap(); // would exceed 32
        assert!(generation_path(&path, 1).exists());
        let live = fs::read_to_string(&path).unwrap();
        assert_eq!(live, "bbbbbbbbbbbbbbbbbbbb\n");
        let rotated = fs::read_to_string(generation_path(&path, 1)).unwrap();
        assert_eq!(rotated, "aaaaaaaaaaaaaaaaaaaa\n");
    }

    #[test]
    fn discards_generations_beyond_the_keep_bound() {
        let path = temp_log_path();
        let mut log = RollingFile::with_limits(&path, 8, 3);
        for i in 0..10 {
            log.append_line(&format!("line-{:02}", i)).unwrap();
        }
        assert!(generation_path(&path, 1).exists());
        assert!(generation_path(&path, 2).exists());
        assert!(generation_path(&path, 3).exists());
        assert!(!generation_path(&path, 4).exists());
    }

    #[test]
    fn resumes_size_accounting_across_reopen() {
        let path = temp_log_path();
        {
            let mut log = RollingFile::with_limits(&path, 32, 3);
            log.append_line("aaaaaaaaaaaaaaaaaaaa").unwrap();
        }
        let mut log = RollingFile::with_limits(&path, 32, 3);
        log.append_line("bbbbbbbbbbbbbbbbbbbb").unwrap();
        assert!(generation_path(&path, 1).exists());
    }
}
