use std::{
    fs::File,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::Path,
};

/// Destination a writer thread pushes formatted lines into.
pub trait LogWriter {
    fn regular(&mut self, line: &str) -> std::io::Result<()>;
    fn flush(&mut self) -> std::io::Result<()>;
}

pub struct LogFile {
    file: BufWriter<File>,
}

impl LogFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }
}

impl LogWriter for LogFile {
    fn regular(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.file, "{line}")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

#[derive(Default, Debug)]
pub struct LogStdout;

impl LogWriter for LogStdout {
    fn regular(&mut self, line: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}

#[test]
fn test_log_file() {
    let path = std::env::temp_dir().join("duolog_test_log_file.log");
    std::fs::remove_file(&path).ok();
    let mut log_file = LogFile::new(&path).unwrap();
    log_file.regular("Hello, world!").unwrap();
    log_file.regular("rust is awesome !").unwrap();
    log_file.flush().unwrap();
    drop(log_file);
    let mut log_file = LogFile::new(&path).unwrap();
    log_file.regular("appended").unwrap();
    log_file.flush().unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Hello, world!\nrust is awesome !\nappended\n"
    );
}

#[test]
fn test_log_stdout() {
    let mut log_stdout = LogStdout;
    log_stdout.regular("Hello, world!").unwrap();
    log_stdout.flush().unwrap();
}
