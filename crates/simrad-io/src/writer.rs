//! Framed datagram output and all-or-nothing file creation.

use crate::error::WriteError;
use crate::frame::write_frame;
use simrad_core::Datagram;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct DatagramWriter<W: Write> {
    writer: W,
    bytes_written: u64,
    datagrams_written: u64,
}

impl<W: Write> DatagramWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
            datagrams_written: 0,
        }
    }

    /// Encode and frame one datagram. Encoding completes before any byte is
    /// written, so a failed encode leaves no partial frame.
    pub fn write(&mut self, d: &Datagram) -> Result<(), WriteError> {
        let payload = d.encode()?;
        self.bytes_written += write_frame(&mut self.writer, &payload)? as u64;
        self.datagrams_written += 1;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn datagrams_written(&self) -> u64 {
        self.datagrams_written
    }

    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// A file written to a temporary sibling and renamed into place on commit.
/// Dropping it uncommitted removes the temporary file.
pub struct AtomicFile {
    target: PathBuf,
    temp: PathBuf,
    writer: Option<DatagramWriter<BufWriter<File>>>,
}

impl AtomicFile {
    pub fn create(target: impl AsRef<Path>, overwrite: bool) -> Result<Self, WriteError> {
        let target = target.as_ref().to_path_buf();
        if !overwrite && target.exists() {
            return Err(WriteError::OutputExists(target));
        }
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".part");
        let temp = target.with_file_name(name);
        let file = File::create(&temp)?;
        Ok(Self {
            target,
            temp,
            writer: Some(DatagramWriter::new(BufWriter::new(file))),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn write(&mut self, d: &Datagram) -> Result<(), WriteError> {
        match self.writer.as_mut() {
            Some(w) => w.write(d),
            None => Err(WriteError::Io(std::io::Error::other("file already committed"))),
        }
    }

    /// Flush, sync and move the file into place.
    pub fn commit(mut self) -> Result<PathBuf, WriteError> {
        if let Some(w) = self.writer.take() {
            let n = w.datagrams_written();
            let file = w
                .into_inner()
                .into_inner()
                .map_err(|e| WriteError::Io(e.into_error()))?;
            file.sync_all()?;
            drop(file);
            fs::rename(&self.temp, &self.target)?;
            log::info!("Wrote {} datagrams to {}", n, self.target.display());
        }
        Ok(self.target.clone())
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.temp) {
                log::warn!("Could not remove partial file {}: {}", self.temp.display(), e);
            } else {
                log::warn!("Discarded partial output {}", self.target.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{DatagramStream, StreamItem};
    use chrono::NaiveDate;
    use simrad_core::text::Annotation;
    use simrad_core::Payload;
    use tempfile::TempDir;

    fn tag(text: &str) -> Datagram {
        let t = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Datagram::new(t, Payload::Annotation(Annotation { text: text.into() }))
    }

    #[test]
    fn test_commit_renames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.raw");
        let mut f = AtomicFile::create(&path, false).unwrap();
        f.write(&tag("one")).unwrap();
        f.write(&tag("two")).unwrap();
        assert!(!path.exists());
        f.commit().unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("out.raw.part").exists());

        let s = DatagramStream::new(File::open(&path).unwrap());
        let items: Vec<_> = s.collect::<Result<_, _>>().unwrap();
        assert_eq!(items.len(), 2);
        match &items[1] {
            StreamItem::Datagram(d) => {
                assert_eq!(d.payload, Payload::Annotation(Annotation { text: "two".into() }))
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_drop_discards_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.raw");
        {
            let mut f = AtomicFile::create(&path, false).unwrap();
            f.write(&tag("one")).unwrap();
        }
        assert!(!path.exists());
        assert!(!dir.path().join("out.raw.part").exists());
    }

    #[test]
    fn test_refuses_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.raw");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(
            AtomicFile::create(&path, false),
            Err(WriteError::OutputExists(_))
        ));
        assert!(AtomicFile::create(&path, true).is_ok());
    }
}
