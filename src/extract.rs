// src/extract.rs - Support bundle unpacking (zip, tar, gz, tgz)

use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Component, Path, PathBuf};

use crate::error::ExtractionError;

const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_BLOCK: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    /// A gzip stream, which may itself hold a tar
    Gz,
    Tgz,
}

impl ArchiveFormat {
    pub const EXTENSIONS: &'static [&'static str] = &["zip", "tar", "gz", "tgz"];

    /// Classify by extension, case-insensitively
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveFormat::Zip),
            "tar" => Some(ArchiveFormat::Tar),
            "gz" => Some(ArchiveFormat::Gz),
            "tgz" => Some(ArchiveFormat::Tgz),
            _ => None,
        }
    }
}

/// Unpack every regular file of `archive` beneath `dest`.
pub fn extract(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    Extractor::new().extract(archive, dest)
}

type NameFilter<'a> = Box<dyn Fn(&str) -> bool + 'a>;

/// Archive unpacker with an optional base-name filter.
///
/// Only regular files and directories are materialized. Symlinks, hard links
/// and device entries are skipped. An entry whose path is absolute or climbs
/// out of the destination fails the whole archive.
#[derive(Default)]
pub struct Extractor<'a> {
    filter: Option<NameFilter<'a>>,
}

impl<'a> Extractor<'a> {
    pub fn new() -> Self {
        Extractor { filter: None }
    }

    /// Only write files whose base name satisfies `keep`
    pub fn with_filter(keep: impl Fn(&str) -> bool + 'a) -> Self {
        Extractor {
            filter: Some(Box::new(keep)),
        }
    }

    pub fn extract(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let format = ArchiveFormat::from_path(archive).ok_or_else(|| {
            ExtractionError::UnsupportedFormat {
                path: archive.to_path_buf(),
            }
        })?;

        fs::create_dir_all(dest).map_err(|e| ExtractionError::io(dest, e))?;

        match format {
            ArchiveFormat::Zip => self.unpack_zip(archive, dest),
            ArchiveFormat::Tar => {
                let file = open(archive)?;
                self.unpack_tar(BufReader::new(file), archive, dest)
            }
            ArchiveFormat::Tgz => {
                let file = open(archive)?;
                self.unpack_tar(MultiGzDecoder::new(BufReader::new(file)), archive, dest)
            }
            ArchiveFormat::Gz => self.unpack_gz(archive, dest),
        }
    }

    fn wants(&self, relative: &Path) -> bool {
        match &self.filter {
            None => true,
            Some(keep) => relative
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| keep(name)),
        }
    }

    fn unpack_tar<R: Read>(
        &self,
        reader: R,
        archive: &Path,
        dest: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let mut tar = tar::Archive::new(reader);
        let entries = tar.entries().map_err(|e| corrupt(archive, e))?;
        let mut extracted = Vec::new();

        for entry in entries {
            let mut entry = entry.map_err(|e| corrupt(archive, e))?;
            let raw = entry.path().map_err(|e| corrupt(archive, e))?.into_owned();
            let relative = safe_relative_path(&raw).ok_or_else(|| unsafe_entry(archive, &raw))?;
            if relative.as_os_str().is_empty() {
                continue;
            }

            let target = dest.join(&relative);
            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| ExtractionError::io(&target, e))?;
                continue;
            }
            if !entry_type.is_file() || !self.wants(&relative) {
                continue;
            }

            write_entry(&mut entry, archive, &target)?;
            extracted.push(target);
        }

        Ok(extracted)
    }

    fn unpack_zip(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let file = open(archive)?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(archive, e))?;
        let mut extracted = Vec::new();

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(|e| zip_error(archive, e))?;
            let raw = PathBuf::from(entry.name());
            let relative = safe_relative_path(&raw).ok_or_else(|| unsafe_entry(archive, &raw))?;
            if relative.as_os_str().is_empty() {
                continue;
            }

            let target = dest.join(&relative);
            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| ExtractionError::io(&target, e))?;
                continue;
            }
            if !entry.is_file() || !self.wants(&relative) {
                continue;
            }

            write_entry(&mut entry, archive, &target)?;
            extracted.push(target);
        }

        Ok(extracted)
    }

    /// A `.gz` is either a compressed tar or one compressed file.
    fn unpack_gz(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let file = open(archive)?;
        let mut decoder = MultiGzDecoder::new(BufReader::new(file));

        let mut head = Vec::with_capacity(TAR_BLOCK as usize);
        (&mut decoder)
            .take(TAR_BLOCK)
            .read_to_end(&mut head)
            .map_err(|e| corrupt(archive, e))?;
        let looks_like_tar = is_tar_header(&head);
        let mut stream = Cursor::new(head).chain(decoder);

        if looks_like_tar {
            return self.unpack_tar(stream, archive, dest);
        }

        // hostd.0.gz -> hostd.0
        let Some(stem) = archive.file_stem() else {
            return Ok(Vec::new());
        };
        let relative = PathBuf::from(stem);
        if !self.wants(&relative) {
            return Ok(Vec::new());
        }

        let target = dest.join(relative);
        write_entry(&mut stream, archive, &target)?;
        Ok(vec![target])
    }
}

fn open(archive: &Path) -> Result<File, ExtractionError> {
    File::open(archive).map_err(|e| ExtractionError::io(archive, e))
}

fn is_tar_header(block: &[u8]) -> bool {
    block
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len())
        .is_some_and(|magic| magic == TAR_MAGIC)
}

/// Normalize an archive member path, refusing anything that could land
/// outside the destination.
fn safe_relative_path(raw: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn write_entry<R: Read>(reader: &mut R, archive: &Path, target: &Path) -> Result<(), ExtractionError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractionError::io(parent, e))?;
    }
    let mut out = File::create(target).map_err(|e| ExtractionError::io(target, e))?;
    io::copy(reader, &mut out).map_err(|e| match e.kind() {
        // decoder and archive framing errors surface through the read side
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            corrupt(archive, e)
        }
        _ => ExtractionError::io(target, e),
    })?;
    Ok(())
}

fn corrupt(archive: &Path, err: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Corrupt {
        path: archive.to_path_buf(),
        reason: err.to_string(),
    }
}

fn unsafe_entry(archive: &Path, entry: &Path) -> ExtractionError {
    ExtractionError::UnsafeEntry {
        archive: archive.to_path_buf(),
        entry: entry.display().to_string(),
    }
}

fn zip_error(archive: &Path, err: zip::result::ZipError) -> ExtractionError {
    match err {
        zip::result::ZipError::Io(e) => ExtractionError::io(archive, e),
        other => corrupt(archive, other),
    }
}
