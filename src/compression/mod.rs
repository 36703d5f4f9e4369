// src/compression/mod.rs
//! Decompression of repository metadata files
//!
//! Typed metadata files are published compressed (`primary.xml.gz`,
//! `filelists.xml.zst`, ...). Checksums are always taken over the compressed
//! bytes, so decompression happens only when the verified file is loaded.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to open {path}: {source}")]
    Open { path: String, source: io::Error },

    #[error("Failed to create {format} decoder: {source}")]
    DecoderCreation {
        format: &'static str,
        source: io::Error,
    },
}

/// Supported compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain XML
    None,
    /// Gzip compression (.gz)
    Gzip,
    /// XZ/LZMA compression (.xz)
    Xz,
    /// Zstandard compression (.zst)
    Zstd,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    ///
    /// # Examples
    /// ```
    /// use repoclosure::compression::CompressionFormat;
    ///
    /// assert_eq!(CompressionFormat::from_extension("abc-primary.xml.gz"), CompressionFormat::Gzip);
    /// assert_eq!(CompressionFormat::from_extension("abc-primary.xml.zst"), CompressionFormat::Zstd);
    /// assert_eq!(CompressionFormat::from_extension("primary.xml"), CompressionFormat::None);
    /// ```
    pub fn from_extension(path: &str) -> Self {
        if path.ends_with(".gz") {
            Self::Gzip
        } else if path.ends_with(".xz") {
            Self::Xz
        } else if path.ends_with(".zst") || path.ends_with(".zstd") {
            Self::Zstd
        } else {
            Self::None
        }
    }

    /// Detect compression format from magic bytes
    ///
    /// - Gzip: `1f 8b`
    /// - XZ: `fd 37 7a 58 5a 00`
    /// - Zstd: `28 b5 2f fd`
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Self::Xz
        } else if data.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            Self::Zstd
        } else {
            Self::None
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Wrap a reader in a buffered decoder for the given format
pub fn create_decoder<'a, R: Read + 'a>(
    reader: R,
    format: CompressionFormat,
) -> Result<Box<dyn BufRead + 'a>, CompressionError> {
    match format {
        CompressionFormat::None => Ok(Box::new(BufReader::new(reader))),
        CompressionFormat::Gzip => Ok(Box::new(BufReader::new(
            flate2::read::MultiGzDecoder::new(reader),
        ))),
        CompressionFormat::Xz => Ok(Box::new(BufReader::new(xz2::read::XzDecoder::new(reader)))),
        CompressionFormat::Zstd => {
            let decoder =
                zstd::Decoder::new(reader).map_err(|e| CompressionError::DecoderCreation {
                    format: "zstd",
                    source: e,
                })?;
            Ok(Box::new(BufReader::new(decoder)))
        }
    }
}

/// Open a metadata file for streaming reads, decompressing as needed
///
/// The extension decides first; files without a recognised extension are
/// sniffed by magic bytes so renamed downloads still load.
pub fn open_metadata(path: &Path) -> Result<Box<dyn BufRead>, CompressionError> {
    let open_err = |source| CompressionError::Open {
        path: path.display().to_string(),
        source,
    };
    let mut file = File::open(path).map_err(open_err)?;

    let mut format = CompressionFormat::from_extension(&path.to_string_lossy());
    if format == CompressionFormat::None {
        let mut magic = [0u8; 6];
        let n = read_prefix(&mut file, &mut magic).map_err(open_err)?;
        file.seek(SeekFrom::Start(0)).map_err(open_err)?;
        format = CompressionFormat::from_magic_bytes(&magic[..n]);
    }

    create_decoder(file, format)
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
