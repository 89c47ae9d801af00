//! Static file serving — path resolution, MIME lookup and chunked file bodies.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use bytes::{Bytes, BytesMut};

/// MIME type used when the extension is missing or unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A reference to a file on disk, streamed to the client in fixed-size blocks.
///
/// The body is restartable: every call to [`chunks`](Self::chunks) reopens the
/// file and starts from the first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBody {
    path: PathBuf,
    len: u64,
    chunk_size: usize,
}

impl FileBody {
    /// Stats `path` and builds a body for it.
    ///
    /// # Errors
    ///
    /// Any I/O error from reading the file's metadata, or
    /// [`io::ErrorKind::InvalidInput`] when `path` is not a regular file.
    pub fn open(path: impl Into<PathBuf>, chunk_size: usize) -> io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(Self {
            path,
            len: metadata.len(),
            chunk_size: chunk_size.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes at the time the body was created.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The MIME type for this file's extension.
    pub fn content_type(&self) -> &'static str {
        mime_type_for(&self.path)
    }

    /// Opens the file and returns an iterator over its blocks.
    pub fn chunks(&self) -> io::Result<FileChunks> {
        let file = File::open(&self.path)?;
        Ok(FileChunks {
            file,
            chunk_size: self.chunk_size,
            done: false,
        })
    }

    /// Reads the whole file through [`chunks`](Self::chunks).
    pub fn read_all(&self) -> io::Result<Bytes> {
        let mut out = BytesMut::with_capacity(self.len as usize);
        for chunk in self.chunks()? {
            out.extend_from_slice(&chunk?);
        }
        Ok(out.freeze())
    }
}

/// Iterator over the blocks of a [`FileBody`].
///
/// Every block except the last holds exactly `chunk_size` bytes. The iterator
/// ends after the first read error.
#[derive(Debug)]
pub struct FileChunks {
    file: File,
    chunk_size: usize,
    done: bool,
}

impl Iterator for FileChunks {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        if filled < buf.len() {
            self.done = true;
        }
        if filled == 0 {
            return None;
        }

        buf.truncate(filled);
        Some(Ok(Bytes::from(buf)))
    }
}

/// Maps a request path under `prefix` onto a file path under `root`.
///
/// Returns `None` when `path` is not under `prefix` (segment-wise) or when the
/// remainder tries to leave `root` with `..` or an absolute component.
pub fn physical_path(prefix: &str, root: &Path, path: &str) -> Option<PathBuf> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }

    let rest = rest.trim_start_matches('/');
    let relative = Path::new(rest);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    Some(root.join(relative))
}

/// Looks up the MIME type for `path`'s extension (case-insensitive).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use rttp_dispatch::router::static_files::mime_type_for;
///
/// assert_eq!(mime_type_for(Path::new("logo.PNG")), "image/png");
/// assert_eq!(mime_type_for(Path::new("archive.tar.gz")), "application/octet-stream");
/// ```
pub fn mime_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| mime_type(&ext.to_ascii_lowercase()))
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Looks up a lowercase extension (without the dot) in the MIME table.
pub fn mime_type(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "ai" | "eps" | "ps" => "application/postscript",
        "asc" | "rb" | "rd" | "txt" => "text/plain",
        "avi" => "video/x-msvideo",
        "bin" | "class" | "dms" | "exe" | "lha" | "lzh" => "application/octet-stream",
        "bmp" => "image/bmp",
        "cer" => "application/pkix-cert",
        "crl" => "application/pkix-crl",
        "crt" => "application/x-x509-ca-cert",
        "css" => "text/css",
        "doc" => "application/msword",
        "dvi" => "application/x-dvi",
        "etx" => "text/x-setext",
        "gif" => "image/gif",
        "htm" | "html" => "text/html",
        "jpe" | "jpeg" | "jpg" => "image/jpeg",
        "js" => "application/javascript",
        "json" => "application/json",
        "mov" | "qt" => "video/quicktime",
        "mpe" | "mpeg" | "mpg" => "video/mpeg",
        "pbm" => "image/x-portable-bitmap",
        "pdf" => "application/pdf",
        "pgm" => "image/x-portable-graymap",
        "png" => "image/png",
        "pnm" => "image/x-portable-anymap",
        "ppm" => "image/x-portable-pixmap",
        "ppt" => "application/vnd.ms-powerpoint",
        "ras" => "image/x-cmu-raster",
        "rtf" => "application/rtf",
        "sgm" | "sgml" => "text/sgml",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "xbm" => "image/x-xbitmap",
        "xls" => "application/vnd.ms-excel",
        "xml" => "text/xml",
        "xpm" => "image/x-xpixmap",
        "xwd" => "image/x-xwindowdump",
        "zip" => "application/zip",
        _ => return None,
    })
}
