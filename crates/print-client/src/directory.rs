//! A print sink that writes pages as PNG files.
//!
//! Each subdirectory of the root is a "printer". A document is a fresh
//! `doc-NNN` directory under it and each page is `page-NNNN.png`.

use std::fs;
use std::path::{Path, PathBuf};

use labelbatch_core::RasterImage;
use tracing::debug;

use crate::{DestRect, PrintError, PrintSink, compose_page};

/// Writes every page to disk.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    page_size: Option<(u32, u32)>,
}

/// An open `doc-NNN` directory.
#[derive(Debug)]
pub struct DirectoryDocument {
    dir: PathBuf,
    pages: usize,
}

impl DirectoryDocument {
    /// The document directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Pages written so far.
    pub fn pages_written(&self) -> usize {
        self.pages
    }
}

impl DirectorySink {
    /// A sink rooted at `root`. Pages are sized to their destination.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: None,
        }
    }

    /// Write fixed-size pages with each label centred on them.
    pub fn with_page_size(mut self, width: u32, height: u32) -> Self {
        self.page_size = Some((width, height));
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn printer_dir(&self, printer: &str) -> Result<PathBuf, PrintError> {
        let name = printer.trim();
        if name.is_empty() {
            return Ok(self.root.clone());
        }
        let mut parts = Path::new(name).components();
        let single_normal = matches!(
            (parts.next(), parts.next()),
            (Some(std::path::Component::Normal(_)), None)
        );
        if !single_normal {
            return Err(PrintError::PrinterNotFound(printer.to_string()));
        }
        Ok(self.root.join(name))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PrintError + '_ {
    move |source| PrintError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl PrintSink for DirectorySink {
    type Handle = DirectoryDocument;

    fn list_printers(&self) -> Result<Vec<String>, PrintError> {
        let entries = fs::read_dir(&self.root).map_err(io_err(&self.root))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&self.root))?;
            if entry.file_type().map_err(io_err(&entry.path()))?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Open a document under `root/printer`, or directly under the root
    /// when `printer` is blank. The printer directory is created if needed.
    fn begin_document(&mut self, printer: &str) -> Result<DirectoryDocument, PrintError> {
        let parent = self.printer_dir(printer)?;
        fs::create_dir_all(&parent).map_err(io_err(&parent))?;

        let mut n = 1usize;
        let dir = loop {
            let candidate = parent.join(format!("doc-{n:03}"));
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(source) => {
                    return Err(PrintError::Io {
                        path: candidate,
                        source,
                    });
                }
            }
        };
        debug!(dir = %dir.display(), "document opened");
        Ok(DirectoryDocument { dir, pages: 0 })
    }

    fn draw_page(
        &mut self,
        handle: &mut DirectoryDocument,
        raster: &RasterImage,
        dest: DestRect,
    ) -> Result<(), PrintError> {
        if dest.is_empty() {
            return Err(PrintError::PageRejected(format!(
                "destination {}x{} is empty",
                dest.width, dest.height
            )));
        }
        let (pw, ph) = self
            .page_size
            .unwrap_or((dest.x + dest.width, dest.y + dest.height));
        let page = compose_page(raster, pw, ph, dest);

        let path = handle.dir.join(format!("page-{:04}.png", handle.pages + 1));
        page.save(&path).map_err(|source| match source {
            image::ImageError::IoError(source) => PrintError::Io {
                path: path.clone(),
                source,
            },
            source => PrintError::Encode {
                path: path.clone(),
                source,
            },
        })?;
        handle.pages += 1;
        debug!(path = %path.display(), "page written");
        Ok(())
    }

    fn end_document(&mut self, handle: DirectoryDocument) -> Result<(), PrintError> {
        debug!(dir = %handle.dir.display(), pages = handle.pages, "document closed");
        Ok(())
    }

    fn page_size(&self, _handle: &DirectoryDocument) -> Option<(u32, u32)> {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn raster() -> RasterImage {
        RasterImage::from_luma(&GrayImage::from_pixel(10, 5, Luma([0])), 96, 96)
    }

    const DEST: DestRect = DestRect {
        x: 0,
        y: 0,
        width: 40,
        height: 20,
    };

    #[test]
    fn documents_are_numbered() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(tmp.path());
        let first = sink.begin_document("dock").unwrap();
        let second = sink.begin_document("dock").unwrap();
        assert!(first.path().ends_with("dock/doc-001"));
        assert!(second.path().ends_with("dock/doc-002"));
        assert_eq!(sink.list_printers().unwrap(), vec!["dock".to_string()]);
    }

    #[test]
    fn pages_are_png_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(tmp.path());
        let mut doc = sink.begin_document("").unwrap();
        sink.draw_page(&mut doc, &raster(), DEST).unwrap();
        sink.draw_page(&mut doc, &raster(), DEST).unwrap();
        let dir = doc.path().to_path_buf();
        sink.end_document(doc).unwrap();

        let img = image::open(dir.join("page-0002.png")).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (40, 20));
        assert!(!dir.join("page-0003.png").exists());
    }

    #[test]
    fn fixed_page_size_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(tmp.path()).with_page_size(100, 50);
        let mut doc = sink.begin_document("").unwrap();
        assert_eq!(sink.page_size(&doc), Some((100, 50)));
        let dest = DestRect::for_label(
            &labelbatch_profile::LabelLayout::two_by_one_inch(),
            sink.page_size(&doc),
        );
        sink.draw_page(&mut doc, &raster(), dest).unwrap();
        let img = image::open(doc.path().join("page-0001.png")).unwrap();
        assert_eq!((img.width(), img.height()), (100, 50));
    }

    #[test]
    fn path_escapes_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(tmp.path());
        assert!(matches!(
            sink.begin_document("../outside"),
            Err(PrintError::PrinterNotFound(_))
        ));
    }

    #[test]
    fn empty_destination_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(tmp.path());
        let mut doc = sink.begin_document("").unwrap();
        let dest = DestRect { width: 0, ..DEST };
        assert!(matches!(
            sink.draw_page(&mut doc, &raster(), dest),
            Err(PrintError::PageRejected(_))
        ));
    }
}
