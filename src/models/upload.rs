use std::path::Path;

/// Extraction category chosen from a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Document,
    Slideshow,
    Image,
    Audio,
    Other,
}

impl FileKind {
    /// Case-insensitive lookup by extension. Unknown extensions are `Other`.
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("docx") => FileKind::Document,
            Some("pptx") => FileKind::Slideshow,
            Some("png" | "jpg" | "jpeg" | "tiff" | "bmp") => FileKind::Image,
            Some("mp3" | "wav" | "m4a" | "flac" | "ogg") => FileKind::Audio,
            _ => FileKind::Other,
        }
    }
}

/// An uploaded file, fully read into memory at submission time.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_filename(&self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(FileKind::from_filename("notes.docx"), FileKind::Document);
        assert_eq!(FileKind::from_filename("deck.PPTX"), FileKind::Slideshow);
        assert_eq!(FileKind::from_filename("scan.JPeg"), FileKind::Image);
        assert_eq!(FileKind::from_filename("page.tiff"), FileKind::Image);
        assert_eq!(FileKind::from_filename("lecture.m4a"), FileKind::Audio);
        assert_eq!(FileKind::from_filename("clip.ogg"), FileKind::Audio);
    }

    #[test]
    fn test_unknown_extensions_are_other() {
        assert_eq!(FileKind::from_filename("large.bin"), FileKind::Other);
        assert_eq!(FileKind::from_filename("report.pdf"), FileKind::Other);
        assert_eq!(FileKind::from_filename("README"), FileKind::Other);
    }
}
