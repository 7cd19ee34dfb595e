use bytes::Bytes;

/// One user-selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    /// MIME type as reported by the picker; may be empty.
    pub mime: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }
}

/// Contents of the file-input control.
///
/// Taking the files resets the control, so a selection is consumed exactly
/// once whatever happens to the upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    files: Vec<SelectedFile>,
}

impl FileSelection {
    pub fn new(files: Vec<SelectedFile>) -> Self {
        Self { files }
    }

    pub fn take(&mut self) -> Vec<SelectedFile> {
        std::mem::take(&mut self.files)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl From<Vec<SelectedFile>> for FileSelection {
    fn from(files: Vec<SelectedFile>) -> Self {
        Self::new(files)
    }
}
