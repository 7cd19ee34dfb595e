use std::path::PathBuf;

use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use crate::collab::BoxFuture;
use crate::file::SelectedFile;

/// JPEG quality used for converted photos.
pub const JPEG_QUALITY: f32 = 0.9;

const HEIC_MIME_TYPES: [&str; 2] = ["image/heic", "image/heif"];
const HEIC_EXTENSIONS: [&str; 2] = [".heic", ".heif"];

#[derive(Debug)]
pub enum ConvertError {
    Io(std::io::Error),
    Converter(String),
    EmptyOutput,
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::Io(e) => write!(f, "conversion I/O error: {e}"),
            ConvertError::Converter(msg) => write!(f, "converter failed: {msg}"),
            ConvertError::EmptyOutput => write!(f, "converter produced no image"),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(e: std::io::Error) -> Self {
        ConvertError::Io(e)
    }
}

/// Turns HEIC/HEIF image bytes into JPEG bytes.
pub trait HeicConverter: Send + Sync {
    fn to_jpeg<'a>(
        &'a self,
        heic: &'a [u8],
        quality: f32,
    ) -> BoxFuture<'a, Result<Bytes, ConvertError>>;
}

/// Whether a file needs conversion: HEIC/HEIF by MIME type or extension,
/// case-insensitively.
pub fn is_heic(file: &SelectedFile) -> bool {
    let mime = file.mime.trim().to_ascii_lowercase();
    HEIC_MIME_TYPES.contains(&mime.as_str()) || heic_extension_len(&file.name).is_some()
}

fn heic_extension_len(name: &str) -> Option<usize> {
    let lower = name.to_ascii_lowercase();
    HEIC_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| ext.len())
}

/// File name of the converted photo: a HEIC extension becomes `.jpg`, any
/// other name gains one.
pub fn jpeg_file_name(name: &str) -> String {
    let stem = match heic_extension_len(name) {
        Some(len) => &name[..name.len() - len],
        None => name,
    };
    format!("{stem}.jpg")
}

/// Converts HEIC files to JPEG; every other file is returned untouched.
pub async fn maybe_convert_heic(
    file: SelectedFile,
    converter: &dyn HeicConverter,
) -> Result<SelectedFile, ConvertError> {
    if !is_heic(&file) {
        return Ok(file);
    }
    let jpeg = converter.to_jpeg(&file.bytes, JPEG_QUALITY).await?;
    if jpeg.is_empty() {
        return Err(ConvertError::EmptyOutput);
    }
    let name = jpeg_file_name(&file.name);
    debug!(from = %file.name, to = %name, bytes = jpeg.len(), "converted HEIC photo");
    Ok(SelectedFile {
        name,
        mime: "image/jpeg".to_string(),
        bytes: jpeg,
    })
}

/// Converter backed by libheif's `heif-convert` command-line tool.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    pub program: PathBuf,
}

impl Default for CommandConverter {
    fn default() -> Self {
        Self {
            program: PathBuf::from("heif-convert"),
        }
    }
}

impl CommandConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn convert(&self, heic: &[u8], quality: f32) -> Result<Bytes, ConvertError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("input.heic");
        let output = scratch.path().join("output.jpg");
        tokio::fs::write(&input, heic).await?;

        let percent = (quality.clamp(0.0, 1.0) * 100.0).round() as u32;
        let result = Command::new(&self.program)
            .arg("-q")
            .arg(percent.to_string())
            .arg(&input)
            .arg(&output)
            .output()
            .await
            .map_err(|e| {
                ConvertError::Converter(format!("{} failed to start: {e}", self.program.display()))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConvertError::Converter(stderr.trim().to_string()));
        }

        Ok(Bytes::from(tokio::fs::read(&output).await?))
    }
}

impl HeicConverter for CommandConverter {
    fn to_jpeg<'a>(
        &'a self,
        heic: &'a [u8],
        quality: f32,
    ) -> BoxFuture<'a, Result<Bytes, ConvertError>> {
        Box::pin(self.convert(heic, quality))
    }
}
