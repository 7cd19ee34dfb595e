use std::path::{Path, PathBuf};

use globe::{GlobeScene, GlobeStyle, Viewport, render_svg};
use runtime::{DEFAULT_FRAME_DT_S, Frame, Rotation};
use studio::{FileSelection, SelectedFile};

/// Splits `--visited "USA, France"` into names.
pub fn parse_visited(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// SVG of `scene` at animation frame `index`.
pub fn render_frame(scene: &GlobeScene, index: u64, viewport: Viewport) -> String {
    let rotation = Rotation::default().at_frame(Frame::new(index, DEFAULT_FRAME_DT_S));
    render_svg(&scene.project(&rotation, viewport), &GlobeStyle::default()).to_string()
}

/// `out/globe.svg`, frame 7 -> `out/globe-0007.svg`.
pub fn numbered_path(out: &Path, index: u64) -> PathBuf {
    let stem = out
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    out.with_file_name(format!("{stem}-{index:04}.svg"))
}

/// Reads files into a selection, in argument order; MIME types come from the
/// file extension.
pub async fn read_selection(paths: &[PathBuf]) -> Result<FileSelection, String> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("read {path:?}: {e}"))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("invalid file name: {path:?}"))?
            .to_string();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        files.push(SelectedFile::new(name, mime, bytes));
    }
    Ok(FileSelection::new(files))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use formats::{CountryShape, GeoPoint};
    use globe::{GlobeScene, Viewport};

    use super::{numbered_path, parse_visited, read_selection, render_frame};

    #[test]
    fn visited_list_is_trimmed() {
        assert_eq!(parse_visited("USA, France,, "), vec!["USA", "France"]);
    }

    #[test]
    fn frame_paths_are_numbered() {
        assert_eq!(
            numbered_path(Path::new("out/globe.svg"), 7),
            PathBuf::from("out/globe-0007.svg")
        );
    }

    #[test]
    fn frames_differ_as_the_globe_turns() {
        let ring = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(10.0, 0.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(0.0, 0.0),
        ];
        let scene = GlobeScene::with_visited(
            vec![CountryShape::new(None, "Gabon", vec![vec![ring]])],
            ["gabon"],
        );
        let a = render_frame(&scene, 0, Viewport::default());
        let b = render_frame(&scene, 100, Viewport::default());
        assert!(a.contains("<clipPath"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn selection_keeps_argument_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("b.jpg");
        let second = dir.path().join("a.heic");
        std::fs::write(&first, b"jpeg").expect("write");
        std::fs::write(&second, b"heic").expect("write");

        let mut selection = read_selection(&[first, second]).await.expect("read");
        let files = selection.take();
        assert_eq!(files[0].name, "b.jpg");
        assert_eq!(files[0].mime, "image/jpeg");
        assert_eq!(files[1].name, "a.heic");
        assert_eq!(files[1].bytes.as_ref(), b"heic");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = read_selection(&[PathBuf::from("/nonexistent/x.jpg")])
            .await
            .expect_err("missing");
        assert!(err.contains("x.jpg"));
    }
}
