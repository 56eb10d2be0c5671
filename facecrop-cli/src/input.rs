//! Input collection and output path mapping.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use log::{debug, warn};
use walkdir::WalkDir;

/// Extensions picked up when walking a directory.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "webp", "tif", "tiff"];

/// One image to crop and where its crop goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingItem {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Collect all image paths from a file or directory.
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!(
            "input path is neither file nor directory: {}",
            path.display()
        );
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if has_image_extension(entry.path()) {
            images.push(entry.path().to_path_buf());
        } else {
            debug!("Skipping non-image file {}", entry.path().display());
        }
    }
    images.sort();
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Pair every image under `input` with its output path.
///
/// A single file goes to `explicit` when given, otherwise to
/// `output_dir/<stem>.jpg`. Directory inputs mirror their relative layout
/// under `output_dir`; when two sources would land on the same crop (`a.png`
/// and `a.jpg`), the later one keeps its extension (`a.png.jpg`).
pub fn collect_targets(
    input: &Path,
    output_dir: &Path,
    explicit: Option<&Path>,
) -> Result<Vec<ProcessingItem>> {
    if explicit.is_some() && !input.is_file() {
        anyhow::bail!("--output requires --input to be a single file");
    }
    let images = collect_images(input)?;
    if images.is_empty() {
        anyhow::bail!(
            "no images found at {} (supported extensions: {})",
            input.display(),
            IMAGE_EXTENSIONS.join(", ")
        );
    }

    let root = if input.is_file() {
        input.parent().unwrap_or_else(|| Path::new(""))
    } else {
        input
    };
    let mut items: Vec<ProcessingItem> = images
        .into_iter()
        .map(|source| {
            let output = match explicit {
                Some(path) => path.to_path_buf(),
                None => mirrored_output_path(root, &source, output_dir),
            };
            ProcessingItem { source, output }
        })
        .collect();
    disambiguate_outputs(&mut items);
    Ok(items)
}

/// Give every item its own output path. The first source in walk order keeps
/// the mirrored path; later collisions are renamed to paths no other item
/// claims.
fn disambiguate_outputs(items: &mut [ProcessingItem]) {
    let mirrored: HashSet<PathBuf> = items.iter().map(|item| item.output.clone()).collect();
    let mut assigned = HashSet::with_capacity(items.len());
    for item in items.iter_mut() {
        if assigned.insert(item.output.clone()) {
            continue;
        }
        let file_name = item
            .source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut candidate = item.output.with_file_name(format!("{file_name}.jpg"));
        let mut suffix = 1;
        while mirrored.contains(&candidate) || assigned.contains(&candidate) {
            candidate = item
                .output
                .with_file_name(format!("{file_name}-{suffix}.jpg"));
            suffix += 1;
        }
        warn!(
            "{} shares its output with another input; writing {} instead",
            item.source.display(),
            candidate.display()
        );
        assigned.insert(candidate.clone());
        item.output = candidate;
    }
}

/// `output_dir` joined with `source` relative to `root`, extension `.jpg`.
pub fn mirrored_output_path(root: &Path, source: &Path, output_dir: &Path) -> PathBuf {
    let relative = source.strip_prefix(root).unwrap_or(source);
    // Only plain components survive so the result stays inside `output_dir`.
    let relative: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    let mut output = output_dir.join(relative);
    output.set_extension("jpg");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn directory_walk_keeps_images_only() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
        for name in ["a.JPG", "nested/b.tiff", "notes.txt", "nested/c.webp", "noext"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }
        let images = collect_images(dir.path()).expect("collect");
        let names: Vec<_> = images
            .iter()
            .map(|p| p.strip_prefix(dir.path()).expect("prefix").to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.JPG"),
                PathBuf::from("nested/b.tiff"),
                PathBuf::from("nested/c.webp"),
            ]
        );
    }

    #[test]
    fn outputs_mirror_the_input_tree() {
        let root = Path::new("/data/in");
        let source = Path::new("/data/in/team/alice.png");
        let out = mirrored_output_path(root, source, Path::new("cropped"));
        assert_eq!(out, PathBuf::from("cropped/team/alice.jpg"));
    }

    #[test]
    fn single_file_lands_in_output_dir_or_explicit_path() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("face.png");
        fs::write(&source, b"x").expect("write");

        let items = collect_targets(&source, Path::new("out"), None).expect("targets");
        assert_eq!(items[0].output, PathBuf::from("out/face.jpg"));

        let explicit = Path::new("elsewhere/crop.jpg");
        let items = collect_targets(&source, Path::new("out"), Some(explicit)).expect("targets");
        assert_eq!(items[0].output, explicit);
    }

    #[test]
    fn explicit_output_needs_a_single_file() {
        let dir = tempdir().expect("tempdir");
        let err = collect_targets(dir.path(), Path::new("out"), Some(Path::new("x.jpg")))
            .expect_err("directory with --output");
        assert!(err.to_string().contains("single file"));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let err = collect_targets(dir.path(), Path::new("out"), None).expect_err("empty");
        assert!(err.to_string().contains("no images found"));
    }

    #[test]
    fn same_stem_inputs_get_distinct_outputs() {
        let dir = tempdir().expect("tempdir");
        for name in ["a.png", "a.jpg", "a.png.jpg"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }
        let items = collect_targets(dir.path(), Path::new("out"), None).expect("targets");
        let outputs: Vec<_> = items
            .iter()
            .map(|item| {
                let name = item.source.file_name().expect("name").to_string_lossy();
                (name.into_owned(), item.output.clone())
            })
            .collect();
        assert_eq!(
            outputs,
            vec![
                ("a.jpg".to_string(), PathBuf::from("out/a.jpg")),
                ("a.png".to_string(), PathBuf::from("out/a.png-1.jpg")),
                ("a.png.jpg".to_string(), PathBuf::from("out/a.png.jpg")),
            ]
        );
        let unique: HashSet<_> = items.iter().map(|item| &item.output).collect();
        assert_eq!(unique.len(), items.len());
    }

    #[test]
    fn plain_collision_keeps_the_source_extension() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.png"), b"x").expect("write");
        fs::write(dir.path().join("a.jpg"), b"x").expect("write");
        let items = collect_targets(dir.path(), Path::new("out"), None).expect("targets");
        assert_eq!(items[0].output, PathBuf::from("out/a.jpg"));
        assert_eq!(items[1].output, PathBuf::from("out/a.png.jpg"));
    }
}
