//! On-disk layout and zip packaging of a downloaded article.
//!
//! An article is written as
//!
//! ```text
//! <work_root>/<title>/article.md
//! <work_root>/<title>/images/image_001.png
//! ```
//!
//! and compressed to `<work_root>/<title>.zip`, so the archive unpacks into
//! a single directory named after the article.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::Result;
use crate::extract::DownloadedAsset;
use crate::sanitize::sanitize_filename;

/// Directory holding images, relative to the Markdown file.
pub const IMAGES_DIR: &str = "images";

/// File name of the Markdown document inside the article directory.
pub const MARKDOWN_FILE: &str = "article.md";

/// An article written out as a directory.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleTree {
    /// Name of the top-level directory, the sanitized title.
    pub root_dir_name: String,
    pub article_dir: PathBuf,
    pub markdown_path: PathBuf,
    pub images_dir: PathBuf,
    pub image_count: usize,
}

/// An article directory and the archive made from it.
#[derive(Debug, Clone, Serialize)]
pub struct ArticlePackage {
    #[serde(flatten)]
    pub tree: ArticleTree,
    pub archive_path: PathBuf,
}

impl ArticlePackage {
    /// File name of the archive, e.g. `Title.zip`.
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.tree.root_dir_name)
    }
}

/// Writes the Markdown file and every image under `work_root/<title>/`.
///
/// The images directory is created even when there are no images. An
/// existing directory of the same name is replaced, so the tree holds only
/// this article's files.
pub fn write_article_tree(
    work_root: &Path, title: &str, markdown: &str, assets: &[DownloadedAsset],
) -> Result<ArticleTree> {
    let root_dir_name = sanitize_filename(title);
    let article_dir = work_root.join(&root_dir_name);
    let images_dir = article_dir.join(IMAGES_DIR);
    if article_dir.exists() {
        tracing::debug!(dir = %article_dir.display(), "replacing existing article directory");
        fs::remove_dir_all(&article_dir)?;
    }
    fs::create_dir_all(&images_dir)?;

    let markdown_path = article_dir.join(MARKDOWN_FILE);
    fs::write(&markdown_path, markdown)?;

    for asset in assets {
        fs::write(images_dir.join(&asset.file_name), &asset.bytes)?;
    }

    tracing::debug!(dir = %article_dir.display(), images = assets.len(), "wrote article tree");
    Ok(ArticleTree { root_dir_name, article_dir, markdown_path, images_dir, image_count: assets.len() })
}

/// Compresses `work_root/<root_dir_name>` into `work_root/<root_dir_name>.zip`.
///
/// Entry names are relative to `work_root` and use `/` separators. Entries
/// are added in file-name order with a fixed timestamp, so the same tree
/// always gives the same archive.
pub fn compress_article_tree(work_root: &Path, root_dir_name: &str) -> Result<PathBuf> {
    let source_dir = work_root.join(root_dir_name);
    let archive_path = work_root.join(format!("{}.zip", root_dir_name));

    let file = File::create(&archive_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for entry in WalkDir::new(&source_dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let relative = path.strip_prefix(work_root).unwrap_or(path);
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
        } else {
            zip.start_file(name, options)?;
            let mut source = File::open(path)?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    let mut file = zip.finish()?;
    file.flush()?;

    tracing::debug!(archive = %archive_path.display(), "compressed article");
    Ok(archive_path)
}

/// Writes the article tree and compresses it.
pub fn build_package(work_root: &Path, title: &str, markdown: &str, assets: &[DownloadedAsset]) -> Result<ArticlePackage> {
    let tree = write_article_tree(work_root, title, markdown, assets)?;
    let archive_path = compress_article_tree(work_root, &tree.root_dir_name)?;

    tracing::info!(archive = %archive_path.display(), images = tree.image_count, "packaged article");
    Ok(ArticlePackage { tree, archive_path })
}
