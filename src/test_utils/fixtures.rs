//! Release fixtures: archives and feed documents.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::constants::PLUGIN_MODULE;

/// Builder for a release archive.
///
/// By default entries go below `<top>/lightgroup_tools/`, mirroring a
/// source archive whose single top-level directory holds the repository.
#[derive(Debug, Clone)]
pub struct ReleaseArchive {
    top: String,
    payload_dir: String,
    entries: Vec<(String, Vec<u8>)>,
}

impl ReleaseArchive {
    pub fn new(top: impl Into<String>) -> Self {
        Self {
            top: top.into(),
            payload_dir: PLUGIN_MODULE.to_string(),
            entries: Vec::new(),
        }
    }

    /// A complete plugin release: `__init__.py` plus an operator module.
    pub fn plugin(top: impl Into<String>, version: &str) -> Self {
        Self::new(top)
            .plugin_file("__init__.py", &format!("__version__ = \"{version}\"\n"))
            .plugin_file("ops/lightgroups.py", &format!("# lightgroup operators {version}\n"))
    }

    /// Add a file below the payload directory.
    #[must_use]
    pub fn plugin_file(mut self, path: &str, content: &str) -> Self {
        let name = format!("{}/{}/{path}", self.top, self.payload_dir);
        self.entries.push((name, content.as_bytes().to_vec()));
        self
    }

    /// Add a file at an arbitrary path inside the archive.
    #[must_use]
    pub fn raw_file(mut self, path: &str, content: &str) -> Self {
        self.entries.push((path.to_string(), content.as_bytes().to_vec()));
        self
    }

    /// Encode the archive.
    pub fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.add_directory(format!("{}/", self.top), options).expect("add top-level directory");
        for (name, content) in &self.entries {
            writer.start_file(name.as_str(), options).expect("start zip entry");
            writer.write_all(content).expect("write zip entry");
        }

        writer.finish().expect("finish zip archive").into_inner()
    }

    /// A valid zip archive without a single entry.
    pub fn empty() -> Vec<u8> {
        ZipWriter::new(Cursor::new(Vec::new())).finish().expect("finish zip archive").into_inner()
    }
}

/// Release feed document in the shape of the GitHub `releases/latest` API.
pub fn release_feed(tag: &str, zipball_url: &str, checksum_url: Option<&str>) -> String {
    let assets: Vec<serde_json::Value> = checksum_url
        .map(|url| {
            vec![serde_json::json!({
                "name": "SHA256SUMS",
                "browser_download_url": url,
            })]
        })
        .unwrap_or_default();

    serde_json::json!({
        "tag_name": tag,
        "name": format!("Lightgroup Tools {tag}"),
        "draft": false,
        "prerelease": false,
        "zipball_url": zipball_url,
        "assets": assets,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_layout() {
        let bytes = ReleaseArchive::plugin("repo-v0.0.6", "0.0.6").build();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"repo-v0.0.6/lightgroup_tools/__init__.py".to_string()));
        assert!(names.contains(&"repo-v0.0.6/lightgroup_tools/ops/lightgroups.py".to_string()));

        let mut init = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("repo-v0.0.6/lightgroup_tools/__init__.py").unwrap(),
            &mut init,
        )
        .unwrap();
        assert!(init.contains("0.0.6"));
    }

    #[test]
    fn test_release_feed_parses() {
        let body = release_feed("v0.0.6", "http://localhost/zip", Some("http://localhost/sums"));
        let release = crate::updater::ReleaseInfo::from_feed(&body).unwrap();
        assert_eq!(release.tag, "v0.0.6");
        assert_eq!(release.checksum_url.as_deref(), Some("http://localhost/sums"));
    }
}
