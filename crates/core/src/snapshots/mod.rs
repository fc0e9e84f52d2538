//! Snapshot discovery and the local download store.
//!
//! Issuers publish holdings snapshots into shared Drive folders. The
//! folders are listed without credentials by scraping the embedded
//! folder view, falling back to the folder page itself, then the two
//! most recent dated files are materialized into a local store that
//! keeps a bounded number of downloads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use scraper::{Html, Selector};

use crate::errors::{ReconcileError, Result};

const EMBEDDED_VIEW_URL: &str = "https://drive.google.com/embeddedfolderview";
const FOLDER_URL: &str = "https://drive.google.com/drive/folders";
const DOWNLOAD_URL: &str = "https://drive.google.com/uc";

/// Downloads kept in the store after eviction, newest first by mtime.
const KEEP_DOWNLOADS: usize = 20;

lazy_static! {
    static ref FOLDER_ID_REGEX: Regex =
        Regex::new(r"/folders/([a-zA-Z0-9_-]+)").expect("Invalid regex pattern");
    static ref FILE_HREF_REGEX: Regex =
        Regex::new(r"/file/d/([a-zA-Z0-9_-]+)/").expect("Invalid regex pattern");
    static ref DOC_ID_REGEX: Regex = Regex::new(
        r#"(?s)"doc_id"\s*:\s*"(?P<id>[a-zA-Z0-9_-]+)".{0,200}?"title"\s*:\s*"(?P<name>[^"]+)""#
    )
    .expect("Invalid regex pattern");
    static ref SNAPSHOT_DATE_REGEX: Regex =
        Regex::new(r"(202[0-9])-?([0-1][0-9])-?([0-3][0-9])").expect("Invalid regex pattern");
    static ref EMBEDDED_LINK_SELECTOR: Selector =
        Selector::parse("div#folder-view a[href*='?id=']").expect("Invalid selector");
    static ref ANCHOR_SELECTOR: Selector = Selector::parse("a").expect("Invalid selector");
}

/// One file visible in a remote folder listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteFile {
    pub name: String,
    pub id: String,
}

/// A remote file whose name carries a snapshot date (`YYYYMMDD`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotFile {
    pub name: String,
    pub id: String,
    pub date: String,
}

/// Unauthenticated Drive folder listing and file download.
pub struct DriveClient {
    http: reqwest::Client,
}

impl DriveClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { http })
    }

    /// List a shared folder's files, deduplicated by (name, id). Each
    /// listing strategy is best-effort; a failed scrape contributes
    /// nothing rather than failing the whole listing.
    pub async fn list_folder(&self, folder_url: &str) -> Result<Vec<RemoteFile>> {
        let folder_id = extract_folder_id(folder_url).ok_or_else(|| {
            ReconcileError::Discovery(format!("no folder id in url: {folder_url}"))
        })?;

        let mut files = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let embedded = format!("{EMBEDDED_VIEW_URL}?id={folder_id}#list");
        let page = format!("{FOLDER_URL}/{folder_id}");
        for (url, parse) in [
            (embedded, parse_embedded_listing as fn(&str) -> Vec<RemoteFile>),
            (page, parse_folder_page),
        ] {
            match self.fetch_html(&url).await {
                Ok(html) => {
                    for file in parse(&html) {
                        if seen.insert((file.name.clone(), file.id.clone())) {
                            files.push(file);
                        }
                    }
                }
                Err(e) => warn!("folder listing fetch failed for {url}: {e}"),
            }
        }

        debug!("listed {} files in folder {folder_id}", files.len());
        Ok(files)
    }

    pub async fn download(&self, file: &SnapshotFile, dest: &Path) -> Result<()> {
        let url = format!("{DOWNLOAD_URL}?id={}&export=download", file.id);
        let bytes = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        std::fs::write(dest, &bytes)?;
        Ok(())
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        Ok(self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

fn extract_folder_id(folder_url: &str) -> Option<String> {
    FOLDER_ID_REGEX
        .captures(folder_url)
        .map(|c| c[1].to_string())
}

/// Parse the embedded folder view: the folder listing's own links
/// first, then any anchor whose href names a file id.
fn parse_embedded_listing(html: &str) -> Vec<RemoteFile> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for anchor in document.select(&EMBEDDED_LINK_SELECTOR) {
        let href = anchor.value().attr("href").unwrap_or("");
        let name = anchor.text().collect::<String>().trim().to_string();
        if let Some((_, id)) = href.split_once("id=") {
            if !id.is_empty() && !name.is_empty() {
                out.push(RemoteFile {
                    name,
                    id: id.to_string(),
                });
            }
        }
    }

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let href = anchor.value().attr("href").unwrap_or("");
        let name = anchor.text().collect::<String>().trim().to_string();
        if let Some(m) = FILE_HREF_REGEX.captures(href) {
            if !name.is_empty() {
                out.push(RemoteFile {
                    name,
                    id: m[1].to_string(),
                });
            }
        }
    }

    out
}

/// Parse the folder page itself: anchors with file hrefs, then the
/// embedded `doc_id`/`title` metadata pairs in the page script.
fn parse_folder_page(html: &str) -> Vec<RemoteFile> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let element = anchor.value();
        let href = element.attr("href").unwrap_or("");
        let Some(m) = FILE_HREF_REGEX.captures(href) else {
            continue;
        };
        let text = anchor.text().collect::<String>().trim().to_string();
        let name = if !text.is_empty() {
            text
        } else {
            element
                .attr("aria-label")
                .or_else(|| element.attr("title"))
                .unwrap_or("")
                .to_string()
        };
        if !name.is_empty() {
            out.push(RemoteFile {
                name,
                id: m[1].to_string(),
            });
        }
    }

    for m in DOC_ID_REGEX.captures_iter(html) {
        let name = urlencoding::decode(&m["name"])
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| m["name"].to_string());
        out.push(RemoteFile {
            name,
            id: m["id"].to_string(),
        });
    }

    out
}

/// Keep files whose name carries a date, newest first, and return up
/// to the two most recent. Fewer than two means the fund has no pair
/// to compare yet.
pub fn latest_two(files: &[RemoteFile]) -> Vec<SnapshotFile> {
    let mut dated: Vec<SnapshotFile> = files
        .iter()
        .filter_map(|f| {
            SNAPSHOT_DATE_REGEX.captures(&f.name).map(|m| SnapshotFile {
                name: f.name.clone(),
                id: f.id.clone(),
                date: format!("{}{}{}", &m[1], &m[2], &m[3]),
            })
        })
        .collect();
    dated.sort_by(|a, b| b.date.cmp(&a.date));
    dated.truncate(2);
    dated
}

/// Local directory of downloaded snapshots, bounded by eviction.
pub struct SnapshotStore {
    dir: PathBuf,
    keep: usize,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            keep: KEEP_DOWNLOADS,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the local path for a snapshot, downloading only when it
    /// is not already present.
    pub async fn materialize(&self, client: &DriveClient, file: &SnapshotFile) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file.name);
        if !path.exists() {
            debug!("downloading {}", file.name);
            client.download(file, &path).await?;
        }
        Ok(path)
    }

    /// Drop all but the most recently modified downloads. Removal
    /// failures are logged and skipped.
    pub fn evict_stale(&self) -> Result<()> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Ok(());
        };

        let mut files: Vec<(PathBuf, std::time::SystemTime)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if !path.is_file() {
                    return None;
                }
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((path, modified))
            })
            .collect();

        files.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _) in files.into_iter().skip(self.keep) {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("could not evict {}: {e}", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str, id: &str) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            id: id.to_string(),
        }
    }

    #[test]
    fn folder_id_extracted_from_share_url() {
        assert_eq!(
            extract_folder_id("https://drive.google.com/drive/folders/1mK6gf2kY_PA-2Mkh"),
            Some("1mK6gf2kY_PA-2Mkh".to_string())
        );
        assert_eq!(extract_folder_id("https://example.com/"), None);
    }

    #[test]
    fn embedded_listing_parses_folder_view_links() {
        let html = r#"
            <div id="folder-view">
              <a href="https://drive.google.com/file?id=abc123">0050_2024-01-02.xlsx</a>
            </div>
            <a href="/file/d/def456/view">0050_2023-12-29.xlsx</a>
        "#;
        let files = parse_embedded_listing(html);
        assert_eq!(
            files,
            vec![
                remote("0050_2024-01-02.xlsx", "abc123"),
                remote("0050_2023-12-29.xlsx", "def456"),
            ]
        );
    }

    #[test]
    fn folder_page_falls_back_to_doc_id_metadata() {
        let html = r#"<script>{"doc_id":"xyz789","flags":0,"title":"0050_20240102.xlsx"}</script>"#;
        let files = parse_folder_page(html);
        assert_eq!(files, vec![remote("0050_20240102.xlsx", "xyz789")]);
    }

    #[test]
    fn latest_two_picks_newest_dated_names() {
        let files = vec![
            remote("readme.txt", "a"),
            remote("0050_2023-12-29.xlsx", "b"),
            remote("0050_20240102.xlsx", "c"),
            remote("0050_2023-11-30.xlsx", "d"),
        ];
        let picked = latest_two(&files);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].date, "20240102");
        assert_eq!(picked[0].id, "c");
        assert_eq!(picked[1].date, "20231229");
    }

    #[test]
    fn latest_two_handles_sparse_folders() {
        assert!(latest_two(&[remote("notes.txt", "a")]).is_empty());
        let one = latest_two(&[remote("0050_20240102.xlsx", "a")]);
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn eviction_keeps_the_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore {
            dir: dir.path().to_path_buf(),
            keep: 2,
        };

        for (i, name) in ["a.xlsx", "b.xlsx", "c.xlsx"].iter().enumerate() {
            let path = dir.path().join(name);
            std::fs::write(&path, b"x").unwrap();
            let mtime = std::time::SystemTime::now() - Duration::from_secs(100 - i as u64);
            let file = std::fs::File::open(&path).unwrap();
            file.set_modified(mtime).unwrap();
        }

        store.evict_stale().unwrap();

        let mut remaining: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["b.xlsx".to_string(), "c.xlsx".to_string()]);
    }
}
