//! Postfix `cidr:` access table.
//!
//! ## Write protocol
//!
//! 1. Render the table from the trusted networks and the range set.
//! 2. Optionally copy the live file to `<path>.backup.<unix-seconds>`.
//! 3. Write to `<path>.relaysync.tmp` and fsync it.
//! 4. Rename over the live path (atomic on POSIX when on the same filesystem).
//!
//! Postfix therefore only ever sees the old file or the complete new one.

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use relaysync_types::{IpRangeSet, SyncConfig};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{CoreError, CoreResult};

const ACTION: &str = "OK";

/// The access file and everything needed to render it.
#[derive(Debug, Clone)]
pub struct AccessFile {
    path: PathBuf,
    source_url: String,
    trusted: Vec<IpNet>,
    keep_backup: bool,
}

/// Filesystem view of the live access file, for `/postfix`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FileInfo {
    pub exists: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl AccessFile {
    pub fn new(
        path: impl Into<PathBuf>,
        source_url: impl Into<String>,
        trusted: Vec<IpNet>,
    ) -> Self {
        let mut unique: Vec<IpNet> = Vec::with_capacity(trusted.len());
        for net in trusted.into_iter().map(|net| net.trunc()) {
            if !unique.contains(&net) {
                unique.push(net);
            }
        }
        Self { path: path.into(), source_url: source_url.into(), trusted: unique, keep_backup: false }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.access_file, &config.upstream_url, config.trusted_networks.clone())
            .with_backup(config.backup_access_file)
    }

    pub fn with_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn trusted(&self) -> &[IpNet] {
        &self.trusted
    }

    fn tmp_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.relaysync.tmp", self.path.display()))
    }

    /// Render the table. Output depends only on the inputs, never on the clock.
    pub fn render(&self, ranges: &IpRangeSet) -> String {
        let upstream: Vec<&IpNet> =
            ranges.iter().filter(|net| !self.trusted.contains(*net)).collect();

        let mut out = String::new();
        let _ = writeln!(out, "# Managed by relaysync. Manual edits are overwritten.");
        let _ = writeln!(out, "# Source: {}", self.source_url);
        let _ = writeln!(out, "# Total IP ranges: {}", upstream.len());
        let _ = writeln!(out, "# Trusted networks: {}", self.trusted.len());
        out.push('\n');

        for net in &self.trusted {
            let _ = writeln!(out, "{net} {ACTION}");
        }
        for net in upstream {
            let _ = writeln!(out, "{net} {ACTION}");
        }
        out
    }

    /// Render and atomically replace the live file.
    pub async fn write(&self, ranges: &IpRangeSet) -> CoreResult<()> {
        let content = self.render(ranges);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| CoreError::io(parent, e))?;
        }

        if self.keep_backup {
            self.backup().await?;
        }

        let tmp = self.tmp_path();
        if let Err(e) = write_synced(&tmp, content.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::io(&tmp, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::io(&self.path, e));
        }

        tracing::info!("[Sync] Wrote {} with {} ranges", self.path.display(), ranges.len());
        Ok(())
    }

    async fn backup(&self) -> CoreResult<()> {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => {},
            Ok(false) => return Ok(()),
            Err(e) => return Err(CoreError::io(&self.path, e)),
        }
        let backup =
            PathBuf::from(format!("{}.backup.{}", self.path.display(), Utc::now().timestamp()));
        tokio::fs::copy(&self.path, &backup).await.map_err(|e| CoreError::io(&backup, e))?;
        tracing::debug!("[Sync] Backed up access file to {}", backup.display());
        Ok(())
    }

    /// Current contents of the live file, `None` if it does not exist.
    pub async fn read(&self) -> CoreResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::io(&self.path, e)),
        }
    }

    pub async fn info(&self) -> FileInfo {
        FileInfo::stat(&self.path).await
    }
}

impl FileInfo {
    pub async fn stat(path: &Path) -> Self {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Self {
                exists: true,
                size: Some(meta.len()),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            },
            Err(_) => Self::default(),
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(prefixes: &[&str]) -> IpRangeSet {
        prefixes.iter().map(|p| p.parse::<IpNet>().unwrap()).collect()
    }

    fn access_file(dir: &TempDir) -> AccessFile {
        AccessFile::new(
            dir.path().join("clients.cidr"),
            "https://ip-ranges.example.com/",
            vec!["127.0.0.0/8".parse().unwrap(), "10.0.0.0/8".parse().unwrap()],
        )
    }

    #[test]
    fn test_render_layout() {
        let dir = TempDir::new().unwrap();
        let rendered = access_file(&dir).render(&set(&["3.4.5.0/24", "2001:db8::/32"]));
        let expected = "\
# Managed by relaysync. Manual edits are overwritten.
# Source: https://ip-ranges.example.com/
# Total IP ranges: 2
# Trusted networks: 2

127.0.0.0/8 OK
10.0.0.0/8 OK
3.4.5.0/24 OK
2001:db8::/32 OK
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_render_is_deterministic_and_order_independent() {
        let dir = TempDir::new().unwrap();
        let file = access_file(&dir);
        let a = file.render(&set(&["3.4.5.0/24", "1.2.3.0/24", "9.9.9.0/24"]));
        let b = file.render(&set(&["9.9.9.0/24", "3.4.5.0/24", "1.2.3.0/24"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_skips_ranges_already_trusted() {
        let dir = TempDir::new().unwrap();
        let rendered = access_file(&dir).render(&set(&["10.0.0.0/8", "3.4.5.0/24"]));
        assert_eq!(rendered.matches("10.0.0.0/8 OK").count(), 1);
        assert!(rendered.contains("# Total IP ranges: 1\n"));
        let entries = rendered.lines().filter(|l| l.ends_with(" OK")).count();
        assert_eq!(entries, 3);
    }

    #[tokio::test]
    async fn test_write_replaces_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let file = access_file(&dir);
        tokio::fs::write(file.path(), "stale\n").await.unwrap();

        file.write(&set(&["3.4.5.0/24"])).await.unwrap();

        let content = file.read().await.unwrap().unwrap();
        assert!(content.contains("3.4.5.0/24 OK"));
        assert!(!content.contains("stale"));
        assert!(!file.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_write_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let file = AccessFile::new(dir.path().join("postfix/clients.cidr"), "u", Vec::new());
        file.write(&set(&["3.4.5.0/24"])).await.unwrap();
        assert!(file.info().await.exists);
    }

    #[tokio::test]
    async fn test_backup_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let file = access_file(&dir).with_backup(true);
        tokio::fs::write(file.path(), "previous\n").await.unwrap();

        file.write(&set(&["3.4.5.0/24"])).await.unwrap();

        let mut backups = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("clients.cidr.backup.") {
                backups.push(entry.path());
            }
        }
        assert_eq!(backups.len(), 1);
        assert_eq!(tokio::fs::read_to_string(&backups[0]).await.unwrap(), "previous\n");
    }

    #[tokio::test]
    async fn test_rename_failure_is_write_error() {
        let dir = TempDir::new().unwrap();
        // A directory at the target path makes the rename fail.
        let target = dir.path().join("clients.cidr");
        tokio::fs::create_dir(&target).await.unwrap();
        tokio::fs::write(target.join("keep"), "x").await.unwrap();

        let file = AccessFile::new(&target, "u", Vec::new());
        let err = file.write(&set(&["3.4.5.0/24"])).await.unwrap_err();
        assert_eq!(err.kind(), relaysync_types::SyncErrorKind::Write);
        assert!(!file.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_info_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let info = access_file(&dir).info().await;
        assert_eq!(info, FileInfo::default());
        assert!(access_file(&dir).read().await.unwrap().is_none());
    }
}
