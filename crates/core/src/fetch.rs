// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Source checkouts and data downloads for benchmark suites.

use crate::error::{Error, Result};
use crate::execution::{self, CommandSpec};
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tracing::{info, warn};

/// Clone `url` into `dir/name` and check out `commit`.
///
/// An existing clone is fetched and reset instead. A non-repository at the
/// target path is an error.
pub async fn git_clone(
    dir: &Path,
    name: &str,
    url: &str,
    commit: &str,
    timeout: Duration,
) -> Result<PathBuf> {
    let repo_path = dir.join(name);

    if repo_path.join(".git").is_dir() {
        info!(repo = %repo_path.display(), commit, "updating existing checkout");
        for args in [vec!["fetch"], vec!["reset", "--hard"], vec!["checkout", commit]] {
            let spec = CommandSpec::new("git")
                .args(args)
                .cwd(&repo_path)
                .timeout(timeout);
            execution::run(&spec).await?;
        }
    } else if !repo_path.exists() {
        info!(url, repo = %repo_path.display(), commit, "cloning");
        let clone = CommandSpec::new("git")
            .args(["clone", "--recursive", url])
            .arg(repo_path.display().to_string())
            .timeout(timeout);
        execution::run(&clone).await?;

        let checkout = CommandSpec::new("git")
            .args(["checkout", commit])
            .cwd(&repo_path)
            .timeout(timeout);
        execution::run(&checkout).await?;
    } else {
        return Err(Error::Workdir(format!(
            "the directory {} exists but is not a git repository",
            repo_path.display()
        )));
    }

    Ok(repo_path)
}

/// Download `url` to `dir/file_name` unless it is already there.
///
/// With `untar` set, the freshly downloaded gzip tarball is unpacked into
/// `dir`. Returns the path of the downloaded file.
pub async fn download(dir: &Path, url: &str, file_name: &str, untar: bool) -> Result<PathBuf> {
    let data_file = dir.join(file_name);
    if data_file.exists() {
        info!(file = %data_file.display(), "already downloaded, skipping");
        return Ok(data_file);
    }

    fs::create_dir_all(dir)?;
    info!(url, file = %data_file.display(), "downloading");
    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;
    store_download(dir, file_name, &bytes, untar).await
}

/// Write downloaded `bytes` to `dir/file_name`, unpacking them first if asked.
///
/// The data is staged in a `.part` file and only moved to its final name once
/// it has been unpacked, so a failed extraction leaves nothing behind that
/// [`download`] would mistake for a finished download.
async fn store_download(dir: &Path, file_name: &str, bytes: &[u8], untar: bool) -> Result<PathBuf> {
    let data_file = dir.join(file_name);
    let partial = dir.join(format!("{}.part", file_name));
    tokio::fs::write(&partial, bytes).await?;

    if untar {
        let archive = partial.clone();
        let dest = dir.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extract_tar_gz(&archive, &dest))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))
            .and_then(|r| r);
        if let Err(e) = extracted {
            if let Err(cleanup) = fs::remove_file(&partial) {
                warn!(file = %partial.display(), error = %cleanup, "failed to remove partial download");
            }
            return Err(e);
        }
    }

    tokio::fs::rename(&partial, &data_file).await?;
    Ok(data_file)
}

/// Unpack a gzip-compressed tarball into `dest`.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    fs::create_dir_all(dest)?;
    archive.unpack(dest)?;
    Ok(())
}
