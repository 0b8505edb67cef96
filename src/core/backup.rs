use crate::db::log::audit;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{info, success, warning};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub struct BackupLogic;

impl BackupLogic {
    /// Snapshot the live database into `dest_file` (optionally zipped).
    /// Returns the path of the final artifact, or `None` if the user
    /// declined to overwrite an existing file.
    pub fn backup(
        pool: &DbPool,
        dest_file: &str,
        compress: bool,
        force: bool,
    ) -> AppResult<Option<PathBuf>> {
        let dest = Path::new(dest_file);

        // 1️⃣ Ensure destination folder exists
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // 2️⃣ Existing file → confirm, then clear it (VACUUM INTO needs a fresh target)
        if dest.exists() {
            if !force && !confirm_overwrite(dest)? {
                warning("Backup cancelled by user.");
                return Ok(None);
            }
            fs::remove_file(dest)?;
        }

        // 3️⃣ Consistent snapshot, safe while the server is running
        let dest_str = dest
            .to_str()
            .ok_or_else(|| AppError::Validation(format!("Invalid path: {}", dest.display())))?;
        pool.conn.execute("VACUUM INTO ?1", [dest_str])?;
        success(format!("Backup created: {}", dest.display()));

        // 4️⃣ Optional compression
        let final_path = if compress {
            let zipped = compress_backup(dest)?;
            fs::remove_file(dest)?;
            info(format!("Removed uncompressed backup: {}", dest.display()));
            zipped
        } else {
            dest.to_path_buf()
        };

        // 5️⃣ Audit
        audit(
            &pool.conn,
            "backup",
            &final_path.to_string_lossy(),
            if compress {
                "Backup created and compressed"
            } else {
                "Backup created"
            },
        )?;

        Ok(Some(final_path))
    }
}

fn confirm_overwrite(dest: &Path) -> AppResult<bool> {
    warning(format!("The file '{}' already exists.", dest.display()));
    print!("Overwrite? [y/N]: ");
    io::stdout().flush().ok();

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Zip `path` next to itself (`<name>.zip`).
fn compress_backup(path: &Path) -> AppResult<PathBuf> {
    let zip_path = path.with_extension("zip");
    let entry_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "staffclock.sqlite".to_string());

    let mut zip = ZipWriter::new(fs::File::create(&zip_path)?);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(entry_name, options)
        .map_err(io::Error::other)?;
    io::copy(&mut fs::File::open(path)?, &mut zip)?;
    zip.finish().map_err(io::Error::other)?;

    info(format!("Compressed: {}", zip_path.display()));
    Ok(zip_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize::init_db;

    #[test]
    fn backup_copies_and_compresses() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DbPool::new(dir.path().join("live.sqlite").to_str().unwrap()).unwrap();
        init_db(&pool.conn).unwrap();

        let plain = dir.path().join("out/copy.sqlite");
        let out = BackupLogic::backup(&pool, plain.to_str().unwrap(), false, false)
            .unwrap()
            .unwrap();
        assert!(out.exists());

        // Overwrite without prompting when forced.
        let zipped = BackupLogic::backup(&pool, plain.to_str().unwrap(), true, true)
            .unwrap()
            .unwrap();
        assert_eq!(zipped.extension().unwrap(), "zip");
        assert!(zipped.exists());
        assert!(!plain.exists());
    }
}
