use crate::error::ExdSheetError;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use url::Url;

/// Resolves a file locator to a path on the local file system.
///
/// Accepts `file://` URIs (percent-encoded, optionally with a host for UNC shares) as well as
/// plain paths. Relative paths are resolved against `base_dir`. Other URI schemes do not resolve.
///
/// # Arguments
/// * `locator` - URI or path handed over by the client
/// * `base_dir` - Root used for relative paths
///
/// # Returns
/// * `Result<PathBuf, ExdSheetError>` - Resolved path, `NotFound` if the locator cannot be resolved
pub(crate) fn resolve(locator: &str, base_dir: &Path) -> Result<PathBuf, ExdSheetError> {
    let path = match Url::parse(locator) {
        Ok(url) if url.scheme() == "file" => to_file_path(&url)
            .ok_or_else(|| ExdSheetError::NotFound(locator.to_owned()))?,
        // Single letters are Windows drive prefixes such as `C:\data\a.xlsx`
        Ok(url) if url.scheme().len() == 1 => PathBuf::from(locator),
        Ok(_) => Err(ExdSheetError::NotFound(locator.to_owned()))?,
        Err(_) => PathBuf::from(locator),
    };
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(base_dir.join(path))
    }
}

/// Converts a `file://` URL, keeping the host as a network share prefix
fn to_file_path(url: &Url) -> Option<PathBuf> {
    match url.host_str() {
        Some(host) if !host.is_empty() && host != "localhost" => {
            let path = url.to_file_path().ok().or_else(|| {
                let mut local = Url::parse("file:///").ok()?;
                local.set_path(url.path());
                local.to_file_path().ok()
            })?;
            let relative = path.strip_prefix("/").unwrap_or(&path).to_path_buf();
            Some(Path::new(&format!("//{host}")).join(relative))
        }
        _ => url.to_file_path().ok(),
    }
}

/// Opens a resolved spreadsheet path for reading.
/// Fails with `NotFound` when the path is not an existing regular file.
pub(crate) fn open_file(path: &Path) -> Result<BufReader<File>, ExdSheetError> {
    if !path.is_file() {
        Err(ExdSheetError::NotFound(path.to_string_lossy().to_string()))?
    }
    let file = File::open(path)?;
    Ok(BufReader::new(file))
}

/// Returns the last path segment used as the structure name
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn resolves_file_uri() {
        let path = resolve("file:///data/My%20File.xlsx", Path::new("/base")).unwrap();
        assert_eq!(path, PathBuf::from("/data/My File.xlsx"));

        let path = resolve("file://localhost/data/a.xlsx", Path::new("/base")).unwrap();
        assert_eq!(path, PathBuf::from("/data/a.xlsx"));
    }

    #[test]
    fn resolves_network_share() {
        let path = resolve("file://server/share/a.xlsx", Path::new("/base")).unwrap();
        assert_eq!(path, PathBuf::from("//server/share/a.xlsx"));
    }

    #[test]
    fn resolves_plain_paths() {
        let path = resolve("/data/a.xlsx", Path::new("/base")).unwrap();
        assert_eq!(path, PathBuf::from("/data/a.xlsx"));

        let path = resolve("sub/a.xlsx", Path::new("/base")).unwrap();
        assert_eq!(path, PathBuf::from("/base/sub/a.xlsx"));
    }

    #[test]
    fn rejects_remote_schemes() {
        let error = resolve("https://example.com/a.xlsx", Path::new("/base")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let error = open_file(Path::new("non_existent_file.xlsx")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        // Directories are not spreadsheets either
        let error = open_file(Path::new("src")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn open_local_file() {
        assert!(open_file(Path::new("Cargo.toml")).is_ok());
        assert_eq!(file_name(Path::new("/data/sub/a.xlsx")), "a.xlsx");
    }
}
