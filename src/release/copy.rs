// ABOUTME: Recursive directory copy and removal helpers.
// ABOUTME: Preserves permissions, modification times, and symlinks.

use snafu::ResultExt;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::symlink;
use std::path::Path;
use walkdir::WalkDir;

use super::error::{
    CopySnafu, CreateDirSnafu, FsError, MetadataSnafu, OutsideRootSnafu, ReadLinkSnafu,
    RemoveSnafu, SymlinkSnafu, WalkSnafu,
};

/// Copy the contents of `src` into `dst`, creating `dst` if needed.
///
/// Regular files keep their permission bits and modification time. Symlinks
/// are recreated with the same target rather than followed. Existing entries
/// in `dst` are overwritten; entries only `dst` has are left alone.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), FsError> {
    let mut dirs = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.context(WalkSnafu { path: src })?;
        let from = entry.path();
        let relative = from
            .strip_prefix(src)
            .context(OutsideRootSnafu { path: from, root: src })?;
        let to = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(from).context(ReadLinkSnafu { path: from })?;
            remove_path(&to)?;
            symlink(&target, &to).context(SymlinkSnafu {
                link: &to,
                target: &target,
            })?;
        } else if file_type.is_dir() {
            if to.symlink_metadata().is_ok_and(|m| !m.is_dir()) {
                remove_path(&to)?;
            }
            fs::create_dir_all(&to).context(CreateDirSnafu { path: &to })?;
            let permissions = entry
                .metadata()
                .context(WalkSnafu { path: from })?
                .permissions();
            dirs.push((to, permissions));
        } else {
            copy_file(from, &to)?;
        }
    }

    // Deepest first, once the contents are in, so a read-only source
    // directory doesn't block its own copy
    for (dir, permissions) in dirs.into_iter().rev() {
        fs::set_permissions(&dir, permissions).context(CopySnafu { from: src, to: &dir })?;
    }

    Ok(())
}

/// Make `dst` an exact copy of `src`: entries `src` no longer has are
/// removed, then everything is copied over.
pub fn mirror_dir(src: &Path, dst: &Path) -> Result<(), FsError> {
    if dst.symlink_metadata().is_ok() {
        remove_absent(src, dst)?;
    }
    copy_dir_recursive(src, dst)
}

fn remove_absent(src: &Path, dst: &Path) -> Result<(), FsError> {
    let mut walker = WalkDir::new(dst).min_depth(1).follow_links(false).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.context(WalkSnafu { path: dst })?;
        let relative = entry
            .path()
            .strip_prefix(dst)
            .context(OutsideRootSnafu {
                path: entry.path(),
                root: dst,
            })?;

        if src.join(relative).symlink_metadata().is_err() {
            tracing::debug!("Removing {}, gone from {}", entry.path().display(), src.display());
            remove_path(entry.path())?;
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<(), FsError> {
    if to.symlink_metadata().is_ok_and(|m| !m.is_file()) {
        remove_path(to)?;
    }

    // fs::copy carries the permission bits over
    fs::copy(from, to).context(CopySnafu { from, to })?;

    let modified = fs::metadata(from)
        .and_then(|m| m.modified())
        .context(MetadataSnafu { path: from })?;
    File::options()
        .write(true)
        .open(to)
        .and_then(|f| f.set_modified(modified))
        .context(CopySnafu { from, to })?;

    Ok(())
}

/// Remove a file, symlink, or directory tree. Missing paths are not an error.
pub fn remove_path(path: &Path) -> Result<(), FsError> {
    let metadata = match path.symlink_metadata() {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).context(MetadataSnafu { path }),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context(RemoveSnafu { path }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn copies_nested_tree() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("app/models")).unwrap();
        fs::write(src.path().join("app/models/user.rb"), "class User; end").unwrap();
        fs::write(src.path().join("Gemfile"), "source 'x'").unwrap();

        let target = dst.path().join("release");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(
            fs::read_to_string(target.join("app/models/user.rb")).unwrap(),
            "class User; end"
        );
        assert!(target.join("Gemfile").is_file());
    }

    #[test]
    fn preserves_permissions_and_mtime() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let script = src.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

        copy_dir_recursive(src.path(), dst.path()).unwrap();

        let copied = fs::metadata(dst.path().join("run.sh")).unwrap();
        assert_eq!(copied.permissions().mode() & 0o777, 0o750);
        assert_eq!(
            copied.modified().unwrap(),
            fs::metadata(&script).unwrap().modified().unwrap()
        );
    }

    #[test]
    fn recreates_symlinks() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        symlink("/does/not/exist", src.path().join("dangling")).unwrap();

        copy_dir_recursive(src.path(), dst.path()).unwrap();

        assert_eq!(
            fs::read_link(dst.path().join("dangling")).unwrap(),
            Path::new("/does/not/exist")
        );
    }

    #[test]
    fn replaces_file_with_directory() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("config")).unwrap();
        fs::write(src.path().join("config/app.yml"), "a: 1").unwrap();
        fs::write(dst.path().join("config"), "was a file").unwrap();

        copy_dir_recursive(src.path(), dst.path()).unwrap();

        assert!(dst.path().join("config/app.yml").is_file());
    }

    #[test]
    fn read_only_directories_are_copied() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let locked = src.path().join("vendor");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("lib.rb"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let target = dst.path().join("release");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert!(target.join("vendor/lib.rb").is_file());
        let mode = fs::metadata(target.join("vendor")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o555);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(target.join("vendor"), fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn mirror_drops_entries_removed_from_source() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("app")).unwrap();
        fs::write(src.path().join("app/main.rb"), "v2").unwrap();
        fs::create_dir_all(dst.path().join("app/old")).unwrap();
        fs::write(dst.path().join("app/old/helper.rb"), "").unwrap();
        fs::write(dst.path().join("app/main.rb"), "v1").unwrap();
        fs::write(dst.path().join("deleted.rb"), "").unwrap();

        mirror_dir(src.path(), dst.path()).unwrap();

        assert_eq!(fs::read_to_string(dst.path().join("app/main.rb")).unwrap(), "v2");
        assert!(!dst.path().join("app/old").exists());
        assert!(!dst.path().join("deleted.rb").exists());
    }

    #[test]
    fn mirror_into_missing_destination_copies() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("index.html"), "hi").unwrap();

        let target = dst.path().join("cache");
        mirror_dir(src.path(), &target).unwrap();

        assert!(target.join("index.html").is_file());
    }

    #[test]
    fn remove_path_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("nested")).unwrap();

        remove_path(&tree).unwrap();
        assert!(!tree.exists());
        remove_path(&tree).unwrap();
    }
}
