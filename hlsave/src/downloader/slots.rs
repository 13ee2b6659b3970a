use crate::crawler::DownloadItem;
use glob::Pattern;
use std::{
    io,
    path::{Path, PathBuf},
};

pub const SLOT_EXTENSION: &str = "ts";

/// On-disk locations used while downloading one item.
///
/// ```text
/// <root>/<name>/<episode>/00000.ts   slots
/// <root>/<name>/<episode>.tmp.mp4    staging file
/// <root>/<name>/<episode>.mp4        final artifact
/// ```
#[derive(Clone, Debug)]
pub struct ItemPaths {
    pub slots: SlotDir,
    pub temp: PathBuf,
    pub target: PathBuf,
}

impl ItemPaths {
    pub fn new(root: &Path, item: &DownloadItem) -> Self {
        let parent = root.join(&item.name);
        let episode = item.episode.key();

        Self {
            slots: SlotDir::new(parent.join(&episode)),
            temp: parent.join(format!("{}.tmp.mp4", episode)),
            target: parent.join(format!("{}.mp4", episode)),
        }
    }
}

/// Directory of per-segment files named by 5-digit index, so that
/// lexicographic order is playlist order.
#[derive(Clone, Debug)]
pub struct SlotDir {
    dir: PathBuf,
}

impl SlotDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{:05}.{}", index, SLOT_EXTENSION))
    }

    /// Where a slot is written before it is renamed into place.
    pub fn part_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{:05}.{}.part", index, SLOT_EXTENSION))
    }

    /// Completed slot files in index order.
    pub fn list(&self) -> io::Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/*.{}",
            Pattern::escape(&self.dir.to_string_lossy()),
            SLOT_EXTENSION
        );
        let mut files = vec![];

        for entry in glob::glob(&pattern)
            .map_err(|x| io::Error::new(io::ErrorKind::InvalidInput, x))?
        {
            let path = entry.map_err(glob::GlobError::into_error)?;

            if path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::EpisodeLabel;

    #[test]
    fn layout() {
        let item = DownloadItem {
            name: "DB".to_owned(),
            episode: EpisodeLabel::Number(1),
            page_url: String::new(),
            manifest_url: "https://a.com/index.m3u8".to_owned(),
        };
        let paths = ItemPaths::new(Path::new("video"), &item);

        assert_eq!(paths.slots.dir(), Path::new("video/DB/001"));
        assert_eq!(paths.slots.path(12), Path::new("video/DB/001/00012.ts"));
        assert_eq!(paths.temp, Path::new("video/DB/001.tmp.mp4"));
        assert_eq!(paths.target, Path::new("video/DB/001.mp4"));
    }

    #[test]
    fn list_ignores_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let slots = SlotDir::new(dir.path().join("[HD] x"));
        std::fs::create_dir_all(slots.dir()).unwrap();

        std::fs::write(slots.path(1), b"b").unwrap();
        std::fs::write(slots.path(0), b"a").unwrap();
        std::fs::write(slots.part_path(2), b"c").unwrap();

        assert_eq!(slots.list().unwrap(), vec![slots.path(0), slots.path(1)]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let slots = SlotDir::new(dir.path().join("001"));
        std::fs::create_dir_all(slots.dir()).unwrap();
        std::fs::write(slots.path(0), b"a").unwrap();
        std::fs::set_permissions(slots.dir(), std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root.
        let readable = std::fs::read_dir(slots.dir()).is_ok();
        let listed = slots.list();
        std::fs::set_permissions(slots.dir(), std::fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(listed.is_err());
        }
    }
}
