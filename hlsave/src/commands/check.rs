use anyhow::Result;
use clap::Args;
use hlsave::{downloader::SLOT_EXTENSION, looks_like_ts};
use log::{info, warn};
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

/// Find downloaded segments that are not MPEG-TS data (e.g. saved error pages).
#[derive(Debug, Clone, Args)]
pub struct Check {
    /// Directory under which `<name>/<episode>/*.ts` segments live.
    #[arg(default_value = "video")]
    pub root: PathBuf,

    /// Delete the invalid segments so that the next download fetches them again.
    #[arg(long)]
    pub delete: bool,
}

impl Check {
    pub fn execute(self) -> Result<()> {
        let pattern = format!(
            "{}/*/*/*.{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            SLOT_EXTENSION
        );
        let mut files = glob::glob(&pattern)?.collect::<Result<Vec<_>, _>>()?;
        files.sort();

        let mut invalid = 0;

        for file in &files {
            if !is_ts(file)? {
                invalid += 1;
                warn!("not a ts segment: {}", file.display());

                if self.delete {
                    std::fs::remove_file(file)?;
                    info!("{} deleted", file.display());
                }
            }
        }

        info!("{} of {} segments are invalid", invalid, files.len());
        Ok(())
    }
}

fn is_ts(path: &Path) -> Result<bool> {
    let mut head = Vec::with_capacity(4);
    File::open(path)?.take(4).read_to_end(&mut head)?;
    Ok(looks_like_ts(&head))
}
