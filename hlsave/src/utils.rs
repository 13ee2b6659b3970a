use std::{
    env,
    path::{Path, PathBuf},
};

/// Finds an executable in the working directory or on PATH.
pub(crate) fn find_binary(name: &str) -> Option<PathBuf> {
    let bin = if cfg!(target_os = "windows") {
        format!("{}.exe", name)
    } else {
        name.to_owned()
    };

    if Path::new(&bin).exists() {
        return Some(PathBuf::from(bin));
    }

    env::split_paths(&env::var_os("PATH")?).find_map(|s| {
        let x = s.join(&bin);

        if x.is_file() { Some(x) } else { None }
    })
}

/// Whether the first bytes of a file look like an MPEG-TS packet header.
pub fn looks_like_ts(head: &[u8]) -> bool {
    head.get(..4.min(head.len()))
        .is_some_and(|x| x.windows(3).any(|w| w == b"G@\x11"))
}

#[cfg(test)]
mod tests {
    use super::looks_like_ts;

    #[test]
    fn ts_header() {
        assert!(looks_like_ts(b"G@\x11\x10rest"));
        assert!(looks_like_ts(b"\x00G@\x11"));
        assert!(!looks_like_ts(b"<html>"));
        assert!(!looks_like_ts(b"G@"));
    }
}
