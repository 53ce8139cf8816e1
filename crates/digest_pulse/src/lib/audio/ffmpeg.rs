use std::path::{Path, PathBuf};

use crate::{
    audio::{common_format, AudioMerger},
    error::Error,
};

/// Merges segments with ffmpeg's concat demuxer.
///
/// Segments sharing one container format are stream-copied without
/// re-encoding; anything else is re-encoded to MP3.
#[derive(Debug, Clone)]
pub struct FfmpegConcat {
    binary: PathBuf,
}

impl Default for FfmpegConcat {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegConcat {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Concat demuxer file list, one entry per segment in merge order
    fn manifest(paths: &[PathBuf]) -> String {
        paths
            .iter()
            .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', r"'\''")))
            .collect()
    }

    async fn run(&self, list_path: &Path, out_path: &Path, stream_copy: bool) -> Result<(), Error> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list_path);

        if stream_copy {
            cmd.args(["-c", "copy"]);
        } else {
            cmd.args(["-c:a", "libmp3lame", "-q:a", "2"]);
        }

        let output = cmd
            .arg(out_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Merge(format!("failed to run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Merge(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl AudioMerger for FfmpegConcat {
    #[tracing::instrument(skip_all, fields(segments = segments.len()))]
    async fn merge(&self, segments: Vec<Vec<u8>>) -> Result<Vec<u8>, Error> {
        if segments.is_empty() {
            return Err(Error::Merge("no segments to merge".into()));
        }

        let format = common_format(&segments);
        if format.is_none() {
            tracing::warn!("Segments differ in format, re-encoding to mp3");
        }
        let in_ext = format.map(|f| f.extension()).unwrap_or("bin");
        let out_ext = format.map(|f| f.extension()).unwrap_or("mp3");

        // removed on drop, whichever way this function returns
        let workdir = tempfile::Builder::new()
            .prefix("audio-merge-")
            .tempdir()
            .map_err(|e| Error::Merge(format!("failed to create temp dir: {e}")))?;

        let mut paths = Vec::with_capacity(segments.len());
        for (idx, segment) in segments.iter().enumerate() {
            let path = workdir.path().join(format!("seg_{idx:05}.{in_ext}"));
            tokio::fs::write(&path, segment)
                .await
                .map_err(|e| Error::Merge(format!("failed to write segment {idx}: {e}")))?;
            paths.push(path);
        }

        let list_path = workdir.path().join("filelist.txt");
        tokio::fs::write(&list_path, Self::manifest(&paths))
            .await
            .map_err(|e| Error::Merge(format!("failed to write concat list: {e}")))?;

        let out_path = workdir.path().join(format!("merged.{out_ext}"));
        self.run(&list_path, &out_path, format.is_some()).await?;

        let merged = tokio::fs::read(&out_path)
            .await
            .map_err(|e| Error::Merge(format!("failed to read merged audio: {e}")))?;

        tracing::info!(size = merged.len(), "Merged audio segments");
        Ok(merged)
    }
}
