//! FFprobe media information.

use super::command::check_ffprobe;
use crate::error::ComposeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// What ffprobe reports about a media file.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub path: PathBuf,
    /// Container duration in seconds
    pub duration: f64,
    pub video: Option<VideoTrack>,
    pub audio: Option<AudioTrack>,
}

#[derive(Debug, Clone)]
pub struct VideoTrack {
    pub width: u32,
    pub height: u32,
    /// Track duration in seconds, when the container records it
    pub duration: Option<f64>,
    pub frame_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub duration: Option<f64>,
}

impl MediaInfo {
    /// Duration of the video track, falling back to the container's
    pub fn video_duration(&self) -> Option<f64> {
        let track = self.video.as_ref()?;
        Some(track.duration.unwrap_or(self.duration))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    nb_frames: Option<String>,
}

/// Probe a media file for its tracks and durations.
pub fn probe_media(path: impl AsRef<Path>) -> Result<MediaInfo, ComposeError> {
    let path = path.as_ref();
    let _span = tracing::debug_span!("probe", path = %path.display()).entered();

    if !path.exists() {
        return Err(ComposeError::probe(format!("{} does not exist", path.display())));
    }

    let ffprobe = check_ffprobe()?;
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ComposeError::probe(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(ComposeError::probe(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| ComposeError::probe(format!("ffprobe json parse failed: {e}")))?;
    Ok(media_info(path, parsed))
}

fn media_info(path: &Path, parsed: ProbeOutput) -> MediaInfo {
    let seconds = |value: &Option<String>| value.as_deref().and_then(|s| s.parse::<f64>().ok());

    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| seconds(&f.duration))
        .unwrap_or(0.0);

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| VideoTrack {
            width: s.width.unwrap_or(0),
            height: s.height.unwrap_or(0),
            duration: seconds(&s.duration),
            frame_count: s.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        });

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioTrack {
            duration: seconds(&s.duration),
        });

    MediaInfo {
        path: path.to_path_buf(),
        duration,
        video,
        audio,
    }
}
