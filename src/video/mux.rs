use super::command::FfmpegCommand;
use super::encoder::remove_stale;
use super::probe::probe_media;
use super::VideoAsset;
use crate::error::ComposeError;
use std::path::Path;
use std::process::Stdio;

/// Puts an audio track under a silent video.
///
/// Both tracks start at zero and the result is cut to the video track's
/// duration: longer audio is truncated, shorter audio leaves trailing
/// silence. The video stream is copied untouched, which keeps its quality
/// and its orientation metadata.
#[derive(Debug, Clone)]
pub struct AudioMuxer {
    audio_bitrate: String,
}

impl AudioMuxer {
    pub fn new(audio_bitrate: impl Into<String>) -> Self {
        Self {
            audio_bitrate: audio_bitrate.into(),
        }
    }

    pub fn add_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<VideoAsset, ComposeError> {
        let _span = tracing::debug_span!("add_audio").entered();

        let video_info = probe_media(video).map_err(|e| ComposeError::add_audio(e.to_string()))?;
        let duration = video_info
            .video_duration()
            .ok_or_else(|| ComposeError::add_audio(format!("{} has no video track", video.display())))?;

        let audio_info = probe_media(audio).map_err(|e| ComposeError::add_audio(e.to_string()))?;
        if audio_info.audio.is_none() {
            return Err(ComposeError::add_audio(format!(
                "{} has no audio track",
                audio.display()
            )));
        }

        remove_stale(output)?;
        let command = self.mux_command(video, audio, output, duration);

        tracing::info!(
            "Muxing {} under {} ({:.3}s)",
            audio.display(),
            video.display(),
            duration
        );

        let result = command
            .to_command()?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ComposeError::add_audio(format!("failed to run ffmpeg: {e}")))?;

        if !result.status.success() {
            return Err(ComposeError::add_audio(format!(
                "ffmpeg exited with status {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        Ok(VideoAsset {
            path: output.to_path_buf(),
            duration,
            has_audio: true,
        })
    }

    /// Video track copied, audio re-encoded, output cut at `duration`.
    ///
    /// The cut comes from `-t` rather than `-shortest`, so audio shorter
    /// than the video leaves the tail silent instead of ending the file.
    fn mux_command(&self, video: &Path, audio: &Path, output: &Path, duration: f64) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input_path(video)
            .input_path(audio)
            .output_args([
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                "1:a:0".to_string(),
                "-t".to_string(),
                format!("{:.3}", duration),
                "-c:v".to_string(),
                "copy".to_string(),
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                self.audio_bitrate.clone(),
                "-map_metadata".to_string(),
                "0".to_string(),
                "-f".to_string(),
                "mov".to_string(),
            ])
    }
}
