use super::command::FfmpegCommand;
use super::FrameSink;
use crate::error::ComposeError;
use image::RgbaImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    /// Frames buffered ahead of ffmpeg before `append_frame` blocks
    pub queue_depth: usize,
}

impl EncodeConfig {
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.width == 0 || self.height == 0 {
            return Err(ComposeError::encoder("encode width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(ComposeError::encoder("encode fps must be non-zero"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // yuv420p output needs even dimensions.
            return Err(ComposeError::encoder(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        if self.queue_depth == 0 {
            return Err(ComposeError::encoder("encode queue depth must be non-zero"));
        }
        Ok(())
    }
}

/// Largest even size not above `width` x `height`, at least 2x2
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    let even = |side: u32| (side - side % 2).max(2);
    (even(width), even(height))
}

/// Delete `path` if it exists so a fixed output location can be reused.
pub fn remove_stale(path: &Path) -> Result<(), ComposeError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// H.264 `.mov` writer fed through the system `ffmpeg` binary.
///
/// Frames go through a bounded queue to a writer thread that owns ffmpeg's
/// stdin. When ffmpeg falls behind the queue fills and `append_frame`
/// blocks until there is room again, so frames are never dropped or
/// reordered.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    child: Option<Child>,
    frames: Option<SyncSender<Arc<RgbaImage>>>,
    writer: Option<JoinHandle<std::io::Result<u64>>>,
    next_pts: u64,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig) -> Result<Self, ComposeError> {
        cfg.validate()?;
        if let Some(parent) = cfg.out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        remove_stale(&cfg.out_path)?;

        let command = FfmpegCommand::new(&cfg.out_path)
            .input_args([
                "-f".to_string(),
                "rawvideo".to_string(),
                "-pix_fmt".to_string(),
                "rgba".to_string(),
                "-s".to_string(),
                format!("{}x{}", cfg.width, cfg.height),
                "-r".to_string(),
                cfg.fps.to_string(),
            ])
            .input("pipe:0")
            .output_args(["-an", "-c:v", "libx264", "-pix_fmt", "yuv420p", "-f", "mov"]);

        let mut child = command
            .to_command()?
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ComposeError::encoder(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ComposeError::encoder("failed to open ffmpeg stdin"))?;

        let (tx, rx) = mpsc::sync_channel(cfg.queue_depth);
        let frame_len = frame_len(cfg.width, cfg.height);
        let writer = std::thread::Builder::new()
            .name("ffmpeg-writer".to_string())
            .spawn(move || write_frames(stdin, rx, frame_len))?;

        tracing::info!(
            "Encoding {}x{} @ {} fps to {}",
            cfg.width,
            cfg.height,
            cfg.fps,
            cfg.out_path.display()
        );

        Ok(Self {
            cfg,
            child: Some(child),
            frames: Some(tx),
            writer: Some(writer),
            next_pts: 0,
        })
    }

    /// Close the stream and wait for ffmpeg to write the container.
    ///
    /// Returns the number of frames written.
    pub fn finish(mut self) -> Result<u64, ComposeError> {
        let _span = tracing::debug_span!("finish_encode").entered();

        drop(self.frames.take());
        let written = self.join_writer();

        let child = self
            .child
            .take()
            .ok_or_else(|| ComposeError::encoder("ffmpeg encoder is already finalized"))?;
        let output = child
            .wait_with_output()
            .map_err(|e| ComposeError::encoder(format!("failed to wait for ffmpeg to finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ComposeError::encoder(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let written = written?;
        tracing::info!("Wrote {} frames to {}", written, self.cfg.out_path.display());
        Ok(written)
    }

    fn join_writer(&mut self) -> Result<u64, ComposeError> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| ComposeError::encoder("frame writer already joined"))?;
        writer
            .join()
            .map_err(|_| ComposeError::encoder("frame writer panicked"))?
            .map_err(|e| ComposeError::encoder(format!("failed to write frame to ffmpeg stdin: {e}")))
    }
}

impl FrameSink for FfmpegEncoder {
    fn append_frame(&mut self, frame: Arc<RgbaImage>, pts: u64) -> Result<(), ComposeError> {
        if frame.dimensions() != (self.cfg.width, self.cfg.height) {
            return Err(ComposeError::encoder(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }
        // Raw video carries no timestamps; frame order is the timeline.
        if pts != self.next_pts {
            return Err(ComposeError::encoder(format!(
                "frame {} appended out of order, expected {}",
                pts, self.next_pts
            )));
        }

        let Some(frames) = self.frames.as_ref() else {
            return Err(ComposeError::encoder("ffmpeg encoder is already finalized"));
        };

        if frames.send(frame).is_err() {
            // The writer only hangs up after a write error.
            self.frames = None;
            return match self.join_writer() {
                Err(err) => Err(err),
                Ok(_) => Err(ComposeError::encoder("frame writer stopped early")),
            };
        }

        self.next_pts += 1;
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.cfg.width, self.cfg.height)
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.frames.take());
        if let Some(mut child) = self.child.take() {
            tracing::debug!("Encoder dropped before finish, stopping ffmpeg");
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

fn write_frames(
    mut stdin: ChildStdin,
    frames: Receiver<Arc<RgbaImage>>,
    frame_len: usize,
) -> std::io::Result<u64> {
    let mut scratch = vec![0u8; frame_len];
    let mut written = 0u64;
    for frame in frames {
        flatten_to_opaque_rgba8(&mut scratch, frame.as_raw(), [0, 0, 0]);
        stdin.write_all(&scratch)?;
        written += 1;
    }
    stdin.flush()?;
    Ok(written)
}

/// Bytes in one raw RGBA frame
fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Composite straight-alpha RGBA over an opaque background color.
fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8], bg_rgb: [u8; 3]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        for c in 0..3 {
            d[c] = (mul_div255(s[c] as u16, a) + mul_div255(bg_rgb[c] as u16, inv)).min(255) as u8;
        }
        d[3] = 255;
    }
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(width: u32, height: u32, fps: u32) -> EncodeConfig {
        EncodeConfig {
            width,
            height,
            fps,
            out_path: PathBuf::from("out/empty.mov"),
            queue_depth: 4,
        }
    }

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(config(0, 10, 30).validate().is_err());
        assert!(config(11, 10, 30).validate().is_err());
        assert!(config(10, 10, 0).validate().is_err());
        assert!(EncodeConfig {
            queue_depth: 0,
            ..config(10, 10, 30)
        }
        .validate()
        .is_err());
        assert!(config(10, 10, 30).validate().is_ok());
    }

    #[test]
    fn odd_sizes_round_down_to_even() {
        assert_eq!(even_dimensions(641, 480), (640, 480));
        assert_eq!(even_dimensions(1, 3), (2, 2));
        assert_eq!(even_dimensions(1080, 1920), (1080, 1920));
    }

    #[test]
    fn flatten_straight_over_black_produces_expected_rgb() {
        // Straight red @ 50% alpha => rgb becomes 128,0,0 over black.
        let src = vec![255u8, 0u8, 0u8, 128u8];
        let mut dst = vec![0u8; 4];
        flatten_to_opaque_rgba8(&mut dst, &src, [0, 0, 0]);
        assert_eq!(dst, vec![128u8, 0u8, 0u8, 255u8]);
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let src = vec![1u8, 2, 3, 255, 9, 9, 9, 0];
        let mut dst = vec![0u8; 8];
        flatten_to_opaque_rgba8(&mut dst, &src, [0, 0, 0]);
        assert_eq!(dst, vec![1u8, 2, 3, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn frame_len_does_not_wrap_for_huge_frames() {
        assert_eq!(frame_len(640, 480), 640 * 480 * 4);
        assert_eq!(frame_len(40_000, 30_000), 4_800_000_000);
    }

    #[test]
    fn remove_stale_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mov");
        remove_stale(&path).unwrap();

        std::fs::write(&path, b"old").unwrap();
        remove_stale(&path).unwrap();
        assert!(!path.exists());
    }
}
