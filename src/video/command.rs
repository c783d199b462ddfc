//! FFmpeg command builder.

use crate::error::ComposeError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Each input's options followed by its source
    inputs: Vec<(Vec<String>, String)>,
    /// Options collected for the next input
    pending_input_args: Vec<String>,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Output file path
    output: PathBuf,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            pending_input_args: Vec::new(),
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            log_level: "error".to_string(),
        }
    }

    /// Add an option for the next input.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.pending_input_args.push(arg.into());
        self
    }

    /// Add multiple options for the next input.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending_input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an input; options given since the previous input apply to it.
    pub fn input(mut self, source: impl Into<String>) -> Self {
        let args = std::mem::take(&mut self.pending_input_args);
        self.inputs.push((args, source.into()));
        self
    }

    /// Add an input file.
    pub fn input_path(self, path: impl AsRef<Path>) -> Self {
        let source = path.as_ref().to_string_lossy().to_string();
        self.input(source)
    }

    /// Add output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];

        for (input_args, source) in &self.inputs {
            args.extend(input_args.iter().cloned());
            args.push("-i".to_string());
            args.push(source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }

    /// Resolve `ffmpeg` on PATH and prepare the process.
    pub fn to_command(&self) -> Result<Command, ComposeError> {
        let ffmpeg = check_ffmpeg()?;
        let args = self.build_args();
        tracing::debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut command = Command::new(ffmpeg);
        command.args(args);
        Ok(command)
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> Result<PathBuf, ComposeError> {
    which::which("ffmpeg").map_err(|_| ComposeError::ToolNotFound("ffmpeg"))
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> Result<PathBuf, ComposeError> {
    which::which("ffprobe").map_err(|_| ComposeError::ToolNotFound("ffprobe"))
}
