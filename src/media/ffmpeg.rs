use std::ffi::OsString;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AutodubError, Result};
use crate::sync::filter::{FilterGraph, FilterOp};

use super::{AudioHandle, MediaRenderer, VideoHandle};

/// Render collaborator backed by the `ffmpeg` and `ffprobe` binaries.
pub struct FfmpegRenderer {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl FfmpegRenderer {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
            Duration::from_secs(config.render_timeout_secs),
        )
    }

    /// Check that both binaries run.
    pub async fn check_available(&self) -> Result<()> {
        for program in [&self.ffmpeg, &self.ffprobe] {
            self.run(program, vec!["-version".into()]).await.map_err(|e| {
                AutodubError::Render(format!(
                    "{program} not usable. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
                ))
            })?;
        }
        debug!("FFmpeg and FFprobe are available");
        Ok(())
    }

    async fn run(&self, program: &str, args: Vec<OsString>) -> Result<Output> {
        debug!("Running {} {:?}", program, args);
        let mut cmd = Command::new(program);
        cmd.args(&args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| AutodubError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| AutodubError::Render(format!("Failed to run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AutodubError::Render(format!(
                "{program} failed: {}",
                stderr.trim()
            )));
        }
        Ok(output)
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = self
            .run(
                &self.ffprobe,
                vec![
                    "-v".into(),
                    "error".into(),
                    "-show_entries".into(),
                    "format=duration".into(),
                    "-of".into(),
                    "default=noprint_wrappers=1:nokey=1".into(),
                    path.into(),
                ],
            )
            .await?;

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim().parse::<f64>().map_err(|e| {
            AutodubError::Render(format!("Failed to parse duration '{}': {e}", text.trim()))
        })
    }

    async fn probe_fps(&self, path: &Path) -> Result<f64> {
        let output = self
            .run(
                &self.ffprobe,
                vec![
                    "-v".into(),
                    "error".into(),
                    "-select_streams".into(),
                    "v:0".into(),
                    "-show_entries".into(),
                    "stream=r_frame_rate".into(),
                    "-of".into(),
                    "csv=p=0".into(),
                    path.into(),
                ],
            )
            .await?;

        let text = String::from_utf8_lossy(&output.stdout);
        parse_frame_rate(text.trim()).ok_or_else(|| {
            AutodubError::Render(format!("Failed to parse frame rate '{}'", text.trim()))
        })
    }
}

/// Parse ffprobe's `num/den` frame rate.
fn parse_frame_rate(text: &str) -> Option<f64> {
    let rate = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => text.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Translate a filter graph into an ffmpeg `-filter_complex` string whose
/// final stream is labelled `[out]`.
pub fn filter_complex(graph: &FilterGraph) -> Result<String> {
    let mut parts = Vec::new();
    let mut chain = Vec::new();
    let mut segments = 0;
    let mut current = "[0:a]".to_string();

    for op in &graph.ops {
        match *op {
            FilterOp::Segment { start, end, tempo } => {
                parts.push(format!(
                    "[0:a]atrim=start={start:.3}:end={end:.3},asetpts=PTS-STARTPTS,atempo={tempo:.4}[s{segments}]"
                ));
                segments += 1;
            }
            FilterOp::Concat { inputs } => {
                if inputs != segments || inputs == 0 {
                    return Err(AutodubError::Render(format!(
                        "Concat of {inputs} inputs after {segments} segments"
                    )));
                }
                let labels: String = (0..inputs).map(|i| format!("[s{i}]")).collect();
                parts.push(format!("{labels}concat=n={inputs}:v=0:a=1[cat]"));
                current = "[cat]".to_string();
            }
            FilterOp::Tempo { factor } => chain.push(format!("atempo={factor:.4}")),
            FilterOp::Delay { seconds } => {
                chain.push(format!("adelay={}:all=1", (seconds * 1000.0).round() as u64))
            }
            FilterOp::TrimStart { seconds } => {
                chain.push(format!("atrim=start={seconds:.3}"));
                chain.push("asetpts=PTS-STARTPTS".to_string());
            }
            FilterOp::Trim { duration } => chain.push(format!("atrim=duration={duration:.3}")),
            FilterOp::Pad { duration } => chain.push(format!("apad=whole_dur={duration:.3}")),
            FilterOp::FadeIn { duration } => chain.push(format!("afade=t=in:st=0:d={duration:.3}")),
            FilterOp::FadeOut { start, duration } => {
                chain.push(format!("afade=t=out:st={start:.3}:d={duration:.3}"))
            }
        }
    }

    if segments > 0 && current == "[0:a]" {
        return Err(AutodubError::Render(format!(
            "{segments} segments were never joined"
        )));
    }
    if chain.is_empty() {
        chain.push("anull".to_string());
    }
    parts.push(format!("{current}{}[out]", chain.join(",")));
    Ok(parts.join(";"))
}

fn subtitle_codec(output: &Path) -> &'static str {
    match output.extension().and_then(|e| e.to_str()) {
        Some("mp4") | Some("mov") | Some("m4v") => "mov_text",
        Some("webm") => "webvtt",
        _ => "srt",
    }
}

#[async_trait]
impl MediaRenderer for FfmpegRenderer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe_audio(&self, path: &Path) -> Result<AudioHandle> {
        if !path.exists() {
            return Err(AutodubError::FileNotFound(path.display().to_string()));
        }
        let duration = self.probe_duration(path).await?;
        Ok(AudioHandle::new(path, duration))
    }

    async fn probe_video(&self, path: &Path) -> Result<VideoHandle> {
        if !path.exists() {
            return Err(AutodubError::FileNotFound(path.display().to_string()));
        }
        let duration = self.probe_duration(path).await?;
        let fps = self.probe_fps(path).await?;
        Ok(VideoHandle::new(path, duration, fps))
    }

    async fn apply_audio_graph(
        &self,
        input: &AudioHandle,
        graph: &FilterGraph,
        output: &Path,
    ) -> Result<AudioHandle> {
        let filter = filter_complex(graph)?;
        debug!("filter_complex: {}", filter);

        self.run(
            &self.ffmpeg,
            vec![
                "-y".into(),
                "-i".into(),
                input.path.as_os_str().into(),
                "-filter_complex".into(),
                filter.into(),
                "-map".into(),
                "[out]".into(),
                "-acodec".into(),
                "pcm_s16le".into(),
                output.into(),
            ],
        )
        .await?;

        if !output.exists() {
            return Err(AutodubError::Render(
                "Output file was not created".to_string(),
            ));
        }
        let duration = self.probe_duration(output).await?;
        Ok(AudioHandle::new(output, duration))
    }

    async fn assemble(
        &self,
        video: &VideoHandle,
        audio: &AudioHandle,
        captions: Option<&Path>,
        output: &Path,
    ) -> Result<VideoHandle> {
        info!("Assembling {}", output.display());

        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            video.path.as_os_str().into(),
            "-i".into(),
            audio.path.as_os_str().into(),
        ];
        if let Some(captions) = captions {
            args.push("-i".into());
            args.push(captions.into());
        }
        for arg in ["-map", "0:v:0", "-map", "1:a:0"] {
            args.push(arg.into());
        }
        if captions.is_some() {
            for arg in ["-map", "2:s:0", "-c:s", subtitle_codec(output)] {
                args.push(arg.into());
            }
        }
        for arg in ["-c:v", "copy", "-c:a", "aac"] {
            args.push(arg.into());
        }
        args.push(output.into());

        self.run(&self.ffmpeg, args).await?;

        if !output.exists() {
            return Err(AutodubError::Render(
                "Output file was not created".to_string(),
            ));
        }
        self.probe_video(output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("n/a"), None);
    }

    #[test]
    fn test_filter_complex_simple_chain() {
        let mut graph = FilterGraph::new(2.0);
        graph.push(FilterOp::Tempo { factor: 1.25 }).finish(0.01);
        let filter = filter_complex(&graph).unwrap();
        assert_eq!(
            filter,
            "[0:a]atempo=1.2500,atrim=duration=2.000,apad=whole_dur=2.000,\
             afade=t=in:st=0:d=0.010,afade=t=out:st=1.990:d=0.010[out]"
        );
    }

    #[test]
    fn test_filter_complex_windows() {
        let mut graph = FilterGraph::new(2.0);
        graph
            .push(FilterOp::Segment {
                start: 0.0,
                end: 1.0,
                tempo: 1.1,
            })
            .push(FilterOp::Segment {
                start: 1.0,
                end: 2.2,
                tempo: 1.2,
            })
            .push(FilterOp::Concat { inputs: 2 });
        let filter = filter_complex(&graph).unwrap();
        assert!(filter.starts_with("[0:a]atrim=start=0.000:end=1.000,asetpts=PTS-STARTPTS,atempo=1.1000[s0];"));
        assert!(filter.contains("[s0][s1]concat=n=2:v=0:a=1[cat]"));
        assert!(filter.ends_with("[cat]anull[out]"));
    }

    #[test]
    fn test_filter_complex_rejects_unjoined_segments() {
        let mut graph = FilterGraph::new(1.0);
        graph.push(FilterOp::Segment {
            start: 0.0,
            end: 1.0,
            tempo: 1.0,
        });
        assert!(filter_complex(&graph).is_err());
    }

    #[test]
    fn test_delay_in_milliseconds() {
        let mut graph = FilterGraph::new(1.0);
        graph.push(FilterOp::Delay { seconds: 0.12 });
        assert_eq!(filter_complex(&graph).unwrap(), "[0:a]adelay=120:all=1[out]");
    }

    #[test]
    fn test_subtitle_codec_by_container() {
        assert_eq!(subtitle_codec(Path::new("out.mp4")), "mov_text");
        assert_eq!(subtitle_codec(Path::new("out.mkv")), "srt");
    }

    #[tokio::test]
    async fn test_missing_media_file_errors() {
        let renderer = FfmpegRenderer::new("ffmpeg", "ffprobe", Duration::from_secs(5));
        let err = renderer
            .probe_audio(Path::new("/nonexistent/audio.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, AutodubError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_render_error() {
        let renderer = FfmpegRenderer::new(
            "/nonexistent/ffmpeg",
            "/nonexistent/ffprobe",
            Duration::from_secs(5),
        );
        let err = renderer.check_available().await.unwrap_err();
        assert!(matches!(err, AutodubError::Render(_)));
    }
}
