// Two-pass H.264 encode to a target file size
//
// The video bitrate is whatever is left of the size budget after the audio
// stream (copied as-is) takes its share. Pass 1 writes a throwaway output and
// the x264 stats log; pass 2 writes the real file. Intermediates are removed
// only when both passes succeed, so a failed run can be inspected.

use std::path::{Path, PathBuf};

use super::transcode::Transcoder;
use crate::constants::{COMPRESS_PRESET, PASS_LOG_SUFFIX, PASS_TMP_SUFFIX, VIDEO_CODEC};
use crate::error::{CamStampError, Result};

/// (target bytes * 8 - audio bitrate * duration) / duration, in bits per second.
pub fn target_video_bitrate(target_bytes: u64, audio_bitrate: f64, duration_secs: f64) -> Result<f64> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(CamStampError::Encode(format!(
            "Cannot size an encode for a duration of {}s",
            duration_secs
        )));
    }
    let bitrate = (target_bytes as f64 * 8.0 - audio_bitrate * duration_secs) / duration_secs;
    if bitrate <= 0.0 {
        return Err(CamStampError::Encode(format!(
            "Target of {} bytes leaves no room for video after {:.0} b/s of audio over {:.1}s",
            target_bytes, audio_bitrate, duration_secs
        )));
    }
    Ok(bitrate)
}

/// Files the two passes leave next to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PassArtifacts {
    /// Pass 1 output, never used.
    pub scratch_output: PathBuf,
    /// `-passlogfile` prefix; x264 appends "-0.log" and "-0.log.mbtree".
    pub log_prefix: PathBuf,
}

impl PassArtifacts {
    pub fn for_input(input: &Path) -> Self {
        let base = input.as_os_str().to_string_lossy();
        Self {
            scratch_output: PathBuf::from(format!("{}{}", base, PASS_TMP_SUFFIX)),
            log_prefix: PathBuf::from(format!("{}{}", base, PASS_LOG_SUFFIX)),
        }
    }

    pub fn stats_log(&self) -> PathBuf {
        PathBuf::from(format!("{}-0.log", self.log_prefix.display()))
    }

    pub fn mbtree_log(&self) -> PathBuf {
        PathBuf::from(format!("{}-0.log.mbtree", self.log_prefix.display()))
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        vec![self.scratch_output.clone(), self.stats_log(), self.mbtree_log()]
    }

    /// Remove whatever exists; missing files are fine.
    pub fn remove(&self) {
        for path in self.paths() {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Arguments for one pass.
pub fn pass_args(
    input: &Path,
    output: &Path,
    video_bitrate: f64,
    pass: u8,
    artifacts: &PassArtifacts,
    preset: &str,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(), input.to_string_lossy().into_owned(),
        "-c:v".into(), VIDEO_CODEC.into(),
        "-preset".into(), preset.into(),
        "-b:v".into(), format!("{}", video_bitrate.floor() as u64),
        "-pass".into(), pass.to_string(),
        "-passlogfile".into(), artifacts.log_prefix.to_string_lossy().into_owned(),
        "-c:a".into(), "copy".into(),
    ];
    if pass == 1 {
        args.push("-f".into());
        args.push("mp4".into());
    }
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Two-pass encoder aiming at a fixed output size.
pub struct BitrateTargetEncoder<'a> {
    transcoder: &'a dyn Transcoder,
}

impl<'a> BitrateTargetEncoder<'a> {
    pub fn new(transcoder: &'a dyn Transcoder) -> Self {
        Self { transcoder }
    }

    /// Encode `input` to `output` at about `target_bytes`. Returns the video
    /// bitrate used.
    pub fn encode(&self, input: &Path, output: &Path, target_bytes: u64) -> Result<f64> {
        let info = self.transcoder.probe(input)?;
        let audio_bitrate = info.audio_bitrate.unwrap_or(0.0);
        let bitrate = target_video_bitrate(target_bytes, audio_bitrate, info.duration_secs)?;
        log::info!(
            "Compressing {} to {} bytes: video {:.0} b/s, audio {:.0} b/s, {:.1}s",
            input.display(),
            target_bytes,
            bitrate,
            audio_bitrate,
            info.duration_secs
        );

        let artifacts = PassArtifacts::for_input(input);
        for pass in 1..=2u8 {
            let dest = if pass == 1 { artifacts.scratch_output.as_path() } else { output };
            let args = pass_args(input, dest, bitrate, pass, &artifacts, COMPRESS_PRESET);
            self.transcoder.run(&args).map_err(|e| {
                CamStampError::FFmpeg(format!(
                    "Pass {} of {} failed, intermediates kept: {}",
                    pass,
                    input.display(),
                    e
                ))
            })?;
        }

        artifacts.remove();
        Ok(bitrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ffprobe::StreamInfo;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Writes each pass's output plus the x264 logs, optionally failing one pass.
    struct FakeTranscoder {
        info: StreamInfo,
        fail_pass: Option<String>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeTranscoder {
        fn new(audio_bitrate: Option<f64>, duration_secs: f64) -> Self {
            Self {
                info: StreamInfo {
                    audio_bitrate,
                    duration_secs,
                    width: Some(1920),
                    height: Some(1080),
                },
                fail_pass: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transcoder for FakeTranscoder {
        fn probe(&self, _input: &Path) -> Result<StreamInfo> {
            Ok(self.info.clone())
        }

        fn run(&self, args: &[String]) -> Result<()> {
            self.calls.borrow_mut().push(args.to_vec());
            let value_of = |flag: &str| {
                let i = args.iter().position(|a| a == flag).unwrap();
                args[i + 1].clone()
            };
            let pass = value_of("-pass");
            let prefix = value_of("-passlogfile");
            std::fs::write(format!("{}-0.log", prefix), "stats").unwrap();
            std::fs::write(format!("{}-0.log.mbtree", prefix), "tree").unwrap();
            if self.fail_pass.as_deref() == Some(pass.as_str()) {
                return Err(CamStampError::FFmpeg("encoder exploded".to_string()));
            }
            std::fs::write(args.last().unwrap(), "video").unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_target_video_bitrate() {
        // 28 MB over 100s with 128 kb/s audio
        let bitrate = target_video_bitrate(28 * 1024 * 1024, 128_000.0, 100.0).unwrap();
        assert!((bitrate - 2_220_810.24).abs() < 1e-3);

        // 10 MiB over 100s with 128 kb/s audio
        let bitrate = target_video_bitrate(10 * 1024 * 1024, 128_000.0, 100.0).unwrap();
        assert!((bitrate - 710_860.8).abs() < 1e-3);

        // No audio stream
        let bitrate = target_video_bitrate(1000, 0.0, 8.0).unwrap();
        assert!((bitrate - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_target_too_small_for_audio() {
        let err = target_video_bitrate(1000, 128_000.0, 100.0).unwrap_err();
        assert!(matches!(err, CamStampError::Encode(_)));
        assert!(target_video_bitrate(1000, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_artifact_names() {
        let a = PassArtifacts::for_input(Path::new("out/a.mp4.drawn.mp4"));
        assert_eq!(a.scratch_output, PathBuf::from("out/a.mp4.drawn.mp4tmp.mp4"));
        assert_eq!(a.stats_log(), PathBuf::from("out/a.mp4.drawn.mp4pass-0.log"));
        assert_eq!(a.mbtree_log(), PathBuf::from("out/a.mp4.drawn.mp4pass-0.log.mbtree"));
    }

    #[test]
    fn test_pass_args() {
        let a = PassArtifacts::for_input(Path::new("in.mp4"));
        let first = pass_args(Path::new("in.mp4"), &a.scratch_output, 1500.9, 1, &a, "medium");
        assert_eq!(
            first.join(" "),
            "-y -i in.mp4 -c:v libx264 -preset medium -b:v 1500 -pass 1 \
             -passlogfile in.mp4pass -c:a copy -f mp4 in.mp4tmp.mp4"
        );
        let second = pass_args(Path::new("in.mp4"), Path::new("out.mp4"), 1500.9, 2, &a, "medium");
        assert_eq!(
            second.join(" "),
            "-y -i in.mp4 -c:v libx264 -preset medium -b:v 1500 -pass 2 \
             -passlogfile in.mp4pass -c:a copy out.mp4"
        );
    }

    #[test]
    fn test_encode_cleans_up_on_success() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.mp4.drawn.mp4");
        let output = tmp.path().join("a.mp4");
        std::fs::write(&input, "drawn").unwrap();

        let fake = FakeTranscoder::new(None, 10.0);
        let bitrate = BitrateTargetEncoder::new(&fake)
            .encode(&input, &output, 10_000)
            .unwrap();

        assert!((bitrate - 8000.0).abs() < 1e-9);
        assert_eq!(fake.calls.borrow().len(), 2);
        assert!(output.exists());
        assert!(input.exists());
        for leftover in PassArtifacts::for_input(&input).paths() {
            assert!(!leftover.exists(), "{} not removed", leftover.display());
        }
    }

    #[test]
    fn test_encode_failure_keeps_intermediates() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.mp4.drawn.mp4");
        let output = tmp.path().join("a.mp4");
        std::fs::write(&input, "drawn").unwrap();

        let mut fake = FakeTranscoder::new(Some(64_000.0), 10.0);
        fake.fail_pass = Some("2".to_string());
        let err = BitrateTargetEncoder::new(&fake)
            .encode(&input, &output, 10 * 1024 * 1024)
            .unwrap_err();

        assert!(err.to_string().contains("encoder exploded"));
        assert!(!output.exists());
        for leftover in PassArtifacts::for_input(&input).paths() {
            assert!(leftover.exists(), "{} missing", leftover.display());
        }
    }

    #[test]
    fn test_encode_refuses_impossible_target() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.mp4");
        let fake = FakeTranscoder::new(Some(128_000.0), 100.0);

        let err = BitrateTargetEncoder::new(&fake)
            .encode(&input, &tmp.path().join("o.mp4"), 1000)
            .unwrap_err();
        assert!(matches!(err, CamStampError::Encode(_)));
        assert!(fake.calls.borrow().is_empty());
    }
}
