//! Media engine: audio/video transcoding through a lazily-loaded transcoder.
//!
//! Progress layout: 0–15 % engine setup, 20 % input staged, 20–95 % the
//! transcoder's own fractional progress, 98 % output read, 100 % cleaned up.

use crate::engine::{CoreVariant, LazyEngine, Transcoder, TranscoderLoader};
use crate::error::{ConvertError, EngineLoadError};
use crate::format::FormatToken;
use crate::job::{ConversionResult, InputFile};
use crate::progress::Progress;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Codec arguments and output MIME type for one media target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaProfile {
    pub target: FormatToken,
    pub codec_args: &'static [&'static str],
    pub mime: &'static str,
}

pub static MEDIA_PROFILES: [MediaProfile; 6] = [
    MediaProfile {
        target: FormatToken::Mp3,
        codec_args: &["-vn", "-acodec", "libmp3lame", "-q:a", "2"],
        mime: "audio/mpeg",
    },
    MediaProfile {
        target: FormatToken::Wav,
        codec_args: &["-vn", "-acodec", "pcm_s16le"],
        mime: "audio/wav",
    },
    MediaProfile {
        target: FormatToken::Ogg,
        codec_args: &["-vn", "-acodec", "libvorbis", "-q:a", "5"],
        mime: "audio/ogg",
    },
    MediaProfile {
        target: FormatToken::Mp4,
        codec_args: &["-c:v", "libx264", "-preset", "fast", "-c:a", "aac"],
        mime: "video/mp4",
    },
    MediaProfile {
        target: FormatToken::Webm,
        codec_args: &["-c:v", "libvpx", "-c:a", "libvorbis"],
        mime: "video/webm",
    },
    MediaProfile {
        target: FormatToken::Gif,
        codec_args: &["-vf", "fps=10,scale=480:-1:flags=lanczos", "-loop", "0"],
        mime: "image/gif",
    },
];

pub fn media_profile(target: FormatToken) -> Option<&'static MediaProfile> {
    MEDIA_PROFILES.iter().find(|p| p.target == target)
}

/// `-i <input> <codec args…> <output>`.
pub fn build_args(input: &str, output: &str, profile: &MediaProfile) -> Vec<String> {
    let mut args = vec!["-i".to_string(), input.to_string()];
    args.extend(profile.codec_args.iter().map(|a| a.to_string()));
    args.push(output.to_string());
    args
}

/// Map a transcoder load failure onto the public error taxonomy.
pub fn classify_load_error(err: EngineLoadError) -> ConvertError {
    match err {
        EngineLoadError::SharedMemoryUnavailable(detail) => {
            ConvertError::CrossOriginIsolationRequired(detail)
        }
        other => {
            let detail = other.to_string();
            if detail.contains("SharedArrayBuffer") || detail.contains("shared memory") {
                ConvertError::CrossOriginIsolationRequired(detail)
            } else {
                ConvertError::EngineLoad {
                    engine: "media",
                    detail,
                }
            }
        }
    }
}

/// Media transcoding with a shared, lazily-loaded transcoder.
pub struct MediaEngine {
    loader: Arc<dyn TranscoderLoader>,
    engine: LazyEngine<dyn Transcoder>,
    // The transcoder's scratch names are shared, so commands never overlap.
    exclusive: Mutex<()>,
}

impl MediaEngine {
    pub fn new(loader: Arc<dyn TranscoderLoader>) -> Self {
        Self {
            loader,
            engine: LazyEngine::new("media"),
            exclusive: Mutex::new(()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_ready()
    }

    async fn transcoder(&self, progress: &Progress) -> Result<Arc<dyn Transcoder>, ConvertError> {
        progress.report(5.0);
        let variant = if self.loader.supports_shared_memory() {
            CoreVariant::MultiThreaded
        } else {
            CoreVariant::SingleThreaded
        };
        progress.report(7.0);

        let loader = Arc::clone(&self.loader);
        let stage = progress.stage(7.0, 12.0);
        let engine = self
            .engine
            .get_or_load(move || loader.load(variant, stage))
            .await
            .map_err(classify_load_error)?;
        progress.report(12.0);
        progress.report(15.0);
        Ok(engine)
    }

    pub async fn convert(
        &self,
        file: &InputFile,
        target: FormatToken,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        let profile = media_profile(target).ok_or_else(|| ConvertError::UnsupportedTarget {
            engine: "media",
            target: target.to_string(),
        })?;

        let transcoder = self.transcoder(progress).await?;
        let _guard = self.exclusive.lock().await;

        let input_ext = match file.extension() {
            ext if ext.is_empty() => "tmp".to_string(),
            ext => ext,
        };
        let input_name = format!("input.{input_ext}");
        let output_name = format!("output.{}", target.as_str());

        progress.report(20.0);
        let outcome = transcode(transcoder.as_ref(), file, &input_name, &output_name, profile, progress).await;

        for name in [&input_name, &output_name] {
            if let Err(e) = transcoder.delete_file(name).await {
                warn!("Failed to clean up {}: {}", name, e);
            }
        }

        let data = outcome.map_err(|e| {
            warn!("Transcode {} → {} failed: {}", input_ext, target, e);
            e
        })?;
        progress.done();
        info!("Transcoded {} → {} ({} bytes)", file.name, output_name, data.len());
        Ok(ConversionResult::new(data, profile.mime, target.as_str()))
    }
}

/// Stage the input, run the transcoder and read the output back.
async fn transcode(
    transcoder: &dyn Transcoder,
    file: &InputFile,
    input_name: &str,
    output_name: &str,
    profile: &MediaProfile,
    progress: &Progress,
) -> Result<Vec<u8>, ConvertError> {
    transcoder.write_file(input_name, &file.bytes).await?;

    let args = build_args(input_name, output_name, profile);
    debug!("Transcode args: {:?}", args);
    progress.report(25.0);

    let exec_progress = progress.clone();
    let on_fraction = Box::new(move |f: f64| {
        let pct = (20.0 + (f * 75.0).round()).min(95.0);
        exec_progress.report(pct);
    });
    let code = transcoder.exec(&args, on_fraction).await?;
    if code != 0 {
        return Err(ConvertError::TranscodeFailed { code });
    }

    let data = transcoder.read_file(output_name).await?;
    progress.report(98.0);
    Ok(data)
}
