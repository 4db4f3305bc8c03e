//! Transform argument synthesis.

use super::EncodeMode;
use crate::analyze::RemediationPlan;
use crate::probe::MediaInfo;
use std::path::Path;

const SOFTWARE_CRF: &str = "16";
const SOFTWARE_PRESET: &str = "slow";
const HARDWARE_QP: &str = "18";
const AUDIO_BITRATE: &str = "256k";
const MUXING_QUEUE_SIZE: &str = "65536";

/// 5.1 to stereo downmix with fixed per-channel gains.
pub const DOWNMIX_FILTER: &str =
    "pan=stereo|FL=0.5*FC+0.707*FL+0.707*BL+0.5*LFE|FR=0.5*FC+0.707*FR+0.707*BR+0.5*LFE";

/// Build the ffmpeg arguments (program name excluded) for one transform.
///
/// Maps the first video stream and every audio stream, never subtitles.
/// Hardware mode only affects the command when video is being recoded.
pub fn build_transform_args(
    info: &MediaInfo,
    plan: &RemediationPlan,
    output: &Path,
    mode: &EncodeMode,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let recode_video = plan.needs_video_recode();

    if let (true, EncodeMode::Hardware { device }) = (recode_video, mode) {
        push(&mut args, ["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"]);
        args.push("-vaapi_device".to_string());
        args.push(device.to_string_lossy().to_string());
    }

    args.push("-i".to_string());
    args.push(info.path.to_string_lossy().to_string());
    push(&mut args, ["-map", "0:v:0", "-map", "0:a?"]);

    match (recode_video, mode) {
        (false, _) => push(&mut args, ["-c:v", "copy"]),
        (true, EncodeMode::Hardware { .. }) => push(
            &mut args,
            ["-c:v", "hevc_vaapi", "-qp", HARDWARE_QP, "-tag:v", "hvc1"],
        ),
        (true, EncodeMode::Software) => {
            let mut x265_params: Vec<&str> = if info.is_hdr() {
                vec!["hdr-opt=1", "repeat-headers=1"]
            } else {
                Vec::new()
            };
            push(
                &mut args,
                [
                    "-c:v",
                    "libx265",
                    "-crf",
                    SOFTWARE_CRF,
                    "-preset",
                    SOFTWARE_PRESET,
                    "-tag:v",
                    "hvc1",
                ],
            );
            if info.bit_depth() >= 10 {
                push(&mut args, ["-pix_fmt", "yuv420p10le"]);
                x265_params.push("profile=main10");
            }
            if !x265_params.is_empty() {
                args.push("-x265-params".to_string());
                args.push(x265_params.join(":"));
            }
        }
    }

    for (i, track) in plan.audio.iter().enumerate() {
        if track.needs_recode() {
            args.extend([
                format!("-c:a:{i}"),
                "aac".to_string(),
                format!("-ac:a:{i}"),
                "2".to_string(),
                format!("-b:a:{i}"),
                AUDIO_BITRATE.to_string(),
                format!("-filter:a:{i}"),
                DOWNMIX_FILTER.to_string(),
            ]);
        } else {
            args.extend([format!("-c:a:{i}"), "copy".to_string()]);
        }
    }

    args.push("-sn".to_string());
    push(&mut args, ["-max_muxing_queue_size", MUXING_QUEUE_SIZE]);
    args.push("-y".to_string());
    args.push(output.to_string_lossy().to_string());
    args
}

fn push<const N: usize>(args: &mut Vec<String>, items: [&str; N]) {
    args.extend(items.iter().map(|s| s.to_string()));
}
