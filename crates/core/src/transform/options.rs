//! Option building: turns the attribute table into ffmpeg arguments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::task_config::AttributeBag;

/// Worker threads requested from ffmpeg for every transcode.
pub const TRANSCODE_THREADS: u32 = 2;

/// Name of the nested table holding passthrough flags.
pub const CUSTOM_KEY: &str = "custom";

/// Transcoding attributes with a dedicated ffmpeg flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownAttribute {
    VideoCodec,
    VideoBitrate,
    VideoBitrateTolerance,
    FrameRate,
    Resolution,
    Aspect,
    KeyframeInterval,
    X264Vprofile,
    X264Preset,
    AudioCodec,
    AudioBitrate,
    AudioSampleRate,
    AudioChannels,
}

impl KnownAttribute {
    /// All attributes, in the order they are applied.
    pub const ALL: [KnownAttribute; 13] = [
        Self::VideoCodec,
        Self::VideoBitrate,
        Self::VideoBitrateTolerance,
        Self::FrameRate,
        Self::Resolution,
        Self::Aspect,
        Self::KeyframeInterval,
        Self::X264Vprofile,
        Self::X264Preset,
        Self::AudioCodec,
        Self::AudioBitrate,
        Self::AudioSampleRate,
        Self::AudioChannels,
    ];

    /// Key of this attribute in the configuration table.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VideoCodec => "video_codec",
            Self::VideoBitrate => "video_bitrate",
            Self::VideoBitrateTolerance => "video_bitrate_tolerance",
            Self::FrameRate => "frame_rate",
            Self::Resolution => "resolution",
            Self::Aspect => "aspect",
            Self::KeyframeInterval => "keyframe_interval",
            Self::X264Vprofile => "x264_vprofile",
            Self::X264Preset => "x264_preset",
            Self::AudioCodec => "audio_codec",
            Self::AudioBitrate => "audio_bitrate",
            Self::AudioSampleRate => "audio_sample_rate",
            Self::AudioChannels => "audio_channels",
        }
    }

    /// The ffmpeg flag this attribute is passed with.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::VideoCodec => "-vcodec",
            Self::VideoBitrate => "-b:v",
            Self::VideoBitrateTolerance => "-bt",
            Self::FrameRate => "-r",
            Self::Resolution => "-s",
            Self::Aspect => "-aspect",
            Self::KeyframeInterval => "-g",
            Self::X264Vprofile => "-vprofile",
            Self::X264Preset => "-preset",
            Self::AudioCodec => "-acodec",
            Self::AudioBitrate => "-b:a",
            Self::AudioSampleRate => "-ar",
            Self::AudioChannels => "-ac",
        }
    }

    /// Bitrates given as plain numbers are in kbit/s.
    fn is_kilobits(&self) -> bool {
        matches!(
            self,
            Self::VideoBitrate | Self::VideoBitrateTolerance | Self::AudioBitrate
        )
    }
}

impl fmt::Display for KnownAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// Converts a table value. `null` counts as absent.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::Text(s)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            }),
            other => Some(Self::Text(other.to_string())),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Options for one transcode, built from the attribute table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate_tolerance: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyframe_interval: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x264_vprofile: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x264_preset: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<OptionValue>,
    /// Passthrough flags as `-name`, `value` pairs.
    pub custom: Vec<String>,
    pub threads: u32,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            video_codec: None,
            video_bitrate: None,
            video_bitrate_tolerance: None,
            frame_rate: None,
            resolution: None,
            aspect: None,
            keyframe_interval: None,
            x264_vprofile: None,
            x264_preset: None,
            audio_codec: None,
            audio_bitrate: None,
            audio_sample_rate: None,
            audio_channels: None,
            custom: Vec::new(),
            threads: TRANSCODE_THREADS,
        }
    }
}

impl OptionSet {
    /// Builds options by consuming known attributes from `bag`.
    ///
    /// Each known attribute present in `bag` is moved into the result, so it
    /// cannot be applied a second time. The `custom` table is read but left
    /// in place; anything other than a table yields no custom flags.
    pub fn take_from(bag: &mut AttributeBag) -> Self {
        let mut options = Self::default();

        for attribute in KnownAttribute::ALL {
            if bag.get(attribute.name()).is_none_or(Value::is_null) {
                continue;
            }
            *options.slot_mut(attribute) = bag
                .remove(attribute.name())
                .and_then(OptionValue::from_json);
        }

        options.custom = custom_flags(bag.get(CUSTOM_KEY));
        options
    }

    /// Returns the value of a known attribute.
    pub fn get(&self, attribute: KnownAttribute) -> Option<&OptionValue> {
        match attribute {
            KnownAttribute::VideoCodec => self.video_codec.as_ref(),
            KnownAttribute::VideoBitrate => self.video_bitrate.as_ref(),
            KnownAttribute::VideoBitrateTolerance => self.video_bitrate_tolerance.as_ref(),
            KnownAttribute::FrameRate => self.frame_rate.as_ref(),
            KnownAttribute::Resolution => self.resolution.as_ref(),
            KnownAttribute::Aspect => self.aspect.as_ref(),
            KnownAttribute::KeyframeInterval => self.keyframe_interval.as_ref(),
            KnownAttribute::X264Vprofile => self.x264_vprofile.as_ref(),
            KnownAttribute::X264Preset => self.x264_preset.as_ref(),
            KnownAttribute::AudioCodec => self.audio_codec.as_ref(),
            KnownAttribute::AudioBitrate => self.audio_bitrate.as_ref(),
            KnownAttribute::AudioSampleRate => self.audio_sample_rate.as_ref(),
            KnownAttribute::AudioChannels => self.audio_channels.as_ref(),
        }
    }

    fn slot_mut(&mut self, attribute: KnownAttribute) -> &mut Option<OptionValue> {
        match attribute {
            KnownAttribute::VideoCodec => &mut self.video_codec,
            KnownAttribute::VideoBitrate => &mut self.video_bitrate,
            KnownAttribute::VideoBitrateTolerance => &mut self.video_bitrate_tolerance,
            KnownAttribute::FrameRate => &mut self.frame_rate,
            KnownAttribute::Resolution => &mut self.resolution,
            KnownAttribute::Aspect => &mut self.aspect,
            KnownAttribute::KeyframeInterval => &mut self.keyframe_interval,
            KnownAttribute::X264Vprofile => &mut self.x264_vprofile,
            KnownAttribute::X264Preset => &mut self.x264_preset,
            KnownAttribute::AudioCodec => &mut self.audio_codec,
            KnownAttribute::AudioBitrate => &mut self.audio_bitrate,
            KnownAttribute::AudioSampleRate => &mut self.audio_sample_rate,
            KnownAttribute::AudioChannels => &mut self.audio_channels,
        }
    }

    /// Known attributes that are set, in application order.
    pub fn known(&self) -> impl Iterator<Item = (KnownAttribute, &OptionValue)> {
        KnownAttribute::ALL
            .into_iter()
            .filter_map(|attribute| self.get(attribute).map(|value| (attribute, value)))
    }

    /// Renders the options as ffmpeg output arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for (attribute, value) in self.known() {
            let rendered = if attribute.is_kilobits() && value.is_numeric() {
                format!("{}k", value)
            } else {
                value.to_string()
            };
            args.extend([attribute.flag().to_string(), rendered]);
        }

        args.extend(["-threads".to_string(), self.threads.to_string()]);
        args.extend(self.custom.iter().cloned());
        args
    }
}

/// Flattens a `custom` table into `-name`, `value` pairs.
fn custom_flags(custom: Option<&Value>) -> Vec<String> {
    let Some(Value::Object(table)) = custom else {
        return Vec::new();
    };

    table
        .iter()
        .flat_map(|(name, value)| [format!("-{}", name), value_text(value)])
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
