use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoding of the rendered file
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[value(name = "wav16")]
    Wav16,
    #[value(name = "wav24")]
    Wav24,
    #[serde(rename = "mp3_320")]
    #[value(name = "mp3_320")]
    Mp3_320,
}

impl OutputFormat {
    /// Codec arguments appended after the sample rate and channel count
    pub fn codec_args(&self) -> &'static [&'static str] {
        match self {
            OutputFormat::Wav16 => &["-c:a", "pcm_s16le"],
            OutputFormat::Wav24 => &["-c:a", "pcm_s24le"],
            OutputFormat::Mp3_320 => &["-codec:a", "libmp3lame", "-b:a", "320k"],
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wav16 | OutputFormat::Wav24 => "wav",
            OutputFormat::Mp3_320 => "mp3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Wav16 => "WAV 16-bit",
            OutputFormat::Wav24 => "WAV 24-bit",
            OutputFormat::Mp3_320 => "MP3 320 kbps",
        }
    }

    /// Next encoding with a smaller footprint, if any
    pub fn smaller(&self) -> Option<OutputFormat> {
        match self {
            OutputFormat::Wav24 => Some(OutputFormat::Wav16),
            OutputFormat::Wav16 => Some(OutputFormat::Mp3_320),
            OutputFormat::Mp3_320 => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_sequence_terminates() {
        let mut chain = vec![OutputFormat::Wav24];
        while let Some(next) = chain.last().and_then(|f| f.smaller()) {
            chain.push(next);
        }
        assert_eq!(chain, vec![OutputFormat::Wav24, OutputFormat::Wav16, OutputFormat::Mp3_320]);
    }

    #[test]
    fn test_codec_arguments() {
        assert_eq!(OutputFormat::Wav24.codec_args(), &["-c:a", "pcm_s24le"]);
        assert_eq!(OutputFormat::Mp3_320.extension(), "mp3");
        assert!(OutputFormat::Mp3_320.codec_args().contains(&"320k"));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&OutputFormat::Mp3_320).unwrap(), "\"mp3_320\"");
        assert_eq!(serde_json::from_str::<OutputFormat>("\"wav24\"").unwrap(), OutputFormat::Wav24);
    }
}
