use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

/// The processing step a stage performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    HighPass,
    LowShelf,
    HighShelf,
    Compressor,
    StereoWiden,
    LoudnessNormalizer,
}

impl StageKind {
    /// Filter name in the engine's graph syntax
    pub fn filter_name(&self) -> &'static str {
        match self {
            StageKind::HighPass => "highpass",
            StageKind::LowShelf => "bass",
            StageKind::HighShelf => "treble",
            StageKind::Compressor => "acompressor",
            StageKind::StereoWiden => "stereowiden",
            StageKind::LoudnessNormalizer => "loudnorm",
        }
    }
}

/// A typed parameter value, formatted only when rendered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Number(f64),
    /// Rendered with a `dB` suffix
    Decibels(f64),
    Flag(bool),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) | ParamValue::Decibels(v) => Some(*v),
            _ => None,
        }
    }

    fn render(&self, stage: StageKind, key: &str) -> Result<String> {
        let number = |v: f64| -> Result<String> {
            if !v.is_finite() {
                return Err(ChainError::NonFiniteValue {
                    stage: stage.filter_name().to_string(),
                    key: key.to_string(),
                }
                .into());
            }
            Ok(format_number(v))
        };

        match self {
            ParamValue::Number(v) => number(*v),
            ParamValue::Decibels(v) => Ok(format!("{}dB", number(*v)?)),
            ParamValue::Flag(b) => Ok(b.to_string()),
            ParamValue::Text(s) => Ok(escape(s)),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Flag(b)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

/// One filter with its ordered parameters
///
/// A bypassed stage keeps its slot and parameters but renders as `anull`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    kind: StageKind,
    params: Vec<(String, ParamValue)>,
    bypassed: bool,
}

impl Stage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            params: Vec::new(),
            bypassed: false,
        }
    }

    /// Builder-style [`Stage::set`]
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn bypass(mut self, bypassed: bool) -> Self {
        self.bypassed = bypassed;
        self
    }

    /// Set a parameter, replacing an existing value in place
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((key.to_string(), value)),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    /// Render as `name=k1=v1:k2=v2`, or `anull` when bypassed
    pub fn render(&self) -> Result<String> {
        if self.bypassed {
            return Ok("anull".to_string());
        }

        let mut rendered = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ChainError::InvalidKey {
                    stage: self.kind.filter_name().to_string(),
                    key: key.clone(),
                }
                .into());
            }
            rendered.push(format!("{}={}", key, value.render(self.kind, key)?));
        }

        if rendered.is_empty() {
            Ok(self.kind.filter_name().to_string())
        } else {
            Ok(format!("{}={}", self.kind.filter_name(), rendered.join(":")))
        }
    }
}

/// Ordered filter chain handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChainSpec {
    stages: Vec<Stage>,
}

impl FilterChainSpec {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    pub fn normalizer(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| s.kind() == StageKind::LoudnessNormalizer)
    }

    /// Copy of the chain with the loudness normalizer stage modified
    pub fn with_normalizer<F>(&self, update: F) -> Result<Self>
    where
        F: FnOnce(&mut Stage),
    {
        let mut chain = self.clone();
        let stage = chain
            .stages
            .iter_mut()
            .find(|s| s.kind() == StageKind::LoudnessNormalizer)
            .ok_or(ChainError::MissingNormalizer)?;
        update(stage);
        Ok(chain)
    }

    /// Render the whole graph, stages joined with `,`
    pub fn render(&self) -> Result<String> {
        let rendered = self
            .stages
            .iter()
            .map(Stage::render)
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(","))
    }
}

impl fmt::Display for FilterChainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(graph) => f.write_str(&graph),
            Err(e) => write!(f, "<invalid chain: {}>", e),
        }
    }
}

/// Shortest decimal form with at most four fractional digits
fn format_number(v: f64) -> String {
    let fixed = format!("{:.4}", v);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Backslash-escape characters that are special in option values or graph syntax
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '\'' | ':' | ',' | ';' | '[' | ']' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
