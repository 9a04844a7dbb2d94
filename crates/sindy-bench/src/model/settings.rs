use crate::config::ConfigMap;
use crate::errors::{BenchError, BenchResult};
use crate::model::{Differentiation, FeatureLibrary, Optimizer};
use serde_json::Value;

const DEFAULT_DEGREE: usize = 3;
const DEFAULT_THRESHOLD: f64 = 0.1;
const DEFAULT_RIDGE_ALPHA: f64 = 0.05;
const DEFAULT_MAX_ITER: usize = 20;

/// The three strategy choices the built-in backend is configured with.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub differentiation: Differentiation,
    pub library: FeatureLibrary,
    pub optimizer: Optimizer,
}

impl ModelSettings {
    /// Read the `differentiation`, `library` and `optimizer` sections.
    /// A missing or null section is treated as empty.
    pub fn from_config(config: &ConfigMap) -> BenchResult<Self> {
        Ok(Self {
            differentiation: parse_differentiation(Section::of(config, "differentiation")?)?,
            library: parse_library(Section::of(config, "library")?)?,
            optimizer: parse_optimizer(Section::of(config, "optimizer")?)?,
        })
    }
}

fn parse_differentiation(section: Section<'_>) -> BenchResult<Differentiation> {
    match section.selector("finite_difference").as_str() {
        "finite_difference" => Ok(Differentiation::FiniteDifference),
        "smoothed_finite_difference" => Ok(Differentiation::SmoothedFiniteDifference {
            alpha: section.float("alpha", 0.0)?,
        }),
        other => Err(BenchError::UnsupportedStrategy {
            selector: "differentiation.type",
            value: other.to_string(),
        }),
    }
}

fn parse_library(section: Section<'_>) -> BenchResult<FeatureLibrary> {
    match section.selector("polynomial").as_str() {
        "polynomial" => Ok(FeatureLibrary::Polynomial {
            degree: section.unsigned("degree", DEFAULT_DEGREE)?,
            include_bias: section.boolean("include_bias", false)?,
        }),
        other => Err(BenchError::UnsupportedStrategy {
            selector: "library.type",
            value: other.to_string(),
        }),
    }
}

fn parse_optimizer(section: Section<'_>) -> BenchResult<Optimizer> {
    match section.selector("stlsq").as_str() {
        "stlsq" => Ok(Optimizer::Stlsq {
            threshold: section.float("threshold", DEFAULT_THRESHOLD)?,
            alpha: section.float("alpha", DEFAULT_RIDGE_ALPHA)?,
            max_iter: section.unsigned("max_iter", DEFAULT_MAX_ITER)?,
        }),
        other => Err(BenchError::UnsupportedStrategy {
            selector: "optimizer.type",
            value: other.to_string(),
        }),
    }
}

struct Section<'a> {
    name: &'static str,
    map: Option<&'a ConfigMap>,
}

impl<'a> Section<'a> {
    fn of(config: &'a ConfigMap, name: &'static str) -> BenchResult<Self> {
        match config.get(name) {
            None | Some(Value::Null) => Ok(Self { name, map: None }),
            Some(Value::Object(map)) => Ok(Self {
                name,
                map: Some(map),
            }),
            Some(other) => Err(BenchError::ConfigError(format!(
                "{} must be a mapping, got: {}",
                name, other
            ))),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key)).filter(|v| !v.is_null())
    }

    fn selector(&self, default: &str) -> String {
        match self.get("type") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }

    fn invalid(&self, key: &str, expected: &str, value: &Value) -> BenchError {
        BenchError::ConfigError(format!(
            "{}.{} must be {}, got: {}",
            self.name, key, expected, value
        ))
    }

    fn float(&self, key: &str, default: f64) -> BenchResult<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(v @ Value::Number(n)) => n.as_f64().ok_or_else(|| self.invalid(key, "a number", v)),
            Some(v @ Value::String(s)) => s.trim().parse().map_err(|_| self.invalid(key, "a number", v)),
            Some(v) => Err(self.invalid(key, "a number", v)),
        }
    }

    fn unsigned(&self, key: &str, default: usize) -> BenchResult<usize> {
        match self.get(key) {
            None => Ok(default),
            Some(v @ Value::Number(n)) => {
                if let Some(u) = n.as_u64() {
                    return usize::try_from(u).map_err(|_| self.invalid(key, "a non-negative integer", v));
                }
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as usize),
                    _ => Err(self.invalid(key, "a non-negative integer", v)),
                }
            }
            Some(v @ Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| self.invalid(key, "a non-negative integer", v)),
            Some(v) => Err(self.invalid(key, "a non-negative integer", v)),
        }
    }

    fn boolean(&self, key: &str, default: bool) -> BenchResult<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_f64().map_or(false, |f| f != 0.0)),
            Some(v @ Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.invalid(key, "a boolean", v)),
            },
            Some(v) => Err(self.invalid(key, "a boolean", v)),
        }
    }
}
