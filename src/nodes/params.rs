//! Parameter declarations, values and validation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Type, default and allowed range of one parameter.
///
/// This is descriptive metadata for hosts that build widgets from it; the
/// only runtime use is range checking in [`Params::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamKind {
    /// Floating-point number.
    Float {
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    /// Integer. Values must land on `min + k × step`.
    Int {
        default: i64,
        min: i64,
        max: i64,
        step: i64,
    },
    /// One of a fixed set of strings.
    Choice {
        options: &'static [&'static str],
        default: &'static str,
    },
}

/// A named parameter declaration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Type and range.
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Float parameter.
    #[must_use]
    pub const fn float(name: &'static str, default: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float {
                default,
                min,
                max,
                step,
            },
        }
    }

    /// Integer parameter.
    #[must_use]
    pub const fn int(name: &'static str, default: i64, min: i64, max: i64, step: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int {
                default,
                min,
                max,
                step,
            },
        }
    }

    /// Choice parameter.
    #[must_use]
    pub const fn choice(
        name: &'static str,
        options: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Choice { options, default },
        }
    }

    /// The declared default.
    #[must_use]
    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Float { default, .. } => ParamValue::Float(default),
            ParamKind::Int { default, .. } => ParamValue::Int(default),
            ParamKind::Choice { default, .. } => ParamValue::Text(default.to_string()),
        }
    }

    /// Parse a command-line string into a value of this parameter's type.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a number of the right kind.
    pub fn parse_value(&self, raw: &str) -> Result<ParamValue> {
        let raw = raw.trim();
        match self.kind {
            ParamKind::Float { .. } => raw
                .parse()
                .map(ParamValue::Float)
                .map_err(|_| Error::invalid(self.name, format!("{raw:?} is not a number"))),
            ParamKind::Int { .. } => raw
                .parse()
                .map(ParamValue::Int)
                .map_err(|_| Error::invalid(self.name, format!("{raw:?} is not an integer"))),
            ParamKind::Choice { .. } => Ok(ParamValue::Text(raw.to_string())),
        }
    }

    /// Check `value` against this declaration.
    fn check(&self, value: &ParamValue) -> Result<ParamValue> {
        match (self.kind, value) {
            (ParamKind::Float { min, max, .. }, ParamValue::Float(_) | ParamValue::Int(_)) => {
                let v = value.as_f64().unwrap_or(f64::NAN);
                if !v.is_finite() || v < min || v > max {
                    return Err(Error::invalid(
                        self.name,
                        format!("{v} is outside [{min}, {max}]"),
                    ));
                }
                Ok(ParamValue::Float(v))
            }
            (ParamKind::Int { min, max, step, .. }, &ParamValue::Int(v)) => {
                if v < min || v > max {
                    return Err(Error::invalid(
                        self.name,
                        format!("{v} is outside [{min}, {max}]"),
                    ));
                }
                if step > 1 && (v - min) % step != 0 {
                    return Err(Error::invalid(
                        self.name,
                        format!("{v} is not {min} plus a multiple of {step}"),
                    ));
                }
                Ok(ParamValue::Int(v))
            }
            (ParamKind::Choice { options, .. }, ParamValue::Text(v)) => {
                if options.contains(&v.as_str()) {
                    Ok(value.clone())
                } else {
                    Err(Error::invalid(
                        self.name,
                        format!("{v:?} is not one of {options:?}"),
                    ))
                }
            }
            (kind, value) => Err(Error::invalid(
                self.name,
                format!("expected {}, got {value}", kind_label(kind)),
            )),
        }
    }
}

fn kind_label(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Float { .. } => "a number",
        ParamKind::Int { .. } => "an integer",
        ParamKind::Choice { .. } => "a string option",
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::Float {
                default,
                min,
                max,
                step,
            } => write!(
                f,
                "{}: float = {default} [{min}, {max}] step {step}",
                self.name
            ),
            ParamKind::Int {
                default,
                min,
                max,
                step,
            } => write!(
                f,
                "{}: int = {default} [{min}, {max}] step {step}",
                self.name
            ),
            ParamKind::Choice { options, default } => {
                write!(f, "{}: {} = {default}", self.name, options.join("|"))
            }
        }
    }
}

/// A parameter value as supplied by a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// String option.
    Text(String),
}

impl ParamValue {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f64),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Named parameter values for one node call. Absent names take their default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Empty set: every parameter at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Parse `name=value` assignments against `specs`.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed assignments, unknown names or unparsable values.
    pub fn parse_assignments<S: AsRef<str>>(specs: &[ParamSpec], assignments: &[S]) -> Result<Self> {
        let mut params = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (name, raw) = assignment.split_once('=').ok_or_else(|| {
                Error::invalid(assignment, "expected an assignment of the form name=value")
            })?;
            let name = name.trim();
            let spec = find_spec(specs, name)?;
            params.set(name, spec.parse_value(raw)?);
        }
        Ok(params)
    }

    /// Check every value against `specs` and fill in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names, wrong types, out-of-range numbers
    /// or options outside the declared set.
    pub fn resolve(&self, specs: &[ParamSpec]) -> Result<Resolved> {
        for name in self.0.keys() {
            find_spec(specs, name)?;
        }

        let mut values = BTreeMap::new();
        for spec in specs {
            let value = match self.0.get(spec.name) {
                Some(value) => spec.check(value)?,
                None => spec.default_value(),
            };
            values.insert(spec.name, value);
        }
        Ok(Resolved { values })
    }
}

fn find_spec<'a>(specs: &'a [ParamSpec], name: &str) -> Result<&'a ParamSpec> {
    specs.iter().find(|spec| spec.name == name).ok_or_else(|| {
        let known: Vec<_> = specs.iter().map(|spec| spec.name).collect();
        Error::invalid(name, format!("unknown parameter, expected one of {known:?}"))
    })
}

/// Validated parameters with every declared name present.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    values: BTreeMap<&'static str, ParamValue>,
}

impl Resolved {
    fn get(&self, name: &str) -> Result<&ParamValue> {
        self.values
            .get(name)
            .ok_or_else(|| Error::invalid(name, "parameter is not declared by this node"))
    }

    /// Float value, narrowed to `f32`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is undeclared or not numeric.
    #[allow(clippy::cast_possible_truncation)]
    pub fn float(&self, name: &str) -> Result<f32> {
        self.get(name)?
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| Error::invalid(name, "expected a number"))
    }

    /// Integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is undeclared or not an integer.
    pub fn int(&self, name: &str) -> Result<i64> {
        match self.get(name)? {
            ParamValue::Int(v) => Ok(*v),
            other => Err(Error::invalid(name, format!("expected an integer, got {other}"))),
        }
    }

    /// Non-negative integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is undeclared, not an integer, or negative.
    pub fn count(&self, name: &str) -> Result<usize> {
        let v = self.int(name)?;
        usize::try_from(v).map_err(|_| Error::invalid(name, format!("{v} is negative")))
    }

    /// Parsed choice value.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is undeclared or does not parse as `T`.
    pub fn choice<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr<Err = Error>,
    {
        match self.get(name)? {
            ParamValue::Text(v) => v.parse(),
            other => Err(Error::invalid(name, format!("expected a string option, got {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latent::ChannelSelector;

    const SPECS: [ParamSpec; 3] = [
        ParamSpec::choice("channel", &ChannelSelector::OPTIONS, "all"),
        ParamSpec::float("factor", 1.0, -10.0, 10.0, 0.1),
        ParamSpec::int("kernel_size", 3, 1, 21, 2),
    ];

    #[test]
    fn test_defaults_fill_in() {
        let resolved = Params::new().resolve(&SPECS).unwrap();
        assert_eq!(resolved.float("factor").unwrap(), 1.0);
        assert_eq!(resolved.count("kernel_size").unwrap(), 3);
        assert_eq!(
            resolved.choice::<ChannelSelector>("channel").unwrap(),
            ChannelSelector::All
        );
    }

    #[test]
    fn test_int_accepted_for_float() {
        let resolved = Params::new().with("factor", 2_i64).resolve(&SPECS).unwrap();
        assert_eq!(resolved.float("factor").unwrap(), 2.0);
    }

    #[test]
    fn test_rejections() {
        let cases = [
            Params::new().with("factor", 11.0),
            Params::new().with("factor", "big"),
            Params::new().with("kernel_size", 4_i64),
            Params::new().with("kernel_size", 23_i64),
            Params::new().with("kernel_size", 3.0),
            Params::new().with("channel", "c7"),
            Params::new().with("unknown", 1.0),
        ];
        for params in cases {
            assert!(
                matches!(params.resolve(&SPECS), Err(Error::InvalidParameter { .. })),
                "{params:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_assignments() {
        let params =
            Params::parse_assignments(&SPECS, &["factor=0.5", "kernel_size = 5", "channel=c1"])
                .unwrap();
        let resolved = params.resolve(&SPECS).unwrap();
        assert_eq!(resolved.float("factor").unwrap(), 0.5);
        assert_eq!(resolved.count("kernel_size").unwrap(), 5);
        assert_eq!(
            resolved.choice::<ChannelSelector>("channel").unwrap(),
            ChannelSelector::C1
        );

        assert!(Params::parse_assignments(&SPECS, &["factor"]).is_err());
        assert!(Params::parse_assignments(&SPECS, &["kernel_size=2.5"]).is_err());
    }

    #[test]
    fn test_params_from_json() {
        let params: Params =
            serde_json::from_str(r#"{"factor": 3, "channel": "c2"}"#).unwrap();
        let resolved = params.resolve(&SPECS).unwrap();
        assert_eq!(resolved.float("factor").unwrap(), 3.0);
    }
}
