use crate::error::PresetError;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Exercise parameters as stored in the presets file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisePreset {
    pub name: String,
    pub reps_per_set: u32,
    pub sets_total: u32,
    pub rest_seconds: u32,
    pub green_offset: f64,
    pub red_offset: f64,
}

impl ExercisePreset {
    /// Session parameters with default tuning values
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::new(
            self.name.clone(),
            self.reps_per_set,
            self.sets_total,
            self.rest_seconds,
            self.green_offset,
            self.red_offset,
        )
    }

    /// Replace individual values, as entered on the command line
    pub fn apply_overrides(&mut self, overrides: &PresetOverrides) {
        if let Some(reps) = overrides.reps_per_set {
            self.reps_per_set = reps;
        }
        if let Some(sets) = overrides.sets_total {
            self.sets_total = sets;
        }
        if let Some(rest) = overrides.rest_seconds {
            self.rest_seconds = rest;
        }
        if let Some(green) = overrides.green_offset {
            self.green_offset = green;
        }
        if let Some(red) = overrides.red_offset {
            self.red_offset = red;
        }
    }
}

/// Operator adjustments applied on top of the selected preset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetOverrides {
    pub reps_per_set: Option<u32>,
    pub sets_total: Option<u32>,
    pub rest_seconds: Option<u32>,
    pub green_offset: Option<f64>,
    pub red_offset: Option<f64>,
}

impl PresetOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Ordered collection of presets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetCatalog {
    presets: Vec<ExercisePreset>,
}

impl PresetCatalog {
    /// Read and parse a presets file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PresetError> {
        let path = path.as_ref();
        debug!("Loading exercise presets from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| PresetError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        let catalog = Self::parse(&content)?;
        if catalog.is_empty() {
            return Err(PresetError::Empty(path.display().to_string()));
        }

        info!(
            "Loaded {} exercise presets from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse `name;reps;sets;rest;green;red` lines.
    ///
    /// Blank lines and `#` comments are ignored. Lines with the wrong number of
    /// fields are skipped with a warning; unparsable values are errors.
    pub fn parse(content: &str) -> Result<Self, PresetError> {
        let mut presets: Vec<ExercisePreset> = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            if fields.len() != 6 {
                warn!(
                    "Skipping preset line {}: expected 6 fields, found {}",
                    line_number,
                    fields.len()
                );
                continue;
            }

            let preset = ExercisePreset {
                name: fields[0].to_string(),
                reps_per_set: parse_field(fields[1], "reps", line_number)?,
                sets_total: parse_field(fields[2], "sets", line_number)?,
                rest_seconds: parse_field(fields[3], "rest", line_number)?,
                green_offset: parse_field(fields[4], "green offset", line_number)?,
                red_offset: parse_field(fields[5], "red offset", line_number)?,
            };

            if preset.name.is_empty() {
                return Err(PresetError::MalformedLine {
                    line: line_number,
                    details: "empty exercise name".to_string(),
                });
            }

            // A later line with the same name replaces the earlier one in place
            if let Some(existing) = presets.iter_mut().find(|p| p.name == preset.name) {
                warn!("Preset '{}' redefined on line {}", preset.name, line_number);
                *existing = preset;
            } else {
                presets.push(preset);
            }
        }

        Ok(Self { presets })
    }

    /// Find a preset by name, or take the first one when no name is given
    pub fn select(&self, name: Option<&str>) -> Result<&ExercisePreset, PresetError> {
        match name {
            Some(name) => self
                .presets
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| PresetError::UnknownPreset(name.to_string())),
            None => self
                .presets
                .first()
                .ok_or_else(|| PresetError::Empty("preset catalog".to_string())),
        }
    }

    pub fn presets(&self) -> &[ExercisePreset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

fn parse_field<T: FromStr>(value: &str, field: &str, line: usize) -> Result<T, PresetError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| PresetError::MalformedLine {
        line,
        details: format!("invalid {} '{}': {}", field, value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
# name;reps;sets;rest;green;red
Lateral raise;10;3;30;-0.15;0.05

Front raise;8;2;45;-0.2;0.1
broken line;1;2
";

    #[test]
    fn test_parse_presets() {
        let catalog = PresetCatalog::parse(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = &catalog.presets()[0];
        assert_eq!(first.name, "Lateral raise");
        assert_eq!(first.reps_per_set, 10);
        assert_eq!(first.sets_total, 3);
        assert_eq!(first.rest_seconds, 30);
        assert_eq!(first.green_offset, -0.15);
        assert_eq!(first.red_offset, 0.05);
    }

    #[test]
    fn test_malformed_value_reports_line() {
        let content = "Lateral raise;10;3;30;-0.15;0.05\nBad;ten;3;30;0;0\n";
        match PresetCatalog::parse(content) {
            Err(PresetError::MalformedLine { line, details }) => {
                assert_eq!(line, 2);
                assert!(details.contains("reps"));
            }
            other => panic!("expected malformed line error, got {:?}", other),
        }
    }

    #[test]
    fn test_select() {
        let catalog = PresetCatalog::parse(SAMPLE).unwrap();
        assert_eq!(catalog.select(None).unwrap().name, "Lateral raise");
        assert_eq!(catalog.select(Some("Front raise")).unwrap().reps_per_set, 8);
        assert!(matches!(
            catalog.select(Some("Squat")),
            Err(PresetError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let catalog = PresetCatalog::parse(SAMPLE).unwrap();
        let mut preset = catalog.select(None).unwrap().clone();

        let overrides = PresetOverrides {
            reps_per_set: Some(12),
            red_offset: Some(0.08),
            ..Default::default()
        };
        assert!(!overrides.is_empty());
        preset.apply_overrides(&overrides);

        assert_eq!(preset.reps_per_set, 12);
        assert_eq!(preset.sets_total, 3);
        assert_eq!(preset.red_offset, 0.08);

        let config = preset.to_session_config();
        assert_eq!(config.exercise_name, "Lateral raise");
        assert_eq!(config.reps_per_set, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let catalog = PresetCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PresetCatalog::load(dir.path().join("missing.txt")),
            Err(PresetError::Read { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# only comments").unwrap();
        assert!(matches!(
            PresetCatalog::load(file.path()),
            Err(PresetError::Empty(_))
        ));
    }
}
