use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Classification, Gender};

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Failed to load reference data from {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse reference data {0}: {1}")]
    Parse(String, String),

    #[error("Invalid reference range for {test_key} ({gender}): {low}-{high}")]
    InvalidRange {
        test_key: String,
        gender: Gender,
        low: f64,
        high: f64,
    },
}

/// Normal interval for one test and gender, in the test's canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub test_key: String,
    pub gender: Gender,
    pub low: f64,
    pub high: f64,
    pub unit: String,
}

/// Dietary or follow-up advice for an abnormal direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub test_key: String,
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
}

/// Reference ranges plus advice, looked up by normalized test key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub ranges: Vec<ReferenceRange>,
    #[serde(default)]
    pub advice: Vec<Advice>,
}

static BUILTIN: LazyLock<ReferenceTable> = LazyLock::new(ReferenceTable::load_builtin);

impl ReferenceTable {
    /// The compiled-in table.
    pub fn builtin() -> &'static ReferenceTable {
        &BUILTIN
    }

    /// Load a table from a JSON file with `ranges` and optional `advice` arrays.
    pub fn load_json(path: &Path) -> Result<Self, ReferenceError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ReferenceError::Load(path.display().to_string(), e.to_string()))?;

        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let table: ReferenceTable = serde_json::from_str(&json)
            .map_err(|e| ReferenceError::Parse(file_name, e.to_string()))?;

        table.validate()?;
        tracing::info!(
            path = %path.display(),
            ranges = table.ranges.len(),
            advice = table.advice.len(),
            "Loaded reference table"
        );
        Ok(table)
    }

    fn validate(&self) -> Result<(), ReferenceError> {
        for range in &self.ranges {
            if !range.low.is_finite() || !range.high.is_finite() || range.low > range.high {
                return Err(ReferenceError::InvalidRange {
                    test_key: range.test_key.clone(),
                    gender: range.gender,
                    low: range.low,
                    high: range.high,
                });
            }
        }
        Ok(())
    }

    /// Range for `(test_key, gender)`, falling back to the male entry.
    pub fn lookup(&self, test_key: &str, gender: Gender) -> Option<&ReferenceRange> {
        let find = |g: Gender| {
            self.ranges
                .iter()
                .find(|r| r.test_key == test_key && r.gender == g)
        };
        find(gender).or_else(|| find(Gender::Male))
    }

    /// Advice for an abnormal classification. `Normal` never has advice.
    pub fn advice(&self, test_key: &str, classification: Classification) -> Option<&str> {
        let entry = self.advice.iter().find(|a| a.test_key == test_key)?;
        let text = match classification {
            Classification::Low => entry.low.as_deref(),
            Classification::High => entry.high.as_deref(),
            Classification::Normal => None,
        };
        text.filter(|t| !t.is_empty())
    }

    fn load_builtin() -> Self {
        let mut table = Self::default();

        for key in ["hemoglobin", "hb", "hgb"] {
            table.push_ranges(key, "g/dL", (13.2, 16.6), (11.6, 15.0));
        }
        for key in ["hematocrit", "hct"] {
            table.push_ranges(key, "%", (38.3, 48.6), (35.5, 44.9));
        }
        for key in ["rbc", "redbloodcell"] {
            table.push_ranges(key, "10^6/uL", (4.35, 5.65), (3.92, 5.13));
        }
        for key in ["wbc", "whitebloodcell"] {
            table.push_ranges(key, "10^3/uL", (3.4, 9.6), (3.4, 9.6));
        }
        for key in ["platelet", "platelets"] {
            table.push_ranges(key, "10^3/uL", (135.0, 317.0), (157.0, 371.0));
        }
        table.push_ranges("mch", "pg", (27.0, 33.0), (27.0, 33.0));
        table.push_ranges("mchc", "g/dL", (33.0, 36.0), (33.0, 36.0));
        for key in ["glucose", "fastingplasmaglucose"] {
            table.push_ranges(key, "mg/dL", (70.0, 99.0), (70.0, 99.0));
        }
        table.push_ranges("hba1c", "%", (4.0, 5.6), (4.0, 5.6));
        table.push_ranges("totalcholesterol", "mg/dL", (100.0, 199.0), (100.0, 199.0));
        table.push_ranges("ldlcholesterol", "mg/dL", (0.0, 99.0), (0.0, 99.0));
        table.push_ranges("hdlcholesterol", "mg/dL", (40.0, 100.0), (50.0, 100.0));
        table.push_ranges("triglycerides", "mg/dL", (0.0, 149.0), (0.0, 149.0));
        for key in ["creatinine", "serumcreatinine"] {
            table.push_ranges(key, "mg/dL", (0.74, 1.35), (0.59, 1.04));
        }
        table.push_ranges("sodium", "mmol/L", (135.0, 145.0), (135.0, 145.0));
        table.push_ranges("tsh", "m[IU]/L", (0.4, 4.0), (0.4, 4.0));
        table.push_ranges("ferritin", "ng/mL", (24.0, 336.0), (11.0, 307.0));

        let iron_rich = "Eat more iron-rich foods (leafy greens, red meat, beans, lentils) and vitamin C-rich fruits (oranges, guava) to improve absorption.";
        let consult = "Consult your doctor for further evaluation.";
        for key in ["hemoglobin", "hb", "hgb"] {
            table.push_advice(
                key,
                Some(iron_rich),
                Some("Stay hydrated. High hemoglobin may need medical evaluation."),
            );
        }
        table.push_advice(
            "mch",
            Some("Low MCH may indicate iron deficiency. Eat more iron-rich foods."),
            Some(consult),
        );
        table.push_advice(
            "mchc",
            Some("Low MCHC may indicate iron deficiency anemia. Eat more iron-rich foods and vitamin C-rich fruits."),
            Some(consult),
        );
        table.push_advice(
            "ferritin",
            Some("Low ferritin suggests depleted iron stores. Eat more iron-rich foods and discuss supplementation with your doctor."),
            Some(consult),
        );
        for key in ["glucose", "fastingplasmaglucose", "hba1c"] {
            table.push_advice(
                key,
                Some("Eat regular balanced meals and discuss low blood sugar episodes with your doctor."),
                Some("Limit refined sugars and carbohydrates, stay active, and follow up on blood sugar control with your doctor."),
            );
        }
        for key in ["totalcholesterol", "ldlcholesterol", "triglycerides"] {
            table.push_advice(
                key,
                None,
                Some("Reduce saturated fats and fried foods, add more fiber, and exercise regularly."),
            );
        }
        table.push_advice(
            "hdlcholesterol",
            Some("Regular aerobic exercise and healthy fats (olive oil, nuts, fish) can raise HDL."),
            None,
        );
        for key in ["creatinine", "serumcreatinine"] {
            table.push_advice(
                key,
                None,
                Some("Stay hydrated and have your kidney function reviewed by a doctor."),
            );
        }
        table.push_advice("tsh", Some(consult), Some(consult));

        table
    }

    fn push_ranges(&mut self, key: &str, unit: &str, male: (f64, f64), female: (f64, f64)) {
        for (gender, (low, high)) in [(Gender::Male, male), (Gender::Female, female)] {
            self.ranges.push(ReferenceRange {
                test_key: key.to_string(),
                gender,
                low,
                high,
                unit: unit.to_string(),
            });
        }
    }

    fn push_advice(&mut self, key: &str, low: Option<&str>, high: Option<&str>) {
        self.advice.push(Advice {
            test_key: key.to_string(),
            low: low.map(str::to_string),
            high: high.map(str::to_string),
        });
    }
}
