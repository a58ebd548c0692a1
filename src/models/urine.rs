use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::UrineTestType;

/// Dipstick chemistry. Every field is optional: `None` means not reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChemistryData {
    pub ph: Option<f64>,
    pub color: Option<String>,
    pub clarity: Option<String>,
    pub odor: Option<String>,
    pub specific_gravity: Option<f64>,
    /// mg/dL
    pub protein: Option<f64>,
    pub glucose: Option<String>,
    pub ketones: Option<String>,
    pub blood: Option<String>,
    pub nitrites: Option<String>,
    pub leukocyte_esterase: Option<String>,
    /// mg/day
    pub microalbumin: Option<f64>,
}

impl ChemistryData {
    /// Qualitative dipstick markers in report order.
    pub fn markers(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("Glucose", self.glucose.as_deref()),
            ("Ketones", self.ketones.as_deref()),
            ("Blood", self.blood.as_deref()),
            ("Nitrites", self.nitrites.as_deref()),
            ("Leukocyte esterase", self.leukocyte_esterase.as_deref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Microscopy counts are per high-power field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MicroscopicData {
    pub rbc: Option<f64>,
    pub wbc: Option<f64>,
    pub casts: Option<String>,
    pub crystals: Option<String>,
    pub epithelial_cells: Option<f64>,
}

impl MicroscopicData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Culture / microbiome results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MicrobiologyData {
    /// CFU/mL
    pub bacterial_load: Option<f64>,
    /// Species name (lowercase) to percentage of the sample.
    pub microbial_composition: BTreeMap<String, f64>,
    pub detected_pathogens: Vec<String>,
    pub resistance_genes: Vec<String>,
    pub symptoms: bool,
}

impl MicrobiologyData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Rapid dipstick screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RapidData {
    pub nitrites: Option<String>,
    pub leukocyte_esterase: Option<String>,
    pub glucose: Option<String>,
    pub protein: Option<String>,
    pub blood: Option<String>,
}

impl RapidData {
    /// Screened parameters in evaluation order.
    pub fn parameters(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("Nitrites", self.nitrites.as_deref()),
            ("Leukocyte esterase", self.leukocyte_esterase.as_deref()),
            ("Glucose", self.glucose.as_deref()),
            ("Protein", self.protein.as_deref()),
            ("Blood", self.blood.as_deref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PregnancyData {
    /// Qualitative result as printed on the report ("Positive", "Negative", ...).
    pub result: Option<String>,
    /// mIU/mL
    pub hcg: Option<f64>,
}

impl PregnancyData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything parsed from one urine report, plus which panels to evaluate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrineReport {
    pub test_type: UrineTestType,
    pub chemistry: Option<ChemistryData>,
    pub microscopic: Option<MicroscopicData>,
    pub microbiology: Option<MicrobiologyData>,
    /// 24-hour collection volume in mL.
    pub urine_volume: Option<f64>,
    pub rapid: Option<RapidData>,
    pub pregnancy: Option<PregnancyData>,
}

impl UrineReport {
    /// True when no panel received any field.
    pub fn is_empty(&self) -> bool {
        self.chemistry.is_none()
            && self.microscopic.is_none()
            && self.microbiology.is_none()
            && self.urine_volume.is_none()
            && self.rapid.is_none()
            && self.pregnancy.is_none()
    }
}
