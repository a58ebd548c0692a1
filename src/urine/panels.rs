//! Rule evaluators for urine panels.
//!
//! Each evaluator is pure and returns the findings for its panel, or a
//! `PanelError` when an input cannot be evaluated. The dispatcher renders each
//! panel as one line and keeps going when a sibling panel fails.

use thiserror::Error;

use crate::models::{
    ChemistryData, MicrobiologyData, MicroscopicData, PregnancyData, RapidData, UrineReport,
    UrineTestType,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PanelError {
    #[error("Invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("Invalid {field} percentage for {species}: {value}")]
    InvalidComposition {
        field: &'static str,
        species: String,
        value: f64,
    },
}

pub const BACTERIAL_LOAD_THRESHOLD: f64 = 1e5;
pub const BENEFICIAL_FLORA_FLOOR: f64 = 70.0;
pub const BENEFICIAL_SPECIES: &str = "lactobacillus gasseri";
pub const COMMON_PATHOGENS: &[&str] = &[
    "escherichia coli",
    "klebsiella pneumoniae",
    "staphylococcus aureus",
];

pub const PH_RANGE: (f64, f64) = (4.6, 8.0);
pub const SPECIFIC_GRAVITY_RANGE: (f64, f64) = (1.005, 1.030);
pub const PROTEIN_LIMIT_MG_DL: f64 = 15.0;
pub const MICROALBUMIN_LIMIT_MG_DAY: f64 = 30.0;
pub const RBC_LIMIT_HPF: f64 = 3.0;
pub const WBC_LIMIT_HPF: f64 = 5.0;
pub const EPITHELIAL_LIMIT_HPF: f64 = 5.0;
pub const OLIGURIA_ML: f64 = 600.0;
pub const POLYURIA_ML: f64 = 3600.0;
pub const HCG_POSITIVE_MIU_ML: f64 = 20.0;

const UNREMARKABLE_SEDIMENT: &[&str] = &["none", "negative", "rare", ""];

/// Reject NaN, infinities and negative measurements.
fn checked(field: &'static str, value: f64) -> Result<f64, PanelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PanelError::InvalidValue { field, value })
    }
}

fn out_of(range: (f64, f64), value: f64) -> bool {
    value < range.0 || value > range.1
}

// ───────────────────────────────────────────────
// Evaluators
// ───────────────────────────────────────────────

pub fn analyze_microbiology(data: &MicrobiologyData) -> Result<Vec<String>, PanelError> {
    let mut findings = Vec::new();

    if let Some(load) = data.bacterial_load {
        if checked("bacterial_load", load)? >= BACTERIAL_LOAD_THRESHOLD {
            findings.push("High bacterial load indicates potential infection.".to_string());
        }
    }

    // Other species may be reported as CFU counts; only the beneficial share is a percentage.
    if let Some(&beneficial) = data.microbial_composition.get(BENEFICIAL_SPECIES) {
        if !beneficial.is_finite() || !(0.0..=100.0).contains(&beneficial) {
            return Err(PanelError::InvalidComposition {
                field: "microbial_composition",
                species: BENEFICIAL_SPECIES.to_string(),
                value: beneficial,
            });
        }
        if beneficial < BENEFICIAL_FLORA_FLOOR {
            findings.push(
                "Low proportion of beneficial bacteria (Lactobacillus spp.) suggests imbalance."
                    .to_string(),
            );
        }
    }

    let detected: Vec<String> = data
        .detected_pathogens
        .iter()
        .map(|p| p.to_lowercase())
        .collect();
    let common: Vec<&str> = COMMON_PATHOGENS
        .iter()
        .copied()
        .filter(|p| detected.iter().any(|d| d == p))
        .collect();
    if !common.is_empty() {
        findings.push(format!("Detected common pathogens: {}", common.join(", ")));
    }

    if !data.resistance_genes.is_empty() {
        findings.push("Resistance genes detected; correlate with clinical findings.".to_string());
    }
    if data.symptoms {
        findings.push("Patient is symptomatic, warranting further evaluation.".to_string());
    }

    Ok(findings)
}

pub fn analyze_chemistry(data: &ChemistryData) -> Result<Vec<String>, PanelError> {
    let mut findings = Vec::new();

    if let Some(ph) = data.ph {
        if out_of(PH_RANGE, checked("ph", ph)?) {
            findings.push(format!("pH is out of the normal range (4.6-8.0): {ph}."));
        }
    }
    if let Some(color) = &data.color {
        let lower = color.to_lowercase();
        if ["red", "brown", "cloudy"].iter().any(|c| lower.contains(c)) {
            findings.push(format!("Color '{color}' is abnormal."));
        }
    }
    if let Some(clarity) = &data.clarity {
        if !matches!(clarity.to_lowercase().as_str(), "clear" | "normal") {
            findings.push(format!("Clarity '{clarity}' is abnormal."));
        }
    }
    if let Some(odor) = &data.odor {
        let lower = odor.to_lowercase();
        if lower.contains("fruity") || lower.contains("foul") {
            findings.push(format!("Odor '{odor}' is abnormal."));
        }
    }
    if let Some(sg) = data.specific_gravity {
        if out_of(SPECIFIC_GRAVITY_RANGE, checked("specific_gravity", sg)?) {
            findings.push(format!("Specific Gravity ({sg}) is out of range (1.005-1.030)."));
        }
    }
    if let Some(protein) = data.protein {
        if checked("protein", protein)? > PROTEIN_LIMIT_MG_DL {
            findings.push(format!(
                "Protein level ({protein} mg/dL) is elevated (normal <15 mg/dL)."
            ));
        }
    }
    for (name, value) in data.markers() {
        if let Some(value) = value {
            if value.to_lowercase() != "negative" {
                findings.push(format!("{name} is abnormal: {value}."));
            }
        }
    }
    if let Some(microalbumin) = data.microalbumin {
        if checked("microalbumin", microalbumin)? > MICROALBUMIN_LIMIT_MG_DAY {
            findings.push(format!(
                "Microalbumin ({microalbumin} mg/day) is elevated (normal <30 mg/day)."
            ));
        }
    }

    Ok(findings)
}

pub fn analyze_microscopic(data: &MicroscopicData) -> Result<Vec<String>, PanelError> {
    let mut findings = Vec::new();

    if let Some(rbc) = data.rbc {
        if checked("rbc", rbc)? > RBC_LIMIT_HPF {
            findings.push(format!("RBC count ({rbc}/HPF) is elevated (normal 0-3/HPF)."));
        }
    }
    if let Some(wbc) = data.wbc {
        if checked("wbc", wbc)? >= WBC_LIMIT_HPF {
            findings.push(format!("WBC count ({wbc}/HPF) is high (normal <5/HPF)."));
        }
    }
    if let Some(casts) = &data.casts {
        if !UNREMARKABLE_SEDIMENT.contains(&casts.trim().to_lowercase().as_str()) {
            findings.push(format!("Casts reported as '{casts}' may be abnormal."));
        }
    }
    if let Some(crystals) = &data.crystals {
        if !UNREMARKABLE_SEDIMENT.contains(&crystals.trim().to_lowercase().as_str()) {
            findings.push(format!(
                "Crystals reported as '{crystals}' may indicate pathology."
            ));
        }
    }
    if let Some(epithelial) = data.epithelial_cells {
        if checked("epithelial_cells", epithelial)? > EPITHELIAL_LIMIT_HPF {
            findings.push(format!(
                "Epithelial cells count ({epithelial}/HPF) is high (normal <5/HPF)."
            ));
        }
    }

    Ok(findings)
}

/// Oliguria below 600 mL, polyuria above 3600 mL; both bounds are normal.
pub fn analyze_24hour_volume(volume: Option<f64>) -> Result<Vec<String>, PanelError> {
    let Some(volume) = volume else {
        return Ok(vec!["No 24-hour urine volume provided.".to_string()]);
    };
    let volume = checked("urine_volume", volume)?;

    let verdict = if volume < OLIGURIA_ML {
        "is low (oliguria)"
    } else if volume > POLYURIA_ML {
        "is high (polyuria)"
    } else {
        "is within the normal range"
    };
    Ok(vec![format!("24-Hour Urine Volume ({volume} mL) {verdict}.")])
}

pub fn analyze_rapid(data: &RapidData) -> Result<Vec<String>, PanelError> {
    Ok(data
        .parameters()
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .filter(|v| v.to_lowercase() != "negative")
                .map(|v| format!("{name} abnormal: {v}"))
        })
        .collect())
}

/// A qualitative result wins over the hCG level.
pub fn analyze_pregnancy(data: &PregnancyData) -> Result<Vec<String>, PanelError> {
    if let Some(result) = &data.result {
        let verdict = match result.trim().to_lowercase().as_str() {
            "positive" => "Positive.".to_string(),
            "negative" => "Negative.".to_string(),
            _ => format!("Unclear result ({result})."),
        };
        return Ok(vec![verdict]);
    }

    if let Some(hcg) = data.hcg {
        if !hcg.is_finite() {
            return Ok(vec!["Invalid hCG value.".to_string()]);
        }
        let hcg = checked("hcg", hcg)?;
        let verdict = if hcg >= HCG_POSITIVE_MIU_ML {
            "Positive"
        } else {
            "Negative"
        };
        return Ok(vec![format!("{verdict} (hCG: {hcg} mIU/mL).")]);
    }

    Ok(vec!["Insufficient data.".to_string()])
}

// ───────────────────────────────────────────────
// Dispatch
// ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Microbiology,
    Chemistry,
    Microscopic,
    Volume,
    Rapid,
    Pregnancy,
}

impl Panel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Microbiology => "microbiology",
            Self::Chemistry => "chemistry",
            Self::Microscopic => "microscopic",
            Self::Volume => "volume",
            Self::Rapid => "rapid",
            Self::Pregnancy => "pregnancy",
        }
    }

    /// Section heading. The volume heading is shorter inside a full report.
    pub fn title(&self, test_type: UrineTestType) -> &'static str {
        match self {
            Self::Microbiology => "Microbiology (Culture) Analysis",
            Self::Chemistry => "Chemical Analysis (Dipstick)",
            Self::Microscopic => "Microscopic Analysis",
            Self::Volume if test_type == UrineTestType::Full => "24-Hour Volume",
            Self::Volume => "24-Hour Volume Analysis",
            Self::Rapid => "Rapid Urine Test",
            Self::Pregnancy => "Pregnancy Test",
        }
    }

    fn evaluate(&self, report: &UrineReport) -> Result<Vec<String>, PanelError> {
        match self {
            Self::Microbiology => {
                analyze_microbiology(report.microbiology.as_ref().unwrap_or(&MicrobiologyData::default()))
            }
            Self::Chemistry => {
                analyze_chemistry(report.chemistry.as_ref().unwrap_or(&ChemistryData::default()))
            }
            Self::Microscopic => {
                analyze_microscopic(report.microscopic.as_ref().unwrap_or(&MicroscopicData::default()))
            }
            Self::Volume => analyze_24hour_volume(report.urine_volume),
            Self::Rapid => analyze_rapid(report.rapid.as_ref().unwrap_or(&RapidData::default())),
            Self::Pregnancy => {
                analyze_pregnancy(report.pregnancy.as_ref().unwrap_or(&PregnancyData::default()))
            }
        }
    }

    fn render(&self, title: &str, findings: &[String]) -> String {
        match self {
            Self::Rapid if findings.is_empty() => format!("{title}: Normal."),
            Self::Rapid => format!("{title}: Abnormal - {}", findings.join(" | ")),
            Self::Volume | Self::Pregnancy => format!("{title}: {}", findings.join(" ")),
            _ if findings.is_empty() => format!("{title}: {}", self.normal_text()),
            _ => format!("{title}: {}", findings.join(" | ")),
        }
    }

    fn normal_text(&self) -> &'static str {
        match self {
            Self::Microbiology => "Normal.",
            Self::Chemistry => "All parameters are normal.",
            Self::Microscopic => "Normal findings.",
            Self::Volume | Self::Rapid | Self::Pregnancy => "Normal.",
        }
    }

    /// Evaluate and render one panel. A failure becomes an "analysis error" line.
    pub fn run(&self, report: &UrineReport) -> String {
        let title = self.title(report.test_type);
        match self.evaluate(report) {
            Ok(findings) => self.render(title, &findings),
            Err(e) => {
                tracing::error!(panel = self.as_str(), error = %e, "Panel evaluation failed");
                format!("{title}: analysis error.")
            }
        }
    }
}

/// Panels evaluated for a report, in output order.
pub fn panels_for(report: &UrineReport) -> Vec<Panel> {
    match report.test_type {
        UrineTestType::Rapid => vec![Panel::Rapid],
        UrineTestType::Complete => {
            let mut panels = vec![Panel::Chemistry];
            if report.microscopic.is_some() {
                panels.push(Panel::Microscopic);
            }
            panels
        }
        UrineTestType::Culture => vec![Panel::Microbiology],
        UrineTestType::TwentyFourHour => vec![Panel::Volume],
        UrineTestType::Pregnancy => vec![Panel::Pregnancy],
        UrineTestType::Full => [
            (Panel::Microbiology, report.microbiology.is_some()),
            (Panel::Chemistry, report.chemistry.is_some()),
            (Panel::Microscopic, report.microscopic.is_some()),
            (Panel::Volume, report.urine_volume.is_some()),
            (Panel::Rapid, report.rapid.is_some()),
            (Panel::Pregnancy, report.pregnancy.is_some()),
        ]
        .into_iter()
        .filter_map(|(panel, present)| present.then_some(panel))
        .collect(),
    }
}

/// Run the panels selected by the report's test type, one line per panel.
pub fn analyze(report: &UrineReport) -> String {
    panels_for(report)
        .iter()
        .map(|panel| panel.run(report))
        .collect::<Vec<_>>()
        .join("\n")
}
