//! Field extraction for urine reports.
//!
//! Every field has its own case-insensitive probe over the whole text. Probes are
//! independent: a value that matches but does not parse is logged and left absent,
//! and the other fields are still read.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    ChemistryData, MicrobiologyData, MicroscopicData, PregnancyData, RapidData, UrineReport,
    UrineTestType,
};

fn probe(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("valid regex")
}

// Descriptor captures stay on the label's line.
static PH_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bpH[:\s]+([\d.]+)"));
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bcolou?r[:\t ]+([\w \t]+)"));
static CLARITY_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bclarity[:\t ]+([\w \t]+)"));
static ODOR_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bodou?r[:\t ]+([\w \t]+)"));
static SPECIFIC_GRAVITY_RE: LazyLock<Regex> =
    LazyLock::new(|| probe(r"specific\s*gravity[:\s]+([\d.]+)"));
static PROTEIN_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"protein[:\s]+([\d.]+)\s*mg/dL"));
static MICROALBUMIN_RE: LazyLock<Regex> =
    LazyLock::new(|| probe(r"microalbumin[:\s]+([\d.]+)\s*mg/day"));

static RBC_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bRBC[:\s]+([\d.]+)"));
static WBC_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bWBC[:\s]+([\d.]+)"));
static CASTS_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bcasts[:\t ]+([\w \t]+)"));
static CRYSTALS_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bcrystals[:\t ]+([\w \t]+)"));
static EPITHELIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| probe(r"epithelial\s*cells?[:\s]+([\d.]+)"));

static BACTERIAL_LOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| probe(r"bacterial\s*load[:\s]+([\d.e+]+)"));
static RESISTANCE_GENE_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"resistance\s+genes?"));
static SYMPTOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| probe(r"\bsymptom(?:s|atic)?[:\s]+(?:yes|present|positive)\b"));

static VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| probe(r"24[-\s]*(?:hour|hr)\s*urine\s*volume[:\s]+([\d.]+)\s*mL"));

static PREGNANCY_RE: LazyLock<Regex> =
    LazyLock::new(|| probe(r"pregnancy\s*test[:\s]+(positive|negative)"));
static HCG_RE: LazyLock<Regex> = LazyLock::new(|| probe(r"\bhCG[:\s]+([\d.]+)\s*mIU/mL"));

/// Composition probes: (pattern, stored species name).
static COMPOSITION_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"lactobacillus\s*gasseri[:\s]+([\d.]+)", "lactobacillus gasseri"),
        (r"enterococcus\s*faecalis[:\s]+([\d.]+)", "enterococcus faecalis"),
        (r"actinomyces\s*neuii[:\s]+([\d.]+)", "actinomyces neuii"),
        (r"escherichia\s*coli[:\s]+([\d.]+)", "escherichia coli"),
    ]
    .into_iter()
    .map(|(pattern, name)| (probe(pattern), name))
    .collect()
});

/// Pathogen probes: (pattern, name as reported). Counted only with a positive value.
static PATHOGEN_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"escherichia\s+coli[:\s]+([\d.]+)", "Escherichia coli"),
        (r"klebsiella\s+pneumoniae[:\s]+([\d.]+)", "Klebsiella pneumoniae"),
        (r"staphylococcus\s+aureus[:\s]+([\d.]+)", "Staphylococcus aureus"),
    ]
    .into_iter()
    .map(|(pattern, name)| (probe(pattern), name))
    .collect()
});

fn qualitative(label: &str) -> Regex {
    probe(&format!(r"\b{label}[:\s]+(negative|positive)\b"))
}

static GLUCOSE_RE: LazyLock<Regex> = LazyLock::new(|| qualitative("glucose"));
static KETONES_RE: LazyLock<Regex> = LazyLock::new(|| qualitative("ketones"));
static BLOOD_RE: LazyLock<Regex> = LazyLock::new(|| qualitative("blood"));
static NITRITES_RE: LazyLock<Regex> = LazyLock::new(|| qualitative("nitrites"));
static LEUKOCYTE_ESTERASE_RE: LazyLock<Regex> =
    LazyLock::new(|| qualitative(r"leukocyte\s*esterase"));
static PROTEIN_QUALITATIVE_RE: LazyLock<Regex> = LazyLock::new(|| qualitative("protein"));

/// Parse every recognizable urine field. The result always runs the full integration.
pub fn parse_report_text(text: &str) -> UrineReport {
    let chemistry = parse_chemistry(text);
    let microscopic = parse_microscopic(text);
    let microbiology = parse_microbiology(text);
    let rapid = parse_rapid(text);
    let pregnancy = parse_pregnancy(text);

    let report = UrineReport {
        test_type: UrineTestType::Full,
        chemistry: (!chemistry.is_empty()).then_some(chemistry),
        microscopic: (!microscopic.is_empty()).then_some(microscopic),
        microbiology: (!microbiology.is_empty()).then_some(microbiology),
        urine_volume: capture_number(&VOLUME_RE, text, "urine_volume"),
        rapid: (!rapid.is_empty()).then_some(rapid),
        pregnancy: (!pregnancy.is_empty()).then_some(pregnancy),
    };

    tracing::debug!(
        chemistry = report.chemistry.is_some(),
        microscopic = report.microscopic.is_some(),
        microbiology = report.microbiology.is_some(),
        volume = report.urine_volume.is_some(),
        rapid = report.rapid.is_some(),
        pregnancy = report.pregnancy.is_some(),
        "Parsed urine report"
    );
    report
}

fn parse_chemistry(text: &str) -> ChemistryData {
    ChemistryData {
        ph: capture_number(&PH_RE, text, "ph"),
        color: capture_text(&COLOR_RE, text),
        clarity: capture_text(&CLARITY_RE, text),
        odor: capture_text(&ODOR_RE, text),
        specific_gravity: capture_number(&SPECIFIC_GRAVITY_RE, text, "specific_gravity"),
        protein: capture_number(&PROTEIN_RE, text, "protein"),
        glucose: capture_lower(&GLUCOSE_RE, text),
        ketones: capture_lower(&KETONES_RE, text),
        blood: capture_lower(&BLOOD_RE, text),
        nitrites: capture_lower(&NITRITES_RE, text),
        leukocyte_esterase: capture_lower(&LEUKOCYTE_ESTERASE_RE, text),
        microalbumin: capture_number(&MICROALBUMIN_RE, text, "microalbumin"),
    }
}

fn parse_microscopic(text: &str) -> MicroscopicData {
    MicroscopicData {
        rbc: capture_number(&RBC_RE, text, "rbc"),
        wbc: capture_number(&WBC_RE, text, "wbc"),
        casts: capture_text(&CASTS_RE, text),
        crystals: capture_text(&CRYSTALS_RE, text),
        epithelial_cells: capture_number(&EPITHELIAL_RE, text, "epithelial_cells"),
    }
}

fn parse_microbiology(text: &str) -> MicrobiologyData {
    let mut data = MicrobiologyData {
        bacterial_load: capture_number(&BACTERIAL_LOAD_RE, text, "bacterial_load"),
        ..Default::default()
    };

    for (re, species) in COMPOSITION_RES.iter() {
        if let Some(pct) = capture_number(re, text, species) {
            data.microbial_composition.insert((*species).to_string(), pct);
        }
    }

    for (re, pathogen) in PATHOGEN_RES.iter() {
        if capture_number(re, text, pathogen).is_some_and(|v| v > 0.0) {
            data.detected_pathogens.push((*pathogen).to_string());
        }
    }

    data.resistance_genes = text
        .lines()
        .filter(|line| RESISTANCE_GENE_RE.is_match(line))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    data.symptoms = SYMPTOMS_RE.is_match(text);
    data
}

fn parse_rapid(text: &str) -> RapidData {
    RapidData {
        nitrites: capture_lower(&NITRITES_RE, text),
        leukocyte_esterase: capture_lower(&LEUKOCYTE_ESTERASE_RE, text),
        glucose: capture_lower(&GLUCOSE_RE, text),
        protein: capture_lower(&PROTEIN_QUALITATIVE_RE, text),
        blood: capture_lower(&BLOOD_RE, text),
    }
}

fn parse_pregnancy(text: &str) -> PregnancyData {
    match capture_text(&PREGNANCY_RE, text) {
        Some(result) => PregnancyData {
            result: Some(result),
            hcg: None,
        },
        None => PregnancyData {
            result: None,
            hcg: capture_number(&HCG_RE, text, "hcg"),
        },
    }
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn capture_text(re: &Regex, text: &str) -> Option<String> {
    capture(re, text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn capture_lower(re: &Regex, text: &str) -> Option<String> {
    capture(re, text).map(str::to_lowercase)
}

fn capture_number(re: &Regex, text: &str, field: &str) -> Option<f64> {
    let raw = capture(re, text)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::warn!(field, raw, "Field value did not parse, omitting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE_REPORT: &str = "\
URINE ANALYSIS
Color: Dark Yellow
Clarity: Clear
Odor: Normal
pH: 6.5
Specific Gravity: 1.020
Protein: 10 mg/dL
Glucose: Negative
Ketones: Negative
Blood: Positive
Nitrites: Negative
Leukocyte Esterase: Negative
Microalbumin: 12 mg/day
RBC: 2
WBC: 6
Casts: None
Crystals: Calcium oxalate
Epithelial cells: 3
";

    #[test]
    fn parses_chemistry_fields() {
        let report = parse_report_text(COMPLETE_REPORT);
        let chem = report.chemistry.unwrap();
        assert_eq!(chem.ph, Some(6.5));
        assert_eq!(chem.color.as_deref(), Some("Dark Yellow"));
        assert_eq!(chem.clarity.as_deref(), Some("Clear"));
        assert_eq!(chem.odor.as_deref(), Some("Normal"));
        assert_eq!(chem.specific_gravity, Some(1.02));
        assert_eq!(chem.protein, Some(10.0));
        assert_eq!(chem.glucose.as_deref(), Some("negative"));
        assert_eq!(chem.blood.as_deref(), Some("positive"));
        assert_eq!(chem.leukocyte_esterase.as_deref(), Some("negative"));
        assert_eq!(chem.microalbumin, Some(12.0));
    }

    #[test]
    fn parses_microscopic_fields() {
        let micro = parse_report_text(COMPLETE_REPORT).microscopic.unwrap();
        assert_eq!(micro.rbc, Some(2.0));
        assert_eq!(micro.wbc, Some(6.0));
        assert_eq!(micro.casts.as_deref(), Some("None"));
        assert_eq!(micro.crystals.as_deref(), Some("Calcium oxalate"));
        assert_eq!(micro.epithelial_cells, Some(3.0));
    }

    #[test]
    fn descriptor_stops_at_end_of_line() {
        let report = parse_report_text("Color: Red\nClarity: Turbid\n");
        let chem = report.chemistry.unwrap();
        assert_eq!(chem.color.as_deref(), Some("Red"));
        assert_eq!(chem.clarity.as_deref(), Some("Turbid"));
    }

    #[test]
    fn dipstick_markers_also_fill_rapid_panel() {
        let rapid = parse_report_text(COMPLETE_REPORT).rapid.unwrap();
        assert_eq!(rapid.blood.as_deref(), Some("positive"));
        assert_eq!(rapid.leukocyte_esterase.as_deref(), Some("negative"));
        // quantitative protein is not a rapid marker
        assert_eq!(rapid.protein, None);
    }

    #[test]
    fn parses_microbiology() {
        let text = "Bacterial Load: 1.5e5 CFU/mL\n\
                    Lactobacillus gasseri: 40\n\
                    Escherichia coli: 35\n\
                    Klebsiella pneumoniae: 0\n\
                    Aminoglycoside resistance gene detected\n\
                    Symptoms: yes\n";
        let micro = parse_report_text(text).microbiology.unwrap();
        assert_eq!(micro.bacterial_load, Some(1.5e5));
        assert_eq!(micro.microbial_composition.get("lactobacillus gasseri"), Some(&40.0));
        assert_eq!(micro.microbial_composition.get("escherichia coli"), Some(&35.0));
        assert_eq!(micro.detected_pathogens, vec!["Escherichia coli".to_string()]);
        assert_eq!(
            micro.resistance_genes,
            vec!["Aminoglycoside resistance gene detected".to_string()]
        );
        assert!(micro.symptoms);
    }

    #[test]
    fn unparseable_number_is_omitted() {
        let report = parse_report_text("pH: 6.5.1\nSpecific Gravity: 1.015");
        let chem = report.chemistry.unwrap();
        assert_eq!(chem.ph, None);
        assert_eq!(chem.specific_gravity, Some(1.015));
    }

    #[test]
    fn parses_volume_and_pregnancy() {
        let report = parse_report_text("24-hour urine volume: 1800 mL\nPregnancy Test: Positive");
        assert_eq!(report.urine_volume, Some(1800.0));
        assert_eq!(report.pregnancy.unwrap().result.as_deref(), Some("Positive"));

        let report = parse_report_text("24 hr Urine Volume 450 ml\nhCG: 35 mIU/mL");
        assert_eq!(report.urine_volume, Some(450.0));
        let pregnancy = report.pregnancy.unwrap();
        assert_eq!(pregnancy.result, None);
        assert_eq!(pregnancy.hcg, Some(35.0));
    }

    #[test]
    fn empty_text_gives_empty_report() {
        let report = parse_report_text("Patient: Jane Doe\nDate: 2024-03-01");
        assert!(report.is_empty());
        assert_eq!(report.test_type, UrineTestType::Full);
    }
}
