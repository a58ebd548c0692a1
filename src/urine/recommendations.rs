use crate::models::{UrineReport, UrineTestType};

use super::panels::analyze;
use super::parser::parse_report_text;

/// Phrase triggers and the advice they add, in output order. Matching is a
/// case-insensitive substring test over the assembled panel text.
pub const RECOMMENDATIONS: &[(&str, &str)] = &[
    // Chemistry
    (
        "pH is out of the normal range",
        "Adjust dietary acid load: reduce high-acid foods (e.g., processed meat, soda) and increase fruits/vegetables to help normalize urine pH.",
    ),
    (
        "Color '",
        "Increase hydration and avoid foods/medications that can discolor urine (e.g., beets, rifampin).",
    ),
    (
        "Clarity",
        "Maintain good fluid intake; if cloudiness persists, consider evaluation for infection or crystalluria.",
    ),
    (
        "Odor",
        "Practice good hygiene; if a foul odor continues, seek evaluation for urinary tract infection.",
    ),
    (
        "Specific Gravity",
        "Ensure adequate hydration; aim for 1.5–2 L of water per day unless contraindicated.",
    ),
    (
        "Protein level",
        "Control blood pressure and blood sugar; consider reducing salt intake and discuss ACE inhibitors with your doctor.",
    ),
    // Microscopy
    (
        "RBC count",
        "Rule out stones or trauma; increase hydration and discuss imaging with your provider if bleeding persists.",
    ),
    (
        "WBC count",
        "Suspect infection; consider a urine culture and appropriate antibiotics under medical supervision.",
    ),
    (
        "casts",
        "Follow up for possible renal pathology; ensure hydration and consult nephrology if casts persist.",
    ),
    (
        "crystals",
        "Increase fluid intake; dietary modifications depending on crystal type (e.g., reduce oxalate for calcium oxalate stones).",
    ),
    (
        "Epithelial cells",
        "May indicate contamination—ensure clean-catch technique or repeat sample.",
    ),
    // Microbiology
    (
        "High bacterial load",
        "Start targeted antibiotics based on culture sensitivities; hydrate and monitor symptoms.",
    ),
    (
        "Low proportion of beneficial bacteria",
        "Consider a probiotic with Lactobacillus spp. and dietary fiber to support healthy flora.",
    ),
    (
        "Detected common pathogens",
        "Treat identified pathogen(s) with appropriate antibiotics as per local guidelines.",
    ),
    (
        "Resistance genes detected",
        "Notify your physician to choose antibiotics not compromised by detected resistance.",
    ),
    // Volume
    (
        "is low (oliguria)",
        "Assess hydration status—gently increase fluid intake; if oliguria persists, evaluate renal function.",
    ),
    (
        "is high (polyuria)",
        "Monitor fluid balance; evaluate for diabetes mellitus or endocrine causes if excessive.",
    ),
    // Rapid and pregnancy
    (
        "Rapid Urine Test: Abnormal",
        "Follow up abnormal dipstick findings with microscopy and culture; consult your clinician.",
    ),
    (
        "Pregnancy Test: Positive",
        "Confirm with quantitative hCG and schedule obstetric evaluation early in pregnancy.",
    ),
];

pub const RECOMMENDATIONS_HEADER: &str = "\n\n[Recommendations]\n";
pub const ALL_NORMAL_BLOCK: &str = "\n\n[Recommendations] All parameters are within normal limits. Continue your current healthy regimen.";

/// Advice whose trigger appears in `analysis`, in table order.
pub fn matching_advice(analysis: &str) -> Vec<&'static str> {
    let haystack = analysis.to_lowercase();
    RECOMMENDATIONS
        .iter()
        .filter(|(trigger, _)| haystack.contains(&trigger.to_lowercase()))
        .map(|(_, advice)| *advice)
        .collect()
}

/// The `[Recommendations]` block appended to a urine analysis.
pub fn recommendation_block(analysis: &str) -> String {
    let advice = matching_advice(analysis);
    if advice.is_empty() {
        return ALL_NORMAL_BLOCK.to_string();
    }
    let lines: Vec<String> = advice.iter().map(|a| format!("- {a}")).collect();
    format!("{RECOMMENDATIONS_HEADER}{}", lines.join("\n"))
}

/// Parse, evaluate and append recommendations for one urine report.
pub fn analyze_urine_report(text: &str, test_type: UrineTestType) -> String {
    let mut report = parse_report_text(text);
    report.test_type = test_type;
    render_report(&report)
}

/// Panel analysis of an already parsed report, followed by its recommendation block.
pub fn render_report(report: &UrineReport) -> String {
    let analysis = analyze(report);
    let block = recommendation_block(&analysis);
    tracing::info!(
        test_type = %report.test_type,
        recommendations = matching_advice(&analysis).len(),
        "Urine analysis complete"
    );
    analysis + &block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_triggers_gives_all_normal_block() {
        assert_eq!(
            recommendation_block("Chemical Analysis (Dipstick): All parameters are normal."),
            "\n\n[Recommendations] All parameters are within normal limits. Continue your current healthy regimen."
        );
    }

    #[test]
    fn advice_follows_table_order_not_text_order() {
        let analysis = "Pregnancy Test: Positive.\nMicroscopic Analysis: WBC count (9/HPF) is high (normal <5/HPF).";
        let advice = matching_advice(analysis);
        assert_eq!(advice.len(), 2);
        assert!(advice[0].starts_with("Suspect infection"));
        assert!(advice[1].starts_with("Confirm with quantitative hCG"));

        let block = recommendation_block(analysis);
        assert!(block.starts_with("\n\n[Recommendations]\n- Suspect infection"));
        assert_eq!(block.lines().filter(|l| l.starts_with("- ")).count(), 2);
    }

    #[test]
    fn triggers_match_case_insensitively() {
        let advice = matching_advice("Casts reported as 'granular' may be abnormal.");
        assert_eq!(advice.len(), 1);
        assert!(advice[0].starts_with("Follow up for possible renal pathology"));
    }

    #[test]
    fn ph_finding_triggers_its_advice() {
        let text = analyze_urine_report("pH: 9.0\n", UrineTestType::Complete);
        assert_eq!(
            text,
            "Chemical Analysis (Dipstick): pH is out of the normal range (4.6-8.0): 9.\
             \n\n[Recommendations]\n- Adjust dietary acid load: reduce high-acid foods \
             (e.g., processed meat, soda) and increase fruits/vegetables to help normalize urine pH."
        );
    }

    #[test]
    fn normal_complete_report() {
        let text = analyze_urine_report(
            "pH: 7.0\nColor: Yellow\nClarity: Clear\nGlucose: Negative",
            UrineTestType::Complete,
        );
        assert_eq!(
            text,
            "Chemical Analysis (Dipstick): All parameters are normal.\
             \n\n[Recommendations] All parameters are within normal limits. Continue your current healthy regimen."
        );
    }

    #[test]
    fn full_report_end_to_end() {
        let text = "\
Bacterial Load: 2e5
Lactobacillus gasseri: 85
pH: 6.0
24-hour urine volume: 450 mL
Nitrites: Positive
";
        let out = analyze_urine_report(text, UrineTestType::Full);
        let (analysis, recs) = out.split_once("\n\n[Recommendations]\n").unwrap();
        assert_eq!(
            analysis,
            "Microbiology (Culture) Analysis: High bacterial load indicates potential infection.\n\
             Chemical Analysis (Dipstick): Nitrites is abnormal: positive.\n\
             24-Hour Volume: 24-Hour Urine Volume (450 mL) is low (oliguria).\n\
             Rapid Urine Test: Abnormal - Nitrites abnormal: positive"
        );
        let advice: Vec<&str> = recs.lines().collect();
        assert_eq!(advice.len(), 3);
        assert!(advice[0].starts_with("- Start targeted antibiotics"));
        assert!(advice[1].starts_with("- Assess hydration status"));
        assert!(advice[2].starts_with("- Follow up abnormal dipstick findings"));
    }

    #[test]
    fn test_type_selects_panels() {
        let text = "pH: 6.0\nPregnancy Test: Positive";
        let out = analyze_urine_report(text, UrineTestType::Pregnancy);
        assert!(out.starts_with("Pregnancy Test: Positive.\n\n[Recommendations]\n- Confirm"));
    }
}
