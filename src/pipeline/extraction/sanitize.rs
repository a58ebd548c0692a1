/// Sanitize collaborator text before it reaches the parsers.
/// Strips control characters (NUL bytes, form feeds from PDF page breaks, ...)
/// while keeping line structure and every printable character, including
/// micro signs and superscripts that appear in units.
pub fn sanitize_report_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

/// Split text into cleaned lines: trimmed, internal whitespace collapsed to a
/// single space, lowercased. Empty lines are dropped; order is preserved.
pub fn clean_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_null_bytes() {
        let raw = "Hemoglobin\x00 13.5";
        let clean = sanitize_report_text(raw);
        assert!(!clean.contains('\x00'));
        assert_eq!(clean, "Hemoglobin 13.5");
    }

    #[test]
    fn keeps_line_breaks_and_tabs() {
        let raw = "Hemoglobin\t13.5\r\nMCH\t29\rMCHC\t34";
        let clean = sanitize_report_text(raw);
        assert_eq!(clean, "Hemoglobin\t13.5\nMCH\t29\nMCHC\t34");
    }

    #[test]
    fn keeps_unit_symbols() {
        let raw = "Iron 80 µmol/L\x0cPlatelets 250 10³/µL";
        let clean = sanitize_report_text(raw);
        assert!(clean.contains("µmol/L"));
        assert!(clean.contains("10³/µL"));
        assert!(!clean.contains('\x0c'));
    }

    #[test]
    fn clean_lines_collapses_and_lowercases() {
        let lines = clean_lines("  Hemoglobin    13.5   g/dL  \n\n   \nMCH\t\t29 pg");
        assert_eq!(lines, vec!["hemoglobin 13.5 g/dl", "mch 29 pg"]);
    }

    #[test]
    fn clean_lines_empty_input() {
        assert!(clean_lines("").is_empty());
        assert!(clean_lines("\n \n\t\n").is_empty());
    }
}
