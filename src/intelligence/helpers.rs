/// Render a measured number for report text: two decimals at most, trailing zeros
/// dropped (`13.5`, `27`, `0.02`).
pub fn format_number(value: f64) -> String {
    let fixed = format!("{value:.2}");
    if !fixed.contains('.') {
        return fixed;
    }
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Title-case a test key: a letter is uppercased when it does not follow another
/// letter (`hemoglobin` → `Hemoglobin`, `hba1c` → `Hba1C`).
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for c in key.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
