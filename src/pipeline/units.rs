//! Unit normalization and conversion for lab values.
//!
//! Raw unit strings from OCR text are folded to UCUM-style canonical codes
//! (`mg/dl` → `mg/dL`, `µmol/l` → `umol/L`, `cells/hpf` → `{cells}/[HPF]`).
//! Conversion goes through a registry of atomic units, each carrying a dimension
//! vector and a factor to its base unit; compound codes combine atoms with `/` and `.`.
//!
//! Gram is the base mass unit. International units form their own dimension and
//! never convert to mass. Curly-brace annotations (`{cells}`, `{CFU}`) are
//! dimensionless.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Div, Mul};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Unknown unit: '{0}'")]
    UnknownUnit(String),

    #[error("Incompatible units: cannot convert {from} to {to}")]
    Incompatible { from: String, to: String },
}

// ───────────────────────────────────────────────
// Dimensions
// ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDimension {
    Mass,
    Length,
    Volume,
    Time,
    Amount,
    InternationalUnit,
    EnzymeUnit,
    HighPowerField,
}

const DIMENSION_COUNT: usize = 8;

/// Exponent vector over the base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension([i8; DIMENSION_COUNT]);

impl Dimension {
    pub fn dimensionless() -> Self {
        Self::default()
    }

    pub fn base(dim: BaseDimension) -> Self {
        let mut exps = [0; DIMENSION_COUNT];
        exps[dim as usize] = 1;
        Self(exps)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    pub fn exponent(&self, dim: BaseDimension) -> i8 {
        self.0[dim as usize]
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        let mut exps = self.0;
        for (e, r) in exps.iter_mut().zip(rhs.0) {
            *e += r;
        }
        Dimension(exps)
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        let mut exps = self.0;
        for (e, r) in exps.iter_mut().zip(rhs.0) {
            *e -= r;
        }
        Dimension(exps)
    }
}

// ───────────────────────────────────────────────
// Units
// ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub code: String,
    pub dimension: Dimension,
    /// Multiply a value in this unit by this factor to get base units.
    pub to_base_factor: f64,
}

impl Unit {
    pub fn new(code: &str, dimension: Dimension, to_base_factor: f64) -> Self {
        Self {
            code: code.to_string(),
            dimension,
            to_base_factor,
        }
    }

    pub fn dimensionless(code: &str, to_base_factor: f64) -> Self {
        Self::new(code, Dimension::dimensionless(), to_base_factor)
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Factor taking a value in `self` to a value in `other`, if compatible.
    pub fn conversion_factor_to(&self, other: &Unit) -> Option<f64> {
        self.is_compatible(other)
            .then(|| self.to_base_factor / other.to_base_factor)
    }

    fn multiply(&self, other: &Unit) -> Unit {
        Unit {
            code: format!("{}.{}", self.code, other.code),
            dimension: self.dimension * other.dimension,
            to_base_factor: self.to_base_factor * other.to_base_factor,
        }
    }

    fn divide(&self, other: &Unit) -> Unit {
        Unit {
            code: format!("{}/{}", self.code, other.code),
            dimension: self.dimension / other.dimension,
            to_base_factor: self.to_base_factor / other.to_base_factor,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

// ───────────────────────────────────────────────
// Registry
// ───────────────────────────────────────────────

/// `10^3`, `10*9`, `x10^6`: a pure power-of-ten scale.
static POWER_OF_TEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^x?10[\^*]([+-]?\d{1,2})$").expect("valid regex"));

/// Atomic units keyed by canonical code, with case-insensitive aliases.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: HashMap<String, Unit>,
    aliases: HashMap<String, String>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the mass, volume, amount, time, IU, enzyme and field units
    /// found on lab reports.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register_mass_units();
        registry.register_length_units();
        registry.register_volume_units();
        registry.register_amount_units();
        registry.register_time_units();
        registry.register_activity_units();
        registry.register_misc_units();
        registry
    }

    pub fn register(&mut self, unit: Unit) {
        self.aliases
            .insert(unit.code.to_lowercase(), unit.code.clone());
        self.units.insert(unit.code.clone(), unit);
    }

    fn register_alias(&mut self, alias: &str, code: &str) {
        self.aliases.insert(alias.to_lowercase(), code.to_string());
    }

    /// Atomic unit by exact code, then by case-insensitive alias.
    pub fn get(&self, code: &str) -> Option<&Unit> {
        self.units.get(code).or_else(|| {
            self.aliases
                .get(&code.to_lowercase())
                .and_then(|canonical| self.units.get(canonical))
        })
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Parse a compound unit code. `/` and `.` apply left to right; a leading `/`
    /// reads as `1/...`.
    pub fn parse(&self, expr: &str) -> Result<Unit, ConversionError> {
        let expr = expr.trim();
        let unknown = || ConversionError::UnknownUnit(expr.to_string());
        if expr.is_empty() {
            return Err(unknown());
        }

        let tokens = tokenize(expr);
        let mut result = Unit::dimensionless("1", 1.0);
        for (i, (op, token)) in tokens.iter().enumerate() {
            if token.is_empty() {
                if i == 0 && tokens.len() > 1 {
                    continue;
                }
                return Err(unknown());
            }
            let atom = self.parse_atom(token).ok_or_else(unknown)?;
            result = match op {
                Op::Mul => result.multiply(&atom),
                Op::Div => result.divide(&atom),
            };
        }

        result.code = expr.to_string();
        Ok(result)
    }

    fn parse_atom(&self, token: &str) -> Option<Unit> {
        if token.starts_with('{') && token.ends_with('}') {
            return Some(Unit::dimensionless(token, 1.0));
        }
        if let Some(caps) = POWER_OF_TEN_RE.captures(token) {
            let exp: i32 = caps[1].parse().ok()?;
            return Some(Unit::dimensionless(token, 10f64.powi(exp)));
        }
        self.get(token).cloned()
    }

    fn register_mass_units(&mut self) {
        let mass = Dimension::base(BaseDimension::Mass);
        for (code, factor) in [
            ("kg", 1e3),
            ("g", 1.0),
            ("mg", 1e-3),
            ("ug", 1e-6),
            ("ng", 1e-9),
            ("pg", 1e-12),
        ] {
            self.register(Unit::new(code, mass, factor));
        }
        for alias in ["µg", "μg", "mcg"] {
            self.register_alias(alias, "ug");
        }
    }

    fn register_length_units(&mut self) {
        let length = Dimension::base(BaseDimension::Length);
        for (code, factor) in [("m", 1.0), ("cm", 1e-2), ("mm", 1e-3)] {
            self.register(Unit::new(code, length, factor));
        }
    }

    fn register_volume_units(&mut self) {
        let volume = Dimension::base(BaseDimension::Volume);
        for (code, factor) in [
            ("L", 1.0),
            ("dL", 1e-1),
            ("mL", 1e-3),
            ("uL", 1e-6),
            ("fL", 1e-15),
        ] {
            self.register(Unit::new(code, volume, factor));
        }
        for alias in ["µL", "μL", "cumm", "mm3"] {
            self.register_alias(alias, "uL");
        }
    }

    fn register_amount_units(&mut self) {
        let amount = Dimension::base(BaseDimension::Amount);
        for (code, factor) in [
            ("mol", 1.0),
            ("mmol", 1e-3),
            ("umol", 1e-6),
            ("nmol", 1e-9),
            ("pmol", 1e-12),
        ] {
            self.register(Unit::new(code, amount, factor));
        }
        for alias in ["µmol", "μmol"] {
            self.register_alias(alias, "umol");
        }
        self.register(Unit::new("meq", amount, 1e-3));
    }

    fn register_time_units(&mut self) {
        let time = Dimension::base(BaseDimension::Time);
        for (code, factor) in [
            ("s", 1.0),
            ("min", 60.0),
            ("h", 3600.0),
            ("d", 86_400.0),
        ] {
            self.register(Unit::new(code, time, factor));
        }
        for (alias, code) in [("sec", "s"), ("hr", "h"), ("day", "d"), ("24h", "d")] {
            self.register_alias(alias, code);
        }
    }

    fn register_activity_units(&mut self) {
        let iu = Dimension::base(BaseDimension::InternationalUnit);
        for (code, factor) in [("[IU]", 1.0), ("m[IU]", 1e-3), ("u[IU]", 1e-6)] {
            self.register(Unit::new(code, iu, factor));
        }
        self.register_alias("iu", "[IU]");
        self.register_alias("miu", "m[IU]");
        self.register_alias("µiu", "u[IU]");
        self.register_alias("μiu", "u[IU]");
        self.register_alias("uiu", "u[IU]");

        let enzyme = Dimension::base(BaseDimension::EnzymeUnit);
        self.register(Unit::new("U", enzyme, 1.0));
        self.register(Unit::new("mU", enzyme, 1e-3));
    }

    fn register_misc_units(&mut self) {
        self.register(Unit::dimensionless("%", 1e-2));
        self.register(Unit::new(
            "[HPF]",
            Dimension::base(BaseDimension::HighPowerField),
            1.0,
        ));
        self.register_alias("hpf", "[HPF]");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Mul,
    Div,
}

/// Split on `/` and `.` outside curly-brace annotations.
fn tokenize(expr: &str) -> Vec<(Op, &str)> {
    let mut tokens = Vec::new();
    let mut op = Op::Mul;
    let mut start = 0;
    let mut depth = 0usize;

    for (i, c) in expr.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' | '.' if depth == 0 => {
                tokens.push((op, &expr[start..i]));
                op = if c == '/' { Op::Div } else { Op::Mul };
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    tokens.push((op, &expr[start..]));
    tokens
}

static REGISTRY: LazyLock<UnitRegistry> = LazyLock::new(UnitRegistry::standard);

/// The process-wide standard registry.
pub fn registry() -> &'static UnitRegistry {
    &REGISTRY
}

// ───────────────────────────────────────────────
// Normalization
// ───────────────────────────────────────────────

/// Lowercase raw spellings → canonical codes.
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("g/dl", "g/dL"),
    ("gm/dl", "g/dL"),
    ("gm%", "g/dL"),
    ("mg/dl", "mg/dL"),
    ("ug/dl", "ug/dL"),
    ("µg/dl", "ug/dL"),
    ("μg/dl", "ug/dL"),
    ("mcg/dl", "ug/dL"),
    ("ng/dl", "ng/dL"),
    ("g/l", "g/L"),
    ("mg/l", "mg/L"),
    ("ng/ml", "ng/mL"),
    ("pg/ml", "pg/mL"),
    ("mmol/l", "mmol/L"),
    ("µmol/l", "umol/L"),
    ("μmol/l", "umol/L"),
    ("umol/l", "umol/L"),
    ("nmol/l", "nmol/L"),
    ("pmol/l", "pmol/L"),
    ("meq/l", "meq/L"),
    ("iu/l", "[IU]/L"),
    ("iu/ml", "[IU]/mL"),
    ("miu/l", "m[IU]/L"),
    ("miu/ml", "m[IU]/mL"),
    ("µiu/ml", "u[IU]/mL"),
    ("μiu/ml", "u[IU]/mL"),
    ("uiu/ml", "u[IU]/mL"),
    ("u/l", "U/L"),
    ("pg", "pg"),
    ("fl", "fL"),
    ("ml", "mL"),
    ("mg/day", "mg/d"),
    ("mg/24h", "mg/d"),
    ("mg/24 h", "mg/d"),
    ("ml/day", "mL/d"),
    ("ml/24h", "mL/d"),
    ("mm/hr", "mm/h"),
    ("mm/1st hr", "mm/h"),
    ("sec", "s"),
    ("seconds", "s"),
    ("cells/hpf", "{cells}/[HPF]"),
    ("sp hpf", "{cells}/[HPF]"),
    ("/hpf", "{cells}/[HPF]"),
    ("cfu/ml", "{CFU}/mL"),
    ("k/ul", "10^3/uL"),
    ("k/µl", "10^3/uL"),
    ("k/μl", "10^3/uL"),
    ("thou/ul", "10^3/uL"),
    ("10^3/ul", "10^3/uL"),
    ("x10^3/ul", "10^3/uL"),
    ("million/ul", "10^6/uL"),
    ("mill/cumm", "10^6/uL"),
    ("m/ul", "10^6/uL"),
    ("10^6/ul", "10^6/uL"),
    ("x10^6/ul", "10^6/uL"),
    ("10^9/l", "10^9/L"),
    ("x10^9/l", "10^9/L"),
    ("10^12/l", "10^12/L"),
    ("x10^12/l", "10^12/L"),
    ("/cumm", "{cells}/uL"),
    ("cells/cumm", "{cells}/uL"),
    ("/ul", "{cells}/uL"),
    ("cells/ul", "{cells}/uL"),
    ("ml/min/1.73m2", "mL/min/{1.73m2}"),
    ("ml/min/1.73 m2", "mL/min/{1.73m2}"),
];

/// Canonical code for a raw unit string. Canonical codes pass through as-is;
/// unknown units come back trimmed and lowercased.
pub fn normalize(unit: &str) -> String {
    let collapsed = unit.split_whitespace().collect::<Vec<_>>().join(" ");
    if UNIT_ALIASES.iter().any(|(_, canonical)| *canonical == collapsed) {
        return collapsed;
    }

    let folded = collapsed.to_lowercase();
    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map_or(folded, |(_, canonical)| (*canonical).to_string())
}

/// Convert `value` from one unit to another. Both sides are normalized first.
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
    let from_code = normalize(from);
    let to_code = normalize(to);
    if from_code == to_code {
        return Ok(value);
    }

    let registry = registry();
    let from_unit = registry.parse(&from_code)?;
    let to_unit = registry.parse(&to_code)?;

    from_unit
        .conversion_factor_to(&to_unit)
        .map(|factor| value * factor)
        .ok_or(ConversionError::Incompatible {
            from: from_code,
            to: to_code,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn normalize_maps_known_spellings() {
        assert_eq!(normalize("mg/dl"), "mg/dL");
        assert_eq!(normalize("  MG/DL "), "mg/dL");
        assert_eq!(normalize("µmol/l"), "umol/L");
        assert_eq!(normalize("μmol/L"), "umol/L");
        assert_eq!(normalize("IU/L"), "[IU]/L");
        assert_eq!(normalize("cells/HPF"), "{cells}/[HPF]");
        assert_eq!(normalize("sp  hpf"), "{cells}/[HPF]");
        assert_eq!(normalize("CFU/mL"), "{CFU}/mL");
    }

    #[test]
    fn normalize_keeps_canonical_codes() {
        assert_eq!(normalize("m[IU]/L"), "m[IU]/L");
        assert_eq!(normalize("10^6/uL"), "10^6/uL");
        assert_eq!(normalize(" mL/d "), "mL/d");
    }

    #[test]
    fn normalize_passes_unknown_through() {
        assert_eq!(normalize("  Furlongs "), "furlongs");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn converts_mass_concentrations() {
        assert!(approx(convert(13.5, "g/dL", "g/L").unwrap(), 135.0));
        assert!(approx(convert(135.0, "g/l", "g/dl").unwrap(), 13.5));
        assert!(approx(convert(1350.0, "mg/dl", "g/dl").unwrap(), 1.35));
        assert!(approx(convert(5.0, "ug/dL", "ng/mL").unwrap(), 50.0));
    }

    #[test]
    fn same_unit_is_identity() {
        assert_eq!(convert(42.0, "pg", "pg").unwrap(), 42.0);
        assert_eq!(convert(7.0, "mg/dl", "mg/dL").unwrap(), 7.0);
    }

    #[test]
    fn molar_and_mass_are_incompatible() {
        let err = convert(5.5, "mmol/l", "mg/dL").unwrap_err();
        assert_eq!(
            err,
            ConversionError::Incompatible {
                from: "mmol/L".into(),
                to: "mg/dL".into()
            }
        );
    }

    #[test]
    fn international_units_scale_but_never_become_mass() {
        assert!(approx(convert(2.5, "miu/ml", "iu/l").unwrap(), 2.5));
        assert!(approx(convert(2.5, "µiu/ml", "miu/l").unwrap(), 2.5));
        assert!(convert(1.0, "iu/l", "mg/l").is_err());
    }

    #[test]
    fn cell_counts_convert_between_scales() {
        // 7500 /cumm == 7.5 x10^3/uL
        assert!(approx(convert(7500.0, "/cumm", "10^3/uL").unwrap(), 7.5));
        assert!(approx(convert(250.0, "k/ul", "10^9/L").unwrap(), 250.0));
        assert!(approx(convert(4.8, "million/ul", "10^12/L").unwrap(), 4.8));
    }

    #[test]
    fn time_denominators() {
        assert!(approx(convert(24.0, "mg/d", "mg/h").unwrap(), 1.0));
        assert!(approx(convert(1800.0, "ml/day", "mL/d").unwrap(), 1800.0));
    }

    #[test]
    fn percent_is_dimensionless() {
        let pct = registry().parse("%").unwrap();
        assert!(pct.dimension.is_dimensionless());
        assert!(approx(pct.to_base_factor, 0.01));
    }

    #[test]
    fn annotations_are_dimensionless() {
        let per_hpf = registry().parse("{cells}/[HPF]").unwrap();
        assert_eq!(per_hpf.dimension.exponent(BaseDimension::HighPowerField), -1);
        let egfr = registry().parse("mL/min/{1.73m2}").unwrap();
        assert_eq!(egfr.dimension.exponent(BaseDimension::Volume), 1);
        assert_eq!(egfr.dimension.exponent(BaseDimension::Time), -1);
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert_eq!(
            convert(1.0, "furlongs", "mg/dL").unwrap_err(),
            ConversionError::UnknownUnit("furlongs".into())
        );
        assert!(registry().parse("").is_err());
        assert!(registry().parse("mg//dL").is_err());
        assert!(registry().parse("mg/").is_err());
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let registry = registry();
        assert!(registry.contains("mL"));
        assert!(registry.contains("ML"));
        assert!(registry.contains("µg"));
        assert_eq!(registry.get("mcg").map(|u| u.code.as_str()), Some("ug"));
    }
}
