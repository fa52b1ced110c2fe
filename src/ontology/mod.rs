//! Ontology: the fixed entity sets of traditional astrology.
//!
//! - [`catalog`]: planets, signs, houses, aspects, techniques, layers, sect teams
//! - [`derive`]: detriment, fall, triplicity and opposition tables computed
//!   from the catalogs
//!
//! [`verify`] is the startup consistency check. The structural builder refuses
//! to run when it fails.

pub mod catalog;
pub mod derive;

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{OntologyError, OntologyResult};

use catalog::{
    ASPECTS, HOUSES, LAYERS, PLANETS, SECT_TEAMS, SIGNS, TECHNIQUES, TRADITIONAL_DETRIMENTS,
    TRADITIONAL_FALLS, TRIPLICITIES,
};

/// Author assigned to passages whose source names none.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Layer assigned to passages whose source names none.
pub const DEFAULT_LAYER: &str = "reference";

/// Source title assigned to passages whose source names none.
pub const UNKNOWN_TITLE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

impl Element {
    pub const ALL: [Element; 4] = [Element::Fire, Element::Earth, Element::Air, Element::Water];

    pub fn as_str(self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Earth => "earth",
            Element::Air => "air",
            Element::Water => "water",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Fire => "Fire",
            Element::Earth => "Earth",
            Element::Air => "Air",
            Element::Water => "Water",
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modality {
    Cardinal,
    Fixed,
    Mutable,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Cardinal, Modality::Fixed, Modality::Mutable];

    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Cardinal => "cardinal",
            Modality::Fixed => "fixed",
            Modality::Mutable => "mutable",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modality::Cardinal => "Cardinal",
            Modality::Fixed => "Fixed",
            Modality::Mutable => "Mutable",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualifier on `TRIPLICITY_RULER` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectRole {
    Day,
    Night,
    Participating,
}

impl SectRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SectRole::Day => "day",
            SectRole::Night => "night",
            SectRole::Participating => "participating",
        }
    }
}

/// Qualifier on `SECT_TEAM` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamRole {
    Light,
    Benefic,
    Malefic,
}

impl TeamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamRole::Light => "light",
            TeamRole::Benefic => "benefic",
            TeamRole::Malefic => "malefic",
        }
    }
}

/// Reliability of a passage's source: 1 (primary) to 4 (peripheral).
///
/// Ordering follows the number, so sorting ascending surfaces primary sources first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrustTier(u8);

impl TrustTier {
    pub const PRIMARY: TrustTier = TrustTier(1);
    pub const BRIDGE: TrustTier = TrustTier(2);
    pub const REFERENCE: TrustTier = TrustTier(3);
    pub const PERIPHERAL: TrustTier = TrustTier(4);

    /// Returns `None` outside 1..=4.
    pub fn new(tier: i64) -> Option<Self> {
        match tier {
            1..=4 => Some(TrustTier(tier as u8)),
            _ => None,
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "PRIMARY",
            2 => "BRIDGE",
            3 => "REFERENCE",
            _ => "PERIPHERAL",
        }
    }
}

impl Default for TrustTier {
    fn default() -> Self {
        TrustTier::PERIPHERAL
    }
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

/// Normalize an identifier: trimmed, lower-cased, inner whitespace and dashes
/// collapsed to `_`.
pub fn normalize_id(raw: &str) -> String {
    raw.trim()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Resolve a planet given by id or display name ("North Node", "Lot of Fortune").
pub fn resolve_planet(raw: &str) -> Option<&'static str> {
    let normalized = normalize_id(raw);
    PLANETS
        .iter()
        .find(|p| p.id == normalized || normalize_id(p.name) == normalized)
        .map(|p| p.id)
}

/// Normalize a planet name for graph lookup: known names map to their id,
/// unknown names are only normalized.
pub fn planet_key(raw: &str) -> String {
    resolve_planet(raw)
        .map(str::to_owned)
        .unwrap_or_else(|| normalize_id(raw))
}

/// Counts of the verified catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OntologyReport {
    pub planets: usize,
    pub signs: usize,
    pub houses: usize,
    pub aspects: usize,
    pub techniques: usize,
    pub layers: usize,
    pub detriments: usize,
    pub falls: usize,
}

/// Startup consistency check over the static tables.
pub fn verify() -> OntologyResult<OntologyReport> {
    check_cardinality("planets", 14, PLANETS.len())?;
    check_cardinality("signs", 12, SIGNS.len())?;
    check_cardinality("houses", 12, HOUSES.len())?;
    check_cardinality("aspects", 5, ASPECTS.len())?;
    check_cardinality("triplicities", Element::ALL.len(), TRIPLICITIES.len())?;

    check_unique("planets", PLANETS.iter().map(|p| p.id.to_string()))?;
    check_unique("signs", SIGNS.iter().map(|s| s.id.to_string()))?;
    check_unique("sign ordinals", SIGNS.iter().map(|s| s.ordinal.to_string()))?;
    check_unique("houses", HOUSES.iter().map(|h| h.number.to_string()))?;
    check_unique("aspects", ASPECTS.iter().map(|a| a.id.to_string()))?;
    check_unique("techniques", TECHNIQUES.iter().map(|t| t.id.to_string()))?;
    check_unique("layers", LAYERS.iter().map(|l| l.id.to_string()))?;
    check_unique(
        "triplicities",
        TRIPLICITIES.iter().map(|t| t.element.to_string()),
    )?;

    let ordinals: BTreeSet<u8> = SIGNS.iter().map(|s| s.ordinal).collect();
    if ordinals != (1..=12).collect::<BTreeSet<u8>>() {
        return Err(OntologyError::Cardinality {
            catalog: "sign ordinals 1..=12",
            expected: 12,
            actual: ordinals.iter().filter(|o| (1..=12).contains(*o)).count(),
        });
    }
    let numbers: BTreeSet<u8> = HOUSES.iter().map(|h| h.number).collect();
    if numbers != (1..=12).collect::<BTreeSet<u8>>() {
        return Err(OntologyError::Cardinality {
            catalog: "house numbers 1..=12",
            expected: 12,
            actual: numbers.iter().filter(|n| (1..=12).contains(*n)).count(),
        });
    }

    for sign in &SIGNS {
        check_planet("signs", sign.id, sign.domicile)?;
        if let Some(exalted) = sign.exaltation {
            check_planet("signs", sign.id, exalted)?;
        }
    }
    for house in &HOUSES {
        if let Some(joy) = house.joy {
            check_planet("houses", &house.number.to_string(), joy)?;
        }
    }
    for triplicity in &TRIPLICITIES {
        for planet in [triplicity.day, triplicity.night, triplicity.participating] {
            check_planet("triplicities", triplicity.element.as_str(), planet)?;
        }
    }
    for team in &SECT_TEAMS {
        for planet in [team.light, team.benefic, team.malefic] {
            check_planet("sect teams", team.id, planet)?;
        }
    }
    if !LAYERS.iter().any(|l| l.id == DEFAULT_LAYER) {
        return Err(OntologyError::UnknownReference {
            catalog: "defaults",
            entry: "default layer".into(),
            kind: "layer",
            reference: DEFAULT_LAYER.into(),
        });
    }

    let detriments = derive::detriments();
    let falls = derive::falls();
    check_against("detriment", &detriments, &TRADITIONAL_DETRIMENTS)?;
    check_against("fall", &falls, &TRADITIONAL_FALLS)?;

    Ok(OntologyReport {
        planets: PLANETS.len(),
        signs: SIGNS.len(),
        houses: HOUSES.len(),
        aspects: ASPECTS.len(),
        techniques: TECHNIQUES.len(),
        layers: LAYERS.len(),
        detriments: detriments.len(),
        falls: falls.len(),
    })
}

fn check_cardinality(catalog: &'static str, expected: usize, actual: usize) -> OntologyResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(OntologyError::Cardinality {
            catalog,
            expected,
            actual,
        })
    }
}

fn check_unique(
    catalog: &'static str,
    keys: impl IntoIterator<Item = String>,
) -> OntologyResult<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            return Err(OntologyError::DuplicateKey { catalog, key });
        }
    }
    Ok(())
}

fn check_planet(catalog: &'static str, entry: &str, planet: &str) -> OntologyResult<()> {
    if catalog::planet(planet).is_some() {
        Ok(())
    } else {
        Err(OntologyError::UnknownReference {
            catalog,
            entry: entry.to_string(),
            kind: "planet",
            reference: planet.to_string(),
        })
    }
}

/// The derived table and the hand-listed one must be the same set.
fn check_against(
    relation: &'static str,
    derived: &[derive::Dignity],
    listed: &[(&str, &str)],
) -> OntologyResult<()> {
    for d in derived {
        if !listed.contains(&(d.planet, d.sign)) {
            let listed_for_planet: Vec<&str> = listed
                .iter()
                .filter(|(p, _)| *p == d.planet)
                .map(|(_, s)| *s)
                .collect();
            return Err(OntologyError::DerivedMismatch {
                relation,
                planet: d.planet.to_string(),
                derived: d.sign.to_string(),
                listed: if listed_for_planet.is_empty() {
                    "nothing".to_string()
                } else {
                    listed_for_planet.join(", ")
                },
            });
        }
    }
    for (planet, sign) in listed {
        if !derived.iter().any(|d| d.planet == *planet && d.sign == *sign) {
            return Err(OntologyError::MissingDerived {
                relation,
                planet: planet.to_string(),
                sign: sign.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_ontology_is_consistent() {
        let report = verify().unwrap();
        assert_eq!(report.planets, 14);
        assert_eq!(report.signs, 12);
        assert_eq!(report.houses, 12);
        assert_eq!(report.aspects, 5);
        assert_eq!(report.detriments, 12);
        assert_eq!(report.falls, 7);
    }

    #[test]
    fn drifted_table_is_reported() {
        let derived = derive::falls();
        let mut drifted: Vec<(&str, &str)> = TRADITIONAL_FALLS.to_vec();
        drifted[0] = ("sun", "aquarius");
        let err = check_against("fall", &derived, &drifted).unwrap_err();
        assert!(matches!(
            err,
            OntologyError::DerivedMismatch { ref planet, .. } if planet == "sun"
        ));
    }

    #[test]
    fn extra_listed_entry_is_reported() {
        let derived = derive::detriments();
        let mut listed: Vec<(&str, &str)> = TRADITIONAL_DETRIMENTS.to_vec();
        listed.push(("pluto", "taurus"));
        let err = check_against("detriment", &derived, &listed).unwrap_err();
        assert!(matches!(err, OntologyError::MissingDerived { .. }));
    }

    #[test]
    fn trust_tier_bounds() {
        assert_eq!(TrustTier::new(1), Some(TrustTier::PRIMARY));
        assert_eq!(TrustTier::new(4), Some(TrustTier::PERIPHERAL));
        assert_eq!(TrustTier::new(0), None);
        assert_eq!(TrustTier::new(5), None);
        assert_eq!(TrustTier::default(), TrustTier::PERIPHERAL);
        assert!(TrustTier::PRIMARY < TrustTier::REFERENCE);
    }

    #[test]
    fn display_names_resolve_to_ids() {
        assert_eq!(resolve_planet("North Node"), Some("north_node"));
        assert_eq!(resolve_planet("  MARS "), Some("mars"));
        assert_eq!(resolve_planet("Lot of Fortune"), Some("lot_fortune"));
        assert_eq!(resolve_planet("lot_spirit"), Some("lot_spirit"));
        assert_eq!(resolve_planet("chiron"), None);
        assert_eq!(planet_key("Chiron"), "chiron");
    }
}
