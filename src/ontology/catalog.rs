//! Static catalogs of the fixed astrological entity sets.
//!
//! Detriments and falls are *not* authored here as edges: the builder derives
//! them from domicile and exaltation (see [`super::derive`]). The traditional
//! tables at the bottom exist only so the derivation can be checked against
//! them at startup.

use super::{Element, Modality};

/// A planet, lunar node or lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanetDef {
    pub id: &'static str,
    pub name: &'static str,
    /// luminary, personal, social, outer, nodal, lot.
    pub category: &'static str,
    /// diurnal, nocturnal, variable, none.
    pub sect: &'static str,
    pub symbol: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignDef {
    pub id: &'static str,
    pub name: &'static str,
    pub element: Element,
    pub modality: Modality,
    pub polarity: &'static str,
    /// 1 = Aries .. 12 = Pisces.
    pub ordinal: u8,
    pub symbol: &'static str,
    /// Planet owning the sign by domicile.
    pub domicile: &'static str,
    /// Planet exalted in the sign, if any.
    pub exaltation: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HouseDef {
    pub number: u8,
    pub classical_name: &'static str,
    pub modern_name: &'static str,
    /// angular, succedent, cadent.
    pub angularity: &'static str,
    pub topics: &'static str,
    /// Planet that has its joy in the house, if any.
    pub joy: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectDef {
    pub id: &'static str,
    pub name: &'static str,
    pub degrees: u16,
    pub quality: &'static str,
    pub symbol: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechniqueDef {
    pub id: &'static str,
    pub name: &'static str,
    pub tradition: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDef {
    pub id: &'static str,
    pub name: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

/// Day, night and participating triplicity rulers of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriplicityDef {
    pub element: Element,
    pub day: &'static str,
    pub night: &'static str,
    pub participating: &'static str,
}

/// Light, benefic and malefic of one sect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectTeamDef {
    pub id: &'static str,
    pub name: &'static str,
    pub light: &'static str,
    pub benefic: &'static str,
    pub malefic: &'static str,
}

pub static PLANETS: [PlanetDef; 14] = [
    PlanetDef { id: "sun", name: "Sun", category: "luminary", sect: "diurnal", symbol: "☉" },
    PlanetDef { id: "moon", name: "Moon", category: "luminary", sect: "nocturnal", symbol: "☽" },
    PlanetDef { id: "mercury", name: "Mercury", category: "personal", sect: "variable", symbol: "☿" },
    PlanetDef { id: "venus", name: "Venus", category: "personal", sect: "nocturnal", symbol: "♀" },
    PlanetDef { id: "mars", name: "Mars", category: "personal", sect: "nocturnal", symbol: "♂" },
    PlanetDef { id: "jupiter", name: "Jupiter", category: "social", sect: "diurnal", symbol: "♃" },
    PlanetDef { id: "saturn", name: "Saturn", category: "social", sect: "diurnal", symbol: "♄" },
    PlanetDef { id: "uranus", name: "Uranus", category: "outer", sect: "none", symbol: "♅" },
    PlanetDef { id: "neptune", name: "Neptune", category: "outer", sect: "none", symbol: "♆" },
    PlanetDef { id: "pluto", name: "Pluto", category: "outer", sect: "none", symbol: "♇" },
    PlanetDef { id: "north_node", name: "North Node", category: "nodal", sect: "none", symbol: "☊" },
    PlanetDef { id: "south_node", name: "South Node", category: "nodal", sect: "none", symbol: "☋" },
    PlanetDef { id: "lot_fortune", name: "Lot of Fortune", category: "lot", sect: "none", symbol: "⊕" },
    PlanetDef { id: "lot_spirit", name: "Lot of Spirit", category: "lot", sect: "none", symbol: "⊗" },
];

pub static SIGNS: [SignDef; 12] = [
    SignDef { id: "aries", name: "Aries", element: Element::Fire, modality: Modality::Cardinal, polarity: "masculine", ordinal: 1, symbol: "♈", domicile: "mars", exaltation: Some("sun") },
    SignDef { id: "taurus", name: "Taurus", element: Element::Earth, modality: Modality::Fixed, polarity: "feminine", ordinal: 2, symbol: "♉", domicile: "venus", exaltation: Some("moon") },
    SignDef { id: "gemini", name: "Gemini", element: Element::Air, modality: Modality::Mutable, polarity: "masculine", ordinal: 3, symbol: "♊", domicile: "mercury", exaltation: None },
    SignDef { id: "cancer", name: "Cancer", element: Element::Water, modality: Modality::Cardinal, polarity: "feminine", ordinal: 4, symbol: "♋", domicile: "moon", exaltation: Some("jupiter") },
    SignDef { id: "leo", name: "Leo", element: Element::Fire, modality: Modality::Fixed, polarity: "masculine", ordinal: 5, symbol: "♌", domicile: "sun", exaltation: None },
    SignDef { id: "virgo", name: "Virgo", element: Element::Earth, modality: Modality::Mutable, polarity: "feminine", ordinal: 6, symbol: "♍", domicile: "mercury", exaltation: Some("mercury") },
    SignDef { id: "libra", name: "Libra", element: Element::Air, modality: Modality::Cardinal, polarity: "masculine", ordinal: 7, symbol: "♎", domicile: "venus", exaltation: Some("saturn") },
    SignDef { id: "scorpio", name: "Scorpio", element: Element::Water, modality: Modality::Fixed, polarity: "feminine", ordinal: 8, symbol: "♏", domicile: "mars", exaltation: None },
    SignDef { id: "sagittarius", name: "Sagittarius", element: Element::Fire, modality: Modality::Mutable, polarity: "masculine", ordinal: 9, symbol: "♐", domicile: "jupiter", exaltation: None },
    SignDef { id: "capricorn", name: "Capricorn", element: Element::Earth, modality: Modality::Cardinal, polarity: "feminine", ordinal: 10, symbol: "♑", domicile: "saturn", exaltation: Some("mars") },
    SignDef { id: "aquarius", name: "Aquarius", element: Element::Air, modality: Modality::Fixed, polarity: "masculine", ordinal: 11, symbol: "♒", domicile: "saturn", exaltation: None },
    SignDef { id: "pisces", name: "Pisces", element: Element::Water, modality: Modality::Mutable, polarity: "feminine", ordinal: 12, symbol: "♓", domicile: "jupiter", exaltation: Some("venus") },
];

pub static HOUSES: [HouseDef; 12] = [
    HouseDef { number: 1, classical_name: "Hour-Marker", modern_name: "Self", angularity: "angular", topics: "life, body, appearance, character", joy: Some("mercury") },
    HouseDef { number: 2, classical_name: "Gate of Hades", modern_name: "Resources", angularity: "succedent", topics: "money, possessions, values", joy: None },
    HouseDef { number: 3, classical_name: "Goddess", modern_name: "Communication", angularity: "cadent", topics: "siblings, neighbors, short travel, communication", joy: Some("moon") },
    HouseDef { number: 4, classical_name: "Hypogeion", modern_name: "Home", angularity: "angular", topics: "parents, home, ancestry, foundations", joy: None },
    HouseDef { number: 5, classical_name: "Good Fortune", modern_name: "Creativity", angularity: "succedent", topics: "children, pleasure, creative expression", joy: Some("venus") },
    HouseDef { number: 6, classical_name: "Bad Fortune", modern_name: "Service", angularity: "cadent", topics: "illness, enemies, servants, labor", joy: Some("mars") },
    HouseDef { number: 7, classical_name: "Setting", modern_name: "Partnership", angularity: "angular", topics: "marriage, partnerships, open enemies", joy: None },
    HouseDef { number: 8, classical_name: "Idle Place", modern_name: "Transformation", angularity: "succedent", topics: "death, inheritance, transformation", joy: None },
    HouseDef { number: 9, classical_name: "God", modern_name: "Philosophy", angularity: "cadent", topics: "foreign travel, philosophy, religion, divination", joy: Some("sun") },
    HouseDef { number: 10, classical_name: "Midheaven", modern_name: "Career", angularity: "angular", topics: "career, reputation, public life, authority", joy: None },
    HouseDef { number: 11, classical_name: "Good Spirit", modern_name: "Community", angularity: "succedent", topics: "friends, hopes, benefactors, alliances", joy: Some("jupiter") },
    HouseDef { number: 12, classical_name: "Bad Spirit", modern_name: "Hidden Life", angularity: "cadent", topics: "imprisonment, self-undoing, hidden enemies", joy: Some("saturn") },
];

pub static ASPECTS: [AspectDef; 5] = [
    AspectDef { id: "conjunction", name: "Conjunction", degrees: 0, quality: "neutral", symbol: "☌" },
    AspectDef { id: "sextile", name: "Sextile", degrees: 60, quality: "harmonious", symbol: "⚹" },
    AspectDef { id: "square", name: "Square", degrees: 90, quality: "challenging", symbol: "□" },
    AspectDef { id: "trine", name: "Trine", degrees: 120, quality: "harmonious", symbol: "△" },
    AspectDef { id: "opposition", name: "Opposition", degrees: 180, quality: "challenging", symbol: "☍" },
];

pub static TECHNIQUES: [TechniqueDef; 9] = [
    TechniqueDef { id: "essential_dignities", name: "Essential Dignities", tradition: "hellenistic", description: "Five levels of planetary strength by sign position" },
    TechniqueDef { id: "sect", name: "Sect", tradition: "hellenistic", description: "Day/night chart distinction affecting planetary expression" },
    TechniqueDef { id: "profections", name: "Annual Profections", tradition: "hellenistic", description: "Year-by-year house activation, lord of the year" },
    TechniqueDef { id: "zodiacal_releasing", name: "Zodiacal Releasing", tradition: "hellenistic", description: "Time lord technique from Vettius Valens using Lot of Spirit/Fortune" },
    TechniqueDef { id: "lots", name: "Lots / Arabic Parts", tradition: "hellenistic", description: "Calculated points from planet pairs + ascendant" },
    TechniqueDef { id: "transits", name: "Transits", tradition: "universal", description: "Current planetary positions aspecting natal chart" },
    TechniqueDef { id: "houses", name: "House Rulership", tradition: "hellenistic", description: "Tracing house lords to their sign/house placement" },
    TechniqueDef { id: "depositors", name: "Depositor Chains", tradition: "hellenistic", description: "Following rulership chains to find final dispositor" },
    TechniqueDef { id: "synastry", name: "Synastry", tradition: "universal", description: "Chart comparison for relationships" },
];

pub static LAYERS: [LayerDef; 5] = [
    LayerDef { id: "technical", name: "Technical", color: "cyan", description: "Hellenistic technique: dignities, sect, houses, aspects, lots, time-lords" },
    LayerDef { id: "psychological", name: "Psychological", color: "magenta", description: "Depth psychology: drives, complexes, attachment, shadow, individuation" },
    LayerDef { id: "archetypal", name: "Archetypal", color: "yellow", description: "Jungian archetypes, mythology, collective unconscious, synchronicity" },
    LayerDef { id: "philosophical", name: "Philosophical", color: "blue", description: "Stoic fate, free will, determinism, ethics of astrology" },
    LayerDef { id: "reference", name: "Reference", color: "green", description: "Practical delineations by planet × sign × house × aspect" },
];

/// Dorothean triplicity rulers. Mars rules water by night.
pub static TRIPLICITIES: [TriplicityDef; 4] = [
    TriplicityDef { element: Element::Fire, day: "sun", night: "jupiter", participating: "saturn" },
    TriplicityDef { element: Element::Earth, day: "venus", night: "moon", participating: "mars" },
    TriplicityDef { element: Element::Air, day: "saturn", night: "mercury", participating: "jupiter" },
    TriplicityDef { element: Element::Water, day: "venus", night: "mars", participating: "moon" },
];

pub static SECT_TEAMS: [SectTeamDef; 2] = [
    SectTeamDef { id: "diurnal", name: "Diurnal", light: "sun", benefic: "jupiter", malefic: "saturn" },
    SectTeamDef { id: "nocturnal", name: "Nocturnal", light: "moon", benefic: "venus", malefic: "mars" },
];

/// Traditional detriments as usually printed, planet -> sign.
pub static TRADITIONAL_DETRIMENTS: [(&str, &str); 12] = [
    ("sun", "aquarius"),
    ("moon", "capricorn"),
    ("mercury", "sagittarius"),
    ("mercury", "pisces"),
    ("venus", "aries"),
    ("venus", "scorpio"),
    ("mars", "taurus"),
    ("mars", "libra"),
    ("jupiter", "gemini"),
    ("jupiter", "virgo"),
    ("saturn", "cancer"),
    ("saturn", "leo"),
];

/// Traditional falls as usually printed, planet -> sign.
pub static TRADITIONAL_FALLS: [(&str, &str); 7] = [
    ("sun", "libra"),
    ("moon", "scorpio"),
    ("mercury", "pisces"),
    ("venus", "virgo"),
    ("mars", "cancer"),
    ("jupiter", "capricorn"),
    ("saturn", "aries"),
];

pub fn planet(id: &str) -> Option<&'static PlanetDef> {
    PLANETS.iter().find(|p| p.id == id)
}

pub fn sign(id: &str) -> Option<&'static SignDef> {
    SIGNS.iter().find(|s| s.id == id)
}

pub fn sign_by_ordinal(ordinal: u8) -> Option<&'static SignDef> {
    SIGNS.iter().find(|s| s.ordinal == ordinal)
}

pub fn house(number: u8) -> Option<&'static HouseDef> {
    HOUSES.iter().find(|h| h.number == number)
}

pub fn layer(id: &str) -> Option<&'static LayerDef> {
    LAYERS.iter().find(|l| l.id == id)
}

pub fn technique(id: &str) -> Option<&'static TechniqueDef> {
    TECHNIQUES.iter().find(|t| t.id == id)
}

pub fn triplicity(element: Element) -> Option<&'static TriplicityDef> {
    TRIPLICITIES.iter().find(|t| t.element == element)
}
