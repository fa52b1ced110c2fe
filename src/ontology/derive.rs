//! Relationship tables computed from the catalogs.
//!
//! Detriment and fall are the signs opposite (ordinal + 6, mod 12) a planet's
//! domicile and exaltation. Triplicity rulers are keyed by element and fanned
//! out to every sign of that element.

use super::catalog::{self, SECT_TEAMS, SIGNS, SignDef, TRIPLICITIES};
use super::{SectRole, TeamRole};

/// A planet -> sign dignity or debility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dignity {
    pub planet: &'static str,
    pub sign: &'static str,
}

/// One `TRIPLICITY_RULER` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriplicityAssignment {
    pub planet: &'static str,
    pub sign: &'static str,
    pub role: SectRole,
}

/// One `SECT_TEAM` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectMembership {
    pub planet: &'static str,
    pub team: &'static str,
    pub role: TeamRole,
}

/// The ordinal of the sign opposite `ordinal` (1..=12).
pub fn opposite_ordinal(ordinal: u8) -> u8 {
    (ordinal + 5) % 12 + 1
}

pub fn opposite_sign(sign: &SignDef) -> Option<&'static SignDef> {
    catalog::sign_by_ordinal(opposite_ordinal(sign.ordinal))
}

pub fn domiciles() -> Vec<Dignity> {
    SIGNS
        .iter()
        .map(|s| Dignity {
            planet: s.domicile,
            sign: s.id,
        })
        .collect()
}

pub fn exaltations() -> Vec<Dignity> {
    SIGNS
        .iter()
        .filter_map(|s| {
            s.exaltation.map(|planet| Dignity {
                planet,
                sign: s.id,
            })
        })
        .collect()
}

/// Detriments, derived from the domiciles.
pub fn detriments() -> Vec<Dignity> {
    opposite_of(&domiciles())
}

/// Falls, derived from the exaltations.
pub fn falls() -> Vec<Dignity> {
    opposite_of(&exaltations())
}

fn opposite_of(dignities: &[Dignity]) -> Vec<Dignity> {
    dignities
        .iter()
        .filter_map(|d| {
            let sign = catalog::sign(d.sign)?;
            let opposite = opposite_sign(sign)?;
            Some(Dignity {
                planet: d.planet,
                sign: opposite.id,
            })
        })
        .collect()
}

/// Three triplicity edges per sign, one per sect role.
pub fn triplicity_assignments() -> Vec<TriplicityAssignment> {
    let mut out = Vec::with_capacity(SIGNS.len() * 3);
    for triplicity in &TRIPLICITIES {
        for sign in SIGNS.iter().filter(|s| s.element == triplicity.element) {
            for (role, planet) in [
                (SectRole::Day, triplicity.day),
                (SectRole::Night, triplicity.night),
                (SectRole::Participating, triplicity.participating),
            ] {
                out.push(TriplicityAssignment {
                    planet,
                    sign: sign.id,
                    role,
                });
            }
        }
    }
    out
}

/// Directed `OPPOSES` edges: every sign points at its opposite, so each of the
/// six pairs appears in both directions.
pub fn oppositions() -> Vec<(&'static str, &'static str)> {
    SIGNS
        .iter()
        .filter_map(|s| opposite_sign(s).map(|o| (s.id, o.id)))
        .collect()
}

pub fn sect_memberships() -> Vec<SectMembership> {
    SECT_TEAMS
        .iter()
        .flat_map(|team| {
            [
                (team.light, TeamRole::Light),
                (team.benefic, TeamRole::Benefic),
                (team.malefic, TeamRole::Malefic),
            ]
            .into_iter()
            .map(move |(planet, role)| SectMembership {
                planet,
                team: team.id,
                role,
            })
        })
        .collect()
}
