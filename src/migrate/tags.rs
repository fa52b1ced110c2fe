//! Comma-delimited tag fields to `DESCRIBES` targets.
//!
//! Parsing only decides the candidate key; whether the structural entity
//! exists is decided by the graph when the edge is merged.

use serde::Serialize;

use crate::graph::NodeKey;

use super::corpus::CorpusMetadata;

/// The five tag fields of a corpus record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagField {
    Planets,
    Signs,
    Houses,
    Aspects,
    Techniques,
}

impl TagField {
    pub const ALL: [TagField; 5] = [
        TagField::Planets,
        TagField::Signs,
        TagField::Houses,
        TagField::Aspects,
        TagField::Techniques,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TagField::Planets => "planets",
            TagField::Signs => "signs",
            TagField::Houses => "houses",
            TagField::Aspects => "aspects",
            TagField::Techniques => "techniques",
        }
    }

    fn raw(self, meta: &CorpusMetadata) -> Option<&str> {
        match self {
            TagField::Planets => meta.planets.as_deref(),
            TagField::Signs => meta.signs.as_deref(),
            TagField::Houses => meta.houses.as_deref(),
            TagField::Aspects => meta.aspects.as_deref(),
            TagField::Techniques => meta.techniques.as_deref(),
        }
    }

    /// Classify one trimmed, non-empty token.
    fn token(self, token: &str) -> Token {
        let key = match self {
            TagField::Houses => {
                if !token.bytes().all(|b| b.is_ascii_digit()) {
                    return Token::Malformed;
                }
                // All digits but beyond any house number.
                match token.parse::<u8>() {
                    Ok(number) => NodeKey::house(number),
                    Err(_) => return Token::Unresolvable,
                }
            }
            TagField::Planets => NodeKey::planet(token.to_lowercase()),
            TagField::Signs => NodeKey::sign(token.to_lowercase()),
            TagField::Aspects => NodeKey::aspect(token.to_lowercase()),
            TagField::Techniques => NodeKey::technique(token.to_lowercase()),
        };
        Token::Key(key)
    }
}

enum Token {
    Key(NodeKey),
    Malformed,
    /// Well-formed but can never name a structural node.
    Unresolvable,
}

/// A token that could not become a candidate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedTag {
    pub field: TagField,
    /// The offending token; empty for an empty slot like `"aries,,leo"`.
    pub token: String,
}

/// Tokens of one tag field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTags {
    pub keys: Vec<NodeKey>,
    pub malformed: Vec<MalformedTag>,
    /// Well-formed tokens with no possible target, like house `300`.
    pub unresolvable: Vec<String>,
}

/// Tag targets of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTags {
    /// Distinct candidate keys in field order, then token order.
    pub targets: Vec<NodeKey>,
    pub malformed: Vec<MalformedTag>,
    pub unresolvable: Vec<(TagField, String)>,
}

/// Split one field into candidate keys.
///
/// Tokens are trimmed. An absent or blank field yields nothing. An empty slot
/// between commas is malformed, and so is a house token that is not all
/// ASCII digits.
pub fn parse_field(field: TagField, raw: &str) -> FieldTags {
    let mut tags = FieldTags::default();
    if raw.trim().is_empty() {
        return tags;
    }
    for token in raw.split(',').map(str::trim) {
        if token.is_empty() {
            tags.malformed.push(MalformedTag {
                field,
                token: String::new(),
            });
            continue;
        }
        match field.token(token) {
            Token::Key(key) => tags.keys.push(key),
            Token::Malformed => tags.malformed.push(MalformedTag {
                field,
                token: token.to_owned(),
            }),
            Token::Unresolvable => tags.unresolvable.push(token.to_owned()),
        }
    }
    tags
}

/// Parse all five tag fields of a record.
pub fn parse_tags(meta: &CorpusMetadata) -> ParsedTags {
    let mut parsed = ParsedTags::default();
    for field in TagField::ALL {
        let Some(raw) = field.raw(meta) else {
            continue;
        };
        let tags = parse_field(field, raw);
        for key in tags.keys {
            if !parsed.targets.contains(&key) {
                parsed.targets.push(key);
            }
        }
        parsed.malformed.extend(tags.malformed);
        parsed
            .unresolvable
            .extend(tags.unresolvable.into_iter().map(|token| (field, token)));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_trimmed_and_lowercased() {
        let tags = parse_field(TagField::Signs, " Aries , LEO");
        assert_eq!(tags.keys, vec![NodeKey::sign("aries"), NodeKey::sign("leo")]);
        assert!(tags.malformed.is_empty());
    }

    #[test]
    fn empty_field_yields_nothing() {
        assert_eq!(parse_field(TagField::Planets, ""), FieldTags::default());
        assert_eq!(parse_field(TagField::Planets, "   "), FieldTags::default());
    }

    #[test]
    fn empty_slots_are_malformed() {
        let tags = parse_field(TagField::Planets, "mars,,venus,");
        assert_eq!(tags.keys.len(), 2);
        assert_eq!(tags.malformed.len(), 2);
    }

    #[test]
    fn houses_must_be_numeric() {
        let tags = parse_field(TagField::Houses, "1, 10, tenth, 3.5, +5, -2");
        assert_eq!(tags.keys, vec![NodeKey::house(1), NodeKey::house(10)]);
        let bad: Vec<_> = tags.malformed.iter().map(|m| m.token.as_str()).collect();
        assert_eq!(bad, vec!["tenth", "3.5", "+5", "-2"]);
    }

    #[test]
    fn oversized_house_numbers_are_unresolvable() {
        let tags = parse_field(TagField::Houses, "13, 300, 007");
        // 13 fits a key and is rejected by the graph; 300 cannot be keyed.
        assert_eq!(tags.keys, vec![NodeKey::house(13), NodeKey::house(7)]);
        assert!(tags.malformed.is_empty());
        assert_eq!(tags.unresolvable, vec!["300"]);
    }

    #[test]
    fn unknown_tokens_still_become_candidates() {
        // Existence is checked when the edge is merged.
        let tags = parse_field(TagField::Signs, "aries,invalidsign");
        assert_eq!(tags.keys.len(), 2);
        assert!(tags.malformed.is_empty());
    }

    #[test]
    fn parse_tags_dedupes_targets() {
        let meta = CorpusMetadata {
            planets: Some("mars, Mars".into()),
            houses: Some("1".into()),
            ..Default::default()
        };
        let parsed = parse_tags(&meta);
        assert_eq!(parsed.targets, vec![NodeKey::planet("mars"), NodeKey::house(1)]);
    }
}
