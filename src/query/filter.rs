//! Composable passage queries.
//!
//! A [`PassageQuery`] is a list of typed predicates folded into one traversal:
//! the first predicate that names a graph node anchors the walk (incoming
//! edges of that node), and every other predicate is checked per candidate.
//! Filter values never become query text, so a hostile value can only fail
//! to match.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::QueryResult;
use crate::graph::{Direction, GraphStore, NodeKey, NodeLabel, Relation, RelationKind};
use crate::ontology::{self, TrustTier};

/// An attributed passage. Author, source title and trust tier are always
/// present so every hit can be cited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassageHit {
    pub chunk_id: String,
    pub text: String,
    pub author: String,
    pub source_title: String,
    pub trust_tier: TrustTier,
    pub tradition: String,
    pub layer: Option<String>,
}

/// One filter over passages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassagePredicate {
    /// The passage has a `DESCRIBES` edge to this structural node.
    Describes(NodeKey),
    InLayer(String),
    AuthoredBy(String),
    /// Case-insensitive match on the passage's tradition.
    Tradition(String),
    TrustTier(TrustTier),
    /// Matches no passage, e.g. a trust tier outside 1..=4.
    Nothing,
}

impl PassagePredicate {
    /// Node and relation whose incoming edges enumerate the candidates.
    fn anchor(&self) -> Option<(NodeKey, RelationKind)> {
        match self {
            PassagePredicate::Describes(key) => Some((key.clone(), RelationKind::Describes)),
            PassagePredicate::InLayer(layer) => {
                Some((NodeKey::layer(layer.clone()), RelationKind::InLayer))
            }
            PassagePredicate::AuthoredBy(author) => {
                Some((NodeKey::author(author.clone()), RelationKind::AuthoredBy))
            }
            PassagePredicate::Tradition(_)
            | PassagePredicate::TrustTier(_)
            | PassagePredicate::Nothing => None,
        }
    }

    fn matches<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        passage: &NodeKey,
        hit: &PassageHit,
    ) -> QueryResult<bool> {
        Ok(match self {
            PassagePredicate::Describes(key) => {
                store.has_edge(passage, Relation::Describes, key)?
            }
            PassagePredicate::InLayer(layer) => hit.layer.as_deref() == Some(layer.as_str()),
            PassagePredicate::AuthoredBy(author) => hit.author == *author,
            PassagePredicate::Tradition(tradition) => hit.tradition.eq_ignore_ascii_case(tradition),
            PassagePredicate::TrustTier(tier) => hit.trust_tier == *tier,
            PassagePredicate::Nothing => false,
        })
    }
}

impl std::fmt::Display for PassagePredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassagePredicate::Describes(key) => {
                write!(f, "{}={}", key.label().as_str().to_lowercase(), key.id())
            }
            PassagePredicate::InLayer(layer) => write!(f, "layer={layer}"),
            PassagePredicate::AuthoredBy(author) => write!(f, "author={author}"),
            PassagePredicate::Tradition(t) => write!(f, "tradition={t}"),
            PassagePredicate::TrustTier(tier) => write!(f, "trust_tier={}", tier.get()),
            PassagePredicate::Nothing => f.write_str("nothing"),
        }
    }
}

/// A conjunction of [`PassagePredicate`]s with a result cap.
///
/// ```ignore
/// let hits = PassageQuery::new(3)
///     .planet("Mars")
///     .sign("aries")
///     .layer("technical")
///     .execute(&graph, &Context::background())?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageQuery {
    predicates: Vec<PassagePredicate>,
    limit: usize,
}

impl PassageQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            predicates: Vec::new(),
            limit,
        }
    }

    pub fn with(mut self, predicate: PassagePredicate) -> Self {
        if !self.predicates.contains(&predicate) {
            self.predicates.push(predicate);
        }
        self
    }

    /// Planet by id or display name.
    pub fn planet(self, planet: &str) -> Self {
        self.with(PassagePredicate::Describes(NodeKey::planet(
            ontology::planet_key(planet),
        )))
    }

    pub fn sign(self, sign: &str) -> Self {
        self.with(PassagePredicate::Describes(NodeKey::sign(
            ontology::normalize_id(sign),
        )))
    }

    pub fn house(self, house: u8) -> Self {
        self.with(PassagePredicate::Describes(NodeKey::house(house)))
    }

    pub fn aspect(self, aspect: &str) -> Self {
        self.with(PassagePredicate::Describes(NodeKey::aspect(
            ontology::normalize_id(aspect),
        )))
    }

    pub fn technique(self, technique: &str) -> Self {
        self.with(PassagePredicate::Describes(NodeKey::technique(
            ontology::normalize_id(technique),
        )))
    }

    pub fn layer(self, layer: &str) -> Self {
        self.with(PassagePredicate::InLayer(layer.trim().to_lowercase()))
    }

    pub fn author(self, author: &str) -> Self {
        self.with(PassagePredicate::AuthoredBy(author.trim().to_owned()))
    }

    pub fn tradition(self, tradition: &str) -> Self {
        self.with(PassagePredicate::Tradition(tradition.trim().to_owned()))
    }

    pub fn trust_tier(self, tier: TrustTier) -> Self {
        self.with(PassagePredicate::TrustTier(tier))
    }

    pub fn predicates(&self) -> &[PassagePredicate] {
        &self.predicates
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Human-readable form, e.g. `planet=mars, sign=aries, layer=technical`.
    pub fn describe(&self) -> String {
        if self.predicates.is_empty() {
            return "all passages".to_owned();
        }
        self.predicates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Run the query. Hits are ordered by trust tier, then chunk id, and
    /// capped at the limit. An unknown filter value yields no hits.
    pub fn execute<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        ctx: &Context,
    ) -> QueryResult<Vec<PassageHit>> {
        ctx.check()?;
        if self.limit == 0 || self.predicates.contains(&PassagePredicate::Nothing) {
            return Ok(Vec::new());
        }

        let anchor = self.predicates.iter().find_map(PassagePredicate::anchor);
        let candidates: Vec<NodeKey> = match anchor {
            Some((key, kind)) => store
                .neighbors(&key, kind, Direction::Incoming)?
                .into_iter()
                .map(|(_, k)| k)
                .filter(|k| k.label() == NodeLabel::Passage)
                .collect(),
            None => store
                .nodes_with_label(NodeLabel::Passage)?
                .into_iter()
                .map(|n| n.key)
                .collect(),
        };

        let mut hits = Vec::new();
        for passage in candidates {
            ctx.check()?;
            let Some(hit) = load_hit(store, &passage)? else {
                continue;
            };
            let mut keep = true;
            for predicate in &self.predicates {
                if !predicate.matches(store, &passage, &hit)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                hits.push(hit);
            }
        }

        hits.sort_by(|a, b| {
            a.trust_tier
                .cmp(&b.trust_tier)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(self.limit);
        tracing::debug!(query = %self.describe(), hits = hits.len(), "passage query");
        Ok(hits)
    }
}

/// Resolve a passage with its author and layer. Passages without an author
/// are not returned: attribution is part of the traversal.
fn load_hit<G: GraphStore + ?Sized>(store: &G, passage: &NodeKey) -> QueryResult<Option<PassageHit>> {
    let Some(node) = store.node(passage)? else {
        return Ok(None);
    };
    let Some(props) = node.as_passage() else {
        return Ok(None);
    };
    let first_id = |kind| -> QueryResult<Option<String>> {
        Ok(store
            .neighbors(passage, kind, Direction::Outgoing)?
            .into_iter()
            .next()
            .map(|(_, k)| k.id()))
    };
    let Some(author) = first_id(RelationKind::AuthoredBy)? else {
        return Ok(None);
    };
    Ok(Some(PassageHit {
        chunk_id: passage.id(),
        text: props.text.clone(),
        author,
        source_title: props.source_title.clone(),
        trust_tier: props.trust_tier,
        tradition: props.tradition.clone(),
        layer: first_id(RelationKind::InLayer)?,
    }))
}

/// The filter set of `FilteredSearch`. An omitted filter imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub planet: Option<String>,
    #[serde(default)]
    pub sign: Option<String>,
    #[serde(default)]
    pub house: Option<u8>,
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub technique: Option<String>,
    #[serde(default)]
    pub aspect: Option<String>,
    #[serde(default)]
    pub tradition: Option<String>,
    /// Exact tier. Values outside 1..=4 match nothing.
    #[serde(default)]
    pub trust_tier: Option<u8>,
}

impl SearchFilters {
    /// Fold the supplied filters into a query.
    pub fn to_query(&self, limit: usize) -> PassageQuery {
        let mut q = PassageQuery::new(limit);
        if let Some(planet) = &self.planet {
            q = q.planet(planet);
        }
        if let Some(sign) = &self.sign {
            q = q.sign(sign);
        }
        if let Some(house) = self.house {
            q = q.house(house);
        }
        if let Some(aspect) = &self.aspect {
            q = q.aspect(aspect);
        }
        if let Some(technique) = &self.technique {
            q = q.technique(technique);
        }
        if let Some(layer) = &self.layer {
            q = q.layer(layer);
        }
        if let Some(author) = &self.author {
            q = q.author(author);
        }
        if let Some(tradition) = &self.tradition {
            q = q.tradition(tradition);
        }
        if let Some(tier) = self.trust_tier {
            q = match TrustTier::new(i64::from(tier)) {
                Some(tier) => q.trust_tier(tier),
                None => q.with(PassagePredicate::Nothing),
            };
        }
        q
    }
}

/// Passages matching every supplied filter, best trust tier first.
pub fn filtered_search<G: GraphStore + ?Sized>(
    store: &G,
    filters: &SearchFilters,
    limit: usize,
    ctx: &Context,
) -> QueryResult<Vec<PassageHit>> {
    filters.to_query(limit).execute(store, ctx)
}
