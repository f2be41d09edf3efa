//! Models for the upstream JSON.
//!
//! Every field is optional or defaulted: the upstream schema is large and
//! only partially used, and a missing field must not fail a whole fetch.

use serde::{Deserialize, Serialize};

/// `{ name, url }` reference to another resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Numeric id at the end of [`url`](Self::url), if any.
    pub fn id(&self) -> Option<u64> {
        id_from_url(&self.url)
    }
}

/// Paginated list response (`/pokemon?limit=&offset=`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<Stat>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub moves: Vec<MoveEntry>,
}

impl Pokemon {
    /// Type names ordered by slot.
    pub fn type_names(&self) -> Vec<&str> {
        let mut slots: Vec<&TypeSlot> = self.types.iter().collect();
        slots.sort_by_key(|slot| slot.slot);
        slots.iter().map(|slot| slot.kind.name.as_str()).collect()
    }

    /// Base value of the named stat (`"hp"`, `"attack"`, ...).
    pub fn base_stat(&self, name: &str) -> Option<u32> {
        self.stats
            .iter()
            .find(|s| s.stat.name == name)
            .map(|s| s.base_stat)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub front_shiny: Option<String>,
    #[serde(default)]
    pub back_default: Option<String>,
    #[serde(default)]
    pub back_shiny: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    #[serde(default)]
    pub slot: u8,
    #[serde(rename = "type", default)]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    #[serde(default)]
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    #[serde(default)]
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    #[serde(default)]
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    #[serde(rename = "move", default)]
    pub move_: NamedResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub evolution_chain: Option<ResourceLink>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
    #[serde(default)]
    pub genera: Vec<Genus>,
    #[serde(default)]
    pub color: Option<NamedResource>,
    #[serde(default)]
    pub habitat: Option<NamedResource>,
    #[serde(default)]
    pub generation: Option<NamedResource>,
    /// Eighths female; `-1` for genderless.
    #[serde(default = "genderless")]
    pub gender_rate: i8,
    #[serde(default)]
    pub egg_groups: Vec<NamedResource>,
    #[serde(default)]
    pub hatch_counter: Option<u32>,
    #[serde(default)]
    pub capture_rate: Option<u32>,
}

fn genderless() -> i8 {
    -1
}

/// Male/female split in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenderRatio {
    pub male: f32,
    pub female: f32,
}

impl Species {
    /// First English flavor text with form feeds and newlines flattened.
    pub fn english_flavor_text(&self) -> String {
        self.flavor_text_entries
            .iter()
            .find(|e| e.language.name == "en")
            .map(|e| e.flavor_text.replace(['\u{c}', '\n'], " "))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "No description available.".to_string())
    }

    pub fn english_genus(&self) -> String {
        self.genera
            .iter()
            .find(|g| g.language.name == "en" && !g.genus.is_empty())
            .map(|g| g.genus.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// `None` for genderless species.
    pub fn gender_ratio(&self) -> Option<GenderRatio> {
        if self.gender_rate < 0 {
            return None;
        }
        let female = f32::from(self.gender_rate) / 8.0 * 100.0;
        Some(GenderRatio {
            male: 100.0 - female,
            female,
        })
    }

    /// Id of the species' evolution chain, if linked.
    pub fn evolution_chain_id(&self) -> Option<u64> {
        self.evolution_chain
            .as_ref()
            .and_then(|link| id_from_url(&link.url))
    }

    /// Egg groups as a display string, e.g. `"Monster, Plant"`.
    pub fn egg_group_names(&self) -> String {
        self.egg_groups
            .iter()
            .map(|g| format_name(&g.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorText {
    #[serde(default)]
    pub flavor_text: String,
    #[serde(default)]
    pub language: NamedResource,
    #[serde(default)]
    pub version: Option<NamedResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genus {
    #[serde(default)]
    pub genus: String,
    #[serde(default)]
    pub language: NamedResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionChain {
    pub id: u64,
    pub chain: ChainLink,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    #[serde(default)]
    pub species: NamedResource,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionDetail {
    #[serde(default)]
    pub min_level: Option<u32>,
    #[serde(default)]
    pub trigger: Option<NamedResource>,
    #[serde(default)]
    pub item: Option<NamedResource>,
    #[serde(default)]
    pub held_item: Option<NamedResource>,
    #[serde(default)]
    pub min_happiness: Option<u32>,
    #[serde(default)]
    pub time_of_day: String,
}

/// How a stage is reached from the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EvolutionTrigger {
    Level(u32),
    Item(String),
    Friendship,
    Trade,
    Other(String),
}

impl EvolutionTrigger {
    /// Classify an evolution detail. Level beats item, item beats
    /// friendship, friendship beats trade.
    pub fn from_detail(detail: &EvolutionDetail) -> Self {
        if let Some(level) = detail.min_level.filter(|l| *l > 0) {
            return Self::Level(level);
        }
        if let Some(item) = &detail.item {
            return Self::Item(format_name(&item.name));
        }
        if detail.min_happiness.is_some_and(|h| h > 0) {
            return Self::Friendship;
        }
        match detail.trigger.as_ref().map(|t| t.name.as_str()) {
            Some("trade") => Self::Trade,
            Some(other) => Self::Other(format_name(other)),
            None => Self::Other("Unknown".to_string()),
        }
    }
}

impl std::fmt::Display for EvolutionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level(level) => write!(f, "Level {level}"),
            Self::Item(item) => f.write_str(item),
            Self::Friendship => f.write_str("Friendship"),
            Self::Trade => f.write_str("Trade"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// One species in a flattened evolution chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionStage {
    pub name: String,
    pub species_id: Option<u64>,
    /// Distance from the base form.
    pub depth: usize,
    /// `None` for the base form.
    pub trigger: Option<EvolutionTrigger>,
}

impl EvolutionChain {
    /// Stages in pre-order: base form first, each branch fully before the
    /// next sibling.
    pub fn stages(&self) -> Vec<EvolutionStage> {
        let mut stages = Vec::new();
        let mut stack = vec![(&self.chain, 0usize)];
        while let Some((link, depth)) = stack.pop() {
            stages.push(EvolutionStage {
                name: link.species.name.clone(),
                species_id: link.species.id(),
                depth,
                trigger: link
                    .evolution_details
                    .first()
                    .map(EvolutionTrigger::from_detail),
            });
            // reversed so the first branch is visited first
            for child in link.evolves_to.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        stages
    }
}

/// `/type/{name}` response, reduced to the member list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMembers {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pokemon: Vec<TypeMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMember {
    #[serde(default)]
    pub slot: u8,
    #[serde(default)]
    pub pokemon: NamedResource,
}

impl TypeMembers {
    pub fn names(&self) -> Vec<String> {
        self.pokemon.iter().map(|m| m.pokemon.name.clone()).collect()
    }

    pub fn into_resources(self) -> Vec<NamedResource> {
        self.pokemon.into_iter().map(|m| m.pokemon).collect()
    }
}

/// Trailing numeric path segment of a resource URL.
///
/// ```rust
/// # use dexcache::api::id_from_url;
/// assert_eq!(id_from_url("https://pokeapi.co/api/v2/evolution-chain/10/"), Some(10));
/// assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/"), None);
/// ```
pub fn id_from_url(url: &str) -> Option<u64> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

/// Display form of a resource name: first letter uppercased, dashes to
/// spaces.
pub fn format_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('-', " "),
        None => String::new(),
    }
}

/// Zero-padded display id, e.g. `#025`.
pub fn format_id(id: u64) -> String {
    format!("#{id:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(name: &str, id: u64, details: Vec<EvolutionDetail>, next: Vec<ChainLink>) -> ChainLink {
        ChainLink {
            species: NamedResource::new(
                name,
                format!("https://pokeapi.co/api/v2/pokemon-species/{id}/"),
            ),
            evolution_details: details,
            evolves_to: next,
        }
    }

    fn level(n: u32) -> EvolutionDetail {
        EvolutionDetail {
            min_level: Some(n),
            ..EvolutionDetail::default()
        }
    }

    #[test]
    fn stages_are_pre_order() {
        let chain = EvolutionChain {
            id: 67,
            chain: link(
                "eevee",
                133,
                vec![],
                vec![
                    link(
                        "vaporeon",
                        134,
                        vec![EvolutionDetail {
                            item: Some(NamedResource::new("water-stone", "")),
                            ..EvolutionDetail::default()
                        }],
                        vec![],
                    ),
                    link(
                        "espeon",
                        196,
                        vec![EvolutionDetail {
                            min_happiness: Some(160),
                            ..EvolutionDetail::default()
                        }],
                        vec![],
                    ),
                ],
            ),
        };
        let stages = chain.stages();
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["eevee", "vaporeon", "espeon"]);
        assert_eq!(stages[0].trigger, None);
        assert_eq!(stages[1].trigger, Some(EvolutionTrigger::Item("Water stone".into())));
        assert_eq!(stages[2].trigger, Some(EvolutionTrigger::Friendship));
        assert_eq!(stages[2].depth, 1);
        assert_eq!(stages[2].species_id, Some(196));
    }

    #[test]
    fn deep_linear_chain() {
        let chain = EvolutionChain {
            id: 1,
            chain: link(
                "bulbasaur",
                1,
                vec![],
                vec![link("ivysaur", 2, vec![level(16)], vec![link("venusaur", 3, vec![level(32)], vec![])])],
            ),
        };
        let stages = chain.stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[2].depth, 2);
        assert_eq!(stages[2].trigger.as_ref().map(ToString::to_string).as_deref(), Some("Level 32"));
    }

    #[test]
    fn trigger_precedence() {
        let detail = EvolutionDetail {
            min_level: Some(20),
            item: Some(NamedResource::new("moon-stone", "")),
            trigger: Some(NamedResource::new("trade", "")),
            ..EvolutionDetail::default()
        };
        assert_eq!(EvolutionTrigger::from_detail(&detail), EvolutionTrigger::Level(20));

        let trade = EvolutionDetail {
            trigger: Some(NamedResource::new("trade", "")),
            ..EvolutionDetail::default()
        };
        assert_eq!(EvolutionTrigger::from_detail(&trade), EvolutionTrigger::Trade);

        let other = EvolutionDetail {
            trigger: Some(NamedResource::new("use-item", "")),
            ..EvolutionDetail::default()
        };
        assert_eq!(
            EvolutionTrigger::from_detail(&other),
            EvolutionTrigger::Other("Use item".into())
        );
    }

    #[test]
    fn species_helpers() {
        let json = r#"{
            "id": 25,
            "name": "pikachu",
            "gender_rate": 4,
            "evolution_chain": {"url": "https://pokeapi.co/api/v2/evolution-chain/10/"},
            "flavor_text_entries": [
                {"flavor_text": "Ein Text", "language": {"name": "de", "url": ""}},
                {"flavor_text": "When several of\nthese POKéMON\u000cgather", "language": {"name": "en", "url": ""}}
            ],
            "genera": [{"genus": "Mouse Pokémon", "language": {"name": "en", "url": ""}}],
            "egg_groups": [{"name": "ground", "url": ""}, {"name": "fairy", "url": ""}]
        }"#;
        let species: Species = serde_json::from_str(json).unwrap();
        assert_eq!(species.evolution_chain_id(), Some(10));
        assert_eq!(
            species.english_flavor_text(),
            "When several of these POKéMON gather"
        );
        assert_eq!(species.english_genus(), "Mouse Pokémon");
        assert_eq!(
            species.gender_ratio(),
            Some(GenderRatio {
                male: 50.0,
                female: 50.0
            })
        );
        assert_eq!(species.egg_group_names(), "Ground, Fairy");
    }

    #[test]
    fn species_fallbacks() {
        let species: Species = serde_json::from_str(r#"{"id": 1, "name": "x"}"#).unwrap();
        assert_eq!(species.english_flavor_text(), "No description available.");
        assert_eq!(species.english_genus(), "Unknown");
        assert_eq!(species.gender_ratio(), None);
        assert_eq!(species.evolution_chain_id(), None);
    }

    #[test]
    fn pokemon_types_sorted_by_slot() {
        let json = r#"{
            "id": 6, "name": "charizard",
            "types": [
                {"slot": 2, "type": {"name": "flying", "url": ""}},
                {"slot": 1, "type": {"name": "fire", "url": ""}}
            ],
            "stats": [{"base_stat": 78, "effort": 0, "stat": {"name": "hp", "url": ""}}]
        }"#;
        let pokemon: Pokemon = serde_json::from_str(json).unwrap();
        assert_eq!(pokemon.type_names(), vec!["fire", "flying"]);
        assert_eq!(pokemon.base_stat("hp"), Some(78));
        assert_eq!(pokemon.base_stat("speed"), None);
    }

    #[test]
    fn name_and_id_formatting() {
        assert_eq!(format_name("mr-mime"), "Mr mime");
        assert_eq!(format_name(""), "");
        assert_eq!(format_id(25), "#025");
        assert_eq!(format_id(1025), "#1025");
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon-species/25/"), Some(25));
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon-species/25"), Some(25));
        assert_eq!(id_from_url(""), None);
    }
}
