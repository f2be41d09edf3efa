//! Typed access to the creature database, cached.
//!
//! [`DexApi`] talks HTTP and nothing else. [`Dex`] puts a
//! [`ResourceCache`] in front of every endpoint, keys entities by their
//! numeric id (via [`NameIndex`]) and exposes the list and type endpoints
//! as [`PageSequence`]s.
//!
//! ```rust,no_run
//! use dexcache::api::Dex;
//!
//! #[tokio::main]
//! async fn main() -> dexcache::Result<()> {
//!     let dex = Dex::new()?;
//!     let detail = dex.detail("pikachu").await?;
//!     println!("{} ({})", detail.pokemon.name, detail.species.english_genus());
//!
//!     let mut list = dex.pokemon_pages()?;
//!     let first = list.next_page().await?;
//!     println!("{} names, more: {}", first.items.len(), list.has_next_page());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod generations;
pub mod names;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DexApi};
pub use generations::{GENERATIONS, Generation, TOTAL_POKEMON};
pub use names::NameIndex;
pub use types::{
    ChainLink, EvolutionChain, EvolutionDetail, EvolutionStage, EvolutionTrigger, NamedResource,
    Pokemon, ResourceList, Species, TypeMembers, format_id, format_name, id_from_url,
};

use crate::Result;
use crate::cache::{CacheOptions, ResourceCache};
use crate::key::{Identifier, Params, make_key};
use crate::pagination::{Page, PageSequence, PageSource, SlicePageSource};

/// Resource kinds used as the first component of every cache key.
pub mod kinds {
    pub const POKEMON: &str = "pokemon";
    pub const SPECIES: &str = "pokemon-species";
    pub const EVOLUTION_CHAIN: &str = "evolution-chain";
    pub const POKEMON_LIST: &str = "pokemon-list";
    pub const TYPE: &str = "type";
    pub const TYPE_PAGE: &str = "type-page";
    pub const GENERATION_NAMES: &str = "generation-names";
}

/// Items per page of the full list.
pub const LIST_PAGE_SIZE: usize = 20;

/// Items per page when browsing one type.
pub const TYPE_PAGE_SIZE: usize = 24;

/// Answer options offered per quiz round.
pub const QUIZ_OPTIONS: usize = 4;

const ENTITY_MAX_AGE: Duration = Duration::from_secs(10 * 60);
const TYPE_MAX_AGE: Duration = Duration::from_secs(30 * 60);
const GENERATION_NAMES_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Settings for [`Dex::with_options`].
#[derive(Debug, Clone)]
pub struct DexOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub cache: CacheOptions,
}

impl Default for DexOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache: Self::default_cache_options(),
        }
    }
}

impl DexOptions {
    /// Cache options with the per-kind staleness the app is tuned for:
    /// entities and the list stay fresh for 10 minutes, type membership
    /// for 30, generation name lists for a day.
    pub fn default_cache_options() -> CacheOptions {
        CacheOptions::new()
            .kind_max_age(kinds::POKEMON, ENTITY_MAX_AGE)
            .kind_max_age(kinds::SPECIES, ENTITY_MAX_AGE)
            .kind_max_age(kinds::EVOLUTION_CHAIN, ENTITY_MAX_AGE)
            .kind_max_age(kinds::POKEMON_LIST, ENTITY_MAX_AGE)
            .kind_max_age(kinds::TYPE_PAGE, ENTITY_MAX_AGE)
            .kind_max_age(kinds::TYPE, TYPE_MAX_AGE)
            .kind_max_age(kinds::GENERATION_NAMES, GENERATION_NAMES_MAX_AGE)
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.cache = cache;
        self
    }
}

/// Everything the detail view needs.
#[derive(Debug, Clone, Serialize)]
pub struct PokemonDetail {
    pub pokemon: Pokemon,
    pub species: Species,
    /// `None` when the species links no chain.
    pub evolution: Option<EvolutionChain>,
}

/// One round of the silhouette quiz.
#[derive(Debug, Clone, Serialize)]
pub struct QuizRound {
    pub pokemon: Pokemon,
    /// Display names, shuffled, exactly one of which is [`answer`](Self::answer).
    pub options: Vec<String>,
    pub answer: String,
}

impl QuizRound {
    pub fn is_correct(&self, guess: &str) -> bool {
        guess == self.answer
    }
}

/// Cached facade over [`DexApi`].
#[derive(Clone)]
pub struct Dex {
    api: DexApi,
    pokemon_names: NameIndex,
    species_names: NameIndex,
    pokemon: ResourceCache<Pokemon>,
    species: ResourceCache<Species>,
    chains: ResourceCache<EvolutionChain>,
    list_pages: ResourceCache<Page<NamedResource>>,
    type_members: ResourceCache<Vec<NamedResource>>,
    type_pages: ResourceCache<Page<NamedResource>>,
    generation_names: ResourceCache<Vec<String>>,
}

impl Dex {
    /// Facade over the public API with default options.
    pub fn new() -> Result<Self> {
        Self::with_options(DexOptions::default())
    }

    pub fn with_options(options: DexOptions) -> Result<Self> {
        let api = DexApi::with_base_url(options.base_url, options.timeout)?;
        Ok(Self::with_api(api, options.cache))
    }

    pub fn with_api(api: DexApi, cache: CacheOptions) -> Self {
        Self {
            api,
            pokemon_names: NameIndex::default(),
            species_names: NameIndex::default(),
            pokemon: ResourceCache::new(cache.clone()),
            species: ResourceCache::new(cache.clone()),
            chains: ResourceCache::new(cache.clone()),
            list_pages: ResourceCache::new(cache.clone().page_size(LIST_PAGE_SIZE)),
            type_members: ResourceCache::new(cache.clone()),
            type_pages: ResourceCache::new(cache.clone().page_size(TYPE_PAGE_SIZE)),
            generation_names: ResourceCache::new(cache),
        }
    }

    pub fn api(&self) -> &DexApi {
        &self.api
    }

    pub fn pokemon_cache(&self) -> &ResourceCache<Pokemon> {
        &self.pokemon
    }

    pub fn species_cache(&self) -> &ResourceCache<Species> {
        &self.species
    }

    pub fn pokemon_names(&self) -> &NameIndex {
        &self.pokemon_names
    }

    /// A single pokemon by id or name.
    pub async fn pokemon(&self, ident: impl Into<Identifier>) -> Result<Pokemon> {
        let requested = self.pokemon_names.canonical(&ident.into());
        let key = make_key(kinds::POKEMON, requested.clone(), Params::new())?;

        let api = self.api.clone();
        let ident = key.identifier().clone();
        let pokemon = self
            .pokemon
            .request(&key, move || {
                let api = api.clone();
                let ident = ident.clone();
                async move { api.pokemon(&ident).await }
            })
            .await?;

        self.pokemon_names.record(&pokemon.name, pokemon.id);
        if requested.as_id().is_none() {
            seed_id_key(&self.pokemon, kinds::POKEMON, pokemon.id, &pokemon)?;
        }
        Ok(pokemon)
    }

    /// A species by id or name.
    pub async fn species(&self, ident: impl Into<Identifier>) -> Result<Species> {
        let requested = self.species_names.canonical(&ident.into());
        let key = make_key(kinds::SPECIES, requested.clone(), Params::new())?;

        let api = self.api.clone();
        let ident = key.identifier().clone();
        let species = self
            .species
            .request(&key, move || {
                let api = api.clone();
                let ident = ident.clone();
                async move { api.species(&ident).await }
            })
            .await?;

        self.species_names.record(&species.name, species.id);
        if requested.as_id().is_none() {
            seed_id_key(&self.species, kinds::SPECIES, species.id, &species)?;
        }
        Ok(species)
    }

    pub async fn evolution_chain(&self, id: u64) -> Result<EvolutionChain> {
        let key = make_key(kinds::EVOLUTION_CHAIN, id, Params::new())?;
        let api = self.api.clone();
        self.chains
            .request(&key, move || {
                let api = api.clone();
                async move { api.evolution_chain(id).await }
            })
            .await
    }

    /// Pokemon and species fetched concurrently, then the evolution chain
    /// the species links to.
    pub async fn detail(&self, ident: impl Into<Identifier>) -> Result<PokemonDetail> {
        let ident = ident.into();
        let (pokemon, species) =
            tokio::try_join!(self.pokemon(ident.clone()), self.species(ident))?;

        let evolution = match species.evolution_chain_id() {
            Some(id) => Some(self.evolution_chain(id).await?),
            None => None,
        };

        Ok(PokemonDetail {
            pokemon,
            species,
            evolution,
        })
    }

    /// The full list of pokemon names, 20 per page.
    pub fn pokemon_pages(&self) -> Result<PageSequence<NamedResource>> {
        let source: Arc<dyn PageSource<NamedResource>> = Arc::new(ListSource {
            api: self.api.clone(),
            names: self.pokemon_names.clone(),
        });
        PageSequence::new(
            self.list_pages.clone(),
            source,
            kinds::POKEMON_LIST,
            Params::new(),
        )
    }

    /// Full entities for a page of list items, fetched concurrently.
    ///
    /// Order follows `items`. The first failure fails the whole page; the
    /// entities that did load stay cached.
    pub async fn page_details(&self, items: &[NamedResource]) -> Result<Vec<Pokemon>> {
        try_join_all(items.iter().map(|item| {
            let ident = match item.id() {
                Some(id) => Identifier::Id(id),
                None => Identifier::Name(item.name.clone()),
            };
            self.pokemon(ident)
        }))
        .await
    }

    /// Members of one type (cached for 30 minutes), paged locally 24 at a
    /// time.
    pub async fn type_pages(&self, type_name: &str) -> Result<PageSequence<NamedResource>> {
        let members = self.type_members(type_name).await?;
        debug!(type_name, members = members.len(), "type members loaded");

        let params = Params::new()
            .with("type", type_name.trim().to_lowercase())
            .with("members", members.len());
        let source: Arc<dyn PageSource<NamedResource>> = Arc::new(SlicePageSource::new(members));
        PageSequence::new(self.type_pages.clone(), source, kinds::TYPE_PAGE, params)
    }

    /// Every pokemon that has `type_name`, as `{name, url}` references.
    pub async fn type_members(&self, type_name: &str) -> Result<Vec<NamedResource>> {
        let key = make_key(kinds::TYPE, type_name, Params::new())?;
        let api = self.api.clone();
        let type_name = key.identifier().to_string();
        let members = self
            .type_members
            .request(&key, move || {
                let api = api.clone();
                let type_name = type_name.clone();
                async move {
                    api.type_members(&type_name)
                        .await
                        .map(TypeMembers::into_resources)
                }
            })
            .await?;
        self.pokemon_names.record_all(&members);
        Ok(members)
    }

    /// Display names of every pokemon in a generation (`None` for all).
    pub async fn names_for_generation(&self, generation: Option<u8>) -> Result<Vec<String>> {
        let range = generations::range_for(generation);
        let ident = match generation.and_then(generations::generation) {
            Some(g) => Identifier::Id(u64::from(g.number)),
            None => Identifier::Name("all".into()),
        };
        let key = make_key(kinds::GENERATION_NAMES, ident, Params::new())?;

        let api = self.api.clone();
        let names = self.pokemon_names.clone();
        self.generation_names
            .request(&key, move || {
                let api = api.clone();
                let names = names.clone();
                let limit = (range.end() - range.start() + 1) as usize;
                let offset = (range.start() - 1) as usize;
                async move {
                    api.pokemon_list(limit, offset).await.map(|list| {
                        names.record_all(&list.results);
                        list.results.iter().map(|r| format_name(&r.name)).collect()
                    })
                }
            })
            .await
    }

    /// A random pokemon from the generation and four shuffled answer
    /// options, one of them correct.
    pub async fn quiz_round(&self, generation: Option<u8>) -> Result<QuizRound> {
        let id = generations::random_id(generation);
        let (pokemon, all_names) =
            tokio::try_join!(self.pokemon(id), self.names_for_generation(generation))?;

        let answer = format_name(&pokemon.name);
        let mut options: Vec<String> = all_names.into_iter().filter(|n| *n != answer).collect();
        let mut rng = rand::rng();
        options.shuffle(&mut rng);
        options.truncate(QUIZ_OPTIONS - 1);
        options.push(answer.clone());
        options.shuffle(&mut rng);

        Ok(QuizRound {
            pokemon,
            options,
            answer,
        })
    }
}

/// Store `value` under its numeric-id key too, so the next lookup by id or
/// by name is a hit. A fresh or in-flight id entry is left alone.
fn seed_id_key<V: Clone + Send + Sync + 'static>(
    cache: &ResourceCache<V>,
    kind: &str,
    id: u64,
    value: &V,
) -> Result<()> {
    let id_key = make_key(kind, id, Params::new())?;
    let in_flight = cache.get(&id_key).is_some_and(|entry| entry.is_pending());
    if !in_flight && !cache.is_fresh(&id_key) {
        cache.put(&id_key, value.clone());
    }
    Ok(())
}

/// List endpoint as a page source. Cursors are item offsets.
struct ListSource {
    api: DexApi,
    names: NameIndex,
}

#[async_trait]
impl PageSource<NamedResource> for ListSource {
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> Result<Page<NamedResource>> {
        let offset = match cursor {
            None => 0,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                crate::CacheError::InvalidKey(format!("invalid offset cursor: {raw}"))
            })?,
        };
        let list = self.api.pokemon_list(page_size, offset).await?;
        self.names.record_all(&list.results);
        Ok(Page {
            next: list.next.as_ref().map(|_| (offset + page_size).to_string()),
            items: list.results,
        })
    }
}
