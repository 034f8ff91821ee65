//! Catalog records, JSON parsing and the in-memory lookup maps.
//!
//! The catalogs are produced by an offline export step and are read-only
//! here: fetched per page load, parsed leniently (unknown fields ignored,
//! missing optional fields defaulted), and indexed by id and slug in one
//! pass. Data problems never reject a load; [`validate`] reports them.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::age::parse_birth_date;
use crate::fetch::{fetch_first_ok, http_client};

pub const LEAGUES_DOC: &str = "data/ligas.json";
pub const TEAMS_DOC: &str = "data/equipos.json";
pub const PLAYERS_DOC: &str = "data/jugadores.json";
pub const PAGES_DOC: &str = "data/pages.json";

pub const ALLOWED_POSITIONS: &[&str] = &["Arquero", "Defensor", "Mediocampista", "Delantero"];
pub const RATING_MIN: u32 = 40;
pub const RATING_MAX: u32 = 99;

/// Entries without an explicit `sort_order` sink to the end.
pub const SORT_ORDER_LAST: u32 = u32::MAX;

/// Bucket for page entries without a category.
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub league_id: Option<String>,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub team_id: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub rating: u32,
    #[serde(default)]
    pub sofifa_url: String,
    #[serde(default)]
    pub face_video_url: String,
    #[serde(default)]
    pub slug: String,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// One navigable page/card in the site index. Every field defaults so a
/// sparse entry still renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_sort_order")]
    pub sort_order: u32,
    #[serde(default)]
    pub cta_text: String,
    #[serde(default)]
    pub target: String,
}

fn default_sort_order() -> u32 {
    SORT_ORDER_LAST
}

impl PageEntry {
    pub fn category_or_default(&self) -> &str {
        let trimmed = self.category.trim();
        if trimmed.is_empty() { DEFAULT_CATEGORY } else { trimmed }
    }
}

/// Ids arrive as strings from the export but as numbers from hand-edited
/// files; coerce both to the uniform string key.
fn de_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Num(i64),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Text(s) => s.trim().to_string(),
        Raw::Num(n) => n.to_string(),
    })
}

/// Foreign keys use the empty string for "unassigned" in the export.
fn de_opt_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Num(i64),
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Raw::Num(n)) => Some(n.to_string()),
        None => None,
    })
}

fn parse_records<T: DeserializeOwned>(raw: &str) -> serde_json::Result<Vec<T>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed)
}

pub fn parse_leagues_json(raw: &str) -> Result<Vec<League>> {
    parse_records(raw).context("invalid ligas json")
}

pub fn parse_teams_json(raw: &str) -> Result<Vec<Team>> {
    parse_records(raw).context("invalid equipos json")
}

pub fn parse_players_json(raw: &str) -> Result<Vec<Player>> {
    parse_records(raw).context("invalid jugadores json")
}

/// The page index is either `{ "pages": [...] }` or a bare array.
pub fn parse_pages_json(raw: &str) -> Result<Vec<PageEntry>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Doc { pages: Vec<PageEntry> },
        List(Vec<PageEntry>),
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    match serde_json::from_str(trimmed).context("invalid pages json")? {
        Repr::Doc { pages } => Ok(pages),
        Repr::List(list) => Ok(list),
    }
}

pub trait CatalogRecord {
    fn id(&self) -> &str;
    fn slug(&self) -> &str;
}

impl CatalogRecord for League {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> &str {
        &self.slug
    }
}

impl CatalogRecord for Team {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> &str {
        &self.slug
    }
}

impl CatalogRecord for Player {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> &str {
        &self.slug
    }
}

/// By-id and by-slug lookups over one loaded collection. Built in a single
/// pass; duplicate keys are last-write-wins and only surface through
/// [`validate`]. Empty keys never index.
#[derive(Debug, Clone)]
pub struct CatalogIndex<T> {
    items: Vec<T>,
    by_id: HashMap<String, usize>,
    by_slug: HashMap<String, usize>,
}

impl<T: CatalogRecord> CatalogIndex<T> {
    pub fn new(items: Vec<T>) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_slug = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if !item.id().is_empty() {
                by_id.insert(item.id().to_string(), idx);
            }
            if !item.slug().is_empty() {
                by_slug.insert(item.slug().to_string(), idx);
            }
        }
        Self {
            items,
            by_id,
            by_slug,
        }
    }

    pub fn by_id(&self, id: &str) -> Option<&T> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    pub fn by_slug(&self, slug: &str) -> Option<&T> {
        self.by_slug.get(slug).map(|&i| &self.items[i])
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Leagues,
    Teams,
    Players,
}

/// The collections one page load requested. Absent collections simply have
/// no index.
#[derive(Debug, Clone)]
pub struct CatalogSet {
    pub leagues: Option<CatalogIndex<League>>,
    pub teams: Option<CatalogIndex<Team>>,
    pub players: Option<CatalogIndex<Player>>,
}

impl CatalogSet {
    pub fn empty() -> Self {
        Self {
            leagues: None,
            teams: None,
            players: None,
        }
    }

    pub fn load(base: &str, wanted: &[Collection]) -> Result<Self> {
        let client = http_client()?;
        let mut set = Self::empty();
        for collection in wanted {
            match collection {
                Collection::Leagues => {
                    let raw = fetch_doc(client, base, LEAGUES_DOC)?;
                    set.leagues = Some(CatalogIndex::new(parse_leagues_json(&raw)?));
                }
                Collection::Teams => {
                    let raw = fetch_doc(client, base, TEAMS_DOC)?;
                    set.teams = Some(CatalogIndex::new(parse_teams_json(&raw)?));
                }
                Collection::Players => {
                    let raw = fetch_doc(client, base, PLAYERS_DOC)?;
                    set.players = Some(CatalogIndex::new(parse_players_json(&raw)?));
                }
            }
        }
        Ok(set)
    }
}

/// Fetch one conventional catalog document, trying the relative depths the
/// hosting layout allows.
pub fn fetch_doc(client: &Client, base: &str, doc: &str) -> Result<String> {
    let candidates = [
        doc.to_string(),
        format!("../{doc}"),
        format!("../../{doc}"),
    ];
    let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
    fetch_first_ok(client, base, &refs)
}

/// Fetch and parse the page index.
pub fn fetch_pages(base: &str) -> Result<Vec<PageEntry>> {
    let client = http_client()?;
    let raw = fetch_doc(client, base, PAGES_DOC)?;
    parse_pages_json(&raw)
}

/// Data-hygiene report over a loaded snapshot. Mirrors the checks the
/// export step runs before publishing; loading never rejects, this only
/// names what is off.
pub fn validate(leagues: &[League], teams: &[Team], players: &[Player]) -> Vec<String> {
    let mut issues = Vec::new();

    report_duplicate_slugs("ligas", leagues.iter().map(|l| l.slug.as_str()), &mut issues);
    report_duplicate_slugs("equipos", teams.iter().map(|t| t.slug.as_str()), &mut issues);
    report_duplicate_slugs(
        "jugadores",
        players.iter().map(|p| p.slug.as_str()),
        &mut issues,
    );

    let league_ids: HashSet<&str> = leagues.iter().map(|l| l.id.as_str()).collect();
    let team_ids: HashSet<&str> = teams.iter().map(|t| t.id.as_str()).collect();

    for team in teams {
        if let Some(league_id) = &team.league_id
            && !league_ids.contains(league_id.as_str())
        {
            issues.push(format!(
                "equipo {}: league_id inexistente '{league_id}'",
                team.name
            ));
        }
    }

    for player in players {
        let name = player.full_name();
        if let Some(team_id) = &player.team_id
            && !team_ids.contains(team_id.as_str())
        {
            issues.push(format!("jugador {name}: team_id inexistente '{team_id}'"));
        }
        if !player.position.is_empty() && !ALLOWED_POSITIONS.contains(&player.position.as_str()) {
            issues.push(format!(
                "jugador {name}: posición inválida '{}'",
                player.position
            ));
        }
        if player.rating != 0 && !(RATING_MIN..=RATING_MAX).contains(&player.rating) {
            issues.push(format!(
                "jugador {name}: rating fuera de rango {}",
                player.rating
            ));
        }
        if !player.birth_date.is_empty() && parse_birth_date(&player.birth_date).is_none() {
            issues.push(format!(
                "jugador {name}: fecha inválida '{}'",
                player.birth_date
            ));
        }
    }

    issues
}

fn report_duplicate_slugs<'a, I>(label: &str, slugs: I, issues: &mut Vec<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for slug in slugs {
        if slug.is_empty() {
            continue;
        }
        *seen.entry(slug).or_default() += 1;
    }
    let mut dupes: Vec<&str> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(slug, _)| slug)
        .collect();
    dupes.sort_unstable();
    for slug in dupes {
        issues.push(format!("{label}: slug duplicado '{slug}'"));
    }
}
