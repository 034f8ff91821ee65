//! Markup generation for the site pages: featured cards, category
//! sections and player detail cards, injected into fixed slots of a page
//! template. When the page index cannot be loaded at all, a fixed demo set
//! renders instead so the page is never visually empty.

use crate::age::age_from_birth_date;
use crate::catalog::{CatalogIndex, DEFAULT_CATEGORY, League, PageEntry, Player, Team};
use crate::text::country_flag_src;

/// Container slots in the page template.
pub const FEATURED_SLOT: &str = "<!--LAQP:FEATURED-->";
pub const SECTIONS_SLOT: &str = "<!--LAQP:SECTIONS-->";

const MAX_FEATURED: usize = 3;
const DEFAULT_THUMB: &str = "img/pages/placeholder.png";
const DEFAULT_CTA: &str = "Ver más";
const DEFAULT_DESCRIPTION: &str = "Próximamente más información.";
const PLAYER_PHOTO_PLACEHOLDER: &str = "img/jugadores/placeholder.png";

/// Minimal page shell carrying both container slots. The real site ships
/// its own templates; this one keeps the binary self-contained.
pub const DEFAULT_TEMPLATE: &str = r#"<!doctype html>
<html lang="es">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>LAqP</title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
  <div class="wrap">
    <header class="site-header">
      <h1>LAqP</h1>
      <nav class="main-nav">
        <a href="ligas.html">Ligas</a>
        <a href="equipos.html">Equipos</a>
        <a href="jugadores.html">Jugadores</a>
      </nav>
    </header>
    <div id="featured-cards">
<!--LAQP:FEATURED-->
    </div>
    <div id="page-sections">
<!--LAQP:SECTIONS-->
    </div>
    <footer class="site-footer">© La Araña Que Pica — Página Oficial</footer>
  </div>
</body>
</html>
"#;

/// The page index split for rendering: up to three featured entries in
/// explicit order, then the rest grouped per category.
#[derive(Debug, Clone)]
pub struct PageSections {
    pub featured: Vec<PageEntry>,
    pub categories: Vec<(String, Vec<PageEntry>)>,
}

/// Partition and order the page index. Featured entries are stable-sorted
/// by ascending `sort_order` (ties keep input order) and capped at three;
/// the non-featured remainder is bucketed by category, each bucket sorted
/// by `sort_order` then case-insensitive title. Buckets come out
/// alphabetically with the default bucket last.
pub fn split_featured(entries: &[PageEntry]) -> PageSections {
    let mut featured: Vec<PageEntry> = entries.iter().filter(|e| e.featured).cloned().collect();
    featured.sort_by_key(|e| e.sort_order);
    featured.truncate(MAX_FEATURED);

    let mut categories: Vec<(String, Vec<PageEntry>)> = Vec::new();
    for entry in entries.iter().filter(|e| !e.featured) {
        let category = entry.category_or_default().to_string();
        match categories.iter_mut().find(|(name, _)| *name == category) {
            Some((_, bucket)) => bucket.push(entry.clone()),
            None => categories.push((category, vec![entry.clone()])),
        }
    }
    for (_, bucket) in &mut categories {
        bucket.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        });
    }
    categories.sort_by(|(a, _), (b, _)| {
        (a == DEFAULT_CATEGORY)
            .cmp(&(b == DEFAULT_CATEGORY))
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
    });

    PageSections {
        featured,
        categories,
    }
}

/// One promotional/navigation card. Optional fields fall back to fixed
/// defaults so a sparse entry still renders a complete card.
pub fn entry_card(entry: &PageEntry) -> String {
    let title = escape_html(entry.title.trim());
    let description = if entry.description.trim().is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        escape_html(entry.description.trim())
    };
    let thumb = if entry.thumb.trim().is_empty() {
        DEFAULT_THUMB.to_string()
    } else {
        escape_html(entry.thumb.trim())
    };
    let cta = if entry.cta_text.trim().is_empty() {
        DEFAULT_CTA.to_string()
    } else {
        escape_html(entry.cta_text.trim())
    };
    let href = escape_html(entry.href.trim());
    let target = if entry.target.trim().is_empty() {
        String::new()
    } else {
        format!(
            " target=\"{}\" rel=\"noopener\"",
            escape_html(entry.target.trim())
        )
    };

    format!(
        "<article class=\"card\">\n  <img class=\"thumb\" src=\"{thumb}\" alt=\"{title}\">\n  <h3>{title}</h3>\n  <p>{description}</p>\n  <a class=\"cta\" href=\"{href}\"{target}>{cta}</a>\n</article>"
    )
}

pub fn render_featured(featured: &[PageEntry]) -> String {
    featured.iter().map(entry_card).collect::<Vec<_>>().join("\n")
}

pub fn render_sections(categories: &[(String, Vec<PageEntry>)]) -> String {
    categories
        .iter()
        .map(|(name, bucket)| {
            let cards = bucket.iter().map(entry_card).collect::<Vec<_>>().join("\n");
            format!(
                "<section class=\"page-section\">\n<h2>{}</h2>\n<div class=\"card-grid\">\n{cards}\n</div>\n</section>",
                escape_html(name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inject the two generated fragments into the template's fixed container
/// slots. Slots missing from the template are simply left alone.
pub fn render_page(template: &str, featured_html: &str, sections_html: &str) -> String {
    template
        .replace(FEATURED_SLOT, featured_html)
        .replace(SECTIONS_SLOT, sections_html)
}

/// Fixed demo set rendered when the page index cannot be fetched, so the
/// page never comes up empty even offline.
pub fn placeholder_entries() -> Vec<PageEntry> {
    let card = |title: &str, href: &str, description: &str, sort_order: u32| PageEntry {
        title: title.to_string(),
        description: description.to_string(),
        href: href.to_string(),
        thumb: String::new(),
        category: String::new(),
        featured: true,
        sort_order,
        cta_text: String::new(),
        target: String::new(),
    };
    vec![
        card("Ligas", "ligas.html", "Todas las ligas del mod.", 1),
        card("Equipos", "equipos.html", "Planteles y escudos.", 2),
        card("Jugadores", "jugadores.html", "Fichas y valoraciones.", 3),
    ]
}

/// Player detail card: photo, rating badge, position, birth date with the
/// computed age when known, team/league links resolved through the lookup
/// maps, and the country flag.
pub fn player_card(
    player: &Player,
    teams: Option<&CatalogIndex<Team>>,
    leagues: Option<&CatalogIndex<League>>,
) -> String {
    let full_name = escape_html(&player.full_name());
    let photo = if player.photo.trim().is_empty() {
        PLAYER_PHOTO_PLACEHOLDER.to_string()
    } else {
        escape_html(player.photo.trim())
    };
    let badge = if player.rating > 0 {
        format!(" <span class=\"badge\">{}</span>", player.rating)
    } else {
        String::new()
    };
    let position = if player.position.trim().is_empty() {
        "-".to_string()
    } else {
        escape_html(player.position.trim())
    };

    let age_text = age_from_birth_date(&player.birth_date)
        .map(|age| format!(" ({age} años)"))
        .unwrap_or_default();
    let birth = escape_html(player.birth_date.trim());

    let team = player
        .team_id
        .as_deref()
        .and_then(|id| teams.and_then(|t| t.by_id(id)));
    let team_link = match team {
        Some(team) => format!(
            "<a class=\"clean\" href=\"equipo.html?slug={}\">{}</a>",
            escape_html(&team.slug),
            escape_html(&team.name)
        ),
        None => "Sin equipo".to_string(),
    };
    let league = team
        .and_then(|t| t.league_id.as_deref())
        .and_then(|id| leagues.and_then(|l| l.by_id(id)));
    let league_link = match league {
        Some(league) => format!(
            "<a class=\"clean\" href=\"liga.html?slug={}\">{}</a>",
            escape_html(&league.slug),
            escape_html(&league.name)
        ),
        None => "—".to_string(),
    };

    let flag = if player.country.trim().is_empty() {
        String::new()
    } else {
        format!(
            " <img class=\"flag\" src=\"{}\" alt=\"{}\">",
            escape_html(&country_flag_src(&player.country)),
            escape_html(player.country.trim())
        )
    };

    let mut links = Vec::new();
    if !player.sofifa_url.trim().is_empty() {
        links.push(format!(
            "<a class=\"clean\" href=\"{}\" target=\"_blank\" rel=\"noopener\">Ver en SoFIFA</a>",
            escape_html(player.sofifa_url.trim())
        ));
    }
    if !player.face_video_url.trim().is_empty() {
        links.push(format!(
            "<a class=\"clean\" href=\"{}\" target=\"_blank\" rel=\"noopener\">Video de cara</a>",
            escape_html(player.face_video_url.trim())
        ));
    }
    let links_row = if links.is_empty() {
        String::new()
    } else {
        format!("\n  <div class=\"links\">{}</div>", links.join(" "))
    };

    format!(
        "<article class=\"player-card\">\n  <img class=\"photo\" src=\"{photo}\" alt=\"{full_name}\">\n  <h3>{full_name}{badge}</h3>\n  <div><strong>Posición:</strong> {position}</div>\n  <div><strong>Nacimiento:</strong> {birth}{age_text}</div>\n  <div><strong>Equipo:</strong> {team_link}</div>\n  <div><strong>Liga:</strong> {league_link}</div>\n  <div><strong>País:</strong> {}{flag}</div>{links_row}\n</article>",
        escape_html(player.country.trim())
    )
}

/// Minimal escaping for text and attribute positions.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
