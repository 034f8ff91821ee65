//! String shaping for slugs, flag asset names and display labels.
//!
//! The catalogs carry Spanish names with accents; slugs and asset filenames
//! are plain ASCII. All functions here are single-pass and allocation-light.

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg"];

/// Root directory for flag images, relative to the site root.
pub const FLAGS_DIR: &str = "img/flags/";

/// URL-safe slug: lowercase ASCII letters and digits joined by single
/// hyphens, no leading/trailing hyphens. Accented letters are folded to
/// their bare form; anything else is dropped. Collisions across distinct
/// inputs are possible, see [`unique_slug`].
pub fn slugify(text: &str) -> String {
    join_folded(text, '-', &[])
}

/// Slug disambiguated against a set of already-taken slugs with `-2`, `-3`,
/// ... suffixes. An input that slugifies to nothing becomes `item`.
pub fn unique_slug<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: std::collections::HashSet<&str> = taken.into_iter().collect();
    let mut slug = slugify(base);
    if slug.is_empty() {
        slug = "item".to_string();
    }
    if !taken.contains(slug.as_str()) {
        return slug;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{slug}-{n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

/// Flag asset stem for a country name: same folding as [`slugify`] but
/// joined with underscores (existing hyphens survive). Absent or empty
/// input maps to `unknown`.
pub fn country_flag_filename(country: &str) -> String {
    let out = join_folded(country, '_', &['-']);
    if out.is_empty() { "unknown".to_string() } else { out }
}

/// Display label for a country, from either a bare name or a flag asset
/// path. Takes the last path segment, strips a trailing image extension and
/// turns separators into spaces. Results of three characters or fewer are
/// upper-cased so short codes render as "UK" rather than "Uk".
pub fn country_label(source: &str) -> String {
    let last = source.rsplit('/').next().unwrap_or(source);
    let stem = strip_image_ext(last);
    let spaced = stem.replace(['_', '-'], " ");
    let words: Vec<&str> = spaced.split_whitespace().collect();
    let joined = words.join(" ");
    if joined.chars().count() <= 3 {
        return joined.to_uppercase();
    }
    words
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flag image path for either a literal asset filename or a bare country
/// name. Filenames (anything with an image extension) pass through under
/// [`FLAGS_DIR`], gaining the prefix only when missing; names are folded via
/// [`country_flag_filename`] and given a `.png` extension. The data source
/// mixes both forms, so this must be idempotent on its own output.
pub fn country_flag_src(input: &str) -> String {
    let trimmed = input.trim();
    if has_image_ext(trimmed) {
        if trimmed.starts_with(FLAGS_DIR) {
            return trimmed.to_string();
        }
        return format!("{FLAGS_DIR}{trimmed}");
    }
    format!("{FLAGS_DIR}{}.png", country_flag_filename(trimmed))
}

/// Fold, lowercase and filter `text`, joining runs of whitespace with `sep`.
/// ASCII alphanumerics are kept; characters in `extra_keep` are kept
/// verbatim; everything else is dropped. Separators never lead, trail or
/// repeat.
fn join_folded(text: &str, sep: char, extra_keep: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut sep_pending = false;
    let mut push = |c: char| {
        if c.is_ascii_alphanumeric() || extra_keep.contains(&c) {
            if sep_pending && !out.is_empty() {
                out.push(sep);
            }
            sep_pending = false;
            out.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == sep {
            sep_pending = true;
        }
    };
    for ch in text.chars() {
        match fold_char(ch) {
            Some(folded) => folded.chars().for_each(&mut push),
            None => push(ch),
        }
    }
    out
}

fn has_image_ext(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTS.contains(&ext.to_ascii_lowercase().as_str())
}

fn strip_image_ext(name: &str) -> &str {
    if let Some((stem, ext)) = name.rsplit_once('.')
        && IMAGE_EXTS.contains(&ext.to_ascii_lowercase().as_str())
    {
        return stem;
    }
    name
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Fold an accented character to its bare ASCII form. Covers the Latin
/// range the catalogs actually use; `None` means "no folding needed" and
/// lets the caller's own filter decide.
fn fold_char(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => "a",
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => "A",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' => "I",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' => "O",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ñ' => "n",
        'Ñ' => "N",
        'ç' => "c",
        'Ç' => "C",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'š' => "s",
        'Š' => "S",
        'ž' => "z",
        'Ž' => "Z",
        _ => return None,
    };
    Some(folded)
}
