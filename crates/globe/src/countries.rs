//! Country-name canonicalisation.
//!
//! Author-entered names and dataset names are both passed through
//! [`resolve_country`]; the resulting canonical string is the join key between
//! the two.

use std::collections::HashSet;

/// Lower-cases, trims, spells out `&` and collapses runs of whitespace.
pub fn normalize_country_name(name: &str) -> String {
    name.to_lowercase()
        .replace('&', "and")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Author spellings mapped to the dataset's canonical (normalized) names.
///
/// Keys and values are already normalized. No value appears as a key, so
/// resolving is a single lookup.
pub static COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("usa", "united states of america"),
    ("us", "united states of america"),
    ("u.s.", "united states of america"),
    ("u.s.a.", "united states of america"),
    ("united states", "united states of america"),
    ("america", "united states of america"),
    ("uk", "united kingdom"),
    ("u.k.", "united kingdom"),
    ("great britain", "united kingdom"),
    ("britain", "united kingdom"),
    ("england", "united kingdom"),
    ("scotland", "united kingdom"),
    ("wales", "united kingdom"),
    ("northern ireland", "united kingdom"),
    ("czechia", "czech republic"),
    ("holland", "netherlands"),
    ("the netherlands", "netherlands"),
    ("uae", "united arab emirates"),
    ("russian federation", "russia"),
    ("korea", "south korea"),
    ("republic of korea", "south korea"),
    ("viet nam", "vietnam"),
    ("burma", "myanmar"),
    ("turkiye", "turkey"),
    ("türkiye", "turkey"),
    ("ivory coast", "côte d'ivoire"),
    ("cote d'ivoire", "côte d'ivoire"),
    ("east timor", "timor-leste"),
    ("swaziland", "eswatini"),
    ("north macedonia", "macedonia"),
    ("bosnia", "bosnia and herz."),
    ("bosnia and herzegovina", "bosnia and herz."),
    ("dominican republic", "dominican rep."),
    ("central african republic", "central african rep."),
    ("democratic republic of the congo", "dem. rep. congo"),
    ("dr congo", "dem. rep. congo"),
    ("drc", "dem. rep. congo"),
    ("republic of the congo", "congo"),
    ("south sudan", "s. sudan"),
    ("equatorial guinea", "eq. guinea"),
    ("western sahara", "w. sahara"),
    ("solomon islands", "solomon is."),
    ("falkland islands", "falkland is."),
];

/// Canonical name for an author-entered or dataset country name.
pub fn resolve_country(name: &str) -> String {
    let normalized = normalize_country_name(name);
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(normalized)
}

/// Canonical names of every visited country.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    names: HashSet<String>,
}

impl VisitedSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| resolve_country(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Whether a dataset shape with this name is highlighted.
    pub fn contains_shape(&self, shape_name: &str) -> bool {
        self.names.contains(&resolve_country(shape_name))
    }

    pub fn contains_canonical(&self, canonical: &str) -> bool {
        self.names.contains(canonical)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
