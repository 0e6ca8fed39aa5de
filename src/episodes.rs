//! Episode-number assignment heuristic.
//!
//! A season feed yields one entry per episode, each carrying a free-text
//! name label ("Show 1x03", "Episodio 4"). The label pattern is the source
//! of truth; entries without a recognizable label fall back to the next
//! sequential number. The fallback is best-effort only: unlabeled entries
//! arriving out of order will be misnumbered, so callers needing exact
//! placement should prefer labeled entries.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scrape::StreamLink;

static EPISODE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:x|episod(?:e|io)\s*)(\d+)").expect("valid episode pattern")
});

/// One scraped entry awaiting an episode number.
#[derive(Debug, Clone)]
pub struct EpisodeEntry {
    pub label: Option<String>,
    pub links: Vec<StreamLink>,
}

/// Extract an episode number from a name label, if the pattern matches.
#[must_use]
pub fn episode_number(label: &str) -> Option<u32> {
    EPISODE_LABEL
        .captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Assign entries to episode numbers.
///
/// Labeled entries take their captured number; unlabeled entries take the
/// next sequential number (1-based, continuing the count of episodes already
/// assigned). Entries landing on the same number append their links.
#[must_use]
pub fn assign_episodes(entries: Vec<EpisodeEntry>) -> BTreeMap<u32, Vec<StreamLink>> {
    let mut episodes: BTreeMap<u32, Vec<StreamLink>> = BTreeMap::new();

    for entry in entries {
        let number = entry
            .label
            .as_deref()
            .and_then(episode_number)
            .unwrap_or_else(|| episodes.len() as u32 + 1);
        episodes.entry(number).or_default().extend(entry.links);
    }

    episodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: Option<&str>) -> EpisodeEntry {
        EpisodeEntry {
            label: label.map(str::to_string),
            links: vec![StreamLink {
                server: "Voe".to_string(),
                url: format!("https://voe.sx/e/{}", label.unwrap_or("anon")),
                language: "Latino".to_string(),
            }],
        }
    }

    #[test]
    fn label_patterns() {
        assert_eq!(episode_number("Breaking Bad 1x03"), Some(3));
        assert_eq!(episode_number("Show 2X11"), Some(11));
        assert_eq!(episode_number("Episodio 4"), Some(4));
        assert_eq!(episode_number("EPISODE 12"), Some(12));
        assert_eq!(episode_number("Temporada final"), None);
    }

    #[test]
    fn labeled_then_unlabeled_continues_the_sequence() {
        let episodes = assign_episodes(vec![
            entry(Some("Show 1x01")),
            entry(Some("Show 1x02")),
            entry(None),
        ]);
        let numbers: Vec<u32> = episodes.keys().copied().collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_numbers_append_links() {
        let episodes = assign_episodes(vec![
            entry(Some("Show 1x01")),
            entry(Some("Show 1x01")),
        ]);
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[&1].len(), 2);
    }

    #[test]
    fn all_unlabeled_numbers_sequentially() {
        let episodes = assign_episodes(vec![entry(None), entry(None), entry(None)]);
        let numbers: Vec<u32> = episodes.keys().copied().collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
