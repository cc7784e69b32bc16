//! Slot Matchers
//!
//! Property keys are bound to schema slots by an ordered list of strategies; the
//! first strategy that returns a slot wins. Each strategy is a small `Matcher`
//! that can be exercised on its own.

use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;

use crate::schema::{MediaKind, MediaSlot, TextClassification, TextSlot};

// ═══════════════════════════════════════════════════════════════════════════════
// CORE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

pub trait NamedSlot {
    fn slot_name(&self) -> &str;
}

impl NamedSlot for TextSlot {
    fn slot_name(&self) -> &str {
        &self.name
    }
}

impl NamedSlot for MediaSlot {
    fn slot_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    Exact,
    Semantic,
    Substring,
    Legacy,
    Positional,
    MediaClassifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMatch {
    pub index: usize,
    pub strategy: MatchStrategy,
}

pub trait Matcher<S>: Send + Sync {
    fn strategy(&self) -> MatchStrategy;

    /// Index of the matching candidate, if any.
    fn find(&self, key: &str, candidates: &[S]) -> Option<usize>;
}

/// First-match-wins composition of matchers.
pub struct MatcherChain<S> {
    matchers: Vec<Box<dyn Matcher<S>>>,
}

impl<S> MatcherChain<S> {
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    pub fn with(mut self, matcher: impl Matcher<S> + 'static) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    pub fn first_match(&self, key: &str, candidates: &[S]) -> Option<SlotMatch> {
        if candidates.is_empty() {
            return None;
        }
        self.matchers.iter().find_map(|m| {
            m.find(key, candidates).map(|index| SlotMatch {
                index,
                strategy: m.strategy(),
            })
        })
    }
}

impl<S> Default for MatcherChain<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact, semantic, substring, legacy, positional.
pub fn text_chain() -> MatcherChain<TextSlot> {
    MatcherChain::new()
        .with(ExactNameMatcher)
        .with(SemanticClassMatcher)
        .with(SubstringMatcher)
        .with(LegacyAliasMatcher)
        .with(PositionalMatcher)
}

/// Exact, substring, semantic media classification.
pub fn media_chain() -> MatcherChain<MediaSlot> {
    MatcherChain::new()
        .with(ExactNameMatcher)
        .with(SubstringMatcher)
        .with(MediaClassifierMatcher)
}

/// Lowercase, with whitespace and underscores collapsed to single hyphens.
pub fn normalize_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for c in s.trim().chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            pending_sep = !out.is_empty();
        } else {
            if pending_sep {
                out.push('-');
                pending_sep = false;
            }
            out.extend(c.to_lowercase());
        }
    }
    out
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYWORD TABLES
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref SEMANTIC_CLASSES: HashMap<&'static str, Vec<TextClassification>> = {
        use TextClassification::*;
        let mut m = HashMap::new();
        m.insert("primary-text", vec![Primary]);
        m.insert("secondary-text", vec![Secondary]);
        m.insert("tertiary-text", vec![Tertiary]);
        for key in ["headline", "title", "content", "text"] {
            m.insert(key, vec![Primary, Secondary]);
        }
        for key in ["supporting-text", "supporting", "subtitle"] {
            m.insert(key, vec![Secondary, Tertiary]);
        }
        for key in ["trailing-text", "trailing"] {
            m.insert(key, vec![Tertiary, Secondary]);
        }
        for key in ["caption", "overline"] {
            m.insert(key, vec![Tertiary]);
        }
        m
    };
    static ref LEGACY_ALIASES: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        for key in ["content", "headline", "text"] {
            m.insert(key, vec!["headline", "title", "text", "label"]);
        }
        for key in ["supporting-text", "supporting"] {
            m.insert(key, vec!["supporting", "subtitle", "description", "body"]);
        }
        for key in ["trailing-text", "trailing"] {
            m.insert(key, vec!["trailing", "value", "action", "status", "end"]);
        }
        m.insert("title", vec!["title", "headline", "text"]);
        m.insert("subtitle", vec!["subtitle", "supporting", "description"]);
        m
    };
}

pub(crate) const LEADING_WORDS: &[&str] = &["leading", "start", "left", "first", "begin"];
pub(crate) const TRAILING_WORDS: &[&str] = &["trailing", "end", "right", "last", "final"];

// ═══════════════════════════════════════════════════════════════════════════════
// GENERIC STRATEGIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Slot name equals the key, ignoring case and spacing.
pub struct ExactNameMatcher;

impl<S: NamedSlot> Matcher<S> for ExactNameMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Exact
    }

    fn find(&self, key: &str, candidates: &[S]) -> Option<usize> {
        let key = normalize_key(key);
        candidates
            .iter()
            .position(|s| normalize_key(s.slot_name()) == key)
    }
}

/// Key contained in the slot name or the other way round.
pub struct SubstringMatcher;

impl<S: NamedSlot> Matcher<S> for SubstringMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Substring
    }

    fn find(&self, key: &str, candidates: &[S]) -> Option<usize> {
        let key = normalize_key(key);
        if key.is_empty() {
            return None;
        }
        candidates.iter().position(|s| {
            let name = normalize_key(s.slot_name());
            !name.is_empty() && (name.contains(&key) || key.contains(&name))
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT STRATEGIES
// ═══════════════════════════════════════════════════════════════════════════════

pub struct SemanticClassMatcher;

impl Matcher<TextSlot> for SemanticClassMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Semantic
    }

    fn find(&self, key: &str, candidates: &[TextSlot]) -> Option<usize> {
        let classes = SEMANTIC_CLASSES.get(normalize_key(key).as_str())?;
        classes
            .iter()
            .find_map(|class| candidates.iter().position(|s| s.classification == *class))
    }
}

pub struct LegacyAliasMatcher;

impl Matcher<TextSlot> for LegacyAliasMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Legacy
    }

    fn find(&self, key: &str, candidates: &[TextSlot]) -> Option<usize> {
        let key = normalize_key(key);
        let own = [key.as_str()];
        let targets: &[&str] = match LEGACY_ALIASES.get(key.as_str()) {
            Some(aliases) => aliases,
            None => &own,
        };
        targets.iter().find_map(|target| {
            candidates
                .iter()
                .position(|s| normalize_key(&s.name).contains(target))
        })
    }
}

pub struct PositionalMatcher;

impl Matcher<TextSlot> for PositionalMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Positional
    }

    fn find(&self, key: &str, candidates: &[TextSlot]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let key = key.to_lowercase();
        if contains_any(&key, &["headline", "title", "primary"]) {
            Some(0)
        } else if contains_any(&key, &["trailing", "tertiary"]) {
            Some(candidates.len() - 1)
        } else if contains_any(&key, &["supporting", "secondary"]) {
            Some(if candidates.len() > 1 { 1 } else { 0 })
        } else {
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEDIA CLASSIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Media slot indices grouped by what the slot name suggests it holds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MediaBuckets {
    pub avatars: Vec<usize>,
    pub icons: Vec<usize>,
    pub badges: Vec<usize>,
    pub logos: Vec<usize>,
    pub vectors: Vec<usize>,
    pub images: Vec<usize>,
    pub small_images: Vec<usize>,
    pub large_images: Vec<usize>,
    pub circles: Vec<usize>,
    pub rectangles: Vec<usize>,
}

pub fn classify_media_slots(slots: &[MediaSlot]) -> MediaBuckets {
    let mut b = MediaBuckets::default();
    for (i, slot) in slots.iter().enumerate() {
        let name = slot.name.to_lowercase();
        let mut categorized = false;

        if contains_any(&name, &["avatar", "profile", "user"]) {
            b.avatars.push(i);
            b.circles.push(i);
            categorized = true;
        }
        if contains_any(&name, &["icon", "symbol"]) {
            b.icons.push(i);
            categorized = true;
        }
        if contains_any(&name, &["badge", "indicator", "dot", "status"]) {
            b.badges.push(i);
            categorized = true;
        }
        if contains_any(&name, &["logo", "brand"]) {
            b.logos.push(i);
            categorized = true;
        }

        match slot.kind {
            MediaKind::Vector => {
                b.vectors.push(i);
                if name.chars().count() < 10 && !b.icons.contains(&i) {
                    b.icons.push(i);
                }
            }
            MediaKind::Image => {
                b.images.push(i);
                if contains_any(&name, &["small", "thumb", "mini"]) {
                    b.small_images.push(i);
                }
                if contains_any(&name, &["large", "cover", "hero", "banner"]) {
                    b.large_images.push(i);
                }
                if contains_any(&name, &["circle", "round"]) {
                    if !b.circles.contains(&i) {
                        b.circles.push(i);
                    }
                } else {
                    b.rectangles.push(i);
                }
            }
            MediaKind::ComponentInstance => {
                if !categorized {
                    b.images.push(i);
                }
            }
        }
    }
    b
}

fn find_by_position(slots: &[MediaSlot], words: &[&str]) -> Option<usize> {
    slots
        .iter()
        .position(|s| contains_any(&s.name.to_lowercase(), words))
}

fn first_of(groups: &[&Vec<usize>]) -> Option<usize> {
    groups.iter().find_map(|g| g.first().copied())
}

/// Matches property keywords against classified media buckets, trying position
/// words before content words.
pub struct MediaClassifierMatcher;

impl Matcher<MediaSlot> for MediaClassifierMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::MediaClassifier
    }

    fn find(&self, key: &str, candidates: &[MediaSlot]) -> Option<usize> {
        let key = key.to_lowercase();
        let b = classify_media_slots(candidates);

        let leading = contains_any(&key, &["leading", "start", "left"]);
        let trailing = contains_any(&key, &["trailing", "end", "right"]);
        if leading {
            if let Some(i) = find_by_position(candidates, LEADING_WORDS) {
                return Some(i);
            }
        }
        if trailing {
            if let Some(i) = find_by_position(candidates, TRAILING_WORDS) {
                return Some(i);
            }
        }

        if contains_any(&key, &["avatar", "profile", "user"]) {
            first_of(&[&b.avatars, &b.images, &b.circles])
        } else if contains_any(&key, &["image", "photo", "picture"]) {
            first_of(&[&b.images, &b.rectangles, &b.avatars])
        } else if contains_any(&key, &["logo", "brand"]) {
            first_of(&[&b.logos, &b.vectors, &b.images])
        } else if contains_any(&key, &["badge", "indicator", "status"]) {
            first_of(&[&b.badges, &b.small_images, &b.vectors])
        } else if contains_any(&key, &["large", "big", "cover"]) {
            first_of(&[&b.large_images, &b.images])
        } else if contains_any(&key, &["small", "mini", "thumb"]) {
            first_of(&[&b.small_images, &b.icons, &b.vectors])
        } else if key.contains("icon") || leading || trailing {
            first_of(&[&b.icons, &b.vectors])
        } else {
            None
        }
    }
}
