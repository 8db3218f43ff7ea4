//! Marker vocabulary shared by every template

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a marker token in any style, capturing its name
pub(crate) static MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*([A-Z][A-Z0-9_]*)\*/|#([A-Z][A-Z0-9_]*)#|<!--([A-Z][A-Z0-9_]*)-->")
        .expect("Failed to compile marker regex")
});

/// Prefix of the closing marker of a region
pub const END_PREFIX: &str = "END_";

/// Comment syntax a marker is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    /// `/*NAME*/` in C++ sources and headers
    Block,
    /// `#NAME#` in CMake files
    Hash,
    /// `<!--NAME-->` in package manifests
    Xml,
}

impl MarkerStyle {
    /// Every style
    pub const ALL: [Self; 3] = [Self::Block, Self::Hash, Self::Xml];

    fn wrap(self, name: &str) -> String {
        match self {
            Self::Block => format!("/*{name}*/"),
            Self::Hash => format!("#{name}#"),
            Self::Xml => format!("<!--{name}-->"),
        }
    }
}

/// A single marker token: a region boundary or an anchor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    /// Comment syntax
    pub style: MarkerStyle,
    /// Upper-case name
    pub name: String,
}

impl Marker {
    /// Create a marker
    pub fn new(style: MarkerStyle, name: impl Into<String>) -> Self {
        Self {
            style,
            name: name.into(),
        }
    }

    /// `/*NAME*/`
    pub fn block(name: impl Into<String>) -> Self {
        Self::new(MarkerStyle::Block, name)
    }

    /// `#NAME#`
    pub fn hash(name: impl Into<String>) -> Self {
        Self::new(MarkerStyle::Hash, name)
    }

    /// `<!--NAME-->`
    pub fn xml(name: impl Into<String>) -> Self {
        Self::new(MarkerStyle::Xml, name)
    }

    /// Textual form of the marker
    #[must_use]
    pub fn token(&self) -> String {
        self.style.wrap(&self.name)
    }

    pub(crate) fn from_captures(captures: &regex::Captures<'_>) -> Option<Self> {
        MarkerStyle::ALL
            .into_iter()
            .zip(1..)
            .find_map(|(style, group)| {
                captures
                    .get(group)
                    .map(|name| Self::new(style, name.as_str()))
            })
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// A named region: `open`, content, `END_` close
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    /// Opening marker
    pub open: Marker,
    /// Closing marker
    pub close: Marker,
}

impl Region {
    /// Region `NAME` … `END_NAME` in one style
    pub fn new(style: MarkerStyle, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            close: Marker::new(style, format!("{END_PREFIX}{name}")),
            open: Marker::new(style, name),
        }
    }

    /// `/*NAME*/` … `/*END_NAME*/`
    pub fn block(name: impl Into<String>) -> Self {
        Self::new(MarkerStyle::Block, name)
    }

    /// `#NAME#` … `#END_NAME#`
    pub fn hash(name: impl Into<String>) -> Self {
        Self::new(MarkerStyle::Hash, name)
    }

    /// `<!--NAME-->` … `<!--END_NAME-->`
    pub fn xml(name: impl Into<String>) -> Self {
        Self::new(MarkerStyle::Xml, name)
    }

    /// The same region name in all three styles
    #[must_use]
    pub fn every_style(name: &str) -> [Self; 3] {
        MarkerStyle::ALL.map(|style| Self::new(style, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens() {
        assert_eq!(Marker::block("TICK").token(), "/*TICK*/");
        assert_eq!(Marker::hash("PACKAGE_LIST").token(), "#PACKAGE_LIST#");
        assert_eq!(Marker::xml("INTERFACE").to_string(), "<!--INTERFACE-->");

        let region = Region::block("HALT");
        assert_eq!(region.close.token(), "/*END_HALT*/");
    }

    #[test]
    fn test_pattern_recognizes_every_style() {
        let text = "a /*TICK*/ b #END_TICK# c <!--INTERFACE_LIST--> #include <x> /* note */";
        let found: Vec<Marker> = MARKER_PATTERN
            .captures_iter(text)
            .filter_map(|c| Marker::from_captures(&c))
            .collect();
        assert_eq!(
            found,
            vec![
                Marker::block("TICK"),
                Marker::hash("END_TICK"),
                Marker::xml("INTERFACE_LIST"),
            ]
        );
    }

    #[test]
    fn test_every_style() {
        let regions = Region::every_style("TICK_RESPONSE");
        assert_eq!(regions[0].open.token(), "/*TICK_RESPONSE*/");
        assert_eq!(regions[1].open.token(), "#TICK_RESPONSE#");
        assert_eq!(regions[2].close.token(), "<!--END_TICK_RESPONSE-->");
    }
}
