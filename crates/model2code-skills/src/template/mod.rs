//! Template section engine
//!
//! Template text is parsed once into a sequence of literal text and marker
//! segments. Every operation then works on markers as values, so inserted
//! payloads are never searched as raw text and a marker token can only
//! survive rendering if no operation removed it.
//!
//! Insertions after an anchor are tracked per anchor: each anchor remembers
//! how many segments were placed after it, so repeated insertions append in
//! call order.

mod marker;

use std::fmt;

use tracing::{debug, warn};

pub use marker::{END_PREFIX, Marker, MarkerStyle, Region};
pub(crate) use marker::MARKER_PATTERN;

/// One parsed piece of template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text
    Text(String),
    /// A marker token
    Marker(Marker),
}

/// Parsed template text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    /// For each segment, how many following segments were inserted after it
    runs: Vec<usize>,
}

impl Template {
    /// Parse text into segments
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let segments = parse_segments(text);
        let runs = vec![0; segments.len()];
        Self { segments, runs }
    }

    /// Parsed segments in order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Every marker still present, in order
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Marker(marker) => Some(marker),
            Segment::Text(_) => None,
        })
    }

    /// Whether a marker is present
    #[must_use]
    pub fn contains_marker(&self, marker: &Marker) -> bool {
        self.markers().any(|m| m == marker)
    }

    /// Whether the rendered text contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.render().contains(needle)
    }

    /// Render back to text
    #[must_use]
    pub fn render(&self) -> String {
        render_segments(&self.segments)
    }

    /// Content of the first occurrence of a region, without its markers
    ///
    /// The close is the first one after the open. Returns `None` when either
    /// marker is missing.
    #[must_use]
    pub fn extract(&self, region: &Region) -> Option<String> {
        let open = self.position(&region.open, 0)?;
        let close = self.position(&region.close, open + 1)?;
        Some(render_segments(&self.segments[open + 1..close]))
    }

    /// Remove the region markers everywhere, keeping their content
    pub fn keep(&mut self, region: &Region) {
        self.remove_where(|marker| *marker == region.open || *marker == region.close);
    }

    /// Remove every occurrence of a region together with its content
    ///
    /// An open marker with no close after it is removed on its own, as is a
    /// close marker with no open before it.
    pub fn delete(&mut self, region: &Region) {
        while let Some(open) = self.position(&region.open, 0) {
            match self.position(&region.close, open + 1) {
                Some(close) => {
                    for index in (open..=close).rev() {
                        self.remove_segment(index);
                    }
                }
                None => {
                    warn!(marker = %region.open, "region has no closing marker, removing marker only");
                    self.remove_segment(open);
                }
            }
        }
        if self.contains_marker(&region.close) {
            warn!(marker = %region.close, "closing marker without opening marker");
            self.remove_where(|marker| *marker == region.close);
        }
    }

    /// Keep or delete a region
    pub fn toggle(&mut self, region: &Region, keep: bool) {
        if keep {
            self.keep(region);
        } else {
            self.delete(region);
        }
    }

    /// Insert `payload` after every occurrence of `anchor`
    ///
    /// Content already inserted at an anchor stays before the new payload.
    /// Markers inside the payload become part of the template but are not
    /// matched by this call. Returns the number of anchors written to.
    pub fn insert_after(&mut self, anchor: &Marker, payload: &str) -> usize {
        let payload = parse_segments(payload);
        let occurrences: Vec<usize> = self.positions(anchor).collect();

        for &index in occurrences.iter().rev() {
            let at = index + 1 + self.runs[index];
            let count = payload.len();
            for owner in 0..self.segments.len() {
                let covers = owner < index && index <= owner + self.runs[owner];
                if owner == index || covers {
                    self.runs[owner] += count;
                }
            }
            self.segments.splice(at..at, payload.iter().cloned());
            self.runs.splice(at..at, std::iter::repeat_n(0, count));
        }

        if occurrences.is_empty() {
            debug!(anchor = %anchor, "anchor not present");
        }
        occurrences.len()
    }

    /// Remove every occurrence of an anchor
    pub fn clear_anchor(&mut self, anchor: &Marker) -> usize {
        self.remove_where(|marker| marker == anchor)
    }

    fn position(&self, marker: &Marker, from: usize) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(index, segment)| match segment {
                Segment::Marker(m) if m == marker => Some(index),
                _ => None,
            })
    }

    fn positions<'a>(&'a self, marker: &'a Marker) -> impl Iterator<Item = usize> + 'a {
        self.segments
            .iter()
            .enumerate()
            .filter_map(move |(index, segment)| match segment {
                Segment::Marker(m) if m == marker => Some(index),
                _ => None,
            })
    }

    fn remove_where(&mut self, predicate: impl Fn(&Marker) -> bool) -> usize {
        let doomed: Vec<usize> = self
            .segments
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| match segment {
                Segment::Marker(m) if predicate(m) => Some(index),
                _ => None,
            })
            .collect();
        for &index in doomed.iter().rev() {
            self.remove_segment(index);
        }
        doomed.len()
    }

    fn remove_segment(&mut self, index: usize) {
        for owner in 0..index {
            if owner + self.runs[owner] >= index {
                self.runs[owner] -= 1;
            }
        }
        self.segments.remove(index);
        self.runs.remove(index);
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => f.write_str(text)?,
                Segment::Marker(marker) => write!(f, "{marker}")?,
            }
        }
        Ok(())
    }
}

fn parse_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for captures in MARKER_PATTERN.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(marker) = Marker::from_captures(&captures) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(text[last..whole.start()].to_string()));
        }
        segments.push(Segment::Marker(marker));
        last = whole.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(text[last..].to_string()));
    }
    segments
}

fn render_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Marker(marker) => out.push_str(&marker.token()),
        }
    }
    out
}
