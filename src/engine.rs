use crate::config::Config;
use crate::decoder::{contains_escape, decode_all};
use log::{debug, info};
use std::collections::HashSet;
use std::hash::Hash;

/// One rendered line of code in the host page.
pub trait CodeLine {
    /// Plain-text content, `None` when the node has none.
    fn text(&self) -> Option<String>;
    /// Replaces the node's whole content with `text`.
    fn replace_text(&self, text: &str);
    fn add_class(&self, class: &str);
}

/// The document the engine scans.
pub trait Page {
    type Line: CodeLine;

    /// Every line currently matching `selector`, in document order.
    fn query_lines(&self, selector: &str) -> Vec<Self::Line>;
}

/// Identity-keyed record of lines that were already converted.
pub trait ProcessedSet<L> {
    fn contains(&self, line: &L) -> bool;
    fn insert(&mut self, line: &L);
}

impl<L: Clone + Eq + Hash> ProcessedSet<L> for HashSet<L> {
    fn contains(&self, line: &L) -> bool {
        HashSet::contains(self, line)
    }

    fn insert(&mut self, line: &L) {
        HashSet::insert(self, line.clone());
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub candidates: usize,
    pub converted: usize,
    pub already_processed: usize,
    pub empty: usize,
    pub unmatched: usize,
    pub substitutions: usize,
}

impl ScanReport {
    pub fn changed_anything(&self) -> bool {
        self.converted > 0
    }
}

pub struct ConversionEngine<M> {
    enabled: bool,
    selector: String,
    marker_class: String,
    processed: M,
}

impl<M> ConversionEngine<M> {
    pub fn new(config: &Config, enabled: bool, processed: M) -> Self {
        Self {
            enabled,
            selector: config.candidate_selector(),
            marker_class: config.marker_class.clone(),
            processed,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn processed(&self) -> &M {
        &self.processed
    }

    /// Re-queries every candidate line in `page` and converts it.
    ///
    /// Does not touch the page at all while disabled.
    pub fn scan<P>(&mut self, page: &P) -> ScanReport
    where
        P: Page,
        M: ProcessedSet<P::Line>,
    {
        if !self.enabled {
            return ScanReport::default();
        }
        let lines = page.query_lines(&self.selector);
        self.convert(lines)
    }

    pub fn convert<L, I>(&mut self, lines: I) -> ScanReport
    where
        L: CodeLine,
        I: IntoIterator<Item = L>,
        M: ProcessedSet<L>,
    {
        let mut report = ScanReport::default();
        if !self.enabled {
            return report;
        }
        for line in lines {
            report.candidates += 1;
            self.convert_line(&line, &mut report);
        }
        if report.changed_anything() {
            debug!(
                "scan converted {} of {} lines ({} substitutions)",
                report.converted, report.candidates, report.substitutions
            );
        }
        report
    }

    fn convert_line<L>(&mut self, line: &L, report: &mut ScanReport)
    where
        L: CodeLine,
        M: ProcessedSet<L>,
    {
        if self.processed.contains(line) {
            report.already_processed += 1;
            return;
        }
        let Some(original) = line.text().filter(|text| !text.is_empty()) else {
            report.empty += 1;
            return;
        };
        // Lines without escapes stay eligible: a re-render may add some later.
        if !contains_escape(&original) {
            report.unmatched += 1;
            return;
        }

        let converted = decode_all(&original, |token, ch| {
            report.substitutions += 1;
            info!("converted {token} to {ch}");
        });
        line.replace_text(&converted);
        line.add_class(&self.marker_class);
        self.processed.insert(line);
        report.converted += 1;
    }
}
