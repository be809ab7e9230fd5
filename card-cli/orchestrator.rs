//! Pairwise "do these two cards share a symbol" loop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use card_detect::{Card, CardDetector, ContourRegion, NormalizedCard};
use card_features::{DescriptorSet, SymbolMatcher};
use image::GrayImage;
use log::{debug, info};
use rayon::prelude::*;

use crate::config::{PairScope, StopPolicy};
use crate::visualize::{NullVisualizer, Visualizer};

/// Segmented objects of one card and their descriptors, index-aligned
#[derive(Debug, Clone)]
pub struct CardFeatures {
    /// Position of the card in the compared sequence
    pub card: usize,
    pub objects: Vec<ContourRegion>,
    pub descriptors: Vec<DescriptorSet>,
}

/// Two cards sharing a symbol, with the object pair that proved it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardPairMatch {
    pub card_a: usize,
    pub card_b: usize,
    pub object_a: usize,
    pub object_b: usize,
    pub good_matches: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonReport {
    /// In card-pair order
    pub matches: Vec<CardPairMatch>,
    pub pairs_compared: usize,
    /// The deadline passed before every pair was visited
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Nothing to compare
    NoCards,
    /// Segmentation found nothing on this card; the batch was abandoned
    NoSymbols { card: usize },
    Compared(ComparisonReport),
}

impl BatchOutcome {
    pub fn matches(&self) -> &[CardPairMatch] {
        match self {
            BatchOutcome::Compared(report) => &report.matches,
            _ => &[],
        }
    }
}

pub struct ComparisonOrchestrator {
    detector: CardDetector,
    matcher: SymbolMatcher,
    stop_policy: StopPolicy,
    pair_scope: PairScope,
    parallel: bool,
    deadline: Option<Duration>,
    visualizer: Box<dyn Visualizer>,
}

impl ComparisonOrchestrator {
    pub fn new(detector: CardDetector, matcher: SymbolMatcher) -> Self {
        Self {
            detector,
            matcher,
            stop_policy: StopPolicy::default(),
            pair_scope: PairScope::default(),
            parallel: false,
            deadline: None,
            visualizer: Box::new(NullVisualizer),
        }
    }

    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    pub fn with_pair_scope(mut self, scope: PairScope) -> Self {
        self.pair_scope = scope;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Budget for one `compare_all` call
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_visualizer(mut self, visualizer: Box<dyn Visualizer>) -> Self {
        self.visualizer = visualizer;
        self
    }

    pub fn detector(&self) -> &CardDetector {
        &self.detector
    }

    pub fn matcher(&self) -> &SymbolMatcher {
        &self.matcher
    }

    /// Forward located cards to the visualizer when verbose
    pub fn show_cards(&self, label: &str, image: &GrayImage, cards: &[Card]) {
        if self.detector.config().verbose {
            self.visualizer.show_cards(label, image, cards);
        }
    }

    /// Segment one card and describe each of its objects
    pub fn prepare_card(&self, position: usize, card: &NormalizedCard) -> CardFeatures {
        let objects = self.detector.extract_objects(card);
        let descriptors = objects
            .iter()
            .map(|region| {
                self.detector
                    .get_object(card, region)
                    .map(|crop| self.matcher.describe(&crop))
                    .unwrap_or_default()
            })
            .collect();
        CardFeatures {
            card: position,
            objects,
            descriptors,
        }
    }

    fn prepare_all(&self, label: &str, cards: &[NormalizedCard]) -> Vec<CardFeatures> {
        let features: Vec<CardFeatures> = if self.parallel {
            cards
                .par_iter()
                .enumerate()
                .map(|(i, card)| self.prepare_card(i, card))
                .collect()
        } else {
            cards
                .iter()
                .enumerate()
                .map(|(i, card)| self.prepare_card(i, card))
                .collect()
        };
        if self.detector.config().verbose {
            for (card, f) in cards.iter().zip(&features) {
                self.visualizer
                    .show_objects(&format!("{}_card{:02}", label, f.card), card, &f.objects);
            }
        }
        features
    }

    /// First object pair showing that `a` and `b` share a symbol. Objects of
    /// `a` are indexed, objects of `b` are the queries.
    pub fn compare_cards(&self, a: &CardFeatures, b: &CardFeatures) -> Option<CardPairMatch> {
        let start = Instant::now();
        let mut found = None;
        'outer: for (object_a, desc_a) in a.descriptors.iter().enumerate() {
            if desc_a.is_empty() {
                continue;
            }
            for (object_b, desc_b) in b.descriptors.iter().enumerate() {
                let verdict = self.matcher.match_descriptors(desc_a, desc_b);
                if verdict.is_match {
                    info!(
                        "Match found between object {} on card {} and object {} on card {}",
                        object_a, a.card, object_b, b.card
                    );
                    found = Some(CardPairMatch {
                        card_a: a.card,
                        card_b: b.card,
                        object_a,
                        object_b,
                        good_matches: verdict.good_matches,
                    });
                    break 'outer;
                }
            }
        }
        debug!(
            "Compare two cards ({} vs {}): {:.2?}",
            a.card,
            b.card,
            start.elapsed()
        );
        found
    }

    /// Card index pairs visited for `n` cards, in visiting order
    pub fn card_pairs(&self, n: usize) -> Vec<(usize, usize)> {
        match self.pair_scope {
            PairScope::AllPairs => (0..n)
                .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
                .collect(),
            PairScope::Adjacent => (1..n).map(|j| (j - 1, j)).collect(),
        }
    }

    /// Compare the cards of one batch. `label` names the batch in debug
    /// output.
    pub fn compare_all(&self, label: &str, cards: &[NormalizedCard]) -> BatchOutcome {
        if cards.is_empty() {
            info!("No cards found");
            return BatchOutcome::NoCards;
        }
        let deadline = self.deadline.map(|d| Instant::now() + d);

        let features = self.prepare_all(label, cards);
        if let Some(empty) = features.iter().find(|f| f.objects.is_empty()) {
            info!("No symbols found on card {}", empty.card);
            return BatchOutcome::NoSymbols { card: empty.card };
        }

        let pairs = self.card_pairs(features.len());
        let report = if self.parallel {
            self.compare_pairs_parallel(&features, &pairs, deadline)
        } else {
            self.compare_pairs(&features, &pairs, deadline)
        };
        if report.timed_out {
            info!(
                "Deadline reached after {} of {} card pair(s)",
                report.pairs_compared,
                pairs.len()
            );
        }
        BatchOutcome::Compared(report)
    }

    fn compare_pairs(
        &self,
        features: &[CardFeatures],
        pairs: &[(usize, usize)],
        deadline: Option<Instant>,
    ) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        for &(i, j) in pairs {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                report.timed_out = true;
                break;
            }
            report.pairs_compared += 1;
            if let Some(m) = self.compare_cards(&features[i], &features[j]) {
                report.matches.push(m);
                if self.stop_policy == StopPolicy::FirstMatch {
                    break;
                }
            }
        }
        report
    }

    fn compare_pairs_parallel(
        &self,
        features: &[CardFeatures],
        pairs: &[(usize, usize)],
        deadline: Option<Instant>,
    ) -> ComparisonReport {
        let compared = AtomicUsize::new(0);
        let timed_out = AtomicBool::new(false);

        let visit = |&(i, j): &(usize, usize)| -> Option<CardPairMatch> {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                timed_out.store(true, Ordering::Relaxed);
                return None;
            }
            compared.fetch_add(1, Ordering::Relaxed);
            self.compare_cards(&features[i], &features[j])
        };

        let matches: Vec<CardPairMatch> = match self.stop_policy {
            StopPolicy::FirstMatch => pairs.par_iter().find_map_first(visit).into_iter().collect(),
            StopPolicy::Exhaustive => pairs.par_iter().filter_map(visit).collect(),
        };

        ComparisonReport {
            matches,
            pairs_compared: compared.into_inner(),
            timed_out: timed_out.into_inner(),
        }
    }
}
