//! Directory-level driver: list images, load them, run the comparison loop.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use card_detect::{CardDetectorBuilder, NormalizedCard};
use card_features::SymbolMatcher;
use image::GrayImage;
use log::{info, warn};

use crate::config::{BatchScope, FileSelection, RunConfig};
use crate::error::{BatchError, BatchResult};
use crate::orchestrator::{BatchOutcome, ComparisonOrchestrator};
use crate::visualize::{NullVisualizer, OverlayVisualizer, Visualizer};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "tif"];

/// Where a compared card came from
#[derive(Debug, Clone, PartialEq)]
pub struct CardOrigin {
    pub image: PathBuf,
    /// Card position within its own image
    pub card: usize,
}

/// Result of one comparison batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub label: String,
    /// Indexed by the card positions used in `outcome`
    pub origins: Vec<CardOrigin>,
    pub outcome: BatchOutcome,
}

/// Image files directly inside `dir`, sorted by name
pub fn list_images(dir: &Path) -> BatchResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(BatchError::PathNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(BatchError::NoImages(dir.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Decode any supported image file to 8-bit grayscale
pub fn load_grayscale(path: &Path) -> BatchResult<GrayImage> {
    let img = image::open(path).map_err(|source| BatchError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_luma8())
}

pub struct BatchRunner {
    cfg: RunConfig,
    orchestrator: ComparisonOrchestrator,
}

impl BatchRunner {
    pub fn new(cfg: RunConfig) -> BatchResult<Self> {
        cfg.validate()?;
        let detector = CardDetectorBuilder::from_config(cfg.pipeline.clone())
            .locator(cfg.locator.clone())
            .segmenter(cfg.segmenter.clone())
            .build()?;
        let matcher = SymbolMatcher::new(cfg.matcher_config())?;
        let orchestrator = ComparisonOrchestrator::new(detector, matcher)
            .with_stop_policy(cfg.orchestrator.stop_policy)
            .with_pair_scope(cfg.orchestrator.pair_scope)
            .with_parallel(cfg.orchestrator.parallel)
            .with_deadline(cfg.orchestrator.deadline())
            .with_visualizer(Self::visualizer(&cfg)?);
        info!("{}", orchestrator.detector().summary());
        Ok(Self { cfg, orchestrator })
    }

    fn visualizer(cfg: &RunConfig) -> BatchResult<Box<dyn Visualizer>> {
        match (&cfg.orchestrator.debug_dir, cfg.pipeline.verbose) {
            (Some(dir), true) => Ok(Box::new(OverlayVisualizer::new(dir)?)),
            (Some(_), false) => {
                warn!("Debug directory ignored without verbose output");
                Ok(Box::new(NullVisualizer))
            }
            (None, _) => Ok(Box::new(NullVisualizer)),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn orchestrator(&self) -> &ComparisonOrchestrator {
        &self.orchestrator
    }

    /// Files of `dir` picked by the configured selection
    pub fn select_files(&self, dir: &Path) -> BatchResult<Vec<PathBuf>> {
        let files = list_images(dir)?;
        match self.cfg.orchestrator.file_selection {
            FileSelection::All => Ok(files),
            FileSelection::Single(index) => match files.get(index) {
                Some(path) => Ok(vec![path.clone()]),
                None => Err(BatchError::FileIndexOutOfRange {
                    index,
                    count: files.len(),
                }),
            },
        }
    }

    pub fn run(&self, dir: &Path) -> BatchResult<Vec<BatchReport>> {
        let files = self.select_files(dir)?;
        match self.cfg.orchestrator.batch_scope {
            BatchScope::PerImage => {
                let mut reports = Vec::with_capacity(files.len());
                for path in &files {
                    if let Some(cards) = self.load_cards_or_skip(path)? {
                        reports.push(self.run_image(path, &cards));
                    }
                }
                Ok(reports)
            }
            BatchScope::AcrossImages => Ok(vec![self.run_pooled(&files)?]),
        }
    }

    /// Locate and normalize the cards of one file
    pub fn load_cards(&self, path: &Path) -> BatchResult<Vec<NormalizedCard>> {
        info!("Open file {}", path.display());
        let img = load_grayscale(path)?;
        let detector = self.orchestrator.detector();
        let cards = detector.detect_cards(&img);
        self.orchestrator.show_cards(&file_label(path), &img, &cards);
        Ok(detector.uniform_size(&cards))
    }

    /// Undecodable files are logged and skipped so the rest of the batch
    /// still reports
    fn load_cards_or_skip(&self, path: &Path) -> BatchResult<Option<Vec<NormalizedCard>>> {
        match self.load_cards(path) {
            Ok(cards) => Ok(Some(cards)),
            Err(e @ BatchError::ImageLoad { .. }) => {
                warn!("Skipping file: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn run_image(&self, path: &Path, cards: &[NormalizedCard]) -> BatchReport {
        let label = file_label(path);
        let origins = (0..cards.len())
            .map(|card| CardOrigin {
                image: path.to_path_buf(),
                card,
            })
            .collect();
        let outcome = self.orchestrator.compare_all(&label, cards);
        BatchReport {
            label,
            origins,
            outcome,
        }
    }

    fn run_pooled(&self, files: &[PathBuf]) -> BatchResult<BatchReport> {
        let mut pooled = Vec::new();
        let mut origins = Vec::new();
        for path in files {
            let Some(cards) = self.load_cards_or_skip(path)? else {
                continue;
            };
            for (card, normalized) in cards.into_iter().enumerate() {
                origins.push(CardOrigin {
                    image: path.clone(),
                    card,
                });
                pooled.push(normalized);
            }
        }
        let label = "all_images".to_string();
        let outcome = self.orchestrator.compare_all(&label, &pooled);
        Ok(BatchReport {
            label,
            origins,
            outcome,
        })
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable summary of one report, one line per fact
pub fn format_report(report: &BatchReport) -> String {
    let mut out = String::new();
    let n = report.origins.len();
    match &report.outcome {
        BatchOutcome::NoCards => {
            let _ = write!(out, "{}: no cards found", report.label);
        }
        BatchOutcome::NoSymbols { card } => {
            let _ = write!(out, "{}: {} card(s), no symbols on {}", report.label, n, describe_card(report, *card));
        }
        BatchOutcome::Compared(cmp) => {
            let _ = write!(
                out,
                "{}: {} card(s), {} matching pair(s) in {} compared",
                report.label,
                n,
                cmp.matches.len(),
                cmp.pairs_compared
            );
            if cmp.timed_out {
                out.push_str(" (deadline reached)");
            }
            for m in &cmp.matches {
                let _ = write!(
                    out,
                    "\n  {} object {} <-> {} object {} ({} good matches)",
                    describe_card(report, m.card_a),
                    m.object_a,
                    describe_card(report, m.card_b),
                    m.object_b,
                    m.good_matches
                );
            }
        }
    }
    out
}

fn describe_card(report: &BatchReport, position: usize) -> String {
    match report.origins.get(position) {
        Some(origin) => format!("{} card {}", file_label(&origin.image), origin.card),
        None => format!("card {}", position),
    }
}
