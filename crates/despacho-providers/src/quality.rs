//! Heuristic text-quality scoring
//!
//! Runs synchronously and cheaply before the orchestrator decides whether to
//! pay for a fallback provider, so the signals are structural, not ML-based:
//! line density, allow-listed character ratio, real-word ratio, and markup
//! density, combined as a weighted sum with bounded bonuses.
//!
//! The weights and bonuses are tunable configuration. They are not
//! calibrated against ground truth; treat them as knobs, not constants.

use despacho_domain::Quality;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Target mean characters per line for well-extracted prose
const IDEAL_CHARS_PER_LINE: f64 = 60.0;

/// Lines shorter than this count as noise for the line-length signal
const MIN_LINE_LEN: usize = 4;

/// Target real words per line
const WORDS_PER_LINE_TARGET: f64 = 5.0;

/// Floor applied when the source carries a native text layer
const NATIVE_TEXT_FLOOR: f64 = 0.4;

/// Cap on the structural-enrichment bonus
const ENRICHMENT_BONUS_CAP: f64 = 0.25;

/// Bonus per detected enrichment kind (tables, figures, multi-page)
const ENRICHMENT_BONUS_STEP: f64 = 0.08;

/// Structural signals reported by a provider alongside the text
#[derive(Debug, Clone, Copy, Default)]
pub struct Enrichment {
    /// Pages processed
    pub pages: usize,
    /// Structured tables detected
    pub tables: usize,
    /// Figures/images detected
    pub figures: usize,
}

impl Enrichment {
    /// Number of enrichment kinds present (multi-page counts as one kind)
    pub fn kinds(&self) -> usize {
        usize::from(self.tables > 0) + usize::from(self.figures > 0) + usize::from(self.pages > 1)
    }
}

/// Relative weights of the scoring signals; must be tuned together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Mean chars-per-line against the ideal target
    pub line_density: f64,
    /// Ratio of characters in the multilingual allow-list
    pub valid_chars: f64,
    /// Ratio of lines meeting the minimum length
    pub line_length: f64,
    /// Real words per line
    pub real_words: f64,
    /// Structural markup density (headers, tables, emphasis)
    pub structure: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            line_density: 0.20,
            valid_chars: 0.25,
            line_length: 0.10,
            real_words: 0.25,
            structure: 0.20,
        }
    }
}

/// Heuristic scorer for extracted text
pub struct QualityScorer {
    weights: ScoreWeights,
    valid_char: Regex,
    real_word: Regex,
}

impl QualityScorer {
    /// Create a scorer with the given weights
    pub fn new(weights: ScoreWeights) -> Self {
        // Latin letters with Portuguese diacritics, digits, punctuation and
        // the markup characters providers emit in markdown-flavoured output.
        let valid_char = Regex::new(
            r#"[a-zA-Z0-9áàâãéèêíìîóòôõúùûçÁÀÂÃÉÈÊÍÌÎÓÒÔÕÚÙÛÇñüß\s.,;:!?\-()\[\]{}#*|_=+@$%&<>"'/\\]"#,
        )
        .expect("static character-class regex");
        let real_word = Regex::new(r"\b[a-zA-ZáàâãéèêíìîóòôõúùûçÁÀÂÃÉÈÊÍÌÎÓÒÔÕÚÙÛÇñüß]{2,}\b")
            .expect("static word regex");

        Self {
            weights,
            valid_char,
            real_word,
        }
    }

    /// Score extracted text.
    ///
    /// - `enrichment`: structural signals from the provider, when available
    /// - `extension`: source format (".pdf", ".docx", ...)
    /// - `native_text_layer`: true when the text came from an embedded text
    ///   layer rather than OCR over pixels; such sources get a score floor
    ///   even when the heuristics disagree
    pub fn score(
        &self,
        text: &str,
        enrichment: Option<&Enrichment>,
        extension: &str,
        native_text_layer: bool,
    ) -> Quality {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Quality::ZERO;
        }
        let total_chars = trimmed.chars().count();
        if total_chars < 10 {
            return Quality::clamped(0.1);
        }

        let lines: Vec<&str> = trimmed
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            return Quality::ZERO;
        }
        let total_lines = lines.len() as f64;

        let chars_per_line = total_chars as f64 / total_lines;
        let line_density = (chars_per_line / IDEAL_CHARS_PER_LINE).min(1.0);

        let valid = self.valid_char.find_iter(trimmed).count() as f64;
        let valid_ratio = (valid / total_chars as f64).min(1.0);

        let long_lines = lines.iter().filter(|l| l.chars().count() >= MIN_LINE_LEN).count();
        let line_length_ratio = long_lines as f64 / total_lines;

        let words = self.real_word.find_iter(trimmed).count() as f64;
        let words_signal = (words / total_lines / WORDS_PER_LINE_TARGET).min(1.0);

        let structure_signal = (structure_density(trimmed, total_chars) * 10.0).min(1.0);

        let enrichment_bonus = enrichment
            .map(|e| (e.kinds() as f64 * ENRICHMENT_BONUS_STEP).min(ENRICHMENT_BONUS_CAP))
            .unwrap_or(0.0);

        let w = &self.weights;
        let score = w.line_density * line_density
            + w.valid_chars * valid_ratio
            + w.line_length * line_length_ratio
            + w.real_words * words_signal
            + w.structure * structure_signal
            + enrichment_bonus
            + extension_bonus(extension);

        let score = if native_text_layer {
            score.max(NATIVE_TEXT_FLOOR)
        } else {
            score
        };

        Quality::clamped(score)
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

/// Markup weight per character: headers, tables, emphasis, code fences
fn structure_density(text: &str, total_chars: usize) -> f64 {
    let hashes = text.matches('#').count() as f64;
    let pipes = text.matches('|').count() as f64;
    let stars = text.matches('*').count() as f64;
    let fences = text.matches("```").count() as f64;

    let raw = hashes * 0.15 + pipes * 0.15 + stars * 0.08 + fences * 0.3;
    raw / total_chars as f64
}

/// Small per-format bonus; structured source formats extract more reliably
fn extension_bonus(extension: &str) -> f64 {
    match extension {
        ".md" => 0.08,
        ".docx" => 0.07,
        ".pdf" | ".html" => 0.05,
        ".xlsx" | ".pptx" => 0.04,
        _ => 0.02,
    }
}
