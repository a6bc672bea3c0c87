//! Offline accuracy measurement against a labeled test set.
//!
//! Scores follow the usual multi-class conventions: per-label precision,
//! recall and F1, averaged with weights proportional to each label's true
//! support, with 0 wherever a denominator is 0. Sentinel predictions
//! (`unknown`, `error`) are scored as ordinary classes; they have no true
//! support, so they only ever cost recall for the label they replaced.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::classifier::IntentClassifier;
use crate::types::{Intent, Label, LabeledExample};

const LABELS: usize = Label::ALL.len();

/// Counts of (true label, predicted label) pairs.
///
/// Rows are true labels and columns predicted labels, both in
/// [`Label::ALL`] order: the five intents, then `unknown`, then `error`.
/// Every recorded prediction lands in exactly one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    counts: [[usize; LABELS]; LABELS],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, truth: Label, predicted: Label) {
        self.counts[truth.ordinal()][predicted.ordinal()] += 1;
    }

    pub fn get(&self, truth: Label, predicted: Label) -> usize {
        self.counts[truth.ordinal()][predicted.ordinal()]
    }

    /// Row and column order.
    pub fn labels(&self) -> &'static [Label] {
        &Label::ALL
    }

    pub fn rows(&self) -> &[[usize; LABELS]; LABELS] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// How many examples truly had `label`.
    pub fn support(&self, label: Label) -> usize {
        self.counts[label.ordinal()].iter().sum()
    }

    /// How many times `label` was predicted.
    pub fn predicted(&self, label: Label) -> usize {
        self.counts.iter().map(|row| row[label.ordinal()]).sum()
    }

    /// Render as a text table with true labels down the side.
    pub fn render(&self) -> String {
        let width = Label::ALL.iter().map(|l| l.as_str().len()).max().unwrap_or(0);
        let mut out = format!("{:width$}", "");
        for label in Label::ALL {
            let _ = write!(out, " {:>w$}", label.as_str(), w = label.as_str().len());
        }
        out.push('\n');
        for truth in Label::ALL {
            let _ = write!(out, "{:>width$}", truth.as_str());
            for predicted in Label::ALL {
                let _ = write!(
                    out,
                    " {:>w$}",
                    self.get(truth, predicted),
                    w = predicted.as_str().len()
                );
            }
            out.push('\n');
        }
        out
    }
}

/// Scores for one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Name of the evaluated classifier or backend.
    pub classifier: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    /// Labels that occur in the truth or the predictions, in label order.
    pub per_class: Vec<ClassMetrics>,
    /// `per_class` plus averages, as an aligned text table.
    pub per_class_report: String,
    pub true_labels: Vec<Intent>,
    pub predictions: Vec<Label>,
}

impl EvaluationReport {
    /// Score paired truth/prediction sequences.
    ///
    /// Pairs beyond the shorter sequence are ignored.
    pub fn from_predictions(
        classifier: impl Into<String>,
        true_labels: Vec<Intent>,
        predictions: Vec<Label>,
    ) -> Self {
        let mut matrix = ConfusionMatrix::new();
        for (truth, predicted) in true_labels.iter().zip(&predictions) {
            matrix.record(Label::Intent(*truth), *predicted);
        }

        let per_class: Vec<ClassMetrics> = Label::ALL
            .iter()
            .filter(|l| matrix.support(**l) > 0 || matrix.predicted(**l) > 0)
            .map(|l| class_metrics(&matrix, *l))
            .collect();

        let total = matrix.total();
        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            ratio_f(
                per_class.iter().map(|c| metric(c) * c.support as f64).sum(),
                total as f64,
            )
        };
        let precision = weighted(|c| c.precision);
        let recall = weighted(|c| c.recall);
        let f1 = weighted(|c| c.f1);
        let correct: usize = Label::ALL.iter().map(|l| matrix.get(*l, *l)).sum();
        let accuracy = ratio(correct, total);

        let per_class_report = render_report(&per_class, accuracy, total, precision, recall, f1);

        Self {
            classifier: classifier.into(),
            precision,
            recall,
            f1,
            accuracy,
            confusion_matrix: matrix,
            per_class,
            per_class_report,
            true_labels,
            predictions,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    ratio_f(num as f64, den as f64)
}

fn ratio_f(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

fn class_metrics(matrix: &ConfusionMatrix, label: Label) -> ClassMetrics {
    let tp = matrix.get(label, label);
    let support = matrix.support(label);
    let precision = ratio(tp, matrix.predicted(label));
    let recall = ratio(tp, support);
    let f1 = ratio_f(2.0 * precision * recall, precision + recall);
    ClassMetrics {
        label,
        precision,
        recall,
        f1,
        support,
    }
}

fn render_report(
    per_class: &[ClassMetrics],
    accuracy: f64,
    total: usize,
    precision: f64,
    recall: f64,
    f1: f64,
) -> String {
    const WEIGHTED: &str = "weighted avg";
    let width = per_class
        .iter()
        .map(|c| c.label.as_str().len())
        .chain([WEIGHTED.len()])
        .max()
        .unwrap_or(WEIGHTED.len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>width$} {:>9} {:>9} {:>9} {:>9}\n",
        "", "precision", "recall", "f1-score", "support"
    );
    for c in per_class {
        let _ = writeln!(
            out,
            "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            c.label.as_str(),
            c.precision,
            c.recall,
            c.f1,
            c.support
        );
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
        "accuracy", "", "", accuracy, total
    );

    let n = per_class.len().max(1) as f64;
    let macro_avg = |metric: fn(&ClassMetrics) -> f64| per_class.iter().map(metric).sum::<f64>() / n;
    let _ = writeln!(
        out,
        "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        "macro avg",
        macro_avg(|c| c.precision),
        macro_avg(|c| c.recall),
        macro_avg(|c| c.f1),
        total
    );
    let _ = writeln!(
        out,
        "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        WEIGHTED, precision, recall, f1, total
    );
    out
}

/// Side-by-side precision/recall/F1 for several evaluated backends.
pub fn comparison_table(reports: &[EvaluationReport]) -> String {
    let width = reports
        .iter()
        .map(|r| r.classifier.len())
        .chain(["model".len()])
        .max()
        .unwrap_or(5);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} {:>9} {:>9} {:>9}",
        "model", "precision", "recall", "f1"
    );
    for r in reports {
        let _ = writeln!(
            out,
            "{:<width$} {:>9.3} {:>9.3} {:>9.3}",
            r.classifier, r.precision, r.recall, r.f1
        );
    }
    out
}

/// Runs a classifier over a test set, one call at a time.
pub struct Evaluator {
    classifier: Arc<dyn IntentClassifier>,
    name: String,
    delay: Duration,
}

impl Evaluator {
    /// Pause between consecutive calls, to stay under API rate limits.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    pub fn new(classifier: Arc<dyn IntentClassifier>) -> Self {
        let name = classifier.name().to_string();
        Self {
            classifier,
            name,
            delay: Self::DEFAULT_DELAY,
        }
    }

    /// Name the run in the report (e.g. after the backend).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Classify every example in order and score the predictions.
    ///
    /// Makes exactly one classification call per example.
    pub async fn evaluate(&self, test_examples: &[LabeledExample]) -> EvaluationReport {
        let total = test_examples.len();
        info!(classifier = %self.name, total, "evaluation started");

        let mut true_labels = Vec::with_capacity(total);
        let mut predictions = Vec::with_capacity(total);
        for (i, example) in test_examples.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if i % 10 == 0 {
                info!(done = i, total, "evaluating");
            }

            let predicted = self.classifier.predict_intent(&example.text).await;
            true_labels.push(example.intent);
            predictions.push(predicted);
        }

        let report = EvaluationReport::from_predictions(self.name.clone(), true_labels, predictions);
        info!(
            classifier = %self.name,
            precision = report.precision,
            recall = report.recall,
            f1 = report.f1,
            "evaluation finished"
        );
        report
    }
}
