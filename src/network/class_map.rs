use std::collections::HashSet;

/// Distinct class labels discovered in the label column, in a stable order.
///
/// Labels that all parse as numbers are ordered numerically; otherwise they
/// keep their order of first appearance.
///
/// Encoding:
/// - ≤ 2 classes: a single output; the first class is the negative target,
///   the second is `1`
/// - otherwise: one-hot over `len()` outputs, with the negative target in
///   every position but the class's own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    labels: Vec<String>,
}

impl ClassMap {
    pub fn from_labels<'a, I>(labels: I) -> ClassMap
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut distinct: Vec<String> = labels
            .into_iter()
            .map(str::trim)
            .filter(|l| seen.insert(*l))
            .map(str::to_owned)
            .collect();

        let numeric: Option<Vec<f64>> = distinct.iter().map(|l| l.parse::<f64>().ok()).collect();
        if let Some(keys) = numeric {
            let mut paired: Vec<(f64, String)> = keys.into_iter().zip(distinct).collect();
            paired.sort_by(|a, b| a.0.total_cmp(&b.0));
            distinct = paired.into_iter().map(|(_, l)| l).collect();
        }

        ClassMap { labels: distinct }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.labels.iter().position(|l| l == label)
    }

    pub fn is_binary(&self) -> bool {
        self.labels.len() <= 2
    }

    pub fn output_width(&self) -> usize {
        if self.is_binary() { 1 } else { self.labels.len() }
    }

    /// Expected output vector for `label`, or `None` for an unknown label.
    pub fn encode(&self, label: &str, negative: f64) -> Option<Vec<f64>> {
        let index = self.index_of(label)?;
        if self.is_binary() {
            return Some(vec![if index == 1 { 1.0 } else { negative }]);
        }
        let mut encoded = vec![negative; self.labels.len()];
        encoded[index] = 1.0;
        Some(encoded)
    }

    /// Maps an output vector back to a label: threshold for the single-output
    /// case, argmax for one-hot.
    pub fn decode(&self, output: &[f64], threshold: f64) -> Option<&str> {
        if self.is_binary() {
            let index = if *output.first()? >= threshold { 1 } else { 0 };
            return self.labels.get(index).or_else(|| self.labels.first()).map(String::as_str);
        }
        let index = output
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)?;
        self.labels.get(index).map(String::as_str)
    }
}
