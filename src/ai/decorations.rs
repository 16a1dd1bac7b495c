use std::ops::Range;

use super::proofread::ProofreadError;

/// One renderable underline with its hover text, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub from: usize,
    pub to: usize,
    pub tooltip: String,
}

/// Pure projection of published proofread errors into marks for the
/// visible range. Memoized on its inputs: re-projecting the same errors
/// over the same viewport hands back the cached slice without rebuilding.
#[derive(Default)]
pub struct DecorationProjector {
    last: Option<(Vec<ProofreadError>, Range<usize>, Vec<Mark>)>,
}

impl DecorationProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project `errors` into marks for `viewport`. Zero-length ranges are
    /// skipped; ranges are trimmed to the viewport. Stable for equal
    /// inputs, so callers may project on every redraw.
    pub fn project(&mut self, errors: &[ProofreadError], viewport: Range<usize>) -> &[Mark] {
        let cached = self
            .last
            .as_ref()
            .is_some_and(|(e, v, _)| e.as_slice() == errors && *v == viewport);
        if !cached {
            let marks = build_marks(errors, &viewport);
            self.last = Some((errors.to_vec(), viewport, marks));
        }
        match self.last.as_ref() {
            Some((_, _, marks)) => marks,
            None => &[],
        }
    }
}

fn build_marks(errors: &[ProofreadError], viewport: &Range<usize>) -> Vec<Mark> {
    errors
        .iter()
        .filter(|e| e.from < e.to)
        .filter(|e| e.from < viewport.end && e.to > viewport.start)
        .map(|e| Mark {
            from: e.from.max(viewport.start),
            to: e.to.min(viewport.end),
            tooltip: e.message.clone(),
        })
        .collect()
}
