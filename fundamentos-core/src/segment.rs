//! Super-column segmentation of flat column lists.
//!
//! A balance sheet arrives as one flat list of line items. Certain line
//! items ("anchors") open a new category, e.g. everything from
//! `Ativo Circulante` up to the next anchor is a current-asset line. The
//! segmenter cuts the list at the anchor positions, so the result is a
//! partition: every column lands in exactly one group and group order
//! concatenated reproduces the input.
//!
//! Some anchors come in two spellings depending on company type (banks
//! report `Ativo Realizável a Longo Prazo` where other companies report
//! `Ativo Não Circulante`). Those are modelled as [`VariantPair`]s and
//! resolved against the column list before cutting; the output always uses
//! the canonical group name.

use serde::{Deserialize, Serialize};

use crate::domain::SuperColumnGroup;
use crate::error::SegmentationError;

/// Anchors of a Fundamentus balance sheet, in sheet order (both spellings listed).
pub const BALANCE_SHEET_ANCHORS: &[&str] = &[
    "Ativo Total",
    "Ativo Circulante",
    "Ativo Não Circulante",
    "Ativo Realizável a Longo Prazo",
    "Passivo Total",
    "Passivo Circulante",
    "Passivo Não Circulante",
    "Passivo Exigível a Longo Prazo",
    "Patrimônio Líquido",
];

/// Two mutually exclusive spellings of one anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPair {
    /// Name the group is exposed under.
    pub canonical: String,
    /// Alternative spelling used by some filers.
    pub legacy: String,
}

impl VariantPair {
    pub fn new(canonical: impl Into<String>, legacy: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            legacy: legacy.into(),
        }
    }

    fn names(&self, label: &str) -> bool {
        label == self.canonical || label == self.legacy
    }
}

/// An anchor after variant resolution: the label to look for, and the group it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAnchor {
    pub label: String,
    pub group: String,
}

/// Resolve variant anchors against the columns actually present.
///
/// The first mention of either spelling of a pair emits the spelling found
/// in `columns` (canonical wins if both are present); later mentions of the
/// same pair are dropped. Anchors outside any pair pass through.
pub fn resolve_variants<S, A>(
    columns: &[S],
    anchors: &[A],
    variants: &[VariantPair],
) -> Result<Vec<ResolvedAnchor>, SegmentationError>
where
    S: AsRef<str>,
    A: AsRef<str>,
{
    let present = |label: &str| columns.iter().any(|c| c.as_ref() == label);
    let mut resolved = Vec::with_capacity(anchors.len());
    let mut seen_pairs = vec![false; variants.len()];

    for anchor in anchors {
        let anchor = anchor.as_ref();
        let Some(pair_idx) = variants.iter().position(|p| p.names(anchor)) else {
            resolved.push(ResolvedAnchor {
                label: anchor.to_string(),
                group: anchor.to_string(),
            });
            continue;
        };
        if seen_pairs[pair_idx] {
            continue;
        }
        seen_pairs[pair_idx] = true;

        let pair = &variants[pair_idx];
        let label = if present(&pair.canonical) {
            &pair.canonical
        } else if present(&pair.legacy) {
            &pair.legacy
        } else {
            return Err(SegmentationError::BothVariantsAbsent {
                canonical: pair.canonical.clone(),
                legacy: pair.legacy.clone(),
            });
        };
        resolved.push(ResolvedAnchor {
            label: label.clone(),
            group: pair.canonical.clone(),
        });
    }

    Ok(resolved)
}

/// Splits column lists at anchor positions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Segmenter {
    variants: Vec<VariantPair>,
}

impl Segmenter {
    pub fn new(variants: Vec<VariantPair>) -> Self {
        Self { variants }
    }

    /// Segmenter with the two balance-sheet variant pairs (non-current assets and liabilities).
    pub fn balance_sheet() -> Self {
        Self::new(vec![
            VariantPair::new("Ativo Não Circulante", "Ativo Realizável a Longo Prazo"),
            VariantPair::new("Passivo Não Circulante", "Passivo Exigível a Longo Prazo"),
        ])
    }

    pub fn resolve<S: AsRef<str>, A: AsRef<str>>(
        &self,
        columns: &[S],
        anchors: &[A],
    ) -> Result<Vec<ResolvedAnchor>, SegmentationError> {
        resolve_variants(columns, anchors, &self.variants)
    }

    /// Partition `columns` into contiguous groups opened by `anchors`.
    ///
    /// Anchors are located by their first occurrence and must appear in the
    /// same relative order as in `columns`, at distinct positions, with the
    /// first anchor at position 0.
    pub fn segment<S: AsRef<str>, A: AsRef<str>>(
        &self,
        columns: &[S],
        anchors: &[A],
    ) -> Result<Vec<SuperColumnGroup>, SegmentationError> {
        let resolved = self.resolve(columns, anchors)?;
        let first = resolved.first().ok_or(SegmentationError::NoAnchors)?;

        let mut positions = Vec::with_capacity(resolved.len());
        for (i, anchor) in resolved.iter().enumerate() {
            let pos = columns
                .iter()
                .position(|c| c.as_ref() == anchor.label)
                .ok_or_else(|| SegmentationError::AnchorMissing(anchor.label.clone()))?;

            if i > 0 {
                let prev = positions[i - 1];
                let prev_anchor = &resolved[i - 1];
                if pos == prev {
                    return Err(SegmentationError::DuplicateAnchorPosition {
                        first: prev_anchor.label.clone(),
                        second: anchor.label.clone(),
                        position: pos,
                    });
                }
                if pos < prev {
                    return Err(SegmentationError::AnchorsOutOfOrder {
                        anchor: anchor.label.clone(),
                        previous: prev_anchor.label.clone(),
                        position: pos,
                    });
                }
            }
            positions.push(pos);
        }

        if positions[0] != 0 {
            return Err(SegmentationError::UncoveredLeadingColumns {
                first_anchor: first.label.clone(),
                count: positions[0],
            });
        }

        let groups = resolved
            .iter()
            .enumerate()
            .map(|(i, anchor)| {
                let start = positions[i];
                let end = positions.get(i + 1).copied().unwrap_or(columns.len());
                let members = columns[start..end]
                    .iter()
                    .map(|c| c.as_ref().to_string())
                    .collect();
                SuperColumnGroup::new(anchor.group.clone(), members)
            })
            .collect();

        Ok(groups)
    }
}

/// Segment with the balance-sheet variant pairs.
pub fn segment<S: AsRef<str>, A: AsRef<str>>(
    columns: &[S],
    anchors: &[A],
) -> Result<Vec<SuperColumnGroup>, SegmentationError> {
    Segmenter::balance_sheet().segment(columns, anchors)
}
