use log::{debug, trace};

use crate::error::{QrsError, Result};
use crate::params::DetectorParams;

/// Beat-index x lead matrix of detections.
///
/// Every lead owns a fixed-capacity column in one backing array and a valid
/// length; cells past the valid length are the zero-fill of shorter leads and
/// take no part in reconciliation. Corrections shift values within a single
/// column and never touch the other leads.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakMatrix {
    cells: Vec<usize>,
    lengths: Vec<usize>,
    capacity: usize,
}

impl PeakMatrix {
    pub fn from_leads(leads: &[Vec<usize>]) -> Self {
        let capacity = leads.iter().map(Vec::len).max().unwrap_or(0);
        let mut cells = vec![0; capacity * leads.len()];
        for (lead, beats) in leads.iter().enumerate() {
            cells[lead * capacity..lead * capacity + beats.len()].copy_from_slice(beats);
        }
        Self {
            cells,
            lengths: leads.iter().map(Vec::len).collect(),
            capacity,
        }
    }

    pub fn leads(&self) -> usize {
        self.lengths.len()
    }

    pub fn rows(&self) -> usize {
        self.capacity
    }

    pub fn column(&self, lead: usize) -> &[usize] {
        let start = lead * self.capacity;
        &self.cells[start..start + self.lengths[lead]]
    }

    /// `(lead, value)` for every lead that still has a detection in `row`.
    pub fn row(&self, row: usize) -> Vec<(usize, usize)> {
        (0..self.leads())
            .filter(|&lead| row < self.lengths[lead])
            .map(|lead| (lead, self.cells[lead * self.capacity + row]))
            .collect()
    }

    fn column_mut(&mut self, lead: usize) -> &mut [usize] {
        let start = lead * self.capacity;
        &mut self.cells[start..start + self.capacity]
    }

    /// Shifts `lead` down by one from `row` and writes `value` into the gap. A
    /// full column loses its last value.
    fn insert(&mut self, lead: usize, row: usize, value: usize) {
        let len = self.lengths[lead];
        let end = len.min(self.capacity - 1);
        let column = self.column_mut(lead);
        column.copy_within(row..end, row + 1);
        column[row] = value;
        self.lengths[lead] = (len + 1).min(self.capacity);
    }

    /// Removes `row` from `lead`, pulling its later values up by one.
    fn remove(&mut self, lead: usize, row: usize) {
        let len = self.lengths[lead];
        let column = self.column_mut(lead);
        column.copy_within(row + 1..len, row);
        column[len - 1] = 0;
        self.lengths[lead] = len - 1;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    pub beats: Vec<usize>,
    /// Leads that had missed a beat and got the row median inserted.
    pub outer_corrections: usize,
    /// Extra detections removed from a lead.
    pub inner_corrections: usize,
}

/// Merges per-lead heartbeat sequences into one consensus sequence.
pub struct Reconciler {
    window: f64,
    max_corrections: usize,
}

impl Reconciler {
    pub fn new(sample_rate: u32, params: &DetectorParams) -> Self {
        Self {
            window: params.consensus_ms * sample_rate as f64 / 1000.0,
            max_corrections: params.max_row_corrections,
        }
    }

    pub fn reconcile(&self, leads: &[Vec<usize>]) -> Result<Reconciliation> {
        let mut matrix = PeakMatrix::from_leads(leads);
        let mut result = Reconciliation::default();
        let mut row = 0;
        let mut corrections = 0;

        while row < matrix.rows() {
            let cells = matrix.row(row);
            if cells.is_empty() {
                break;
            }

            let (mut outer_lead, mut outer) = cells[0];
            let (mut inner_lead, mut inner) = cells[0];
            for &(lead, value) in &cells[1..] {
                if value > outer {
                    (outer_lead, outer) = (lead, value);
                }
                if value < inner {
                    (inner_lead, inner) = (lead, value);
                }
            }

            let near_outer = cells.iter().filter(|&&(_, v)| v as f64 > outer as f64 - self.window).count();
            let near_inner = cells.iter().filter(|&&(_, v)| (v as f64) < inner as f64 + self.window).count();
            let consensus = median(cells.iter().map(|&(_, v)| v).collect());

            if near_outer == cells.len() && near_inner == cells.len() {
                result.beats.push(consensus);
                row += 1;
                corrections = 0;
                continue;
            }

            corrections += 1;
            if corrections > self.max_corrections {
                return Err(QrsError::ReconciliationStalled { row, corrections: self.max_corrections });
            }

            if near_inner > near_outer {
                trace!("Row {}: lead {} missed a beat, inserting {}", row, outer_lead, consensus);
                matrix.insert(outer_lead, row, consensus);
                result.outer_corrections += 1;
            } else {
                trace!("Row {}: dropping extra detection {} from lead {}", row, inner, inner_lead);
                matrix.remove(inner_lead, row);
                result.inner_corrections += 1;
            }
        }

        debug!(
            "Reconciled {} leads into {} beats ({} inserted, {} removed)",
            leads.len(),
            result.beats.len(),
            result.outer_corrections,
            result.inner_corrections
        );
        Ok(result)
    }
}

// Median of a non-empty set, truncated to a whole sample.
fn median(mut values: Vec<usize>) -> usize {
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler(rate: u32) -> Reconciler {
        Reconciler::new(rate, &DetectorParams::default())
    }

    #[test]
    fn test_matrix_zero_fills_short_leads() {
        let matrix = PeakMatrix::from_leads(&[vec![10, 20, 30], vec![11]]);
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.column(1), &[11]);
        assert_eq!(matrix.row(0), vec![(0, 10), (1, 11)]);
        assert_eq!(matrix.row(2), vec![(0, 30)]);
    }

    #[test]
    fn test_matrix_insert_and_remove() {
        let mut matrix = PeakMatrix::from_leads(&[vec![10, 20, 30], vec![11, 31]]);
        matrix.insert(1, 1, 21);
        assert_eq!(matrix.column(1), &[11, 21, 31]);
        // a full column drops its last value
        matrix.insert(0, 0, 5);
        assert_eq!(matrix.column(0), &[5, 10, 20]);
        matrix.remove(0, 0);
        assert_eq!(matrix.column(0), &[10, 20]);
        assert_eq!(matrix.column(1), &[11, 21, 31]);
    }

    #[test]
    fn test_agreeing_leads_give_median() {
        let result = reconciler(1000)
            .reconcile(&[vec![1000, 2000], vec![1010, 2030], vec![990, 2010]])
            .unwrap();
        assert_eq!(result.beats, vec![1000, 2010]);
        assert_eq!(result.outer_corrections + result.inner_corrections, 0);
    }

    #[test]
    fn test_even_lead_count_median() {
        let result = reconciler(1000).reconcile(&[vec![1000], vec![1005]]).unwrap();
        assert_eq!(result.beats, vec![1002]);
    }

    #[test]
    fn test_late_lead_gets_median_inserted() {
        let result = reconciler(1000).reconcile(&[vec![1000], vec![1000], vec![1095]]).unwrap();
        assert_eq!(result.beats, vec![1000]);
        assert!(result.outer_corrections >= 1);
    }

    #[test]
    fn test_missed_and_extra_detections() {
        let leads = vec![
            vec![1000, 2000, 3000],
            vec![1010, 3005],
            vec![990, 1500, 2005, 2990],
        ];
        let result = reconciler(1000).reconcile(&leads).unwrap();
        assert_eq!(result.beats, vec![1000, 2005, 3000]);
        assert_eq!(result.outer_corrections, 1);
        assert_eq!(result.inner_corrections, 1);
    }

    #[test]
    fn test_leads_of_different_length() {
        let result = reconciler(1000).reconcile(&[vec![1000, 2000], vec![1000]]).unwrap();
        assert_eq!(result.beats, vec![1000, 2000]);
        assert!(reconciler(1000).reconcile(&[]).unwrap().beats.is_empty());
        assert!(reconciler(1000).reconcile(&[vec![], vec![]]).unwrap().beats.is_empty());
    }

    #[test]
    fn test_single_lead_passes_through() {
        let beats = vec![100, 400, 700];
        assert_eq!(reconciler(250).reconcile(&[beats.clone()]).unwrap().beats, beats);
    }

    #[test]
    fn test_stalled_row_is_reported() {
        let params = DetectorParams { max_row_corrections: 1, ..Default::default() };
        let reconciler = Reconciler::new(1000, &params);
        // row 1 needs a removal and then an insertion
        let err = reconciler
            .reconcile(&[vec![1000, 2000, 3000], vec![1010, 3005], vec![990, 1500, 2005, 2990]])
            .unwrap_err();
        assert_eq!(err, QrsError::ReconciliationStalled { row: 1, corrections: 1 });
    }
}
