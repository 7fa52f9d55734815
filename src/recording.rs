use log::debug;
use std::fmt::Write;

use crate::classifier::HISTORY;
use crate::error::{QrsError, Result};

/// Seconds of signal needed to seed the adaptive statistics.
pub const MIN_SECONDS: usize = HISTORY;

/// A validated multi-lead ECG recording, stored lead by lead.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    leads: Vec<Vec<f64>>,
    sample_rate: u32,
}

impl Recording {
    pub fn from_leads(leads: Vec<Vec<f64>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(QrsError::InvalidSamplingRate(sample_rate));
        }
        let points = match leads.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(QrsError::InvalidData("Recording has no samples".to_string())),
        };
        for (i, lead) in leads.iter().enumerate() {
            if lead.len() != points {
                return Err(QrsError::InvalidData(format!(
                    "Lead {} has {} samples, lead 0 has {}",
                    i,
                    lead.len(),
                    points
                )));
            }
            if let Some(pos) = lead.iter().position(|v| !v.is_finite()) {
                return Err(QrsError::InvalidData(format!("Lead {} has a non-finite sample at {}", i, pos)));
            }
        }
        if leads.len() > points {
            return Err(QrsError::Transposed { leads: leads.len(), points });
        }
        let required = sample_rate as usize * MIN_SECONDS;
        if points < required {
            return Err(QrsError::RecordingTooShort { points, required });
        }

        debug!("Recording: {} leads x {} points at {} Hz", leads.len(), points, sample_rate);
        Ok(Self { leads, sample_rate })
    }

    pub fn from_lead(samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        Self::from_leads(vec![samples], sample_rate)
    }

    /// Builds a recording from `[points x leads]` rows.
    pub fn from_rows(rows: &[Vec<f64>], sample_rate: u32) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(QrsError::InvalidData("Recording has no samples".to_string()));
        }
        let mut leads = vec![Vec::with_capacity(rows.len()); width];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(QrsError::InvalidData(format!(
                    "Row {} has {} values, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            for (lead, &value) in leads.iter_mut().zip(row) {
                lead.push(value);
            }
        }
        Self::from_leads(leads, sample_rate)
    }

    pub fn from_interleaved(samples: &[f64], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 || samples.len() % channels != 0 {
            return Err(QrsError::InvalidData(format!(
                "{} interleaved samples do not split into {} channels",
                samples.len(),
                channels
            )));
        }
        let mut leads = vec![Vec::with_capacity(samples.len() / channels); channels];
        for frame in samples.chunks(channels) {
            for (lead, &value) in leads.iter_mut().zip(frame) {
                lead.push(value);
            }
        }
        Self::from_leads(leads, sample_rate)
    }

    /// Parses delimited text with one row per sample point. Values may be
    /// separated by commas, semicolons, tabs or spaces; blank lines and lines
    /// starting with `#` are skipped.
    pub fn parse_delimited(text: &str, sample_rate: u32) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|field| !field.is_empty())
                .map(|field| {
                    field.parse::<f64>().map_err(|e| {
                        QrsError::InvalidData(format!("Line {}: invalid value '{}': {}", line_no + 1, field, e))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        Self::from_rows(&rows, sample_rate)
    }

    pub fn to_delimited(&self) -> String {
        let mut out = String::with_capacity(self.points() * self.lead_count() * 10);
        for i in 0..self.points() {
            for (j, lead) in self.leads.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{:.6}", lead[i]);
            }
            out.push('\n');
        }
        out
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn lead_count(&self) -> usize {
        self.leads.len()
    }

    pub fn points(&self) -> usize {
        self.leads[0].len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.points() as f64 / self.sample_rate as f64
    }

    pub fn lead(&self, lead: usize) -> Result<&[f64]> {
        self.leads
            .get(lead)
            .map(Vec::as_slice)
            .ok_or(QrsError::LeadOutOfRange { lead, leads: self.leads.len() })
    }
}
