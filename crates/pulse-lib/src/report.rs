//! Interchange document: a flat map of measures plus named working arrays.

use crate::{detectors::adaptive::PeakPipelineResult, error::DocumentError, metrics::hrv::HRVTime};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io::Write, path::Path};

/// A single document entry. Each variant carries its own tag on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Numbers(Vec<f64>),
    Indices(Vec<usize>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            Value::Numbers(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_indices(&self) -> Option<&[usize]> {
        match self {
            Value::Indices(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric difference `other - self` when both sides are numeric and shaped alike.
    fn diff(&self, other: &Value) -> Option<Vec<f64>> {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) if a.len() == b.len() => {
                Some(a.iter().zip(&b).map(|(x, y)| y - x).collect())
            }
            _ => None,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Value::Number(v) => v.is_finite(),
            Value::Numbers(v) => v.iter().all(|x| x.is_finite()),
            Value::Text(_) | Value::Bool(_) | Value::Indices(_) => true,
        }
    }

    fn numeric(&self) -> Option<Vec<f64>> {
        match self {
            Value::Number(v) => Some(vec![*v]),
            Value::Numbers(v) => Some(v.clone()),
            Value::Indices(v) => Some(v.iter().map(|&i| i as f64).collect()),
            Value::Text(_) | Value::Bool(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Numbers(v)
    }
}

impl From<Vec<usize>> for Value {
    fn from(v: Vec<usize>) -> Self {
        Value::Indices(v)
    }
}

fn flags(mask: &[bool]) -> Value {
    Value::Indices(mask.iter().map(|&b| usize::from(b)).collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub measures: BTreeMap<String, Value>,
    pub working_data: BTreeMap<String, Value>,
}

impl Document {
    pub fn from_result(result: &PeakPipelineResult) -> Self {
        let mut doc = Document::default();
        if let Some(hrv) = &result.hrv {
            doc.set_measures(hrv);
        }
        let wd = &mut doc.working_data;
        wd.insert("peaklist".into(), result.events.indices.clone().into());
        wd.insert("RR_list".into(), result.rr.rr.clone().into());
        wd.insert("binary_peaklist".into(), flags(&result.mask));
        wd.insert("removed_beats".into(), result.removed_beats.clone().into());
        // RR_masklist marks rejected intervals with 1
        wd.insert("RR_masklist".into(), flags(&result.rr_mask));
        wd.insert("RR_list_cor".into(), result.rr_corrected.rr.clone().into());
        wd.insert(
            "rolling_mean_window".into(),
            Value::Number(result.window as f64),
        );
        wd.insert("best_margin".into(), result.margin.into());
        wd.insert("fallback_margin_used".into(), result.fallback.into());
        wd.insert("rrsd".into(), result.dispersion.into());
        wd.insert("sample_rate".into(), result.fs.into());
        doc
    }

    fn set_measures(&mut self, hrv: &HRVTime) {
        let m = &mut self.measures;
        m.insert("bpm".into(), hrv.bpm.into());
        m.insert("ibi".into(), hrv.ibi.into());
        m.insert("sdnn".into(), hrv.sdnn.into());
        m.insert("sdsd".into(), hrv.sdsd.into());
        m.insert("rmssd".into(), hrv.rmssd.into());
        m.insert("pnn20".into(), hrv.pnn20.into());
        m.insert("pnn50".into(), hrv.pnn50.into());
        m.insert("hr_mad".into(), hrv.hr_mad.into());
    }

    pub fn measure(&self, key: &str) -> Option<&Value> {
        self.measures.get(key)
    }

    pub fn working(&self, key: &str) -> Option<&Value> {
        self.working_data.get(key)
    }

    /// Pretty JSON. NaN and infinities would serialize as `null` and fail to read
    /// back, so they are refused here.
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        if let Some(key) = self
            .measures
            .iter()
            .chain(&self.working_data)
            .find(|(_, v)| !v.is_finite())
            .map(|(k, _)| k)
        {
            return Err(DocumentError::NonFinite { key: key.clone() });
        }
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn read(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Write through a temporary file in the target directory so a failed write never
    /// leaves a partial document behind.
    pub fn write_atomic(&self, path: &Path) -> Result<(), DocumentError> {
        let json = self.to_json_string()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path)?;
        Ok(())
    }

    /// Compare measures with another document.
    pub fn compare(&self, other: &Document, tolerance: f64) -> Comparison {
        let mut cmp = Comparison::default();
        for (key, mine) in &self.measures {
            let Some(theirs) = other.measures.get(key) else {
                cmp.only_in_self.push(key.clone());
                continue;
            };
            if values_equal(mine, theirs, tolerance) {
                cmp.identical.push(key.clone());
            } else {
                cmp.different.push(MeasureDiff {
                    key: key.clone(),
                    left: mine.clone(),
                    right: theirs.clone(),
                    diff: mine.diff(theirs),
                });
            }
        }
        cmp.only_in_other = other
            .measures
            .keys()
            .filter(|k| !self.measures.contains_key(*k))
            .cloned()
            .collect();
        cmp
    }
}

fn values_equal(a: &Value, b: &Value, tolerance: f64) -> bool {
    match (a.numeric(), b.numeric()) {
        (Some(x), Some(y)) => {
            x.len() == y.len() && x.iter().zip(&y).all(|(p, q)| (p - q).abs() <= tolerance)
        }
        _ => a == b,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureDiff {
    pub key: String,
    pub left: Value,
    pub right: Value,
    pub diff: Option<Vec<f64>>,
}

/// Key-by-key outcome of [`Document::compare`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub identical: Vec<String>,
    pub different: Vec<MeasureDiff>,
    pub only_in_self: Vec<String>,
    pub only_in_other: Vec<String>,
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        self.different.is_empty() && self.only_in_self.is_empty() && self.only_in_other.is_empty()
    }
}
