use polars::prelude::*;
use thermex_parser::{RawRecord, RETAINED_COLUMNS};
use thiserror::Error;
use tracing::debug;

use crate::config::ThermexConfig;
use crate::error::ErrorKind;
use crate::polynomial::{FitError, Polynomial, FIT_DEGREE};

pub const CERTIFICATE_COLUMN: &str = "Certificate";
pub const STANDARD_COLUMN: &str = "Standard";
pub const CORRECTED_COLUMN: &str = "Corrected";
pub const DELTA_TEMP_COLUMN: &str = "delT";
pub const ENGINEERING_ALPHA_COLUMN: &str = "EngAlpha";
pub const FITTED_COLUMN: &str = "Fitted";
pub const ALPHA_COLUMN: &str = "Alpha";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrectionError {
    #[error("{rows} data rows, at least {required} needed for a stable fit")]
    InsufficientData { rows: usize, required: usize },

    #[error("fit failed: {0}")]
    Fit(#[from] FitError),
}

impl CorrectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CorrectionError::InsufficientData { .. } => ErrorKind::InsufficientData,
            CorrectionError::Fit(err) if err.is_underdetermined() => ErrorKind::InsufficientData,
            CorrectionError::Fit(_) => ErrorKind::MalformedInput,
        }
    }
}

/// A raw record with its calibration corrections, fit and derived
/// coefficients, one value per data row in every column.
#[derive(Debug, Clone)]
pub struct CorrectedRecord {
    pub source_columns: [String; RETAINED_COLUMNS],
    pub source_rows: Vec<[f64; RETAINED_COLUMNS]>,
    pub certificate: Vec<f64>,
    pub standard: Vec<f64>,
    pub corrected: Vec<f64>,
    pub delta_temp: Vec<f64>,
    /// `corrected / delta_temp`; NaN where `delta_temp` is zero, which
    /// always includes the first row.
    pub engineering_alpha: Vec<f64>,
    pub fitted: Vec<f64>,
    pub alpha: Vec<f64>,
    pub fit: Polynomial,
}

impl CorrectedRecord {
    pub fn len(&self) -> usize {
        self.source_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_rows.is_empty()
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(RETAINED_COLUMNS + 7);
        for (idx, name) in self.source_columns.iter().enumerate() {
            let values: Vec<f64> = self.source_rows.iter().map(|row| row[idx]).collect();
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        let derived = [
            (CERTIFICATE_COLUMN, &self.certificate),
            (STANDARD_COLUMN, &self.standard),
            (CORRECTED_COLUMN, &self.corrected),
            (DELTA_TEMP_COLUMN, &self.delta_temp),
            (ENGINEERING_ALPHA_COLUMN, &self.engineering_alpha),
            (FITTED_COLUMN, &self.fitted),
            (ALPHA_COLUMN, &self.alpha),
        ];
        for (name, values) in derived {
            columns.push(Series::new(name.into(), values.as_slice()).into());
        }

        DataFrame::new(columns)
    }
}

/// Applies the certificate and standard corrections and fits the result.
#[derive(Debug, Clone)]
pub struct CorrectionEngine {
    measurement_column: String,
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self::from_config(&ThermexConfig::default())
    }
}

impl CorrectionEngine {
    pub fn new(measurement_column: impl Into<String>) -> Self {
        Self {
            measurement_column: measurement_column.into(),
        }
    }

    pub fn from_config(config: &ThermexConfig) -> Self {
        Self::new(config.measurement_column.clone())
    }

    /// Index of the raw expansion column: the configured name if present,
    /// otherwise the last retained column.
    pub fn measurement_index(&self, record: &RawRecord) -> usize {
        record
            .column_index(&self.measurement_column)
            .filter(|idx| *idx > 0)
            .unwrap_or(RETAINED_COLUMNS - 1)
    }

    /// Temperature and raw measurement pairs used for calibration fits.
    pub fn calibration_pairs(&self, record: &RawRecord) -> (Vec<f64>, Vec<f64>) {
        let measurement = self.measurement_index(record);
        (record.temperature(), record.column(measurement))
    }

    pub fn correct_and_fit(
        &self,
        record: &RawRecord,
        certificate: &Polynomial,
        standard: &Polynomial,
    ) -> Result<CorrectedRecord, CorrectionError> {
        let required = FIT_DEGREE + 1;
        if record.len() < required {
            return Err(CorrectionError::InsufficientData {
                rows: record.len(),
                required,
            });
        }

        let (temperature, raw) = self.calibration_pairs(record);

        let certificate_values = certificate.eval_many(&temperature);
        let standard_values = standard.eval_many(&temperature);

        let corrected: Vec<f64> = raw
            .iter()
            .zip(&certificate_values)
            .zip(&standard_values)
            .map(|((raw, cert), stan)| raw + cert - stan)
            .collect();

        let start = temperature[0];
        let delta_temp: Vec<f64> = temperature.iter().map(|t| t - start).collect();

        let engineering_alpha: Vec<f64> = corrected
            .iter()
            .zip(&delta_temp)
            .map(|(c, dt)| if *dt == 0.0 { f64::NAN } else { c / dt })
            .collect();

        let fit = Polynomial::fit(&temperature, &corrected, FIT_DEGREE)?;
        let fitted = fit.eval_many(&temperature);
        let alpha = fit.deriv().eval_many(&temperature);

        debug!(rows = record.len(), "corrected and fitted record");

        Ok(CorrectedRecord {
            source_columns: record.columns.clone(),
            source_rows: record.rows.clone(),
            certificate: certificate_values,
            standard: standard_values,
            corrected,
            delta_temp,
            engineering_alpha,
            fitted,
            alpha,
            fit,
        })
    }
}
