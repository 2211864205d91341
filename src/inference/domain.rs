//! Domain definitions for the prediction form, its validation and the
//! prediction payload returned to clients.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The thirteen clinical measurements, in canonical form order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Feature {
    Age,
    Sex,
    ChestPain,
    RestingBloodPressure,
    Cholesterol,
    FastingBloodSugar,
    RestingEcg,
    MaxHeartRate,
    ExerciseAngina,
    StDepression,
    Slope,
    MajorVessels,
    Thalassemia,
}

impl Feature {
    pub const ALL: [Feature; 13] = [
        Feature::Age,
        Feature::Sex,
        Feature::ChestPain,
        Feature::RestingBloodPressure,
        Feature::Cholesterol,
        Feature::FastingBloodSugar,
        Feature::RestingEcg,
        Feature::MaxHeartRate,
        Feature::ExerciseAngina,
        Feature::StDepression,
        Feature::Slope,
        Feature::MajorVessels,
        Feature::Thalassemia,
    ];

    /// Form field and dataset column name.
    pub fn name(self) -> &'static str {
        match self {
            Feature::Age => "age",
            Feature::Sex => "sex",
            Feature::ChestPain => "cp",
            Feature::RestingBloodPressure => "trestbps",
            Feature::Cholesterol => "chol",
            Feature::FastingBloodSugar => "fbs",
            Feature::RestingEcg => "restecg",
            Feature::MaxHeartRate => "thalach",
            Feature::ExerciseAngina => "exang",
            Feature::StDepression => "oldpeak",
            Feature::Slope => "slope",
            Feature::MajorVessels => "ca",
            Feature::Thalassemia => "thal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feature::Age => "Age",
            Feature::Sex => "Sex",
            Feature::ChestPain => "Chest Pain Type",
            Feature::RestingBloodPressure => "Resting Blood Pressure (mm Hg)",
            Feature::Cholesterol => "Serum Cholesterol (mg/dl)",
            Feature::FastingBloodSugar => "Fasting Blood Sugar > 120 mg/dl",
            Feature::RestingEcg => "Resting ECG",
            Feature::MaxHeartRate => "Max Heart Rate",
            Feature::ExerciseAngina => "Exercise-Induced Angina",
            Feature::StDepression => "ST Depression",
            Feature::Slope => "ST Slope",
            Feature::MajorVessels => "Major Vessels (0-4)",
            Feature::Thalassemia => "Thalassemia",
        }
    }

    /// Short explanation shown next to the form input.
    pub fn description(self) -> &'static str {
        match self {
            Feature::Age => "Your current age in years",
            Feature::Sex => "Biological sex (Male = 1, Female = 0)",
            Feature::ChestPain => "Type of chest pain experienced",
            Feature::RestingBloodPressure => "Blood pressure at rest (normal: 120 mm Hg)",
            Feature::Cholesterol => "Serum cholesterol level (normal: < 200 mg/dl)",
            Feature::FastingBloodSugar => "Whether fasting blood sugar > 120 mg/dl",
            Feature::RestingEcg => "Results of resting electrocardiogram",
            Feature::MaxHeartRate => "Maximum heart rate achieved during exercise",
            Feature::ExerciseAngina => "Exercise-induced chest pain",
            Feature::StDepression => "ST depression induced by exercise",
            Feature::Slope => "Slope of peak exercise ST segment",
            Feature::MajorVessels => "Number of major vessels colored by fluoroscopy",
            Feature::Thalassemia => "Thalassemia (blood disorder)",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw form body; every field is optional until validated.
#[derive(Clone, Debug, Default)]
pub struct PatientForm {
    pub age: Option<String>,
    pub sex: Option<String>,
    pub cp: Option<String>,
    pub trestbps: Option<String>,
    pub chol: Option<String>,
    pub fbs: Option<String>,
    pub restecg: Option<String>,
    pub thalach: Option<String>,
    pub exang: Option<String>,
    pub oldpeak: Option<String>,
    pub slope: Option<String>,
    pub ca: Option<String>,
    pub thal: Option<String>,
}

/// Why a form was rejected. Checks stop at the first failing field.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    Missing(Feature),
    #[error("Invalid value for {0}. Must be a number.")]
    Invalid(Feature),
}

impl ValidationError {
    pub fn field(&self) -> Feature {
        match self {
            ValidationError::Missing(f) | ValidationError::Invalid(f) => *f,
        }
    }
}

impl PatientForm {
    pub fn get(&self, feature: Feature) -> Option<&str> {
        let value = match feature {
            Feature::Age => &self.age,
            Feature::Sex => &self.sex,
            Feature::ChestPain => &self.cp,
            Feature::RestingBloodPressure => &self.trestbps,
            Feature::Cholesterol => &self.chol,
            Feature::FastingBloodSugar => &self.fbs,
            Feature::RestingEcg => &self.restecg,
            Feature::MaxHeartRate => &self.thalach,
            Feature::ExerciseAngina => &self.exang,
            Feature::StDepression => &self.oldpeak,
            Feature::Slope => &self.slope,
            Feature::MajorVessels => &self.ca,
            Feature::Thalassemia => &self.thal,
        };
        value.as_deref()
    }

    pub fn set(&mut self, feature: Feature, value: impl Into<String>) {
        let slot = match feature {
            Feature::Age => &mut self.age,
            Feature::Sex => &mut self.sex,
            Feature::ChestPain => &mut self.cp,
            Feature::RestingBloodPressure => &mut self.trestbps,
            Feature::Cholesterol => &mut self.chol,
            Feature::FastingBloodSugar => &mut self.fbs,
            Feature::RestingEcg => &mut self.restecg,
            Feature::MaxHeartRate => &mut self.thalach,
            Feature::ExerciseAngina => &mut self.exang,
            Feature::StDepression => &mut self.oldpeak,
            Feature::Slope => &mut self.slope,
            Feature::MajorVessels => &mut self.ca,
            Feature::Thalassemia => &mut self.thal,
        };
        *slot = Some(value.into());
    }

    /// Collect decoded `(name, value)` pairs. Unknown names are ignored and
    /// the first value of a repeated name is kept.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut form = Self::default();
        for (name, value) in pairs {
            if let Some(feature) = Feature::from_name(name.as_ref()) {
                if form.get(feature).is_none() {
                    form.set(feature, value);
                }
            }
        }
        form
    }

    /// Check every field in canonical order and parse it.
    ///
    /// An absent or empty value is missing; anything that does not parse to a
    /// finite number once surrounding whitespace is trimmed is invalid.
    pub fn validate(&self) -> Result<PatientRecord, ValidationError> {
        let mut values = [0.0; 13];
        for feature in Feature::ALL {
            let raw = match self.get(feature) {
                None | Some("") => return Err(ValidationError::Missing(feature)),
                Some(raw) => raw,
            };
            values[feature.index()] = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or(ValidationError::Invalid(feature))?;
        }
        Ok(PatientRecord { values })
    }
}

/// Validated measurements, indexed by [`Feature::index`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PatientRecord {
    values: [f64; 13],
}

impl PatientRecord {
    pub fn from_values(values: [f64; 13]) -> Self {
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Values in canonical form order.
    pub fn values(&self) -> &[f64; 13] {
        &self.values
    }
}

/// Coarse tier derived from the predicted label.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RiskTier {
    High,
    Low,
}

impl RiskTier {
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            RiskTier::High
        } else {
            RiskTier::Low
        }
    }
}

/// Class probabilities in percent.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Probability {
    pub no_disease: f64,
    pub disease: f64,
}

/// Successful scoring result, serialised as the endpoint's JSON body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: u8,
    pub probability: Probability,
    pub risk_level: RiskTier,
    pub message: String,
}

const HIGH_RISK_INTRO: &str = "⚠️ High Risk Detected. Based on your health parameters, you may be at risk for heart disease. ";
const HIGH_RISK_ADVICE: &str =
    "Please consult a cardiologist immediately for a comprehensive evaluation. ";
const LOW_RISK_TEXT: &str = "✓ Low Risk. Your heart health parameters look good! \
Continue maintaining a healthy lifestyle with regular exercise, balanced diet, and stress management. \
Schedule annual checkups to monitor your heart health.";

/// Personalised advice for a scored patient.
///
/// Tips only appear for high-risk predictions: blood pressure above 140,
/// cholesterol above 240 and age above 55 each add one.
pub fn advisory_message(label: u8, record: &PatientRecord) -> String {
    if label != 1 {
        return LOW_RISK_TEXT.to_string();
    }

    let mut message = String::from(HIGH_RISK_INTRO);
    message.push_str(HIGH_RISK_ADVICE);

    let mut tips = Vec::new();
    if record.get(Feature::RestingBloodPressure) > 140.0 {
        tips.push("Monitor your blood pressure regularly");
    }
    if record.get(Feature::Cholesterol) > 240.0 {
        tips.push("Reduce cholesterol intake");
    }
    if record.get(Feature::Age) > 55.0 {
        tips.push("Regular cardiac checkups recommended");
    }
    if !tips.is_empty() {
        message.push_str("Recommendations: ");
        message.push_str(&tips.join(", "));
        message.push('.');
    }
    message
}
