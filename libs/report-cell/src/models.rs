use chrono::{DateTime, Days, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use appointment_cell::AppointmentStatus;
use patient_cell::{BloodType, Gender};
use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const FACTOR_REPORT_DAYS: u64 = 180;
pub const PRESCRIPTION_REPORT_DAYS: u64 = 90;
pub const APPOINTMENT_REPORT_DAYS: u64 = 30;
/// How many upcoming and recent entries a single-patient report lists.
pub const RECENT_LIMIT: usize = 5;

// ==============================================================================
// PERIODS
// ==============================================================================

/// Whole days from `start` to `end`, both inclusive. A missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Period {
    pub fn open(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Ends `today` and reaches back `days` unless the caller pinned either bound.
    pub fn trailing(start: Option<NaiveDate>, end: Option<NaiveDate>, days: u64, today: NaiveDate) -> Self {
        let end = end.unwrap_or(today);
        let start = start.or_else(|| end.checked_sub_days(Days::new(days)));
        Self { start: Some(start.unwrap_or(end)), end: Some(end) }
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(ReportError::ValidationError(
                "start_date must not be after end_date".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn lower(&self) -> Option<DateTime<Utc>> {
        self.start.map(|day| day.and_time(NaiveTime::MIN).and_utc())
    }

    /// First instant after the period.
    fn upper(&self) -> Option<DateTime<Utc>> {
        self.end
            .and_then(|day| day.checked_add_days(Days::new(1)))
            .map(|day| day.and_time(NaiveTime::MIN).and_utc())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.lower().map_or(true, |lower| at >= lower) && self.upper().map_or(true, |upper| at < upper)
    }

    /// PostgREST filters on `column`, each with a leading `&`.
    pub fn to_filter(&self, column: &str) -> String {
        let mut filter = String::new();
        if let Some(lower) = self.lower() {
            filter.push_str(&format!("&{}=gte.{}", column, lower.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(upper) = self.upper() {
            filter.push_str(&format!("&{}=lt.{}", column, upper.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        filter
    }
}

// ==============================================================================
// QUERIES
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub has_insurance: Option<bool>,
    pub min_appointments: Option<usize>,
}

impl PatientReportQuery {
    pub fn period(&self) -> Period {
        Period::open(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactorReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub factor_type: Option<String>,
    pub patient_id: Option<i64>,
    pub min_units: Option<i32>,
}

impl FactorReportQuery {
    pub fn period(&self, today: NaiveDate) -> Period {
        Period::trailing(self.start_date, self.end_date, FACTOR_REPORT_DAYS, today)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub patient_id: Option<i64>,
    pub medication_name: Option<String>,
}

impl PrescriptionReportQuery {
    pub fn period(&self, today: NaiveDate) -> Period {
        Period::trailing(self.start_date, self.end_date, PRESCRIPTION_REPORT_DAYS, today)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<i64>,
}

impl AppointmentReportQuery {
    pub fn period(&self, today: NaiveDate) -> Period {
        Period::trailing(self.start_date, self.end_date, APPOINTMENT_REPORT_DAYS, today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Patients,
    Factors,
    Prescriptions,
    Appointments,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Patients => "patients",
            ReportType::Factors => "factors",
            ReportType::Prescriptions => "prescriptions",
            ReportType::Appointments => "appointments",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    pub report_type: ReportType,
    #[serde(default)]
    pub format: ExportFormat,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ==============================================================================
// REPORT ROWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientDetailReport {
    pub patient_id: i64,
    pub full_name: String,
    pub phone_number: String,
    pub national_code: Option<String>,
    pub gender: Option<Gender>,
    pub blood_type: Option<BloodType>,
    pub age: Option<u32>,
    pub total_appointments: usize,
    pub completed_appointments: usize,
    pub canceled_appointments: usize,
    pub total_prescriptions: usize,
    pub total_medications: usize,
    pub total_factors: usize,
    pub total_factor_units: i64,
    pub total_factor_cost: f64,
    pub has_insurance: bool,
    pub insurance_company: Option<String>,
    pub last_appointment_date: Option<DateTime<Utc>>,
    pub last_prescription_date: Option<DateTime<Utc>>,
    pub last_factor_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorDetailReport {
    pub factor_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_phone: String,
    pub factor_type: String,
    pub units_administered: i32,
    pub administration_date: DateTime<Utc>,
    pub lot_number: Option<String>,
    pub administered_by: Option<String>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescribedMedication {
    pub medication_name: String,
    pub dosage: String,
    pub duration: Option<String>,
    pub quantity: Option<i32>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionDetailReport {
    pub prescription_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_phone: String,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_medications: usize,
    pub medications: Vec<PrescribedMedication>,
}

/// One CSV line per prescription, its medications joined into one column.
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionCsvRow {
    pub prescription_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_phone: String,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_medications: usize,
    pub medications: String,
}

impl From<&PrescriptionDetailReport> for PrescriptionCsvRow {
    fn from(report: &PrescriptionDetailReport) -> Self {
        let medications = report
            .medications
            .iter()
            .map(|m| format!("{} ({})", m.medication_name, m.dosage))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            prescription_id: report.prescription_id,
            patient_id: report.patient_id,
            patient_name: report.patient_name.clone(),
            patient_phone: report.patient_phone.clone(),
            doctor_name: report.doctor_name.clone(),
            diagnosis: report.diagnosis.clone(),
            created_at: report.created_at,
            total_medications: report.total_medications,
            medications,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentDetailReport {
    pub appointment_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_phone: String,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyAppointmentReport {
    pub date: NaiveDate,
    pub total_appointments: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub canceled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpcomingAppointment {
    pub appointment_id: i64,
    pub date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentPrescription {
    pub prescription_id: i64,
    pub created_at: DateTime<Utc>,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub medications: Vec<PrescribedMedication>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentFactor {
    pub factor_id: i64,
    pub factor_type: String,
    pub units: i32,
    pub date: DateTime<Utc>,
    pub administered_by: Option<String>,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SinglePatientReport {
    pub patient_id: i64,
    pub full_name: String,
    pub phone_number: String,
    pub national_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub blood_type: Option<BloodType>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,

    pub has_insurance: bool,
    pub insurance_company: Option<String>,
    pub policy_number: Option<String>,
    pub coverage_type: Option<String>,

    pub total_appointments: usize,
    pub pending_appointments: usize,
    pub confirmed_appointments: usize,
    pub completed_appointments: usize,
    pub canceled_appointments: usize,
    pub upcoming_appointments: Vec<UpcomingAppointment>,

    pub total_prescriptions: usize,
    pub unique_medications: usize,
    pub recent_prescriptions: Vec<RecentPrescription>,

    pub total_factor_administrations: usize,
    pub total_factor_units: i64,
    pub total_factor_cost: f64,
    pub recent_factors: Vec<RecentFactor>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Patient not found")]
    PatientNotFound,

    #[error("You are not allowed to view this report")]
    AccessDenied,

    #[error("No data found to export")]
    NoData,

    #[error("{0}")]
    ValidationError(String),

    #[error("Failed to render export: {0}")]
    Export(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::PatientNotFound | ReportError::NoData => AppError::NotFound(err.to_string()),
            ReportError::AccessDenied => AppError::Forbidden(err.to_string()),
            ReportError::ValidationError(msg) => AppError::ValidationError(msg),
            ReportError::Export(msg) => AppError::Internal(msg),
            ReportError::Database(db) => db.into(),
        }
    }
}
