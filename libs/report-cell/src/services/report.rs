use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use appointment_cell::Appointment;
use factor_cell::Factor;
use insurance_cell::Insurance;
use patient_cell::Patient;
use prescription_cell::Prescription;
use shared_config::AppConfig;
use shared_database::{supabase::encode_value, SupabaseClient};
use shared_models::auth::AuthUser;
use shared_models::embed::{PATIENT_EMBED, USER_EMBED};

use crate::models::{
    AppointmentDetailReport, AppointmentReportQuery, DailyAppointmentReport, DateRangeQuery, ExportFormat, ExportQuery,
    FactorDetailReport, FactorReportQuery, PatientDetailReport, PatientReportQuery, Period, PrescriptionCsvRow,
    PrescriptionDetailReport, PrescriptionReportQuery, ReportError, ReportType, SinglePatientReport,
    APPOINTMENT_REPORT_DAYS,
};
use crate::services::aggregate;
use crate::services::export::{self, Attachment};

const ITEMS_EMBED: &str = "items:prescription_items(*,medication:medications(name))";

/// Reads report inputs from storage and hands them to the aggregations.
pub struct ReportService {
    supabase: SupabaseClient,
}

impl ReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn patients(&self) -> Result<Vec<Patient>, ReportError> {
        let query = format!("select=*,{}&order=id.asc", USER_EMBED);
        Ok(self.supabase.select("patients", &query).await?)
    }

    async fn appointments(&self, period: &Period, extra: &str) -> Result<Vec<Appointment>, ReportError> {
        let query = format!(
            "select=*,{}{}{}&order=appointment_date.desc",
            PATIENT_EMBED,
            period.to_filter("appointment_date"),
            extra
        );
        Ok(self.supabase.select("appointments", &query).await?)
    }

    async fn prescriptions(&self, period: &Period, extra: &str) -> Result<Vec<Prescription>, ReportError> {
        let query = format!(
            "select=*,{},{}{}{}&order=created_at.desc",
            ITEMS_EMBED,
            PATIENT_EMBED,
            period.to_filter("created_at"),
            extra
        );
        Ok(self.supabase.select("prescriptions", &query).await?)
    }

    async fn factors(&self, period: &Period, extra: &str) -> Result<Vec<Factor>, ReportError> {
        let query = format!(
            "select=*,{}{}{}&order=administration_date.desc",
            PATIENT_EMBED,
            period.to_filter("administration_date"),
            extra
        );
        Ok(self.supabase.select("factors", &query).await?)
    }

    pub async fn patients_report(
        &self,
        query: &PatientReportQuery,
        today: NaiveDate,
    ) -> Result<Vec<PatientDetailReport>, ReportError> {
        let period = query.period();
        period.validate()?;
        debug!("Building patient report for {:?}", period);

        let patients = self.patients().await?;
        let appointments = self.appointments(&period, "").await?;
        let prescriptions = self.prescriptions(&period, "").await?;
        let factors = self.factors(&period, "").await?;
        let insurances: Vec<Insurance> = self.supabase.select("insurances", "select=*").await?;

        Ok(aggregate::patient_details(
            &patients,
            &appointments,
            &prescriptions,
            &factors,
            &insurances,
            query,
            today,
        ))
    }

    pub async fn factors_report(
        &self,
        query: &FactorReportQuery,
        today: NaiveDate,
    ) -> Result<Vec<FactorDetailReport>, ReportError> {
        let period = query.period(today);
        period.validate()?;

        let mut extra = String::new();
        if let Some(factor_type) = query.factor_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            extra.push_str(&format!("&factor_type=ilike.{}", encode_value(&format!("*{}*", factor_type))));
        }
        if let Some(patient_id) = query.patient_id {
            extra.push_str(&format!("&patient_id=eq.{}", patient_id));
        }
        if let Some(min_units) = query.min_units {
            extra.push_str(&format!("&units_administered=gte.{}", min_units));
        }

        let factors = self.factors(&period, &extra).await?;
        Ok(aggregate::factor_details(&factors))
    }

    /// Everything about one patient. Patients may only read their own.
    pub async fn patient_report(
        &self,
        user: &AuthUser,
        patient_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SinglePatientReport, ReportError> {
        let query = format!("select=*,{}&id=eq.{}", USER_EMBED, patient_id);
        let patient: Patient = self
            .supabase
            .select_one("patients", &query)
            .await?
            .ok_or(ReportError::PatientNotFound)?;

        if user.is_patient() && patient.user_id != user.id {
            warn!("User {} denied the report of patient {}", user.id, patient_id);
            return Err(ReportError::AccessDenied);
        }

        let own = format!("&patient_id=eq.{}", patient_id);
        let insurance: Option<Insurance> = self
            .supabase
            .select_one("insurances", &format!("select=*{}", own))
            .await?;
        let appointments = self.appointments(&Period::default(), &own).await?;
        let prescriptions = self.prescriptions(&Period::default(), &own).await?;
        let factors = self.factors(&Period::default(), &own).await?;

        Ok(aggregate::single_patient(
            &patient,
            insurance.as_ref(),
            &appointments,
            &prescriptions,
            &factors,
            now,
        ))
    }

    pub async fn prescriptions_report(
        &self,
        query: &PrescriptionReportQuery,
        today: NaiveDate,
    ) -> Result<Vec<PrescriptionDetailReport>, ReportError> {
        let period = query.period(today);
        period.validate()?;

        let extra = query
            .patient_id
            .map(|id| format!("&patient_id=eq.{}", id))
            .unwrap_or_default();
        let prescriptions = self.prescriptions(&period, &extra).await?;
        Ok(aggregate::prescription_details(&prescriptions, query.medication_name.as_deref()))
    }

    pub async fn appointments_report(
        &self,
        query: &AppointmentReportQuery,
        today: NaiveDate,
    ) -> Result<Vec<AppointmentDetailReport>, ReportError> {
        let period = query.period(today);
        period.validate()?;

        let mut extra = String::new();
        if let Some(status) = query.status {
            extra.push_str(&format!("&status=eq.{}", status));
        }
        if let Some(patient_id) = query.patient_id {
            extra.push_str(&format!("&patient_id=eq.{}", patient_id));
        }

        let appointments = self.appointments(&period, &extra).await?;
        Ok(aggregate::appointment_details(&appointments))
    }

    pub async fn daily_appointments(
        &self,
        range: &DateRangeQuery,
        today: NaiveDate,
    ) -> Result<Vec<DailyAppointmentReport>, ReportError> {
        let period = Period::trailing(range.start_date, range.end_date, APPOINTMENT_REPORT_DAYS, today);
        period.validate()?;

        let appointments = self.appointments(&period, "").await?;
        Ok(aggregate::daily_appointments(&appointments))
    }

    /// Any report type as CSV or JSON, over the given dates or that report's default window.
    pub async fn export(&self, query: &ExportQuery, today: NaiveDate) -> Result<Attachment, ReportError> {
        let stem = format!("{}_report", query.report_type.as_str());
        debug!("Exporting {} as {:?}", stem, query.format);

        match query.report_type {
            ReportType::Patients => {
                let filters = PatientReportQuery {
                    start_date: query.start_date,
                    end_date: query.end_date,
                    ..PatientReportQuery::default()
                };
                let rows = self.patients_report(&filters, today).await?;
                export::attachment(&stem, query.format, &rows)
            }
            ReportType::Factors => {
                let filters = FactorReportQuery {
                    start_date: query.start_date,
                    end_date: query.end_date,
                    ..FactorReportQuery::default()
                };
                let rows = self.factors_report(&filters, today).await?;
                export::attachment(&stem, query.format, &rows)
            }
            ReportType::Prescriptions => {
                let filters = PrescriptionReportQuery {
                    start_date: query.start_date,
                    end_date: query.end_date,
                    ..PrescriptionReportQuery::default()
                };
                let rows = self.prescriptions_report(&filters, today).await?;
                match query.format {
                    // medications are nested, so CSV gets one flattened column
                    ExportFormat::Csv => {
                        let flat: Vec<PrescriptionCsvRow> = rows.iter().map(PrescriptionCsvRow::from).collect();
                        export::attachment(&stem, query.format, &flat)
                    }
                    ExportFormat::Json => export::attachment(&stem, query.format, &rows),
                }
            }
            ReportType::Appointments => {
                let filters = AppointmentReportQuery {
                    start_date: query.start_date,
                    end_date: query.end_date,
                    ..AppointmentReportQuery::default()
                };
                let rows = self.appointments_report(&filters, today).await?;
                export::attachment(&stem, query.format, &rows)
            }
        }
    }
}

