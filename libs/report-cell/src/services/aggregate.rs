//! Pure report assembly over rows already read from storage.
//!
//! Every aggregate in a row is computed over the same period, so counts, sums
//! and "last" dates always agree with each other.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};

use appointment_cell::{Appointment, AppointmentStatus};
use factor_cell::Factor;
use insurance_cell::Insurance;
use patient_cell::Patient;
use prescription_cell::{Prescription, PrescriptionItem};
use shared_models::embed::EmbeddedPatient;

use crate::models::{
    AppointmentDetailReport, DailyAppointmentReport, FactorDetailReport, PatientDetailReport, PatientReportQuery,
    PrescribedMedication, PrescriptionDetailReport, RecentFactor, RecentPrescription, SinglePatientReport,
    UpcomingAppointment, RECENT_LIMIT,
};

/// Rows of one kind grouped by their patient.
fn by_patient<T>(rows: &[T], patient_id: impl Fn(&T) -> i64) -> HashMap<i64, Vec<&T>> {
    let mut grouped: HashMap<i64, Vec<&T>> = HashMap::new();
    for row in rows {
        grouped.entry(patient_id(row)).or_default().push(row);
    }
    grouped
}

fn embedded_names(patient: Option<&EmbeddedPatient>) -> (String, String) {
    match patient.and_then(|p| p.user.as_ref()) {
        Some(user) => (user.full_name.clone(), user.phone_number.clone()),
        None => (String::new(), String::new()),
    }
}

fn prescribed(item: &PrescriptionItem) -> PrescribedMedication {
    PrescribedMedication {
        medication_name: item.medication.as_ref().map(|m| m.name.clone()).unwrap_or_default(),
        dosage: item.dosage.clone(),
        duration: item.duration.clone(),
        quantity: item.quantity,
        instructions: item.instructions.clone(),
    }
}

fn factor_totals<'a>(factors: impl IntoIterator<Item = &'a Factor>) -> (usize, i64, f64) {
    factors.into_iter().fold((0, 0, 0.0), |(count, units, cost), factor| {
        (
            count + 1,
            units + i64::from(factor.units_administered),
            cost + factor.cost.unwrap_or(0.0),
        )
    })
}

fn count_status(appointments: &[&Appointment], status: AppointmentStatus) -> usize {
    appointments.iter().filter(|a| a.status == status).count()
}

pub fn patient_details(
    patients: &[Patient],
    appointments: &[Appointment],
    prescriptions: &[Prescription],
    factors: &[Factor],
    insurances: &[Insurance],
    query: &PatientReportQuery,
    today: NaiveDate,
) -> Vec<PatientDetailReport> {
    let period = query.period();

    let in_period: Vec<Appointment> = appointments
        .iter()
        .filter(|a| period.contains(a.appointment_date))
        .cloned()
        .collect();
    let prescriptions: Vec<Prescription> = prescriptions
        .iter()
        .filter(|p| period.contains(p.created_at))
        .cloned()
        .collect();
    let factors: Vec<Factor> = factors
        .iter()
        .filter(|f| period.contains(f.administration_date))
        .cloned()
        .collect();

    let appointments = by_patient(&in_period, |a| a.patient_id);
    let prescriptions = by_patient(&prescriptions, |p| p.patient_id);
    let factors = by_patient(&factors, |f| f.patient_id);
    let insurances = by_patient(insurances, |i| i.patient_id);

    let mut reports = Vec::new();
    for patient in patients {
        let visits = appointments.get(&patient.id).cloned().unwrap_or_default();
        if query.min_appointments.is_some_and(|min| visits.len() < min) {
            continue;
        }

        let insurance = insurances.get(&patient.id).and_then(|rows| rows.first().copied());
        if query.has_insurance.is_some_and(|wanted| wanted != insurance.is_some()) {
            continue;
        }

        let scripts = prescriptions.get(&patient.id).cloned().unwrap_or_default();
        let doses = factors.get(&patient.id).cloned().unwrap_or_default();
        let (total_factors, total_factor_units, total_factor_cost) = factor_totals(doses.iter().copied());

        reports.push(PatientDetailReport {
            patient_id: patient.id,
            full_name: patient.user.as_ref().map(|u| u.full_name.clone()).unwrap_or_default(),
            phone_number: patient.user.as_ref().map(|u| u.phone_number.clone()).unwrap_or_default(),
            national_code: patient.national_code.clone(),
            gender: patient.gender,
            blood_type: patient.blood_type,
            age: patient.age_on(today),
            total_appointments: visits.len(),
            completed_appointments: count_status(&visits, AppointmentStatus::Completed),
            canceled_appointments: count_status(&visits, AppointmentStatus::Canceled),
            total_prescriptions: scripts.len(),
            total_medications: scripts.iter().map(|p| p.items.len()).sum(),
            total_factors,
            total_factor_units,
            total_factor_cost,
            has_insurance: insurance.is_some(),
            insurance_company: insurance.map(|i| i.insurance_company.clone()),
            last_appointment_date: visits.iter().map(|a| a.appointment_date).max(),
            last_prescription_date: scripts.iter().map(|p| p.created_at).max(),
            last_factor_date: doses.iter().map(|f| f.administration_date).max(),
        });
    }
    reports
}

pub fn factor_details(factors: &[Factor]) -> Vec<FactorDetailReport> {
    let mut reports: Vec<FactorDetailReport> = factors
        .iter()
        .map(|factor| {
            let (patient_name, patient_phone) = embedded_names(factor.patient.as_ref());
            FactorDetailReport {
                factor_id: factor.id,
                patient_id: factor.patient_id,
                patient_name,
                patient_phone,
                factor_type: factor.factor_type.clone(),
                units_administered: factor.units_administered,
                administration_date: factor.administration_date,
                lot_number: factor.lot_number.clone(),
                administered_by: factor.administered_by.clone(),
                cost: factor.cost,
                notes: factor.notes.clone(),
            }
        })
        .collect();
    reports.sort_by(|a, b| b.administration_date.cmp(&a.administration_date));
    reports
}

/// With a medication name, only matching items are kept and prescriptions left
/// without any are dropped.
pub fn prescription_details(prescriptions: &[Prescription], medication_name: Option<&str>) -> Vec<PrescriptionDetailReport> {
    let needle = medication_name
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty());

    let mut reports = Vec::new();
    for prescription in prescriptions {
        let medications: Vec<PrescribedMedication> = prescription
            .items
            .iter()
            .map(prescribed)
            .filter(|m| {
                needle
                    .as_deref()
                    .map_or(true, |needle| m.medication_name.to_lowercase().contains(needle))
            })
            .collect();

        if needle.is_some() && medications.is_empty() {
            continue;
        }

        let (patient_name, patient_phone) = embedded_names(prescription.patient.as_ref());
        reports.push(PrescriptionDetailReport {
            prescription_id: prescription.id,
            patient_id: prescription.patient_id,
            patient_name,
            patient_phone,
            doctor_name: prescription.doctor_name.clone(),
            diagnosis: prescription.diagnosis.clone(),
            created_at: prescription.created_at,
            total_medications: medications.len(),
            medications,
        });
    }
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    reports
}

pub fn appointment_details(appointments: &[Appointment]) -> Vec<AppointmentDetailReport> {
    let mut reports: Vec<AppointmentDetailReport> = appointments
        .iter()
        .map(|appointment| {
            let (patient_name, patient_phone) = embedded_names(appointment.patient.as_ref());
            AppointmentDetailReport {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id,
                patient_name,
                patient_phone,
                appointment_date: appointment.appointment_date,
                status: appointment.status,
                reason: appointment.reason.clone(),
                notes: appointment.notes.clone(),
                created_at: appointment.created_at,
            }
        })
        .collect();
    reports.sort_by(|a, b| b.appointment_date.cmp(&a.appointment_date));
    reports
}

/// Status counts per calendar day (UTC), oldest day first.
pub fn daily_appointments(appointments: &[Appointment]) -> Vec<DailyAppointmentReport> {
    let mut days: BTreeMap<NaiveDate, DailyAppointmentReport> = BTreeMap::new();

    for appointment in appointments {
        let date = appointment.appointment_date.date_naive();
        let day = days.entry(date).or_insert_with(|| DailyAppointmentReport {
            date,
            total_appointments: 0,
            pending: 0,
            confirmed: 0,
            completed: 0,
            canceled: 0,
        });

        day.total_appointments += 1;
        match appointment.status {
            AppointmentStatus::Pending => day.pending += 1,
            AppointmentStatus::Confirmed => day.confirmed += 1,
            AppointmentStatus::Completed => day.completed += 1,
            AppointmentStatus::Canceled => day.canceled += 1,
        }
    }

    days.into_values().collect()
}

pub fn single_patient(
    patient: &Patient,
    insurance: Option<&Insurance>,
    appointments: &[Appointment],
    prescriptions: &[Prescription],
    factors: &[Factor],
    now: DateTime<Utc>,
) -> SinglePatientReport {
    let visits: Vec<&Appointment> = appointments.iter().collect();

    let mut upcoming: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.status.is_active() && a.appointment_date >= now)
        .collect();
    upcoming.sort_by_key(|a| a.appointment_date);

    let mut recent_prescriptions: Vec<&Prescription> = prescriptions.iter().collect();
    recent_prescriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let unique_medications: BTreeSet<i64> = prescriptions
        .iter()
        .flat_map(|p| p.items.iter().map(|item| item.medication_id))
        .collect();

    let mut recent_factors: Vec<&Factor> = factors.iter().collect();
    recent_factors.sort_by(|a, b| b.administration_date.cmp(&a.administration_date));
    let (total_factor_administrations, total_factor_units, total_factor_cost) = factor_totals(factors);

    SinglePatientReport {
        patient_id: patient.id,
        full_name: patient.user.as_ref().map(|u| u.full_name.clone()).unwrap_or_default(),
        phone_number: patient.user.as_ref().map(|u| u.phone_number.clone()).unwrap_or_default(),
        national_code: patient.national_code.clone(),
        date_of_birth: patient.date_of_birth,
        age: patient.age_on(now.date_naive()),
        gender: patient.gender,
        blood_type: patient.blood_type,
        address: patient.address.clone(),
        emergency_contact: patient.emergency_contact.clone(),
        medical_history: patient.medical_history.clone(),

        has_insurance: insurance.is_some(),
        insurance_company: insurance.map(|i| i.insurance_company.clone()),
        policy_number: insurance.map(|i| i.policy_number.clone()),
        coverage_type: insurance.and_then(|i| i.coverage_type.clone()),

        total_appointments: visits.len(),
        pending_appointments: count_status(&visits, AppointmentStatus::Pending),
        confirmed_appointments: count_status(&visits, AppointmentStatus::Confirmed),
        completed_appointments: count_status(&visits, AppointmentStatus::Completed),
        canceled_appointments: count_status(&visits, AppointmentStatus::Canceled),
        upcoming_appointments: upcoming
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|a| UpcomingAppointment {
                appointment_id: a.id,
                date: a.appointment_date,
                status: a.status,
                reason: a.reason.clone(),
            })
            .collect(),

        total_prescriptions: prescriptions.len(),
        unique_medications: unique_medications.len(),
        recent_prescriptions: recent_prescriptions
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|p| RecentPrescription {
                prescription_id: p.id,
                created_at: p.created_at,
                doctor_name: p.doctor_name.clone(),
                diagnosis: p.diagnosis.clone(),
                medications: p.items.iter().map(prescribed).collect(),
            })
            .collect(),

        total_factor_administrations,
        total_factor_units,
        total_factor_cost,
        recent_factors: recent_factors
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|f| RecentFactor {
                factor_id: f.id,
                factor_type: f.factor_type.clone(),
                units: f.units_administered,
                date: f.administration_date,
                administered_by: f.administered_by.clone(),
                cost: f.cost,
            })
            .collect(),
    }
}
