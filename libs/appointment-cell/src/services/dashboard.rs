use std::collections::HashSet;

use tracing::debug;

use doctor_cell::DoctorService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::domain::{AppointmentStatus, UserRole};

use crate::models::{AdminDashboard, Appointment, AppointmentError, DoctorDashboard, LATEST_APPOINTMENTS};

pub struct DashboardService {
    supabase: SupabaseClient,
    doctors: DoctorService,
}

/// Summary over a doctor's appointments, given newest first.
pub fn summarize_doctor(appointments: Vec<Appointment>) -> DoctorDashboard {
    let earnings = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed || a.is_paid())
        .map(|a| a.consultation_fee)
        .sum();

    let patients = appointments.iter().map(|a| a.patient_id).collect::<HashSet<_>>().len();

    DoctorDashboard {
        earnings,
        appointments: appointments.len(),
        patients,
        latest_appointments: appointments.into_iter().take(LATEST_APPOINTMENTS).collect(),
    }
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
        }
    }

    pub async fn doctor_dashboard(&self, user_id: &str) -> Result<DoctorDashboard, AppointmentError> {
        let doctor = self.doctors.get_by_user(user_id).await?;

        let appointments: Vec<Appointment> = self
            .supabase
            .select("appointments", &format!("doctor_id=eq.{}&order=created_at.desc", doctor.id))
            .await?;

        debug!("Doctor {} has {} appointments", doctor.id, appointments.len());
        Ok(summarize_doctor(appointments))
    }

    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, AppointmentError> {
        let patient_filter = format!("role=eq.{}", UserRole::Patient);
        let latest_filter = format!("order=created_at.desc&limit={}", LATEST_APPOINTMENTS);

        let (doctors, patients, appointments, latest_appointments) = futures::try_join!(
            self.supabase.count("doctors", ""),
            self.supabase.count("user_profiles", &patient_filter),
            self.supabase.count("appointments", ""),
            self.supabase.select::<Appointment>("appointments", &latest_filter),
        )?;

        Ok(AdminDashboard {
            doctors,
            appointments,
            patients,
            latest_appointments,
        })
    }
}
