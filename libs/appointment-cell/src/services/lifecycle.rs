use tracing::{debug, warn};

use shared_models::domain::AppointmentStatus;

use crate::models::AppointmentError;

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !Self::valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn valid_transitions(current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Scheduled => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal states
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn scheduled_appointments_can_move_on() {
        for next in [AppointmentStatus::Completed, AppointmentStatus::Cancelled, AppointmentStatus::NoShow] {
            assert!(AppointmentLifecycleService::validate_status_transition(AppointmentStatus::Scheduled, next).is_ok());
        }
    }

    #[test]
    fn terminal_states_stay_put() {
        for current in [AppointmentStatus::Completed, AppointmentStatus::Cancelled, AppointmentStatus::NoShow] {
            assert!(AppointmentLifecycleService::valid_transitions(current).is_empty());
        }

        assert_matches!(
            AppointmentLifecycleService::validate_status_transition(AppointmentStatus::Cancelled, AppointmentStatus::Completed),
            Err(AppointmentError::InvalidStatusTransition { from: AppointmentStatus::Cancelled, to: AppointmentStatus::Completed })
        );
    }

    #[test]
    fn rescheduling_to_same_state_is_rejected() {
        assert!(AppointmentLifecycleService::validate_status_transition(
            AppointmentStatus::Scheduled,
            AppointmentStatus::Scheduled
        )
        .is_err());
    }
}
