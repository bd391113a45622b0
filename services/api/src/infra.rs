use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use matricula::workflows::enrollment::{NotifyError, PromotionNotice, PromotionNotifier};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier backing the deployed service. Promotion notices land on the log
/// pipeline, where the mail dispatcher picks them up downstream.
#[derive(Default, Clone)]
pub(crate) struct LogNotifier;

impl PromotionNotifier for LogNotifier {
    fn notify(&self, notice: PromotionNotice) -> Result<(), NotifyError> {
        info!(
            enrollment = %notice.enrollment_id,
            student = %notice.student_id,
            section = %notice.section_id,
            "seat assigned from waitlist"
        );
        Ok(())
    }
}

/// Recording notifier so the demo can show what would have been mailed.
#[derive(Default, Clone)]
pub(crate) struct RecordingNotifier {
    notices: Arc<Mutex<Vec<PromotionNotice>>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<PromotionNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl PromotionNotifier for RecordingNotifier {
    fn notify(&self, notice: PromotionNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}
