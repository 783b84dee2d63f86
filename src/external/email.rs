use crate::common::errors::BusinessError;
use crate::config::EmailConfig;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::json;
use std::time::Duration;

/// A finalized sample report ready to be delivered
#[derive(Debug, Clone)]
pub struct FinalizedReport {
    pub sample_id: String,
    pub recipient: String,
    pub subject: String,
    pub message: String,
    pub attachment_name: String,
    pub pdf: Vec<u8>,
}

/// Outbound channel for finalized reports
#[async_trait]
pub trait ReportNotifier: Send + Sync {
    async fn send_report(&self, report: &FinalizedReport) -> Result<(), BusinessError>;
}

/// Sends reports through a transactional email HTTP API
/// (EmailJS-compatible `send` endpoint).
pub struct HttpEmailNotifier {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpEmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, BusinessError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BusinessError::internal(format!("Failed to build email client: {e}")))?;
        Ok(Self { client, config })
    }

    fn payload(&self, report: &FinalizedReport) -> serde_json::Value {
        json!({
            "service_id": self.config.service_id,
            "template_id": self.config.template_id,
            "user_id": self.config.public_key,
            "accessToken": self.config.access_token,
            "template_params": {
                "to_email": report.recipient,
                "subject": report.subject,
                "message": report.message,
                "sample_id": report.sample_id,
                "attachment": STANDARD.encode(&report.pdf),
                "attachment_name": report.attachment_name,
            }
        })
    }
}

#[async_trait]
impl ReportNotifier for HttpEmailNotifier {
    async fn send_report(&self, report: &FinalizedReport) -> Result<(), BusinessError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&self.payload(report))
            .send()
            .await
            .map_err(|e| BusinessError::ExternalServiceError {
                service: "email".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(sample_id = %report.sample_id, "Report email accepted by provider");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(BusinessError::ExternalServiceError {
            service: "email".to_string(),
            message: format!("provider answered {status}: {detail}"),
        })
    }
}

/// Used when no email provider is configured. Every send fails, leaving the
/// notification pending so it can be retried once delivery is set up.
pub struct DisabledNotifier;

#[async_trait]
impl ReportNotifier for DisabledNotifier {
    async fn send_report(&self, _report: &FinalizedReport) -> Result<(), BusinessError> {
        Err(BusinessError::ExternalServiceError {
            service: "email".to_string(),
            message: "email delivery not configured".to_string(),
        })
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<FinalizedReport>>,
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<FinalizedReport> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl ReportNotifier for RecordingNotifier {
    async fn send_report(&self, report: &FinalizedReport) -> Result<(), BusinessError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BusinessError::ExternalServiceError {
                service: "email".to_string(),
                message: "simulated outage".to_string(),
            });
        }
        self.sent.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> FinalizedReport {
        FinalizedReport {
            sample_id: "SMP-00001".to_string(),
            recipient: "reports@example.test".to_string(),
            subject: "Sample SMP-00001 finalized".to_string(),
            message: "Report attached".to_string(),
            attachment_name: "Sample_Report_SMP-00001.pdf".to_string(),
            pdf: b"%PDF-1.3".to_vec(),
        }
    }

    #[test]
    fn test_payload_carries_base64_attachment() {
        let notifier = HttpEmailNotifier::new(EmailConfig {
            api_url: "http://localhost:9/send".to_string(),
            service_id: "svc".to_string(),
            template_id: "tpl".to_string(),
            public_key: "pk".to_string(),
            access_token: None,
        })
        .unwrap();

        let payload = notifier.payload(&report());
        assert_eq!(payload["service_id"], "svc");
        assert_eq!(payload["user_id"], "pk");
        assert_eq!(payload["template_params"]["attachment"], STANDARD.encode(b"%PDF-1.3"));
        assert_eq!(
            payload["template_params"]["attachment_name"],
            "Sample_Report_SMP-00001.pdf"
        );
    }

    #[tokio::test]
    async fn test_disabled_notifier_fails() {
        let err = DisabledNotifier.send_report(&report()).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn test_recording_notifier_records_and_fails_on_demand() {
        let notifier = RecordingNotifier::default();
        notifier.send_report(&report()).await.unwrap();
        notifier.set_failing(true);
        assert!(notifier.send_report(&report()).await.is_err());
        assert_eq!(notifier.sent().len(), 1);
    }
}
