//! Email transport boundary. The pipeline's contract ends at a rendered
//! subject/body per member; everything past that point is a collaborator
//! behind the [`EmailSender`] trait.

pub mod sendgrid;
pub mod template;

use serde_json::Value;
use tracing::{info, warn};

use crate::context::{normalize_template_context, Context, CourseCatalog};
use crate::error::Result;
use template::TemplateEngine;

/// Anything that can deliver one rendered message.
pub trait EmailSender {
    fn send_email(&self, to_email: &str, subject: &str, body_html: &str) -> Result<()>;
}

/// Per-recipient outcome of a bulk send run.
#[derive(Debug, Default)]
pub struct SendReport {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

/// Render and send one personalized message per member record. Records
/// without a resolvable email address are skipped; a failed send is
/// recorded and the run continues.
#[allow(clippy::too_many_arguments)]
pub fn send_bulk_emails(
    sender: &dyn EmailSender,
    members: &[Context],
    engine: &TemplateEngine,
    template_name: &str,
    subject_template: &str,
    catalog: Option<&CourseCatalog>,
    extraction_date: Option<&str>,
) -> Result<SendReport> {
    let mut report = SendReport::default();

    for member in members {
        let context = normalize_template_context(member, catalog, extraction_date);
        let Some(email) = recipient_email(&context) else {
            continue;
        };

        let subject = engine.render_str(subject_template, &context);
        let body_html = engine.render_file(template_name, &context)?;

        match sender.send_email(&email, &subject, &body_html) {
            Ok(()) => {
                info!("Sent to {email}");
                report.success.push(email);
            }
            Err(e) => {
                warn!("Failed to send to {email}: {e}");
                report.failed.push(email);
            }
        }
    }

    Ok(report)
}

/// The recipient address for a normalized context, probing the normalized
/// key before the original-cased one.
pub fn recipient_email(context: &Context) -> Option<String> {
    ["email", "Email"]
        .iter()
        .find_map(|key| context.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::io::Write;

    use crate::error::MailerError;

    struct RecordingSender {
        sent: RefCell<Vec<(String, String)>>,
        fail_for: Option<String>,
    }

    impl RecordingSender {
        fn new(fail_for: Option<&str>) -> Self {
            RecordingSender {
                sent: RefCell::new(Vec::new()),
                fail_for: fail_for.map(str::to_string),
            }
        }
    }

    impl EmailSender for RecordingSender {
        fn send_email(&self, to_email: &str, subject: &str, _body_html: &str) -> Result<()> {
            if self.fail_for.as_deref() == Some(to_email) {
                return Err(MailerError::EmailSend("rejected".to_string()));
            }
            self.sent
                .borrow_mut()
                .push((to_email.to_string(), subject.to_string()));
            Ok(())
        }
    }

    fn member(email: Option<&str>, first: &str) -> Context {
        let mut record = Context::new();
        record.insert("First Name".to_string(), json!(first));
        if let Some(email) = email {
            record.insert("Email".to_string(), json!(email));
        }
        record
    }

    fn engine_with_template(dir: &tempfile::TempDir) -> TemplateEngine {
        let mut file = std::fs::File::create(dir.path().join("notice.html")).unwrap();
        file.write_all(b"<p>Hello {{ first_name_titlecase }}</p>")
            .unwrap();
        TemplateEngine::new(Some(dir.path().to_str().unwrap()))
    }

    #[test]
    fn sends_to_every_member_with_an_email() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_template(&dir);
        let sender = RecordingSender::new(None);
        let members = vec![
            member(Some("a@example.com"), "ANN"),
            member(None, "BOB"),
            member(Some("c@example.com"), "CAROL"),
        ];

        let report = send_bulk_emails(
            &sender,
            &members,
            &engine,
            "notice.html",
            "Hi {{ first_name_titlecase }}",
            None,
            None,
        )
        .unwrap();

        assert_eq!(report.success, ["a@example.com", "c@example.com"]);
        assert!(report.failed.is_empty());
        let sent = sender.sent.borrow();
        assert_eq!(sent[0].1, "Hi Ann");
        assert_eq!(sent[1].1, "Hi Carol");
    }

    #[test]
    fn failed_sends_are_collected_and_do_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_template(&dir);
        let sender = RecordingSender::new(Some("a@example.com"));
        let members = vec![
            member(Some("a@example.com"), "ANN"),
            member(Some("c@example.com"), "CAROL"),
        ];

        let report = send_bulk_emails(
            &sender,
            &members,
            &engine,
            "notice.html",
            "Subject",
            None,
            None,
        )
        .unwrap();

        assert_eq!(report.failed, ["a@example.com"]);
        assert_eq!(report.success, ["c@example.com"]);
    }
}
