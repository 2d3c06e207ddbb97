//! Digest output: standalone HTML export and SMTP delivery.

pub mod email;
pub mod html;

pub use email::EmailSender;
pub use html::{digest_html_path, export_standalone_html, render_digest_html};
