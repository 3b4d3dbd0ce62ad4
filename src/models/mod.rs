mod audit_event;
mod chat_assignment;
mod developer;
mod organization;
mod refresh_token;
mod user;
mod whatsapp_session;

pub use audit_event::AuditEvent;
pub use chat_assignment::{AssignmentWithDeveloper, ChatAssignment};
pub use developer::{Developer, DeveloperProfile};
pub use organization::Organization;
pub use refresh_token::RefreshToken;
pub use user::{ROLE_ADMIN, ROLE_DEVELOPER, User};
pub use whatsapp_session::WhatsAppSession;
