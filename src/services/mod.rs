//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Validating input and enforcing business rules
//! - Keeping publication status, slugs and version history consistent
//! - Recording admin activity

pub mod activity;
pub mod blog;
pub mod contact;
pub mod content;
pub mod mail;
pub mod markdown;
pub mod password;
pub mod property;
pub mod rate_limiter;
pub mod scheduler;
pub mod slug;
pub mod subscriber;
pub mod testimonial;
pub mod user;
pub mod version;

pub use activity::{ActivityService, Actor};
pub use blog::{BlogFilter, BlogService};
pub use contact::{ContactError, ContactService};
pub use content::ContentError;
pub use mail::Mailer;
pub use markdown::MarkdownRenderer;
pub use password::{hash_password, verify_password};
pub use property::{PropertyFilter, PropertyService};
pub use rate_limiter::LoginRateLimiter;
pub use scheduler::Scheduler;
pub use slug::generate_slug;
pub use subscriber::{SubscribeOutcome, SubscriberError, SubscriberService};
pub use testimonial::TestimonialService;
pub use user::{LoginInput, UserService, UserServiceError};
pub use version::VersionService;
