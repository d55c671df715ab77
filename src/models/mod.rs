//! Data models
//!
//! This module contains all data structures used throughout Keystone.
//! Models represent:
//! - Stored entities (BlogPost, Property, Testimonial, AdminUser,
//!   NewsletterSubscriber, ContactMessage, ActivityLog, ContentVersion)
//! - API request/response types
//! - The `Record` trait shared by both storage backends

mod activity;
mod blog_post;
mod contact;
mod property;
mod record;
mod status;
mod subscriber;
mod testimonial;
mod user;
mod version;

pub use activity::ActivityLog;
pub use blog_post::{BlogPost, CreateBlogPostInput, UpdateBlogPostInput};
pub use contact::{ContactInput, ContactMessage, ContactStatus, UpdateContactStatusInput};
pub use property::{CreatePropertyInput, ListingKind, Property, PropertyType, UpdatePropertyInput};
pub use record::{new_id, Record};
pub use status::{ContentStatus, Publication};
pub use subscriber::{NewsletterSubscriber, SubscribeInput, SubscriberStatus, UnsubscribeInput};
pub use testimonial::{CreateTestimonialInput, Testimonial, UpdateTestimonialInput};
pub use user::{
    AdminUser, CreateUserInput, Permission, Session, UpdateUserInput, UserResponse, UserRole,
};
pub use version::ContentVersion;
