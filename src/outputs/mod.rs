//! Output stages: rendering the newsletter and delivering it.
//!
//! # Submodules
//!
//! - [`html`]: builds the HTML body from articles or a generated narrative
//! - [`email`]: checks credentials and sends the body over SMTP

pub mod email;
pub mod html;
