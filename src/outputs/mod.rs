//! Output generation for the briefing mail.
//!
//! # Submodules
//!
//! - [`email`]: Wraps the digest in the HTML email template and builds the subject
//! - [`pdf`]: Renders the optional PDF attachment
//!
//! # Output Structure
//!
//! ```text
//! pdf_dir/
//! └── daily_briefing_2025-05-06.pdf   # overwritten by same-day re-runs
//! ```

pub mod email;
pub mod pdf;
