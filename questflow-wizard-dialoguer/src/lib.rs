//! # questflow-wizard-dialoguer
//!
//! Dialoguer front end for questflow.
//!
//! Questions are presented one at a time in a classic CLI wizard style.
//! Choice questions and statements get a "Back" entry once there is a previous
//! question; text prompts accept `<` for the same purpose.
//!
//! ## Example
//!
//! ```rust,no_run
//! use questflow::collect;
//! use questflow_wizard_dialoguer::DialoguerWizard;
//!
//! fn main() -> anyhow::Result<()> {
//!     let survey = example_surveys::mobility()?;
//!     let answers = collect(&survey, &mut DialoguerWizard::new())?;
//!     println!("{} answers", answers.len());
//!     Ok(())
//! }
//! ```

mod backend;

pub use backend::{DialoguerError, DialoguerWizard};
