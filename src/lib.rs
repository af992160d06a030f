//! DOCX Mail Merge
//!
//! Fills placeholders in a Word template with text, images and tables.
//!
//! This library provides:
//! - `instruction`: the JSON instruction list and its typed form
//! - `merge`: the merge engine over DOCX bytes or a DOCX data URI
//! - `resolver`: placeholder lookup and replacement inside the body markup
//! - `fragments`: generated paragraph, table and image markup
//!
//! Binaries:
//! - `docx-merge`: merge a template file with an instruction file
//!
//! ```no_run
//! use docx_mail_merge::{merge_docx, Instruction};
//!
//! let template = std::fs::read("template.docx")?;
//! let merged = merge_docx(&template, &[Instruction::text("{{NAME}}", "World")])?;
//! std::fs::write("out.docx", merged)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod config;
pub mod content_types;
pub mod envelope;
pub mod error;
pub mod fragments;
pub mod instruction;
pub mod merge;
pub mod relationships;
pub mod resolver;
pub mod xml;

pub use config::MergeConfig;
pub use error::{MergeError, Result};
pub use instruction::{Content, Instruction};
pub use merge::{merge_data_uri, merge_docx, MailMerge, MergeContext};
