// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The taxonomy uses three severity levels that drive presentation.

use crate::error::BlattwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth simply trying again.
    Transient,
    /// User must do something (pick another file, fix a setting).
    ActionRequired,
    /// Cannot be fixed by retrying or user action.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same action might succeed.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `BlattwerkError` into a `HumanError`.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    match err {
        // -- Document errors --
        BlattwerkError::Decode(_) => HumanError {
            message: "This file isn't a PDF we can open.".into(),
            suggestion: "Choose a PDF document. Your current document and edits were kept.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::Render { page, .. } => HumanError {
            message: format!("Page {page} couldn't be displayed."),
            suggestion: "The page may use content this editor can't draw. Try exporting the PDF from another program first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::PageOutOfRange { page_count, .. } => HumanError {
            message: "That page doesn't exist.".into(),
            suggestion: format!("Choose a page between 1 and {page_count}."),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::NoDocument => HumanError {
            message: "No document is open.".into(),
            suggestion: "Open a PDF first, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::PdfError(_) => HumanError {
            message: "There's a problem writing the PDF file.".into(),
            suggestion: "Try exporting again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BlattwerkError::ImageError(_) => HumanError {
            message: "There's a problem with a page image.".into(),
            suggestion: "The image may be damaged or in an unusual format.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Overlay / compositing --
        BlattwerkError::OverlayRestore(_) => HumanError {
            message: "Saved edits for this page couldn't be loaded.".into(),
            suggestion: "The page was opened without its edits. Other pages are unaffected.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::InvalidObject(detail) => HumanError {
            message: "That annotation can't be placed on the page.".into(),
            suggestion: format!("Check its position and size. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::Composite { .. } => HumanError {
            message: "Edits didn't line up with the page.".into(),
            suggestion: "This is a bug. Please report it along with the document, if you can.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::ExportFailed { page, source } => {
            let inner = humanize_error(source);
            HumanError {
                message: format!("Saving stopped at page {page}. No file was written."),
                suggestion: inner.suggestion,
                retriable: inner.retriable,
                severity: inner.severity,
            }
        }

        BlattwerkError::Font(_) => HumanError {
            message: "The font for text annotations couldn't be loaded.".into(),
            suggestion: "Check the font path in the settings points to a .ttf or .otf file.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::InvalidConfig(detail) => HumanError {
            message: "A setting has an invalid value.".into(),
            suggestion: format!("Fix the settings file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Storage --
        BlattwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Blattwerk doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or choose a different location.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        BlattwerkError::Serialization(_) => HumanError {
            message: "A settings or edits file couldn't be read.".into(),
            suggestion: "Check the file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
