//! # exd_sheet
//!
//! An ASAM ODS external-data (EXD API) reader for spreadsheet files. It exposes the tables of
//! Excel (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`, `.xlam`) and OpenDocument (`.ods`) workbooks as
//! measurement groups and channels.
//!
//! ## Features
//!
//! - **Structure discovery**: every non-empty sheet becomes a group. Header, unit and description
//!   rows are detected from the cell layout, and each column gets a fixed semantic type
//! - **Typed values**: column-major `DT_DOUBLE`, `DT_STRING` and `DT_DATE` arrays, padded with
//!   missing values past the end of the data
//! - **Long-lived handles**: files stay open between calls and may be read concurrently
//! - **Streaming readers**: sheets are parsed only as far as a request needs
//!
//! ## Operations
//!
//! [`service::ExternalDataReader`] implements `Open`, `GetStructure`, `GetValues` and `Close`.
//! [`server`] serves them as newline-delimited JSON over TCP.

pub mod config;
pub mod error;
pub(crate) mod helpers;
pub mod registry;
pub mod server;
pub mod service;
pub(crate) mod spreadsheet;
pub mod structure;
pub mod values;

#[cfg(test)]
mod fixtures;
