//! Low-level helpers shared by the spreadsheet readers.

pub(crate) mod locator;
pub(crate) mod xml;
pub(crate) mod zip;
