//! Detector: finds provider client constructor calls and resolves their
//! callees against the file's import bindings.

pub mod arguments;
pub mod bindings;
pub mod detector;
pub mod scope;
pub mod types;

pub use arguments::{ArgumentList, Entry, EntryKey};
pub use bindings::{ImportBinding, ImportBindings, ImportKind, Resolution};
pub use detector::{Detector, FileDetection};
pub use types::{ArgsRef, Match, Warning, WarningKind};
