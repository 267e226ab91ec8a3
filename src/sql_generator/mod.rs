//! Expression compilation: fragments, parameter merging, aliases and the
//! expression translator.

pub mod alias_resolver;
pub mod errors;
pub mod fragment;
pub mod parameter_store;
pub mod translator;

pub use alias_resolver::{AliasBinding, AliasResolver};
pub use errors::{AliasError, TranslateError};
pub use fragment::{Fragment, Part};
pub use parameter_store::{inline_literals, merge, ParamOrigin, ParameterSlot, ParameterStore};
pub use translator::{ExprTranslator, Position, ProjectionItem};
