//! User-registered keyword/vocabulary extensions.
//!
//! Modeled the same way as [`crate::formats::Format`], [`crate::content::Decoder`]
//! and [`crate::content::MediaType`]: one small trait per concern, resolved to a
//! boxed handle at compile time and stored on the node that owns the keyword.

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::{CompileError, ValidationError};

/// Context handed to [`Extension::compile`]; carries just enough of the
/// builder's state for an extension to resolve its own keyword value.
pub struct CompileCtx<'a> {
    pub loc: &'a str,
    pub draft_version: usize,
}

/// Context handed to [`Extension::validate`].
pub struct ValidateCtx<'a> {
    pub keyword_location: &'a str,
    pub instance_location: &'a str,
}

/// A user-defined keyword. `compile` inspects the raw schema object for the
/// keyword(s) this extension owns and returns an opaque compiled form;
/// `validate` is later called with that compiled form against an instance.
///
/// Extensions participate in vocabulary negotiation (`$vocabulary`): a
/// compiler that registers an extension for vocabulary URL `u` treats `u` as
/// satisfied even if it is not one of the draft's built-in vocabularies.
pub trait Extension: Debug {
    /// Canonical vocabulary URL this extension implements, if any. A
    /// `$vocabulary` block that marks this URL required is satisfied once
    /// the extension is registered.
    fn vocabulary(&self) -> Option<&str> {
        None
    }

    /// Inspect `schema` (the raw, not-yet-compiled keyword object) and
    /// produce a compiled representation, or `None` if this extension's
    /// keyword is absent.
    fn compile(&self, ctx: &CompileCtx, schema: &Value) -> Result<Option<Value>, CompileError>;

    /// Validate `instance` using the compiled value previously returned by
    /// `compile`.
    fn validate(
        &self,
        ctx: &ValidateCtx,
        compiled: &Value,
        instance: &Value,
    ) -> Result<(), ValidationError>;
}

/// Extensions are kept behind `Arc` so a compiled [`crate::Schema`] node can
/// hold its own handle without borrowing from the (short-lived) `Compiler`.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<(String, Arc<dyn Extension>)>,
}

impl ExtensionRegistry {
    pub fn register(&mut self, keyword: impl Into<String>, ext: Arc<dyn Extension>) {
        self.extensions.push((keyword.into(), ext));
    }

    pub fn get(&self, keyword: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions
            .iter()
            .find(|(name, _)| name == keyword)
            .map(|(_, ext)| ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Extension>)> {
        self.extensions.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn supports_vocabulary(&self, url: &str) -> bool {
        self.extensions
            .iter()
            .any(|(_, ext)| ext.vocabulary() == Some(url))
    }
}
