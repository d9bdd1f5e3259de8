//! Registry of host routines callable by name from definitions.
//!
//! Definitions using the external strategy name a class and a method. Both
//! are looked up here, in a table the host fills at startup. Each entry
//! declares its parameters so arguments can be bound from the resolved
//! target and the request's parameters.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use thiserror::Error;
use tracing::debug;

use crate::command::panic_message;
use crate::host::{Cell, Host};
use crate::params::{ParamKind, ParamValue, Parameters};
use crate::target::{EntityRef, ResolvedTarget, TargetKind, resolve_target};

/// Errors raised when looking up, binding or calling an invokable.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Invokable class not found: {0}")]
    ClassNotFound(String),

    #[error("Invokable method not found: {class}.{method}")]
    MethodNotFound { class: String, method: String },

    #[error("Cannot bind argument '{name}': expected {expected}, got '{value}'")]
    Binding {
        name: String,
        expected: String,
        value: String,
    },

    #[error("{0}")]
    Failed(String),

    #[error("Invocation panicked: {0}")]
    Panicked(String),
}

/// Declared kind of an invokable argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Pawn,
    Thing,
    Building,
    Cell,
    Zone,
    Faction,
    WorldObject,
    Value(ParamKind),
}

impl ArgKind {
    /// Whether a resolved target can fill an argument of this kind.
    fn accepts(&self, target: &ResolvedTarget) -> bool {
        match (self, target) {
            (Self::Pawn, ResolvedTarget::Pawn(_)) => true,
            (Self::Thing, ResolvedTarget::Thing(_) | ResolvedTarget::Building(_)) => true,
            (Self::Building, ResolvedTarget::Building(_)) => true,
            (Self::Cell, ResolvedTarget::Cell(_)) => true,
            (Self::Zone, ResolvedTarget::Zone(_)) => true,
            (Self::Faction, ResolvedTarget::Faction(_)) => true,
            (Self::WorldObject, ResolvedTarget::WorldObject(_)) => true,
            _ => false,
        }
    }

    /// Target kind used to resolve a named entity argument.
    fn target_kind(&self) -> Option<TargetKind> {
        match self {
            Self::Pawn => Some(TargetKind::Pawn),
            Self::Thing => Some(TargetKind::Thing),
            Self::Building => Some(TargetKind::Building),
            Self::Cell => Some(TargetKind::Cell),
            Self::Zone => Some(TargetKind::Zone),
            Self::Faction => Some(TargetKind::Faction),
            Self::WorldObject => Some(TargetKind::WorldObject),
            Self::Value(_) => None,
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(kind) => write!(f, "{kind}"),
            other => match other.target_kind() {
                Some(kind) => write!(f, "{kind}"),
                None => Ok(()),
            },
        }
    }
}

/// A declared invokable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeParam {
    pub name: String,
    pub kind: ArgKind,
    pub default: Option<ParamValue>,
}

impl InvokeParam {
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// A bound argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Target(ResolvedTarget),
    Value(ParamValue),
    Null,
}

/// Arguments bound for one call, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Arg>,
}

impl Args {
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.values.get(index)
    }

    pub fn target(&self, index: usize) -> Option<&ResolvedTarget> {
        match self.values.get(index) {
            Some(Arg::Target(t)) => Some(t),
            _ => None,
        }
    }

    pub fn pawn(&self, index: usize) -> Option<&EntityRef> {
        self.target(index).and_then(ResolvedTarget::as_pawn)
    }

    pub fn faction(&self, index: usize) -> Option<&EntityRef> {
        self.target(index).and_then(ResolvedTarget::as_faction)
    }

    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.target(index).and_then(ResolvedTarget::as_cell)
    }

    pub fn value(&self, index: usize) -> Option<&ParamValue> {
        match self.values.get(index) {
            Some(Arg::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        self.value(index).and_then(ParamValue::as_int)
    }

    pub fn bool(&self, index: usize) -> Option<bool> {
        self.value(index).and_then(ParamValue::as_bool)
    }

    pub fn text(&self, index: usize) -> Option<String> {
        self.value(index).map(ToString::to_string)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Host routine body. `Ok(Some(text))` becomes the command's result text.
pub type InvokeFn = dyn Fn(&mut dyn Host, &Args) -> Result<Option<String>, String> + Send + Sync;

/// A callable host routine with its declared parameters.
pub struct Invokable {
    params: Vec<InvokeParam>,
    func: Box<InvokeFn>,
}

impl Invokable {
    pub fn new<F>(params: Vec<InvokeParam>, func: F) -> Self
    where
        F: Fn(&mut dyn Host, &Args) -> Result<Option<String>, String> + Send + Sync + 'static,
    {
        Self {
            params,
            func: Box::new(func),
        }
    }

    pub fn params(&self) -> &[InvokeParam] {
        &self.params
    }

    /// Bind arguments for each declared parameter, in order: the target if
    /// its kind fits, then a same-named parameter, then the declared
    /// default, then a zero value (or null for entities).
    pub fn bind(
        &self,
        host: &dyn Host,
        target: Option<&ResolvedTarget>,
        params: &Parameters,
    ) -> Result<Args, InvokeError> {
        let mut values = Vec::with_capacity(self.params.len());

        for param in &self.params {
            if let Some(t) = target
                && param.kind.accepts(t)
            {
                values.push(Arg::Target(t.clone()));
                continue;
            }

            if let Some(value) = params.get(&param.name) {
                values.push(bind_value(host, param, value)?);
                continue;
            }

            if let Some(default) = &param.default {
                values.push(Arg::Value(default.clone()));
                continue;
            }

            values.push(match param.kind {
                ArgKind::Value(kind) => kind.zero().map_or(Arg::Null, Arg::Value),
                _ => Arg::Null,
            });
        }

        Ok(Args { values })
    }

    /// Bind and call, containing panics.
    pub fn call(
        &self,
        host: &mut dyn Host,
        target: Option<&ResolvedTarget>,
        params: &Parameters,
    ) -> Result<Option<String>, InvokeError> {
        let args = self.bind(host, target, params)?;
        match catch_unwind(AssertUnwindSafe(|| (self.func)(host, &args))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(message)) => Err(InvokeError::Failed(message)),
            Err(payload) => Err(InvokeError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for Invokable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invokable")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn bind_value(host: &dyn Host, param: &InvokeParam, value: &ParamValue) -> Result<Arg, InvokeError> {
    let binding_error = || InvokeError::Binding {
        name: param.name.clone(),
        expected: param.kind.to_string(),
        value: value.to_string(),
    };

    match param.kind {
        ArgKind::Value(kind) => kind.convert(value).map(Arg::Value).ok_or_else(binding_error),
        entity => entity
            .target_kind()
            .and_then(|kind| resolve_target(host, kind, &value.to_string()))
            .map(Arg::Target)
            .ok_or_else(binding_error),
    }
}

/// Table of invokables, keyed by class and method name.
#[derive(Debug, Default)]
pub struct InvokableRegistry {
    classes: HashMap<String, HashMap<String, Invokable>>,
}

impl InvokableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `invokable` as `class.method`, replacing any previous entry.
    pub fn register(
        &mut self,
        class: impl Into<String>,
        method: impl Into<String>,
        invokable: Invokable,
    ) -> &mut Self {
        let class = class.into();
        let method = method.into();
        debug!(class = %class, method = %method, "Registered invokable");
        self.classes.entry(class).or_default().insert(method, invokable);
        self
    }

    pub fn lookup(&self, class: &str, method: &str) -> Result<&Invokable, InvokeError> {
        let methods = self
            .classes
            .get(class)
            .ok_or_else(|| InvokeError::ClassNotFound(class.to_string()))?;
        methods.get(method).ok_or_else(|| InvokeError::MethodNotFound {
            class: class.to_string(),
            method: method.to_string(),
        })
    }

    pub fn call(
        &self,
        class: &str,
        method: &str,
        host: &mut dyn Host,
        target: Option<&ResolvedTarget>,
        params: &Parameters,
    ) -> Result<Option<String>, InvokeError> {
        self.lookup(class, method)?.call(host, target, params)
    }

    pub fn contains(&self, class: &str, method: &str) -> bool {
        self.lookup(class, method).is_ok()
    }

    /// Registered `class.method` names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes
            .iter()
            .flat_map(|(class, methods)| methods.keys().map(move |m| format!("{class}.{m}")))
            .collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.classes.values().all(HashMap::is_empty)
    }
}
