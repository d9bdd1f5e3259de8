//! Data-defined command descriptors.
//!
//! A [`CommandDefinition`] is deserialized from YAML. It names an action,
//! declares its target and parameters, sets permission and usage limits, and
//! picks exactly one execution strategy.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use warden_ratelimits::UsageLimits;

use crate::params::ParamKind;
use crate::primitive::PrimitiveAction;
use crate::target::TargetKind;

/// Lowest affinity value; requirements at or below it are not checked.
pub const MIN_AFFINITY: f32 = -100.0;

/// Configuration problems found in a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("CommandDefinition requires action_name")]
    MissingActionName,

    #[error(
        "CommandDefinition requires at least one execution method \
         (delegate_to_command, external_class/external_method, or primitive_action)"
    )]
    NoStrategy,

    #[error("CommandDefinition should only have one execution method, found: {}", .0.join(", "))]
    MultipleStrategies(Vec<&'static str>),

    #[error("external_class and external_method must be set together")]
    IncompleteExternal,

    #[error("Parameter #{0} has no name")]
    UnnamedParameter(usize),

    #[error("Duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("requires_target is set but target_type is none")]
    MissingTargetType,
}

/// A declared parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,

    /// Declared type name, see [`ParamKind::parse`].
    #[serde(rename = "type", default = "default_param_type")]
    pub type_name: String,

    #[serde(default = "default_true")]
    pub required: bool,

    #[serde(default, deserialize_with = "scalar_string")]
    pub default_value: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub allowed_values: Vec<String>,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            required: true,
            default_value: None,
            description: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self.required = false;
        self
    }

    pub fn kind(&self) -> ParamKind {
        ParamKind::parse(&self.type_name)
    }
}

fn default_param_type() -> String {
    "string".to_string()
}

fn default_true() -> bool {
    true
}

/// The one way a definition executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Forward to another registered command.
    Delegate { command: String },
    /// Call a registered invokable.
    External { class: String, method: String },
    /// Run a built-in primitive.
    Primitive {
        action: PrimitiveAction,
        params: BTreeMap<String, String>,
    },
}

impl ExecutionStrategy {
    pub fn describe(&self) -> String {
        match self {
            Self::Delegate { command } => format!("delegates to {command}"),
            Self::External { class, method } => format!("calls {class}.{method}"),
            Self::Primitive { action, .. } => format!("primitive {action}"),
        }
    }
}

/// A command described entirely by data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDefinition {
    pub action_name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,

    // Target
    pub requires_target: bool,
    pub target_type: TargetKind,
    /// Informational only; shown in the description.
    pub target_filters: Vec<String>,

    pub parameters: Vec<ParameterDef>,

    // Execution strategies, exactly one must be set
    pub delegate_to_command: Option<String>,
    pub external_class: Option<String>,
    pub external_method: Option<String>,
    pub primitive_action: Option<PrimitiveAction>,
    #[serde(deserialize_with = "scalar_string_map")]
    pub action_params: BTreeMap<String, String>,

    // Permissions and limits
    pub requires_elevated_mode: bool,
    pub cooldown_ticks: u64,
    pub daily_limit: u32,
    pub min_affinity_required: f32,
    pub affinity_cost_on_success: f32,

    // Feedback
    pub success_message: Option<String>,
    pub failure_message: Option<String>,
    pub show_message: bool,
}

impl Default for CommandDefinition {
    fn default() -> Self {
        Self {
            action_name: String::new(),
            label: None,
            description: None,
            tags: Vec::new(),
            requires_target: false,
            target_type: TargetKind::None,
            target_filters: Vec::new(),
            parameters: Vec::new(),
            delegate_to_command: None,
            external_class: None,
            external_method: None,
            primitive_action: None,
            action_params: BTreeMap::new(),
            requires_elevated_mode: false,
            cooldown_ticks: 0,
            daily_limit: 0,
            min_affinity_required: MIN_AFFINITY,
            affinity_cost_on_success: 0.0,
            success_message: None,
            failure_message: None,
            show_message: true,
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl CommandDefinition {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            ..Default::default()
        }
    }

    /// Every configuration problem, empty when the definition is usable.
    pub fn config_errors(&self) -> Vec<DefinitionError> {
        let mut errors = Vec::new();

        if self.action_name.trim().is_empty() {
            errors.push(DefinitionError::MissingActionName);
        }

        if is_set(&self.external_class) != is_set(&self.external_method) {
            errors.push(DefinitionError::IncompleteExternal);
        }

        let found = self.strategy_names();
        match found.len() {
            0 => errors.push(DefinitionError::NoStrategy),
            1 => {}
            _ => errors.push(DefinitionError::MultipleStrategies(found)),
        }

        if self.requires_target && self.target_type == TargetKind::None {
            errors.push(DefinitionError::MissingTargetType);
        }

        let mut seen = HashSet::new();
        for (index, param) in self.parameters.iter().enumerate() {
            let name = param.name.trim();
            if name.is_empty() {
                errors.push(DefinitionError::UnnamedParameter(index));
            } else if !seen.insert(name.to_lowercase()) {
                errors.push(DefinitionError::DuplicateParameter(name.to_string()));
            }
        }

        errors
    }

    fn strategy_names(&self) -> Vec<&'static str> {
        let mut found = Vec::new();
        if is_set(&self.delegate_to_command) {
            found.push("delegate_to_command");
        }
        if is_set(&self.external_class) && is_set(&self.external_method) {
            found.push("external_class/external_method");
        }
        if self.primitive_action.is_some() {
            found.push("primitive_action");
        }
        found
    }

    /// The configured strategy. Fails like [`config_errors`](Self::config_errors)
    /// when there is not exactly one.
    pub fn strategy(&self) -> Result<ExecutionStrategy, DefinitionError> {
        let found = self.strategy_names();
        if found.len() > 1 {
            return Err(DefinitionError::MultipleStrategies(found));
        }

        if let Some(command) = self.delegate_to_command.as_deref().filter(|s| !s.trim().is_empty()) {
            return Ok(ExecutionStrategy::Delegate {
                command: command.trim().to_string(),
            });
        }
        if let (Some(class), Some(method)) = (&self.external_class, &self.external_method)
            && !class.trim().is_empty()
            && !method.trim().is_empty()
        {
            return Ok(ExecutionStrategy::External {
                class: class.trim().to_string(),
                method: method.trim().to_string(),
            });
        }
        if let Some(action) = self.primitive_action {
            return Ok(ExecutionStrategy::Primitive {
                action,
                params: self.action_params.clone(),
            });
        }

        Err(DefinitionError::NoStrategy)
    }

    pub fn limits(&self) -> UsageLimits {
        UsageLimits::new(self.cooldown_ticks, self.daily_limit)
    }

    /// Whether an affinity requirement is configured.
    pub fn has_affinity_requirement(&self) -> bool {
        self.min_affinity_required > MIN_AFFINITY
    }

    /// Description shown to the agent: summary, target, parameters and
    /// requirements.
    pub fn full_description(&self) -> String {
        let summary = self
            .description
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or(&self.action_name);
        let mut out = format!("**{}**: {}", self.action_name, summary);

        if self.target_type != TargetKind::None {
            let optional = if self.requires_target { "" } else { " (optional)" };
            let _ = write!(out, "\nTarget: {}{optional}", self.target_type);
            if !self.target_filters.is_empty() {
                let _ = write!(out, "\nFilters: {}", self.target_filters.join(", "));
            }
        }

        if !self.parameters.is_empty() {
            out.push_str("\nParameters:");
            for param in &self.parameters {
                let required = if param.required { "required" } else { "optional" };
                let _ = write!(out, "\n  - {}: {} ({required})", param.name, param.kind());
                if let Some(default) = &param.default_value {
                    let _ = write!(out, ", default {default}");
                }
                if !param.allowed_values.is_empty() {
                    let _ = write!(out, ", one of: {}", param.allowed_values.join(", "));
                }
                if let Some(description) = &param.description {
                    let _ = write!(out, "\n    {description}");
                }
            }
        }

        if self.requires_elevated_mode {
            out.push_str("\nRequires elevated mode");
        }
        if self.has_affinity_requirement() {
            let _ = write!(out, "\nRequires affinity >= {}", self.min_affinity_required);
        }
        if self.affinity_cost_on_success > 0.0 {
            let _ = write!(out, "\nCosts {} affinity", self.affinity_cost_on_success);
        }
        if self.cooldown_ticks > 0 {
            let _ = write!(out, "\nCooldown: {} ticks", self.cooldown_ticks);
        }
        if self.daily_limit > 0 {
            let _ = write!(out, "\nDaily limit: {}", self.daily_limit);
        }

        out
    }
}

/// Read a YAML scalar of any type as its text.
fn scalar_to_string<E: serde::de::Error>(value: serde_yaml::Value) -> Result<Option<String>, E> {
    match value {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(s) => Ok(Some(s)),
        serde_yaml::Value::Number(n) => Ok(Some(n.to_string())),
        serde_yaml::Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(E::custom("expected a scalar value")),
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    scalar_to_string(serde_yaml::Value::deserialize(deserializer)?)
}

fn scalar_string_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = Option::<BTreeMap<String, serde_yaml::Value>>::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (key, value) in raw.unwrap_or_default() {
        match scalar_to_string::<D::Error>(value) {
            Ok(Some(text)) => {
                out.insert(key, text);
            }
            Ok(None) => {}
            Err(_) => {
                return Err(D::Error::custom(format!(
                    "action_params.{key} must be a scalar value"
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> CommandDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_deserialize_full() {
        let def = parse(
            r#"
action_name: GiftSilver
label: Gift silver
description: Drop silver for the colony
primitive_action: add_silver
action_params:
  amount: 500
cooldown_ticks: 6000
daily_limit: 2
min_affinity_required: 40
affinity_cost_on_success: 5
parameters:
  - name: amount
    type: int
    default_value: 100
    required: false
"#,
        );

        assert_eq!(def.action_name, "GiftSilver");
        assert_eq!(def.primitive_action, Some(PrimitiveAction::AddSilver));
        assert_eq!(def.action_params.get("amount").map(String::as_str), Some("500"));
        assert_eq!(def.limits(), UsageLimits::new(6000, 2));
        assert_eq!(def.parameters[0].kind(), ParamKind::Int);
        assert_eq!(def.parameters[0].default_value.as_deref(), Some("100"));
        assert!(def.show_message);
        assert!(def.has_affinity_requirement());
        assert!(def.config_errors().is_empty());
    }

    #[test]
    fn test_defaults() {
        let def = parse("action_name: Noop\ndelegate_to_command: HealPawn\n");
        assert_eq!(def.target_type, TargetKind::None);
        assert_eq!(def.min_affinity_required, MIN_AFFINITY);
        assert!(!def.has_affinity_requirement());
        assert!(def.show_message);
        assert_eq!(
            def.strategy(),
            Ok(ExecutionStrategy::Delegate {
                command: "HealPawn".to_string()
            })
        );
    }

    #[test]
    fn test_no_strategy() {
        let def = CommandDefinition::new("Nothing");
        assert_eq!(def.config_errors(), vec![DefinitionError::NoStrategy]);
        assert_eq!(def.strategy(), Err(DefinitionError::NoStrategy));
    }

    #[test]
    fn test_two_strategies() {
        let mut def = CommandDefinition::new("Both");
        def.primitive_action = Some(PrimitiveAction::HealPawn);
        def.delegate_to_command = Some("X".to_string());

        let errors = def.config_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("should only have one execution method"));
        assert!(def.strategy().is_err());
    }

    #[test]
    fn test_missing_name_and_half_external() {
        let mut def = CommandDefinition::new("  ");
        def.external_class = Some("Sandbox.DebugTools".to_string());

        let errors = def.config_errors();
        assert!(errors.contains(&DefinitionError::MissingActionName));
        assert!(errors.contains(&DefinitionError::IncompleteExternal));
        assert!(errors.contains(&DefinitionError::NoStrategy));
    }

    #[test]
    fn test_parameter_problems() {
        let mut def = CommandDefinition::new("Params");
        def.primitive_action = Some(PrimitiveAction::SpawnThing);
        def.parameters = vec![
            ParameterDef::new("count", "int"),
            ParameterDef::new("Count", "int"),
            ParameterDef::new("", "string"),
        ];

        assert_eq!(
            def.config_errors(),
            vec![
                DefinitionError::DuplicateParameter("Count".to_string()),
                DefinitionError::UnnamedParameter(2),
            ]
        );
    }

    #[test]
    fn test_requires_target_without_type() {
        let mut def = CommandDefinition::new("Heal");
        def.primitive_action = Some(PrimitiveAction::HealPawn);
        def.requires_target = true;
        assert_eq!(def.config_errors(), vec![DefinitionError::MissingTargetType]);
    }

    #[test]
    fn test_full_description() {
        let mut def = CommandDefinition::new("SpawnSteel");
        def.description = Some("Drop steel".to_string());
        def.target_type = TargetKind::Cell;
        def.primitive_action = Some(PrimitiveAction::SpawnThing);
        def.min_affinity_required = 20.0;
        def.affinity_cost_on_success = 3.0;
        def.parameters = vec![ParameterDef::new("count", "int").with_default("75")];

        let text = def.full_description();
        assert_eq!(
            text,
            "**SpawnSteel**: Drop steel\n\
             Target: cell (optional)\n\
             Parameters:\n  \
             - count: int (optional), default 75\n\
             Requires affinity >= 20\n\
             Costs 3 affinity"
        );
    }

    #[test]
    fn test_non_scalar_action_param_rejected() {
        let result: Result<CommandDefinition, _> = serde_yaml::from_str(
            "action_name: X\nprimitive_action: heal_pawn\naction_params:\n  nested: [1, 2]\n",
        );
        assert!(result.is_err());
    }
}
