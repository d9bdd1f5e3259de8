//! End-to-end dispatch tests for the warden-commands crate.
//!
//! Definitions are parsed from YAML, registered next to the built-ins and
//! dispatched through the parser against a sandbox world.

use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use warden_commands::sandbox::{RecordingNotifier, SandboxWorld, register_debug_tools};
use warden_commands::{
    AiCommand, CommandContext, CommandError, CommandParser, CommandRegistry, CommandRequest,
    CommandServices, DefinitionCommand, ERROR_MAGNITUDE, EntityId, FAILURE_MAGNITUDE,
    InvocationError, InvokableRegistry, LimitViolation, ManualClock, Parameters,
    SUCCESS_MAGNITUDE, UNKNOWN_MAGNITUDE, UsageTracker, builtin, parse_definitions,
    register_definitions,
};

const DEFINITIONS: &str = r#"
- action_name: GiveSilver
  description: Drop silver at the focus point
  parameters:
    - name: amount
      type: int
      default_value: 50
  primitive_action: add_silver
  cooldown_ticks: 100
  success_message: "{1}"

- action_name: Tribute
  primitive_action: add_silver
  action_params:
    amount: 10
  daily_limit: 2

- action_name: DropSteel
  requires_target: true
  target_type: cell
  primitive_action: spawn_thing
  action_params:
    thing_def: Steel
    count: 75
  failure_message: "Nothing dropped at {0}: {1}"

- action_name: Mend
  requires_target: true
  target_type: pawn
  delegate_to_command: HealPawn

- action_name: Rally
  requires_target: true
  target_type: faction
  external_class: Sandbox.DebugTools
  external_method: SetGoodwill

- action_name: Revive
  requires_target: true
  target_type: dead_pawn
  requires_elevated_mode: true
  external_class: Sandbox.DebugTools
  external_method: Resurrect

- action_name: Confused
  delegate_to_command: HealPawn
  primitive_action: heal_pawn

- action_name: Idle
  description: Does nothing at all
"#;

struct Harness {
    clock: Arc<ManualClock>,
    registry: Arc<CommandRegistry>,
    notifier: Arc<RecordingNotifier>,
    parser: CommandParser,
    world: SandboxWorld,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
        ));
        let mut invokables = InvokableRegistry::new();
        register_debug_tools(&mut invokables);
        let services = CommandServices::new(Arc::new(UsageTracker::new(clock.clone())))
            .with_invokables(Arc::new(invokables));

        let registry = Arc::new(CommandRegistry::new());
        builtin::register_builtins(&registry);
        let loaded = parse_definitions(DEFINITIONS, None).expect("definitions parse");
        let report = register_definitions(&registry, loaded.definitions, &services);
        assert_eq!(report.issues.len(), 2, "{:?}", report.issues);

        let notifier = Arc::new(RecordingNotifier::default());
        let parser = CommandParser::new(Arc::clone(&registry)).with_notifier(notifier.clone());

        Self {
            clock,
            registry,
            notifier,
            parser,
            world: SandboxWorld::demo(),
        }
    }

    fn run(&mut self, request: CommandRequest) -> warden_commands::CommandResult {
        self.parser.parse_and_execute(&mut self.world, &request)
    }
}

#[test]
fn test_lookup_ignores_case_and_returns_same_instance() {
    let harness = Harness::new();

    for name in harness.registry.names() {
        let exact = harness.registry.get(&name).expect("registered");
        let upper = harness.registry.get(&name.to_uppercase()).expect("upper");
        let lower = harness.registry.get(&name.to_lowercase()).expect("lower");
        assert!(Arc::ptr_eq(&exact, &upper));
        assert!(Arc::ptr_eq(&exact, &lower));
    }
}

#[test]
fn test_invalid_definitions_are_absent() {
    let harness = Harness::new();

    assert!(!harness.registry.contains("Confused"));
    assert!(!harness.registry.contains("Idle"));
    assert!(harness.registry.contains("GiveSilver"));

    let loaded = parse_definitions(DEFINITIONS, None).unwrap();
    let services = CommandServices::default();
    let report = register_definitions(&CommandRegistry::new(), loaded.definitions, &services);
    let confused = report
        .issues
        .iter()
        .find(|i| i.action_name.as_deref() == Some("Confused"))
        .expect("Confused reported");
    assert!(confused.errors[0].contains("only have one execution method"));
}

#[test]
fn test_registry_holds_distinct_names() {
    let harness = Harness::new();
    let names = harness.registry.names();

    // Seven built-ins and six valid definitions.
    assert_eq!(names.len(), 13);
    assert_eq!(harness.registry.all().len(), names.len());
}

#[test]
fn test_cooldown_blocks_second_call() {
    let mut harness = Harness::new();
    let silver = harness.world.count_of("Silver");

    let first = harness.run(CommandRequest::new("GiveSilver"));
    assert!(first.success);
    assert_eq!(first.side_effect_magnitude, SUCCESS_MAGNITUDE);
    assert_eq!(harness.world.count_of("Silver"), silver + 50);

    harness.clock.advance(99);
    let second = harness.run(CommandRequest::new("givesilver"));
    assert!(!second.success);
    assert_eq!(second.side_effect_magnitude, FAILURE_MAGNITUDE);
    assert_eq!(harness.world.count_of("Silver"), silver + 50);
    assert!(harness.notifier.messages().last().unwrap().contains("cooldown"));

    harness.clock.advance(1);
    let third = harness.run(
        CommandRequest::new("GiveSilver").with_parameters(json!({"amount": "20"})),
    );
    assert!(third.success);
    assert_eq!(harness.world.count_of("Silver"), silver + 70);
}

#[test]
fn test_daily_limit_resets_next_day() {
    let mut harness = Harness::new();

    assert!(harness.run(CommandRequest::new("Tribute")).success);
    assert!(harness.run(CommandRequest::new("Tribute")).success);
    let capped = harness.run(CommandRequest::new("Tribute"));
    assert!(!capped.success);

    let tribute = harness.registry.get("Tribute").unwrap();
    let mut ctx = CommandContext::new(&mut harness.world, &harness.registry, harness.notifier.as_ref());
    assert!(!tribute.execute(&mut ctx, None, &Parameters::new()).unwrap());

    harness.clock.next_day();
    assert!(harness.run(CommandRequest::new("Tribute")).success);
}

#[test]
fn test_cell_target() {
    let mut harness = Harness::new();
    let steel = harness.world.count_of("Steel");

    let dropped = harness.run(CommandRequest::new("DropSteel").with_target("12,7"));
    assert!(dropped.success);
    assert_eq!(harness.world.count_of("Steel"), steel + 75);
    let spawned = harness.world.things.last().unwrap();
    assert_eq!(spawned.position, Some(warden_commands::Cell::new(12, 7)));

    let missed = harness.run(CommandRequest::new("DropSteel").with_target("abc"));
    assert!(!missed.success);
    assert_eq!(
        harness.notifier.messages().last().map(String::as_str),
        Some("Nothing dropped at abc: Could not find target: abc")
    );
}

#[test]
fn test_target_not_found_is_typed() {
    let mut world = SandboxWorld::demo();
    let registry = CommandRegistry::new();
    let definition = parse_definitions(DEFINITIONS, None)
        .unwrap()
        .definitions
        .into_iter()
        .map(|d| d.definition)
        .find(|d| d.action_name == "DropSteel")
        .unwrap();
    let command = DefinitionCommand::new(definition, CommandServices::default()).unwrap();

    let notifier = RecordingNotifier::default();
    let mut ctx = CommandContext::new(&mut world, &registry, &notifier);
    let error = command.run(&mut ctx, Some("abc"), &Parameters::new()).unwrap_err();
    assert!(matches!(error, InvocationError::TargetNotFound(ref t) if t == "abc"));
    assert!(world.applied().is_empty());
}

#[test]
fn test_delegation_reaches_builtin() {
    let mut harness = Harness::new();

    let result = harness.run(CommandRequest::new("Mend").with_target("alice"));
    assert!(result.success);
    assert_eq!(harness.world.pawn(EntityId(1)).unwrap().injuries, 0);
}

#[test]
fn test_external_binding_from_target_and_params() {
    let mut harness = Harness::new();

    let rally = harness.run(
        CommandRequest::new("Rally")
            .with_target("Ashvale")
            .with_parameters(json!({"delta": 20})),
    );
    assert!(rally.success);
    assert_eq!(harness.world.faction(EntityId(100)).unwrap().goodwill, 30);

    let revive = harness.run(CommandRequest::new("Revive").with_target("Tom"));
    assert!(revive.success);
    assert!(!harness.world.pawn(EntityId(3)).unwrap().dead);
}

#[test]
fn test_elevated_mode_required() {
    let mut harness = Harness::new();
    harness.world.elevated = false;

    let result = harness.run(CommandRequest::new("Revive").with_target("Tom"));
    assert!(!result.success);
    assert!(harness.world.pawn(EntityId(3)).unwrap().dead);
    assert!(harness.world.applied().is_empty());
}

struct Explodes;

impl AiCommand for Explodes {
    fn action_name(&self) -> &str {
        "Explode"
    }

    fn description(&self) -> String {
        "Always fails loudly".to_string()
    }

    fn execute(
        &self,
        _ctx: &mut CommandContext<'_>,
        _target: Option<&str>,
        _params: &Parameters,
    ) -> Result<bool, CommandError> {
        panic!("boom")
    }
}

#[test]
fn test_unknown_and_panicking_magnitudes_differ() {
    let mut harness = Harness::new();
    harness.registry.register(Arc::new(Explodes));

    let unknown = harness.run(CommandRequest::new("Teleport"));
    let exploded = harness.run(CommandRequest::new("explode"));

    assert_eq!(unknown.side_effect_magnitude, UNKNOWN_MAGNITUDE);
    assert_eq!(exploded.side_effect_magnitude, ERROR_MAGNITUDE);
    assert_ne!(unknown.side_effect_magnitude, exploded.side_effect_magnitude);
    assert!(exploded.message.contains("boom"));
}

#[test]
fn test_collision_replaces_lookup() {
    let harness = Harness::new();
    let before = harness.registry.len();

    harness.registry.register(Arc::new(Explodes));
    let replaced = harness.registry.register(Arc::new(Explodes));

    assert!(replaced.is_some());
    assert_eq!(harness.registry.len(), before + 1);
    assert_eq!(
        harness.registry.get("EXPLODE").unwrap().description(),
        "Always fails loudly"
    );
}

#[test]
fn test_limit_violation_surfaces_remaining_ticks() {
    let harness = Harness::new();
    let mut world = SandboxWorld::demo();
    let notifier = RecordingNotifier::default();
    let command = harness.registry.get("GiveSilver").unwrap();

    let mut ctx = CommandContext::new(&mut world, &harness.registry, &notifier);
    assert!(command.execute(&mut ctx, None, &Parameters::new()).unwrap());
    harness.clock.advance(40);
    assert!(!command.execute(&mut ctx, None, &Parameters::new()).unwrap());

    let expected = InvocationError::Limited(LimitViolation::Cooldown { remaining_ticks: 60 });
    assert!(notifier.messages().last().unwrap().ends_with(&expected.to_string()));
}
