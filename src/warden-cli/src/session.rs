//! A dispatch session: registry, loaded definitions, sandbox world and clock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use warden_commands::sandbox::{RecordingNotifier, SandboxWorld, register_debug_tools};
use warden_commands::{
    CommandParser, CommandRegistry, CommandRequest, CommandResult, CommandServices,
    DefinitionLoader, InvokableRegistry, LoadReport, builtin, sync,
};
use warden_ratelimits::{
    Clock, DEFAULT_TICKS_PER_SECOND, SystemClock, UsageLimits, UsageSnapshot, UsageTracker,
    format_usage, format_usage_compact,
};

use crate::config::WardenConfig;

/// Settings for one session, merged from flags and `warden.toml`.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    /// Definition directories in priority order.
    pub definition_dirs: Vec<PathBuf>,
    /// Skip `.warden/commands` and the global commands directory.
    pub skip_default_dirs: bool,
    pub world: Option<PathBuf>,
    /// Overrides the world's own elevated-mode flag.
    pub elevated: Option<bool>,
    pub ticks_per_second: Option<u32>,
}

impl SessionSettings {
    /// Flag values first, then config values.
    pub fn merge(
        cli_dirs: &[PathBuf],
        cli_world: Option<&Path>,
        cli_elevated: bool,
        config: &WardenConfig,
    ) -> Self {
        let mut definition_dirs: Vec<PathBuf> = cli_dirs.to_vec();
        for dir in &config.definition_dirs {
            if !definition_dirs.contains(dir) {
                definition_dirs.push(dir.clone());
            }
        }

        Self {
            definition_dirs,
            skip_default_dirs: false,
            world: cli_world
                .map(Path::to_path_buf)
                .or_else(|| config.world.clone()),
            elevated: if cli_elevated {
                Some(true)
            } else {
                config.elevated_mode
            },
            ticks_per_second: config.ticks_per_second,
        }
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.definition_dirs.clone();
        if !self.skip_default_dirs {
            for dir in sync::default_search_dirs() {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        dirs
    }
}

pub struct Session {
    pub parser: CommandParser,
    pub world: SandboxWorld,
    pub notifier: Arc<RecordingNotifier>,
    pub tracker: Arc<UsageTracker>,
    /// What the definition load registered and rejected.
    pub report: LoadReport,
    pub search_dirs: Vec<PathBuf>,
}

impl Session {
    pub async fn open(settings: &SessionSettings) -> Result<Self> {
        let clock = SystemClock::with_ticks_per_second(
            settings.ticks_per_second.unwrap_or(DEFAULT_TICKS_PER_SECOND),
        );
        let tracker = Arc::new(UsageTracker::new(Arc::new(clock)));

        let mut invokables = InvokableRegistry::new();
        register_debug_tools(&mut invokables);
        let services =
            CommandServices::new(Arc::clone(&tracker)).with_invokables(Arc::new(invokables));

        let registry = Arc::new(CommandRegistry::new());
        let builtins = builtin::register_builtins(&registry);

        let search_dirs = settings.search_dirs();
        let loader = DefinitionLoader::with_dirs(search_dirs.clone());
        let report = loader.load_into(&registry, &services).await;
        for issue in &report.issues {
            warn!(%issue, "Definition rejected");
        }
        info!(
            builtins,
            definitions = report.registered.len(),
            rejected = report.issues.len(),
            "Command registry ready"
        );

        let mut world = match &settings.world {
            Some(path) => load_world(path).await?,
            None => {
                debug!("Using demo colony");
                SandboxWorld::demo()
            }
        };
        if let Some(elevated) = settings.elevated {
            world.elevated = elevated;
        }

        let notifier = Arc::new(RecordingNotifier::default());
        let parser = CommandParser::new(registry).with_notifier(notifier.clone());

        Ok(Self {
            parser,
            world,
            notifier,
            tracker,
            report,
            search_dirs,
        })
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        self.parser.registry()
    }

    pub fn dispatch(&mut self, request: &CommandRequest) -> CommandResult {
        self.parser.parse_and_execute(&mut self.world, request)
    }

    /// Messages shown to the player since the last call.
    pub fn drain_messages(&self) -> Vec<String> {
        self.notifier.take()
    }

    /// Cooldown and daily-limit status of `action`. Empty for unlimited
    /// or unknown actions.
    pub fn usage_lines(&self, action: &str) -> Vec<String> {
        self.usage(action)
            .map(|(limits, snapshot, now)| format_usage(&limits, &snapshot, now))
            .unwrap_or_default()
    }

    /// One-line form of [`Session::usage_lines`].
    pub fn usage_compact(&self, action: &str) -> Option<String> {
        self.usage(action)
            .map(|(limits, snapshot, now)| format_usage_compact(&limits, &snapshot, now))
    }

    fn usage(&self, action: &str) -> Option<(UsageLimits, UsageSnapshot, u64)> {
        let command = self.registry().get(action)?;
        let limits = command.usage_limits()?;
        let snapshot = self.tracker.snapshot(command.action_name());
        let now = Clock::now_ticks(self.tracker.clock().as_ref());
        Some((limits, snapshot, now))
    }
}

async fn load_world(path: &Path) -> Result<SandboxWorld> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read world {}", path.display()))?;
    let world = SandboxWorld::from_yaml(&content)
        .with_context(|| format!("Invalid world file {}", path.display()))?;
    debug!(path = %path.display(), pawns = world.pawns.len(), "Loaded world");
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_prefers_flags() {
        let config = WardenConfig {
            definition_dirs: vec![PathBuf::from("a"), PathBuf::from("b")],
            elevated_mode: Some(false),
            world: Some(PathBuf::from("config.yaml")),
            ..Default::default()
        };

        let settings = SessionSettings::merge(
            &[PathBuf::from("b"), PathBuf::from("c")],
            Some(Path::new("flag.yaml")),
            true,
            &config,
        );
        assert_eq!(
            settings.definition_dirs,
            vec![PathBuf::from("b"), PathBuf::from("c"), PathBuf::from("a")]
        );
        assert_eq!(settings.world, Some(PathBuf::from("flag.yaml")));
        assert_eq!(settings.elevated, Some(true));
    }

    #[test]
    fn test_merge_falls_back_to_config() {
        let config = WardenConfig {
            elevated_mode: Some(false),
            ticks_per_second: Some(30),
            ..Default::default()
        };

        let settings = SessionSettings::merge(&[], None, false, &config);
        assert_eq!(settings.elevated, Some(false));
        assert_eq!(settings.ticks_per_second, Some(30));
        assert!(settings.world.is_none());
    }
}
