//! Scripted session walk-through
//!
//! Signs an identity in, grants and switches roles in order, and records the
//! container's status after every step:
//! 1. Sign in and wait for the initial view
//! 2. Grant the `--add` roles
//! 3. Switch to each `--switch` role and wait for it to settle
//! 4. Optionally add a note and reload a faulted view
//! 5. Sign out

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info};

use role_container::config::ShellConfig;
use role_container::container::{ContainerStatus, RenderOutput};
use role_container::role::RoleId;
use role_container::session::StaticIdentityProvider;
use role_container::shell::RoleShell;
use role_container::view::{MockFailure, MockViewConfig, MockViewFactory, ViewUpdate};

// ============================================================================
// Data types
// ============================================================================

/// What to do, straight from the command line
#[derive(Debug, Clone, Default)]
pub struct SimulateOptions {
    pub identity: String,
    pub add: Vec<RoleId>,
    pub switch: Vec<RoleId>,
    pub fail: Vec<RoleId>,
    pub note: Option<String>,
    pub reload: bool,
    pub json: bool,
}

/// One recorded step
#[derive(Debug, Serialize)]
pub struct TimelineEntry {
    /// Milliseconds since sign-in started
    pub at_ms: u64,
    pub step: String,
    pub status: ContainerStatus,
    pub view: Value,
}

/// Everything a run produced
#[derive(Debug, Serialize)]
pub struct Timeline {
    pub identity: String,
    pub session_id: String,
    pub entries: Vec<TimelineEntry>,
}

struct Recorder {
    started: Instant,
    entries: Vec<TimelineEntry>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    fn record(&mut self, shell: &mut RoleShell, step: impl Into<String>) -> Result<()> {
        let step = step.into();
        let status = shell.status().context("reading container status")?;
        let view = summarize(&shell.render().context("rendering container")?);
        debug!(step = %step, phase = %status.phase, role = %status.current_role, "Recorded step");

        self.entries.push(TimelineEntry {
            at_ms: self.started.elapsed().as_millis() as u64,
            step,
            status,
            view,
        });
        Ok(())
    }
}

// ============================================================================
// Run
// ============================================================================

/// Run the scripted walk-through and print the timeline.
pub async fn run_simulation(config: ShellConfig, options: SimulateOptions) -> Result<Timeline> {
    let provider = StaticIdentityProvider::from_settings(&config.session.identities);
    let mut shell = RoleShell::from_config(&config).context("building role shell")?;

    for role in &options.fail {
        shell.views().register(
            *role,
            Arc::new(MockViewFactory::new().with_default(MockViewConfig {
                mount: Some(MockFailure::Error),
                ..Default::default()
            })),
        );
    }

    let mut recorder = Recorder::new();

    shell
        .sign_in_with(&provider, &options.identity)
        .with_context(|| format!("signing in '{}'", options.identity))?;
    let session_id = shell.session()?.session_id().to_string();
    info!(identity = %options.identity, session = %session_id, "Simulation started");
    recorder.record(&mut shell, "sign-in")?;
    shell.settle().await?;
    recorder.record(&mut shell, "settled")?;

    for role in &options.add {
        let added = shell.add_role(*role)?;
        let step = if added {
            format!("add-role {}", role)
        } else {
            format!("add-role {} (already held)", role)
        };
        recorder.record(&mut shell, step)?;
    }

    for role in &options.switch {
        shell.set_active_role(*role)?;
        recorder.record(&mut shell, format!("switch {}", role))?;
        shell.settle().await?;
        recorder.record(&mut shell, "settled")?;
    }

    if let Some(ref text) = options.note {
        let delivered = shell.dispatch(ViewUpdate::new("note", json!({ "text": text })))?;
        let step = if delivered { "note" } else { "note (not delivered)" };
        recorder.record(&mut shell, step)?;
    }

    if options.reload {
        if shell.reload()? {
            recorder.record(&mut shell, "reload")?;
            shell.settle().await?;
            recorder.record(&mut shell, "settled")?;
        } else {
            debug!("Nothing to reload");
        }
    }

    shell.sign_out()?;
    info!(steps = recorder.entries.len(), "Simulation finished");

    let timeline = Timeline {
        identity: options.identity.clone(),
        session_id,
        entries: recorder.entries,
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
    } else {
        print_timeline(&timeline);
    }

    Ok(timeline)
}

// ============================================================================
// Output
// ============================================================================

/// Compact, stable description of what the container shows
fn summarize(output: &RenderOutput) -> Value {
    match output {
        RenderOutput::Loading { target, previous } => json!({
            "kind": "loading",
            "target": target,
            "previous": previous,
        }),
        RenderOutput::Frame(frame) => json!({
            "kind": "frame",
            "role": frame.role,
            "epoch": frame.epoch,
            "title": frame.title,
            "notes": frame.body.get("notes").cloned().unwrap_or(Value::Null),
        }),
        RenderOutput::Fallback(fallback) => json!({
            "kind": "fallback",
            "role": fallback.role,
            "fault": fallback.fault.kind,
            "message": fallback.fault.message,
            "can_reload": fallback.can_reload,
        }),
        RenderOutput::Blank => json!({ "kind": "blank" }),
    }
}

fn print_timeline(timeline: &Timeline) {
    println!("Identity: {}  Session: {}", timeline.identity, timeline.session_id);
    println!();
    for entry in &timeline.entries {
        let shown = match entry.view["kind"].as_str() {
            Some("frame") => format!("view {}", entry.view["title"].as_str().unwrap_or("?")),
            Some("loading") => format!("loading {}", entry.view["target"].as_str().unwrap_or("?")),
            Some("fallback") => format!(
                "fallback ({})",
                entry.view["message"].as_str().unwrap_or("view failed")
            ),
            _ => "blank".to_string(),
        };
        println!(
            "{:>7}ms  {:<32} {:<13} role={:<20} epoch={}  {}",
            entry.at_ms,
            entry.step,
            entry.status.phase.to_string(),
            entry.status.current_role.to_string(),
            entry.status.mount_epoch,
            shown
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use role_container::container::ContainerPhase;

    fn options(identity: &str) -> SimulateOptions {
        SimulateOptions {
            identity: identity.to_string(),
            json: true,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_timeline() {
        let mut opts = options("demo-farmer");
        opts.switch = vec![RoleId::Business];
        let timeline = run_simulation(ShellConfig::default(), opts).await.unwrap();

        let steps: Vec<&str> = timeline.entries.iter().map(|e| e.step.as_str()).collect();
        assert_eq!(steps, vec!["sign-in", "settled", "switch business", "settled"]);
        assert_eq!(timeline.entries[2].status.phase, ContainerPhase::Transitioning);
        assert_eq!(timeline.entries[2].view["kind"], "loading");

        let last = timeline.entries.last().unwrap();
        assert_eq!(last.status.phase, ContainerPhase::Idle);
        assert_eq!(last.status.current_role, RoleId::Business);
        assert!(last.at_ms >= 1600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_role_then_reload() {
        let mut opts = options("demo-student");
        opts.switch = vec![RoleId::Farmer];
        opts.fail = vec![RoleId::Farmer];
        opts.reload = true;
        let timeline = run_simulation(ShellConfig::default(), opts).await.unwrap();

        let faulted = &timeline.entries[3];
        assert_eq!(faulted.status.phase, ContainerPhase::Errored);
        assert_eq!(faulted.view["kind"], "fallback");
        assert_eq!(timeline.entries[4].step, "reload");
        assert_eq!(timeline.entries.last().unwrap().status.phase, ContainerPhase::Errored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_identity() {
        let result = run_simulation(ShellConfig::default(), options("nobody")).await;
        assert!(result.is_err());
    }
}
