//! Topology commands
//!
//! - `validate` - Check inputs and summarize the topology
//! - `render` / `graph` - Show the descriptor and its dependency stages
//! - `plan` - Preview what apply would change
//! - `apply` / `destroy` - Converge recorded state through the provider
//! - `output` - Project outputs from inputs and recorded state

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::{
    ConfirmCallback, ExecuteOptions, ExecuteSummary, ExecutionPlan, ProgressCallback, Provider,
    compute_diffs, execute,
};

use crate::Context;
use crate::cli::{ApplyArgs, OutputArgs};
use crate::config::load_inputs;
use crate::display;
use crate::outputs::{self, OUTPUT_NAMES};
use crate::progress::ApplyProgress;
use crate::provider::SimulatedAzure;
use crate::schema::{Inputs, ProviderVersion};
use crate::state::{StateFile, fingerprint};
use crate::topology::Topology;
use crate::ui;

/// Confirmation through an interactive prompt, unless `--yes`
pub struct PromptConfirm {
    assume_yes: bool,
    prompt: &'static str,
}

impl PromptConfirm {
    pub fn new(assume_yes: bool, prompt: &'static str) -> Self {
        Self { assume_yes, prompt }
    }
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(self.prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}

// ============================================================================
// Validate / Render / Graph
// ============================================================================

pub fn validate(ctx: &Context) -> Result<()> {
    let loaded = load_inputs(ctx.config.as_deref(), &ctx.overrides)?;
    let inputs = &loaded.inputs;
    let (topology, pin) = checked(inputs)?;

    if ctx.quiet {
        return Ok(());
    }

    ui::header("Inputs");
    match &loaded.source {
        Some(path) => ui::kv("Source", &path.display().to_string()),
        None => ui::kv("Source", "defaults"),
    }
    ui::kv("Resource group", &inputs.resource_group_name);
    ui::kv("Location", &inputs.location);
    ui::kv("Provider", &format!("azurerm {pin}"));
    if topology.vm_count > 0 {
        ui::kv(
            "VMs",
            &format!("{} x {}", topology.vm_count, inputs.vm_size),
        );
    } else {
        ui::kv("VMs", "disabled");
    }
    ui::kv("Authentication", topology.auth.label());
    ui::kv("Resources", &topology.resources.len().to_string());
    println!();
    ui::success("Inputs are valid");
    ui::dim("Run `topoform plan` to preview changes");
    Ok(())
}

/// Build the topology, then resolve the provider pin
///
/// Building runs the full input validation, so its error order wins.
fn checked(inputs: &Inputs) -> Result<(Topology, ProviderVersion)> {
    let topology = Topology::build(inputs)?;
    let pin = inputs.provider.pin()?;
    Ok((topology, pin))
}

pub fn render(ctx: &Context, json: bool) -> Result<()> {
    let inputs = super::inputs(ctx)?;
    let plan = super::plan(&inputs, None)?;

    if json {
        let out = serde_json::to_string_pretty(&display::descriptor_json(&plan))
            .context("Failed to serialize descriptor")?;
        println!("{out}");
    } else {
        ui::header("Topology Descriptor");
        display::print_descriptor(&plan);
    }
    Ok(())
}

pub fn graph(ctx: &Context) -> Result<()> {
    let inputs = super::inputs(ctx)?;
    let plan = super::plan(&inputs, None)?;
    display::print_graph(&plan);
    Ok(())
}

// ============================================================================
// Plan
// ============================================================================

pub fn plan(ctx: &Context, target: Option<&str>) -> Result<()> {
    let inputs = super::inputs(ctx)?;
    let plan = super::plan(&inputs, target)?;
    let state = StateFile::load()?;

    let diffs = compute_diffs(&plan, &state.snapshot);
    log::info!(
        "Planned {} resources against state serial {}",
        plan.total_resources(),
        state.serial
    );
    display::print_plan(&diffs);

    if !plan.targeted
        && diffs.is_empty()
        && let Some(recorded) = &state.fingerprint
        && *recorded != fingerprint(&plan, &state.snapshot.seal_key)
    {
        ui::warn("Recorded fingerprint differs from the descriptor; state may predate this version");
    }
    Ok(())
}

// ============================================================================
// Apply / Destroy
// ============================================================================

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let inputs = super::inputs(ctx)?;
    let plan = super::plan(&inputs, args.target.as_deref())?;
    let mut state = StateFile::load()?;

    let diffs = compute_diffs(&plan, &state.snapshot);
    display::print_plan(&diffs);

    if diffs.is_empty() {
        print_outputs(&inputs, &state, ctx.quiet)?;
        return Ok(());
    }

    if args.dry_run {
        println!();
        ui::info("Dry run: no changes applied");
        return Ok(());
    }

    let opts = ExecuteOptions {
        jobs: args.jobs,
        ..Default::default()
    };
    let provider = SimulatedAzure::new(&inputs.subscription_id);
    let mut progress = ApplyProgress::new(diffs.len(), ctx.verbose > 0, ctx.quiet);
    let mut confirm = PromptConfirm::new(args.yes, "Apply these changes?");

    let summary = converge(&plan, &mut state, &opts, &provider, &mut progress, &mut confirm)?;
    progress.finish();

    if declined(&summary) {
        ui::info("Apply cancelled");
        return Ok(());
    }

    let path = state.save()?;
    log::info!("Saved state to {}", path.display());

    display::print_summary(&summary);
    if summary.is_success() {
        print_outputs(&inputs, &state, ctx.quiet)?;
        Ok(())
    } else {
        bail!("{} resources failed to apply", summary.failed)
    }
}

pub fn destroy(ctx: &Context, yes: bool) -> Result<()> {
    let inputs = super::inputs(ctx)?;
    let mut state = StateFile::load()?;

    if state.snapshot.is_empty() {
        ui::info("Nothing to destroy");
        return Ok(());
    }

    let plan = ExecutionPlan::new();
    let diffs = compute_diffs(&plan, &state.snapshot);
    display::print_plan(&diffs);

    let opts = ExecuteOptions::default();
    let provider = SimulatedAzure::new(&inputs.subscription_id);
    let mut progress = ApplyProgress::new(diffs.len(), ctx.verbose > 0, ctx.quiet);
    let mut confirm = PromptConfirm::new(yes, "Destroy all recorded resources?");

    let summary = converge(&plan, &mut state, &opts, &provider, &mut progress, &mut confirm)?;
    progress.finish();

    if declined(&summary) {
        ui::info("Destroy cancelled");
        return Ok(());
    }

    state.save()?;
    display::print_summary(&summary);
    if !summary.is_success() {
        bail!("{} resources failed to destroy", summary.failed);
    }
    Ok(())
}

/// Nothing ran because confirmation was refused
fn declined(summary: &ExecuteSummary) -> bool {
    summary.skipped > 0 && summary.total_changes() == 0 && summary.failed == 0
}

/// Execute `plan` against `state` and record the result
///
/// The fingerprint is only stored after a complete, untargeted, successful
/// run; it is cleared once nothing is recorded anymore.
pub fn converge<V, P, C>(
    plan: &ExecutionPlan,
    state: &mut StateFile,
    opts: &ExecuteOptions,
    provider: &V,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    V: Provider,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let summary = execute(plan, &mut state.snapshot, opts, provider, progress, confirm)?;

    if state.snapshot.is_empty() {
        state.fingerprint = None;
    } else if !plan.targeted && summary.is_success() && summary.skipped == 0 {
        state.fingerprint = Some(fingerprint(plan, &state.snapshot.seal_key));
    }

    log::debug!(
        "Converged: {} created, {} modified, {} replaced, {} removed, {} failed",
        summary.created,
        summary.modified,
        summary.replaced,
        summary.removed,
        summary.failed
    );
    Ok(summary)
}

// ============================================================================
// Output
// ============================================================================

pub fn output(ctx: &Context, args: &OutputArgs) -> Result<()> {
    let inputs = super::inputs(ctx)?;
    let state = StateFile::load()?;

    if let Some(name) = &args.name
        && !OUTPUT_NAMES.contains(&name.as_str())
    {
        bail!(
            "Unknown output '{}'. Available: {}",
            name,
            OUTPUT_NAMES.join(", ")
        );
    }

    let projected = outputs::project(&inputs, &state.snapshot)?;

    if !outputs::is_applied(&state.snapshot) && !ctx.quiet {
        ui::warn("No resources recorded yet; provider-assigned values are unknown until apply");
    }

    let selected: Vec<_> = projected
        .into_iter()
        .filter(|o| args.name.as_deref().is_none_or(|n| n == o.name))
        .collect();

    if args.json {
        let value = match (&args.name, selected.first()) {
            (Some(_), Some(single)) => single.shown(args.show_sensitive),
            _ => outputs::to_json(&selected, args.show_sensitive),
        };
        let out = serde_json::to_string_pretty(&value).context("Failed to serialize outputs")?;
        println!("{out}");
        return Ok(());
    }

    if args.name.is_some() {
        for o in &selected {
            println!("{}", ui::format_value(&o.shown(args.show_sensitive)));
        }
        return Ok(());
    }

    print_output_list(&selected, args.show_sensitive);
    Ok(())
}

fn print_outputs(inputs: &Inputs, state: &StateFile, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }
    let projected = outputs::project(inputs, &state.snapshot)?;
    print_output_list(&projected, false);
    Ok(())
}

fn print_output_list(list: &[outputs::Output], reveal: bool) {
    ui::section("Outputs");
    for o in list {
        let rendered = match o.shown(reveal) {
            value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                serde_json::to_string_pretty(&value)
                    .unwrap_or_default()
                    .replace('\n', "\n    ")
            }
            value => ui::format_value(&value),
        };
        if o.sensitive && !reveal {
            println!("  {} = {}", o.name.bold(), rendered.dimmed());
        } else {
            println!("  {} = {}", o.name.bold(), rendered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::KNOWN_AFTER_APPLY;
    use crate::schema::{ProviderConfig, Sensitive, VersionSpec};
    use declarative::resource::seal;
    use declarative::{
        AutoConfirm, AutoDecline, ChangeAction, DiffSummary, NoProgress, RetryConfig,
    };
    use serde_json::{Value, json};

    fn opts() -> ExecuteOptions {
        ExecuteOptions {
            jobs: 1,
            retry: RetryConfig::no_retry(),
        }
    }

    const SUBSCRIPTION: &str = "11111111-2222-3333-4444-555555555555";

    fn base() -> Inputs {
        Inputs {
            subscription_id: SUBSCRIPTION.into(),
            ..Default::default()
        }
    }

    fn password_inputs(count: i64) -> Inputs {
        Inputs {
            vm_count: count,
            admin_password: Some(Sensitive::new("Sup3r-Secret!")),
            ..base()
        }
    }

    fn apply_inputs(inputs: &Inputs, state: &mut StateFile) -> ExecuteSummary {
        let plan = crate::commands::plan(inputs, None).unwrap();
        let provider = SimulatedAzure::new(&inputs.subscription_id);
        converge(&plan, state, &opts(), &provider, &mut NoProgress, &mut AutoConfirm).unwrap()
    }

    fn output(inputs: &Inputs, state: &StateFile, name: &str) -> Value {
        outputs::project(inputs, &state.snapshot)
            .unwrap()
            .into_iter()
            .find(|o| o.name == name)
            .unwrap()
            .value
    }

    fn strings(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_three_vms_with_password() {
        let inputs = password_inputs(3);
        let mut state = StateFile::default();

        let summary = apply_inputs(&inputs, &mut state);
        assert!(summary.is_success());
        // rg, vnet, subnet, nsg, association, 3 nics, 3 vms
        assert_eq!(summary.created, 11);

        assert_eq!(
            strings(&output(&inputs, &state, "vm_names")),
            vec!["rg-vm-topology-vm-1", "rg-vm-topology-vm-2", "rg-vm-topology-vm-3"]
        );
        let ips = strings(&output(&inputs, &state, "vm_private_ips"));
        assert_eq!(ips, vec!["10.0.1.4", "10.0.1.5", "10.0.1.6"]);
        assert_eq!(output(&inputs, &state, "vm_ids").as_array().unwrap().len(), 3);
        assert_eq!(output(&inputs, &state, "ssh_commands"), json!([]));

        let summary = output(&inputs, &state, "deployment_summary");
        assert_eq!(summary["vm_count"], 3);
        assert_eq!(summary["authentication"], "Password");

        let nics: Vec<&str> = state
            .snapshot
            .resources
            .iter()
            .filter(|(_, r)| r.resource_type == "azurerm_network_interface")
            .filter_map(|(_, r)| r.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(
            nics,
            vec!["rg-vm-topology-nic-1", "rg-vm-topology-nic-2", "rg-vm-topology-nic-3"]
        );
    }

    #[test]
    fn test_password_never_recorded_in_plaintext() {
        let inputs = password_inputs(1);
        let mut state = StateFile::default();
        apply_inputs(&inputs, &mut state);

        let serialized = serde_json::to_string(&state).unwrap();
        assert!(!serialized.contains("Sup3r-Secret!"));

        // Only a hash keyed by this state's own key is recorded
        let recorded = state
            .snapshot
            .attribute("azurerm_linux_virtual_machine.vm[0]", "admin_password")
            .unwrap();
        let password = json!("Sup3r-Secret!");
        assert_eq!(*recorded, seal(&password, &state.snapshot.seal_key));
        let unkeyed = format!("blake3:{}", blake3::hash(password.to_string().as_bytes()).to_hex());
        assert!(!serialized.contains(&unkeyed));

        // Reapplying with the same key is still a no-op
        let summary = apply_inputs(&inputs, &mut state);
        assert_eq!(summary.created + summary.modified + summary.replaced, 0);
    }

    #[test]
    fn test_ssh_key_mode() {
        let inputs = Inputs {
            vm_count: 2,
            ssh_public_key: Some("ssh-ed25519 AAAAC3Nza test@host".into()),
            ..base()
        };
        let mut state = StateFile::default();
        let summary = apply_inputs(&inputs, &mut state);
        assert!(summary.is_success());

        assert_eq!(
            strings(&output(&inputs, &state, "ssh_commands")),
            vec!["ssh azureuser@10.0.1.4", "ssh azureuser@10.0.1.5"]
        );
        assert_eq!(
            output(&inputs, &state, "deployment_summary")["authentication"],
            "SSH Key"
        );

        let vm = state.snapshot.get("azurerm_linux_virtual_machine.vm[0]").unwrap();
        assert!(vm.attributes.get("admin_password").is_none());
        assert_eq!(vm.attributes["disable_password_authentication"], true);
    }

    #[test]
    fn test_password_mode_without_password_fails_vms() {
        let inputs = Inputs {
            vm_count: 1,
            ..base()
        };
        let mut state = StateFile::default();
        let summary = apply_inputs(&inputs, &mut state);

        assert!(!summary.is_success());
        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].0.starts_with("azurerm_linux_virtual_machine"));
        assert!(state.fingerprint.is_none());
    }

    #[test]
    fn test_deploy_false_declares_no_vms() {
        let inputs = Inputs {
            deploy_vms: false,
            vm_count: 7,
            ..base()
        };
        let mut state = StateFile::default();
        let summary = apply_inputs(&inputs, &mut state);

        assert_eq!(summary.created, 5);
        for name in ["vm_names", "vm_private_ips", "vm_ids", "ssh_commands"] {
            assert_eq!(output(&inputs, &state, name), json!([]), "{name}");
        }
        assert_eq!(output(&inputs, &state, "deployment_summary")["vm_count"], 0);
    }

    #[test]
    fn test_out_of_range_count_declares_nothing() {
        for count in [0, 11, -1] {
            let err = crate::commands::plan(&password_inputs(count), None).unwrap_err();
            assert_eq!(err.to_string(), "VM count must be between 1 and 10.");
        }
    }

    #[test]
    fn test_count_error_wins_over_provider_pin() {
        let inputs = Inputs {
            provider: ProviderConfig {
                version: VersionSpec::One("=2.0".into()),
            },
            ..password_inputs(42)
        };
        let err = checked(&inputs).unwrap_err();
        assert_eq!(err.to_string(), "VM count must be between 1 and 10.");

        let inputs = Inputs {
            vm_count: 2,
            ..inputs
        };
        assert!(checked(&inputs).unwrap_err().to_string().contains("=2.0"));
    }

    #[test]
    fn test_second_apply_is_a_no_op() {
        let inputs = password_inputs(2);
        let mut state = StateFile::default();
        apply_inputs(&inputs, &mut state);
        let first = state.fingerprint.clone();
        assert!(first.is_some());

        let plan = crate::commands::plan(&inputs, None).unwrap();
        assert!(compute_diffs(&plan, &state.snapshot).is_empty());
        assert!(!DiffSummary::from_diffs(&compute_diffs(&plan, &state.snapshot)).has_changes());

        let summary = apply_inputs(&inputs, &mut state);
        assert_eq!(summary.total_changes(), 0);
        assert_eq!(summary.no_change, 9);
        assert_eq!(state.fingerprint, first);
    }

    #[test]
    fn test_ips_stable_across_runs() {
        let inputs = password_inputs(2);
        let mut state = StateFile::default();
        apply_inputs(&inputs, &mut state);
        let before = output(&inputs, &state, "vm_private_ips");

        let grown = password_inputs(3);
        apply_inputs(&grown, &mut state);
        let after = strings(&output(&grown, &state, "vm_private_ips"));
        assert_eq!(&after[..2], strings(&before).as_slice());
        assert_eq!(after[2], "10.0.1.6");
    }

    #[test]
    fn test_scale_down_removes_orphans() {
        let mut state = StateFile::default();
        apply_inputs(&password_inputs(3), &mut state);

        let inputs = password_inputs(1);
        let plan = crate::commands::plan(&inputs, None).unwrap();
        let diffs = compute_diffs(&plan, &state.snapshot);
        let removed: Vec<&str> = diffs
            .iter()
            .filter(|d| d.action == ChangeAction::Delete)
            .map(|d| d.resource_id.as_str())
            .collect();
        // VMs go before the NICs they use
        assert_eq!(
            removed,
            vec![
                "azurerm_linux_virtual_machine.vm[1]",
                "azurerm_linux_virtual_machine.vm[2]",
                "azurerm_network_interface.vm[1]",
                "azurerm_network_interface.vm[2]",
            ]
        );

        let summary = apply_inputs(&inputs, &mut state);
        assert_eq!(summary.removed, 4);
        assert_eq!(state.snapshot.len(), 7);
        assert_eq!(
            strings(&output(&inputs, &state, "vm_names")),
            vec!["rg-vm-topology-vm-1"]
        );
    }

    #[test]
    fn test_username_change_replaces_vms() {
        let mut state = StateFile::default();
        apply_inputs(&password_inputs(2), &mut state);

        let inputs = Inputs {
            admin_username: "operator".into(),
            ..password_inputs(2)
        };
        let plan = crate::commands::plan(&inputs, None).unwrap();
        let diffs = compute_diffs(&plan, &state.snapshot);
        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().all(|d| d.action == ChangeAction::Replace));

        let summary = apply_inputs(&inputs, &mut state);
        assert_eq!(summary.replaced, 2);
        let vm = state.snapshot.get("azurerm_linux_virtual_machine.vm[0]").unwrap();
        assert_eq!(vm.attributes["admin_username"], "operator");
    }

    #[test]
    fn test_relocation_replaces_tagged_dependents() {
        let mut state = StateFile::default();
        apply_inputs(&password_inputs(1), &mut state);

        let mut inputs = Inputs {
            location: "West Europe".into(),
            ..password_inputs(1)
        };
        inputs.tags.insert("owner".into(), "ops".into());

        let plan = crate::commands::plan(&inputs, None).unwrap();
        let diffs = compute_diffs(&plan, &state.snapshot);
        assert_eq!(diffs.len(), 7);
        for diff in &diffs {
            assert_eq!(diff.action, ChangeAction::Replace, "{}", diff.resource_id);
        }
        let vnet = diffs
            .iter()
            .find(|d| d.resource_id == "azurerm_virtual_network.main")
            .unwrap();
        let keys: Vec<&str> = vnet.changes.iter().map(|c| c.key.as_str()).collect();
        assert!(keys.contains(&"tags"));
        assert!(keys.contains(&"location"));

        let summary = apply_inputs(&inputs, &mut state);
        assert!(summary.is_success());
        assert_eq!(summary.replaced, 7);
        let rg = state.snapshot.get("azurerm_resource_group.main").unwrap();
        assert_eq!(rg.attributes["location"], "West Europe");
        let vnet = state.snapshot.get("azurerm_virtual_network.main").unwrap();
        assert_eq!(vnet.attributes["tags"]["owner"], "ops");
        assert_eq!(
            output(&inputs, &state, "vm_private_ips"),
            json!(["10.0.1.4"])
        );
    }

    #[test]
    fn test_targeted_apply_keeps_dependencies() {
        let inputs = password_inputs(2);
        let plan = crate::commands::plan(&inputs, Some("vms")).unwrap();
        let provider = SimulatedAzure::new(SUBSCRIPTION);
        let mut state = StateFile::default();

        let summary =
            converge(&plan, &mut state, &opts(), &provider, &mut NoProgress, &mut AutoConfirm)
                .unwrap();
        // rg, vnet, subnet, 2 nics, 2 vms
        assert_eq!(summary.created, 7);
        assert!(state.snapshot.get("azurerm_network_security_group.main").is_none());
        assert!(state.fingerprint.is_none());

        // A later full apply adds the rest
        let summary = apply_inputs(&inputs, &mut state);
        assert_eq!(summary.created, 2);
        assert!(state.fingerprint.is_some());
    }

    #[test]
    fn test_declined_apply_changes_nothing() {
        let inputs = password_inputs(1);
        let plan = crate::commands::plan(&inputs, None).unwrap();
        let provider = SimulatedAzure::new(SUBSCRIPTION);
        let mut state = StateFile::default();

        let summary =
            converge(&plan, &mut state, &opts(), &provider, &mut NoProgress, &mut AutoDecline)
                .unwrap();
        assert!(declined(&summary));
        assert!(state.snapshot.is_empty());
        assert!(state.fingerprint.is_none());
    }

    #[test]
    fn test_destroy_removes_everything() {
        let inputs = password_inputs(2);
        let mut state = StateFile::default();
        apply_inputs(&inputs, &mut state);

        let provider = SimulatedAzure::new(SUBSCRIPTION);
        let summary = converge(
            &ExecutionPlan::new(),
            &mut state,
            &opts(),
            &provider,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.removed, 9);
        assert!(state.snapshot.is_empty());
        assert!(state.fingerprint.is_none());
        assert_eq!(output(&inputs, &state, "subnet_id"), json!(KNOWN_AFTER_APPLY));
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let inputs = password_inputs(1);
        let plan = crate::commands::plan(&inputs, None).unwrap();
        let provider = SimulatedAzure::new(SUBSCRIPTION).with_transient_failures("azurerm_subnet.internal", 2);
        let opts = ExecuteOptions {
            jobs: 1,
            retry: RetryConfig {
                max_attempts: 3,
                base_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(5),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut state = StateFile::default();

        let summary =
            converge(&plan, &mut state, &opts, &provider, &mut NoProgress, &mut AutoConfirm)
                .unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.created, 7);
    }

    #[test]
    fn test_prompt_confirm_assume_yes() {
        let mut confirm = PromptConfirm::new(true, "Apply these changes?");
        assert!(confirm.confirm("ignored").unwrap());
    }
}
