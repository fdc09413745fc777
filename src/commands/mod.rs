pub mod analyze;
pub mod config;
pub mod topology;

use anyhow::Result;
use declarative::ExecutionPlan;

use crate::Context;
use crate::config::load_inputs;
use crate::schema::Inputs;
use crate::topology::Topology;

/// Inputs after file, environment and flag overrides
pub fn inputs(ctx: &Context) -> Result<Inputs> {
    Ok(load_inputs(ctx.config.as_deref(), &ctx.overrides)?.inputs)
}

/// Validate, declare and order the topology, optionally narrowed to a target
pub fn plan(inputs: &Inputs, target: Option<&str>) -> Result<ExecutionPlan> {
    let plan = Topology::build(inputs)?.into_plan()?;
    Ok(plan.filter_by_target(target))
}
