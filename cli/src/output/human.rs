//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::sql;
use crate::domain::templates::RenderedFile;
use crate::domain::{ProvisionError, ProvisioningConfig, RunReport, StepId, StepStatus};
use crate::output::OutputContext;

/// Lines of captured stderr shown when a command fails.
pub const STDERR_TAIL_LINES: usize = 10;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the dry-run plan: the ordered steps, then every file a run
    /// would write.
    pub fn render_plan(&self, cfg: &ProvisioningConfig, files: &[RenderedFile]) {
        if self.ctx.quiet {
            return;
        }
        self.ctx
            .header(&format!("Provisioning plan for {}", cfg.domain_name));
        println!();
        for step in StepId::ALL {
            println!(
                "  {:>2}. {:<20} {}",
                step.number(),
                step.id(),
                step.label().style(self.ctx.styles.dim)
            );
        }
        for file in files {
            println!();
            self.ctx.header(&file.path.display().to_string());
            for line in file.content.lines() {
                println!("    {line}");
            }
        }
        println!();
        self.ctx.info("Dry run: nothing was changed on this host.");
    }

    /// Render the closing summary of a run that did not fail.
    pub fn render_summary(&self, report: &RunReport, cfg: &ProvisioningConfig) {
        if self.ctx.quiet {
            return;
        }
        let skipped: Vec<_> = report
            .results
            .iter()
            .filter(|r| matches!(r.status, StepStatus::Skipped(_)))
            .map(|r| r.step.id())
            .collect();

        println!();
        self.ctx.success(&format!(
            "Provisioning complete ({} steps, {} skipped)",
            report.results.len(),
            skipped.len()
        ));
        if !skipped.is_empty() {
            self.ctx.kv("Skipped:", &skipped.join(", "));
        }
        println!(
            "  {} is available at {}",
            cfg.service_name().style(self.ctx.styles.bold),
            cfg.https_url().style(self.ctx.styles.link)
        );
        println!(
            "  {}",
            "On PostgreSQL 15 or later the role also needs CREATE on schema public:"
                .style(self.ctx.styles.dim)
        );
        println!("    {}", sql::public_schema_grant_command(cfg));
    }

    /// Render the diagnostic for the step that stopped the run. Never
    /// suppressed.
    pub fn render_failure(&self, step: StepId, err: &ProvisionError) {
        eprintln!();
        self.ctx.error(&format!(
            "Step {}/{} ({}) failed",
            step.number(),
            StepId::ALL.len(),
            step.id()
        ));
        match err.command_failure() {
            Some(failure) => {
                eprintln!("    command: {}", failure.command);
                eprintln!("    result:  {}", failure.exit);
                let tail = failure.stderr_tail(STDERR_TAIL_LINES);
                if !tail.is_empty() {
                    eprintln!("    stderr:");
                    for line in tail {
                        eprintln!("      {}", line.style(self.ctx.styles.dim));
                    }
                }
            }
            None => eprintln!("    {err}"),
        }
        eprintln!(
            "    {}",
            "Earlier steps are not rolled back.".style(self.ctx.styles.dim)
        );
    }
}
