use splooker_core::models::{DeploymentReport, ProvisionalLaunch, Registry, SweepReport};

pub fn render_status(registry: &Registry, provisional: &[ProvisionalLaunch]) -> String {
    let mut lines = vec![
        format!(
            "pool: {}-{} ({} ports, {} in use)",
            registry.port_range_start,
            registry.port_range_end(),
            registry.port_pool_size,
            registry.services.len()
        ),
        format!("last allocated: {}", registry.last_allocated_port),
    ];

    if registry.services.is_empty() {
        lines.push("no services deployed".to_string());
    } else {
        let width = registry.services.keys().map(|k| k.len()).max().unwrap_or(0);
        for (name, record) in &registry.services {
            lines.push(format!(
                "  {name:<width$}  {:>5}  {}",
                record.port, record.instance_id
            ));
        }
    }

    if !provisional.is_empty() {
        lines.push(format!(
            "{} provisional instance(s), run `splooker sweep` to remove:",
            provisional.len()
        ));
        for entry in provisional {
            lines.push(format!(
                "  {} {} port {} launched {}",
                entry.service,
                entry.instance_id,
                entry.port,
                entry.launched_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
    }

    lines.join("\n")
}

pub fn render_deployment(report: &DeploymentReport) -> String {
    let mut line = format!(
        "deployed {} as {} on port {}",
        report.service, report.instance_id, report.port
    );
    if !report.ready {
        line.push_str(" (not reachable yet)");
    }
    if report.retire_failed {
        if let Some(previous) = &report.previous {
            line.push_str(&format!(
                "; old instance {} could not be removed",
                previous.instance_id
            ));
        }
    }
    line
}

pub fn render_sweep(report: &SweepReport) -> String {
    format!(
        "retired {}, cleared {}, failed {}",
        report.retired.len(),
        report.cleared.len(),
        report.failed.len()
    )
}
