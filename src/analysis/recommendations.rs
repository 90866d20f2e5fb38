//! Expert recommendations derived from the issue list

use crate::core::rulebook::RuleBook;
use crate::entities::issue::ManufacturingIssue;
use crate::entities::process::{Material, Process, ProcessFamily};

pub const SUITABLE: &str =
    "The design appears suitable for the selected manufacturing process and material.";

/// Ordered advice for the chosen material, process and volume
pub fn build(
    issues: &[ManufacturingIssue],
    material: Material,
    process: Process,
    production_volume: u32,
    rules: &RuleBook,
) -> Vec<String> {
    let mut out = Vec::new();
    let params = &rules.recommendations;
    let constraints = rules.constraints.get(&process);

    if issues.iter().any(|i| i.is_critical()) {
        out.push("Address all critical issues before proceeding with manufacturing.".to_string());
    }

    if issues.iter().any(|i| i.kind.is_wall_related()) {
        let min_wall = constraints
            .and_then(|c| c.min_wall_thickness)
            .unwrap_or(rules.check_defaults.min_wall_thickness);
        out.push(format!(
            "Maintain wall thickness of at least {}mm for {}. Use ribs instead of increasing overall thickness.",
            min_wall,
            process.label()
        ));
    }

    if process == Process::InjectionMolding {
        let draft = constraints.and_then(|c| c.draft_angle).unwrap_or(1.0);
        out.push(format!(
            "Ensure all vertical faces have at least {}° draft angle for proper ejection from the mold.",
            draft
        ));
    }

    if !rules.is_compatible(material, process) {
        let compatible = rules.compatible_processes(material);
        if !compatible.is_empty() {
            let names: Vec<&str> = compatible.iter().map(|p| p.label()).collect();
            out.push(format!(
                "{} is not ideal for {}. Consider using this material with {} instead.",
                material,
                process.label(),
                names.join(", ")
            ));
        }
    }

    if process == Process::InjectionMolding && production_volume < params.molding_min_volume {
        out.push(format!(
            "Injection molding is typically cost-effective above {} units. Consider 3D printing or CNC machining for lower volumes.",
            params.molding_min_volume
        ));
    } else if process.family() == ProcessFamily::Machining
        && production_volume > params.machining_max_volume
    {
        out.push(format!(
            "CNC machining becomes less cost-effective above {} units. Consider injection molding for higher volumes.",
            params.machining_max_volume
        ));
    }

    match process.family() {
        ProcessFamily::Molding if process == Process::InjectionMolding => out.push(
            "Design with uniform wall thickness and avoid sharp corners to prevent sink marks and improve material flow."
                .to_string(),
        ),
        ProcessFamily::Machining => out.push(
            "Design with standard tool sizes in mind and avoid deep pockets with small corner radii."
                .to_string(),
        ),
        ProcessFamily::Additive => out.push(
            "Orient the part to minimize overhangs and support structures, and consider layer orientation for strength."
                .to_string(),
        ),
        _ => {}
    }

    if issues.len() > params.many_issues {
        out.push(
            "Consider design simplification to reduce manufacturing complexity and cost."
                .to_string(),
        );
    }

    if out.is_empty() {
        out.push(SUITABLE.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::issue::{IssueKind, Severity};

    fn issue(kind: IssueKind, severity: Severity) -> ManufacturingIssue {
        ManufacturingIssue::new(kind, severity, "", "")
    }

    #[test]
    fn test_critical_issue_comes_first() {
        let rules = RuleBook::default();
        let issues = vec![
            issue(IssueKind::WallTooThick, Severity::Low),
            issue(IssueKind::InvalidDimensions, Severity::Critical),
        ];
        let recs = build(&issues, Material::Abs, Process::InjectionMolding, 5000, &rules);

        assert!(recs[0].starts_with("Address all critical issues"));
        assert!(recs[1].contains("at least 0.5mm for Injection Molding"));
        assert!(recs[2].contains("draft angle"));
    }

    #[test]
    fn test_incompatible_material_lists_alternatives() {
        let rules = RuleBook::default();
        let recs = build(&[], Material::Pla, Process::CncMilling, 10, &rules);
        let advice = recs.iter().find(|r| r.starts_with("pla is not ideal")).unwrap();
        assert!(advice.contains("FDM 3D Printing"));
    }

    #[test]
    fn test_volume_advice() {
        let rules = RuleBook::default();
        let low = build(&[], Material::Abs, Process::InjectionMolding, 100, &rules);
        assert!(low.iter().any(|r| r.contains("cost-effective above 1000 units")));

        let high = build(&[], Material::Aluminum, Process::CncMilling, 5000, &rules);
        assert!(high.iter().any(|r| r.contains("less cost-effective")));
    }

    #[test]
    fn test_many_issues_suggest_simplification() {
        let rules = RuleBook::default();
        let issues = vec![issue(IssueKind::WarpingRisk, Severity::Medium); 6];
        let recs = build(&issues, Material::Pla, Process::FdmPrinting, 10, &rules);
        assert_eq!(
            recs.last().map(String::as_str),
            Some("Consider design simplification to reduce manufacturing complexity and cost.")
        );
    }

    #[test]
    fn test_clean_part_is_suitable() {
        let rules = RuleBook::default();
        let recs = build(&[], Material::Aluminum, Process::Casting, 500, &rules);
        assert_eq!(recs, vec![SUITABLE.to_string()]);
    }
}
