//! Output formatting for driftcheck results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the analysis result plus run metadata, for programmatic use

use colored::*;
use serde::{Deserialize, Serialize};

use crate::compare::{Issue, Severity};
use crate::score::RepositoryReport;

/// Run metadata shown alongside the analysis result.
#[derive(Debug, Clone)]
pub struct RunInfo {
    /// Code path that was scanned
    pub path: String,
    /// Documentation path, when different from `path`
    pub docs_path: Option<String>,
    /// Config file in use, if any
    pub config_path: Option<String>,
    pub files_scanned: usize,
    /// Minimum trust score for a passing run
    pub min_trust: u32,
}

impl RunInfo {
    pub fn passed(&self, report: &RepositoryReport) -> bool {
        report.trust_score >= self.min_trust
    }
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_path: Option<String>,
    pub grade: String,
    pub min_trust: u32,
    pub passed: bool,
    pub files_scanned: usize,
    #[serde(flatten)]
    pub report: RepositoryReport,
}

pub fn build_json(info: &RunInfo, report: &RepositoryReport) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: info.path.clone(),
        docs_path: info.docs_path.clone(),
        grade: report.grade().to_string(),
        min_trust: info.min_trust,
        passed: info.passed(report),
        files_scanned: info.files_scanned,
        report: report.clone(),
    }
}

/// Write results in JSON format to stdout.
pub fn write_json(info: &RunInfo, report: &RepositoryReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&build_json(info, report))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

pub fn write_pretty(info: &RunInfo, report: &RepositoryReport) {
    println!();
    print!("  ");
    print!("{}", "driftcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Code:   ".dimmed());
    println!("{}", info.path);
    if let Some(docs) = &info.docs_path {
        print!("  {}", "Docs:   ".dimmed());
        println!("{}", docs);
    }
    print!("  {}", "Config: ".dimmed());
    println!("{}", info.config_path.as_deref().unwrap_or("(defaults)"));
    println!();

    write_result_summary(info, report);
    println!();

    if !report.issues.is_empty() {
        write_issues(report);
        println!();
    }

    if !report.method_stats.is_empty() {
        write_methods(report);
        println!();
    }

    write_final_status(info, report);
    println!();
}

fn write_result_summary(info: &RunInfo, report: &RepositoryReport) {
    if info.passed(report) {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }

    print!("  Trust: ");
    write_colored_score(report.trust_score);
    print!("%  Grade: ");
    write_colored_grade(report.grade());
    println!(
        "  {}",
        format!(
            "({}/{} verified, {} files)",
            report.verified, report.total_functions, info.files_scanned
        )
        .dimmed()
    );
}

fn write_colored_score(s: u32) {
    match s {
        s if s >= 90 => print!("{}", s.to_string().green().bold()),
        s if s >= 75 => print!("{}", s.to_string().green()),
        s if s >= 60 => print!("{}", s.to_string().yellow()),
        s if s >= 40 => print!("{}", s.to_string().yellow().bold()),
        _ => print!("{}", s.to_string().red()),
    }
}

fn write_colored_grade(grade: &str) {
    match grade {
        "A" => print!("{}", grade.green().bold()),
        "B" => print!("{}", grade.green()),
        "C" => print!("{}", grade.yellow()),
        "D" => print!("{}", grade.yellow().bold()),
        _ => print!("{}", grade.red()),
    }
}

fn write_issues(report: &RepositoryReport) {
    let counts: Vec<String> = report
        .severity_counts()
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(s, n)| format!("{} {}", n, s.as_str()))
        .collect();
    println!(
        "  {} ({}): {}",
        "Issues".bold(),
        report.issues.len(),
        counts.join(", ").dimmed()
    );
    println!();

    for severity in [Severity::High, Severity::Medium, Severity::Low] {
        for issue in report.issues.iter().filter(|i| i.severity == severity) {
            write_issue(issue);
        }
    }
}

fn write_issue(issue: &Issue) {
    write_severity_tag(issue.severity);
    print!("   ");
    println!("{}", issue.function.blue());
    println!("            {}", issue.description);
    if let Some(code) = &issue.code_snippet {
        println!("            {} {}", "code:".dimmed(), code);
    }
    if let Some(doc) = &issue.doc_snippet {
        println!("            {} {}", "docs:".dimmed(), doc);
    }
    if let Some(fix) = &issue.suggested_fix {
        println!("            {} {}", "fix: ".dimmed(), fix);
    }
    println!();
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::High => print!("    {} ", "HIGH".red()),
        Severity::Medium => print!("    {} ", "MED ".yellow()),
        Severity::Low => print!("    {} ", "LOW ".blue()),
    }
}

fn write_methods(report: &RepositoryReport) {
    println!("  {}", "Methods:".bold());

    let mut methods: Vec<(&String, &usize)> = report.method_stats.iter().collect();
    methods.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (method, count) in methods {
        let plural = if *count != 1 { "s" } else { "" };
        println!("    {:<26} {:>3} pair{}", method, count, plural);
    }
}

fn write_final_status(info: &RunInfo, report: &RepositoryReport) {
    print!("  {}", format!("Minimum trust: {}", info.min_trust).dimmed());
    print!("  Trust: ");
    write_colored_score(report.trust_score);
    print!("  ");

    if info.passed(report) {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report() -> RepositoryReport {
        let mut method_stats = BTreeMap::new();
        method_stats.insert("unmatched".to_string(), 1);
        method_stats.insert("embedding_only".to_string(), 1);
        RepositoryReport {
            trust_score: 48,
            total_functions: 2,
            verified: 1,
            issues: vec![Issue::new(
                Severity::Medium,
                "send_email",
                "Documented function not found in code",
            )],
            method_stats,
        }
    }

    fn info(min_trust: u32) -> RunInfo {
        RunInfo {
            path: "src".to_string(),
            docs_path: None,
            config_path: None,
            files_scanned: 3,
            min_trust,
        }
    }

    #[test]
    fn test_json_report_shape() {
        let json = serde_json::to_value(build_json(&info(0), &report())).unwrap();
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["path"], "src");
        assert_eq!(json["grade"], "D");
        assert_eq!(json["trust_score"], 48);
        assert_eq!(json["total_functions"], 2);
        assert_eq!(json["method_stats"]["unmatched"], 1);
        assert_eq!(json["issues"][0]["severity"], "medium");
        assert!(json.get("docs_path").is_none());
    }

    #[test]
    fn test_passed_uses_min_trust() {
        assert!(info(48).passed(&report()));
        assert!(!info(49).passed(&report()));
    }
}
